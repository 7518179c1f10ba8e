use std::env;
use std::time::{Duration, Instant};

use common_events::{CinemaEvent, BATCH_SIZE, BATCH_TIMEOUT_MS, DLQ_TOPIC, EVENT_TOPICS, PREFETCH_MULTIPLIER};
use common_retry::{is_transient, with_retry, RetryPolicy};
use futures_util::StreamExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::OwnedHeaders;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::Message;
use tracing::{debug, error, info, warn};

mod batch;
mod handlers;

use batch::BatchBuffer;

struct PendingEvent {
    event: CinemaEvent,
    raw: String,
    topic: String,
}

fn handler_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay_ms: 100,
        max_delay_ms: 1_000,
        backoff_multiplier: 2.0,
        jitter_factor: 0.3,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let bootstrap = env::var("KAFKA_BOOTSTRAP").unwrap_or_else(|_| "localhost:9092".to_string());
    let group = env::var("CONSUMER_GROUP").unwrap_or_else(|_| "cinema-event-consumer".to_string());

    let consumer: StreamConsumer = rdkafka::ClientConfig::new()
        .set("bootstrap.servers", &bootstrap)
        .set("group.id", &group)
        .set("enable.partition.eof", "false")
        .set("enable.auto.commit", "true")
        .set(
            "queued.min.messages",
            (BATCH_SIZE * PREFETCH_MULTIPLIER).to_string(),
        )
        .create()?;
    consumer.subscribe(&EVENT_TOPICS)?;

    let dlq_producer: FutureProducer = rdkafka::ClientConfig::new()
        .set("bootstrap.servers", &bootstrap)
        .create()?;

    info!(batch_size = BATCH_SIZE, group = %group, "event consumer connected");

    run(consumer, dlq_producer).await
}

async fn run(consumer: StreamConsumer, dlq: FutureProducer) -> anyhow::Result<()> {
    let mut buffer: BatchBuffer<PendingEvent> =
        BatchBuffer::new(BATCH_SIZE, Duration::from_millis(BATCH_TIMEOUT_MS));
    let mut stream = consumer.stream();

    loop {
        let deadline = buffer.next_deadline();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            message = stream.next() => {
                match message {
                    Some(Ok(m)) => {
                        let topic = m.topic().to_string();
                        let Some(Ok(text)) = m.payload_view::<str>() else {
                            warn!(topic = %topic, "message with empty or non-utf8 payload");
                            continue;
                        };
                        match serde_json::from_str::<CinemaEvent>(text) {
                            Ok(event) => {
                                let pending = PendingEvent {
                                    event,
                                    raw: text.to_string(),
                                    topic: topic.clone(),
                                };
                                if let Some(full) = buffer.push(&topic, pending) {
                                    process_batch(&dlq, &topic, full).await;
                                }
                            }
                            Err(err) => {
                                // Malformed payloads go straight to the DLQ, no retry.
                                error!(topic = %topic, error = %err, "failed to parse event payload");
                                dead_letter(&dlq, &topic, text, &err.to_string()).await;
                            }
                        }
                    }
                    Some(Err(err)) => warn!(?err, "kafka consumer error"),
                    None => break,
                }
            }
            () = sleep_until_deadline(deadline) => {
                for (topic, full) in buffer.take_due(Instant::now()) {
                    process_batch(&dlq, &topic, full).await;
                }
            }
        }
    }

    // Flush whatever is still buffered before the connection goes away.
    for (topic, full) in buffer.drain_all() {
        info!(topic = %topic, pending = full.len(), "flushing buffered batch on shutdown");
        process_batch(&dlq, &topic, full).await;
    }
    Ok(())
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Every message in a batch is processed independently; one poisoned event
/// dead-letters alone instead of taking its neighbours with it.
async fn process_batch(dlq: &FutureProducer, topic: &str, batch: Vec<PendingEvent>) {
    let batch_size = batch.len();
    let started = Instant::now();
    debug!(topic, batch_size, "processing batch");

    let policy = handler_retry_policy();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for item in batch {
        // only transient handler failures burn retry budget; anything else
        // dead-letters on the first attempt
        let result = with_retry(
            "process event",
            &policy,
            |err: &anyhow::Error| is_transient(None, &err.to_string()),
            || async { handlers::dispatch(&item.event) },
        )
        .await;
        match result {
            Ok(()) => succeeded += 1,
            Err(err) => {
                failed += 1;
                error!(event_id = %item.event.event_id(), topic, error = %err, "failed to process event after retries");
                dead_letter(dlq, &item.topic, &item.raw, &err.to_string()).await;
            }
        }
    }

    info!(
        topic,
        succeeded,
        failed,
        duration_ms = started.elapsed().as_millis() as u64,
        "batch processed"
    );
}

async fn dead_letter(dlq: &FutureProducer, source_topic: &str, payload: &str, reason: &str) {
    let headers = OwnedHeaders::new()
        .add("sourceTopic", source_topic)
        .add("error", reason);
    let record = FutureRecord::to(DLQ_TOPIC)
        .key(source_topic)
        .payload(payload)
        .headers(headers);
    if let Err((err, _)) = dlq.send(record, Duration::from_secs(5)).await {
        error!(?err, source_topic, "failed to dead-letter message");
    }
}
