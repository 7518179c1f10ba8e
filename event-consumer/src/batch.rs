use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-queue batch accumulation. A batch leaves the buffer either when it
/// reaches `capacity` (returned directly from `push`) or when the timeout
/// since its first message elapses (`take_due`).
pub struct BatchBuffer<T> {
    capacity: usize,
    timeout: Duration,
    queues: HashMap<String, Vec<T>>,
    deadlines: HashMap<String, Instant>,
}

impl<T> BatchBuffer<T> {
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            capacity,
            timeout,
            queues: HashMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Buffers one message. Returns the full batch once the size threshold is
    /// reached; the timeout clock starts with the first buffered message.
    pub fn push(&mut self, topic: &str, item: T) -> Option<Vec<T>> {
        let queue = self.queues.entry(topic.to_string()).or_default();
        queue.push(item);
        if queue.len() == 1 {
            self.deadlines
                .insert(topic.to_string(), Instant::now() + self.timeout);
        }
        if queue.len() >= self.capacity {
            self.deadlines.remove(topic);
            return Some(std::mem::take(queue));
        }
        None
    }

    /// Earliest pending flush deadline across all queues.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every batch whose deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<(String, Vec<T>)> {
        let due: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(topic, _)| topic.clone())
            .collect();

        let mut batches = Vec::with_capacity(due.len());
        for topic in due {
            self.deadlines.remove(&topic);
            if let Some(queue) = self.queues.get_mut(&topic) {
                if !queue.is_empty() {
                    batches.push((topic, std::mem::take(queue)));
                }
            }
        }
        batches
    }

    /// Empties every queue regardless of deadlines; used on shutdown.
    pub fn drain_all(&mut self) -> Vec<(String, Vec<T>)> {
        self.deadlines.clear();
        self.queues
            .iter_mut()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(topic, queue)| (topic.clone(), std::mem::take(queue)))
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_batch_at_capacity() {
        let mut buffer: BatchBuffer<u32> = BatchBuffer::new(3, Duration::from_secs(1));
        assert!(buffer.push("a", 1).is_none());
        assert!(buffer.push("a", 2).is_none());
        let batch = buffer.push("a", 3).expect("batch at capacity");
        assert_eq!(batch, vec![1, 2, 3]);
        assert_eq!(buffer.pending(), 0);
        assert!(buffer.next_deadline().is_none());
    }

    #[test]
    fn queues_accumulate_independently() {
        let mut buffer: BatchBuffer<u32> = BatchBuffer::new(2, Duration::from_secs(1));
        assert!(buffer.push("a", 1).is_none());
        assert!(buffer.push("b", 2).is_none());
        assert!(buffer.push("b", 3).is_some());
        // queue "a" is untouched by "b" flushing
        assert_eq!(buffer.pending(), 1);
    }

    #[test]
    fn deadline_starts_with_first_message() {
        let mut buffer: BatchBuffer<u32> = BatchBuffer::new(10, Duration::from_millis(50));
        assert!(buffer.next_deadline().is_none());
        let before = Instant::now();
        buffer.push("a", 1);
        let deadline = buffer.next_deadline().expect("deadline set");
        assert!(deadline >= before + Duration::from_millis(50));

        // a second message must not extend the deadline
        std::thread::sleep(Duration::from_millis(5));
        buffer.push("a", 2);
        assert_eq!(buffer.next_deadline(), Some(deadline));
    }

    #[test]
    fn take_due_flushes_only_elapsed_queues() {
        let mut buffer: BatchBuffer<u32> = BatchBuffer::new(10, Duration::from_millis(10));
        buffer.push("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        buffer.push("b", 2);

        let due = buffer.take_due(Instant::now() + Duration::from_millis(7));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, "a");
        assert_eq!(buffer.pending(), 1);

        let due = buffer.take_due(Instant::now() + Duration::from_millis(60));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, "b");
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn drain_all_empties_every_queue() {
        let mut buffer: BatchBuffer<u32> = BatchBuffer::new(10, Duration::from_secs(60));
        buffer.push("a", 1);
        buffer.push("b", 2);
        buffer.push("b", 3);

        let mut drained = buffer.drain_all();
        drained.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], ("a".to_string(), vec![1]));
        assert_eq!(drained[1], ("b".to_string(), vec![2, 3]));
        assert_eq!(buffer.pending(), 0);
        assert!(buffer.next_deadline().is_none());
    }
}
