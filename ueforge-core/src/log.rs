//! Process-wide build log
//!
//! Worker threads push lines while a build runs; the front end drains
//! everything queued so far on a fixed tick and renders it.

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Interval at which consumers are expected to drain the channel
pub const DRAIN_INTERVAL_MS: u64 = 100;

/// Unbounded multi-producer log queue.
///
/// Cloning yields another handle to the same queue. Messages come out in
/// the order they were enqueued.
#[derive(Clone)]
pub struct LogChannel {
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl LogChannel {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Queue a line. Never blocks.
    pub fn enqueue(&self, message: impl Into<String>) {
        // both ends live in `self`, so the channel cannot be disconnected
        let _ = self.tx.send(message.into());
    }

    /// Take every line queued since the previous drain, oldest first
    pub fn drain_all(&self) -> Vec<String> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogChannel")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn test_drain_empty_returns_immediately() {
        let log = LogChannel::new();
        assert!(log.drain_all().is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_drain_preserves_order() {
        let log = LogChannel::new();
        log.enqueue("first");
        log.enqueue(String::from("second"));
        log.enqueue("third");
        assert_eq!(log.len(), 3);
        assert_eq!(log.drain_all(), vec!["first", "second", "third"]);
        assert!(log.drain_all().is_empty());
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 500;

        let log = LogChannel::new();
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let log = log.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        log.enqueue(format!("{p}:{i}"));
                    }
                })
            })
            .collect();

        // drain while producers are still running
        let mut received = Vec::new();
        while received.len() < PRODUCERS * PER_PRODUCER {
            received.extend(log.drain_all());
            thread::yield_now();
        }
        for handle in handles {
            handle.join().unwrap();
        }
        received.extend(log.drain_all());

        assert_eq!(received.len(), PRODUCERS * PER_PRODUCER);
        let unique: HashSet<_> = received.iter().collect();
        assert_eq!(unique.len(), received.len());

        // per-producer order survives the interleaving
        for p in 0..PRODUCERS {
            let prefix = format!("{p}:");
            let seq: Vec<usize> = received
                .iter()
                .filter_map(|m| m.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..PER_PRODUCER).collect::<Vec<_>>());
        }
    }
}
