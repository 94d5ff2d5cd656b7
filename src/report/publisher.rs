//! # Published report hand-off.
//!
//! [`Publisher`] holds the last rendered report behind a reader/writer lock.
//! The aggregator swaps in a fully built buffer; readers clone the
//! reference-counted buffer and release the lock immediately, so neither side
//! holds it across I/O and no reader ever sees a half-written report.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

/// Single-writer, many-reader slot for the latest report.
///
/// Cloning shares the same slot.
#[derive(Clone, Debug, Default)]
pub struct Publisher {
    report: Arc<RwLock<Bytes>>,
}

impl Publisher {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the report wholesale.
    pub async fn publish(&self, report: Bytes) {
        *self.report.write().await = report;
    }

    /// Returns the last published report.
    pub async fn read(&self) -> Bytes {
        self.report.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty_and_returns_latest() {
        let publisher = Publisher::new();
        assert!(publisher.read().await.is_empty());

        publisher.publish(Bytes::from_static(b"one")).await;
        publisher.publish(Bytes::from_static(b"two")).await;
        assert_eq!(publisher.read().await, Bytes::from_static(b"two"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_mixed_generations() {
        let publisher = Publisher::new();
        let generation = |g: usize| Bytes::from(format!("{g}\n").repeat(512));
        publisher.publish(generation(0)).await;

        let writer = {
            let publisher = publisher.clone();
            tokio::spawn(async move {
                for g in 1..200 {
                    publisher.publish(generation(g)).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let publisher = publisher.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let report = publisher.read().await;
                        let text = std::str::from_utf8(&report).unwrap();
                        let mut lines = text.lines();
                        let first = lines.next().unwrap();
                        assert!(lines.all(|l| l == first));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
    }
}
