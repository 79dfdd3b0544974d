//! Run-Loop Queue (spec.md §4.3, component D): a single-producer,
//! single-consumer FIFO of pending exchanges. `tokio::sync::mpsc`
//! already signals its receiver the moment a previously-empty channel
//! gains an item, which is exactly the "signal a run-loop source" spec.md
//! asks for — no separate waker is needed, grounded on the teacher's use
//! of bounded `mpsc` channels as the async analogue of libuv/run-loop
//! work queues throughout `client::conn`.

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// The producer half. Cloneable so multiple callers (e.g. a timeout
/// task requeuing a retried exchange) can push without sharing a lock.
#[derive(Clone)]
pub struct RunLoopQueue<T> {
    tx: mpsc::Sender<T>,
}

/// The single consumer half, held by the Command Manager's service
/// task.
pub struct RunLoopConsumer<T> {
    rx: mpsc::Receiver<T>,
}

/// Priority is explicitly out of scope (spec.md §4.3): `capacity` only
/// bounds memory, it never reorders.
pub fn channel<T>(capacity: usize) -> (RunLoopQueue<T>, RunLoopConsumer<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (RunLoopQueue { tx }, RunLoopConsumer { rx })
}

impl<T> RunLoopQueue<T> {
    /// Enqueues `item`. Fails with `Disconnected` once the consumer has
    /// been dropped (e.g. the connection it served has torn down).
    pub async fn push(&self, item: T) -> Result<()> {
        self.tx.send(item).await.map_err(|_| Error::disconnected())
    }
}

impl<T> RunLoopConsumer<T> {
    /// Waits for and removes the next item. Returns `None` once every
    /// producer has been dropped and the queue has drained.
    pub async fn pop(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Drains everything currently queued without waiting, for
    /// disconnect handling (spec.md §4.4.6: "the queue is drained and
    /// each drained exchange's error handler is invoked").
    pub fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            drained.push(item);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_returns_items_in_fifo_order() {
        let (queue, mut consumer) = channel::<u32>(8);
        queue.push(1).await.unwrap();
        queue.push(2).await.unwrap();
        queue.push(3).await.unwrap();
        assert_eq!(consumer.pop().await, Some(1));
        assert_eq!(consumer.pop().await, Some(2));
        assert_eq!(consumer.pop().await, Some(3));
    }

    #[tokio::test]
    async fn pop_returns_none_after_producer_dropped() {
        let (queue, mut consumer) = channel::<u32>(8);
        drop(queue);
        assert_eq!(consumer.pop().await, None);
    }

    #[tokio::test]
    async fn drain_empties_queue_without_waiting() {
        let (queue, mut consumer) = channel::<u32>(8);
        queue.push(1).await.unwrap();
        queue.push(2).await.unwrap();
        assert_eq!(consumer.drain(), vec![1, 2]);
        assert_eq!(consumer.drain(), Vec::<u32>::new());
    }

    #[tokio::test]
    async fn push_fails_once_consumer_dropped() {
        let (queue, consumer) = channel::<u32>(8);
        drop(consumer);
        assert!(queue.push(1).await.is_err());
    }
}
