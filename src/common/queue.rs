//! Message queues for handing results and events between tasks.
//!
//! `Queue` is point-to-point (a finished run hands its report to the waiting
//! caller), `BroadcastQueue` fans run events out to every subscriber.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{Result, TabflowError};

/// Bounded MPMC queue backed by flume.
///
/// Works from both sync and async callers, which is what lets a run handle
/// be awaited inside a runtime or blocked on from a plain thread.
#[derive(Clone)]
pub struct Queue<T> {
    receiver: Arc<flume::Receiver<T>>,
    sender: Arc<flume::Sender<T>>,
}

impl<T> Queue<T> {
    /// create a new queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, rx) = flume::bounded(cap);

        Arc::new(Self {
            receiver: Arc::new(rx),
            sender: Arc::new(tx),
        })
    }

    /// block until a message arrives
    pub fn next(&self) -> Result<T> {
        self.receiver.recv().map_err(|e| TabflowError::Queue(e.to_string()))
    }

    /// wait for a message asynchronously
    pub async fn next_async(&self) -> Result<T> {
        self.receiver.recv_async().await.map_err(|e| TabflowError::Queue(e.to_string()))
    }

    /// take a message if one is already queued
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// send a message to the queue asynchronously
    pub async fn send_async(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send_async(msg).await.map_err(|e| TabflowError::Queue(e.to_string()))
    }
}

/// Broadcast queue for one-to-many message distribution.
///
/// Backed by tokio's broadcast channel. Sending with no subscriber is not an
/// error for callers that ignore the result.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: Arc<broadcast::Sender<T>>,
}

impl<T: Clone> BroadcastQueue<T> {
    /// create a new broadcast queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: Arc::new(tx),
        })
    }

    /// send a message to the queue
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send(msg).map_err(|e| TabflowError::Queue(e.to_string()))?;
        Ok(())
    }

    /// subscribe to the queue
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}
