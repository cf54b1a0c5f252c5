//! Bounded queues with a single designated closer.
//!
//! Each queue is split into role types so that only its owner can close it:
//!
//! | queue  | closer         | senders          | receivers            |
//! |--------|----------------|------------------|----------------------|
//! | input  | `InputQueue`   | `InputQueue`     | `WorkQueue` (clones) |
//! | output | `OutputCloser` | `ResultEmitter`  | sink task            |
//!
//! `WorkQueue` and `ResultEmitter` expose no close operation.

use async_channel::{bounded, Receiver, Sender, TryRecvError};

/// Value tagged with its submission sequence number
#[derive(Debug)]
pub(crate) struct Envelope<T> {
    pub seq: u64,
    pub body: T,
}

/// Create the input queue
pub(crate) fn input_queue<T>(capacity: usize) -> (InputQueue<T>, WorkQueue<T>) {
    let (tx, rx) = bounded(capacity);
    (InputQueue { tx: Some(tx) }, WorkQueue { rx })
}

/// Create the output queue
pub(crate) fn output_queue<T>(capacity: usize) -> (OutputCloser<T>, Receiver<T>) {
    let (tx, rx) = bounded(capacity);
    (OutputCloser { tx }, rx)
}

/// Producer side of the input queue; the only thing that can close it
#[derive(Debug)]
pub(crate) struct InputQueue<T> {
    tx: Option<Sender<T>>,
}

impl<T> InputQueue<T> {
    /// Sender while the queue is open
    pub fn sender(&self) -> Option<&Sender<T>> {
        self.tx.as_ref()
    }

    /// Close the queue. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => {
                tx.close();
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    pub fn len(&self) -> usize {
        self.tx.as_ref().map_or(0, Sender::len)
    }
}

/// Receive-only view of the input queue shared by workers
#[derive(Debug)]
pub(crate) struct WorkQueue<T> {
    rx: Receiver<T>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> WorkQueue<T> {
    /// Next value; `None` once the queue is closed and drained
    pub async fn recv(&self) -> Option<T> {
        self.rx.recv().await.ok()
    }

    /// Next value without suspending; `None` if empty or closed
    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

/// Send-only view of the output queue held by workers
#[derive(Debug)]
pub(crate) struct ResultEmitter<T> {
    tx: Sender<T>,
}

impl<T> Clone for ResultEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> ResultEmitter<T> {
    /// Send one value, suspending while the queue is full.
    /// Returns `false` if the receiving side is gone.
    pub async fn emit(&self, value: T) -> bool {
        self.tx.send(value).await.is_ok()
    }
}

/// Owner of the output queue; held by the coordinator only
#[derive(Debug)]
pub(crate) struct OutputCloser<T> {
    tx: Sender<T>,
}

impl<T> OutputCloser<T> {
    /// Emitter handed to one worker
    pub fn emitter(&self) -> ResultEmitter<T> {
        ResultEmitter {
            tx: self.tx.clone(),
        }
    }

    /// Close the output queue. Consumes the closer, so it runs once.
    pub fn close(self) {
        self.tx.close();
    }
}
