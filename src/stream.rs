//! Event delivery from the tail loop to any number of subscribers.

use crate::error::{Error, Result};
use crate::event::TailEvent;
use futures::Stream;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// A stream of [`TailEvent`]s from one tailer.
///
/// Ends once the tailer is dropped. Events are buffered without bound, so a
/// consumer that stops reading only costs memory.
pub struct EventStream<E> {
    receiver: mpsc::UnboundedReceiver<TailEvent<E>>,
}

impl<E> EventStream<E> {
    /// Returns a queued event without waiting.
    ///
    /// `Ok(None)` means nothing is queued yet; [`Error::StreamClosed`] means
    /// the tailer is gone and nothing is left.
    pub fn try_next_event(&mut self) -> Result<Option<TailEvent<E>>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::StreamClosed),
        }
    }

    /// Blocks the current thread until the next event arrives.
    ///
    /// Panics when called from within an async runtime; use the `Stream`
    /// implementation there.
    pub fn blocking_next(&mut self) -> Option<TailEvent<E>> {
        self.receiver.blocking_recv()
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl<E> Stream for EventStream<E> {
    type Item = TailEvent<E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Fans events out to every live subscriber.
pub(crate) struct EventBus<E> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TailEvent<E>>>>,
}

impl<E: Clone> EventBus<E> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> EventStream<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        EventStream { receiver: rx }
    }

    /// Sends `event` to all subscribers, forgetting those whose stream was dropped.
    pub(crate) fn emit(&self, event: TailEvent<E>) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<TailEvent<E>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
