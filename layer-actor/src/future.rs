//! A promise/future pair over a oneshot channel.
//!
//! The promise side may live in another task. Dropping either side hangs
//! the pair up: a dropped [`PromiseActor`] resolves its future with
//! [`Error::hangup`], a dropped [`FutureActor`] makes later `set_*` calls
//! silent no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::errors::{Error, Result};
use crate::promise::{Promise, PromiseInterface};

fn empty_future() -> Error {
    Error::new(500, "Empty FutureActor")
}

// ─── PromiseActor ─────────────────────────────────────────────────────────────

/// The producing half. Settable once.
pub struct PromiseActor<T> {
    sender: Option<oneshot::Sender<Result<T>>>,
}

impl<T> PromiseActor<T> {
    pub fn set_value(&mut self, value: T) {
        self.deliver(Ok(value));
    }

    pub fn set_error(&mut self, error: Error) {
        self.deliver(Err(error));
    }

    pub fn set_result(&mut self, result: Result<T>) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: Result<T>) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        if sender.send(result).is_err() {
            tracing::debug!("[layer-actor] Result dropped: future hung up");
        }
    }

    /// True once the future side is gone and results would be discarded.
    pub fn is_hangup(&self) -> bool {
        self.sender.as_ref().is_some_and(|sender| sender.is_closed())
    }

    /// True after the result was delivered or the promise was closed.
    pub fn is_empty(&self) -> bool {
        self.sender.is_none()
    }

    /// Hangs up without a result; the future resolves with a hangup error.
    pub fn close(&mut self) {
        self.sender = None;
    }
}

impl<T> std::fmt::Debug for PromiseActor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromiseActor")
            .field("empty", &self.is_empty())
            .field("hangup", &self.is_hangup())
            .finish()
    }
}

impl<T: Send> PromiseInterface<T> for PromiseActor<T> {
    fn set_result(mut self: Box<Self>, result: Result<T>) {
        self.deliver(result);
    }
}

impl<T: Send + 'static> From<PromiseActor<T>> for Promise<T> {
    fn from(actor: PromiseActor<T>) -> Self {
        Promise::new(actor)
    }
}

// ─── FutureActor ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FutureState {
    Waiting,
    Ready,
}

/// The consuming half. Awaitable, or pollable through [`FutureActor::state`].
pub struct FutureActor<T> {
    receiver: Option<oneshot::Receiver<Result<T>>>,
    result:   Option<Result<T>>,
}

impl<T> Default for FutureActor<T> {
    fn default() -> Self {
        Self { receiver: None, result: None }
    }
}

impl<T> Unpin for FutureActor<T> {}

impl<T> FutureActor<T> {
    fn try_receive(&mut self) {
        let Some(receiver) = self.receiver.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(result) => self.result = Some(result),
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => {
                tracing::debug!("[layer-actor] Promise hung up");
                self.result = Some(Err(Error::hangup()));
            }
        }
        self.receiver = None;
    }

    pub fn state(&mut self) -> FutureState {
        self.try_receive();
        if self.result.is_some() { FutureState::Ready } else { FutureState::Waiting }
    }

    pub fn is_ready(&mut self) -> bool {
        self.state() == FutureState::Ready
    }

    pub fn is_ok(&mut self) -> bool {
        self.try_receive();
        matches!(self.result, Some(Ok(_)))
    }

    /// Takes the result out. Not ready yet means "Empty FutureActor" (500).
    pub fn move_as_result(&mut self) -> Result<T> {
        self.try_receive();
        self.result.take().unwrap_or_else(|| Err(empty_future()))
    }
}

impl<T> std::fmt::Debug for FutureActor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureActor").field("ready", &self.result.is_some()).finish()
    }
}

impl<T> Future for FutureActor<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = this.result.take() {
            return Poll::Ready(result);
        }
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(Err(empty_future()));
        };
        match Pin::new(receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(received) => {
                this.receiver = None;
                Poll::Ready(received.unwrap_or_else(|_| {
                    tracing::debug!("[layer-actor] Promise hung up");
                    Err(Error::hangup())
                }))
            }
        }
    }
}

// ─── PromiseFuture ────────────────────────────────────────────────────────────

/// A connected [`PromiseActor`]/[`FutureActor`] pair.
#[derive(Debug)]
pub struct PromiseFuture<T> {
    pub promise: PromiseActor<T>,
    pub future:  FutureActor<T>,
}

impl<T> PromiseFuture<T> {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            promise: PromiseActor { sender: Some(sender) },
            future:  FutureActor { receiver: Some(receiver), result: None },
        }
    }

    pub fn into_parts(self) -> (PromiseActor<T>, FutureActor<T>) {
        (self.promise, self.future)
    }
}

impl<T> Default for PromiseFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}
