//! A single-task actor with a bounded mailbox.
//!
//! Messages are [`DelayedClosure`]s over the actor state, handled one at a
//! time to completion. Stopping drops queued messages; promises captured by
//! them hang up.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::closure::DelayedClosure;
use crate::errors::{Error, Result};
use crate::future::{FutureActor, PromiseFuture};
use crate::promise::Promise;

pub trait Actor: Send + 'static {
    fn start_up(&mut self) {}

    fn tear_down(&mut self) {}
}

// ─── MailboxConfig ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Messages queued before senders wait. Zero is treated as one.
    pub capacity: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl MailboxConfig {
    pub fn capacity(mut self, v: usize) -> Self {
        self.capacity = v;
        self
    }
}

// ─── ActorHandle ──────────────────────────────────────────────────────────────

/// Cloneable address of a running actor.
pub struct ActorHandle<A> {
    name:   Arc<str>,
    sender: mpsc::Sender<DelayedClosure<A>>,
    stop:   CancellationToken,
}

impl<A> Clone for ActorHandle<A> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), sender: self.sender.clone(), stop: self.stop.clone() }
    }
}

impl<A: Send + 'static> std::fmt::Debug for ActorHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorHandle")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Starts `actor` on its own tokio task.
///
/// The join handle yields the actor back after it stops, either through
/// [`ActorHandle::stop`] or once every handle is dropped.
pub fn spawn_actor<A: Actor>(
    name: impl Into<String>,
    mut actor: A,
    config: MailboxConfig,
) -> (ActorHandle<A>, JoinHandle<A>) {
    let name: Arc<str> = Arc::from(name.into());
    let (sender, mut receiver) = mpsc::channel::<DelayedClosure<A>>(config.capacity.max(1));
    let stop = CancellationToken::new();
    let handle = ActorHandle { name: name.clone(), sender, stop: stop.clone() };

    let task = tokio::spawn(async move {
        actor.start_up();
        tracing::debug!("[layer-actor] {name} started");
        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                message = receiver.recv() => match message {
                    Some(closure) => closure.run(&mut actor),
                    None => break,
                },
            }
        }
        receiver.close();
        actor.tear_down();
        tracing::debug!("[layer-actor] {name} stopped");
        actor
    });

    (handle, task)
}

impl<A: Send + 'static> ActorHandle<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `closure`. Fails with a hangup once the actor has stopped.
    pub async fn send_closure(&self, closure: DelayedClosure<A>) -> Result<()> {
        self.sender.send(closure).await.map_err(|_| Error::hangup())
    }

    pub async fn send_lambda(&self, f: impl FnOnce(&mut A) + Send + 'static) -> Result<()> {
        self.send_closure(DelayedClosure::new(f)).await
    }

    /// Queues `f` with a fresh promise and returns the matching future.
    ///
    /// The actor may settle the promise right away or keep it for later.
    /// If the message never runs the future resolves with a hangup.
    pub async fn send_promise<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut A, Promise<T>) + Send + 'static,
    ) -> FutureActor<T> {
        let (promise, future) = PromiseFuture::new().into_parts();
        let closure = DelayedClosure::new(move |actor: &mut A| f(actor, Promise::from(promise)));
        if self.send_closure(closure).await.is_err() {
            tracing::debug!("[layer-actor] {} is closed", self.name);
        }
        future
    }

    /// Asks the actor to stop after the message it is running.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
