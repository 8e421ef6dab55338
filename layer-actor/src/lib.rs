//! # layer-actor
//!
//! Asynchronous result delivery for the layer workspace.
//!
//! - [`Promise`]: a continuation fired exactly once, with lambda, join,
//!   safe and cancellable flavours
//! - [`PromiseActor`]/[`FutureActor`]: a promise paired with an awaitable
//!   future, with hangup detection on both sides
//! - [`ImmediateClosure`]/[`DelayedClosure`]: method calls bound to
//!   borrowed or owned arguments
//! - [`spawn_actor`]: a tokio task running closures over one actor state
//! - [`buffer`]: shared buffers with global memory accounting
//!
//! ```rust,no_run
//! use layer_actor::{Actor, MailboxConfig, spawn_actor};
//!
//! struct Counter(u32);
//! impl Actor for Counter {}
//!
//! # async fn demo() {
//! let (counter, _task) = spawn_actor("counter", Counter(0), MailboxConfig::default());
//! counter.send_lambda(|c| c.0 += 1).await.unwrap();
//! let value = counter.send_promise(|c, mut p| p.set_value(c.0)).await.await;
//! assert_eq!(value, Ok(1));
//! # }
//! ```

#![deny(unsafe_code)]

mod actor;
mod closure;
mod errors;
mod future;
mod promise;
pub mod buffer;

pub use actor::{Actor, ActorHandle, MailboxConfig, spawn_actor};
pub use buffer::{BufferAllocator, BufferSlice, BufferWriter};
pub use closure::{DelayedClosure, ImmediateClosure, create_delayed_closure, create_immediate_closure};
pub use errors::{Error, HANGUP_ERROR_CODE, Result};
pub use future::{FutureActor, FutureState, PromiseActor, PromiseFuture};
pub use promise::{
    CancellablePromise, LambdaPromise, Promise, PromiseInterface, SafePromise, fail_promises, set_promises,
};
