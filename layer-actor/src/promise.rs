//! Exactly-once result delivery.
//!
//! A [`Promise`] holds a continuation until the first `set_*` call, fires it
//! and becomes empty; later calls are no-ops. Dropping a promise built from
//! a result-taking function delivers [`Error::lost_promise`], while a
//! value-only function ignores failures unless a failure function is given.

use tokio_util::sync::CancellationToken;

use crate::errors::{Error, Result};

// ─── PromiseInterface ─────────────────────────────────────────────────────────

/// The continuation behind a [`Promise`].
///
/// `set_result` consumes the box, so an implementation fires at most once.
pub trait PromiseInterface<T>: Send {
    fn set_result(self: Box<Self>, result: Result<T>);

    fn is_cancellable(&self) -> bool {
        false
    }

    fn is_canceled(&self) -> bool {
        false
    }
}

// ─── LambdaPromise ────────────────────────────────────────────────────────────

enum Handler<T> {
    Result(Box<dyn FnOnce(Result<T>) + Send>),
    Value(Box<dyn FnOnce(T) + Send>),
    Split { ok: Box<dyn FnOnce(T) + Send>, fail: Box<dyn FnOnce(Error) + Send> },
}

/// Adapts plain functions to [`PromiseInterface`].
pub struct LambdaPromise<T> {
    handler: Option<Handler<T>>,
}

impl<T> LambdaPromise<T> {
    fn fire(&mut self, result: Result<T>) {
        let Some(handler) = self.handler.take() else {
            return;
        };
        match (handler, result) {
            (Handler::Result(f), result) => f(result),
            (Handler::Value(f), Ok(value)) => f(value),
            (Handler::Value(_), Err(_)) => {}
            (Handler::Split { ok, .. }, Ok(value)) => ok(value),
            (Handler::Split { fail, .. }, Err(error)) => fail(error),
        }
    }
}

impl<T: Send> PromiseInterface<T> for LambdaPromise<T> {
    fn set_result(mut self: Box<Self>, result: Result<T>) {
        self.fire(result);
    }
}

impl<T> Drop for LambdaPromise<T> {
    fn drop(&mut self) {
        if matches!(self.handler, Some(Handler::Result(_) | Handler::Split { .. })) {
            tracing::debug!("[layer-actor] Promise dropped without a result");
            self.fire(Err(Error::lost_promise()));
        }
    }
}

// ─── CancellablePromise ───────────────────────────────────────────────────────

/// Wraps another promise and reports cancellation through a token.
///
/// Nothing is interrupted: holders poll [`Promise::is_canceled`] and may
/// stop early.
pub struct CancellablePromise<P> {
    inner: P,
    token: CancellationToken,
}

impl<P> CancellablePromise<P> {
    pub fn new(inner: P, token: CancellationToken) -> Self {
        Self { inner, token }
    }
}

impl<T, P: PromiseInterface<T>> PromiseInterface<T> for CancellablePromise<P> {
    fn set_result(self: Box<Self>, result: Result<T>) {
        let this = *self;
        Box::new(this.inner).set_result(result);
    }

    fn is_cancellable(&self) -> bool {
        true
    }

    fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ─── Promise ──────────────────────────────────────────────────────────────────

/// A one-shot receiver of a `Result<T>`.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use layer_actor::Promise;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let mut promise = Promise::from_value_fn(move |v: i32| sink.lock().unwrap().push(v));
/// promise.set_value(5);
/// promise.set_value(6);
/// assert_eq!(*seen.lock().unwrap(), [5]);
/// ```
pub struct Promise<T> {
    inner: Option<Box<dyn PromiseInterface<T>>>,
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise").field("active", &self.is_active()).finish()
    }
}

impl<T: Send + 'static> Promise<T> {
    pub fn new(inner: impl PromiseInterface<T> + 'static) -> Self {
        Self { inner: Some(Box::new(inner)) }
    }

    fn lambda(handler: Handler<T>) -> Self {
        Self::new(LambdaPromise { handler: Some(handler) })
    }

    /// Success and failure both reach `f`; dropping the promise delivers
    /// "Lost promise".
    pub fn from_result_fn(f: impl FnOnce(Result<T>) + Send + 'static) -> Self {
        Self::lambda(Handler::Result(Box::new(f)))
    }

    /// Only success reaches `f`; failures are ignored.
    pub fn from_value_fn(f: impl FnOnce(T) + Send + 'static) -> Self {
        Self::lambda(Handler::Value(Box::new(f)))
    }

    /// Success reaches `ok`, failure (including a drop) reaches `fail`.
    pub fn from_fns(ok: impl FnOnce(T) + Send + 'static, fail: impl FnOnce(Error) + Send + 'static) -> Self {
        Self::lambda(Handler::Split { ok: Box::new(ok), fail: Box::new(fail) })
    }

    /// A result-taking promise that reports `token` as its cancellation.
    pub fn cancellable(token: CancellationToken, f: impl FnOnce(Result<T>) + Send + 'static) -> Self {
        let lambda = LambdaPromise { handler: Some(Handler::Result(Box::new(f))) };
        Self::new(CancellablePromise::new(lambda, token))
    }
}

impl<T> Promise<T> {
    pub fn set_value(&mut self, value: T) {
        self.set_result(Ok(value));
    }

    pub fn set_error(&mut self, error: Error) {
        self.set_result(Err(error));
    }

    /// Fires the continuation if it is still held.
    pub fn set_result(&mut self, result: Result<T>) {
        if let Some(inner) = self.inner.take() {
            inner.set_result(result);
        }
    }

    /// Drops the continuation, as if the promise went out of scope.
    pub fn reset(&mut self) {
        self.inner = None;
    }

    /// True until the promise fires or is reset.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    pub fn is_cancellable(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.is_cancellable())
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.is_canceled())
    }

    /// Takes the continuation out, leaving the promise empty.
    pub fn release(&mut self) -> Option<Box<dyn PromiseInterface<T>>> {
        self.inner.take()
    }
}

// ─── Join ─────────────────────────────────────────────────────────────────────

struct JoinPromise {
    promises: Vec<Promise<()>>,
}

impl PromiseInterface<()> for JoinPromise {
    fn set_result(self: Box<Self>, result: Result<()>) {
        for mut promise in self.promises {
            promise.set_result(result.clone());
        }
    }
}

impl Promise<()> {
    /// One promise that forwards its result to all of `promises`.
    pub fn join(promises: impl IntoIterator<Item = Promise<()>>) -> Self {
        Self::new(JoinPromise { promises: promises.into_iter().collect() })
    }
}

/// Fires and clears every promise in `promises`.
pub fn set_promises(promises: &mut Vec<Promise<()>>) {
    for mut promise in std::mem::take(promises) {
        promise.set_value(());
    }
}

/// Fails and clears every promise in `promises` with a clone of `error`.
pub fn fail_promises<T>(promises: &mut Vec<Promise<T>>, error: Error) {
    let mut moved = std::mem::take(promises);
    let Some(mut last) = moved.pop() else {
        return;
    };
    for promise in &mut moved {
        promise.set_error(error.clone());
    }
    last.set_error(error);
}

// ─── SafePromise ──────────────────────────────────────────────────────────────

/// A promise paired with a fallback result fired on drop.
///
/// [`SafePromise::release`] takes the promise back without firing.
pub struct SafePromise<T> {
    promise: Promise<T>,
    result:  Option<Result<T>>,
}

impl<T> SafePromise<T> {
    pub fn new(promise: Promise<T>, result: Result<T>) -> Self {
        Self { promise, result: Some(result) }
    }

    pub fn release(mut self) -> Promise<T> {
        std::mem::take(&mut self.promise)
    }
}

impl<T> Drop for SafePromise<T> {
    fn drop(&mut self) {
        if let Some(result) = self.result.take() {
            self.promise.set_result(result);
        }
    }
}

impl<T> From<SafePromise<T>> for Promise<T> {
    fn from(safe: SafePromise<T>) -> Self {
        safe.release()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn result_promise(log: &Log) -> Promise<i32> {
        let log = log.clone();
        Promise::from_result_fn(move |r: Result<i32>| {
            log.lock().unwrap().push(match r {
                Ok(v) => format!("ok {v}"),
                Err(e) => format!("err {}", e.message),
            })
        })
    }

    #[test]
    fn fires_exactly_once() {
        let log = log();
        let mut promise = result_promise(&log);
        assert!(promise.is_active());
        promise.set_value(5);
        promise.set_value(6);
        promise.set_error(Error::new(400, "late"));
        assert!(!promise.is_active());
        drop(promise);
        assert_eq!(entries(&log), ["ok 5"]);
    }

    #[test]
    fn dropped_result_promise_is_lost() {
        let log = log();
        drop(result_promise(&log));
        let mut reset = result_promise(&log);
        reset.reset();
        reset.set_value(1);
        assert_eq!(entries(&log), ["err Lost promise", "err Lost promise"]);
    }

    #[test]
    fn value_only_ignores_errors() {
        let log = log();
        let sink = log.clone();
        let mut promise = Promise::from_value_fn(move |v: i32| sink.lock().unwrap().push(v.to_string()));
        promise.set_error(Error::new(400, "ignored"));
        drop(Promise::from_value_fn(|_: i32| panic!("must not run")));
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn split_functions() {
        let log = log();
        let (ok_log, fail_log) = (log.clone(), log.clone());
        let mut promise = Promise::from_fns(
            move |v: i32| ok_log.lock().unwrap().push(format!("ok {v}")),
            move |e: Error| fail_log.lock().unwrap().push(format!("fail {}", e.code)),
        );
        promise.set_error(Error::new(420, "FLOOD_WAIT"));
        assert_eq!(entries(&log), ["fail 420"]);
    }

    #[test]
    fn join_fans_out() {
        let log = log();
        let make = |name: &'static str| {
            let log = log.clone();
            Promise::from_result_fn(move |r: Result<()>| {
                log.lock().unwrap().push(format!("{name} {}", r.is_ok()))
            })
        };
        let mut joined = Promise::join([make("a"), make("b")]);
        joined.set_error(Error::new(500, "boom"));
        assert_eq!(entries(&log), ["a false", "b false"]);

        let mut pending = vec![make("c"), make("d")];
        set_promises(&mut pending);
        assert!(pending.is_empty());
        assert_eq!(entries(&log)[2..], ["c true", "d true"]);
    }

    #[test]
    fn fail_all() {
        let log = log();
        let mut promises = vec![result_promise(&log), Promise::default(), result_promise(&log)];
        fail_promises(&mut promises, Error::new(400, "gone"));
        assert!(promises.is_empty());
        assert_eq!(entries(&log), ["err gone", "err gone"]);
        fail_promises(&mut Vec::<Promise<i32>>::new(), Error::new(400, "none"));
    }

    #[test]
    fn safe_promise() {
        let log = log();
        drop(SafePromise::new(result_promise(&log), Ok(7)));
        assert_eq!(entries(&log), ["ok 7"]);

        let safe = SafePromise::new(result_promise(&log), Ok(8));
        let mut promise: Promise<i32> = safe.into();
        promise.set_value(9);
        assert_eq!(entries(&log), ["ok 7", "ok 9"]);
    }

    #[test]
    fn cancellation_is_reported() {
        let token = CancellationToken::new();
        let mut promise = Promise::cancellable(token.clone(), |_: Result<i32>| {});
        assert!(promise.is_cancellable());
        assert!(!promise.is_canceled());
        token.cancel();
        assert!(promise.is_canceled());
        promise.set_value(1);
        assert!(!promise.is_cancellable());
        assert!(!Promise::from_value_fn(|_: i32| {}).is_cancellable());
    }
}
