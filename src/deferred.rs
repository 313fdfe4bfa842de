//! Deferred values: single-shot computations whose outcome is shared by every
//! observer.
//!
//! A `Deferred` is lazy. Nothing runs until some clone of it is polled, and
//! once it settles the outcome is replayed to every other clone without
//! running the computation again.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture, Shared, WeakShared};
use futures::FutureExt;
use tracing::{debug, trace};

use crate::errors::Fault;
use crate::value::Value;

/// How a deferred value settled
pub type Outcome = Result<Value, Fault>;

#[derive(Clone)]
#[must_use = "deferred values do nothing unless polled"]
pub struct Deferred {
    shared: Shared<LocalBoxFuture<'static, Outcome>>,
}

impl Deferred {
    /// Wrap any future producing an outcome.
    ///
    /// Resolving with `Value::Deferred` adopts the inner deferred value: the
    /// result follows it instead of holding it.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Outcome> + 'static,
    {
        let adopted = async move {
            match future.await {
                Ok(Value::Deferred(inner)) => {
                    trace!("adopting inner deferred value");
                    inner.await
                }
                outcome => outcome,
            }
        };
        Self {
            shared: adopted.boxed_local().shared(),
        }
    }

    pub fn settled(outcome: Outcome) -> Self {
        Self::new(future::ready(outcome))
    }

    pub fn resolved(value: impl Into<Value>) -> Self {
        Self::settled(Ok(value.into()))
    }

    pub fn rejected(fault: Fault) -> Self {
        Self::settled(Err(fault))
    }

    /// A deferred value settled later through the returned `Settler`.
    /// Dropping the settler first fails it with `Fault::Abandoned`.
    pub fn pending() -> (Self, Settler) {
        let (sender, receiver) = oneshot::channel();
        let deferred = Self::new(async move {
            receiver.await.unwrap_or_else(|_| {
                debug!("settler dropped before settling");
                Err(Fault::Abandoned)
            })
        });
        let target = deferred.shared.downgrade();
        (deferred, Settler { sender, target })
    }

    /// Run `f` on the outcome, whichever way it went
    pub fn map_outcome<F>(self, f: F) -> Deferred
    where
        F: FnOnce(Outcome) -> Outcome + 'static,
    {
        Deferred::new(async move { f(self.await) })
    }

    /// Continue with the value on success; failures pass through unchanged
    pub fn then<F>(self, on_success: F) -> Deferred
    where
        F: FnOnce(Value) -> Outcome + 'static,
    {
        self.map_outcome(|outcome| outcome.and_then(on_success))
    }

    /// Recover from (or replace) a failure; values pass through unchanged
    pub fn catch<F>(self, on_failure: F) -> Deferred
    where
        F: FnOnce(Fault) -> Outcome + 'static,
    {
        self.map_outcome(|outcome| outcome.or_else(on_failure))
    }

    /// Run `on_settled` once settled, keeping the outcome
    pub fn finally<F>(self, on_settled: F) -> Deferred
    where
        F: FnOnce() + 'static,
    {
        self.map_outcome(|outcome| {
            on_settled();
            outcome
        })
    }

    /// True if both handles share one computation
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        self.shared.ptr_eq(&other.shared)
    }
}

impl Future for Deferred {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        self.shared.poll_unpin(cx)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.shared.peek().is_some())
            .finish()
    }
}

/// The write side of `Deferred::pending`
pub struct Settler {
    sender: oneshot::Sender<Outcome>,
    /// The deferred value being settled, to refuse settling it with itself
    target: Option<WeakShared<LocalBoxFuture<'static, Outcome>>>,
}

impl Settler {
    pub fn resolve(self, value: impl Into<Value>) {
        self.settle(Ok(value.into()));
    }

    pub fn reject(self, fault: Fault) {
        self.settle(Err(fault));
    }

    pub fn settle(self, outcome: Outcome) {
        let outcome = match outcome {
            Ok(Value::Deferred(inner)) if self.is_target(&inner) => {
                debug!("deferred value resolved with itself");
                Err(Fault::TypeError(
                    "chaining cycle detected for deferred value".into(),
                ))
            }
            outcome => outcome,
        };
        if self.sender.send(outcome).is_err() {
            trace!("deferred value dropped before it was settled");
        }
    }

    fn is_target(&self, deferred: &Deferred) -> bool {
        self.target
            .as_ref()
            .and_then(WeakShared::upgrade)
            .is_some_and(|own| own.ptr_eq(&deferred.shared))
    }
}

impl fmt::Debug for Settler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler")
            .field("observed", &!self.sender.is_canceled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_resolved_and_rejected() {
        assert_eq!(block_on(Deferred::resolved(1)), Ok(Value::from(1)));
        assert_eq!(block_on(Deferred::rejected(Fault::Abandoned)), Err(Fault::Abandoned));
    }

    #[test]
    fn test_pending_settles_later() {
        let (deferred, settler) = Deferred::pending();
        let observer = deferred.clone();
        settler.resolve("done");
        assert_eq!(block_on(observer), Ok(Value::from("done")));
    }

    #[test]
    fn test_dropped_settler_abandons() {
        let (deferred, settler) = Deferred::pending();
        drop(settler);
        assert_eq!(block_on(deferred), Err(Fault::Abandoned));
    }

    #[test]
    fn test_settling_with_itself_is_rejected() {
        let (deferred, settler) = Deferred::pending();
        settler.resolve(Value::Deferred(deferred.clone()));
        assert!(matches!(block_on(deferred), Err(Fault::TypeError(_))));
    }

    #[test]
    fn test_settling_with_another_pending_value_adopts_it() {
        let (outer, outer_settler) = Deferred::pending();
        let (inner, inner_settler) = Deferred::pending();
        outer_settler.resolve(Value::Deferred(inner));
        inner_settler.resolve("inner");
        assert_eq!(block_on(outer), Ok(Value::from("inner")));
    }

    #[test]
    fn test_outcome_computed_once() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let deferred = Deferred::new(async move {
            counter.set(counter.get() + 1);
            Ok(Value::from(5))
        });

        let first = deferred.clone().then(|v| Ok(v));
        let second = deferred.clone().then(|v| Ok(v));
        assert_eq!(block_on(first), Ok(Value::from(5)));
        assert_eq!(block_on(second), Ok(Value::from(5)));
        assert_eq!(block_on(deferred), Ok(Value::from(5)));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_lazy_until_polled() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let deferred = Deferred::resolved(1).finally(move || flag.set(true));
        assert!(!ran.get());
        let _ = block_on(deferred);
        assert!(ran.get());
    }

    #[test]
    fn test_then_skips_failures() {
        let deferred = Deferred::rejected(Fault::thrown(0)).then(|_| Ok(Value::from("unreachable")));
        assert_eq!(block_on(deferred), Err(Fault::thrown(0)));
    }

    #[test]
    fn test_catch_recovers() {
        let deferred = Deferred::rejected(Fault::thrown(0)).catch(|fault| Ok(fault.to_value()));
        assert_eq!(block_on(deferred), Ok(Value::from(0)));
    }

    #[test]
    fn test_finally_keeps_outcome() {
        let settled = Rc::new(Cell::new(0));
        let a = Rc::clone(&settled);
        let b = Rc::clone(&settled);
        let ok = Deferred::resolved(2).finally(move || a.set(a.get() + 1));
        let err = Deferred::rejected(Fault::Abandoned).finally(move || b.set(b.get() + 1));
        assert_eq!(block_on(ok), Ok(Value::from(2)));
        assert_eq!(block_on(err), Err(Fault::Abandoned));
        assert_eq!(settled.get(), 2);
    }

    #[test]
    fn test_adopts_inner_deferred() {
        let inner = Deferred::resolved("inner");
        let outer = Deferred::resolved(Value::Deferred(inner));
        assert_eq!(block_on(outer), Ok(Value::from("inner")));

        let failing = Deferred::resolved(Value::Deferred(Deferred::rejected(Fault::thrown(3))));
        assert_eq!(block_on(failing), Err(Fault::thrown(3)));
    }

    #[test]
    fn test_identity() {
        let a = Deferred::resolved(1);
        let b = a.clone();
        let c = Deferred::resolved(1);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
