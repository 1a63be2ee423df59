//! Aspects: named, ordered groups of advice registrations.

use std::any::Any;
use std::error::Error;
use std::fmt;

use tracing::trace;

use super::error::AdviceResult;
use super::join_point::{JoinPoint, Phase};
use super::pointcut::Pointcut;

/// Advice run before dispatch.
pub type BeforeFn = dyn Fn(&JoinPoint) -> AdviceResult + Send + Sync;
/// Advice run with mutable access to the returned value.
pub type ReturningFn = dyn Fn(&JoinPoint, &mut dyn Any) -> AdviceResult + Send + Sync;
/// Advice run with the error returned by the target.
pub type ThrowingFn = dyn Fn(&JoinPoint, &(dyn Error + 'static)) -> AdviceResult + Send + Sync;
/// Advice run after completion, whatever the outcome.
pub type FinallyFn = dyn Fn(&JoinPoint) -> AdviceResult + Send + Sync;

/// An advice callback. The variant fixes the lifecycle point it runs at.
pub enum Callback {
    Before(Box<BeforeFn>),
    AfterReturning(Box<ReturningFn>),
    AfterThrowing(Box<ThrowingFn>),
    AfterFinally(Box<FinallyFn>),
}

impl Callback {
    pub fn phase(&self) -> Phase {
        match self {
            Callback::Before(_) => Phase::Before,
            Callback::AfterReturning(_) => Phase::AfterReturning,
            Callback::AfterThrowing(_) => Phase::AfterThrowing,
            Callback::AfterFinally(_) => Phase::AfterFinally,
        }
    }

    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint) -> AdviceResult + Send + Sync + 'static,
    {
        Callback::Before(Box::new(f))
    }

    /// After-returning advice bound to results of type `T`.
    ///
    /// Skipped when the operation returns some other type.
    pub fn after_returning<T, F>(f: F) -> Self
    where
        T: Any,
        F: Fn(&JoinPoint, &mut T) -> AdviceResult + Send + Sync + 'static,
    {
        Callback::AfterReturning(Box::new(move |jp: &JoinPoint, result: &mut dyn Any| {
            match result.downcast_mut::<T>() {
                Some(value) => f(jp, value),
                None => {
                    trace!(
                        operation = %jp.operation(),
                        expected = std::any::type_name::<T>(),
                        "Result type mismatch, skipping after-returning advice"
                    );
                    Ok(())
                }
            }
        }))
    }

    /// After-returning advice over an untyped result.
    pub fn after_returning_any<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, &mut dyn Any) -> AdviceResult + Send + Sync + 'static,
    {
        Callback::AfterReturning(Box::new(f))
    }

    /// After-throwing advice bound to errors of type `E`.
    ///
    /// Skipped when the operation fails with some other error type.
    pub fn after_throwing<E, F>(f: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&JoinPoint, &E) -> AdviceResult + Send + Sync + 'static,
    {
        Callback::AfterThrowing(Box::new(
            move |jp: &JoinPoint, error: &(dyn Error + 'static)| match error.downcast_ref::<E>() {
                Some(error) => f(jp, error),
                None => {
                    trace!(
                        operation = %jp.operation(),
                        expected = std::any::type_name::<E>(),
                        "Error type mismatch, skipping after-throwing advice"
                    );
                    Ok(())
                }
            },
        ))
    }

    /// After-throwing advice over any error.
    pub fn after_throwing_any<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, &(dyn Error + 'static)) -> AdviceResult + Send + Sync + 'static,
    {
        Callback::AfterThrowing(Box::new(f))
    }

    pub fn after_finally<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint) -> AdviceResult + Send + Sync + 'static,
    {
        Callback::AfterFinally(Box::new(f))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.phase()).finish()
    }
}

/// One advice registration: a pointcut plus a callback.
#[derive(Debug)]
pub struct Advice {
    pointcut: Pointcut,
    callback: Callback,
}

impl Advice {
    pub fn new(pointcut: Pointcut, callback: Callback) -> Self {
        Self { pointcut, callback }
    }

    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn phase(&self) -> Phase {
        self.callback.phase()
    }
}

/// A named group of advice with an explicit priority.
///
/// Lower `order` runs its before advice first and its after advice last.
/// Within an aspect, advice of the same phase runs in registration order.
///
/// # Example
///
/// ```ignore
/// let aspect = Aspect::new("logging")
///     .with_order(2)
///     .before(Pointcut::package_excluding_accessors("joinpoint.dao"), |jp| {
///         info!(method = %jp.operation().short_string(), "Executing before advice");
///         Ok(())
///     });
/// ```
#[derive(Debug)]
pub struct Aspect {
    name: String,
    order: i32,
    advice: Vec<Advice>,
}

impl Aspect {
    /// Create an empty aspect with order 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: 0,
            advice: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Add a registration. Duplicates are kept and all fire.
    pub fn register(mut self, pointcut: Pointcut, callback: Callback) -> Self {
        self.push(pointcut, callback);
        self
    }

    pub fn before<F>(self, pointcut: Pointcut, f: F) -> Self
    where
        F: Fn(&JoinPoint) -> AdviceResult + Send + Sync + 'static,
    {
        self.register(pointcut, Callback::before(f))
    }

    pub fn after_returning<T, F>(self, pointcut: Pointcut, f: F) -> Self
    where
        T: Any,
        F: Fn(&JoinPoint, &mut T) -> AdviceResult + Send + Sync + 'static,
    {
        self.register(pointcut, Callback::after_returning(f))
    }

    pub fn after_throwing<E, F>(self, pointcut: Pointcut, f: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&JoinPoint, &E) -> AdviceResult + Send + Sync + 'static,
    {
        self.register(pointcut, Callback::after_throwing(f))
    }

    pub fn after_finally<F>(self, pointcut: Pointcut, f: F) -> Self
    where
        F: Fn(&JoinPoint) -> AdviceResult + Send + Sync + 'static,
    {
        self.register(pointcut, Callback::after_finally(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn advice(&self) -> &[Advice] {
        &self.advice
    }

    pub(crate) fn push(&mut self, pointcut: Pointcut, callback: Callback) {
        self.advice.push(Advice::new(pointcut, callback));
    }

    pub(crate) fn set_order(&mut self, order: i32) {
        self.order = order;
    }
}
