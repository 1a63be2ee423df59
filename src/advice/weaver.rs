//! The interception pipeline.

use std::any::Any;
use std::error::Error;
use std::fmt;

use tracing::{debug, trace, warn};

use super::aspect::{Aspect, Callback};
use super::error::{AdviceError, AdviceResult, InvokeError};
use super::join_point::{Arguments, JoinPoint, OperationId, Outcome, Phase};
use super::pointcut::Pointcut;
use crate::config::AspectConfig;

/// Name of the aspect holding advice registered directly on the builder.
pub const DEFAULT_ASPECT: &str = "default";

/// Runs a target operation with matched advice around it.
///
/// Registrations are fixed once built, so a `Weaver` can be shared behind
/// an `Arc`. Each [`invoke`](Weaver::invoke) owns its own [`JoinPoint`].
pub struct Weaver {
    // Sorted by order; equal orders keep declaration order.
    aspects: Vec<Aspect>,
}

/// One matched advice callback.
struct Step<'a> {
    // Position of the owning aspect in `Weaver::aspects`.
    index: usize,
    aspect: &'a str,
    callback: &'a Callback,
}

/// Matched advice for one operation, grouped by phase in run order.
#[derive(Default)]
struct Plan<'a> {
    before: Vec<Step<'a>>,
    after_returning: Vec<Step<'a>>,
    after_throwing: Vec<Step<'a>>,
    after_finally: Vec<Step<'a>>,
}

impl<'a> Plan<'a> {
    fn is_empty(&self) -> bool {
        self.before.is_empty()
            && self.after_returning.is_empty()
            && self.after_throwing.is_empty()
            && self.after_finally.is_empty()
    }
}

impl Weaver {
    pub fn builder() -> WeaverBuilder {
        WeaverBuilder::default()
    }

    /// A weaver with no advice; `invoke` only dispatches the target.
    pub fn empty() -> Self {
        Self {
            aspects: Vec::new(),
        }
    }

    /// Aspects in run order for before advice.
    pub fn aspects(&self) -> impl Iterator<Item = &Aspect> {
        self.aspects.iter()
    }

    /// Invoke `target` with the advice matching `operation`.
    ///
    /// Pass `args` as a tuple; when advice matches it is captured into the
    /// [`JoinPoint`], then it is moved into `target`. Arguments that cannot
    /// be captured never stop the call. The target's value is returned after
    /// after-returning advice had a chance to mutate it; the target's error
    /// is returned unchanged after after-throwing advice observed it.
    /// After-finally advice runs last on both paths.
    ///
    /// A failing callback aborts the rest of its phase and its error
    /// supersedes the pending outcome. If before advice fails the target is
    /// never dispatched.
    pub fn invoke<A, R, E, F>(
        &self,
        operation: &OperationId,
        args: A,
        target: F,
    ) -> Result<R, InvokeError<E>>
    where
        A: Arguments,
        R: Any,
        E: Error + 'static,
        F: FnOnce(A) -> Result<R, E>,
    {
        let plan = self.plan(operation);
        if plan.is_empty() {
            trace!(%operation, "No advice matched");
            return target(args).map_err(InvokeError::Target);
        }
        debug!(
            %operation,
            before = plan.before.len(),
            after_returning = plan.after_returning.len(),
            after_throwing = plan.after_throwing.len(),
            after_finally = plan.after_finally.len(),
            "Matched advice"
        );

        let mut join_point = JoinPoint::capture(operation.clone(), &args);

        run_phase(&plan.before, Phase::Before, &join_point, |callback| {
            match callback {
                Callback::Before(f) => f(&join_point),
                _ => Ok(()),
            }
        })?;

        match target(args) {
            Ok(mut value) => {
                join_point.set_outcome(Outcome::Returned);
                let returning = run_phase(
                    &plan.after_returning,
                    Phase::AfterReturning,
                    &join_point,
                    |callback| match callback {
                        Callback::AfterReturning(f) => {
                            f(&join_point, &mut value as &mut dyn Any)
                        }
                        _ => Ok(()),
                    },
                );
                run_finally(&plan, &join_point)?;
                returning?;
                Ok(value)
            }
            Err(error) => {
                join_point.set_outcome(Outcome::Threw);
                debug!(%operation, %error, "Target failed");
                let throwing = run_phase(
                    &plan.after_throwing,
                    Phase::AfterThrowing,
                    &join_point,
                    |callback| match callback {
                        Callback::AfterThrowing(f) => {
                            f(&join_point, &error as &(dyn Error + 'static))
                        }
                        _ => Ok(()),
                    },
                );
                run_finally(&plan, &join_point)?;
                throwing?;
                Err(InvokeError::Target(error))
            }
        }
    }

    /// Evaluate every pointcut once against `operation`.
    fn plan(&self, operation: &OperationId) -> Plan<'_> {
        let mut plan = Plan::default();

        for (index, aspect) in self.aspects.iter().enumerate() {
            for advice in aspect.advice() {
                if advice.pointcut().matches(operation) {
                    let step = Step {
                        index,
                        aspect: aspect.name(),
                        callback: advice.callback(),
                    };
                    match advice.phase() {
                        Phase::Before => plan.before.push(step),
                        Phase::AfterReturning => plan.after_returning.push(step),
                        Phase::AfterThrowing => plan.after_throwing.push(step),
                        Phase::AfterFinally => plan.after_finally.push(step),
                    }
                }
            }
        }

        // After phases unwind: higher order first, registration order kept
        // within each aspect.
        for steps in [
            &mut plan.after_returning,
            &mut plan.after_throwing,
            &mut plan.after_finally,
        ] {
            reverse_aspects(steps);
        }

        plan
    }
}

/// Reverse the aspect sequence while keeping each aspect's steps in place.
fn reverse_aspects(steps: &mut Vec<Step<'_>>) {
    let mut groups: Vec<Vec<Step<'_>>> = Vec::new();
    for step in steps.drain(..) {
        match groups.last_mut() {
            Some(group) if group[0].index == step.index => group.push(step),
            _ => groups.push(vec![step]),
        }
    }
    steps.extend(groups.into_iter().rev().flatten());
}

fn run_phase<'a, F>(
    steps: &[Step<'a>],
    phase: Phase,
    join_point: &JoinPoint,
    mut call: F,
) -> Result<(), AdviceError>
where
    F: FnMut(&'a Callback) -> AdviceResult,
{
    for step in steps {
        trace!(operation = %join_point.operation(), %phase, aspect = step.aspect, "Running advice");
        if let Err(source) = call(step.callback) {
            warn!(
                operation = %join_point.operation(),
                %phase,
                aspect = step.aspect,
                error = %source,
                "Advice failed"
            );
            return Err(AdviceError {
                aspect: step.aspect.to_string(),
                phase,
                operation: join_point.operation().clone(),
                source,
            });
        }
    }
    Ok(())
}

fn run_finally(plan: &Plan<'_>, join_point: &JoinPoint) -> Result<(), AdviceError> {
    run_phase(
        &plan.after_finally,
        Phase::AfterFinally,
        join_point,
        |callback| match callback {
            Callback::AfterFinally(f) => f(join_point),
            _ => Ok(()),
        },
    )
}

impl fmt::Debug for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.aspects
                    .iter()
                    .map(|a| (a.name(), a.order(), a.advice().len())),
            )
            .finish()
    }
}

impl Default for Weaver {
    fn default() -> Self {
        Self::empty()
    }
}

/// Collects aspects and builds an immutable [`Weaver`].
#[derive(Debug, Default)]
pub struct WeaverBuilder {
    aspects: Vec<Aspect>,
    default_aspect: Option<Aspect>,
    overrides: Vec<AspectConfig>,
}

impl WeaverBuilder {
    pub fn aspect(mut self, aspect: Aspect) -> Self {
        self.aspects.push(aspect);
        self
    }

    /// Register advice outside any named aspect.
    ///
    /// It lands in the [`DEFAULT_ASPECT`] with order 0, placed after the
    /// named aspects that share that order.
    pub fn register(mut self, pointcut: Pointcut, callback: Callback) -> Self {
        self.default_aspect
            .get_or_insert_with(|| Aspect::new(DEFAULT_ASPECT))
            .push(pointcut, callback);
        self
    }

    /// Apply per-aspect order overrides and enablement from configuration.
    pub fn configure(mut self, overrides: &[AspectConfig]) -> Self {
        self.overrides.extend_from_slice(overrides);
        self
    }

    pub fn build(self) -> Weaver {
        let mut aspects = self.aspects;
        aspects.extend(self.default_aspect);

        for config in &self.overrides {
            if !aspects.iter().any(|a| a.name() == config.name) {
                warn!(aspect = %config.name, "Configured aspect is not registered, ignoring");
            }
        }

        let mut aspects: Vec<Aspect> = aspects
            .into_iter()
            .filter_map(|mut aspect| {
                // Later entries win.
                if let Some(config) = self
                    .overrides
                    .iter()
                    .rev()
                    .find(|c| c.name == aspect.name())
                {
                    if !config.enabled {
                        debug!(aspect = aspect.name(), "Aspect disabled by configuration");
                        return None;
                    }
                    if let Some(order) = config.order {
                        aspect.set_order(order);
                    }
                }
                Some(aspect)
            })
            .collect();

        aspects.sort_by_key(Aspect::order);

        debug!(
            aspects = ?aspects.iter().map(|a| (a.name(), a.order())).collect::<Vec<_>>(),
            "Built weaver"
        );

        Weaver { aspects }
    }
}
