//! Advice pipeline step definitions.

use std::sync::{Arc, Mutex};

use cucumber::{given, then, when, World};
use joinpoint::advice::{Callback, InvokeError, OperationId, Phase, Pointcut, Weaver, WeaverBuilder};
use joinpoint::dao::Account;

/// Error raised by the test target.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
struct TargetError(String);

type Shared<T> = Arc<Mutex<Vec<T>>>;

fn push<T>(shared: &Shared<T>, value: T) {
    shared.lock().unwrap().push(value);
}

fn operation(name: &str) -> OperationId {
    OperationId::parse(name).expect("operation names in features are fully qualified")
}

/// Test context for advice pipeline scenarios.
#[derive(World)]
#[world(init = Self::new)]
pub struct AdvicePipelineWorld {
    builder: WeaverBuilder,
    /// Lifecycle events in the order they happened, including "target".
    events: Shared<String>,
    observed_accounts: Shared<Account>,
    observed_errors: Shared<String>,
    result: Option<Result<Vec<Account>, InvokeError<TargetError>>>,
}

impl std::fmt::Debug for AdvicePipelineWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvicePipelineWorld")
            .field("events", &self.events)
            .field("result", &self.result)
            .finish()
    }
}

impl AdvicePipelineWorld {
    fn new() -> Self {
        Self {
            builder: WeaverBuilder::default(),
            events: Arc::default(),
            observed_accounts: Arc::default(),
            observed_errors: Arc::default(),
            result: None,
        }
    }

    fn register(&mut self, pointcut: Pointcut, callback: Callback) {
        let builder = std::mem::take(&mut self.builder);
        self.builder = builder.register(pointcut, callback);
    }

    fn weaver(&mut self) -> Weaver {
        std::mem::take(&mut self.builder).build()
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn advice_events(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e != "target")
            .collect()
    }
}

// --- Given steps ---

#[given(expr = "before advice on {string}")]
async fn given_before_advice(world: &mut AdvicePipelineWorld, name: String) {
    let events = world.events.clone();
    let observed = world.observed_accounts.clone();
    world.register(
        Pointcut::exact(name),
        Callback::before(move |jp| {
            push(&events, Phase::Before.to_string());
            for arg in jp.args() {
                if let Ok(account) = serde_json::from_value::<Account>(arg.clone()) {
                    push(&observed, account);
                }
            }
            Ok(())
        }),
    );
}

#[given(expr = "failing before advice on {string}")]
async fn given_failing_before_advice(world: &mut AdvicePipelineWorld, name: String) {
    world.register(
        Pointcut::exact(name),
        Callback::before(|_| Err("denied".into())),
    );
}

#[given(expr = "after-returning advice on {string} that uppercases names")]
async fn given_after_returning_advice(world: &mut AdvicePipelineWorld, name: String) {
    let events = world.events.clone();
    world.register(
        Pointcut::exact(name),
        Callback::after_returning(move |_, accounts: &mut Vec<Account>| {
            push(&events, Phase::AfterReturning.to_string());
            for account in accounts.iter_mut() {
                account.name = account.name.to_uppercase();
            }
            Ok(())
        }),
    );
}

#[given(expr = "after-throwing advice on {string}")]
async fn given_after_throwing_advice(world: &mut AdvicePipelineWorld, name: String) {
    let events = world.events.clone();
    let errors = world.observed_errors.clone();
    world.register(
        Pointcut::exact(name),
        Callback::after_throwing(move |_, error: &TargetError| {
            push(&events, Phase::AfterThrowing.to_string());
            push(&errors, error.to_string());
            Ok(())
        }),
    );
}

#[given(expr = "after-finally advice on {string}")]
async fn given_after_finally_advice(world: &mut AdvicePipelineWorld, name: String) {
    let events = world.events.clone();
    world.register(
        Pointcut::exact(name),
        Callback::after_finally(move |_| {
            push(&events, Phase::AfterFinally.to_string());
            Ok(())
        }),
    );
}

// --- When steps ---

#[when(expr = "I call {string} with account {string} at level {string}")]
async fn when_call_with_account(
    world: &mut AdvicePipelineWorld,
    name: String,
    account_name: String,
    level: String,
) {
    let weaver = world.weaver();
    let events = world.events.clone();
    let account = Account::new(account_name, level);
    world.result = Some(weaver.invoke(&operation(&name), (&account,), |(_account,)| {
        push(&events, "target".to_string());
        Ok(Vec::new())
    }));
}

#[when(expr = "I call {string} returning accounts {string}")]
async fn when_call_returning(world: &mut AdvicePipelineWorld, name: String, names: String) {
    let weaver = world.weaver();
    let events = world.events.clone();
    let accounts: Vec<Account> = names
        .split(',')
        .map(|n| Account::new(n.trim(), "bronze"))
        .collect();
    world.result = Some(weaver.invoke(&operation(&name), (), |()| {
        push(&events, "target".to_string());
        Ok(accounts)
    }));
}

#[when(expr = "I call {string} failing with {string}")]
async fn when_call_failing(world: &mut AdvicePipelineWorld, name: String, message: String) {
    let weaver = world.weaver();
    let events = world.events.clone();
    world.result = Some(weaver.invoke(&operation(&name), (), |()| {
        push(&events, "target".to_string());
        Err(TargetError(message))
    }));
}

// --- Then steps ---

#[then(expr = "the before advice observed account {string} at level {string}")]
async fn then_before_observed(world: &mut AdvicePipelineWorld, name: String, level: String) {
    assert_eq!(
        *world.observed_accounts.lock().unwrap(),
        vec![Account::new(name, level)]
    );
}

#[then("the before advice ran before the target")]
async fn then_before_ran_first(world: &mut AdvicePipelineWorld) {
    let events = world.events();
    let before = events.iter().position(|e| e == "before");
    let target = events.iter().position(|e| e == "target");
    assert!(
        matches!((before, target), (Some(b), Some(t)) if b < t),
        "events: {events:?}"
    );
}

#[then("no after-returning advice fired")]
async fn then_no_after_returning(world: &mut AdvicePipelineWorld) {
    assert!(!world.events().iter().any(|e| e == "after_returning"));
}

#[then(expr = "the caller receives accounts {string}")]
async fn then_caller_receives_accounts(world: &mut AdvicePipelineWorld, expected: String) {
    let accounts = match world.result.as_ref() {
        Some(Ok(accounts)) => accounts,
        other => panic!("expected accounts, got {other:?}"),
    };
    let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names.join(","), expected);
}

#[then(expr = "the after-returning advice fired {int} time(s)")]
async fn then_after_returning_count(world: &mut AdvicePipelineWorld, count: usize) {
    let fired = world
        .events()
        .iter()
        .filter(|e| *e == "after_returning")
        .count();
    assert_eq!(fired, count);
}

#[then(expr = "the after-throwing advice observed {string} {int} time(s)")]
async fn then_after_throwing_observed(
    world: &mut AdvicePipelineWorld,
    message: String,
    count: usize,
) {
    assert_eq!(*world.observed_errors.lock().unwrap(), vec![message; count]);
}

#[then(expr = "the caller receives the target error {string}")]
async fn then_caller_receives_target_error(world: &mut AdvicePipelineWorld, message: String) {
    let error = match world.result.take() {
        Some(Err(error)) => error,
        other => panic!("expected an error, got {other:?}"),
    };
    assert_eq!(error.into_target(), Some(TargetError(message)));
}

#[then("no advice fired")]
async fn then_no_advice(world: &mut AdvicePipelineWorld) {
    assert_eq!(world.events(), vec!["target".to_string()]);
}

#[then(expr = "the advice fired in order {string}")]
async fn then_advice_order(world: &mut AdvicePipelineWorld, expected: String) {
    assert_eq!(world.advice_events().join(","), expected);
}

#[then("the target did not run")]
async fn then_target_did_not_run(world: &mut AdvicePipelineWorld) {
    assert!(!world.events().iter().any(|e| e == "target"));
}

#[then("the caller receives an advice error from the before phase")]
async fn then_advice_error_before(world: &mut AdvicePipelineWorld) {
    let error = match world.result.as_ref() {
        Some(Err(error)) => error,
        other => panic!("expected an error, got {other:?}"),
    };
    assert_eq!(error.advice().map(|e| e.phase), Some(Phase::Before));
}
