//! Aspect ordering step definitions.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use cucumber::gherkin::Step;
use cucumber::{given, then, when, World};
use joinpoint::advice::{Aspect, Callback, OperationId, Pointcut, Weaver};
use joinpoint::config::Config;

type Events = Arc<Mutex<Vec<String>>>;

fn record(events: &Events, entry: String) {
    events.lock().unwrap().push(entry);
}

/// Aspect recording its before and after-returning advice under its name.
fn recording_aspect(name: &str, order: i32, events: &Events) -> Aspect {
    let (before, after) = (events.clone(), events.clone());
    let (before_name, after_name) = (name.to_string(), name.to_string());
    Aspect::new(name)
        .with_order(order)
        .before(Pointcut::any(), move |_| {
            record(&before, format!("{before_name}:before"));
            Ok(())
        })
        .register(
            Pointcut::any(),
            Callback::after_returning_any(move |_, _| {
                record(&after, format!("{after_name}:after_returning"));
                Ok(())
            }),
        )
}

/// Test context for aspect ordering scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct AspectOrderingWorld {
    aspects: Vec<(String, i32)>,
    config: Config,
    events: Events,
}

impl AspectOrderingWorld {
    fn new() -> Self {
        Self {
            aspects: Vec::new(),
            config: Config::for_test(),
            events: Arc::default(),
        }
    }

    fn names_for(&self, suffix: &str) -> String {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_suffix(suffix))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// --- Given steps ---

#[given(expr = "aspect {string} with order {int}")]
async fn given_aspect(world: &mut AspectOrderingWorld, name: String, order: i32) {
    world.aspects.push((name, order));
}

#[given("configuration:")]
async fn given_configuration(world: &mut AspectOrderingWorld, step: &Step) {
    let yaml = step
        .docstring
        .as_deref()
        .expect("configuration step needs a doc string");
    world.config = Config::from_yaml(yaml).expect("valid configuration");
}

// --- When steps ---

#[when(expr = "I call {string}")]
async fn when_call(world: &mut AspectOrderingWorld, name: String) {
    let weaver = world
        .aspects
        .iter()
        .fold(Weaver::builder(), |builder, (aspect, order)| {
            builder.aspect(recording_aspect(aspect, *order, &world.events))
        })
        .configure(&world.config.aspects)
        .build();

    let operation = OperationId::parse(&name).expect("fully qualified operation name");
    let result = weaver.invoke(&operation, (), |()| Ok::<_, Infallible>(()));
    assert!(result.is_ok());
}

// --- Then steps ---

#[then(expr = "the before advice ran in order {string}")]
async fn then_before_order(world: &mut AspectOrderingWorld, expected: String) {
    assert_eq!(world.names_for(":before"), expected);
}

#[then(expr = "the after-returning advice ran in order {string}")]
async fn then_after_returning_order(world: &mut AspectOrderingWorld, expected: String) {
    assert_eq!(world.names_for(":after_returning"), expected);
}
