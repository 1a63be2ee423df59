//! Invocation context handed to advice callbacks.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Lifecycle point at which advice runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the target is dispatched.
    Before,
    /// After the target returned successfully.
    AfterReturning,
    /// After the target returned an error.
    AfterThrowing,
    /// After the target completed, whatever the outcome.
    AfterFinally,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::AfterReturning => "after_returning",
            Phase::AfterThrowing => "after_throwing",
            Phase::AfterFinally => "after_finally",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an intercepted operation.
///
/// Made of a dotted type path (`joinpoint.dao.AccountDao`) and a method
/// name (`findAccounts`). Pointcuts match against [`OperationId::full_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId {
    type_path: String,
    method: String,
}

impl OperationId {
    pub fn new(type_path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            type_path: type_path.into(),
            method: method.into(),
        }
    }

    /// Split a fully qualified name at its last `.`.
    ///
    /// Returns `None` when there is no type path or no method name.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (type_path, method) = full_name.rsplit_once('.')?;
        if type_path.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self::new(type_path, method))
    }

    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Simple type name, the last segment of the type path.
    pub fn type_name(&self) -> &str {
        self.type_path
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.type_path)
    }

    /// Package of the type, empty for a type without one.
    pub fn package(&self) -> &str {
        self.type_path
            .rsplit_once('.')
            .map(|(package, _)| package)
            .unwrap_or("")
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.type_path, self.method)
    }

    /// Short form used in trace lines, e.g. `AccountDao.findAccounts(..)`.
    pub fn short_string(&self) -> String {
        format!("{}.{}(..)", self.type_name(), self.method)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_path, self.method)
    }
}

/// Progress of an invocation as seen by advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Target not dispatched or still running.
    Pending,
    /// Target returned a value.
    Returned,
    /// Target returned an error.
    Threw,
}

/// Argument list of an intercepted call.
///
/// Implemented for tuples of up to eight `Serialize` elements. A single
/// argument is passed as `(value,)`, no arguments as `()`.
pub trait Arguments {
    /// Serialize each argument on its own, in order.
    fn to_values(&self) -> Vec<Result<Value, serde_json::Error>>;
}

macro_rules! impl_arguments {
    ($($ty:ident $var:ident),*) => {
        impl<$($ty: Serialize),*> Arguments for ($($ty,)*) {
            fn to_values(&self) -> Vec<Result<Value, serde_json::Error>> {
                let ($($var,)*) = self;
                vec![$(serde_json::to_value($var)),*]
            }
        }
    };
}

impl_arguments!();
impl_arguments!(A a);
impl_arguments!(A a, B b);
impl_arguments!(A a, B b, C c);
impl_arguments!(A a, B b, C c, D d);
impl_arguments!(A a, B b, C c, D d, E e);
impl_arguments!(A a, B b, C c, D d, E e, F f);
impl_arguments!(A a, B b, C c, D d, E e, F f, G g);
impl_arguments!(A a, B b, C c, D d, E e, F f, G g, H h);

/// One call to an intercepted operation.
///
/// Arguments are captured as JSON values so advice can inspect them without
/// knowing the operation's concrete signature. The return value and error
/// are handed to advice separately, typed.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPoint {
    operation: OperationId,
    args: Vec<Value>,
    outcome: Outcome,
}

impl JoinPoint {
    pub fn new(operation: OperationId, args: Vec<Value>) -> Self {
        Self {
            operation,
            args,
            outcome: Outcome::Pending,
        }
    }

    /// Capture the arguments of a call.
    ///
    /// Each tuple element becomes one argument. An element that cannot be
    /// serialized is captured as `null` so positions stay aligned with the
    /// call's signature.
    pub fn capture<A: Arguments + ?Sized>(operation: OperationId, args: &A) -> Self {
        let args = args
            .to_values()
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                value.unwrap_or_else(|error| {
                    warn!(%operation, index, %error, "Argument not capturable, recording null");
                    Value::Null
                })
            })
            .collect();
        Self::new(operation, args)
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }
}
