//! Aspect-oriented advice for cross-cutting concerns.
//!
//! Advice hooks run at fixed lifecycle points around an operation (before,
//! after returning, after throwing, after finally) without the operation
//! knowing about them.
//!
//! # Architecture
//!
//! Advice is registered explicitly at startup and applied at composition
//! time, not woven into implementations:
//!
//! ```ignore
//! // Core implementation - pure data access
//! let dao = InMemoryAccountDao::default();
//!
//! // Build the advice table once
//! let weaver = Arc::new(Weaver::builder().aspect(logging_aspect()).build());
//!
//! // Apply advice; use as normal
//! let dao = Advised::new(dao, weaver, ACCOUNT_DAO_TYPE);
//! let accounts = dao.find_accounts(false)?;
//! ```
//!
//! # Components
//!
//! - [`Pointcut`] - selects operations by name
//! - [`Aspect`] - named, ordered group of advice registrations
//! - [`Weaver`] - runs a target with matched advice around it
//! - [`Advised`] - decorator routing an [`AccountDao`](crate::dao::AccountDao) through a weaver

mod advised;
mod aspect;
mod error;
mod join_point;
pub mod pointcut;
mod weaver;

pub use advised::Advised;
pub use aspect::{Advice, Aspect, BeforeFn, Callback, FinallyFn, ReturningFn, ThrowingFn};
pub use error::{AdviceError, AdviceResult, BoxError, InvokeError};
pub use join_point::{Arguments, JoinPoint, OperationId, Outcome, Phase};
pub use pointcut::{Glob, Pointcut, PointcutError};
pub use weaver::{Weaver, WeaverBuilder, DEFAULT_ASPECT};
