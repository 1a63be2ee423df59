//! Demo data-access layer the advice is applied to.
//!
//! [`AccountDao`] is the seam: [`InMemoryAccountDao`] is the plain
//! implementation, [`Advised`](crate::advice::Advised) the decorated one.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::advice::{AdviceError, InvokeError};

pub use memory::{InMemoryAccountDao, TRIP_WIRE_MESSAGE};

/// Type path of the account DAO, used to build operation ids.
pub const ACCOUNT_DAO_TYPE: &str = "joinpoint.dao.AccountDao";
/// Package holding the DAO types.
pub const DAO_PACKAGE: &str = "joinpoint.dao";

/// An account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub level: String,
}

impl Account {
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: level.into(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account [name={}, level={}]", self.name, self.level)
    }
}

/// Errors from DAO operations.
#[derive(Debug, thiserror::Error)]
pub enum DaoError {
    /// The backing store could not serve the request.
    #[error("account store unavailable: {0}")]
    Unavailable(String),

    /// Advice around the operation failed.
    #[error(transparent)]
    Advice(#[from] AdviceError),
}

impl From<InvokeError<DaoError>> for DaoError {
    fn from(err: InvokeError<DaoError>) -> Self {
        match err {
            InvokeError::Target(e) => e,
            InvokeError::Advice(e) => DaoError::Advice(e),
        }
    }
}

/// Account data access.
///
/// Accessors return `Result` so a decorated implementation can surface
/// advice failures.
pub trait AccountDao {
    fn add_account(&mut self, account: &Account, vip: bool) -> Result<(), DaoError>;

    /// List all accounts. With `trip_wire` set the call fails, simulating an
    /// outage.
    fn find_accounts(&self, trip_wire: bool) -> Result<Vec<Account>, DaoError>;

    fn name(&self) -> Result<String, DaoError>;

    fn set_name(&mut self, name: &str) -> Result<(), DaoError>;

    fn service_code(&self) -> Result<String, DaoError>;

    fn set_service_code(&mut self, service_code: &str) -> Result<(), DaoError>;
}
