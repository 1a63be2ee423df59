//! Advice decorator for account DAOs.
//!
//! Routes every call through a [`Weaver`] without modifying the wrapped
//! implementation.

use std::sync::Arc;

use super::join_point::OperationId;
use super::weaver::Weaver;
use crate::dao::{Account, AccountDao, DaoError};

/// Wrapper that applies a weaver's advice to any [`AccountDao`].
///
/// Each trait method becomes one operation named after the DAO type path
/// and the method (`joinpoint.dao.AccountDao.findAccounts`).
///
/// # Example
///
/// ```ignore
/// let dao = InMemoryAccountDao::default();
/// let dao = Advised::new(dao, weaver, ACCOUNT_DAO_TYPE);
/// ```
pub struct Advised<T> {
    inner: T,
    weaver: Arc<Weaver>,
    type_path: String,
}

impl<T> Advised<T> {
    /// Wrap a DAO.
    ///
    /// # Arguments
    /// * `inner` - The DAO implementation to wrap
    /// * `weaver` - Advice table to apply
    /// * `type_path` - Dotted type path the operation ids are built from
    pub fn new(inner: T, weaver: Arc<Weaver>, type_path: impl Into<String>) -> Self {
        Self {
            inner,
            weaver,
            type_path: type_path.into(),
        }
    }

    /// Get a reference to the inner DAO.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Consume the wrapper and return the inner DAO.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn weaver(&self) -> &Weaver {
        &self.weaver
    }

    /// Operation id of one of the wrapped methods.
    pub fn operation(&self, method: &str) -> OperationId {
        OperationId::new(self.type_path.clone(), method)
    }
}

impl<T: AccountDao> AccountDao for Advised<T> {
    fn add_account(&mut self, account: &Account, vip: bool) -> Result<(), DaoError> {
        let operation = self.operation("addAccount");
        let inner = &mut self.inner;
        self.weaver
            .invoke(&operation, (account, vip), |(account, vip)| {
                inner.add_account(account, vip)
            })
            .map_err(DaoError::from)
    }

    fn find_accounts(&self, trip_wire: bool) -> Result<Vec<Account>, DaoError> {
        let operation = self.operation("findAccounts");
        self.weaver
            .invoke(&operation, (trip_wire,), |(trip_wire,)| {
                self.inner.find_accounts(trip_wire)
            })
            .map_err(DaoError::from)
    }

    fn name(&self) -> Result<String, DaoError> {
        let operation = self.operation("getName");
        self.weaver
            .invoke(&operation, (), |()| self.inner.name())
            .map_err(DaoError::from)
    }

    fn set_name(&mut self, name: &str) -> Result<(), DaoError> {
        let operation = self.operation("setName");
        let inner = &mut self.inner;
        self.weaver
            .invoke(&operation, (name,), |(name,)| inner.set_name(name))
            .map_err(DaoError::from)
    }

    fn service_code(&self) -> Result<String, DaoError> {
        let operation = self.operation("getServiceCode");
        self.weaver
            .invoke(&operation, (), |()| self.inner.service_code())
            .map_err(DaoError::from)
    }

    fn set_service_code(&mut self, service_code: &str) -> Result<(), DaoError> {
        let operation = self.operation("setServiceCode");
        let inner = &mut self.inner;
        self.weaver
            .invoke(&operation, (service_code,), |(service_code,)| {
                inner.set_service_code(service_code)
            })
            .map_err(DaoError::from)
    }
}
