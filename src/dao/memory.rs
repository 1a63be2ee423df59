//! In-memory account DAO.

use tracing::debug;

use super::{Account, AccountDao, DaoError};

/// Message returned when the trip wire is set.
pub const TRIP_WIRE_MESSAGE: &str = "db down";

/// Account DAO backed by a `Vec`.
///
/// `find_accounts` hands out copies, so advice mutating the result never
/// touches the stored records.
#[derive(Debug, Clone)]
pub struct InMemoryAccountDao {
    accounts: Vec<Account>,
    name: String,
    service_code: String,
}

impl InMemoryAccountDao {
    pub fn new() -> Self {
        Self::with_accounts(vec![
            Account::new("John", "Silver"),
            Account::new("Madhu", "Platinum"),
            Account::new("Luca", "Gold"),
        ])
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts,
            name: String::new(),
            service_code: String::new(),
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }
}

impl Default for InMemoryAccountDao {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountDao for InMemoryAccountDao {
    fn add_account(&mut self, account: &Account, vip: bool) -> Result<(), DaoError> {
        debug!(%account, vip, "Adding account");
        self.accounts.push(account.clone());
        Ok(())
    }

    fn find_accounts(&self, trip_wire: bool) -> Result<Vec<Account>, DaoError> {
        if trip_wire {
            return Err(DaoError::Unavailable(TRIP_WIRE_MESSAGE.to_string()));
        }
        Ok(self.accounts.clone())
    }

    fn name(&self) -> Result<String, DaoError> {
        Ok(self.name.clone())
    }

    fn set_name(&mut self, name: &str) -> Result<(), DaoError> {
        self.name = name.to_string();
        Ok(())
    }

    fn service_code(&self) -> Result<String, DaoError> {
        Ok(self.service_code.clone())
    }

    fn set_service_code(&mut self, service_code: &str) -> Result<(), DaoError> {
        self.service_code = service_code.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_seeded() {
        let dao = InMemoryAccountDao::default();
        let names: Vec<String> = dao
            .find_accounts(false)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["John", "Madhu", "Luca"]);
    }

    #[test]
    fn test_add_then_find() {
        let mut dao = InMemoryAccountDao::with_accounts(Vec::new());
        dao.add_account(&Account::new("john", "bronze"), false).unwrap();
        assert_eq!(
            dao.find_accounts(false).unwrap(),
            vec![Account::new("john", "bronze")]
        );
    }

    #[test]
    fn test_trip_wire_fails() {
        let dao = InMemoryAccountDao::default();
        match dao.find_accounts(true) {
            Err(DaoError::Unavailable(msg)) => assert_eq!(msg, TRIP_WIRE_MESSAGE),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_accessors() {
        let mut dao = InMemoryAccountDao::default();
        dao.set_name("foobar").unwrap();
        dao.set_service_code("silver").unwrap();
        assert_eq!(dao.name().unwrap(), "foobar");
        assert_eq!(dao.service_code().unwrap(), "silver");
    }
}
