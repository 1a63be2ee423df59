//! Demo aspects applied to the account DAO.
//!
//! Trace lines go through `tracing` at `info` so they show up with the
//! default filter.

use tracing::info;

use crate::advice::{Aspect, JoinPoint, Pointcut};
use crate::dao::{Account, DaoError, ACCOUNT_DAO_TYPE, DAO_PACKAGE};

pub const LOGGING_ASPECT: &str = "logging";
pub const CLOUD_LOG_ASPECT: &str = "cloud-log";
pub const ANALYTICS_ASPECT: &str = "analytics";

/// Any DAO method that is not a plain accessor or mutator.
pub fn dao_operations() -> Pointcut {
    Pointcut::package_excluding_accessors(DAO_PACKAGE)
}

fn find_accounts() -> Pointcut {
    Pointcut::exact(format!("{ACCOUNT_DAO_TYPE}.findAccounts"))
}

/// Logs arguments before DAO operations and normalizes found account
/// names to upper case.
pub fn logging_aspect() -> Aspect {
    Aspect::new(LOGGING_ASPECT)
        .with_order(2)
        .before(dao_operations(), |jp| {
            log_arguments(jp);
            Ok(())
        })
        .after_returning(find_accounts(), |jp, accounts: &mut Vec<Account>| {
            let method = jp.operation().short_string();
            info!(%method, ?accounts, "Executing after-returning advice");
            uppercase_names(accounts);
            info!(%method, ?accounts, "Converted account names");
            Ok(())
        })
        .after_throwing(find_accounts(), |jp, error: &DaoError| {
            info!(
                method = %jp.operation().short_string(),
                %error,
                "Executing after-throwing advice"
            );
            Ok(())
        })
        .after_finally(find_accounts(), |jp| {
            info!(
                method = %jp.operation().short_string(),
                outcome = ?jp.outcome(),
                "Executing after-finally advice"
            );
            Ok(())
        })
}

/// Runs its before advice ahead of [`logging_aspect`].
pub fn cloud_log_aspect() -> Aspect {
    Aspect::new(CLOUD_LOG_ASPECT)
        .with_order(1)
        .before(dao_operations(), |jp| {
            info!(method = %jp.operation().short_string(), "Logging to cloud");
            Ok(())
        })
}

/// Runs its before advice after [`logging_aspect`].
pub fn analytics_aspect() -> Aspect {
    Aspect::new(ANALYTICS_ASPECT)
        .with_order(3)
        .before(dao_operations(), |jp| {
            info!(method = %jp.operation().short_string(), "Performing API analytics");
            Ok(())
        })
}

/// All demo aspects.
pub fn demo_aspects() -> Vec<Aspect> {
    vec![logging_aspect(), cloud_log_aspect(), analytics_aspect()]
}

fn log_arguments(jp: &JoinPoint) {
    info!(method = %jp.operation(), "Executing before advice");
    for arg in jp.args() {
        info!(%arg, "Argument");
        if let Ok(account) = serde_json::from_value::<Account>(arg.clone()) {
            info!(name = %account.name, level = %account.level, "Account argument");
        }
    }
}

pub fn uppercase_names(accounts: &mut [Account]) {
    for account in accounts {
        account.name = account.name.to_uppercase();
    }
}
