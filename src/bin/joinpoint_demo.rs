//! joinpoint-demo: advice around an account DAO
//!
//! Wraps the in-memory account DAO with the demo aspects and exercises each
//! lifecycle point: before advice on `addAccount`, after-returning advice
//! rewriting the accounts found, after-throwing advice when the trip wire
//! makes `findAccounts` fail.
//!
//! ## Configuration
//! - JOINPOINT_LOG: tracing filter (default: info)
//! - JOINPOINT_CONFIG: YAML file with aspect overrides (optional)
//!
//! An explicit config path may also be given as the first argument.

use std::sync::Arc;

use tracing::{info, warn};

use joinpoint::advice::{Advised, Weaver};
use joinpoint::aspects::demo_aspects;
use joinpoint::config::Config;
use joinpoint::dao::{Account, AccountDao, InMemoryAccountDao, ACCOUNT_DAO_TYPE};
use joinpoint::utils::bootstrap::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    let weaver = demo_aspects()
        .into_iter()
        .fold(Weaver::builder(), |builder, aspect| builder.aspect(aspect))
        .configure(&config.aspects)
        .build();
    info!(?weaver, "joinpoint-demo started");

    let mut dao = Advised::new(
        InMemoryAccountDao::default(),
        Arc::new(weaver),
        ACCOUNT_DAO_TYPE,
    );

    dao.add_account(&Account::new("Madhu", "Platinum"), true)?;

    // Accessors are outside the advised pointcut
    dao.set_name("foobar")?;
    dao.set_service_code("silver")?;
    let (name, service_code) = (dao.name()?, dao.service_code()?);
    info!(%name, %service_code, "Accessors called");

    let accounts = dao.find_accounts(false)?;
    info!(?accounts, "Main program: found accounts");

    match dao.find_accounts(true) {
        Ok(accounts) => info!(?accounts, "Main program: found accounts"),
        Err(e) => warn!(error = %e, "Main program: caught exception"),
    }

    Ok(())
}
