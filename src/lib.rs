//! Joinpoint - explicit advice hooks around ordinary operations.
//!
//! Registers before / after-returning / after-throwing / after-finally
//! callbacks against pointcuts and runs them around a target call, with a
//! demo account DAO to apply them to.

pub mod advice;
pub mod aspects;
pub mod config;
pub mod dao;
pub mod utils;
