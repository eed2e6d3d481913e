//! Dispatcher schema, handler dependencies, and the command handlers

pub mod commands;
pub mod market;
pub mod schema;
pub mod tournament;
pub mod types;
pub mod wallet;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
