//! # Quarry Core
//!
//! This crate is the engine behind the `quarry` binary. It discovers the
//! structure of a relational database, compiles graph queries into role
//! scoped statements, caches the statements of allow-listed queries, and
//! keeps all of it fresh by rebuilding and atomically swapping the active
//! engine snapshot whenever the schema or the configuration changes.
//!
//! The grammar compiler and the statement generator are not part of this
//! crate. They are plugged in through the [`engine::Backend`] trait.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod allow;
pub mod cnf;
pub mod conf;
pub mod engine;
pub mod err;
pub mod iam;
pub mod options;
pub mod provider;
pub mod reload;
pub mod schema;

pub use engine::{Backend, Compiled, Engine, Request};
pub use err::Error;
pub use options::EngineOptions;
pub use reload::Reloader;
pub use schema::{SchemaModel, SchemaSource};
