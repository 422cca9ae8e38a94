//! This crate exposes a small set of Redis commands to load-testing scripts. Scripts create
//! client handles and issue key/value and hash commands through the [`Redis`] façade, which
//! reports failures through the host's error channel instead of aborting the run.
//!
//! The protocol work is left to the `redis` crate. The crate adds a typed [`Client`] over
//! it, an in-process [`MemoryStore`] for dry runs, and the glue a host needs to register
//! the façade as a module.

#![deny(rust_2018_idioms)]
#![warn(missing_docs)]

mod client;
pub mod conf;
mod error;
pub mod facade;
pub mod registry;
mod reply;
pub mod report;
pub mod store;
pub mod telemetry;

pub use client::{Client, ClientOptions};
pub use error::{Error, Result};
pub use facade::Redis;
pub use registry::{ModuleRegistry, RegistryError};
pub use reply::Reply;
pub use report::{ErrorReporter, Report, TracingReporter};
pub use store::{MemoryStore, RedisStore, ScanResult, Store};

/// Address used when a client is created without one
pub const DEFAULT_ADDRESS: &str = "localhost:6379";

/// Name scripts import the façade by
pub const MODULE_NAME: &str = "x/redis";

/// Registers the façade under [`MODULE_NAME`], reporting failures with a [`TracingReporter`].
///
/// It should be called once while the host initializes.
pub fn register(registry: &mut ModuleRegistry) -> Result<(), RegistryError> {
    registry.register(MODULE_NAME, Redis::default)
}
