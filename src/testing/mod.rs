//! Deterministic transports for exercising the coach without a backend.
//!
//! Compiled into the library so integration tests and the CLI harness can
//! script the analysis service's behavior: immediate canned responses,
//! guaranteed failures, and responses held back until released.

pub mod transports;

pub use transports::{FailingTransport, GatedTransport, ScriptedTransport};
