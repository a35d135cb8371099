#![warn(missing_docs)]
//! samplerig Core - Tool Invocation
//!
//! This crate provides the pieces every pipeline shares:
//! - `ProcessInvoker` for running an external tool without a shell
//! - `Catalog` / `BuildTarget` describing what to build
//! - Builder and tester flag protocols
//! - The output sentinel used by whole-solution builds
//! - `TesterStats` read from tester output

#[allow(missing_docs)]
mod catalog;
#[allow(missing_docs)]
mod invoke;
#[allow(missing_docs)]
mod protocol;
mod sentinel;
#[allow(missing_docs)]
mod stats;

pub use catalog::{BuildTarget, Catalog, CatalogStyle};
pub use invoke::{
    InvocationResult, InvokeError, MAX_OUTPUT_BYTES, ProcessInvoker, TRUNCATION_MARKER,
    ToolInvoker,
};
pub use protocol::{BuilderProtocol, TesterProtocol, artifact_path};
pub use sentinel::{DEFAULT_SENTINEL, matches_sentinel, sentinel_line};
pub use stats::TesterStats;
