//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `local.rs` — compile/package/state/cache/tools/doctor + policy generate.
//! - `cloud.rs` — publish/policy register+assign/compliance.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod cloud;
pub mod local;

pub use cloud::handle_cloud_commands;
pub use local::handle_local_commands;
