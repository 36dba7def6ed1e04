//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `compiler.rs` — declarative config to per-node descriptor.
//! - `packaging.rs` — descriptor to `<name>-<version>.tar.gz` archive.
//! - `cache.rs` — engine package-cache invalidation with escalation.
//! - `perms.rs` — OS-specific attribute/ownership capability.
//! - `evaluator.rs` — local evaluation engine + clear-and-retry policy.
//! - `cloud.rs` — platform session trait + HTTP implementation.
//! - `policy.rs` — policy definition generation.
//! - `toolchain.rs` — shared dependency preparation + doctor.
//! - `settings.rs` — versioned config resolved once at startup.
//! - `output.rs` — JSON/text output helpers + audit log.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod cache;
pub mod cloud;
pub mod compiler;
pub mod evaluator;
pub mod output;
pub mod packaging;
pub mod perms;
pub mod policy;
pub mod settings;
pub mod toolchain;
