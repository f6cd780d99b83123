//! Shared building blocks for trustlink.
//!
//! This crate holds the pieces every other trustlink crate agrees on:
//!
//! - [`FederationConfig`]: the configuration value object built once at
//!   process start and handed to the provisioners and the orchestrator
//! - [`FederationIdentity`]: the record cached after a successful
//!   identity-provider run
//! - [`FederationError`]: the error taxonomy surfaced to callers, with the
//!   failing step attached where one applies

pub mod config;
pub mod error;
pub mod identity;

pub use config::{ConfigError, FederationConfig, PropagationPolicy, SmokeTestUser};
pub use error::{BoxError, CloudStep, FederationError, FederationResult, IdpStep};
pub use identity::{FederationIdentity, FederationOutcome};
