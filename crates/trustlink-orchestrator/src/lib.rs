//! Federation provisioning pipeline.
//!
//! [`FederationOrchestrator::ensure_federation`] ties the pieces together:
//!
//! 1. look the logical name up in the idempotency cache
//! 2. on a miss, provision the identity provider and cache the result
//! 3. download the federation metadata for the application
//! 4. upsert the relying-party trust from that metadata
//!
//! Stage 2 never runs twice for a cached name, which bounds a federation to
//! one signing certificate per cold run.

mod orchestrator;

pub use orchestrator::FederationOrchestrator;
