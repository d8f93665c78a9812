//! Observability for the bookmark service
//!
//! # Privacy by Default
//!
//! Instrumentation uses `#[instrument(skip_all)]` and explicit safe fields.
//! Tokens, passwords, cookie values and secrets never appear in logs or
//! metric labels. Member ids are logged only after successful authentication.

pub mod metrics;
