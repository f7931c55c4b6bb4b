//! Service layer for dependency injection
//!
//! - `ClientFactory`: builds the outbound clients from configuration
//! - `AppServices`: the container shared by the HTTP handlers and the CLI

pub mod client_factory;
pub mod container;

pub use client_factory::ClientFactory;
pub use container::{AppServices, HealthReport};
