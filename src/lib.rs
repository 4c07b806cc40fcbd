//! # deployhub
//!
//! Server composition for DeployHub. [`bootstrap::assemble`] wires the
//! storage engine, gateway generator, services, queue consumer and expiry
//! job on top of whichever persistence and queue backends the caller
//! provides; the `deployhub-server` binary feeds it PostgreSQL and the
//! configured queue.

pub mod bootstrap;

pub use bootstrap::{Components, assemble};
