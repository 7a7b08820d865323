//! Tidepool Worker
//!
//! A long-running job worker that polls the central dispatch API, claims
//! assignments for its configured job types, runs the matching typed
//! handler, uploads result artifacts to the object store, and reports the
//! outcome. The worker shuts itself down after a configurable idle period
//! so autoscaled fleets can drain naturally.
//!
//! Architecture:
//! - Configuration: environment-derived [`config::WorkerConfig`]
//! - API surface: [`api::JobApi`] over the authenticated client
//! - Dispatch: [`registry::HandlerRegistry`] mapping job types to handlers
//! - Caching: content-addressed artifacts under the cache directory
//! - Runtime: the polling/claim/report state machine in [`runtime`]

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod regional;
pub mod registry;
pub mod runtime;
pub mod storage;

#[cfg(test)]
pub(crate) mod testutil;
