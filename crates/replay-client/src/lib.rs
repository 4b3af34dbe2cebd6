//! Compute service client for the algorithm replay controllers.
//!
//! The compute service runs the algorithms; this crate only moves their
//! inputs and outputs across the wire.
//!
//! ```text
//! controller --> ComputeService --> HTTP (JSON) --> compute service
//! ```
//!
//! # Modules
//!
//! - [`service`] -- the [`ComputeService`] trait and endpoint catalogue
//! - [`http`] -- [`HttpComputeService`], the `reqwest` implementation
//! - [`error`] -- [`ComputeError`] classification of failed calls

pub mod error;
pub mod http;
pub mod service;

pub use error::ComputeError;
pub use http::{HealthStatus, HttpComputeService};
pub use service::{ComputeService, Endpoint};
