//! # ironic-core
//!
//! Core types and utilities for working with the OpenStack Bare Metal API.
//!
//! ## Modules
//!
//! - [`endpoint`] - Base endpoint parsing and request path normalization
//! - [`fault`] - Mapping of error responses to typed API errors
//! - [`fields`] - Field/label registry used for resource listings
//! - [`error`] - Crate-wide error type
//! - [`uuid`] - Strongly-typed UUID wrappers for API resources
//! - [`config`] - Client configuration
//! - [`client`] - HTTP client settings and retry policy
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fault;
pub mod fields;
pub mod query;
pub mod uuid;

// Re-export commonly used types
pub use endpoint::{connection_path, Endpoint};
pub use error::{Error, Result};
pub use fault::{ApiError, HttpErrorKind};
pub use fields::{Resource, ResourceKind};
