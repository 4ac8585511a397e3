//! Bare Metal (Ironic) API client and data models.
//!
//! This crate exposes strongly typed structures and an asynchronous HTTP client for
//! managing nodes, ports, chassis and drivers through the OpenStack Bare Metal API.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{IronicClient, IronicClientBuilder, API_VERSION_HEADER};
pub use models::{
    Chassis, CreatePortRequest, Driver, ListOptions, Node, NodeIdent, NodeListParams, PatchOp,
    PatchOperation, Port, PortListParams, SortDir,
};

/// Convenient result alias matching the shared Ironic error type.
pub type Result<T> = ironic_core::Result<T>;
