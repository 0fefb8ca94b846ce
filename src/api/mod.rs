//! HTTP client and typed request/response models for the LTS REST API
//!
//! Each submodule owns the wire structs for one resource family and adds
//! the matching operations to [`Client`] the same way, so every CRUD
//! orchestrator talks to the API through typed bodies only.

pub mod access;
pub mod alarms;
pub mod client;
pub mod converge;
pub mod dashboards;
pub mod error;
pub mod groups;
pub mod metric_rules;
pub mod query;
pub mod streams;
pub mod templates;
pub mod transfers;

pub use client::Client;
pub use error::ApiError;

use serde::{Deserialize, Serialize};

/// Key/value tag attached to a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}
