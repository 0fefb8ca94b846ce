//! Resource and data source traits
//!
//! Resources implement the CRUD lifecycle against the remote API. `read`
//! returns `None` when the remote resource no longer exists so the caller
//! has a single outcome to reconcile, regardless of whether the API
//! signalled that with a 404, a service-specific error code or an empty
//! listing.

use crate::schema::{DataSourceSchema, ResourceSchema};
use crate::types::{Config, Diagnostics, State};
use crate::Result;

pub trait Resource: Send + Sync {
    fn schema(&self) -> ResourceSchema;

    /// Create the remote resource and return the full initial state,
    /// including server-assigned attributes
    fn create(&self, config: Config) -> Result<(State, Diagnostics)>;

    /// Read the current remote state; `None` means the resource is gone
    fn read(&self, state: State) -> Result<(Option<State>, Diagnostics)>;

    /// Apply configuration changes to the remote resource
    fn update(&self, state: State, config: Config) -> Result<(State, Diagnostics)>;

    /// Remove the remote resource
    fn delete(&self, state: State) -> Result<Diagnostics>;
}

impl std::fmt::Debug for dyn Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Resource")
    }
}

pub trait DataSource: Send + Sync {
    fn schema(&self) -> DataSourceSchema;

    /// Query the remote API and return the resulting state
    fn read(&self, config: Config) -> Result<(State, Diagnostics)>;
}

impl std::fmt::Debug for dyn DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataSource")
    }
}
