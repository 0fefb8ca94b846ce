//! Read-only data sources

pub mod cce_accesses;
pub mod dashboards;
