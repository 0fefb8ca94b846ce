//! Declarative resource management for Huawei Cloud LTS (Log Tank Service)
//!
//! The provider exposes log groups, streams, collection access configs,
//! transfers, alarm rules, log-to-metric rules, structuring templates and
//! cross-account converge configs as declarative resources with a
//! create/read/update/delete lifecycle, plus read-only data sources for
//! CCE access configs and dashboards.

pub mod api;
pub mod data_sources;
pub mod error;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod types;
mod utils;

pub use error::{ProviderError, Result};
pub use resource::{DataSource, Resource};
pub use schema::{
    AttributeBuilder, AttributeType, DataSourceSchema, NestedSchemaBuilder, ProviderSchema,
    ResourceSchema, SchemaBuilder,
};
pub use types::{Config, Diagnostic, Diagnostics, Dynamic, State};

use std::collections::HashMap;
use std::sync::OnceLock;

use api::Client;
use data_sources::cce_accesses::CceAccessesDataSource;
use data_sources::dashboards::DashboardsDataSource;
use resources::cce_access::CceAccessResource;
use resources::host_access::HostAccessResource;
use resources::keywords_alarm_rule::KeywordsAlarmRuleResource;
use resources::log_converge::LogConvergeResource;
use resources::log_group::LogGroupResource;
use resources::log_stream::LogStreamResource;
use resources::metric_rule::MetricRuleResource;
use resources::sql_alarm_rule::SqlAlarmRuleResource;
use resources::struct_template::StructTemplateResource;
use resources::transfer::TransferResource;

/// Provider entry point. Call [`LtsProvider::configure`] before creating
/// resources or data sources.
#[derive(Default)]
pub struct LtsProvider {
    client: Option<Client>,
    domain_id: Option<String>,
}

impl LtsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes accepted by [`LtsProvider::configure`]. Every setting
    /// also has a HUAWEICLOUD_* environment fallback, so none is required
    /// at the schema level.
    pub fn provider_schema() -> ProviderSchema {
        SchemaBuilder::new()
            .attribute(
                "region",
                AttributeBuilder::string("region")
                    .optional()
                    .description("Region used to derive the LTS endpoint"),
            )
            .attribute("project_id", AttributeBuilder::string("project_id").optional())
            .attribute(
                "token",
                AttributeBuilder::string("token").optional().sensitive(),
            )
            .attribute("domain_id", AttributeBuilder::string("domain_id").optional())
            .attribute(
                "endpoint",
                AttributeBuilder::string("endpoint")
                    .optional()
                    .description("Overrides the endpoint derived from the region"),
            )
            .attribute("insecure", AttributeBuilder::bool("insecure").optional())
            .build_provider(0)
    }

    /// Resolve connection settings from the configuration with
    /// HUAWEICLOUD_* environment variables as fallback, then build the
    /// API client. Problems are reported through the returned
    /// diagnostics rather than an error so all of them surface at once.
    pub fn configure(&mut self, config: Config) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let from_config_or_env = |name: &str, env: &str| {
            config
                .values
                .get(name)
                .and_then(|v| v.as_string())
                .map(|s| s.to_string())
                .or_else(|| std::env::var(env).ok())
        };

        let region = from_config_or_env("region", "HUAWEICLOUD_REGION");
        let project_id = from_config_or_env("project_id", "HUAWEICLOUD_PROJECT_ID");
        let token = from_config_or_env("token", "HUAWEICLOUD_TOKEN");
        let endpoint = from_config_or_env("endpoint", "HUAWEICLOUD_ENDPOINT");
        self.domain_id = from_config_or_env("domain_id", "HUAWEICLOUD_DOMAIN_ID");
        let insecure = config
            .values
            .get("insecure")
            .and_then(|v| v.as_bool())
            .or_else(|| {
                std::env::var("HUAWEICLOUD_INSECURE")
                    .ok()
                    .map(|v| v == "true" || v == "1")
            })
            .unwrap_or(false);

        let endpoint = match (endpoint, &region) {
            (Some(endpoint), _) => Some(endpoint),
            (None, Some(region)) => Some(format!("https://lts.{}.myhuaweicloud.com", region)),
            (None, None) => {
                diags.add_error(
                    "Missing endpoint",
                    Some("Set endpoint or region in the provider config, or HUAWEICLOUD_ENDPOINT / HUAWEICLOUD_REGION"),
                );
                None
            }
        };
        if project_id.is_none() {
            diags.add_error(
                "Missing project_id",
                Some("Set project_id in the provider config or HUAWEICLOUD_PROJECT_ID"),
            );
        }
        if token.is_none() {
            diags.add_error(
                "Missing token",
                Some("Set token in the provider config or HUAWEICLOUD_TOKEN"),
            );
        }

        let (endpoint, project_id, token) = match (endpoint, project_id, token) {
            (Some(endpoint), Some(project_id), Some(token)) => (endpoint, project_id, token),
            _ => return diags,
        };

        tracing::debug!("Configuring LTS provider for endpoint {}", endpoint);
        match Client::new(&endpoint, &project_id, &token, insecure) {
            Ok(client) => self.client = Some(client),
            Err(e) => diags.add_error("Failed to build API client", Some(e.to_string())),
        }
        diags
    }

    fn client(&self) -> Result<Client> {
        self.client.clone().ok_or(ProviderError::NotConfigured)
    }

    pub fn create_resource(&self, type_name: &str) -> Result<Box<dyn Resource>> {
        let client = self.client()?;
        match type_name {
            "huaweicloud_lts_group" => Ok(Box::new(LogGroupResource::new(client))),
            "huaweicloud_lts_stream" => Ok(Box::new(LogStreamResource::new(client))),
            "huaweicloud_lts_host_access" => Ok(Box::new(HostAccessResource::new(client))),
            "huaweicloud_lts_cce_access" => Ok(Box::new(CceAccessResource::new(client))),
            "huaweicloud_lts_transfer" => Ok(Box::new(TransferResource::new(client))),
            "huaweicloud_lts_keywords_alarm_rule" => Ok(Box::new(
                KeywordsAlarmRuleResource::new(client, self.domain_id.clone()),
            )),
            "huaweicloud_lts_sql_alarm_rule" => Ok(Box::new(SqlAlarmRuleResource::new(
                client,
                self.domain_id.clone(),
            ))),
            "huaweicloud_lts_metric_rule" => Ok(Box::new(MetricRuleResource::new(
                client,
                self.domain_id.clone(),
            ))),
            "huaweicloud_lts_log_converge" => Ok(Box::new(LogConvergeResource::new(client))),
            "huaweicloud_lts_struct_template" => {
                Ok(Box::new(StructTemplateResource::new(client)))
            }
            _ => Err(ProviderError::ResourceNotFound(type_name.to_string())),
        }
    }

    pub fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSource>> {
        let client = self.client()?;
        match type_name {
            "huaweicloud_lts_cce_accesses" => Ok(Box::new(CceAccessesDataSource::new(client))),
            "huaweicloud_lts_dashboards" => Ok(Box::new(DashboardsDataSource::new(client))),
            _ => Err(ProviderError::DataSourceNotFound(type_name.to_string())),
        }
    }

    pub fn resource_schemas() -> &'static HashMap<String, ResourceSchema> {
        static SCHEMAS: OnceLock<HashMap<String, ResourceSchema>> = OnceLock::new();
        SCHEMAS.get_or_init(|| {
            let mut schemas = HashMap::new();
            schemas.insert(
                "huaweicloud_lts_group".to_string(),
                LogGroupResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_stream".to_string(),
                LogStreamResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_host_access".to_string(),
                HostAccessResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_cce_access".to_string(),
                CceAccessResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_transfer".to_string(),
                TransferResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_keywords_alarm_rule".to_string(),
                KeywordsAlarmRuleResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_sql_alarm_rule".to_string(),
                SqlAlarmRuleResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_metric_rule".to_string(),
                MetricRuleResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_log_converge".to_string(),
                LogConvergeResource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_struct_template".to_string(),
                StructTemplateResource::schema_static(),
            );
            schemas
        })
    }

    pub fn data_source_schemas() -> &'static HashMap<String, DataSourceSchema> {
        static SCHEMAS: OnceLock<HashMap<String, DataSourceSchema>> = OnceLock::new();
        SCHEMAS.get_or_init(|| {
            let mut schemas = HashMap::new();
            schemas.insert(
                "huaweicloud_lts_cce_accesses".to_string(),
                CceAccessesDataSource::schema_static(),
            );
            schemas.insert(
                "huaweicloud_lts_dashboards".to_string(),
                DashboardsDataSource::schema_static(),
            );
            schemas
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn configured_values() -> HashMap<String, Dynamic> {
        let mut values = HashMap::new();
        values.insert(
            "region".to_string(),
            Dynamic::String("cn-north-4".to_string()),
        );
        values.insert(
            "project_id".to_string(),
            Dynamic::String("project-1".to_string()),
        );
        values.insert("token".to_string(), Dynamic::String("token-1".to_string()));
        values
    }

    #[test]
    #[serial]
    fn provider_configures_from_config_values() {
        let mut provider = LtsProvider::new();
        let diags = provider.configure(Config {
            values: configured_values(),
        });
        assert!(diags.errors.is_empty());
        assert!(provider.client.is_some());
    }

    #[test]
    #[serial]
    fn provider_reports_all_missing_settings() {
        std::env::remove_var("HUAWEICLOUD_REGION");
        std::env::remove_var("HUAWEICLOUD_ENDPOINT");
        std::env::remove_var("HUAWEICLOUD_PROJECT_ID");
        std::env::remove_var("HUAWEICLOUD_TOKEN");

        let mut provider = LtsProvider::new();
        let diags = provider.configure(Config::new());
        assert_eq!(diags.errors.len(), 3);
        assert!(provider.client.is_none());
    }

    #[test]
    #[serial]
    fn provider_falls_back_to_environment() {
        std::env::set_var("HUAWEICLOUD_ENDPOINT", "https://lts.example.com");
        std::env::set_var("HUAWEICLOUD_PROJECT_ID", "project-env");
        std::env::set_var("HUAWEICLOUD_TOKEN", "token-env");

        let mut provider = LtsProvider::new();
        let diags = provider.configure(Config::new());
        assert!(diags.errors.is_empty());
        assert!(provider.client.is_some());

        std::env::remove_var("HUAWEICLOUD_ENDPOINT");
        std::env::remove_var("HUAWEICLOUD_PROJECT_ID");
        std::env::remove_var("HUAWEICLOUD_TOKEN");
    }

    #[test]
    #[serial]
    fn provider_requires_configuration_before_use() {
        let provider = LtsProvider::new();
        let err = provider.create_resource("huaweicloud_lts_group").unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[test]
    #[serial]
    fn provider_rejects_unknown_type_names() {
        let mut provider = LtsProvider::new();
        provider.configure(Config {
            values: configured_values(),
        });

        let err = provider.create_resource("huaweicloud_lts_unknown").unwrap_err();
        assert!(matches!(err, ProviderError::ResourceNotFound(_)));
        let err = provider
            .create_data_source("huaweicloud_lts_unknown")
            .unwrap_err();
        assert!(matches!(err, ProviderError::DataSourceNotFound(_)));
    }

    #[test]
    fn provider_schema_keeps_token_hidden() {
        let schema = LtsProvider::provider_schema();
        assert!(schema.attributes["token"].sensitive);
        assert!(!schema.attributes["region"].sensitive);
        assert!(schema.attributes["insecure"].optional);
    }

    #[test]
    fn schema_maps_cover_every_type() {
        assert_eq!(LtsProvider::resource_schemas().len(), 10);
        assert_eq!(LtsProvider::data_source_schemas().len(), 2);
        assert!(LtsProvider::resource_schemas().contains_key("huaweicloud_lts_transfer"));
        assert!(LtsProvider::data_source_schemas().contains_key("huaweicloud_lts_dashboards"));
    }
}
