use std::collections::HashMap;

use crate::api::Client;
use crate::schema::{AttributeBuilder, AttributeType, DataSourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::DataSource;

/// Lists dashboards, walking the marker-paginated listing to the end.
/// Name and group filters are applied client side.
pub struct DashboardsDataSource {
    client: Client,
}

impl DashboardsDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .attribute("name", AttributeBuilder::string("name").optional())
            .attribute(
                "group_name",
                AttributeBuilder::string("group_name").optional(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute(
                "dashboards",
                AttributeBuilder::list("dashboards", AttributeType::Object).computed(),
            )
            .build_data_source(0)
    }
}

impl DataSource for DashboardsDataSource {
    fn schema(&self) -> DataSourceSchema {
        Self::schema_static()
    }

    fn read(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let client = self.client.clone();
        let dashboards = block_on(async move { client.list_dashboards().await })
            .map_err(|e| format!("Failed to list dashboards: {}", e))?;

        let name_filter = config.values.get("name").and_then(|v| v.as_string());
        let group_filter = config.values.get("group_name").and_then(|v| v.as_string());

        let entries: Vec<Dynamic> = dashboards
            .iter()
            .filter(|d| match name_filter {
                Some(name) => d.title.as_deref() == Some(name),
                None => true,
            })
            .filter(|d| match group_filter {
                Some(group) => d.group_name.as_deref() == Some(group),
                None => true,
            })
            .map(|dashboard| {
                let mut entry = HashMap::new();
                entry.insert("id".to_string(), Dynamic::String(dashboard.id.clone()));
                if let Some(title) = &dashboard.title {
                    entry.insert("name".to_string(), Dynamic::String(title.clone()));
                }
                if let Some(group) = &dashboard.group_name {
                    entry.insert("group_name".to_string(), Dynamic::String(group.clone()));
                }
                if let Some(updated) = dashboard
                    .last_update_time
                    .and_then(format_timestamp_rfc3339)
                {
                    entry.insert("updated_at".to_string(), Dynamic::String(updated));
                }
                Dynamic::Map(entry)
            })
            .collect();

        let mut values = config.values;
        values.insert(
            "id".to_string(),
            Dynamic::String(self.client.project_id().to_string()),
        );
        values.insert("dashboards".to_string(), Dynamic::List(entries));
        Ok((State { values }, diags))
    }
}
