//! Schema types and builders
//!
//! Every resource and data source describes its accepted and computed
//! attributes with these types. Nested blocks (lists of objects, usually
//! capped at one element) carry their own attribute set via
//! [`NestedSchema`].

use std::collections::HashMap;

/// AttributeType defines the type of a single attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    /// Ordered list of a single element type
    List(Box<AttributeType>),
    /// String-keyed map of a single element type
    Map(Box<AttributeType>),
    /// Nested object; the structure lives in `Attribute::element`
    Object,
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Attribute set for list-of-object blocks
    pub element: Option<NestedSchema>,
    /// Maximum number of elements for list blocks (1 for single blocks)
    pub max_items: Option<usize>,
}

/// NestedSchema describes the attributes of a nested block
#[derive(Debug, Clone, Default)]
pub struct NestedSchema {
    pub attributes: HashMap<String, Attribute>,
}

/// Schema of the provider configuration block
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
}

/// Schema of a managed resource
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
}

/// Schema of a read-only data source
#[derive(Debug, Clone)]
pub struct DataSourceSchema {
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
}

/// Fluent builder for a single attribute
#[derive(Debug, Clone)]
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                element: None,
                max_items: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn list(name: &str, element_type: AttributeType) -> Self {
        Self::new(name, AttributeType::List(Box::new(element_type)))
    }

    pub fn map(name: &str, element_type: AttributeType) -> Self {
        Self::new(name, AttributeType::Map(Box::new(element_type)))
    }

    /// A list-of-objects block with its own attribute set
    pub fn block(name: &str, element: NestedSchema) -> Self {
        let mut builder = Self::new(name, AttributeType::List(Box::new(AttributeType::Object)));
        builder.attribute.element = Some(element);
        builder
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.attribute.max_items = Some(max);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.attribute.description = description.to_string();
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Fluent builder for resource and data source schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    attributes: HashMap<String, Attribute>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: &str, builder: AttributeBuilder) -> Self {
        self.attributes.insert(name.to_string(), builder.build());
        self
    }

    pub fn build_provider(self, version: i64) -> ProviderSchema {
        ProviderSchema {
            version,
            attributes: self.attributes,
        }
    }

    pub fn build_resource(self, version: i64) -> ResourceSchema {
        ResourceSchema {
            version,
            attributes: self.attributes,
        }
    }

    pub fn build_data_source(self, version: i64) -> DataSourceSchema {
        DataSourceSchema {
            version,
            attributes: self.attributes,
        }
    }
}

/// Builder for the attribute set of a nested block
#[derive(Debug, Clone, Default)]
pub struct NestedSchemaBuilder {
    attributes: HashMap<String, Attribute>,
}

impl NestedSchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: &str, builder: AttributeBuilder) -> Self {
        self.attributes.insert(name.to_string(), builder.build());
        self
    }

    pub fn build(self) -> NestedSchema {
        NestedSchema {
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_attribute_flags() {
        let schema = SchemaBuilder::new()
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .force_new()
                    .description("Resource name"),
            )
            .attribute("ttl_in_days", AttributeBuilder::number("ttl_in_days").optional())
            .attribute("id", AttributeBuilder::string("id").computed())
            .build_resource(0);

        assert!(schema.attributes["name"].required);
        assert!(schema.attributes["name"].force_new);
        assert!(schema.attributes["ttl_in_days"].optional);
        assert!(schema.attributes["id"].computed);
    }

    #[test]
    fn block_attribute_carries_nested_schema() {
        let nested = NestedSchemaBuilder::new()
            .attribute("mode", AttributeBuilder::string("mode").required())
            .build();
        let attribute = AttributeBuilder::block("single_log_format", nested)
            .optional()
            .max_items(1)
            .build();

        assert_eq!(attribute.max_items, Some(1));
        assert!(attribute
            .element
            .as_ref()
            .unwrap()
            .attributes
            .contains_key("mode"));
    }
}
