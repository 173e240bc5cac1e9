//! YAML output, available with the `yaml` feature.
//!
//! Documents are rendered from their assembled JSON value, so YAML and JSON output always carry
//! the same keys in the same order.
//!
//! ```rust
//! use specmill_core::{Document, ToYaml};
//!
//! let mut doc = Document::new("Swagger Petstore", "1.0.0", "3.0.2")?;
//! doc.add_schema("Pet", serde_json::json!({"type": "object"}))?;
//!
//! assert!(doc.to_yaml()?.starts_with("openapi: 3.0.2"));
//! assert!(ToYaml::to_yaml(doc.components())?.starts_with("schemas:"));
//! # Ok::<(), specmill_core::Error>(())
//! ```

use serde_json::Value;

use crate::{ComponentKind, ComponentRegistry, Document};

/// Error raised by `serde-saphyr` when rendering YAML.
pub type YamlError = serde_saphyr::ser_error::Error;

/// OpenAPI values that can be rendered as YAML.
pub trait ToYaml {
    /// Renders `self` as a YAML string.
    ///
    /// # Errors
    ///
    /// Returns a [`YamlError`] if the value cannot be represented.
    fn to_yaml(&self) -> Result<String, YamlError>;
}

impl ToYaml for Value {
    fn to_yaml(&self) -> Result<String, YamlError> {
        serde_saphyr::to_string(self)
    }
}

impl ToYaml for Document {
    fn to_yaml(&self) -> Result<String, YamlError> {
        self.to_value().to_yaml()
    }
}

/// Renders the registered components by section name, as under OpenAPI 3 `components`.
impl ToYaml for ComponentRegistry {
    fn to_yaml(&self) -> Result<String, YamlError> {
        let sections = ComponentKind::ALL
            .into_iter()
            .filter(|kind| !self.is_empty(*kind))
            .map(|kind| (kind.section().to_string(), self.section_value(kind)))
            .collect();
        Value::Object(sections).to_yaml()
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use serde_json::json;

    use super::*;

    #[test]
    fn should_render_document_in_insertion_order() {
        let mut doc = Document::new("Swagger Petstore", "1.0.0", "3.0.2").expect("valid version");
        doc.add_schema("Pet", json!({"type": "object"}))
            .expect("schema");

        let yaml = doc.to_yaml().expect("should serialize to YAML");

        assert_snapshot!(yaml, @r"
        openapi: 3.0.2
        info:
          title: Swagger Petstore
          version: 1.0.0
        components:
          schemas:
            Pet:
              type: object
        paths: {}
        ");
    }

    #[test]
    fn should_render_registered_components_only() {
        let mut doc = Document::new("Swagger Petstore", "1.0.0", "2.0").expect("valid version");
        doc.add_schema("Pet", json!({"type": "object"}))
            .expect("schema");

        let yaml = ToYaml::to_yaml(doc.components()).expect("should serialize to YAML");

        assert_snapshot!(yaml, @r"
        schemas:
          Pet:
            type: object
        ");
    }
}
