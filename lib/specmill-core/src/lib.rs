//! # Specmill Core
//!
//! Build OpenAPI 2 and 3 documents incrementally, with plugins turning your application's
//! own types into schemas, parameters and operations.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use specmill_core::{Component, Document, Fragment};
//!
//! let mut doc = Document::builder()
//!     .with_title("Swagger Petstore")
//!     .with_version("1.0.0")
//!     .with_openapi_version("3.0.2")
//!     .build()?;
//!
//! doc.add_schema("Pet", json!({"type": "object"}))?
//!     .add_parameter("PetId", "path", json!({"schema": {"type": "integer"}}))?
//!     .add_response("NotFound", Component::new(json!({"description": "Not found"})).lazy())?;
//!
//! doc.add_path(
//!     "/pets/{petId}",
//!     Fragment::map().with(
//!         "get",
//!         Fragment::map()
//!             .with("parameters", vec![Fragment::from("PetId")])
//!             .with(
//!                 "responses",
//!                 Fragment::map()
//!                     .with("200", Fragment::map().with("schema", Fragment::schema_ref("Pet")))
//!                     .with("404", Fragment::reference(specmill_core::ComponentKind::Response, "NotFound")),
//!             ),
//!     ),
//! )?;
//!
//! let value = doc.to_value();
//! assert_eq!(
//!     value["paths"]["/pets/{petId}"]["get"]["parameters"][0],
//!     json!({"$ref": "#/components/parameters/PetId"})
//! );
//! assert!(value["components"]["responses"]["NotFound"].is_object());
//! # Ok::<(), specmill_core::Error>(())
//! ```
//!
//! ## Application objects
//!
//! Anything wrapped in an [`AppObject`] can be placed in a [`Fragment`].
//! During resolution the [`Plugin`]s name and convert it; named objects are registered once as
//! schema components and referenced everywhere else, keyed by identity.
//!
//! ## Versions
//!
//! [`VersionPolicy`] holds everything that differs between OpenAPI 2 and 3: the version key,
//! the component sections, `$ref` prefixes, the HTTP methods and whether parameters may carry
//! an inline schema.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Error`]. A failed call leaves the [`Document`] unchanged.
//!
//! ## Features
//!
//! - `yaml`: adds [`Document::to_yaml`] and the [`ToYaml`] trait.

mod document;
mod error;
mod fragment;
mod merge;
mod plugin;
mod registry;
mod resolver;
mod version;

#[cfg(feature = "yaml")]
mod yaml;

pub use self::document::{Component, Document, DocumentBuilder, PathDefinition};
pub use self::error::{Error, PluginError};
pub use self::fragment::{AppObject, ComponentRef, Fragment, FragmentMap, ObjectId};
pub use self::plugin::{
    Hook, HookContext, HookOptions, PathContribution, PathInput, Plugin, PluginChain,
};
pub use self::registry::{ComponentKind, ComponentRegistry};
pub use self::version::{MajorVersion, VersionPolicy};
#[cfg(feature = "yaml")]
pub use self::yaml::{ToYaml, YamlError};

/// A JSON object with insertion order preserved.
pub type Body = serde_json::Map<String, serde_json::Value>;
