use crate::registry::ComponentKind;

/// Boxed error returned by plugin hooks.
///
/// Hook errors are carried to the caller unchanged inside [`Error::Plugin`].
pub type PluginError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building a document.
///
/// Every variant describes a programming error in the input (bad shapes, naming collisions)
/// rather than a transient condition: retrying the same call with the same input fails the same way.
/// A call that returns an error leaves the [`Document`](crate::Document) exactly as it was before the call.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum Error {
    /// The requested OpenAPI version cannot be parsed or is not a supported major version.
    #[display("Not a valid OpenAPI version number: {version:?}")]
    #[from(skip)]
    InvalidVersion {
        /// The rejected version string.
        version: String,
    },

    /// A component name is already taken within its kind.
    #[display("Another {kind} component with name {name:?} is already registered")]
    #[from(skip)]
    DuplicateComponentName {
        /// The component kind.
        kind: ComponentKind,
        /// The colliding name.
        name: String,
    },

    /// A component was registered without a name.
    #[display("A {kind} component name must not be empty")]
    #[from(skip)]
    EmptyComponentName {
        /// The component kind.
        kind: ComponentKind,
    },

    /// An HTTP method is already present on a path.
    #[display("Operation {method} is already registered for path {path:?}")]
    #[from(skip)]
    DuplicateOperation {
        /// The path template.
        path: String,
        /// The lower-cased HTTP method.
        method: String,
    },

    /// Two parameters of the same scope share the same name and location.
    #[display("Duplicate parameter with name {name:?} and location {location:?}")]
    #[from(skip)]
    DuplicateParameter {
        /// The parameter name.
        name: String,
        /// The parameter location (`in`).
        location: String,
    },

    /// A parameter lacks its `name` or `in` key after all hooks ran.
    #[display("Missing keys {missing:?} for parameter")]
    #[from(skip)]
    InvalidParameter {
        /// The missing keys.
        missing: Vec<&'static str>,
    },

    /// A `parameters` entry is not a list.
    #[display("Expected a list of parameters, got: {value}")]
    #[from(skip)]
    InvalidParameterList {
        /// The offending value.
        value: serde_json::Value,
    },

    /// A cyclic object graph was encountered without a component name to break the cycle.
    #[display(
        "Object {type_name} is part of a chain of circular references but no plugin assigned it a component name"
    )]
    #[from(skip)]
    CircularReference {
        /// Type name of the application object.
        type_name: &'static str,
    },

    /// The component kind has no section in the active OpenAPI version.
    #[display("{kind} components are not supported by OpenAPI {version}")]
    #[from(skip)]
    UnsupportedComponent {
        /// The component kind.
        kind: ComponentKind,
        /// The OpenAPI version.
        version: String,
    },

    /// One or more operation keys are not HTTP methods of the active OpenAPI version.
    #[display("One or more HTTP methods are invalid: {methods:?}")]
    #[from(skip)]
    InvalidHttpMethod {
        /// The rejected keys.
        methods: Vec<String>,
    },

    /// No path template was supplied, neither by the caller nor by a path hook.
    #[display("Path template is not specified")]
    #[from(skip)]
    MissingPathTemplate,

    /// A fragment that must be a mapping resolved to something else.
    #[display("Expected a mapping for {context}, got: {value}")]
    #[from(skip)]
    InvalidComponentBody {
        /// Where the fragment was used.
        context: String,
        /// The offending value.
        value: serde_json::Value,
    },

    /// No plugin converted an application object into a fragment.
    #[display("No plugin can convert object of type {type_name}")]
    #[from(skip)]
    UnsupportedObject {
        /// Type name of the application object.
        type_name: &'static str,
    },

    /// A tag has no string `name`.
    #[display("Tag is missing a string 'name': {tag}")]
    #[from(skip)]
    InvalidTag {
        /// The rejected tag.
        tag: serde_json::Value,
    },

    /// An error returned by a plugin hook.
    #[display("Plugin {plugin} failed: {source}")]
    #[from(skip)]
    Plugin {
        /// The plugin name.
        plugin: String,
        /// The error as returned by the hook.
        source: PluginError,
    },

    /// JSON serialization failure.
    Json(serde_json::Error),

    /// YAML serialization failure.
    #[cfg(feature = "yaml")]
    Yaml(crate::yaml::YamlError),
}

impl Error {
    pub(crate) fn invalid_body(context: impl Into<String>, value: serde_json::Value) -> Self {
        Self::InvalidComponentBody {
            context: context.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_duplicate_component_name() {
        let error = Error::DuplicateComponentName {
            kind: ComponentKind::Schema,
            name: "Pet".to_string(),
        };

        insta::assert_snapshot!(error, @r#"Another schema component with name "Pet" is already registered"#);
    }

    #[test]
    fn should_display_duplicate_parameter() {
        let error = Error::DuplicateParameter {
            name: "id".to_string(),
            location: "query".to_string(),
        };

        insta::assert_snapshot!(error, @r#"Duplicate parameter with name "id" and location "query""#);
    }

    #[test]
    fn should_keep_plugin_error_as_source() {
        let error = Error::Plugin {
            plugin: "Models".to_string(),
            source: "boom".into(),
        };

        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("boom"));
    }
}
