use serde_json::Value;

use super::{Document, State};
use crate::merge::deep_merge;
use crate::plugin::{Plugin, PluginChain};
use crate::version::VersionPolicy;
use crate::{Body, Error};

/// The OpenAPI version used when none is given.
const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

/// Builder for [`Document`].
///
/// # Default Configuration
///
/// - **Title** and **version**: empty
/// - **OpenAPI version**: `3.0.3`
/// - **Info**, **options** and **plugins**: empty
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use specmill_core::Document;
///
/// let doc = Document::builder()
///     .with_title("Swagger Petstore")
///     .with_version("1.0.0")
///     .with_openapi_version("2.0")
///     .with_info(json!({"description": "A sample API"}))
///     .with_option("host", json!("petstore.swagger.io"))
///     .build()?;
///
/// let value = doc.to_value();
/// assert_eq!(value["swagger"], "2.0");
/// assert_eq!(value["info"]["description"], "A sample API");
/// assert_eq!(value["host"], "petstore.swagger.io");
/// # Ok::<(), specmill_core::Error>(())
/// ```
#[derive(Debug)]
pub struct DocumentBuilder {
    title: String,
    version: String,
    openapi_version: String,
    info: Body,
    options: Body,
    plugins: PluginChain,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self {
            title: String::new(),
            version: String::new(),
            openapi_version: DEFAULT_OPENAPI_VERSION.to_string(),
            info: Body::new(),
            options: Body::new(),
            plugins: PluginChain::default(),
        }
    }
}

impl DocumentBuilder {
    /// Builds the document and initializes every plugin with its version policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when the OpenAPI version is unparseable or
    /// outside `2.0 <= version < 4.0`.
    pub fn build(self) -> Result<Document, Error> {
        let Self {
            title,
            version,
            openapi_version,
            info,
            options,
            mut plugins,
        } = self;

        let policy = VersionPolicy::parse(&openapi_version)?;
        plugins.init(&policy);
        tracing::debug!(%title, %policy, plugins = plugins.len(), "document created");

        Ok(Document {
            title,
            version,
            policy,
            info,
            options,
            plugins,
            state: State::default(),
        })
    }

    /// Sets the API title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the API version, as shown in `info.version`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the OpenAPI version (`2.0`, `3.0.2`, `3.1.0`, ...).
    ///
    /// The version is validated by [`DocumentBuilder::build`].
    #[must_use]
    pub fn with_openapi_version(mut self, openapi_version: impl Into<String>) -> Self {
        self.openapi_version = openapi_version.into();
        self
    }

    /// Adds extra `info` fields (`description`, `contact`, `license`, ...).
    ///
    /// Fields are merged over `title` and `version`; a non-mapping value is ignored.
    #[must_use]
    pub fn with_info(mut self, info: Value) -> Self {
        if let Value::Object(info) = info {
            deep_merge(&mut self.info, info);
        } else {
            tracing::warn!(?info, "ignoring info that is not a mapping");
        }
        self
    }

    /// Adds a top-level key (`servers`, `host`, `security`, ...), deep-merged over the
    /// generated document.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        let mut option = Body::new();
        option.insert(key.into(), value);
        deep_merge(&mut self.options, option);
        self
    }

    /// Adds several top-level keys at once; see [`DocumentBuilder::with_option`].
    #[must_use]
    pub fn with_options(mut self, options: Body) -> Self {
        deep_merge(&mut self.options, options);
        self
    }

    /// Appends a plugin; hooks run in the order plugins are added.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(plugin);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        policy: Option<String>,
    }

    impl Plugin for Recorder {
        fn init(&mut self, policy: &VersionPolicy) {
            self.policy = Some(policy.to_string());
        }
    }

    #[test]
    fn should_default_to_openapi_3() {
        let doc = Document::builder().build().expect("valid default");

        assert_eq!(doc.policy().to_string(), "3.0.3");
    }

    #[test]
    fn should_reject_unsupported_version() {
        let result = Document::builder().with_openapi_version("4.0.0").build();

        assert!(matches!(result, Err(Error::InvalidVersion { .. })));
    }

    #[test]
    fn should_init_plugins() {
        let doc = Document::builder()
            .with_openapi_version("2.0")
            .with_plugin(Recorder::default())
            .build()
            .expect("valid");

        insta::assert_debug_snapshot!(doc.plugins, @r#"
        PluginChain {
            plugins: [
                Recorder {
                    policy: Some(
                        "2.0",
                    ),
                },
            ],
        }
        "#);
    }

    #[test]
    fn should_merge_options() {
        let doc = Document::builder()
            .with_option("servers", json!([{"url": "https://example.com"}]))
            .with_option("x-meta", json!({"a": 1}))
            .with_option("x-meta", json!({"b": 2}))
            .build()
            .expect("valid");

        assert_eq!(
            Value::Object(doc.options),
            json!({"servers": [{"url": "https://example.com"}], "x-meta": {"a": 1, "b": 2}})
        );
    }
}
