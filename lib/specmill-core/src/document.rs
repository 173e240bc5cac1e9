//! The document aggregate.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::fragment::{AppObject, Fragment, FragmentMap};
use crate::merge::{deep_merge, merge_missing};
use crate::plugin::{Hook, HookContext, PathInput, PluginChain};
use crate::registry::{ComponentKind, ComponentRegistry};
use crate::resolver::{IdentityTable, Resolver};
use crate::version::{MajorVersion, VersionPolicy};
use crate::{Body, Error};

mod builder;
mod component;
mod path;
mod shorthand;

pub use self::builder::DocumentBuilder;
pub use self::component::Component;
pub use self::path::PathDefinition;
use self::component::apply_parameter_defaults;
use self::path::{check_parameters, is_method, normalize_methods};

/// The mutable part of a document; cloned to stage every mutating call.
///
/// Clones share their collections and copy a collection, or a single body, on first write.
#[derive(Debug, Clone, Default)]
struct State {
    registry: ComponentRegistry,
    identities: IdentityTable,
    paths: Arc<IndexMap<String, Arc<Body>>>,
    tags: Arc<Vec<Body>>,
}

/// An OpenAPI document under construction.
///
/// Components and paths are added incrementally; each call runs the matching plugin hooks,
/// resolves references in the resulting fragment and stores it. A call either fully succeeds
/// or returns an error and leaves the document unchanged.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use specmill_core::{Document, Fragment};
///
/// let mut doc = Document::builder()
///     .with_title("Swagger Petstore")
///     .with_version("1.0.0")
///     .with_openapi_version("3.0.2")
///     .build()?;
///
/// doc.add_schema("Pet", json!({"properties": {"name": {"type": "string"}}}))?;
/// doc.add_path(
///     "/pets",
///     Fragment::map().with(
///         "get",
///         Fragment::from(json!({"responses": {"200": {"description": "A pet"}}})),
///     ),
/// )?;
///
/// let value = doc.to_value();
/// assert_eq!(value["openapi"], "3.0.2");
/// assert!(value["components"]["schemas"]["Pet"].is_object());
/// # Ok::<(), specmill_core::Error>(())
/// ```
#[derive(Debug)]
pub struct Document {
    title: String,
    version: String,
    policy: VersionPolicy,
    info: Body,
    options: Body,
    plugins: PluginChain,
    state: State,
}

impl Document {
    /// Starts building a document.
    #[must_use]
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Creates a document without plugins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when `openapi_version` is not supported.
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        openapi_version: &str,
    ) -> Result<Self, Error> {
        Self::builder()
            .with_title(title)
            .with_version(version)
            .with_openapi_version(openapi_version)
            .build()
    }

    /// The API title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The API version (not the OpenAPI version).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The OpenAPI version policy.
    #[must_use]
    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// The registered components.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.state.registry
    }

    /// The path items, in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &Body)> {
        self.state
            .paths
            .iter()
            .map(|(path, item)| (path.as_str(), &**item))
    }

    /// The path item of a path template.
    #[must_use]
    pub fn path(&self, path: &str) -> Option<&Body> {
        self.state.paths.get(path).map(|item| &**item)
    }

    /// The tags, in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[Body] {
        &self.state.tags
    }

    /// The component name assigned to an application object, if any.
    #[must_use]
    pub fn component_name_of(&self, object: &AppObject) -> Option<&str> {
        self.state.identities.name_of(object)
    }

    /// Adds a schema component.
    ///
    /// Under OpenAPI 3 adding a name that already exists deep-merges the new body into the
    /// existing one; under OpenAPI 2 it is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateComponentName`] (OpenAPI 2 only), any error raised while
    /// resolving the body, or a plugin error.
    pub fn add_schema(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Result<&mut Self, Error> {
        self.add_component(ComponentKind::Schema, name.into(), component.into(), None)
    }

    /// Adds a parameter component located in `location` (`query`, `path`, `header`, ...).
    ///
    /// The body's `name` defaults to the component name, `in` is set to `location`, and path
    /// parameters are marked `required`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateComponentName`] when the name is taken, any error raised while
    /// resolving the body, or a plugin error.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        location: &str,
        component: impl Into<Component>,
    ) -> Result<&mut Self, Error> {
        self.add_component(
            ComponentKind::Parameter,
            name.into(),
            component.into(),
            Some(location),
        )
    }

    /// Adds a response component.
    ///
    /// # Errors
    ///
    /// Same as [`Document::add_parameter`].
    pub fn add_response(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Result<&mut Self, Error> {
        self.add_component(ComponentKind::Response, name.into(), component.into(), None)
    }

    /// Adds an example component (OpenAPI 3 only).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedComponent`] under OpenAPI 2, otherwise same as
    /// [`Document::add_parameter`].
    pub fn add_example(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Result<&mut Self, Error> {
        self.add_component(ComponentKind::Example, name.into(), component.into(), None)
    }

    /// Adds a security scheme component.
    ///
    /// # Errors
    ///
    /// Same as [`Document::add_parameter`].
    pub fn add_security_scheme(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Result<&mut Self, Error> {
        self.add_component(ComponentKind::SecurityScheme, name.into(), component.into(), None)
    }

    /// Adds a header component (OpenAPI 3 only).
    ///
    /// # Errors
    ///
    /// Same as [`Document::add_example`].
    pub fn add_header(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Result<&mut Self, Error> {
        self.add_component(ComponentKind::Header, name.into(), component.into(), None)
    }

    /// Adds operations to a path template.
    ///
    /// `operations` maps HTTP methods to operation objects.
    /// Use [`Document::add_path_definition`] for path-level fields or view objects.
    ///
    /// # Errors
    ///
    /// See [`Document::add_path_definition`].
    pub fn add_path(
        &mut self,
        path: impl Into<String>,
        operations: impl Into<Fragment>,
    ) -> Result<&mut Self, Error> {
        let definition = PathDefinition::new(path).with_operations(operations.into())?;
        self.add_path_definition(definition)
    }

    /// Adds a path item.
    ///
    /// Path hooks run first and may supply the template, operations and path-level parameters.
    /// Operation hooks then mutate the operations. Method keys are lower-cased and validated,
    /// references are resolved, and parameters are checked. Adding a method that the path
    /// already has is rejected; other methods are appended, and so are path-level parameters.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPathTemplate`] when neither the caller nor a hook gives a template
    /// - [`Error::InvalidHttpMethod`] for unknown method keys
    /// - [`Error::InvalidParameterList`], [`Error::InvalidParameter`] or
    ///   [`Error::DuplicateParameter`] for bad parameter lists
    /// - [`Error::DuplicateOperation`] when a method is already present on the path
    /// - any resolution or plugin error
    pub fn add_path_definition(&mut self, definition: PathDefinition) -> Result<&mut Self, Error> {
        self.transaction(|session| session.add_path(definition))?;
        Ok(self)
    }

    /// Adds a tag; a tag whose name is already present is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] when the tag is not a mapping with a string `name`.
    pub fn add_tag(&mut self, tag: Value) -> Result<&mut Self, Error> {
        let Value::Object(tag) = tag else {
            return Err(Error::InvalidTag { tag });
        };
        let Some(name) = tag.get("name").and_then(Value::as_str) else {
            return Err(Error::InvalidTag {
                tag: Value::Object(tag),
            });
        };

        let exists = self
            .state
            .tags
            .iter()
            .any(|existing| existing.get("name").and_then(Value::as_str) == Some(name));
        if exists {
            tracing::debug!(%name, "tag already present");
        } else {
            tracing::debug!(%name, "add tag");
            Arc::make_mut(&mut self.state.tags).push(tag);
        }
        Ok(self)
    }

    /// Resolves a fragment against the document, registering any named object it contains.
    ///
    /// # Errors
    ///
    /// Any resolution or plugin error; the document is unchanged on error.
    pub fn resolve(&mut self, fragment: impl Into<Fragment>) -> Result<Value, Error> {
        let fragment = fragment.into();
        self.transaction(|session| session.resolver().resolve(fragment))
    }

    /// Assembles the document as a JSON value.
    ///
    /// Under OpenAPI 2 the `definitions`, `parameters`, `paths` and `tags` keys are always
    /// present; under OpenAPI 3 empty `components` and `tags` are omitted.
    /// Extra options are deep-merged last.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut doc = Body::new();
        doc.insert(
            self.policy.version_key().to_string(),
            Value::String(self.policy.to_string()),
        );

        let mut info = Body::new();
        info.insert("title".to_string(), Value::String(self.title.clone()));
        info.insert("version".to_string(), Value::String(self.version.clone()));
        deep_merge(&mut info, self.info.clone());
        doc.insert("info".to_string(), Value::Object(info));

        let registry = &self.state.registry;
        match self.policy.major() {
            MajorVersion::V2 => {
                for kind in ComponentKind::ALL {
                    let always = matches!(kind, ComponentKind::Schema | ComponentKind::Parameter);
                    if let Some(section) = self.policy.section_name(kind)
                        && (always || !registry.is_empty(kind))
                    {
                        doc.insert(section.to_string(), registry.section_value(kind));
                    }
                }
            }
            MajorVersion::V3 => {
                let mut components = Body::new();
                for kind in ComponentKind::ALL {
                    if let Some(section) = self.policy.section_name(kind)
                        && !registry.is_empty(kind)
                    {
                        components.insert(section.to_string(), registry.section_value(kind));
                    }
                }
                if !components.is_empty() {
                    doc.insert("components".to_string(), Value::Object(components));
                }
            }
        }

        let paths = self
            .state
            .paths
            .iter()
            .map(|(path, item)| (path.clone(), Value::Object(Body::clone(item))))
            .collect();
        doc.insert("paths".to_string(), Value::Object(paths));

        if self.policy.major() == MajorVersion::V2 || !self.state.tags.is_empty() {
            let tags = self.state.tags.iter().cloned().map(Value::Object).collect();
            doc.insert("tags".to_string(), Value::Array(tags));
        }

        deep_merge(&mut doc, self.options.clone());
        Value::Object(doc)
    }

    /// Renders the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        let json = serde_json::to_string_pretty(&self.to_value())?;
        Ok(json)
    }

    /// Renders the document as YAML, keeping key order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] if serialization fails.
    #[cfg(feature = "yaml")]
    pub fn to_yaml(&self) -> Result<String, Error> {
        use crate::yaml::ToYaml;

        let yaml = ToYaml::to_yaml(self)?;
        Ok(yaml)
    }

    fn add_component(
        &mut self,
        kind: ComponentKind,
        name: String,
        component: Component,
        location: Option<&str>,
    ) -> Result<&mut Self, Error> {
        self.transaction(|session| session.add_component(kind, &name, component, location))?;
        Ok(self)
    }

    /// Runs `operation` on a staged copy of the state and keeps it only on success.
    fn transaction<T>(
        &mut self,
        operation: impl FnOnce(&mut Session<'_>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut session = Session {
            policy: &self.policy,
            plugins: &mut self.plugins,
            state: self.state.clone(),
        };
        let result = operation(&mut session).inspect_err(|error| {
            tracing::debug!(%error, "call failed, document left unchanged");
        })?;
        self.state = session.state;
        Ok(result)
    }
}

impl serde::Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

/// A staged mutation of a document.
struct Session<'a> {
    policy: &'a VersionPolicy,
    plugins: &'a mut PluginChain,
    state: State,
}

impl Session<'_> {
    fn resolver(&mut self) -> Resolver<'_> {
        Resolver::new(
            self.policy,
            &mut self.state.registry,
            &mut self.state.identities,
            &mut *self.plugins,
        )
    }

    fn add_component(
        &mut self,
        kind: ComponentKind,
        name: &str,
        component: Component,
        location: Option<&str>,
    ) -> Result<(), Error> {
        if !self.policy.supports(kind) {
            return Err(self.policy.unsupported(kind));
        }
        if name.is_empty() {
            return Err(Error::EmptyComponentName { kind });
        }
        let merge = kind == ComponentKind::Schema && self.policy.major() == MajorVersion::V3;
        if !merge && self.state.registry.is_reserved(kind, name) {
            return Err(Error::DuplicateComponentName {
                kind,
                name: name.to_string(),
            });
        }

        let Component {
            body: raw,
            options,
            lazy,
        } = component;

        let mut primary = match &raw {
            Fragment::Map(map) => map.clone(),
            Fragment::Object(object) => self.object_body(kind, name, object)?,
            other => {
                let body = self
                    .resolver()
                    .resolve_body(other.clone(), || format!("{kind} {name}"))?;
                fragment_map(Value::Object(body))
            }
        };
        if let Some(location) = location {
            apply_parameter_defaults(&mut primary, name, location);
        }

        if let Some(hook) = component_hook(kind) {
            let ctx = HookContext {
                policy: self.policy,
                registry: &self.state.registry,
            };
            let contributions = self.plugins.run_hook(hook, |plugin| match hook {
                Hook::Parameter => plugin.parameter_hook(&ctx, name, &raw, &options),
                Hook::Response => plugin.response_hook(&ctx, name, &raw, &options),
                Hook::Header => plugin.header_hook(&ctx, name, &raw, &options),
                _ => plugin.schema_hook(&ctx, name, &raw, &options),
            })?;
            for contribution in contributions {
                match contribution {
                    Fragment::Map(contribution) => merge_missing(&mut primary, contribution),
                    other => {
                        let value = self.resolver().resolve(other)?;
                        return Err(Error::invalid_body(
                            format!("{hook} contribution to {kind} {name}"),
                            value,
                        ));
                    }
                }
            }
        }

        let mut primary = Fragment::Map(primary);
        match kind {
            ComponentKind::Schema => shorthand::schema(&mut primary),
            ComponentKind::Parameter | ComponentKind::Header => {
                if let Some(body) = primary.as_map_mut() {
                    shorthand::media(body);
                }
            }
            ComponentKind::Response => shorthand::response(self.policy, &mut primary),
            ComponentKind::Example | ComponentKind::SecurityScheme => {}
        }

        let mut body = self
            .resolver()
            .resolve_body(primary, || format!("{kind} {name}"))?;
        if kind == ComponentKind::Parameter {
            flatten_parameter_schema(self.policy, &mut body);
        }

        let registry = &mut self.state.registry;
        if lazy && !registry.is_reserved(kind, name) {
            registry.register_lazy(kind, name, body)
        } else if merge {
            registry.deep_merge_into(kind, name, body);
            if !lazy {
                registry.promote(kind, name);
            }
            Ok(())
        } else {
            registry.register(kind, name, body)
        }
    }

    /// Converts the object given as a component body, recording its name first so that
    /// references to it from its own contents resolve to this component.
    fn object_body(
        &mut self,
        kind: ComponentKind,
        name: &str,
        object: &AppObject,
    ) -> Result<FragmentMap, Error> {
        if kind == ComponentKind::Schema {
            match self.state.identities.name_of(object) {
                None => self.state.identities.assign(object, kind, name),
                Some(existing) if existing != name => {
                    tracing::warn!(
                        object = ?object,
                        %existing,
                        %name,
                        "object already registered under another name, references keep the first name"
                    );
                }
                Some(_) => {}
            }
        }

        match self.resolver().convert(object)? {
            Fragment::Map(map) => Ok(map),
            other => {
                let value = self.resolver().resolve(other)?;
                Err(Error::invalid_body(format!("{kind} {name}"), value))
            }
        }
    }

    fn add_path(&mut self, definition: PathDefinition) -> Result<(), Error> {
        let PathDefinition {
            path,
            mut operations,
            view,
            summary,
            description,
            mut parameters,
            options,
        } = definition;

        let ctx = HookContext {
            policy: self.policy,
            registry: &self.state.registry,
        };
        let input = PathInput {
            path: path.as_deref(),
            view: view.as_ref(),
            operations: &operations,
        };
        let contributions = self
            .plugins
            .run_hook(Hook::Path, |plugin| plugin.path_hook(&ctx, &input, &options))?;

        let mut path = path;
        for contribution in contributions {
            if path.is_none() {
                path = contribution.path;
            }
            merge_missing(&mut operations, contribution.operations);
            parameters.extend(contribution.parameters);
        }
        let path = path
            .filter(|path| !path.is_empty())
            .ok_or(Error::MissingPathTemplate)?;

        self.plugins.for_each(Hook::Operation, |plugin| {
            plugin.operation_hook(&ctx, &path, &mut operations, view.as_ref(), &options)
        })?;

        let mut operations = normalize_methods(self.policy, &path, operations)?;
        for (method, operation) in &mut operations {
            if is_method(method) {
                shorthand::operation(self.policy, operation);
            }
        }
        parameters.iter_mut().for_each(shorthand::parameter);

        if let Some(existing) = self.state.paths.get(&path)
            && let Some(method) = operations
                .keys()
                .find(|method| is_method(method) && existing.contains_key(*method))
        {
            return Err(Error::DuplicateOperation {
                path,
                method: method.clone(),
            });
        }

        tracing::debug!(%path, methods = ?operations.keys().collect::<Vec<_>>(), "add path");
        let mut resolved = Body::new();
        for (method, operation) in operations {
            let mut value = self.resolver().resolve(operation)?;
            if is_method(&method) {
                let Value::Object(operation) = &mut value else {
                    return Err(Error::invalid_body(format!("operation {method} {path}"), value));
                };
                if let Some(parameters) = operation.get_mut("parameters") {
                    check_parameters(parameters)?;
                }
                flatten_parameters(self.policy, operation);
            }
            resolved.insert(method, value);
        }

        let mut parameters = self.resolver().resolve(Fragment::Seq(parameters))?;
        if let Some(Value::Array(existing)) = self
            .state
            .paths
            .get(&path)
            .and_then(|item| item.get("parameters"))
            && let Value::Array(added) = &mut parameters
        {
            let mut combined = existing.clone();
            combined.append(added);
            *added = combined;
        }
        check_parameters(&mut parameters)?;
        if let Value::Array(items) = &mut parameters {
            for item in items.iter_mut() {
                if let Value::Object(parameter) = item {
                    flatten_parameter_schema(self.policy, parameter);
                }
            }
        }

        let paths = Arc::make_mut(&mut self.state.paths);
        let item = Arc::make_mut(paths.entry(path).or_default());
        item.extend(resolved);
        if let Some(summary) = summary {
            item.insert("summary".to_string(), Value::String(summary));
        }
        if let Some(description) = description {
            item.insert("description".to_string(), Value::String(description));
        }
        if parameters.as_array().is_some_and(|items| !items.is_empty()) {
            item.insert("parameters".to_string(), parameters);
        }
        Ok(())
    }
}

fn component_hook(kind: ComponentKind) -> Option<Hook> {
    match kind {
        ComponentKind::Schema => Some(Hook::Schema),
        ComponentKind::Parameter => Some(Hook::Parameter),
        ComponentKind::Response => Some(Hook::Response),
        ComponentKind::Header => Some(Hook::Header),
        ComponentKind::Example | ComponentKind::SecurityScheme => None,
    }
}

fn fragment_map(value: Value) -> FragmentMap {
    match Fragment::from(value) {
        Fragment::Map(map) => map,
        _ => FragmentMap::new(),
    }
}

fn flatten_parameters(policy: &VersionPolicy, operation: &mut Body) {
    if let Some(Value::Array(parameters)) = operation.get_mut("parameters") {
        for parameter in parameters.iter_mut() {
            if let Value::Object(parameter) = parameter {
                flatten_parameter_schema(policy, parameter);
            }
        }
    }
}

/// Moves an inline parameter schema onto the parameter when the version requires it.
///
/// Body parameters and schemas given as references are left untouched.
fn flatten_parameter_schema(policy: &VersionPolicy, parameter: &mut Body) {
    if policy.supports_inline_schema_in_parameter()
        || parameter.get("in").and_then(Value::as_str) == Some("body")
    {
        return;
    }
    let is_inline = parameter
        .get("schema")
        .and_then(Value::as_object)
        .is_some_and(|schema| !schema.contains_key("$ref"));
    if !is_inline {
        return;
    }
    if let Some(Value::Object(schema)) = parameter.shift_remove("schema") {
        for (key, value) in schema {
            parameter.entry(key).or_insert(value);
        }
    }
}
