//! Named reusable components.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::merge::deep_merge;
use crate::{Body, Error};

/// The kinds of reusable components, each one an independent namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    /// Schema objects.
    Schema,
    /// Parameter objects.
    Parameter,
    /// Response objects.
    Response,
    /// Example objects.
    Example,
    /// Security scheme objects.
    SecurityScheme,
    /// Header objects.
    Header,
}

impl ComponentKind {
    /// All kinds, in serialization order.
    pub const ALL: [Self; 6] = [
        Self::Schema,
        Self::Parameter,
        Self::Response,
        Self::Example,
        Self::SecurityScheme,
        Self::Header,
    ];

    /// The OpenAPI 3 `components` section name for this kind.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::Schema => "schemas",
            Self::Parameter => "parameters",
            Self::Response => "responses",
            Self::Example => "examples",
            Self::SecurityScheme => "securitySchemes",
            Self::Header => "headers",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Parameter => "parameter",
            Self::Response => "response",
            Self::Example => "example",
            Self::SecurityScheme => "security scheme",
            Self::Header => "header",
        };
        f.write_str(label)
    }
}

type Section = IndexMap<String, Arc<Body>>;

/// Stores registered components by kind and name.
///
/// Each kind keeps its components in insertion order so that serialization is deterministic.
/// Names are unique within a kind: [`ComponentRegistry::register`] never overwrites.
///
/// Components can also be registered lazily. A lazy component is held in a pending buffer,
/// reserves its name, and only becomes part of the output once [`ComponentRegistry::promote`]
/// is called for it (the resolver does so the first time the component is referenced).
///
/// Sections and bodies are shared on clone and copied on first write.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    sections: IndexMap<ComponentKind, Arc<Section>>,
    pending: IndexMap<ComponentKind, Arc<Section>>,
}

impl ComponentRegistry {
    /// Registers a component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateComponentName`] when the name is already used within `kind`,
    /// including by a lazy component that was not referenced yet, and
    /// [`Error::EmptyComponentName`] for an empty name.
    pub fn register(
        &mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        body: Body,
    ) -> Result<(), Error> {
        let name = name.into();
        self.ensure_available(kind, &name)?;
        tracing::debug!(%kind, %name, "register component");
        self.section_mut(kind).insert(name, Arc::new(body));
        Ok(())
    }

    /// Registers a component that is only emitted once referenced.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentRegistry::register`].
    pub fn register_lazy(
        &mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        body: Body,
    ) -> Result<(), Error> {
        let name = name.into();
        self.ensure_available(kind, &name)?;
        tracing::debug!(%kind, %name, "register lazy component");
        Arc::make_mut(self.pending.entry(kind).or_default()).insert(name, Arc::new(body));
        Ok(())
    }

    /// Moves a lazy component into its section. Returns `true` if one was pending.
    pub fn promote(&mut self, kind: ComponentKind, name: &str) -> bool {
        if !self.is_pending(kind, name) {
            return false;
        }
        let Some(body) = self
            .pending
            .get_mut(&kind)
            .and_then(|pending| Arc::make_mut(pending).shift_remove(name))
        else {
            return false;
        };
        tracing::trace!(%kind, %name, "promote lazy component");
        self.section_mut(kind).insert(name.to_string(), body);
        true
    }

    /// Returns the body of a registered component.
    #[must_use]
    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<&Body> {
        self.sections
            .get(&kind)
            .and_then(|section| section.get(name))
            .map(|body| &**body)
    }

    /// Whether a component is registered (lazy components not referenced yet are not).
    #[must_use]
    pub fn has(&self, kind: ComponentKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Whether a name is taken within `kind`, by a registered or a lazy component.
    #[must_use]
    pub fn is_reserved(&self, kind: ComponentKind, name: &str) -> bool {
        self.has(kind, name) || self.is_pending(kind, name)
    }

    /// Whether a lazy component with that name waits for its first reference.
    #[must_use]
    pub fn is_pending(&self, kind: ComponentKind, name: &str) -> bool {
        self.pending
            .get(&kind)
            .is_some_and(|pending| pending.contains_key(name))
    }

    /// All registered components of `kind`, in insertion order.
    pub fn all(&self, kind: ComponentKind) -> impl Iterator<Item = (&str, &Body)> {
        self.sections
            .get(&kind)
            .into_iter()
            .flat_map(|section| section.iter().map(|(name, body)| (name.as_str(), &**body)))
    }

    /// Number of registered components of `kind`.
    #[must_use]
    pub fn len(&self, kind: ComponentKind) -> usize {
        self.sections.get(&kind).map_or(0, |section| section.len())
    }

    /// Whether no component of `kind` is registered.
    #[must_use]
    pub fn is_empty(&self, kind: ComponentKind) -> bool {
        self.len(kind) == 0
    }

    /// Merges `partial` into an existing component, or registers it if absent.
    ///
    /// Nested mappings merge recursively; scalars and arrays from `partial` overwrite.
    /// A lazy component that is still pending stays pending.
    pub fn deep_merge_into(&mut self, kind: ComponentKind, name: &str, partial: Body) {
        let section = if self.is_pending(kind, name) {
            Arc::make_mut(self.pending.entry(kind).or_default())
        } else {
            self.section_mut(kind)
        };
        if let Some(existing) = section.get_mut(name) {
            tracing::debug!(%kind, %name, "merge into component");
            deep_merge(Arc::make_mut(existing), partial);
        } else {
            tracing::debug!(%kind, %name, "register component");
            section.insert(name.to_string(), Arc::new(partial));
        }
    }

    /// Serializes the components of `kind` as a JSON object.
    pub(crate) fn section_value(&self, kind: ComponentKind) -> Value {
        let section = self
            .all(kind)
            .map(|(name, body)| (name.to_string(), Value::Object(body.clone())))
            .collect();
        Value::Object(section)
    }

    fn section_mut(&mut self, kind: ComponentKind) -> &mut Section {
        Arc::make_mut(self.sections.entry(kind).or_default())
    }

    fn ensure_available(&self, kind: ComponentKind, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::EmptyComponentName { kind });
        }
        if self.is_reserved(kind, name) {
            return Err(Error::DuplicateComponentName {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
