//! Reference resolution.
//!
//! The resolver walks a [`Fragment`] depth-first and produces a plain JSON value:
//!
//! - mappings and sequences are rebuilt with every child resolved, keeping order,
//! - scalars are kept,
//! - [`Fragment::Ref`] placeholders become `{"$ref": ...}` (promoting lazy components),
//! - application objects are converted by plugins, and registered as schema components when a
//!   plugin names them.
//!
//! Objects are tracked by identity. Once an object has a name, every later encounter in the same
//! document emits the same reference without converting it again. The name is reserved before the
//! object's own contents are resolved, so self-referencing and mutually referencing objects resolve
//! to references. An object met again while its own conversion is still in progress, and that no
//! plugin named, is a cycle that cannot be inlined.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::fragment::{AppObject, Fragment, ObjectId};
use crate::plugin::{Hook, HookContext, PluginChain};
use crate::registry::{ComponentKind, ComponentRegistry};
use crate::version::VersionPolicy;
use crate::{Body, Error};

/// The kind under which named application objects are registered.
const OBJECT_KIND: ComponentKind = ComponentKind::Schema;

#[derive(Debug, Clone)]
struct IdentityEntry {
    // Keeps the allocation alive so its address cannot be reused by another object.
    #[allow(dead_code)]
    object: AppObject,
    kind: ComponentKind,
    name: String,
}

/// Component names assigned to application objects, by identity.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdentityTable {
    entries: Arc<HashMap<ObjectId, IdentityEntry>>,
}

impl IdentityTable {
    pub(crate) fn name_of(&self, object: &AppObject) -> Option<&str> {
        self.entries
            .get(&object.id())
            .map(|entry| entry.name.as_str())
    }

    pub(crate) fn assign(&mut self, object: &AppObject, kind: ComponentKind, name: &str) {
        tracing::trace!(object = ?object, %kind, %name, "assign component name");
        Arc::make_mut(&mut self.entries).insert(
            object.id(),
            IdentityEntry {
                object: object.clone(),
                kind,
                name: name.to_string(),
            },
        );
    }

    fn is_name_taken(&self, kind: ComponentKind, name: &str) -> bool {
        self.entries
            .values()
            .any(|entry| entry.kind == kind && entry.name == name)
    }
}

/// One resolution pass over the staged state of a document.
pub(crate) struct Resolver<'a> {
    policy: &'a VersionPolicy,
    registry: &'a mut ComponentRegistry,
    identities: &'a mut IdentityTable,
    plugins: &'a mut PluginChain,
    visiting: HashSet<ObjectId>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        policy: &'a VersionPolicy,
        registry: &'a mut ComponentRegistry,
        identities: &'a mut IdentityTable,
        plugins: &'a mut PluginChain,
    ) -> Self {
        Self {
            policy,
            registry,
            identities,
            plugins,
            visiting: HashSet::new(),
        }
    }

    /// Resolves a fragment into a JSON value.
    pub(crate) fn resolve(&mut self, fragment: Fragment) -> Result<Value, Error> {
        match fragment {
            Fragment::Map(map) => {
                let mut resolved = Body::new();
                for (key, value) in map {
                    let value = self.resolve(value)?;
                    resolved.insert(key, value);
                }
                Ok(Value::Object(resolved))
            }
            Fragment::Seq(items) => items
                .into_iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Fragment::Scalar(value) => Ok(value),
            Fragment::Ref(reference) => self.reference(reference.kind, &reference.name),
            Fragment::Object(object) => self.resolve_object(&object),
        }
    }

    /// Resolves a fragment that must produce a mapping.
    pub(crate) fn resolve_body(
        &mut self,
        fragment: Fragment,
        context: impl FnOnce() -> String,
    ) -> Result<Body, Error> {
        match self.resolve(fragment)? {
            Value::Object(body) => Ok(body),
            other => Err(Error::invalid_body(context(), other)),
        }
    }

    /// Converts an application object with the first plugin that recognises it.
    pub(crate) fn convert(&mut self, object: &AppObject) -> Result<Fragment, Error> {
        let ctx = HookContext {
            policy: self.policy,
            registry: &*self.registry,
        };
        self.plugins
            .first(Hook::ConvertObject, |plugin| plugin.convert_object(&ctx, object))?
            .ok_or(Error::UnsupportedObject {
                type_name: object.type_name(),
            })
    }

    /// Builds a reference, promoting the target if it was registered lazily.
    fn reference(&mut self, kind: ComponentKind, name: &str) -> Result<Value, Error> {
        self.registry.promote(kind, name);
        self.policy.reference(kind, name)
    }

    fn resolve_object(&mut self, object: &AppObject) -> Result<Value, Error> {
        let id = object.id();

        if let Some(entry) = self.identities.entries.get(&id) {
            let (kind, name) = (entry.kind, entry.name.clone());
            tracing::trace!(object = ?object, %name, "reuse component reference");
            return self.reference(kind, &name);
        }

        if self.visiting.contains(&id) {
            return Err(Error::CircularReference {
                type_name: object.type_name(),
            });
        }

        self.visiting.insert(id);
        let result = self.resolve_new_object(object);
        self.visiting.remove(&id);
        result
    }

    fn resolve_new_object(&mut self, object: &AppObject) -> Result<Value, Error> {
        let ctx = HookContext {
            policy: self.policy,
            registry: &*self.registry,
        };
        let name = self
            .plugins
            .first(Hook::ObjectName, |plugin| plugin.object_name(&ctx, object))?;

        let Some(name) = name else {
            let fragment = self.convert(object)?;
            return self.resolve(fragment);
        };

        self.reserve(object, &name)?;
        let fragment = self.convert(object)?;
        let body = self.resolve_body(fragment, || format!("{OBJECT_KIND} {name}"))?;
        self.registry.register(OBJECT_KIND, name.as_str(), body)?;
        self.reference(OBJECT_KIND, &name)
    }

    fn reserve(&mut self, object: &AppObject, name: &str) -> Result<(), Error> {
        if self.registry.is_reserved(OBJECT_KIND, name)
            || self.identities.is_name_taken(OBJECT_KIND, name)
        {
            return Err(Error::DuplicateComponentName {
                kind: OBJECT_KIND,
                name: name.to_string(),
            });
        }
        self.identities.assign(object, OBJECT_KIND, name);
        Ok(())
    }
}
