//! Input trees handed to the document.
//!
//! A [`Fragment`] is a JSON-like tree whose nodes may also be component references or opaque
//! application objects. The resolver turns a fragment into a plain [`serde_json::Value`]:
//! references become `$ref` mappings and application objects are converted by plugins.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::registry::ComponentKind;

/// An ordered mapping of fragments.
pub type FragmentMap = IndexMap<String, Fragment>;

/// A node of an input tree.
#[derive(Debug, Clone)]
pub enum Fragment {
    /// A mapping, resolved key by key.
    Map(FragmentMap),
    /// A sequence, resolved element by element.
    Seq(Vec<Fragment>),
    /// A JSON scalar, kept unchanged.
    Scalar(Value),
    /// A reference to a named component, emitted as `{"$ref": ...}`.
    Ref(ComponentRef),
    /// An application object that plugins convert (and possibly name).
    Object(AppObject),
}

impl Fragment {
    /// An empty mapping.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(FragmentMap::new())
    }

    /// A reference to a named component.
    pub fn reference(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self::Ref(ComponentRef::new(kind, name))
    }

    /// A reference to a named schema.
    pub fn schema_ref(name: impl Into<String>) -> Self {
        Self::reference(ComponentKind::Schema, name)
    }

    /// Wraps an application object.
    pub fn object<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::Object(AppObject::new(value))
    }

    /// Adds or replaces an entry, turning a non-mapping fragment into a mapping first.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Fragment>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces an entry, turning a non-mapping fragment into a mapping first.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Fragment>) {
        if !matches!(self, Self::Map(_)) {
            *self = Self::map();
        }
        if let Self::Map(map) = self {
            map.insert(key.into(), value.into());
        }
    }

    /// Returns the entry for `key` if this fragment is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Fragment> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Returns the mapping, if this fragment is one.
    #[must_use]
    pub fn as_map(&self) -> Option<&FragmentMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the mapping mutably, if this fragment is one.
    pub fn as_map_mut(&mut self) -> Option<&mut FragmentMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the string scalar, if this fragment is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Value::String(value)) => Some(value),
            _ => None,
        }
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::map()
    }
}

impl From<Value> for Fragment {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            scalar => Self::Scalar(scalar),
        }
    }
}

impl From<FragmentMap> for Fragment {
    fn from(map: FragmentMap) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<Fragment>> for Fragment {
    fn from(items: Vec<Fragment>) -> Self {
        Self::Seq(items)
    }
}

impl From<ComponentRef> for Fragment {
    fn from(reference: ComponentRef) -> Self {
        Self::Ref(reference)
    }
}

impl From<AppObject> for Fragment {
    fn from(object: AppObject) -> Self {
        Self::Object(object)
    }
}

impl From<&str> for Fragment {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<String> for Fragment {
    fn from(value: String) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<bool> for Fragment {
    fn from(value: bool) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<i64> for Fragment {
    fn from(value: i64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

/// A named component placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    /// The component kind.
    pub kind: ComponentKind,
    /// The component name.
    pub name: String,
}

impl ComponentRef {
    /// Creates a reference.
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Identity of an application object.
///
/// Two handles share an identity only if they point to the same allocation; structurally equal
/// objects built separately are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// A shared handle on an application object.
///
/// Plugins recognise the objects they can convert with [`AppObject::downcast_ref`].
/// Cloning the handle keeps its identity.
///
/// # Example
///
/// ```rust
/// use specmill_core::AppObject;
///
/// struct PetModel;
///
/// let pet = AppObject::new(PetModel);
/// let same = pet.clone();
/// let other = AppObject::new(PetModel);
///
/// assert_eq!(pet.id(), same.id());
/// assert_ne!(pet.id(), other.id());
/// assert!(pet.downcast_ref::<PetModel>().is_some());
/// ```
#[derive(Clone)]
pub struct AppObject {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AppObject {
    /// Wraps a value in a new handle with a fresh identity.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing shared value; handles built from clones of the same `Arc` share an identity.
    pub fn from_arc<T>(value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    /// The identity of the wrapped allocation.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.value).cast::<()>() as usize)
    }

    /// The Rust type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the wrapped value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Any,
    {
        self.value.downcast_ref::<T>()
    }

    /// Whether the wrapped value is a `T`.
    #[must_use]
    pub fn is<T>(&self) -> bool
    where
        T: Any,
    {
        self.value.is::<T>()
    }
}

impl fmt::Debug for AppObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AppObject")
            .field(&self.type_name)
            .field(&self.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_convert_json_into_tagged_tree() {
        let fragment = Fragment::from(json!({"type": "array", "items": [{"type": "string"}]}));

        assert_eq!(fragment.get("type").and_then(Fragment::as_str), Some("array"));
        assert!(matches!(fragment.get("items"), Some(Fragment::Seq(items)) if items.len() == 1));
    }

    #[test]
    fn should_build_mapping_with_objects() {
        struct Pet;

        let fragment = Fragment::map()
            .with("type", "array")
            .with("items", Fragment::object(Pet));

        assert!(matches!(fragment.get("items"), Some(Fragment::Object(object)) if object.is::<Pet>()));
    }

    #[test]
    fn should_share_identity_between_arc_clones() {
        let shared = Arc::new(42_u8);

        let first = AppObject::from_arc(Arc::clone(&shared));
        let second = AppObject::from_arc(shared);

        assert_eq!(first.id(), second.id());
        assert_eq!(first.type_name(), "u8");
    }
}
