use serde_json::Value;

use crate::fragment::{AppObject, Fragment, FragmentMap};
use crate::plugin::HookOptions;

/// A component passed to the `add_*` methods of [`Document`](super::Document).
///
/// The body is either a mapping or an application object for plugins to convert.
/// Options are forwarded to the component hooks untouched.
///
/// ```rust
/// use serde_json::json;
/// use specmill_core::Component;
///
/// let not_found = Component::new(json!({"description": "Not found"}))
///     .with_option("content_type", "application/json")
///     .lazy();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Component {
    pub(super) body: Fragment,
    pub(super) options: HookOptions,
    pub(super) lazy: bool,
}

impl Component {
    /// Creates a component from its body.
    pub fn new(body: impl Into<Fragment>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Adds a hook option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Holds the component back from the output until something references it.
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

/// Fills in the fields every parameter component carries: `name` defaults to the component
/// name, `in` is the location, and path parameters are `required`.
pub(super) fn apply_parameter_defaults(body: &mut FragmentMap, name: &str, location: &str) {
    body.entry("name".to_string())
        .or_insert_with(|| Fragment::from(name));
    body.insert("in".to_string(), Fragment::from(location));
    if location == "path" {
        body.insert("required".to_string(), Fragment::from(true));
    }
}

impl From<Fragment> for Component {
    fn from(body: Fragment) -> Self {
        Self::new(body)
    }
}

impl From<Value> for Component {
    fn from(body: Value) -> Self {
        Self::new(body)
    }
}

impl From<FragmentMap> for Component {
    fn from(body: FragmentMap) -> Self {
        Self::new(body)
    }
}

impl From<AppObject> for Component {
    fn from(object: AppObject) -> Self {
        Self::new(object)
    }
}
