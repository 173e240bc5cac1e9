//! Plugins contributing to document construction.
//!
//! A [`Plugin`] implements any subset of the hooks below; every hook has a no-op default.
//! The [`PluginChain`] calls a hook on every plugin in registration order and collects the
//! contributions, which the document folds into the caller's fragment (caller keys first,
//! then the first plugin to contribute a key).
//!
//! # Implementing a plugin
//!
//! ```rust
//! use specmill_core::{AppObject, Fragment, HookContext, Plugin, PluginError};
//!
//! struct Pet;
//!
//! #[derive(Debug)]
//! struct PetPlugin;
//!
//! impl Plugin for PetPlugin {
//!     fn object_name(
//!         &mut self,
//!         _ctx: &HookContext<'_>,
//!         object: &AppObject,
//!     ) -> Result<Option<String>, PluginError> {
//!         Ok(object.is::<Pet>().then(|| "Pet".to_string()))
//!     }
//!
//!     fn convert_object(
//!         &mut self,
//!         _ctx: &HookContext<'_>,
//!         object: &AppObject,
//!     ) -> Result<Option<Fragment>, PluginError> {
//!         Ok(object
//!             .is::<Pet>()
//!             .then(|| Fragment::from(serde_json::json!({"type": "object"}))))
//!     }
//! }
//! ```

use std::any::type_name;
use std::fmt::Debug;

use indexmap::IndexMap;
use serde_json::Value;

use crate::fragment::{AppObject, Fragment, FragmentMap};
use crate::registry::ComponentRegistry;
use crate::version::VersionPolicy;
use crate::{Error, PluginError};

/// Extra keyword options forwarded untouched to every hook.
///
/// Hooks look up the keys they understand and ignore the others.
pub type HookOptions = IndexMap<String, Value>;

/// Read-only view of the document handed to hooks.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// The active version policy.
    pub policy: &'a VersionPolicy,
    /// The components registered so far (including those staged by the current call).
    pub registry: &'a ComponentRegistry,
}

/// The path-level input handed to path hooks.
#[derive(Debug)]
pub struct PathInput<'a> {
    /// The path template supplied by the caller, if any.
    pub path: Option<&'a str>,
    /// The application view object the path is derived from, if any.
    pub view: Option<&'a AppObject>,
    /// The operations supplied by the caller.
    pub operations: &'a FragmentMap,
}

/// What a path hook contributes.
#[derive(Debug, Clone, Default)]
pub struct PathContribution {
    /// A path template, used when the caller gave none.
    pub path: Option<String>,
    /// Operations keyed by HTTP method, added for methods the caller did not describe.
    pub operations: FragmentMap,
    /// Path-level parameters, appended after the caller's.
    pub parameters: Vec<Fragment>,
}

/// Hooks a plugin may implement.
///
/// Every hook receives a [`HookContext`] and the caller's [`HookOptions`], and returns
/// `Ok(None)` (or does nothing) when it has nothing to contribute.
/// Errors are returned to the caller of the document method unchanged, wrapped in
/// [`Error::Plugin`].
pub trait Plugin: Debug {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Called once when the document is built.
    fn init(&mut self, _policy: &VersionPolicy) {}

    /// Contributes to a schema component.
    ///
    /// `raw` is what the caller passed: a mapping or an application object.
    fn schema_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(None)
    }

    /// Contributes to a parameter component.
    fn parameter_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(None)
    }

    /// Contributes to a response component.
    fn response_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(None)
    }

    /// Contributes to a header component.
    fn header_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(None)
    }

    /// Derives a path template, operations or path-level parameters, typically from a view object.
    fn path_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _input: &PathInput<'_>,
        _options: &HookOptions,
    ) -> Result<Option<PathContribution>, PluginError> {
        Ok(None)
    }

    /// Mutates the operations of a path in place.
    fn operation_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _path: &str,
        _operations: &mut FragmentMap,
        _view: Option<&AppObject>,
        _options: &HookOptions,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Proposes a component name for an application object.
    ///
    /// Returning `Ok(None)` asks for the object to be inlined. Objects taking part in a cycle
    /// must be named, otherwise resolution fails with [`Error::CircularReference`].
    fn object_name(
        &mut self,
        _ctx: &HookContext<'_>,
        _object: &AppObject,
    ) -> Result<Option<String>, PluginError> {
        Ok(None)
    }

    /// Converts an application object into a fragment.
    ///
    /// The fragment may itself contain application objects; they are resolved recursively.
    fn convert_object(
        &mut self,
        _ctx: &HookContext<'_>,
        _object: &AppObject,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(None)
    }
}

/// The hooks of [`Plugin`], used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Hook {
    /// [`Plugin::schema_hook`]
    #[display("schema_hook")]
    Schema,
    /// [`Plugin::parameter_hook`]
    #[display("parameter_hook")]
    Parameter,
    /// [`Plugin::response_hook`]
    #[display("response_hook")]
    Response,
    /// [`Plugin::header_hook`]
    #[display("header_hook")]
    Header,
    /// [`Plugin::path_hook`]
    #[display("path_hook")]
    Path,
    /// [`Plugin::operation_hook`]
    #[display("operation_hook")]
    Operation,
    /// [`Plugin::object_name`]
    #[display("object_name")]
    ObjectName,
    /// [`Plugin::convert_object`]
    #[display("convert_object")]
    ConvertObject,
}

/// Plugins in registration order.
#[derive(Debug, Default)]
pub struct PluginChain {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginChain {
    /// Appends a plugin.
    pub fn push(&mut self, plugin: impl Plugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    /// Appends a boxed plugin.
    pub fn push_boxed(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub(crate) fn init(&mut self, policy: &VersionPolicy) {
        for plugin in &mut self.plugins {
            plugin.init(policy);
        }
    }

    /// Calls `call` on every plugin in order and collects the non-empty results.
    ///
    /// # Errors
    ///
    /// Stops at the first failing plugin and returns its error as [`Error::Plugin`].
    pub fn run_hook<T, F>(&mut self, hook: Hook, mut call: F) -> Result<Vec<T>, Error>
    where
        F: FnMut(&mut dyn Plugin) -> Result<Option<T>, PluginError>,
    {
        let mut results = Vec::new();
        for plugin in &mut self.plugins {
            let plugin = plugin.as_mut();
            match call(&mut *plugin) {
                Ok(Some(result)) => {
                    tracing::trace!(plugin = plugin.name(), %hook, "hook contributed");
                    results.push(result);
                }
                Ok(None) => {}
                Err(source) => {
                    return Err(Error::Plugin {
                        plugin: plugin.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(results)
    }

    /// Returns the first non-empty result, in plugin order.
    ///
    /// # Errors
    ///
    /// Same as [`PluginChain::run_hook`].
    pub fn first<T, F>(&mut self, hook: Hook, mut call: F) -> Result<Option<T>, Error>
    where
        F: FnMut(&mut dyn Plugin) -> Result<Option<T>, PluginError>,
    {
        for plugin in &mut self.plugins {
            let plugin = plugin.as_mut();
            match call(&mut *plugin) {
                Ok(Some(result)) => {
                    tracing::trace!(plugin = plugin.name(), %hook, "hook answered");
                    return Ok(Some(result));
                }
                Ok(None) => {}
                Err(source) => {
                    return Err(Error::Plugin {
                        plugin: plugin.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(None)
    }

    /// Calls a mutating hook on every plugin in order.
    ///
    /// # Errors
    ///
    /// Same as [`PluginChain::run_hook`].
    pub fn for_each<F>(&mut self, hook: Hook, mut call: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn Plugin) -> Result<(), PluginError>,
    {
        self.run_hook(hook, |plugin| call(plugin).map(|()| None::<()>))
            .map(|_| ())
    }
}
