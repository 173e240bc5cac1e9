#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use serde_json::{Value, json};
use specmill_core::{
    AppObject, Fragment, FragmentMap, HookContext, HookOptions, PathContribution, PathInput,
    Plugin, PluginError, VersionPolicy,
};
use tracing::info;

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

/// An application model; its properties may point to other models, including itself.
#[derive(Debug)]
pub struct Model {
    pub name: Option<&'static str>,
    pub properties: OnceLock<Vec<(&'static str, AppObject)>>,
}

pub fn model(name: Option<&'static str>) -> Arc<Model> {
    Arc::new(Model {
        name,
        properties: OnceLock::new(),
    })
}

pub fn link(model: &Arc<Model>, properties: Vec<(&'static str, AppObject)>) {
    if model.properties.set(properties).is_err() {
        panic!("model properties already set");
    }
}

/// Names models after their `name` and converts them into object schemas.
#[derive(Debug, Default)]
pub struct ModelPlugin {
    pub conversions: Arc<std::sync::atomic::AtomicUsize>,
}

impl Plugin for ModelPlugin {
    fn object_name(
        &mut self,
        _ctx: &HookContext<'_>,
        object: &AppObject,
    ) -> Result<Option<String>, PluginError> {
        Ok(object
            .downcast_ref::<Model>()
            .and_then(|model| model.name)
            .map(str::to_string))
    }

    fn convert_object(
        &mut self,
        _ctx: &HookContext<'_>,
        object: &AppObject,
    ) -> Result<Option<Fragment>, PluginError> {
        let Some(model) = object.downcast_ref::<Model>() else {
            return Ok(None);
        };
        self.conversions
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let mut schema = Fragment::map().with("type", "object");
        if let Some(properties) = model.properties.get() {
            let properties = properties
                .iter()
                .map(|(name, object)| ((*name).to_string(), Fragment::from(object.clone())))
                .collect::<FragmentMap>();
            schema.insert("properties", properties);
        }
        Ok(Some(schema))
    }
}

/// A parameter declared by the application, converted as is.
#[derive(Debug)]
pub struct Param(pub Value);

/// Converts [`Param`] objects without naming them.
#[derive(Debug, Default)]
pub struct ParamPlugin;

impl Plugin for ParamPlugin {
    fn convert_object(
        &mut self,
        _ctx: &HookContext<'_>,
        object: &AppObject,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(object
            .downcast_ref::<Param>()
            .map(|param| Fragment::from(param.0.clone())))
    }
}

/// Contributes a fixed mapping to every schema, parameter and response.
#[derive(Debug)]
pub struct Contributor(pub Value);

impl Contributor {
    fn contribution(&self) -> Option<Fragment> {
        Some(Fragment::from(self.0.clone()))
    }
}

impl Plugin for Contributor {
    fn schema_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(self.contribution())
    }

    fn parameter_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(self.contribution())
    }

    fn response_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(self.contribution())
    }
}

/// Fails every schema hook for the given component name.
#[derive(Debug)]
pub struct FailOn(pub &'static str);

impl Plugin for FailOn {
    fn schema_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        name: &str,
        _raw: &Fragment,
        _options: &HookOptions,
    ) -> Result<Option<Fragment>, PluginError> {
        if name == self.0 {
            return Err(format!("cannot describe {name}").into());
        }
        Ok(None)
    }
}

/// A web view exposing one method on one route.
#[derive(Debug)]
pub struct Route {
    pub path: &'static str,
    pub method: &'static str,
    pub handler: &'static str,
}

/// Derives paths from [`Route`] views and sets `operationId` on their operations.
#[derive(Debug, Default)]
pub struct RoutePlugin {
    pub policy: Option<String>,
}

impl Plugin for RoutePlugin {
    fn init(&mut self, policy: &VersionPolicy) {
        self.policy = Some(policy.to_string());
    }

    fn path_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        input: &PathInput<'_>,
        _options: &HookOptions,
    ) -> Result<Option<PathContribution>, PluginError> {
        let Some(route) = input.view.and_then(|view| view.downcast_ref::<Route>()) else {
            return Ok(None);
        };
        let mut operations = FragmentMap::new();
        operations.insert(
            route.method.to_string(),
            Fragment::from(json!({"responses": {"200": {"description": "ok"}}})),
        );
        Ok(Some(PathContribution {
            path: Some(route.path.to_string()),
            operations,
            parameters: Vec::new(),
        }))
    }

    fn operation_hook(
        &mut self,
        _ctx: &HookContext<'_>,
        _path: &str,
        operations: &mut FragmentMap,
        view: Option<&AppObject>,
        _options: &HookOptions,
    ) -> Result<(), PluginError> {
        let Some(route) = view.and_then(|view| view.downcast_ref::<Route>()) else {
            return Ok(());
        };
        for (method, operation) in operations.iter_mut() {
            if let Some(operation) = operation.as_map_mut() {
                operation
                    .entry("operationId".to_string())
                    .or_insert_with(|| Fragment::from(format!("{}_{method}", route.handler)));
            }
        }
        Ok(())
    }
}
