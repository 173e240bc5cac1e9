use std::collections::HashSet;

use serde_json::Value;

use crate::Error;
use crate::fragment::{AppObject, Fragment, FragmentMap};
use crate::plugin::HookOptions;
use crate::version::VersionPolicy;

/// A path item passed to [`Document::add_path_definition`](super::Document::add_path_definition).
///
/// The template may be left out when a path hook derives it from the view object.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use specmill_core::{Fragment, PathDefinition};
///
/// let pets = PathDefinition::new("/pets/{petId}")
///     .with_summary("A single pet")
///     .with_parameter(Fragment::from(json!({"name": "petId", "in": "path"})))
///     .with_operation("get", Fragment::from(json!({"responses": {}})));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathDefinition {
    pub(super) path: Option<String>,
    pub(super) operations: FragmentMap,
    pub(super) view: Option<AppObject>,
    pub(super) summary: Option<String>,
    pub(super) description: Option<String>,
    pub(super) parameters: Vec<Fragment>,
    pub(super) options: HookOptions,
}

impl PathDefinition {
    /// Starts a definition for a path template.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Starts a definition whose template and operations come from path hooks.
    #[must_use]
    pub fn from_view(view: impl Into<AppObject>) -> Self {
        Self {
            view: Some(view.into()),
            ..Self::default()
        }
    }

    /// Sets the view object handed to path and operation hooks.
    #[must_use]
    pub fn with_view(mut self, view: impl Into<AppObject>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Adds an operation under an HTTP method (or an `x-` extension key).
    #[must_use]
    pub fn with_operation(mut self, method: impl Into<String>, operation: impl Into<Fragment>) -> Self {
        self.operations.insert(method.into(), operation.into());
        self
    }

    /// Adds all operations of a mapping keyed by HTTP method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidComponentBody`] when `operations` is not a mapping.
    pub fn with_operations(mut self, operations: Fragment) -> Result<Self, Error> {
        match operations {
            Fragment::Map(operations) => {
                self.operations.extend(operations);
                Ok(self)
            }
            Fragment::Scalar(value) => Err(Error::invalid_body("path operations", value)),
            _ => Err(Error::invalid_body("path operations", Value::Null)),
        }
    }

    /// Sets the path-level summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the path-level description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a path-level parameter.
    ///
    /// A string scalar is taken as the name of a parameter component.
    #[must_use]
    pub fn with_parameter(mut self, parameter: impl Into<Fragment>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    /// Adds a hook option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Whether an operation key is an HTTP method rather than an extension.
pub(super) fn is_method(key: &str) -> bool {
    !key.starts_with("x-")
}

/// Lower-cases method keys and checks them against the methods of the version.
pub(super) fn normalize_methods(
    policy: &VersionPolicy,
    path: &str,
    operations: FragmentMap,
) -> Result<FragmentMap, Error> {
    let valid = policy.valid_methods();
    let mut invalid = Vec::new();
    let mut normalized = FragmentMap::with_capacity(operations.len());

    for (key, operation) in operations {
        let key = if is_method(&key) {
            key.to_lowercase()
        } else {
            key
        };
        if is_method(&key) && !valid.iter().any(|method| *method == key) {
            invalid.push(key);
            continue;
        }
        if normalized.contains_key(&key) {
            return Err(Error::DuplicateOperation {
                path: path.to_string(),
                method: key,
            });
        }
        normalized.insert(key, operation);
    }

    if !invalid.is_empty() {
        return Err(Error::InvalidHttpMethod { methods: invalid });
    }
    Ok(normalized)
}

/// Checks a resolved parameter list.
///
/// Every parameter that is not a `$ref` must have a string `name` and `in`, the pair must be
/// unique within the list, and path parameters are marked `required`.
pub(super) fn check_parameters(parameters: &mut Value) -> Result<(), Error> {
    let Value::Array(items) = parameters else {
        return Err(Error::InvalidParameterList {
            value: parameters.take(),
        });
    };

    let mut seen = HashSet::new();
    for item in items {
        let Value::Object(parameter) = item else {
            return Err(Error::InvalidParameter {
                missing: vec!["name", "in"],
            });
        };
        if parameter.contains_key("$ref") {
            continue;
        }
        let name = parameter.get("name").and_then(Value::as_str);
        let location = parameter.get("in").and_then(Value::as_str);
        let (Some(name), Some(location)) = (name, location) else {
            let missing = [("name", name), ("in", location)]
                .into_iter()
                .filter_map(|(key, value)| value.is_none().then_some(key))
                .collect();
            return Err(Error::InvalidParameter { missing });
        };
        if !seen.insert((name.to_string(), location.to_string())) {
            return Err(Error::DuplicateParameter {
                name: name.to_string(),
                location: location.to_string(),
            });
        }
        if location == "path" {
            parameter.insert("required".to_string(), Value::Bool(true));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn policy(version: &str) -> VersionPolicy {
        VersionPolicy::parse(version).expect("valid version")
    }

    fn operations(value: Value) -> FragmentMap {
        match Fragment::from(value) {
            Fragment::Map(map) => map,
            other => panic!("expected a mapping, got {other:?}"),
        }
    }

    #[test]
    fn should_lowercase_methods_and_keep_extensions() {
        let normalized = normalize_methods(
            &policy("3.0.2"),
            "/pets",
            operations(json!({"GET": {}, "x-internal": true, "Post": {}})),
        )
        .expect("valid methods");

        let keys = normalized.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, ["get", "x-internal", "post"]);
    }

    #[rstest]
    #[case::trace_in_v2("2.0", json!({"trace": {}}), Some(vec!["trace"]))]
    #[case::trace_in_v3("3.0.2", json!({"trace": {}}), None)]
    #[case::unknown("3.1.0", json!({"get": {}, "fetch": {}, "GRAB": {}}), Some(vec!["fetch", "grab"]))]
    fn should_validate_methods_per_version(
        #[case] version: &str,
        #[case] input: Value,
        #[case] expected_invalid: Option<Vec<&str>>,
    ) {
        let result = normalize_methods(&policy(version), "/pets", operations(input));

        match (result, expected_invalid) {
            (Ok(_), None) => {}
            (Err(Error::InvalidHttpMethod { methods }), Some(expected)) => {
                assert_eq!(methods, expected);
            }
            (other, expected) => panic!("unexpected {other:?} for {expected:?}"),
        }
    }

    #[test]
    fn should_reject_methods_differing_by_case() {
        let result = normalize_methods(
            &policy("3.0.2"),
            "/pets",
            operations(json!({"get": {}, "GET": {}})),
        );

        insta::assert_snapshot!(result.expect_err("duplicate"), @r#"Operation get is already registered for path "/pets""#);
    }

    #[test]
    fn should_mark_path_parameters_required_and_skip_references() {
        let mut parameters = json!([
            {"name": "petId", "in": "path"},
            {"name": "petId", "in": "query"},
            {"$ref": "#/components/parameters/Limit"},
            {"$ref": "#/components/parameters/Limit"}
        ]);

        check_parameters(&mut parameters).expect("valid parameters");

        assert_eq!(
            parameters,
            json!([
                {"name": "petId", "in": "path", "required": true},
                {"name": "petId", "in": "query"},
                {"$ref": "#/components/parameters/Limit"},
                {"$ref": "#/components/parameters/Limit"}
            ])
        );
    }

    #[test]
    fn should_reject_duplicate_parameters() {
        let mut parameters = json!([
            {"name": "id", "in": "query"},
            {"name": "id", "in": "query"}
        ]);

        let result = check_parameters(&mut parameters);

        insta::assert_snapshot!(result.expect_err("duplicate"), @r#"Duplicate parameter with name "id" and location "query""#);
    }

    #[rstest]
    #[case::no_keys(json!([{"schema": {"type": "string"}}]), vec!["name", "in"])]
    #[case::no_location(json!([{"name": "id"}]), vec!["in"])]
    #[case::not_a_mapping(json!([["id", "query"]]), vec!["name", "in"])]
    fn should_report_missing_parameter_keys(#[case] mut parameters: Value, #[case] expected: Vec<&str>) {
        let result = check_parameters(&mut parameters);

        assert!(matches!(
            result,
            Err(Error::InvalidParameter { ref missing }) if *missing == expected
        ));
    }

    #[test]
    fn should_reject_parameters_that_are_not_a_list() {
        let mut parameters = json!({"in": "query"});

        let result = check_parameters(&mut parameters);

        insta::assert_snapshot!(result.expect_err("not a list"), @r#"Expected a list of parameters, got: {"in":"query"}"#);
    }
}
