//! Component names written as plain strings.
//!
//! Wherever a component may appear (a parameter in a list, a response under its status code,
//! a schema, a header, an example), a string is taken as the name of a registered component and
//! replaced by a reference to it. Other strings are left alone.

use serde_json::Value;

use crate::fragment::{Fragment, FragmentMap};
use crate::registry::ComponentKind;
use crate::version::{MajorVersion, VersionPolicy};

fn name_to_ref(kind: ComponentKind, fragment: &mut Fragment) {
    if let Fragment::Scalar(Value::String(name)) = fragment {
        let name = std::mem::take(name);
        *fragment = Fragment::reference(kind, name);
    }
}

fn values_mut<'a>(map: &'a mut FragmentMap, key: &str) -> impl Iterator<Item = &'a mut Fragment> {
    map.get_mut(key)
        .and_then(Fragment::as_map_mut)
        .into_iter()
        .flat_map(|entries| entries.values_mut())
}

pub(super) fn schema(fragment: &mut Fragment) {
    name_to_ref(ComponentKind::Schema, fragment);
    let Some(schema) = fragment.as_map_mut() else {
        return;
    };
    for property in values_mut(schema, "properties") {
        self::schema(property);
    }
    for key in ["items", "not"] {
        if let Some(nested) = schema.get_mut(key) {
            self::schema(nested);
        }
    }
    for key in ["allOf", "oneOf", "anyOf"] {
        if let Some(Fragment::Seq(nested)) = schema.get_mut(key) {
            nested.iter_mut().for_each(self::schema);
        }
    }
}

/// Handles the `schema` and `examples` of a parameter, header or media type.
pub(super) fn media(map: &mut FragmentMap) {
    if let Some(nested) = map.get_mut("schema") {
        schema(nested);
    }
    for example in values_mut(map, "examples") {
        name_to_ref(ComponentKind::Example, example);
    }
}

pub(super) fn parameter(fragment: &mut Fragment) {
    name_to_ref(ComponentKind::Parameter, fragment);
    if let Some(parameter) = fragment.as_map_mut() {
        media(parameter);
    }
}

pub(super) fn response(policy: &VersionPolicy, fragment: &mut Fragment) {
    name_to_ref(ComponentKind::Response, fragment);
    let Some(response) = fragment.as_map_mut() else {
        return;
    };
    if policy.major() == MajorVersion::V2 {
        if let Some(nested) = response.get_mut("schema") {
            schema(nested);
        }
        return;
    }
    for media_type in values_mut(response, "content") {
        if let Some(media_type) = media_type.as_map_mut() {
            media(media_type);
        }
    }
    for header in values_mut(response, "headers") {
        name_to_ref(ComponentKind::Header, header);
        if let Some(header) = header.as_map_mut() {
            media(header);
        }
    }
}

pub(super) fn operation(policy: &VersionPolicy, fragment: &mut Fragment) {
    let Some(operation) = fragment.as_map_mut() else {
        return;
    };
    if let Some(Fragment::Seq(parameters)) = operation.get_mut("parameters") {
        parameters.iter_mut().for_each(parameter);
    }
    if let Some(body) = operation.get_mut("requestBody").and_then(Fragment::as_map_mut) {
        for media_type in values_mut(body, "content") {
            if let Some(media_type) = media_type.as_map_mut() {
                media(media_type);
            }
        }
    }
    for code in values_mut(operation, "responses") {
        response(policy, code);
    }
}
