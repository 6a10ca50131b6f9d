//! Substituting values into a structure and reading them back out.
//!
//! `fill` turns the canonical structure plus a flat identity→value mapping
//! into a concrete configuration; `extract` inverts it by reading each
//! parameter's recorded path out of a concrete configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::{Result, SpaceError};
use crate::space::codec;
use crate::space::param::{Parameter, Uid};
use crate::space::path::{ParamPath, PathSegment};
use crate::space::value::ParamValue;

/// Replace every embedded parameter document with its value from `values`.
///
/// Mappings and sequences are rebuilt preserving shape and order; opaque
/// scalars pass through. Fails with `MissingValue` for any parameter whose
/// identity has no entry.
pub fn fill(structure: &Value, values: &BTreeMap<Uid, ParamValue>) -> Result<Value> {
    if let Some(map) = codec::tagged_map(structure) {
        let uid = codec::read_uid(map)?;
        return match values.get(&uid) {
            Some(v) => Ok(v.to_json()),
            None => Err(SpaceError::MissingValue { uid }),
        };
    }
    match structure {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key.clone(), fill(child, values)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for child in items {
                out.push(fill(child, values)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

/// Like `fill`, but parameters in `absent` are dropped: a mapping entry
/// whose value would be absent is omitted, and a sequence slot becomes
/// `null` (removal would shift the recorded indices of its neighbors).
pub(crate) fn fill_partial(
    structure: &Value,
    values: &BTreeMap<Uid, ParamValue>,
    absent: &BTreeSet<Uid>,
) -> Result<Value> {
    // Absent markers only make sense where the node can be skipped or
    // nulled; resolve them in the container cases below.
    if let Some(map) = codec::tagged_map(structure) {
        let uid = codec::read_uid(map)?;
        return match values.get(&uid) {
            Some(v) => Ok(v.to_json()),
            None if absent.contains(&uid) => Ok(Value::Null),
            None => Err(SpaceError::MissingValue { uid }),
        };
    }
    match structure {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                if is_absent_param(child, values, absent)? {
                    continue;
                }
                out.insert(key.clone(), fill_partial(child, values, absent)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for child in items {
                out.push(fill_partial(child, values, absent)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn is_absent_param(
    node: &Value,
    values: &BTreeMap<Uid, ParamValue>,
    absent: &BTreeSet<Uid>,
) -> Result<bool> {
    match codec::tagged_map(node) {
        Some(map) => {
            let uid = codec::read_uid(map)?;
            Ok(!values.contains_key(&uid) && absent.contains(&uid))
        }
        None => Ok(false),
    }
}

/// Read the value at `path` inside a concrete configuration.
pub fn lookup_path<'a>(root: &'a Value, path: &ParamPath) -> Result<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        let next = match segment {
            PathSegment::Key(key) => node.as_object().and_then(|map| map.get(key)),
            PathSegment::Index(index) => node.as_array().and_then(|items| items.get(*index)),
        };
        node = next.ok_or_else(|| SpaceError::PathNotFound { path: path.to_string() })?;
    }
    Ok(node)
}

/// Read every parameter's value out of a concrete configuration, keyed by
/// name. Fails with `PathNotFound` when a recorded path is missing.
pub fn extract(
    config: &Value,
    parameters: &BTreeMap<Uid, Parameter>,
) -> Result<BTreeMap<String, ParamValue>> {
    let mut out = BTreeMap::new();
    for param in parameters.values() {
        let path = param.name().ok_or_else(|| SpaceError::InconsistentSpace {
            reason: format!("parameter {} has not been collected into a space", param.uid()),
        })?;
        let node = lookup_path(config, path)?;
        let value = ParamValue::from_json(node).ok_or_else(|| SpaceError::MalformedDocument {
            reason: format!("value at `{}` is not a literal", path),
        })?;
        out.insert(path.to_string(), value);
    }
    Ok(out)
}
