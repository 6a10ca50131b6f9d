//! Recursive discovery of parameters inside a nested definition structure.
//!
//! Walks mappings and sequences to arbitrary depth, decodes every embedded
//! tagged parameter document, and names each parameter by its discovery
//! path. A parameter reachable through several paths (shared sub-structure)
//! keeps the shortest, lexicographically smallest one.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Result, SpaceError};
use crate::space::codec;
use crate::space::param::{Parameter, Uid};
use crate::space::path::ParamPath;

/// Defensive bound on structure nesting. Definition structures are data
/// literals; anything deeper than this is a malformed document.
pub const MAX_DEPTH: usize = 128;

/// Extract every parameter embedded in `node`, keyed by identity.
pub fn collect(node: &Value) -> Result<BTreeMap<Uid, Parameter>> {
    let mut found = BTreeMap::new();
    walk(node, &ParamPath::root(), 0, &mut found)?;
    Ok(found)
}

fn walk(
    node: &Value,
    path: &ParamPath,
    depth: usize,
    found: &mut BTreeMap<Uid, Parameter>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(SpaceError::StructureTooDeep { limit: MAX_DEPTH });
    }

    if codec::is_tagged(node) {
        let mut param = codec::decode_parameter(node)?;
        match found.get_mut(&param.uid()) {
            None => {
                param.offer_name(path.clone());
                found.insert(param.uid(), param);
            }
            Some(existing) if existing.definition_eq(&param) => {
                existing.offer_name(path.clone());
            }
            Some(existing) => {
                tracing::warn!(
                    uid = %param.uid(),
                    kept = %existing.name().map(ToString::to_string).unwrap_or_default(),
                    ignored = %path,
                    "multiple definitions for parameter, using the first"
                );
            }
        }
        return Ok(());
    }

    match node {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &path.child(key), depth + 1, found)?;
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, &path.element(index), depth + 1, found)?;
            }
        }
        _ => {}
    }
    Ok(())
}
