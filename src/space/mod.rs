//! Declarative search spaces: definition structures with embedded
//! parameters, validation, and dependency-ordered sampling.
//!
//! A space is built once from a nested definition structure, keeps the
//! structure as its canonical persisted form, and exposes flat name-keyed
//! sampling on top of it.
//!
//! # Example
//!
//! ```
//! use hypertune::space::{Parameter, SearchSpace, UidAllocator};
//! use serde_json::json;
//!
//! let mut alloc = UidAllocator::new();
//! let lr = Parameter::uniform_float_log(&mut alloc, 1e-4, 1e-1)?;
//! let batch = Parameter::uniform_int(&mut alloc, 32, 256)?;
//!
//! let space = SearchSpace::new(json!({
//!     "learning_rate": lr.encode(),
//!     "batch_size": batch.encode(),
//! }))?;
//!
//! let config = space.sample()?;
//! assert!(space.valid(&config));
//! # Ok::<(), hypertune::SpaceError>(())
//! ```

pub mod codec;
pub mod collect;
pub mod fill;
pub mod param;
pub mod path;
pub mod value;

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde_json::Value;

use crate::error::{Result, SpaceError};

pub use param::{
    Categorical, Choice, Condition, ConditionResult, Constant, Domain, Gaussian, NumberKind,
    Parameter, Uid, UidAllocator, Uniform,
};
pub use path::{ParamPath, PathSegment};
pub use value::ParamValue;

/// A flat configuration: parameter name to sampled value.
pub type Config = BTreeMap<String, ParamValue>;

/// How to resolve parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Draw each parameter from its distribution
    Random,
    /// Take each parameter's deterministic default
    Default,
}

/// Resolution pass bound for conditional parameters.
///
/// The bound is O(max conditional chain depth), not a precise cycle
/// detector: a true cycle always exceeds it, but so would a dependency
/// chain deeper than this.
pub const DEFAULT_MAX_PASSES: usize = 50;

/// A search space: the canonical nested structure, the flat parameter
/// index, and the conditional/unconditional partition.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    structure: Value,
    id: Option<String>,
    parameters: BTreeMap<Uid, Parameter>,
    non_conditions: Vec<String>,
    conditions: Vec<String>,
    name_to_uid: BTreeMap<String, Uid>,
    uid_to_name: BTreeMap<Uid, String>,
}

impl SearchSpace {
    /// Build a space from a definition structure.
    ///
    /// The structure is an arbitrary nested mapping with encoded parameter
    /// documents embedded at any depth (see [`Parameter::encode`]). Entries
    /// that are not parameters are kept as opaque fixed values.
    ///
    /// Fails with `InconsistentSpace` when a conditional parameter's
    /// governor is not itself declared in the structure.
    pub fn new(structure: Value) -> Result<Self> {
        if !structure.is_object() || codec::is_tagged(&structure) {
            return Err(SpaceError::MalformedDocument {
                reason: "definition structure must be a mapping of entries".into(),
            });
        }
        let parameters = collect::collect(&structure)?;

        let mut non_conditions = Vec::new();
        let mut conditions = Vec::new();
        let mut name_to_uid = BTreeMap::new();
        let mut uid_to_name = BTreeMap::new();
        for (uid, param) in &parameters {
            let name = match param.name() {
                Some(path) => path.to_string(),
                None => {
                    return Err(SpaceError::InconsistentSpace {
                        reason: format!("parameter {} was collected without a name", uid),
                    })
                }
            };
            name_to_uid.insert(name.clone(), *uid);
            uid_to_name.insert(*uid, name.clone());
            if param.is_conditional() {
                conditions.push(name);
            } else {
                non_conditions.push(name);
            }
        }

        for name in &conditions {
            let param = &parameters[&name_to_uid[name]];
            if let Some(condition) = param.condition() {
                let governor = condition.governor();
                if !parameters.contains_key(&governor) {
                    return Err(SpaceError::InconsistentSpace {
                        reason: format!(
                            "conditional parameter `{}` depends on {} which is not in the space",
                            name, governor
                        ),
                    });
                }
            }
        }

        Ok(Self {
            structure,
            id: None,
            parameters,
            non_conditions,
            conditions,
            name_to_uid,
            uid_to_name,
        })
    }

    /// Rebuild a space from its persisted document form.
    ///
    /// Expects `{"_class": "SearchSpace", ...structure..., "_id": ...}`;
    /// the stored id, if any, is kept and available via [`SearchSpace::id`].
    pub fn decode(document: Value) -> Result<Self> {
        let Value::Object(mut map) = document else {
            return Err(SpaceError::MalformedDocument {
                reason: "search-space document is not a mapping".into(),
            });
        };
        match map.remove(codec::CLASS_KEY) {
            Some(Value::String(tag)) if tag == "SearchSpace" => {}
            Some(Value::String(tag)) => {
                return Err(SpaceError::UnknownParameterKind { tag });
            }
            _ => {
                return Err(SpaceError::MalformedDocument {
                    reason: "search-space document lacks a `_class` tag".into(),
                })
            }
        }
        let id = map.remove("_id").map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });
        let mut space = Self::new(Value::Object(map))?;
        space.id = id;
        Ok(space)
    }

    /// The persisted document form.
    pub fn encode(&self) -> Value {
        let mut map = match &self.structure {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        map.insert(codec::CLASS_KEY.to_string(), Value::String("SearchSpace".into()));
        if let Some(id) = &self.id {
            map.insert("_id".to_string(), Value::String(id.clone()));
        }
        Value::Object(map)
    }

    /// The canonical nested structure, parameters still embedded.
    pub fn structure(&self) -> &Value {
        &self.structure
    }

    /// The opaque identifier assigned by the persistence collaborator.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Attach the identifier handed out by the persistence collaborator.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Flat index of parameters by identity.
    pub fn parameters(&self) -> &BTreeMap<Uid, Parameter> {
        &self.parameters
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// True when the space declares no parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Names of unconditional parameters, in identity order.
    pub fn unconditional_names(&self) -> &[String] {
        &self.non_conditions
    }

    /// Names of conditional parameters, in identity order.
    pub fn conditional_names(&self) -> &[String] {
        &self.conditions
    }

    /// Whether `name` names a parameter of this space.
    pub fn is_valid_name(&self, name: &str) -> bool {
        self.name_to_uid.contains_key(name)
    }

    /// The name assigned to an identity.
    pub fn name_of(&self, uid: Uid) -> Option<&str> {
        self.uid_to_name.get(&uid).map(String::as_str)
    }

    /// The identity behind a name.
    pub fn uid_of(&self, name: &str) -> Option<Uid> {
        self.name_to_uid.get(name).copied()
    }

    fn by_name(&self, name: &str) -> Option<&Parameter> {
        self.name_to_uid.get(name).and_then(|uid| self.parameters.get(uid))
    }

    /// Sample a random configuration with the thread-local RNG.
    pub fn sample(&self) -> Result<Config> {
        self.sample_with(&mut rand::thread_rng(), DEFAULT_MAX_PASSES)
    }

    /// Sample a random configuration with an explicit RNG and pass bound.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R, max_passes: usize) -> Result<Config> {
        self.resolve_with(Strategy::Random, rng, max_passes)
    }

    /// The all-defaults configuration.
    pub fn default_config(&self) -> Result<Config> {
        self.resolve_with(Strategy::Default, &mut rand::thread_rng(), DEFAULT_MAX_PASSES)
    }

    /// Resolve a full configuration under the given strategy.
    ///
    /// Unconditional parameters resolve immediately; conditionals resolve in
    /// passes once their governor has resolved. A conditional whose governor
    /// resolved to absent is itself absent, without evaluating its condition.
    /// Absent parameters are not inserted into the result.
    pub fn resolve_with<R: Rng + ?Sized>(
        &self,
        strategy: Strategy,
        rng: &mut R,
        max_passes: usize,
    ) -> Result<Config> {
        // None = resolved but absent
        let mut resolved: BTreeMap<String, Option<ParamValue>> = BTreeMap::new();

        for name in &self.non_conditions {
            let param = self.by_name(name).ok_or_else(|| self.missing_param(name))?;
            let value = match strategy {
                Strategy::Random => param.sample_with(rng)?,
                Strategy::Default => param.default_value()?,
            };
            resolved.insert(name.clone(), Some(value));
        }

        let mut remaining: BTreeSet<String> = self.conditions.iter().cloned().collect();
        let mut passes = 0;
        while !remaining.is_empty() {
            for name in remaining.clone() {
                let param = self.by_name(&name).ok_or_else(|| self.missing_param(&name))?;
                let governor_uid = param
                    .condition()
                    .map(Condition::governor)
                    .ok_or_else(|| self.missing_param(&name))?;
                let governor_name = self
                    .uid_to_name
                    .get(&governor_uid)
                    .ok_or_else(|| self.missing_param(&governor_uid.to_string()))?;
                match resolved.get(governor_name) {
                    // governor itself not resolved yet, try next pass
                    None => continue,
                    // governor resolved but absent: short-circuit to absent
                    Some(None) => {
                        resolved.insert(name.clone(), None);
                        remaining.remove(&name);
                    }
                    Some(Some(governing)) => {
                        let value = match strategy {
                            Strategy::Random => param.conditional_sample_with(governing, rng)?,
                            Strategy::Default => param.conditional_default(governing)?,
                        };
                        resolved.insert(name.clone(), value);
                        remaining.remove(&name);
                    }
                }
            }
            passes += 1;
            if passes > max_passes && !remaining.is_empty() {
                let stuck: Vec<&str> = remaining.iter().map(String::as_str).collect();
                return Err(SpaceError::InconsistentSpace {
                    reason: format!(
                        "cannot satisfy conditionals involving [{}] within {} passes; \
                         likely a dependency cycle, otherwise raise the pass bound",
                        stuck.join(", "),
                        max_passes
                    ),
                });
            }
        }

        Ok(resolved.into_iter().filter_map(|(name, value)| value.map(|v| (name, v))).collect())
    }

    /// Whether a flat configuration is consistent with this space.
    ///
    /// Every unconditional parameter must be present and in-domain. A
    /// present conditional must have its condition hold under the
    /// configured governor value and its value in-domain; absent
    /// conditionals are always fine.
    pub fn valid(&self, config: &Config) -> bool {
        for name in &self.non_conditions {
            let ok = match (self.by_name(name), config.get(name)) {
                (Some(param), Some(value)) => param.valid(value),
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        for name in &self.conditions {
            let Some(value) = config.get(name) else { continue };
            let Some(param) = self.by_name(name) else { return false };
            let Some(condition) = param.condition() else { return false };
            let governor_name = match self.uid_to_name.get(&condition.governor()) {
                Some(n) => n,
                None => return false,
            };
            match config.get(governor_name) {
                Some(governing) if condition.holds(governing) => {
                    if !param.valid(value) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Build the concrete nested configuration for a flat name-keyed config.
    ///
    /// Conditional parameters missing from `config` are treated as absent:
    /// their mapping entries are dropped and sequence slots become `null`.
    /// A missing unconditional parameter is a `MissingValue` error.
    pub fn realize(&self, config: &Config) -> Result<Value> {
        let mut values = BTreeMap::new();
        for (name, value) in config {
            if let Some(uid) = self.name_to_uid.get(name) {
                values.insert(*uid, value.clone());
            }
        }
        let absent: BTreeSet<Uid> = self
            .conditions
            .iter()
            .filter_map(|name| self.name_to_uid.get(name))
            .filter(|uid| !values.contains_key(uid))
            .copied()
            .collect();
        fill::fill_partial(&self.structure, &values, &absent)
    }

    /// Read a flat name-keyed config back out of a concrete configuration.
    ///
    /// Missing paths are `PathNotFound` for unconditional parameters and
    /// "absent" (skipped) for conditional ones.
    pub fn extract_config(&self, concrete: &Value) -> Result<Config> {
        let mut out = Config::new();
        for param in self.parameters.values() {
            let path = match param.name() {
                Some(path) => path,
                None => return Err(self.missing_param(&param.uid().to_string())),
            };
            let name = path.to_string();
            match fill::lookup_path(concrete, path) {
                Ok(node) => {
                    let value = ParamValue::from_json(node).ok_or_else(|| {
                        SpaceError::MalformedDocument {
                            reason: format!("value at `{}` is not a literal", path),
                        }
                    })?;
                    out.insert(name, value);
                }
                Err(SpaceError::PathNotFound { .. }) if param.is_conditional() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Drop configuration entries that are not parameters of this space.
    pub fn clean_config(&self, config: &Config) -> Config {
        config
            .iter()
            .filter(|(name, _)| self.is_valid_name(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Check this declared space against a reloaded persisted one.
    ///
    /// The stored `_id` is not part of the comparison. A mismatch is
    /// `InconsistentSpace` and requires explicit operator intervention
    /// (a new space, or dropping the stored one).
    pub fn verify_against(&self, stored: &SearchSpace) -> Result<()> {
        if self == stored {
            Ok(())
        } else {
            Err(SpaceError::InconsistentSpace {
                reason: "declared search space disagrees with the stored one; \
                         store it anew if the definition changed"
                    .into(),
            })
        }
    }

    fn missing_param(&self, name: &str) -> SpaceError {
        SpaceError::InconsistentSpace { reason: format!("parameter `{}` is not in the space", name) }
    }
}

/// Two spaces are equal iff their canonical structures are deeply equal;
/// the persisted id does not participate.
impl PartialEq for SearchSpace {
    fn eq(&self, other: &Self) -> bool {
        self.structure == other.structure
    }
}
