//! Tagged-document codec for parameters and conditions.
//!
//! The persisted form of every parameter is a JSON mapping carrying a
//! `_class` tag and a `uid`, e.g.
//! `{"_class": "UniformNumber", "uid": 3, "lower": 1, "upper": 100, ...}`.
//! Decoding dispatches on the tag through a closed table; unknown tags are
//! rejected. The legacy aliases `UniformFloat` and `UniformInt` found in
//! older persisted documents normalize to `UniformNumber`.

use serde_json::{json, Map, Value};

use crate::error::{Result, SpaceError};
use crate::space::param::{
    Categorical, Choice, Condition, Constant, Domain, NumberKind, Parameter, Uid, Uniform,
};
use crate::space::value::ParamValue;

/// Key carrying the document tag.
pub const CLASS_KEY: &str = "_class";

/// True for mappings that decode as a parameter or condition document.
pub fn is_tagged(node: &Value) -> bool {
    tagged_map(node).is_some()
}

/// The underlying mapping of a tagged document, if `node` is one.
pub(crate) fn tagged_map(node: &Value) -> Option<&Map<String, Value>> {
    node.as_object().filter(|map| map.get(CLASS_KEY).map_or(false, Value::is_string))
}

/// Read the identity field of a tagged document without a full decode.
pub(crate) fn read_uid(map: &Map<String, Value>) -> Result<Uid> {
    map.get("uid")
        .and_then(Value::as_u64)
        .map(Uid)
        .ok_or_else(|| malformed("missing or non-integer `uid`"))
}

fn malformed(reason: impl Into<String>) -> SpaceError {
    SpaceError::MalformedDocument { reason: reason.into() }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Value> {
    map.get(key).ok_or_else(|| malformed(format!("missing field `{}`", key)))
}

fn f64_field(map: &Map<String, Value>, key: &str) -> Result<f64> {
    field(map, key)?
        .as_f64()
        .ok_or_else(|| malformed(format!("field `{}` is not a number", key)))
}

fn bool_field(map: &Map<String, Value>, key: &str) -> Result<bool> {
    field(map, key)?
        .as_bool()
        .ok_or_else(|| malformed(format!("field `{}` is not a boolean", key)))
}

fn literal_field(map: &Map<String, Value>, key: &str) -> Result<ParamValue> {
    ParamValue::from_json(field(map, key)?)
        .ok_or_else(|| malformed(format!("field `{}` is not a literal value", key)))
}

/// Encode a parameter into its tagged document.
pub fn encode_parameter(param: &Parameter) -> Value {
    let uid = param.uid().0;
    match param.domain() {
        Domain::Constant(c) => json!({
            CLASS_KEY: "Constant",
            "uid": uid,
            "value": c.value.to_json(),
        }),
        Domain::Categorical(c) => {
            let choices: Vec<Value> = c
                .choices
                .iter()
                .map(|choice| match choice {
                    Choice::Literal(v) => v.to_json(),
                    Choice::Constant { uid, value } => json!({
                        CLASS_KEY: "Constant",
                        "uid": uid.0,
                        "value": value.to_json(),
                    }),
                })
                .collect();
            json!({ CLASS_KEY: "Categorical", "uid": uid, "choices": choices })
        }
        Domain::Uniform(u) => {
            let (lower, upper, default, kind) = match u.kind {
                NumberKind::Int => (
                    Value::from(u.lower as i64),
                    Value::from(u.upper as i64),
                    Value::from(u.default as i64),
                    "int",
                ),
                NumberKind::Float => {
                    (Value::from(u.lower), Value::from(u.upper), Value::from(u.default), "float")
                }
            };
            json!({
                CLASS_KEY: "UniformNumber",
                "uid": uid,
                "lower": lower,
                "upper": upper,
                "type": kind,
                "default": default,
                "log_scale": u.log_scale,
            })
        }
        Domain::Gaussian(g) => json!({
            CLASS_KEY: "Gaussian",
            "uid": uid,
            "mu": g.mu,
            "sigma": g.sigma,
            "type": "float",
            "log_scale": g.log_scale,
        }),
        Domain::Conditional(c) => json!({
            CLASS_KEY: "ConditionResult",
            "uid": uid,
            "result": encode_parameter(&c.result),
            "condition": encode_condition(&c.condition),
        }),
    }
}

/// Encode a condition into its tagged document.
pub fn encode_condition(condition: &Condition) -> Value {
    let choices: Vec<Value> = condition.choices().iter().map(ParamValue::to_json).collect();
    json!({
        CLASS_KEY: "Condition",
        "uid": condition.governor().0,
        "choices": choices,
    })
}

/// Decode a tagged document back into a parameter.
///
/// Rejects unknown tags with `UnknownParameterKind`; a `Condition` document
/// is not a parameter and is rejected the same way.
pub fn decode_parameter(node: &Value) -> Result<Parameter> {
    let map = node.as_object().ok_or_else(|| malformed("parameter document is not a mapping"))?;
    let tag = map
        .get(CLASS_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing `_class` tag"))?;

    match tag {
        "Constant" => decode_constant(map),
        "Categorical" => decode_categorical(map),
        "UniformNumber" => decode_uniform(map, None),
        "UniformFloat" => decode_uniform(map, Some(NumberKind::Float)),
        "UniformInt" => decode_uniform(map, Some(NumberKind::Int)),
        "Gaussian" => decode_gaussian(map),
        "ConditionResult" => decode_condition_result(map),
        other => Err(SpaceError::UnknownParameterKind { tag: other.to_string() }),
    }
}

fn decode_constant(map: &Map<String, Value>) -> Result<Parameter> {
    let uid = read_uid(map)?;
    let value = literal_field(map, "value")?;
    Ok(Parameter::from_decoded(uid, Domain::Constant(Constant { value })))
}

fn decode_categorical(map: &Map<String, Value>) -> Result<Parameter> {
    let uid = read_uid(map)?;
    let entries = field(map, "choices")?
        .as_array()
        .ok_or_else(|| malformed("`choices` is not a sequence"))?;
    if entries.is_empty() {
        return Err(SpaceError::InvalidDomain {
            uid,
            reason: "categorical parameter needs at least one choice".into(),
        });
    }
    let mut choices = Vec::with_capacity(entries.len());
    for entry in entries {
        if is_tagged(entry) {
            let nested = decode_parameter(entry)?;
            choices.push(Choice::constant(&nested)?);
        } else {
            let literal = ParamValue::from_json(entry).ok_or_else(|| SpaceError::InvalidDomain {
                uid,
                reason: format!("choice {} is neither a literal nor a Constant", entry),
            })?;
            choices.push(Choice::Literal(literal));
        }
    }
    Ok(Parameter::from_decoded(uid, Domain::Categorical(Categorical { choices })))
}

fn decode_uniform(map: &Map<String, Value>, alias_kind: Option<NumberKind>) -> Result<Parameter> {
    let uid = read_uid(map)?;
    let kind = match map.get("type").and_then(Value::as_str) {
        Some("int") => NumberKind::Int,
        Some("float") => NumberKind::Float,
        Some(other) => return Err(malformed(format!("unknown numeric type `{}`", other))),
        None => alias_kind.ok_or_else(|| malformed("missing field `type`"))?,
    };
    let lower = f64_field(map, "lower")?;
    let upper = f64_field(map, "upper")?;
    let default = f64_field(map, "default")?;
    let log_scale = bool_field(map, "log_scale")?;
    if upper <= lower {
        return Err(SpaceError::InvalidDomain {
            uid,
            reason: format!("upper bound {} is not above lower bound {}", upper, lower),
        });
    }
    if log_scale && lower <= 0.0 {
        return Err(SpaceError::InvalidDomain {
            uid,
            reason: "log scale requires a positive lower bound".into(),
        });
    }
    if !(lower <= default && default <= upper) {
        return Err(SpaceError::InvalidDomain {
            uid,
            reason: format!("default {} is not between {} and {}", default, lower, upper),
        });
    }
    Ok(Parameter::from_decoded(
        uid,
        Domain::Uniform(Uniform { kind, lower, upper, default, log_scale }),
    ))
}

fn decode_gaussian(map: &Map<String, Value>) -> Result<Parameter> {
    let uid = read_uid(map)?;
    let mu = f64_field(map, "mu")?;
    let sigma = f64_field(map, "sigma")?;
    let log_scale = bool_field(map, "log_scale")?;
    Parameter::gaussian_inner(uid, mu, sigma, log_scale)
}

fn decode_condition_result(map: &Map<String, Value>) -> Result<Parameter> {
    let result = decode_parameter(field(map, "result")?)?;
    let condition = decode_condition(field(map, "condition")?)?;
    // only_if re-runs the self-reference and nesting checks
    result.only_if(condition)
}

/// Decode a condition document.
///
/// Triggering values may be bare literals or nested `Constant` documents;
/// constants resolve to their literal value.
pub fn decode_condition(node: &Value) -> Result<Condition> {
    let map = node.as_object().ok_or_else(|| malformed("condition document is not a mapping"))?;
    match map.get(CLASS_KEY).and_then(Value::as_str) {
        Some("Condition") => {}
        Some(other) => return Err(SpaceError::UnknownParameterKind { tag: other.to_string() }),
        None => return Err(malformed("missing `_class` tag on condition")),
    }
    let governor = read_uid(map)?;
    let entries = field(map, "choices")?
        .as_array()
        .ok_or_else(|| malformed("condition `choices` is not a sequence"))?;
    let mut choices = Vec::with_capacity(entries.len());
    for entry in entries {
        if is_tagged(entry) {
            let nested = decode_parameter(entry)?;
            match nested.domain() {
                Domain::Constant(c) => choices.push(c.value.clone()),
                _ => {
                    return Err(malformed(
                        "condition choices must be literals or Constant parameters",
                    ))
                }
            }
        } else {
            choices.push(
                ParamValue::from_json(entry)
                    .ok_or_else(|| malformed("condition choice is not a literal"))?,
            );
        }
    }
    Ok(Condition::for_uid(governor, choices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::param::UidAllocator;

    fn round_trip(param: &Parameter) -> Parameter {
        decode_parameter(&encode_parameter(param)).unwrap()
    }

    #[test]
    fn test_round_trip_every_kind() {
        let mut alloc = UidAllocator::new();
        let constant = Parameter::constant(&mut alloc, "adam");
        let categorical =
            Parameter::categorical(&mut alloc, vec![1.into(), 2.into(), "sgd".into()]).unwrap();
        let uniform_int = Parameter::uniform_int(&mut alloc, 32, 64).unwrap();
        let uniform_float = Parameter::uniform_float_log(&mut alloc, 1e-4, 1e-1).unwrap();
        let gaussian = Parameter::gaussian(&mut alloc, 0.0, 1.0).unwrap();

        for p in [&constant, &categorical, &uniform_int, &uniform_float, &gaussian] {
            assert_eq!(round_trip(p), *p);
        }
    }

    #[test]
    fn test_round_trip_conditional() {
        let mut alloc = UidAllocator::new();
        let layers = Parameter::categorical(&mut alloc, vec![1.into(), 2.into()]).unwrap();
        let units = Parameter::uniform_int(&mut alloc, 32, 64)
            .unwrap()
            .only_if(Condition::new(&layers, vec![ParamValue::Int(2)]))
            .unwrap();
        assert_eq!(round_trip(&units), units);
    }

    #[test]
    fn test_round_trip_categorical_with_constant_choice() {
        let mut alloc = UidAllocator::new();
        let two = Parameter::constant(&mut alloc, 2);
        let p = Parameter::categorical(
            &mut alloc,
            vec![Choice::from(1), Choice::constant(&two).unwrap()],
        )
        .unwrap();
        assert_eq!(round_trip(&p), p);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let doc = json!({"_class": "Hypergeometric", "uid": 0});
        let err = decode_parameter(&doc).unwrap_err();
        assert!(matches!(err, SpaceError::UnknownParameterKind { .. }));
    }

    #[test]
    fn test_condition_document_is_not_a_parameter() {
        let doc = json!({"_class": "Condition", "uid": 0, "choices": [1]});
        let err = decode_parameter(&doc).unwrap_err();
        assert!(matches!(err, SpaceError::UnknownParameterKind { .. }));
    }

    #[test]
    fn test_legacy_uniform_aliases() {
        let doc = json!({
            "_class": "UniformFloat",
            "uid": 4,
            "lower": 0.0,
            "upper": 1.0,
            "default": 0.5,
            "log_scale": false,
        });
        let p = decode_parameter(&doc).unwrap();
        assert_eq!(p.uid(), Uid(4));
        assert!(p.valid(&ParamValue::Float(0.3)));

        let doc = json!({
            "_class": "UniformInt",
            "uid": 5,
            "lower": 1,
            "upper": 10,
            "default": 5,
            "log_scale": false,
        });
        let p = decode_parameter(&doc).unwrap();
        assert_eq!(p.default_value().unwrap(), ParamValue::Int(5));
    }

    #[test]
    fn test_decode_validates_domains() {
        let doc = json!({
            "_class": "UniformNumber",
            "uid": 0,
            "lower": 5.0,
            "upper": 1.0,
            "type": "float",
            "default": 3.0,
            "log_scale": false,
        });
        assert!(matches!(decode_parameter(&doc), Err(SpaceError::InvalidDomain { .. })));
    }

    #[test]
    fn test_decode_rejects_self_referencing_conditional() {
        let mut alloc = UidAllocator::new();
        let inner = Parameter::uniform_int(&mut alloc, 0, 10).unwrap();
        let doc = json!({
            "_class": "ConditionResult",
            "uid": inner.uid().0,
            "result": encode_parameter(&inner),
            "condition": {"_class": "Condition", "uid": inner.uid().0, "choices": [1]},
        });
        assert!(matches!(decode_parameter(&doc), Err(SpaceError::SelfReference { .. })));
    }

    #[test]
    fn test_condition_decode_unwraps_constants() {
        let doc = json!({
            "_class": "Condition",
            "uid": 9,
            "choices": [{"_class": "Constant", "uid": 3, "value": 2}, 1],
        });
        let cond = decode_condition(&doc).unwrap();
        assert!(cond.holds(&ParamValue::Int(2)));
        assert!(cond.holds(&ParamValue::Int(1)));
        assert!(!cond.holds(&ParamValue::Int(3)));
    }
}
