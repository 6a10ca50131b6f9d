//! Hyperparameter domains: constants, categorical choices, uniform numbers,
//! gaussians, and the conditional wrapper.
//!
//! A `Parameter` couples a stable identity (`Uid`) with a closed `Domain`
//! variant. Everything but the structural `name` is immutable after
//! construction; the name is the single side-channel, written by the
//! collector when the parameter is discovered inside a search space.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};

use crate::error::{Result, SpaceError};
use crate::space::path::ParamPath;
use crate::space::value::ParamValue;

/// Floor applied to the lower bound before taking logs, so log-space draws
/// never see `ln(0)`.
const LOG_FLOOR: f64 = 1e-7;

/// Stable identity of a parameter, unique within one allocator's lifetime
/// and preserved across encode/decode cycles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Uid(pub u64);

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out identities for newly constructed parameters.
///
/// Deliberately not a process-wide singleton: each definition owns its
/// allocator, so two independently built spaces get non-interfering (and,
/// for identical definitions, identical) identity sequences.
#[derive(Debug, Default)]
pub struct UidAllocator {
    next: u64,
}

impl UidAllocator {
    /// Create an allocator starting at identity 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identity.
    pub fn next_uid(&mut self) -> Uid {
        let uid = Uid(self.next);
        self.next += 1;
        uid
    }
}

/// Numeric kind of a uniform parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Integer draws
    Int,
    /// Floating-point draws
    Float,
}

/// One entry in a categorical choice list: a literal, or a nested `Constant`
/// parameter that resolves to its literal value when drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    /// A bare literal value
    Literal(ParamValue),
    /// A `Constant` parameter standing in for its value
    Constant {
        /// Identity of the nested constant
        uid: Uid,
        /// The constant's literal value
        value: ParamValue,
    },
}

impl Choice {
    /// Wrap a `Constant` parameter as a choice entry.
    ///
    /// Fails with `InvalidDomain` for any other parameter kind.
    pub fn constant(param: &Parameter) -> Result<Choice> {
        match param.domain() {
            Domain::Constant(c) => Ok(Choice::Constant { uid: param.uid(), value: c.value.clone() }),
            _ => Err(SpaceError::InvalidDomain {
                uid: param.uid(),
                reason: "only literals and Constant parameters may appear among choices".into(),
            }),
        }
    }

    /// The literal this choice resolves to.
    pub fn resolved(&self) -> &ParamValue {
        match self {
            Choice::Literal(v) => v,
            Choice::Constant { value, .. } => value,
        }
    }
}

impl From<ParamValue> for Choice {
    fn from(v: ParamValue) -> Self {
        Choice::Literal(v)
    }
}

impl From<i64> for Choice {
    fn from(v: i64) -> Self {
        Choice::Literal(ParamValue::Int(v))
    }
}

impl From<i32> for Choice {
    fn from(v: i32) -> Self {
        Choice::Literal(ParamValue::Int(v as i64))
    }
}

impl From<f64> for Choice {
    fn from(v: f64) -> Self {
        Choice::Literal(ParamValue::Float(v))
    }
}

impl From<&str> for Choice {
    fn from(v: &str) -> Self {
        Choice::Literal(ParamValue::Str(v.to_string()))
    }
}

impl From<bool> for Choice {
    fn from(v: bool) -> Self {
        Choice::Literal(ParamValue::Bool(v))
    }
}

/// A fixed value that is part of the space but never varies.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub(crate) value: ParamValue,
}

/// An ordered set of choices drawn uniformly at random.
#[derive(Debug, Clone, PartialEq)]
pub struct Categorical {
    pub(crate) choices: Vec<Choice>,
}

/// A number drawn uniformly from `[lower, upper]`, optionally in log space.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub(crate) kind: NumberKind,
    pub(crate) lower: f64,
    pub(crate) upper: f64,
    pub(crate) default: f64,
    pub(crate) log_scale: bool,
}

/// A number drawn from a normal (or log-normal) distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian {
    pub(crate) mu: f64,
    pub(crate) sigma: f64,
    pub(crate) log_scale: bool,
}

/// A predicate over another parameter's sampled value.
///
/// Not itself sampled; `holds` decides whether the wrapped parameter of a
/// conditional contributes a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    governor: Uid,
    choices: Vec<ParamValue>,
}

impl Condition {
    /// Condition on `governor` taking one of `choices`.
    pub fn new(governor: &Parameter, choices: Vec<ParamValue>) -> Self {
        Self { governor: governor.uid(), choices }
    }

    /// Condition on `governor` taking the value of one of the given
    /// `Constant` parameters.
    ///
    /// The constants are unwrapped to their literal values up front;
    /// comparison semantics are the same as [`Condition::new`]. Fails with
    /// `InvalidDomain` when a trigger is not a constant.
    pub fn with_constants(governor: &Parameter, constants: &[Parameter]) -> Result<Self> {
        let mut choices = Vec::with_capacity(constants.len());
        for constant in constants {
            match constant.domain() {
                Domain::Constant(c) => choices.push(c.value.clone()),
                _ => {
                    return Err(SpaceError::InvalidDomain {
                        uid: constant.uid(),
                        reason: "condition triggers must be Constant parameters".into(),
                    })
                }
            }
        }
        Ok(Self { governor: governor.uid(), choices })
    }

    /// Condition on a raw identity, for when the governing parameter is not
    /// at hand (e.g. while decoding persisted documents).
    pub fn for_uid(governor: Uid, choices: Vec<ParamValue>) -> Self {
        Self { governor, choices }
    }

    /// Identity of the governing parameter.
    pub fn governor(&self) -> Uid {
        self.governor
    }

    /// The triggering values.
    pub fn choices(&self) -> &[ParamValue] {
        &self.choices
    }

    /// True when the governing parameter's value triggers this condition.
    pub fn holds(&self, governing_value: &ParamValue) -> bool {
        self.choices.iter().any(|choice| choice == governing_value)
    }
}

/// A parameter that only contributes a value when its condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionResult {
    pub(crate) result: Box<Parameter>,
    pub(crate) condition: Condition,
}

/// Closed set of parameter domains.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Fixed value
    Constant(Constant),
    /// Uniform choice from an ordered set
    Categorical(Categorical),
    /// Uniform number in a bounded range
    Uniform(Uniform),
    /// Normally distributed number
    Gaussian(Gaussian),
    /// Conditional wrapper around another domain
    Conditional(ConditionResult),
}

/// A declared hyperparameter: identity, optional structural name, domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    uid: Uid,
    name: Option<ParamPath>,
    domain: Domain,
}

impl Parameter {
    fn with_domain(uid: Uid, domain: Domain) -> Self {
        Self { uid, name: None, domain }
    }

    /// A constant parameter.
    pub fn constant(alloc: &mut UidAllocator, value: impl Into<ParamValue>) -> Parameter {
        Self::with_domain(alloc.next_uid(), Domain::Constant(Constant { value: value.into() }))
    }

    /// A categorical parameter over the given choices.
    ///
    /// Choices may mix literals and `Constant` parameters. An empty choice
    /// list is an `InvalidDomain` error.
    pub fn categorical(alloc: &mut UidAllocator, choices: Vec<Choice>) -> Result<Parameter> {
        let uid = alloc.next_uid();
        if choices.is_empty() {
            return Err(SpaceError::InvalidDomain {
                uid,
                reason: "categorical parameter needs at least one choice".into(),
            });
        }
        Ok(Self::with_domain(uid, Domain::Categorical(Categorical { choices })))
    }

    /// A uniform number with explicit kind, bounds, default and scale.
    ///
    /// `default = None` means the midpoint: arithmetic on a linear scale,
    /// geometric on a log scale. Fails with `InvalidDomain` when
    /// `lower >= upper`, when the default falls outside `[lower, upper]`,
    /// or when `log_scale` is requested with a non-positive lower bound.
    pub fn uniform(
        alloc: &mut UidAllocator,
        kind: NumberKind,
        lower: f64,
        upper: f64,
        default: Option<f64>,
        log_scale: bool,
    ) -> Result<Parameter> {
        let uid = alloc.next_uid();
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(SpaceError::InvalidDomain { uid, reason: "bounds must be finite".into() });
        }
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
        let mut default = default.unwrap_or_else(|| {
            if log_scale {
                ((lower.ln() + upper.ln()) / 2.0).exp()
            } else {
                (lower + upper) / 2.0
            }
        });
        if kind == NumberKind::Int {
            default = default.trunc();
        }
        if !(lower <= default && default <= upper) {
            return Err(SpaceError::InvalidDomain {
                uid,
                reason: format!("default {} is not between {} and {}", default, lower, upper),
            });
        }
        Ok(Self::with_domain(
            uid,
            Domain::Uniform(Uniform { kind, lower, upper, default, log_scale }),
        ))
    }

    /// A uniform float on a linear scale with midpoint default.
    pub fn uniform_float(alloc: &mut UidAllocator, lower: f64, upper: f64) -> Result<Parameter> {
        Self::uniform(alloc, NumberKind::Float, lower, upper, None, false)
    }

    /// A uniform float drawn in log space.
    pub fn uniform_float_log(
        alloc: &mut UidAllocator,
        lower: f64,
        upper: f64,
    ) -> Result<Parameter> {
        Self::uniform(alloc, NumberKind::Float, lower, upper, None, true)
    }

    /// A uniform integer on a linear scale with midpoint default.
    pub fn uniform_int(alloc: &mut UidAllocator, lower: i64, upper: i64) -> Result<Parameter> {
        Self::uniform(alloc, NumberKind::Int, lower as f64, upper as f64, None, false)
    }

    /// A uniform integer drawn in log space.
    pub fn uniform_int_log(alloc: &mut UidAllocator, lower: i64, upper: i64) -> Result<Parameter> {
        Self::uniform(alloc, NumberKind::Int, lower as f64, upper as f64, None, true)
    }

    /// A gaussian parameter with mean `mu` and standard deviation `sigma`.
    pub fn gaussian(alloc: &mut UidAllocator, mu: f64, sigma: f64) -> Result<Parameter> {
        Self::gaussian_inner(alloc.next_uid(), mu, sigma, false)
    }

    /// A log-normal parameter: `exp` of a normal draw with the given
    /// parameters.
    pub fn log_gaussian(alloc: &mut UidAllocator, mu: f64, sigma: f64) -> Result<Parameter> {
        Self::gaussian_inner(alloc.next_uid(), mu, sigma, true)
    }

    pub(crate) fn gaussian_inner(
        uid: Uid,
        mu: f64,
        sigma: f64,
        log_scale: bool,
    ) -> Result<Parameter> {
        if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
            return Err(SpaceError::InvalidDomain {
                uid,
                reason: format!("gaussian needs finite mu and non-negative sigma, got ({}, {})", mu, sigma),
            });
        }
        Ok(Self::with_domain(uid, Domain::Gaussian(Gaussian { mu, sigma, log_scale })))
    }

    /// Wrap this parameter so it only takes a value when `condition` holds.
    ///
    /// Fails with `SelfReference` when the condition governs this parameter
    /// itself, or when this parameter is already conditional (conditionals do
    /// not nest).
    pub fn only_if(self, condition: Condition) -> Result<Parameter> {
        if condition.governor() == self.uid {
            return Err(SpaceError::SelfReference {
                uid: self.uid,
                reason: "a parameter cannot be conditioned on itself".into(),
            });
        }
        if self.is_conditional() {
            return Err(SpaceError::SelfReference {
                uid: self.uid,
                reason: "conditional parameters cannot be nested".into(),
            });
        }
        let uid = self.uid;
        Ok(Self::with_domain(
            uid,
            Domain::Conditional(ConditionResult { result: Box::new(self), condition }),
        ))
    }

    /// Rebuild a parameter from decoded parts, preserving a persisted
    /// identity.
    pub(crate) fn from_decoded(uid: Uid, domain: Domain) -> Parameter {
        Self::with_domain(uid, domain)
    }

    /// This parameter's identity.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// The structural name, if the parameter has been collected into a space.
    pub fn name(&self) -> Option<&ParamPath> {
        self.name.as_ref()
    }

    /// The domain variant.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// True for conditional parameters.
    pub fn is_conditional(&self) -> bool {
        matches!(self.domain, Domain::Conditional(_))
    }

    /// The wrapping condition, for conditional parameters.
    pub fn condition(&self) -> Option<&Condition> {
        match &self.domain {
            Domain::Conditional(c) => Some(&c.condition),
            _ => None,
        }
    }

    /// Offer a discovery path for this parameter's name.
    ///
    /// The first offer sticks; later offers only replace it when they are
    /// shorter (then lexicographically smaller). This is the collector's
    /// aliasing canonicalization.
    pub(crate) fn offer_name(&mut self, path: ParamPath) {
        match &self.name {
            Some(current) if !path.is_preferred_over(current) => {}
            _ => self.name = Some(path),
        }
    }

    /// True when `other` declares the same parameter: same identity, same
    /// domain, regardless of where either was discovered.
    pub fn definition_eq(&self, other: &Parameter) -> bool {
        self.uid == other.uid && self.domain == other.domain
    }

    /// Encode into the tagged document form used inside definition
    /// structures and persisted spaces.
    pub fn encode(&self) -> serde_json::Value {
        crate::space::codec::encode_parameter(self)
    }

    /// Decode a tagged document back into a parameter.
    pub fn decode(node: &serde_json::Value) -> Result<Parameter> {
        crate::space::codec::decode_parameter(node)
    }

    /// The deterministic default value.
    ///
    /// Conditional parameters have no unconditional default; resolving them
    /// requires the governing value (`conditional_default`).
    pub fn default_value(&self) -> Result<ParamValue> {
        match &self.domain {
            Domain::Constant(c) => Ok(c.value.clone()),
            Domain::Categorical(c) => Ok(c.choices[0].resolved().clone()),
            Domain::Uniform(u) => Ok(u.value_of(u.default)),
            Domain::Gaussian(g) => Ok(ParamValue::Float(g.mu)),
            Domain::Conditional(_) => Err(self.needs_governor()),
        }
    }

    /// Draw a random value using the thread-local RNG.
    pub fn sample(&self) -> Result<ParamValue> {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Draw a random value from the domain.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParamValue> {
        match &self.domain {
            Domain::Constant(c) => Ok(c.value.clone()),
            Domain::Categorical(c) => {
                let pick = rng.gen_range(0..c.choices.len());
                Ok(c.choices[pick].resolved().clone())
            }
            Domain::Uniform(u) => Ok(u.sample_with(rng)),
            Domain::Gaussian(g) => g.sample_with(self.uid, rng),
            Domain::Conditional(_) => Err(self.needs_governor()),
        }
    }

    /// Resolve a conditional parameter's default given its governing value.
    ///
    /// `Ok(None)` means the condition does not hold and the parameter is
    /// absent from the configuration.
    pub fn conditional_default(&self, governing: &ParamValue) -> Result<Option<ParamValue>> {
        match &self.domain {
            Domain::Conditional(c) => {
                if c.condition.holds(governing) {
                    c.result.default_value().map(Some)
                } else {
                    Ok(None)
                }
            }
            _ => Err(self.not_conditional()),
        }
    }

    /// Resolve a conditional parameter by sampling, given its governing
    /// value. `Ok(None)` means absent.
    pub fn conditional_sample_with<R: Rng + ?Sized>(
        &self,
        governing: &ParamValue,
        rng: &mut R,
    ) -> Result<Option<ParamValue>> {
        match &self.domain {
            Domain::Conditional(c) => {
                if c.condition.holds(governing) {
                    c.result.sample_with(rng).map(Some)
                } else {
                    Ok(None)
                }
            }
            _ => Err(self.not_conditional()),
        }
    }

    /// Whether `value` lies in this parameter's domain.
    ///
    /// For conditionals this checks the wrapped domain; whether the condition
    /// holds is the space's job, since it needs the governing value.
    pub fn valid(&self, value: &ParamValue) -> bool {
        match &self.domain {
            Domain::Constant(c) => c.value == *value,
            Domain::Categorical(c) => c.choices.iter().any(|choice| choice.resolved() == value),
            Domain::Uniform(u) => match value.as_f64() {
                Some(v) => u.lower <= v && v <= u.upper,
                None => false,
            },
            Domain::Gaussian(_) => value.is_number(),
            Domain::Conditional(c) => c.result.valid(value),
        }
    }

    fn needs_governor(&self) -> SpaceError {
        SpaceError::InconsistentSpace {
            reason: format!("parameter {} is conditional and needs its governing value", self.uid),
        }
    }

    fn not_conditional(&self) -> SpaceError {
        SpaceError::InconsistentSpace {
            reason: format!("parameter {} is not conditional", self.uid),
        }
    }
}

impl Uniform {
    /// Wrap a raw numeric draw in the declared kind.
    fn value_of(&self, v: f64) -> ParamValue {
        match self.kind {
            NumberKind::Int => ParamValue::Int(v.trunc() as i64),
            NumberKind::Float => ParamValue::Float(v),
        }
    }

    fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        match self.kind {
            NumberKind::Float => {
                if self.log_scale {
                    let lo = self.lower.max(LOG_FLOOR).ln();
                    let hi = self.upper.ln();
                    ParamValue::Float(rng.gen_range(lo..hi).exp())
                } else {
                    ParamValue::Float(rng.gen_range(self.lower..self.upper))
                }
            }
            NumberKind::Int => {
                if self.log_scale {
                    // Deliberately reproduces the historical distribution:
                    // both log bounds are truncated to integers, the draw is
                    // an integer draw in log space, and exp() of it is
                    // truncated back. The clamp keeps every draw inside the
                    // declared range.
                    let lo = self.lower.max(LOG_FLOOR).ln().trunc() as i64;
                    let hi = (self.upper.ln().trunc() as i64).max(lo + 1);
                    let k = rng.gen_range(lo..hi);
                    let raw = (k as f64).exp().trunc() as i64;
                    ParamValue::Int(raw.clamp(self.lower as i64, self.upper as i64))
                } else {
                    let lo = self.lower as i64;
                    let hi = (self.upper as i64).max(lo + 1);
                    ParamValue::Int(rng.gen_range(lo..hi))
                }
            }
        }
    }
}

impl Gaussian {
    fn sample_with<R: Rng + ?Sized>(&self, uid: Uid, rng: &mut R) -> Result<ParamValue> {
        let invalid = |_| SpaceError::InvalidDomain {
            uid,
            reason: format!("gaussian({}, {}) is not a valid distribution", self.mu, self.sigma),
        };
        let v = if self.log_scale {
            LogNormal::new(self.mu, self.sigma).map_err(invalid)?.sample(rng)
        } else {
            Normal::new(self.mu, self.sigma).map_err(invalid)?.sample(rng)
        };
        Ok(ParamValue::Float(v))
    }
}
