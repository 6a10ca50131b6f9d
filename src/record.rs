//! Run-record boundary types.
//!
//! The run ledger is an external collaborator; the engine only consumes its
//! records. Timestamps stay opaque strings: ordering and heartbeat policy
//! belong to the collaborator that wrote them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SpaceError};

/// Lifecycle state of a persisted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Waiting to be claimed by a worker
    Queued,
    /// Claimed, not yet running
    Initializing,
    /// Executing
    Running,
    /// Finished with a result
    Completed,
    /// Finished without a result
    Crashed,
}

/// One persisted run, as stored by the run ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Ledger identity of the run
    #[serde(rename = "_id")]
    pub id: String,
    /// Lifecycle state
    pub status: RunStatus,
    /// The concrete, filled configuration the run executed with
    pub config: Value,
    /// The run's reported result, if any
    #[serde(default)]
    pub result: Option<Value>,
    /// When the run started
    #[serde(default)]
    pub start_time: Option<String>,
    /// When the run stopped
    #[serde(default)]
    pub stop_time: Option<String>,
    /// Last liveness signal
    #[serde(default)]
    pub heartbeat: Option<String>,
}

impl RunRecord {
    /// True for runs that finished with a result.
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The scalar cost to feed an optimizer.
    ///
    /// A result is either a bare number or a mapping with a numeric
    /// `optimization_target` field; anything else — including a missing
    /// result — is an `InvalidRunResult` hard error.
    pub fn optimization_cost(&self) -> Result<f64> {
        let result = self.result.as_ref().ok_or_else(|| SpaceError::InvalidRunResult {
            reason: format!("run {} has no result", self.id),
        })?;
        match result {
            Value::Number(n) => n.as_f64().ok_or_else(|| SpaceError::InvalidRunResult {
                reason: format!("run {} result does not fit a float", self.id),
            }),
            Value::Object(map) => match map.get("optimization_target").and_then(Value::as_f64) {
                Some(cost) => Ok(cost),
                None => Err(SpaceError::InvalidRunResult {
                    reason: format!(
                        "run {} result mapping lacks a numeric `optimization_target`",
                        self.id
                    ),
                }),
            },
            other => Err(SpaceError::InvalidRunResult {
                reason: format!("run {} result has unsupported shape: {}", self.id, other),
            }),
        }
    }
}
