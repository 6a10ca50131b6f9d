//! Deriving optimizer update inputs from persisted run records.
//!
//! The engine consumes completed runs, cleans their concrete configurations
//! down to the names the space declares, pulls out the scalar cost, and
//! hands the optimizer parallel sequences. A seen-set keeps every record
//! from being consumed more than once across polling rounds.

use std::collections::HashSet;

use crate::error::Result;
use crate::record::RunRecord;
use crate::space::{Config, SearchSpace};

/// Parallel update sequences for [`Optimizer::update`](crate::optimize::Optimizer::update).
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    /// Cleaned flat configurations, one per run
    pub configs: Vec<Config>,
    /// Scalar costs, one per run
    pub costs: Vec<f64>,
    /// The originating run records
    pub runs: Vec<RunRecord>,
}

impl UpdateBatch {
    /// Number of runs in the batch.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True when no new completed runs were found.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Collect update inputs from `runs`.
///
/// Keeps records that are COMPLETED and whose id is not yet in `seen`;
/// consumed ids are added to `seen` so later rounds skip them. The config
/// is read back through the space's recorded paths, so nested concrete
/// configurations clean down to flat name-keyed ones.
pub fn collect_updates(
    space: &SearchSpace,
    runs: &[RunRecord],
    seen: &mut HashSet<String>,
) -> Result<UpdateBatch> {
    let mut batch = UpdateBatch::default();
    for run in runs {
        if !run.is_completed() || seen.contains(&run.id) {
            continue;
        }
        let cost = run.optimization_cost()?;
        let config = space.extract_config(&run.config)?;
        seen.insert(run.id.clone());
        batch.configs.push(config);
        batch.costs.push(cost);
        batch.runs.push(run.clone());
    }
    Ok(batch)
}

/// The best completed run: lowest cost wins.
///
/// Returns the cleaned configuration, the cost, and the record itself, or
/// `None` when nothing has completed yet.
pub fn best_completed<'a>(
    space: &SearchSpace,
    runs: &'a [RunRecord],
) -> Result<Option<(Config, f64, &'a RunRecord)>> {
    let mut best: Option<(f64, &RunRecord)> = None;
    for run in runs.iter().filter(|run| run.is_completed()) {
        let cost = run.optimization_cost()?;
        if best.map_or(true, |(lowest, _)| cost < lowest) {
            best = Some((cost, run));
        }
    }
    match best {
        Some((cost, run)) => {
            let config = space.extract_config(&run.config)?;
            Ok(Some((config, cost, run)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RunStatus;
    use crate::space::{Parameter, ParamValue, UidAllocator};
    use serde_json::{json, Value};

    fn lr_space() -> SearchSpace {
        let mut alloc = UidAllocator::new();
        let lr = Parameter::uniform_float(&mut alloc, 0.0, 1.0).unwrap();
        SearchSpace::new(json!({"lr": lr.encode()})).unwrap()
    }

    fn run(id: &str, status: RunStatus, lr: f64, cost: Value) -> RunRecord {
        RunRecord {
            id: id.into(),
            status,
            config: json!({"lr": lr, "seed": 42}),
            result: Some(cost),
            start_time: None,
            stop_time: None,
            heartbeat: None,
        }
    }

    #[test]
    fn test_collects_only_unseen_completed_runs() {
        let space = lr_space();
        let runs = vec![
            run("a", RunStatus::Completed, 0.1, json!(2.0)),
            run("b", RunStatus::Running, 0.2, json!(1.0)),
            run("c", RunStatus::Completed, 0.3, json!({"optimization_target": 0.5})),
        ];
        let mut seen = HashSet::new();
        let batch = collect_updates(&space, &runs, &mut seen).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.costs, vec![2.0, 0.5]);
        // the non-space `seed` key is cleaned away
        assert_eq!(batch.configs[0].len(), 1);
        assert_eq!(batch.configs[0]["lr"], ParamValue::Float(0.1));

        // a second round sees nothing new
        let again = collect_updates(&space, &runs, &mut seen).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_bad_result_is_a_hard_error() {
        let space = lr_space();
        let runs = vec![run("a", RunStatus::Completed, 0.1, json!("not a cost"))];
        let mut seen = HashSet::new();
        assert!(collect_updates(&space, &runs, &mut seen).is_err());
        // the record was not consumed
        assert!(seen.is_empty());
    }

    #[test]
    fn test_best_completed_takes_lowest_cost() {
        let space = lr_space();
        let runs = vec![
            run("a", RunStatus::Completed, 0.1, json!(2.0)),
            run("b", RunStatus::Completed, 0.2, json!(0.25)),
            run("c", RunStatus::Crashed, 0.3, json!(0.0)),
        ];
        let (config, cost, record) = best_completed(&space, &runs).unwrap().unwrap();
        assert_eq!(record.id, "b");
        assert_eq!(cost, 0.25);
        assert_eq!(config["lr"], ParamValue::Float(0.2));
    }

    #[test]
    fn test_best_completed_empty() {
        let space = lr_space();
        let runs = vec![run("a", RunStatus::Queued, 0.1, json!(1.0))];
        assert!(best_completed(&space, &runs).unwrap().is_none());
    }
}
