//! Random search on the Branin function
//!
//! Minimizes the classic two-dimensional Branin benchmark with random
//! search and reports the best configuration found.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example branin_search
//! ```
//!
//! Results are saved to `branin_results.json` after the run.

use std::collections::HashSet;
use std::fs;

use anyhow::Result;
use serde_json::json;

use hypertune::optimize::{best_completed, collect_updates, Optimizer, RandomSearch};
use hypertune::record::{RunRecord, RunStatus};
use hypertune::space::{Parameter, SearchSpace, UidAllocator};

const TRIALS: usize = 200;

fn branin(x: f64, y: f64) -> f64 {
    let a = 1.0;
    let b = 5.1 / (4.0 * std::f64::consts::PI.powi(2));
    let c = 5.0 / std::f64::consts::PI;
    let r = 6.0;
    let s = 10.0;
    let t = 1.0 / (8.0 * std::f64::consts::PI);
    a * (y - b * x.powi(2) + c * x - r).powi(2) + s * (1.0 - t) * x.cos() + s
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut alloc = UidAllocator::new();
    let x = Parameter::uniform_float(&mut alloc, -5.0, 10.0)?;
    let y = Parameter::uniform_float(&mut alloc, 0.0, 15.0)?;
    let space = SearchSpace::new(json!({
        "x": x.encode(),
        "y": y.encode(),
    }))?;

    let mut search = RandomSearch::new(space);
    let mut runs = Vec::with_capacity(TRIALS);
    let mut seen = HashSet::new();

    for trial in 0..TRIALS {
        let config = match search.suggest_configuration()? {
            Some(config) => config,
            None => break,
        };
        let concrete = search.space().realize(&config)?;
        let cost = branin(
            concrete["x"].as_f64().unwrap_or_default(),
            concrete["y"].as_f64().unwrap_or_default(),
        );

        runs.push(RunRecord {
            id: format!("branin-{:04}", trial),
            status: RunStatus::Completed,
            config: concrete,
            result: Some(json!(cost)),
            start_time: None,
            stop_time: None,
            heartbeat: None,
        });

        let batch = collect_updates(search.space(), &runs, &mut seen)?;
        search.update(&batch.configs, &batch.costs, &batch.runs)?;

        if trial % 20 == 0 {
            tracing::info!(trial, cost, "evaluated");
        }
    }

    let (best_config, best_cost, best_run) = best_completed(search.space(), &runs)?
        .expect("at least one completed run");
    tracing::info!(run = %best_run.id, cost = best_cost, "best result");
    println!("best config after {} trials: {:?} (cost {:.4})", TRIALS, best_config, best_cost);
    println!("known optimum is ~0.3979");

    let report = json!({
        "trials": runs.len(),
        "best_cost": best_cost,
        "best_config": best_run.config,
        "space": search.space().encode(),
    });
    fs::write("branin_results.json", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
