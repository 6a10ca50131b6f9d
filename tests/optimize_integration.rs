//! Integration tests for the optimizer protocol and the run-record boundary
//!
//! Walks the full loop an assistant-style collaborator would drive:
//! suggest → realize → (external run) → collect updates → update → best-so-far,
//! plus the assisted-config injection semantics.

use std::collections::HashSet;

use serde_json::json;

use hypertune::assist::merge_suggestion;
use hypertune::optimize::{best_completed, collect_updates, Optimizer, RandomSearch};
use hypertune::record::{RunRecord, RunStatus};
use hypertune::space::{Condition, Parameter, ParamValue, SearchSpace, UidAllocator};

fn build_space() -> SearchSpace {
    let mut alloc = UidAllocator::new();
    let lr = Parameter::uniform_float_log(&mut alloc, 1e-4, 1e-1).unwrap();
    let layers = Parameter::categorical(&mut alloc, vec![1.into(), 2.into()]).unwrap();
    let units = Parameter::uniform_int(&mut alloc, 32, 64)
        .unwrap()
        .only_if(Condition::new(&layers, vec![ParamValue::Int(2)]))
        .unwrap();
    SearchSpace::new(json!({
        "model": {
            "n_layers": layers.encode(),
            "units_second": units.encode(),
        },
        "learning_rate": lr.encode(),
        "dataset": "mnist",
    }))
    .unwrap()
}

#[test]
fn test_random_search_full_loop() {
    let space = build_space();
    let mut search = RandomSearch::new(space);

    let mut runs = Vec::new();
    for trial in 0..20 {
        let config = search.suggest_configuration().unwrap().expect("random search suggests");
        assert!(search.space().valid(&config));

        // the external runner receives the concrete, filled configuration
        let concrete = search.space().realize(&config).unwrap();
        assert_eq!(concrete["dataset"], json!("mnist"));

        // pretend the run finished with a cost derived from the config
        let cost = config["learning_rate"].as_f64().unwrap() * 10.0;
        runs.push(RunRecord {
            id: format!("run-{}", trial),
            status: RunStatus::Completed,
            config: concrete,
            result: Some(json!({ "optimization_target": cost })),
            start_time: None,
            stop_time: None,
            heartbeat: None,
        });
    }

    let mut seen = HashSet::new();
    let batch = collect_updates(search.space(), &runs, &mut seen).unwrap();
    assert_eq!(batch.len(), 20);
    for config in &batch.configs {
        assert!(search.space().valid(config));
        // the fixed `dataset` entry never shows up in a cleaned config
        assert!(!config.contains_key("dataset"));
    }

    // random search absorbs updates without changing behavior
    search.update(&batch.configs, &batch.costs, &batch.runs).unwrap();
    assert!(!search.needs_updates());

    // polling again finds nothing new
    assert!(collect_updates(search.space(), &runs, &mut seen).unwrap().is_empty());

    let (best_config, best_cost, best_run) =
        best_completed(search.space(), &runs).unwrap().expect("twenty completed runs");
    assert!(best_run.is_completed());
    for cost in &batch.costs {
        assert!(best_cost <= *cost);
    }
    assert!(search.space().valid(&best_config));
}

#[test]
fn test_crashed_and_pending_runs_are_ignored() {
    let space = build_space();
    let config = space.default_config().unwrap();
    let concrete = space.realize(&config).unwrap();

    let run = |id: &str, status: RunStatus| RunRecord {
        id: id.into(),
        status,
        config: concrete.clone(),
        result: None,
        start_time: None,
        stop_time: None,
        heartbeat: None,
    };
    let runs = vec![
        run("queued", RunStatus::Queued),
        run("initializing", RunStatus::Initializing),
        run("running", RunStatus::Running),
        run("crashed", RunStatus::Crashed),
    ];

    let mut seen = HashSet::new();
    let batch = collect_updates(&space, &runs, &mut seen).unwrap();
    assert!(batch.is_empty());
    assert!(best_completed(&space, &runs).unwrap().is_none());
}

#[test]
fn test_suggestion_injection_respects_declared_defaults() {
    let space = build_space();
    let mut search = RandomSearch::new(space);
    let suggested = search.suggest_configuration().unwrap().unwrap();

    // the runner only declares the learning rate and layer count
    let mut defaults = hypertune::Config::new();
    defaults.insert("learning_rate".into(), ParamValue::Float(1e-3));
    defaults.insert("model.n_layers".into(), ParamValue::Int(1));

    let merged = merge_suggestion(&suggested, &defaults);
    assert_eq!(merged["learning_rate"], suggested["learning_rate"]);
    assert_eq!(merged["model.n_layers"], suggested["model.n_layers"]);
    // an undeclared suggestion is still injected (with a diagnostic)
    if let Some(units) = suggested.get("model.units_second") {
        assert_eq!(&merged["model.units_second"], units);
    }
}

#[test]
fn test_reloaded_space_drives_the_same_optimizer() {
    let declared = build_space();
    let mut stored = SearchSpace::decode(declared.encode()).unwrap();
    stored.set_id("deadbeef");
    declared.verify_against(&stored).unwrap();

    let mut search = RandomSearch::new(stored);
    for _ in 0..20 {
        let config = search.suggest_configuration().unwrap().unwrap();
        assert!(declared.valid(&config));
    }
}
