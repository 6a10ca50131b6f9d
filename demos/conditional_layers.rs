//! Conditional search-space walkthrough
//!
//! Declares a two-layer network space where the second layer's
//! hyperparameters only exist when the sampled layer count asks for them,
//! then prints a handful of sampled concrete configurations.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example conditional_layers
//! ```

use anyhow::Result;
use serde_json::json;

use hypertune::space::{Condition, Parameter, ParamValue, SearchSpace, UidAllocator};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut alloc = UidAllocator::new();
    let batch_size = Parameter::uniform_int(&mut alloc, 32, 256)?;
    let learning_rate = Parameter::uniform_float_log(&mut alloc, 1e-4, 1e-1)?;
    let n_layers = Parameter::categorical(&mut alloc, vec![1.into(), 2.into()])?;
    let units_first = Parameter::uniform_int(&mut alloc, 32, 128)?;
    let units_second = Parameter::uniform_int(&mut alloc, 32, 128)?
        .only_if(Condition::new(&n_layers, vec![ParamValue::Int(2)]))?;
    let dropout_second = Parameter::uniform_float(&mut alloc, 0.2, 0.8)?
        .only_if(Condition::new(&n_layers, vec![ParamValue::Int(2)]))?;

    let space = SearchSpace::new(json!({
        "batch_size": batch_size.encode(),
        "learning_rate": learning_rate.encode(),
        "model": {
            "n_layers": n_layers.encode(),
            "units_first": units_first.encode(),
            "units_second": units_second.encode(),
            "dropout_second": dropout_second.encode(),
        },
        "dataset": "mnist",
    }))?;

    println!(
        "space has {} parameters ({} conditional)",
        space.len(),
        space.conditional_names().len()
    );

    println!("\ndefault configuration:");
    let defaults = space.default_config()?;
    println!("{}", serde_json::to_string_pretty(&space.realize(&defaults)?)?);

    println!("\nsampled configurations:");
    for i in 0..5 {
        let config = space.sample()?;
        let layers = &config["model.n_layers"];
        let concrete = space.realize(&config)?;
        println!("--- sample {} ({} layer(s)) ---", i, layers);
        println!("{}", serde_json::to_string_pretty(&concrete)?);
    }

    Ok(())
}
