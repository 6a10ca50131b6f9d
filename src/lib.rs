//! # hypertune
//!
//! Declarative hyperparameter search spaces with a pluggable optimizer
//! protocol.
//!
//! A search space is an ordinary nested structure with parameter
//! declarations embedded anywhere inside it. The engine discovers them,
//! names them by their structural path, resolves conditional parameters in
//! dependency order, and round-trips the whole space through a persisted
//! document form. Optimizers consume flat `(config, cost)` observations and
//! propose new configurations behind one uniform trait.
//!
//! ## Quick Start
//!
//! ```
//! use hypertune::optimize::{Optimizer, RandomSearch};
//! use hypertune::space::{Parameter, SearchSpace, UidAllocator};
//! use serde_json::json;
//!
//! let mut alloc = UidAllocator::new();
//! let lr = Parameter::uniform_float_log(&mut alloc, 1e-4, 1e-1)?;
//! let batch = Parameter::uniform_int(&mut alloc, 32, 256)?;
//!
//! let space = SearchSpace::new(json!({
//!     "optimizer": {"learning_rate": lr.encode()},
//!     "batch_size": batch.encode(),
//! }))?;
//!
//! let mut search = RandomSearch::new(space);
//! let config = search.suggest_configuration()?.expect("random search always suggests");
//! assert!(search.space().valid(&config));
//! # Ok::<(), hypertune::SpaceError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Assisted-run configuration injection boundary
pub mod assist;

/// Error taxonomy
pub mod error;

/// Optimizer protocol and the random-search baseline
pub mod optimize;

/// Run-record boundary types consumed from the run ledger
pub mod record;

/// Search-space model, collection, sampling and value plumbing
pub mod space;

pub use error::{Result, SpaceError};
pub use optimize::{Optimizer, RandomSearch};
pub use record::{RunRecord, RunStatus};
pub use space::{Config, Parameter, ParamValue, SearchSpace, Strategy, Uid, UidAllocator};

/// Current version of hypertune
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
