//! Optimizer protocol for iterative experiment optimization.
//!
//! An optimizer wraps a [`SearchSpace`](crate::space::SearchSpace) and
//! proposes configurations; observed `(config, cost)` pairs flow back in
//! through [`Optimizer::update`]. Random search is the reference
//! implementation; model-based optimizers plug in behind the same trait and
//! keep all of their numeric-library specifics on their side of it.

pub mod random;
pub mod updates;

pub use random::RandomSearch;
pub use updates::{best_completed, collect_updates, UpdateBatch};

use crate::error::Result;
use crate::record::RunRecord;
use crate::space::{Config, SearchSpace};

/// Uniform contract every optimizer implements.
pub trait Optimizer {
    /// The search space this optimizer proposes configurations for.
    fn space(&self) -> &SearchSpace;

    /// Suggest a configuration of hyperparameters to run.
    ///
    /// `Ok(None)` is a deliberate "no opinion" signal, distinct from an
    /// error: it tells the caller to check the queue or fall back to another
    /// strategy. Optimizers that always have an answer override this.
    fn suggest_configuration(&mut self) -> Result<Option<Config>> {
        Ok(None)
    }

    /// Feed observed results back into the optimizer's internal model.
    ///
    /// `configs`, `costs` and `runs` are parallel sequences: one cleaned
    /// flat configuration, its scalar cost, and the originating run record.
    fn update(&mut self, configs: &[Config], costs: &[f64], runs: &[RunRecord]) -> Result<()>;

    /// Whether this optimizer wants `update` calls before suggesting.
    fn needs_updates(&self) -> bool {
        false
    }

    /// A uniformly random configuration from the space.
    fn get_random_config(&self) -> Result<Config> {
        self.space().sample()
    }

    /// The space's all-defaults configuration.
    fn get_default_config(&self) -> Result<Config> {
        self.space().default_config()
    }
}
