//! Random search: the trivial baseline optimizer.

use crate::error::Result;
use crate::optimize::Optimizer;
use crate::record::RunRecord;
use crate::space::{Config, SearchSpace};

/// Suggests uniformly random configurations and learns nothing.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
}

impl RandomSearch {
    /// Create a random-search optimizer over `space`.
    pub fn new(space: SearchSpace) -> Self {
        Self { space }
    }
}

impl Optimizer for RandomSearch {
    fn space(&self) -> &SearchSpace {
        &self.space
    }

    fn suggest_configuration(&mut self) -> Result<Option<Config>> {
        self.get_random_config().map(Some)
    }

    fn update(&mut self, _configs: &[Config], _costs: &[f64], _runs: &[RunRecord]) -> Result<()> {
        Ok(())
    }

    fn needs_updates(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{Parameter, UidAllocator};
    use serde_json::json;

    fn tiny_space() -> SearchSpace {
        let mut alloc = UidAllocator::new();
        let lr = Parameter::uniform_float_log(&mut alloc, 1e-4, 1e-1).unwrap();
        let layers = Parameter::categorical(&mut alloc, vec![1.into(), 2.into()]).unwrap();
        SearchSpace::new(json!({
            "learning_rate": lr.encode(),
            "n_layers": layers.encode(),
        }))
        .unwrap()
    }

    #[test]
    fn test_suggestions_are_valid_samples() {
        let mut opt = RandomSearch::new(tiny_space());
        for _ in 0..100 {
            let config = opt.suggest_configuration().unwrap().expect("always has an opinion");
            assert!(opt.space().valid(&config));
        }
    }

    #[test]
    fn test_update_is_a_no_op() {
        let mut opt = RandomSearch::new(tiny_space());
        assert!(!opt.needs_updates());
        opt.update(&[], &[], &[]).unwrap();
        let config = opt.get_default_config().unwrap();
        assert!(opt.space().valid(&config));
    }
}
