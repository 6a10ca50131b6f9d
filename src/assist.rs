//! Assisted-run configuration injection.
//!
//! The external experiment runner calls into the engine with the
//! parameters it already declares; the engine answers with the subset of a
//! suggested configuration that should be merged into the run.

use crate::space::Config;

/// Names starting with this prefix are private: the runner's declared
/// defaults are allowed not to contain them.
pub const PRIVATE_PREFIX: char = '_';

/// True for names the runner is not expected to declare.
pub fn is_private(name: &str) -> bool {
    name.starts_with(PRIVATE_PREFIX)
}

/// Merge a suggested configuration into a run's declared defaults.
///
/// Every suggested entry whose name the defaults declare is injected. A
/// name missing from the defaults is still injected but draws a warning —
/// the run's default config should declare everything the space can
/// suggest — unless it is private, in which case it is silently dropped.
pub fn merge_suggestion(suggested: &Config, defaults: &Config) -> Config {
    let mut merged = Config::new();
    for (name, value) in suggested {
        if defaults.contains_key(name) {
            merged.insert(name.clone(), value.clone());
        } else if is_private(name) {
            continue;
        } else {
            tracing::warn!(
                name = %name,
                "suggested value is not in the run's default config; injecting it anyway"
            );
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}
