use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Process wide defaults used when building the classifier configurations
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Fluxes with an absolute value at or below this are treated as zero when ingesting
    /// enumerator output
    pub tolerance: f64,
    /// Minimum number of flux modes which must share a pattern for it to be reported
    pub min_efm_num: usize,
    /// Minimum number of flux modes two reaction directions must co-occur in to be
    /// connected in the co-occurrence graph
    pub efm_num: usize,
    /// Maximum number of distinct patterns the miner may hold before giving up
    pub max_registry_size: usize,
    /// Maximum number of maximal cliques the clique detector may enumerate
    pub max_clique_num: usize,
    /// Number of worker threads used for the parallel passes
    pub processes: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            tolerance: 1e-07,
            min_efm_num: 2,
            efm_num: 2,
            max_registry_size: 1_000_000,
            max_clique_num: 100_000,
            processes: 1,
        }
    }
}

/// Read a value out of the global configuration, falling back to the built-in default if
/// the lock has been poisoned
pub(crate) fn configured<T>(get: impl Fn(&Configuration) -> T) -> T {
    match CONFIGURATION.read() {
        Ok(config) => get(&*config),
        Err(_) => get(&Configuration::default()),
    }
}
