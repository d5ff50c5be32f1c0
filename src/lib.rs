//! Unsupervised HMM mixture clustering for 1-dimensional time series.
//!
//! Implements Smyth 1997's clustering algorithm: sequences are compared
//! with Rabiner's symmetrized log-likelihood distance, partitioned for a
//! range of cluster counts, and each partition is modeled as a mixture of
//! Gaussian hidden Markov models with a block-diagonal composite.

pub mod cluster;
pub mod config;
pub mod error;
pub mod matrix;
pub mod model;
pub mod sequence;
pub mod workers;

/// Strategy weights, transition and initial state distributions.
pub type Probability = f64;
/// Log likelihoods of sequences under a model.
pub type LogLik = f64;
/// Pairwise dissimilarities between sequences.
pub type Distance = f64;

// ============================================================================
// PROBABILITY INVARIANTS
// ============================================================================
/// Tolerance when checking that a probability distribution sums to one.
pub const STOCHASTIC_TOLERANCE: f64 = 1e-4;

// ============================================================================
// EMISSION VARIANCE
// Near-zero variance makes continuous reestimation diverge; training falls
// back to a discrete model below this threshold.
// ============================================================================
/// Emission sigma below this counts as degenerate for continuous training.
pub const SIGMA_DEGENERATE: f64 = 1e-3;
/// Floor applied to exactly-zero sigmas during emission estimation.
pub const SIGMA_TINY: f64 = 1e-5;
/// Default floor on trained emission sigmas, guarding log likelihood
/// underflow downstream. Tunable per run via `Config::sigma_floor`.
pub const DEFAULT_SIGMA_FLOOR: f64 = 0.5;

// ============================================================================
// PAIRWISE DISTANCES
// ============================================================================
/// Cap on any single pairwise distance, keeping near-singular log
/// likelihoods out of the clustering numerics.
pub const MAX_DISTANCE: Distance = 1e9;
/// Unordered pairs per batch handed to the worker pool.
pub const DISTANCE_BATCH: usize = 500_000;

// ============================================================================
// ITERATION BUDGETS
// ============================================================================
/// Lloyd iterations for the 1-dimensional k-means emission estimator.
pub const KMEANS_ITERATIONS: usize = 300;
/// Baum-Welch reestimation cap per cluster.
pub const BAUM_WELCH_ITERATIONS: usize = 100;
/// Baum-Welch stops once total log likelihood moves less than this.
pub const BAUM_WELCH_TOLERANCE: f64 = 1e-6;
/// Restart passes for k-medoids partitioning.
pub const KMEDOIDS_PASSES: usize = 10;

/// Deterministic pseudo-random generator from a run seed and a call-site
/// salt. Same seed, same salt, same stream.
pub fn seeded(seed: u64, salt: u64) -> rand::rngs::SmallRng {
    use rand::SeedableRng;
    use std::hash::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;
    let ref mut hasher = DefaultHasher::default();
    seed.hash(hasher);
    salt.hash(hasher);
    rand::rngs::SmallRng::seed_from_u64(hasher.finish())
}

/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "cli")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/hmmix-{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
