//! Run configuration, validated eagerly before any computation.

use crate::error::Error;
use crate::error::Result;
use std::fmt;
use std::str::FromStr;

/// Which pairwise dissimilarity to build the distance matrix from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceFn {
    /// Rabiner's symmetrized log likelihood distance under each
    /// sequence's default model.
    Hmm,
    /// Levenshtein distance between raw observation sequences.
    EditDistance,
}

/// How component HMMs are initialized before reestimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// Smyth's default: emissions from a 1-d clustering of the raw
    /// observations, uniform transitions and initial distribution.
    Smyth,
    /// Placeholder kept for configuration compatibility. Rejected at
    /// validation, never silently treated as `Smyth`.
    Random,
}

/// Which partitioning strategy cuts the distance matrix into k groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clustering {
    /// Complete-linkage agglomerative tree, cut once per k.
    Hierarchical,
    /// Independent k-medoids run per k.
    Kmedoids,
}

/// Worker pool sizing. `Serial` runs every parallel step as a plain
/// sequential map, for debugging and single-core environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jobs {
    All,
    Count(usize),
    Serial,
}

impl From<i64> for Jobs {
    fn from(n: i64) -> Self {
        match n {
            n if n < 0 => Jobs::Serial,
            0 => Jobs::All,
            n => Jobs::Count(n as usize),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on states per component HMM.
    pub target_m: usize,
    /// Smallest mixture size to try.
    pub min_k: usize,
    /// Largest mixture size to try.
    pub max_k: usize,
    pub distance: DistanceFn,
    pub initialization: Initialization,
    pub clustering: Clustering,
    pub jobs: Jobs,
    /// Floor on trained emission sigmas.
    pub sigma_floor: f64,
    /// Seed for every pseudo-random choice in the run.
    pub seed: u64,
}

impl Config {
    pub fn new(target_m: usize, min_k: usize, max_k: usize) -> Self {
        Self {
            target_m,
            min_k,
            max_k,
            distance: DistanceFn::Hmm,
            initialization: Initialization::Smyth,
            clustering: Clustering::Hierarchical,
            jobs: Jobs::All,
            sigma_floor: crate::DEFAULT_SIGMA_FLOOR,
            seed: 0,
        }
    }

    /// Fail fast on parameter combinations no later stage can satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.target_m < 1 {
            return Err(Error::Config("target_m must be at least 1".to_string()));
        }
        if self.min_k < 1 {
            return Err(Error::Config("min_k must be at least 1".to_string()));
        }
        if self.min_k > self.max_k {
            return Err(Error::Config(format!(
                "min_k {} exceeds max_k {}",
                self.min_k, self.max_k
            )));
        }
        if !(self.sigma_floor.is_finite() && self.sigma_floor > 0.0) {
            return Err(Error::Config(format!(
                "sigma_floor must be positive and finite, got {}",
                self.sigma_floor
            )));
        }
        if self.jobs == Jobs::Count(0) {
            return Err(Error::Config("cannot build an empty worker pool".to_string()));
        }
        if self.initialization == Initialization::Random {
            return Err(Error::Unsupported("random hmm initialization"));
        }
        Ok(())
    }

    /// The inclusive range of mixture sizes this run will model.
    pub fn k_values(&self) -> impl Iterator<Item = usize> {
        self.min_k..=self.max_k
    }
}

impl FromStr for DistanceFn {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hmm" => Ok(DistanceFn::Hmm),
            "editdistance" => Ok(DistanceFn::EditDistance),
            _ => Err(Error::Config(format!("unknown distance function: {}", s))),
        }
    }
}
impl fmt::Display for DistanceFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceFn::Hmm => write!(f, "hmm"),
            DistanceFn::EditDistance => write!(f, "editdistance"),
        }
    }
}

impl FromStr for Initialization {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "smyth" => Ok(Initialization::Smyth),
            "random" => Ok(Initialization::Random),
            _ => Err(Error::Config(format!("unknown initialization: {}", s))),
        }
    }
}
impl fmt::Display for Initialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initialization::Smyth => write!(f, "smyth"),
            Initialization::Random => write!(f, "random"),
        }
    }
}

impl FromStr for Clustering {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hierarchical" => Ok(Clustering::Hierarchical),
            "kmedoids" => Ok(Clustering::Kmedoids),
            _ => Err(Error::Config(format!("unknown clustering algorithm: {}", s))),
        }
    }
}
impl fmt::Display for Clustering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clustering::Hierarchical => write!(f, "hierarchical"),
            Clustering::Kmedoids => write!(f, "kmedoids"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shape_is_valid() {
        assert!(Config::new(2, 2, 8).validate().is_ok());
    }

    #[test]
    fn rejects_inverted_k_range() {
        let config = Config::new(2, 5, 3);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_random_initialization() {
        let mut config = Config::new(2, 2, 2);
        config.initialization = Initialization::Random;
        assert!(matches!(config.validate(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn rejects_zero_sized_pool() {
        let mut config = Config::new(2, 2, 2);
        config.jobs = Jobs::Count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_jobs_mean_serial() {
        assert_eq!(Jobs::from(-1), Jobs::Serial);
        assert_eq!(Jobs::from(0), Jobs::All);
        assert_eq!(Jobs::from(4), Jobs::Count(4));
    }

    #[test]
    fn selectors_round_trip_strings() {
        for s in ["hmm", "editdistance"] {
            assert_eq!(DistanceFn::from_str(s).unwrap().to_string(), s);
        }
        for s in ["hierarchical", "kmedoids"] {
            assert_eq!(Clustering::from_str(s).unwrap().to_string(), s);
        }
        assert!(DistanceFn::from_str("cosine").is_err());
    }
}
