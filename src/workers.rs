//! The worker pool shared by every parallel phase of a run.
//!
//! Dispatched jobs are pure functions over plain values and share no
//! mutable state. Both variants preserve input order in their output, so
//! results can be zipped back against metadata by position.

use crate::config::Jobs;
use crate::error::Error;
use crate::error::Result;
use rayon::prelude::*;

pub enum Workers {
    /// Plain sequential map, the `-1` debugging mode.
    Serial,
    /// Fixed-size thread pool, held for the lifetime of the engine and
    /// released when the engine is dropped.
    Pool(rayon::ThreadPool),
}

impl Workers {
    pub fn new(jobs: Jobs) -> Result<Self> {
        match jobs {
            Jobs::Serial => Ok(Self::Serial),
            Jobs::All => Self::pool(num_cpus::get()),
            Jobs::Count(n) => Self::pool(n),
        }
    }

    fn pool(threads: usize) -> Result<Self> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map(Self::Pool)
            .map_err(|e| Error::Config(format!("cannot build worker pool: {}", e)))
    }

    pub fn threads(&self) -> usize {
        match self {
            Self::Serial => 1,
            Self::Pool(pool) => pool.current_num_threads(),
        }
    }

    /// Order-preserving map over a batch of independent jobs.
    pub fn map<I, O, F>(&self, items: &[I], f: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send,
    {
        match self {
            Self::Serial => items.iter().map(f).collect(),
            Self::Pool(pool) => pool.install(|| items.par_iter().map(f).collect()),
        }
    }

    /// Order-preserving map that stops the batch on the first error.
    pub fn try_map<I, O, F>(&self, items: &[I], f: F) -> Result<Vec<O>>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> Result<O> + Sync + Send,
    {
        match self {
            Self::Serial => items.iter().map(f).collect(),
            Self::Pool(pool) => pool.install(|| items.par_iter().map(f).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_map_preserves_order() {
        let workers = Workers::new(Jobs::Serial).unwrap();
        let doubled = workers.map(&[1, 2, 3, 4], |x| x * 2);
        assert_eq!(doubled, vec![2, 4, 6, 8]);
    }

    #[test]
    fn pooled_map_preserves_order() {
        let workers = Workers::new(Jobs::Count(3)).unwrap();
        let items = (0..1000).collect::<Vec<usize>>();
        let squares = workers.map(&items, |x| x * x);
        assert!(squares.iter().enumerate().all(|(i, &s)| s == i * i));
    }

    #[test]
    fn try_map_surfaces_errors() {
        let workers = Workers::new(Jobs::Count(2)).unwrap();
        let result = workers.try_map(&[1, 2, 3], |&x| {
            if x == 2 {
                Err(Error::EmptyCluster)
            } else {
                Ok(x)
            }
        });
        assert!(result.is_err());
    }
}
