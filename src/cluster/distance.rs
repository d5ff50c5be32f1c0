//! Pairwise distance matrix construction.
//!
//! Two parallel phases: first one model per sequence, then one distance
//! per unordered pair, batched so no single dispatch grows with the
//! square of the input. Workers exchange plain numeric triples only.

use crate::DISTANCE_BATCH;
use crate::Distance;
use crate::MAX_DISTANCE;
use crate::cluster::progress::Progress;
use crate::cluster::trainer;
use crate::config::Config;
use crate::config::DistanceFn;
use crate::error::Error;
use crate::error::Result;
use crate::model::Hmm;
use crate::sequence::SequenceSet;
use crate::workers::Workers;

pub struct Distances<'a> {
    set: &'a SequenceSet,
    config: &'a Config,
    workers: &'a Workers,
}

impl<'a> Distances<'a> {
    pub fn new(set: &'a SequenceSet, config: &'a Config, workers: &'a Workers) -> Self {
        Self {
            set,
            config,
            workers,
        }
    }

    /// The condensed upper-triangular distance array, in row-major pair
    /// order. Built once per run and reused across every k.
    pub fn condensed(&self) -> Result<Vec<Distance>> {
        match self.config.distance {
            DistanceFn::Hmm => self.rabiner(),
            DistanceFn::EditDistance => self.levenshtein(),
        }
    }

    /// One singleton model per sequence: Smyth default initialization
    /// refined by Baum-Welch against its own sequence.
    fn models(&self) -> Result<Vec<Hmm>> {
        log::info!(
            "{:<32}{:<32}",
            "generating singleton models",
            format!("n {}", self.set.len())
        );
        let indices = (0..self.set.len()).collect::<Vec<usize>>();
        self.workers.try_map(&indices, |&i| {
            let ref mut rng = crate::seeded(self.config.seed, i as u64);
            trainer::train(
                &[self.set.get(i).observations()],
                self.config.target_m,
                self.config.sigma_floor,
                rng,
            )
        })
    }

    fn rabiner(&self) -> Result<Vec<Distance>> {
        let models = self.models()?;
        self.scored(|i, j| self.symmetrized(i, j, &models))
    }

    fn levenshtein(&self) -> Result<Vec<Distance>> {
        self.scored(|i, j| {
            Ok(lev(
                self.set.get(i).observations(),
                self.set.get(j).observations(),
            ) as Distance)
        })
    }

    /// Run a pair scorer over every unordered pair in bounded batches.
    /// Batches are dispatched and concatenated in pair order, so the
    /// output is deterministic in the input order.
    fn scored<F>(&self, score: F) -> Result<Vec<Distance>>
    where
        F: Fn(usize, usize) -> Result<Distance> + Sync + Send,
    {
        let n_pairs = self.set.pairs();
        log::info!(
            "{:<32}{:<32}",
            "computing distance matrix",
            format!("pairs {}", n_pairs)
        );
        let mut progress = Progress::new(n_pairs);
        let mut condensed = Vec::with_capacity(n_pairs);
        let mut batch = Vec::with_capacity(DISTANCE_BATCH.min(n_pairs.max(1)));
        for pair in pairs(self.set.len()) {
            batch.push(pair);
            if batch.len() == DISTANCE_BATCH {
                self.drain(&mut batch, &score, &mut condensed, &mut progress)?;
            }
        }
        self.drain(&mut batch, &score, &mut condensed, &mut progress)?;
        let min = condensed.iter().copied().fold(f64::INFINITY, f64::min);
        let max = condensed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        log::debug!(
            "{:<32}{:<32}",
            "distance range",
            format!("{:.4} to {:.4}", min, max)
        );
        Ok(condensed)
    }

    fn drain<F>(
        &self,
        batch: &mut Vec<(usize, usize)>,
        score: &F,
        condensed: &mut Vec<Distance>,
        progress: &mut Progress,
    ) -> Result<()>
    where
        F: Fn(usize, usize) -> Result<Distance> + Sync + Send,
    {
        if batch.is_empty() {
            return Ok(());
        }
        let scores = self.workers.try_map(batch, |&(i, j)| score(i, j))?;
        for s in scores {
            condensed.push(s);
            progress.tick();
        }
        batch.clear();
        Ok(())
    }

    /// Rabiner's symmetrized measure: cross-evaluate each sequence under
    /// the other's model and negate the averaged log likelihood. Clamped
    /// so near-singular likelihoods cannot poison the clustering
    /// numerics; a non-finite intermediate is fatal for the pair.
    fn symmetrized(&self, i: usize, j: usize, models: &[Hmm]) -> Result<Distance> {
        let ij = models[j].loglikelihood(self.set.get(i).observations());
        let ji = models[i].loglikelihood(self.set.get(j).observations());
        if !ij.is_finite() || !ji.is_finite() {
            return Err(Error::NumericInstability(format!(
                "symmetrized distance between sequences {} and {}",
                i, j
            )));
        }
        Ok((-(ij + ji) / 2.0).clamp(0.0, MAX_DISTANCE))
    }
}

/// Unordered pairs (i, j) with i < j, in row-major order.
pub fn pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

/// Levenshtein distance between two observation sequences.
fn lev(a: &[f64], b: &[f64]) -> usize {
    let mut previous = (0..=b.len()).collect::<Vec<usize>>();
    let mut current = vec![0; b.len() + 1];
    for (i, x) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(x != y);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
