//! Smyth's default initialization: emission parameters from a
//! 1-dimensional clustering of a group's raw observations.

use crate::KMEANS_ITERATIONS;
use crate::SIGMA_DEGENERATE;
use crate::SIGMA_TINY;
use crate::error::Error;
use crate::error::Result;
use crate::model::Emission;
use crate::model::Hmm;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::SmallRng;

/// Emission distribution estimated for one group of sequences, together
/// with the per-observation cluster labels the discrete fallback needs.
pub struct EmissionEstimate {
    pub emissions: Vec<Emission>,
    /// Cluster label per observation, in sequence-major order.
    pub labels: Vec<usize>,
    /// Whether any cluster collapsed below the degeneracy threshold,
    /// making continuous reestimation unsafe.
    pub degenerate: bool,
}

impl EmissionEstimate {
    pub fn states(&self) -> usize {
        self.emissions.len()
    }
    /// The default model: these emissions under uniform transition and
    /// initial distributions.
    pub fn default_model(&self) -> Hmm {
        Hmm::uniform(self.emissions.clone())
    }
}

/// Estimate up to `target_m` emission distributions for one group of
/// sequences. With fewer distinct observation values than `target_m`,
/// the estimate shrinks to one state per distinct value; the group must
/// contain at least one observation.
pub fn estimate(
    sequences: &[&[f64]],
    target_m: usize,
    rng: &mut SmallRng,
) -> Result<EmissionEstimate> {
    let merged = sequences
        .iter()
        .flat_map(|s| s.iter().copied())
        .collect::<Vec<f64>>();
    if merged.is_empty() {
        return Err(Error::EmptyCluster);
    }
    let mut distinct = merged.clone();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    let m = target_m.min(distinct.len());
    let raw = kmeans(&merged, m, rng);
    let mut groups = vec![Vec::new(); m];
    for (value, &label) in merged.iter().zip(raw.iter()) {
        groups[label].push(*value);
    }
    // Lloyd iterations can abandon a seed; surviving clusters are
    // relabeled densely so labels index straight into the emissions.
    let mut remap = vec![usize::MAX; m];
    let mut emissions = Vec::new();
    let mut degenerate = false;
    for (label, group) in groups.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        remap[label] = emissions.len();
        let (mean, sigma) = moments(group);
        degenerate |= sigma < SIGMA_DEGENERATE;
        emissions.push(Emission::new(mean, sigma.max(SIGMA_TINY)));
    }
    let labels = raw.into_iter().map(|l| remap[l]).collect();
    Ok(EmissionEstimate {
        emissions,
        labels,
        degenerate,
    })
}

/// Mean and population standard deviation.
fn moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// 1-dimensional k-means: k-means++ seeding, then Lloyd iterations until
/// the assignment stops moving.
fn kmeans(values: &[f64], k: usize, rng: &mut SmallRng) -> Vec<usize> {
    let first = rng.random_range(0..values.len());
    let mut centroids = vec![values[first]];
    let mut potentials = values
        .iter()
        .map(|v| (v - values[first]) * (v - values[first]))
        .collect::<Vec<f64>>();
    while centroids.len() < k {
        let i = WeightedIndex::new(potentials.iter())
            .expect("nonzero seeding potentials")
            .sample(rng);
        let x = values[i];
        centroids.push(x);
        for (p, v) in potentials.iter_mut().zip(values.iter()) {
            *p = p.min((v - x) * (v - x));
        }
    }
    let mut labels = assign(values, &centroids);
    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (v, &l) in values.iter().zip(labels.iter()) {
            sums[l] += v;
            counts[l] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = sums[c] / counts[c] as f64;
            }
        }
        let next = assign(values, &centroids);
        if next == labels {
            break;
        }
        labels = next;
    }
    labels
}

fn assign(values: &[f64], centroids: &[f64]) -> Vec<usize> {
    values
        .iter()
        .map(|v| {
            centroids
                .iter()
                .enumerate()
                .map(|(c, x)| (c, (v - x).abs()))
                .min_by(|(_, d1), (_, d2)| d1.partial_cmp(d2).unwrap())
                .map(|(c, _)| c)
                .unwrap()
        })
        .collect()
}
