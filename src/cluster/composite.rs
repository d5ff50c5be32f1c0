//! Mixture assembly: per-cluster components into one composite model.

use crate::error::Result;
use crate::matrix;
use crate::model::Emission;
use crate::model::Hmm;
use serde::Deserialize;
use serde::Serialize;

/// One k's trained mixture: a component model per cluster, the cluster
/// sizes acting as component weights, and each cluster's sequence
/// lengths for downstream likelihood normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mixture {
    pub components: Vec<Hmm>,
    pub sizes: Vec<usize>,
    pub lengths: Vec<Vec<usize>>,
}

impl Mixture {
    /// Combine the components into a single model: block-diagonal
    /// transition matrix (cross-component transitions are impossible by
    /// construction, the clusters being mutually exclusive behavioral
    /// regimes), concatenated emissions, and each component's initial
    /// block weighted by its share of the training sequences.
    pub fn composite(&self) -> Result<Hmm> {
        let total = self.sizes.iter().sum::<usize>() as f64;
        let blocks = self
            .components
            .iter()
            .map(|c| c.transitions())
            .collect::<Vec<_>>();
        let a = matrix::block_diagonal(&blocks);
        let b = self
            .components
            .iter()
            .flat_map(|c| c.emissions().iter().copied())
            .collect::<Vec<Emission>>();
        let pi = self
            .components
            .iter()
            .zip(self.sizes.iter())
            .flat_map(|(c, &size)| {
                let weight = size as f64 / total;
                c.initials().iter().map(move |p| p * weight)
            })
            .collect::<Vec<f64>>();
        Hmm::new(a, b, pi)
    }
}
