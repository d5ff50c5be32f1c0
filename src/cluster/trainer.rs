//! Component training: one HMM per cluster.

use crate::cluster::smyth;
use crate::error::Error;
use crate::error::Result;
use crate::model::Hmm;
use crate::model::baumwelch;
use rand::rngs::SmallRng;

/// Train one cluster's HMM with at most `target_m` states.
///
/// The Smyth default model seeds Baum-Welch reestimation of the full
/// continuous Gaussian model. When any emission cluster has collapsed to
/// near-zero variance, continuous reestimation diverges; instead every
/// observation is replaced by its cluster label and only the transition
/// dynamics and initial distribution are retrained on those label
/// sequences, keeping the estimated emissions. The emission distribution
/// from the clustering step has held up well in simulation studies.
pub fn train(
    sequences: &[&[f64]],
    target_m: usize,
    sigma_floor: f64,
    rng: &mut SmallRng,
) -> Result<Hmm> {
    let est = smyth::estimate(sequences, target_m, rng)?;
    let hmm = match est.degenerate {
        false => est.default_model().reestimate(sequences)?,
        true => {
            log::debug!(
                "{:<32}{:<32}",
                "degenerate emissions",
                format!("cluster of {}", sequences.len())
            );
            let label_seqs = split_labels(&est.labels, sequences);
            let (a, pi) = baumwelch::reestimate_dynamics(&label_seqs, est.states())?;
            let a = baumwelch::repair_transitions(a);
            Hmm::raw(a, est.emissions, pi)
        }
    };
    let hmm = hmm.floor_sigma(sigma_floor);
    hmm.validate().map_err(|reason| {
        Error::InvalidModel(format!(
            "{} (cluster of {} sequences)",
            reason,
            sequences.len()
        ))
    })?;
    Ok(hmm)
}

/// Undo the flattening: split per-observation labels back into one label
/// sequence per input sequence.
fn split_labels(labels: &[usize], sequences: &[&[f64]]) -> Vec<Vec<usize>> {
    let mut split = Vec::with_capacity(sequences.len());
    let mut offset = 0;
    for seq in sequences {
        split.push(labels[offset..offset + seq.len()].to_vec());
        offset += seq.len();
    }
    split
}
