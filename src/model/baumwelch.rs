//! Baum-Welch reestimation, continuous and discrete.

use crate::BAUM_WELCH_ITERATIONS;
use crate::BAUM_WELCH_TOLERANCE;
use crate::SIGMA_TINY;
use crate::error::Error;
use crate::error::Result;
use crate::matrix;
use crate::model::Emission;
use crate::model::Hmm;
use crate::model::likelihood::backward;
use crate::model::likelihood::forward;
use crate::model::likelihood::ln_gaussian;
use crate::model::likelihood::ln_matrix;
use crate::model::likelihood::ln_vector;
use crate::model::likelihood::log_sum_exp;

impl Hmm {
    /// Reestimate the full continuous Gaussian model against a cluster
    /// of sequences, starting from this triple. Stops once the total log
    /// likelihood converges or the iteration budget runs out.
    pub fn reestimate(&self, sequences: &[&[f64]]) -> Result<Hmm> {
        let m = self.states();
        let mut current = self.clone();
        let mut last = f64::NEG_INFINITY;
        for iteration in 0..BAUM_WELCH_ITERATIONS {
            let lnpi = ln_vector(current.initials());
            let lna = ln_matrix(current.transitions());
            let emissions = current.emissions().to_vec();
            let mut starts = vec![0.0; m];
            let mut flow = matrix::uniform(m, m, 0.0);
            let mut leaving = vec![0.0; m];
            let mut occupancy = vec![0.0; m];
            let mut weighted = vec![0.0; m];
            let mut squared = vec![0.0; m];
            let mut total = 0.0;
            for seq in sequences {
                let t_len = seq.len();
                let lnb = |t: usize, s: usize| ln_gaussian(seq[t], &emissions[s]);
                let alpha = forward(&lnpi, &lna, t_len, lnb);
                let beta = backward(&lna, t_len, lnb);
                let ll = log_sum_exp(&alpha[t_len - 1]);
                if !ll.is_finite() {
                    return Err(Error::NumericInstability(format!(
                        "log likelihood while reestimating a cluster of {} sequences",
                        sequences.len()
                    )));
                }
                total += ll;
                for t in 0..t_len {
                    for i in 0..m {
                        let gamma = (alpha[t][i] + beta[t][i] - ll).exp();
                        occupancy[i] += gamma;
                        weighted[i] += gamma * seq[t];
                        squared[i] += gamma * seq[t] * seq[t];
                        if t == 0 {
                            starts[i] += gamma;
                        }
                        if t + 1 < t_len {
                            leaving[i] += gamma;
                        }
                    }
                }
                for t in 0..t_len - 1 {
                    for i in 0..m {
                        for j in 0..m {
                            let xi = alpha[t][i] + lna[i][j] + lnb(t + 1, j) + beta[t + 1][j] - ll;
                            flow[i][j] += xi.exp();
                        }
                    }
                }
            }
            let pi = starts
                .iter()
                .map(|g| g / sequences.len() as f64)
                .collect::<Vec<f64>>();
            let a = flow
                .iter()
                .zip(leaving.iter())
                .enumerate()
                .map(|(i, (row, den))| match *den > 0.0 {
                    true => row.iter().map(|x| x / den).collect(),
                    false => current.transitions()[i].clone(),
                })
                .collect::<Vec<Vec<f64>>>();
            let b = (0..m)
                .map(|i| match occupancy[i] > 0.0 {
                    true => {
                        let mean = weighted[i] / occupancy[i];
                        let variance = squared[i] / occupancy[i] - mean * mean;
                        Emission::new(mean, variance.max(SIGMA_TINY * SIGMA_TINY).sqrt())
                    }
                    false => current.emissions()[i],
                })
                .collect::<Vec<Emission>>();
            current = Hmm::raw(a, b, pi);
            log::debug!(
                "{:<32}{:<32}",
                "baum welch",
                format!("iteration {} ll {:.4}", iteration, total)
            );
            if (total - last).abs() < BAUM_WELCH_TOLERANCE {
                break;
            }
            last = total;
        }
        Ok(current)
    }
}

/// Reestimate only the transition dynamics and initial distribution of a
/// discrete Markov model over cluster labels. States are the labels
/// themselves with identity emissions, so the emission parameters never
/// move; this is the stable path when a cluster's continuous emissions
/// have collapsed to zero variance.
pub(crate) fn reestimate_dynamics(
    label_seqs: &[Vec<usize>],
    alphabet: usize,
) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    let m = alphabet;
    let mut a = matrix::uniform(m, m, 1.0 / m as f64);
    let mut pi = vec![1.0 / m as f64; m];
    let mut last = f64::NEG_INFINITY;
    for _ in 0..BAUM_WELCH_ITERATIONS {
        let lnpi = ln_vector(&pi);
        let lna = ln_matrix(&a);
        let mut starts = vec![0.0; m];
        let mut flow = matrix::uniform(m, m, 0.0);
        let mut leaving = vec![0.0; m];
        let mut total = 0.0;
        for labels in label_seqs {
            let t_len = labels.len();
            let lnb = |t: usize, s: usize| match labels[t] == s {
                true => 0.0,
                false => f64::NEG_INFINITY,
            };
            let alpha = forward(&lnpi, &lna, t_len, lnb);
            let beta = backward(&lna, t_len, lnb);
            let ll = log_sum_exp(&alpha[t_len - 1]);
            if !ll.is_finite() {
                return Err(Error::NumericInstability(format!(
                    "label dynamics log likelihood over {} sequences",
                    label_seqs.len()
                )));
            }
            total += ll;
            for t in 0..t_len {
                for i in 0..m {
                    let gamma = (alpha[t][i] + beta[t][i] - ll).exp();
                    if t == 0 {
                        starts[i] += gamma;
                    }
                    if t + 1 < t_len {
                        leaving[i] += gamma;
                    }
                }
            }
            for t in 0..t_len - 1 {
                for i in 0..m {
                    for j in 0..m {
                        let xi = alpha[t][i] + lna[i][j] + lnb(t + 1, j) + beta[t + 1][j] - ll;
                        flow[i][j] += xi.exp();
                    }
                }
            }
        }
        pi = starts
            .iter()
            .map(|g| g / label_seqs.len() as f64)
            .collect();
        // never-visited states surface as all-zero rows for the caller
        // to repair
        a = flow
            .iter()
            .zip(leaving.iter())
            .map(|(row, den)| match *den > 0.0 {
                true => row.iter().map(|x| x / den).collect(),
                false => vec![0.0; m],
            })
            .collect();
        if (total - last).abs() < BAUM_WELCH_TOLERANCE {
            break;
        }
        last = total;
    }
    Ok((a, pi))
}

/// A state that training never visited has an undefined transition row.
/// Give it a uniform distribution; defined rows are left alone.
pub(crate) fn repair_transitions(mut a: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let m = a.len();
    for row in a.iter_mut() {
        if row.iter().sum::<f64>() == 0.0 {
            *row = vec![1.0 / m as f64; m];
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_set() -> Vec<Vec<f64>> {
        // alternating low/high regime, well separated
        (0..6)
            .map(|i| {
                (0..40)
                    .map(|t| match (t + i) % 2 {
                        0 => 0.0 + 0.1 * (t % 3) as f64,
                        _ => 5.0 - 0.1 * (t % 3) as f64,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn reestimation_does_not_lower_likelihood() {
        let sequences = training_set();
        let refs = sequences.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
        let start = Hmm::uniform(vec![Emission::new(1.0, 2.0), Emission::new(4.0, 2.0)]);
        let before = refs.iter().map(|s| start.loglikelihood(s)).sum::<f64>();
        let trained = start.reestimate(&refs).unwrap();
        let after = refs.iter().map(|s| trained.loglikelihood(s)).sum::<f64>();
        assert!(after >= before - 1e-6, "before {} after {}", before, after);
    }

    #[test]
    fn reestimation_preserves_invariants() {
        let sequences = training_set();
        let refs = sequences.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
        let start = Hmm::uniform(vec![Emission::new(1.0, 2.0), Emission::new(4.0, 2.0)]);
        let trained = start.reestimate(&refs).unwrap().floor_sigma(crate::SIGMA_TINY);
        assert!(trained.validate().is_ok());
    }

    #[test]
    fn dynamics_recover_label_bigrams() {
        let label_seqs = vec![vec![0, 0, 0, 1, 1, 1], vec![0, 0, 1, 1, 1, 1]];
        let (a, pi) = reestimate_dynamics(&label_seqs, 2).unwrap();
        // both sequences start at 0
        assert!((pi[0] - 1.0).abs() < 1e-9);
        assert!(pi[1].abs() < 1e-9);
        // state 0 mostly self-transitions, state 1 always does
        for row in a.iter() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!(a[0][0] > a[0][1]);
        assert!((a[1][1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unvisited_state_row_is_repaired_to_uniform() {
        let label_seqs = vec![vec![0, 1, 0, 1, 0]];
        let (a, _) = reestimate_dynamics(&label_seqs, 3).unwrap();
        assert_eq!(a[2], vec![0.0, 0.0, 0.0]);
        let repaired = repair_transitions(a);
        assert_eq!(repaired[2], vec![1.0 / 3.0; 3]);
        assert!((repaired[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
