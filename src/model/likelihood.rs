//! Log-space forward and backward recursions.
//!
//! All likelihood work happens in log space: observation sequences run to
//! hundreds of windows and the per-step densities underflow f64 well
//! before that. Callers are responsible for checking finiteness; a
//! non-finite log likelihood is a modeling violation, not a value to
//! propagate silently.

use crate::LogLik;
use crate::model::Emission;
use crate::model::Hmm;

/// Numerically stable log of a sum of exponentials.
pub fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}

/// Log density of a scalar Gaussian.
pub(crate) fn ln_gaussian(x: f64, e: &Emission) -> f64 {
    let z = (x - e.mean) / e.sigma;
    -0.5 * (2.0 * std::f64::consts::PI).ln() - e.sigma.ln() - 0.5 * z * z
}

/// Forward recursion. `lnb(t, state)` is the log emission density of the
/// observation at time t under the given state.
pub(crate) fn forward<F>(lnpi: &[f64], lna: &[Vec<f64>], t_len: usize, lnb: F) -> Vec<Vec<f64>>
where
    F: Fn(usize, usize) -> f64,
{
    let m = lnpi.len();
    let mut alpha = vec![vec![f64::NEG_INFINITY; m]; t_len];
    for s in 0..m {
        alpha[0][s] = lnpi[s] + lnb(0, s);
    }
    for t in 1..t_len {
        for j in 0..m {
            let terms = (0..m)
                .map(|i| alpha[t - 1][i] + lna[i][j])
                .collect::<Vec<f64>>();
            alpha[t][j] = log_sum_exp(&terms) + lnb(t, j);
        }
    }
    alpha
}

/// Backward recursion, companion to `forward`.
pub(crate) fn backward<F>(lna: &[Vec<f64>], t_len: usize, lnb: F) -> Vec<Vec<f64>>
where
    F: Fn(usize, usize) -> f64,
{
    let m = lna.len();
    let mut beta = vec![vec![0.0; m]; t_len];
    for t in (0..t_len - 1).rev() {
        for i in 0..m {
            let terms = (0..m)
                .map(|j| lna[i][j] + lnb(t + 1, j) + beta[t + 1][j])
                .collect::<Vec<f64>>();
            beta[t][i] = log_sum_exp(&terms);
        }
    }
    beta
}

/// Elementwise log of a transition matrix. Zero entries map to negative
/// infinity and stay impossible through every recursion.
pub(crate) fn ln_matrix(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .map(|row| row.iter().map(|p| p.ln()).collect())
        .collect()
}

pub(crate) fn ln_vector(pi: &[f64]) -> Vec<f64> {
    pi.iter().map(|p| p.ln()).collect()
}

impl Hmm {
    /// Log likelihood of an observation sequence under this model.
    pub fn loglikelihood(&self, observations: &[f64]) -> LogLik {
        if observations.is_empty() {
            return 0.0;
        }
        let lnpi = ln_vector(self.initials());
        let lna = ln_matrix(self.transitions());
        let b = self.emissions();
        let alpha = forward(&lnpi, &lna, observations.len(), |t, s| {
            ln_gaussian(observations[t], &b[s])
        });
        log_sum_exp(alpha.last().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_matches_direct_sum() {
        let terms: [f64; 3] = [-1.0, -2.0, -3.0];
        let direct = terms.iter().map(|t| t.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(&terms) - direct).abs() < 1e-12);
    }

    #[test]
    fn log_sum_exp_of_impossible_is_impossible() {
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY; 3]), f64::NEG_INFINITY);
    }

    #[test]
    fn single_state_likelihood_is_emission_product() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 1.0)]);
        let observations = [0.5, -0.5, 1.0];
        let expected = observations
            .iter()
            .map(|&o| ln_gaussian(o, &Emission::new(0.0, 1.0)))
            .sum::<f64>();
        assert!((hmm.loglikelihood(&observations) - expected).abs() < 1e-10);
    }

    #[test]
    fn likelihood_prefers_the_generating_regime() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 1.0), Emission::new(10.0, 1.0)]);
        let near = hmm.loglikelihood(&[0.1, -0.2, 0.3, 9.8, 10.1]);
        let far = hmm.loglikelihood(&[50.0, 51.0, 49.0, 50.5, 50.2]);
        assert!(near > far);
    }

    #[test]
    fn gaussian_log_density_peaks_at_mean() {
        let e = Emission::new(2.0, 0.5);
        assert!(ln_gaussian(2.0, &e) > ln_gaussian(2.5, &e));
        assert!(ln_gaussian(2.0, &e) > ln_gaussian(1.5, &e));
    }
}
