//! The (A, B, pi) triple with Gaussian emissions.

use crate::Probability;
use crate::STOCHASTIC_TOLERANCE;
use crate::error::Error;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;

/// One state's Gaussian emission parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub mean: f64,
    pub sigma: f64,
}

impl Emission {
    pub fn new(mean: f64, sigma: f64) -> Self {
        Self { mean, sigma }
    }
}

/// A hidden Markov model over scalar observations: row-stochastic
/// transition matrix A, per-state Gaussian emissions B, initial state
/// distribution pi. Plain nested numerics throughout, so a model crosses
/// worker and serialization boundaries as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hmm {
    a: Vec<Vec<Probability>>,
    b: Vec<Emission>,
    pi: Vec<Probability>,
}

impl Hmm {
    /// Construct and validate in one step. Invalid distributions never
    /// leave this function: a bad model corrupts every downstream
    /// likelihood it touches.
    pub fn new(a: Vec<Vec<Probability>>, b: Vec<Emission>, pi: Vec<Probability>) -> Result<Self> {
        let hmm = Self { a, b, pi };
        hmm.validate().map_err(Error::InvalidModel)?;
        Ok(hmm)
    }

    /// Internal constructor for reestimation steps, which maintain the
    /// invariants by construction. Final models are still validated
    /// before leaving the training path.
    pub(crate) fn raw(a: Vec<Vec<Probability>>, b: Vec<Emission>, pi: Vec<Probability>) -> Self {
        Self { a, b, pi }
    }

    /// Smyth's default model for an emission distribution: uniform
    /// transitions and initial probabilities. Valid by construction.
    pub fn uniform(b: Vec<Emission>) -> Self {
        let m = b.len();
        Self {
            a: crate::matrix::uniform(m, m, 1.0 / m as f64),
            b,
            pi: vec![1.0 / m as f64; m],
        }
    }

    pub fn states(&self) -> usize {
        self.b.len()
    }
    pub fn transitions(&self) -> &Vec<Vec<Probability>> {
        &self.a
    }
    pub fn emissions(&self) -> &[Emission] {
        &self.b
    }
    pub fn initials(&self) -> &[Probability] {
        &self.pi
    }

    /// Floor every emission sigma. Guards log likelihood underflow on
    /// near-constant states; any extra variance introduced here can be
    /// reestimated away by another Baum-Welch round.
    pub fn floor_sigma(mut self, floor: f64) -> Self {
        for e in self.b.iter_mut() {
            e.sigma = e.sigma.max(floor);
        }
        self
    }

    /// Check the probability distribution invariants, returning a
    /// description of the first violation.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let m = self.b.len();
        if m == 0 {
            return Err("zero states".to_string());
        }
        if self.a.len() != m || self.pi.len() != m {
            return Err(format!(
                "inconsistent dimensions: {} emissions, {}x? transitions, {} initials",
                m,
                self.a.len(),
                self.pi.len()
            ));
        }
        for (i, row) in self.a.iter().enumerate() {
            if row.len() != m {
                return Err(format!("transition row {} has {} entries", i, row.len()));
            }
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(format!("transition row {} has a negative or non-finite entry", i));
            }
            if (row.iter().sum::<f64>() - 1.0).abs() > STOCHASTIC_TOLERANCE {
                return Err(format!("transition row {} does not sum to 1", i));
            }
        }
        if self.pi.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err("initial distribution has a negative or non-finite entry".to_string());
        }
        if (self.pi.iter().sum::<f64>() - 1.0).abs() > STOCHASTIC_TOLERANCE {
            return Err("initial distribution does not sum to 1".to_string());
        }
        for (i, e) in self.b.iter().enumerate() {
            if !e.mean.is_finite() || !e.sigma.is_finite() || e.sigma <= 0.0 {
                return Err(format!("state {} emission ({}, {}) is degenerate", i, e.mean, e.sigma));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_default_is_valid() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 1.0), Emission::new(3.0, 1.0)]);
        assert!(hmm.validate().is_ok());
        assert_eq!(hmm.states(), 2);
        assert_eq!(hmm.transitions()[0], vec![0.5, 0.5]);
        assert_eq!(hmm.initials(), &[0.5, 0.5]);
    }

    #[test]
    fn rejects_non_stochastic_row() {
        let hmm = Hmm::new(
            vec![vec![0.9, 0.3], vec![0.5, 0.5]],
            vec![Emission::new(0.0, 1.0), Emission::new(1.0, 1.0)],
            vec![0.5, 0.5],
        );
        assert!(hmm.is_err());
    }

    #[test]
    fn rejects_negative_probability() {
        let hmm = Hmm::new(
            vec![vec![1.2, -0.2], vec![0.5, 0.5]],
            vec![Emission::new(0.0, 1.0), Emission::new(1.0, 1.0)],
            vec![0.5, 0.5],
        );
        assert!(hmm.is_err());
    }

    #[test]
    fn rejects_zero_sigma() {
        let hmm = Hmm::new(
            vec![vec![1.0]],
            vec![Emission::new(2.0, 0.0)],
            vec![1.0],
        );
        assert!(hmm.is_err());
    }

    #[test]
    fn sigma_floor_applies() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 0.2), Emission::new(3.0, 1.0)]);
        let floored = hmm.floor_sigma(0.5);
        assert_eq!(floored.emissions()[0].sigma, 0.5);
        assert_eq!(floored.emissions()[1].sigma, 1.0);
    }

    #[test]
    fn triple_survives_serialization() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 1.0), Emission::new(3.0, 1.0)]);
        let json = serde_json::to_string(&hmm).unwrap();
        let back: Hmm = serde_json::from_str(&json).unwrap();
        assert_eq!(hmm, back);
    }
}
