//! Observation sequences and the immutable input collection.

use crate::error::Error;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;

/// One discretized time series: an ordered list of scalar observations,
/// one per time window. Immutable once constructed. The optional id keeps
/// traceability back to whatever produced the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    id: Option<String>,
    observations: Vec<f64>,
}

impl Sequence {
    pub fn new(observations: Vec<f64>) -> Self {
        Self {
            id: None,
            observations,
        }
    }
    pub fn with_id(id: impl Into<String>, observations: Vec<f64>) -> Self {
        Self {
            id: Some(id.into()),
            observations,
        }
    }
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    pub fn observations(&self) -> &[f64] {
        &self.observations
    }
    pub fn len(&self) -> usize {
        self.observations.len()
    }
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
    /// Population variance of the observations.
    pub fn variance(&self) -> f64 {
        let n = self.observations.len() as f64;
        let mean = self.observations.iter().sum::<f64>() / n;
        self.observations
            .iter()
            .map(|o| (o - mean) * (o - mean))
            .sum::<f64>()
            / n
    }
}

impl From<Vec<f64>> for Sequence {
    fn from(observations: Vec<f64>) -> Self {
        Self::new(observations)
    }
}

/// The read-only input to a clustering run. Sequences are identified by
/// position; construction rejects series the engine cannot model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSet {
    sequences: Vec<Sequence>,
}

impl SequenceSet {
    /// Too-short and constant series have no dynamics to model and break
    /// the distance numerics, so they are rejected at the boundary.
    pub fn new(sequences: Vec<Sequence>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(Error::Config("no sequences to model".to_string()));
        }
        for (i, sequence) in sequences.iter().enumerate() {
            let name = sequence.id().unwrap_or("unnamed").to_string();
            if sequence.len() < 2 {
                return Err(Error::Config(format!(
                    "sequence {} ({}) has fewer than 2 observations",
                    i, name
                )));
            }
            if sequence.observations().iter().any(|o| !o.is_finite()) {
                return Err(Error::Config(format!(
                    "sequence {} ({}) contains a non-finite observation",
                    i, name
                )));
            }
            if sequence.variance() == 0.0 {
                return Err(Error::Config(format!(
                    "sequence {} ({}) has zero variance",
                    i, name
                )));
            }
        }
        Ok(Self { sequences })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
    pub fn get(&self, i: usize) -> &Sequence {
        &self.sequences[i]
    }
    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.iter()
    }
    /// Number of unordered pairs, the condensed distance array length.
    pub fn pairs(&self) -> usize {
        self.len() * (self.len() - 1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_set() {
        assert!(SequenceSet::new(vec![]).is_err());
    }

    #[test]
    fn rejects_short_sequence() {
        let set = SequenceSet::new(vec![Sequence::new(vec![1.0])]);
        assert!(set.is_err());
    }

    #[test]
    fn rejects_zero_variance() {
        let set = SequenceSet::new(vec![Sequence::new(vec![2.0, 2.0, 2.0])]);
        assert!(set.is_err());
    }

    #[test]
    fn accepts_and_counts_pairs() {
        let set = SequenceSet::new(vec![
            Sequence::new(vec![0.0, 1.0, 2.0]),
            Sequence::with_id("circ-17", vec![3.0, 1.0]),
            Sequence::new(vec![5.0, 0.0, 5.0]),
        ])
        .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.pairs(), 3);
        assert_eq!(set.get(1).id(), Some("circ-17"));
    }
}
