//! Synthetic sequence generation, for simulation studies and tests.

use crate::model::Emission;
use crate::model::Hmm;
use crate::sequence::Sequence;
use crate::sequence::SequenceSet;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::SmallRng;
use rand_distr::Normal;

impl Hmm {
    /// Sample one observation sequence of the given length.
    pub fn sample(&self, length: usize, rng: &mut SmallRng) -> Vec<f64> {
        let mut state = WeightedIndex::new(self.initials())
            .expect("valid initial distribution")
            .sample(rng);
        let mut observations = Vec::with_capacity(length);
        for _ in 0..length {
            let e = self.emissions()[state];
            observations.push(
                Normal::new(e.mean, e.sigma)
                    .expect("positive sigma")
                    .sample(rng),
            );
            state = WeightedIndex::new(&self.transitions()[state])
                .expect("valid transition row")
                .sample(rng);
        }
        observations
    }
}

/// Smyth 1997's worked example: two 2-state models sharing emission
/// parameters but differing in dynamics, sampled n times each.
pub fn smyth_example(n: usize, length: usize, seed: u64) -> SequenceSet {
    let shared = vec![Emission::new(0.0, 1.0), Emission::new(3.0, 1.0)];
    let sources = [
        Hmm::new(
            vec![vec![0.6, 0.4], vec![0.4, 0.6]],
            shared.clone(),
            vec![0.5, 0.5],
        )
        .expect("valid source model"),
        Hmm::new(
            vec![vec![0.1, 0.9], vec![0.9, 0.1]],
            shared,
            vec![0.5, 0.5],
        )
        .expect("valid source model"),
    ];
    let mut sequences = Vec::with_capacity(2 * n);
    for (h, hmm) in sources.iter().enumerate() {
        let ref mut rng = crate::seeded(seed, h as u64);
        for i in 0..n {
            sequences.push(Sequence::with_id(
                format!("hmm{}-{}", h, i),
                hmm.sample(length, rng),
            ));
        }
    }
    SequenceSet::new(sequences).expect("sampled sequences pass the boundary checks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_is_deterministic_for_a_seed() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 1.0), Emission::new(3.0, 1.0)]);
        let a = hmm.sample(50, &mut crate::seeded(9, 0));
        let b = hmm.sample(50, &mut crate::seeded(9, 0));
        assert_eq!(a, b);
    }

    #[test]
    fn sample_tracks_emission_support() {
        let hmm = Hmm::uniform(vec![Emission::new(0.0, 0.1), Emission::new(100.0, 0.1)]);
        let observations = hmm.sample(200, &mut crate::seeded(3, 0));
        assert_eq!(observations.len(), 200);
        assert!(observations.iter().all(|&o| o < 10.0 || o > 90.0));
    }

    #[test]
    fn example_set_has_both_sources() {
        let set = smyth_example(5, 30, 7);
        assert_eq!(set.len(), 10);
        assert_eq!(set.get(0).id(), Some("hmm0-0"));
        assert_eq!(set.get(9).id(), Some("hmm1-4"));
        assert!(set.iter().all(|s| s.len() == 30));
    }
}
