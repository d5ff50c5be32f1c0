//! The orchestrator: cluster, train, assemble, for every k.

use crate::Distance;
use crate::KMEDOIDS_PASSES;
use crate::cluster::composite::Mixture;
use crate::cluster::distance::Distances;
use crate::cluster::hierarchy;
use crate::cluster::kmedoids;
use crate::cluster::partition::Partition;
use crate::cluster::trainer;
use crate::config::Clustering;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::model::Hmm;
use crate::sequence::SequenceSet;
use crate::workers::Workers;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Everything produced for one k.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KModel {
    pub composite: Hmm,
    pub components: Vec<Hmm>,
    pub sizes: Vec<usize>,
    pub lengths: Vec<Vec<usize>>,
    /// Cluster id per input sequence, by position.
    pub labeling: Vec<usize>,
}

/// Wall-clock seconds per pipeline phase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Times {
    pub distance: f64,
    pub clustering: f64,
    pub training: f64,
}

/// The serializable outcome of a run: one mixture per surviving k, a
/// failure reason per k that did not, and phase timings.
#[derive(Debug, Serialize, Deserialize)]
pub struct Run {
    pub models: BTreeMap<usize, KModel>,
    pub failures: BTreeMap<usize, String>,
    pub times: Times,
}

/// Owns the input sequences, the validated configuration, and the worker
/// pool for the duration of one modeling run.
pub struct HmmCluster {
    set: SequenceSet,
    config: Config,
    workers: Workers,
}

impl HmmCluster {
    /// Validate configuration and acquire the worker pool.
    pub fn new(set: SequenceSet, config: Config) -> Result<Self> {
        config.validate()?;
        let workers = Workers::new(config.jobs)?;
        log::info!(
            "{:<32}{:<32}",
            "engine ready",
            format!("n {} workers {}", set.len(), workers.threads())
        );
        Ok(Self {
            set,
            config,
            workers,
        })
    }

    /// Run the full pipeline: distance matrix, one partition per k, one
    /// component per cluster, one composite per k. A distance failure is
    /// fatal to the whole run; later failures are isolated to their k.
    /// Consumes the engine, so the pool is released either way.
    pub fn model(self) -> Result<Run> {
        let mut times = Times::default();

        let clock = Instant::now();
        let condensed = Distances::new(&self.set, &self.config, &self.workers).condensed()?;
        times.distance = clock.elapsed().as_secs_f64();

        let clock = Instant::now();
        let partitions = self.partitions(&condensed);
        times.clustering = clock.elapsed().as_secs_f64();

        let clock = Instant::now();
        let (models, failures) = self.train(partitions);
        times.training = clock.elapsed().as_secs_f64();

        log::info!(
            "{:<32}{:<32}",
            "modeling finished",
            format!("{} mixtures {} failures", models.len(), failures.len())
        );
        Ok(Run {
            models,
            failures,
            times,
        })
    }

    /// One partition per k over the shared distance matrix. Hierarchical
    /// builds the merge tree once and cuts per k; k-medoids runs each k
    /// independently through the pool.
    fn partitions(&self, condensed: &[Distance]) -> BTreeMap<usize, Result<Partition>> {
        let n = self.set.len();
        match self.config.clustering {
            Clustering::Hierarchical => {
                log::info!(
                    "{:<32}{:<32}",
                    "hierarchical clustering",
                    format!("k {}..={}", self.config.min_k, self.config.max_k)
                );
                let dendrogram = hierarchy::linkage(condensed, n);
                self.config
                    .k_values()
                    .map(|k| (k, checked(k, dendrogram.cut(k))))
                    .collect()
            }
            Clustering::Kmedoids => {
                log::info!(
                    "{:<32}{:<32}",
                    "kmedoids clustering",
                    format!("k {}..={}", self.config.min_k, self.config.max_k)
                );
                let ks = self.config.k_values().collect::<Vec<usize>>();
                let partitions = self.workers.map(&ks, |&k| {
                    if k > n {
                        return Err(Error::ClusterCardinality { k, got: n });
                    }
                    let ref mut rng = crate::seeded(self.config.seed, k as u64);
                    let labels = kmedoids::kmedoids(condensed, n, k, KMEDOIDS_PASSES, rng);
                    checked(k, labels)
                });
                ks.into_iter().zip(partitions).collect()
            }
        }
    }

    /// Train every cluster of every surviving k as one flat batch, then
    /// zip the components back against their k by position. A failed
    /// cluster poisons only its own k.
    fn train(
        &self,
        partitions: BTreeMap<usize, Result<Partition>>,
    ) -> (BTreeMap<usize, KModel>, BTreeMap<usize, String>) {
        let mut failures = BTreeMap::new();
        let mut survivors = BTreeMap::new();
        for (k, partition) in partitions {
            match partition {
                Ok(p) => {
                    survivors.insert(k, p);
                }
                Err(e) => {
                    log::warn!("{:<32}{:<32}", "clustering failed", format!("k {} {}", k, e));
                    failures.insert(k, e.to_string());
                }
            }
        }
        let jobs = survivors
            .iter()
            .flat_map(|(k, partition)| {
                partition
                    .clusters()
                    .iter()
                    .enumerate()
                    .map(|(c, members)| (*k, c, members.clone()))
            })
            .collect::<Vec<(usize, usize, Vec<usize>)>>();
        log::info!(
            "{:<32}{:<32}",
            "training components",
            format!("jobs {}", jobs.len())
        );
        let trained = self.workers.map(&jobs, |(k, c, members)| {
            let sequences = members
                .iter()
                .map(|&i| self.set.get(i).observations())
                .collect::<Vec<&[f64]>>();
            let ref mut rng = crate::seeded(self.config.seed, (*k as u64) << 32 | *c as u64);
            trainer::train(
                &sequences,
                self.config.target_m,
                self.config.sigma_floor,
                rng,
            )
        });
        let mut models = BTreeMap::new();
        let mut cursor = 0;
        for (k, partition) in survivors {
            let results = &trained[cursor..cursor + partition.k()];
            cursor += partition.k();
            let mut components = Vec::with_capacity(partition.k());
            let mut reason = None;
            for result in results {
                match result {
                    Ok(hmm) => components.push(hmm.clone()),
                    Err(e) => {
                        reason = Some(e.to_string());
                        break;
                    }
                }
            }
            if let Some(reason) = reason {
                log::warn!("{:<32}{:<32}", "training failed", format!("k {} {}", k, reason));
                failures.insert(k, reason);
                continue;
            }
            let mixture = Mixture {
                components,
                sizes: partition.clusters().iter().map(|c| c.len()).collect(),
                lengths: partition
                    .clusters()
                    .iter()
                    .map(|c| c.iter().map(|&i| self.set.get(i).len()).collect())
                    .collect(),
            };
            match mixture.composite() {
                Ok(composite) => {
                    models.insert(
                        k,
                        KModel {
                            composite,
                            components: mixture.components,
                            sizes: mixture.sizes,
                            lengths: mixture.lengths,
                            labeling: partition.labels().to_vec(),
                        },
                    );
                }
                Err(e) => {
                    log::warn!("{:<32}{:<32}", "assembly failed", format!("k {} {}", k, e));
                    failures.insert(k, e.to_string());
                }
            }
        }
        (models, failures)
    }
}

/// Reject a cut that failed to produce exactly k non-empty groups.
fn checked(k: usize, labels: Vec<usize>) -> Result<Partition> {
    let partition = Partition::from_labels(&labels);
    match partition.k() == k {
        true => Ok(partition),
        false => Err(Error::ClusterCardinality {
            k,
            got: partition.k(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Jobs;
    use crate::model::sample::smyth_example;
    use crate::sequence::Sequence;

    fn tiny_set() -> SequenceSet {
        SequenceSet::new(vec![
            Sequence::new(vec![0.0, 0.2, 0.1, 0.3, 0.0, 0.2]),
            Sequence::new(vec![0.1, 0.3, 0.0, 0.2, 0.1, 0.0]),
            Sequence::new(vec![7.0, 7.2, 7.1, 7.3, 7.0, 7.2]),
            Sequence::new(vec![7.1, 7.3, 7.0, 7.2, 7.1, 7.0]),
        ])
        .unwrap()
    }

    #[test]
    fn k_of_one_is_a_single_full_cluster() {
        let mut config = Config::new(2, 1, 1);
        config.jobs = Jobs::Serial;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        let model = &run.models[&1];
        assert_eq!(model.sizes, vec![4]);
        assert!(model.labeling.iter().all(|&l| l == 0));
        assert!(run.failures.is_empty());
    }

    #[test]
    fn k_of_n_is_singletons() {
        let mut config = Config::new(2, 4, 4);
        config.jobs = Jobs::Serial;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        let model = &run.models[&4];
        assert_eq!(model.sizes, vec![1, 1, 1, 1]);
    }

    #[test]
    fn unachievable_k_fails_alone() {
        let mut config = Config::new(2, 2, 6);
        config.jobs = Jobs::Serial;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        assert!(run.models.contains_key(&2));
        assert!(run.models.contains_key(&3));
        assert!(run.models.contains_key(&4));
        assert!(run.failures.contains_key(&5));
        assert!(run.failures.contains_key(&6));
    }

    #[test]
    fn composite_dimensions_add_up() {
        let mut config = Config::new(2, 2, 2);
        config.jobs = Jobs::Serial;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        let model = &run.models[&2];
        let states = model.components.iter().map(|c| c.states()).sum::<usize>();
        assert_eq!(model.composite.states(), states);
        assert!(model.composite.validate().is_ok());
    }

    #[test]
    fn invalid_configuration_fails_before_any_work() {
        let config = Config::new(2, 3, 2);
        assert!(HmmCluster::new(tiny_set(), config).is_err());
    }

    #[test]
    fn kmedoids_pipeline_matches_structure() {
        let mut config = Config::new(2, 2, 2);
        config.jobs = Jobs::Serial;
        config.clustering = Clustering::Kmedoids;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        let model = &run.models[&2];
        assert_eq!(model.sizes.iter().sum::<usize>(), 4);
        // the two obvious value regimes end up apart
        assert_eq!(model.labeling[0], model.labeling[1]);
        assert_eq!(model.labeling[2], model.labeling[3]);
        assert_ne!(model.labeling[0], model.labeling[2]);
    }

    /// Smyth's recovery experiment: two 2-state sources with identical
    /// emissions and different dynamics, 20 draws each. Sequences from
    /// the same source should land in the same cluster.
    #[test]
    fn recovers_the_generating_sources() {
        let set = smyth_example(20, 200, 9);
        let mut config = Config::new(2, 2, 2);
        config.jobs = Jobs::Serial;
        config.seed = 9;
        let run = HmmCluster::new(set, config).unwrap().model().unwrap();
        let labeling = &run.models[&2].labeling;
        let agree = labeling[..20].iter().filter(|&&l| l == 0).count()
            + labeling[20..].iter().filter(|&&l| l == 1).count();
        let purity = agree.max(40 - agree);
        assert!(purity >= 36, "recovered {}/40 assignments", purity);
    }

    #[test]
    fn phase_times_are_recorded() {
        let mut config = Config::new(2, 1, 2);
        config.jobs = Jobs::Serial;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        assert!(run.times.distance >= 0.0);
        assert!(run.times.clustering >= 0.0);
        assert!(run.times.training >= 0.0);
    }

    #[test]
    fn run_artifact_serializes_to_plain_json() {
        let mut config = Config::new(2, 2, 2);
        config.jobs = Jobs::Serial;
        let run = HmmCluster::new(tiny_set(), config).unwrap().model().unwrap();
        let json = serde_json::to_string(&run).unwrap();
        let back: Run = serde_json::from_str(&json).unwrap();
        assert_eq!(back.models.len(), run.models.len());
        assert_eq!(back.models[&2].labeling, run.models[&2].labeling);
    }
}
