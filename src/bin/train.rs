//! Mixture training binary.
//!
//! Reads a JSON mapping of sequence ids to observation lists, models the
//! collection as HMM mixtures for every k in the configured range, and
//! writes the per-k triples, labelings, and timings as a JSON artifact.

use clap::Parser;
use colored::Colorize;
use hmmix::cluster::HmmCluster;
use hmmix::config::Clustering;
use hmmix::config::Config;
use hmmix::config::DistanceFn;
use hmmix::config::Initialization;
use hmmix::config::Jobs;
use hmmix::sequence::Sequence;
use hmmix::sequence::SequenceSet;
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(about = "HMM mixture clustering of discretized traffic time series")]
struct Args {
    /// JSON file mapping sequence ids to observation lists
    infile: std::path::PathBuf,
    /// Where to write the modeling artifact
    outfile: std::path::PathBuf,
    /// Upper bound on states per component
    #[arg(long, default_value_t = 4)]
    target_m: usize,
    /// Smallest mixture size to try
    #[arg(long, default_value_t = 2)]
    min_k: usize,
    /// Largest mixture size to try
    #[arg(long, default_value_t = 8)]
    max_k: usize,
    /// Distance function: hmm or editdistance
    #[arg(long, default_value = "hmm")]
    dist: DistanceFn,
    /// Initialization: smyth or random
    #[arg(long, default_value = "smyth")]
    init: Initialization,
    /// Clustering algorithm: hierarchical or kmedoids
    #[arg(long, default_value = "hierarchical")]
    alg: Clustering,
    /// Worker count; 0 means all cores, -1 runs single threaded
    #[arg(long, default_value_t = 0)]
    jobs: i64,
    /// Floor on trained emission sigmas
    #[arg(long, default_value_t = hmmix::DEFAULT_SIGMA_FLOOR)]
    sigma_floor: f64,
    /// Seed for every pseudo-random choice in the run
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() {
    hmmix::log();
    let args = Args::parse();
    let file = std::fs::File::open(&args.infile).expect("open input file");
    let raw: BTreeMap<String, Vec<f64>> = serde_json::from_reader(file).expect("parse input json");
    let mut sequences = Vec::with_capacity(raw.len());
    for (id, observations) in raw {
        let sequence = Sequence::with_id(id, observations);
        let usable = sequence.len() >= 2
            && sequence.variance() > 0.0
            && sequence.observations().iter().all(|o| o.is_finite());
        match usable {
            true => sequences.push(sequence),
            false => log::warn!(
                "{:<32}{:<32}",
                "skipping sequence",
                sequence.id().unwrap_or("unnamed").to_string()
            ),
        }
    }
    let set = SequenceSet::new(sequences).expect("at least one usable sequence");
    let mut config = Config::new(args.target_m, args.min_k, args.max_k);
    config.distance = args.dist;
    config.initialization = args.init;
    config.clustering = args.alg;
    config.jobs = Jobs::from(args.jobs);
    config.sigma_floor = args.sigma_floor;
    config.seed = args.seed;
    let engine = HmmCluster::new(set, config).expect("valid configuration");
    let run = engine.model().expect("modeling run");
    let out = std::fs::File::create(&args.outfile).expect("create output file");
    serde_json::to_writer_pretty(out, &run).expect("serialize artifact");
    for (k, model) in run.models.iter() {
        println!(
            "{} k {:<4} cluster sizes {:?}",
            "modeled".green().bold(),
            k,
            model.sizes
        );
    }
    for (k, reason) in run.failures.iter() {
        println!("{} k {:<4} {}", " failed".red().bold(), k, reason);
    }
    println!(
        "distance {:.2}s clustering {:.2}s training {:.2}s",
        run.times.distance, run.times.clustering, run.times.training
    );
}
