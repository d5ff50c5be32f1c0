//! K-medoids partitioning over a condensed distance matrix.
//!
//! Each k runs independently: a handful of seeded restart passes, each
//! alternating nearest-medoid assignment with in-cluster medoid
//! recomputation until stable, keeping the lowest-error pass.

use crate::Distance;
use crate::KMEANS_ITERATIONS;
use rand::rngs::SmallRng;

/// Condensed-matrix lookup for an unordered pair.
fn at(condensed: &[Distance], n: usize, i: usize, j: usize) -> Distance {
    match i == j {
        true => 0.0,
        false => {
            let lo = i.min(j);
            let hi = i.max(j);
            condensed[lo * n - lo * (lo + 1) / 2 + hi - lo - 1]
        }
    }
}

/// Partition n sequences into k clusters around medoid sequences.
/// Returns raw labels (the medoid slot per sequence); the caller decides
/// whether the number of non-empty clusters is acceptable.
pub fn kmedoids(
    condensed: &[Distance],
    n: usize,
    k: usize,
    passes: usize,
    rng: &mut SmallRng,
) -> Vec<usize> {
    debug_assert!(k <= n);
    let mut best: Option<(Distance, Vec<usize>)> = None;
    for _ in 0..passes {
        let mut medoids = rand::seq::index::sample(rng, n, k).into_vec();
        medoids.sort();
        let mut labels = assign(condensed, n, &medoids);
        for _ in 0..KMEANS_ITERATIONS {
            let next = recompute(condensed, n, &medoids, &labels);
            if next == medoids {
                break;
            }
            medoids = next;
            labels = assign(condensed, n, &medoids);
        }
        let error = labels
            .iter()
            .enumerate()
            .map(|(p, &l)| at(condensed, n, p, medoids[l]))
            .sum::<Distance>();
        if best.as_ref().is_none_or(|(e, _)| error < *e) {
            best = Some((error, labels));
        }
    }
    best.expect("at least one pass").1
}

/// Nearest medoid per sequence, ties to the earliest medoid.
fn assign(condensed: &[Distance], n: usize, medoids: &[usize]) -> Vec<usize> {
    (0..n)
        .map(|p| {
            medoids
                .iter()
                .enumerate()
                .map(|(slot, &m)| (slot, at(condensed, n, p, m)))
                .min_by(|(_, d1), (_, d2)| d1.partial_cmp(d2).unwrap())
                .map(|(slot, _)| slot)
                .expect("at least one medoid")
        })
        .collect()
}

/// New medoid per cluster: the member minimizing total distance to its
/// cluster. An emptied cluster keeps its old medoid.
fn recompute(
    condensed: &[Distance],
    n: usize,
    medoids: &[usize],
    labels: &[usize],
) -> Vec<usize> {
    let mut next = medoids.to_vec();
    for slot in 0..medoids.len() {
        let members = (0..n).filter(|&p| labels[p] == slot).collect::<Vec<usize>>();
        if members.is_empty() {
            continue;
        }
        next[slot] = members
            .iter()
            .map(|&candidate| {
                let cost = members
                    .iter()
                    .map(|&other| at(condensed, n, candidate, other))
                    .sum::<Distance>();
                (candidate, cost)
            })
            .min_by(|(_, c1), (_, c2)| c1.partial_cmp(c2).unwrap())
            .map(|(candidate, _)| candidate)
            .expect("non-empty cluster");
    }
    next.sort();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::distance::pairs;

    fn line(points: &[f64]) -> Vec<Distance> {
        pairs(points.len())
            .map(|(i, j)| (points[i] - points[j]).abs())
            .collect()
    }

    #[test]
    fn condensed_lookup_is_symmetric() {
        let condensed = line(&[0.0, 1.0, 3.0, 7.0]);
        assert_eq!(at(&condensed, 4, 1, 2), 2.0);
        assert_eq!(at(&condensed, 4, 2, 1), 2.0);
        assert_eq!(at(&condensed, 4, 0, 3), 7.0);
        assert_eq!(at(&condensed, 4, 2, 2), 0.0);
    }

    #[test]
    fn two_blobs_split_cleanly() {
        let points = [0.0, 0.5, 1.0, 0.7, 100.0, 100.5, 101.0, 100.2];
        let condensed = line(&points);
        let labels = kmedoids(&condensed, 8, 2, 10, &mut crate::seeded(5, 2));
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[0], labels[3]);
        assert_eq!(labels[4], labels[5]);
        assert_eq!(labels[4], labels[6]);
        assert_eq!(labels[4], labels[7]);
        assert_ne!(labels[0], labels[4]);
    }

    #[test]
    fn k_equals_n_is_identity() {
        let condensed = line(&[0.0, 10.0, 20.0]);
        let labels = kmedoids(&condensed, 3, 3, 5, &mut crate::seeded(1, 3));
        let mut sorted = labels.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    fn deterministic_for_a_seed() {
        let points = [0.0, 1.0, 2.0, 50.0, 51.0, 52.0, 100.0, 101.0];
        let condensed = line(&points);
        let a = kmedoids(&condensed, 8, 3, 10, &mut crate::seeded(7, 3));
        let b = kmedoids(&condensed, 8, 3, 10, &mut crate::seeded(7, 3));
        assert_eq!(a, b);
    }
}
