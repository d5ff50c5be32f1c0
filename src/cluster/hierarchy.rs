//! Complete-linkage agglomerative clustering.
//!
//! The merge tree is built once per run with the nearest-neighbor-chain
//! algorithm, then cut to a flat clustering for every requested k.
//! Complete linkage is reducible, so chain merges found out of order are
//! safe to sort by height afterwards.

use crate::Distance;
use crate::cluster::distance::pairs;

/// One agglomeration step: the clusters represented by sequences `a` and
/// `b` joined at the given linkage height.
#[derive(Debug, Clone, Copy)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    pub height: Distance,
}

/// The full merge history over n sequences, height-ordered.
#[derive(Debug, Clone)]
pub struct Dendrogram {
    n: usize,
    merges: Vec<Merge>,
}

/// Build the complete-linkage merge tree from a condensed distance
/// matrix over n sequences.
pub fn linkage(condensed: &[Distance], n: usize) -> Dendrogram {
    debug_assert_eq!(condensed.len(), n * (n - 1) / 2);
    let mut d = crate::matrix::uniform(n, n, 0.0);
    for (idx, (i, j)) in pairs(n).enumerate() {
        d[i][j] = condensed[idx];
        d[j][i] = condensed[idx];
    }
    let mut active = vec![true; n];
    let mut merges: Vec<Merge> = Vec::with_capacity(n.saturating_sub(1));
    let mut chain: Vec<usize> = Vec::new();
    while merges.len() + 1 < n {
        if chain.is_empty() {
            let start = active.iter().position(|&a| a).expect("an active cluster remains");
            chain.push(start);
        }
        loop {
            let tip = *chain.last().expect("chain is non-empty");
            let (mut partner, mut height) = (0..n)
                .filter(|&c| active[c] && c != tip)
                .map(|c| (c, d[tip][c]))
                .min_by(|(_, d1), (_, d2)| d1.partial_cmp(d2).unwrap())
                .expect("at least two active clusters");
            // ties must prefer the predecessor, or the chain can cycle
            if chain.len() >= 2 {
                let previous = chain[chain.len() - 2];
                if d[tip][previous] <= height {
                    partner = previous;
                    height = d[tip][previous];
                }
            }
            if chain.len() >= 2 && partner == chain[chain.len() - 2] {
                chain.pop();
                chain.pop();
                // the merged cluster is as far from any other as its
                // farthest member
                let keep = tip.min(partner);
                let drop = tip.max(partner);
                for c in (0..n).filter(|&c| active[c] && c != keep && c != drop) {
                    d[keep][c] = d[keep][c].max(d[drop][c]);
                    d[c][keep] = d[keep][c];
                }
                active[drop] = false;
                merges.push(Merge {
                    a: keep,
                    b: drop,
                    height,
                });
                break;
            }
            chain.push(partner);
        }
    }
    merges.sort_by(|x, y| x.height.partial_cmp(&y.height).unwrap());
    Dendrogram { n, merges }
}

impl Dendrogram {
    /// Flat cluster labels after cutting the tree to k groups: replay
    /// the n - k lowest merges and read off the connected components.
    /// Labels are raw component representatives, not yet canonical.
    pub fn cut(&self, k: usize) -> Vec<usize> {
        let mut parent = (0..self.n).collect::<Vec<usize>>();
        for merge in self.merges.iter().take(self.n.saturating_sub(k)) {
            let a = find(&mut parent, merge.a);
            let b = find(&mut parent, merge.b);
            parent[a] = b;
        }
        (0..self.n).map(|i| find(&mut parent, i)).collect()
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Condensed matrix for points on a line at the given coordinates.
    fn line(points: &[f64]) -> Vec<Distance> {
        pairs(points.len())
            .map(|(i, j)| (points[i] - points[j]).abs())
            .collect()
    }

    #[test]
    fn merges_are_height_ordered() {
        let condensed = line(&[0.0, 1.0, 10.0, 11.5, 30.0]);
        let dendrogram = linkage(&condensed, 5);
        assert_eq!(dendrogram.merges().len(), 4);
        for w in dendrogram.merges().windows(2) {
            assert!(w[0].height <= w[1].height);
        }
    }

    #[test]
    fn cut_to_two_separates_the_gap() {
        let condensed = line(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        let labels = linkage(&condensed, 6).cut(2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn cut_to_one_is_everything() {
        let condensed = line(&[0.0, 5.0, 50.0, 500.0]);
        let labels = linkage(&condensed, 4).cut(1);
        assert!(labels.iter().all(|&l| l == labels[0]));
    }

    #[test]
    fn cut_to_n_is_singletons() {
        let condensed = line(&[0.0, 5.0, 50.0, 500.0]);
        let labels = linkage(&condensed, 4).cut(4);
        let mut sorted = labels.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn complete_linkage_uses_the_farthest_member() {
        // {0,1} merge first; their complete-linkage distance to 2 is
        // max(d02, d12) = 5, above d((0,1)) but the tree still joins all
        let condensed = line(&[0.0, 2.0, 5.0]);
        let dendrogram = linkage(&condensed, 3);
        assert_eq!(dendrogram.merges()[0].height, 2.0);
        assert_eq!(dendrogram.merges()[1].height, 5.0);
    }
}
