//! Flat partitions of the sequence set.

use std::collections::BTreeMap;

/// A partition of the input sequences into non-empty groups. Groups hold
/// sequence indices; the labeling vector is the same information by
/// position. Read-only once handed to training.
#[derive(Debug, Clone)]
pub struct Partition {
    clusters: Vec<Vec<usize>>,
    labels: Vec<usize>,
}

impl Partition {
    /// Group sequence indices by raw label. Works for any labeling
    /// scheme; clusters come out ordered by first appearance, so the
    /// result is deterministic in the input order.
    pub fn from_labels(raw: &[usize]) -> Self {
        let mut canonical: BTreeMap<usize, usize> = BTreeMap::new();
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        let mut labels = Vec::with_capacity(raw.len());
        for (i, r) in raw.iter().enumerate() {
            let id = *canonical.entry(*r).or_insert_with(|| {
                clusters.push(Vec::new());
                clusters.len() - 1
            });
            clusters[id].push(i);
            labels.push(id);
        }
        Self { clusters, labels }
    }

    /// Number of non-empty groups.
    pub fn k(&self) -> usize {
        self.clusters.len()
    }
    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_first_appearance() {
        let partition = Partition::from_labels(&[7, 2, 7, 9, 2]);
        assert_eq!(partition.k(), 3);
        assert_eq!(partition.clusters()[0], vec![0, 2]);
        assert_eq!(partition.clusters()[1], vec![1, 4]);
        assert_eq!(partition.clusters()[2], vec![3]);
        assert_eq!(partition.labels(), &[0, 1, 0, 2, 1]);
    }

    #[test]
    fn groups_cover_and_do_not_overlap() {
        let labels = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3];
        let partition = Partition::from_labels(&labels);
        let mut seen = vec![false; labels.len()];
        for cluster in partition.clusters() {
            assert!(!cluster.is_empty());
            for &i in cluster {
                assert!(!seen[i], "sequence {} in two clusters", i);
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
