//! Greedy seed-based clustering of listings by title similarity.
//!
//! Listings are visited in input order. Each listing not yet placed seeds a
//! new cluster, and every later unplaced listing whose similarity *to the
//! seed* reaches the threshold joins it. Members are never compared with each
//! other, so the grouping is not transitive and depends on input order: two
//! listings that both resemble the seed share a cluster even if they differ
//! from each other, while two near-identical listings that do not resemble
//! the seed may end up apart.

use crate::features::FeatureVector;
use crate::types::{Cluster, Listing};

/// Partition indices `0..features.len()` into seed-based clusters.
///
/// Each returned group starts with its seed; groups are ordered by seed
/// position and members by position. Zero vectors never match anything.
pub fn cluster_indices(features: &[FeatureVector], threshold: f32) -> Vec<Vec<usize>> {
    let zero: Vec<bool> = features.iter().map(FeatureVector::is_zero).collect();
    let mut used = vec![false; features.len()];
    let mut groups = Vec::new();

    for seed in 0..features.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let mut group = vec![seed];

        if !zero[seed] {
            // Every index before `seed` is already placed.
            for candidate in seed + 1..features.len() {
                if used[candidate] || zero[candidate] {
                    continue;
                }
                if features[seed].cosine(&features[candidate]) >= threshold {
                    used[candidate] = true;
                    group.push(candidate);
                }
            }
        }

        groups.push(group);
    }

    groups
}

/// Cluster listings by the similarity of their feature vectors.
///
/// Every input listing appears in exactly one returned [`Cluster`].
pub fn cluster_listings(items: Vec<(Listing, FeatureVector)>, threshold: f32) -> Vec<Cluster> {
    let (listings, features): (Vec<Listing>, Vec<FeatureVector>) = items.into_iter().unzip();
    let groups = cluster_indices(&features, threshold);

    let mut slots: Vec<Option<Listing>> = listings.into_iter().map(Some).collect();
    groups
        .into_iter()
        .filter_map(|group| {
            let mut members = group.into_iter().filter_map(|i| slots[i].take());
            let mut cluster = Cluster::seeded(members.next()?);
            for member in members {
                cluster.push(member);
            }
            Some(cluster)
        })
        .collect()
}

/// One singleton cluster per listing.
pub fn singletons(listings: Vec<Listing>) -> Vec<Cluster> {
    listings.into_iter().map(Cluster::seeded).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: &[f32]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    fn item(title: &str, values: &[f32]) -> (Listing, FeatureVector) {
        (Listing::new(title), fv(values))
    }

    fn titles(cluster: &Cluster) -> Vec<&str> {
        cluster.listings().iter().map(|l| l.title.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_no_clusters() {
        assert!(cluster_listings(vec![], 0.75).is_empty());
    }

    #[test]
    fn single_listing_is_a_singleton() {
        let clusters = cluster_listings(vec![item("a", &[1.0, 0.0])], 0.75);
        assert_eq!(clusters.len(), 1);
        assert_eq!(titles(&clusters[0]), vec!["a"]);
    }

    #[test]
    fn similar_listings_join_the_seed() {
        let clusters = cluster_listings(
            vec![
                item("a", &[1.0, 0.0]),
                item("b", &[0.0, 1.0]),
                item("a2", &[0.95, 0.05]),
            ],
            0.75,
        );
        assert_eq!(clusters.len(), 2);
        assert_eq!(titles(&clusters[0]), vec!["a", "a2"]);
        assert_eq!(titles(&clusters[1]), vec!["b"]);
    }

    #[test]
    fn all_below_threshold_gives_singletons() {
        let clusters = cluster_listings(
            vec![
                item("x", &[1.0, 0.0, 0.0]),
                item("y", &[0.0, 1.0, 0.0]),
                item("z", &[0.0, 0.0, 1.0]),
            ],
            0.75,
        );
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn threshold_is_inclusive() {
        let exact = cluster_indices(&[fv(&[1.0, 0.0]), fv(&[1.0, 0.0])], 1.0);
        assert_eq!(exact, vec![vec![0, 1]]);
    }

    #[test]
    fn members_are_compared_only_with_the_seed() {
        // b and c are each 60° from one another but ~30° from the seed a.
        let a = fv(&[1.0, 0.0]);
        let b = fv(&[0.866, 0.5]);
        let c = fv(&[0.866, -0.5]);
        assert!(b.cosine(&c) < 0.75);
        assert_eq!(cluster_indices(&[a, b, c], 0.8), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn grouping_depends_on_seed_order() {
        // b resembles both a and c, but a and c do not resemble each other.
        let a = fv(&[1.0, 0.0]);
        let b = fv(&[0.866, 0.5]);
        let c = fv(&[0.5, 0.866]);
        assert_eq!(
            cluster_indices(&[a.clone(), b.clone(), c.clone()], 0.8),
            vec![vec![0, 1], vec![2]]
        );
        assert_eq!(cluster_indices(&[b, a, c], 0.8), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn zero_vectors_never_cluster() {
        let zeros = vec![FeatureVector::zeros(4); 5];
        let groups = cluster_indices(&zeros, 0.75);
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn zero_vectors_never_cluster_even_with_tiny_threshold() {
        let features = vec![FeatureVector::zeros(2), fv(&[1.0, 0.0]), FeatureVector::zeros(2)];
        assert_eq!(cluster_indices(&features, f32::MIN_POSITIVE).len(), 3);
    }

    #[test]
    fn output_partitions_input() {
        let features: Vec<FeatureVector> = (0..12)
            .map(|i| {
                let angle = i as f32 * 0.35;
                fv(&[angle.cos(), angle.sin()])
            })
            .collect();
        let groups = cluster_indices(&features, 0.9);

        let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn cluster_listings_keeps_every_listing() {
        let items: Vec<(Listing, FeatureVector)> = (0..6)
            .map(|i| item(&format!("t{i}"), &[1.0, (i % 2) as f32 * 10.0]))
            .collect();
        let clusters = cluster_listings(items, 0.75);
        let total: usize = clusters.iter().map(Cluster::len).sum();
        assert_eq!(total, 6);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn singletons_wrap_each_listing() {
        let clusters = singletons(vec![Listing::new("a"), Listing::new("b")]);
        assert_eq!(clusters.len(), 2);
        assert_eq!(titles(&clusters[1]), vec!["b"]);
    }
}
