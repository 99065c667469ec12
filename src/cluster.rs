//! Density-based clustering over cosine similarity.
//!
//! DBSCAN with the distance defined as `1 - cosine_similarity`: two points
//! are direct neighbors when their similarity is at or above the
//! configured threshold. A point whose neighborhood (itself included)
//! holds at least `min_cluster_size` points is a core point; clusters are
//! the closures of core points under that neighbor relation, border
//! points attach to the first cluster that reaches them, and everything
//! else is noise.
//!
//! Seeds are taken in input order and expansion is FIFO, so label
//! assignment is deterministic for a fixed input ordering. Neighbor
//! search is brute force, which is fine at the corpus sizes this runs on.

use std::collections::VecDeque;

/// Label for points that belong to no cluster.
pub const NOISE: i64 = -1;

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("min_cluster_size must be at least 1, got {0}")]
    InvalidMinClusterSize(usize),

    #[error("similarity_threshold must be within [0.0, 1.0], got {0}")]
    InvalidSimilarityThreshold(f32),
}

/// Configured DBSCAN run. Construction validates parameters so bad input
/// is rejected before any embedding work happens.
pub struct Dbscan {
    min_cluster_size: usize,
    similarity_threshold: f32,
}

impl Dbscan {
    pub fn new(min_cluster_size: usize, similarity_threshold: f32) -> Result<Self, ClusterError> {
        if min_cluster_size < 1 {
            return Err(ClusterError::InvalidMinClusterSize(min_cluster_size));
        }
        if !(0.0..=1.0).contains(&similarity_threshold) || similarity_threshold.is_nan() {
            return Err(ClusterError::InvalidSimilarityThreshold(similarity_threshold));
        }

        Ok(Self {
            min_cluster_size,
            similarity_threshold,
        })
    }

    /// Assign a cluster label (0-based) or [`NOISE`] to every vector.
    /// Output is index-aligned with the input.
    pub fn fit(&self, vectors: &[Vec<f32>]) -> Vec<i64> {
        let n = vectors.len();
        let norms: Vec<f32> = vectors.iter().map(|v| l2_norm(v)).collect();

        let mut labels = vec![NOISE; n];
        let mut visited = vec![false; n];
        let mut next_cluster: i64 = 0;

        for seed in 0..n {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let neighbors = self.neighborhood(vectors, &norms, seed);
            if neighbors.len() < self.min_cluster_size {
                // Stays noise unless a later core point reaches it
                continue;
            }

            let cluster = next_cluster;
            next_cluster += 1;
            labels[seed] = cluster;

            let mut queue: VecDeque<usize> = neighbors.into();
            while let Some(point) = queue.pop_front() {
                if !visited[point] {
                    visited[point] = true;
                    labels[point] = cluster;

                    let expansion = self.neighborhood(vectors, &norms, point);
                    if expansion.len() >= self.min_cluster_size {
                        queue.extend(expansion);
                    }
                } else if labels[point] == NOISE {
                    // Previously visited non-core point, now reachable:
                    // border point of this cluster
                    labels[point] = cluster;
                }
            }
        }

        labels
    }

    /// Indices (ascending) whose cosine similarity to `point` is at or
    /// above the threshold. The point itself is always included.
    fn neighborhood(&self, vectors: &[Vec<f32>], norms: &[f32], point: usize) -> Vec<usize> {
        let mut neighbors = Vec::new();

        for other in 0..vectors.len() {
            if other == point {
                neighbors.push(other);
                continue;
            }
            let similarity =
                cosine_similarity(&vectors[point], &vectors[other], norms[point], norms[other]);
            if similarity >= self.similarity_threshold {
                neighbors.push(other);
            }
        }

        neighbors
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_similarity(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit vector in 2D at the given angle (degrees).
    fn at_angle(degrees: f32) -> Vec<f32> {
        let rad = degrees.to_radians();
        vec![rad.cos(), rad.sin()]
    }

    #[test]
    fn test_invalid_min_cluster_size() {
        assert!(matches!(
            Dbscan::new(0, 0.75),
            Err(ClusterError::InvalidMinClusterSize(0))
        ));
    }

    #[test]
    fn test_invalid_similarity_threshold() {
        assert!(matches!(
            Dbscan::new(2, 1.5),
            Err(ClusterError::InvalidSimilarityThreshold(_))
        ));
        assert!(matches!(
            Dbscan::new(2, -0.1),
            Err(ClusterError::InvalidSimilarityThreshold(_))
        ));
        assert!(matches!(
            Dbscan::new(2, f32::NAN),
            Err(ClusterError::InvalidSimilarityThreshold(_))
        ));
    }

    #[test]
    fn test_boundary_thresholds_accepted() {
        assert!(Dbscan::new(1, 0.0).is_ok());
        assert!(Dbscan::new(1, 1.0).is_ok());
    }

    #[test]
    fn test_two_groups_and_a_singleton() {
        // Two tight pairs far apart, plus one isolated point
        let vectors = vec![
            at_angle(0.0),
            at_angle(5.0),
            at_angle(90.0),
            at_angle(95.0),
            at_angle(180.0),
        ];
        let labels = Dbscan::new(2, 0.9).unwrap().fit(&vectors);

        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], 1);
        assert_eq!(labels[3], 1);
        assert_eq!(labels[4], NOISE);
    }

    #[test]
    fn test_empty_input() {
        let labels = Dbscan::new(2, 0.75).unwrap().fit(&[]);
        assert!(labels.is_empty());
    }

    #[test]
    fn test_single_point_is_noise_with_default_min_size() {
        let labels = Dbscan::new(2, 0.75).unwrap().fit(&[at_angle(0.0)]);
        assert_eq!(labels, vec![NOISE]);
    }

    #[test]
    fn test_min_cluster_size_above_corpus_yields_all_noise() {
        let vectors = vec![at_angle(0.0), at_angle(1.0), at_angle(2.0)];
        let labels = Dbscan::new(10, 0.5).unwrap().fit(&vectors);
        assert!(labels.iter().all(|&l| l == NOISE));
    }

    #[test]
    fn test_min_cluster_size_one_makes_every_point_core() {
        let vectors = vec![at_angle(0.0), at_angle(90.0), at_angle(180.0)];
        let labels = Dbscan::new(1, 0.99).unwrap().fit(&vectors);
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_chained_reachability_merges_into_one_cluster() {
        // 0-25-50 degrees: ends are not direct neighbors at 0.8
        // (cos 50 ~ 0.64) but both reach the middle core point
        let vectors = vec![at_angle(0.0), at_angle(25.0), at_angle(50.0)];
        let labels = Dbscan::new(2, 0.8).unwrap().fit(&vectors);
        assert_eq!(labels, vec![0, 0, 0]);
    }

    #[test]
    fn test_threshold_one_clusters_only_exact_duplicates() {
        let vectors = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.999, 0.045],
        ];
        let labels = Dbscan::new(2, 1.0).unwrap().fit(&vectors);
        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], NOISE);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let vectors: Vec<Vec<f32>> = (0..20).map(|i| at_angle(i as f32 * 13.0)).collect();
        let dbscan = Dbscan::new(2, 0.85).unwrap();
        assert_eq!(dbscan.fit(&vectors), dbscan.fit(&vectors));
    }

    #[test]
    fn test_raising_threshold_never_grows_clusters() {
        // At 0.6 the whole fan is one chained cluster; at 0.75 the outlier
        // at 60 degrees drops to noise
        let vectors = vec![at_angle(0.0), at_angle(10.0), at_angle(60.0)];

        let loose = Dbscan::new(2, 0.6).unwrap().fit(&vectors);
        let strict = Dbscan::new(2, 0.75).unwrap().fit(&vectors);

        assert_eq!(loose, vec![0, 0, 0]);
        assert_eq!(strict, vec![0, 0, NOISE]);

        let clustered = |labels: &[i64]| labels.iter().filter(|&&l| l != NOISE).count();
        assert!(clustered(&strict) <= clustered(&loose));
    }

    #[test]
    fn test_labels_are_assigned_in_input_order() {
        // First-seen group gets label 0 regardless of geometry
        let vectors = vec![at_angle(90.0), at_angle(92.0), at_angle(0.0), at_angle(2.0)];
        let labels = Dbscan::new(2, 0.95).unwrap().fit(&vectors);
        assert_eq!(labels, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_zero_norm_vector_is_noise() {
        let vectors = vec![vec![0.0, 0.0], at_angle(0.0), at_angle(2.0)];
        let labels = Dbscan::new(2, 0.9).unwrap().fit(&vectors);
        assert_eq!(labels[0], NOISE);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], 0);
    }
}
