//! Agglomerative clustering with Ward linkage

use crate::assignment::ClusterAssignment;
use crate::config::{HierarchicalConfig, Linkage};
use crate::error::ClusterError;
use feature_table::{euclidean, StandardizedMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One merge in the dendrogram.
///
/// Samples are clusters `0..n`; the cluster created by merge `k` gets id
/// `n + k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeEvent {
    /// Smaller id of the two merged clusters
    pub left: usize,
    /// Larger id of the two merged clusters
    pub right: usize,
    /// Linkage distance at which the merge happened
    pub distance: f64,
    /// Samples in the merged cluster
    pub size: usize,
}

/// Full merge history, ordered by non-decreasing distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeTree {
    n_samples: usize,
    linkage: Linkage,
    merges: Vec<MergeEvent>,
}

impl MergeTree {
    /// Number of leaves
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Linkage used to build the tree
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// All merges, `n_samples - 1` of them
    pub fn merges(&self) -> &[MergeEvent] {
        &self.merges
    }

    /// Merge distances in merge order
    pub fn distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }

    /// The final `p` merges (truncated dendrogram view)
    pub fn last_merges(&self, p: usize) -> &[MergeEvent] {
        let start = self.merges.len().saturating_sub(p);
        &self.merges[start..]
    }

    /// Labels for exactly `cut_k` clusters, undoing the last `cut_k - 1` merges
    pub fn cut(&self, cut_k: usize) -> Result<ClusterAssignment, ClusterError> {
        crate::check_cluster_count(cut_k, self.n_samples)?;
        self.labels_after(self.n_samples - cut_k)
    }

    /// Labels after applying every merge at or below `threshold`
    pub fn cut_at_distance(&self, threshold: f64) -> Result<ClusterAssignment, ClusterError> {
        let applied = self
            .merges
            .iter()
            .take_while(|m| m.distance <= threshold)
            .count();
        self.labels_after(applied)
    }

    /// Apply the first `n_merges` merges; labels follow first appearance in
    /// sample order.
    fn labels_after(&self, n_merges: usize) -> Result<ClusterAssignment, ClusterError> {
        let n = self.n_samples;
        let mut forest = UnionFind::new(n);
        // Sample that stands in for each cluster id
        let mut representative: Vec<usize> = (0..n).collect();

        for merge in &self.merges[..n_merges] {
            let (a, b) = (representative[merge.left], representative[merge.right]);
            forest.union(a, b);
            representative.push(a);
        }

        let mut label_of_root = vec![usize::MAX; n];
        let mut next = 0;
        let labels = (0..n)
            .map(|i| {
                let root = forest.find(i);
                if label_of_root[root] == usize::MAX {
                    label_of_root[root] = next;
                    next += 1;
                }
                label_of_root[root]
            })
            .collect();

        ClusterAssignment::new(labels, n - n_merges)
    }
}

/// Hierarchical clustering output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalResult {
    /// Labels at `cut_k` clusters
    pub assignment: ClusterAssignment,
    /// Complete merge history
    pub tree: MergeTree,
}

/// Bottom-up clusterer.
///
/// Uses the nearest-neighbor chain algorithm with Lance-Williams updates:
/// O(n^2) memory for the condensed distance matrix and O(n^2) time.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalClusterer {
    config: HierarchicalConfig,
}

impl HierarchicalClusterer {
    /// Create a clusterer
    pub fn new(config: HierarchicalConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &HierarchicalConfig {
        &self.config
    }

    /// Build the merge tree and cut it at `cut_k`
    pub fn fit(&self, data: &StandardizedMatrix) -> Result<HierarchicalResult, ClusterError> {
        crate::check_cluster_count(self.config.cut_k, data.n_samples())?;

        let tree = self.build_tree(data);
        let assignment = tree.cut(self.config.cut_k)?;

        info!(
            "Hierarchical clustering ({:?}): {} samples, cut at k={}, top merge distance={:.3}",
            self.config.linkage,
            data.n_samples(),
            self.config.cut_k,
            tree.merges.last().map(|m| m.distance).unwrap_or(0.0)
        );

        Ok(HierarchicalResult { assignment, tree })
    }

    /// Merge all samples into one cluster, recording every merge
    pub fn build_tree(&self, data: &StandardizedMatrix) -> MergeTree {
        let n = data.n_samples();
        let mut raw = match self.config.linkage {
            Linkage::Ward => nn_chain(data, ward_update),
        };

        // The chain finds merges out of order; Ward is reducible, so sorting
        // by distance yields the same dendrogram.
        raw.sort_by(|a, b| a.2.total_cmp(&b.2));

        let mut forest = UnionFind::new(n);
        let merges = raw
            .into_iter()
            .map(|(x, y, distance)| {
                let (a, b) = (forest.find(x), forest.find(y));
                let (left, right) = if a < b { (a, b) } else { (b, a) };
                let size = forest.merge(left, right);
                MergeEvent {
                    left,
                    right,
                    distance,
                    size,
                }
            })
            .collect::<Vec<_>>();

        debug!("Built merge tree with {} merges", merges.len());

        MergeTree {
            n_samples: n,
            linkage: self.config.linkage,
            merges,
        }
    }
}

/// Ward distance between cluster i and the union of x and y, from the
/// distances before the merge.
fn ward_update(d_xi: f64, d_yi: f64, d_xy: f64, nx: usize, ny: usize, ni: usize) -> f64 {
    let (nx, ny, ni) = (nx as f64, ny as f64, ni as f64);
    let t = 1.0 / (nx + ny + ni);
    let squared = (ni + nx) * t * d_xi * d_xi + (ni + ny) * t * d_yi * d_yi - ni * t * d_xy * d_xy;
    squared.max(0.0).sqrt()
}

/// Index into a condensed upper-triangular distance matrix
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Nearest-neighbor chain. Returns merges as (slot, slot, distance) where a
/// slot is the sample index that currently holds the merged cluster.
fn nn_chain(
    data: &StandardizedMatrix,
    update: fn(f64, f64, f64, usize, usize, usize) -> f64,
) -> Vec<(usize, usize, f64)> {
    let n = data.n_samples();
    let mut dist = vec![0.0; n * n.saturating_sub(1) / 2];
    for i in 0..n {
        for j in (i + 1)..n {
            dist[condensed_index(n, i, j)] = euclidean(data.row(i), data.row(j));
        }
    }

    let mut size = vec![1usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for _ in 0..n.saturating_sub(1) {
        if chain.is_empty() {
            chain.push(size.iter().position(|&s| s > 0).unwrap_or(0));
        }

        let (x, y, d_xy) = loop {
            let x = chain[chain.len() - 1];
            // Prefer the previous chain element on ties so the chain terminates
            let (mut y, mut current_min) = if chain.len() > 1 {
                let prev = chain[chain.len() - 2];
                (prev, dist[condensed_index(n, x, prev)])
            } else {
                (x, f64::INFINITY)
            };

            for i in 0..n {
                if size[i] == 0 || i == x {
                    continue;
                }
                let d = dist[condensed_index(n, x, i)];
                if d < current_min {
                    current_min = d;
                    y = i;
                }
            }

            if chain.len() > 1 && y == chain[chain.len() - 2] {
                break (x, y, current_min);
            }
            chain.push(y);
        };

        chain.truncate(chain.len() - 2);

        let (x, y) = if x < y { (x, y) } else { (y, x) };
        let (nx, ny) = (size[x], size[y]);
        merges.push((x, y, d_xy));

        size[x] = 0;
        size[y] = nx + ny;

        for i in 0..n {
            let ni = size[i];
            if ni == 0 || i == y {
                continue;
            }
            let d_xi = dist[condensed_index(n, i, x)];
            let d_yi = dist[condensed_index(n, i, y)];
            dist[condensed_index(n, i, y)] = update(d_xi, d_yi, d_xy, nx, ny, ni);
        }
    }

    merges
}

/// Union-find over cluster ids where each union creates a fresh id
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next_id: usize,
}

impl UnionFind {
    /// Room for `leaves` samples plus every cluster their merges create
    fn new(leaves: usize) -> Self {
        let ids = (2 * leaves).saturating_sub(1).max(1);
        Self {
            parent: (0..ids).collect(),
            size: (0..ids).map(|i| usize::from(i < leaves)).collect(),
            next_id: leaves,
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    /// Join two roots under a new id; returns the merged size
    fn merge(&mut self, a: usize, b: usize) -> usize {
        let id = self.next_id;
        self.parent[a] = id;
        self.parent[b] = id;
        self.size[id] = self.size[a] + self.size[b];
        self.next_id += 1;
        self.size[id]
    }

    /// Join the sets holding a and b without creating an id
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}
