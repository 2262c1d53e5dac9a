//! Collapse detections observed more than once across overlapping tiles.
//!
//! Candidate pairs come from an R-tree over detection envelopes, so only
//! spatial neighbours are compared. A pair whose intersection-over-area
//! (relative to the smaller detection) reaches `min_ioa` is joined in a
//! union-find; each resulting cluster keeps one representative:
//!
//! 1. highest confidence
//! 2. then larger area
//! 3. then earliest first-seen position
//!
//! Survivors keep their input order.

use std::cmp::Ordering;

use rstar::{AABB, RTree, RTreeObject};
use tracing::debug;

use crate::error::ConfigError;
use crate::models::Detection;

/// Union-find over dense indices with path halving and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }

        match self.rank[root_x].cmp(&self.rank[root_y]) {
            Ordering::Less => self.parent[root_x] = root_y,
            Ordering::Greater => self.parent[root_y] = root_x,
            Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

struct DetectionEnvelope {
    index: usize,
    aabb: AABB<[f32; 2]>,
}

impl RTreeObject for DetectionEnvelope {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn envelope_of(detection: &Detection) -> AABB<[f32; 2]> {
    let bounds = detection.geometry.bounds();
    AABB::from_corners([bounds.x_min, bounds.y_min], [bounds.x_max, bounds.y_max])
}

pub fn validate_min_ioa(min_ioa: f32) -> Result<(), ConfigError> {
    if min_ioa.is_nan() || !(0.0..=1.0).contains(&min_ioa) {
        return Err(ConfigError::MinIoaOutOfRange(min_ioa));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapDeduplicator {
    min_ioa: f32,
}

impl OverlapDeduplicator {
    pub fn new(min_ioa: f32) -> Result<Self, ConfigError> {
        validate_min_ioa(min_ioa)?;
        Ok(Self { min_ioa })
    }

    pub fn deduplicate(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let total = detections.len();
        if total < 2 {
            return detections;
        }

        let tree = RTree::bulk_load(
            detections
                .iter()
                .enumerate()
                .map(|(index, detection)| DetectionEnvelope {
                    index,
                    aabb: envelope_of(detection),
                })
                .collect(),
        );

        let mut clusters = UnionFind::new(total);
        let mut compared = 0usize;
        for (i, detection) in detections.iter().enumerate() {
            for neighbour in tree.locate_in_envelope_intersecting(&envelope_of(detection)) {
                let j = neighbour.index;
                if j <= i {
                    continue;
                }
                compared += 1;

                let (shared, ioa) = detection.geometry.overlap(&detections[j].geometry);
                if shared > 0.0 && ioa >= self.min_ioa {
                    clusters.union(i, j);
                }
            }
        }

        let mut best: Vec<Option<usize>> = vec![None; total];
        for i in 0..total {
            let root = clusters.find(i);
            match best[root] {
                Some(current) if !outranks(&detections[i], i, &detections[current], current) => {}
                _ => best[root] = Some(i),
            }
        }

        let mut keep = vec![false; total];
        for index in best.into_iter().flatten() {
            keep[index] = true;
        }

        let survivors: Vec<Detection> = detections
            .into_iter()
            .zip(keep)
            .filter_map(|(detection, kept)| kept.then_some(detection))
            .collect();

        debug!(
            total,
            compared,
            kept = survivors.len(),
            min_ioa = self.min_ioa,
            "deduplicated overlapping detections"
        );
        survivors
    }
}

/// Whether `a` (at first-seen position `ai`) should represent a cluster over `b`.
fn outranks(a: &Detection, ai: usize, b: &Detection, bi: usize) -> bool {
    match a.confidence.total_cmp(&b.confidence) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match a.area().total_cmp(&b.area()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => ai < bi,
        },
    }
}

/// Deduplicate `detections` with the given intersection-over-area threshold.
pub fn deduplicate(detections: Vec<Detection>, min_ioa: f32) -> Result<Vec<Detection>, ConfigError> {
    Ok(OverlapDeduplicator::new(min_ioa)?.deduplicate(detections))
}
