use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Periodic boundary conditions, per axis.
///
/// Axes that are not mentioned, or mentioned with `None`, are non-periodic.
/// Periodicity is single-range: data on a periodic axis must already lie
/// within `[low, high]`, nothing is folded into range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodicSpec {
    axes: BTreeMap<usize, Option<(f64, f64)>>,
}

impl PeriodicSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `axis` periodic on the domain `[low, high]`.
    pub fn axis(mut self, axis: usize, low: f64, high: f64) -> Self {
        self.axes.insert(axis, Some((low, high)));
        self
    }

    /// Explicitly marks `axis` as non-periodic.
    pub fn open(mut self, axis: usize) -> Self {
        self.axes.insert(axis, None);
        self
    }

    /// The domain of `axis`, if it is periodic.
    pub fn range(&self, axis: usize) -> Option<(f64, f64)> {
        self.axes.get(&axis).copied().flatten()
    }

    /// Iterates over the periodic axes and their domains.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, (f64, f64))> + '_ {
        self.axes.iter().filter_map(|(&axis, range)| range.map(|r| (axis, r)))
    }

    /// All configured axes, periodic or not.
    pub fn axes(&self) -> impl Iterator<Item = usize> + '_ {
        self.axes.keys().copied()
    }

    /// True if at least one axis is periodic.
    pub fn is_periodic(&self) -> bool {
        self.ranges().next().is_some()
    }
}

/// A query centre translated into a neighboring periodic copy of the domain.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorCentre {
    /// Coordinates of the translated centre.
    pub centre: Vec<f64>,
    /// Index of the query centre it was derived from.
    pub origin: usize,
}

/// Generates mirrored query centres for periodic domains.
///
/// Built from a [`PeriodicSpec`] with at least one periodic axis. The edge
/// vectors are every combination of `{-L, 0, +L}` over the periodic axes
/// (with `L = high - low`), minus the all-zero vector. Non-periodic axes
/// always contribute `0` and are unbounded.
#[derive(Clone, Debug)]
pub struct PeriodicMirror {
    dim: usize,
    low: Vec<f64>,
    high: Vec<f64>,
    edges: Vec<Vec<f64>>,
}

impl PeriodicMirror {
    /// Derives the mirror edges from `spec`, or `None` when no axis is periodic.
    pub fn new(spec: &PeriodicSpec, dim: usize) -> Option<Self> {
        if !spec.is_periodic() {
            return None;
        }

        let mut low = vec![f64::NEG_INFINITY; dim];
        let mut high = vec![f64::INFINITY; dim];
        let mut periodic_axes = Vec::new();
        for (axis, (lo, hi)) in spec.ranges() {
            low[axis] = lo;
            high[axis] = hi;
            periodic_axes.push((axis, hi - lo));
        }

        // Odometer over {-L, 0, +L} per periodic axis. Periods are strictly
        // positive so every combination is distinct.
        let combinations = 3usize.pow(periodic_axes.len() as u32);
        let mut edges = Vec::with_capacity(combinations - 1);
        for combo in 0..combinations {
            let mut edge = vec![0.0; dim];
            let mut rem = combo;
            for &(axis, period) in &periodic_axes {
                edge[axis] = match rem % 3 {
                    0 => -period,
                    1 => 0.0,
                    _ => period,
                };
                rem /= 3;
            }
            if edge.iter().any(|&e| e != 0.0) {
                edges.push(edge);
            }
        }
        edges.sort_by(|a, b| {
            a.iter()
                .zip(b)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Some(PeriodicMirror {
            dim,
            low,
            high,
            edges,
        })
    }

    /// The translation vectors, one per neighboring periodic copy.
    pub fn edges(&self) -> &[Vec<f64>] {
        &self.edges
    }

    /// For each centre, whether its search radius crosses any periodic domain edge.
    pub fn near_boundary(&self, centres: &[f64], upper: &[f64]) -> Vec<bool> {
        centres
            .chunks_exact(self.dim)
            .zip(upper)
            .map(|(centre, &radius)| {
                (0..self.dim).any(|k| {
                    self.low[k].is_finite()
                        && ((centre[k] - self.low[k]).abs() < radius
                            || (centre[k] - self.high[k]).abs() < radius)
                })
            })
            .collect()
    }

    /// Translated copies of `centre` whose search sphere can reach back into the domain.
    ///
    /// A copy is kept when, on every axis, `[translated - upper, translated + upper]`
    /// overlaps `[low, high]`. Non-periodic axes are unbounded. The test holds for
    /// any `upper`, including radii wider than a period.
    pub fn mirror(&self, centre: &[f64], upper: f64) -> Vec<Vec<f64>> {
        self.edges
            .iter()
            .filter_map(|edge| {
                let translated: Vec<f64> = centre.iter().zip(edge).map(|(c, e)| c - e).collect();
                let reaches = (0..self.dim).all(|k| {
                    translated[k] - upper <= self.high[k] && translated[k] + upper >= self.low[k]
                });
                reaches.then_some(translated)
            })
            .collect()
    }

    /// Mirrors every centre near a boundary, remembering which centre each mirror came from.
    pub fn mirror_universe(&self, centres: &[f64], upper: &[f64]) -> Vec<MirrorCentre> {
        let near = self.near_boundary(centres, upper);
        let mut mirrored = Vec::new();
        for (origin, centre) in centres.chunks_exact(self.dim).enumerate() {
            if !near[origin] {
                continue;
            }
            mirrored.extend(
                self.mirror(centre, upper[origin])
                    .into_iter()
                    .map(|centre| MirrorCentre { centre, origin }),
            );
        }
        mirrored
    }
}
