use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::grid::Grid;
use crate::metric::DistanceMetric;
use crate::periodic::PeriodicMirror;

/// Neighbors found for one query centre: parallel distance and point index lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighbors {
    /// Distance from the query centre to each point.
    pub distances: Vec<f64>,
    /// Index of each point in the indexed data.
    pub indices: Vec<usize>,
}

impl Neighbors {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over `(distance, index)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.distances.iter().copied().zip(self.indices.iter().copied())
    }

    /// Appends all pairs of `other`.
    pub fn extend(&mut self, other: Neighbors) {
        self.distances.extend(other.distances);
        self.indices.extend(other.indices);
    }

    /// Keeps the pairs whose distance satisfies `keep`.
    pub fn retain_distances<F>(&mut self, mut keep: F)
    where
        F: FnMut(f64) -> bool,
    {
        let mut w = 0;
        for r in 0..self.indices.len() {
            if keep(self.distances[r]) {
                self.distances[w] = self.distances[r];
                self.indices[w] = self.indices[r];
                w += 1;
            }
        }
        self.distances.truncate(w);
        self.indices.truncate(w);
    }

    /// Keeps the pairs whose point index satisfies `keep`.
    pub fn retain_indices<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let mut w = 0;
        for r in 0..self.indices.len() {
            if keep(self.indices[r]) {
                self.distances[w] = self.distances[r];
                self.indices[w] = self.indices[r];
                w += 1;
            }
        }
        self.distances.truncate(w);
        self.indices.truncate(w);
    }

    /// Orders the pairs by ascending distance, resolving ties with `tie`.
    pub fn sort(&mut self, tie: TieBreak) {
        let d = &self.distances;
        let idx = &self.indices;
        let mut order: Vec<usize> = (0..d.len()).collect();
        match tie {
            TieBreak::Stable => order.sort_by(|&a, &b| d[a].total_cmp(&d[b])),
            TieBreak::Unstable => order.sort_unstable_by(|&a, &b| d[a].total_cmp(&d[b])),
            TieBreak::Index => order.sort_unstable_by(|&a, &b| {
                d[a].total_cmp(&d[b]).then(idx[a].cmp(&idx[b]))
            }),
        }
        self.distances = order.iter().map(|&i| d[i]).collect();
        self.indices = order.iter().map(|&i| idx[i]).collect();
    }

    /// Keeps one pair per point index: the one with the smallest distance.
    ///
    /// Each surviving index stays at the position where it first appeared.
    pub fn dedup_min(&mut self) {
        let mut first: HashMap<usize, usize> = HashMap::with_capacity(self.indices.len());
        let mut w = 0;
        for r in 0..self.indices.len() {
            let (d, i) = (self.distances[r], self.indices[r]);
            match first.entry(i) {
                Entry::Occupied(slot) => {
                    let at = *slot.get();
                    if d < self.distances[at] {
                        self.distances[at] = d;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(w);
                    self.distances[w] = d;
                    self.indices[w] = i;
                    w += 1;
                }
            }
        }
        self.distances.truncate(w);
        self.indices.truncate(w);
    }

    /// Keeps only the first `n` pairs.
    pub fn truncate(&mut self, n: usize) {
        self.distances.truncate(n);
        self.indices.truncate(n);
    }
}

/// How points at equal distance are ordered when results are sorted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Equal distances keep the order in which candidates were gathered.
    #[default]
    Stable,
    /// Pattern-defeating quicksort; deterministic for identical input.
    Unstable,
    /// Equal distances are ordered by ascending point index.
    Index,
}

/// A distance bound shared by all centres or given per centre.
#[derive(Clone, Copy, Debug)]
pub enum Radius<'a> {
    Uniform(f64),
    PerCentre(&'a [f64]),
}

impl From<f64> for Radius<'_> {
    fn from(r: f64) -> Self {
        Radius::Uniform(r)
    }
}

impl<'a> From<&'a [f64]> for Radius<'a> {
    fn from(r: &'a [f64]) -> Self {
        Radius::PerCentre(r)
    }
}

impl<'a> From<&'a Vec<f64>> for Radius<'a> {
    fn from(r: &'a Vec<f64>) -> Self {
        Radius::PerCentre(r)
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for Radius<'a> {
    fn from(r: &'a [f64; N]) -> Self {
        Radius::PerCentre(r)
    }
}

impl Radius<'_> {
    /// One bound per centre.
    pub fn expand(&self, count: usize) -> Vec<f64> {
        match *self {
            Radius::Uniform(r) => vec![r; count],
            Radius::PerCentre(r) => r.to_vec(),
        }
    }
}

/// Search state of one centre during a nearest-neighbor query.
#[derive(Debug)]
struct NearestSearch {
    found: bool,
    lower: f64,
    upper: f64,
    neighbors: Neighbors,
    taken: HashSet<usize>,
}

/// Runs bubble, shell and nearest-neighbor queries over a built grid.
///
/// Inputs are expected to be validated. Every query goes: candidate cells,
/// then candidate points with exact distances, then (for periodic domains)
/// the same pipeline over mirrored centres merged into their origin, then
/// filtering and ordering.
pub struct QueryEngine<'a> {
    /// The indexed points, flat.
    pub points: &'a [f64],
    /// Grid built over `points`.
    pub grid: &'a Grid,
    /// How distances are measured.
    pub metric: &'a dyn DistanceMetric,
    /// Mirror generator, present when some axis is periodic.
    pub mirror: Option<&'a PeriodicMirror>,
}

impl QueryEngine<'_> {
    /// All points with `distance <= upper` of each centre.
    pub fn bubble(&self, centres: &[f64], upper: &[f64], sort: Option<TieBreak>) -> Vec<Neighbors> {
        let mut found = self.gather(centres, upper, upper, false);
        for (neighbors, &u) in found.iter_mut().zip(upper) {
            neighbors.retain_distances(|d| d <= u);
            if let Some(tie) = sort {
                neighbors.sort(tie);
            }
        }
        found
    }

    /// All points with `lower < distance <= upper` of each centre.
    pub fn shell(
        &self,
        centres: &[f64],
        lower: &[f64],
        upper: &[f64],
        sort: Option<TieBreak>,
    ) -> Vec<Neighbors> {
        let mut found = self.gather(centres, upper, lower, true);
        for ((neighbors, &l), &u) in found.iter_mut().zip(lower).zip(upper) {
            neighbors.retain_distances(|d| l < d && d <= u);
            if let Some(tie) = sort {
                neighbors.sort(tie);
            }
        }
        found
    }

    /// The `n` nearest points of each centre, ascending by distance.
    ///
    /// Expanding-shell search: the first radius is guessed from the point
    /// density of the centre's home cell, then each centre still short of `n`
    /// points searches the next shell, one cell layer wider, until it has them.
    pub fn nearest(&self, centres: &[f64], n: usize, tie: TieBreak) -> Vec<Neighbors> {
        let dim = self.grid.dim;
        let count = centres.len() / dim;
        let cell_volume = self.grid.cell_volume();
        let step = self.grid.search_step();

        // Home cell population sets the initial radius guess.
        let zero = vec![0.0; count];
        let cells = self.grid.locate(centres, &zero, &zero, false, self.metric);
        let mut states: Vec<NearestSearch> = cells
            .iter()
            .map(|keys| {
                let local: usize = keys.iter().map(|&k| self.grid.points_in(k).len()).sum();
                let density = local.max(1) as f64 / cell_volume;
                NearestSearch {
                    found: false,
                    // The first shell is closed below so coincident points count.
                    lower: f64::NEG_INFINITY,
                    upper: 0.5 * (n as f64 / density).powf(1.0 / dim as f64),
                    neighbors: Neighbors::default(),
                    taken: HashSet::new(),
                }
            })
            .collect();

        let mut searching: Vec<usize> = (0..count).collect();
        let mut round = 0;
        while !searching.is_empty() {
            round += 1;
            trace!(round, searching = searching.len(), "nearest neighbor shell");

            let mut sub_centres = Vec::with_capacity(searching.len() * dim);
            for &i in &searching {
                sub_centres.extend_from_slice(&centres[i * dim..(i + 1) * dim]);
            }
            let lower: Vec<f64> = searching.iter().map(|&i| states[i].lower).collect();
            let upper: Vec<f64> = searching.iter().map(|&i| states[i].upper).collect();

            let shells = self.shell(&sub_centres, &lower, &upper, Some(tie));

            let mut still_searching = Vec::new();
            for (mut shell, &i) in shells.into_iter().zip(&searching) {
                let state = &mut states[i];
                shell.retain_indices(|j| !state.taken.contains(&j));
                let have = state.neighbors.len();
                if have + shell.len() >= n {
                    shell.truncate(n - have);
                    state.found = true;
                } else {
                    state.lower = state.upper;
                    state.upper += step;
                    still_searching.push(i);
                }
                state.taken.extend(shell.indices.iter().copied());
                state.neighbors.extend(shell);
            }
            searching = still_searching;
        }

        debug_assert!(states.iter().all(|s| s.found));
        states.into_iter().map(|s| s.neighbors).collect()
    }

    /// Candidate distances for each centre, with mirrored candidates merged in.
    ///
    /// On periodic domains a point can be reached through several images; only
    /// its nearest image is kept. The inner shell prune is skipped there, since
    /// a nearer image inside `lower` must still be seen to shadow a farther one.
    fn gather(&self, centres: &[f64], upper: &[f64], lower: &[f64], shell: bool) -> Vec<Neighbors> {
        let shell = shell && self.mirror.is_none();
        let cells = self.grid.locate(centres, upper, lower, shell, self.metric);
        let mut found = self.grid.candidates(self.points, centres, &cells, self.metric);

        if let Some(mirror) = self.mirror {
            let mirrored = mirror.mirror_universe(centres, upper);
            if !mirrored.is_empty() {
                let mut mirror_centres = Vec::with_capacity(mirrored.len() * self.grid.dim);
                let mut mirror_upper = Vec::with_capacity(mirrored.len());
                for m in &mirrored {
                    mirror_centres.extend_from_slice(&m.centre);
                    mirror_upper.push(upper[m.origin]);
                }
                let mirror_cells =
                    self.grid.locate(&mirror_centres, &mirror_upper, &mirror_upper, false, self.metric);
                let mirror_found =
                    self.grid.candidates(self.points, &mirror_centres, &mirror_cells, self.metric);
                let mut touched = vec![false; found.len()];
                for (m, neighbors) in mirrored.iter().zip(mirror_found) {
                    found[m.origin].extend(neighbors);
                    touched[m.origin] = true;
                }
                for (neighbors, _) in found.iter_mut().zip(touched).filter(|(_, t)| *t) {
                    neighbors.dedup_min();
                }
            }
        }
        found
    }
}
