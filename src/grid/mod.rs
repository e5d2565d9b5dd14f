use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

pub mod digitize;
mod locate;

use digitize::{bin_edges, digitize_clamped};

/// Packed cell multi-index.
///
/// Axis 0 varies fastest: `key = i_0 + i_1 * N + i_2 * N^2 + ...`.
pub type CellKey = u64;

/// A uniform grid over a fixed point set.
///
/// Every axis is split into `n_cells` equal bins spanning the data range
/// (padded by a small epsilon). Only occupied cells are stored: each point
/// index appears in exactly one cell, and a cell without points has no entry.
#[derive(Clone, Debug)]
pub struct Grid {
    /// Number of cells along each axis.
    pub n_cells: usize,
    /// Dimension of the indexed points.
    pub dim: usize,
    /// `n_cells + 1` bin edges per axis.
    pub bin_edges: Vec<Vec<f64>>,
    /// Side length of a cell along each axis.
    pub cell_size: Vec<f64>,
    /// Half the cell diagonal: no point in a cell is further than this from its centre.
    pub cell_radius: f64,
    /// Padding of the bin edges beyond the data range.
    pub epsilon: f64,
    /// Occupied cells and the point indices they hold.
    pub cells: HashMap<CellKey, Vec<usize>>,
}

/// How the occupied cells were collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildRegime {
    /// More points than cells: sort by cell key and split the sorted run.
    Dense,
    /// At least as many cells as points: insert point by point.
    Sparse,
}

impl Grid {
    /// Builds the grid over `points` (flat, `dim` coordinates per point).
    ///
    /// Inputs are expected to be validated: non-empty, finite, and `n_cells^dim`
    /// addressable by a [`CellKey`].
    pub fn build(points: &[f64], dim: usize, n_cells: usize, epsilon: f64) -> Self {
        let bin_edges: Vec<Vec<f64>> = (0..dim)
            .map(|k| bin_edges(points.iter().skip(k).step_by(dim).copied(), n_cells, epsilon))
            .collect();

        let mut grid = Grid::from_parts(n_cells, dim, epsilon, bin_edges, HashMap::new());

        let count = points.len() / dim;
        let keys: Vec<CellKey> = points
            .par_chunks_exact(dim)
            .map(|p| grid.key_of(p))
            .collect();

        let regime = grid.regime(count);
        grid.cells = match regime {
            BuildRegime::Dense => collect_dense(&keys),
            BuildRegime::Sparse => collect_sparse(&keys),
        };

        debug!(
            points = count,
            dim,
            n_cells,
            ?regime,
            occupied = grid.cells.len(),
            "built grid"
        );
        grid
    }

    /// Assembles a grid from precomputed edges and cells.
    pub fn from_parts(
        n_cells: usize,
        dim: usize,
        epsilon: f64,
        bin_edges: Vec<Vec<f64>>,
        cells: HashMap<CellKey, Vec<usize>>,
    ) -> Self {
        let cell_size: Vec<f64> = bin_edges.iter().map(|e| e[1] - e[0]).collect();
        let cell_radius = 0.5 * cell_size.iter().map(|s| s * s).sum::<f64>().sqrt();
        Grid {
            n_cells,
            dim,
            bin_edges,
            cell_size,
            cell_radius,
            epsilon,
            cells,
        }
    }

    /// Which construction strategy applies to `count` points.
    pub fn regime(&self, count: usize) -> BuildRegime {
        match (self.n_cells as u64).checked_pow(self.dim as u32) {
            Some(total) if total < count as u64 => BuildRegime::Dense,
            _ => BuildRegime::Sparse,
        }
    }

    /// Packs a per-axis cell multi-index into a [`CellKey`].
    #[inline]
    pub fn encode(&self, cell: &[usize]) -> CellKey {
        let n = self.n_cells as u64;
        cell.iter().rev().fold(0, |key, &i| key * n + i as u64)
    }

    /// Unpacks a [`CellKey`] into its per-axis cell multi-index.
    pub fn decode(&self, key: CellKey) -> Vec<usize> {
        let n = self.n_cells as u64;
        let mut rem = key;
        (0..self.dim)
            .map(|_| {
                let i = rem % n;
                rem /= n;
                i as usize
            })
            .collect()
    }

    /// Key of the cell containing `point`.
    #[inline]
    pub fn key_of(&self, point: &[f64]) -> CellKey {
        let n = self.n_cells as u64;
        point
            .iter()
            .zip(&self.bin_edges)
            .rev()
            .fold(0, |key, (&v, edges)| key * n + digitize_clamped(v, edges) as u64)
    }

    /// Point indices in the cell `key`, empty if the cell is unoccupied.
    pub fn points_in(&self, key: CellKey) -> &[usize] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Product of the cell side lengths.
    pub fn cell_volume(&self) -> f64 {
        self.cell_size.iter().product()
    }

    /// Smallest cell side length.
    pub fn min_cell_size(&self) -> f64 {
        self.cell_size.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Radius increment of one nearest-neighbor search round.
    ///
    /// The smallest cell side among axes the data spans. An axis where all
    /// points share one coordinate is only `2 * epsilon` wide and is skipped,
    /// unless every axis is like that.
    pub fn search_step(&self) -> f64 {
        self.bin_edges
            .iter()
            .zip(&self.cell_size)
            .filter(|(edges, _)| edges[self.n_cells] - edges[0] - 2.0 * self.epsilon > self.epsilon)
            .map(|(_, &size)| size)
            .min_by(f64::total_cmp)
            .unwrap_or_else(|| self.min_cell_size())
    }

    /// Centre of the cell with multi-index `cell`, in real coordinates.
    pub fn cell_centre(&self, cell: &[usize]) -> Vec<f64> {
        cell.iter()
            .zip(&self.bin_edges)
            .zip(&self.cell_size)
            .map(|((&i, edges), size)| edges[i] + 0.5 * size)
            .collect()
    }
}

/// Dense regime: sort point indices by key, then cut the sorted run at every key change.
fn collect_dense(keys: &[CellKey]) -> HashMap<CellKey, Vec<usize>> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    // Stable sort keeps point indices ascending within a cell, as the sparse path does.
    order.par_sort_by_key(|&i| keys[i]);
    let sorted: Vec<CellKey> = order.iter().map(|&i| keys[i]).collect();

    let mut cells = HashMap::new();
    let mut start = 0;
    while start < sorted.len() {
        let key = sorted[start];
        let end = start + sorted[start..].partition_point(|&k| k <= key);
        cells.insert(key, order[start..end].to_vec());
        start = end;
    }
    cells
}

/// Sparse regime: append each point to its cell, creating the cell on first use.
fn collect_sparse(keys: &[CellKey]) -> HashMap<CellKey, Vec<usize>> {
    let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
    for (i, &key) in keys.iter().enumerate() {
        cells.entry(key).or_default().push(i);
    }
    cells
}
