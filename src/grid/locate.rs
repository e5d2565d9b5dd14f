use super::digitize::digitize;
use super::{CellKey, Grid};
use crate::metric::DistanceMetric;
use crate::query::Neighbors;

impl Grid {
    /// Candidate cells for each centre.
    ///
    /// A cell is kept when its centre lies closer than `upper + cell_radius` to
    /// the query centre (and, with `shell`, further than `lower - cell_radius`).
    /// The test never rejects a cell that could hold a point inside the bounds;
    /// it may keep cells that turn out to hold none.
    pub fn locate(
        &self,
        centres: &[f64],
        upper: &[f64],
        lower: &[f64],
        shell: bool,
        metric: &dyn DistanceMetric,
    ) -> Vec<Vec<CellKey>> {
        centres
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, centre)| {
                let lower = if shell { lower[i] } else { 0.0 };
                self.locate_one(centre, upper[i], lower, shell, metric)
            })
            .collect()
    }

    fn locate_one(
        &self,
        centre: &[f64],
        upper: f64,
        lower: f64,
        shell: bool,
        metric: &dyn DistanceMetric,
    ) -> Vec<CellKey> {
        let max = self.n_cells as i64 - 1;
        let mut min_idx = Vec::with_capacity(self.dim);
        let mut max_idx = Vec::with_capacity(self.dim);

        for (k, edges) in self.bin_edges.iter().enumerate() {
            let c = centre[k];
            // out of field: the search sphere misses the grid on this axis
            if c - upper > edges[self.n_cells] || c + upper < edges[0] {
                return Vec::new();
            }
            min_idx.push(digitize(c - upper, edges).clamp(0, max) as usize);
            max_idx.push(digitize(c + upper, edges).clamp(0, max) as usize);
        }

        // Bounding box of cells, axis 0 fastest.
        let mut cell = min_idx.clone();
        let mut keys = Vec::new();
        let mut cell_centres = Vec::new();
        'odometer: loop {
            keys.push(self.encode(&cell));
            cell_centres.extend(self.cell_centre(&cell));

            for k in 0..self.dim {
                if cell[k] < max_idx[k] {
                    cell[k] += 1;
                    continue 'odometer;
                }
                cell[k] = min_idx[k];
            }
            break;
        }

        let distances = metric.distance(centre, &cell_centres, self.dim);
        let outer = upper + self.cell_radius;
        let inner = lower - self.cell_radius;
        keys.into_iter()
            .zip(distances)
            .filter(|&(_, d)| d < outer && (!shell || d > inner))
            .map(|(key, _)| key)
            .collect()
    }

    /// Gathers the points of each centre's candidate cells and measures their distances.
    ///
    /// Unoccupied cells contribute nothing; a centre without candidate cells
    /// gets an empty result.
    pub fn candidates(
        &self,
        points: &[f64],
        centres: &[f64],
        cells: &[Vec<CellKey>],
        metric: &dyn DistanceMetric,
    ) -> Vec<Neighbors> {
        centres
            .chunks_exact(self.dim)
            .zip(cells)
            .map(|(centre, keys)| {
                let indices: Vec<usize> = keys
                    .iter()
                    .flat_map(|&key| self.points_in(key).iter().copied())
                    .collect();
                if indices.is_empty() {
                    return Neighbors::default();
                }

                let mut coords = Vec::with_capacity(indices.len() * self.dim);
                for &j in &indices {
                    coords.extend_from_slice(&points[j * self.dim..(j + 1) * self.dim]);
                }
                let distances = metric.distance(centre, &coords, self.dim);
                Neighbors { distances, indices }
            })
            .collect()
    }
}
