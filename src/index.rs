use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GridConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::metric::{DistanceMetric, Metric};
use crate::periodic::{PeriodicMirror, PeriodicSpec};
use crate::query::{Neighbors, QueryEngine, Radius, TieBreak};
use crate::validate;

/// When and how fast the grid was built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Wall time spent binning the points.
    pub build_time: Duration,
    /// Moment the build finished.
    pub built_at: DateTime<Utc>,
}

/// A grid index over a fixed set of points.
///
/// The point set and the grid are immutable once built. Only the periodic
/// boundary conditions can be changed afterwards, see [`GridIndex::set_periodicity`].
/// Queries take centres as a flat buffer of `dim` coordinates per centre and
/// return one [`Neighbors`] per centre, in centre order.
///
/// # Example
///
/// ```
/// use gridsearch::{GridConfig, GridIndex, TieBreak};
///
/// let points = vec![0.0, 0.0, 1.0, 0.0, 0.0, 3.0];
/// let index = GridIndex::new(points, 2, GridConfig::new().n_cells(4)).unwrap();
/// let found = index.bubble_neighbors(&[0.0, 0.0], 1.5, Some(TieBreak::Stable)).unwrap();
/// assert_eq!(found[0].indices, vec![0, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct GridIndex {
    pub(crate) data: Vec<f64>,
    pub(crate) dim: usize,
    pub(crate) epsilon: f64,
    pub(crate) metric: Metric,
    pub(crate) periodic: PeriodicSpec,
    pub(crate) mirror: Option<PeriodicMirror>,
    pub(crate) grid: Grid,
    pub(crate) stats: BuildStats,
}

impl GridIndex {
    /// Validates `data` (flat, `dim` coordinates per point) and bins it into a grid.
    pub fn new(data: Vec<f64>, dim: usize, config: GridConfig) -> Result<Self> {
        validate::data(&data, dim)?;
        validate::grid(config.n_cells, config.epsilon, dim)?;
        validate::periodicity(&config.periodic, &data, dim)?;

        let start = Instant::now();
        let grid = Grid::build(&data, dim, config.n_cells, config.epsilon);
        let stats = BuildStats {
            build_time: start.elapsed(),
            built_at: Utc::now(),
        };
        debug!(
            build_time_us = stats.build_time.as_micros() as u64,
            metric = config.metric.name(),
            "grid index ready"
        );

        let mirror = PeriodicMirror::new(&config.periodic, dim);
        Ok(Self {
            data,
            dim,
            epsilon: config.epsilon,
            metric: config.metric,
            periodic: config.periodic,
            mirror,
            grid,
            stats,
        })
    }

    /// Replaces the periodic boundary conditions.
    ///
    /// The grid is left untouched. On error the previous conditions stay in effect.
    pub fn set_periodicity(&mut self, periodic: PeriodicSpec) -> Result<()> {
        validate::periodicity(&periodic, &self.data, self.dim)?;
        let mirror = PeriodicMirror::new(&periodic, self.dim);
        debug!(
            periodic_axes = periodic.ranges().count(),
            edges = mirror.as_ref().map_or(0, |m| m.edges().len()),
            "periodicity updated"
        );
        self.periodic = periodic;
        self.mirror = mirror;
        Ok(())
    }

    /// Points within `upper` of each centre (`distance <= upper`).
    ///
    /// With `sort`, each result is ordered by ascending distance; otherwise the
    /// order follows the candidate cells and is unspecified.
    pub fn bubble_neighbors<'r>(
        &self,
        centres: &[f64],
        upper: impl Into<Radius<'r>>,
        sort: Option<TieBreak>,
    ) -> Result<Vec<Neighbors>> {
        let count = validate::centres(centres, self.dim)?;
        let upper = upper.into().expand(count);
        validate::bounds(&upper, count, &self.periodic)?;
        Ok(self.engine().bubble(centres, &upper, sort))
    }

    /// Points in the shell `lower < distance <= upper` of each centre.
    pub fn shell_neighbors<'r>(
        &self,
        centres: &[f64],
        lower: impl Into<Radius<'r>>,
        upper: impl Into<Radius<'r>>,
        sort: Option<TieBreak>,
    ) -> Result<Vec<Neighbors>> {
        let count = validate::centres(centres, self.dim)?;
        let lower = lower.into().expand(count);
        let upper = upper.into().expand(count);
        validate::bounds(&lower, count, &self.periodic)?;
        validate::bounds(&upper, count, &self.periodic)?;
        validate::shell(&lower, &upper)?;
        Ok(self.engine().shell(centres, &lower, &upper, sort))
    }

    /// The `n` nearest points of each centre, ordered by ascending distance.
    pub fn nearest_neighbors(&self, centres: &[f64], n: usize, tie: TieBreak) -> Result<Vec<Neighbors>> {
        validate::centres(centres, self.dim)?;
        validate::n_nearest(n, self.len())?;
        Ok(self.engine().nearest(centres, n, tie))
    }

    fn engine(&self) -> QueryEngine<'_> {
        QueryEngine {
            points: &self.data,
            grid: &self.grid,
            metric: &self.metric,
            mirror: self.mirror.as_ref(),
        }
    }

    /// The indexed points, flat.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Always false: an index holds at least one point.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn n_cells(&self) -> usize {
        self.grid.n_cells
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    pub fn periodic(&self) -> &PeriodicSpec {
        &self.periodic
    }

    /// True if at least one axis is periodic.
    pub fn is_periodic(&self) -> bool {
        self.mirror.is_some()
    }

    /// Mirror generator for the current periodic conditions, if any.
    pub fn mirror(&self) -> Option<&PeriodicMirror> {
        self.mirror.as_ref()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;

    fn line() -> GridIndex {
        let data: Vec<f64> = (0..10).map(|i| i as f64).collect();
        GridIndex::new(data, 1, GridConfig::new().n_cells(3)).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(matches!(GridIndex::new(vec![], 2, GridConfig::new()), Err(GridError::EmptyData)));
        assert!(matches!(
            GridIndex::new(vec![1.0, 2.0], 2, GridConfig::new().n_cells(0)),
            Err(GridError::InvalidCellCount(0))
        ));
        let index = line();
        assert_eq!(index.len(), 10);
        assert_eq!(index.n_cells(), 3);
        assert!(!index.is_periodic());
    }

    #[test]
    fn test_queries_on_a_line() {
        let index = line();
        let found = index.bubble_neighbors(&[4.2], 1.0, Some(TieBreak::Stable)).unwrap();
        assert_eq!(found[0].indices, vec![4, 5]);

        let found = index.shell_neighbors(&[4.0], 1.0, 2.0, Some(TieBreak::Index)).unwrap();
        assert_eq!(found[0].indices, vec![2, 6]);

        let found = index.nearest_neighbors(&[7.1], 3, TieBreak::Stable).unwrap();
        assert_eq!(found[0].indices, vec![7, 8, 6]);
    }

    #[test]
    fn test_per_centre_bounds() {
        let index = line();
        let radii = [0.0, 2.0];
        let found = index.bubble_neighbors(&[0.0, 9.0], &radii, Some(TieBreak::Stable)).unwrap();
        assert_eq!(found[0].indices, vec![0]);
        assert_eq!(found[1].indices, vec![9, 8, 7]);

        assert!(matches!(
            index.bubble_neighbors(&[0.0, 9.0], &[1.0], None),
            Err(GridError::BoundCountMismatch { centres: 2, bounds: 1 })
        ));
    }

    #[test]
    fn test_set_periodicity_keeps_old_on_error() {
        let mut index = line();
        assert!(index.set_periodicity(PeriodicSpec::new().axis(0, 0.0, 5.0)).is_err());
        assert!(!index.is_periodic());

        index.set_periodicity(PeriodicSpec::new().axis(0, 0.0, 10.0)).unwrap();
        assert!(index.is_periodic());
        let found = index.bubble_neighbors(&[0.5], 1.0, Some(TieBreak::Stable)).unwrap();
        // 9.0 sits 1.5 away across the boundary, out of reach; 0 and 1 are in.
        assert_eq!(found[0].indices, vec![0, 1]);
        let found = index.bubble_neighbors(&[0.2], 1.5, Some(TieBreak::Stable)).unwrap();
        assert_eq!(found[0].indices, vec![0, 1, 9]);

        index.set_periodicity(PeriodicSpec::new()).unwrap();
        assert!(!index.is_periodic());
    }
}
