//! JSON snapshots of a [`GridIndex`].
//!
//! A snapshot holds everything needed to answer queries without rebinning:
//! the points, the bin edges and the occupied cells. Periodic mirror edges are
//! derived state and are recomputed on load.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::grid::Grid;
use crate::index::{BuildStats, GridIndex};
use crate::metric::{DistanceMetric, Metric};
use crate::periodic::{PeriodicMirror, PeriodicSpec};
use crate::validate;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dim: usize,
    n_cells: usize,
    epsilon: f64,
    metric: String,
    periodic: PeriodicSpec,
    is_periodic: bool,
    data: Vec<f64>,
    bin_edges: Vec<Vec<f64>>,
    grid: Vec<SnapshotCell>,
    stats: BuildStats,
}

#[derive(Serialize, Deserialize)]
struct SnapshotCell {
    cell: Vec<usize>,
    points: Vec<usize>,
}

impl GridIndex {
    /// Writes the index to `path` as JSON.
    ///
    /// Fails with [`GridError::AlreadyExists`] if the file exists and `overwrite` is false.
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        let path = path.as_ref();

        let mut keys: Vec<_> = self.grid.cells.keys().copied().collect();
        keys.sort_unstable();
        let grid = keys
            .into_iter()
            .map(|key| SnapshotCell {
                cell: self.grid.decode(key),
                points: self.grid.points_in(key).to_vec(),
            })
            .collect();

        let snapshot = Snapshot {
            dim: self.dim,
            n_cells: self.grid.n_cells,
            epsilon: self.epsilon,
            metric: self.metric.name().to_string(),
            periodic: self.periodic.clone(),
            is_periodic: self.is_periodic(),
            data: self.data.clone(),
            bin_edges: self.grid.bin_edges.clone(),
            grid,
            stats: self.stats.clone(),
        };

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .create_new(!overwrite)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => GridError::AlreadyExists(path.to_path_buf()),
                _ => GridError::Io(e),
            })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;

        debug!(path = %path.display(), cells = snapshot.grid.len(), "saved grid index");
        Ok(())
    }

    /// Reads an index saved with [`GridIndex::save`].
    ///
    /// The metric is resolved by name, so only built-in metrics can be restored
    /// this way; use [`GridIndex::load_with_metric`] for custom ones.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = read_snapshot(path.as_ref())?;
        let metric = Metric::from_name(&snapshot.metric)?;
        restore(snapshot, metric, path.as_ref())
    }

    /// Reads an index saved with [`GridIndex::save`], measuring distances with `metric`.
    pub fn load_with_metric(path: impl AsRef<Path>, metric: Metric) -> Result<Self> {
        let snapshot = read_snapshot(path.as_ref())?;
        if snapshot.metric != metric.name() {
            debug!(saved = %snapshot.metric, using = metric.name(), "metric replaced on load");
        }
        restore(snapshot, metric, path.as_ref())
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => GridError::NotFound(path.to_path_buf()),
        _ => GridError::Io(e),
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn restore(snapshot: Snapshot, metric: Metric, path: &Path) -> Result<GridIndex> {
    let Snapshot {
        dim,
        n_cells,
        epsilon,
        periodic,
        is_periodic,
        data,
        bin_edges,
        grid: stored,
        stats,
        ..
    } = snapshot;

    let count = validate::data(&data, dim)?;
    validate::grid(n_cells, epsilon, dim)?;
    validate::periodicity(&periodic, &data, dim)?;
    if is_periodic != periodic.is_periodic() {
        return Err(corrupt("periodic flag disagrees with the periodic axes"));
    }
    if bin_edges.len() != dim || bin_edges.iter().any(|e| e.len() != n_cells + 1) {
        return Err(corrupt("bin edges do not match the grid shape"));
    }

    let mut grid = Grid::from_parts(n_cells, dim, epsilon, bin_edges, HashMap::with_capacity(stored.len()));
    let mut seen = vec![false; count];
    for SnapshotCell { cell, points } in stored {
        if cell.len() != dim || cell.iter().any(|&i| i >= n_cells) {
            return Err(corrupt("cell index outside the grid"));
        }
        if points.is_empty() {
            return Err(corrupt("empty cell stored"));
        }
        for &p in &points {
            match seen.get_mut(p) {
                Some(s) if !*s => *s = true,
                _ => return Err(corrupt("point index missing, repeated or out of range")),
            }
        }
        let key = grid.encode(&cell);
        if grid.cells.insert(key, points).is_some() {
            return Err(corrupt("cell stored twice"));
        }
    }
    if seen.iter().any(|s| !s) {
        return Err(corrupt("point index missing, repeated or out of range"));
    }

    let mirror = PeriodicMirror::new(&periodic, dim);
    debug!(path = %path.display(), points = count, cells = grid.cells.len(), "loaded grid index");
    Ok(GridIndex {
        data,
        dim,
        epsilon,
        metric,
        periodic,
        mirror,
        grid,
        stats,
    })
}

fn corrupt(reason: &str) -> GridError {
    GridError::CorruptSnapshot(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::query::TieBreak;

    fn sample() -> GridIndex {
        let data = vec![0.1, 0.2, 0.9, 0.8, 0.5, 0.5, 0.45, 0.55, 0.0, 1.0];
        let config = GridConfig::new().n_cells(3).periodic(PeriodicSpec::new().axis(0, 0.0, 1.0));
        GridIndex::new(data, 2, config).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let index = sample();
        index.save(&path, false).unwrap();

        let loaded = GridIndex::load(&path).unwrap();
        assert_eq!(loaded.data(), index.data());
        assert_eq!(loaded.grid().cells, index.grid().cells);
        assert_eq!(loaded.grid().bin_edges, index.grid().bin_edges);
        assert_eq!(loaded.stats(), index.stats());
        assert_eq!(loaded.periodic(), index.periodic());
        assert_eq!(loaded.mirror().map(|m| m.edges().to_vec()), index.mirror().map(|m| m.edges().to_vec()));

        let centres = [0.05, 0.5, 0.5, 0.5];
        assert_eq!(
            loaded.bubble_neighbors(&centres, 0.3, Some(TieBreak::Index)).unwrap(),
            index.bubble_neighbors(&centres, 0.3, Some(TieBreak::Index)).unwrap()
        );
    }

    #[test]
    fn test_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let index = sample();
        index.save(&path, false).unwrap();
        assert!(matches!(index.save(&path, false), Err(GridError::AlreadyExists(_))));
        index.save(&path, true).unwrap();
    }

    #[test]
    fn test_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(GridIndex::load(&missing), Err(GridError::NotFound(_))));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, b"{\"dim\": 2}").unwrap();
        assert!(matches!(GridIndex::load(&garbage), Err(GridError::Serialization(_))));
    }

    #[test]
    fn test_custom_metric_needs_explicit_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let chebyshev = Metric::custom("chebyshev", |r, p, dim| {
            p.chunks_exact(dim)
                .map(|q| q.iter().zip(r).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max))
                .collect()
        });
        let index = GridIndex::new(vec![0.0, 0.0, 1.0, 1.0], 2, GridConfig::new().metric(chebyshev.clone())).unwrap();
        index.save(&path, false).unwrap();

        assert!(matches!(GridIndex::load(&path), Err(GridError::UnknownMetric(_))));
        let loaded = GridIndex::load_with_metric(&path, chebyshev).unwrap();
        assert_eq!(loaded.metric().name(), "chebyshev");
    }
}
