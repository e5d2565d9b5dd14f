use gridsearch::{BuildRegime, GridConfig, GridError, GridIndex, Metric, TieBreak};

#[test]
fn test_centre_far_outside_the_grid() {
    let points = vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
    let index = GridIndex::new(points, 2, GridConfig::new().n_cells(3)).unwrap();

    let found = index.bubble_neighbors(&[100.0, 100.0], 5.0, None).unwrap();
    assert!(found[0].is_empty());
    let found = index.shell_neighbors(&[-50.0, 0.0], 1.0, 10.0, None).unwrap();
    assert!(found[0].is_empty());

    // The nearest-neighbor search keeps growing until it reaches the data.
    let found = index.nearest_neighbors(&[100.0, 100.0], 1, TieBreak::Stable).unwrap();
    assert_eq!(found[0].indices, vec![2]);
}

#[test]
fn test_construction_errors() {
    assert!(matches!(GridIndex::new(vec![], 3, GridConfig::new()), Err(GridError::EmptyData)));
    assert!(matches!(
        GridIndex::new(vec![1.0, 2.0], 0, GridConfig::new()),
        Err(GridError::ZeroDimension)
    ));
    assert!(matches!(
        GridIndex::new(vec![1.0, 2.0, 3.0], 2, GridConfig::new()),
        Err(GridError::RaggedData { .. })
    ));
    assert!(matches!(
        GridIndex::new(vec![1.0, f64::NAN], 1, GridConfig::new()),
        Err(GridError::NonFiniteData { index: 1 })
    ));
    assert!(matches!(
        GridIndex::new(vec![1.0; 12], 12, GridConfig::new().n_cells(100)),
        Err(GridError::GridTooLarge { n_cells: 100, dim: 12 })
    ));
}

#[test]
fn test_query_errors() {
    let index = GridIndex::new(vec![0.0, 0.0, 1.0, 1.0], 2, GridConfig::new()).unwrap();

    assert!(matches!(index.bubble_neighbors(&[], 1.0, None), Err(GridError::EmptyCentres)));
    assert!(matches!(
        index.bubble_neighbors(&[0.0, 0.0, 0.0], 1.0, None),
        Err(GridError::DimensionMismatch { expected: 2, actual: 3 })
    ));
    assert!(matches!(
        index.bubble_neighbors(&[0.0, f64::NAN], 1.0, None),
        Err(GridError::NonFiniteCentre { index: 0 })
    ));
    assert!(matches!(index.bubble_neighbors(&[0.0, 0.0], -1.0, None), Err(GridError::InvalidBound(_))));
    assert!(matches!(
        index.shell_neighbors(&[0.0, 0.0], 2.0, 1.0, None),
        Err(GridError::InvertedShell { .. })
    ));
    assert!(matches!(
        index.nearest_neighbors(&[0.0, 0.0], 3, TieBreak::Stable),
        Err(GridError::InvalidNeighborCount { requested: 3, available: 2 })
    ));
    assert!(matches!(
        index.nearest_neighbors(&[0.0, 0.0], 0, TieBreak::Stable),
        Err(GridError::InvalidNeighborCount { requested: 0, .. })
    ));
}

#[test]
fn test_single_point_and_single_cell() {
    let index = GridIndex::new(vec![3.0, -2.0, 7.0], 3, GridConfig::new().n_cells(1)).unwrap();
    assert_eq!(index.grid().cells.len(), 1);

    let found = index.nearest_neighbors(&[3.0, -2.0, 7.0], 1, TieBreak::Stable).unwrap();
    assert_eq!(found[0].indices, vec![0]);
    let found = index.bubble_neighbors(&[0.0, 0.0, 0.0], 10.0, None).unwrap();
    assert_eq!(found[0].indices, vec![0]);
    let found = index.bubble_neighbors(&[3.0, -2.0, 7.0], 0.0, None).unwrap();
    assert_eq!(found[0].indices, vec![0]);
    assert_eq!(found[0].distances, vec![0.0]);
}

#[test]
fn test_regimes_give_the_same_grid() {
    // 64 points on a lattice: 3^2 = 9 cells is dense, 10^2 = 100 cells is sparse.
    let points: Vec<f64> = (0..64).flat_map(|i| [(i % 8) as f64, (i / 8) as f64]).collect();
    let dense = GridIndex::new(points.clone(), 2, GridConfig::new().n_cells(3)).unwrap();
    let sparse = GridIndex::new(points, 2, GridConfig::new().n_cells(10)).unwrap();
    assert_eq!(dense.grid().regime(dense.len()), BuildRegime::Dense);
    assert_eq!(sparse.grid().regime(sparse.len()), BuildRegime::Sparse);

    for index in [&dense, &sparse] {
        let total: usize = index.grid().cells.values().map(Vec::len).sum();
        assert_eq!(total, 64);
        for members in index.grid().cells.values() {
            assert!(members.windows(2).all(|w| w[0] < w[1]));
        }
    }

    let a = dense.bubble_neighbors(&[3.5, 3.5], 2.0, Some(TieBreak::Index)).unwrap();
    let b = sparse.bubble_neighbors(&[3.5, 3.5], 2.0, Some(TieBreak::Index)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_unknown_metric_name() {
    assert!(matches!(Metric::from_name("cosine"), Err(GridError::UnknownMetric(name)) if name == "cosine"));
}

#[test]
fn test_nearest_from_far_off_a_flat_axis() {
    // Every point has y = 0, so the y cells are only a few microns wide.
    let points: Vec<f64> = (0..20).flat_map(|i| [i as f64, 0.0]).collect();
    let index = GridIndex::new(points, 2, GridConfig::new().n_cells(10)).unwrap();

    let found = index.nearest_neighbors(&[5.2, 50.0], 2, TieBreak::Index).unwrap();
    assert_eq!(found[0].indices, vec![5, 6]);
    assert!((found[0].distances[0] - (0.04f64 + 2500.0).sqrt()).abs() < 1e-9);
}
