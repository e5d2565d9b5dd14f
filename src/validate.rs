//! Input checks run before the grid is built or queried.
//!
//! The grid and query code assume well-formed input; every public entry
//! point of [`GridIndex`](crate::GridIndex) goes through these functions first.

use crate::error::{GridError, Result};
use crate::periodic::PeriodicSpec;

/// Checks the point buffer: non-empty, whole points, finite coordinates.
pub fn data(points: &[f64], dim: usize) -> Result<usize> {
    if dim == 0 {
        return Err(GridError::ZeroDimension);
    }
    if points.is_empty() {
        return Err(GridError::EmptyData);
    }
    if points.len() % dim != 0 {
        return Err(GridError::RaggedData { len: points.len(), dim });
    }
    if let Some(index) = points.chunks_exact(dim).position(|p| p.iter().any(|v| !v.is_finite())) {
        return Err(GridError::NonFiniteData { index });
    }
    Ok(points.len() / dim)
}

/// Checks the grid resolution against the dimension.
pub fn grid(n_cells: usize, epsilon: f64, dim: usize) -> Result<()> {
    if n_cells == 0 {
        return Err(GridError::InvalidCellCount(n_cells));
    }
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(GridError::InvalidEpsilon(epsilon));
    }
    let addressable = u32::try_from(dim)
        .ok()
        .and_then(|d| (n_cells as u64).checked_pow(d))
        .is_some();
    if !addressable {
        return Err(GridError::GridTooLarge { n_cells, dim });
    }
    Ok(())
}

/// Checks periodic axes and ranges, and that the data lies inside every periodic range.
pub fn periodicity(spec: &PeriodicSpec, points: &[f64], dim: usize) -> Result<()> {
    if let Some(axis) = spec.axes().find(|&axis| axis >= dim) {
        return Err(GridError::InvalidPeriodicAxis { axis, dim });
    }
    for (axis, (low, high)) in spec.ranges() {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(GridError::InvalidPeriodicRange { axis, low, high });
        }
        let outside = points
            .chunks_exact(dim)
            .position(|p| p[axis] < low || p[axis] > high);
        if let Some(index) = outside {
            return Err(GridError::OutOfPeriodicDomain { index, axis });
        }
    }
    Ok(())
}

/// Checks query centres and returns how many there are.
pub fn centres(centres: &[f64], dim: usize) -> Result<usize> {
    if centres.is_empty() {
        return Err(GridError::EmptyCentres);
    }
    if centres.len() % dim != 0 {
        return Err(GridError::DimensionMismatch { expected: dim, actual: centres.len() });
    }
    if let Some(index) = centres.chunks_exact(dim).position(|c| c.iter().any(|v| !v.is_finite())) {
        return Err(GridError::NonFiniteCentre { index });
    }
    Ok(centres.len() / dim)
}

/// Checks one bound per centre: finite, non-negative, within every periodic range.
pub fn bounds(bounds: &[f64], count: usize, periodic: &PeriodicSpec) -> Result<()> {
    if bounds.len() != count {
        return Err(GridError::BoundCountMismatch { centres: count, bounds: bounds.len() });
    }
    if let Some(&bound) = bounds.iter().find(|b| !(b.is_finite() && **b >= 0.0)) {
        return Err(GridError::InvalidBound(bound));
    }
    let largest = bounds.iter().copied().fold(0.0, f64::max);
    for (axis, (low, high)) in periodic.ranges() {
        let period = high - low;
        if largest > period {
            return Err(GridError::BoundExceedsPeriod { bound: largest, axis, period });
        }
    }
    Ok(())
}

/// Checks that no shell has its lower bound above the upper one.
pub fn shell(lower: &[f64], upper: &[f64]) -> Result<()> {
    match lower.iter().zip(upper).find(|(l, u)| l > u) {
        Some((&lower, &upper)) => Err(GridError::InvertedShell { lower, upper }),
        None => Ok(()),
    }
}

/// Checks the requested neighbor count against the number of indexed points.
pub fn n_nearest(n: usize, available: usize) -> Result<()> {
    if n == 0 || n > available {
        return Err(GridError::InvalidNeighborCount { requested: n, available });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data() {
        assert_eq!(data(&[0.0, 1.0, 2.0, 3.0], 2).unwrap(), 2);
        assert!(matches!(data(&[], 2), Err(GridError::EmptyData)));
        assert!(matches!(data(&[1.0], 0), Err(GridError::ZeroDimension)));
        assert!(matches!(data(&[1.0, 2.0, 3.0], 2), Err(GridError::RaggedData { len: 3, dim: 2 })));
        assert!(matches!(
            data(&[0.0, 0.0, 1.0, f64::NAN], 2),
            Err(GridError::NonFiniteData { index: 1 })
        ));
    }

    #[test]
    fn test_grid() {
        assert!(grid(20, 1e-6, 3).is_ok());
        assert!(matches!(grid(0, 1e-6, 3), Err(GridError::InvalidCellCount(0))));
        assert!(matches!(grid(20, 0.0, 3), Err(GridError::InvalidEpsilon(_))));
        assert!(matches!(grid(1000, 1e-6, 7), Err(GridError::GridTooLarge { .. })));
    }

    #[test]
    fn test_periodicity() {
        let points = [0.5, 2.0, 9.5, 3.0];
        assert!(periodicity(&PeriodicSpec::new().axis(0, 0.0, 10.0), &points, 2).is_ok());
        assert!(matches!(
            periodicity(&PeriodicSpec::new().axis(2, 0.0, 10.0), &points, 2),
            Err(GridError::InvalidPeriodicAxis { axis: 2, dim: 2 })
        ));
        assert!(matches!(
            periodicity(&PeriodicSpec::new().axis(0, 10.0, 0.0), &points, 2),
            Err(GridError::InvalidPeriodicRange { axis: 0, .. })
        ));
        assert!(matches!(
            periodicity(&PeriodicSpec::new().axis(1, 0.0, 2.5), &points, 2),
            Err(GridError::OutOfPeriodicDomain { index: 1, axis: 1 })
        ));
        // An axis explicitly left open never constrains the data.
        assert!(periodicity(&PeriodicSpec::new().open(1), &points, 2).is_ok());
    }

    #[test]
    fn test_centres() {
        assert_eq!(centres(&[1.0, 2.0, 3.0], 3).unwrap(), 1);
        assert!(matches!(centres(&[], 3), Err(GridError::EmptyCentres)));
        assert!(matches!(
            centres(&[1.0, 2.0], 3),
            Err(GridError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            centres(&[1.0, f64::INFINITY], 1),
            Err(GridError::NonFiniteCentre { index: 1 })
        ));
    }

    #[test]
    fn test_bounds() {
        let open = PeriodicSpec::new();
        assert!(bounds(&[0.0, 2.0], 2, &open).is_ok());
        assert!(matches!(
            bounds(&[1.0], 2, &open),
            Err(GridError::BoundCountMismatch { centres: 2, bounds: 1 })
        ));
        assert!(matches!(bounds(&[-1.0], 1, &open), Err(GridError::InvalidBound(_))));
        assert!(matches!(bounds(&[f64::NAN], 1, &open), Err(GridError::InvalidBound(_))));

        let periodic = PeriodicSpec::new().axis(1, 0.0, 4.0);
        assert!(bounds(&[4.0], 1, &periodic).is_ok());
        assert!(matches!(
            bounds(&[4.5], 1, &periodic),
            Err(GridError::BoundExceedsPeriod { axis: 1, .. })
        ));
    }

    #[test]
    fn test_shell_and_n() {
        assert!(shell(&[1.0, 2.0], &[1.0, 3.0]).is_ok());
        assert!(matches!(shell(&[2.0], &[1.0]), Err(GridError::InvertedShell { .. })));
        assert!(n_nearest(3, 3).is_ok());
        assert!(matches!(n_nearest(0, 3), Err(GridError::InvalidNeighborCount { .. })));
        assert!(matches!(n_nearest(4, 3), Err(GridError::InvalidNeighborCount { .. })));
    }
}
