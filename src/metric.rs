use std::fmt;
use std::sync::Arc;

use crate::error::{GridError, Result};

/// Signature of a user supplied distance function.
///
/// Receives the reference point, a flat buffer of points (`dim` coordinates
/// each) and the dimension, and returns one distance per point.
pub type DistanceFn = dyn Fn(&[f64], &[f64], usize) -> Vec<f64> + Send + Sync;

/// Trait defining how distances are measured between a reference point and a batch of points.
///
/// Implementations must be pure, length-preserving (one distance per point),
/// non-negative, and return `0.0` for coincident points. An empty `points`
/// buffer yields an empty result.
pub trait DistanceMetric: Send + Sync {
    /// Name used to persist and restore the metric.
    fn name(&self) -> &str;

    /// Distances from `reference` to each `dim`-sized chunk of `points`.
    fn distance(&self, reference: &[f64], points: &[f64], dim: usize) -> Vec<f64>;
}

/// The distance metrics available to a [`GridIndex`](crate::GridIndex).
///
/// `Haversine` and `Vincenty` expect `(longitude, latitude)` in degrees on
/// axes 0 and 1 and return the angular separation in degrees.
#[derive(Clone, Default)]
pub enum Metric {
    /// Plain Euclidean distance.
    #[default]
    Euclid,
    /// Great-circle separation using the haversine formula.
    Haversine,
    /// Great-circle separation using the Vincenty special case for spheres.
    Vincenty,
    /// A named, user supplied distance function.
    Custom {
        name: String,
        func: Arc<DistanceFn>,
    },
}

impl Metric {
    /// Resolves one of the built-in metric names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "euclid" => Ok(Metric::Euclid),
            "haversine" => Ok(Metric::Haversine),
            "vincenty" => Ok(Metric::Vincenty),
            other => Err(GridError::UnknownMetric(other.to_string())),
        }
    }

    /// Wraps a closure as a named metric.
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64], &[f64], usize) -> Vec<f64> + Send + Sync + 'static,
    {
        Metric::Custom {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Metric::Custom { .. })
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl DistanceMetric for Metric {
    fn name(&self) -> &str {
        match self {
            Metric::Euclid => "euclid",
            Metric::Haversine => "haversine",
            Metric::Vincenty => "vincenty",
            Metric::Custom { name, .. } => name,
        }
    }

    fn distance(&self, reference: &[f64], points: &[f64], dim: usize) -> Vec<f64> {
        if points.is_empty() {
            return Vec::new();
        }
        match self {
            Metric::Euclid => euclid(reference, points, dim),
            Metric::Haversine => haversine(reference, points, dim),
            Metric::Vincenty => vincenty(reference, points, dim),
            Metric::Custom { func, .. } => func(reference, points, dim),
        }
    }
}

/// Euclidean distance from `reference` to every point in `points`.
pub fn euclid(reference: &[f64], points: &[f64], dim: usize) -> Vec<f64> {
    points
        .chunks_exact(dim)
        .map(|p| {
            p.iter()
                .zip(reference)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt()
        })
        .collect()
}

/// Haversine great-circle separation in degrees.
pub fn haversine(reference: &[f64], points: &[f64], dim: usize) -> Vec<f64> {
    let lon1 = reference[0].to_radians();
    let lat1 = reference[1].to_radians();
    let clat1 = lat1.cos();

    points
        .chunks_exact(dim)
        .map(|p| {
            let lon2 = p[0].to_radians();
            let lat2 = p[1].to_radians();
            let sdlon = ((lon2 - lon1) * 0.5).sin();
            let sdlat = ((lat2 - lat1) * 0.5).sin();
            let h = sdlat * sdlat + clat1 * lat2.cos() * sdlon * sdlon;
            // rounding can push h marginally above 1 for antipodal points
            (2.0 * h.min(1.0).sqrt().asin()).to_degrees()
        })
        .collect()
}

/// Vincenty great-circle separation in degrees.
pub fn vincenty(reference: &[f64], points: &[f64], dim: usize) -> Vec<f64> {
    let lon1 = reference[0].to_radians();
    let lat1 = reference[1].to_radians();
    let (slat1, clat1) = lat1.sin_cos();

    points
        .chunks_exact(dim)
        .map(|p| {
            let lon2 = p[0].to_radians();
            let lat2 = p[1].to_radians();
            let (sdlon, cdlon) = (lon2 - lon1).sin_cos();
            let (slat2, clat2) = lat2.sin_cos();

            let num1 = clat2 * sdlon;
            let num2 = clat1 * slat2 - slat1 * clat2 * cdlon;
            let denominator = slat1 * slat2 + clat1 * clat2 * cdlon;
            num1.hypot(num2).atan2(denominator).to_degrees()
        })
        .collect()
}
