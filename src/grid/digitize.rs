/// Evenly spaced bin edges spanning `[min - epsilon, max + epsilon]`.
///
/// Returns `n_cells + 1` increasing edges. The padding guarantees that
/// [`digitize`] maps every value of the axis into `[0, n_cells - 1]`.
pub fn bin_edges<I>(values: I, n_cells: usize, epsilon: f64) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let start = min - epsilon;
    let stop = max + epsilon;
    let step = (stop - start) / n_cells as f64;

    let mut edges: Vec<f64> = (0..n_cells).map(|i| start + i as f64 * step).collect();
    edges.push(stop);
    edges
}

/// Index of the bin containing `value`.
///
/// `floor(N * (value - edges[0]) / (edges[N] - edges[0]))` with `N = edges.len() - 1`.
/// No clamping: values outside the edges map to indices outside `[0, N - 1]`.
/// Construction and queries both go through this function so a point and a
/// centre with the same coordinate always land in the same bin.
#[inline]
pub fn digitize(value: f64, edges: &[f64]) -> i64 {
    let n = (edges.len() - 1) as f64;
    let first = edges[0];
    let last = edges[edges.len() - 1];
    (n * (value - first) / (last - first)).floor() as i64
}

/// [`digitize`] clamped into `[0, n_cells - 1]`, for indexing the grid.
#[inline]
pub fn digitize_clamped(value: f64, edges: &[f64]) -> usize {
    let max = (edges.len() - 2) as i64;
    digitize(value, edges).clamp(0, max) as usize
}
