use crate::metric::Metric;
use crate::periodic::PeriodicSpec;

/// Default number of cells per axis.
pub const DEFAULT_N_CELLS: usize = 20;
/// Default padding added to both ends of each axis range when placing bin edges.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Construction parameters of a [`GridIndex`](crate::GridIndex).
#[derive(Clone, Debug)]
pub struct GridConfig {
    /// Number of cells per axis.
    pub n_cells: usize,
    /// Padding of the bin edges beyond the data range.
    pub epsilon: f64,
    /// How distances are measured.
    pub metric: Metric,
    /// Periodic boundary conditions.
    pub periodic: PeriodicSpec,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            n_cells: DEFAULT_N_CELLS,
            epsilon: DEFAULT_EPSILON,
            metric: Metric::Euclid,
            periodic: PeriodicSpec::default(),
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_cells(mut self, n_cells: usize) -> Self {
        self.n_cells = n_cells;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn periodic(mut self, periodic: PeriodicSpec) -> Self {
        self.periodic = periodic;
        self
    }
}
