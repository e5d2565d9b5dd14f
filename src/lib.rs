//! # gridsearch
//!
//! `gridsearch` is a Rust library for fixed-radius, shell and nearest-neighbor
//! searches over point sets of any dimension. Points are binned once into a
//! uniform grid; queries only look at the cells that can hold an answer.
//!
//! ## Features
//!
//! - **Sparse grid**: only occupied cells are stored, keyed by a packed cell index.
//! - **Three query kinds**: bubble (`d <= r`), shell (`r0 < d <= r1`) and `n` nearest neighbors.
//! - **Periodic boundaries**: any subset of axes can wrap around, queries see across the edges.
//! - **Pluggable metrics**: Euclidean, great-circle (haversine, Vincenty) or a custom closure.
//! - **Snapshots**: an index can be saved to JSON and loaded back without rebinning.
//!
//! ## Example
//!
//! See `demos/periodic_search.rs` for a periodic box with all three query kinds.
//!
//! ## Main Interface
//!
//! The primary entry point is the [`GridIndex`] struct, built from a flat
//! coordinate buffer and a [`GridConfig`].

mod config;
mod error;
pub mod grid;
mod index;
pub mod metric;
mod periodic;
mod persist;
mod query;
mod validate;

pub use config::GridConfig;
pub use config::DEFAULT_EPSILON;
pub use config::DEFAULT_N_CELLS;
pub use error::GridError;
pub use error::Result;
pub use grid::BuildRegime;
pub use grid::CellKey;
pub use grid::Grid;
pub use index::BuildStats;
pub use index::GridIndex;
pub use metric::DistanceMetric;
pub use metric::Metric;
pub use periodic::MirrorCentre;
pub use periodic::PeriodicMirror;
pub use periodic::PeriodicSpec;
pub use query::Neighbors;
pub use query::QueryEngine;
pub use query::Radius;
pub use query::TieBreak;
