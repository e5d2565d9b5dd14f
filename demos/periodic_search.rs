//! Bubble, shell and nearest-neighbor queries in a periodic box.
//!
//! Run with: RUST_LOG=gridsearch=debug cargo run --example periodic_search

use gridsearch::{GridConfig, GridIndex, PeriodicSpec, TieBreak};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 10,000 points in a 100 x 100 x 100 box that wraps around on x and y.
    let mut rng = StdRng::seed_from_u64(7);
    let points: Vec<f64> = (0..30_000).map(|_| rng.gen_range(0.0..100.0)).collect();
    let config = GridConfig::new()
        .n_cells(20)
        .periodic(PeriodicSpec::new().axis(0, 0.0, 100.0).axis(1, 0.0, 100.0));
    let index = GridIndex::new(points, 3, config)?;
    println!(
        "Indexed {} points into {} occupied cells in {:?}",
        index.len(),
        index.grid().cells.len(),
        index.stats().build_time
    );

    // One centre in the middle, one in a corner where the box wraps.
    let centres = [50.0, 50.0, 50.0, 1.0, 99.0, 50.0];

    let bubble = index.bubble_neighbors(&centres, 5.0, Some(TieBreak::Stable))?;
    let shell = index.shell_neighbors(&centres, 5.0, 8.0, Some(TieBreak::Stable))?;
    let nearest = index.nearest_neighbors(&centres, 5, TieBreak::Index)?;

    for (i, centre) in centres.chunks_exact(3).enumerate() {
        println!("\nCentre {:?}", centre);
        println!("  {} points within 5.0", bubble[i].len());
        println!("  {} points between 5.0 and 8.0", shell[i].len());
        for (d, j) in nearest[i].iter() {
            println!("  neighbor {:5} at {:.3}", j, d);
        }
    }

    // Turning periodicity off leaves the grid alone.
    let mut open = index.clone();
    open.set_periodicity(PeriodicSpec::new())?;
    let corner = open.bubble_neighbors(&centres[3..], 5.0, None)?;
    println!("\nWithout wrap-around the corner centre sees {} points", corner[0].len());

    Ok(())
}
