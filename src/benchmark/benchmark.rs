use std::time::Instant;

use crate::geometry::evaluator::directional_curvature;
use crate::simulation::mechanics::Mechanics;
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec2, NVec3};
use crate::surface::function::{SurfaceFunction, SymbolicSurface};

const BENCH_SURFACE: &str = "sin(x + y) + 0.1*(x^2 + y^2)";

/// Helper to build a mechanics context holding `n` moving bodies
fn make_mechanics(n: usize, surface: &SymbolicSurface) -> Mechanics {
    let mut mechanics = Mechanics::new(Parameters::default());

    for i in 0..n {
        let i_f = i as f64;
        // deterministic positions, no rand needed
        let x = (i_f * 0.37).sin() * 2.5;
        let y = (i_f * 0.13).cos() * 2.5;
        let position = NVec3::new(x, y, surface.value_at(x, y));
        let velocity = NVec3::new((i_f * 0.07).sin(), (i_f * 0.11).cos(), 0.0);

        // mass is a positive constant, cannot be rejected
        let _ = mechanics.add_body_with_velocity(position, velocity, 1.0);
    }

    mechanics
}

/// Time one `update` for a range of body counts
/// Paste output directly into excel to graph
pub fn bench_update() {
    let surface = match SymbolicSurface::parse(BENCH_SURFACE) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("bench_update: {err}");
            return;
        }
    };

    println!("N,update_ms,capacity");

    for n in [32, 128, 512, 2048, 8192, 32768] {
        let mut mechanics = make_mechanics(n, &surface);
        let steps = if n <= 2048 { 20 } else { 3 };

        // Warm-up
        mechanics.update(0.001, &surface, true);

        let t0 = Instant::now();
        for _ in 0..steps {
            mechanics.update(0.001, &surface, true);
        }
        let ms = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;

        println!("{},{:.6},{}", n, ms, mechanics.get_capacity());
    }
}

/// Time curvature evaluation alone, half of the batch at rest
pub fn bench_curvature() {
    let surface = match SymbolicSurface::parse(BENCH_SURFACE) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("bench_curvature: {err}");
            return;
        }
    };

    println!("N,curvature_ms,sum_k");

    for n in [1_000, 10_000, 100_000] {
        let points: Vec<NVec2> = (0..n)
            .map(|i| {
                let i_f = i as f64;
                NVec2::new((i_f * 0.37).sin() * 2.5, (i_f * 0.13).cos() * 2.5)
            })
            .collect();
        let directions: Vec<NVec2> = (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    NVec2::zeros()
                } else {
                    let a = i as f64 * 0.01;
                    NVec2::new(a.cos(), a.sin())
                }
            })
            .collect();

        let t0 = Instant::now();
        let k = directional_curvature(&surface, &points, &directions);
        let ms = t0.elapsed().as_secs_f64() * 1000.0;

        // keep the result alive
        let total: f64 = k.iter().sum();
        println!("{},{:.6},{:.3}", n, ms, total);
    }
}
