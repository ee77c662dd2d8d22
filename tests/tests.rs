use std::f64::consts::PI;

use surfroll::geometry::linalg::normalize;
use surfroll::simulation::engine::PARSE_OK;
use surfroll::{
    build_gradient_first, build_gradient_second, build_normals, build_values,
    directional_curvature, euler_integrator,
};
use surfroll::{
    BodyStore, CapacityPolicy, Domain, Engine, FiniteDifferenceSurface, Mechanics,
    MechanicsError, NVec2, NVec3, Parameters, Scenario, ScenarioConfig, SurfaceError,
    SurfaceForces, SurfaceFunction, SurfaceMesh, SymbolicSurface,
};
use surfroll::next_drop_mass;

/// Parse a formula that is known to be valid
pub fn surface(text: &str) -> SymbolicSurface {
    SymbolicSurface::parse(text).expect("test formula must parse")
}

/// Physics parameters for tests
pub fn params(gravity: f64, friction: f64) -> Parameters {
    Parameters {
        gravity,
        friction,
        ..Parameters::default()
    }
}

/// Unit directions spread around the circle
pub fn directions(n: usize) -> Vec<NVec2> {
    (0..n)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / n as f64;
            NVec2::new(a.cos(), a.sin())
        })
        .collect()
}

/// Small grid of sample points in [-1.5, 1.5]^2
pub fn grid(n: usize) -> Vec<NVec2> {
    let mut points = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let t = |k: usize| -1.5 + 3.0 * k as f64 / (n - 1) as f64;
            points.push(NVec2::new(t(i), t(j)));
        }
    }
    points
}

// ==================================================================================
// Differential geometry tests
// ==================================================================================

#[test]
fn normals_are_unit_length() {
    let s = surface("sin(x)*cos(y) + 0.3*x^2");
    let normals = build_normals(&s, &grid(7));

    assert_eq!(normals.len(), 49);
    for n in normals {
        assert!((n.norm() - 1.0).abs() < 1e-12, "normal not unit length: {:?}", n);
        assert!(n.z > 0.0, "normal should point up for a graph surface");
    }
}

#[test]
fn normals_of_planes() {
    let flat = build_normals(&surface("0"), &grid(3));
    for n in flat {
        assert_eq!(n, NVec3::new(0.0, 0.0, 1.0));
    }

    // z = x has normal (-1, 0, 1)/sqrt(2)
    let tilted = build_normals(&surface("x"), &[NVec2::new(0.4, -2.0)]);
    let expected = NVec3::new(-1.0, 0.0, 1.0) / 2f64.sqrt();
    assert!((tilted[0] - expected).norm() < 1e-12);
}

#[test]
fn normalize_leaves_zero_vectors_zero() {
    let out = normalize(&[NVec3::zeros(), NVec3::new(0.0, 3.0, 4.0)]);

    assert_eq!(out[0], NVec3::zeros());
    assert!(out[0].iter().all(|c| !c.is_nan()));
    assert!((out[1] - NVec3::new(0.0, 0.6, 0.8)).norm() < 1e-15);
}

#[test]
fn values_of_constant_broadcast_to_batch() {
    let s = surface("3.5");

    for n in [1, 2, 7, 64] {
        let points: Vec<NVec2> = grid(8).into_iter().take(n).collect();
        let values = build_values(&s, &points);
        assert_eq!(values.len(), n);
        assert!(values.iter().all(|v| *v == 3.5));
    }
}

#[test]
fn first_gradient_matches_partials() {
    let s = surface("x^2 + 3*y");
    let g = build_gradient_first(&s, &[NVec2::new(2.0, 1.0), NVec2::new(-1.0, 5.0)]);

    assert!((g[0] - NVec2::new(4.0, 3.0)).norm() < 1e-12);
    assert!((g[1] - NVec2::new(-2.0, 3.0)).norm() < 1e-12);
}

#[test]
fn second_gradient_is_hessian_applied_to_point() {
    // H = [[2y, 2x], [2x, 0]]
    let s = surface("x^2*y");
    let p = NVec2::new(1.0, 2.0);
    let g2 = build_gradient_second(&s, &[p]);

    // [[4, 2], [2, 0]] . (1, 2) = (8, 2)
    assert!((g2[0] - NVec2::new(8.0, 2.0)).norm() < 1e-12);
}

#[test]
fn curvature_of_flat_plane_is_zero() {
    for formula in ["0", "2*x - y + 4"] {
        let s = surface(formula);
        let points = grid(5);
        for u in directions(16) {
            let dirs = vec![u; points.len()];
            let k = directional_curvature(&s, &points, &dirs);
            assert!(k.iter().all(|k| *k == 0.0), "{formula}: {:?}", k);
        }
    }
}

#[test]
fn curvature_of_unit_sphere_bottom_is_one() {
    let s = surface("-sqrt(1 - x^2 - y^2)");
    let dirs = directions(24);
    let points = vec![NVec2::zeros(); dirs.len()];

    let k = directional_curvature(&s, &points, &dirs);
    for (u, k) in dirs.iter().zip(k) {
        assert!((k - 1.0).abs() < 1e-6, "direction {:?}: curvature {}", u, k);
    }
}

#[test]
fn curvature_of_parabola() {
    let s = surface("x^2");
    let points = [NVec2::new(0.0, 0.0), NVec2::new(1.0, 0.0), NVec2::new(1.0, 0.0)];
    let dirs = [NVec2::new(1.0, 0.0), NVec2::new(1.0, 0.0), NVec2::new(0.0, 1.0)];

    let k = directional_curvature(&s, &points, &dirs);

    // s1 = 0, s2 = 2
    assert!((k[0] - 2.0).abs() < 1e-12);
    // s1 = 2, s2 = 2 -> 2 / 5^(3/2)
    assert!((k[1] - 2.0 / 5f64.powf(1.5)).abs() < 1e-12);
    // no bending along y
    assert_eq!(k[2], 0.0);
}

#[test]
fn curvature_sign_is_discarded() {
    let up = directional_curvature(&surface("x^2"), &[NVec2::zeros()], &[NVec2::new(1.0, 0.0)]);
    let down = directional_curvature(&surface("-x^2"), &[NVec2::zeros()], &[NVec2::new(1.0, 0.0)]);

    assert_eq!(up[0], down[0]);
    assert!(up[0] > 0.0);
}

#[test]
fn curvature_masks_zero_directions() {
    let s = surface("-sqrt(1 - x^2 - y^2)");
    // (5, 5) is outside the hemisphere, derivatives there are NaN
    let points = [NVec2::new(5.0, 5.0), NVec2::zeros(), NVec2::new(5.0, 5.0)];
    let dirs = [NVec2::zeros(), NVec2::zeros(), NVec2::new(1.0, 0.0)];

    let k = directional_curvature(&s, &points, &dirs);
    assert_eq!(k, vec![0.0, 0.0, 0.0]);
}

#[test]
fn finite_differences_agree_with_symbolic() {
    let symbolic = surface("sin(x*y) + exp(0.5*x)");
    let numeric = FiniteDifferenceSurface::new(|x: f64, y: f64| (x * y).sin() + (0.5 * x).exp());
    let points = [NVec2::new(0.3, -0.7), NVec2::new(1.1, 0.4), NVec2::new(-0.9, 1.3)];

    let pairs = [
        (symbolic.gradient_x(&points), numeric.gradient_x(&points)),
        (symbolic.gradient_y(&points), numeric.gradient_y(&points)),
        (symbolic.hessian_xx(&points), numeric.hessian_xx(&points)),
        (symbolic.hessian_yy(&points), numeric.hessian_yy(&points)),
        (symbolic.hessian_xy(&points), numeric.hessian_xy(&points)),
    ];
    for (exact, approx) in pairs {
        for (a, b) in exact.iter().zip(approx.iter()) {
            assert!((a - b).abs() < 1e-4, "symbolic {a} vs numeric {b}");
        }
    }
}

// ==================================================================================
// Body store tests
// ==================================================================================

#[test_log::test]
fn store_grows_without_losing_bodies() {
    let mut store = BodyStore::new(32, CapacityPolicy::Grow);

    for i in 0..33 {
        let i_f = i as f64;
        store.add(NVec3::new(i_f, -i_f, 0.5 * i_f), 1.0 + i_f);
    }

    assert_eq!(store.active_count(), 33);
    assert_eq!(store.capacity(), 64);

    let positions = store.active_positions();
    let masses = store.active_masses();
    for i in 0..33 {
        let i_f = i as f64;
        assert_eq!(positions[i], NVec3::new(i_f, -i_f, 0.5 * i_f));
        assert_eq!(masses[i], 1.0 + i_f);
    }
}

#[test]
fn store_reuses_first_free_slot() {
    let mut store = BodyStore::new(4, CapacityPolicy::Grow);
    store.add(NVec3::new(0.0, 0.0, 0.0), 1.0);
    store.add(NVec3::new(5.0, 0.0, 0.0), 1.0);
    store.add(NVec3::new(9.0, 0.0, 0.0), 1.0);

    assert_eq!(store.remove_nearest(&NVec3::new(4.0, 0.0, 0.0)), Some(1));
    assert_eq!(store.add(NVec3::new(1.0, 1.0, 1.0), 2.0), 1);
    assert_eq!(store.capacity(), 4);
}

#[test_log::test]
fn store_evicts_farthest_when_configured() {
    let mut store = BodyStore::new(2, CapacityPolicy::EvictFarthest);
    store.add(NVec3::new(1.0, 0.0, 0.0), 1.0);
    store.add(NVec3::new(5.0, 0.0, 0.0), 1.0);
    let slot = store.add(NVec3::new(0.0, 0.0, 0.0), 3.0);

    assert_eq!(slot, 1);
    assert_eq!(store.capacity(), 2);
    assert_eq!(store.active_count(), 2);

    let positions = store.active_positions();
    assert!(positions.contains(&NVec3::new(1.0, 0.0, 0.0)));
    assert!(positions.contains(&NVec3::new(0.0, 0.0, 0.0)));
    assert!(!positions.contains(&NVec3::new(5.0, 0.0, 0.0)));
}

#[test]
fn remove_nearest_on_empty_store_is_noop() {
    let mut mechanics = Mechanics::default();

    assert_eq!(mechanics.remove_nearest(&NVec3::new(1.0, 2.0, 3.0)), None);
    assert_eq!(mechanics.get_active_count(), 0);
}

#[test]
fn remove_nearest_ignores_inactive_slots() {
    let mut store = BodyStore::new(4, CapacityPolicy::Grow);
    store.add(NVec3::new(0.0, 0.0, 0.0), 1.0);
    store.add(NVec3::new(10.0, 0.0, 0.0), 1.0);

    let origin = NVec3::zeros();
    assert_eq!(store.remove_nearest(&origin), Some(0));
    // slot 0 still holds the closest position but is inactive now
    assert_eq!(store.remove_nearest(&origin), Some(1));
    assert_eq!(store.remove_nearest(&origin), None);
    assert_eq!(store.active_count(), 0);
}

#[test]
fn clear_empties_store_and_keeps_capacity() {
    let mut mechanics = Mechanics::new(Parameters {
        capacity: 4,
        ..Parameters::default()
    });
    for i in 0..10 {
        mechanics.add_body(NVec3::new(i as f64, 0.0, 0.0), 1.0).unwrap();
    }
    let capacity = mechanics.get_capacity();

    mechanics.clear();

    assert_eq!(mechanics.get_active_count(), 0);
    assert_eq!(mechanics.get_capacity(), capacity);
    assert!(mechanics.get_active_positions().is_empty());
}

/// Provider that hands back a single value for any batch
struct ConstantScalar(f64);

impl SurfaceFunction for ConstantScalar {
    fn evaluate(&self, _points: &[NVec2]) -> Vec<f64> {
        vec![self.0]
    }
    fn gradient_x(&self, points: &[NVec2]) -> Vec<f64> {
        vec![0.0; points.len()]
    }
    fn gradient_y(&self, points: &[NVec2]) -> Vec<f64> {
        vec![0.0; points.len()]
    }
    fn hessian_xx(&self, points: &[NVec2]) -> Vec<f64> {
        vec![0.0; points.len()]
    }
    fn hessian_yy(&self, points: &[NVec2]) -> Vec<f64> {
        vec![0.0; points.len()]
    }
    fn hessian_xy(&self, points: &[NVec2]) -> Vec<f64> {
        vec![0.0; points.len()]
    }
}

#[test]
fn single_value_provider_is_expanded_to_batch() {
    let s = ConstantScalar(-1.25);
    let points = grid(5);

    let values = build_values(&s, &points);
    assert_eq!(values, vec![-1.25; points.len()]);
    assert_eq!(build_values(&s, &points[..1]), vec![-1.25]);

    // z-correction snaps every body, not only the first, onto the floor
    let mut mechanics = Mechanics::default();
    mechanics.add_body(NVec3::new(0.2, 0.3, -1.25), 1.0).unwrap();
    mechanics.add_body(NVec3::new(-0.4, 0.1, 0.0), 1.0).unwrap();
    mechanics.update(0.01, &s, true);
    assert!(mechanics.get_active_positions().iter().all(|p| p.z == -1.25));
}

#[test]
fn add_body_rejects_invalid_mass() {
    let mut mechanics = Mechanics::default();
    let s = NVec3::zeros();

    assert_eq!(mechanics.add_body(s, 0.0), Err(MechanicsError::InvalidMass(0.0)));
    assert_eq!(mechanics.add_body(s, -2.0), Err(MechanicsError::InvalidMass(-2.0)));
    assert!(mechanics.add_body(s, f64::NAN).is_err());
    assert!(mechanics.add_body(NVec3::new(f64::INFINITY, 0.0, 0.0), 1.0).is_err());
    assert_eq!(mechanics.get_active_count(), 0);
}

#[test]
fn parameters_reject_non_finite_values() {
    let mut mechanics = Mechanics::default();

    assert!(mechanics.set_gravity(f64::NAN).is_err());
    assert!(mechanics.set_friction(f64::INFINITY).is_err());
    assert_eq!(mechanics.gravity(), Parameters::default().gravity);

    mechanics.set_gravity(9.81).unwrap();
    mechanics.set_friction(0.3).unwrap();
    assert_eq!(mechanics.gravity_vector(), NVec3::new(0.0, 0.0, -9.81));
    assert_eq!(mechanics.friction(), 0.3);
}

#[test]
fn parameters_validate_all_fields() {
    assert!(Parameters::default().validate().is_ok());
    assert!(params(f64::NAN, 0.0).validate().is_err());
    assert!(params(9.81, f64::INFINITY).validate().is_err());
    assert!(params(f64::NEG_INFINITY, 0.0).validate().is_err());
    assert!(params(0.0, 0.5).validate().is_ok());
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn update_without_bodies_is_noop() {
    let mut mechanics = Mechanics::default();
    mechanics.update(0.01, &surface("x^2"), true);

    assert_eq!(mechanics.get_active_count(), 0);
}

#[test]
fn body_at_rest_without_forces_stays_put() {
    let s = surface("0");
    let mut mechanics = Mechanics::new(params(0.0, 0.0));
    let start = NVec3::new(0.3, -0.2, 0.0);
    mechanics.add_body(start, 2.0).unwrap();

    for _ in 0..500 {
        mechanics.update(0.01, &s, true);
    }

    assert_eq!(mechanics.get_active_positions(), vec![start]);
    assert_eq!(mechanics.get_active_velocities(), vec![NVec3::zeros()]);
}

#[test]
fn body_at_rest_on_flat_ground_stays_put_under_gravity() {
    let s = surface("0");
    let mut mechanics = Mechanics::new(params(9.81, 0.5));
    let start = NVec3::new(-1.0, 1.0, 0.0);
    mechanics.add_body(start, 1.0).unwrap();

    for _ in 0..100 {
        mechanics.update(0.01, &s, false);
    }

    let s_end = mechanics.get_active_positions()[0];
    assert!((s_end - start).norm() < 1e-12);
}

#[test]
fn incline_accelerates_with_projected_gravity() {
    let s = surface("0.5*x");
    let p = params(9.81, 0.0);
    let mut mechanics = Mechanics::new(p.clone());
    mechanics.add_body(NVec3::new(1.0, 0.0, 0.5), 1.0).unwrap();
    mechanics.add_body(NVec3::new(1.0, 2.0, 0.5), 3.0).unwrap();

    // gravity projected into the tangent plane
    let z = NVec3::new(-0.5, 0.0, 1.0).normalize();
    let g = p.gravity_vector();
    let a = g - z * g.dot(&z);

    let (n, dt) = (100, 0.01);
    for _ in 0..n {
        mechanics.update(dt, &s, false);
    }

    for (v, s) in mechanics
        .get_active_velocities()
        .iter()
        .zip(mechanics.get_active_positions())
    {
        assert!((v - a * (n as f64) * dt).norm() < 1e-9, "v = {:?}", v);
        // tangential motion keeps the body on the plane
        assert!((s.z - 0.5 * s.x).abs() < 1e-9);
    }
}

#[test]
fn free_body_moves_in_straight_line() {
    let s = surface("0");
    let mut mechanics = Mechanics::new(params(0.0, 0.0));
    let start = NVec3::new(-1.0, 0.5, 0.0);
    let v0 = NVec3::new(1.0, 2.0, 0.0);
    mechanics.add_body_with_velocity(start, v0, 1.5).unwrap();

    let (n, dt) = (50, 0.02);
    for _ in 0..n {
        mechanics.update(dt, &s, true);
    }

    let v = mechanics.get_active_velocities()[0];
    let pos = mechanics.get_active_positions()[0];
    assert!((v - v0).norm() < 1e-12);
    assert!((pos - (start + v0 * (n as f64 * dt))).norm() < 1e-9);
}

#[test]
fn friction_is_proportional_to_normal_force() {
    let s = surface("0");
    let mut mechanics = Mechanics::new(params(10.0, 0.5));
    mechanics
        .add_body_with_velocity(NVec3::zeros(), NVec3::new(3.0, 0.0, 0.0), 2.0)
        .unwrap();

    // N = m g = 20, Fk = 0.5 * 20 = 10, a = -5
    mechanics.update(0.01, &s, true);

    let v = mechanics.get_active_velocities()[0];
    assert!((v.x - 2.95).abs() < 1e-12);
    assert_eq!(v.y, 0.0);
}

#[test]
fn normal_force_includes_centripetal_term() {
    let s = surface("-sqrt(1 - x^2 - y^2)");
    let p = params(9.81, 0.0);
    let positions = [NVec3::new(0.0, 0.0, -1.0)];
    let velocities = [NVec3::new(1.0, 0.0, 0.0)];
    let masses = [2.0];

    let forces = SurfaceForces::compute(&s, &p, &positions, &velocities, &masses);

    // radius 1: centripetal force m v^2 along +z
    assert!((forces.curvature[0] - 1.0).abs() < 1e-9);
    assert!((forces.centripetal[0] - NVec3::new(0.0, 0.0, 2.0)).norm() < 1e-9);
    // contact force carries the weight and the centripetal part
    assert!((forces.normal_force[0] - 2.0 * (1.0 + 9.81)).abs() < 1e-9);
    assert!(forces.gravity_tangent[0].norm() < 1e-12);
}

#[test]
fn infinite_velocity_components_are_reset() {
    let s = surface("0");
    let p = params(0.0, 0.0);
    let mut store = BodyStore::new(2, CapacityPolicy::Grow);
    store.add_with_velocity(NVec3::zeros(), NVec3::new(f64::INFINITY, 1.0, 0.0), 1.0);

    euler_integrator(&mut store, &s, &p, 0.1, true);

    assert_eq!(store.active_velocities(), vec![NVec3::new(0.0, 1.0, 0.0)]);
    let pos = store.active_positions()[0];
    assert!((pos - NVec3::new(0.0, 0.1, 0.0)).norm() < 1e-12);
}

#[test]
fn z_correction_snaps_to_surface() {
    let s = surface("x^2 + 0.5*y");
    let mut mechanics = Mechanics::new(params(9.81, 0.1));
    mechanics
        .add_body_with_velocity(NVec3::new(0.5, 0.0, 0.25), NVec3::new(0.3, -0.4, 0.0), 1.0)
        .unwrap();

    for _ in 0..20 {
        mechanics.update(0.01, &s, true);
        let pos = mechanics.get_active_positions()[0];
        assert_eq!(pos.z, s.value_at(pos.x, pos.y));
    }
}

#[test_log::test]
fn bodies_leaving_the_domain_are_removed() {
    let s = surface("-sqrt(1 - x^2 - y^2)");
    let mut mechanics = Mechanics::new(params(0.0, 0.0));
    mechanics
        .add_body_with_velocity(NVec3::new(0.9, 0.0, s.value_at(0.9, 0.0)), NVec3::new(5.0, 0.0, 0.0), 1.0)
        .unwrap();
    mechanics.add_body(NVec3::new(0.0, 0.0, -1.0), 1.0).unwrap();

    mechanics.update(0.1, &s, true);

    assert_eq!(mechanics.get_active_count(), 1);
    assert_eq!(mechanics.get_active_positions(), vec![NVec3::new(0.0, 0.0, -1.0)]);
}

// ==================================================================================
// Engine tests
// ==================================================================================

fn engine(expression: &str) -> Engine {
    Engine::new(expression, Domain::default(), Parameters::default(), true)
        .expect("test formula must parse")
}

#[test]
fn add_body_at_lifts_onto_surface() {
    let mut e = engine("x*y");
    e.add_body_at(2.0, 3.0, 1.0).unwrap();

    assert_eq!(e.snapshot().positions, vec![NVec3::new(2.0, 3.0, 6.0)]);
}

#[test_log::test]
fn failed_expression_keeps_surface_and_bodies() {
    let mut e = engine("x^2 + y^2");
    e.add_body_at(0.5, 0.5, 1.0).unwrap();
    e.add_body_at(-0.5, 0.5, 1.0).unwrap();

    let err = e.set_expression("sin(").unwrap_err();

    assert!(matches!(err, SurfaceError::Parse { .. }));
    assert_eq!(e.surface().source(), "x^2 + y^2");
    assert_eq!(e.mechanics().get_active_count(), 2);
    assert!(e.status().starts_with("Parsing failed"));
}

#[test_log::test]
fn new_expression_clears_bodies() {
    let mut e = engine("x^2 + y^2");
    e.add_body_at(0.5, 0.5, 1.0).unwrap();

    let status = e.set_expression("cos(x) * y").unwrap().to_string();

    assert_eq!(status, PARSE_OK);
    assert_eq!(e.mechanics().get_active_count(), 0);
    assert_eq!(e.surface().source(), "cos(x) * y");
}

#[test_log::test]
fn deeply_nested_expression_fails_like_any_parse_error() {
    let mut e = engine("x^2 + y^2");
    e.add_body_at(0.5, 0.5, 1.0).unwrap();

    let deep = format!("{}x{}", "(".repeat(5_000), ")".repeat(5_000));
    assert!(matches!(e.set_expression(&deep), Err(SurfaceError::Parse { .. })));
    assert_eq!(e.surface().source(), "x^2 + y^2");
    assert_eq!(e.mechanics().get_active_count(), 1);
}

#[test]
fn remove_nearest_at_uses_surface_point() {
    let mut e = engine("x");
    e.add_body_at(-2.0, 0.0, 1.0).unwrap();
    e.add_body_at(2.0, 0.0, 1.0).unwrap();

    assert_eq!(e.remove_nearest_at(1.5, 0.0), Some(1));
    assert_eq!(e.snapshot().positions, vec![NVec3::new(-2.0, 0.0, -2.0)]);
}

#[test]
fn domain_scaling_keeps_centre() {
    let d = Domain::new((0.0, 4.0), (-1.0, 1.0));

    let zoomed = d.scaled(0.5);
    assert_eq!(zoomed.x, (1.0, 3.0));
    assert_eq!(zoomed.y, (-0.5, 0.5));
    assert_eq!(zoomed.center(), d.center());

    let wide = d.scaled(2.0);
    assert_eq!(wide.x, (-2.0, 6.0));
    assert_eq!(wide.y, (-2.0, 2.0));
}

#[test]
fn domain_bounds_are_ordered() {
    let d = Domain::new((2.0, -1.0), (0.0, 3.0));

    assert_eq!(d.x, (-1.0, 2.0));
    assert_eq!(d.y, (0.0, 3.0));
    assert_eq!(d.center(), NVec2::new(0.5, 1.5));
    assert!(d.contains(&NVec2::new(0.0, 0.0)));
    assert!(!d.contains(&NVec2::new(2.5, 0.0)));

    let mut e = engine("x");
    e.set_domain((1.0, -1.0), (3.0, 2.0));
    assert_eq!(e.domain(), Domain::new((-1.0, 1.0), (2.0, 3.0)));
}

#[test]
fn derivative_listing_covers_all_partials() {
    let e = engine("x^2*y");
    let listing = e.derivative_listing();
    let labels: Vec<&str> = listing.iter().map(|(l, _)| *l).collect();

    assert_eq!(
        labels,
        ["f(x,y) =", "df/dx =", "df/dy =", "d2f/dx2 =", "d2f/dy2 =", "d2f/dxdy =",]
    );
    assert_eq!(listing[4].1, "0");
}

#[test]
fn snapshot_reports_counts() {
    let mut e = engine("0");
    for i in 0..3 {
        e.add_body_at(i as f64, 0.0, 1.0 + i as f64).unwrap();
    }
    e.step(0.01);

    let snapshot = e.snapshot();
    assert_eq!(snapshot.active, 3);
    assert_eq!(snapshot.capacity, Parameters::default().capacity);
    assert_eq!(snapshot.masses, vec![1.0, 2.0, 3.0]);
}

// ==================================================================================
// Surface mesh tests
// ==================================================================================

#[test]
fn mesh_has_one_vertex_per_sample() {
    let mesh = SurfaceMesh::sample(&surface("sin(x)*y"), &Domain::default(), 16);

    assert_eq!(mesh.resolution, 16);
    assert_eq!(mesh.positions.len(), 256);
    assert_eq!(mesh.normals.len(), 256);
    assert_eq!(mesh.triangle_count(), 2 * 15 * 15);
    assert!(mesh.indices.iter().all(|i| (*i as usize) < mesh.positions.len()));
}

#[test]
fn mesh_outside_surface_domain_stays_finite() {
    // the hemisphere is undefined over most of [-2, 2]^2
    let d = Domain::new((-2.0, 2.0), (-2.0, 2.0));
    let mesh = SurfaceMesh::sample(&surface("-sqrt(1 - x^2 - y^2)"), &d, 9);

    assert!(mesh.positions.iter().flatten().all(|c| c.is_finite()));
    assert!(mesh.normals.iter().flatten().all(|c| c.is_finite()));
    // corner (-2, -2) is drawn flat
    assert_eq!(mesh.positions[0], [-2.0, -2.0, 0.0]);
    assert_eq!(mesh.normals[0], [0.0, 0.0, 1.0]);
}

#[test]
fn mesh_resolution_has_a_floor() {
    let mesh = SurfaceMesh::sample(&surface("x"), &Domain::default(), 0);

    assert_eq!(mesh.resolution, 2);
    assert_eq!(mesh.triangle_count(), 2);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

const BOWL: &str = r#"
surface:
  expression: "x^2 + y^2"
  x_domain: [1.0, -1.0]
physics:
  gravity: 9.81
  friction: 0.0
  capacity: 2
run:
  dt: 0.01
  steps: 10
bodies:
  - xy: [0.5, 0.0]
    mass: 1.0
  - xy: [0.0, -0.5]
    mass: 2.0
    v: [1.0, 0.0, 0.0]
"#;

#[test]
fn scenario_from_yaml() {
    let cfg: ScenarioConfig = serde_yaml::from_str(BOWL).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();

    let engine = &scenario.engine;
    assert_eq!(engine.domain().x, (-1.0, 1.0));
    assert_eq!(engine.domain().y, (-PI, PI));
    assert!(engine.z_correction);
    assert_eq!(engine.mechanics().store().policy(), CapacityPolicy::Grow);
    assert_eq!(
        engine.snapshot().positions,
        vec![NVec3::new(0.5, 0.0, 0.25), NVec3::new(0.0, -0.5, 0.25)]
    );
    assert_eq!(engine.snapshot().velocities[1], NVec3::new(1.0, 0.0, 0.0));

    scenario.run_headless();
    assert!((scenario.t - 0.1).abs() < 1e-12);
    assert_eq!(scenario.engine.mechanics().get_active_count(), 2);
}

#[test]
fn scenario_rejects_bad_input() {
    let bad_formula = BOWL.replace("x^2 + y^2", "x^^2");
    let cfg: ScenarioConfig = serde_yaml::from_str(&bad_formula).unwrap();
    assert!(Scenario::build_scenario(cfg).is_err());

    let bad_mass = BOWL.replace("mass: 2.0", "mass: -2.0");
    let cfg: ScenarioConfig = serde_yaml::from_str(&bad_mass).unwrap();
    assert!(Scenario::build_scenario(cfg).is_err());

    let bad_dt = BOWL.replace("dt: 0.01", "dt: 0.0");
    let cfg: ScenarioConfig = serde_yaml::from_str(&bad_dt).unwrap();
    assert!(Scenario::build_scenario(cfg).is_err());

    let nan_gravity = BOWL.replace("gravity: 9.81", "gravity: .nan");
    let cfg: ScenarioConfig = serde_yaml::from_str(&nan_gravity).unwrap();
    assert!(Scenario::build_scenario(cfg).is_err());

    let inf_friction = BOWL.replace("friction: 0.0", "friction: .inf");
    let cfg: ScenarioConfig = serde_yaml::from_str(&inf_friction).unwrap();
    let err = Scenario::build_scenario(cfg).unwrap_err();
    assert!(format!("{err:#}").contains("friction"));
}

fn bowl_with_presets() -> Scenario {
    let yaml = BOWL.replace(
        "x_domain: [1.0, -1.0]",
        "x_domain: [1.0, -1.0]\n  presets: [\"x*y\", \"bad(\", \"cos(x)\"]",
    );
    let cfg: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
    Scenario::build_scenario(cfg).unwrap()
}

#[test_log::test]
fn next_surface_cycles_through_presets() {
    let mut scenario = bowl_with_presets();
    assert_eq!(scenario.surfaces(), ["x^2 + y^2", "x*y", "bad(", "cos(x)"]);
    assert_eq!(scenario.revision, 0);

    scenario.next_surface().unwrap();
    assert_eq!(scenario.engine.surface().source(), "x*y");
    assert_eq!(scenario.engine.mechanics().get_active_count(), 0);
    assert_eq!(scenario.engine.status(), PARSE_OK);
    assert_eq!(scenario.revision, 1);

    // a broken preset keeps what is loaded, bodies included
    scenario.engine.add_body_at(0.1, 0.2, 1.0).unwrap();
    assert!(scenario.next_surface().is_err());
    assert_eq!(scenario.engine.surface().source(), "x*y");
    assert_eq!(scenario.engine.mechanics().get_active_count(), 1);
    assert!(scenario.engine.status().starts_with("Parsing failed"));
    assert_eq!(scenario.revision, 1);

    scenario.next_surface().unwrap();
    assert_eq!(scenario.engine.surface().source(), "cos(x)");

    // wraps back to the scenario's own formula
    scenario.next_surface().unwrap();
    assert_eq!(scenario.engine.surface().source(), "x^2 + y^2");
    assert_eq!(scenario.revision, 3);
}

#[test]
fn next_surface_without_presets_is_noop() {
    let cfg: ScenarioConfig = serde_yaml::from_str(BOWL).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();

    scenario.next_surface().unwrap();
    assert_eq!(scenario.engine.surface().source(), "x^2 + y^2");
    assert_eq!(scenario.engine.mechanics().get_active_count(), 2);
    assert_eq!(scenario.revision, 0);
}

#[test_log::test]
fn zoom_scales_domain_about_centre() {
    let mut scenario = bowl_with_presets();

    scenario.zoom(0.5);
    assert_eq!(scenario.engine.domain().x, (-0.5, 0.5));
    assert_eq!(scenario.revision, 1);

    scenario.zoom(4.0);
    assert_eq!(scenario.engine.domain().x, (-2.0, 2.0));
    assert_eq!(scenario.revision, 2);

    // nonsense factors leave everything alone
    scenario.zoom(0.0);
    scenario.zoom(f64::NAN);
    assert_eq!(scenario.engine.domain().x, (-2.0, 2.0));
    assert_eq!(scenario.revision, 2);
}

// ==================================================================================
// Viewer controls
// ==================================================================================

#[test]
fn drop_mass_doubles_and_halves_within_range() {
    assert_eq!(next_drop_mass(10.0, true), 20.0);
    assert_eq!(next_drop_mass(10.0, false), 5.0);
    assert_eq!(next_drop_mass(800.0, true), 1000.0);
    assert_eq!(next_drop_mass(0.2, false), 0.125);
    assert_eq!(next_drop_mass(f64::INFINITY, true), 10.0);

    let mut m = 10.0;
    for _ in 0..20 {
        m = next_drop_mass(m, false);
    }
    assert_eq!(m, 0.125);
}

#[test]
fn capacity_policy_reads_from_yaml() {
    let evict = BOWL.replace("capacity: 2", "capacity: 2\n  capacity_policy: evict_farthest\n  z_correction: false");
    let cfg: ScenarioConfig = serde_yaml::from_str(&evict).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();

    assert_eq!(scenario.engine.mechanics().store().policy(), CapacityPolicy::EvictFarthest);
    assert!(!scenario.engine.z_correction);
}
