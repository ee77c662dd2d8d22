use bevy::prelude::*;
use bevy::log::LogPlugin;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use log::{info, warn};

use crate::simulation::engine::{Domain, Engine};
use crate::simulation::scenario::Scenario;
use crate::simulation::states::{NVec2, NVec3};
use crate::visualization::surface_mesh::SurfaceMesh;

/// Component tagging each sphere with its index into the active body snapshot
#[derive(Component)]
struct BallIndex(pub usize);

/// Component tagging the drawn surface so it can be replaced
#[derive(Component)]
struct SurfaceEntity;

/// Shared sphere mesh and material for every ball
#[derive(Resource)]
struct BallAssets {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

/// Material reused every time the surface mesh is rebuilt
#[derive(Resource)]
struct SurfaceMaterial(Handle<StandardMaterial>);

/// Keyboard drop settings
#[derive(Resource)]
struct DropSettings {
    mass: f64,  // mass of the next dropped body (kg)
    drops: u64, // bodies dropped so far, seeds the drop point
}

/// Samples per axis of the drawn surface
const SURFACE_RESOLUTION: usize = 256;

/// Ball radius for a unit mass, scaled by cbrt(mass)
const BALL_SCALE: f32 = 0.05;

/// Initial mass of bodies dropped with the keyboard (kg)
const DROP_MASS: f64 = 10.0;

/// Drop mass range reachable with `+` / `-`
const DROP_MASS_RANGE: (f64, f64) = (0.125, 1000.0);

/// Domain scale per `[` / `]` press
const ZOOM_STEP: f64 = 1.25;

/// Longest frame time fed to the integrator (s)
const MAX_FRAME_DT: f64 = 1.0 / 30.0;

/// Simulation axes (z up) -> bevy axes (y up)
fn to_bevy(v: &NVec3) -> Vec3 {
    Vec3::new(v.x as f32, v.z as f32, -v.y as f32)
}

fn to_bevy_array(p: &[f32; 3]) -> [f32; 3] {
    [p[0], p[2], -p[1]]
}

pub fn run_viewer(scenario: Scenario) {
    info!(
        "run_viewer: starting Bevy 3D viewer with {} bodies",
        scenario.engine.mechanics().get_active_count()
    );
    info!("controls: space drop, backspace remove, c clear, z z-correction, arrows gravity/friction");
    info!("controls: tab next surface, [ ] zoom domain, + - drop mass");

    App::new()
        .insert_resource(scenario)
        .insert_resource(DropSettings { mass: DROP_MASS, drops: 0 })
        .insert_resource(ClearColor(Color::srgb(0.86, 0.87, 0.87)))
        // logging goes through env_logger, set up in main
        .add_plugins(DefaultPlugins.build().disable::<LogPlugin>())
        .add_systems(Startup, setup_scene)
        .add_systems(
            Update,
            (keyboard_controls, physics_step, refresh_surface, sync_balls).chain(),
        )
        .run();
}

/// Startup system: camera, light, axes and shared assets
fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    scenario: Res<Scenario>,
) {
    let engine = &scenario.engine;
    let domain = engine.domain();

    // the mesh itself is built by `refresh_surface` on the first frame
    commands.insert_resource(SurfaceMaterial(materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 1.0, 1.0),
        perceptual_roughness: 0.8,
        double_sided: true,
        cull_mode: None,
        ..Default::default()
    })));

    // camera framing the whole domain
    let span = ((domain.x.1 - domain.x.0).max(domain.y.1 - domain.y.0) as f32).max(1.0);
    let c = domain.center();
    let center = to_bevy(&engine.lift(c.x, c.y));
    commands.spawn(Camera3dBundle {
        transform: Transform::from_translation(center + Vec3::new(span, span, span))
            .looking_at(center, Vec3::Y),
        ..Default::default()
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 8000.0,
            ..Default::default()
        },
        transform: Transform::from_xyz(span, 2.0 * span, span).looking_at(Vec3::ZERO, Vec3::Y),
        ..Default::default()
    });

    spawn_axes(&mut commands, &mut meshes, &mut materials, span);

    commands.insert_resource(BallAssets {
        mesh: meshes.add(Sphere::new(1.0).mesh()),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.25, 0.25, 0.25),
            ..Default::default()
        }),
    });
}

/// Double or halve the drop mass, kept inside `DROP_MASS_RANGE`
pub fn next_drop_mass(mass: f64, heavier: bool) -> f64 {
    let (lo, hi) = DROP_MASS_RANGE;
    let m = if heavier { mass * 2.0 } else { mass * 0.5 };
    if m.is_finite() {
        m.clamp(lo, hi)
    } else {
        DROP_MASS
    }
}

/// Deterministic well-spread drop points over the domain (Weyl sequence)
fn drop_point(domain: &Domain, n: u64) -> NVec2 {
    let u = (n as f64 * 0.618_033_988_75).fract();
    let v = (n as f64 * 0.754_877_666_25).fract();
    NVec2::new(
        domain.x.0 + u * (domain.x.1 - domain.x.0),
        domain.y.0 + v * (domain.y.1 - domain.y.0),
    )
}

fn log_bodies(engine: &Engine) {
    let mechanics = engine.mechanics();
    info!("bodies {}/{}", mechanics.get_active_count(), mechanics.get_capacity());
}

fn keyboard_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut scenario: ResMut<Scenario>,
    mut settings: ResMut<DropSettings>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        // errors are logged by the scenario, the old surface stays
        let _ = scenario.next_surface();
    }
    if keys.just_pressed(KeyCode::BracketLeft) {
        scenario.zoom(ZOOM_STEP);
    }
    if keys.just_pressed(KeyCode::BracketRight) {
        scenario.zoom(1.0 / ZOOM_STEP);
    }

    for (key, heavier) in [(KeyCode::Equal, true), (KeyCode::Minus, false)] {
        if keys.just_pressed(key) {
            settings.mass = next_drop_mass(settings.mass, heavier);
            info!("drop mass = {} kg", settings.mass);
        }
    }

    let engine = &mut scenario.engine;

    if keys.just_pressed(KeyCode::Space) {
        settings.drops += 1;
        let p = drop_point(&engine.domain(), settings.drops);
        match engine.add_body_at(p.x, p.y, settings.mass) {
            Ok(slot) => {
                info!("drop {} kg at ({:.3}, {:.3}) into slot {slot}", settings.mass, p.x, p.y);
                log_bodies(engine);
            }
            Err(err) => warn!("drop rejected: {err}"),
        }
    }

    if keys.just_pressed(KeyCode::Backspace) {
        let c = engine.domain().center();
        if let Some(slot) = engine.remove_nearest_at(c.x, c.y) {
            info!("removed body in slot {slot}");
            log_bodies(engine);
        }
    }

    if keys.just_pressed(KeyCode::KeyC) {
        engine.clear();
        log_bodies(engine);
    }

    if keys.just_pressed(KeyCode::KeyZ) {
        engine.z_correction = !engine.z_correction;
        info!("z-correction: {}", engine.z_correction);
    }

    let mechanics = engine.mechanics_mut();
    let mut gravity = mechanics.gravity();
    let mut friction = mechanics.friction();

    if keys.just_pressed(KeyCode::ArrowUp) {
        gravity += 1.0;
    }
    if keys.just_pressed(KeyCode::ArrowDown) {
        gravity = (gravity - 1.0).max(0.0);
    }
    if keys.just_pressed(KeyCode::ArrowRight) {
        friction += 0.05;
    }
    if keys.just_pressed(KeyCode::ArrowLeft) {
        friction = (friction - 0.05).max(0.0);
    }

    if gravity != mechanics.gravity() || friction != mechanics.friction() {
        if let Err(err) = mechanics.set_gravity(gravity).and(mechanics.set_friction(friction)) {
            warn!("parameter rejected: {err}");
        }
        info!("gravity = {:.1} m/s^2, friction = {:.2}", mechanics.gravity(), mechanics.friction());
    }
}

/// Re-sample the surface mesh whenever the formula or domain changed
fn refresh_surface(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    scenario: Res<Scenario>,
    material: Option<Res<SurfaceMaterial>>,
    drawn: Query<Entity, With<SurfaceEntity>>,
    mut shown: Local<Option<u64>>,
) {
    let Some(material) = material else {
        return;
    };
    if *shown == Some(scenario.revision) {
        return;
    }

    for entity in &drawn {
        commands.entity(entity).despawn();
    }

    let engine = &scenario.engine;
    let sampled = SurfaceMesh::sample(engine.surface(), &engine.domain(), SURFACE_RESOLUTION);
    info!(
        "refresh_surface: z = {}, {} triangles",
        engine.surface().function(),
        sampled.triangle_count()
    );

    let positions: Vec<[f32; 3]> = sampled.positions.iter().map(to_bevy_array).collect();
    let normals: Vec<[f32; 3]> = sampled.normals.iter().map(to_bevy_array).collect();

    let mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(sampled.indices));

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(mesh),
            material: material.0.clone(),
            ..Default::default()
        },
        SurfaceEntity,
    ));

    *shown = Some(scenario.revision);
}

/// Per-frame physics integration with the real frame time
fn physics_step(time: Res<Time>, mut scenario: ResMut<Scenario>) {
    let dt = time.delta_seconds_f64().min(MAX_FRAME_DT);
    if dt > 0.0 {
        scenario.engine.step(dt);
        scenario.t += dt;
    }
}

/// Match ball entities to the active bodies and move them
fn sync_balls(
    mut commands: Commands,
    scenario: Res<Scenario>,
    assets: Option<Res<BallAssets>>,
    mut query: Query<(Entity, &BallIndex, &mut Transform)>,
) {
    let Some(assets) = assets else {
        return;
    };
    let snapshot = scenario.engine.snapshot();
    let mut seen = vec![false; snapshot.active];

    for (entity, BallIndex(i), mut transform) in &mut query {
        match snapshot.positions.get(*i) {
            Some(s) => {
                let radius = BALL_SCALE * (snapshot.masses[*i] as f32).cbrt();
                // sit on top of the surface rather than inside it
                transform.translation = to_bevy(s) + Vec3::Y * radius;
                transform.scale = Vec3::splat(radius);
                seen[*i] = true;
            }
            None => commands.entity(entity).despawn(),
        }
    }

    for (i, _) in seen.iter().enumerate().filter(|(_, s)| !**s) {
        let radius = BALL_SCALE * (snapshot.masses[i] as f32).cbrt();
        commands.spawn((
            PbrBundle {
                mesh: assets.mesh.clone(),
                material: assets.material.clone(),
                transform: Transform::from_translation(to_bevy(&snapshot.positions[i]) + Vec3::Y * radius)
                    .with_scale(Vec3::splat(radius)),
                ..Default::default()
            },
            BallIndex(i),
        ));
    }
}

// =========================================================================================
// Draw 3D axes for visual reference
// =========================================================================================

fn spawn_axes(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    span: f32,
) {
    let axis_len = 1.2 * span;
    let axis_thickness = 0.005 * span;

    // simulation x (red), y (green), z (blue) in bevy axes
    let axes = [
        (Vec3::new(axis_len, axis_thickness, axis_thickness), Color::srgb(1.0, 0.0, 0.0)),
        (Vec3::new(axis_thickness, axis_thickness, axis_len), Color::srgb(0.0, 1.0, 0.0)),
        (Vec3::new(axis_thickness, axis_len, axis_thickness), Color::srgb(0.0, 0.0, 1.0)),
    ];

    for (size, color) in axes {
        commands.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::new(size.x, size.y, size.z).mesh()),
            material: materials.add(StandardMaterial {
                base_color: color,
                unlit: true,
                ..Default::default()
            }),
            // Cuboid is centered at its transform origin, so this crosses the world origin
            transform: Transform::from_xyz(0.0, 0.0, 0.0),
            ..Default::default()
        });
    }
}
