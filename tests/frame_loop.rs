//! Drives the frame loop end to end without a GPU.

use planetfolio::scene::{BlendMaterial, build_scene};
use planetfolio::{
    AppConfig, AssetConfig, InputAction, InteractionEvent, SceneContext, StateId, Vec3,
    Visibility, load_content,
};

const EPS: f32 = 1e-4;

fn loaded_context() -> SceneContext {
    let config = AppConfig {
        assets: AssetConfig {
            grass_count: 50,
            ..Default::default()
        },
        ..Default::default()
    };
    let records = load_content(None).unwrap();
    let scene = build_scene(&config.assets).unwrap();
    let mut ctx = SceneContext::new(config, records);
    ctx.install_scene(scene);
    ctx
}

fn opacity(report: &planetfolio::FrameReport, id: &StateId) -> (f32, Visibility) {
    report
        .overlays
        .iter()
        .find(|(state, _)| state == id)
        .map(|(_, o)| (o.opacity, o.visibility))
        .unwrap()
}

fn assert_vec_eq(a: Vec3, b: Vec3) {
    assert!((a - b).length() < EPS, "{a:?} != {b:?}");
}

#[test]
fn home_to_about_end_to_end() {
    let mut ctx = loaded_context();
    let home = ctx.config().states.get(&StateId::home()).unwrap().camera;
    let about = ctx.config().states.get(&StateId::about()).unwrap().camera;

    let report = ctx.tick(0.0);
    assert!(report.loaded);
    assert_vec_eq(ctx.camera().position, home.position);
    assert_eq!(opacity(&report, &StateId::home()), (1.0, Visibility::Visible));

    assert!(ctx.select_state(&StateId::about()));
    assert!(ctx.interaction().is_locked());

    // Halfway through both the fade and the camera move.
    let report = ctx.tick(1.5);
    let (home_opacity, _) = opacity(&report, &StateId::home());
    assert!((home_opacity - 0.5).abs() < EPS);
    assert_vec_eq(
        ctx.camera().position,
        home.position + (about.position - home.position) * 0.5,
    );
    assert_vec_eq(
        ctx.camera().target,
        home.look_at + (about.look_at - home.look_at) * 0.5,
    );

    // Fade-out done: Home hidden, About starts from zero, lock released.
    let report = ctx.tick(3.0);
    assert_eq!(opacity(&report, &StateId::home()), (0.0, Visibility::Hidden));
    assert_eq!(opacity(&report, &StateId::about()), (0.0, Visibility::Visible));
    assert!(!ctx.interaction().is_locked());
    assert_eq!(ctx.camera().position, about.position);
    assert_eq!(ctx.camera().target, about.look_at);
    assert_eq!(ctx.camera().fov, about.fov);

    let report = ctx.tick(4.5);
    let (about_opacity, _) = opacity(&report, &StateId::about());
    assert!((about_opacity - 0.5).abs() < EPS);

    let report = ctx.tick(6.0);
    assert_eq!(opacity(&report, &StateId::about()), (1.0, Visibility::Visible));
    assert!(report.events.contains(&InteractionEvent::OverlayShown(StateId::about())));
}

#[test]
fn second_request_during_transition_is_dropped() {
    let mut ctx = loaded_context();
    let about = ctx.config().states.get(&StateId::about()).unwrap().camera;
    ctx.tick(0.0);

    assert!(ctx.select_state(&StateId::about()));
    assert!(!ctx.select_state(&StateId::work()));
    assert!(!ctx.apply_input(InputAction::SelectState(StateId::home())));

    let mut events = Vec::new();
    for step in 1..=25 {
        events.extend(ctx.tick(step as f64 * 0.25).events);
    }
    assert_eq!(ctx.interaction().state(), &StateId::about());
    assert_eq!(ctx.camera().position, about.position);

    let hides = events
        .iter()
        .filter(|e| matches!(e, InteractionEvent::OverlayHidden(_)))
        .count();
    let shows = events
        .iter()
        .filter(|e| matches!(e, InteractionEvent::OverlayShown(_)))
        .count();
    assert_eq!((hides, shows), (1, 1));
}

#[test]
fn resize_updates_every_material_once() {
    let mut ctx = loaded_context();
    ctx.request_resize(800, 600);
    assert_eq!(ctx.tick(0.0).resized, Some(2));

    ctx.request_resize(1600, 1200);
    assert_eq!(ctx.tick(0.016).resized, Some(2));
    for material in [BlendMaterial::Water, BlendMaterial::Grass] {
        let uniforms = ctx.materials().get(material).unwrap();
        assert_eq!(uniforms.screen_size, [1600.0, 1200.0, 1.0 / 1600.0, 1.0 / 1200.0]);
    }
    assert_eq!(ctx.tick(0.032).resized, None);
}

#[test]
fn clicking_a_label_opens_and_escape_closes_it() {
    let mut ctx = loaded_context();
    let report = ctx.tick(0.0);
    let coral = report.placements.iter().find(|p| p.item == 1).unwrap();
    assert!(coral.is_facing());
    let target_rotation = ctx.records()[1].planet_rotation;

    assert!(!ctx.apply_input(InputAction::PointerDown(coral.screen)));
    assert!(ctx.apply_input(InputAction::PointerUp(coral.screen)));
    assert!(!ctx.drag().horizontal_enabled());

    let report = ctx.tick(1.0);
    assert_eq!(report.popup, Some(1));
    // Labels under the open popup are hidden and cannot be picked.
    assert_eq!(report.label_opacity, 0.0);
    assert!(report.placements.iter().all(|p| ctx.label_at(p.screen).is_none()));

    ctx.tick(3.0);
    assert!(!ctx.interaction().is_locked());
    let planet = ctx.handles().unwrap().planet.0;
    let rotation = ctx.graph().unwrap().node(planet).unwrap().transform.rotation.y;
    assert!((rotation - target_rotation).abs() < EPS);

    assert!(ctx.apply_input(InputAction::Dismiss));
    assert!(ctx.drag().horizontal_enabled());
    let report = ctx.tick(3.5);
    assert_eq!(report.popup, None);
}

#[test]
fn labels_ignore_clicks_outside_home() {
    let mut ctx = loaded_context();
    ctx.tick(0.0);
    assert!(ctx.select_state(&StateId::about()));

    let mut report = ctx.tick(0.0);
    for step in 1..=30 {
        report = ctx.tick(step as f64 * 0.25);
    }
    assert_eq!(
        opacity(&report, &StateId::home()),
        (0.0, Visibility::Hidden)
    );
    assert_eq!(report.label_opacity, 0.0);

    let label = report
        .placements
        .iter()
        .find(|p| p.is_facing())
        .or(report.placements.first())
        .unwrap();
    assert_eq!(ctx.label_at(label.screen), None);
    assert!(!ctx.apply_input(InputAction::PointerDown(label.screen)));
    assert!(!ctx.apply_input(InputAction::PointerUp(label.screen)));
    assert_eq!(ctx.tick(7.75).popup, None);
    assert_eq!(ctx.interaction().focused_item(), None);
}

#[test]
fn drag_spins_the_planet() {
    let mut ctx = loaded_context();
    ctx.tick(0.0);
    let planet = ctx.handles().unwrap().planet.0;
    let before = ctx.graph().unwrap().node(planet).unwrap().transform.rotation.y;

    ctx.apply_input(InputAction::PointerDown([100.0, 100.0].into()));
    ctx.apply_input(InputAction::PointerMove([120.0, 100.0].into()));
    // A drag is not a click.
    assert!(!ctx.apply_input(InputAction::PointerUp([120.0, 100.0].into())));
    ctx.tick(0.0);

    let after = ctx.graph().unwrap().node(planet).unwrap().transform.rotation.y;
    let speed = ctx.drag().rotation_speed;
    assert!((after - before - 20.0 * speed).abs() < EPS);
}
