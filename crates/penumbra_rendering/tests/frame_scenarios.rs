//! # Frame Scenarios
//!
//! End-to-end behaviour of the compositor on the software device: zero
//! scattering without eligible lights, frame-to-frame stability, the
//! zero-intensity compose, resize, allocation isolation and failure paths.

use penumbra_procedural::{FieldSeed, NoiseFieldSynthesizer};
use penumbra_rendering::passes::volumetric::scattering_at;
use penumbra_rendering::{
    Camera, FrameCompositor, Layers, Light, RenderContext, RenderError, RendererConfig,
    Renderable, Scene, SoftwareDevice, TargetSurface, LAYER_VOLUMETRIC,
};

const WIDTH: u32 = 48;
const HEIGHT: u32 = 32;

/// Every output port of the default graph.
const PORTS: &[(&str, &str)] = &[
    ("pre_pass", "normal"),
    ("pre_pass", "velocity"),
    ("pre_pass", "depth"),
    ("ao", "ao"),
    ("scene", "color"),
    ("scene", "depth"),
    ("volumetric", "color"),
    ("denoise_h", "output"),
    ("denoise_v", "output"),
    ("upsample", "output"),
    ("scale", "output"),
    ("compose", "output"),
    ("traa", "color"),
    ("fxaa", "color"),
    ("display", "output"),
    ("present", "surface"),
];

fn config() -> RendererConfig {
    RendererConfig {
        density_field_size: 16,
        ..RendererConfig::default()
    }
}

fn context() -> RenderContext {
    RenderContext::new(TargetSurface::new(WIDTH, HEIGHT, 1.0).unwrap())
}

fn camera() -> Camera {
    Camera::perspective(60.0, 1.5, 0.1, 50.0).looking_at([0.0, 1.0, 8.0], [0.0; 3])
}

fn stage() -> Scene {
    let mut scene = Scene::new();
    scene.ambient = [0.05; 3];
    scene.elapsed = 1.25;
    scene.add_object(
        Renderable::plane(1, [0.0, -1.0, 0.0], [0.0, 1.0, 0.0]).with_albedo([0.8; 3]),
    );
    scene.add_object(Renderable::sphere(2, [0.0; 3], 1.0).casting_shadows());
    scene.add_light(Light::point([2.0, 3.0, 2.0], [1.0; 3], 20.0));
    scene
}

fn spot() -> Light {
    Light::spot([0.0, 4.0, 0.0], [0.0, -1.0, 0.0], [1.0, 0.9, 0.8], 40.0, 0.6)
}

fn has_light(rgb: &[[f32; 4]]) -> bool {
    rgb.iter().any(|t| t[0] > 0.0 || t[1] > 0.0 || t[2] > 0.0)
}

/// Test: Without volumetric-eligible lights the scattering output is zero.
#[test]
fn test_no_eligible_lights_scatter_nothing() {
    let mut ctx = context();
    let config = RendererConfig {
        steps: 16,
        smoke_amount: 0.25,
        intensity: 10.0,
        volume_size: [15.0, 15.0, 15.0],
        ..config()
    };
    let mut compositor = FrameCompositor::new(&mut ctx, config.clone()).unwrap();

    // The default-layer light still shades the scene.
    let scene = stage();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();

    let scattered = compositor.output_image(&ctx, "volumetric", "color").unwrap();
    assert!(!has_light(scattered.texels()));

    // The medium itself is not empty.
    let field = NoiseFieldSynthesizer::new(FieldSeed::new(config.seed))
        .build(16, &config.octave_scales, config.repeat_factor)
        .unwrap();
    assert!(scattering_at(&field, [1.0, 2.0, 3.0], scene.elapsed, config.smoke_amount) > 0.0);

    // Compose adds exactly nothing.
    assert_eq!(
        compositor.output_image(&ctx, "compose", "output"),
        compositor.output_image(&ctx, "scene", "color")
    );
}

/// Test: Two frames of an identical scene are pixel-identical.
#[test]
fn test_static_scene_is_pixel_stable() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();

    let mut scene = stage();
    let mut light = spot();
    compositor.enable_light_for_volumetric(&mut light).unwrap();
    scene.add_light(light);

    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    let first = ctx.surface_texels().to_vec();
    let scattered = compositor.output_image(&ctx, "volumetric", "color").unwrap();
    assert!(has_light(scattered.texels()));

    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    assert_eq!(ctx.surface_texels(), first.as_slice());

    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    assert_eq!(ctx.surface_texels(), first.as_slice());
}

/// Test: Zero intensity matches a graph without the volumetric chain.
#[test]
fn test_zero_intensity_matches_disabled_chain() {
    let mut scene = stage();
    let mut light = spot();
    light.layers.enable(LAYER_VOLUMETRIC);
    scene.add_light(light);

    let mut with_ctx = context();
    let mut with_chain = FrameCompositor::new(&mut with_ctx, config()).unwrap();
    with_chain.set_intensity(0.0).unwrap();

    let mut without_ctx = context();
    let mut without_chain = FrameCompositor::new(
        &mut without_ctx,
        RendererConfig {
            volumetric_enabled: false,
            ..config()
        },
    )
    .unwrap();
    assert!(!without_chain.execution_order().contains(&"compose"));

    for _ in 0..2 {
        with_chain.render(&mut with_ctx, &scene, &camera()).unwrap();
        without_chain.render(&mut without_ctx, &scene, &camera()).unwrap();
        assert_eq!(
            with_chain.output_image(&with_ctx, "fxaa", "color"),
            without_chain.output_image(&without_ctx, "fxaa", "color")
        );
        assert_eq!(with_ctx.surface_texels(), without_ctx.surface_texels());
    }
}

/// Test: Halving the surface halves every output.
#[test]
fn test_resize_halves_every_output() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    let scene = stage();

    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    let before: Vec<(u32, u32)> = PORTS
        .iter()
        .map(|(node, port)| compositor.output_extent(node, port).unwrap())
        .collect();
    let bytes_before = ctx.device().allocated_bytes();
    assert_eq!(before[0], (WIDTH, HEIGHT));
    assert_eq!(compositor.output_extent("volumetric", "color"), Some((12, 8)));

    compositor.on_resize(WIDTH / 2, HEIGHT / 2).unwrap();
    let report = compositor.render(&mut ctx, &scene, &camera()).unwrap();
    assert!(report.resized);
    assert_eq!(report.surface_extent, (WIDTH / 2, HEIGHT / 2));

    for ((node, port), old) in PORTS.iter().zip(before) {
        assert_eq!(
            compositor.output_extent(node, port),
            Some((old.0 / 2, old.1 / 2)),
            "{node}.{port}"
        );
    }
    assert_eq!(ctx.frame_extent(), (WIDTH / 2, HEIGHT / 2));
    assert_eq!(ctx.surface_texels().len(), (WIDTH * HEIGHT / 4) as usize);
    assert!(ctx.device().allocated_bytes() < bytes_before);
}

/// Test: A resize posted from another thread lands on the next frame only.
#[test]
fn test_resize_handle_across_threads() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    let scene = stage();

    let handle = compositor.resize_handle();
    std::thread::spawn(move || handle.request(32, 16).unwrap())
        .join()
        .unwrap();
    assert!(compositor.resize_handle().is_pending());

    let first = compositor.render(&mut ctx, &scene, &camera()).unwrap();
    assert!(first.resized);
    assert_eq!(first.surface_extent, (32, 16));
    let second = compositor.render(&mut ctx, &scene, &camera()).unwrap();
    assert!(!second.resized);
    assert_eq!(second.frame_index, first.frame_index + 1);
}

/// Test: Changing one resolution scale reallocates only that chain.
#[test]
fn test_resolution_scale_is_isolated() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    let scene = stage();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();

    let snapshot = |c: &FrameCompositor| -> Vec<Option<(u32, u32)>> {
        PORTS.iter().map(|(node, port)| c.output_extent(node, port)).collect()
    };
    let before = snapshot(&compositor);
    let textures = ctx.device().live_textures();

    compositor.set_resolution(0.5).unwrap();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    let after = snapshot(&compositor);

    // The blur nodes inherit the volumetric extent.
    let chain = ["volumetric", "denoise_h", "denoise_v"];
    for (i, (node, port)) in PORTS.iter().enumerate() {
        if chain.contains(node) {
            assert_eq!(after[i], Some((24, 16)), "{node}.{port}");
        } else {
            assert_eq!(after[i], before[i], "{node}.{port}");
        }
    }
    assert_eq!(ctx.device().live_textures(), textures);

    compositor.set_ao_resolution(0.25).unwrap();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    let ao_changed = snapshot(&compositor);
    for (i, (node, port)) in PORTS.iter().enumerate() {
        if *node == "ao" {
            assert_eq!(ao_changed[i], Some((12, 8)));
        } else {
            assert_eq!(ao_changed[i], after[i], "{node}.{port}");
        }
    }
}

/// Test: A single occlusion sample still darkens the sphere-floor crease.
#[test]
fn test_single_ao_sample_occludes() {
    let min_ao = |samples: u32| {
        let mut ctx = context();
        let config = RendererConfig {
            ao_samples: samples,
            ao_resolution_scale: 1.0,
            use_temporal_filtering: false,
            ..config()
        };
        let mut compositor = FrameCompositor::new(&mut ctx, config).unwrap();
        compositor.render(&mut ctx, &stage(), &camera()).unwrap();
        let ao = compositor.output_image(&ctx, "ao", "ao").unwrap();
        ao.texels().iter().map(|t| t[0]).fold(f32::INFINITY, f32::min)
    };

    let one = min_ao(1);
    let many = min_ao(16);
    assert!(one < 1.0, "min ao with one sample: {one}");
    assert!(many < 1.0, "min ao with 16 samples: {many}");
}

/// Test: Identical configurations produce identical orders.
#[test]
fn test_execution_order_is_stable() {
    let mut ctx = context();
    let mut a = FrameCompositor::new(&mut ctx, config()).unwrap();
    let b = FrameCompositor::new(&mut ctx, config()).unwrap();
    let order: Vec<String> = a.execution_order().iter().map(ToString::to_string).collect();
    assert_eq!(a.execution_order(), b.execution_order());

    a.render(&mut ctx, &stage(), &camera()).unwrap();
    a.set_steps(24).unwrap();
    a.render(&mut ctx, &stage(), &camera()).unwrap();
    assert_eq!(a.execution_order(), order);

    let names: Vec<&str> = PORTS.iter().map(|(node, _)| *node).collect();
    let mut expected = names.clone();
    expected.dedup();
    assert_eq!(a.execution_order(), expected);
}

/// Test: Fog behind an opaque surface contributes nothing.
#[test]
fn test_opaque_surface_occludes_fog() {
    let config = RendererConfig {
        volume_position: [0.0; 3],
        volume_size: [4.0; 3],
        ..config()
    };
    let view = Camera::perspective(60.0, 1.5, 0.1, 50.0).looking_at([0.0, 0.0, 10.0], [0.0; 3]);

    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config).unwrap();
    let mut light = Light::point([0.0; 3], [1.0; 3], 50.0);
    compositor.enable_light_for_volumetric(&mut light).unwrap();

    let mut open = Scene::new();
    open.add_light(light.clone());
    compositor.render(&mut ctx, &open, &view).unwrap();
    let lit = compositor.output_image(&ctx, "volumetric", "color").unwrap();
    assert!(has_light(lit.texels()));

    // A wall at z = 5 fills the view in front of the box (z <= 2).
    let mut walled = open.clone();
    walled.add_object(Renderable::plane(9, [0.0, 0.0, 5.0], [0.0, 0.0, 1.0]));
    compositor.render(&mut ctx, &walled, &view).unwrap();
    let hidden = compositor.output_image(&ctx, "volumetric", "color").unwrap();
    assert!(!has_light(hidden.texels()));
}

/// Test: Motion of an object shows up in the velocity buffer.
#[test]
fn test_moving_object_has_velocity() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    let mut scene = stage();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();

    let still = compositor.output_image(&ctx, "pre_pass", "velocity").unwrap();
    assert!(still.texels().iter().all(|t| t[0] == 0.0 && t[1] == 0.0));

    scene.objects[1].position = [0.5, 0.0, 0.0];
    compositor.render(&mut ctx, &scene, &camera()).unwrap();
    let moving = compositor.output_image(&ctx, "pre_pass", "velocity").unwrap();
    assert!(moving.texels().iter().any(|t| t[0] != 0.0));
}

/// Test: Dispose frees everything and poisons every later call.
#[test]
fn test_use_after_dispose() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    compositor.render(&mut ctx, &stage(), &camera()).unwrap();
    assert!(ctx.device().live_textures() > 0);

    compositor.dispose(&mut ctx).unwrap();
    assert!(compositor.is_disposed());
    assert_eq!(ctx.device().allocated_bytes(), 0);
    assert_eq!(ctx.device().live_textures(), 0);
    assert_eq!(ctx.device().live_volumes(), 0);

    let mut light = spot();
    assert_eq!(
        compositor.render(&mut ctx, &stage(), &camera()),
        Err(RenderError::UseAfterDispose)
    );
    assert_eq!(compositor.dispose(&mut ctx), Err(RenderError::UseAfterDispose));
    assert_eq!(compositor.set_steps(8), Err(RenderError::UseAfterDispose));
    assert_eq!(compositor.on_resize(8, 8), Err(RenderError::UseAfterDispose));
    assert_eq!(
        compositor.enable_light_for_volumetric(&mut light),
        Err(RenderError::UseAfterDispose)
    );
    assert_eq!(
        compositor.set_traa_enabled(&mut ctx, false),
        Err(RenderError::UseAfterDispose)
    );
}

/// Test: Exceeding the device budget aborts the frame with the resource named.
#[test]
fn test_resource_exhaustion() {
    let volume_bytes = 16 * 16 * 16;

    let mut tight = RenderContext::with_device(
        SoftwareDevice::with_memory_budget(volume_bytes - 1),
        TargetSurface::new(WIDTH, HEIGHT, 1.0).unwrap(),
    );
    let err = FrameCompositor::new(&mut tight, config()).err().unwrap();
    assert!(matches!(err, RenderError::ResourceExhaustion { .. }));
    assert!(!err.is_configuration());

    let mut ctx = RenderContext::with_device(
        SoftwareDevice::with_memory_budget(volume_bytes + 100),
        TargetSurface::new(WIDTH, HEIGHT, 1.0).unwrap(),
    );
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    match compositor.render(&mut ctx, &stage(), &camera()) {
        Err(RenderError::ResourceExhaustion {
            label,
            requested,
            budget,
            ..
        }) => {
            assert_eq!(label, "pre_pass.normal");
            assert_eq!(requested, u64::from(WIDTH * HEIGHT * 4));
            assert_eq!(budget, volume_bytes + 100);
        }
        other => panic!("expected resource exhaustion, got {other:?}"),
    }
    assert_eq!(ctx.frame_extent(), (0, 0));
}

/// Test: A lost device fails the next frame in the first pass.
#[test]
fn test_device_loss_aborts_frame() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    compositor.render(&mut ctx, &stage(), &camera()).unwrap();
    let presented = ctx.surface_texels().to_vec();

    ctx.device_mut().mark_lost();
    match compositor.render(&mut ctx, &stage(), &camera()) {
        Err(RenderError::BackendExecution { pass, .. }) => assert_eq!(pass, "pre_pass"),
        other => panic!("expected backend failure, got {other:?}"),
    }
    assert_eq!(ctx.surface_texels(), presented.as_slice());
    assert_eq!(compositor.frames_rendered(), 1);
}

/// Test: Enabling a light for the volumetric pass is idempotent.
#[test]
fn test_enable_light_is_idempotent() {
    let mut ctx = context();
    let compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    let mut light = spot();
    assert!(!light.layers.contains(LAYER_VOLUMETRIC));

    compositor.enable_light_for_volumetric(&mut light).unwrap();
    let once = light.clone();
    compositor.enable_light_for_volumetric(&mut light).unwrap();

    assert_eq!(light, once);
    assert_eq!(light.layers, Layers::default().with(LAYER_VOLUMETRIC));
    assert_eq!(light.layers.bits(), 1 | 1 << 10);
}

/// Test: Invalid values are rejected and leave state untouched.
#[test]
fn test_configuration_errors_are_not_clamped() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();

    assert!(compositor.set_steps(0).unwrap_err().is_configuration());
    assert_eq!(compositor.params().steps(), 12);
    assert!(compositor.set_resolution(0.0).is_err());
    assert!(compositor.set_resolution(1.5).is_err());
    assert!((compositor.params().volumetric_resolution() - 0.25).abs() < f32::EPSILON);
    assert!(compositor.on_resize(0, 10).is_err());
    assert!(compositor
        .reconfigure_volume(&mut ctx, [0.0; 3], [1.0, -1.0, 1.0])
        .is_err());

    let mut bad_camera = camera();
    bad_camera.near = 0.0;
    let err = compositor.render(&mut ctx, &stage(), &bad_camera).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(ctx.frame_extent(), (0, 0));

    let bad = RendererConfig {
        volume_size: [0.0, 1.0, 1.0],
        ..config()
    };
    assert!(FrameCompositor::new(&mut ctx, bad).err().unwrap().is_configuration());
}

/// Test: The pixel ratio is capped before sizing the frame.
#[test]
fn test_pixel_ratio_drives_physical_size() {
    let mut ctx = RenderContext::new(TargetSurface::new(24, 16, 3.0).unwrap());
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    compositor.render(&mut ctx, &stage(), &camera()).unwrap();
    assert_eq!(ctx.frame_extent(), (48, 32));
    assert_eq!(compositor.output_extent("present", "surface"), Some((48, 32)));
}

/// Test: Structural switches rebuild the graph and keep rendering.
#[test]
fn test_structural_reconfiguration() {
    let mut ctx = context();
    let mut compositor = FrameCompositor::new(&mut ctx, config()).unwrap();
    let scene = stage();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();

    compositor.set_volumetric_enabled(&mut ctx, false).unwrap();
    assert!(!compositor.execution_order().contains(&"volumetric"));
    compositor.render(&mut ctx, &scene, &camera()).unwrap();

    compositor.set_volumetric_enabled(&mut ctx, true).unwrap();
    compositor
        .reconfigure_volume(&mut ctx, [0.0, 1.0, 0.0], [6.0, 6.0, 6.0])
        .unwrap();
    assert_eq!(compositor.volume_bounds().size(), [6.0, 6.0, 6.0]);
    compositor.set_temporal_filtering(&mut ctx, false).unwrap();
    compositor.render(&mut ctx, &scene, &camera()).unwrap();

    // The density volume survives every rebuild.
    assert_eq!(ctx.device().live_volumes(), 1);
    assert_eq!(compositor.output_extent("volumetric", "color"), Some((12, 8)));
}
