//! # Reference Stage
//!
//! The scene the renderer was tuned on: a sphere on a floor in front of a
//! back wall, lit by two broad point lights and a warm fill, with a
//! narrow teal spot behind the wall shining through the fog toward the
//! origin. Only the spot takes part in the volumetric pass.

use penumbra_rendering::math::Vec3;
use penumbra_rendering::{
    Background, Camera, FrameCompositor, Light, RenderResult, Renderable, Scene,
};

/// Object ids of the stage.
pub mod ids {
    /// Floor plane.
    pub const FLOOR: u32 = 1;
    /// Back wall.
    pub const WALL: u32 = 2;
    /// Centerpiece.
    pub const SPHERE: u32 = 3;
}

/// Index of the fill light in [`Scene::lights`]; [`follow_pointer`] moves it.
pub const FILL_LIGHT: usize = 2;

/// Linear RGB of an sRGB hex color such as `0x45ffb8`.
#[must_use]
pub fn hex_color(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let v = ((hex >> shift) & 0xff) as f32 / 255.0;
        if v <= 0.040_45 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

/// Camera framing the stage at `aspect`.
#[must_use]
pub fn camera(aspect: f32) -> Camera {
    Camera::perspective(45.0, aspect, 0.01, 100.0).looking_at([0.0, -0.5, 8.0], [0.0; 3])
}

/// Builds the stage and registers its spot light with `compositor`'s
/// volumetric pass.
///
/// # Errors
///
/// Fails only if `compositor` was disposed.
pub fn stage(compositor: &FrameCompositor) -> RenderResult<Scene> {
    let mut scene = Scene::new();
    scene.ambient = [0.05; 3];
    scene.background = Background {
        top: hex_color(0x08_291d),
        bottom: hex_color(0x04_7b4e),
    };

    scene
        .add_object(
            Renderable::plane(ids::FLOOR, [0.0, -1.0, 0.0], [0.0, 1.0, 0.0])
                .with_albedo([0.75; 3]),
        )
        .add_object(
            Renderable::plane(ids::WALL, [0.0, 0.0, -3.0], [0.0, 0.0, 1.0])
                .with_albedo([0.75; 3]),
        )
        .add_object(
            Renderable::sphere(ids::SPHERE, [0.0, 0.0, 0.0], 1.0)
                .with_albedo([0.9; 3])
                .casting_shadows(),
        );

    scene
        .add_light(
            Light::point([-4.0, 4.0, 1.0], [1.0; 3], 3.0)
                .with_distance(400.0)
                .with_decay(0.0)
                .casting_shadows(),
        )
        .add_light(
            Light::point([8.0, 4.0, 2.0], hex_color(0x92_c17b), 3.0)
                .with_distance(400.0)
                .with_decay(0.0)
                .casting_shadows(),
        )
        .add_light(
            Light::point([0.0, 0.0, 3.0], hex_color(0xde_c400), 2.0)
                .with_distance(20.0)
                .casting_shadows(),
        );

    let mut spot = Light::spot(
        [-1.5, 0.5, -8.0],
        [0.0; 3],
        hex_color(0x45_ffb8),
        10.0,
        std::f32::consts::PI / 16.0,
    )
    .with_penumbra(1.0)
    .with_decay(1.5)
    .casting_shadows();
    compositor.enable_light_for_volumetric(&mut spot)?;
    scene.add_light(spot);

    tracing::debug!(
        objects = scene.objects.len(),
        lights = scene.lights.len(),
        "demo stage built"
    );
    Ok(scene)
}

/// Moves the fill light toward a pointer at normalized device coordinates
/// `ndc` in `[-1, 1]²`, easing by `blend` in `[0, 1]`.
pub fn follow_pointer(scene: &mut Scene, ndc: [f32; 2], blend: f32) {
    if let Some(light) = scene.lights.get_mut(FILL_LIGHT) {
        let target = [ndc[0] * 3.0, ndc[1] * 2.0, 3.0];
        for (p, t) in light.position.iter_mut().zip(target) {
            *p += (t - *p) * blend.clamp(0.0, 1.0);
        }
    }
}
