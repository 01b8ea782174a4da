//! The shipped renderer.toml must stay loadable.

use penumbra::{demo, FrameCompositor, RenderContext, RendererConfig, TargetSurface};

const SHIPPED: &str = include_str!("../data/renderer.toml");

#[test]
fn test_shipped_config_is_valid() {
    let config = RendererConfig::from_toml_str(SHIPPED).unwrap();
    config.validate().unwrap();
    assert_eq!(config.steps, 16);
    assert!((config.resolution_scale - 0.2).abs() < 1e-6);
    assert_eq!(config.volume_size, [15.0; 3]);
}

#[test]
fn test_shipped_config_survives_serialization() {
    let config = RendererConfig::from_toml_str(SHIPPED).unwrap();
    let text = toml::to_string(&config).unwrap();
    assert_eq!(RendererConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn test_demo_frame_with_shipped_config() {
    let mut config = RendererConfig::from_toml_str(SHIPPED).unwrap();
    config.density_field_size = 16;

    let mut ctx = RenderContext::new(TargetSurface::new(40, 24, 1.0).unwrap());
    let mut compositor = FrameCompositor::new(&mut ctx, config).unwrap();
    let scene = demo::stage(&compositor).unwrap();
    let camera = demo::camera(40.0 / 24.0);

    for expected in 0..2u64 {
        let report = compositor.render(&mut ctx, &scene, &camera).unwrap();
        assert_eq!(report.frame_index, expected);
    }
    assert_eq!(ctx.frame_extent(), (40, 24));
    assert_eq!(ctx.surface_texels().len(), 40 * 24);
}
