//! Presentation surface and the host-owned render context.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Image, SoftwareDevice};
use crate::error::{RenderError, RenderResult};

/// Largest device pixel ratio the surface honors.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Display target size in CSS pixels plus a device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSurface {
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

impl TargetSurface {
    /// Creates a surface. Pixel ratios above [`MAX_PIXEL_RATIO`] are capped.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` for a zero dimension or a
    /// non-positive pixel ratio.
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> RenderResult<Self> {
        validate_size(width, height)?;
        if !(pixel_ratio > 0.0 && pixel_ratio.is_finite()) {
            return Err(RenderError::config(format!(
                "pixel ratio must be positive, got {pixel_ratio}"
            )));
        }
        Ok(Self {
            width,
            height,
            pixel_ratio: pixel_ratio.min(MAX_PIXEL_RATIO),
        })
    }

    /// Same pixel ratio, new CSS size.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` for a zero dimension.
    pub fn resized(&self, width: u32, height: u32) -> RenderResult<Self> {
        Self::new(width, height, self.pixel_ratio)
    }

    /// CSS width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// CSS height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Effective (capped) pixel ratio.
    #[must_use]
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Physical size in device pixels.
    #[must_use]
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).floor() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    /// Physical width over height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.physical_size();
        w as f32 / h as f32
    }
}

pub(crate) fn validate_size(width: u32, height: u32) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::config(format!(
            "surface size must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Device, surface and last presented frame, created and owned by the host.
pub struct RenderContext {
    device: SoftwareDevice,
    surface: TargetSurface,
    frame: Vec<[u8; 4]>,
    frame_extent: (u32, u32),
}

impl RenderContext {
    /// Context on a fresh unbudgeted device.
    #[must_use]
    pub fn new(surface: TargetSurface) -> Self {
        Self::with_device(SoftwareDevice::new(), surface)
    }

    /// Context on an existing device.
    #[must_use]
    pub fn with_device(device: SoftwareDevice, surface: TargetSurface) -> Self {
        Self {
            device,
            surface,
            frame: Vec::new(),
            frame_extent: (0, 0),
        }
    }

    /// The device.
    #[must_use]
    pub fn device(&self) -> &SoftwareDevice {
        &self.device
    }

    /// Mutable device access.
    pub fn device_mut(&mut self) -> &mut SoftwareDevice {
        &mut self.device
    }

    /// The presentation surface.
    #[must_use]
    pub fn surface(&self) -> &TargetSurface {
        &self.surface
    }

    pub(crate) fn set_surface(&mut self, surface: TargetSurface) {
        self.surface = surface;
    }

    /// sRGB-encoded RGBA8 pixels of the last presented frame, row-major.
    #[must_use]
    pub fn surface_texels(&self) -> &[[u8; 4]] {
        &self.frame
    }

    /// Size of the last presented frame; `(0, 0)` before the first frame.
    #[must_use]
    pub fn frame_extent(&self) -> (u32, u32) {
        self.frame_extent
    }

    /// Copies an already encoded `[0, 1]` image to the presented frame.
    pub(crate) fn present(&mut self, image: &Image) {
        self.frame.clear();
        self.frame.extend(image.texels().iter().map(|t| {
            let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            [byte(t[0]), byte(t[1]), byte(t[2]), byte(t[3])]
        }));
        self.frame_extent = image.extent();
    }
}

/// Cloneable handle that posts a resize for the next frame.
///
/// Host event handlers may live on another thread; the size is applied
/// at the start of the following `render` call, before any allocation.
#[derive(Debug, Clone, Default)]
pub struct ResizeHandle {
    pending: Arc<Mutex<Option<(u32, u32)>>>,
}

impl ResizeHandle {
    /// Posts a new CSS size; later requests replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` for a zero dimension.
    pub fn request(&self, width: u32, height: u32) -> RenderResult<()> {
        validate_size(width, height)?;
        *self.pending.lock() = Some((width, height));
        Ok(())
    }

    /// True if a resize is waiting for the next frame.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    pub(crate) fn take(&self) -> Option<(u32, u32)> {
        self.pending.lock().take()
    }
}
