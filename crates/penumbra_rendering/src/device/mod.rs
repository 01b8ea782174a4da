//! # Software Device
//!
//! Reference backend that executes every pass on the CPU.
//!
//! Resources are described with wgpu's descriptor vocabulary (formats,
//! extents, dimensions) so the same graph can be bound to a GPU device;
//! storage is plain `f32` RGBA. Unorm formats are quantized on write so
//! stored values match what an 8-bit GPU target would hold.
//!
//! ## Failure modes
//!
//! - **Memory budget**: allocations beyond the budget fail with
//!   `DeviceError::OutOfMemory` and leave the device unchanged.
//! - **Device loss**: after `mark_lost`, every allocation and write fails.

pub mod image;
pub mod surface;

pub use image::{Image, Texel};
pub use surface::{RenderContext, ResizeHandle, TargetSurface, MAX_PIXEL_RATIO};

use std::collections::BTreeMap;

use penumbra_procedural::DensityField;
use thiserror::Error;
use wgpu::{Extent3d, TextureDimension, TextureFormat};

/// Errors reported by the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Allocation would exceed the memory budget.
    #[error("allocation of '{label}' ({requested} bytes) exceeds budget ({in_use}/{budget} in use)")]
    OutOfMemory {
        /// Resource label.
        label: String,
        /// Bytes requested.
        requested: u64,
        /// Bytes already allocated.
        in_use: u64,
        /// Budget in bytes.
        budget: u64,
    },

    /// The device was lost; nothing can be submitted.
    #[error("device lost")]
    Lost,

    /// The handle does not name a live texture.
    #[error("unknown texture #{0}")]
    UnknownTexture(u32),

    /// The handle does not name a live volume.
    #[error("unknown volume #{0}")]
    UnknownVolume(u32),

    /// A write did not match the texture's extent.
    #[error("extent mismatch writing '{label}': texture is {expected:?}, data is {actual:?}")]
    ExtentMismatch {
        /// Texture label.
        label: String,
        /// Texture extent.
        expected: (u32, u32),
        /// Supplied extent.
        actual: (u32, u32),
    },
}

/// Handle to a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

/// Handle to a 3D volume texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(u32);

/// Texture descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    /// Debug label, `node.port` for pass outputs.
    pub label: String,
    /// Texel format.
    pub format: TextureFormat,
    /// Size in texels.
    pub size: Extent3d,
    /// 2D or 3D.
    pub dimension: TextureDimension,
}

impl TextureDesc {
    /// 2D texture descriptor.
    #[must_use]
    pub fn new_2d(label: impl Into<String>, format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            format,
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            dimension: TextureDimension::D2,
        }
    }

    /// Cubic 3D texture descriptor.
    #[must_use]
    pub fn new_3d(label: impl Into<String>, format: TextureFormat, edge: u32) -> Self {
        Self {
            label: label.into(),
            format,
            size: Extent3d {
                width: edge,
                height: edge,
                depth_or_array_layers: edge,
            },
            dimension: TextureDimension::D3,
        }
    }

    /// Storage footprint in bytes.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        u64::from(self.size.width)
            * u64::from(self.size.height)
            * u64::from(self.size.depth_or_array_layers)
            * bytes_per_texel(self.format)
    }
}

/// Bytes one texel occupies in `format`.
#[must_use]
pub fn bytes_per_texel(format: TextureFormat) -> u64 {
    match format {
        TextureFormat::R8Unorm => 1,
        TextureFormat::R16Float | TextureFormat::Rg8Unorm => 2,
        TextureFormat::Rg16Float
        | TextureFormat::R32Float
        | TextureFormat::Rgba8Unorm
        | TextureFormat::Rgba8UnormSrgb
        | TextureFormat::Depth32Float => 4,
        TextureFormat::Rgba16Float | TextureFormat::Rg32Float => 8,
        _ => 16,
    }
}

/// True for 8-bit normalized formats, which quantize on write.
#[must_use]
pub fn is_unorm8(format: TextureFormat) -> bool {
    matches!(
        format,
        TextureFormat::R8Unorm
            | TextureFormat::Rg8Unorm
            | TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
    )
}

struct Texture {
    desc: TextureDesc,
    image: Image,
}

struct Volume {
    desc: TextureDesc,
    field: DensityField,
}

/// CPU device with budgeted texture memory.
#[derive(Default)]
pub struct SoftwareDevice {
    textures: BTreeMap<TextureId, Texture>,
    volumes: BTreeMap<VolumeId, Volume>,
    next_id: u32,
    allocated: u64,
    budget: Option<u64>,
    lost: bool,
    writes: u64,
}

impl SoftwareDevice {
    /// Device without a memory budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that refuses allocations past `bytes`.
    #[must_use]
    pub fn with_memory_budget(bytes: u64) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Memory budget, if any.
    #[must_use]
    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Bytes held by live textures and volumes.
    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    /// Number of live 2D textures.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live volumes.
    #[must_use]
    pub fn live_volumes(&self) -> usize {
        self.volumes.len()
    }

    /// Texture writes since creation.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Simulates device loss; every later submission fails.
    pub fn mark_lost(&mut self) {
        if !self.lost {
            tracing::warn!("software device marked lost");
        }
        self.lost = true;
    }

    /// True after [`SoftwareDevice::mark_lost`].
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    fn reserve(&mut self, desc: &TextureDesc) -> Result<u32, DeviceError> {
        if self.lost {
            return Err(DeviceError::Lost);
        }
        let requested = desc.byte_len();
        if let Some(budget) = self.budget {
            if self.allocated + requested > budget {
                return Err(DeviceError::OutOfMemory {
                    label: desc.label.clone(),
                    requested,
                    in_use: self.allocated,
                    budget,
                });
            }
        }
        self.allocated += requested;
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Allocates a zero-filled 2D texture.
    ///
    /// # Errors
    ///
    /// Fails if the device is lost or the budget would be exceeded.
    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureId, DeviceError> {
        let id = TextureId(self.reserve(&desc)?);
        tracing::trace!(label = %desc.label, bytes = desc.byte_len(), "texture created");
        let image = Image::new(desc.size.width, desc.size.height);
        self.textures.insert(id, Texture { desc, image });
        Ok(id)
    }

    /// Uploads a density field as an `R8Unorm` 3D texture.
    ///
    /// # Errors
    ///
    /// Fails if the device is lost or the budget would be exceeded.
    pub fn create_volume(
        &mut self,
        label: impl Into<String>,
        field: DensityField,
    ) -> Result<VolumeId, DeviceError> {
        let desc = TextureDesc::new_3d(label, TextureFormat::R8Unorm, field.size());
        let id = VolumeId(self.reserve(&desc)?);
        tracing::debug!(label = %desc.label, bytes = desc.byte_len(), "volume uploaded");
        self.volumes.insert(id, Volume { desc, field });
        Ok(id)
    }

    /// Frees a texture. Returns false if it was not live.
    pub fn release_texture(&mut self, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(texture) => {
                self.allocated -= texture.desc.byte_len();
                true
            }
            None => false,
        }
    }

    /// Frees a volume. Returns false if it was not live.
    pub fn release_volume(&mut self, id: VolumeId) -> bool {
        match self.volumes.remove(&id) {
            Some(volume) => {
                self.allocated -= volume.desc.byte_len();
                true
            }
            None => false,
        }
    }

    /// Descriptor of a live texture.
    #[must_use]
    pub fn descriptor(&self, id: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&id).map(|t| &t.desc)
    }

    /// Contents of a live texture.
    ///
    /// # Errors
    ///
    /// Fails if the handle is stale.
    pub fn texture(&self, id: TextureId) -> Result<&Image, DeviceError> {
        self.textures
            .get(&id)
            .map(|t| &t.image)
            .ok_or(DeviceError::UnknownTexture(id.0))
    }

    /// Contents of a live volume.
    ///
    /// # Errors
    ///
    /// Fails if the handle is stale.
    pub fn volume(&self, id: VolumeId) -> Result<&DensityField, DeviceError> {
        self.volumes
            .get(&id)
            .map(|v| &v.field)
            .ok_or(DeviceError::UnknownVolume(id.0))
    }

    /// Replaces a texture's contents.
    ///
    /// # Errors
    ///
    /// Fails if the device is lost, the handle is stale, or the image
    /// extent differs from the texture's.
    pub fn write_texture(&mut self, id: TextureId, mut image: Image) -> Result<(), DeviceError> {
        if self.lost {
            return Err(DeviceError::Lost);
        }
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or(DeviceError::UnknownTexture(id.0))?;
        let expected = (texture.desc.size.width, texture.desc.size.height);
        if image.extent() != expected {
            return Err(DeviceError::ExtentMismatch {
                label: texture.desc.label.clone(),
                expected,
                actual: image.extent(),
            });
        }
        if is_unorm8(texture.desc.format) {
            quantize_unorm8(&mut image);
        }
        texture.image = image;
        self.writes += 1;
        Ok(())
    }
}

fn quantize_unorm8(image: &mut Image) {
    for texel in image.texels_mut() {
        for c in texel.iter_mut() {
            *c = (c.clamp(0.0, 1.0) * 255.0).round() / 255.0;
        }
    }
}
