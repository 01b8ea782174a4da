//! Renderable primitives.

use crate::math::{self, Aabb, Ray, Vec3};

use super::layers::Layers;

/// Stable identity used to track motion between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Analytic primitive shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Sphere around the object position.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Axis-aligned box around the object position.
    Cuboid {
        /// Half the edge length per axis.
        half_extents: Vec3,
    },
    /// Infinite two-sided plane through the object position.
    Plane {
        /// Plane normal.
        normal: Vec3,
    },
}

/// Surface response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Diffuse reflectance.
    pub albedo: Vec3,
    /// Self-emitted radiance.
    pub emissive: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: [1.0; 3],
            emissive: [0.0; 3],
        }
    }
}

/// Ray/surface intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance along the ray.
    pub t: f32,
    /// Unit normal facing the ray origin.
    pub normal: Vec3,
}

/// A shape placed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    /// Identity for motion vectors.
    pub id: ObjectId,
    /// Geometry.
    pub shape: Shape,
    /// World position.
    pub position: Vec3,
    /// Surface response.
    pub material: Material,
    /// Layer membership.
    pub layers: Layers,
    /// Whether the object blocks light.
    pub cast_shadow: bool,
}

impl Renderable {
    /// Creates a renderable on the default layer.
    #[must_use]
    pub fn new(id: u32, shape: Shape, position: Vec3) -> Self {
        Self {
            id: ObjectId(id),
            shape,
            position,
            material: Material::default(),
            layers: Layers::default(),
            cast_shadow: false,
        }
    }

    /// Sphere of `radius` at `position`.
    #[must_use]
    pub fn sphere(id: u32, position: Vec3, radius: f32) -> Self {
        Self::new(id, Shape::Sphere { radius }, position)
    }

    /// Box with full edge lengths `size` at `position`.
    #[must_use]
    pub fn cuboid(id: u32, position: Vec3, size: Vec3) -> Self {
        Self::new(
            id,
            Shape::Cuboid {
                half_extents: math::scale(size, 0.5),
            },
            position,
        )
    }

    /// Plane through `position` facing `normal`.
    #[must_use]
    pub fn plane(id: u32, position: Vec3, normal: Vec3) -> Self {
        Self::new(
            id,
            Shape::Plane {
                normal: math::normalize(normal),
            },
            position,
        )
    }

    /// Sets the diffuse color.
    #[must_use]
    pub fn with_albedo(mut self, albedo: Vec3) -> Self {
        self.material.albedo = albedo;
        self
    }

    /// Sets the emitted radiance.
    #[must_use]
    pub fn with_emissive(mut self, emissive: Vec3) -> Self {
        self.material.emissive = emissive;
        self
    }

    /// Replaces the layer mask.
    #[must_use]
    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    /// Makes the object block light.
    #[must_use]
    pub fn casting_shadows(mut self) -> Self {
        self.cast_shadow = true;
        self
    }

    /// Nearest intersection with `t` in `(t_min, t_max)`.
    #[must_use]
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let hit = match self.shape {
            Shape::Sphere { radius } => self.intersect_sphere(ray, radius, t_min),
            Shape::Cuboid { half_extents } => self.intersect_cuboid(ray, half_extents, t_min),
            Shape::Plane { normal } => self.intersect_plane(ray, normal),
        }?;
        (hit.t > t_min && hit.t < t_max).then_some(hit)
    }

    fn intersect_sphere(&self, ray: &Ray, radius: f32, t_min: f32) -> Option<Hit> {
        let oc = math::sub(ray.origin, self.position);
        let b = math::dot(oc, ray.direction);
        let c = math::dot(oc, oc) - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let mut t = -b - root;
        if t <= t_min {
            t = -b + root;
        }
        let outward = math::scale(math::sub(ray.at(t), self.position), 1.0 / radius);
        Some(Hit {
            t,
            normal: facing(outward, ray.direction),
        })
    }

    fn intersect_cuboid(&self, ray: &Ray, half_extents: Vec3, t_min: f32) -> Option<Hit> {
        let aabb = Aabb {
            center: self.position,
            half_extents,
        };
        let (near, far) = aabb.intersect(ray)?;
        let t = if near > t_min { near } else { far };

        // The face hit is the axis where the local point is closest to the
        // box surface.
        let local = math::sub(ray.at(t), self.position);
        let mut axis = 0;
        let mut best = f32::NEG_INFINITY;
        for i in 0..3 {
            let ratio = (local[i] / half_extents[i]).abs();
            if ratio > best {
                best = ratio;
                axis = i;
            }
        }
        let mut outward = [0.0; 3];
        outward[axis] = local[axis].signum();
        Some(Hit {
            t,
            normal: facing(outward, ray.direction),
        })
    }

    fn intersect_plane(&self, ray: &Ray, normal: Vec3) -> Option<Hit> {
        let denom = math::dot(normal, ray.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = math::dot(math::sub(self.position, ray.origin), normal) / denom;
        Some(Hit {
            t,
            normal: facing(normal, ray.direction),
        })
    }
}

/// Flips `normal` toward the incoming ray.
fn facing(normal: Vec3, direction: Vec3) -> Vec3 {
    if math::dot(normal, direction) > 0.0 {
        math::scale(normal, -1.0)
    } else {
        normal
    }
}
