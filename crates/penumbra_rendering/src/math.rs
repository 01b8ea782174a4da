//! # Vector Math
//!
//! Small `[f32; N]` helpers shared by the camera, scene queries and passes.
//! Matrices are column-major, matching WGSL `mat4x4<f32>` layout.

/// 3-component vector.
pub type Vec3 = [f32; 3];

/// Column-major 4×4 matrix.
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix.
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Component-wise sum.
#[inline]
#[must_use]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Component-wise difference.
#[inline]
#[must_use]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Uniform scale.
#[inline]
#[must_use]
pub fn scale(a: Vec3, s: f32) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Component-wise product.
#[inline]
#[must_use]
pub fn mul(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2]]
}

/// Dot product.
#[inline]
#[must_use]
pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product.
#[inline]
#[must_use]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean length.
#[inline]
#[must_use]
pub fn length(a: Vec3) -> f32 {
    dot(a, a).sqrt()
}

/// Unit vector along `a`; zero vectors are returned unchanged.
#[inline]
#[must_use]
pub fn normalize(a: Vec3) -> Vec3 {
    let len = length(a);
    if len > 0.0 {
        scale(a, 1.0 / len)
    } else {
        a
    }
}

/// `a + (b - a) * t` per component.
#[inline]
#[must_use]
pub fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Fractional part, always in `[0, 1)`.
#[inline]
#[must_use]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Clamps to `[0, 1]`.
#[inline]
#[must_use]
pub fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Hermite step between `edge0` and `edge1`; degenerates to a hard step
/// when the edges coincide.
#[must_use]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let width = edge1 - edge0;
    if width.abs() < 1e-6 {
        return if x >= edge0 { 1.0 } else { 0.0 };
    }
    let t = saturate((x - edge0) / width);
    t * t * (3.0 - 2.0 * t)
}

/// Matrix product `a × b`.
#[must_use]
pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (c, column) in out.iter_mut().enumerate() {
        for (r, value) in column.iter_mut().enumerate() {
            *value = (0..4).map(|k| a[k][r] * b[c][k]).sum();
        }
    }
    out
}

/// Transforms a point, returning clip-space `[x, y, z, w]`.
#[must_use]
pub fn mat4_transform(m: &Mat4, p: Vec3) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (r, value) in out.iter_mut().enumerate() {
        *value = m[0][r] * p[0] + m[1][r] * p[1] + m[2][r] * p[2] + m[3][r];
    }
    out
}

/// Half-line `origin + t * direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Builds a ray, normalizing `direction`.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: normalize(direction),
        }
    }

    /// Point at distance `t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        add(self.origin, scale(self.direction, t))
    }
}

/// Axis-aligned box stored as center and half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Box center.
    pub center: Vec3,
    /// Half the edge length on each axis.
    pub half_extents: Vec3,
}

impl Aabb {
    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec3 {
        sub(self.center, self.half_extents)
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec3 {
        add(self.center, self.half_extents)
    }

    /// Slab test. Returns the entry and exit distances along `ray`, or
    /// `None` if the ray misses the box or the box lies behind the origin.
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        let (lo, hi) = (self.min(), self.max());
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let inv = 1.0 / ray.direction[axis];
            let mut t0 = (lo[axis] - ray.origin[axis]) * inv;
            let mut t1 = (hi[axis] - ray.origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // `max`/`min` skip the NaN produced by a ray grazing a slab face.
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
        }

        (t_far >= t_near && t_far > 0.0).then_some((t_near, t_far))
    }

    /// True if `p` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|i| (p[i] - self.center[i]).abs() <= self.half_extents[i])
    }
}
