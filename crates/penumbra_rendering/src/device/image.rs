//! CPU texel storage.
//!
//! `Image` is the backing store of every 2D texture on the software
//! device: linear `f32` RGBA, row-major, top row first. Sampling uses
//! clamp-to-edge addressing with texel centers at `i + 0.5`.

/// Linear RGBA texel.
pub type Texel = [f32; 4];

/// 2D grid of RGBA texels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl Image {
    /// All-zero image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 4])
    }

    /// Image with every texel set to `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: Texel) -> Self {
        Self {
            width,
            height,
            texels: vec![value; width as usize * height as usize],
        }
    }

    /// Evaluates `f(x, y)` for every texel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Texel) -> Self {
        let mut texels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major texels.
    #[must_use]
    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    /// Mutable row-major texels.
    pub fn texels_mut(&mut self) -> &mut [Texel] {
        &mut self.texels
    }

    /// Texel at `(x, y)`, clamped to the edge.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Texel {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    /// Overwrites texel `(x, y)`; out-of-range writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, value: Texel) {
        if x < self.width && y < self.height {
            self.texels[y as usize * self.width as usize + x as usize] = value;
        }
    }

    /// Screen UV of the center of texel `(x, y)`.
    #[must_use]
    pub fn uv(&self, x: u32, y: u32) -> [f32; 2] {
        [
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        ]
    }

    /// Texel containing `uv`.
    #[must_use]
    pub fn sample_nearest(&self, uv: [f32; 2]) -> Texel {
        let x = (uv[0] * self.width as f32).floor() as i64;
        let y = (uv[1] * self.height as f32).floor() as i64;
        self.get(x, y)
    }

    /// Bilinear sample at normalized `uv`.
    #[must_use]
    pub fn sample_bilinear(&self, uv: [f32; 2]) -> Texel {
        self.sample_bilinear_px(uv[0] * self.width as f32, uv[1] * self.height as f32)
    }

    /// Bilinear sample at pixel coordinates; `(x + 0.5, y + 0.5)` returns
    /// texel `(x, y)` exactly.
    #[must_use]
    pub fn sample_bilinear_px(&self, px: f32, py: f32) -> Texel {
        let tx = px - 0.5;
        let ty = py - 0.5;
        let x0 = tx.floor();
        let y0 = ty.floor();
        let fx = tx - x0;
        let fy = ty - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.get(x0, y0);
        if fx == 0.0 && fy == 0.0 {
            return a;
        }
        let b = self.get(x0 + 1, y0);
        let c = self.get(x0, y0 + 1);
        let d = self.get(x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            out[i] = top + (bottom - top) * fy;
        }
        out
    }
}
