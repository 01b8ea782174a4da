//! Layer membership masks.
//!
//! Every renderable and light carries a 32-bit mask; a pass renders an
//! entity only when the masks intersect. Layer 0 is the default scene
//! layer, layer 10 is reserved for the volumetric pass.

/// Default scene layer.
pub const LAYER_DEFAULT: u8 = 0;

/// Layer the volumetric pass renders.
pub const LAYER_VOLUMETRIC: u8 = 10;

/// Set of up to 32 layer indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layers(u32);

impl Default for Layers {
    fn default() -> Self {
        Self::single(LAYER_DEFAULT)
    }
}

impl Layers {
    /// Member of no layer.
    pub const NONE: Self = Self(0);

    /// Mask with exactly one layer. Indices are taken modulo 32.
    #[must_use]
    pub const fn single(layer: u8) -> Self {
        Self(1 << (layer & 31))
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Adds `layer`.
    pub fn enable(&mut self, layer: u8) {
        self.0 |= Self::single(layer).0;
    }

    /// Removes `layer`.
    pub fn disable(&mut self, layer: u8) {
        self.0 &= !Self::single(layer).0;
    }

    /// Builder form of [`Layers::enable`].
    #[must_use]
    pub fn with(mut self, layer: u8) -> Self {
        self.enable(layer);
        self
    }

    /// True if `layer` is a member.
    #[must_use]
    pub const fn contains(self, layer: u8) -> bool {
        self.0 & Self::single(layer).0 != 0
    }

    /// True if the two masks share any layer.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_layer_zero() {
        let l = Layers::default();
        assert!(l.contains(LAYER_DEFAULT));
        assert!(!l.contains(LAYER_VOLUMETRIC));
        assert_eq!(l.bits(), 1);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let mut l = Layers::default();
        l.enable(LAYER_VOLUMETRIC);
        let once = l;
        l.enable(LAYER_VOLUMETRIC);
        assert_eq!(l, once);
        assert!(l.contains(LAYER_DEFAULT) && l.contains(LAYER_VOLUMETRIC));
    }

    #[test]
    fn test_intersection() {
        let volumetric = Layers::single(LAYER_VOLUMETRIC);
        assert!(!Layers::default().intersects(volumetric));
        assert!(Layers::default().with(LAYER_VOLUMETRIC).intersects(volumetric));
        assert!(!Layers::NONE.intersects(volumetric));

        let mut l = Layers::default().with(3);
        l.disable(LAYER_DEFAULT);
        assert_eq!(l, Layers::single(3));
    }
}
