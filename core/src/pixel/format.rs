//! Source pixel format descriptions

/// One color channel inside a packed direct-color texel.
///
/// A channel value is extracted as `(pixel & mask) >> shift` and ranges
/// over `0..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask {
    pub mask: u32,
    pub shift: u32,
    pub max: u32,
}

impl ChannelMask {
    /// Channel not present in the format
    pub const NONE: Self = Self {
        mask: 0,
        shift: 0,
        max: 0,
    };

    pub const fn new(mask: u32, shift: u32, max: u32) -> Self {
        Self { mask, shift, max }
    }

    /// Derive shift and max from a contiguous bit mask.
    pub const fn from_mask(mask: u32) -> Self {
        if mask == 0 {
            return Self::NONE;
        }
        let shift = mask.trailing_zeros();
        Self {
            mask,
            shift,
            max: mask >> shift,
        }
    }

    /// Raw field value of this channel in `pixel`.
    #[inline]
    pub const fn raw(&self, pixel: u32) -> u32 {
        (pixel & self.mask) >> self.shift
    }

    /// Channel rescaled to 0-255 with truncating division.
    ///
    /// Returns `None` when the channel has no range (`max == 0`).
    #[inline]
    pub const fn scaled(&self, pixel: u32) -> Option<u32> {
        if self.max == 0 {
            None
        } else {
            // 64-bit product: masks wider than 24 bits overflow u32
            Some((self.raw(pixel) as u64 * 255 / self.max as u64) as u32)
        }
    }
}

/// Layout of a source texel.
///
/// One byte per pixel means a palette index; 2, 3 and 4 bytes are packed
/// little-endian direct color described by the four channel masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub bytes_per_pixel: u32,
    pub red: ChannelMask,
    pub green: ChannelMask,
    pub blue: ChannelMask,
    pub alpha: ChannelMask,
}

impl PixelFormat {
    /// 8-bit palette indices
    pub const PALETTED: Self = Self {
        bytes_per_pixel: 1,
        red: ChannelMask::NONE,
        green: ChannelMask::NONE,
        blue: ChannelMask::NONE,
        alpha: ChannelMask::NONE,
    };

    /// 32-bit A8R8G8B8, the format the driver advertises to the host
    pub const BGRA8: Self = Self::from_masks(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000);

    /// 16-bit PSX texel with the semi-transparency mask bit in bit 15
    pub const PSX_5551: Self = Self::from_masks(16, 0x7C00, 0x03E0, 0x001F, 0x8000);

    /// Build a format from a bit depth and channel masks.
    pub const fn from_masks(bits_per_pixel: u32, red: u32, green: u32, blue: u32, alpha: u32) -> Self {
        Self {
            bytes_per_pixel: bits_per_pixel / 8,
            red: ChannelMask::from_mask(red),
            green: ChannelMask::from_mask(green),
            blue: ChannelMask::from_mask(blue),
            alpha: ChannelMask::from_mask(alpha),
        }
    }

    pub const fn bits_per_pixel(&self) -> u32 {
        self.bytes_per_pixel * 8
    }

    /// True for 16-bit formats using the PSX mask-bit alpha convention.
    pub const fn is_masked_5551(&self) -> bool {
        self.bits_per_pixel() == 16 && self.alpha.mask == 0x8000
    }

    /// Format actually used for unpacking, plus whether alpha is inverted.
    ///
    /// Host-supplied masked 5551 descriptors are often incomplete, so the
    /// color channels are replaced with the canonical 5-5-5 layout.
    pub(crate) fn unpack_layout(&self) -> (Self, bool) {
        if !self.is_masked_5551() {
            return (*self, false);
        }
        let corrected = Self {
            blue: ChannelMask::new(0x001F, 0, 31),
            green: ChannelMask::new(0x03E0, 5, 31),
            red: ChannelMask::new(0x7C00, 10, 31),
            ..*self
        };
        (corrected, true)
    }

    /// Alpha channel is a full 8-bit field, eligible for alpha keying.
    pub(crate) const fn has_8bit_alpha(&self) -> bool {
        self.alpha.max == 0xFF
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::BGRA8
    }
}
