//! PSX blend modes and the legacy blend mode table

/// PSX semi-transparency mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BlendMode {
    /// 50% background + 50% incoming
    Average = 0,
    /// Background + incoming
    Additive = 1,
    /// Background - incoming
    Subtractive = 2,
    /// Background + 25% incoming
    Quarter = 3,
    /// Opaque
    #[default]
    None = 4,
}

/// Blend equation operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    ReverseSubtract,
}

/// Blend equation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// `dst = op(src * src_factor, dst * dst_factor)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendEquation {
    pub op: BlendOp,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendMode {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(BlendMode::Average),
            1 => Some(BlendMode::Additive),
            2 => Some(BlendMode::Subtractive),
            3 => Some(BlendMode::Quarter),
            4 => Some(BlendMode::None),
            _ => None,
        }
    }

    /// Fixed-function equation reproducing this mode.
    ///
    /// Average and quarter rely on the fragment alpha being forced to 0.5
    /// and 0.25 respectively.
    pub fn equation(self) -> BlendEquation {
        use BlendFactor::*;
        match self {
            BlendMode::Average => BlendEquation {
                op: BlendOp::Add,
                src: SrcAlpha,
                dst: OneMinusSrcAlpha,
            },
            BlendMode::Additive => BlendEquation {
                op: BlendOp::Add,
                src: One,
                dst: One,
            },
            BlendMode::Subtractive => BlendEquation {
                op: BlendOp::ReverseSubtract,
                src: One,
                dst: One,
            },
            BlendMode::Quarter => BlendEquation {
                op: BlendOp::Add,
                src: SrcAlpha,
                dst: One,
            },
            BlendMode::None => BlendEquation {
                op: BlendOp::Add,
                src: One,
                dst: Zero,
            },
        }
    }

    pub fn is_blended(self) -> bool {
        self != BlendMode::None
    }
}

/// Legacy blend descriptor handed back to the host.
///
/// Factors use Direct3D `D3DBLEND` numbering, caps use `D3DPBLENDCAPS` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendModeEntry {
    pub mode: BlendMode,
    pub enabled: u32,
    pub shade_average: u32,
    pub vertex_alpha: u32,
    pub src_blend: u32,
    pub src_caps: u32,
    pub dst_blend: u32,
    pub dst_caps: u32,
    pub reserved: [u32; 2],
}

impl BlendModeEntry {
    const fn new(mode: BlendMode, raw: [u32; 9]) -> Self {
        Self {
            mode,
            enabled: raw[0],
            shade_average: raw[1],
            vertex_alpha: raw[2],
            src_blend: raw[3],
            src_caps: raw[4],
            dst_blend: raw[5],
            dst_caps: raw[6],
            reserved: [raw[7], raw[8]],
        }
    }

    /// Raw nine-word layout as the host expects it.
    pub fn to_raw(&self) -> [u32; 9] {
        [
            self.enabled,
            self.shade_average,
            self.vertex_alpha,
            self.src_blend,
            self.src_caps,
            self.dst_blend,
            self.dst_caps,
            self.reserved[0],
            self.reserved[1],
        ]
    }
}

/// The five legacy blend descriptors, indexed by PSX blend mode.
pub static BLEND_MODE_TABLE: [BlendModeEntry; 5] = [
    BlendModeEntry::new(BlendMode::Average, [1, 1, 0x80, 5, 0x10, 6, 0x20, 0, 0]),
    BlendModeEntry::new(BlendMode::Additive, [1, 0, 0xFF, 2, 2, 2, 2, 0, 0]),
    BlendModeEntry::new(BlendMode::Subtractive, [1, 0, 0xFF, 4, 8, 2, 2, 0, 0]),
    BlendModeEntry::new(BlendMode::Quarter, [1, 0, 0x40, 5, 0x10, 2, 2, 0, 0]),
    // Not known to be requested by real content
    BlendModeEntry::new(BlendMode::None, [1, 0, 0xFF, 2, 2, 1, 1, 0, 0]),
];

/// Read-only access to [`BLEND_MODE_TABLE`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendModeTable;

impl BlendModeTable {
    /// Descriptor for `index`.
    ///
    /// Index 4 is valid but unexpected and is logged. Anything above is
    /// logged and yields `None`.
    pub fn lookup(index: u32) -> Option<&'static BlendModeEntry> {
        match index {
            0..=3 => Some(&BLEND_MODE_TABLE[index as usize]),
            4 => {
                tracing::warn!("UNEXPECTED: blend mode 4 requested");
                Some(&BLEND_MODE_TABLE[4])
            }
            _ => {
                tracing::warn!("UNEXPECTED: invalid blend mode {}", index);
                None
            }
        }
    }

    /// Blend mode for a declared index, degrading to [`BlendMode::None`].
    pub fn mode(index: u32) -> BlendMode {
        Self::lookup(index).map_or(BlendMode::None, |entry| entry.mode)
    }
}
