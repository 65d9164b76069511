//! Group draw inputs and deferred draw records

use std::cell::Cell;
use std::rc::Rc;

use glam::Mat4;
use smallvec::SmallVec;

use crate::state::{PrimitiveTopology, RenderStateSnapshot, StateDescriptor};
use crate::vertex::GroupGeometry;

/// Instance matrix shared with the host, read when the draw happens
pub type SharedMatrix = Rc<Cell<Mat4>>;

/// Per-instance palette offset data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteAux {
    /// Palette the instance draws with
    pub palette_index: u32,
    /// Add `offsets` to the palette index per shape
    pub add_offsets: bool,
    pub offsets: SmallVec<[u32; 4]>,
}

/// How an instanced group derives each instance's world transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPolicy {
    /// Use the instance matrix as-is
    MatrixPointer,
    /// Instance matrix followed by the camera matrix
    CameraProduct,
}

impl TransformPolicy {
    /// Map the host's instance transform mode (1 or 2).
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            1 => Some(TransformPolicy::MatrixPointer),
            2 => Some(TransformPolicy::CameraProduct),
            _ => None,
        }
    }

    /// World transform for an instance.
    ///
    /// The product is the row-vector `instance x camera`, which is
    /// `camera * instance` in glam's column-vector convention.
    pub fn apply(self, instance: Mat4, camera: Mat4) -> Mat4 {
        match self {
            TransformPolicy::MatrixPointer => instance,
            TransformPolicy::CameraProduct => camera * instance,
        }
    }
}

/// One instance of an instanced group
#[derive(Debug, Clone)]
pub struct InstanceTransform {
    pub matrix: SharedMatrix,
}

impl InstanceTransform {
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix: Rc::new(Cell::new(matrix)),
        }
    }
}

/// Transform attached to a group draw
#[derive(Debug, Clone, Default)]
pub enum GroupTransform<'a> {
    /// Keep the current world-view transform
    #[default]
    None,
    /// Non-instanced group with its own world matrix
    World(Mat4),
    /// One draw per instance, policy chosen by the host per draw
    Instanced {
        policy: TransformPolicy,
        camera: Mat4,
        instances: &'a [InstanceTransform],
    },
}

/// A primitive group submitted by the host
#[derive(Debug, Clone)]
pub struct GroupDraw<'a> {
    /// Index of the group inside its polygon set
    pub group: u32,
    pub state: StateDescriptor,
    pub geometry: &'a Rc<GroupGeometry>,
    pub topology: PrimitiveTopology,
    /// Vertices are pre-transformed (TL)
    pub pretransformed: bool,
    pub transform: GroupTransform<'a>,
    pub palette_aux: Option<&'a PaletteAux>,
}

impl<'a> GroupDraw<'a> {
    pub fn new(group: u32, state: StateDescriptor, geometry: &'a Rc<GroupGeometry>) -> Self {
        Self {
            group,
            state,
            geometry,
            topology: PrimitiveTopology::Triangles,
            pretransformed: false,
            transform: GroupTransform::None,
            palette_aux: None,
        }
    }

    pub fn with_transform(mut self, transform: GroupTransform<'a>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_palette_aux(mut self, aux: &'a PaletteAux) -> Self {
        self.palette_aux = Some(aux);
        self
    }

    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn pretransformed(mut self, pretransformed: bool) -> Self {
        self.pretransformed = pretransformed;
        self
    }
}

/// Transform captured into a deferred record
#[derive(Debug, Clone)]
pub enum DeferredTransform {
    None,
    /// World matrix copied at enqueue time
    Matrix(Mat4),
    /// Instance matrix read at replay time
    Pointer(SharedMatrix),
}

impl DeferredTransform {
    /// Matrix to apply at replay, if any.
    pub fn resolve(&self) -> Option<Mat4> {
        match self {
            DeferredTransform::None => None,
            DeferredTransform::Matrix(m) => Some(*m),
            DeferredTransform::Pointer(p) => Some(p.get()),
        }
    }
}

/// A group captured for the deferred pass
#[derive(Debug, Clone)]
pub struct DeferredDrawRecord {
    pub group: u32,
    pub state: RenderStateSnapshot,
    pub transform: DeferredTransform,
    /// Copy taken at enqueue time
    pub palette_aux: Option<PaletteAux>,
    pub geometry: Rc<GroupGeometry>,
}
