//! Vertex layout and primitive group geometry

use bytemuck::{Pod, Zeroable};

/// Vertex as handed to the backend: position + w, packed BGRA color, UV.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Reciprocal homogeneous w for TL vertices, 1.0 otherwise
    pub w: f32,
    /// `0xAARRGGBB`
    pub bgra: u32,
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub const fn new(position: [f32; 3], bgra: u32, uv: [f32; 2]) -> Self {
        Self {
            x: position[0],
            y: position[1],
            z: position[2],
            w: 1.0,
            bgra,
            u: uv[0],
            v: uv[1],
        }
    }

    pub fn alpha(&self) -> u8 {
        (self.bgra >> 24) as u8
    }

    pub fn set_alpha(&mut self, alpha: u8) {
        self.bgra = (self.bgra & 0x00FF_FFFF) | (u32::from(alpha) << 24);
    }
}

/// Vertices and triangle indices of one primitive group.
///
/// Shared between the host and deferred draw records, so it is built once
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl GroupGeometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u16>) -> Self {
        Self { vertices, indices }
    }

    /// Build a group from host positions, colors, texture coordinates and
    /// triangles.
    ///
    /// Missing colors default to opaque white and missing UVs to zero.
    /// When `vertex_alpha` is set (alpha-blended groups), every vertex takes
    /// that alpha.
    pub fn from_parts(
        positions: &[[f32; 3]],
        colors: Option<&[u32]>,
        uvs: Option<&[[f32; 2]]>,
        triangles: &[[u16; 3]],
        vertex_alpha: Option<u8>,
    ) -> Self {
        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let bgra = colors.and_then(|c| c.get(i).copied()).unwrap_or(0xFFFF_FFFF);
                let uv = uvs.and_then(|t| t.get(i).copied()).unwrap_or([0.0, 0.0]);
                let mut vertex = Vertex::new(position, bgra, uv);
                if let Some(alpha) = vertex_alpha {
                    vertex.set_alpha(alpha);
                }
                vertex
            })
            .collect();
        let indices = triangles.iter().flatten().copied().collect();
        Self { vertices, indices }
    }

    /// Sub-range of shapes `[first, first + count)` for fixed-size shapes.
    ///
    /// Returns `None` when the range starts past the 16-bit index space, since
    /// its indices could not be rebased.
    pub fn shapes(
        &self,
        first: usize,
        count: usize,
        vertices_per_shape: usize,
        indices_per_shape: usize,
    ) -> Option<GroupGeometry> {
        let v_start = (first * vertices_per_shape).min(self.vertices.len());
        let v_end = ((first + count) * vertices_per_shape).min(self.vertices.len());
        let i_start = (first * indices_per_shape).min(self.indices.len());
        let i_end = ((first + count) * indices_per_shape).min(self.indices.len());
        let Ok(base) = u16::try_from(v_start) else {
            tracing::warn!(
                "shape range starts at vertex {}, beyond 16-bit indices; skipping",
                v_start
            );
            return None;
        };
        Some(GroupGeometry {
            vertices: self.vertices[v_start..v_end].to_vec(),
            indices: self.indices[i_start..i_end]
                .iter()
                .map(|&i| i.saturating_sub(base))
                .collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
