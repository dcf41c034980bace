use cgmath::Vector3;

use crate::error::{GeometryError, Result};
use crate::math::{self, Mat4};

/// Interleaved vertex as a renderer would upload it.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Non-indexed triangle soup: every three consecutive entries form one
/// triangle. The three buffers always have the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Facets {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
}

impl Facets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            texcoords: Vec::with_capacity(vertices),
        }
    }

    /// Builds facets from separately produced buffers, checking they line up.
    pub fn from_parts(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        texcoords: Vec<[f32; 2]>,
    ) -> Result<Self> {
        if positions.len() != normals.len()
            || positions.len() != texcoords.len()
            || positions.len() % 3 != 0
        {
            return Err(GeometryError::FacetLengthMismatch {
                positions: positions.len(),
                normals: normals.len(),
                texcoords: texcoords.len(),
            });
        }
        Ok(Self {
            positions,
            normals,
            texcoords,
        })
    }

    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) {
        self.positions.push(position);
        self.normals.push(normal);
        self.texcoords.push(uv);
    }

    pub fn append(&mut self, other: Facets) {
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.texcoords.extend(other.texcoords);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[[f32; 2]] {
        &self.texcoords
    }

    /// `float[3N]` view of the positions.
    pub fn flat_positions(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn flat_normals(&self) -> &[f32] {
        bytemuck::cast_slice(&self.normals)
    }

    /// `float[2N]` view of the texture coordinates.
    pub fn flat_texcoords(&self) -> &[f32] {
        bytemuck::cast_slice(&self.texcoords)
    }

    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.texcoords)
            .map(|((position, normal), uv)| Vertex {
                position: *position,
                normal: *normal,
                uv: *uv,
            })
            .collect()
    }

    /// Moves points by `placement` and normals by `rotation` only.
    pub fn transformed(&self, placement: &Mat4, rotation: &Mat4) -> Result<Facets> {
        let positions = self
            .positions
            .iter()
            .map(|p| {
                math::flatten(math::apply(
                    placement,
                    math::to_homogeneous(Vector3::from(*p)),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        let normals = self
            .normals
            .iter()
            .map(|n| math::apply_direction(rotation, Vector3::from(*n)).into())
            .collect();
        Facets::from_parts(positions, normals, self.texcoords.clone())
    }

    /// Reverses the winding of every triangle.
    ///
    /// Needed after a reflection so front faces stay front faces.
    pub fn flip_winding(&mut self) {
        for tri in 0..self.triangle_count() {
            let (b, c) = (tri * 3 + 1, tri * 3 + 2);
            self.positions.swap(b, c);
            self.normals.swap(b, c);
            self.texcoords.swap(b, c);
        }
    }
}
