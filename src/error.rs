use thiserror::Error;

/// Everything that can go wrong while building or transforming geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("cross-section needs at least 3 points, got {points}")]
    DegenerateCrossSection { points: usize },
    #[error("cannot hull segments of different sizes ({a} vs {b} points)")]
    SegmentSizeMismatch { a: usize, b: usize },
    #[error("segment has {points} points but {normals} normals")]
    NormalCountMismatch { points: usize, normals: usize },
    #[error("cannot flatten homogeneous point with w = {w}")]
    NonUnitW { w: f32 },
    #[error("tube step {index} has length {length} and scale {scale}; both must be finite and non-negative")]
    InvalidStep { index: usize, length: f32, scale: f32 },
    #[error("tube has steps but zero total length")]
    ZeroLengthTube,
    #[error("matrix is singular and cannot be inverted")]
    SingularMatrix,
    #[error("orientation eye and target coincide")]
    DegenerateOrientation,
    #[error("creature has no part {index}")]
    UnknownPart { index: usize },
    #[error("no texture region named `{0}`")]
    UnknownRegion(String),
    #[error("facet buffers disagree: {positions} positions, {normals} normals, {texcoords} texcoords")]
    FacetLengthMismatch {
        positions: usize,
        normals: usize,
        texcoords: usize,
    },
}

pub type Result<T> = std::result::Result<T, GeometryError>;
