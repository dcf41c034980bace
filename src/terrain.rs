use std::collections::hash_map::DefaultHasher;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::hash::{Hash, Hasher};

use cgmath::{vec3, Vector3};
use noise::{NoiseFn, Perlin};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::chunk::ChunkCoord;
use crate::creature::{Assembly, Creature, Part, StepSource};
use crate::error::Result;
use crate::geometry::Facets;
use crate::math;
use crate::texture::{TextureAtlas, REGION_BARK, REGION_GRASS, REGION_LAVA};
use crate::tube::{CrossSection, TubeStep};

/// Offset used for the finite-difference tangents in [`Terrain::normal`].
pub const NORMAL_DELTA: f64 = 1e-4;
pub const TREE_SCALE: f32 = 0.07;
/// How far trees sit below the sampled ground height.
pub const TREE_SINK: f32 = 0.05;
const TREE_JITTER: f32 = 0.08;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Octave {
    pub frequency: f64,
    pub amplitude: f64,
}

pub const DEFAULT_OCTAVES: [Octave; 2] = [
    Octave {
        frequency: 1.0,
        amplitude: 2.0,
    },
    Octave {
        frequency: 0.5,
        amplitude: 4.0,
    },
];

/// Geometry of one unit chunk. Immutable once generated.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainChunk {
    pub coord: ChunkCoord,
    pub facets: Facets,
}

impl TerrainChunk {
    pub fn triangle_count(&self) -> usize {
        self.facets.triangle_count()
    }
}

/// Height field plus chunk tessellation.
///
/// The height function only depends on the noise seed and octaves, never on
/// which chunk is asking, so neighbouring chunks tile without seams.
#[derive(Clone)]
pub struct Terrain {
    seed: u64,
    noise: Perlin,
    octaves: Vec<Octave>,
    divisions: usize,
    max_trees: usize,
    ground_region: &'static str,
}

impl Terrain {
    pub fn new(seed: u64, divisions: usize, max_trees: usize) -> Self {
        Self {
            seed,
            noise: Perlin::new(perlin_seed(seed)),
            octaves: DEFAULT_OCTAVES.to_vec(),
            divisions: divisions.max(1),
            max_trees,
            ground_region: REGION_LAVA,
        }
    }

    pub fn with_octaves(mut self, octaves: Vec<Octave>) -> Self {
        self.octaves = octaves;
        self
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn height(&self, x: f64, y: f64) -> f64 {
        self.octaves
            .iter()
            .map(|o| o.amplitude * self.noise.get([o.frequency * x, o.frequency * y]))
            .sum()
    }

    /// Unnormalized surface normal at (x, y), pointing up (+y).
    pub fn normal(&self, x: f64, y: f64) -> [f32; 3] {
        let d = NORMAL_DELTA;
        let h = self.height(x, y);
        let along_y = vec3(0.0, self.height(x, y + d) - h, d);
        let along_x = vec3(d, self.height(x + d, y) - h, 0.0);
        let c = along_y.cross(along_x);
        [c.x as f32, c.y as f32, c.z as f32]
    }

    /// Tessellates the unit square at `coord` and scatters its trees.
    pub fn generate_chunk(&self, coord: ChunkCoord, atlas: &TextureAtlas) -> Result<TerrainChunk> {
        let region = atlas.region(self.ground_region)?;
        let d = self.divisions;
        let mut facets = Facets::with_capacity(d * d * 6);
        let corner = |origin: i32, k: usize| origin as f64 + k as f64 / d as f64;

        for xx in 0..d {
            for yy in 0..d {
                // (grid x, grid y) offsets of the 6 triangle corners
                let corners = [(0, 0), (1, 0), (1, 1), (0, 0), (1, 1), (0, 1)];
                for (dx, dy) in corners {
                    let (kx, ky) = (xx + dx, yy + dy);
                    let (x, y) = (corner(coord.x, kx), corner(coord.y, ky));
                    let h = self.height(x, y);
                    facets.push_vertex(
                        [x as f32, h as f32, y as f32],
                        self.normal(x, y),
                        region.map([kx as f32 / d as f32, ky as f32 / d as f32]),
                    );
                }
            }
        }

        facets.append(self.scatter_trees(coord, atlas)?);
        log::debug!(
            "generated chunk ({}, {}): {} triangles",
            coord.x,
            coord.y,
            facets.triangle_count()
        );
        Ok(TerrainChunk { coord, facets })
    }

    fn chunk_rng(&self, coord: ChunkCoord) -> SmallRng {
        let mut hasher = DefaultHasher::new();
        coord.hash(&mut hasher);
        SmallRng::seed_from_u64(hasher.finish() ^ self.seed)
    }

    fn scatter_trees(&self, coord: ChunkCoord, atlas: &TextureAtlas) -> Result<Facets> {
        let mut rng = self.chunk_rng(coord);
        let cluster = [
            coord.x as f32 + rng.gen::<f32>(),
            coord.y as f32 + rng.gen::<f32>(),
        ];
        let count = rng.gen_range(0..=self.max_trees);
        let mut facets = Facets::new();
        for _ in 0..count {
            let x = cluster[0] + rng.gen_range(-TREE_JITTER..=TREE_JITTER);
            let y = cluster[1] + rng.gen_range(-TREE_JITTER..=TREE_JITTER);
            let base = Vector3::new(x, self.height(x as f64, y as f64) as f32 - TREE_SINK, y);
            let yaw = rng.gen_range(0.0..TAU);
            let lean = rng.gen_range(-0.15..=0.15);
            facets.append(form_tree(base, yaw, lean, atlas)?);
        }
        Ok(facets)
    }
}

/// Folds the full 64-bit seed into the 32 bits `Perlin` takes.
fn perlin_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// One tree standing at `base`: a bark trunk with a grass crown on top.
pub fn form_tree(base: Vector3<f32>, yaw: f32, lean: f32, atlas: &TextureAtlas) -> Result<Facets> {
    let trunk = Part::new(
        "trunk",
        CrossSection::regular(6, 0.25)?,
        StepSource::Static(vec![
            TubeStep::new(0.6, [0.0, 0.0, 0.0], 1.0),
            TubeStep::new(0.6, [lean, 0.0, 0.0], 0.9),
            TubeStep::new(0.6, [lean * 0.5, 0.0, 0.0], 0.85),
            TubeStep::new(0.4, [0.0, 0.0, 0.0], 0.8),
        ]),
        REGION_BARK,
    );
    let top = crate::creature::sample_position_along_part(&trunk, 1.0, 0.0, None)?;
    let crown = Part::new(
        "crown",
        CrossSection::regular(8, 0.4)?,
        StepSource::Static(vec![
            TubeStep::new(0.1, [0.0, 0.0, 0.0], 3.0),
            TubeStep::new(0.7, [0.0, 0.0, 0.0], 0.8),
            TubeStep::new(0.6, [0.0, 0.0, 0.0], 0.6),
            TubeStep::new(0.5, [0.0, 0.0, 0.0], 0.4),
            TubeStep::new(0.3, [0.0, 0.0, 0.0], 0.0),
        ]),
        REGION_GRASS,
    )
    .with_orientation([lean * 1.5, 0.0, 0.0])
    .with_translation(top);

    let mut tree = Creature::new();
    tree.add_part(trunk);
    tree.add_part(crown);
    let local = tree.facets(&Assembly::new(&math::identity(), 0.0)?, atlas)?;

    // tubes grow along +z, trees grow along +y
    let rotation = math::rotation_y(yaw) * math::rotation_x(-FRAC_PI_2);
    let placement = math::multiply_many(&[
        math::translation(base),
        math::scale(TREE_SCALE),
        rotation,
    ]);
    local.transformed(&placement, &rotation)
}
