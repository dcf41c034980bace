use std::collections::HashMap;
use std::sync::Arc;

use cgmath::Vector3;

use crate::error::Result;
use crate::terrain::{Terrain, TerrainChunk};
use crate::texture::TextureAtlas;

/// Integer coordinate of a unit terrain chunk on the ground (x, z) plane.
/// `y` here is world z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the world position (x, z).
    pub fn containing(x: f32, z: f32) -> Self {
        Self::new(x.floor() as i32, z.floor() as i32)
    }

    /// Chebyshev distance in chunks.
    pub fn distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Memoized terrain chunks plus the streaming window around the viewer.
///
/// A chunk is generated on first request and then returned unchanged for
/// as long as it stays cached.
pub struct ChunkCache {
    terrain: Terrain,
    atlas: Arc<TextureAtlas>,
    chunks: HashMap<ChunkCoord, Arc<TerrainChunk>>,
    window: i32,
    lead: f32,
    retain_radius: Option<i32>,
}

impl ChunkCache {
    pub fn new(terrain: Terrain, atlas: Arc<TextureAtlas>, window: i32, lead: f32) -> Self {
        Self {
            terrain,
            atlas,
            chunks: HashMap::new(),
            window: window.max(1),
            lead,
            retain_radius: None,
        }
    }

    /// Evict chunks further than `radius` from the window centre after every
    /// window refresh. `None` keeps everything.
    pub fn with_retain_radius(mut self, radius: Option<i32>) -> Self {
        self.retain_radius = radius;
        self
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn get_or_create_chunk(&mut self, cx: i32, cy: i32) -> Result<Arc<TerrainChunk>> {
        let coord = ChunkCoord::new(cx, cy);
        if let Some(chunk) = self.chunks.get(&coord) {
            return Ok(Arc::clone(chunk));
        }
        let chunk = Arc::new(self.terrain.generate_chunk(coord, &self.atlas)?);
        self.chunks.insert(coord, Arc::clone(&chunk));
        Ok(chunk)
    }

    /// Centre of the active window: the viewer's chunk pushed `lead` chunks
    /// along the direction of travel.
    pub fn window_center(&self, position: Vector3<f32>, yaw: f32) -> ChunkCoord {
        ChunkCoord::containing(
            position.x + yaw.sin() * self.lead,
            position.z + yaw.cos() * self.lead,
        )
    }

    /// Coordinates of the `window x window` square, row by row.
    pub fn active_coords(&self, position: Vector3<f32>, yaw: f32) -> Vec<ChunkCoord> {
        let center = self.window_center(position, yaw);
        let half = self.window / 2;
        let span = -half..(self.window - half);
        let mut coords = Vec::with_capacity((self.window * self.window) as usize);
        for dx in span.clone() {
            for dy in span.clone() {
                coords.push(ChunkCoord::new(center.x + dx, center.y + dy));
            }
        }
        coords
    }

    /// Every chunk in the active window, generating missing ones.
    ///
    /// A chunk that fails to generate is logged and left out of this frame.
    pub fn get_active_chunks(&mut self, position: Vector3<f32>, yaw: f32) -> Vec<Arc<TerrainChunk>> {
        let coords = self.active_coords(position, yaw);
        let mut active = Vec::with_capacity(coords.len());
        for coord in coords {
            match self.get_or_create_chunk(coord.x, coord.y) {
                Ok(chunk) => active.push(chunk),
                Err(err) => log::warn!("skipping chunk ({}, {}): {err}", coord.x, coord.y),
            }
        }
        if let Some(radius) = self.retain_radius {
            self.evict_outside(self.window_center(position, yaw), radius);
        }
        active
    }

    /// Drops cached chunks more than `radius` chunks from `center`.
    /// Returns how many were removed.
    pub fn evict_outside(&mut self, center: ChunkCoord, radius: i32) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|coord, _| coord.distance(center) <= radius);
        let evicted = before - self.chunks.len();
        if evicted > 0 {
            log::debug!("evicted {evicted} chunks around ({}, {})", center.x, center.y);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cache(window: i32) -> ChunkCache {
        ChunkCache::new(Terrain::new(3, 5, 3), Arc::new(TextureAtlas::default()), window, 5.0)
    }

    #[test]
    fn repeated_requests_return_the_cached_chunk() {
        let mut cache = cache(4);
        let first = cache.get_or_create_chunk(3, -2).unwrap();
        let second = cache.get_or_create_chunk(3, -2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.facets, second.facets);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn window_has_no_duplicates() {
        let mut cache = cache(12);
        let chunks = cache.get_active_chunks(Vector3::new(0.0, 0.0, 0.0), 0.0);
        assert_eq!(chunks.len(), 144);
        let unique: HashSet<ChunkCoord> = chunks.iter().map(|c| c.coord).collect();
        assert_eq!(unique.len(), 144);
        assert_eq!(cache.len(), 144);
    }

    #[test]
    fn window_leads_along_travel_direction() {
        let cache = cache(12);
        let at = Vector3::new(0.5, 0.0, 0.5);
        assert_eq!(cache.window_center(at, 0.0), ChunkCoord::new(0, 5));
        assert_eq!(
            cache.window_center(at, std::f32::consts::FRAC_PI_2),
            ChunkCoord::new(5, 0)
        );
        let coords = cache.active_coords(at, 0.0);
        assert_eq!(coords.first(), Some(&ChunkCoord::new(-6, -1)));
        assert_eq!(coords.last(), Some(&ChunkCoord::new(5, 10)));
    }

    #[test]
    fn negative_positions_floor_into_their_chunk() {
        assert_eq!(ChunkCoord::containing(-0.25, -1.5), ChunkCoord::new(-1, -2));
        assert_eq!(ChunkCoord::containing(0.25, 1.5), ChunkCoord::new(0, 1));
    }

    #[test]
    fn retain_radius_evicts_far_chunks() {
        let mut cache = cache(2).with_retain_radius(Some(3));
        cache.get_or_create_chunk(40, 40).unwrap();
        cache.get_active_chunks(Vector3::new(0.0, 0.0, -5.0), 0.0);
        assert!(!cache.contains(ChunkCoord::new(40, 40)));
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn without_retain_radius_nothing_is_evicted() {
        let mut cache = cache(2);
        cache.get_or_create_chunk(40, 40).unwrap();
        cache.get_active_chunks(Vector3::new(0.0, 0.0, 0.0), 0.0);
        assert!(cache.contains(ChunkCoord::new(40, 40)));
        assert_eq!(cache.len(), 5);
    }
}
