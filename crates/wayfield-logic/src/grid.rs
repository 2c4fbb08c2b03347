//! Grid keys and the sparse chunked cell store.
//!
//! `GridKey` addresses one cell as (x, y, plane) — planes are independent
//! maps that never touch geometrically. `SparseChunkedMap` is the backing
//! store for every per-cell layer in the engine: a hash map from chunk
//! origin to a flat 64×64 array, allocated on first write. Unwritten cells
//! read as `V::default()`.
//!
//! Chunking exists because the influence-map passes touch whole
//! neighborhoods every turn; scanning one flat array per chunk amortizes
//! the hashing a plain per-cell dictionary would pay on every read.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cells per chunk edge. Power of two so origin math is a mask.
pub const CHUNK_SIZE: i32 = 64;

const CHUNK_MASK: i32 = CHUNK_SIZE - 1;

/// Number of cells in one chunk.
pub const CHUNK_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Address of a single cell: (x, y, plane).
///
/// Equality and hashing are by value across all three fields. There is no
/// ordering — cells on different planes are simply different cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridKey {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl GridKey {
    pub const fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// This key shifted by (dx, dy) on the same plane.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.plane)
    }

    /// The 4 orthogonal neighbors, same plane.
    pub fn orthogonal_neighbors(&self) -> [GridKey; 4] {
        [
            self.offset(0, -1),
            self.offset(0, 1),
            self.offset(-1, 0),
            self.offset(1, 0),
        ]
    }

    /// Manhattan distance to another cell. `None` if the planes differ.
    pub fn manhattan_distance(&self, other: &GridKey) -> Option<i32> {
        if self.plane != other.plane {
            return None;
        }
        Some((self.x - other.x).abs() + (self.y - other.y).abs())
    }

    /// Origin of the chunk containing this cell.
    ///
    /// Two's-complement `&` with the inverted mask floors negative
    /// coordinates to the correct multiple of `CHUNK_SIZE`.
    pub fn chunk_origin(&self) -> GridKey {
        GridKey::new(self.x & !CHUNK_MASK, self.y & !CHUNK_MASK, self.plane)
    }

    /// Row-major index of this cell within its chunk.
    fn chunk_index(&self) -> usize {
        ((self.y & CHUNK_MASK) * CHUNK_SIZE + (self.x & CHUNK_MASK)) as usize
    }
}

/// Sparse associative store from `GridKey` to `V`, backed by lazily
/// allocated fixed-size chunks.
///
/// A chunk exists iff at least one cell in it was ever written. Reads of
/// un-chunked cells return `V::default()` and never allocate. There is no
/// iteration order guarantee across chunks; within a chunk, cells are
/// row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseChunkedMap<V> {
    chunks: HashMap<GridKey, Vec<V>>,
}

impl<V: Clone + Default> SparseChunkedMap<V> {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
        }
    }

    /// Read a cell. Returns `V::default()` if its chunk was never written.
    pub fn get(&self, key: GridKey) -> V {
        self.get_ref(key).cloned().unwrap_or_default()
    }

    /// Borrow a cell's value, or `None` if its chunk does not exist.
    pub fn get_ref(&self, key: GridKey) -> Option<&V> {
        self.chunks
            .get(&key.chunk_origin())
            .map(|chunk| &chunk[key.chunk_index()])
    }

    /// Write a cell, allocating its chunk on demand.
    pub fn set(&mut self, key: GridKey, value: V) {
        let chunk = self
            .chunks
            .entry(key.chunk_origin())
            .or_insert_with(|| vec![V::default(); CHUNK_AREA]);
        chunk[key.chunk_index()] = value;
    }

    /// Mutate a cell in place, allocating its chunk on demand.
    pub fn update(&mut self, key: GridKey, f: impl FnOnce(&mut V)) {
        let chunk = self
            .chunks
            .entry(key.chunk_origin())
            .or_insert_with(|| vec![V::default(); CHUNK_AREA]);
        f(&mut chunk[key.chunk_index()]);
    }

    /// Every cell of every allocated chunk.
    ///
    /// Over-approximates: cells whose current value is default are still
    /// yielded if their chunk exists. Callers must tolerate that.
    pub fn locations(&self) -> impl Iterator<Item = GridKey> + '_ {
        self.chunks.keys().flat_map(|origin| {
            let origin = *origin;
            (0..CHUNK_SIZE).flat_map(move |dy| {
                (0..CHUNK_SIZE).map(move |dx| origin.offset(dx, dy))
            })
        })
    }

    /// Drop every chunk whose full cell slice satisfies `pred`.
    ///
    /// The usual predicate is "every cell is default", which returns a
    /// fully decayed region to the unallocated state.
    pub fn purge(&mut self, pred: impl Fn(&[V]) -> bool) {
        self.chunks.retain(|_, chunk| !pred(chunk));
    }

    /// Visit each chunk as (origin, row-major cell slice).
    ///
    /// Bulk passes (decay, snapshotting) go through here so they scan flat
    /// arrays instead of doing per-cell hash lookups.
    pub fn for_each_chunk(&self, mut f: impl FnMut(GridKey, &[V])) {
        for (origin, chunk) in &self.chunks {
            f(*origin, chunk);
        }
    }

    /// Visit each chunk mutably as (origin, row-major cell slice).
    pub fn for_each_chunk_mut(&mut self, mut f: impl FnMut(GridKey, &mut [V])) {
        for (origin, chunk) in &mut self.chunks {
            f(*origin, chunk);
        }
    }

    /// Number of allocated chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Drop all chunks.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

impl<V: Clone + Default> Default for SparseChunkedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconstruct the `GridKey` of cell `index` within the chunk at `origin`.
pub fn cell_at(origin: GridKey, index: usize) -> GridKey {
    let i = index as i32;
    origin.offset(i % CHUNK_SIZE, i / CHUNK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        let key = GridKey::new(10, 20, 0);
        map.set(key, 42);
        assert_eq!(map.get(key), 42);
    }

    #[test]
    fn test_unwritten_cell_reads_default() {
        let map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        assert_eq!(map.get(GridKey::new(5, 5, 0)), 0);
        assert_eq!(map.chunk_count(), 0); // read never allocates
    }

    #[test]
    fn test_chunk_boundary() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        let inside = GridKey::new(CHUNK_SIZE - 1, 0, 0);
        let outside = GridKey::new(CHUNK_SIZE, 0, 0);
        assert_ne!(inside.chunk_origin(), outside.chunk_origin());
        map.set(inside, 1);
        map.set(outside, 2);
        assert_eq!(map.get(inside), 1);
        assert_eq!(map.get(outside), 2);
        assert_eq!(map.chunk_count(), 2);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        let key = GridKey::new(-1, -1, 0);
        assert_eq!(key.chunk_origin(), GridKey::new(-CHUNK_SIZE, -CHUNK_SIZE, 0));
        map.set(key, 7);
        assert_eq!(map.get(key), 7);
        // (-1, -1) and (0, 0) land in different chunks
        map.set(GridKey::new(0, 0, 0), 9);
        assert_eq!(map.get(key), 7);
        assert_eq!(map.get(GridKey::new(0, 0, 0)), 9);
    }

    #[test]
    fn test_planes_are_independent() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        map.set(GridKey::new(3, 3, 0), 1);
        map.set(GridKey::new(3, 3, 1), 2);
        assert_eq!(map.get(GridKey::new(3, 3, 0)), 1);
        assert_eq!(map.get(GridKey::new(3, 3, 1)), 2);
    }

    #[test]
    fn test_purge_all_default_chunks() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        map.set(GridKey::new(0, 0, 0), 5);
        map.set(GridKey::new(100, 100, 0), 0); // allocates but stays default
        assert_eq!(map.chunk_count(), 2);
        map.purge(|cells| cells.iter().all(|v| *v == 0));
        assert_eq!(map.chunk_count(), 1);
        assert_eq!(map.get(GridKey::new(0, 0, 0)), 5);
    }

    #[test]
    fn test_locations_over_approximates() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        let key = GridKey::new(2, 3, 0);
        map.set(key, 1);
        let locs: Vec<GridKey> = map.locations().collect();
        assert_eq!(locs.len(), CHUNK_AREA);
        assert!(locs.contains(&key));
    }

    #[test]
    fn test_for_each_chunk_row_major() {
        let mut map: SparseChunkedMap<i32> = SparseChunkedMap::new();
        map.set(GridKey::new(1, 0, 0), 10);
        map.set(GridKey::new(0, 1, 0), 20);
        map.for_each_chunk(|origin, cells| {
            assert_eq!(origin, GridKey::new(0, 0, 0));
            assert_eq!(cells[1], 10);
            assert_eq!(cells[CHUNK_SIZE as usize], 20);
        });
    }

    #[test]
    fn test_cell_at_inverts_indexing() {
        let origin = GridKey::new(64, -64, 2);
        for &index in &[0usize, 1, 63, 64, CHUNK_AREA - 1] {
            let key = cell_at(origin, index);
            assert_eq!(key.chunk_origin(), origin);
            assert_eq!(key.chunk_index(), index);
        }
    }

    #[test]
    fn test_manhattan_distance() {
        let a = GridKey::new(0, 0, 0);
        assert_eq!(a.manhattan_distance(&GridKey::new(3, -4, 0)), Some(7));
        assert_eq!(a.manhattan_distance(&GridKey::new(3, -4, 1)), None);
    }
}
