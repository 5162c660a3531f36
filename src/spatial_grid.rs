/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for efficient neighbor lookups.
 * It buckets boids into cubic cells of the D-dimensional space so a radius
 * query only has to look at the cells around the query point instead of the
 * whole flock.
 *
 * The grid is rebuilt from scratch every step. Its cell size is the larger of
 * the two query radii, so one build answers both the vision and the repulsion
 * queries. Cells are hashed rather than laid out densely because boids are
 * allowed to leave the arena.
 */

use std::collections::HashMap;

use rayon::prelude::*;

use crate::Vector;

// Cell size used when both radii are zero
const FALLBACK_CELL_SIZE: f32 = 1.0;

/// Radius queries over a set of positions captured at rebuild time.
pub trait NeighborhoodIndex<const D: usize>: Send + Sync {
    /// Rebuild internal structures from the current positions.
    fn rebuild(&mut self, positions: &[Vector<D>], cell_size: f32);

    /// Push the indices of all points within `radius` of point `index`,
    /// excluding `index` itself. No ordering is guaranteed.
    fn neighbors_within(&self, index: usize, radius: f32, out: &mut Vec<usize>);

    /// Number of points captured by the last rebuild.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct SpatialGrid<const D: usize> {
    pub cell_size: f32,
    cells: HashMap<[i32; D], Vec<usize>>,
    positions: Vec<Vector<D>>,
}

impl<const D: usize> SpatialGrid<D> {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: Self::usable_cell_size(cell_size),
            cells: HashMap::new(),
            positions: Vec::new(),
        }
    }

    fn usable_cell_size(cell_size: f32) -> f32 {
        if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            FALLBACK_CELL_SIZE
        }
    }

    // Convert world coordinates to grid cell coordinates
    #[inline]
    pub fn pos_to_cell(&self, pos: &Vector<D>) -> [i32; D] {
        // Float to int casts saturate, so far-away boids share the outermost cells
        std::array::from_fn(|axis| (pos[axis] / self.cell_size).floor() as i32)
    }

    // Clear the grid
    pub fn clear(&mut self) {
        self.cells.clear();
        self.positions.clear();
    }

    // Insert a boid into the grid
    #[inline]
    pub fn insert(&mut self, boid_index: usize, position: Vector<D>) {
        let cell = self.pos_to_cell(&position);
        self.cells.entry(cell).or_default().push(boid_index);
    }

    // Visit every occupied cell of the (2 * rings + 1)^D block around `center`.
    // Offsets that would step past the i32 range are skipped, so each cell is
    // visited at most once even when `center` sits on a saturated coordinate.
    fn for_each_cell_around(&self, center: [i32; D], rings: i32, mut visit: impl FnMut(&[usize])) {
        let mut offset = [-rings; D];
        loop {
            if let Some(key) = Self::offset_key(&center, &offset) {
                if let Some(cell) = self.cells.get(&key) {
                    visit(cell);
                }
            }

            // Advance the offset like an odometer
            let mut axis = 0;
            loop {
                if axis == D {
                    return;
                }
                if offset[axis] < rings {
                    offset[axis] += 1;
                    break;
                }
                offset[axis] = -rings;
                axis += 1;
            }
        }
    }

    fn offset_key(center: &[i32; D], offset: &[i32; D]) -> Option<[i32; D]> {
        let mut key = [0; D];
        for axis in 0..D {
            key[axis] = center[axis].checked_add(offset[axis])?;
        }
        Some(key)
    }
}

impl<const D: usize> Default for SpatialGrid<D> {
    fn default() -> Self {
        Self::new(FALLBACK_CELL_SIZE)
    }
}

impl<const D: usize> NeighborhoodIndex<D> for SpatialGrid<D> {
    fn rebuild(&mut self, positions: &[Vector<D>], cell_size: f32) {
        self.clear();
        self.cell_size = Self::usable_cell_size(cell_size);
        for (i, position) in positions.iter().enumerate() {
            self.insert(i, *position);
        }
        self.positions.extend_from_slice(positions);
    }

    fn neighbors_within(&self, index: usize, radius: f32, out: &mut Vec<usize>) {
        let center = self.positions[index];
        let radius_sq = radius * radius;
        let rings = (radius / self.cell_size).ceil() as i32;

        self.for_each_cell_around(self.pos_to_cell(&center), rings, |cell| {
            for &other in cell {
                if other != index && (self.positions[other] - center).norm_squared() <= radius_sq {
                    out.push(other);
                }
            }
        });
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}

/// All-pairs search, used when the spatial grid is disabled.
#[derive(Default)]
pub struct BruteForceIndex<const D: usize> {
    positions: Vec<Vector<D>>,
}

impl<const D: usize> NeighborhoodIndex<D> for BruteForceIndex<D> {
    fn rebuild(&mut self, positions: &[Vector<D>], _cell_size: f32) {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
    }

    fn neighbors_within(&self, index: usize, radius: f32, out: &mut Vec<usize>) {
        let center = self.positions[index];
        let radius_sq = radius * radius;
        out.extend(
            self.positions
                .iter()
                .enumerate()
                .filter(|&(other, pos)| other != index && (pos - center).norm_squared() <= radius_sq)
                .map(|(other, _)| other),
        );
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}

/// Neighbor lists of one step, one entry per boid slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhoods {
    /// Neighbors within the vision radius (cohesion and alignment).
    pub vision: Vec<Vec<usize>>,
    /// Neighbors within the repulsion radius (separation).
    pub repulsion: Vec<Vec<usize>>,
}

impl Neighborhoods {
    // Query both radii for every point of an already rebuilt index
    pub fn gather<const D: usize, I: NeighborhoodIndex<D> + ?Sized>(
        index: &I,
        vision_radius: f32,
        repulsion_radius: f32,
        parallel: bool,
    ) -> Self {
        let query = |i: usize| {
            let mut vision = Vec::new();
            let mut repulsion = Vec::new();
            index.neighbors_within(i, vision_radius, &mut vision);
            index.neighbors_within(i, repulsion_radius, &mut repulsion);
            (vision, repulsion)
        };

        let (vision, repulsion) = if parallel {
            let chunk_size = std::cmp::max(index.len() / rayon::current_num_threads(), 1);
            (0..index.len())
                .into_par_iter()
                .with_min_len(chunk_size)
                .map(query)
                .unzip()
        } else {
            (0..index.len()).map(query).unzip()
        };

        Self { vision, repulsion }
    }

    pub fn len(&self) -> usize {
        self.vision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vision.is_empty()
    }
}
