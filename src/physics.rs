/*
 * Physics Module
 *
 * This module advances the flock by one step:
 * 1. Rebuild the neighbor index over the current positions
 * 2. Gather vision and repulsion neighbors from that single build
 * 3. Evaluate the four rules for every boid and combine them with the weights
 * 4. Clamp speeds and integrate positions
 *
 * All rules read the pre-step state only, so per-boid evaluation runs in
 * parallel when enabled. The new state is returned instead of written in
 * place so a failed step leaves the flock untouched.
 */

use rayon::prelude::*;
use tracing::trace;

use crate::error::{FlockError, Result};
use crate::params::FlockParams;
use crate::rules::{self, ClampCounts};
use crate::spatial_grid::{NeighborhoodIndex, Neighborhoods};
use crate::Vector;

/// Summary of one simulation step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    pub boids: usize,
    /// Boids with no neighbor within the vision radius.
    pub isolated: usize,
    pub mean_vision_neighbors: f32,
    /// Boids slowed down to `max_speed`.
    pub capped: usize,
    /// Boids sped up to `min_speed`.
    pub raised: usize,
}

/// State produced by a step, not yet committed to the flock.
#[derive(Debug, Clone)]
pub struct StepOutcome<const D: usize> {
    pub positions: Vec<Vector<D>>,
    pub velocities: Vec<Vector<D>>,
    pub report: StepReport,
}

// Velocity after adding the weighted rule outputs, before clamping
fn combined_velocity<const D: usize>(
    i: usize,
    positions: &[Vector<D>],
    velocities: &[Vector<D>],
    neighborhoods: &Neighborhoods,
    arena_shape: &[f32; D],
    params: &FlockParams,
) -> Vector<D> {
    let cohesion = rules::displacement_to_com(i, positions, &neighborhoods.vision[i]);
    let separation = rules::away_from_each_other(i, positions, &neighborhoods.repulsion[i]);
    let alignment = rules::velocity_match(i, velocities, &neighborhoods.vision[i]);
    let containment = rules::keep_in(&positions[i], arena_shape, params.margin);

    velocities[i]
        + cohesion * params.cohesion_weight
        + separation * params.separation_weight
        + alignment * params.alignment_weight
        + containment
}

// Run one step over the given state. Parameters are expected to be validated.
pub fn step_state<const D: usize>(
    index: &mut dyn NeighborhoodIndex<D>,
    positions: &[Vector<D>],
    velocities: &[Vector<D>],
    arena_shape: &[f32; D],
    params: &FlockParams,
) -> Result<StepOutcome<D>> {
    if positions.len() != velocities.len() {
        return Err(FlockError::StateLengthMismatch {
            positions: positions.len(),
            velocities: velocities.len(),
        });
    }

    let count = positions.len();

    // One build serves both radii
    index.rebuild(positions, params.grid_cell_size());
    let neighborhoods = Neighborhoods::gather(
        &*index,
        params.vision_radius,
        params.repulsion_radius,
        params.enable_parallel,
    );

    let evaluate =
        |i: usize| combined_velocity(i, positions, velocities, &neighborhoods, arena_shape, params);

    let mut new_velocities: Vec<Vector<D>> = if params.enable_parallel {
        // Process boids in chunks to reduce the number of parallel tasks
        let chunk_size = std::cmp::max(count / rayon::current_num_threads(), 1);
        (0..count)
            .into_par_iter()
            .with_min_len(chunk_size)
            .map(evaluate)
            .collect()
    } else {
        (0..count).map(evaluate).collect()
    };

    let ClampCounts { capped, raised } =
        rules::limit_speeds(&mut new_velocities, params.min_speed, params.max_speed);

    let new_positions: Vec<Vector<D>> = positions
        .iter()
        .zip(&new_velocities)
        .map(|(position, velocity)| position + velocity)
        .collect();

    // Refuse to commit anything non-finite
    if let Some(slot) = new_positions
        .iter()
        .zip(&new_velocities)
        .position(|(p, v)| !p.iter().chain(v.iter()).all(|c| c.is_finite()))
    {
        return Err(FlockError::NonFiniteState { slot });
    }

    let isolated = neighborhoods.vision.iter().filter(|n| n.is_empty()).count();
    let total_neighbors: usize = neighborhoods.vision.iter().map(Vec::len).sum();
    let report = StepReport {
        boids: count,
        isolated,
        mean_vision_neighbors: if count == 0 {
            0.0
        } else {
            total_neighbors as f32 / count as f32
        },
        capped,
        raised,
    };
    trace!(?report, "flock step");

    Ok(StepOutcome {
        positions: new_positions,
        velocities: new_velocities,
        report,
    })
}
