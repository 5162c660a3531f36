/*
 * Flocking Rules Module
 *
 * This module holds the four steering rules and the speed limit. Each rule is
 * a pure function of the pre-step state for a single boid:
 * 1. Cohesion: displacement towards the center of mass of visible neighbors
 * 2. Separation: accumulated push away from neighbors that are too close
 * 3. Alignment: difference between the neighbors' mean velocity and our own
 * 4. Containment: fixed inward push near the arena edges
 *
 * The rules return raw displacements; weighting happens in the physics step.
 * A boid without neighbors is handled separately by every rule and never
 * produces NaN:
 * - cohesion uses the boid's own position as the center of mass (zero displacement)
 * - separation sums over nothing (zero vector)
 * - alignment uses a zero mean velocity (the result is minus the own velocity)
 */

use crate::Vector;

/// Push applied on an axis where a boid is closer than `margin` to the lower edge.
pub const PUSH_FROM_LOWER_EDGE: f32 = 1.0;
/// Push applied on an axis where a boid is closer than `margin` to the upper edge.
pub const PUSH_FROM_UPPER_EDGE: f32 = -0.5;

// Relative slack on the speed bounds so that clamping twice is a no-op
const SPEED_TOLERANCE: f32 = 1e-5;

// Displacement from a boid to the center of mass of its vision neighbors
pub fn displacement_to_com<const D: usize>(
    index: usize,
    positions: &[Vector<D>],
    neighbors: &[usize],
) -> Vector<D> {
    let own = positions[index];
    let center_of_mass = if neighbors.is_empty() {
        own
    } else {
        let sum = neighbors
            .iter()
            .fold(Vector::<D>::zeros(), |acc, &other| acc + positions[other]);
        sum / neighbors.len() as f32
    };
    center_of_mass - own
}

// Sum of the vectors pointing from each repulsion neighbor to the boid
pub fn away_from_each_other<const D: usize>(
    index: usize,
    positions: &[Vector<D>],
    neighbors: &[usize],
) -> Vector<D> {
    let own = positions[index];
    neighbors
        .iter()
        .fold(Vector::<D>::zeros(), |acc, &other| acc + (own - positions[other]))
}

// Difference between the mean velocity of the vision neighbors and our own
pub fn velocity_match<const D: usize>(
    index: usize,
    velocities: &[Vector<D>],
    neighbors: &[usize],
) -> Vector<D> {
    let mean_velocity: Vector<D> = if neighbors.is_empty() {
        Vector::zeros()
    } else {
        let sum = neighbors
            .iter()
            .fold(Vector::<D>::zeros(), |acc, &other| acc + velocities[other]);
        sum / neighbors.len() as f32
    };
    mean_velocity - velocities[index]
}

// Per-axis inward push for a boid near the arena edges. When the margins
// overlap (margin above half the extent) the upper edge wins.
pub fn keep_in<const D: usize>(position: &Vector<D>, arena_shape: &[f32; D], margin: f32) -> Vector<D> {
    Vector::from_fn(|axis, _| {
        let coordinate = position[axis];
        if arena_shape[axis] - margin < coordinate {
            PUSH_FROM_UPPER_EDGE
        } else if coordinate < margin {
            PUSH_FROM_LOWER_EDGE
        } else {
            0.0
        }
    })
}

/// What `limit_speed` did to a velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedClamp {
    Unchanged,
    /// Faster than `max_speed`, scaled down.
    Capped,
    /// Slower than `min_speed`, scaled up.
    Raised,
}

// Rescale a velocity so its speed lies in [min_speed, max_speed], keeping the
// direction. A zero velocity has no direction and is left at zero.
pub fn limit_speed<const D: usize>(
    velocity: Vector<D>,
    min_speed: f32,
    max_speed: f32,
) -> (Vector<D>, SpeedClamp) {
    let speed = velocity.norm();
    if speed > max_speed * (1.0 + SPEED_TOLERANCE) {
        (velocity * (max_speed / speed), SpeedClamp::Capped)
    } else if speed > 0.0 && speed < min_speed * (1.0 - SPEED_TOLERANCE) {
        (velocity * (min_speed / speed), SpeedClamp::Raised)
    } else {
        (velocity, SpeedClamp::Unchanged)
    }
}

/// Counts of boids whose speed was clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClampCounts {
    pub capped: usize,
    pub raised: usize,
}

// Apply the speed limit to every velocity in place
pub fn limit_speeds<const D: usize>(
    velocities: &mut [Vector<D>],
    min_speed: f32,
    max_speed: f32,
) -> ClampCounts {
    let mut counts = ClampCounts::default();
    for velocity in velocities.iter_mut() {
        let (limited, clamp) = limit_speed(*velocity, min_speed, max_speed);
        match clamp {
            SpeedClamp::Capped => counts.capped += 1,
            SpeedClamp::Raised => counts.raised += 1,
            SpeedClamp::Unchanged => {}
        }
        *velocity = limited;
    }
    counts
}
