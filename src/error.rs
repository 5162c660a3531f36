/*
 * Error Module
 *
 * This module defines the errors reported by the flock engine. Configuration
 * problems are rejected when a flock is built or its parameters are changed,
 * population errors are reported by add/remove, and a step that would produce
 * a non-finite state is refused without touching the flock.
 */

use thiserror::Error;

use crate::population::BoidId;

pub type Result<T> = std::result::Result<T, FlockError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlockError {
    #[error("invalid speed bounds: min_speed {min} must be within [0, max_speed {max}]")]
    InvalidSpeedBounds { min: f32, max: f32 },

    #[error("{name} must be non-negative, got {value}")]
    NegativeRadius { name: &'static str, value: f32 },

    #[error("{name} must be non-negative, got {value}")]
    NegativeParameter { name: &'static str, value: f32 },

    #[error("{name} must be finite")]
    NonFiniteParameter { name: &'static str },

    #[error("arena extent on axis {axis} must be positive and finite, got {extent}")]
    InvalidArena { axis: usize, extent: f32 },

    #[error("init region on axis {axis} is empty after clamping: [{low}, {high}]")]
    EmptyInitRegion { axis: usize, low: f32, high: f32 },

    #[error("dimension mismatch: expected {expected} coordinates, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("state length mismatch: {positions} positions but {velocities} velocities")]
    StateLengthMismatch { positions: usize, velocities: usize },

    #[error("no boid at the given position")]
    NotFound,

    #[error("unknown boid {0:?}")]
    UnknownBoid(BoidId),

    #[error("step produced a non-finite state for the boid in slot {slot}")]
    NonFiniteState { slot: usize },
}
