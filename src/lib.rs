/*
 * Boid Flocking Engine - Module Definitions
 *
 * This file defines the module structure of the flocking engine. The engine
 * simulates a population of boids in a bounded D-dimensional arena: each step
 * rebuilds a spatial index, evaluates the cohesion, separation, alignment and
 * containment rules, clamps speeds and integrates positions.
 *
 * Rendering and stepping cadence belong to the host; it calls `move_boids`,
 * reads positions back, and forwards parameter and population changes.
 */

// Re-export key components for easier access
pub use error::{FlockError, Result};
pub use flock::Flock;
pub use params::{FlockConfig, FlockParams, MIN_SPEED};
pub use physics::StepReport;
pub use population::BoidId;
pub use spatial_grid::{BruteForceIndex, NeighborhoodIndex, Neighborhoods, SpatialGrid};

// Define modules
pub mod error;
pub mod flock;
pub mod params;
pub mod physics;
pub mod population;
pub mod rules;
pub mod spatial_grid;

/// A position or velocity in the D-dimensional arena.
pub type Vector<const D: usize> = nalgebra::SVector<f32, D>;
