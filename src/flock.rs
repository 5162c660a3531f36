/*
 * Flock Module
 *
 * This module defines the Flock struct, the aggregate state of a simulation:
 * per-slot positions, velocities and colors, the arena, the live parameters
 * and the reusable neighbor indices.
 *
 * The host drives the flock by calling `move_boids`, reads positions back for
 * drawing and assigns `params` fields between steps. Stepping is synchronous
 * and single-writer; wrap the flock in a lock if several threads touch it.
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;
use tracing::debug;

use crate::error::{FlockError, Result};
use crate::params::{FlockConfig, FlockParams};
use crate::physics::{self, StepReport};
use crate::population::BoidId;
use crate::rules;
use crate::spatial_grid::{BruteForceIndex, NeighborhoodIndex, SpatialGrid};
use crate::Vector;

pub struct Flock<const D: usize> {
    /// Live parameters, read at the start of every step.
    pub params: FlockParams,
    pub(crate) config: FlockConfig<D>,
    pub(crate) sampling_region: [(f32, f32); D],
    pub(crate) positions: Vec<Vector<D>>,
    pub(crate) velocities: Vec<Vector<D>>,
    pub(crate) colors: Vec<f32>,
    pub(crate) ids: Vec<BoidId>,
    pub(crate) slots: SlotMap<BoidId, usize>,
    pub(crate) rng: StdRng,
    grid: SpatialGrid<D>,
    brute_force: BruteForceIndex<D>,
    // Parameters used by the previous step, for change logging
    applied_params: FlockParams,
    last_report: Option<StepReport>,
}

impl<const D: usize> Flock<D> {
    // Create a flock with `config.count` boids sampled in the init region
    pub fn new(config: FlockConfig<D>) -> Result<Self> {
        let mut flock = Self::empty(config)?;
        flock.populate();
        debug!(
            boids = flock.len(),
            dimensions = D,
            arena = ?flock.config.arena_shape,
            "flock created"
        );
        Ok(flock)
    }

    // Create a flock from explicit positions and velocities. The population
    // size of the config is replaced by the number of positions.
    pub fn from_state(
        mut config: FlockConfig<D>,
        positions: Vec<Vector<D>>,
        velocities: Vec<Vector<D>>,
    ) -> Result<Self> {
        if positions.len() != velocities.len() {
            return Err(FlockError::StateLengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        if positions
            .iter()
            .chain(&velocities)
            .any(|v| !v.iter().all(|c| c.is_finite()))
        {
            return Err(FlockError::NonFiniteParameter { name: "initial state" });
        }

        config.count = positions.len();
        let mut flock = Self::empty(config)?;
        for (position, velocity) in positions.into_iter().zip(velocities) {
            let color = flock.rng.gen::<f32>();
            flock.push_boid(position, velocity, color);
        }
        debug!(boids = flock.len(), dimensions = D, "flock created from explicit state");
        Ok(flock)
    }

    fn empty(config: FlockConfig<D>) -> Result<Self> {
        config.validate()?;
        let sampling_region = config.sampling_region()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            params: config.params,
            sampling_region,
            positions: Vec::with_capacity(config.count),
            velocities: Vec::with_capacity(config.count),
            colors: Vec::with_capacity(config.count),
            ids: Vec::with_capacity(config.count),
            slots: SlotMap::with_capacity_and_key(config.count),
            rng,
            grid: SpatialGrid::new(config.params.grid_cell_size()),
            brute_force: BruteForceIndex::default(),
            applied_params: config.params,
            last_report: None,
            config,
        })
    }

    // Sample `config.count` boids: positions uniform in the init region,
    // velocities from `random_velocity`
    fn populate(&mut self) {
        for _ in 0..self.config.count {
            let region = self.sampling_region;
            let position: Vector<D> = Vector::from_fn(|axis, _| {
                let (low, high) = region[axis];
                low + self.rng.gen::<f32>() * (high - low)
            });
            let velocity = random_velocity(&mut self.rng, self.params.max_speed);
            let color = self.rng.gen::<f32>();
            self.push_boid(position, velocity, color);
        }
    }

    // Resample the configured population with the current parameters.
    // Every previously issued id becomes unknown.
    pub fn restart(&mut self) {
        self.positions.clear();
        self.velocities.clear();
        self.colors.clear();
        self.ids.clear();
        self.slots.clear();
        self.last_report = None;
        self.populate();
        debug!(boids = self.len(), "flock restarted");
    }

    // Validate and install a new parameter set
    pub fn set_params(&mut self, params: FlockParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    // Restore the parameters the flock was created with
    pub fn reset_params(&mut self) {
        self.params = self.config.params;
    }

    // Advance the simulation by one step. On error nothing is modified.
    pub fn step(&mut self) -> Result<StepReport> {
        self.params.validate()?;
        if self.params != self.applied_params {
            debug!(
                changed = ?self.params.changed_fields(&self.applied_params),
                "flock parameters changed"
            );
            self.applied_params = self.params;
        }

        let index: &mut dyn NeighborhoodIndex<D> = if self.params.enable_spatial_grid {
            &mut self.grid
        } else {
            &mut self.brute_force
        };
        let outcome = physics::step_state(
            index,
            &self.positions,
            &self.velocities,
            &self.config.arena_shape,
            &self.params,
        )?;

        self.positions = outcome.positions;
        self.velocities = outcome.velocities;
        self.last_report = Some(outcome.report);
        Ok(outcome.report)
    }

    // Advance the simulation by `steps` sequential steps
    pub fn move_boids(&mut self, steps: usize) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vector<D>] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vector<D>] {
        &self.velocities
    }

    /// Cosmetic per-boid value in `[0, 1)`, e.g. a colormap coordinate.
    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    /// Stable ids, in slot order.
    pub fn ids(&self) -> &[BoidId] {
        &self.ids
    }

    // Positions as plain arrays, for hosts that draw points
    pub fn position_rows(&self) -> Vec<[f32; D]> {
        self.positions
            .iter()
            .map(|p| std::array::from_fn(|axis| p[axis]))
            .collect()
    }

    pub fn arena_shape(&self) -> &[f32; D] {
        &self.config.arena_shape
    }

    /// The init region after clamping into the arena.
    pub fn init_region(&self) -> &[(f32, f32); D] {
        &self.sampling_region
    }

    pub fn config(&self) -> &FlockConfig<D> {
        &self.config
    }

    pub fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }
}

// Random velocity with each component uniform in [-max_speed / 2, max_speed / 2).
// From five dimensions on such a sample can be longer than max_speed, so its
// norm is capped.
pub(crate) fn random_velocity<const D: usize>(rng: &mut impl Rng, max_speed: f32) -> Vector<D> {
    let velocity: Vector<D> = Vector::from_fn(|_, _| (rng.gen::<f32>() - 0.5) * max_speed);
    rules::limit_speed(velocity, 0.0, max_speed).0
}
