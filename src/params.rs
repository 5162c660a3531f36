/*
 * Simulation Parameters Module
 *
 * This module defines the FlockParams struct with every behavior parameter
 * that can be tuned while a simulation is running, and the FlockConfig struct
 * holding what is fixed when a flock is created (population size, arena,
 * initial sampling region and random seed).
 *
 * Parameters are plain public fields so a host can assign them between steps.
 * They are validated whenever they are handed to the flock and again at the
 * start of every step.
 */

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FlockError, Result};

/// Lower speed bound used unless a host overrides it.
pub const MIN_SPEED: f32 = 0.5;

// Parameters for the simulation that can be adjusted between steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    /// Neighbor radius for cohesion and alignment.
    pub vision_radius: f32,
    /// Neighbor radius for separation.
    pub repulsion_radius: f32,
    pub cohesion_weight: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    /// Distance from an arena edge where containment starts pushing inward.
    pub margin: f32,
    pub max_speed: f32,
    pub min_speed: f32,
    // Performance settings
    pub enable_parallel: bool,
    pub enable_spatial_grid: bool,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            vision_radius: 5.0,
            repulsion_radius: 20.0,
            cohesion_weight: 0.2,
            separation_weight: 0.2,
            alignment_weight: 0.2,
            margin: 10.0,
            max_speed: 15.0,
            min_speed: MIN_SPEED,
            enable_parallel: true,
            enable_spatial_grid: true,
        }
    }
}

impl FlockParams {
    // Values the interactive viewer starts with. Its sliders express the
    // weights in percent, hence the division by 100.
    pub fn viewer_preset() -> Self {
        Self {
            vision_radius: 100.0,
            repulsion_radius: 20.0,
            cohesion_weight: 0.1 / 100.0,
            separation_weight: 1.0 / 100.0,
            alignment_weight: 1.0 / 100.0,
            margin: 5.0,
            max_speed: 15.0,
            ..Self::default()
        }
    }

    // Reject configurations that cannot be simulated. Weights may be negative
    // (a negative cohesion weight disperses the flock) but must be finite.
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            ("vision_radius", self.vision_radius),
            ("repulsion_radius", self.repulsion_radius),
            ("cohesion_weight", self.cohesion_weight),
            ("separation_weight", self.separation_weight),
            ("alignment_weight", self.alignment_weight),
            ("margin", self.margin),
            ("max_speed", self.max_speed),
            ("min_speed", self.min_speed),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(FlockError::NonFiniteParameter { name });
            }
        }

        for (name, value) in [
            ("vision_radius", self.vision_radius),
            ("repulsion_radius", self.repulsion_radius),
        ] {
            if value < 0.0 {
                return Err(FlockError::NegativeRadius { name, value });
            }
        }

        if self.margin < 0.0 {
            return Err(FlockError::NegativeParameter {
                name: "margin",
                value: self.margin,
            });
        }

        if self.min_speed < 0.0 || self.max_speed < 0.0 || self.min_speed > self.max_speed {
            return Err(FlockError::InvalidSpeedBounds {
                min: self.min_speed,
                max: self.max_speed,
            });
        }

        Ok(())
    }

    // Names of the fields that differ from `previous`, used for change logging
    pub fn changed_fields(&self, previous: &FlockParams) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.vision_radius != previous.vision_radius {
            changed.push("vision_radius");
        }
        if self.repulsion_radius != previous.repulsion_radius {
            changed.push("repulsion_radius");
        }
        if self.cohesion_weight != previous.cohesion_weight {
            changed.push("cohesion_weight");
        }
        if self.separation_weight != previous.separation_weight {
            changed.push("separation_weight");
        }
        if self.alignment_weight != previous.alignment_weight {
            changed.push("alignment_weight");
        }
        if self.margin != previous.margin {
            changed.push("margin");
        }
        if self.max_speed != previous.max_speed {
            changed.push("max_speed");
        }
        if self.min_speed != previous.min_speed {
            changed.push("min_speed");
        }
        if self.enable_parallel != previous.enable_parallel {
            changed.push("enable_parallel");
        }
        if self.enable_spatial_grid != previous.enable_spatial_grid {
            changed.push("enable_spatial_grid");
        }
        changed
    }

    // Cell size for the spatial grid: both radii must be answerable from one build
    pub fn grid_cell_size(&self) -> f32 {
        self.vision_radius.max(self.repulsion_radius)
    }
}

/// Construction-time settings of a flock.
#[derive(Debug, Clone, PartialEq)]
pub struct FlockConfig<const D: usize> {
    pub count: usize,
    /// Extent of the arena on each axis; the arena is `[0, extent)`.
    pub arena_shape: [f32; D],
    /// Per-axis `(low, high)` box initial positions are drawn from.
    /// `None` samples the whole arena.
    pub init_region: Option<[(f32, f32); D]>,
    pub params: FlockParams,
    /// Seed for the flock's random generator; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl<const D: usize> FlockConfig<D> {
    pub fn new(count: usize, arena_shape: [f32; D]) -> Self {
        Self {
            count,
            arena_shape,
            init_region: None,
            params: FlockParams::default(),
            seed: None,
        }
    }

    // Build a config from untyped coordinates, as handed over by a host
    pub fn from_slices(
        count: usize,
        arena_shape: &[f32],
        init_region: Option<&[(f32, f32)]>,
    ) -> Result<Self> {
        let arena_shape: [f32; D] =
            arena_shape
                .try_into()
                .map_err(|_| FlockError::DimensionMismatch {
                    expected: D,
                    found: arena_shape.len(),
                })?;

        let init_region = match init_region {
            Some(region) => Some(region.try_into().map_err(|_| {
                FlockError::DimensionMismatch {
                    expected: D,
                    found: region.len(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            init_region,
            ..Self::new(count, arena_shape)
        })
    }

    pub fn with_init_region(mut self, region: [(f32, f32); D]) -> Self {
        self.init_region = Some(region);
        self
    }

    pub fn with_params(mut self, params: FlockParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (axis, &extent) in self.arena_shape.iter().enumerate() {
            if !extent.is_finite() || extent <= 0.0 {
                return Err(FlockError::InvalidArena { axis, extent });
            }
        }
        self.params.validate()?;
        self.sampling_region().map(|_| ())
    }

    // The init region clamped into the arena. Clamping is a convenience for
    // sampling, so it only warns; a region left empty is an error.
    pub fn sampling_region(&self) -> Result<[(f32, f32); D]> {
        let Some(requested) = self.init_region else {
            return Ok(std::array::from_fn(|axis| (0.0, self.arena_shape[axis])));
        };

        let mut region = requested;
        for (axis, (low, high)) in region.iter_mut().enumerate() {
            if !low.is_finite() || !high.is_finite() {
                return Err(FlockError::NonFiniteParameter {
                    name: "init_region",
                });
            }
            let extent = self.arena_shape[axis];
            let (clamped_low, clamped_high) = (low.max(0.0), high.min(extent));
            if clamped_low != *low || clamped_high != *high {
                warn!(
                    axis,
                    low = *low,
                    high = *high,
                    clamped_low,
                    clamped_high,
                    "init region clamped into the arena"
                );
            }
            // The arena is half-open, so a region starting at the extent is empty
            if clamped_low > clamped_high || clamped_low >= extent {
                return Err(FlockError::EmptyInitRegion {
                    axis,
                    low: clamped_low,
                    high: clamped_high,
                });
            }
            *low = clamped_low;
            *high = clamped_high;
        }
        Ok(region)
    }
}

impl FlockConfig<2> {
    // The flock the interactive viewer creates on start and on restart
    pub fn viewer_preset() -> Self {
        Self::new(100, [1000.0, 1000.0])
            .with_init_region([(250.0, 750.0), (250.0, 750.0)])
            .with_params(FlockParams::viewer_preset())
            .with_seed(0)
    }
}
