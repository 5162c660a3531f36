/*
 * Population Module
 *
 * This module adds and removes boids while a simulation runs. Storage is
 * indexed by slot, and slots move when boids are removed, so every boid also
 * carries a BoidId that stays valid until that boid is removed.
 *
 * Two removal paths exist:
 * - by id, which swap-removes and moves only the last boid
 * - by exact position, which shifts every later slot down by one
 *
 * Exact float equality is brittle (a position read back before a step no
 * longer matches after it), so hosts should prefer ids.
 */

use rand::Rng;
use slotmap::new_key_type;
use tracing::debug;

use crate::error::{FlockError, Result};
use crate::flock::{random_velocity, Flock};
use crate::Vector;

new_key_type! {
    /// Stable handle for a boid, independent of its storage slot.
    pub struct BoidId;
}

impl<const D: usize> Flock<D> {
    pub(crate) fn push_boid(&mut self, position: Vector<D>, velocity: Vector<D>, color: f32) -> BoidId {
        let slot = self.positions.len();
        let id = self.slots.insert(slot);
        self.positions.push(position);
        self.velocities.push(velocity);
        self.colors.push(color);
        self.ids.push(id);
        id
    }

    // Append a boid with a random velocity. It takes part in the next step.
    pub fn add_boid(&mut self, position: Vector<D>) -> Result<BoidId> {
        if !position.iter().all(|c| c.is_finite()) {
            return Err(FlockError::NonFiniteParameter { name: "position" });
        }
        let velocity = random_velocity(&mut self.rng, self.params.max_speed);
        let color = self.rng.gen::<f32>();
        let id = self.push_boid(position, velocity, color);
        debug!(?id, boids = self.len(), "boid added");
        Ok(id)
    }

    // Same as `add_boid` for untyped coordinates
    pub fn add_boid_from_slice(&mut self, coordinates: &[f32]) -> Result<BoidId> {
        if coordinates.len() != D {
            return Err(FlockError::DimensionMismatch {
                expected: D,
                found: coordinates.len(),
            });
        }
        self.add_boid(Vector::from_column_slice(coordinates))
    }

    // Remove the first boid whose position equals `position` exactly.
    // Later boids shift down one slot.
    pub fn remove_boid(&mut self, position: &Vector<D>) -> Result<BoidId> {
        let slot = self
            .positions
            .iter()
            .position(|p| p == position)
            .ok_or(FlockError::NotFound)?;

        self.positions.remove(slot);
        self.velocities.remove(slot);
        self.colors.remove(slot);
        let id = self.ids.remove(slot);
        self.slots.remove(id);

        for (shifted_slot, shifted_id) in self.ids.iter().enumerate().skip(slot) {
            if let Some(entry) = self.slots.get_mut(*shifted_id) {
                *entry = shifted_slot;
            }
        }

        debug!(?id, slot, boids = self.len(), "boid removed by position");
        Ok(id)
    }

    // Remove a boid by id. The last boid moves into the freed slot.
    pub fn remove_boid_by_id(&mut self, id: BoidId) -> Result<()> {
        let slot = self.slots.remove(id).ok_or(FlockError::UnknownBoid(id))?;

        self.positions.swap_remove(slot);
        self.velocities.swap_remove(slot);
        self.colors.swap_remove(slot);
        self.ids.swap_remove(slot);

        if let Some(&moved) = self.ids.get(slot) {
            if let Some(entry) = self.slots.get_mut(moved) {
                *entry = slot;
            }
        }

        debug!(?id, slot, boids = self.len(), "boid removed");
        Ok(())
    }

    pub fn contains(&self, id: BoidId) -> bool {
        self.slots.contains_key(id)
    }

    /// Current storage slot of a boid. Slots change when boids are removed.
    pub fn slot_of(&self, id: BoidId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    pub fn position_of(&self, id: BoidId) -> Option<&Vector<D>> {
        self.slot_of(id).map(|slot| &self.positions[slot])
    }

    pub fn velocity_of(&self, id: BoidId) -> Option<&Vector<D>> {
        self.slot_of(id).map(|slot| &self.velocities[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FlockConfig;

    fn v(x: f32, y: f32) -> Vector<2> {
        Vector::from([x, y])
    }

    fn line_flock() -> Flock<2> {
        let positions = vec![v(1.0, 1.0), v(2.0, 2.0), v(3.0, 3.0), v(4.0, 4.0)];
        let velocities = vec![v(1.0, 0.0), v(2.0, 0.0), v(3.0, 0.0), v(4.0, 0.0)];
        Flock::from_state(FlockConfig::new(0, [100.0, 100.0]).with_seed(3), positions, velocities).unwrap()
    }

    fn assert_ids_resolve(flock: &Flock<2>) {
        for (slot, id) in flock.ids().iter().enumerate() {
            assert_eq!(flock.slot_of(*id), Some(slot));
        }
    }

    #[test]
    fn added_boid_is_appended_with_bounded_velocity() {
        let mut flock = line_flock();
        let id = flock.add_boid(v(10.0, 20.0)).unwrap();

        assert_eq!(flock.len(), 5);
        assert_eq!(flock.slot_of(id), Some(4));
        assert_eq!(flock.position_of(id), Some(&v(10.0, 20.0)));
        let half = flock.params.max_speed / 2.0;
        assert!(flock.velocity_of(id).unwrap().iter().all(|c| c.abs() <= half));
        assert_eq!(flock.colors().len(), 5);
    }

    #[test]
    fn remove_by_position_shifts_later_slots() {
        let mut flock = line_flock();
        let ids = flock.ids().to_vec();

        let removed = flock.remove_boid(&v(2.0, 2.0)).unwrap();

        assert_eq!(removed, ids[1]);
        assert_eq!(flock.positions(), &[v(1.0, 1.0), v(3.0, 3.0), v(4.0, 4.0)]);
        assert_eq!(flock.velocities(), &[v(1.0, 0.0), v(3.0, 0.0), v(4.0, 0.0)]);
        assert!(!flock.contains(removed));
        assert_eq!(flock.slot_of(ids[2]), Some(1));
        assert_ids_resolve(&flock);
    }

    #[test]
    fn remove_by_position_takes_the_first_match() {
        let mut flock = line_flock();
        let id = flock.add_boid(v(1.0, 1.0)).unwrap();
        let first = flock.ids()[0];

        assert_eq!(flock.remove_boid(&v(1.0, 1.0)).unwrap(), first);
        assert!(flock.contains(id));
        assert_ids_resolve(&flock);
    }

    #[test]
    fn remove_by_position_miss_is_not_found() {
        let mut flock = line_flock();
        assert_eq!(flock.remove_boid(&v(2.0, 2.000_001)), Err(FlockError::NotFound));
        assert_eq!(flock.len(), 4);
    }

    #[test]
    fn remove_by_id_swaps_in_the_last_boid() {
        let mut flock = line_flock();
        let ids = flock.ids().to_vec();

        flock.remove_boid_by_id(ids[0]).unwrap();

        assert_eq!(flock.positions(), &[v(4.0, 4.0), v(2.0, 2.0), v(3.0, 3.0)]);
        assert_eq!(flock.slot_of(ids[3]), Some(0));
        assert_eq!(flock.velocity_of(ids[3]), Some(&v(4.0, 0.0)));
        assert_ids_resolve(&flock);
    }

    #[test]
    fn removing_the_last_boid_by_id() {
        let mut flock = line_flock();
        let last = *flock.ids().last().unwrap();
        flock.remove_boid_by_id(last).unwrap();
        assert_eq!(flock.len(), 3);
        assert_ids_resolve(&flock);
    }

    #[test]
    fn stale_id_is_rejected() {
        let mut flock = line_flock();
        let id = flock.ids()[2];
        flock.remove_boid_by_id(id).unwrap();
        assert_eq!(flock.remove_boid_by_id(id), Err(FlockError::UnknownBoid(id)));
        assert_eq!(flock.position_of(id), None);
    }

    #[test]
    fn slice_with_wrong_dimension_is_rejected() {
        let mut flock = line_flock();
        assert_eq!(
            flock.add_boid_from_slice(&[1.0, 2.0, 3.0]),
            Err(FlockError::DimensionMismatch { expected: 2, found: 3 })
        );
        let id = flock.add_boid_from_slice(&[7.0, 8.0]).unwrap();
        assert_eq!(flock.position_of(id), Some(&v(7.0, 8.0)));
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let mut flock = line_flock();
        assert!(flock.add_boid(v(f32::NAN, 1.0)).is_err());
        assert_eq!(flock.len(), 4);
    }

    #[test]
    fn emptied_flock_can_step_and_grow_again() {
        let mut flock = line_flock();
        for id in flock.ids().to_vec() {
            flock.remove_boid_by_id(id).unwrap();
        }
        assert!(flock.is_empty());
        flock.move_boids(2).unwrap();

        flock.add_boid(v(50.0, 50.0)).unwrap();
        flock.move_boids(1).unwrap();
        assert_eq!(flock.len(), 1);
        assert_eq!(flock.velocities().len(), 1);
    }
}
