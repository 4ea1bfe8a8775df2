//! Choosing where warriors are loaded for each round.
//!
//! Warrior 0 is always loaded at address 0. Every other start address is
//! drawn from a seeded [`ChaCha8Rng`], so a given seed always produces the
//! same sequence of placements.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::{CoreConfig, Error, Placement};

/// Random draws attempted before falling back to evenly spaced slots.
const MAX_ATTEMPTS: usize = 32;

/// How far apart warriors are placed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Separation {
    /// Random positions at least `min_distance` apart
    Random,
    /// Warrior `i` is loaded at `i * distance`
    Fixed(u32),
}

impl Default for Separation {
    fn default() -> Self {
        Self::Random
    }
}

#[derive(Clone, Debug)]
pub struct Placer {
    rng: ChaCha8Rng,
    separation: Separation,
    core_size: u32,
    min_distance: u32,
}

impl Placer {
    pub fn new(seed: u64, separation: Separation, config: &CoreConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            separation,
            core_size: config.core_size,
            min_distance: config.min_distance,
        }
    }

    fn distance(&self) -> u32 {
        match self.separation {
            Separation::Random => self.min_distance,
            Separation::Fixed(distance) => distance,
        }
    }

    /// Fail if warriors of the given lengths cannot be placed in every round.
    pub fn check(&self, lengths: &[u32]) -> Result<(), Error> {
        let distance = self.distance();
        for (id, &length) in lengths.iter().enumerate() {
            if length > distance {
                return Err(Error::MinDistanceTooSmall {
                    id,
                    min_distance: distance,
                    length,
                });
            }
        }
        if lengths.len() as u64 * u64::from(distance) > u64::from(self.core_size) {
            return Err(Error::MinDistanceTooLarge {
                warriors: lengths.len(),
                min_distance: distance,
                core_size: self.core_size,
            });
        }
        Ok(())
    }

    /// Fill `placement` with positions for `count` warriors in `round`.
    /// Assumes [`check`](Self::check) passed for that many warriors.
    pub fn place(&mut self, count: usize, round: usize, placement: &mut Placement) {
        placement.positions.clear();
        placement.first = round % count.max(1);

        match self.separation {
            Separation::Fixed(distance) => placement
                .positions
                .extend((0..count as u32).map(|i| i * distance)),
            Separation::Random if count == 2 => {
                let spread = self.core_size - 2 * self.min_distance;
                let second = self.min_distance + self.rng.gen_range(0..=spread);
                placement.positions.extend([0, second]);
            }
            Separation::Random => self.place_many(count, &mut placement.positions),
        }
    }

    fn place_many(&mut self, count: usize, positions: &mut Vec<u32>) {
        for _ in 0..MAX_ATTEMPTS {
            positions.clear();
            positions.push(0);
            while positions.len() < count {
                let candidate = self.rng.gen_range(0..self.core_size);
                if !positions
                    .iter()
                    .all(|&other| self.circular_distance(other, candidate) >= self.min_distance)
                {
                    break;
                }
                positions.push(candidate);
            }
            if positions.len() == count {
                return;
            }
        }

        let spacing = self.core_size / count as u32;
        let mut slots: Vec<u32> = (1..count as u32).collect();
        slots.shuffle(&mut self.rng);
        positions.clear();
        positions.push(0);
        positions.extend(slots.into_iter().map(|slot| slot * spacing));
    }

    fn circular_distance(&self, a: u32, b: u32) -> u32 {
        let forward = if a > b { a - b } else { b - a };
        forward.min(self.core_size - forward)
    }
}
