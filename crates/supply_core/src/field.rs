//! Seeded asteroid field generation.
//!
//! The same seed string always produces the same field. Asteroids cluster
//! toward the centre: each axis offset is a squared uniform sample plus a
//! small floor, with a random sign.

use crate::config::SimConfig;
use crate::math::{Fixed, Vec2Fixed};

/// Deterministic generator for field layout and cosmetic seeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRng {
    state: u64,
}

impl FieldRng {
    /// Generator from a numeric seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Generator from a seed string (FNV-1a over its bytes).
    #[must_use]
    pub fn from_seed_str(seed: &str) -> Self {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in seed.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Self::new(hash)
    }

    /// Next raw 64-bit state.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5_DEEC_E66D).wrapping_add(11);
        self.state
    }

    /// Next 32 well-mixed bits (the high half of the state).
    pub fn next_u32(&mut self) -> u32 {
        // Truncation keeps exactly the high half.
        #[allow(clippy::cast_possible_truncation)]
        let bits = (self.next_u64() >> 32) as u32;
        bits
    }

    /// Uniform fraction in `[0, 1)`.
    pub fn next_fraction(&mut self) -> Fixed {
        Fixed::from_bits(i64::from(self.next_u32()))
    }

    /// Uniform integer in `[0, n)`; `0` when `n` is zero.
    pub fn next_below(&mut self, n: u32) -> u32 {
        let wide = u64::from(self.next_u32()) * u64::from(n);
        #[allow(clippy::cast_possible_truncation)]
        let value = (wide >> 32) as u32;
        value
    }
}

/// One generated asteroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsteroidPlacement {
    /// World position.
    pub position: Vec2Fixed,
    /// Sprite rotation in turns.
    pub rotation: Fixed,
    /// Extractable value.
    pub value: u32,
}

/// Generate `config.asteroid_count` asteroids.
pub fn generate_asteroids(config: &SimConfig, rng: &mut FieldRng) -> Vec<AsteroidPlacement> {
    (0..config.asteroid_count)
        .map(|_| {
            let x = axis_offset(rng, config.world_width);
            let y = axis_offset(rng, config.world_height);
            let rotation = rng.next_fraction();
            let value = config.asteroid_value_base + rng.next_below(config.asteroid_value_spread);
            AsteroidPlacement {
                position: Vec2Fixed::new(x, y),
                rotation,
                value,
            }
        })
        .collect()
}

/// Centre-weighted coordinate along an axis of length `extent`.
fn axis_offset(rng: &mut FieldRng, extent: u32) -> Fixed {
    let floor = Fixed::from_num(5) / Fixed::from_num(100);
    let u = rng.next_fraction();
    let mut offset = u * u + floor;
    if rng.next_below(2) == 1 {
        offset = -offset;
    }
    let half = Fixed::from_num(extent) / Fixed::from_num(2);
    offset * half + half
}
