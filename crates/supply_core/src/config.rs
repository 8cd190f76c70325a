//! Simulation configuration.

use crate::data::{EntityTypeTable, SPRITE_W};
use crate::math::Fixed;

/// Tunable constants of a session.
///
/// `Default` carries the standard values; the `with_*` methods adjust a
/// copy for tests and scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// World width in world units.
    pub world_width: u32,
    /// World height in world units.
    pub world_height: u32,
    /// Asteroids generated by a seeded bootstrap.
    pub asteroid_count: u32,
    /// Minimum value of a generated asteroid.
    pub asteroid_value_base: u32,
    /// Generated values fall in `base..base + spread`.
    pub asteroid_value_spread: u32,
    /// Money the player starts with.
    pub starting_money: u32,
    /// Packet speed in world units per millisecond.
    pub packet_speed: Fixed,
    /// Milliseconds between packet emissions of one producer.
    pub emit_interval_ms: u32,
    /// Milliseconds between periodic demand passes.
    pub periodic_interval_ms: u32,
    /// Longest simulated step; longer frames are split.
    pub max_step_ms: u32,
    /// Miner-to-asteroid binding radius.
    pub asteroid_link_radius: Fixed,
    /// Supply link radius.
    pub supply_link_radius: Fixed,
    /// Per-kind definitions.
    pub types: EntityTypeTable,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 720,
            world_height: 400,
            asteroid_count: 100,
            asteroid_value_base: 500,
            asteroid_value_spread: 1000,
            starting_money: 500,
            packet_speed: Fixed::from_num(100) / Fixed::from_num(1000),
            emit_interval_ms: 250,
            periodic_interval_ms: 10_000,
            max_step_ms: 16,
            asteroid_link_radius: Fixed::from_num(SPRITE_W * 2),
            supply_link_radius: Fixed::from_num(SPRITE_W * 4),
            types: EntityTypeTable::standard(),
        }
    }
}

impl SimConfig {
    /// Set the number of generated asteroids.
    #[must_use]
    pub const fn with_asteroid_count(mut self, count: u32) -> Self {
        self.asteroid_count = count;
        self
    }

    /// Set the starting money.
    #[must_use]
    pub const fn with_starting_money(mut self, money: u32) -> Self {
        self.starting_money = money;
        self
    }

    /// Replace the entity type table.
    #[must_use]
    pub fn with_types(mut self, types: EntityTypeTable) -> Self {
        self.types = types;
        self
    }

    /// Squared asteroid binding radius.
    #[must_use]
    pub fn asteroid_link_radius_sq(&self) -> Fixed {
        self.asteroid_link_radius * self.asteroid_link_radius
    }

    /// Squared supply link radius.
    #[must_use]
    pub fn supply_link_radius_sq(&self) -> Fixed {
        self.supply_link_radius * self.supply_link_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_radii() {
        let config = SimConfig::default();
        assert_eq!(config.asteroid_link_radius_sq(), Fixed::from_num(26 * 26));
        assert_eq!(config.supply_link_radius_sq(), Fixed::from_num(52 * 52));
    }

    #[test]
    fn test_link_radii_scale_with_sprite_width() {
        let config = SimConfig::default();
        assert_eq!(config.asteroid_link_radius, Fixed::from_num(2 * crate::data::SPRITE_W));
        assert_eq!(config.supply_link_radius, Fixed::from_num(4 * crate::data::SPRITE_W));
    }

    #[test]
    fn test_builders() {
        let config = SimConfig::default()
            .with_asteroid_count(0)
            .with_starting_money(10_000);
        assert_eq!(config.asteroid_count, 0);
        assert_eq!(config.starting_money, 10_000);
    }
}
