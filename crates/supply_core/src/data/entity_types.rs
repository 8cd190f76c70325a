//! Entity type table for data-driven entity definitions.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityKind, Frame, LinkCap};
use crate::error::{Result, SupplyError};
use crate::math::{fixed_str_serde, Fixed};
use crate::supply::Supply;

/// Sprite width in world units; link radii are multiples of it.
pub const SPRITE_W: i32 = 13;

/// Mining rates of a miner type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningStats {
    /// Milliseconds of mining per unit of ore.
    pub mine_rate_ms: u32,
    /// Supply burnt per millisecond of mining, in ten-thousandths of a unit.
    pub burn_per_ms: u32,
}

impl MiningStats {
    /// Supply burnt per unit of ore mined.
    #[must_use]
    pub const fn supply_per_ore(&self) -> Supply {
        Supply::from_raw(self.burn_per_ms * self.mine_rate_ms)
    }

    /// Ore the given stock can still pay for, rounding a partial ore up.
    #[must_use]
    pub const fn ore_budget(&self, stock: Supply) -> u32 {
        let per_ore = self.supply_per_ore().raw();
        if per_ore == 0 {
            return u32::MAX;
        }
        stock.raw().div_ceil(per_ore)
    }
}

/// Data-driven definition of one entity kind.
///
/// # Example RON
///
/// ```ron
/// EntityTypeData(
///     label: "Miner",
///     cost: 100,
///     cost_supply: 3,
///     radius: "4.5",
///     supply_max: 1,
///     max_links: Limited(1),
///     mining: Some((mine_rate_ms: 125, burn_per_ms: 1)),
///     frame: Miner,
///     frame_building: Some(MinerBuilding),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeData {
    /// Display name.
    pub label: String,

    /// Money cost to place.
    #[serde(default)]
    pub cost: u32,

    /// Supply packets needed to finish construction.
    #[serde(default)]
    pub cost_supply: u32,

    /// Collision radius for placement.
    #[serde(with = "fixed_str_serde")]
    pub radius: Fixed,

    /// Stock cap in whole units.
    #[serde(default)]
    pub supply_max: u32,

    /// Whole units regenerated every periodic pass.
    #[serde(default)]
    pub supply_prod: u32,

    /// Cap on simultaneous supply links.
    pub max_links: LinkCap,

    /// Generates and dispatches supply.
    #[serde(default)]
    pub supply_source: bool,

    /// Mining rates, for miners.
    #[serde(default)]
    pub mining: Option<MiningStats>,

    /// Frame once operating.
    pub frame: Frame,

    /// Frame while under construction.
    #[serde(default)]
    pub frame_building: Option<Frame>,
}

impl EntityTypeData {
    /// Stock cap as a supply amount.
    #[must_use]
    pub const fn supply_cap(&self) -> Supply {
        Supply::units(self.supply_max)
    }

    /// Frame to show while under construction.
    #[must_use]
    pub fn construction_frame(&self) -> Frame {
        self.frame_building.unwrap_or(self.frame)
    }
}

/// The complete table, one definition per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeTable {
    /// Factory definition.
    pub factory: EntityTypeData,
    /// Miner definition.
    pub miner: EntityTypeData,
    /// Router definition.
    pub router: EntityTypeData,
    /// Asteroid definition.
    pub asteroid: EntityTypeData,
}

impl EntityTypeTable {
    /// The standard table.
    #[must_use]
    pub fn standard() -> Self {
        let radius = Fixed::from_num(9) / Fixed::from_num(2);
        Self {
            factory: EntityTypeData {
                label: "Factory".to_string(),
                cost: 800,
                cost_supply: 7,
                radius,
                supply_max: 10,
                supply_prod: 10,
                max_links: LinkCap::Unbounded,
                supply_source: true,
                mining: None,
                frame: Frame::Factory,
                frame_building: Some(Frame::FactoryBuilding),
            },
            miner: EntityTypeData {
                label: "Miner".to_string(),
                cost: 100,
                cost_supply: 3,
                radius,
                supply_max: 1,
                supply_prod: 0,
                max_links: LinkCap::Limited(1),
                supply_source: false,
                mining: Some(MiningStats {
                    mine_rate_ms: 125,
                    burn_per_ms: 1,
                }),
                frame: Frame::Miner,
                frame_building: Some(Frame::MinerBuilding),
            },
            router: EntityTypeData {
                label: "Router".to_string(),
                cost: 10,
                cost_supply: 1,
                radius,
                supply_max: 0,
                supply_prod: 0,
                max_links: LinkCap::Limited(4),
                supply_source: false,
                mining: None,
                frame: Frame::Router,
                frame_building: Some(Frame::RouterBuilding),
            },
            asteroid: EntityTypeData {
                label: "Asteroid".to_string(),
                cost: 0,
                cost_supply: 0,
                radius,
                supply_max: 0,
                supply_prod: 0,
                max_links: LinkCap::Limited(0),
                supply_source: false,
                mining: None,
                frame: Frame::Asteroid,
                frame_building: None,
            },
        }
    }

    /// Parse and validate a table from RON text.
    ///
    /// `origin` names the source in error messages.
    pub fn from_ron_str(ron: &str, origin: &str) -> Result<Self> {
        let table: Self = ron::from_str(ron).map_err(|e| SupplyError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        table.validate().map_err(|message| SupplyError::DataParseError {
            path: origin.to_string(),
            message,
        })?;
        Ok(table)
    }

    /// Definition for `kind`.
    #[must_use]
    pub const fn get(&self, kind: EntityKind) -> &EntityTypeData {
        match kind {
            EntityKind::Factory => &self.factory,
            EntityKind::Miner => &self.miner,
            EntityKind::Router => &self.router,
            EntityKind::Asteroid => &self.asteroid,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.asteroid.max_links.is_link_capable() {
            return Err("asteroids cannot take supply links".to_string());
        }
        let Some(mining) = self.miner.mining else {
            return Err("miner type needs mining stats".to_string());
        };
        if mining.mine_rate_ms == 0 || mining.burn_per_ms == 0 {
            return Err("mining rates must be positive".to_string());
        }
        for kind in EntityKind::BUILDABLE {
            let data = self.get(kind);
            if !data.max_links.is_link_capable() {
                return Err(format!("{kind} must be able to take supply links"));
            }
            if data.radius <= Fixed::ZERO {
                return Err(format!("{kind} radius must be positive"));
            }
        }
        Ok(())
    }
}

impl Default for EntityTypeTable {
    fn default() -> Self {
        Self::standard()
    }
}
