//! Entity records and their component data.
//!
//! Every placed object (factory, miner, router, asteroid) is one [`Entity`].
//! Type-independent data lives directly on the record; behaviour-specific
//! state hangs off [`Role`], and the construction lifecycle is the explicit
//! [`EntityState`] machine.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};
use crate::supply::Supply;

/// Unique identifier for entities. Assigned monotonically, never reused.
pub type EntityId = u64;

/// Rotations are measured in whole turns (`0.25` = 90°).
pub mod turns {
    use crate::math::Fixed;

    /// No rotation.
    pub const ZERO: Fixed = Fixed::ZERO;
    /// 90°.
    pub const QUARTER: Fixed = Fixed::from_bits(1 << 30);
    /// 180°.
    pub const HALF: Fixed = Fixed::from_bits(1 << 31);
    /// 270°.
    pub const THREE_QUARTERS: Fixed = Fixed::from_bits(3 << 30);
}

/// Draw order for elements that are not entity frames.
pub mod z {
    /// Supply and asteroid link lines.
    pub const LINKS: u8 = 15;
    /// In-flight supply packets.
    pub const SUPPLY_PACKET: u8 = 25;
    /// Construction progress bars.
    pub const BUILDING_BAR: u8 = 50;
    /// Placement ghost under the cursor.
    pub const PLACE_PREVIEW: u8 = 60;
}

// ============================================================================
// Kinds and frames
// ============================================================================

/// Type tag of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Supply producer.
    Factory,
    /// Extracts value from an asteroid, burning supply.
    Miner,
    /// Relays supply between links.
    Router,
    /// Depletable value deposit.
    Asteroid,
}

impl EntityKind {
    /// Kinds the player can build, in hotkey order.
    pub const BUILDABLE: [Self; 3] = [Self::Factory, Self::Miner, Self::Router];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Factory => "factory",
            Self::Miner => "miner",
            Self::Router => "router",
            Self::Asteroid => "asteroid",
        };
        f.write_str(name)
    }
}

/// Sprite frame shown for an entity or packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// Asteroid with value left.
    Asteroid,
    /// Depleted asteroid.
    AsteroidEmpty,
    /// Operating factory.
    Factory,
    /// Factory under construction.
    FactoryBuilding,
    /// Idle miner.
    Miner,
    /// Miner with nothing left to mine.
    MinerDone,
    /// Miner working diagonally.
    MinerDiagonal,
    /// Miner working along an axis.
    MinerUp,
    /// Miner under construction.
    MinerBuilding,
    /// Operating router.
    Router,
    /// Router under construction.
    RouterBuilding,
    /// Supply packet.
    Supply,
}

impl Frame {
    /// Draw order of the frame. Construction frames share the order of the
    /// finished building.
    #[must_use]
    pub const fn z_order(self) -> u8 {
        match self {
            Self::AsteroidEmpty => 9,
            Self::Asteroid => 10,
            Self::Router | Self::RouterBuilding => 20,
            Self::Supply => z::SUPPLY_PACKET,
            Self::Miner | Self::MinerDone | Self::MinerBuilding => 30,
            Self::MinerUp | Self::MinerDiagonal => 35,
            Self::Factory | Self::FactoryBuilding => 40,
        }
    }
}

/// Cap on simultaneous supply-graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkCap {
    /// Any number of links.
    Unbounded,
    /// At most this many links (zero = not part of the supply graph).
    Limited(u32),
}

impl LinkCap {
    /// Whether the entity participates in the supply graph at all.
    #[must_use]
    pub const fn is_link_capable(self) -> bool {
        !matches!(self, Self::Limited(0))
    }

    /// Whether supply can pass through (more than one link).
    #[must_use]
    pub const fn is_multi_link(self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(n) => n > 1,
        }
    }

    /// Whether this is a single-link leaf.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::Limited(1))
    }

    /// Whether another link fits on top of `current` existing links.
    #[must_use]
    pub const fn has_room(self, current: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(n) => current < n as usize,
        }
    }

    /// Upper bound on links to take from a candidate list of `available`.
    #[must_use]
    pub fn take(self, available: usize) -> usize {
        match self {
            Self::Unbounded => available,
            Self::Limited(n) => available.min(n as usize),
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Construction progress, counted in delivered supply packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildProgress {
    /// Packets delivered so far.
    pub progress: u32,
    /// Packets required to finish.
    pub required: u32,
}

impl BuildProgress {
    /// Start construction needing `required` packets.
    #[must_use]
    pub const fn new(required: u32) -> Self {
        Self {
            progress: 0,
            required,
        }
    }

    /// Whether the last required packet has arrived.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.progress >= self.required
    }
}

/// Lifecycle state of an entity.
///
/// `UnderConstruction -> Operating` fires when the last packet arrives.
/// `Operating -> Exhausted` only happens to miners with nothing in reach.
/// Neither transition can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Waiting on construction supply; does not produce or mine.
    UnderConstruction(BuildProgress),
    /// Fully built and running.
    Operating,
    /// Built, but permanently out of work.
    Exhausted,
}

/// Display-only mirror of construction progress used for a smoothed bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildDisplay {
    /// Progress at the last delivery.
    pub progress: u32,
    /// Required packets.
    pub required: u32,
    /// Fraction currently drawn, eased toward `progress / required`.
    pub shown: Fixed,
}

impl BuildDisplay {
    /// Mirror a construction snapshot, keeping the already drawn fraction.
    #[must_use]
    pub fn snapshot(build: BuildProgress, shown: Fixed) -> Self {
        Self {
            progress: build.progress,
            required: build.required,
            shown,
        }
    }

    /// Fraction the bar is easing toward.
    #[must_use]
    pub fn target(&self) -> Fixed {
        if self.required == 0 {
            return Fixed::ONE;
        }
        Fixed::from_num(self.progress) / Fixed::from_num(self.required)
    }

    /// Ease the drawn fraction by `dt / 100 / required`, never past the
    /// target. Returns `true` once the bar is full.
    pub fn advance(&mut self, dt_ms: u32) -> bool {
        let required = Fixed::from_num(self.required.max(1));
        let step = Fixed::from_num(dt_ms) / Fixed::from_num(100) / required;
        self.shown = (self.shown + step).min(self.target());
        self.shown >= Fixed::ONE
    }
}

// ============================================================================
// Roles
// ============================================================================

/// State of a supply producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProducerState {
    /// Milliseconds accumulated toward the next emission.
    pub order_time_accum: u32,
    /// Entities awaiting a packet, oldest first.
    pub orders: VecDeque<EntityId>,
}

impl ProducerState {
    /// Stock not yet promised to an order.
    #[must_use]
    pub fn has_uncommitted(&self, stock: Supply) -> bool {
        stock.whole_units() as usize > self.orders.len()
    }
}

/// State of a miner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MinerState {
    /// Bound asteroid, if any.
    pub asteroid_link: Option<EntityId>,
    /// Milliseconds accumulated toward the next unit mined.
    pub time_accum: u32,
}

/// Behaviour-specific state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Generates supply and dispatches packets.
    Producer(ProducerState),
    /// Mines a bound asteroid.
    Miner(MinerState),
    /// Passes supply along; holds no stock.
    Relay,
    /// Holds extractable value.
    Deposit {
        /// Remaining extractable value.
        value: u32,
    },
}

// ============================================================================
// Entity
// ============================================================================

/// A placed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Type tag.
    pub kind: EntityKind,
    /// World position.
    pub position: Vec2Fixed,
    /// Collision radius for placement.
    pub radius: Fixed,
    /// Current sprite frame.
    pub frame: Frame,
    /// Draw order.
    pub z: u8,
    /// Sprite rotation in turns.
    pub rotation: Fixed,
    /// Per-entity seed for cosmetic effects.
    pub vis_seed: u32,
    /// Current stock.
    pub supply: Supply,
    /// Stock cap.
    pub supply_max: Supply,
    /// A packet is already on its way here.
    pub supply_enroute: bool,
    /// Cap on supply links.
    pub max_links: LinkCap,
    /// Lifecycle state.
    pub state: EntityState,
    /// Smoothed construction bar, while one is being shown.
    pub build_display: Option<BuildDisplay>,
    /// Behaviour-specific state.
    pub role: Role,
}

impl Entity {
    /// Fully constructed (operating or exhausted).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, EntityState::UnderConstruction(_))
    }

    /// Construction progress, while under construction.
    #[must_use]
    pub const fn building(&self) -> Option<BuildProgress> {
        match self.state {
            EntityState::UnderConstruction(build) => Some(build),
            _ => None,
        }
    }

    /// Permanently out of work.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.state, EntityState::Exhausted)
    }

    /// Participates in the supply graph.
    #[must_use]
    pub const fn is_link_capable(&self) -> bool {
        self.max_links.is_link_capable()
    }

    /// Generates and dispatches supply.
    #[must_use]
    pub const fn is_supply_source(&self) -> bool {
        matches!(self.role, Role::Producer(_))
    }

    /// Producer state, if this is a producer.
    #[must_use]
    pub const fn producer(&self) -> Option<&ProducerState> {
        match &self.role {
            Role::Producer(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable producer state.
    pub fn producer_mut(&mut self) -> Option<&mut ProducerState> {
        match &mut self.role {
            Role::Producer(p) => Some(p),
            _ => None,
        }
    }

    /// Miner state, if this is a miner.
    #[must_use]
    pub const fn miner(&self) -> Option<&MinerState> {
        match &self.role {
            Role::Miner(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable miner state.
    pub fn miner_mut(&mut self) -> Option<&mut MinerState> {
        match &mut self.role {
            Role::Miner(m) => Some(m),
            _ => None,
        }
    }

    /// Remaining value, if this is a deposit.
    #[must_use]
    pub const fn deposit_value(&self) -> Option<u32> {
        match self.role {
            Role::Deposit { value } => Some(value),
            _ => None,
        }
    }

    /// Asteroid with value left to mine.
    #[must_use]
    pub const fn is_minable(&self) -> bool {
        matches!(self.role, Role::Deposit { value } if value > 0)
    }

    /// Set the frame and its matching draw order.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
        self.z = frame.z_order();
    }
}

/// Parameters for adding a new entity.
///
/// Type-derived defaults (frame, radius, caps, link cap) come from the
/// entity type table; this only carries the per-instance values.
#[derive(Debug, Clone)]
pub struct EntitySpec {
    /// Type of the entity.
    pub kind: EntityKind,
    /// World position.
    pub position: Vec2Fixed,
    /// Starting stock.
    pub supply: Supply,
    /// Start under construction instead of operating.
    pub under_construction: bool,
    /// Sprite rotation in turns.
    pub rotation: Fixed,
    /// Extractable value (asteroids only).
    pub value: u32,
    /// Cosmetic seed.
    pub vis_seed: u32,
}

impl EntitySpec {
    /// An operating entity of `kind` at `position`.
    #[must_use]
    pub const fn new(kind: EntityKind, position: Vec2Fixed) -> Self {
        Self {
            kind,
            position,
            supply: Supply::ZERO,
            under_construction: false,
            rotation: Fixed::ZERO,
            value: 0,
            vis_seed: 0,
        }
    }

    /// Set the starting stock.
    #[must_use]
    pub const fn with_supply(mut self, supply: Supply) -> Self {
        self.supply = supply;
        self
    }

    /// Start under construction.
    #[must_use]
    pub const fn under_construction(mut self) -> Self {
        self.under_construction = true;
        self
    }

    /// Set the sprite rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Fixed) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the extractable value.
    #[must_use]
    pub const fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// Set the cosmetic seed.
    #[must_use]
    pub const fn with_vis_seed(mut self, vis_seed: u32) -> Self {
        self.vis_seed = vis_seed;
        self
    }
}
