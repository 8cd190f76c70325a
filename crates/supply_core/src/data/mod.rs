//! Data structures for entity type configuration.
//!
//! This module contains pure data structures describing each placeable
//! kind: costs, caps, link rules and mining rates. They deserialize from
//! RON so a scenario can tune the table without recompiling.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `supply_headless`.

mod entity_types;

pub use entity_types::{EntityTypeData, EntityTypeTable, MiningStats, SPRITE_W};
