//! Supply routing over the link graph.
//!
//! Link-capable entities and the supply links between them form an
//! undirected weighted graph. The [`RoutingEngine`] owns the links and a
//! lazily rebuilt all-pairs shortest-path table (Floyd–Warshall). Any
//! topology change marks the table dirty; the next read rebuilds it.
//!
//! Inactive entities still terminate paths (supply can be delivered to a
//! building site) but never relay: they are skipped as pivots.
//!
//! All calculations use fixed-point math and ascending-id iteration, so the
//! table and every route read from it are deterministic.

use crate::entity::EntityId;
use crate::error::{Result, SupplyError};
use crate::math::Fixed;
use crate::store::EntityStore;

/// Undirected weighted edge of the supply graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SupplyLink {
    /// First endpoint (the pre-existing entity when placed).
    pub a: EntityId,
    /// Second endpoint.
    pub b: EntityId,
    /// Length, fixed at creation time.
    pub distance: Fixed,
}

impl SupplyLink {
    /// Whether `id` is one of the endpoints.
    #[must_use]
    pub const fn touches(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    /// Whether this link joins `x` and `y` (in either order).
    #[must_use]
    pub const fn joins(&self, x: EntityId, y: EntityId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

/// Shortest known route between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathEntry {
    /// Total route length.
    pub distance: Fixed,
    /// Intermediate entity the route passes through, or `None` for a
    /// direct link.
    pub via: Option<EntityId>,
}

/// All-pairs shortest paths over link-capable entities.
///
/// One entry is stored per unordered pair, so the route from `i` to `j`
/// and the route from `j` to `i` are the same entry.
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    /// Link-capable entity ids, ascending.
    nodes: Vec<EntityId>,
    /// `nodes.len()²` cells; only `row < col` is used.
    cells: Vec<Option<PathEntry>>,
}

impl PathTable {
    /// Run Floyd–Warshall over the current store and links.
    fn build(store: &EntityStore, links: &[SupplyLink]) -> Self {
        let mut nodes = Vec::new();
        let mut relays = Vec::new();
        for entity in store.iter().filter(|e| e.is_link_capable()) {
            nodes.push(entity.id);
            relays.push(entity.is_active());
        }

        let n = nodes.len();
        let mut table = Self {
            nodes,
            cells: vec![None; n * n],
        };

        for link in links {
            let (Some(a), Some(b)) = (table.index(link.a), table.index(link.b)) else {
                debug_assert!(false, "supply link {link:?} references an unknown node");
                continue;
            };
            table.set(
                a,
                b,
                PathEntry {
                    distance: link.distance,
                    via: None,
                },
            );
        }

        for pivot in 0..n {
            if !relays[pivot] {
                continue;
            }
            let pivot_id = table.nodes[pivot];
            for i in 0..n {
                if i == pivot {
                    continue;
                }
                let Some(to_pivot) = table.entry(i, pivot) else {
                    continue;
                };
                for j in (i + 1)..n {
                    if j == pivot {
                        continue;
                    }
                    let Some(from_pivot) = table.entry(pivot, j) else {
                        continue;
                    };
                    let distance = to_pivot.distance + from_pivot.distance;
                    let better = match table.entry(i, j) {
                        None => true,
                        Some(existing) => distance < existing.distance,
                    };
                    if better {
                        table.set(
                            i,
                            j,
                            PathEntry {
                                distance,
                                via: Some(pivot_id),
                            },
                        );
                    }
                }
            }
        }

        table
    }

    /// Link-capable entity ids covered by the table, ascending.
    #[must_use]
    pub fn nodes(&self) -> &[EntityId] {
        &self.nodes
    }

    /// Route between two entities, if one exists.
    #[must_use]
    pub fn get(&self, from: EntityId, to: EntityId) -> Option<PathEntry> {
        let i = self.index(from)?;
        let j = self.index(to)?;
        self.entry(i, j)
    }

    /// Route length between two entities, if connected.
    #[must_use]
    pub fn distance(&self, from: EntityId, to: EntityId) -> Option<Fixed> {
        self.get(from, to).map(|entry| entry.distance)
    }

    /// First hop on the route from `from` to `to`.
    ///
    /// Walks the `via` witnesses toward `from` until a direct link is found.
    /// Returns `None` when `to` is unreachable.
    #[must_use]
    pub fn next_step(&self, from: EntityId, mut to: EntityId) -> Option<EntityId> {
        // Each witness lies on a strictly shorter sub-route, so the walk is
        // bounded by the node count.
        for _ in 0..=self.nodes.len() {
            let entry = self.get(from, to)?;
            match entry.via {
                None => return Some(to),
                Some(via) => to = via,
            }
        }
        debug_assert!(false, "witness chain from {from} does not terminate");
        None
    }

    fn index(&self, id: EntityId) -> Option<usize> {
        self.nodes.binary_search(&id).ok()
    }

    fn cell(&self, i: usize, j: usize) -> usize {
        let (row, col) = if i < j { (i, j) } else { (j, i) };
        row * self.nodes.len() + col
    }

    fn entry(&self, i: usize, j: usize) -> Option<PathEntry> {
        if i == j {
            return None;
        }
        self.cells[self.cell(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, entry: PathEntry) {
        let cell = self.cell(i, j);
        self.cells[cell] = Some(entry);
    }
}

/// Owner of the supply links and the cached path table.
#[derive(Debug, Clone, Default)]
pub struct RoutingEngine {
    /// All supply links, in creation order.
    links: Vec<SupplyLink>,
    /// Cached table; `None` while dirty.
    table: Option<PathTable>,
    /// Number of table rebuilds so far.
    rebuilds: u64,
}

impl RoutingEngine {
    /// Create an engine with no links.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All supply links, in creation order.
    #[must_use]
    pub fn links(&self) -> &[SupplyLink] {
        &self.links
    }

    /// Number of links touching `id`.
    #[must_use]
    pub fn link_count(&self, id: EntityId) -> usize {
        self.links.iter().filter(|link| link.touches(id)).count()
    }

    /// Add a link and invalidate the table.
    ///
    /// # Errors
    ///
    /// Returns [`SupplyError::DuplicateLink`] if the pair is already linked
    /// (or is a self-link).
    pub fn add_link(&mut self, a: EntityId, b: EntityId, distance: Fixed) -> Result<()> {
        if a == b || self.links.iter().any(|link| link.joins(a, b)) {
            return Err(SupplyError::DuplicateLink { a, b });
        }
        self.links.push(SupplyLink { a, b, distance });
        self.invalidate();
        Ok(())
    }

    /// Mark the table dirty. The next read rebuilds it.
    pub fn invalidate(&mut self) {
        self.table = None;
    }

    /// Whether the next read will rebuild the table.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.table.is_none()
    }

    /// Number of rebuilds performed so far.
    #[must_use]
    pub const fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Current path table, rebuilding it first if dirty.
    pub fn paths(&mut self, store: &EntityStore) -> &PathTable {
        if self.table.is_none() {
            let table = PathTable::build(store, &self.links);
            self.rebuilds += 1;
            tracing::debug!(
                nodes = table.nodes.len(),
                links = self.links.len(),
                rebuilds = self.rebuilds,
                "Rebuilt supply path table"
            );
            self.table = Some(table);
        }
        self.table.get_or_insert_with(PathTable::default)
    }

    /// First hop from `from` toward `to`, or `None` if unreachable.
    pub fn next_step(&mut self, store: &EntityStore, from: EntityId, to: EntityId) -> Option<EntityId> {
        self.paths(store).next_step(from, to)
    }

    /// Route length between two entities, if connected.
    pub fn distance(&mut self, store: &EntityStore, from: EntityId, to: EntityId) -> Option<Fixed> {
        self.paths(store).distance(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityTypeTable;
    use crate::entity::{EntityKind, EntitySpec, EntityState};
    use crate::math::Vec2Fixed;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn add(store: &mut EntityStore, kind: EntityKind, x: i32) -> EntityId {
        store.add(
            &EntitySpec::new(kind, Vec2Fixed::from_ints(x, 0)),
            &EntityTypeTable::standard(),
        )
    }

    /// factory(1) -- router(2) -- router(3) -- miner(4), 40 apart.
    fn chain() -> (EntityStore, RoutingEngine) {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let f = add(&mut store, EntityKind::Factory, 0);
        let r1 = add(&mut store, EntityKind::Router, 40);
        let r2 = add(&mut store, EntityKind::Router, 80);
        let m = add(&mut store, EntityKind::Miner, 120);
        routing.add_link(f, r1, fixed(40)).unwrap();
        routing.add_link(r1, r2, fixed(40)).unwrap();
        routing.add_link(r2, m, fixed(40)).unwrap();
        (store, routing)
    }

    #[test]
    fn test_chain_routes_hop_by_hop() {
        let (store, mut routing) = chain();
        assert_eq!(routing.next_step(&store, 4, 1), Some(3));
        assert_eq!(routing.next_step(&store, 3, 1), Some(2));
        assert_eq!(routing.next_step(&store, 2, 1), Some(1));
        assert_eq!(routing.next_step(&store, 1, 4), Some(2));
        assert_eq!(routing.distance(&store, 1, 4), Some(fixed(120)));
    }

    #[test]
    fn test_distances_are_symmetric() {
        let (store, mut routing) = chain();
        let table = routing.paths(&store).clone();
        for &i in table.nodes() {
            for &j in table.nodes() {
                assert_eq!(table.distance(i, j), table.distance(j, i));
            }
        }
    }

    #[test]
    fn test_inactive_entity_does_not_relay() {
        let (mut store, mut routing) = chain();
        store.get_mut(2).unwrap().state =
            EntityState::UnderConstruction(crate::entity::BuildProgress::new(1));
        routing.invalidate();

        // Router 2 is still reachable as an endpoint...
        assert_eq!(routing.next_step(&store, 1, 2), Some(2));
        // ...but nothing passes through it.
        assert_eq!(routing.next_step(&store, 1, 4), None);
        assert_eq!(routing.distance(&store, 1, 3), None);
    }

    #[test]
    fn test_shorter_detour_wins() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let a = add(&mut store, EntityKind::Factory, 0);
        let b = add(&mut store, EntityKind::Router, 10);
        let c = add(&mut store, EntityKind::Router, 20);
        routing.add_link(a, c, fixed(50)).unwrap();
        routing.add_link(a, b, fixed(10)).unwrap();
        routing.add_link(b, c, fixed(10)).unwrap();

        assert_eq!(routing.distance(&store, a, c), Some(fixed(20)));
        assert_eq!(routing.next_step(&store, a, c), Some(b));
    }

    #[test]
    fn test_unreachable_and_unknown_ids() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let a = add(&mut store, EntityKind::Factory, 0);
        let b = add(&mut store, EntityKind::Router, 100);
        let asteroid = add(&mut store, EntityKind::Asteroid, 200);
        assert_eq!(routing.next_step(&store, a, b), None);
        assert_eq!(routing.next_step(&store, a, asteroid), None);
        assert_eq!(routing.next_step(&store, a, a), None);
        assert!(!routing.paths(&store).nodes().contains(&asteroid));
    }

    #[test]
    fn test_table_is_cached_until_invalidated() {
        let (store, mut routing) = chain();
        assert!(routing.is_dirty());
        let _ = routing.paths(&store);
        let _ = routing.paths(&store);
        assert_eq!(routing.rebuild_count(), 1);
        assert!(!routing.is_dirty());

        routing.invalidate();
        let _ = routing.paths(&store);
        assert_eq!(routing.rebuild_count(), 2);
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let (_, mut routing) = chain();
        assert!(matches!(
            routing.add_link(2, 1, fixed(40)),
            Err(SupplyError::DuplicateLink { a: 2, b: 1 })
        ));
        assert!(routing.add_link(3, 3, fixed(0)).is_err());
        assert_eq!(routing.link_count(2), 2);
        assert_eq!(routing.link_count(4), 1);
    }
}
