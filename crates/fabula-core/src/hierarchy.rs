//! Parent/child trees over world-scoped entities.
//!
//! Locations, events, factions and lore form per-world forests. Each node
//! stores its `parent_id` and a denormalized `hierarchy_level` which is
//! `0` at roots and `parent.level + 1` otherwise. Every operation here runs
//! inside the caller's [`Tx`]; moves must be opened with
//! [`Isolation::Serializable`](crate::store::Isolation::Serializable) so
//! the subtree rewrite is atomic.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use fabula_types::{EntityKind, Event, Faction, Location, Lore, WorldId};
use uuid::Uuid;

use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Record, Tx};

/// A record that lives in a per-world parent/child tree.
pub trait Hierarchical: Record + Clone {
    /// Entity kind of the nodes.
    const KIND: EntityKind;

    /// World owning the node.
    fn world_id(&self) -> WorldId;
    /// Parent node, if any.
    fn parent(&self) -> Option<Uuid>;
    /// Replace the parent pointer.
    fn set_parent(&mut self, parent: Option<Uuid>);
    /// Stored depth.
    fn level(&self) -> u32;
    /// Replace the stored depth.
    fn set_level(&mut self, level: u32);
    /// Bump `updated_at`.
    fn touch(&mut self, now: DateTime<Utc>);
}

macro_rules! hierarchical {
    ($ty:ty => $kind:ident) => {
        impl Hierarchical for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn world_id(&self) -> WorldId {
                self.world_id
            }

            fn parent(&self) -> Option<Uuid> {
                self.parent_id.map(Into::into)
            }

            fn set_parent(&mut self, parent: Option<Uuid>) {
                self.parent_id = parent.map(Into::into);
            }

            fn level(&self) -> u32 {
                self.hierarchy_level
            }

            fn set_level(&mut self, level: u32) {
                self.hierarchy_level = level;
            }

            fn touch(&mut self, now: DateTime<Utc>) {
                self.updated_at = now;
            }
        }
    };
}

hierarchical!(Location => Location);
hierarchical!(Event => Event);
hierarchical!(Faction => Faction);
hierarchical!(Lore => Lore);

fn child_level(parent_level: u32) -> u32 {
    parent_level.saturating_add(1)
}

/// Validate a prospective parent for a node of `world` and return the
/// level the node gets under it.
pub async fn level_under<T: Hierarchical>(
    tx: &mut Tx,
    world: WorldId,
    parent: Option<Uuid>,
) -> Result<u32, CoreError> {
    let Some(parent_id) = parent else {
        return Ok(0);
    };
    let parent = tx.fetch::<T>(parent_id).await?;
    if parent.world_id() != world {
        return Err(CoreError::validation(
            "parent_id",
            format!("parent {} must belong to the same world", T::RESOURCE),
        ));
    }
    Ok(child_level(parent.level()))
}

/// Direct children of `id`.
pub async fn children<T: Hierarchical>(tx: &mut Tx, id: Uuid) -> Result<Vec<T>, CoreError> {
    tx.list::<T>(Filter::children_of(id)).await
}

/// Path from `node` to its root, closest first. `node` itself is excluded.
pub async fn ancestors<T: Hierarchical>(tx: &mut Tx, node: &T) -> Result<Vec<T>, CoreError> {
    let mut path = Vec::new();
    let mut seen = HashSet::from([node.id()]);
    let mut next = node.parent();
    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            return Err(CoreError::Internal(format!(
                "{} hierarchy contains a cycle at {parent_id}",
                T::RESOURCE
            )));
        }
        let parent = tx.fetch::<T>(parent_id).await?;
        next = parent.parent();
        path.push(parent);
    }
    Ok(path)
}

/// Every node below `id`, breadth-first with siblings in store order.
pub async fn descendants<T: Hierarchical>(tx: &mut Tx, id: Uuid) -> Result<Vec<T>, CoreError> {
    let mut out = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for child in children::<T>(tx, current).await? {
            if seen.insert(child.id()) {
                queue.push_back(child.id());
                out.push(child);
            }
        }
    }
    Ok(out)
}

/// Rewrite the levels of every node below `root` from `root`'s level.
async fn relevel_subtree<T: Hierarchical>(tx: &mut Tx, root: &T) -> Result<(), CoreError> {
    let now = clock::now();
    let mut seen = HashSet::from([root.id()]);
    let mut queue = VecDeque::from([(root.id(), root.level())]);
    while let Some((parent_id, parent_level)) = queue.pop_front() {
        for mut child in children::<T>(tx, parent_id).await? {
            if !seen.insert(child.id()) {
                continue;
            }
            let level = child_level(parent_level);
            if child.level() != level {
                child.set_level(level);
                child.touch(now);
                tx.update(&child).await?;
            }
            queue.push_back((child.id(), level));
        }
    }
    Ok(())
}

/// Re-parent `id` under `new_parent` (or make it a root) and recompute the
/// levels of its whole subtree.
///
/// # Errors
///
/// `NotFound` when the node or the new parent is missing; `Validation` on
/// `parent_id` when the new parent is in another world or lies inside the
/// node's own subtree.
pub async fn move_node<T: Hierarchical>(
    tx: &mut Tx,
    id: Uuid,
    new_parent: Option<Uuid>,
) -> Result<T, CoreError> {
    let mut node = tx.fetch::<T>(id).await?;

    let level = match new_parent {
        None => 0,
        Some(parent_id) => {
            if parent_id == id {
                return Err(CoreError::validation(
                    "parent_id",
                    format!("{} cannot be its own parent", T::RESOURCE),
                ));
            }
            let parent = tx.fetch::<T>(parent_id).await?;
            if parent.world_id() != node.world_id() {
                return Err(CoreError::validation(
                    "parent_id",
                    format!("parent {} must belong to the same world", T::RESOURCE),
                ));
            }
            let lineage = ancestors(tx, &parent).await?;
            if lineage.iter().any(|a| a.id() == id) {
                return Err(CoreError::validation(
                    "parent_id",
                    format!("cannot move {} to its own descendant", T::RESOURCE),
                ));
            }
            child_level(parent.level())
        }
    };

    node.set_parent(new_parent);
    node.set_level(level);
    node.touch(clock::now());
    tx.update(&node).await?;
    relevel_subtree(tx, &node).await?;
    Ok(node)
}

/// Detach `node` before it is deleted: its direct children move up to
/// `node`'s parent and their subtrees are re-levelled.
pub async fn detach<T: Hierarchical>(tx: &mut Tx, node: &T) -> Result<(), CoreError> {
    let level = if node.parent().is_some() { node.level() } else { 0 };
    let now = clock::now();
    for mut child in children::<T>(tx, node.id()).await? {
        child.set_parent(node.parent());
        child.set_level(level);
        child.touch(now);
        tx.update(&child).await?;
        relevel_subtree(tx, &child).await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fabula_types::{LocationId, TenantId};

    use super::*;
    use crate::store::{Isolation, MemoryStore};
    use crate::tenant::TenantContext;

    fn location(tenant: TenantId, world: WorldId, name: &str) -> Location {
        let now = clock::now();
        Location {
            id: LocationId::new(),
            tenant_id: tenant,
            world_id: world,
            parent_id: None,
            name: name.into(),
            kind: None,
            description: None,
            hierarchy_level: 0,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed(tx: &mut Tx, mut loc: Location, parent: Option<&Location>) -> Location {
        let parent_id = parent.map(|p| p.id.into_inner());
        loc.hierarchy_level = level_under::<Location>(tx, loc.world_id, parent_id)
            .await
            .unwrap();
        loc.parent_id = parent.map(|p| p.id);
        tx.insert(&loc).await.unwrap();
        loc
    }

    #[tokio::test]
    async fn move_rejects_cycles_and_keeps_tree() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let world = WorldId::new();
        let ctx = TenantContext::new(tenant);
        let mut tx = Tx::begin(&store, &ctx, Isolation::Serializable).await.unwrap();

        let l1 = seed(&mut tx, location(tenant, world, "Kingdom"), None).await;
        let l2 = seed(&mut tx, location(tenant, world, "City"), Some(&l1)).await;
        assert_eq!(l2.hierarchy_level, 1);

        let err = move_node::<Location>(&mut tx, l1.id.into(), Some(l2.id.into()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::validation("parent_id", "cannot move location to its own descendant")
        );

        let l1_after: Location = tx.fetch(l1.id).await.unwrap();
        assert!(l1_after.parent_id.is_none());
    }

    #[tokio::test]
    async fn move_relevels_subtree() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let world = WorldId::new();
        let ctx = TenantContext::new(tenant);
        let mut tx = Tx::begin(&store, &ctx, Isolation::Serializable).await.unwrap();

        let a = seed(&mut tx, location(tenant, world, "A"), None).await;
        let b = seed(&mut tx, location(tenant, world, "B"), None).await;
        let c = seed(&mut tx, location(tenant, world, "C"), Some(&b)).await;
        let d = seed(&mut tx, location(tenant, world, "D"), Some(&c)).await;

        move_node::<Location>(&mut tx, b.id.into(), Some(a.id.into()))
            .await
            .unwrap();

        let d_after: Location = tx.fetch(d.id).await.unwrap();
        assert_eq!(d_after.hierarchy_level, 3);

        let path = ancestors(&mut tx, &d_after).await.unwrap();
        let names: Vec<_> = path.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["C", "B", "A"]);

        let below_a = descendants::<Location>(&mut tx, a.id.into()).await.unwrap();
        assert_eq!(below_a.len(), 3);
    }

    #[tokio::test]
    async fn parent_from_other_world_is_rejected() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let ctx = TenantContext::new(tenant);
        let mut tx = Tx::begin(&store, &ctx, Isolation::Serializable).await.unwrap();

        let foreign = seed(&mut tx, location(tenant, WorldId::new(), "Elsewhere"), None).await;
        let err = level_under::<Location>(&mut tx, WorldId::new(), Some(foreign.id.into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "parent_id", .. }));
    }

    #[tokio::test]
    async fn detach_promotes_children() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let world = WorldId::new();
        let ctx = TenantContext::new(tenant);
        let mut tx = Tx::begin(&store, &ctx, Isolation::Serializable).await.unwrap();

        let root = seed(&mut tx, location(tenant, world, "Root"), None).await;
        let mid = seed(&mut tx, location(tenant, world, "Mid"), Some(&root)).await;
        let leaf = seed(&mut tx, location(tenant, world, "Leaf"), Some(&mid)).await;

        detach(&mut tx, &mid).await.unwrap();
        let leaf_after: Location = tx.fetch(leaf.id).await.unwrap();
        assert_eq!(leaf_after.parent_id, Some(root.id));
        assert_eq!(leaf_after.hierarchy_level, 1);
    }
}
