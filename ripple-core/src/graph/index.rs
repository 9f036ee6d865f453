//! Association Index
//!
//! A bidirectional many-to-many map from resources to the consumers that
//! depend on them. The reactor keys it by state cell (resource) and effect
//! (consumer).
//!
//! # Algorithm
//!
//! Removing a resource is the only interesting operation:
//!
//! 1. Detach the resource's entry and keep its consumer set.
//! 2. For each detached consumer, walk the reverse map to every *other*
//!    resource it is attached to and remove it there.
//! 3. Drop any resource whose consumer set became empty.
//!
//! After step 3, every detached consumer is unreferenced. This is what an
//! effect needs when one of its inputs changes: all of its associations from
//! the previous run are stale, and it will rebuild them when it re-runs.
//!
//! # Invariants
//!
//! - No resource is stored with an empty consumer set.
//! - `c ∈ forward[r]` if and only if `r ∈ reverse[c]`.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

/// Bidirectional resource → consumer index with cascading prune.
#[derive(Debug, Clone)]
pub struct AssociationIndex<R, C>
where
    R: Copy + Eq + Hash,
    C: Copy + Eq + Hash,
{
    /// Resource → consumers, in association order.
    forward: IndexMap<R, IndexSet<C>>,

    /// Consumer → resources it is attached to.
    /// Effects rarely read more than a handful of cells.
    reverse: HashMap<C, SmallVec<[R; 4]>>,
}

impl<R, C> AssociationIndex<R, C>
where
    R: Copy + Eq + Hash,
    C: Copy + Eq + Hash,
{
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            forward: IndexMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Attach `consumer` to `resource`. Idempotent.
    pub fn associate(&mut self, resource: R, consumer: C) {
        let inserted = self
            .forward
            .entry(resource)
            .or_insert_with(IndexSet::new)
            .insert(consumer);

        if inserted {
            self.reverse.entry(consumer).or_default().push(resource);
        }
    }

    /// Detach `resource` and return its consumers.
    ///
    /// Every returned consumer is also removed from all other resources, and
    /// resources left without consumers are dropped. Returns an empty set if
    /// the resource is not tracked (including when an earlier removal pruned
    /// it).
    pub fn remove_associations(&mut self, resource: &R) -> IndexSet<C> {
        let Some(detached) = self.forward.shift_remove(resource) else {
            return IndexSet::new();
        };

        for consumer in &detached {
            let Some(resources) = self.reverse.remove(consumer) else {
                continue;
            };
            for other in resources.iter().filter(|r| *r != resource) {
                self.detach_from(other, consumer);
            }
        }

        tracing::trace!(
            consumers = detached.len(),
            remaining = self.forward.len(),
            "resource detached"
        );

        detached
    }

    /// Detach one consumer from every resource it is attached to.
    ///
    /// Returns `true` if the consumer was attached anywhere.
    pub fn remove_consumer(&mut self, consumer: &C) -> bool {
        let Some(resources) = self.reverse.remove(consumer) else {
            return false;
        };
        for resource in &resources {
            self.detach_from(resource, consumer);
        }
        true
    }

    /// Clear the whole index.
    pub fn remove_all_associations(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    /// Consumers currently attached to `resource`.
    pub fn consumers(&self, resource: &R) -> Option<&IndexSet<C>> {
        self.forward.get(resource)
    }

    /// Resources `consumer` is currently attached to.
    pub fn resources(&self, consumer: &C) -> &[R] {
        self.reverse
            .get(consumer)
            .map(|resources| resources.as_slice())
            .unwrap_or(&[])
    }

    /// Check whether `consumer` is attached to `resource`.
    pub fn is_associated(&self, resource: &R, consumer: &C) -> bool {
        self.forward
            .get(resource)
            .is_some_and(|consumers| consumers.contains(consumer))
    }

    /// Number of tracked resources.
    pub fn resource_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of consumers attached to at least one resource.
    pub fn consumer_count(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Remove `consumer` from one resource's set, dropping the set if empty.
    /// The reverse entry is the caller's responsibility.
    fn detach_from(&mut self, resource: &R, consumer: &C) {
        let emptied = match self.forward.get_mut(resource) {
            Some(consumers) => {
                consumers.shift_remove(consumer);
                consumers.is_empty()
            }
            None => false,
        };
        if emptied {
            self.forward.shift_remove(resource);
        }
    }
}

impl<R, C> Default for AssociationIndex<R, C>
where
    R: Copy + Eq + Hash,
    C: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
