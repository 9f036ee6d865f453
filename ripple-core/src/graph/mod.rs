//! Dependency Graph
//!
//! This module holds the bookkeeping that connects state cells to the effects
//! that read them.
//!
//! # Overview
//!
//! The graph is bipartite: resources (state cells) on one side, consumers
//! (effects) on the other. An edge means "this effect read this cell during
//! its most recent run".
//!
//! When a cell changes, the scheduler removes the cell's entry and receives
//! the effects that read it. Those effects are also detached from every
//! other cell, because their next run will record a fresh set of edges.
//!
//! # Design Decisions
//!
//! 1. We keep both forward (resource → consumers) and reverse
//!    (consumer → resources) edges so that detaching a consumer does not scan
//!    the whole index.
//!
//! 2. The index is generic over its key types. The reactor uses
//!    `StateId` and `EffectId`, and tests use plain integers and chars.

mod index;

pub use index::AssociationIndex;
