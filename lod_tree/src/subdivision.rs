//! The geometry a tree is built on.
//!
//! A subdivision owns everything that depends on the shape of a cell: how a path maps to a
//! volume, how many children a cell has, how a point maps to a slot and which of two points
//! better represents a slot. `Tree` and `TreeCell` only ever talk to this trait.

use std::fmt::Debug;

use glam::DVec3;

use crate::error::Result;

pub trait Subdivision {

    type Volume: Clone + Debug;

    /// Volume of the cell at `path`, computed from the path alone.
    fn bounding_volume(&self, path: &str) -> Result<Self::Volume>;

    fn max_children(&self, path: &str) -> usize;

    /// Path of child number `child` of `parent`. The only place path strings are made.
    fn child_path(&self, parent: &str, child: usize) -> Result<String>;

    /// Number of slots of the cell at `path`.
    fn capacity(&self, path: &str) -> usize;

    /// Inclusive point-in-volume test.
    fn contains(&self, volume: &Self::Volume, position: DVec3) -> bool;

    /// Slot of `position` inside the cell, `None` when the position is outside the cell's domain.
    fn index(&self, path: &str, volume: &Self::Volume, position: DVec3) -> Option<usize>;

    /// Whether `candidate` is strictly closer than `current` to the centre of slot `index`.
    fn swap_point_check(&self, path: &str, volume: &Self::Volume, index: usize, current: DVec3, candidate: DVec3) -> bool;
}
