//! Holds the tree cell: a sparse grid of point slots plus the volumes of its children.
//!
//! A cell only ever performs one step of an insertion. When the slot is taken it decides which
//! of the two points stays and hands the other back with the child it has to go to; `Tree` owns
//! the loop that walks down the levels.

use std::collections::BTreeMap;
use std::mem;

use crate::data::Point;
use crate::error::{Error, Result};
use crate::subdivision::Subdivision;

/// Outcome of offering a point to a cell.
#[derive(Debug)]
pub enum Placement {
    /// The point took slot `usize` of this cell.
    Stored(usize),
    /// Slot was taken; `point` (either the new one or the evicted occupant) moves on to `child`.
    /// `swapped` is the slot the new point took when the occupant was evicted.
    Displaced { child: String, point: Point, swapped: Option<usize> },
}

#[derive(Debug, Clone)]
pub struct TreeCell<V> {
    pub path: String,
    pub volume: V,
    /// Child paths and volumes, in child order.
    pub children: Vec<(String, V)>,
    capacity: usize,
    points: BTreeMap<usize, Point>,
    child_counts: BTreeMap<String, usize>,
}

impl<V: Clone> TreeCell<V> {

    pub fn new<S: Subdivision<Volume = V>>(subdivision: &S, path: &str) -> Result<Self> {

        let volume = subdivision.bounding_volume(path)?;

        let max_children = subdivision.max_children(path);
        let mut children: Vec<(String, V)> = Vec::with_capacity(max_children);

        for i in 0..max_children {
            let child_path = subdivision.child_path(path, i)?;
            let child_volume = subdivision.bounding_volume(&child_path)?;
            children.push((child_path, child_volume));
        }

        return Ok(Self {
            path: path.to_string(),
            volume,
            children,
            capacity: subdivision.capacity(path),
            points: BTreeMap::new(),
            child_counts: BTreeMap::new(),
        });
    }

    pub fn depth(&self) -> usize {
        self.path.chars().count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&Point> {
        self.points.get(&slot)
    }

    /// Points in slot order.
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.points.values()
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, &Point)> {
        self.points.iter().map(|(k, v)| (*k, v))
    }

    /// Children that received points from this cell, with how many landed there.
    pub fn child_counts(&self) -> &BTreeMap<String, usize> {
        &self.child_counts
    }

    /// Paths of the children that hold data, sorted.
    pub fn child_paths(&self) -> Vec<String> {
        self.child_counts.keys().cloned().collect()
    }

    pub(crate) fn record_overflow(&mut self, child: &str) {
        *self.child_counts.entry(child.to_string()).or_insert(0) += 1;
    }

    fn slot_of<S: Subdivision<Volume = V>>(&self, subdivision: &S, point: &Point) -> Result<usize> {

        let index = match subdivision.index(&self.path, &self.volume, point.position()) {
            Some(index) => index,
            None => {
                return Err(Error::Geometry(format!("point {} is outside cell `{}`", point.position(), self.path)));
            }
        };

        if index >= self.capacity {
            return Err(Error::Geometry(format!("slot {} of cell `{}` is past its capacity {}", index, self.path, self.capacity)));
        }

        Ok(index)
    }

    /// Child whose volume contains `point`. On shared boundaries the last matching child wins.
    fn child_for<S: Subdivision<Volume = V>>(&self, subdivision: &S, point: &Point) -> Result<String> {

        let mut matched: Option<&String> = None;
        for (path, volume) in self.children.iter() {
            if subdivision.contains(volume, point.position()) {
                matched = Some(path);
            }
        }

        match matched {
            Some(path) => Ok(path.clone()),
            None => Err(Error::Geometry(format!("no child of cell `{}` contains point {}", self.path, point.position()))),
        }
    }

    /// One level of the insertion: keep the point if its slot is free, otherwise keep whichever
    /// of the two is closer to the slot centre and hand the other one down.
    pub fn add_point<S: Subdivision<Volume = V>>(&mut self, subdivision: &S, point: Point) -> Result<Placement> {

        let index = self.slot_of(subdivision, &point)?;

        if !self.points.contains_key(&index) {
            self.points.insert(index, point);
            return Ok(Placement::Stored(index));
        }

        let current = &self.points[&index];
        let swap = subdivision.swap_point_check(&self.path, &self.volume, index, current.position(), point.position());

        //the point that moves picks the child, so a slot straddling two children cannot lose it
        let child = match swap {
            true => self.child_for(subdivision, current)?,
            false => self.child_for(subdivision, &point)?,
        };

        let (displaced, swapped) = match (swap, self.points.get_mut(&index)) {
            (true, Some(occupant)) => (mem::replace(occupant, point), Some(index)),
            _ => (point, None),
        };

        Ok(Placement::Displaced { child, point: displaced, swapped })
    }

    /// Puts `point` back into `slot`, handing out whatever was there.
    pub(crate) fn replace(&mut self, slot: usize, point: Point) -> Option<Point> {
        self.points.insert(slot, point)
    }

    /// Puts a point read back from an export into its slot.
    pub(crate) fn restore_point<S: Subdivision<Volume = V>>(&mut self, subdivision: &S, point: Point) -> Result<()> {

        let index = self.slot_of(subdivision, &point)?;

        if self.points.contains_key(&index) {
            return Err(Error::Geometry(format!("cell `{}` has two points in slot {}", self.path, index)));
        }

        self.points.insert(index, point);
        Ok(())
    }

    pub(crate) fn restore_child(&mut self, child: &str, count: usize) {
        self.child_counts.insert(child.to_string(), count);
    }
}
