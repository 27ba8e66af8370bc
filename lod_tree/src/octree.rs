//! Axis aligned 8-way subdivision.
//!
//! Every path character is a digit 0-7 whose bits pick the upper or lower half of the parent box
//! along one axis each: bit 0 for Z, bit 1 for Y, bit 2 for X. Boxes are therefore computed
//! from the path alone, starting at the configured root cube.

use glam::DVec3;

use crate::error::{Error, Result};
use crate::subdivision::Subdivision;
use crate::tree::TreeConfig;

pub const OCTREE_CHILDREN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn cube(origin: DVec3, size: f64) -> Self {
        Self::new(origin, origin + DVec3::splat(size))
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Child box selected by the low three bits of `digit`.
    pub fn child(&self, digit: usize) -> Aabb {

        let center = self.center();
        let mut min = self.min;
        let mut max = center;

        if digit & 0b100 != 0 {
            min.x = center.x;
            max.x = self.max.x;
        }
        if digit & 0b010 != 0 {
            min.y = center.y;
            max.y = self.max.y;
        }
        if digit & 0b001 != 0 {
            min.z = center.z;
            max.z = self.max.z;
        }

        return Aabb::new(min, max);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Octree {
    pub root: Aabb,
    pub split: [usize; 3],
}

impl Octree {

    pub fn new(origin: DVec3, size: f64, split: [usize; 3]) -> Result<Self> {

        if !(size > 0.0) || !size.is_finite() {
            return Err(Error::Config(format!("octree root size must be positive, got {}", size)));
        }
        if split.iter().any(|x| *x == 0) {
            return Err(Error::Config(format!("octree split factors must be non zero, got {:?}", split)));
        }

        return Ok(Self {
            root: Aabb::cube(origin, size),
            split,
        });
    }

    pub fn from_config(config: &TreeConfig) -> Result<Self> {
        Self::new(DVec3::from_array(config.origin), config.size, config.split)
    }

    fn step(&self, volume: &Aabb) -> DVec3 {
        volume.size() / DVec3::new(self.split[0] as f64, self.split[1] as f64, self.split[2] as f64)
    }

    /// Per axis sub-cell of a flat slot index.
    pub fn decompose(&self, index: usize) -> [usize; 3] {

        let [sx, sy, _] = self.split;

        [index % sx, (index / sx) % sy, index / (sx * sy)]
    }

    fn digit(c: char) -> Result<usize> {

        match c.to_digit(10) {
            Some(d) if (d as usize) < OCTREE_CHILDREN => Ok(d as usize),
            _ => Err(Error::Geometry(format!("`{}` is not an octree path character", c))),
        }
    }
}

impl Subdivision for Octree {

    type Volume = Aabb;

    fn bounding_volume(&self, path: &str) -> Result<Aabb> {

        let mut volume = self.root;
        for c in path.chars() {
            volume = volume.child(Self::digit(c)?);
        }

        Ok(volume)
    }

    fn max_children(&self, _path: &str) -> usize {
        OCTREE_CHILDREN
    }

    fn child_path(&self, parent: &str, child: usize) -> Result<String> {

        if child >= OCTREE_CHILDREN {
            return Err(Error::Geometry(format!("octree cells have {} children, asked for {}", OCTREE_CHILDREN, child)));
        }

        Ok(format!("{}{}", parent, child))
    }

    fn capacity(&self, _path: &str) -> usize {
        self.split[0] * self.split[1] * self.split[2]
    }

    fn contains(&self, volume: &Aabb, position: DVec3) -> bool {
        volume.contains(position)
    }

    fn index(&self, _path: &str, volume: &Aabb, position: DVec3) -> Option<usize> {

        if !volume.contains(position) {
            return None;
        }

        let local = (position - volume.min) / self.step(volume);

        let mut sub = [0usize; 3];
        for axis in 0..3 {
            //points on the upper face belong to the last sub-cell
            sub[axis] = (local[axis].floor() as usize).min(self.split[axis] - 1);
        }

        Some(sub[0] + sub[1] * self.split[0] + sub[2] * self.split[0] * self.split[1])
    }

    fn swap_point_check(&self, _path: &str, volume: &Aabb, index: usize, current: DVec3, candidate: DVec3) -> bool {

        let step = self.step(volume);
        let [ix, iy, iz] = self.decompose(index);

        let center = DVec3::new(
            (ix as f64 + 0.5) * step.x,
            (iy as f64 + 0.5) * step.y,
            (iz as f64 + 0.5) * step.z,
        );

        let current_distance = (current - volume.min).distance_squared(center);
        let candidate_distance = (candidate - volume.min).distance_squared(center);

        candidate_distance < current_distance
    }
}
