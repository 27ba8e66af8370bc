//! Implementation of a disk-resident level-of-detail tree for very large point clouds.
//!
//! Intended for datasets of billions of fixed-stride binary point records (lidar scans,
//! photogrammetry output) that never fit in memory at once. Coarse cells keep a small,
//! well-distributed sample of the points; whatever does not fit is pushed down to finer cells,
//! so a consumer can stream the cloud coarse-to-fine and stop at whatever detail it needs.
//!
//! Each cell owns a sparse grid of slots. When two points compete for a slot, the one closer to
//! the slot centre stays and the other moves one level down. Cells are written out as one raw
//! `.dat` file of point records plus a `.txt` file listing the children that hold data.
//!
//! Two subdivisions are provided: an axis-aligned octree and an "icosatree" that splits a shell
//! around the origin into 20 triangular prisms (one per icosahedron face) and then 8-way.
//!
//! Reading goes through [`stream::Connection`], a small pool of worker threads that pulls cells
//! from a directory or an HTTP server on request.
//!
//! TODO
//! - [x] octree build and export with tests
//! - [x] icosatree build and export
//! - [x] threaded cell streaming from disk and http
//! - [ ] out-of-core build for inputs larger than memory (cells are held in memory until export)
pub mod error;
pub mod layout;
pub mod attribute;
pub mod data;
pub mod subdivision;
pub mod octree;
pub mod icosatree;
pub mod node;
pub mod tree;
pub mod io;
pub mod stream;

#[cfg(test)]
mod test_util;
