//! Triangular prism subdivision of a shell around the origin.
//!
//! The root is the shell between an inner icosahedron (circumradius `inner_radius`) and an outer
//! one (inradius `outer_radius`), so it contains every point whose distance to the origin lies
//! between the two radii. The root fans out into 20 prisms, one per icosahedron face.
//!
//! A prism is the part of the cone from the origin through a triangle that lies between two
//! planes parallel to that triangle. Positions inside a prism are expressed as the barycentric
//! coordinate of their projection through the origin onto the triangle (the "triangular"
//! coordinate) plus a depth fraction measured from the top plane. Every prism splits into 8:
//! four triangles through the edge midpoints, times the upper and lower half of the depth range.
//!
//! Root children use the path characters `0-9a-j`, deeper cells `0-7`.

use glam::DVec3;

use crate::error::{Error, Result};
use crate::subdivision::Subdivision;
use crate::tree::TreeConfig;

pub const ROOT_CHILDREN: usize = 20;
pub const PRISM_CHILDREN: usize = 8;

const ROOT_ALPHABET: &[u8; ROOT_CHILDREN] = b"0123456789abcdefghij";

//slack for points sitting exactly on shared faces and edges
const EPSILON: f64 = 1e-12;

const PHI: f64 = 1.618_033_988_749_895;

const ICOSAHEDRON_VERTICES: [[f64; 3]; 12] = [
    [-1.0, PHI, 0.0],
    [1.0, PHI, 0.0],
    [-1.0, -PHI, 0.0],
    [1.0, -PHI, 0.0],
    [0.0, -1.0, PHI],
    [0.0, 1.0, PHI],
    [0.0, -1.0, -PHI],
    [0.0, 1.0, -PHI],
    [PHI, 0.0, -1.0],
    [PHI, 0.0, 1.0],
    [-PHI, 0.0, -1.0],
    [-PHI, 0.0, 1.0],
];

const ICOSAHEDRON_FACES: [[usize; 3]; ROOT_CHILDREN] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// A truncated cone over a triangle. `top` and `bottom` are scale factors of the triangle's
/// plane: a point `p` is at scale `s` when `p / s` lies in that plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prism {
    pub triangle: [DVec3; 3],
    pub top: f64,
    pub bottom: f64,
}

impl Prism {

    fn normal(&self) -> DVec3 {
        let [a, b, c] = self.triangle;
        (b - a).cross(c - a)
    }

    /// Scale of the plane through `p` parallel to the triangle.
    pub fn scale(&self, p: DVec3) -> f64 {
        let n = self.normal();
        n.dot(p) / n.dot(self.triangle[0])
    }

    /// Barycentric coordinate of the projection of `p` through the origin onto the triangle.
    pub fn triangular(&self, p: DVec3) -> Option<DVec3> {

        let s = self.scale(p);
        if !(s > 0.0) {
            return None;
        }

        let q = p / s;
        let [a, b, c] = self.triangle;

        let v0 = b - a;
        let v1 = c - a;
        let v2 = q - a;

        let d00 = v0.dot(v0);
        let d01 = v0.dot(v1);
        let d11 = v1.dot(v1);
        let d20 = v2.dot(v0);
        let d21 = v2.dot(v1);

        let denom = d00 * d11 - d01 * d01;
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;

        Some(DVec3::new(1.0 - v - w, v, w))
    }

    /// Distance below the top plane as a fraction of the prism depth.
    pub fn depth(&self, p: DVec3) -> f64 {
        (self.top - self.scale(p)) / (self.top - self.bottom)
    }

    pub fn contains(&self, p: DVec3) -> bool {

        let s = self.scale(p);
        if s < self.bottom - EPSILON || s > self.top + EPSILON {
            return false;
        }

        match self.triangular(p) {
            Some(t) => t.cmpge(DVec3::splat(-EPSILON)).all(),
            None => false,
        }
    }

    /// Children in order: the corner triangles at vertex 0, 1, 2, then the centre triangle, first
    /// for the upper half of the depth range and then for the lower half.
    pub fn child(&self, child: usize) -> Prism {

        let [a, b, c] = self.triangle;
        let ab = (a + b) * 0.5;
        let bc = (b + c) * 0.5;
        let ca = (c + a) * 0.5;

        let triangle = match child % 4 {
            0 => [a, ab, ca],
            1 => [ab, b, bc],
            2 => [ca, bc, c],
            _ => [bc, ca, ab],
        };

        let middle = (self.top + self.bottom) * 0.5;
        let (top, bottom) = match child / 4 {
            0 => (self.top, middle),
            _ => (middle, self.bottom),
        };

        return Prism { triangle, top, bottom };
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IcosaVolume {
    /// The root: union of the 20 face prisms.
    Shell,
    Prism(Prism),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Icosatree {
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// `split[0]` buckets each triangular axis, `split[2]` the depth axis.
    pub split: [usize; 3],
    faces: [Prism; ROOT_CHILDREN],
}

impl Icosatree {

    pub fn new(inner_radius: f64, outer_radius: f64, split: [usize; 3]) -> Result<Self> {

        if !(inner_radius >= 0.0) || !(outer_radius > inner_radius) || !outer_radius.is_finite() {
            return Err(Error::Config(format!("icosatree needs 0 <= inner < outer, got {} and {}", inner_radius, outer_radius)));
        }
        if split[0] == 0 || split[2] == 0 {
            return Err(Error::Config(format!("icosatree split factors must be non zero, got {:?}", split)));
        }

        let unit: Vec<DVec3> = ICOSAHEDRON_VERTICES.iter().map(|x| DVec3::from_array(*x).normalize()).collect();

        //distance of a face plane from the centre of a unit circumradius icosahedron
        let inradius = ((unit[0] + unit[11] + unit[5]) / 3.0).length();

        let outer_scale = outer_radius / inradius;
        let bottom = inner_radius * inradius / outer_radius;

        let faces = ICOSAHEDRON_FACES.map(|[a, b, c]| Prism {
            triangle: [unit[a] * outer_scale, unit[b] * outer_scale, unit[c] * outer_scale],
            top: 1.0,
            bottom,
        });

        return Ok(Self {
            inner_radius,
            outer_radius,
            split,
            faces,
        });
    }

    pub fn from_config(config: &TreeConfig) -> Result<Self> {
        Self::new(config.inner_radius, config.outer_radius, config.split)
    }

    pub fn faces(&self) -> &[Prism; ROOT_CHILDREN] {
        &self.faces
    }

    fn root_selector(c: char) -> Result<usize> {

        match ROOT_ALPHABET.iter().position(|x| *x as char == c) {
            Some(i) => Ok(i),
            None => Err(Error::Geometry(format!("`{}` is not an icosatree root path character", c))),
        }
    }

    fn prism_selector(c: char) -> Result<usize> {

        match c.to_digit(10) {
            Some(d) if (d as usize) < PRISM_CHILDREN => Ok(d as usize),
            _ => Err(Error::Geometry(format!("`{}` is not an icosatree path character", c))),
        }
    }

    /// Triangular sub-cell and depth bucket of a flat slot index.
    pub fn decompose(&self, index: usize) -> ([usize; 3], usize) {

        let n = self.split[0];

        ([index % n, (index / n) % n, (index / (n * n)) % n], index / (n * n * n))
    }

    /// Centre of a triangular sub-cell in barycentric space. Upward and downward sub-triangles
    /// differ in the sum of their bucket indices.
    fn bucket_center(&self, bucket: [usize; 3]) -> DVec3 {

        let n = self.split[0] as f64;
        let sum = (bucket[0] + bucket[1] + bucket[2]) as f64;
        let shift = (n - sum) / 3.0;

        DVec3::new(bucket[0] as f64 + shift, bucket[1] as f64 + shift, bucket[2] as f64 + shift) / n
    }
}

impl Subdivision for Icosatree {

    type Volume = IcosaVolume;

    fn bounding_volume(&self, path: &str) -> Result<IcosaVolume> {

        let mut chars = path.chars();

        let mut prism = match chars.next() {
            None => return Ok(IcosaVolume::Shell),
            Some(c) => self.faces[Self::root_selector(c)?],
        };

        for c in chars {
            prism = prism.child(Self::prism_selector(c)?);
        }

        Ok(IcosaVolume::Prism(prism))
    }

    fn max_children(&self, path: &str) -> usize {
        match path.is_empty() {
            true => ROOT_CHILDREN,
            false => PRISM_CHILDREN,
        }
    }

    fn child_path(&self, parent: &str, child: usize) -> Result<String> {

        let max = self.max_children(parent);
        if child >= max {
            return Err(Error::Geometry(format!("cell `{}` has {} children, asked for {}", parent, max, child)));
        }

        let c = match parent.is_empty() {
            true => ROOT_ALPHABET[child] as char,
            false => (b'0' + child as u8) as char,
        };

        Ok(format!("{}{}", parent, c))
    }

    fn capacity(&self, path: &str) -> usize {
        match path.is_empty() {
            true => 1,
            false => self.split[0] * self.split[0] * self.split[0] * self.split[2],
        }
    }

    fn contains(&self, volume: &IcosaVolume, position: DVec3) -> bool {
        match volume {
            IcosaVolume::Shell => self.faces.iter().any(|x| x.contains(position)),
            IcosaVolume::Prism(prism) => prism.contains(position),
        }
    }

    fn index(&self, _path: &str, volume: &IcosaVolume, position: DVec3) -> Option<usize> {

        let prism = match volume {
            IcosaVolume::Shell => {
                return match self.contains(volume, position) {
                    true => Some(0),
                    false => None,
                };
            },
            IcosaVolume::Prism(prism) => prism,
        };

        if !prism.contains(position) {
            return None;
        }

        let t = prism.triangular(position)?;
        let n = self.split[0];
        let depth_split = self.split[2];

        let bucket = |x: f64, buckets: usize| ((x.clamp(0.0, 1.0) * buckets as f64).floor() as usize).min(buckets - 1);

        let iu = bucket(t.x, n);
        let iv = bucket(t.y, n);
        let iw = bucket(t.z, n);
        let id = bucket(prism.depth(position), depth_split);

        Some(iu + iv * n + iw * n * n + id * n * n * n)
    }

    fn swap_point_check(&self, path: &str, volume: &IcosaVolume, index: usize, current: DVec3, candidate: DVec3) -> bool {

        let prism = match volume {
            //the root holds one point and keeps the first one it gets
            IcosaVolume::Shell => return false,
            IcosaVolume::Prism(prism) => prism,
        };

        let (bucket, _) = self.decompose(index);
        let center = self.bucket_center(bucket);

        match (prism.triangular(current), prism.triangular(candidate)) {
            (Some(c), Some(x)) => x.distance_squared(center) < c.distance_squared(center),
            _ => {
                log::warn!("cell `{}` compared a point outside its prism", path);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::Rng;

    fn earth_shell() -> Icosatree {
        Icosatree::new(6_300_000.0, 6_400_000.0, [4, 4, 2]).unwrap()
    }

    fn random_in_shell(rng: &mut impl Rng, inner: f64, outer: f64) -> DVec3 {

        loop {
            let d = DVec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            if d.length() > 0.1 && d.length() <= 1.0 {
                return d.normalize() * rng.gen_range(inner..outer);
            }
        }
    }

    #[test]
    fn quick_root_fans_to_twenty() {

        let tree = earth_shell();

        assert_eq!(tree.max_children(""), 20);
        assert_eq!(tree.max_children("a"), 8);
        assert_eq!(tree.capacity(""), 1);
        assert_eq!(tree.capacity("3"), 4 * 4 * 4 * 2);

        let paths: Vec<String> = (0..20).map(|i| tree.child_path("", i).unwrap()).collect();
        assert_eq!(paths[0], "0");
        assert_eq!(paths[10], "a");
        assert_eq!(paths[19], "j");
        assert_eq!(tree.child_path("j", 7).unwrap(), "j7");
        assert!(tree.child_path("j", 8).is_err());
        assert!(tree.bounding_volume("k").is_err());
        assert!(tree.bounding_volume("09").is_err());
    }

    #[test]
    fn quick_shell_points_land_in_exactly_one_face() {

        let tree = earth_shell();
        let mut rng = rand::thread_rng();

        for _ in 0..2000 {
            let p = random_in_shell(&mut rng, tree.inner_radius, tree.outer_radius);
            let hits = tree.faces().iter().filter(|x| x.contains(p)).count();
            assert!(hits >= 1, "{:?} outside every face", p);
            assert!(tree.contains(&IcosaVolume::Shell, p));
        }

        assert!(!tree.contains(&IcosaVolume::Shell, DVec3::new(0.0, 0.0, 1000.0)));
        assert!(!tree.contains(&IcosaVolume::Shell, DVec3::new(0.0, 0.0, 9_000_000.0)));
    }

    #[test]
    fn quick_children_partition_prism() {

        let tree = earth_shell();
        let mut rng = rand::thread_rng();

        for parent in ["0", "b", "b3", "j71"] {

            let parent_volume = match tree.bounding_volume(parent).unwrap() {
                IcosaVolume::Prism(p) => p,
                IcosaVolume::Shell => panic!(),
            };

            let children: Vec<Prism> = (0..8).map(|i| parent_volume.child(i)).collect();

            for _ in 0..1000 {
                let p = random_in_shell(&mut rng, tree.inner_radius, tree.outer_radius);
                if !parent_volume.contains(p) {
                    continue;
                }
                assert!(children.iter().any(|x| x.contains(p)));
            }

            //the centre of every child is in the parent
            for child in children.iter() {
                let centroid = (child.triangle[0] + child.triangle[1] + child.triangle[2]) / 3.0;
                let p = centroid * (child.top + child.bottom) * 0.5;
                assert!(parent_volume.contains(p));
                assert!(child.contains(p));
            }
        }
    }

    #[test]
    fn quick_triangular_coordinate() {

        let tree = earth_shell();
        let face = tree.faces()[4];

        let t = face.triangular(face.triangle[1]).unwrap();
        assert_approx_eq!(t.x, 0.0, 1e-9);
        assert_approx_eq!(t.y, 1.0, 1e-9);
        assert_approx_eq!(t.z, 0.0, 1e-9);

        //scaling a point towards the origin keeps its triangular coordinate
        let centroid = (face.triangle[0] + face.triangle[1] + face.triangle[2]) / 3.0;
        let t = face.triangular(centroid * 0.995).unwrap();
        assert_approx_eq!(t.x, 1.0 / 3.0, 1e-9);
        assert_approx_eq!(t.y, 1.0 / 3.0, 1e-9);

        assert_approx_eq!(face.depth(centroid), 0.0, 1e-9);
        assert_approx_eq!(face.depth(centroid * face.bottom), 1.0, 1e-9);
    }

    #[test]
    fn quick_slot_index() {

        let tree = earth_shell();
        let volume = tree.bounding_volume("5").unwrap();
        let face = tree.faces()[5];

        let p = face.triangle[0] * 0.999;
        let index = tree.index("5", &volume, p).unwrap();
        let (bucket, depth) = tree.decompose(index);
        assert_eq!(bucket, [3, 0, 0]);
        assert_eq!(depth, 0);
        assert!(index < tree.capacity("5"));

        //deep in the shell
        let p = face.triangle[2] * (face.bottom + 0.0001);
        let (bucket, depth) = tree.decompose(tree.index("5", &volume, p).unwrap());
        assert_eq!(bucket, [0, 0, 3]);
        assert_eq!(depth, 1);

        //outside the face
        assert_eq!(tree.index("5", &volume, -face.triangle[0]), None);
        assert_eq!(tree.index("", &IcosaVolume::Shell, DVec3::ZERO), None);
        assert_eq!(tree.index("", &IcosaVolume::Shell, face.triangle[0] * 0.999), Some(0));
    }

    #[test]
    fn quick_swap_in_triangular_space() {

        let tree = Icosatree::new(1.0, 2.0, [1, 1, 1]).unwrap();
        let volume = tree.bounding_volume("2").unwrap();
        let face = tree.faces()[2];

        let centroid = (face.triangle[0] + face.triangle[1] + face.triangle[2]) / 3.0;
        let near = centroid * 0.9;
        let far = (centroid * 0.8 + face.triangle[0] * 0.2) * 0.9;

        assert!(tree.swap_point_check("2", &volume, 0, far, near));
        assert!(!tree.swap_point_check("2", &volume, 0, near, far));

        //depth does not matter
        assert!(tree.swap_point_check("2", &volume, 0, far, centroid * 0.5));
        assert!(!tree.swap_point_check("2", &volume, 0, centroid * 0.5, far * (0.5 / 0.9)));

        assert!(!tree.swap_point_check("", &IcosaVolume::Shell, 0, far, near));
    }
}
