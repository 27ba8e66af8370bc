//! Implementation of tree creation, export and loading
use crate::attribute::DataAttributes;
use crate::data::{Parser, Point};
use crate::error::{Error, Result};
use crate::icosatree::Icosatree;
use crate::layout;
use crate::node::{Placement, TreeCell};
use crate::octree::Octree;
use crate::subdivision::Subdivision;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubdivisionKind {
    Octree,
    Icosatree,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TreeConfig {
    pub directory: String,
    pub subdivision: SubdivisionKind,
    /// Octree: slots per axis. Icosatree: `split[0]` per triangular axis, `split[2]` in depth.
    pub split: [usize; 3],
    /// Minimum corner of the octree root cube.
    pub origin: [f64; 3],
    /// Edge length of the octree root cube.
    pub size: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub max_depth: usize,
    pub num_points: Option<usize>,
}

impl TreeConfig {

    pub fn default() -> Self {
        return Self {
            directory: "/tmp/lod_tree".to_string(),
            subdivision: SubdivisionKind::Octree,
            split: [64, 64, 64],
            origin: [0.0, 0.0, 0.0],
            size: 1.0,
            inner_radius: 6_350_000.0,
            outer_radius: 6_400_000.0,
            max_depth: 24,
            num_points: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self> {

        let serialized = fs::read_to_string(filename)?;

        let deserialized: Self = serde_yaml::from_str(&serialized)?;

        return Ok(deserialized);
    }

    pub fn to_file<P: AsRef<Path>>(&self, filename: P) -> Result<()> {

        let serialized = serde_yaml::to_string(&self)?;
        let mut file = File::create(filename)?;

        file.write_all(serialized.as_bytes())?;

        return Ok(());
    }
}

/// Summary of a built tree, written under the child list of `root.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildStats {
    pub num_cells: usize,
    pub num_points: usize,
    pub min_points: usize,
    pub max_points: usize,
    pub avg_points: f64,
    pub max_depth: usize,
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "cells: {}", self.num_cells)?;
        writeln!(f, "points: {}", self.num_points)?;
        writeln!(f, "min points per cell: {}", self.min_points)?;
        writeln!(f, "max points per cell: {}", self.max_points)?;
        writeln!(f, "avg points per cell: {:.2}", self.avg_points)?;
        write!(f, "max depth: {}", self.max_depth)
    }
}

/// Level-of-detail tree over one subdivision.
///
/// Cells live in an arena and are found by path; the tree is the only thing that creates them.
/// Everything is held in memory until `export` writes the layout described in `layout`.
#[derive(Debug)]
pub struct Tree<S: Subdivision> {
    pub schema: DataAttributes,
    pub subdivision: S,
    pub config: TreeConfig,
    cells: Vec<TreeCell<S::Volume>>,
    index: HashMap<String, usize>,
    num_points: usize,
}

impl<S: Subdivision> Tree<S> {

    pub fn new(schema: DataAttributes, subdivision: S, config: TreeConfig) -> Result<Self> {

        //fail here rather than on the first point
        schema.xyz()?;

        let mut tree = Self {
            schema,
            subdivision,
            config,
            cells: Vec::new(),
            index: HashMap::new(),
            num_points: 0,
        };

        tree.cell_index("")?;

        return Ok(tree);
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, path: &str) -> Option<&TreeCell<S::Volume>> {
        self.index.get(path).map(|i| &self.cells[*i])
    }

    fn cell_index(&mut self, path: &str) -> Result<usize> {

        if let Some(i) = self.index.get(path) {
            return Ok(*i);
        }

        let cell = TreeCell::new(&self.subdivision, path)?;
        debug!("created cell `{}`", path);

        self.cells.push(cell);
        self.index.insert(path.to_string(), self.cells.len() - 1);

        return Ok(self.cells.len() - 1);
    }

    /// Cell at `path`, created if it does not exist yet.
    pub fn get_cell(&mut self, path: &str) -> Result<&mut TreeCell<S::Volume>> {

        let i = self.cell_index(path)?;

        return Ok(&mut self.cells[i]);
    }

    /// Inserts a point starting at the root. Points evicted on the way keep moving down until
    /// they find a free slot; the returned path is the cell where that last moving point landed.
    ///
    /// On error the tree is left as it was before the call.
    pub fn add_point(&mut self, point: Point) -> Result<String> {

        let mut path = String::new();
        let mut point = point;

        //occupants evicted on the way down, to put back if the insertion fails
        let mut evicted: Vec<(usize, usize, Point)> = Vec::new();
        let num_cells = self.cells.len();

        loop {

            if path.chars().count() > self.config.max_depth {
                self.undo_insertion(evicted, num_cells);
                return Err(Error::Geometry(format!("point {} pushed below max depth {} at `{}`", point.position(), self.config.max_depth, path)));
            }

            let i = match self.cell_index(&path) {
                Ok(x) => x,
                Err(e) => {
                    self.undo_insertion(evicted, num_cells);
                    return Err(e);
                }
            };

            match self.cells[i].add_point(&self.subdivision, point) {
                Ok(Placement::Stored(_)) => {
                    self.record_overflow(&path)?;
                    self.num_points += 1;
                    return Ok(path);
                },
                Ok(Placement::Displaced { child, point: displaced, swapped }) => {
                    if let Some(slot) = swapped {
                        evicted.push((i, slot, displaced.clone()));
                    }
                    path = child;
                    point = displaced;
                },
                Err(e) => {
                    self.undo_insertion(evicted, num_cells);
                    return Err(e);
                },
            }
        }
    }

    fn undo_insertion(&mut self, evicted: Vec<(usize, usize, Point)>, num_cells: usize) {

        for (i, slot, point) in evicted.into_iter().rev() {
            self.cells[i].replace(slot, point);
        }

        //cells created on the way down are still empty
        while self.cells.len() > num_cells {
            if let Some(cell) = self.cells.pop() {
                self.index.remove(&cell.path);
            }
        }
    }

    pub fn add_record(&mut self, data: &[u8]) -> Result<String> {

        let point = Point::from_slice(&self.schema, data)?;

        return self.add_point(point);
    }

    //a point that lands directly in a cell is counted by that cell's parent
    fn record_overflow(&mut self, path: &str) -> Result<()> {

        if path.is_empty() {
            return Ok(());
        }

        let mut parent = path.to_string();
        parent.pop();

        match self.index.get(&parent) {
            Some(i) => {
                self.cells[*i].record_overflow(path);
                Ok(())
            },
            None => Err(Error::Geometry(format!("cell `{}` has no parent in the tree", path))),
        }
    }

    /// Every cell, breadth first: shorter paths first, then by path.
    pub fn cells(&self) -> Vec<&TreeCell<S::Volume>> {

        let mut cells: Vec<&TreeCell<S::Volume>> = self.cells.iter().collect();
        cells.sort_by(|a, b| (a.path.len(), &a.path).cmp(&(b.path.len(), &b.path)));

        return cells;
    }

    pub fn stats(&self) -> BuildStats {

        let counts: Vec<usize> = self.cells.iter().map(|x| x.len()).collect();
        let num_cells = counts.len();

        let avg_points = match num_cells {
            0 => 0.0,
            n => self.num_points as f64 / n as f64,
        };

        return BuildStats {
            num_cells,
            num_points: self.num_points,
            min_points: counts.iter().copied().min().unwrap_or(0),
            max_points: counts.iter().copied().max().unwrap_or(0),
            avg_points,
            max_depth: self.cells.iter().map(|x| x.depth()).max().unwrap_or(0),
        };
    }

    /// Writes every cell plus `attributes.csv` and `config.yaml` below `directory`.
    pub fn export<P: AsRef<Path>>(&self, directory: P) -> Result<()> {

        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;

        info!("exporting {} cells to {}", self.cells.len(), directory.display());

        let stats = self.stats();

        for cell in self.cells() {

            let points_path = layout::points_path(directory, &cell.path);
            if let Some(parent) = points_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut writer = BufWriter::new(File::create(&points_path)?);
            for point in cell.points() {
                writer.write_all(point.data())?;
            }
            writer.flush()?;

            let children: Vec<String> = cell.child_paths();
            let mut metadata = BufWriter::new(File::create(layout::metadata_path(directory, &cell.path))?);
            let separator = layout::CHILD_SEPARATOR.to_string();
            writeln!(metadata, "{}", children.join(separator.as_str()))?;

            if cell.path.is_empty() {
                writeln!(metadata, "{}", stats)?;
            }
            metadata.flush()?;
        }

        self.schema.to_file(directory.join(layout::ATTRIBUTES_FILENAME))?;

        let mut config = self.config.clone();
        config.directory = directory.to_string_lossy().to_string();
        config.num_points = Some(self.num_points);
        config.to_file(directory.join(layout::CONFIG_FILENAME))?;

        info!("export done\n{}", stats);

        return Ok(());
    }

    /// Rebuilds a tree from an export. Cells are read breadth first from `root.txt` down; each
    /// child's overflow count is the number of points it holds.
    pub fn from_directory<P: AsRef<Path>>(directory: P, subdivision: S, config: TreeConfig) -> Result<Self> {

        let directory = directory.as_ref();

        let schema = DataAttributes::from_file(directory.join(layout::ATTRIBUTES_FILENAME))?;
        let mut tree = Self::new(schema, subdivision, config)?;

        let mut to_read: VecDeque<String> = VecDeque::new();
        to_read.push_back(String::new());

        while let Some(path) = to_read.pop_front() {

            let payload = fs::read(layout::points_path(directory, &path))?;
            let points = Parser::points(&tree.schema, &payload)?;
            let count = points.len();

            let i = tree.cell_index(&path)?;
            for point in points {
                tree.cells[i].restore_point(&tree.subdivision, point)?;
            }
            tree.num_points += count;

            if !path.is_empty() {
                let mut parent = path.clone();
                parent.pop();
                let p = tree.cell_index(&parent)?;
                tree.cells[p].restore_child(&path, count);
            }

            let metadata = fs::read_to_string(layout::metadata_path(directory, &path))?;
            let first_line = metadata.lines().next().unwrap_or("");

            for child in layout::parse_children(first_line) {
                to_read.push_back(child);
            }
        }

        info!("read {} cells with {} points from {}", tree.cells.len(), tree.num_points, directory.display());

        return Ok(tree);
    }
}

/// A tree over whichever subdivision a config names.
#[derive(Debug)]
pub enum AnyTree {
    Octree(Tree<Octree>),
    Icosatree(Tree<Icosatree>),
}

impl AnyTree {

    pub fn from_config(config: TreeConfig, schema: DataAttributes) -> Result<Self> {

        match config.subdivision {
            SubdivisionKind::Octree => {
                let subdivision = Octree::from_config(&config)?;
                Ok(AnyTree::Octree(Tree::new(schema, subdivision, config)?))
            },
            SubdivisionKind::Icosatree => {
                let subdivision = Icosatree::from_config(&config)?;
                Ok(AnyTree::Icosatree(Tree::new(schema, subdivision, config)?))
            },
        }
    }

    pub fn read_from_directory<P: AsRef<Path>>(directory: P) -> Result<Self> {

        let directory = directory.as_ref();
        let config = TreeConfig::from_file(directory.join(layout::CONFIG_FILENAME))?;

        match config.subdivision {
            SubdivisionKind::Octree => {
                let subdivision = Octree::from_config(&config)?;
                Ok(AnyTree::Octree(Tree::from_directory(directory, subdivision, config)?))
            },
            SubdivisionKind::Icosatree => {
                let subdivision = Icosatree::from_config(&config)?;
                Ok(AnyTree::Icosatree(Tree::from_directory(directory, subdivision, config)?))
            },
        }
    }

    pub fn schema(&self) -> &DataAttributes {
        match self {
            AnyTree::Octree(x) => &x.schema,
            AnyTree::Icosatree(x) => &x.schema,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        match self {
            AnyTree::Octree(x) => &x.config,
            AnyTree::Icosatree(x) => &x.config,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnyTree::Octree(x) => x.len(),
            AnyTree::Icosatree(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_record(&mut self, data: &[u8]) -> Result<String> {
        match self {
            AnyTree::Octree(x) => x.add_record(data),
            AnyTree::Icosatree(x) => x.add_record(data),
        }
    }

    pub fn stats(&self) -> BuildStats {
        match self {
            AnyTree::Octree(x) => x.stats(),
            AnyTree::Icosatree(x) => x.stats(),
        }
    }

    pub fn export<P: AsRef<Path>>(&self, directory: P) -> Result<()> {
        match self {
            AnyTree::Octree(x) => x.export(directory),
            AnyTree::Icosatree(x) => x.export(directory),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::attribute::{Attribute, AttributeType};
    use crate::data::Value;
    use glam::DVec3;
    use rand::Rng;

    fn schema() -> DataAttributes {
        DataAttributes::new(vec![
            Attribute::new(0, "X", 0, AttributeType::Float64),
            Attribute::new(1, "Y", 8, AttributeType::Float64),
            Attribute::new(2, "Z", 16, AttributeType::Float64),
            Attribute::new(3, "PointSourceId", 24, AttributeType::UInt32),
        ]).unwrap()
    }

    fn point(schema: &DataAttributes, p: DVec3, id: i64) -> Point {
        Point::from_values(schema, &[Value::Float(p.x), Value::Float(p.y), Value::Float(p.z), Value::Int(id)]).unwrap()
    }

    fn octree_config(split: [usize; 3]) -> TreeConfig {

        let mut config = TreeConfig::default();
        config.split = split;

        return config;
    }

    fn unit_tree(split: [usize; 3]) -> Tree<Octree> {

        let config = octree_config(split);
        let octree = Octree::from_config(&config).unwrap();

        return Tree::new(schema(), octree, config).unwrap();
    }

    //one point per sub-cell centre of the unit cube, slightly off so none sits on a boundary
    fn sub_cell_centres() -> Vec<DVec3> {

        let mut centres: Vec<DVec3> = Vec::new();
        for i in 0..8 {
            let [x, y, z] = [i % 2, (i / 2) % 2, i / 4];
            centres.push(DVec3::new(0.25 + 0.5 * x as f64, 0.26 + 0.5 * y as f64, 0.24 + 0.5 * z as f64));
        }

        return centres;
    }

    #[test]
    fn quick_nine_points_one_pushed() {

        let schema = DataAttributes::new(vec![
            Attribute::new(0, "X", 0, AttributeType::Float64),
            Attribute::new(1, "Y", 8, AttributeType::Float64),
            Attribute::new(2, "Z", 16, AttributeType::Float64),
        ]).unwrap();
        assert_eq!(schema.stride(), 24);

        let point = |p: DVec3| Point::from_values(&schema, &[Value::Float(p.x), Value::Float(p.y), Value::Float(p.z)]).unwrap();

        for far_first in [true, false] {

            let config = octree_config([2, 2, 2]);
            let octree = Octree::from_config(&config).unwrap();
            let mut tree = Tree::new(schema.clone(), octree, config).unwrap();

            let far = point(DVec3::new(0.1, 0.1, 0.1));

            if far_first {
                assert_eq!(tree.add_point(far.clone()).unwrap(), "");
            }
            for c in sub_cell_centres() {
                tree.add_point(point(c)).unwrap();
            }
            if !far_first {
                assert_eq!(tree.add_point(far.clone()).unwrap(), "0");
            }

            let root = tree.cell("").unwrap();
            assert_eq!(root.len(), 8);
            assert!(root.points().all(|x| *x != far));
            assert_eq!(root.child_paths(), vec!["0"]);
            assert_eq!(root.child_counts()["0"], 1);

            let child = tree.cell("0").unwrap();
            assert_eq!(child.len(), 1);
            assert_eq!(child.points().next(), Some(&far));

            assert_eq!(tree.len(), 9);
            assert_eq!(tree.num_cells(), 2);
        }
    }

    #[test]
    fn quick_every_point_kept_once() {

        let schema = schema();
        let mut tree = unit_tree([2, 2, 2]);
        let mut rng = rand::thread_rng();

        let mut inserted: Vec<Vec<u8>> = Vec::new();
        for i in 0..5000 {
            let p = point(&schema, DVec3::new(rng.gen(), rng.gen(), rng.gen()), i);
            inserted.push(p.data().to_vec());
            tree.add_point(p).unwrap();
        }

        let mut stored: Vec<Vec<u8>> = Vec::new();
        for cell in tree.cells() {
            assert!(cell.len() <= cell.capacity());
            stored.extend(cell.points().map(|x| x.data().to_vec()));
        }

        inserted.sort();
        stored.sort();
        assert_eq!(inserted, stored);
        assert_eq!(tree.len(), 5000);
    }

    #[test]
    fn quick_children_only_below_full_slots() {

        let schema = schema();
        let mut tree = unit_tree([4, 4, 4]);
        let mut rng = rand::thread_rng();

        for i in 0..20000 {
            //clustered so some branches go deep
            let p = DVec3::new(rng.gen::<f64>().powi(3), rng.gen::<f64>().powi(2), rng.gen());
            tree.add_point(point(&schema, p, i)).unwrap();
        }

        for cell in tree.cells() {

            if cell.path.is_empty() {
                continue;
            }

            let mut parent_path = cell.path.clone();
            parent_path.pop();
            let parent = tree.cell(&parent_path).unwrap();

            assert_eq!(parent.child_counts()[&cell.path], cell.len());

            //a point only gets here if its slot one level up was taken
            for p in cell.points() {
                let slot = tree.subdivision.index(&parent.path, &parent.volume, p.position()).unwrap();
                assert!(parent.get(slot).is_some());
            }
        }

        let stats = tree.stats();
        assert_eq!(stats.num_points, 20000);
        assert_eq!(stats.num_cells, tree.num_cells());
        assert!(stats.max_points <= 64);
        assert!(stats.max_depth >= 1);
    }

    #[test]
    fn quick_bfs_order() {

        let schema = schema();
        let mut tree = unit_tree([1, 1, 1]);
        let mut rng = rand::thread_rng();

        for i in 0..300 {
            tree.add_point(point(&schema, DVec3::new(rng.gen(), rng.gen(), rng.gen()), i)).unwrap();
        }

        let cells = tree.cells();
        assert_eq!(cells[0].path, "");
        for pair in cells.windows(2) {
            assert!((pair[0].path.len(), &pair[0].path) < (pair[1].path.len(), &pair[1].path));
        }
    }

    #[test]
    fn quick_max_depth() {

        let schema = schema();
        let mut config = octree_config([1, 1, 1]);
        config.max_depth = 3;
        let octree = Octree::from_config(&config).unwrap();
        let mut tree = Tree::new(schema.clone(), octree, config).unwrap();

        let same = DVec3::new(0.3, 0.3, 0.3);
        for i in 0..4 {
            tree.add_point(point(&schema, same, i)).unwrap();
        }

        let result = tree.add_point(point(&schema, same, 4));
        assert!(matches!(result, Err(Error::Geometry(_))));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn quick_failed_insert_leaves_tree_unchanged() {

        let schema = schema();
        let mut config = octree_config([1, 1, 1]);
        config.max_depth = 0;
        let octree = Octree::from_config(&config).unwrap();
        let mut tree = Tree::new(schema.clone(), octree, config).unwrap();

        let edge = point(&schema, DVec3::new(0.1, 0.1, 0.1), 0);
        let central = point(&schema, DVec3::new(0.49, 0.5, 0.5), 1);

        tree.add_point(edge.clone()).unwrap();

        //central would take the slot and push edge below the root
        assert!(matches!(tree.add_point(central), Err(Error::Geometry(_))));

        let root = tree.cell("").unwrap();
        assert_eq!(root.points().collect::<Vec<&Point>>(), vec![&edge]);
        assert!(root.child_paths().is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.num_cells(), 1);
    }

    #[test]
    fn quick_failed_deep_insert_restores_every_level() {

        let schema = schema();
        let mut config = octree_config([1, 1, 1]);
        config.max_depth = 2;
        let octree = Octree::from_config(&config).unwrap();
        let mut tree = Tree::new(schema.clone(), octree, config).unwrap();

        //each one further from the slot centres than the next
        let a = point(&schema, DVec3::new(0.01, 0.01, 0.01), 0);
        let b = point(&schema, DVec3::new(0.05, 0.05, 0.05), 1);
        let c = point(&schema, DVec3::new(0.1, 0.1, 0.1), 2);
        let d = point(&schema, DVec3::new(0.2, 0.2, 0.2), 3);

        //the returned path is where the evicted occupant came to rest
        assert_eq!(tree.add_point(a.clone()).unwrap(), "");
        assert_eq!(tree.add_point(b.clone()).unwrap(), "0");
        assert_eq!(tree.add_point(c.clone()).unwrap(), "00");
        assert_eq!(tree.cell("").unwrap().points().next(), Some(&c));

        let before: Vec<(String, Vec<Point>)> = tree.cells().iter().map(|x| (x.path.clone(), x.points().cloned().collect())).collect();
        assert_eq!(before.len(), 3);

        //every level keeps the newcomer, so a ends up one level below max depth
        assert!(matches!(tree.add_point(d), Err(Error::Geometry(_))));

        let after: Vec<(String, Vec<Point>)> = tree.cells().iter().map(|x| (x.path.clone(), x.points().cloned().collect())).collect();
        assert_eq!(after, before);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn quick_needs_xyz() {

        let schema = DataAttributes::new(vec![
            Attribute::new(0, "X", 0, AttributeType::Float64),
            Attribute::new(1, "Y", 8, AttributeType::Float64),
        ]).unwrap();

        let config = octree_config([2, 2, 2]);
        let octree = Octree::from_config(&config).unwrap();

        assert!(matches!(Tree::new(schema, octree, config), Err(Error::MissingCoordinate(_))));
    }

    #[test]
    fn quick_add_record_checks_stride() {

        let mut tree = unit_tree([2, 2, 2]);

        assert!(matches!(tree.add_record(&[0u8; 27]), Err(Error::Decode { .. })));
        assert_eq!(tree.add_record(&[0u8; 28]).unwrap(), "");
    }

    //four points close together inside box "032" fill one cell per level down to it
    fn deep_tree() -> Tree<Octree> {

        let schema = schema();
        let mut tree = unit_tree([1, 1, 1]);

        let q = DVec3::new(0.06, 0.44, 0.31);
        for i in 0..4 {
            let offset = DVec3::splat(0.001 * i as f64);
            tree.add_point(point(&schema, q + offset, i)).unwrap();
        }

        return tree;
    }

    #[test]
    fn quick_export_layout() {

        let tree = deep_tree();
        assert_eq!(tree.cells().iter().map(|x| x.path.as_str()).collect::<Vec<&str>>(), vec!["", "0", "03", "032"]);

        let dir = tempfile::tempdir().unwrap();
        tree.export(dir.path()).unwrap();

        for file in ["root.dat", "root.txt", "0.dat", "0.txt", "0/3.dat", "0/3.txt", "0/3/2.dat", "0/3/2.txt", "attributes.csv", "config.yaml"] {
            assert!(dir.path().join(file).is_file(), "{} missing", file);
        }

        assert_eq!(fs::read(dir.path().join("0/3/2.dat")).unwrap().len(), 28);

        let root = fs::read_to_string(dir.path().join("root.txt")).unwrap();
        let mut lines = root.lines();
        assert_eq!(lines.next(), Some("0"));
        assert!(root.lines().any(|x| x == "cells: 4"));
        assert!(root.lines().any(|x| x == "points: 4"));

        assert_eq!(fs::read_to_string(dir.path().join("0/3.txt")).unwrap().lines().next(), Some("032"));
        assert_eq!(fs::read_to_string(dir.path().join("0/3/2.txt")).unwrap().lines().next(), Some(""));

        let config = TreeConfig::from_file(dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.num_points, Some(4));
        assert_eq!(config.split, [1, 1, 1]);
    }

    #[test]
    fn quick_export_read_back() {

        let schema = schema();
        let mut tree = unit_tree([2, 2, 2]);
        let mut rng = rand::thread_rng();

        for i in 0..3000 {
            tree.add_point(point(&schema, DVec3::new(rng.gen(), rng.gen(), rng.gen()), i)).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        tree.export(dir.path()).unwrap();

        let read = match AnyTree::read_from_directory(dir.path()).unwrap() {
            AnyTree::Octree(x) => x,
            AnyTree::Icosatree(_) => panic!("wrong subdivision"),
        };

        assert_eq!(read.len(), tree.len());
        assert_eq!(read.schema, tree.schema);
        assert_eq!(read.num_cells(), tree.num_cells());

        for cell in tree.cells() {
            let other = read.cell(&cell.path).unwrap();
            assert_eq!(other.slots().collect::<Vec<_>>(), cell.slots().collect::<Vec<_>>());
            assert_eq!(other.child_counts(), cell.child_counts());
        }
    }

    #[test]
    fn quick_icosatree_build() {

        let schema = schema();

        let mut config = TreeConfig::default();
        config.subdivision = SubdivisionKind::Icosatree;
        config.split = [2, 2, 2];
        config.inner_radius = 10.0;
        config.outer_radius = 20.0;

        let mut tree = AnyTree::from_config(config, schema.clone()).unwrap();
        let mut rng = rand::thread_rng();

        for i in 0..2000 {
            let direction = DVec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            if direction.length() < 1e-3 {
                continue;
            }
            let p = direction.normalize() * rng.gen_range(10.5..14.0);
            tree.add_record(point(&schema, p, i).data()).unwrap();
        }

        let tree = match tree {
            AnyTree::Icosatree(x) => x,
            AnyTree::Octree(_) => panic!("wrong subdivision"),
        };

        assert_eq!(tree.cell("").unwrap().len(), 1);

        let mut total = 0;
        for cell in tree.cells() {
            assert!(cell.len() <= cell.capacity());
            total += cell.len();
        }
        assert_eq!(total, tree.len());

        for child in tree.cell("").unwrap().child_paths() {
            assert_eq!(child.len(), 1);
            assert!("0123456789abcdefghij".contains(child.as_str()));
        }

        //a point outside the shell has nowhere to go
        let outside = point(&schema, DVec3::new(100.0, 0.0, 0.0), 0);
        let mut tree = tree;
        assert!(matches!(tree.add_point(outside), Err(Error::Geometry(_))));
    }

    #[test]
    fn quick_config_file() {

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("config.yaml");

        let mut config = TreeConfig::default();
        config.subdivision = SubdivisionKind::Icosatree;
        config.num_points = Some(12);
        config.to_file(&filename).unwrap();

        let contents = fs::read_to_string(&filename).unwrap();
        assert!(contents.contains("subdivision: icosatree"));

        assert_eq!(TreeConfig::from_file(&filename).unwrap(), config);
        assert!(matches!(TreeConfig::from_file(dir.path().join("nope.yaml")), Err(Error::Io(_))));
    }
}
