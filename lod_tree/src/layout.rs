//! Sets constants for the on-disk layout of an exported tree
//!
//! A cell path maps to nested one-character directories for every character but the last, and
//! the last character becomes the file stem: path "032" lives in `0/3/2.dat` and `0/3/2.txt`.
//! The root has no path characters and uses `root.dat` / `root.txt`.

use std::path::{Path, PathBuf};

pub const ROOT_STEM: &str = "root";

pub const POINTS_EXTENSION: &str = "dat";
pub const METADATA_EXTENSION: &str = "txt";

pub const ATTRIBUTES_FILENAME: &str = "attributes.csv";
pub const CONFIG_FILENAME: &str = "config.yaml";

pub const ATTRIBUTES_HEADER: &str = "index,name,offset,size,type,typeBytes,min,max,mean,variance";
pub const ATTRIBUTES_COLUMNS: usize = 10;

//spatial attributes every tree needs
pub const X_ATTRIBUTE: &str = "X";
pub const Y_ATTRIBUTE: &str = "Y";
pub const Z_ATTRIBUTE: &str = "Z";

pub const CHILD_SEPARATOR: char = ',';

/// Relative location of a cell without extension, always `/` separated so it can be appended to
/// a URL as well as a directory.
pub fn relative_stem(path: &str) -> String {

    if path.is_empty() {
        return ROOT_STEM.to_string();
    }

    let mut s = String::with_capacity(path.len() * 2);
    for (i, c) in path.chars().enumerate() {
        if i != 0 {
            s.push('/');
        }
        s.push(c);
    }

    return s;
}

pub fn points_file(path: &str) -> String {
    format!("{}.{}", relative_stem(path), POINTS_EXTENSION)
}

pub fn metadata_file(path: &str) -> String {
    format!("{}.{}", relative_stem(path), METADATA_EXTENSION)
}

/// Directory that holds the files of `path` below `base`.
pub fn cell_directory(base: &Path, path: &str) -> PathBuf {

    let mut dir = base.to_path_buf();

    let n = path.chars().count();
    for c in path.chars().take(n.saturating_sub(1)) {
        dir.push(c.to_string());
    }

    return dir;
}

fn file_stem(path: &str) -> String {
    match path.chars().last() {
        Some(c) => c.to_string(),
        None => ROOT_STEM.to_string(),
    }
}

pub fn points_path(base: &Path, path: &str) -> PathBuf {
    cell_directory(base, path).join(format!("{}.{}", file_stem(path), POINTS_EXTENSION))
}

pub fn metadata_path(base: &Path, path: &str) -> PathBuf {
    cell_directory(base, path).join(format!("{}.{}", file_stem(path), METADATA_EXTENSION))
}

/// Parses the first line of a metadata file into child paths. Blank means no children.
pub fn parse_children(line: &str) -> Vec<String> {

    line.trim()
        .split(CHILD_SEPARATOR)
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}
