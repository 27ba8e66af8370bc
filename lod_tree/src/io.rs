//! Where exported cells are read from: a local directory or an HTTP server serving one.
use crate::attribute::DataAttributes;
use crate::error::Result;
use crate::layout;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

#[derive(Debug, Clone)]
pub enum BackingStore {
    Directory(PathBuf),
    Http {
        base_url: String,
        client: reqwest::blocking::Client,
    },
}

impl BackingStore {

    pub fn directory<P: AsRef<Path>>(path: P) -> Self {
        BackingStore::Directory(path.as_ref().to_path_buf())
    }

    pub fn http(base_url: &str) -> Result<Self> {

        let client = reqwest::blocking::Client::builder().build()?;

        return Ok(BackingStore::Http {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        });
    }

    /// HTTP for `http://` and `https://` locations, a directory for anything else.
    pub fn from_location(location: &str) -> Result<Self> {

        match location.starts_with("http://") || location.starts_with("https://") {
            true => Self::http(location),
            false => Ok(Self::directory(location)),
        }
    }

    /// Reads one file of the export, `relative` being `/` separated.
    fn read(&self, relative: &str) -> Result<Vec<u8>> {

        match self {
            BackingStore::Directory(base) => {
                let mut path = base.clone();
                for part in relative.split('/') {
                    path.push(part);
                }
                Ok(fs::read(path)?)
            },
            BackingStore::Http { base_url, client } => {
                let url = format!("{}/{}", base_url, relative);
                debug!("GET {}", url);
                let response = client.get(&url).send()?.error_for_status()?;
                Ok(response.bytes()?.to_vec())
            },
        }
    }

    pub fn read_payload(&self, path: &str) -> Result<Vec<u8>> {
        self.read(&layout::points_file(path))
    }

    pub fn read_metadata(&self, path: &str) -> Result<String> {

        let bytes = self.read(&layout::metadata_file(path))?;

        return Ok(String::from_utf8_lossy(&bytes).to_string());
    }

    /// Child paths from the first line of the cell's metadata.
    pub fn read_children(&self, path: &str) -> Result<Vec<String>> {

        let metadata = self.read_metadata(path)?;

        return Ok(layout::parse_children(metadata.lines().next().unwrap_or("")));
    }

    pub fn read_attributes(&self) -> Result<DataAttributes> {

        let bytes = self.read(layout::ATTRIBUTES_FILENAME)?;

        return DataAttributes::from_csv(&String::from_utf8_lossy(&bytes));
    }

    /// Payload and child paths of a cell. Failures are logged and read as empty, so a missing or
    /// unreachable cell still completes.
    pub fn fetch(&self, path: &str) -> (Vec<u8>, Vec<String>) {

        let payload = match self.read_payload(path) {
            Ok(x) => x,
            Err(e) => {
                warn!("could not read points of cell `{}`: {}", path, e);
                Vec::new()
            }
        };

        let children = match self.read_children(path) {
            Ok(x) => x,
            Err(e) => {
                warn!("could not read children of cell `{}`: {}", path, e);
                Vec::new()
            }
        };

        return (payload, children);
    }
}
