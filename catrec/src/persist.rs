use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::centroid::CentroidSet;
use crate::error::Result;
use crate::evaluate::SweepPoint;
use crate::index::IndexSnapshot;
use crate::store::MemoryStore;

/// On-disk format version; bump when a snapshot layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

/// Locations of the named artifacts under one artifact directory.
///
/// Every artifact is an opaque bincode blob keyed by name; save-then-load
/// reproduces the identical structure.
pub struct ArtifactPaths {
    pub root: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.index.bin"))
    }
    fn corpus(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.corpus.bin"))
    }
    fn centroids(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.centroids.bin"))
    }
    fn sweep(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.sweep.bin"))
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
}

fn save_blob<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn load_blob<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let r = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(r)?)
}

pub fn save_index(paths: &ArtifactPaths, name: &str, index: &IndexSnapshot) -> Result<()> {
    save_blob(&paths.index(name), index)
}

pub fn load_index(paths: &ArtifactPaths, name: &str) -> Result<IndexSnapshot> {
    load_blob(&paths.index(name))
}

pub fn save_corpus(paths: &ArtifactPaths, name: &str, store: &MemoryStore) -> Result<()> {
    save_blob(&paths.corpus(name), store)
}

pub fn load_corpus(paths: &ArtifactPaths, name: &str) -> Result<MemoryStore> {
    load_blob(&paths.corpus(name))
}

pub fn save_centroids(paths: &ArtifactPaths, name: &str, set: &CentroidSet) -> Result<()> {
    save_blob(&paths.centroids(name), set)
}

pub fn load_centroids(paths: &ArtifactPaths, name: &str) -> Result<CentroidSet> {
    load_blob(&paths.centroids(name))
}

pub fn save_sweep(paths: &ArtifactPaths, name: &str, points: &[SweepPoint]) -> Result<()> {
    save_blob(&paths.sweep(name), &points.to_vec())
}

pub fn load_sweep(paths: &ArtifactPaths, name: &str) -> Result<Vec<SweepPoint>> {
    load_blob(&paths.sweep(name))
}

pub fn save_meta(paths: &ArtifactPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &ArtifactPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    Ok(serde_json::from_reader(BufReader::new(f))?)
}
