//! Fixture layouts: reproducible synthetic trees for tests and timing runs
//!
//! A layout is JSON, in one of two shapes:
//!
//! ```text
//! {"a.txt": {"size": 10}, "empty": null, "sub": {"b": {"minsize": 1, "maxsize": 9}}}
//! [3, 2, 4, {"size": 1024}]
//! ```
//!
//! An object maps names to a file spec (`null`, `{"size": n}`, or
//! `{"minsize": a, "maxsize": b}`) or to a nested layout. An array is a
//! grid: every number but the last is the count of `d{i}` directories per
//! level, the last number is the count of `f{i}.dat` files in each leaf
//! directory, and an optional trailing file spec applies to all files.
//!
//! File sizes within a range and file contents are derived from the file's
//! relative path, so the same layout always yields the same tree.

use crate::error::LayoutError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const FILE_BLOCK_SIZE: usize = 65535;

/// Size of a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSpec {
    Empty,
    Size(u64),
    Range { min: u64, max: u64 },
}

impl FileSpec {
    /// Concrete size for the file at `relpath`
    pub fn size_for(&self, relpath: &str) -> u64 {
        match *self {
            FileSpec::Empty => 0,
            FileSpec::Size(size) => size,
            FileSpec::Range { min, max } => {
                let hash = blake3::hash(format!("size:{}", relpath).as_bytes());
                let mut seed = [0u8; 8];
                seed.copy_from_slice(&hash.as_bytes()[..8]);
                let span = (max - min).saturating_add(1);
                min + u64::from_le_bytes(seed) % span
            }
        }
    }

    /// `Ok(None)` when `value` describes a directory rather than a file
    fn parse(value: &Value) -> Result<Option<Self>, LayoutError> {
        let object = match value {
            Value::Null => return Ok(Some(FileSpec::Empty)),
            Value::Object(object) => object,
            _ => return Ok(None),
        };
        if let Some(size) = object.get("size") {
            return Ok(Some(FileSpec::Size(as_u64(size, "size")?)));
        }
        if let Some(max) = object.get("maxsize") {
            let max = as_u64(max, "maxsize")?;
            let min = match object.get("minsize") {
                Some(min) => as_u64(min, "minsize")?,
                None => 0,
            };
            if min > max {
                return Err(LayoutError::Invalid(format!(
                    "minsize {} exceeds maxsize {}",
                    min, max
                )));
            }
            return Ok(Some(FileSpec::Range { min, max }));
        }
        Ok(None)
    }
}

fn as_u64(value: &Value, key: &str) -> Result<u64, LayoutError> {
    value
        .as_u64()
        .ok_or_else(|| LayoutError::Invalid(format!("{} must be a non-negative integer", key)))
}

/// One named entry of an explicit layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(FileSpec),
    Directory(Layout),
}

/// Description of a tree to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Tree(BTreeMap<String, Node>),
    Grid { widths: Vec<usize>, file: FileSpec },
}

impl Layout {
    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, LayoutError> {
        match value {
            Value::Object(object) => {
                let mut children = BTreeMap::new();
                for (name, child) in object {
                    validate_name(name)?;
                    let node = match FileSpec::parse(child)? {
                        Some(spec) => Node::File(spec),
                        None => Node::Directory(Self::from_value(child)?),
                    };
                    children.insert(name.clone(), node);
                }
                Ok(Layout::Tree(children))
            }
            Value::Array(items) => {
                let (file, widths) = match items.split_last() {
                    Some((last, rest)) if last.is_null() || last.is_object() => {
                        let spec = FileSpec::parse(last)?.ok_or_else(|| {
                            LayoutError::Invalid("grid file spec needs size or maxsize".to_string())
                        })?;
                        (spec, rest)
                    }
                    _ => (FileSpec::Empty, &items[..]),
                };
                if widths.is_empty() {
                    return Err(LayoutError::Invalid(
                        "grid layout needs at least one width".to_string(),
                    ));
                }
                let widths = widths
                    .iter()
                    .map(|w| as_u64(w, "grid width").map(|w| w as usize))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Layout::Grid { widths, file })
            }
            _ => Err(LayoutError::Invalid(
                "layout must be a JSON object or array".to_string(),
            )),
        }
    }

    /// Number of files the layout creates
    pub fn file_count(&self) -> usize {
        match self {
            Layout::Tree(children) => children
                .values()
                .map(|node| match node {
                    Node::File(_) => 1,
                    Node::Directory(layout) => layout.file_count(),
                })
                .sum(),
            Layout::Grid { widths, .. } => widths.iter().product(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), LayoutError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(LayoutError::Invalid(format!("invalid entry name {:?}", name)));
    }
    Ok(())
}

/// Create the tree described by `layout` under `root`
pub fn create_tree(root: &Path, layout: &Layout) -> Result<(), LayoutError> {
    make_dir(root)?;
    info!(root = %root.display(), files = layout.file_count(), "Creating tree");
    populate(root, "", layout)
}

fn populate(dir: &Path, prefix: &str, layout: &Layout) -> Result<(), LayoutError> {
    match layout {
        Layout::Tree(children) => {
            for (name, node) in children {
                let path = dir.join(name);
                let relpath = join_rel(prefix, name);
                match node {
                    Node::File(spec) => write_file(&path, &relpath, spec)?,
                    Node::Directory(sub) => {
                        make_dir(&path)?;
                        populate(&path, &relpath, sub)?;
                    }
                }
            }
            Ok(())
        }
        Layout::Grid { widths, file } => grid(dir, prefix, widths, file),
    }
}

fn grid(dir: &Path, prefix: &str, widths: &[usize], file: &FileSpec) -> Result<(), LayoutError> {
    match widths {
        [] => Ok(()),
        [files] => {
            for i in 0..*files {
                let name = format!("f{}.dat", i);
                write_file(&dir.join(&name), &join_rel(prefix, &name), file)?;
            }
            Ok(())
        }
        [dirs, rest @ ..] => {
            for i in 0..*dirs {
                let name = format!("d{}", i);
                let path = dir.join(&name);
                make_dir(&path)?;
                grid(&path, &join_rel(prefix, &name), rest, file)?;
            }
            Ok(())
        }
    }
}

fn join_rel(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

fn make_dir(path: &Path) -> Result<(), LayoutError> {
    fs::create_dir_all(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, relpath: &str, spec: &FileSpec) -> Result<(), LayoutError> {
    let size = spec.size_for(relpath);
    debug!(path = %path.display(), size, "Creating file");
    write_content(path, relpath, size).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_content(path: &Path, relpath: &str, size: u64) -> io::Result<()> {
    let mut file = File::create(path)?;
    let mut content = blake3::Hasher::new()
        .update(relpath.as_bytes())
        .finalize_xof();
    let mut block = vec![0u8; FILE_BLOCK_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(FILE_BLOCK_SIZE as u64) as usize;
        content.fill(&mut block[..n]);
        file.write_all(&block[..n])?;
        remaining -= n as u64;
    }
    file.flush()
}

/// Counts of what lies under a root (the root itself excluded)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub files: u64,
    pub directories: u64,
    pub bytes: u64,
}

impl TreeStats {
    /// Walk `root`, following symlinks like the digest walkers do
    pub fn collect(root: &Path) -> io::Result<Self> {
        let mut stats = TreeStats::default();
        for entry in WalkDir::new(root).min_depth(1).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                stats.directories += 1;
            } else {
                stats.files += 1;
                stats.bytes += entry.metadata()?.len();
            }
        }
        Ok(stats)
    }
}
