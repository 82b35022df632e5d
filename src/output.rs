//! Atomic publication of generated source trees.
//!
//! Every tree of a run is first written to a staging directory next to its
//! destination. Destinations are only replaced once all trees are staged,
//! so a failed run never leaves a half-written tree behind.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::emit::{Dialect, SourceTree};
use crate::error::{GenError, GenResult};

/// Where each dialect's tree lands: `<root>/<dialect dir>/<model name>/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub vhdl_dir: String,
    pub sv_dir: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            vhdl_dir: "VHDL".to_string(),
            sv_dir: "sv".to_string(),
        }
    }
}

impl OutputLayout {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn tree_dir(&self, dialect: Dialect, model_name: &str) -> PathBuf {
        let dir = match dialect {
            Dialect::Vhdl => &self.vhdl_dir,
            Dialect::SystemVerilog => &self.sv_dir,
        };
        self.root.join(dir).join(model_name)
    }
}

struct Staged {
    dir: TempDir,
    dest: PathBuf,
}

struct Published {
    dest: PathBuf,
    /// Holds the tree that `dest` replaced until the run commits.
    previous: Option<TempDir>,
}

/// Write `trees` under `layout` and return the published directories.
pub fn publish(layout: &OutputLayout, trees: &[SourceTree]) -> GenResult<Vec<PathBuf>> {
    check_destinations(layout, trees)?;
    let mut staged = Vec::with_capacity(trees.len());
    for tree in trees {
        staged.push(stage(layout, tree)?);
    }

    let mut published: Vec<Published> = Vec::with_capacity(staged.len());
    for entry in staged {
        match swap_in(entry) {
            Ok(p) => published.push(p),
            Err(e) => {
                roll_back(published);
                return Err(e);
            }
        }
    }

    let dirs = published.iter().map(|p| p.dest.clone()).collect();
    // Dropping `previous` deletes the replaced trees.
    drop(published);
    Ok(dirs)
}

/// Two trees sharing a destination would replace each other.
fn check_destinations(layout: &OutputLayout, trees: &[SourceTree]) -> GenResult<()> {
    let mut seen: Vec<(PathBuf, Dialect)> = Vec::with_capacity(trees.len());
    for tree in trees {
        let dest = layout.tree_dir(tree.dialect, &tree.model_name);
        if let Some((_, other)) = seen.iter().find(|(d, _)| *d == dest) {
            return Err(GenError::Config(format!(
                "{} and {} trees would both be written to {}",
                other,
                tree.dialect,
                dest.display()
            )));
        }
        seen.push((dest, tree.dialect));
    }
    Ok(())
}

fn stage(layout: &OutputLayout, tree: &SourceTree) -> GenResult<Staged> {
    let dest = layout.tree_dir(tree.dialect, &tree.model_name);
    let parent = parent_of(&dest);
    fs::create_dir_all(parent).map_err(|e| GenError::io(parent, e))?;
    let dir = tempfile::Builder::new()
        .prefix(".lutgen-stage-")
        .tempdir_in(parent)
        .map_err(|e| GenError::io(parent, e))?;
    for file in &tree.files {
        let path = dir.path().join(&file.name);
        fs::write(&path, &file.contents).map_err(|e| GenError::io(&path, e))?;
    }
    tracing::debug!(
        dialect = %tree.dialect,
        files = tree.files.len(),
        "staged {}",
        dir.path().display()
    );
    Ok(Staged { dir, dest })
}

fn swap_in(entry: Staged) -> GenResult<Published> {
    let Staged { dir, dest } = entry;
    let parent = parent_of(&dest);

    let previous = if dest.exists() {
        let holder = tempfile::Builder::new()
            .prefix(".lutgen-old-")
            .tempdir_in(parent)
            .map_err(|e| GenError::io(parent, e))?;
        fs::rename(&dest, holder.path().join("tree")).map_err(|e| GenError::io(&dest, e))?;
        Some(holder)
    } else {
        None
    };

    if let Err(e) = fs::rename(dir.path(), &dest) {
        if let Some(holder) = previous {
            restore(holder, &dest);
        }
        return Err(GenError::io(&dest, e));
    }
    Ok(Published { dest, previous })
}

fn roll_back(published: Vec<Published>) {
    for p in published.into_iter().rev() {
        if let Err(e) = fs::remove_dir_all(&p.dest) {
            tracing::error!("could not remove {}: {}", p.dest.display(), e);
        }
        if let Some(holder) = p.previous {
            restore(holder, &p.dest);
        }
        tracing::warn!("rolled back {}", p.dest.display());
    }
}

/// Move a replaced tree back to `dest`. If that fails the holder is left
/// on disk so the old tree is not lost.
fn restore(holder: TempDir, dest: &Path) {
    let tree = holder.path().join("tree");
    if let Err(e) = fs::rename(&tree, dest) {
        tracing::error!(
            "could not restore {}: {}; previous tree kept at {}",
            dest.display(),
            e,
            tree.display()
        );
        std::mem::forget(holder);
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}
