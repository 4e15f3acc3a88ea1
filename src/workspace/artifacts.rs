//! Retrieval of produced artifacts.
//!
//! Clients rarely know where an operation put its output; they know the file
//! name. [`ArtifactStore::find_best`] searches the whole workspace for that
//! name and prefers what lives under `output/`, newest first.
//! [`ArtifactStore::zip_all`] bundles everything for a one-shot download.

use crate::error::{Result, WorkbenchError};
use crate::workspace::layout::LayoutPaths;
use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempPath;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Number of unchosen candidates named in a [`BestMatch::note`].
const MAX_NOTED: usize = 5;

/// Result of [`ArtifactStore::find_best`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMatch {
    pub path: PathBuf,
    /// Other files with the same name that were not chosen.
    pub others: Vec<PathBuf>,
}

impl BestMatch {
    /// Human-readable note naming the unchosen candidates relative to
    /// `root`, or `None` when the match was unique.
    pub fn note(&self, root: &Path, name: &str) -> Option<String> {
        if self.others.is_empty() {
            return None;
        }
        let rels: Vec<String> = self
            .others
            .iter()
            .take(MAX_NOTED)
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap_or(p)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        let more = if self.others.len() > MAX_NOTED { " ..." } else { "" };
        Some(format!(
            "Multiple matches for {name}; returning most recent from preference set. \
             Other candidates: {}{more}",
            rels.join(", ")
        ))
    }
}

/// Read-side view over one workspace's files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: LayoutPaths,
}

impl ArtifactStore {
    pub fn new(layout: LayoutPaths) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &LayoutPaths {
        &self.layout
    }

    /// Every file named exactly `name` (case-sensitive) anywhere in the
    /// workspace, including overridden input/output roots. Sorted.
    pub fn find_by_basename(&self, name: &str) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for root in self.search_roots() {
            walk_files(root, &mut |path: &Path| {
                if path.file_name().is_some_and(|n| n == name) {
                    found.push(path.to_path_buf());
                }
            })?;
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Choose among same-named candidates.
    ///
    /// Candidates under the output root win over the rest; within the
    /// winning group the newest modification time wins, and equal times go
    /// to the last path in sorted order.
    pub fn pick_best(&self, mut candidates: Vec<PathBuf>) -> Result<Option<BestMatch>> {
        if candidates.is_empty() {
            return Ok(None);
        }
        candidates.sort();

        let preferred: Vec<&PathBuf> = candidates
            .iter()
            .filter(|c| c.starts_with(&self.layout.output))
            .collect();
        let pool: Vec<&PathBuf> = if preferred.is_empty() {
            candidates.iter().collect()
        } else {
            preferred
        };

        let mut timed = Vec::with_capacity(pool.len());
        for path in pool {
            timed.push((modified(path)?, path));
        }
        // Stable sort keeps path order among equal mtimes.
        timed.sort_by_key(|(mtime, _)| *mtime);
        let best = match timed.last() {
            Some((_, path)) => (*path).clone(),
            None => return Ok(None),
        };

        let others = candidates.into_iter().filter(|c| *c != best).collect();
        Ok(Some(BestMatch { path: best, others }))
    }

    /// [`find_by_basename`](Self::find_by_basename) then
    /// [`pick_best`](Self::pick_best); no match is `NotFound`.
    pub fn find_best(&self, name: &str) -> Result<BestMatch> {
        let candidates = self.find_by_basename(name)?;
        debug!(name, count = candidates.len(), "Artifact candidates");
        self.pick_best(candidates)?.ok_or_else(|| {
            WorkbenchError::not_found(
                "artifact",
                format!("no file named '{name}' in the workspace"),
            )
        })
    }

    /// Serve a file by its path relative to the workspace base.
    ///
    /// Absolute paths, `..` components and symlinks leading outside the base
    /// are all reported as `NotFound`.
    pub fn open_relative(&self, rel: &str) -> Result<PathBuf> {
        let not_found = || WorkbenchError::not_found("artifact", format!("'{rel}'"));

        let rel_path = Path::new(rel);
        if rel.is_empty()
            || rel_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(not_found());
        }

        let full = self.layout.base.join(rel_path);
        if !full.is_file() {
            return Err(not_found());
        }
        match (self.layout.base.canonicalize(), full.canonicalize()) {
            (Ok(base), Ok(real)) if real.starts_with(&base) => Ok(full),
            _ => Err(not_found()),
        }
    }

    /// Bundle the workspace into a zip under `temp/`.
    ///
    /// Archives the output root when it holds at least one file, otherwise
    /// the whole base (minus `temp/`). Every call creates its own
    /// `download_<UTC timestamp>_<random>.zip`, so concurrent calls never
    /// share a file. The archive is deleted when the returned [`TempPath`]
    /// is dropped; call [`TempPath::keep`] to retain it.
    pub fn zip_all(&self) -> Result<TempPath> {
        let output_has_files = has_any_file(&self.layout.output)?;
        let source = if output_has_files {
            &self.layout.output
        } else {
            &self.layout.base
        };

        let prefix = format!("download_{}_", Utc::now().format("%Y%m%dT%H%M%SZ"));
        let tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".zip")
            .tempfile_in(&self.layout.temp)
            .map_err(|e| WorkbenchError::io(&self.layout.temp, e))?;
        let dest = tmp.path().to_path_buf();

        let archive_err = |detail: String| WorkbenchError::Archive {
            path: dest.clone(),
            detail,
        };

        let mut zip = ZipWriter::new(tmp);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entries = Vec::new();
        let skip = (!output_has_files).then_some(self.layout.temp.as_path());
        collect_entries(source, source, skip, &mut entries)?;

        let mut files = 0usize;
        for (rel, path, is_dir) in &entries {
            if *is_dir {
                zip.add_directory(rel.as_str(), options)
                    .map_err(|e| archive_err(e.to_string()))?;
                continue;
            }
            zip.start_file(rel.as_str(), options)
                .map_err(|e| archive_err(e.to_string()))?;
            let mut src = File::open(path).map_err(|e| WorkbenchError::io(path, e))?;
            io::copy(&mut src, &mut zip).map_err(|e| archive_err(e.to_string()))?;
            files += 1;
        }

        let mut tmp = zip.finish().map_err(|e| archive_err(e.to_string()))?;
        tmp.flush().map_err(|e| archive_err(e.to_string()))?;

        info!(
            archive = %dest.display(),
            source = %source.display(),
            files,
            "Workspace archived"
        );
        Ok(tmp.into_temp_path())
    }

    fn search_roots(&self) -> Vec<&Path> {
        let base = self.layout.base.as_path();
        let mut roots = vec![base];
        for extra in [&self.layout.input, &self.layout.output] {
            if !extra.starts_with(base) {
                roots.push(extra.as_path());
            }
        }
        roots
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| WorkbenchError::io(path, e))
}

/// Depth-first walk calling `visit` for each regular file. Symlinked
/// directories are not followed; a missing root is empty.
fn walk_files(root: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(WorkbenchError::io(&dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| WorkbenchError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| WorkbenchError::io(&dir, e))?;
            let path = entry.path();
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                visit(&path);
            }
        }
    }
    Ok(())
}

fn has_any_file(root: &Path) -> Result<bool> {
    let mut any = false;
    walk_files(root, &mut |_: &Path| any = true)?;
    Ok(any)
}

/// `(relative name, path, is_dir)` for everything under `dir`, sorted, with
/// `skip` and its contents left out.
fn collect_entries(
    root: &Path,
    dir: &Path,
    skip: Option<&Path>,
    out: &mut Vec<(String, PathBuf, bool)>,
) -> Result<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| WorkbenchError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()
        .map_err(|e| WorkbenchError::io(dir, e))?;
    children.sort();

    for path in children {
        if skip.is_some_and(|s| path == s) {
            continue;
        }
        let meta = fs::symlink_metadata(&path).map_err(|e| WorkbenchError::io(&path, e))?;
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if meta.is_dir() {
            out.push((format!("{rel}/"), path.clone(), true));
            collect_entries(root, &path, skip, out)?;
        } else if meta.is_file() {
            out.push((rel, path, false));
        }
    }
    Ok(())
}
