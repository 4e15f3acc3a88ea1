//! The directory tree owned by one workspace.
//!
//! ```text
//! <base>/
//!  ├─ input/            (or the input override)
//!  ├─ output/           (or the output override)
//!  │   ├─ ocr/
//!  │   ├─ markdown/
//!  │   ├─ splits/
//!  │   └─ merged/
//!  └─ temp/             (always under base)
//! ```

use crate::error::{Result, WorkbenchError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Concrete paths of a workspace. Every directory exists once
/// [`LayoutPaths::ensure`] has returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPaths {
    pub base: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub ocr: PathBuf,
    pub markdown: PathBuf,
    pub splits: PathBuf,
    pub merged: PathBuf,
    pub temp: PathBuf,
}

impl LayoutPaths {
    /// Compute the layout without touching the filesystem.
    pub fn compute(
        base: impl Into<PathBuf>,
        input_override: Option<&Path>,
        output_override: Option<&Path>,
    ) -> Self {
        let base = base.into();
        let input = input_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.join("input"));
        let output = output_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.join("output"));

        Self {
            ocr: output.join("ocr"),
            markdown: output.join("markdown"),
            splits: output.join("splits"),
            merged: output.join("merged"),
            temp: base.join("temp"),
            input,
            output,
            base,
        }
    }

    /// Compute the layout and create every directory. Idempotent.
    pub fn ensure(
        base: impl Into<PathBuf>,
        input_override: Option<&Path>,
        output_override: Option<&Path>,
    ) -> Result<Self> {
        let layout = Self::compute(base, input_override, output_override);
        for dir in layout.dirs() {
            fs::create_dir_all(dir).map_err(|e| WorkbenchError::io(dir, e))?;
        }
        debug!(base = %layout.base.display(), "Workspace layout ready");
        Ok(layout)
    }

    /// The six named directories (base itself is implied by `temp`).
    pub fn dirs(&self) -> [&Path; 6] {
        [
            &self.input,
            &self.ocr,
            &self.markdown,
            &self.splits,
            &self.merged,
            &self.temp,
        ]
    }
}
