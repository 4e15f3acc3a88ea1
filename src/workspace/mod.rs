//! One sandboxed directory tree and the rules for reading and writing it.
//!
//! ## Modules
//!
//! | Module | Responsibility |
//! |--------|---------------|
//! | [`layout`] | Named directories, created on demand |
//! | [`resolve`] | Selector → one input PDF |
//! | [`naming`] | Deterministic artifact names, page joining |
//! | [`artifacts`] | Find-by-name, best match, zip-all |

pub mod artifacts;
pub mod layout;
pub mod naming;
pub mod resolve;

pub use artifacts::{ArtifactStore, BestMatch};
pub use layout::LayoutPaths;
pub use resolve::PathResolver;

use crate::error::{Result, WorkbenchError};
use std::path::{Path, PathBuf};

/// A ready-to-use workspace: its layout exists on disk.
#[derive(Debug, Clone)]
pub struct Workspace {
    layout: LayoutPaths,
    resolver: PathResolver,
}

impl Workspace {
    /// Create (or reopen) the workspace rooted at `base`.
    pub fn open(
        base: impl Into<PathBuf>,
        input_override: Option<&Path>,
        output_override: Option<&Path>,
    ) -> Result<Self> {
        let layout = LayoutPaths::ensure(base, input_override, output_override)?;
        let resolver = PathResolver::new(&layout.input);
        Ok(Self { layout, resolver })
    }

    /// Reopen an existing workspace without creating anything.
    ///
    /// A missing base directory is an `Io` error, so a tree deleted from
    /// under a caller is never silently brought back.
    pub fn attach(
        base: impl Into<PathBuf>,
        input_override: Option<&Path>,
        output_override: Option<&Path>,
    ) -> Result<Self> {
        let layout = LayoutPaths::compute(base, input_override, output_override);
        std::fs::metadata(&layout.base).map_err(|e| WorkbenchError::io(&layout.base, e))?;
        let resolver = PathResolver::new(&layout.input);
        Ok(Self { layout, resolver })
    }

    /// Restrict input resolution to files under the base directory.
    pub fn confined(mut self) -> Self {
        self.resolver = self.resolver.confined_to(&self.layout.base);
        self
    }

    pub fn layout(&self) -> &LayoutPaths {
        &self.layout
    }

    pub fn base(&self) -> &Path {
        &self.layout.base
    }

    pub fn resolve_input(&self, selector: Option<&str>) -> Result<PathBuf> {
        self.resolver.resolve(selector)
    }

    pub fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(self.layout.clone())
    }
}
