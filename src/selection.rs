//! Page selection: which 1-based pages an operation targets.
//!
//! A selection is parsed from the request first and resolved against the
//! document's page count second, because the count is only known once the
//! source PDF has been opened. Resolution always yields a sorted,
//! deduplicated, non-empty list of 1-based page numbers or an
//! [`WorkbenchError::InvalidSelection`].

use crate::error::{Result, WorkbenchError};
use std::fmt;

/// Specifies which pages of a PDF an operation works on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// Inclusive 1-based range. The end is clamped to the page count.
    Range { start: u32, end: u32 },
    /// Explicit 1-based pages, in any order, possibly repeated.
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Build a selection from the two optional request fields.
    ///
    /// A range takes precedence over a page list. An empty or absent page
    /// list with no range means all pages.
    pub fn from_parts(pages: Option<Vec<u32>>, range: Option<&str>) -> Result<Self> {
        if let Some(range) = range.filter(|r| !r.trim().is_empty()) {
            return Self::parse_range(range);
        }
        match pages {
            Some(pages) if !pages.is_empty() => Ok(PageSelection::Pages(pages)),
            _ => Ok(PageSelection::All),
        }
    }

    /// Parse `"start-end"`; whitespace anywhere is ignored.
    pub fn parse_range(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let (start, end) = compact.split_once('-').ok_or_else(|| {
            WorkbenchError::InvalidSelection(format!(
                "page range must look like \"start-end\", e.g. \"1-5\" (got '{s}')"
            ))
        })?;

        let start = parse_bound(start, s)?;
        let end = parse_bound(end, s)?;
        if start < 1 || end < 1 || start > end {
            return Err(WorkbenchError::InvalidSelection(format!(
                "invalid page range '{s}': bounds must be >= 1 and start <= end"
            )));
        }

        // A start past u32::MAX can never name a page; an end past it just
        // means "to the last page".
        let start = u32::try_from(start).map_err(|_| {
            WorkbenchError::InvalidSelection(format!(
                "invalid page range '{s}': start page {start} does not exist"
            ))
        })?;
        let end = u32::try_from(end).unwrap_or(u32::MAX);

        Ok(PageSelection::Range { start, end })
    }

    /// Parse a comma-separated page list such as `"2,7, 11"`.
    ///
    /// Negative numbers and zero are accepted here and dropped at resolution
    /// time like any other out-of-range entry.
    pub fn parse_list(s: &str) -> Result<Vec<u32>> {
        let mut pages = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let n: i64 = part.parse().map_err(|_| {
                WorkbenchError::InvalidSelection(format!("invalid page number: '{part}'"))
            })?;
            if let Ok(n) = u32::try_from(n) {
                pages.push(n);
            }
        }
        Ok(pages)
    }

    /// `true` when the selection was given as a range; drives combined naming.
    pub fn is_range(&self) -> bool {
        matches!(self, PageSelection::Range { .. })
    }

    /// Resolve into sorted, deduplicated 1-based page numbers within `1..=total`.
    pub fn resolve(&self, total: u32) -> Result<Vec<u32>> {
        let targets: Vec<u32> = match self {
            PageSelection::All => (1..=total).collect(),
            PageSelection::Range { start, end } => {
                if *start < 1 || *end < 1 || start > end {
                    return Err(WorkbenchError::InvalidSelection(format!(
                        "invalid page range {start}-{end}"
                    )));
                }
                (*start..=(*end).min(total)).collect()
            }
            PageSelection::Pages(pages) => {
                let mut pages: Vec<u32> = pages
                    .iter()
                    .copied()
                    .filter(|p| (1..=total).contains(p))
                    .collect();
                pages.sort_unstable();
                pages.dedup();
                pages
            }
        };

        if targets.is_empty() {
            return Err(WorkbenchError::InvalidSelection(format!(
                "no valid page numbers were provided ({self}; document has {total} pages)"
            )));
        }
        Ok(targets)
    }
}

fn parse_bound(bound: &str, original: &str) -> Result<i64> {
    bound.parse().map_err(|_| {
        WorkbenchError::InvalidSelection(format!(
            "invalid page range '{original}': '{bound}' is not a number"
        ))
    })
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => write!(f, "all pages"),
            PageSelection::Range { start, end } => write!(f, "pages {start}-{end}"),
            PageSelection::Pages(pages) => {
                let list: Vec<String> = pages.iter().map(u32::to_string).collect();
                write!(f, "pages [{}]", list.join(", "))
            }
        }
    }
}
