//! Page-level PDF surgery with lopdf.
//!
//! ## Why lopdf and not pdfium here?
//!
//! Splitting and merging move page objects between documents without
//! touching their content streams. lopdf works on the object graph directly,
//! keeps fonts and images byte-for-byte, and needs no native library, so the
//! split/merge path works even where pdfium is unavailable.

use crate::error::{Result, WorkbenchError};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

const COLLABORATOR: &str = "PDF library";

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

pub fn load(path: &Path) -> Result<Document> {
    Document::load(path)
        .map_err(|e| WorkbenchError::upstream(COLLABORATOR, format!("{}: {e}", path.display())))
}

pub fn page_count(path: &Path) -> Result<u32> {
    Ok(load(path)?.get_pages().len() as u32)
}

/// Write the given 1-based pages of `doc`, in document order, to `dest`.
pub fn extract_pages(doc: &Document, pages: &[u32], dest: &Path) -> Result<()> {
    let keep: BTreeSet<u32> = pages.iter().copied().collect();
    let mut out = doc.clone();
    let drop: Vec<u32> = out
        .get_pages()
        .keys()
        .copied()
        .filter(|p| !keep.contains(p))
        .collect();

    out.delete_pages(&drop);
    out.prune_objects();
    out.renumber_objects();
    out.compress();
    save_atomic(&mut out, dest)?;
    debug!(dest = %dest.display(), pages = keep.len(), "Extracted pages");
    Ok(())
}

/// Concatenate whole documents, in the order given, into `dest`.
///
/// Returns the page count of the result.
pub fn merge(sources: &[PathBuf], dest: &Path) -> Result<u32> {
    let mut max_id = 1;
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for path in sources {
        let mut doc = load(path)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // Page order comes from the page tree, not from object ids.
        for page_id in doc.get_pages().into_values() {
            pages.push((page_id, flattened_page(&doc, page_id)?));
        }
        objects.extend(doc.objects);
    }

    if pages.is_empty() {
        return Err(WorkbenchError::upstream(
            COLLABORATOR,
            "merge inputs contain no pages",
        ));
    }

    // Every old catalog and page-tree node is replaced by one fresh pair.
    objects.retain(|_, obj| {
        !(type_is(obj, b"Catalog")
            || type_is(obj, b"Pages")
            || type_is(obj, b"Outlines")
            || type_is(obj, b"Outline"))
    });

    let pages_id = (max_id, 0);
    let catalog_id = (max_id + 1, 0);

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = pages.len() as u32;
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        objects.insert(id, Object::Dictionary(page));
    }
    objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(count),
        }),
    );
    objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );

    let mut out = Document::with_version("1.5");
    out.objects = objects;
    out.max_id = max_id + 1;
    out.trailer.set("Root", catalog_id);
    out.renumber_objects();
    out.compress();
    save_atomic(&mut out, dest)?;

    debug!(dest = %dest.display(), sources = sources.len(), pages = count, "Merged PDFs");
    Ok(count)
}

/// Embedded text of one 1-based page, trimmed. A page whose text cannot be
/// decoded has no usable text layer and yields an empty string.
pub fn text_layer(path: &Path, page: u32) -> Result<String> {
    let doc = load(path)?;
    match doc.extract_text(&[page]) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(e) => {
            debug!(path = %path.display(), page, error = %e, "No usable text layer");
            Ok(String::new())
        }
    }
}

/// Page dictionary with inherited attributes copied down from its ancestors,
/// so the page survives being re-parented.
fn flattened_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| WorkbenchError::upstream(COLLABORATOR, format!("page {page_id:?}: {e}")))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        depth += 1;
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        if depth > 64 {
            break;
        }
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(page)
}

fn type_is(obj: &Object, name: &[u8]) -> bool {
    obj.as_dict()
        .ok()
        .and_then(|d| d.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
        == Some(name)
}

/// Serialize next to `dest`, then rename over it, so readers never see a
/// half-written PDF.
fn save_atomic(doc: &mut Document, dest: &Path) -> Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| WorkbenchError::io(dir, e))?;
    doc.save_to(&mut tmp)
        .map_err(|e| WorkbenchError::upstream(COLLABORATOR, format!("{}: {e}", dest.display())))?;
    tmp.persist(dest)
        .map_err(|e| WorkbenchError::io(dest, e.error))?;
    Ok(())
}

/// Synthetic PDFs for unit tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::{Path, PathBuf};

    /// `n` pages, each showing "Page i"; resources and MediaBox on the root.
    pub fn sample(n: u32) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids: Vec<Object> = Vec::new();
        for i in 1..=n {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {i}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => i64::from(n),
                "Resources" => resources_id,
                "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    pub fn write_sample(dir: &Path, name: &str, n: u32) -> PathBuf {
        let path = dir.join(name);
        sample(n).save(&path).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::write_sample;
    use super::*;

    #[test]
    fn extract_keeps_selected_pages_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let src = write_sample(tmp.path(), "a.pdf", 6);
        let out = tmp.path().join("sub.pdf");
        extract_pages(&load(&src).unwrap(), &[2, 5], &out).unwrap();

        assert_eq!(page_count(&out).unwrap(), 2);
        assert!(text_layer(&out, 1).unwrap().contains("Page 2"));
        assert!(text_layer(&out, 2).unwrap().contains("Page 5"));
    }

    #[test]
    fn merge_concatenates_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_sample(tmp.path(), "a.pdf", 2);
        let b = write_sample(tmp.path(), "b.pdf", 3);
        let out = tmp.path().join("merged.pdf");

        assert_eq!(merge(&[a, b], &out).unwrap(), 5);
        assert_eq!(page_count(&out).unwrap(), 5);
        // Third page is the first page of b.
        assert!(text_layer(&out, 3).unwrap().contains("Page 1"));
        let merged = load(&out).unwrap();
        for page_id in merged.get_pages().into_values() {
            let page = merged.get_dictionary(page_id).unwrap();
            assert!(page.has(b"MediaBox"), "inherited MediaBox was lost");
        }
    }

    #[test]
    fn load_reports_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let bogus = tmp.path().join("bogus.pdf");
        std::fs::write(&bogus, b"not a pdf").unwrap();
        let err = page_count(&bogus).unwrap_err();
        assert!(err.to_string().contains("bogus.pdf"));
    }
}
