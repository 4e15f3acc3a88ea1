//! Operation-level tests: real PDF surgery with lopdf, fake OCR and
//! Markdown collaborators, no network.

mod common;

use common::*;
use pdf_workbench::{
    Collaborators, ErrorKind, MarkdownRequest, MemorySessionStore, MergeRequest, OcrRequest,
    OutputMode, PageProgress, PageSelection, SessionConfig, SessionStore, SplitRequest,
    TextOutput, Toolkit, WorkbenchError, Workspace,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn split(toolkit: &Toolkit, selector: &str, selection: PageSelection, combined: bool) -> Vec<std::path::PathBuf> {
    toolkit
        .split_pages(&SplitRequest {
            selector: Some(selector.into()),
            selection,
            combined,
        })
        .unwrap()
}

// ── Split ────────────────────────────────────────────────────────────────────

#[test]
fn split_range_combined() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 10, "a");

    let out = split(&kit, "a.pdf", PageSelection::parse_range("3-5").unwrap(), true);

    assert_eq!(out, vec![kit.workspace().layout().splits.join("a_pages_0003-0005.pdf")]);
    assert_eq!(page_texts(&out[0]), vec!["a page 3", "a page 4", "a page 5"]);
}

#[test]
fn split_explicit_pages_combined_sorts_and_names_the_selection() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 20, "a");

    let out = split(&kit, "a.pdf", PageSelection::Pages(vec![15, 2, 11, 7, 7]), true);

    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].file_name().unwrap().to_string_lossy(),
        "a_pages_sel_02_07_11_15.pdf"
    );
    assert_eq!(page_count(&out[0]), 4);
    assert_eq!(
        page_texts(&out[0]),
        vec!["a page 2", "a page 7", "a page 11", "a page 15"]
    );
}

#[test]
fn split_without_selection_gives_one_file_per_page() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "doc.pdf", 3, "doc");

    let out = split(&kit, "doc.pdf", PageSelection::All, false);

    let names: Vec<String> = out
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["doc_p0001.pdf", "doc_p0002.pdf", "doc_p0003.pdf"]);
    for (i, path) in out.iter().enumerate() {
        assert_eq!(page_texts(path), vec![format!("doc page {}", i + 1)]);
    }
}

#[test]
fn split_drops_out_of_range_pages_and_rejects_an_empty_result() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 4, "a");

    let out = split(&kit, "a.pdf", PageSelection::Pages(vec![0, 2, 9]), false);
    assert_eq!(out.len(), 1);
    assert!(out[0].ends_with("a_p0002.pdf"));

    let err = kit
        .split_pages(&SplitRequest {
            selector: Some("a.pdf".into()),
            selection: PageSelection::Pages(vec![7, 8]),
            combined: true,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSelection);
}

#[test]
fn repeated_split_overwrites_instead_of_accumulating() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 6, "a");

    let first = split(&kit, "a.pdf", PageSelection::parse_range("2-4").unwrap(), true);
    let second = split(&kit, "a.pdf", PageSelection::parse_range("2-4").unwrap(), true);

    assert_eq!(first, second);
    let files = std::fs::read_dir(&kit.workspace().layout().splits).unwrap().count();
    assert_eq!(files, 1);
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[test]
fn merge_concatenates_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    let input = &kit.workspace().layout().input;
    write_pdf(input, "a.pdf", 2, "a");
    write_pdf(input, "b.pdf", 3, "b");

    let out = kit
        .merge_pdfs(&MergeRequest {
            files: vec!["b.pdf".into(), "a.pdf".into()],
            out_name: Some("final.pdf".into()),
        })
        .unwrap();

    assert_eq!(out, kit.workspace().layout().merged.join("final.pdf"));
    assert_eq!(page_count(&out), 5);
    assert_eq!(
        page_texts(&out),
        vec!["b page 1", "b page 2", "b page 3", "a page 1", "a page 2"]
    );
}

#[test]
fn split_then_merge_round_trips_the_document() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    let src = write_pdf(&kit.workspace().layout().input, "r.pdf", 4, "r");

    let parts = split(&kit, "r.pdf", PageSelection::All, false);
    let files: Vec<String> = parts.iter().map(|p| p.display().to_string()).collect();
    let merged = kit
        .merge_pdfs(&MergeRequest { files, out_name: None })
        .unwrap();

    assert!(merged.ends_with("merged.pdf"));
    assert_eq!(page_texts(&merged), page_texts(&src));
}

#[test]
fn merge_reports_the_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 1, "a");

    let err = kit
        .merge_pdfs(&MergeRequest {
            files: vec!["a.pdf".into(), "ghost.pdf".into()],
            out_name: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("ghost.pdf"));
    assert!(!kit.workspace().layout().merged.join("merged.pdf").exists());
}

#[test]
fn merge_rejects_path_like_output_names() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 1, "a");

    let err = kit
        .merge_pdfs(&MergeRequest {
            files: vec!["a.pdf".into()],
            out_name: Some("../escape.pdf".into()),
        })
        .unwrap_err();
    assert!(matches!(err, WorkbenchError::InvalidName { .. }));

    let err = kit.merge_pdfs(&MergeRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSelection);
}

// ── OCR ──────────────────────────────────────────────────────────────────────

#[test]
fn ocr_full_joins_pages_with_markers() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "scan.pdf", 2, "scan");

    let out = kit.ocr_pdf(&OcrRequest::default()).unwrap();

    let expected = "--------- Page 1 ---------\ntext of page 1\nsecond line\n\n\
                    --------- Page 2 ---------\ntext of page 2\nsecond line";
    match out {
        TextOutput::Full { text, file_path } => {
            assert_eq!(text, expected);
            assert_eq!(file_path, kit.workspace().layout().ocr.join("scan.ocr.txt"));
            assert_eq!(std::fs::read_to_string(file_path).unwrap(), expected);
        }
        other => panic!("expected full output, got {other:?}"),
    }
}

#[test]
fn ocr_pages_writes_one_file_per_page() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "scan.pdf", 3, "scan");

    let out = kit
        .ocr_pdf(&OcrRequest {
            selector: Some("scan.pdf".into()),
            preprocess: false,
            output: OutputMode::Pages,
            out_name: None,
        })
        .unwrap();

    let TextOutput::Pages { pages, file_paths } = out else {
        panic!("expected pages output");
    };
    assert_eq!(pages[1], "text of page 2\nsecond line");
    assert_eq!(file_paths.len(), 3);
    assert!(file_paths[2].ends_with("scan_p0003.ocr.txt"));
    assert_eq!(std::fs::read_to_string(&file_paths[0]).unwrap(), pages[0]);
}

#[test]
fn ocr_out_name_overrides_the_full_artifact_name() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "scan.pdf", 1, "scan");

    let out = kit
        .ocr_pdf(&OcrRequest {
            out_name: Some("notes.txt".into()),
            ..OcrRequest::default()
        })
        .unwrap();
    assert_eq!(out.paths(), vec![kit.workspace().layout().ocr.join("notes.txt").as_path()]);
}

#[test]
fn ocr_needs_a_selector_when_input_is_ambiguous() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());

    let err = kit.ocr_pdf(&OcrRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let input = &kit.workspace().layout().input;
    write_pdf(input, "a.pdf", 1, "a");
    write_pdf(input, "b.pdf", 1, "b");
    let err = kit.ocr_pdf(&OcrRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ambiguous);
    assert!(err.to_string().contains("a.pdf, b.pdf"));
}

#[test]
fn ocr_surfaces_collaborator_failures_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = Workspace::open(tmp.path(), None, None).unwrap();
    write_pdf(&workspace.layout().input, "a.pdf", 1, "a");
    let collaborators = Collaborators {
        ocr: Arc::new(FailingOcr),
        ..fake_collaborators()
    };
    let kit = Toolkit::new(workspace, collaborators, test_config());

    let err = kit.ocr_pdf(&OcrRequest::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("HTTP 503"));
    assert!(!kit.workspace().layout().ocr.join("a.ocr.txt").exists());
}

// ── Markdown ─────────────────────────────────────────────────────────────────

#[test]
fn markdown_converts_page_by_page_and_cleans_up_temporaries() {
    let tmp = tempfile::tempdir().unwrap();
    let workspace = Workspace::open(tmp.path(), None, None).unwrap();
    write_pdf(&workspace.layout().input, "paper.pdf", 2, "paper");
    let converter = Arc::new(HeadingMarkdown::default());
    let collaborators = Collaborators {
        markdown: converter.clone(),
        ..fake_collaborators()
    };
    let kit = Toolkit::new(workspace, collaborators, test_config());

    let out = kit
        .pdf_to_markdown(&MarkdownRequest {
            force_ocr: true,
            ..MarkdownRequest::default()
        })
        .unwrap();

    let TextOutput::Full { text, file_path } = out else {
        panic!("expected full output");
    };
    assert_eq!(
        text,
        "--------- Page 1 ---------\n\n# paper page 1\n\n--------- Page 2 ---------\n\n# paper page 2"
    );
    assert!(file_path.ends_with("output/markdown/paper.md"));

    let seen = converter.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.ends_with("temp/paper_tmp_p0001.pdf"));
    assert!(seen.iter().all(|(_, force)| *force));
    assert!(seen.iter().all(|(p, _)| !p.exists()));
}

#[test]
fn markdown_pages_mode() {
    let tmp = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    write_pdf(&kit.workspace().layout().input, "paper.pdf", 2, "paper");

    let out = kit
        .pdf_to_markdown(&MarkdownRequest {
            selector: Some("paper.pdf".into()),
            output: OutputMode::Pages,
            ..MarkdownRequest::default()
        })
        .unwrap();

    let TextOutput::Pages { pages, file_paths } = out else {
        panic!("expected pages output");
    };
    assert_eq!(pages, vec!["# paper page 1", "# paper page 2"]);
    assert!(file_paths[1].ends_with("paper_p0002.md"));
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    started: Mutex<Vec<(String, usize)>>,
    pages: AtomicUsize,
}

impl PageProgress for Recorder {
    fn on_start(&self, operation: &str, total_pages: usize) {
        self.started
            .lock()
            .unwrap()
            .push((operation.to_string(), total_pages));
    }

    fn on_page_done(&self, _page_num: u32, _total_pages: usize, _output_len: usize) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn progress_reports_every_page() {
    let tmp = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let kit = toolkit_at(tmp.path()).with_progress(recorder.clone());
    write_pdf(&kit.workspace().layout().input, "a.pdf", 3, "a");

    kit.ocr_pdf(&OcrRequest::default()).unwrap();
    kit.pdf_to_markdown(&MarkdownRequest::default()).unwrap();

    assert_eq!(
        *recorder.started.lock().unwrap(),
        vec![("ocr".to_string(), 3), ("markdown".to_string(), 3)]
    );
    assert_eq!(recorder.pages.load(Ordering::SeqCst), 6);
}

// ── Ingest ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_copies_pdfs_and_skips_everything_else() {
    let tmp = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    let input = kit.workspace().layout().input.clone();

    let external = write_pdf(outside.path(), "ext.pdf", 1, "ext");
    let notes = outside.path().join("notes.txt");
    std::fs::write(&notes, "not a pdf").unwrap();
    let resident = write_pdf(&input, "already.pdf", 1, "already");

    let sources = vec![
        external.display().to_string(),
        notes.display().to_string(),
        outside.path().join("missing.pdf").display().to_string(),
        resident.display().to_string(),
    ];
    let ingested = kit.ingest(&sources).await.unwrap();

    assert_eq!(ingested, vec![input.join("ext.pdf"), resident]);
    assert!(input.join("ext.pdf").is_file());
    assert!(!input.join("notes.txt").exists());
}

#[test]
fn ingest_matches_extension_case_insensitively() {
    let tmp = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let kit = toolkit_at(tmp.path());
    let shouting = write_pdf(outside.path(), "SCAN.PDF", 2, "scan");

    let ingested = tokio_test::block_on(kit.ingest(&[shouting.display().to_string()])).unwrap();

    assert_eq!(ingested, vec![kit.workspace().layout().input.join("SCAN.PDF")]);
    assert_eq!(page_count(&ingested[0]), 2);
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[test]
fn destroyed_session_is_gone() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MemorySessionStore::new(tmp.path());
    let session = store.create(SessionConfig::default()).unwrap();
    let workspace = session.workspace().unwrap();
    write_pdf(&workspace.layout().input, "a.pdf", 1, "a");

    assert!(store.destroy(&session.id).unwrap());
    assert_eq!(store.get(&session.id).unwrap_err().kind(), ErrorKind::NotFound);
    assert!(!session.base_dir.exists());
}

#[test]
fn session_workspaces_are_isolated() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MemorySessionStore::new(tmp.path());
    let a = store.create(SessionConfig::default()).unwrap();
    let b = store.create(SessionConfig::default()).unwrap();

    let ws_a = a.workspace().unwrap();
    let ws_b = b.workspace().unwrap();
    let in_a = write_pdf(&ws_a.layout().input, "secret.pdf", 1, "secret");

    // A literal path into another session resolves to nothing.
    let err = ws_b
        .resolve_input(Some(&in_a.display().to_string()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(ws_a.resolve_input(None).unwrap(), in_a);
}
