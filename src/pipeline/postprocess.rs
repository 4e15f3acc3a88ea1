//! Deterministic cleanup of model output.
//!
//! Vision models occasionally wrap their answer in a code fence, emit CRLF,
//! pad lines, or invent image links for figures. These rules undo that
//! without touching content. The page joiner adds its own markers and
//! trimming, so results here carry no trailing newline.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cleanup for Markdown pages.
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_text(&s);
    let s = drop_placeholder_images(&s);
    collapse_blank_runs(&s)
}

/// Cleanup for plain OCR text: no Markdown-specific rules.
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    collapse_blank_runs(&normalise_text(&s))
}

// ── Fences ───────────────────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap()
});

fn strip_outer_fence(input: &str) -> String {
    let trimmed = input.trim();
    match RE_FENCE.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Line endings, trailing space, invisible characters ──────────────────

fn normalise_text(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{2060}'], "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Blank lines ──────────────────────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").trim().to_string()
}

// ── Invented images ──────────────────────────────────────────────────────

static RE_IMAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

/// A page transcription cannot reference real image files, so any image
/// link without an absolute http(s) URL becomes its alt text in italics.
fn drop_placeholder_images(input: &str) -> String {
    RE_IMAGE_LINK
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let url = caps[2].trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                return caps[0].to_string();
            }
            match caps[1].trim() {
                "" => String::new(),
                alt => format!("*{alt}*"),
            }
        })
        .into_owned()
}
