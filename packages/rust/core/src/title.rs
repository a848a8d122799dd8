//! Display titles for manual documents and directories.
//!
//! A document's title is its leading `#` heading when the first non-blank
//! line is one; otherwise it is derived from the file name with a loose
//! APA-style title case.

use std::path::Path;

use doku_shared::Result;

use crate::fsops;

/// Short words that are still capitalized.
const ALWAYS_CAPITALIZED: &[&str] = &["i", "we", "you", "he", "she", "our", "him", "her", "his"];

/// Words rendered in all caps.
const ALL_CAPS: &[&str] = &["http", "url", "api", "ui", "faq"];

/// Words shorter than this stay lowercase unless listed above.
const MIN_CAPITALIZED_LEN: usize = 4;

/// Title for a document on disk: first heading, else title-cased file stem.
///
/// Pages that are not valid UTF-8 are decoded lossily.
pub fn document_title(path: &Path) -> Result<String> {
    let text = fsops::read_text_lossy(path)?;
    if let Some(heading) = first_heading(&text) {
        return Ok(heading.to_string());
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(title_case(&stem))
}

/// Text of the heading on the first non-blank line, if that line is a heading.
pub fn first_heading(text: &str) -> Option<&str> {
    let line = text.lines().find(|line| !line.trim().is_empty())?;
    let heading = line.strip_prefix('#')?;
    let title = heading.trim_start_matches('#').trim();
    (!title.is_empty()).then_some(title)
}

/// Convert a file or directory name into a display title.
///
/// - single `-` and `_` become spaces, runs of `-` collapse to one `-`
/// - the first word is always capitalized
/// - later words shorter than four letters stay lowercase, except pronouns
/// - a few acronyms are upper-cased
///
/// `getting-started` → "Getting Started", `how-to-use-the-api` → "How to use the API".
pub fn title_case(name: &str) -> String {
    let spaced = normalize_separators(&name.to_lowercase());

    let words: Vec<&str> = spaced.split(' ').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return name.to_string();
    }

    words
        .iter()
        .enumerate()
        .map(|(i, word)| format_word(word, i == 0))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_word(word: &str, first: bool) -> String {
    if ALL_CAPS.contains(&word) {
        return word.to_uppercase();
    }

    if !first && !ALWAYS_CAPITALIZED.contains(&word) && word.chars().count() < MIN_CAPITALIZED_LEN {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(c) => {
            let upper: String = c.to_uppercase().collect();
            format!("{upper}{}", chars.as_str())
        }
        None => String::new(),
    }
}

/// Single separators become spaces; a run of hyphens collapses to one literal hyphen.
fn normalize_separators(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '_' => {
                out.push(' ');
                i += 1;
            }
            '-' => {
                let run = chars[i..].iter().take_while(|&&c| c == '-').count();
                out.push(if run == 1 { ' ' } else { '-' });
                i += run;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}
