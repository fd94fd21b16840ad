//! Centralized name derivation for exported files and generated paths.
//!
//! Two different conventions are in play:
//!
//! - **Download names** keep the event text mostly intact: lower-cased, with
//!   every whitespace character replaced by a dash. `"Qawali Competition"`
//!   becomes `muhimmath-result-qawali-competition.png`. Punctuation and
//!   non-ASCII letters pass through untouched so Malayalam event names still
//!   produce a recognizable file.
//! - **Path segments** are used for directories inside the generated site and
//!   must be safe in URLs on every filesystem: only ASCII alphanumerics
//!   survive, runs of anything else collapse into one dash.

use crate::types::Program;

/// Prefix shared by every exported poster file.
pub const POSTER_FILE_PREFIX: &str = "muhimmath-result-";

/// Event slug used in download filenames.
///
/// Each whitespace character maps to one dash; nothing is collapsed or trimmed.
pub fn event_slug(event: &str) -> String {
    event
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Download filename for a poster of the given event.
pub fn poster_filename(event: &str) -> String {
    format!("{}{}.png", POSTER_FILE_PREFIX, event_slug(event))
}

/// Filename for writing a poster straight to disk.
///
/// Same as [`poster_filename`] except path separators become dashes, so the
/// result is always a single component inside the target directory.
pub fn poster_file_on_disk(event: &str) -> String {
    poster_filename(event)
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect()
}

/// URL/filesystem-safe segment: lowercase ASCII alphanumerics joined by single dashes.
///
/// Returns `"x"` when nothing usable remains (e.g. an all-Malayalam name), so
/// callers always get a non-empty segment.
pub fn path_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push('x');
    }
    out
}

/// Directory name for one program's poster set.
///
/// `index` disambiguates programs whose names reduce to the same segments
/// (it is the program's position in the sorted program list).
pub fn program_dir(index: usize, program: &Program) -> String {
    format!(
        "{:03}-{}--{}",
        index + 1,
        path_segment(&program.event),
        path_segment(&program.category)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poster_filename_from_two_word_event() {
        assert_eq!(
            poster_filename("Qawali Competition"),
            "muhimmath-result-qawali-competition.png"
        );
    }

    #[test]
    fn event_slug_replaces_every_whitespace_char() {
        assert_eq!(event_slug("Risala  Quiz"), "risala--quiz");
        assert_eq!(event_slug("Mala\tPattu"), "mala-pattu");
    }

    #[test]
    fn event_slug_keeps_punctuation_and_non_ascii() {
        assert_eq!(event_slug("Speech (Eng)"), "speech-(eng)");
        assert_eq!(event_slug("മദ്ഹ് ഗാനം"), "മദ്ഹ്-ഗാനം");
    }

    #[test]
    fn disk_filename_has_no_path_separators() {
        assert_eq!(
            poster_file_on_disk("Song/../..\\Escape"),
            "muhimmath-result-song-..-..-escape.png"
        );
        assert_eq!(
            poster_file_on_disk("Qawali Competition"),
            poster_filename("Qawali Competition")
        );
    }

    #[test]
    fn path_segment_collapses_separators() {
        assert_eq!(path_segment("Speech (English) / Senior"), "speech-english-senior");
        assert_eq!(path_segment("  Qawali  "), "qawali");
    }

    #[test]
    fn path_segment_never_empty() {
        assert_eq!(path_segment("ഗാനം"), "x");
        assert_eq!(path_segment(""), "x");
    }

    #[test]
    fn program_dir_is_numbered() {
        let p = Program::new("Qawali", "General");
        assert_eq!(program_dir(0, &p), "001-qawali--general");
        assert_eq!(program_dir(11, &p), "012-qawali--general");
    }
}
