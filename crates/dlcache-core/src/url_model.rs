//! Destination filenames derived from download URLs.

/// Used when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Last non-empty path segment of `url`, sanitized for a Linux filesystem,
/// or [`DEFAULT_FILENAME`].
///
/// - `filename_for_url("http://example.com/media/clip.mp4")` → `"clip.mp4"`
/// - `filename_for_url("http://example.com/")` → `"download.bin"`
pub fn filename_for_url(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
    });

    match segment.map(|s| sanitize(&s)) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

/// Replace separators, NUL, control chars and whitespace with `_` (collapsed),
/// strip leading/trailing dots and underscores, cap at NAME_MAX bytes.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = matches!(c, '/' | '\\' | '\0') || c.is_control() || c.is_whitespace();
        if !unsafe_char {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    let mut name = out.trim_matches(|c| c == '.' || c == '_').to_string();
    if name.len() > NAME_MAX {
        let mut cut = NAME_MAX;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    name
}
