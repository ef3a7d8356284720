//! Slide file naming and path-safety rules.

/// Longest accepted session id.
pub const MAX_SESSION_ID_LEN: usize = 64;

const SLIDE_PREFIX: &str = "slide-";
const SLIDE_SUFFIX: &str = ".png";

/// File name of the 1-based slide `n`, zero-padded to at least two digits.
pub fn slide_file_name(n: u32) -> String {
    format!("{SLIDE_PREFIX}{n:02}{SLIDE_SUFFIX}")
}

/// Slide number from a `slide-<digits>.png` name.
///
/// Any digit width is accepted so raw rasterizer output (`slide-1.png`,
/// `slide-001.png`) parses too. Slide 0 does not exist.
pub fn parse_slide_file_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(SLIDE_PREFIX)?.strip_suffix(SLIDE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n >= 1)
}

/// Whether `id` can be used as a single path component.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Whether an upload name carries a `.pdf` extension, in any case.
pub fn is_pdf_name(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Reduce an uploaded file name to something safe to stage on disk.
pub fn sanitize_upload_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload.pdf".to_owned()
    } else {
        trimmed.to_owned()
    }
}
