use std::path::{Path, PathBuf};

use crate::BreadcrumbPath;

/// Upper bound on a normalized segment, in characters.
pub const MAX_SEGMENT_CHARS: usize = 254;

/// Directory for a breadcrumb path: one normalized component per segment.
///
/// Normalization is lossy, so distinct paths may map to the same directory.
/// Segments that normalize to nothing are left out.
pub fn directory_for(root: &Path, breadcrumbs: &BreadcrumbPath) -> PathBuf {
    let mut dir = root.to_path_buf();
    for segment in breadcrumbs.segments() {
        let normalized = normalize_segment(segment);
        if !normalized.is_empty() {
            dir.push(normalized);
        }
    }
    dir
}

/// Replace every run of characters outside `[0-9a-zA-Zа-яА-Я]` with a single
/// space, trim, and cap at [`MAX_SEGMENT_CHARS`].
pub fn normalize_segment(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if is_safe(c) {
            normalized.push(c);
            in_run = false;
        } else if !in_run {
            normalized.push(' ');
            in_run = true;
        }
    }

    let trimmed = normalized.trim();
    trimmed.chars().take(MAX_SEGMENT_CHARS).collect()
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, 'а'..='я' | 'А'..='Я')
}
