//! Turning untrusted `sources[]` entries into paths under an output root.
//!
//! Contract: [`sanitize_source_path`] never returns a path outside
//! `<root>/<host>/`. Entries that cannot be made safe are rejected rather
//! than clamped.

use crate::error::{Result, ScanError};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Marker some bundlers put in `sources` for files not embedded in the map.
pub const EXTERNAL_MARKER: &str = "external ";

/// Name of the per-host provenance log; no extracted file may take it.
pub const PROVENANCE_FILE: &str = "_sources.txt";

const VIRTUAL_SCHEMES: [&str; 2] = ["webpack://", "webpack-internal://"];

/// Strips bundler virtual-filesystem prefixes and any other `scheme://`.
pub fn strip_scheme(source: &str) -> &str {
    let mut rest = source.trim();
    for scheme in VIRTUAL_SCHEMES {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped;
        }
    }
    if let Some(idx) = rest.find("://") {
        let scheme = &rest[..idx];
        if !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            rest = &rest[idx + 3..];
        }
    }
    rest
}

/// True if the entry, once its scheme is stripped, denotes an external file.
pub fn is_external(source: &str) -> bool {
    strip_scheme(source)
        .trim_start_matches('/')
        .starts_with(EXTERNAL_MARKER)
}

/// Normalises a relative path: `.` and empty segments are dropped and each
/// `..` removes the preceding segment, never going above the start.
pub fn collapse_relative(path: &str) -> Result<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s if s.contains('\0') => {
                return Err(ScanError::Sanitization(path.to_string()));
            }
            s => segments.push(s),
        }
    }

    let mut relative = PathBuf::new();
    for segment in segments {
        // Anything the platform parses as more than a plain name (drive
        // prefixes, roots) is refused outright.
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => relative.push(name),
            _ => return Err(ScanError::Sanitization(path.to_string())),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ScanError::Sanitization(path.to_string()));
    }
    Ok(relative)
}

/// Maps `source` to its destination under `<root>/<host>/`.
pub fn sanitize_source_path(root: &Path, host: &str, source: &str) -> Result<PathBuf> {
    let host_root = host_dir(root, host)?;
    let stripped = strip_scheme(source);
    if is_external(source) {
        return Err(ScanError::Validation(format!(
            "external source maps unsupported: {:?}",
            source
        )));
    }

    let relative = collapse_relative(stripped).map_err(|_| ScanError::Sanitization(source.to_string()))?;
    // The log name is reserved at the host root, as a file or a directory.
    if relative.components().next() == Some(Component::Normal(OsStr::new(PROVENANCE_FILE))) {
        return Err(ScanError::Sanitization(source.to_string()));
    }

    let destination = host_root.join(relative);
    if !destination.starts_with(&host_root) {
        return Err(ScanError::Sanitization(source.to_string()));
    }
    Ok(destination)
}

/// `<root>/<host>`, refusing hostnames that are not a single path segment.
pub fn host_dir(root: &Path, host: &str) -> Result<PathBuf> {
    let mut components = Path::new(host).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if !host.contains(['/', '\\']) => Ok(root.join(name)),
        _ => Err(ScanError::Sanitization(format!("host {}", host))),
    }
}
