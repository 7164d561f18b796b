//! Configuration locations.
//!
//! A deployed configuration is identified by a URL-like string. Locations
//! backed by a local file can be watched for changes: plain paths and
//! `file:` URLs watch the file itself, `jar:file:<archive>!/<entry>` URLs
//! watch the enclosing archive, so a change to the archive invalidates every
//! configuration packaged inside it. Any other scheme is kept verbatim and
//! is never watched.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigLocation {
    /// A local file.
    File(PathBuf),
    /// An entry inside a local archive.
    Jar { archive: PathBuf, entry: String },
    /// Anything else, kept as given.
    Remote(String),
}

impl ConfigLocation {
    /// Parse a path or URL.
    ///
    /// Local paths are canonicalized when they exist so that different
    /// spellings of the same file share one identity.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_location(input, "empty location"));
        }

        if let Some(rest) = strip_scheme(trimmed, "jar") {
            let (archive, entry) = rest
                .split_once("!/")
                .ok_or_else(|| Error::invalid_location(input, "missing '!/' archive separator"))?;
            let Some(archive) = strip_scheme(archive, "file") else {
                return Err(Error::invalid_location(input, "only file: archives are supported"));
            };
            if entry.is_empty() {
                return Err(Error::invalid_location(input, "empty archive entry"));
            }
            return Ok(Self::Jar {
                archive: canonical(file_url_path(input, archive)?),
                entry: entry.to_string(),
            });
        }

        if let Some(rest) = strip_scheme(trimmed, "file") {
            return Ok(Self::File(canonical(file_url_path(input, rest)?)));
        }

        if has_scheme(trimmed) {
            return Ok(Self::Remote(trimmed.to_string()));
        }

        Ok(Self::from_path(trimmed))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::File(canonical(path.as_ref().to_path_buf()))
    }

    /// The URL form used as this location's identity.
    pub fn external_form(&self) -> String {
        match self {
            Self::File(path) => format!("file:{}", path_to_url(path)),
            Self::Jar { archive, entry } => {
                format!("jar:file:{}!/{}", path_to_url(archive), entry)
            }
            Self::Remote(url) => url.clone(),
        }
    }

    /// The local file to poll for changes, if there is one.
    pub fn watch_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Jar { archive, .. } => Some(archive),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for ConfigLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.external_form())
    }
}

impl FromStr for ConfigLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn canonical(path: PathBuf) -> PathBuf {
    dunce::canonicalize(&path).unwrap_or(path)
}

fn strip_scheme<'a>(input: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, rest) = input.split_once(':')?;
    head.eq_ignore_ascii_case(scheme).then_some(rest)
}

/// `scheme:` prefix per RFC 3986. Single letters are drive letters.
fn has_scheme(input: &str) -> bool {
    match input.split_once(':') {
        Some((head, _)) => {
            head.len() > 1
                && head.starts_with(|c: char| c.is_ascii_alphabetic())
                && head
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Path part of a `file:` URL (everything after the scheme).
fn file_url_path(input: &str, rest: &str) -> Result<PathBuf> {
    let path = match rest.strip_prefix("//") {
        Some(after) => {
            let (host, path) = match after.find('/') {
                Some(i) => after.split_at(i),
                None => (after, ""),
            };
            if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
                return Err(Error::invalid_location(input, "remote file hosts are not supported"));
            }
            path
        }
        None => rest,
    };
    if path.is_empty() {
        return Err(Error::invalid_location(input, "missing path"));
    }

    let decoded = percent_decode(path)
        .ok_or_else(|| Error::invalid_location(input, "invalid percent-encoding"))?;

    // file:/C:/dir -> C:/dir
    #[cfg(windows)]
    let decoded = match decoded.strip_prefix('/') {
        Some(stripped) if stripped.as_bytes().get(1) == Some(&b':') => stripped.to_string(),
        _ => decoded,
    };

    Ok(PathBuf::from(decoded))
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            out.push(u8::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Bytes written as-is in the path part of a `file:` URL: RFC 3986
/// unreserved characters, segment separators and drive colons.
fn is_url_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/' | b':')
}

fn path_to_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut out = String::with_capacity(raw.len() + 1);
    if !raw.starts_with('/') {
        out.push('/');
    }
    for &byte in raw.as_bytes() {
        if is_url_safe(byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
