//! Volume manifests.
//!
//! A manifest lists every file placed on one volume together with its
//! digest, so a written disc can be checked against the files it was built
//! from. Format:
//!
//! ```text
//! ; Volume manifest generated by discfit
//! ; Algorithm: sha256
//! ; Volume: 1
//! ; Items: 2 (1.50 kB)
//!
//! <hex digest> <encoded relative path>
//! link:<hex digest of link target> <encoded relative path>
//! ```
//!
//! Each path component is percent-encoded byte for byte, so names with
//! spaces, newlines or bytes that are not UTF-8 survive the round trip.
//! Symbolic links are never followed: their entry is a digest of the link
//! target text, marked with a `link:` prefix.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::media::display_bytes;
use crate::span::SpanItem;

const READ_BUFFER_SIZE: usize = 64 * 1024;
const LINK_MARKER: &str = "link:";

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// SHA-256 (cryptographic, 256-bit)
    #[default]
    Sha256,
    /// BLAKE3 (modern, fast, 256-bit)
    Blake3,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(EngineError::UnknownChecksumAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// A computed checksum value.
///
/// Displays as the manifest token: the bare hex digest for a file, or
/// `link:` followed by the digest of the target text for a symbolic link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumValue {
    algorithm: ChecksumAlgorithm,
    hex: String,
    link: bool,
}

impl ChecksumValue {
    pub fn new(algorithm: ChecksumAlgorithm, hex: String) -> Self {
        ChecksumValue {
            algorithm,
            hex,
            link: false,
        }
    }

    /// Checksum of a symbolic link's target text.
    pub fn for_link(algorithm: ChecksumAlgorithm, hex: String) -> Self {
        ChecksumValue {
            algorithm,
            hex,
            link: true,
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn is_link(&self) -> bool {
        self.link
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.link {
            write!(f, "{}{}", LINK_MARKER, self.hex)
        } else {
            write!(f, "{}", self.hex)
        }
    }
}

enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::default()),
            ChecksumAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(hasher) => {
                use sha2::Digest;
                hasher.update(data);
            }
            Hasher::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize_hex(self) -> (ChecksumAlgorithm, String) {
        match self {
            Hasher::Sha256(hasher) => {
                use sha2::Digest;
                (ChecksumAlgorithm::Sha256, format!("{:x}", hasher.finalize()))
            }
            Hasher::Blake3(hasher) => {
                (ChecksumAlgorithm::Blake3, hasher.finalize().to_hex().to_string())
            }
        }
    }
}

#[cfg(unix)]
fn os_bytes(text: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(text.as_bytes())
}

#[cfg(not(unix))]
fn os_bytes(text: &OsStr) -> Cow<'_, [u8]> {
    match text.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(unix)]
fn os_from_bytes(bytes: Vec<u8>) -> Option<OsString> {
    use std::os::unix::ffi::OsStringExt;
    Some(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn os_from_bytes(bytes: Vec<u8>) -> Option<OsString> {
    String::from_utf8(bytes).ok().map(OsString::from)
}

/// Percent-encode each component of `path` and join them with `/`.
fn encode_path(path: &Path) -> String {
    path.components()
        .map(|component| match component {
            Component::RootDir => String::new(),
            other => urlencoding::encode_binary(&os_bytes(other.as_os_str())).into_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode_path`]. `None` if the bytes cannot form a path here.
fn decode_path(text: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for (index, segment) in text.split('/').enumerate() {
        if segment.is_empty() {
            if index == 0 {
                path.push(std::path::MAIN_SEPARATOR_STR);
            }
            continue;
        }
        let bytes = urlencoding::decode_binary(segment.as_bytes()).into_owned();
        path.push(os_from_bytes(bytes)?);
    }
    Some(path)
}

/// Compute the checksum of a file, reading it in 64 KiB chunks.
///
/// Follows symbolic links; see [`compute_entry_checksum`] for the variant
/// used by manifests.
pub fn compute_file_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<ChecksumValue, EngineError> {
    let read_error = |e: io::Error| EngineError::ReadError {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        }
    }

    let (algorithm, hex) = hasher.finalize_hex();
    Ok(ChecksumValue::new(algorithm, hex))
}

/// Checksum of one manifest entry.
///
/// A symbolic link is not followed: the digest covers the link target text,
/// so dangling links and links to directories are recorded like any other
/// link. Everything else is read as a file.
pub fn compute_entry_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<ChecksumValue, EngineError> {
    let read_error = |e: io::Error| EngineError::ReadError {
        path: path.to_path_buf(),
        source: e,
    };

    let metadata = fs::symlink_metadata(path).map_err(read_error)?;
    if !metadata.file_type().is_symlink() {
        return compute_file_checksum(path, algorithm);
    }

    let target = fs::read_link(path).map_err(read_error)?;
    let mut hasher = Hasher::new(algorithm);
    hasher.update(&os_bytes(target.as_os_str()));
    let (algorithm, hex) = hasher.finalize_hex();
    Ok(ChecksumValue::for_link(algorithm, hex))
}

fn relative_path<'a>(path: &'a Path, strip_prefix: Option<&Path>) -> &'a Path {
    strip_prefix
        .and_then(|prefix| path.strip_prefix(prefix).ok())
        .unwrap_or(path)
}

/// Generate the manifest text for one volume.
///
/// `volume_number` is one-based and only appears in the header. Paths are
/// written relative to `strip_prefix` when they live below it.
pub fn generate_volume_manifest(
    volume: &SpanItem<PathBuf>,
    volume_number: usize,
    strip_prefix: Option<&Path>,
    algorithm: ChecksumAlgorithm,
) -> Result<String, EngineError> {
    let mut result = String::new();

    result.push_str("; Volume manifest generated by discfit\n");
    result.push_str(&format!("; Algorithm: {}\n", algorithm));
    result.push_str(&format!("; Volume: {}\n", volume_number));
    result.push_str(&format!(
        "; Items: {} ({})\n",
        volume.items.len(),
        display_bytes(volume.size, 2)
    ));
    result.push('\n');

    for path in &volume.items {
        let checksum = compute_entry_checksum(path, algorithm)?;
        result.push_str(&format!(
            "{} {}\n",
            checksum,
            encode_path(relative_path(path, strip_prefix))
        ));
    }

    Ok(result)
}

/// The algorithm named in a manifest header, if any.
pub fn manifest_algorithm(content: &str) -> Option<ChecksumAlgorithm> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix(';'))
        .filter_map(|comment| comment.trim().strip_prefix("Algorithm:"))
        .find_map(|name| name.parse().ok())
}

/// Result of checking one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyOutcome {
    Match,
    Mismatch,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntryStatus {
    /// Path as written in the manifest (encoded)
    pub path: String,
    /// Decoded location that was checked
    #[serde(skip)]
    pub location: PathBuf,
    pub expected: String,
    pub actual: Option<ChecksumValue>,
    pub outcome: VerifyOutcome,
}

/// Check every entry of a manifest against the files below `root`.
///
/// The algorithm named in the manifest header wins over `default_algorithm`.
/// Entries that do not exist are reported as `Missing`; any other read
/// failure is an error.
pub fn verify_manifest(
    content: &str,
    root: &Path,
    default_algorithm: ChecksumAlgorithm,
) -> Result<Vec<ManifestEntryStatus>, EngineError> {
    let algorithm = manifest_algorithm(content).unwrap_or(default_algorithm);
    let mut results = Vec::new();

    // lines() drops the terminator; the path part is never trimmed
    for line in content.lines() {
        let head = line.trim_start();
        if head.is_empty() || head.starts_with(';') {
            continue;
        }

        let Some((expected, encoded)) = head.split_once(' ') else {
            tracing::warn!(line, "ignoring malformed manifest line");
            continue;
        };
        let Some(rel_path) = decode_path(encoded) else {
            tracing::warn!(line, "ignoring manifest line with undecodable path");
            continue;
        };

        let location = root.join(rel_path);
        let (actual, outcome) = match compute_entry_checksum(&location, algorithm) {
            Ok(actual) => {
                let outcome = if actual.to_string() == expected {
                    VerifyOutcome::Match
                } else {
                    VerifyOutcome::Mismatch
                };
                (Some(actual), outcome)
            }
            Err(EngineError::ReadError { source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                (None, VerifyOutcome::Missing)
            }
            Err(e) => return Err(e),
        };

        results.push(ManifestEntryStatus {
            path: encoded.to_string(),
            location,
            expected: expected.to_string(),
            actual,
            outcome,
        });
    }

    Ok(results)
}
