// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::{Path, PathBuf};

use cellar_tier::{CacheKey, sha256_hex};

/// File extension of stored entries.
pub(crate) const ENTRY_EXTENSION: &str = "json";

/// Extension of in-progress writes; never read back as entries.
pub(crate) const TEMP_EXTENSION: &str = "tmp";

/// Prefix for namespaces whose names cannot be used as a directory verbatim.
const ENCODED_PREFIX: &str = "ns-";

/// Maps a namespace to the directory that holds its entries.
///
/// Namespaces made of `[A-Za-z0-9._-]` are used verbatim. Anything else (empty names, `.`,
/// `..`, path separators, non-ASCII) and names of exactly two hex digits, which would collide
/// with the digest fan-out directories, are encoded as `ns-` plus 16 hex digits of the
/// namespace digest. Names already starting with `ns-` are encoded too, so a verbatim name
/// never shadows an encoded one.
///
/// ```
/// use cellar_disk::namespace_dir;
///
/// assert_eq!(namespace_dir("stripe"), "stripe");
/// assert!(namespace_dir("../etc").starts_with("ns-"));
/// assert!(namespace_dir("ab").starts_with("ns-"));
/// ```
#[must_use]
pub fn namespace_dir(namespace: &str) -> String {
    let safe_chars = namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let reserved =
        matches!(namespace, "" | "." | "..") || is_fan_out_name(namespace) || namespace.starts_with(ENCODED_PREFIX);

    if safe_chars && !reserved {
        namespace.to_owned()
    } else {
        let digest = sha256_hex(namespace.as_bytes());
        format!("{ENCODED_PREFIX}{}", &digest[..16])
    }
}

fn is_fan_out_name(name: &str) -> bool {
    name.len() == 2 && name.chars().all(|c| c.is_ascii_hexdigit())
}

/// Returns the file that stores `key` under `root`.
pub(crate) fn entry_path(root: &Path, key: &CacheKey) -> PathBuf {
    let digest = key.digest();
    let mut path = root.to_path_buf();
    if let Some(namespace) = key.namespace() {
        path.push(namespace_dir(namespace));
    }
    path.push(&digest[..2]);
    path.push(format!("{digest}.{ENTRY_EXTENSION}"));
    path
}

/// Returns a unique temporary sibling of `path`.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(format!(".{:016x}.{TEMP_EXTENSION}", fastrand::u64(..)));
    path.with_file_name(name)
}

pub(crate) fn is_entry_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}
