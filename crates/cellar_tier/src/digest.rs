// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, Write};

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `bytes`.
///
/// ```
/// assert_eq!(
///     cellar_tier::sha256_hex(b"abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hashes the JSON serialization of `value`, returning the hex digest and the serialized length.
///
/// The value is streamed through the hasher, so no intermediate buffer is allocated.
#[must_use]
pub fn digest_json(value: &serde_json::Value) -> (String, usize) {
    let mut writer = HashingWriter::default();
    // Writing a `Value` into an infallible sink cannot fail.
    if serde_json::to_writer(&mut writer, value).is_err() {
        return (String::new(), 0);
    }
    (hex::encode(writer.hasher.finalize()), writer.written)
}

#[derive(Default)]
struct HashingWriter {
    hasher: Sha256,
    written: usize,
}

impl Write for HashingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn digest_json_matches_serialized_bytes() {
        let value = json!({"mrr": 1200, "currency": "usd"});
        let serialized = serde_json::to_vec(&value).expect("serializable");

        let (hash, len) = digest_json(&value);

        assert_eq!(len, serialized.len());
        assert_eq!(hash, sha256_hex(&serialized));
    }

    #[test]
    fn different_values_have_different_digests() {
        assert_ne!(digest_json(&json!(1)).0, digest_json(&json!(2)).0);
    }
}
