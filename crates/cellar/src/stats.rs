// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Serialize;

/// Point-in-time occupancy of both cache tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries resident in memory.
    pub volatile_count: u64,
    /// Serialized bytes resident in memory.
    pub volatile_bytes: u64,
    /// Entry files on disk.
    pub durable_count: u64,
    /// Bytes of entry files on disk.
    pub durable_bytes: u64,
}
