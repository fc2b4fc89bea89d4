// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Durable tier for the cellar cache.
//!
//! [`DurableTier`] stores each entry as a JSON file whose name is the SHA-256 digest of the
//! entry's full key. Files fan out over 256 two-hex-digit directories to bound directory size:
//!
//! ```text
//! <root>/<hex[0:2]>/<hex>.json                    un-namespaced keys
//! <root>/<namespace-dir>/<hex[0:2]>/<hex>.json    namespaced keys
//! ```
//!
//! Keeping namespaced entries under their own directory makes clearing a namespace a single
//! directory removal. See [`namespace_dir`] for how namespace names map to directory names.
//!
//! Writes land in a temporary sibling file and are renamed into place, so readers observe
//! either the previous entry or the new one. Concurrent writers to the same key are not
//! coordinated; the last rename wins.

mod layout;
mod tier;

#[doc(inline)]
pub use layout::namespace_dir;
#[doc(inline)]
pub use tier::DurableTier;
