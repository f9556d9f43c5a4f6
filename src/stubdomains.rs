// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Codec for the KubeDNS `stubDomains` ConfigMap field.
//!
//! KubeDNS stores its stub-domain table as one JSON object in a single
//! ConfigMap data field: DNS suffix mapped to a list of upstream resolver
//! addresses, for example `{"traefik.mesh":["10.10.10.10:53"]}`. The mesh
//! owns exactly one key of that object and must leave every other key
//! byte-identical, so the codec round-trips through a sorted map and
//! compact serialization.

use std::collections::BTreeMap;

/// Stub-domain table: DNS suffix mapped to upstream resolver addresses.
///
/// A `BTreeMap` keeps serialization in sorted key order, matching the
/// layout KubeDNS tooling writes.
pub type StubDomains = BTreeMap<String, Vec<String>>;

/// Parses a stub-domains field.
///
/// A missing field is passed in as the empty string; both parse to an
/// empty table.
///
/// # Errors
///
/// Returns the underlying JSON error when the field is non-empty and not
/// a valid stub-domain object.
pub fn parse(field: &str) -> Result<StubDomains, serde_json::Error> {
    if field.is_empty() {
        return Ok(StubDomains::new());
    }

    serde_json::from_str(field)
}

/// Serializes a stub-domain table to the compact form KubeDNS expects.
///
/// An empty table serializes to the empty string, not `{}`; KubeDNS
/// treats the field as unset in that case.
#[must_use]
pub fn serialize(domains: &StubDomains) -> String {
    if domains.is_empty() {
        return String::new();
    }

    serde_json::to_string(domains).expect("string-keyed map serializes to JSON")
}

#[cfg(test)]
#[path = "stubdomains_tests.rs"]
mod stubdomains_tests;
