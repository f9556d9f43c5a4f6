// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pure text transforms for the mesh-owned section of a Corefile.
//!
//! The mesh owns exactly one server block per Corefile, delimited by
//! marker comments so it can be found and removed without parsing a
//! format this controller does not control:
//!
//! ```text
//!
//! #### Begin Traefik Mesh Block
//! traefik.mesh:53 {
//!     errors
//!     cache 30
//!     forward . 10.10.10.10:53
//! }
//! #### End Traefik Mesh Block
//! ```
//!
//! [`patch`] appends that fragment (one blank line, markers, block,
//! trailing newline) and [`restore`] removes it byte-exactly, so a
//! patch/restore cycle returns the original text unchanged no matter how
//! often it runs. Everything here is synchronous string manipulation; all
//! cluster I/O lives in the configurators.

use crate::constants::{DNS_PORT, MESH_BLOCK_HEADER, MESH_BLOCK_TRAILER};
use crate::version::Directive;

/// Renders the bare mesh server block, without markers.
///
/// This is the form a cluster operator may also hand-maintain in a
/// custom-config entry, which is why comparisons go through
/// [`fragments_match`] rather than string equality.
#[must_use]
pub fn mesh_block(mesh_domain: &str, dns_address: &str, directive: Directive) -> String {
    format!(
        "{mesh_domain}:{DNS_PORT} {{\n    errors\n    cache 30\n    {directive} . {dns_address}\n}}"
    )
}

/// Renders the marker-wrapped mesh fragment.
///
/// The leading newline supplies the blank line separating the fragment
/// from whatever precedes it; the result is both what [`patch`] appends
/// inline and what the custom-config entry stores verbatim.
#[must_use]
pub fn mesh_fragment(mesh_domain: &str, dns_address: &str, directive: Directive) -> String {
    format!(
        "\n{MESH_BLOCK_HEADER}\n{}\n{MESH_BLOCK_TRAILER}\n",
        mesh_block(mesh_domain, dns_address, directive)
    )
}

/// Returns true iff the begin marker is present verbatim in the text.
#[must_use]
pub fn is_patched(corefile: &str) -> bool {
    corefile.contains(MESH_BLOCK_HEADER)
}

/// Appends the mesh fragment to a Corefile.
///
/// # Arguments
///
/// * `corefile` - current Corefile text
/// * `mesh_domain` - DNS suffix the mesh resolves (`traefik.mesh`)
/// * `dns_address` - `host:port` of the mesh DNS service
/// * `directive` - forwarding directive the running CoreDNS understands
///
/// # Returns
///
/// The patched text, or the input unchanged when the begin marker is
/// already present.
#[must_use]
pub fn patch(corefile: &str, mesh_domain: &str, dns_address: &str, directive: Directive) -> String {
    if is_patched(corefile) {
        return corefile.to_string();
    }

    format!(
        "{corefile}{}",
        mesh_fragment(mesh_domain, dns_address, directive)
    )
}

/// Removes the marker-delimited mesh fragment from a Corefile.
///
/// The span from the begin marker through the end marker's newline is
/// dropped, along with the one blank line [`patch`] inserted before it,
/// restoring the pre-patch text byte-exactly. Text with no complete
/// marker pair is returned unchanged.
#[must_use]
pub fn restore(corefile: &str) -> String {
    let Some(header_idx) = corefile.find(MESH_BLOCK_HEADER) else {
        return corefile.to_string();
    };
    let Some(trailer_rel) = corefile[header_idx..].find(MESH_BLOCK_TRAILER) else {
        return corefile.to_string();
    };

    let mut span_start = header_idx;
    if corefile[..header_idx].ends_with("\n\n") {
        span_start -= 1;
    }

    let mut span_end = header_idx + trailer_rel + MESH_BLOCK_TRAILER.len();
    if corefile[span_end..].starts_with('\n') {
        span_end += 1;
    }

    format!("{}{}", &corefile[..span_start], &corefile[span_end..])
}

/// Compares two Corefile fragments, ignoring marker comments and blank
/// lines.
///
/// A custom-config entry counts as already patched whether it stores the
/// marker-wrapped fragment or just the bare server block, as long as the
/// effective directives are line-identical.
#[must_use]
pub fn fragments_match(left: &str, right: &str) -> bool {
    significant_lines(left).eq(significant_lines(right))
}

/// Lines of a fragment that carry configuration, in order: comment lines
/// and blank lines are skipped, trailing whitespace is ignored.
fn significant_lines(fragment: &str) -> impl Iterator<Item = &str> {
    fragment
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.trim_start().starts_with('#'))
}

#[cfg(test)]
#[path = "corefile_tests.rs"]
mod corefile_tests;
