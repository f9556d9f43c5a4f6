// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CoreDNS version detection and directive selection.
//!
//! CoreDNS renamed its upstream-forwarding directive from `proxy` to
//! `forward` in release 1.4.0, so the mesh block this controller writes
//! must match the running release. The mapping lives in one ordered table
//! of version ranges; the same table defines the overall range of CoreDNS
//! releases the controller supports, which provider detection checks
//! before any configuration is attempted.

use std::fmt;
use std::sync::LazyLock;

use k8s_openapi::api::apps::v1::Deployment;
use semver::Version;

use crate::constants::COREDNS_NAME;
use crate::errors::DnsError;

/// Upstream-forwarding directive understood by a CoreDNS release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Legacy directive used by CoreDNS releases before 1.4.0
    Proxy,
    /// Directive used by CoreDNS 1.4.0 and later
    Forward,
}

impl Directive {
    /// Returns the directive keyword as it appears in a Corefile.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::Forward => "forward",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open version range `[min, max)` mapped to a directive.
struct DirectiveRange {
    min: Version,
    max: Version,
    directive: Directive,
}

/// Ordered table of supported CoreDNS releases.
///
/// A future CoreDNS syntax change is a row added here, not new control
/// flow. The overall supported range is the first row's `min` to the last
/// row's `max`.
static DIRECTIVE_TABLE: LazyLock<[DirectiveRange; 2]> = LazyLock::new(|| {
    [
        DirectiveRange {
            min: Version::new(1, 3, 0),
            max: Version::new(1, 4, 0),
            directive: Directive::Proxy,
        },
        DirectiveRange {
            min: Version::new(1, 4, 0),
            max: Version::new(1, 9, 0),
            directive: Directive::Forward,
        },
    ]
});

/// Selects the forwarding directive for a CoreDNS release.
///
/// # Arguments
///
/// * `version` - CoreDNS release version extracted from the image tag
///
/// # Returns
///
/// The directive keyword that release understands.
///
/// # Errors
///
/// Returns [`DnsError::UnsupportedVersion`] when the version falls outside
/// every supported range.
pub fn directive_for(version: &Version) -> Result<Directive, DnsError> {
    let table = &*DIRECTIVE_TABLE;

    for range in table {
        if *version >= range.min && *version < range.max {
            return Ok(range.directive);
        }
    }

    Err(DnsError::UnsupportedVersion {
        version: version.to_string(),
        reason: format!(
            "supported versions are >={}, <{}",
            table[0].min,
            table[table.len() - 1].max
        ),
    })
}

/// Extracts the CoreDNS release version from a deployment's pod template.
///
/// Scans the template for the container named `coredns` and parses the
/// tag of its image reference. A leading `v` and shortened tags such as
/// `1.7` are tolerated.
///
/// # Arguments
///
/// * `deployment` - the CoreDNS deployment fetched from the cluster
///
/// # Returns
///
/// The parsed release version.
///
/// # Errors
///
/// Returns [`DnsError::UnsupportedVersion`] when the container is absent,
/// the image has no tag, or the tag is not a semantic version.
pub fn coredns_version(deployment: &Deployment) -> Result<Version, DnsError> {
    let image = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.iter().find(|c| c.name == COREDNS_NAME))
        .and_then(|container| container.image.as_deref());

    let Some(image) = image else {
        return Err(DnsError::UnsupportedVersion {
            version: "unknown".to_string(),
            reason: format!("no '{COREDNS_NAME}' container in the deployment pod template"),
        });
    };

    let Some(tag) = image_tag(image) else {
        return Err(DnsError::UnsupportedVersion {
            version: "unknown".to_string(),
            reason: format!("image '{image}' has no version tag"),
        });
    };

    parse_version_tag(tag.trim_start_matches('v')).ok_or_else(|| DnsError::UnsupportedVersion {
        version: tag.to_string(),
        reason: "tag is not a semantic version".to_string(),
    })
}

/// Returns the tag portion of an image reference, if any.
///
/// The colon introducing a registry port (`registry:5000/coredns`) is not
/// a tag separator, so the candidate tag must not contain a path segment.
fn image_tag(image: &str) -> Option<&str> {
    match image.rsplit_once(':') {
        Some((_, tag)) if !tag.contains('/') && !tag.is_empty() => Some(tag),
        _ => None,
    }
}

/// Parses an image tag as semver, completing `1` or `1.7` style tags with
/// zeroed missing components.
fn parse_version_tag(tag: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(tag) {
        return Some(version);
    }

    let parts: Vec<&str> = tag.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return None;
    }
    if parts
        .iter()
        .any(|part| part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let major = parts[0].parse().ok()?;
    let minor = parts.get(1).and_then(|part| part.parse().ok()).unwrap_or(0);

    Some(Version::new(major, minor, 0))
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod version_tests;
