// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for DNS provider detection and configuration.
//!
//! This module provides the error taxonomy for everything the controller
//! does against the cluster DNS provider:
//! - Provider detection failures (no provider, unsupported CoreDNS version)
//! - Missing cluster resources (Deployments, ConfigMaps, Services)
//! - Malformed provider-owned data (KubeDNS stub-domains JSON)
//! - Underlying Kubernetes API failures
//!
//! Every failure aborts the configure/restore call that hit it; nothing is
//! retried at this layer, and no partial ConfigMap write is ever issued
//! after an error.

use thiserror::Error;

/// Errors returned by provider detection, configuration, and restoration.
#[derive(Error, Debug)]
pub enum DnsError {
    /// CoreDNS deployment found but its version cannot be patched
    ///
    /// Returned when the image tag of the CoreDNS container is missing,
    /// not parseable as a semantic version, or falls outside the range of
    /// CoreDNS releases whose Corefile syntax this controller knows.
    #[error("unsupported CoreDNS version '{version}': {reason}")]
    UnsupportedVersion {
        /// Version string extracted from the container image tag
        version: String,
        /// Why the version cannot be used
        reason: String,
    },

    /// Neither a CoreDNS nor a KubeDNS deployment exists in the cluster
    ///
    /// Returned by provider detection when the system namespace holds no
    /// deployment this controller recognizes as a DNS provider.
    #[error("no supported DNS provider found in namespace '{namespace}'")]
    NoKnownProvider {
        /// Namespace that was searched for provider deployments
        namespace: String,
    },

    /// A required cluster resource is absent
    ///
    /// Returned when a Deployment, ConfigMap, or Service the operation
    /// depends on does not exist. The operation aborts without writing.
    #[error("{kind} '{namespace}/{name}' not found")]
    MissingResource {
        /// Resource kind ("Deployment", "ConfigMap", "Service")
        kind: String,
        /// Namespace the resource was expected in
        namespace: String,
        /// Name the resource was expected under
        name: String,
    },

    /// The KubeDNS stub-domains field exists but is not valid JSON
    ///
    /// Returned instead of silently replacing the field: the data belongs
    /// to the cluster operator, and rewriting over an unreadable value
    /// would destroy whatever it was meant to say.
    #[error("stub domains in ConfigMap '{namespace}/{name}' are not valid JSON")]
    MalformedStubDomains {
        /// Namespace of the ConfigMap holding the field
        namespace: String,
        /// Name of the ConfigMap holding the field
        name: String,
        /// Underlying JSON parse failure
        #[source]
        source: serde_json::Error,
    },

    /// Underlying Kubernetes API request failed
    ///
    /// Wraps transport failures, server-side errors, and update conflicts
    /// verbatim; conflicts are not retried here, the caller may re-invoke.
    #[error("Kubernetes API request failed: {0}")]
    Api(#[from] kube::Error),
}

impl DnsError {
    /// Builds a [`DnsError::MissingResource`] for the given cluster object.
    #[must_use]
    pub fn missing(kind: &str, namespace: &str, name: &str) -> Self {
        Self::MissingResource {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Returns the short reason code for this error.
    ///
    /// Used in log fields so failures can be grouped without parsing
    /// message text.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion { .. } => "UnsupportedVersion",
            Self::NoKnownProvider { .. } => "NoKnownProvider",
            Self::MissingResource { .. } => "MissingResource",
            Self::MalformedStubDomains { .. } => "MalformedStubDomains",
            Self::Api(_) => "APIFailure",
        }
    }
}
