// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the meshdns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Mesh Domain Constants
// ============================================================================

/// DNS suffix the mesh resolves internally; lookups for it are forwarded
/// to the mesh DNS service
pub const MESH_DOMAIN: &str = "traefik.mesh";

/// Begin marker delimiting the mesh-owned section of a Corefile
pub const MESH_BLOCK_HEADER: &str = "#### Begin Traefik Mesh Block";

/// End marker delimiting the mesh-owned section of a Corefile
pub const MESH_BLOCK_TRAILER: &str = "#### End Traefik Mesh Block";

/// Pod-template annotation whose value changes to roll the DNS deployment
pub const RESTART_ANNOTATION: &str = "traefik-mesh-hash";

// ============================================================================
// Cluster Resource Constants
// ============================================================================

/// Namespace holding the cluster DNS provider resources
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// Name of the CoreDNS deployment and its Corefile `ConfigMap`
pub const COREDNS_NAME: &str = "coredns";

/// Name of the optional CoreDNS custom-config `ConfigMap`
pub const COREDNS_CUSTOM_NAME: &str = "coredns-custom";

/// Name of the KubeDNS deployment and its `ConfigMap`
pub const KUBEDNS_NAME: &str = "kube-dns";

/// Data key holding the Corefile text in the `coredns` `ConfigMap`
pub const COREFILE_KEY: &str = "Corefile";

/// Data key holding the stub-domains JSON in the `kube-dns` `ConfigMap`
pub const STUB_DOMAINS_KEY: &str = "stubDomains";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port; the mesh server block listens on it
pub const DNS_PORT: u16 = 53;

// ============================================================================
// Controller Default Constants
// ============================================================================

/// Default namespace of the mesh control plane
pub const DEFAULT_MESH_NAMESPACE: &str = "traefik-mesh";

/// Default name of the mesh DNS `Service`
pub const DEFAULT_MESH_DNS_SERVICE: &str = "traefik-mesh-dns";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
