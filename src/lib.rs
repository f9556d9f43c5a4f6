// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # meshdns - Cluster DNS integration for Traefik Mesh
//!
//! meshdns teaches the cluster DNS provider to resolve the mesh domain:
//! it detects whether the cluster runs CoreDNS or the legacy KubeDNS,
//! patches that provider's configuration so lookups under `traefik.mesh`
//! are forwarded to the mesh's own DNS server, and reverts the patch
//! cleanly when the mesh is torn down.
//!
//! ## Overview
//!
//! This library provides the core functionality for the meshdns
//! controller, including:
//!
//! - DNS provider detection with a version gate on CoreDNS releases
//! - Marker-delimited Corefile patching, safe to repeat and to revert
//! - CoreDNS custom-ConfigMap support (`coredns-custom`)
//! - KubeDNS stub-domain management
//! - Deployment restarts only when stored configuration actually changed
//!
//! ## Modules
//!
//! - [`provider`] - DNS provider detection and configure/restore dispatch
//! - [`corefile`] - pure text transforms for the mesh-owned Corefile block
//! - [`coredns`] - CoreDNS configurator (inline and custom targets)
//! - [`kubedns`] - KubeDNS stub-domains configurator
//! - [`stubdomains`] - codec for the `stubDomains` ConfigMap field
//! - [`version`] - image-tag parsing and the version/directive table
//! - [`discovery`] - mesh DNS service address resolution
//! - [`errors`] - the [`errors::DnsError`] taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use meshdns::provider;
//!
//! # async fn run() -> Result<(), meshdns::errors::DnsError> {
//! let client = kube::Client::try_default().await?;
//!
//! let dns_provider = provider::detect(&client).await?;
//! dns_provider
//!     .configure(&client, "traefik-mesh", "traefik-mesh-dns", 53)
//!     .await?;
//!
//! // ... mesh runs ...
//!
//! dns_provider.restore(&client).await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod coredns;
pub mod corefile;
pub mod discovery;
pub mod errors;
pub mod kubedns;
pub mod provider;
pub mod stubdomains;
pub mod version;
