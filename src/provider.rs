// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster DNS provider detection.
//!
//! The controller supports two providers and must pick one before doing
//! anything else: CoreDNS (checked first, including a version gate on its
//! image tag) and the legacy KubeDNS. Detection inspects deployments in
//! the system namespace and has no side effects; the resulting
//! [`Provider`] value drives which configurator the controller runs at
//! startup and again at shutdown.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use tracing::{info, warn};

use crate::constants::{COREDNS_NAME, KUBEDNS_NAME, SYSTEM_NAMESPACE};
use crate::errors::DnsError;
use crate::version::{coredns_version, directive_for};
use crate::{coredns, kubedns};

/// DNS provider the cluster runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// CoreDNS, at a release within the supported version range
    CoreDns,
    /// Legacy kube-dns
    KubeDns,
    /// No supported provider identified; configure/restore are no-ops
    UnknownDns,
}

impl Provider {
    /// Installs the mesh forwarding configuration on this provider.
    ///
    /// # Errors
    ///
    /// Propagates the chosen configurator's error; see
    /// [`coredns::configure`] and [`kubedns::configure`].
    pub async fn configure(
        self,
        client: &Client,
        mesh_namespace: &str,
        mesh_service: &str,
        dns_port: u16,
    ) -> Result<(), DnsError> {
        match self {
            Self::CoreDns => {
                coredns::configure(client, mesh_namespace, mesh_service, dns_port).await
            }
            Self::KubeDns => {
                kubedns::configure(client, mesh_namespace, mesh_service, dns_port).await
            }
            Self::UnknownDns => {
                warn!("No DNS provider detected, nothing to configure");
                Ok(())
            }
        }
    }

    /// Removes the mesh forwarding configuration from this provider.
    ///
    /// # Errors
    ///
    /// Propagates the chosen configurator's error; see
    /// [`coredns::restore`] and [`kubedns::restore`].
    pub async fn restore(self, client: &Client) -> Result<(), DnsError> {
        match self {
            Self::CoreDns => coredns::restore(client).await,
            Self::KubeDns => kubedns::restore(client).await,
            Self::UnknownDns => {
                warn!("No DNS provider detected, nothing to restore");
                Ok(())
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CoreDns => "CoreDNS",
            Self::KubeDns => "KubeDNS",
            Self::UnknownDns => "UnknownDNS",
        };
        f.write_str(name)
    }
}

/// Detects which DNS provider the cluster runs.
///
/// Looks for a CoreDNS deployment first; when present, its image version
/// must parse and fall inside the supported range for detection to
/// succeed. Without CoreDNS, a kube-dns deployment selects
/// [`Provider::KubeDns`]. Detection never modifies the cluster.
///
/// # Errors
///
/// Returns [`DnsError::UnsupportedVersion`] when a CoreDNS deployment
/// exists but cannot be patched, [`DnsError::NoKnownProvider`] when
/// neither deployment exists, and [`DnsError::Api`] when a lookup fails.
pub async fn detect(client: &Client) -> Result<Provider, DnsError> {
    let deployment_api: Api<Deployment> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);

    if let Some(deployment) = deployment_api.get_opt(COREDNS_NAME).await? {
        let version = coredns_version(&deployment)?;
        let directive = directive_for(&version)?;
        info!("Detected CoreDNS {} (directive '{}')", version, directive);
        return Ok(Provider::CoreDns);
    }

    if deployment_api.get_opt(KUBEDNS_NAME).await?.is_some() {
        info!("Detected KubeDNS");
        return Ok(Provider::KubeDns);
    }

    Err(DnsError::NoKnownProvider {
        namespace: SYSTEM_NAMESPACE.to_string(),
    })
}
