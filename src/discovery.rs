// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mesh DNS service discovery.
//!
//! Both configurators forward the mesh domain to the same place: the mesh
//! DNS server running behind a `Service` in the mesh control-plane
//! namespace. This module resolves that service to the `host:port` string
//! written into provider configuration.

use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::debug;

use crate::errors::DnsError;

/// Resolves the address the cluster DNS provider forwards mesh lookups to.
///
/// The host part is the `Service`'s cluster IP when one is assigned;
/// headless services fall back to the in-cluster DNS name
/// `<service>.<namespace>.svc.cluster.local`.
///
/// # Arguments
///
/// * `client` - Kubernetes client
/// * `mesh_namespace` - namespace of the mesh control plane
/// * `mesh_service` - name of the mesh DNS `Service`
/// * `dns_port` - port the mesh DNS server listens on
///
/// # Errors
///
/// Returns [`DnsError::MissingResource`] when the `Service` does not
/// exist, or [`DnsError::Api`] when the lookup fails.
pub async fn dns_address(
    client: &Client,
    mesh_namespace: &str,
    mesh_service: &str,
    dns_port: u16,
) -> Result<String, DnsError> {
    let service_api: Api<Service> = Api::namespaced(client.clone(), mesh_namespace);

    let service = service_api
        .get_opt(mesh_service)
        .await?
        .ok_or_else(|| DnsError::missing("Service", mesh_namespace, mesh_service))?;

    let host = service
        .spec
        .and_then(|spec| spec.cluster_ip)
        .filter(|ip| !ip.is_empty() && ip != "None")
        .unwrap_or_else(|| format!("{mesh_service}.{mesh_namespace}.svc.cluster.local"));

    let address = format!("{host}:{dns_port}");
    debug!(
        "Resolved mesh DNS service {}/{} to {}",
        mesh_namespace, mesh_service, address
    );

    Ok(address)
}
