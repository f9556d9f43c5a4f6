// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! KubeDNS configuration management.
//!
//! KubeDNS forwards whole DNS suffixes through the `stubDomains` field of
//! the `kube-dns` ConfigMap, so installing the mesh is one key in one
//! JSON object: mesh domain mapped to the mesh DNS service address. The
//! ConfigMap is optional and created on first configure; the `kube-dns`
//! deployment itself must exist, since it is what proves KubeDNS is the
//! provider actually running. KubeDNS watches its ConfigMap, so no
//! deployment restart is involved.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use kube::{Api, Client};
use tracing::{debug, info, warn};

use crate::constants::{KUBEDNS_NAME, MESH_DOMAIN, STUB_DOMAINS_KEY, SYSTEM_NAMESPACE};
use crate::discovery;
use crate::errors::DnsError;
use crate::stubdomains;

/// Installs the mesh stub domain into KubeDNS.
///
/// Sets the mesh-domain key of the stub-domains table to a one-element
/// list holding the mesh DNS service address, preserving every other
/// entry, and writes the table back compactly.
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
/// Returns [`DnsError::MissingResource`] when the `kube-dns` deployment
/// or the mesh DNS service is absent, [`DnsError::MalformedStubDomains`]
/// when the existing field does not parse, and [`DnsError::Api`] when a
/// cluster call fails.
pub async fn configure(
    client: &Client,
    mesh_namespace: &str,
    mesh_service: &str,
    dns_port: u16,
) -> Result<(), DnsError> {
    info!("Configuring KubeDNS for mesh domain '{}'", MESH_DOMAIN);

    let deployment_api: Api<Deployment> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);
    if deployment_api.get_opt(KUBEDNS_NAME).await?.is_none() {
        return Err(DnsError::missing(
            "Deployment",
            SYSTEM_NAMESPACE,
            KUBEDNS_NAME,
        ));
    }

    let address = discovery::dns_address(client, mesh_namespace, mesh_service, dns_port).await?;

    let cm_api: Api<ConfigMap> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);
    let existing = cm_api.get_opt(KUBEDNS_NAME).await?;
    let exists = existing.is_some();

    // The ConfigMap is optional, kube-dns runs without one until some
    // tool needs a field in it.
    let mut config_map = existing.unwrap_or_else(|| ConfigMap {
        metadata: ObjectMeta {
            name: Some(KUBEDNS_NAME.to_string()),
            namespace: Some(SYSTEM_NAMESPACE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    });

    let mut domains = parse_stub_domains(&config_map)?;
    domains.insert(MESH_DOMAIN.to_string(), vec![address]);

    let serialized = stubdomains::serialize(&domains);
    debug!("Writing stub domains: {}", serialized);

    config_map
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(STUB_DOMAINS_KEY.to_string(), serialized);

    if exists {
        cm_api
            .replace(KUBEDNS_NAME, &PostParams::default(), &config_map)
            .await?;
        info!(
            "Updated stub domains in ConfigMap {}/{}",
            SYSTEM_NAMESPACE, KUBEDNS_NAME
        );
    } else {
        cm_api.create(&PostParams::default(), &config_map).await?;
        info!(
            "Created ConfigMap {}/{} with the mesh stub domain",
            SYSTEM_NAMESPACE, KUBEDNS_NAME
        );
    }

    Ok(())
}

/// Removes the mesh stub domain from KubeDNS.
///
/// Deletes the mesh-domain key and writes the table back; a table left
/// empty serializes to the empty string. Nothing is written when the key
/// was not present, and an absent ConfigMap counts as already restored.
///
/// # Errors
///
/// Returns [`DnsError::MalformedStubDomains`] when the existing field
/// does not parse and [`DnsError::Api`] when a cluster call fails.
pub async fn restore(client: &Client) -> Result<(), DnsError> {
    info!("Restoring KubeDNS configuration");

    let cm_api: Api<ConfigMap> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);

    let Some(mut config_map) = cm_api.get_opt(KUBEDNS_NAME).await? else {
        warn!(
            "ConfigMap {}/{} not found, nothing to restore",
            SYSTEM_NAMESPACE, KUBEDNS_NAME
        );
        return Ok(());
    };

    let mut domains = parse_stub_domains(&config_map)?;
    if domains.remove(MESH_DOMAIN).is_none() {
        debug!("Stub domains carry no mesh entry");
        return Ok(());
    }

    config_map
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(STUB_DOMAINS_KEY.to_string(), stubdomains::serialize(&domains));

    cm_api
        .replace(KUBEDNS_NAME, &PostParams::default(), &config_map)
        .await?;
    info!(
        "Removed mesh stub domain from ConfigMap {}/{}",
        SYSTEM_NAMESPACE, KUBEDNS_NAME
    );

    Ok(())
}

/// Parses the stub-domains field of the `kube-dns` ConfigMap; a missing
/// field is an empty table.
fn parse_stub_domains(config_map: &ConfigMap) -> Result<stubdomains::StubDomains, DnsError> {
    let field = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(STUB_DOMAINS_KEY))
        .map(String::as_str)
        .unwrap_or_default();

    stubdomains::parse(field).map_err(|source| DnsError::MalformedStubDomains {
        namespace: SYSTEM_NAMESPACE.to_string(),
        name: KUBEDNS_NAME.to_string(),
        source,
    })
}
