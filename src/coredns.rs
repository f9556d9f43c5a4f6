// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CoreDNS configuration management.
//!
//! Installs the mesh server block into the cluster's CoreDNS setup and
//! removes it again on teardown. The block lands in one of two targets,
//! decided once per call: inline between markers in the `coredns`
//! ConfigMap's Corefile, or, when the cluster uses the `coredns-custom`
//! extension ConfigMap, as a standalone `<domain>.server` entry there,
//! leaving the Corefile itself alone.
//!
//! Writes only happen when the rendered configuration differs from what
//! the cluster already holds, and the CoreDNS deployment is only rolled
//! (via a content-hash annotation on its pod template) when such a write
//! happened. Re-running against an already-configured cluster touches
//! nothing.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::constants::{
    COREDNS_CUSTOM_NAME, COREDNS_NAME, COREFILE_KEY, MESH_DOMAIN, RESTART_ANNOTATION,
    SYSTEM_NAMESPACE,
};
use crate::corefile;
use crate::discovery;
use crate::errors::DnsError;
use crate::version::{coredns_version, directive_for, Directive};

/// Where the mesh block lands for this cluster, decided once per call.
enum PatchTarget {
    /// Append between markers in the Corefile of the `coredns` ConfigMap
    Inline,
    /// Store under `<domain>.server` in the `coredns-custom` ConfigMap
    Custom(ConfigMap),
}

/// Installs the mesh forwarding block into CoreDNS.
///
/// Fetches the CoreDNS deployment to pick the directive its release
/// understands, resolves the mesh DNS service address, patches the
/// appropriate target ConfigMap, and rolls the deployment iff the stored
/// configuration actually changed.
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
/// Returns [`DnsError::MissingResource`] when the CoreDNS deployment, the
/// `coredns` ConfigMap, or the mesh DNS service is absent;
/// [`DnsError::UnsupportedVersion`] when the deployment runs a CoreDNS
/// release this controller cannot patch; [`DnsError::Api`] when a cluster
/// call fails.
pub async fn configure(
    client: &Client,
    mesh_namespace: &str,
    mesh_service: &str,
    dns_port: u16,
) -> Result<(), DnsError> {
    info!("Configuring CoreDNS for mesh domain '{}'", MESH_DOMAIN);

    let deployment_api: Api<Deployment> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);
    let deployment = deployment_api
        .get_opt(COREDNS_NAME)
        .await?
        .ok_or_else(|| DnsError::missing("Deployment", SYSTEM_NAMESPACE, COREDNS_NAME))?;

    let version = coredns_version(&deployment)?;
    let directive = directive_for(&version)?;
    debug!("CoreDNS {} uses the '{}' directive", version, directive);

    let address = discovery::dns_address(client, mesh_namespace, mesh_service, dns_port).await?;

    let cm_api: Api<ConfigMap> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);
    let corefile_cm = cm_api
        .get_opt(COREDNS_NAME)
        .await?
        .ok_or_else(|| DnsError::missing("ConfigMap", SYSTEM_NAMESPACE, COREDNS_NAME))?;

    let target = match cm_api.get_opt(COREDNS_CUSTOM_NAME).await? {
        Some(custom_cm) => PatchTarget::Custom(custom_cm),
        None => PatchTarget::Inline,
    };

    let applied = match target {
        PatchTarget::Inline => patch_inline(&cm_api, corefile_cm, &address, directive).await?,
        PatchTarget::Custom(custom_cm) => {
            patch_custom(&cm_api, corefile_cm, custom_cm, &address, directive).await?
        }
    };

    match applied {
        Some(content) => restart_deployment(&deployment_api, &content).await,
        None => {
            info!("CoreDNS configuration unchanged, deployment left alone");
            Ok(())
        }
    }
}

/// Removes the mesh forwarding block from CoreDNS.
///
/// Strips the inline block from the Corefile and drops the mesh entry
/// from the custom ConfigMap, leaving every other custom entry untouched.
/// Absent ConfigMaps count as already restored. The restart annotation is
/// left as-is; its presence only records that the cluster was configured
/// at some point.
///
/// # Errors
///
/// Returns [`DnsError::Api`] when a cluster call fails.
pub async fn restore(client: &Client) -> Result<(), DnsError> {
    info!("Restoring CoreDNS configuration");

    let cm_api: Api<ConfigMap> = Api::namespaced(client.clone(), SYSTEM_NAMESPACE);

    match cm_api.get_opt(COREDNS_NAME).await? {
        Some(mut corefile_cm) => {
            let current = corefile_text(&corefile_cm);
            let restored = corefile::restore(&current);

            if restored == current {
                debug!("Corefile carries no mesh block");
            } else {
                set_data_key(&mut corefile_cm, COREFILE_KEY, restored);
                cm_api
                    .replace(COREDNS_NAME, &PostParams::default(), &corefile_cm)
                    .await?;
                info!(
                    "Removed mesh block from ConfigMap {}/{}",
                    SYSTEM_NAMESPACE, COREDNS_NAME
                );
            }
        }
        None => warn!(
            "ConfigMap {}/{} not found, nothing to restore",
            SYSTEM_NAMESPACE, COREDNS_NAME
        ),
    }

    if let Some(mut custom_cm) = cm_api.get_opt(COREDNS_CUSTOM_NAME).await? {
        let entry_key = custom_entry_key();
        let removed = custom_cm
            .data
            .as_mut()
            .and_then(|data| data.remove(&entry_key));

        if removed.is_some() {
            cm_api
                .replace(COREDNS_CUSTOM_NAME, &PostParams::default(), &custom_cm)
                .await?;
            info!(
                "Removed '{}' from ConfigMap {}/{}",
                entry_key, SYSTEM_NAMESPACE, COREDNS_CUSTOM_NAME
            );
        }
    }

    Ok(())
}

/// Patches the Corefile in place.
///
/// The desired text is regenerated from the restored base so a stale
/// block (written for an older CoreDNS release or a previous service
/// address) is refreshed instead of kept. Returns the applied text when
/// a write happened.
async fn patch_inline(
    cm_api: &Api<ConfigMap>,
    mut corefile_cm: ConfigMap,
    address: &str,
    directive: Directive,
) -> Result<Option<String>, DnsError> {
    let current = corefile_text(&corefile_cm);
    let desired = corefile::patch(
        &corefile::restore(&current),
        MESH_DOMAIN,
        address,
        directive,
    );

    if desired == current {
        debug!("Corefile already carries the mesh block");
        return Ok(None);
    }

    set_data_key(&mut corefile_cm, COREFILE_KEY, desired.clone());
    cm_api
        .replace(COREDNS_NAME, &PostParams::default(), &corefile_cm)
        .await?;
    info!(
        "Patched Corefile in ConfigMap {}/{}",
        SYSTEM_NAMESPACE, COREDNS_NAME
    );

    Ok(Some(desired))
}

/// Writes the mesh block to the custom-config ConfigMap.
///
/// The entry is left untouched when its content already matches the
/// rendered block, whether the stored form carries markers or not. A
/// leftover inline patch from an earlier install is stripped from the
/// Corefile as part of the same call. Returns the applied configuration
/// when either ConfigMap was written.
async fn patch_custom(
    cm_api: &Api<ConfigMap>,
    mut corefile_cm: ConfigMap,
    mut custom_cm: ConfigMap,
    address: &str,
    directive: Directive,
) -> Result<Option<String>, DnsError> {
    let entry_key = custom_entry_key();
    let fragment = corefile::mesh_fragment(MESH_DOMAIN, address, directive);

    let entry_current = custom_cm
        .data
        .as_ref()
        .and_then(|data| data.get(&entry_key))
        .is_some_and(|existing| corefile::fragments_match(existing, &fragment));

    if entry_current {
        debug!("Custom entry '{}' already carries the mesh block", entry_key);
    } else {
        set_data_key(&mut custom_cm, &entry_key, fragment.clone());
        cm_api
            .replace(COREDNS_CUSTOM_NAME, &PostParams::default(), &custom_cm)
            .await?;
        info!(
            "Stored mesh block under '{}' in ConfigMap {}/{}",
            entry_key, SYSTEM_NAMESPACE, COREDNS_CUSTOM_NAME
        );
    }

    // A cluster that grew a custom ConfigMap after the mesh was first
    // installed may still carry the inline patch.
    let current = corefile_text(&corefile_cm);
    let restored = corefile::restore(&current);
    let inline_stripped = restored != current;

    if inline_stripped {
        set_data_key(&mut corefile_cm, COREFILE_KEY, restored.clone());
        cm_api
            .replace(COREDNS_NAME, &PostParams::default(), &corefile_cm)
            .await?;
        info!(
            "Removed stale inline mesh block from ConfigMap {}/{}",
            SYSTEM_NAMESPACE, COREDNS_NAME
        );
    }

    if entry_current && !inline_stripped {
        return Ok(None);
    }

    Ok(Some(format!("{restored}{fragment}")))
}

/// Rolls the CoreDNS deployment by stamping its pod template with a hash
/// of the applied configuration.
async fn restart_deployment(
    deployment_api: &Api<Deployment>,
    applied: &str,
) -> Result<(), DnsError> {
    let hash = format!("{:x}", Sha256::digest(applied.as_bytes()));

    let patch = json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTART_ANNOTATION: hash
                    }
                }
            }
        }
    });

    deployment_api
        .patch(COREDNS_NAME, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    info!(
        "Triggered rollout of Deployment {}/{}",
        SYSTEM_NAMESPACE, COREDNS_NAME
    );

    Ok(())
}

/// ConfigMap data key the custom variant stores the mesh block under.
fn custom_entry_key() -> String {
    format!("{MESH_DOMAIN}.server")
}

/// Current Corefile text, empty when the field is missing.
fn corefile_text(corefile_cm: &ConfigMap) -> String {
    corefile_cm
        .data
        .as_ref()
        .and_then(|data| data.get(COREFILE_KEY))
        .cloned()
        .unwrap_or_default()
}

/// Sets one data field, creating the data map if the ConfigMap had none.
fn set_data_key(config_map: &mut ConfigMap, key: &str, value: String) {
    config_map
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value);
}
