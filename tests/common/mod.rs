// Common test utilities for integration tests

#![allow(dead_code)]

use kube::{Client, Config};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// ============================================================================
// Corefile Fixtures
// ============================================================================

/// Stock CoreDNS Corefile as shipped by kubeadm, untouched by the mesh.
pub const BASE_COREFILE: &str = r#".:53 {
    errors
    health {
        lameduck 5s
    }
    ready
    kubernetes {{ pillar['dns_domain'] }} in-addr.arpa ip6.arpa {
        pods insecure
        fallthrough in-addr.arpa ip6.arpa
        ttl 30
    }
    prometheus :9153
    forward . /etc/resolv.conf
    cache 30
    loop
    reload
    loadbalance
}
"#;

/// The same Corefile after the mesh block has been appended.
pub const PATCHED_COREFILE: &str = r#".:53 {
    errors
    health {
        lameduck 5s
    }
    ready
    kubernetes {{ pillar['dns_domain'] }} in-addr.arpa ip6.arpa {
        pods insecure
        fallthrough in-addr.arpa ip6.arpa
        ttl 30
    }
    prometheus :9153
    forward . /etc/resolv.conf
    cache 30
    loop
    reload
    loadbalance
}

#### Begin Traefik Mesh Block
traefik.mesh:53 {
    errors
    cache 30
    forward . 10.10.10.10:53
}
#### End Traefik Mesh Block
"#;

/// Corefile of a CoreDNS release before 1.4, which used `proxy`.
pub const BASE_COREFILE_LEGACY: &str = r#".:53 {
    errors
    health {
        lameduck 5s
    }
    ready
    kubernetes {{ pillar['dns_domain'] }} in-addr.arpa ip6.arpa {
        pods insecure
        fallthrough in-addr.arpa ip6.arpa
        ttl 30
    }
    prometheus :9153
    proxy . /etc/resolv.conf
    cache 30
    loop
    reload
    loadbalance
}
"#;

/// The legacy Corefile after patching; the mesh block uses `proxy` too.
pub const PATCHED_COREFILE_LEGACY: &str = r#".:53 {
    errors
    health {
        lameduck 5s
    }
    ready
    kubernetes {{ pillar['dns_domain'] }} in-addr.arpa ip6.arpa {
        pods insecure
        fallthrough in-addr.arpa ip6.arpa
        ttl 30
    }
    prometheus :9153
    proxy . /etc/resolv.conf
    cache 30
    loop
    reload
    loadbalance
}

#### Begin Traefik Mesh Block
traefik.mesh:53 {
    errors
    cache 30
    proxy . 10.10.10.10:53
}
#### End Traefik Mesh Block
"#;

/// Mesh block as stored under `traefik.mesh.server` in `coredns-custom`.
pub const MESH_CUSTOM_ENTRY: &str = "
#### Begin Traefik Mesh Block
traefik.mesh:53 {
    errors
    cache 30
    forward . 10.10.10.10:53
}
#### End Traefik Mesh Block
";

/// The same entry rendered for a pre-1.4 release.
pub const MESH_CUSTOM_ENTRY_LEGACY: &str = "
#### Begin Traefik Mesh Block
traefik.mesh:53 {
    errors
    cache 30
    proxy . 10.10.10.10:53
}
#### End Traefik Mesh Block
";

// ============================================================================
// API Server Paths
// ============================================================================

pub const CONFIG_MAPS_PATH: &str = "/api/v1/namespaces/kube-system/configmaps";

pub fn deployment_path(name: &str) -> String {
    format!("/apis/apps/v1/namespaces/kube-system/deployments/{name}")
}

pub fn config_map_path(name: &str) -> String {
    format!("{CONFIG_MAPS_PATH}/{name}")
}

pub fn service_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{namespace}/services/{name}")
}

// ============================================================================
// Resource Fixtures
// ============================================================================

/// Minimal `coredns` Deployment running the given image.
pub fn coredns_deployment(image: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": "coredns",
            "namespace": "kube-system"
        },
        "spec": {
            "selector": {
                "matchLabels": { "k8s-app": "kube-dns" }
            },
            "template": {
                "metadata": {
                    "labels": { "k8s-app": "kube-dns" }
                },
                "spec": {
                    "containers": [
                        { "name": "coredns", "image": image }
                    ]
                }
            }
        }
    })
}

/// Minimal `kube-dns` Deployment.
pub fn kube_dns_deployment() -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": "kube-dns",
            "namespace": "kube-system"
        },
        "spec": {
            "selector": {
                "matchLabels": { "k8s-app": "kube-dns" }
            },
            "template": {
                "metadata": {
                    "labels": { "k8s-app": "kube-dns" }
                },
                "spec": {
                    "containers": [
                        {
                            "name": "kubedns",
                            "image": "registry.k8s.io/k8s-dns-kube-dns:1.14.13"
                        }
                    ]
                }
            }
        }
    })
}

/// ConfigMap in `kube-system` with the given data fields.
pub fn config_map(name: &str, data: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "namespace": "kube-system"
        },
        "data": data
    })
}

/// Mesh DNS Service with an assigned cluster IP.
pub fn mesh_service(namespace: &str, name: &str, cluster_ip: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": namespace
        },
        "spec": {
            "clusterIP": cluster_ip,
            "ports": [
                { "port": 53, "protocol": "UDP" }
            ]
        }
    })
}

/// Kubernetes Status body for a 404 response.
pub fn not_found(kind: &str, name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Status",
        "status": "Failure",
        "message": format!("{kind} \"{name}\" not found"),
        "reason": "NotFound",
        "code": 404
    })
}

// ============================================================================
// Mock Server Helpers
// ============================================================================

/// Client wired to the mock API server instead of a real cluster.
pub fn mock_client(server: &MockServer) -> Client {
    let uri = server
        .uri()
        .parse::<http::Uri>()
        .expect("mock server URI parses");
    Client::try_from(Config::new(uri)).expect("client builds against the mock server")
}

/// Serves `body` for GET requests on `request_path`.
pub async fn mock_get(server: &MockServer, request_path: &str, body: &Value) {
    Mock::given(method("GET"))
        .and(path(request_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serves a Kubernetes 404 Status for GET requests on `request_path`.
///
/// Every absent resource a test scenario touches needs one of these: the
/// client reads a 404 as NotFound only from a `Status` body with
/// `reason: "NotFound"`, never from the bodyless default response for
/// unmatched routes.
pub async fn mock_get_not_found(server: &MockServer, request_path: &str, kind: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(request_path))
        .respond_with(ResponseTemplate::new(404).set_body_json(&not_found(kind, name)))
        .mount(server)
        .await;
}

/// Replies with the request body, the way the API server echoes back a
/// replaced or created object.
pub struct EchoBody;

impl Respond for EchoBody {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(request.body.clone(), "application/json")
    }
}

/// Accepts PUT requests on `request_path`, echoing the stored object.
pub async fn mock_replace(server: &MockServer, request_path: &str) {
    Mock::given(method("PUT"))
        .and(path(request_path))
        .respond_with(EchoBody)
        .mount(server)
        .await;
}

/// Accepts POST requests on `request_path`, echoing the created object.
pub async fn mock_create(server: &MockServer, request_path: &str) {
    Mock::given(method("POST"))
        .and(path(request_path))
        .respond_with(EchoBody)
        .mount(server)
        .await;
}

/// Accepts PATCH requests on `request_path`, answering with `body`.
pub async fn mock_patch(server: &MockServer, request_path: &str, body: &Value) {
    Mock::given(method("PATCH"))
        .and(path(request_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ============================================================================
// Request Inspection
// ============================================================================

/// Number of recorded requests matching the method and path.
pub async fn request_count(server: &MockServer, http_method: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|request| {
            request.method.as_str() == http_method && request.url.path() == request_path
        })
        .count()
}

/// Bodies of every recorded request matching the method and path, in
/// arrival order.
pub async fn request_bodies(
    server: &MockServer,
    http_method: &str,
    request_path: &str,
) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|request| {
            request.method.as_str() == http_method && request.url.path() == request_path
        })
        .map(|request| serde_json::from_slice(&request.body).expect("request body is JSON"))
        .collect()
}

/// Asserts that nothing was written to the cluster.
pub async fn assert_no_writes(server: &MockServer) {
    let writes: Vec<String> = server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|request| matches!(request.method.as_str(), "PUT" | "POST" | "PATCH"))
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect();

    assert!(writes.is_empty(), "Expected no write requests, got {writes:?}");
}
