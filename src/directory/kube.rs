//! # Kubernetes node lister.
//!
//! [`KubeNodeLister`] turns `GET {api}/api/v1/nodes/` into a target list:
//! - `Hostname` address → target name
//! - `InternalIP` address + kubelet port → target address
//!
//! Probing the kubelet port with a bare handshake is enough to tell whether a
//! node is reachable from here, which is all the runtime measures.
//!
//! ## Failure mapping
//! ```text
//! transport error ─► ListError::Request
//! status != 200   ─► ListError::Status
//! bad JSON        ─► ListError::Decode
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::directory::{Target, TargetLister};
use crate::error::{ListError, RuntimeError};

/// Settings for [`KubeNodeLister`].
#[derive(Clone, Debug)]
pub struct KubeSettings {
    /// API server base URL, e.g. `https://10.0.0.1:6443`.
    pub api: String,
    /// Bearer token sent with every request.
    pub token: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Per-request timeout (`0s` = none).
    pub timeout: Duration,
}

/// Lists cluster nodes from a Kubernetes API server.
pub struct KubeNodeLister {
    client: Client,
    url: Url,
    token: String,
}

impl KubeNodeLister {
    /// Builds the lister.
    ///
    /// Fails with [`RuntimeError::InvalidEndpoint`] if `api` is not a URL and
    /// with [`RuntimeError::HttpClient`] if the client cannot be constructed.
    pub fn new(settings: KubeSettings) -> Result<Self, RuntimeError> {
        let url = nodes_url(&settings.api)?;

        let mut builder = Client::builder().danger_accept_invalid_certs(settings.insecure);
        if settings.timeout > Duration::ZERO {
            builder = builder.timeout(settings.timeout);
        }
        let client = builder.build().map_err(|e| RuntimeError::HttpClient {
            error: e.to_string(),
        })?;

        Ok(Self {
            client,
            url,
            token: settings.token,
        })
    }

    /// Nodes endpoint this lister queries.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TargetLister for KubeNodeLister {
    async fn list(&self) -> Result<Vec<Target>, ListError> {
        let response = self
            .client
            .get(self.url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ListError::Request {
                error: e.to_string(),
            })?;

        if response.status() != StatusCode::OK {
            return Err(ListError::Status {
                status: response.status().as_u16(),
            });
        }

        let nodes = response
            .json::<NodeList>()
            .await
            .map_err(|e| ListError::Decode {
                error: e.to_string(),
            })?;

        Ok(nodes.into_targets())
    }

    fn name(&self) -> &'static str {
        "kube-nodes"
    }
}

fn nodes_url(api: &str) -> Result<Url, RuntimeError> {
    let raw = format!("{}/api/v1/nodes/", api.trim_end_matches('/'));
    let url = Url::parse(&raw).map_err(|e| RuntimeError::InvalidEndpoint {
        endpoint: api.to_string(),
        error: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RuntimeError::InvalidEndpoint {
            endpoint: api.to_string(),
            error: format!("unsupported scheme {other:?}"),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Debug, Default, Deserialize)]
struct Node {
    #[serde(default)]
    status: NodeStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeStatus {
    #[serde(default)]
    addresses: Vec<NodeAddress>,
    #[serde(default)]
    daemon_endpoints: DaemonEndpoints,
}

#[derive(Debug, Deserialize)]
struct NodeAddress {
    #[serde(rename = "type")]
    kind: String,
    address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DaemonEndpoints {
    #[serde(default)]
    kubelet_endpoint: KubeletEndpoint,
}

#[derive(Debug, Default, Deserialize)]
struct KubeletEndpoint {
    #[serde(rename = "Port", default)]
    port: u16,
}

impl NodeList {
    fn into_targets(self) -> Vec<Target> {
        self.items.into_iter().filter_map(Node::into_target).collect()
    }
}

impl Node {
    fn into_target(self) -> Option<Target> {
        let port = self.status.daemon_endpoints.kubelet_endpoint.port;
        let mut name = None;
        let mut address = None;

        for addr in self.status.addresses {
            match addr.kind.as_str() {
                "Hostname" => name = Some(addr.address),
                "InternalIP" => address = Some(format!("{}:{port}", addr.address)),
                other => tracing::debug!(kind = other, "ignoring node address type"),
            }
        }

        match (name, address) {
            (Some(name), Some(address)) => Some(Target::new(name, address)),
            (name, _) => {
                tracing::warn!(node = ?name, "skipping node without hostname or internal address");
                None
            }
        }
    }
}
