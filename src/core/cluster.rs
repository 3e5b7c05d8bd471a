use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::RcaApi;
use crate::api::types::KomodorCluster;
use crate::core::error::RcaError;
use crate::core::paths;

/// Local cluster name to Komodor cluster name, as persisted in `clusters.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMapping {
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

/// Reads and writes the mapping file. A store without a path (no home
/// directory) behaves as permanently empty and refuses to save.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: Option<PathBuf>,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn default_location() -> Self {
        Self {
            path: paths::cluster_mapping_path(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Never fails. Anything unreadable degrades to an empty mapping.
    pub async fn load(&self) -> ClusterMapping {
        let Some(path) = &self.path else {
            return ClusterMapping::default();
        };

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ClusterMapping::default();
            }
            Err(e) => {
                warn!("Could not read cluster mapping {}: {}", path.display(), e);
                return ClusterMapping::default();
            }
        };

        if content.trim().is_empty() {
            return ClusterMapping::default();
        }

        match serde_yaml::from_str::<Option<ClusterMapping>>(&content) {
            Ok(mapping) => mapping.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring malformed cluster mapping {}: {}", path.display(), e);
                ClusterMapping::default()
            }
        }
    }

    /// Replaces the whole file via a temporary sibling and a rename.
    pub async fn save(&self, mapping: &ClusterMapping) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("failed to get home directory"))?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create config directory {}", dir.display()))?;
        }

        let data = serde_yaml::to_string(mapping).context("failed to marshal cluster mapping")?;
        let tmp = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Source of the local cluster's infrastructure UID.
#[async_trait]
pub trait ClusterUidSource: Send + Sync {
    async fn local_cluster_uid(&self) -> Result<String>;
}

/// Uses the UID of the `default` namespace of the current kube context.
#[derive(Debug, Clone, Default)]
pub struct KubectlUidSource;

#[async_trait]
impl ClusterUidSource for KubectlUidSource {
    async fn local_cluster_uid(&self) -> Result<String> {
        let output = tokio::process::Command::new("kubectl")
            .args(["get", "namespace", "default", "-o", "json"])
            .output()
            .await
            .context("failed to run kubectl")?;

        if !output.status.success() {
            return Err(anyhow!(
                "failed to get cluster UID: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let namespace: Value =
            serde_json::from_slice(&output.stdout).context("failed to parse kubectl output")?;
        namespace_uid(&namespace)
    }
}

fn namespace_uid(namespace: &Value) -> Result<String> {
    let metadata = namespace
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("invalid namespace metadata structure"))?;
    metadata
        .get("uid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cluster UID not found in namespace metadata"))
}

pub fn find_by_name<'a>(name: &str, clusters: &'a [KomodorCluster]) -> Option<&'a KomodorCluster> {
    clusters.iter().find(|c| c.name == name)
}

pub fn find_by_uid<'a>(uid: &str, clusters: &'a [KomodorCluster]) -> Option<&'a KomodorCluster> {
    clusters.iter().find(|c| !c.cluster_id.is_empty() && c.cluster_id == uid)
}

fn cluster_names(clusters: &[KomodorCluster]) -> String {
    clusters
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps the cluster name K9s knows to the name Komodor expects.
pub struct ClusterResolver<'a> {
    api: &'a dyn RcaApi,
    uid_source: &'a dyn ClusterUidSource,
    store: MappingStore,
}

impl<'a> ClusterResolver<'a> {
    pub fn new(
        api: &'a dyn RcaApi,
        uid_source: &'a dyn ClusterUidSource,
        store: MappingStore,
    ) -> Self {
        Self {
            api,
            uid_source,
            store,
        }
    }

    pub async fn resolve(&self, local_name: &str) -> Result<String, RcaError> {
        let mut mapping = self.store.load().await;

        if let Some(remote) = mapping.mapping.get(local_name) {
            info!(
                "Using mapped Komodor cluster '{}' for local cluster '{}'",
                remote, local_name
            );
            return Ok(remote.clone());
        }

        info!(
            "No mapping found for cluster '{}', fetching Komodor clusters",
            local_name
        );
        let clusters = self
            .api
            .list_clusters()
            .await
            .map_err(|e| RcaError::Resolution(e.context("failed to fetch Komodor clusters")))?;

        let mut matched = find_by_name(local_name, &clusters);
        if matched.is_none() {
            info!("No name match found, trying to match by cluster UID");
            match self.uid_source.local_cluster_uid().await {
                Ok(uid) => matched = find_by_uid(&uid, &clusters),
                Err(e) => warn!("Could not get local cluster UID: {:#}", e),
            }
        }

        let Some(cluster) = matched else {
            warn!("No matching Komodor cluster found for '{}'", local_name);
            return Err(RcaError::NoMatch {
                local: local_name.to_string(),
                available: cluster_names(&clusters),
                mapping_path: paths::display_mapping_path(),
            });
        };

        info!("Found matching Komodor cluster: '{}'", cluster.name);
        mapping
            .mapping
            .insert(local_name.to_string(), cluster.name.clone());
        match self.store.save(&mapping).await {
            Ok(()) => info!("Saved mapping: '{}' -> '{}'", local_name, cluster.name),
            Err(e) => warn!("Could not save cluster mapping: {:#}", e),
        }

        Ok(cluster.name.clone())
    }
}
