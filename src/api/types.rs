use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treats an explicit JSON `null` the same as an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of the trigger call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub namespace: String,
    pub name: String,
    pub kind: String,
    pub cluster_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub session_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, deserialize_with = "nullable")]
    pub query: String,
    #[serde(default, deserialize_with = "nullable")]
    pub snippet: String,
}

/// Everything one successful poll reports about a session.
///
/// Decoded in a single pass: known fields land in typed members, anything
/// else the backend sends is kept in `extra` so newer API fields can still be
/// surfaced to the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "WireSnapshot")]
pub struct JobSnapshot {
    pub session_id: String,
    pub is_complete: bool,
    pub is_failed: bool,
    pub is_stuck: bool,
    pub problem_summary: String,
    pub recommendation: String,
    pub timeline: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub operations_log: Vec<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Stuck,
    Failed,
    Complete,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::InProgress => "⏳ In Progress",
            JobStatus::Stuck => "⚠️  Stuck",
            JobStatus::Failed => "❌ Failed",
            JobStatus::Complete => "✅ Complete",
        }
    }
}

impl JobSnapshot {
    /// Placeholder shown before the first poll returns.
    pub fn pending(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            ..Self::default()
        }
    }

    /// Fields outside the typed model, as `(name, text)` pairs in key order.
    /// String values are shown bare, everything else as compact JSON.
    pub fn extra_fields(&self) -> Vec<(&str, String)> {
        self.extra
            .iter()
            .map(|(key, value)| {
                let shown = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.as_str(), shown)
            })
            .collect()
    }

    pub fn status(&self) -> JobStatus {
        if self.is_complete {
            JobStatus::Complete
        } else if self.is_failed {
            JobStatus::Failed
        } else if self.is_stuck {
            JobStatus::Stuck
        } else {
            JobStatus::InProgress
        }
    }
}

// The backend has shipped two evidence shapes: a flat `evidenceQueries` list
// and structured `evidenceCollection` entries. Both are accepted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSnapshot {
    #[serde(default, deserialize_with = "nullable")]
    session_id: String,
    #[serde(default, deserialize_with = "nullable")]
    is_complete: bool,
    #[serde(default, deserialize_with = "nullable")]
    is_failed: bool,
    #[serde(default, deserialize_with = "nullable")]
    is_stuck: bool,
    #[serde(default, deserialize_with = "nullable")]
    problem_short: String,
    #[serde(default, deserialize_with = "nullable")]
    recommendation: String,
    #[serde(default, deserialize_with = "nullable")]
    what_happened: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    evidence_collection: Vec<Evidence>,
    #[serde(default, deserialize_with = "nullable")]
    evidence_queries: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    operations: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireSnapshot> for JobSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        let evidence = if !wire.evidence_collection.is_empty() {
            wire.evidence_collection
        } else {
            wire.evidence_queries
                .into_iter()
                .map(|query| Evidence {
                    query,
                    snippet: String::new(),
                })
                .collect()
        };

        Self {
            session_id: wire.session_id,
            is_complete: wire.is_complete,
            is_failed: wire.is_failed,
            is_stuck: wire.is_stuck,
            problem_summary: wire.problem_short,
            recommendation: wire.recommendation,
            timeline: wire.what_happened,
            evidence,
            operations_log: wire.operations,
            extra: wire.extra,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KomodorCluster {
    #[serde(default, deserialize_with = "nullable")]
    pub api_server_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cluster_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClustersResponse {
    #[serde(default)]
    pub data: ClustersData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClustersData {
    #[serde(default, deserialize_with = "nullable")]
    pub clusters: Vec<KomodorCluster>,
}
