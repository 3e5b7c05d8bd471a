use clap::{Parser, ValueEnum};

use crate::api::DEFAULT_BASE_URL;
use crate::core::error::RcaError;
use crate::core::trigger::JobRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UiMode {
    /// Line-oriented output, works in any terminal.
    Console,
    /// Full-screen interactive view.
    Tui,
}

/// Trigger a Komodor root-cause analysis from K9s and follow it live.
#[derive(Debug, Clone, Parser)]
#[command(name = "k9s-rca", version, about = "K9s Komodor RCA Plugin")]
pub struct Args {
    /// Kubernetes resource kind (Pod, Deployment, Service, etc.)
    #[arg(long, env = "KIND")]
    pub kind: Option<String>,

    /// Kubernetes namespace
    #[arg(long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Kubernetes resource name
    #[arg(long, env = "NAME")]
    pub name: Option<String>,

    /// Komodor API key
    #[arg(long, env = "KOMODOR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Kubernetes cluster name as known locally
    #[arg(long, env = "KOMODOR_CLUSTER_NAME")]
    pub cluster: Option<String>,

    /// Komodor API base URL
    #[arg(long, env = "KOMODOR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Poll for RCA completion
    #[arg(long)]
    pub poll: bool,

    /// Trigger only and exit, unless --poll is also given
    #[arg(long)]
    pub background: bool,

    /// How to render progress
    #[arg(long, env = "RCA_UI", value_enum, default_value_t = UiMode::Console)]
    pub ui: UiMode,

    /// Echo log lines to stdout as well as the log file
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated run configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub cluster: String,
    pub base_url: String,
    pub namespace: String,
    pub name: String,
    pub kind: String,
    pub monitor: bool,
    pub ui: UiMode,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cluster", &self.cluster)
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("monitor", &self.monitor)
            .field("ui", &self.ui)
            .finish_non_exhaustive()
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, RcaError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RcaError::Config(message.to_string()))
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, RcaError> {
        let api_key = required(args.api_key, "KOMODOR_API_KEY environment variable is required")?;
        let cluster = required(
            args.cluster,
            "KOMODOR_CLUSTER_NAME environment variable is required",
        )?;
        let namespace = required(args.namespace, "namespace is required (use --namespace flag)")?;
        let name = required(args.name, "name is required (use --name flag)")?;
        let kind = required(args.kind, "kind is required (use --kind flag)")?;

        let base_url = match args.base_url.trim() {
            "" => DEFAULT_BASE_URL.to_string(),
            url => url.to_string(),
        };
        url::Url::parse(&base_url)
            .map_err(|e| RcaError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            api_key,
            cluster,
            base_url,
            namespace,
            name,
            kind,
            monitor: args.poll || !args.background,
            ui: args.ui,
        })
    }

    pub fn job_request(&self, remote_cluster: &str) -> JobRequest {
        JobRequest {
            namespace: self.namespace.clone(),
            resource_name: self.name.clone(),
            resource_kind: self.kind.clone(),
            cluster_name: remote_cluster.to_string(),
        }
    }
}
