use std::path::PathBuf;

const DATA_DIR_NAME: &str = ".k9s-komodor-rca";
const LOG_FILE_NAME: &str = ".k9s_komodor_logs.txt";

/// Per-user configuration directory: `~/.k9s-komodor-rca`.
/// `None` when the home directory cannot be determined.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

pub fn cluster_mapping_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("clusters.yaml"))
}

pub fn env_file_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(".env"))
}

/// Append-only log file, kept in the home directory for K9s users to tail.
pub fn log_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

/// Human-readable mapping location for error messages.
pub fn display_mapping_path() -> String {
    format!("~/{}/clusters.yaml", DATA_DIR_NAME)
}
