use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EeError {
    #[error("invalid asset id: {0}")]
    InvalidAssetId(String),

    #[error("unknown asset type: {0}")]
    UnknownAssetKind(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("asset already exists: {0}")]
    AssetExists(String),

    #[error("folder is not empty: {0}")]
    FolderNotEmpty(String),

    #[error("parent folder must be an absolute asset path, got: {0}")]
    #[diagnostic(help("new folders can only be created inside a project, e.g. projects/<id>/assets"))]
    RelativeParent(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid folder name: {0}")]
    InvalidFolderName(String),

    #[error("another operation is already in progress")]
    Busy,

    #[error("no action is waiting for confirmation")]
    NoPendingAction,

    #[error("remote request failed: {0}")]
    RemoteHttp(String),

    #[error("remote returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("remote rejected the operation: {0}")]
    RemoteRejected(String),

    #[error("missing credentials: set EARTHENGINE_TOKEN or configure a token")]
    MissingCredentials,

    #[error("a project is required for this command (set \"project\" in eeview.json)")]
    MissingProject,

    #[error("chart type {0} is not (yet?) supported")]
    UnsupportedChartKind(String),

    #[error("invalid chart data: {0}")]
    ChartData(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl EeError {
    /// Whether the error means the remote path vanished underneath us.
    pub fn is_stale_path(&self) -> bool {
        matches!(
            self,
            EeError::AssetNotFound(_) | EeError::RemoteStatus { status: 404, .. }
        )
    }
}
