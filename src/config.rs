use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::EeError;

pub const CONFIG_FILE: &str = "eeview.json";
pub const TOKEN_ENV: &str = "EARTHENGINE_TOKEN";
pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com";
pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://cloudresourcemanager.googleapis.com";
pub const DEFAULT_SERVICE_USAGE_URL: &str = "https://serviceusage.googleapis.com";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub resource_manager_url: Option<String>,
    #[serde(default)]
    pub service_usage_url: Option<String>,
    #[serde(default)]
    pub chart_colors: Option<Vec<String>>,
}

/// Stored credentials file; only the access token is passed through.
#[derive(Debug, Deserialize)]
struct StoredCredentials {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub project: Option<String>,
    pub token: Option<String>,
    pub api_url: String,
    pub resource_manager_url: String,
    pub service_usage_url: String,
    pub chart_colors: Option<Vec<String>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            project: None,
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            resource_manager_url: DEFAULT_RESOURCE_MANAGER_URL.to_string(),
            service_usage_url: DEFAULT_SERVICE_USAGE_URL.to_string(),
            chart_colors: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path`, else `eeview.json` in the working directory, else the
    /// platform config directory, else defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, EeError> {
        let env_token = std::env::var(TOKEN_ENV).ok();
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_locations().into_iter().find(|p| p.exists()),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| EeError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| EeError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        Self::resolve_config(config, env_token)
    }

    pub fn resolve_config(
        config: Config,
        env_token: Option<String>,
    ) -> Result<ResolvedConfig, EeError> {
        let token = match env_token.filter(|token| !token.trim().is_empty()) {
            Some(token) => Some(token),
            None => match config.token.filter(|token| !token.trim().is_empty()) {
                Some(token) => Some(token),
                None => match &config.credentials_path {
                    Some(path) => read_access_token(Path::new(path))?,
                    None => None,
                },
            },
        };

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            project: config.project.filter(|project| !project.trim().is_empty()),
            token: token.map(|token| token.trim().to_string()),
            api_url: config.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            resource_manager_url: config
                .resource_manager_url
                .unwrap_or_else(|| DEFAULT_RESOURCE_MANAGER_URL.to_string()),
            service_usage_url: config
                .service_usage_url
                .unwrap_or_else(|| DEFAULT_SERVICE_USAGE_URL.to_string()),
            chart_colors: config.chart_colors.filter(|colors| !colors.is_empty()),
        })
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dirs) = ProjectDirs::from("org", "eeview", "eeview") {
            locations.push(dirs.config_dir().join(CONFIG_FILE));
        }
        locations
    }
}

fn read_access_token(path: &Path) -> Result<Option<String>, EeError> {
    let content = fs::read_to_string(path).map_err(|_| EeError::ConfigRead(path.to_path_buf()))?;
    let credentials: StoredCredentials =
        serde_json::from_str(&content).map_err(|err| EeError::ConfigParse(err.to_string()))?;
    Ok(credentials
        .access_token
        .filter(|token| !token.trim().is_empty()))
}
