use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;

use crate::config::ResolvedConfig;
use crate::domain::{Asset, AssetId, AssetKind};
use crate::error::EeError;
use crate::namespace::RemoteNamespace;
use crate::tasks::{Operation, TaskClient};

const EARTH_ENGINE_SERVICE: &str = "earthengine.googleapis.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EeAsset {
    #[serde(rename = "type")]
    asset_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAssetsResponse {
    #[serde(default)]
    assets: Vec<EeAsset>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchProjectsResponse {
    #[serde(default)]
    projects: Vec<CloudProject>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudProject {
    project_id: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceState {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListOperationsResponse {
    #[serde(default)]
    operations: Vec<Operation>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Blocking client for the Earth Engine REST API.
#[derive(Clone)]
pub struct EarthEngineClient {
    client: Client,
    api_url: String,
    resource_manager_url: String,
    service_usage_url: String,
    project: Option<String>,
}

impl EarthEngineClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, EeError> {
        let token = config.token.as_deref().ok_or(EeError::MissingCredentials)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("eeview/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EeError::RemoteHttp(err.to_string()))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| EeError::MissingCredentials)?,
        );
        if let Some(project) = &config.project {
            headers.insert(
                "x-goog-user-project",
                HeaderValue::from_str(project)
                    .map_err(|err| EeError::RemoteHttp(err.to_string()))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EeError::RemoteHttp(err.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            resource_manager_url: config.resource_manager_url.trim_end_matches('/').to_string(),
            service_usage_url: config.service_usage_url.trim_end_matches('/').to_string(),
            project: config.project.clone(),
        })
    }

    fn asset_url(&self, id: &AssetId) -> String {
        format!("{}/v1/{}", self.api_url, id.as_str())
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, EeError> {
        let response = request
            .send()
            .map_err(|err| EeError::RemoteHttp(err.to_string()))?;
        handle_status(response)
    }

    fn get_asset(&self, id: &AssetId) -> Result<EeAsset, EeError> {
        tracing::debug!(asset = %id, "getAsset");
        let response = self.send(self.client.get(self.asset_url(id)))?;
        response
            .json::<EeAsset>()
            .map_err(|err| EeError::RemoteHttp(err.to_string()))
    }

    fn list_assets(&self, parent: &AssetId) -> Result<Vec<EeAsset>, EeError> {
        tracing::debug!(asset = %parent, "listAssets");
        let url = format!("{}:listAssets", self.asset_url(parent));
        let mut assets = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListAssetsResponse = self
                .send(request)?
                .json()
                .map_err(|err| EeError::RemoteHttp(err.to_string()))?;
            assets.extend(page.assets);
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(assets)
    }

    fn create_folder(&self, id: &AssetId) -> Result<(), EeError> {
        let project = id
            .project_id()
            .ok_or_else(|| EeError::RelativeParent(id.to_string()))?;
        tracing::debug!(asset = %id, "createAsset");
        let url = format!("{}/v1/projects/{project}/assets", self.api_url);
        self.send(
            self.client
                .post(url)
                .query(&[("assetId", id.relative_path())])
                .json(&json!({ "type": "FOLDER" })),
        )?;
        Ok(())
    }

    fn move_leaf(&self, path: &AssetId, destination: &AssetId) -> Result<(), EeError> {
        tracing::debug!(asset = %path, destination = %destination, "moveAsset");
        let url = format!("{}:move", self.asset_url(path));
        self.send(
            self.client
                .post(url)
                .json(&json!({ "destinationName": destination.as_str() })),
        )?;
        Ok(())
    }

    fn has_capability(&self, project_id: &str) -> Result<bool, EeError> {
        let url = format!(
            "{}/v1/projects/{project_id}/services/{EARTH_ENGINE_SERVICE}",
            self.service_usage_url
        );
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| EeError::RemoteHttp(err.to_string()))?;
        // projects the caller cannot inspect are simply not listed
        if matches!(response.status(), StatusCode::FORBIDDEN | StatusCode::NOT_FOUND) {
            return Ok(false);
        }
        let service: ServiceState = handle_status(response)?
            .json()
            .map_err(|err| EeError::RemoteHttp(err.to_string()))?;
        Ok(service.state.as_deref() == Some("ENABLED"))
    }
}

impl RemoteNamespace for EarthEngineClient {
    fn exists(&self, path: &AssetId) -> Result<bool, EeError> {
        if path.is_root() {
            return Ok(true);
        }
        match self.get_asset(path) {
            Ok(_) => Ok(true),
            Err(err) if err.is_stale_path() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn kind(&self, path: &AssetId) -> Result<AssetKind, EeError> {
        if path.is_root() {
            return Ok(AssetKind::Root);
        }
        if path.is_project_root() {
            self.get_asset(path)?;
            return Ok(AssetKind::Project);
        }
        self.get_asset(path)?.asset_type.parse()
    }

    fn iterdir(&self, path: &AssetId, recursive: bool) -> Result<Vec<AssetId>, EeError> {
        if path.is_root() {
            return self
                .list_projects_with_capability()?
                .iter()
                .map(|project| AssetId::project(project))
                .collect();
        }
        let mut items = Vec::new();
        let mut pending = vec![path.clone()];
        while let Some(folder) = pending.pop() {
            for asset in self.list_assets(&folder)? {
                let Ok(id) = asset.name.parse::<AssetId>() else {
                    tracing::warn!(name = %asset.name, "unparseable asset name, skipped");
                    continue;
                };
                let browsable = asset
                    .asset_type
                    .parse::<AssetKind>()
                    .map(AssetKind::is_browsable)
                    .unwrap_or(false);
                if recursive && browsable {
                    pending.push(id.clone());
                }
                items.push(id);
            }
        }
        Ok(items)
    }

    fn list_entries(&self, path: &AssetId) -> Result<Vec<Asset>, EeError> {
        let mut entries = Vec::new();
        for asset in self.list_assets(path)? {
            match (asset.name.parse::<AssetId>(), asset.asset_type.parse::<AssetKind>()) {
                (Ok(id), Ok(kind)) => entries.push(Asset::new(id, kind)),
                _ => tracing::warn!(
                    name = %asset.name,
                    kind = %asset.asset_type,
                    "unsupported asset, skipped"
                ),
            }
        }
        Ok(entries)
    }

    fn delete(&self, path: &AssetId) -> Result<(), EeError> {
        tracing::debug!(asset = %path, "deleteAsset");
        self.send(self.client.delete(self.asset_url(path)))?;
        Ok(())
    }

    fn rmdir(&self, path: &AssetId, recursive: bool) -> Result<(), EeError> {
        if recursive {
            let mut descendants = self.iterdir(path, true)?;
            // deepest first so every folder is empty when its turn comes
            descendants.sort_by_key(|id| std::cmp::Reverse(id.as_str().matches('/').count()));
            for id in descendants {
                self.delete(&id)?;
            }
        }
        self.delete(path)
    }

    fn move_asset(&self, path: &AssetId, destination: &AssetId) -> Result<(), EeError> {
        if self.exists(destination)? {
            return Err(EeError::AssetExists(destination.to_string()));
        }
        if !self.kind(path)?.is_browsable() {
            return self.move_leaf(path, destination);
        }
        // folders cannot be moved server side: rebuild the tree then drop the source
        self.mkdir(destination, false, false)?;
        for child in self.list_entries(path)? {
            let Some(target) = child.id.rebase(path, destination) else {
                continue;
            };
            self.move_asset(&child.id, &target)?;
        }
        self.delete(path)
    }

    fn mkdir(&self, path: &AssetId, parents: bool, exist_ok: bool) -> Result<(), EeError> {
        if path.is_root() || path.is_project_root() {
            return Err(EeError::RelativeParent(path.to_string()));
        }
        if self.exists(path)? {
            if exist_ok && self.kind(path)?.is_browsable() {
                return Ok(());
            }
            return Err(EeError::AssetExists(path.to_string()));
        }
        if parents {
            let mut missing = Vec::new();
            for ancestor in path.ancestors() {
                if ancestor.is_root() || ancestor.is_project_root() || self.exists(&ancestor)? {
                    break;
                }
                missing.push(ancestor);
            }
            for ancestor in missing.into_iter().rev() {
                self.create_folder(&ancestor)?;
            }
        }
        self.create_folder(path)
    }

    fn list_projects_with_capability(&self) -> Result<Vec<String>, EeError> {
        let url = format!("{}/v3/projects:search", self.resource_manager_url);
        let mut projects = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: SearchProjectsResponse = self
                .send(request)?
                .json()
                .map_err(|err| EeError::RemoteHttp(err.to_string()))?;
            projects.extend(
                page.projects
                    .into_iter()
                    .filter(|project| project.state.as_deref().unwrap_or("ACTIVE") == "ACTIVE"),
            );
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let mut enabled = Vec::new();
        for project in projects {
            if self.has_capability(&project.project_id)? {
                enabled.push(project.project_id);
            }
        }
        Ok(enabled)
    }
}

impl TaskClient for EarthEngineClient {
    fn list_operations(&self) -> Result<Vec<Operation>, EeError> {
        let project = self.project.as_deref().ok_or(EeError::MissingProject)?;
        let url = format!("{}/v1/projects/{project}/operations", self.api_url);
        let mut operations = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(&url);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListOperationsResponse = self
                .send(request)?
                .json()
                .map_err(|err| EeError::RemoteHttp(err.to_string()))?;
            operations.extend(page.operations);
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(operations)
    }
}

fn handle_status(response: Response) -> Result<Response, EeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    let message = response
        .text()
        .ok()
        .and_then(|body| extract_error_message(&body))
        .unwrap_or_else(|| "Earth Engine request failed".to_string());
    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::FORBIDDEN => {
            Err(EeError::RemoteRejected(message))
        }
        _ => Err(EeError::RemoteStatus {
            status: code,
            message,
        }),
    }
}

/// Pull `error.message` out of a Google API error body.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
        .map(|message| message.to_string())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_body() {
        let body = r#"{"error":{"code":400,"message":"Asset already exists.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Asset already exists.")
        );
    }

    #[test]
    fn plain_text_error_body() {
        assert_eq!(
            extract_error_message(" upstream timeout\n").as_deref(),
            Some("upstream timeout")
        );
        assert!(extract_error_message("").is_none());
    }

    #[test]
    fn list_assets_payload() {
        let body = r#"{"assets":[{"type":"IMAGE","name":"projects/p/assets/img","id":"projects/p/assets/img"}],"nextPageToken":""}"#;
        let page: ListAssetsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.assets.len(), 1);
        assert_eq!(page.assets[0].asset_type, "IMAGE");
        assert_eq!(page.next_page_token.as_deref(), Some(""));
    }

    #[test]
    fn missing_token_is_reported() {
        let config = ResolvedConfig::default();
        let err = EarthEngineClient::new(&config).err().unwrap();
        assert!(matches!(err, EeError::MissingCredentials));
    }
}
