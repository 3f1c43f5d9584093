use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EeError;

/// Sentinel id of the virtual root listing all accessible projects.
pub const ROOT: &str = ".";

static ASSET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^projects/([A-Za-z0-9._:\-]+)/assets(/[^/\s]+)*$").expect("valid asset id regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    Root,
    Project,
    Folder,
    Image,
    ImageCollection,
    Table,
    FeatureCollection,
}

impl AssetKind {
    /// Folders, projects and the root can be opened.
    pub fn is_browsable(self) -> bool {
        matches!(self, AssetKind::Root | AssetKind::Project | AssetKind::Folder)
    }

    /// Kinds that can be deleted or moved.
    pub fn is_operable(self) -> bool {
        matches!(
            self,
            AssetKind::Folder
                | AssetKind::Image
                | AssetKind::ImageCollection
                | AssetKind::Table
                | AssetKind::FeatureCollection
        )
    }

    pub fn icon(self) -> &'static str {
        match self {
            AssetKind::Root => "mdi-home",
            AssetKind::Project => "mdi-google-cloud",
            AssetKind::Folder => "mdi-folder",
            AssetKind::Image => "mdi-image-outline",
            AssetKind::ImageCollection => "mdi-image-multiple-outline",
            AssetKind::Table => "mdi-table",
            AssetKind::FeatureCollection => "mdi-vector-polygon",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Root => "ROOT",
            AssetKind::Project => "PROJECT",
            AssetKind::Folder => "FOLDER",
            AssetKind::Image => "IMAGE",
            AssetKind::ImageCollection => "IMAGE_COLLECTION",
            AssetKind::Table => "TABLE",
            AssetKind::FeatureCollection => "FEATURE_COLLECTION",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = EeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ROOT" => Ok(AssetKind::Root),
            "PROJECT" => Ok(AssetKind::Project),
            // buckets are browsed like folders
            "FOLDER" | "BUCKET" => Ok(AssetKind::Folder),
            "IMAGE" => Ok(AssetKind::Image),
            "IMAGE_COLLECTION" => Ok(AssetKind::ImageCollection),
            "TABLE" => Ok(AssetKind::Table),
            "FEATURE_COLLECTION" => Ok(AssetKind::FeatureCollection),
            _ => Err(EeError::UnknownAssetKind(value.to_string())),
        }
    }
}

/// Hierarchical identifier of a remote asset, or the virtual root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    /// Root folder of a cloud project.
    pub fn project(project_id: &str) -> Result<Self, EeError> {
        format!("projects/{project_id}/assets").parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT
    }

    /// `projects/<id>/assets` with no further segment.
    pub fn is_project_root(&self) -> bool {
        !self.is_root() && self.0.matches('/').count() == 2
    }

    /// True for every real remote path, false for the root sentinel.
    pub fn is_absolute(&self) -> bool {
        !self.is_root()
    }

    pub fn project_id(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.split('/').nth(1)
    }

    /// Path of the asset relative to its project root, empty for the root itself.
    pub fn relative_path(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.0
            .splitn(4, '/')
            .nth(3)
            .unwrap_or_default()
    }

    /// Last path segment; the project id for a project root.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return ROOT;
        }
        if self.is_project_root() {
            return self.project_id().unwrap_or(ROOT);
        }
        self.0.rsplit('/').next().unwrap_or(ROOT)
    }

    /// Logical parent: the root for a project root, the remote parent otherwise.
    pub fn parent(&self) -> Option<AssetId> {
        if self.is_root() {
            return None;
        }
        if self.is_project_root() {
            return Some(AssetId::root());
        }
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| AssetId(parent.to_string()))
    }

    /// Every ancestor from the direct parent up to the root.
    pub fn ancestors(&self) -> Vec<AssetId> {
        let mut items = Vec::new();
        let mut current = self.parent();
        while let Some(id) = current {
            current = id.parent();
            items.push(id);
        }
        items
    }

    pub fn join(&self, name: &str) -> Result<AssetId, EeError> {
        if self.is_root() {
            return Err(EeError::RelativeParent(self.0.clone()));
        }
        validate_segment(name)?;
        Ok(AssetId(format!("{}/{}", self.0, name.trim())))
    }

    /// Whether `self` is `other` or lives below it.
    pub fn starts_with(&self, other: &AssetId) -> bool {
        if other.is_root() {
            return true;
        }
        self.0 == other.0
            || (self.0.starts_with(other.as_str())
                && self.0.as_bytes().get(other.0.len()) == Some(&b'/'))
    }

    /// Rebase a descendant of `from` onto `to`.
    pub fn rebase(&self, from: &AssetId, to: &AssetId) -> Option<AssetId> {
        if !self.starts_with(from) || from.is_root() {
            return None;
        }
        let rest = &self.0[from.0.len()..];
        Some(AssetId(format!("{}{}", to.0, rest)))
    }
}

pub fn validate_segment(name: &str) -> Result<(), EeError> {
    let trimmed = name.trim();
    let is_valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains('/')
        && !trimmed.chars().any(char::is_whitespace);
    if !is_valid {
        return Err(EeError::InvalidFolderName(name.to_string()));
    }
    Ok(())
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = EeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_end_matches('/');
        if trimmed.is_empty() || trimmed == ROOT {
            return Ok(AssetId::root());
        }
        if !ASSET_ID.is_match(trimmed) {
            return Err(EeError::InvalidAssetId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for AssetId {
    type Error = EeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub name: String,
}

impl Asset {
    pub fn new(id: AssetId, kind: AssetKind) -> Self {
        let name = id.name().to_string();
        Self { id, kind, name }
    }

    pub fn root() -> Self {
        Self::new(AssetId::root(), AssetKind::Root)
    }
}
