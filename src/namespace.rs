use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use crate::domain::{Asset, AssetId, AssetKind};
use crate::error::EeError;

/// The remote asset store, passed explicitly to every component that needs it.
pub trait RemoteNamespace: Send + Sync {
    fn exists(&self, path: &AssetId) -> Result<bool, EeError>;
    fn kind(&self, path: &AssetId) -> Result<AssetKind, EeError>;
    /// Direct children, or every descendant when `recursive` is set.
    fn iterdir(&self, path: &AssetId, recursive: bool) -> Result<Vec<AssetId>, EeError>;
    fn delete(&self, path: &AssetId) -> Result<(), EeError>;
    fn rmdir(&self, path: &AssetId, recursive: bool) -> Result<(), EeError>;
    fn move_asset(&self, path: &AssetId, destination: &AssetId) -> Result<(), EeError>;
    fn mkdir(&self, path: &AssetId, parents: bool, exist_ok: bool) -> Result<(), EeError>;
    /// Ids of the accessible projects with Earth Engine enabled.
    fn list_projects_with_capability(&self) -> Result<Vec<String>, EeError>;

    fn is_project(&self, path: &AssetId) -> Result<bool, EeError> {
        Ok(path.is_project_root() && self.exists(path)?)
    }

    fn is_folder(&self, path: &AssetId) -> Result<bool, EeError> {
        Ok(self.kind(path)? == AssetKind::Folder)
    }

    fn parent(&self, path: &AssetId) -> AssetId {
        path.parent().unwrap_or_else(AssetId::root)
    }

    /// Direct children with their kind. Implementations that learn the kind
    /// while listing override this to skip the per-child query.
    fn list_entries(&self, path: &AssetId) -> Result<Vec<Asset>, EeError> {
        let mut entries = Vec::new();
        for child in self.iterdir(path, false)? {
            match self.kind(&child) {
                Ok(kind) => entries.push(Asset::new(child, kind)),
                Err(err) if err.is_stale_path() => {
                    tracing::warn!(asset = %child, "asset vanished while listing, skipped");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(entries)
    }
}

impl<T: RemoteNamespace + ?Sized> RemoteNamespace for &T {
    fn exists(&self, path: &AssetId) -> Result<bool, EeError> {
        (**self).exists(path)
    }
    fn kind(&self, path: &AssetId) -> Result<AssetKind, EeError> {
        (**self).kind(path)
    }
    fn iterdir(&self, path: &AssetId, recursive: bool) -> Result<Vec<AssetId>, EeError> {
        (**self).iterdir(path, recursive)
    }
    fn delete(&self, path: &AssetId) -> Result<(), EeError> {
        (**self).delete(path)
    }
    fn rmdir(&self, path: &AssetId, recursive: bool) -> Result<(), EeError> {
        (**self).rmdir(path, recursive)
    }
    fn move_asset(&self, path: &AssetId, destination: &AssetId) -> Result<(), EeError> {
        (**self).move_asset(path, destination)
    }
    fn mkdir(&self, path: &AssetId, parents: bool, exist_ok: bool) -> Result<(), EeError> {
        (**self).mkdir(path, parents, exist_ok)
    }
    fn list_projects_with_capability(&self) -> Result<Vec<String>, EeError> {
        (**self).list_projects_with_capability()
    }
    fn list_entries(&self, path: &AssetId) -> Result<Vec<Asset>, EeError> {
        (**self).list_entries(path)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    projects: BTreeMap<String, bool>,
    assets: BTreeMap<AssetId, AssetKind>,
    rejections: HashMap<AssetId, String>,
    calls: Vec<String>,
}

/// In-process namespace used by the demo browser and the tests.
#[derive(Debug, Default)]
pub struct MemoryNamespace {
    state: Mutex<MemoryState>,
}

impl MemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project; `enabled` is its Earth Engine capability.
    pub fn with_project(self, project_id: &str, enabled: bool) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.projects.insert(project_id.to_string(), enabled);
        }
        self
    }

    /// Register an asset and create its missing parent folders.
    pub fn with_asset(self, id: &str, kind: AssetKind) -> Self {
        if let Ok(id) = id.parse::<AssetId>() {
            if let Ok(mut state) = self.state.lock() {
                if let Some(project) = id.project_id() {
                    state.projects.entry(project.to_string()).or_insert(true);
                }
                for ancestor in id.ancestors() {
                    if ancestor.is_root() || ancestor.is_project_root() {
                        continue;
                    }
                    state.assets.entry(ancestor).or_insert(AssetKind::Folder);
                }
                state.assets.insert(id, kind);
            }
        }
        self
    }

    /// Make every mutation touching `id` fail with `message`.
    pub fn reject(&self, id: &AssetId, message: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.rejections.insert(id.clone(), message.to_string());
        }
    }

    /// Remove an asset without going through the public API, as another client would.
    pub fn remove_externally(&self, id: &AssetId) {
        if let Ok(mut state) = self.state.lock() {
            state.assets.retain(|asset, _| !asset.starts_with(id));
        }
    }

    /// Names of the mutating calls received so far, e.g. `delete projects/p/assets/a`.
    pub fn calls(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        let Ok(id) = id.parse::<AssetId>() else {
            return false;
        };
        self.exists(&id).unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, EeError> {
        self.state
            .lock()
            .map_err(|_| EeError::RemoteHttp("namespace lock poisoned".to_string()))
    }
}

impl MemoryState {
    fn exists(&self, path: &AssetId) -> bool {
        if path.is_root() {
            return true;
        }
        if path.is_project_root() {
            return path
                .project_id()
                .map(|id| self.projects.contains_key(id))
                .unwrap_or(false);
        }
        self.assets.contains_key(path)
    }

    fn kind(&self, path: &AssetId) -> Result<AssetKind, EeError> {
        if path.is_root() {
            return Ok(AssetKind::Root);
        }
        if path.is_project_root() {
            if self.exists(path) {
                return Ok(AssetKind::Project);
            }
            return Err(EeError::AssetNotFound(path.to_string()));
        }
        self.assets
            .get(path)
            .copied()
            .ok_or_else(|| EeError::AssetNotFound(path.to_string()))
    }

    fn descendants(&self, path: &AssetId) -> Vec<AssetId> {
        self.assets
            .keys()
            .filter(|id| *id != path && id.starts_with(path))
            .cloned()
            .collect()
    }

    fn check_rejection(&self, path: &AssetId) -> Result<(), EeError> {
        match self.rejections.get(path) {
            Some(message) => Err(EeError::RemoteRejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl RemoteNamespace for MemoryNamespace {
    fn exists(&self, path: &AssetId) -> Result<bool, EeError> {
        Ok(self.lock()?.exists(path))
    }

    fn kind(&self, path: &AssetId) -> Result<AssetKind, EeError> {
        self.lock()?.kind(path)
    }

    fn iterdir(&self, path: &AssetId, recursive: bool) -> Result<Vec<AssetId>, EeError> {
        let state = self.lock()?;
        if path.is_root() {
            let projects = state
                .projects
                .keys()
                .filter_map(|id| AssetId::project(id).ok())
                .collect::<Vec<_>>();
            if !recursive {
                return Ok(projects);
            }
            let mut items = projects.clone();
            for project in &projects {
                items.extend(state.descendants(project));
            }
            return Ok(items);
        }
        if !state.kind(path)?.is_browsable() {
            return Ok(Vec::new());
        }
        let items = state
            .descendants(path)
            .into_iter()
            .filter(|id| recursive || id.parent().as_ref() == Some(path))
            .collect();
        Ok(items)
    }

    fn delete(&self, path: &AssetId) -> Result<(), EeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("delete {path}"));
        state.check_rejection(path)?;
        state.kind(path)?;
        if !state.descendants(path).is_empty() {
            return Err(EeError::FolderNotEmpty(path.to_string()));
        }
        state.assets.remove(path);
        Ok(())
    }

    fn rmdir(&self, path: &AssetId, recursive: bool) -> Result<(), EeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("rmdir {path}"));
        state.check_rejection(path)?;
        state.kind(path)?;
        let descendants = state.descendants(path);
        if !descendants.is_empty() && !recursive {
            return Err(EeError::FolderNotEmpty(path.to_string()));
        }
        for id in descendants {
            state.assets.remove(&id);
        }
        state.assets.remove(path);
        Ok(())
    }

    fn move_asset(&self, path: &AssetId, destination: &AssetId) -> Result<(), EeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("move {path} {destination}"));
        state.check_rejection(path)?;
        state.check_rejection(destination)?;
        let kind = state.kind(path)?;
        if state.exists(destination) {
            return Err(EeError::AssetExists(destination.to_string()));
        }
        let parent = destination
            .parent()
            .ok_or_else(|| EeError::InvalidAssetId(destination.to_string()))?;
        if !state.exists(&parent) {
            return Err(EeError::AssetNotFound(parent.to_string()));
        }
        let moved = state
            .descendants(path)
            .into_iter()
            .filter_map(|id| {
                let kind = state.assets.get(&id).copied()?;
                Some((id, kind))
            })
            .collect::<Vec<_>>();
        for (id, _) in &moved {
            state.assets.remove(id);
        }
        for (id, kind) in moved {
            if let Some(target) = id.rebase(path, destination) {
                state.assets.insert(target, kind);
            }
        }
        state.assets.remove(path);
        state.assets.insert(destination.clone(), kind);
        Ok(())
    }

    fn mkdir(&self, path: &AssetId, parents: bool, exist_ok: bool) -> Result<(), EeError> {
        let mut state = self.lock()?;
        state.calls.push(format!("mkdir {path}"));
        state.check_rejection(path)?;
        if path.is_root() || path.is_project_root() {
            return Err(EeError::RelativeParent(path.to_string()));
        }
        if state.exists(path) {
            if exist_ok && state.kind(path)?.is_browsable() {
                return Ok(());
            }
            return Err(EeError::AssetExists(path.to_string()));
        }
        let missing = path
            .ancestors()
            .into_iter()
            .filter(|id| !state.exists(id))
            .collect::<BTreeSet<_>>();
        if !missing.is_empty() && !parents {
            let first = missing.iter().next_back().map(ToString::to_string).unwrap_or_default();
            return Err(EeError::AssetNotFound(first));
        }
        for id in missing {
            if id.is_project_root() {
                return Err(EeError::AssetNotFound(id.to_string()));
            }
            state.assets.insert(id, AssetKind::Folder);
        }
        state.assets.insert(path.clone(), AssetKind::Folder);
        Ok(())
    }

    fn list_projects_with_capability(&self) -> Result<Vec<String>, EeError> {
        Ok(self
            .lock()?
            .projects
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn id(value: &str) -> AssetId {
        value.parse().unwrap()
    }

    fn sample() -> MemoryNamespace {
        MemoryNamespace::new()
            .with_project("demo", true)
            .with_project("legacy", false)
            .with_asset("projects/demo/assets/a/img", AssetKind::Image)
            .with_asset("projects/demo/assets/a/sub/tbl", AssetKind::Table)
    }

    #[test]
    fn parents_are_created_as_folders() {
        let ns = sample();
        assert_eq!(ns.kind(&id("projects/demo/assets/a")).unwrap(), AssetKind::Folder);
        assert_eq!(ns.kind(&id("projects/demo/assets")).unwrap(), AssetKind::Project);
        assert!(ns.is_project(&id("projects/demo/assets")).unwrap());
    }

    #[test]
    fn iterdir_direct_and_recursive() {
        let ns = sample();
        let direct = ns.iterdir(&id("projects/demo/assets/a"), false).unwrap();
        assert_eq!(direct.len(), 2);
        let all = ns.iterdir(&id("projects/demo/assets/a"), true).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn capability_filter() {
        let ns = sample();
        assert_eq!(ns.list_projects_with_capability().unwrap(), vec!["demo".to_string()]);
    }

    #[test]
    fn move_rebases_children() {
        let ns = sample();
        ns.move_asset(&id("projects/demo/assets/a"), &id("projects/demo/assets/b"))
            .unwrap();
        assert!(ns.contains("projects/demo/assets/b/sub/tbl"));
        assert!(!ns.contains("projects/demo/assets/a"));
    }

    #[test]
    fn move_onto_existing_is_rejected() {
        let ns = sample();
        let err = ns
            .move_asset(&id("projects/demo/assets/a/img"), &id("projects/demo/assets/a/sub"))
            .unwrap_err();
        assert_matches!(err, EeError::AssetExists(_));
    }

    #[test]
    fn mkdir_respects_parents_flag() {
        let ns = sample();
        let err = ns
            .mkdir(&id("projects/demo/assets/x/y"), false, false)
            .unwrap_err();
        assert_matches!(err, EeError::AssetNotFound(_));
        ns.mkdir(&id("projects/demo/assets/x/y"), true, false).unwrap();
        assert!(ns.is_folder(&id("projects/demo/assets/x")).unwrap());
        ns.mkdir(&id("projects/demo/assets/x/y"), false, true).unwrap();
    }

    #[test]
    fn rmdir_requires_recursive_for_content() {
        let ns = sample();
        let err = ns.rmdir(&id("projects/demo/assets/a"), false).unwrap_err();
        assert_matches!(err, EeError::FolderNotEmpty(_));
        ns.rmdir(&id("projects/demo/assets/a"), true).unwrap();
        assert!(!ns.contains("projects/demo/assets/a/sub/tbl"));
    }
}
