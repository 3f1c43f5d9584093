use serde::Serialize;

use crate::domain::{Asset, AssetId, AssetKind, ROOT};
use crate::error::EeError;
use crate::namespace::RemoteNamespace;
use crate::natsort::natural_cmp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    /// Synthetic entry pointing one level up.
    Parent,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    #[serde(flatten)]
    pub asset: Asset,
    pub role: EntryRole,
}

/// The ordered content of one folder: parent entry, folders, then leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub folder: AssetId,
    pub entries: Vec<ListingEntry>,
    /// Folder that was requested but no longer exists, when the listing fell back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_from: Option<AssetId>,
}

impl Listing {
    pub fn parent(&self) -> Option<&Asset> {
        self.entries
            .first()
            .filter(|entry| entry.role == EntryRole::Parent)
            .map(|entry| &entry.asset)
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = &Asset> {
        self.entries
            .iter()
            .filter(|entry| entry.role == EntryRole::Child)
            .map(|entry| &entry.asset)
    }

    pub fn find(&self, id: &AssetId) -> Option<&ListingEntry> {
        self.entries.iter().find(|entry| &entry.asset.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct AssetLister<N: RemoteNamespace> {
    namespace: N,
}

impl<N: RemoteNamespace> AssetLister<N> {
    pub fn new(namespace: N) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    /// List `folder`, falling back to its nearest existing ancestor when the
    /// folder vanished.
    pub fn list_children(&self, folder: &AssetId) -> Result<Listing, EeError> {
        let target = self.resolve_existing(folder)?;
        let recovered_from = (&target != folder).then(|| folder.clone());
        if let Some(missing) = &recovered_from {
            tracing::warn!(folder = %missing, fallback = %target, "folder vanished, listing ancestor");
        }

        let children = match self.fetch_children(&target) {
            Ok(children) => children,
            // raced with a deletion between the existence check and the listing
            Err(err) if err.is_stale_path() && !target.is_root() => {
                tracing::warn!(folder = %target, "folder vanished while listing");
                let fallback = target.parent().unwrap_or_else(AssetId::root);
                let mut listing = self.list_children(&fallback)?;
                listing.recovered_from = Some(folder.clone());
                return Ok(listing);
            }
            Err(err) => return Err(err),
        };

        let mut entries = Vec::with_capacity(children.len() + 1);
        if let Some(parent) = target.parent() {
            entries.push(ListingEntry {
                asset: self.parent_entry(parent),
                role: EntryRole::Parent,
            });
        }
        entries.extend(sort_assets(children).into_iter().map(|asset| ListingEntry {
            asset,
            role: EntryRole::Child,
        }));

        Ok(Listing {
            folder: target,
            entries,
            recovered_from,
        })
    }

    fn resolve_existing(&self, folder: &AssetId) -> Result<AssetId, EeError> {
        if self.namespace.exists(folder)? {
            return Ok(folder.clone());
        }
        for ancestor in folder.ancestors() {
            if self.namespace.exists(&ancestor)? {
                return Ok(ancestor);
            }
        }
        Ok(AssetId::root())
    }

    fn fetch_children(&self, folder: &AssetId) -> Result<Vec<Asset>, EeError> {
        if folder.is_root() {
            return self
                .namespace
                .list_projects_with_capability()?
                .iter()
                .map(|project| AssetId::project(project).map(|id| Asset::new(id, AssetKind::Project)))
                .collect();
        }
        self.namespace.list_entries(folder)
    }

    fn parent_entry(&self, parent: AssetId) -> Asset {
        if parent.is_root() {
            return Asset {
                id: parent,
                kind: AssetKind::Root,
                name: ROOT.to_string(),
            };
        }
        let kind = if parent.is_project_root() {
            AssetKind::Project
        } else {
            AssetKind::Folder
        };
        Asset::new(parent, kind)
    }
}

/// Browsable assets first, leaves after; each group in natural order of id.
pub fn sort_assets(assets: Vec<Asset>) -> Vec<Asset> {
    let (mut folders, mut files): (Vec<_>, Vec<_>) =
        assets.into_iter().partition(|asset| asset.kind.is_browsable());
    folders.sort_by(|a, b| natural_cmp(a.id.as_str(), b.id.as_str()));
    files.sort_by(|a, b| natural_cmp(a.id.as_str(), b.id.as_str()));
    folders.extend(files);
    folders
}
