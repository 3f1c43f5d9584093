use serde::Serialize;

use crate::domain::{Asset, AssetId};
use crate::error::EeError;
use crate::lister::{AssetLister, EntryRole, Listing};
use crate::namespace::RemoteNamespace;

/// State changes a UI has to reflect after a tree operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    FolderChanged(AssetId),
    SelectionChanged(Option<AssetId>),
    ListingReplaced,
}

/// Which actions the current selection allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionAvailability {
    pub view: bool,
    pub copy: bool,
    pub delete: bool,
    pub move_to: bool,
    pub create_folder: bool,
}

/// The browser state: current folder, its listing and the highlighted asset.
pub struct AssetTree<N: RemoteNamespace> {
    lister: AssetLister<N>,
    current_folder: AssetId,
    listing: Listing,
    selected: Option<AssetId>,
}

impl<N: RemoteNamespace> AssetTree<N> {
    /// Open the tree on `folder` (the root when `None`).
    pub fn open_at(namespace: N, folder: Option<AssetId>) -> Result<Self, EeError> {
        let lister = AssetLister::new(namespace);
        let listing = lister.list_children(&folder.unwrap_or_else(AssetId::root))?;
        Ok(Self {
            current_folder: listing.folder.clone(),
            lister,
            listing,
            selected: None,
        })
    }

    pub fn namespace(&self) -> &N {
        self.lister.namespace()
    }

    pub fn current_folder(&self) -> &AssetId {
        &self.current_folder
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn selected(&self) -> Option<&AssetId> {
        self.selected.as_ref()
    }

    /// The selected asset as it appears in the current listing.
    pub fn selected_asset(&self) -> Option<&Asset> {
        let id = self.selected.as_ref()?;
        self.listing.find(id).map(|entry| &entry.asset)
    }

    pub fn navigate(&mut self, folder: &AssetId) -> Result<Vec<TreeEvent>, EeError> {
        let listing = self.lister.list_children(folder)?;
        Ok(self.replace_listing(listing))
    }

    /// Open a browsable asset, or select any other one.
    pub fn open(&mut self, asset: &Asset) -> Result<Vec<TreeEvent>, EeError> {
        if asset.kind.is_browsable() {
            return self.navigate(&asset.id);
        }
        Ok(self.select(Some(asset.id.clone())))
    }

    pub fn up(&mut self) -> Result<Vec<TreeEvent>, EeError> {
        match self.current_folder.parent() {
            Some(parent) => self.navigate(&parent),
            None => Ok(Vec::new()),
        }
    }

    /// Re-list the current folder.
    pub fn reload(&mut self) -> Result<Vec<TreeEvent>, EeError> {
        let folder = self.current_folder.clone();
        self.navigate(&folder)
    }

    pub fn select(&mut self, id: Option<AssetId>) -> Vec<TreeEvent> {
        // the synthetic parent entry is never selectable
        let id = id.filter(|id| {
            self.listing
                .find(id)
                .is_some_and(|entry| entry.role == EntryRole::Child)
        });
        if id == self.selected {
            return Vec::new();
        }
        self.selected = id.clone();
        vec![TreeEvent::SelectionChanged(id)]
    }

    pub fn clear_selection(&mut self) -> Vec<TreeEvent> {
        self.select(None)
    }

    pub fn actions(&self) -> ActionAvailability {
        let create_folder = self.current_folder.is_absolute();
        let Some(asset) = self.selected_asset() else {
            return ActionAvailability {
                create_folder,
                ..ActionAvailability::default()
            };
        };
        let operable = asset.kind.is_operable() && !asset.id.is_root();
        ActionAvailability {
            view: true,
            copy: !asset.id.is_root(),
            delete: operable,
            move_to: operable,
            create_folder,
        }
    }

    fn replace_listing(&mut self, listing: Listing) -> Vec<TreeEvent> {
        let mut events = Vec::new();
        if listing.folder != self.current_folder {
            self.current_folder = listing.folder.clone();
            events.push(TreeEvent::FolderChanged(self.current_folder.clone()));
        }
        self.listing = listing;
        events.push(TreeEvent::ListingReplaced);

        // keep the selection only while the asset is still listed
        if let Some(selected) = &self.selected {
            if self.listing.find(selected).is_none() {
                self.selected = None;
                events.push(TreeEvent::SelectionChanged(None));
            }
        }
        events
    }
}
