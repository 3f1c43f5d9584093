//! Asset mutations behind a confirmation step.
//!
//! Every destructive action is two-phase: `prepare_*` collects the paths the
//! action will touch into a [`Confirmation`], and [`ActionDispatcher::commit`]
//! issues the single remote call. A rejected commit keeps the confirmation
//! open with the message attached to the field that caused it.

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;

use crate::clipboard::{ClipMessage, ClipboardBridge};
use crate::domain::{Asset, AssetId, AssetKind, validate_segment};
use crate::error::EeError;
use crate::namespace::RemoteNamespace;
use crate::tree::{AssetTree, TreeEvent};

#[derive(Debug, Default)]
struct ControlFlags {
    loading: Cell<bool>,
    disabled: Cell<bool>,
}

/// Loading/disabled flags of one widget instance. Clones share the flags.
#[derive(Debug, Clone, Default)]
pub struct Controls {
    flags: Rc<ControlFlags>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.flags.loading.get()
    }

    pub fn is_disabled(&self) -> bool {
        self.flags.disabled.get()
    }

    /// Switch both flags on until the guard is dropped.
    pub fn acquire(&self) -> Result<ControlGuard, EeError> {
        if self.flags.loading.get() {
            return Err(EeError::Busy);
        }
        let guard = ControlGuard {
            flags: self.flags.clone(),
            loading: self.flags.loading.get(),
            disabled: self.flags.disabled.get(),
        };
        self.flags.loading.set(true);
        self.flags.disabled.set(true);
        Ok(guard)
    }
}

/// Restores the flags it switched, whatever the wrapped handler returned.
#[derive(Debug)]
pub struct ControlGuard {
    flags: Rc<ControlFlags>,
    loading: bool,
    disabled: bool,
}

impl Drop for ControlGuard {
    fn drop(&mut self) {
        self.flags.loading.set(self.loading);
        self.flags.disabled.set(self.disabled);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    Delete { asset: Asset },
    Move { asset: Asset, destination: String },
    CreateFolder { parent: AssetId, name: String },
}

impl PendingAction {
    pub fn label(&self) -> &'static str {
        match self {
            PendingAction::Delete { .. } => "delete",
            PendingAction::Move { .. } => "move",
            PendingAction::CreateFolder { .. } => "create folder",
        }
    }

    /// The field a remote rejection is reported on.
    pub fn field(&self) -> Field {
        match self {
            PendingAction::Delete { .. } => Field::Target,
            PendingAction::Move { .. } => Field::Destination,
            PendingAction::CreateFolder { .. } => Field::Name,
        }
    }

    /// The existing path the action operates on.
    pub fn subject(&self) -> &AssetId {
        match self {
            PendingAction::Delete { asset } | PendingAction::Move { asset, .. } => &asset.id,
            PendingAction::CreateFolder { parent, .. } => parent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Target,
    Destination,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// An action waiting for the user's go-ahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    #[serde(flatten)]
    pub action: PendingAction,
    /// Every path the action touches, the target itself first.
    pub affected: Vec<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldError>,
}

impl Confirmation {
    /// Edit the free-text field of the dialog (destination or folder name).
    pub fn set_input(&mut self, value: &str) {
        match &mut self.action {
            PendingAction::Move { destination, .. } => *destination = value.to_string(),
            PendingAction::CreateFolder { name, .. } => *name = value.to_string(),
            PendingAction::Delete { .. } => {}
        }
        self.error = None;
    }

    pub fn input(&self) -> Option<&str> {
        match &self.action {
            PendingAction::Move { destination, .. } => Some(destination),
            PendingAction::CreateFolder { name, .. } => Some(name),
            PendingAction::Delete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Target kind does not allow the action; nothing was sent.
    Ignored,
    Cancelled,
    Committed(Vec<TreeEvent>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDetails {
    pub id: AssetId,
    pub kind: AssetKind,
    pub name: String,
    pub parent: Option<AssetId>,
    pub icon: &'static str,
}

impl From<&Asset> for AssetDetails {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.clone(),
            kind: asset.kind,
            name: asset.name.clone(),
            parent: asset.id.parent(),
            icon: asset.kind.icon(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    Navigated(Vec<TreeEvent>),
    Details(AssetDetails),
}

#[derive(Debug, Default)]
pub struct ActionDispatcher {
    controls: Controls,
    pending: Option<Confirmation>,
}

impl ActionDispatcher {
    pub fn new(controls: Controls) -> Self {
        Self {
            controls,
            pending: None,
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn pending(&self) -> Option<&Confirmation> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut Confirmation> {
        self.pending.as_mut()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn prepare_delete<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        asset: &Asset,
    ) -> Result<Option<&Confirmation>, EeError> {
        if !is_operable(asset) {
            tracing::debug!(asset = %asset.id, kind = %asset.kind, "delete refused");
            return Ok(None);
        }
        let _guard = self.controls.acquire()?;
        let affected = affected_paths(tree.namespace(), asset).map_err(|err| recover(tree, err))?;
        Ok(Some(&*self.pending.insert(Confirmation {
            action: PendingAction::Delete {
                asset: asset.clone(),
            },
            affected,
            error: None,
        })))
    }

    /// `destination` is a full asset id, or a bare name to rename in place.
    pub fn prepare_move<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        asset: &Asset,
        destination: &str,
    ) -> Result<Option<&Confirmation>, EeError> {
        if !is_operable(asset) {
            tracing::debug!(asset = %asset.id, kind = %asset.kind, "move refused");
            return Ok(None);
        }
        let _guard = self.controls.acquire()?;
        let affected = affected_paths(tree.namespace(), asset).map_err(|err| recover(tree, err))?;
        Ok(Some(&*self.pending.insert(Confirmation {
            action: PendingAction::Move {
                asset: asset.clone(),
                destination: destination.to_string(),
            },
            affected,
            error: None,
        })))
    }

    pub fn prepare_create_folder(
        &mut self,
        parent: &AssetId,
        name: &str,
    ) -> Result<&Confirmation, EeError> {
        if !parent.is_absolute() {
            return Err(EeError::RelativeParent(parent.to_string()));
        }
        let affected = parent.join(name).map(|id| vec![id]).unwrap_or_default();
        Ok(&*self.pending.insert(Confirmation {
            action: PendingAction::CreateFolder {
                parent: parent.clone(),
                name: name.to_string(),
            },
            affected,
            error: None,
        }))
    }

    /// Run the pending action, then re-list the tree's current folder.
    pub fn commit<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
    ) -> Result<Vec<TreeEvent>, EeError> {
        let Some(confirmation) = self.pending.as_mut() else {
            return Err(EeError::NoPendingAction);
        };
        let _guard = self.controls.acquire()?;

        if let Err(err) = execute(tree.namespace(), &confirmation.action) {
            // the target itself vanished: close the dialog and re-list from what is left
            if err.is_stale_path() && !tree.namespace().exists(confirmation.action.subject())? {
                tracing::warn!(action = confirmation.action.label(), error = %err, "target vanished");
                self.pending = None;
                return Err(recover(tree, err));
            }
            tracing::debug!(action = confirmation.action.label(), error = %err, "action rejected");
            confirmation.error = Some(FieldError {
                field: confirmation.action.field(),
                message: err.to_string(),
            });
            return Err(err);
        }

        tracing::info!(action = confirmation.action.label(), "action committed");
        self.pending = None;
        tree.reload()
    }

    pub fn delete<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        asset: &Asset,
        confirm: impl FnOnce(&Confirmation) -> bool,
    ) -> Result<ActionOutcome, EeError> {
        let Some(confirmation) = self.prepare_delete(tree, asset)? else {
            return Ok(ActionOutcome::Ignored);
        };
        let accepted = confirm(confirmation);
        self.finish(tree, accepted)
    }

    pub fn move_to<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        asset: &Asset,
        destination: &str,
        confirm: impl FnOnce(&Confirmation) -> bool,
    ) -> Result<ActionOutcome, EeError> {
        let Some(confirmation) = self.prepare_move(tree, asset, destination)? else {
            return Ok(ActionOutcome::Ignored);
        };
        let accepted = confirm(confirmation);
        self.finish(tree, accepted)
    }

    pub fn create_folder<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        parent: &AssetId,
        name: &str,
        confirm: impl FnOnce(&Confirmation) -> bool,
    ) -> Result<ActionOutcome, EeError> {
        let confirmation = self.prepare_create_folder(parent, name)?;
        let accepted = confirm(confirmation);
        self.finish(tree, accepted)
    }

    /// Browse into browsable assets, describe the others.
    pub fn view<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        asset: &Asset,
    ) -> Result<ViewOutcome, EeError> {
        if asset.kind.is_browsable() {
            let _guard = self.controls.acquire()?;
            return tree.navigate(&asset.id).map(ViewOutcome::Navigated);
        }
        Ok(ViewOutcome::Details(AssetDetails::from(asset)))
    }

    pub fn copy(
        &self,
        asset: &Asset,
        bridge: &dyn ClipboardBridge,
    ) -> Result<ClipMessage, EeError> {
        let message = ClipMessage::new(asset.id.as_str());
        bridge.send(&message)?;
        Ok(message)
    }

    fn finish<N: RemoteNamespace>(
        &mut self,
        tree: &mut AssetTree<N>,
        accepted: bool,
    ) -> Result<ActionOutcome, EeError> {
        if !accepted {
            self.cancel();
            return Ok(ActionOutcome::Cancelled);
        }
        self.commit(tree).map(ActionOutcome::Committed)
    }
}

/// Re-list the tree after a stale path error; the lister falls back to the
/// nearest existing ancestor. The original error is handed back.
fn recover<N: RemoteNamespace>(tree: &mut AssetTree<N>, err: EeError) -> EeError {
    if !err.is_stale_path() {
        return err;
    }
    match tree.reload() {
        Ok(_) => tracing::info!(folder = %tree.current_folder(), "tree re-listed after stale path"),
        Err(reload) => tracing::warn!(error = %reload, "re-listing after stale path failed"),
    }
    err
}

fn is_operable(asset: &Asset) -> bool {
    asset.kind.is_operable() && !asset.id.is_root() && !asset.id.is_project_root()
}

fn affected_paths<N: RemoteNamespace>(namespace: &N, asset: &Asset) -> Result<Vec<AssetId>, EeError> {
    let mut affected = vec![asset.id.clone()];
    if asset.kind.is_browsable() {
        let mut descendants = namespace.iterdir(&asset.id, true)?;
        descendants.sort_by(|a, b| crate::natsort::natural_cmp(a.as_str(), b.as_str()));
        affected.extend(descendants);
    }
    Ok(affected)
}

/// Resolve the free-text destination of a move.
pub fn resolve_destination(asset: &Asset, raw: &str) -> Result<AssetId, EeError> {
    let trimmed = raw.trim();
    let destination = if trimmed.contains('/') {
        trimmed.parse::<AssetId>()?
    } else {
        validate_segment(trimmed).map_err(|_| EeError::InvalidDestination(raw.to_string()))?;
        asset
            .id
            .parent()
            .ok_or_else(|| EeError::InvalidDestination(raw.to_string()))?
            .join(trimmed)?
    };
    if destination.is_root() || destination.is_project_root() {
        return Err(EeError::InvalidDestination(raw.to_string()));
    }
    if destination == asset.id {
        return Err(EeError::InvalidDestination(format!(
            "{raw} is the asset itself"
        )));
    }
    if destination.starts_with(&asset.id) {
        return Err(EeError::InvalidDestination(format!(
            "{raw} is inside {}",
            asset.id
        )));
    }
    Ok(destination)
}

fn execute<N: RemoteNamespace>(namespace: &N, action: &PendingAction) -> Result<(), EeError> {
    match action {
        PendingAction::Delete { asset } => {
            if asset.kind.is_browsable() {
                namespace.rmdir(&asset.id, true)
            } else {
                namespace.delete(&asset.id)
            }
        }
        PendingAction::Move { asset, destination } => {
            let destination = resolve_destination(asset, destination)?;
            namespace.move_asset(&asset.id, &destination)
        }
        PendingAction::CreateFolder { parent, name } => {
            let path = parent.join(name)?;
            namespace.mkdir(&path, false, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn guard_restores_flags_and_blocks_reentry() {
        let controls = Controls::new();
        {
            let _guard = controls.acquire().unwrap();
            assert!(controls.is_loading());
            assert!(controls.is_disabled());
            assert_matches!(controls.acquire(), Err(EeError::Busy));
        }
        assert!(!controls.is_loading());
        assert!(!controls.is_disabled());
    }

    #[test]
    fn guard_restores_after_error_path() {
        let controls = Controls::new();
        let result: Result<(), EeError> = (|| {
            let _guard = controls.acquire()?;
            Err(EeError::RemoteRejected("nope".to_string()))
        })();
        assert!(result.is_err());
        assert!(!controls.is_loading());
    }

    #[test]
    fn rename_resolves_in_parent() {
        let asset = Asset::new(
            "projects/p/assets/a/img".parse().unwrap(),
            AssetKind::Image,
        );
        let destination = resolve_destination(&asset, "renamed").unwrap();
        assert_eq!(destination.as_str(), "projects/p/assets/a/renamed");
    }

    #[test]
    fn move_into_itself_is_invalid() {
        let asset = Asset::new("projects/p/assets/a".parse().unwrap(), AssetKind::Folder);
        let err = resolve_destination(&asset, "projects/p/assets/a/inner").unwrap_err();
        assert_matches!(err, EeError::InvalidDestination(_));
        let err = resolve_destination(&asset, "projects/p/assets").unwrap_err();
        assert_matches!(err, EeError::InvalidDestination(_));
    }
}
