use assert_matches::assert_matches;

use eeview::actions::{ActionDispatcher, ActionOutcome, Controls, Field, PendingAction};
use eeview::domain::{Asset, AssetId, AssetKind};
use eeview::error::EeError;
use eeview::namespace::MemoryNamespace;
use eeview::tree::{AssetTree, TreeEvent};

fn id(value: &str) -> AssetId {
    value.parse().unwrap()
}

fn namespace() -> MemoryNamespace {
    MemoryNamespace::new()
        .with_project("p", true)
        .with_asset("projects/p/assets/folder/img2", AssetKind::Image)
        .with_asset("projects/p/assets/folder/img10", AssetKind::Image)
        .with_asset("projects/p/assets/table", AssetKind::Table)
}

fn open<'a>(ns: &'a MemoryNamespace, folder: &str) -> AssetTree<&'a MemoryNamespace> {
    AssetTree::open_at(ns, Some(id(folder))).unwrap()
}

#[test]
fn create_folder_refuses_relative_parent_without_remote_call() {
    let ns = namespace();
    let mut tree = open(&ns, ".");
    let mut dispatcher = ActionDispatcher::default();

    let err = dispatcher
        .create_folder(&mut tree, &AssetId::root(), "new", |_| true)
        .unwrap_err();
    assert_matches!(err, EeError::RelativeParent(_));
    assert!(ns.calls().is_empty());
    assert!(dispatcher.pending().is_none());
}

#[test]
fn create_folder_relists_the_tree() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();

    let outcome = dispatcher
        .create_folder(&mut tree, &id("projects/p/assets"), "exports", |_| true)
        .unwrap();
    assert_matches!(outcome, ActionOutcome::Committed(events) => {
        assert!(events.contains(&TreeEvent::ListingReplaced));
    });
    assert!(ns.contains("projects/p/assets/exports"));
    assert!(tree.listing().find(&id("projects/p/assets/exports")).is_some());
}

#[test]
fn project_and_root_are_not_operable() {
    let ns = namespace();
    let mut tree = open(&ns, ".");
    let mut dispatcher = ActionDispatcher::default();
    let project = Asset::new(id("projects/p/assets"), AssetKind::Project);

    let outcome = dispatcher.delete(&mut tree, &project, |_| true).unwrap();
    assert_eq!(outcome, ActionOutcome::Ignored);
    let outcome = dispatcher
        .move_to(&mut tree, &Asset::root(), "projects/p/assets/x", |_| true)
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Ignored);
    assert!(ns.calls().is_empty());
}

#[test]
fn delete_folder_lists_descendants_for_review() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let folder = Asset::new(id("projects/p/assets/folder"), AssetKind::Folder);

    let mut reviewed = Vec::new();
    let outcome = dispatcher
        .delete(&mut tree, &folder, |confirmation| {
            reviewed = confirmation.affected.clone();
            true
        })
        .unwrap();

    assert_matches!(outcome, ActionOutcome::Committed(_));
    assert_eq!(
        reviewed,
        vec![
            id("projects/p/assets/folder"),
            id("projects/p/assets/folder/img2"),
            id("projects/p/assets/folder/img10"),
        ]
    );
    assert!(!ns.contains("projects/p/assets/folder"));
    assert!(!ns.contains("projects/p/assets/folder/img2"));
}

#[test]
fn declined_delete_sends_nothing() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let table = Asset::new(id("projects/p/assets/table"), AssetKind::Table);

    let outcome = dispatcher.delete(&mut tree, &table, |_| false).unwrap();
    assert_eq!(outcome, ActionOutcome::Cancelled);
    assert!(ns.contains("projects/p/assets/table"));
    assert!(ns.calls().is_empty());
    assert!(dispatcher.pending().is_none());
}

#[test]
fn bare_name_renames_in_place() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let table = Asset::new(id("projects/p/assets/table"), AssetKind::Table);

    dispatcher
        .move_to(&mut tree, &table, "samples", |_| true)
        .unwrap();
    assert!(ns.contains("projects/p/assets/samples"));
    assert!(!ns.contains("projects/p/assets/table"));
}

#[test]
fn rejection_keeps_the_dialog_open() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let table = Asset::new(id("projects/p/assets/table"), AssetKind::Table);
    ns.reject(&id("projects/p/assets/taken"), "asset already exists");

    dispatcher
        .prepare_move(&mut tree, &table, "projects/p/assets/taken")
        .unwrap()
        .unwrap();
    let err = dispatcher.commit(&mut tree).unwrap_err();
    assert_matches!(err, EeError::RemoteRejected(_));

    let pending = dispatcher.pending().unwrap();
    assert_matches!(&pending.action, PendingAction::Move { destination, .. } if destination == "projects/p/assets/taken");
    let error = pending.error.as_ref().unwrap();
    assert_eq!(error.field, Field::Destination);
    assert!(error.message.contains("asset already exists"));

    // editing the field clears the error, a second try goes through
    dispatcher
        .pending_mut()
        .unwrap()
        .set_input("projects/p/assets/free");
    assert!(dispatcher.pending().unwrap().error.is_none());
    dispatcher.commit(&mut tree).unwrap();
    assert!(ns.contains("projects/p/assets/free"));
    assert!(dispatcher.pending().is_none());
}

#[test]
fn commit_without_pending_action() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    assert_matches!(dispatcher.commit(&mut tree), Err(EeError::NoPendingAction));
}

#[test]
fn busy_controls_refuse_a_second_action() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let controls = Controls::new();
    let mut dispatcher = ActionDispatcher::new(controls.clone());
    let table = Asset::new(id("projects/p/assets/table"), AssetKind::Table);

    let guard = controls.acquire().unwrap();
    assert!(controls.is_loading());
    assert_matches!(
        dispatcher.delete(&mut tree, &table, |_| true),
        Err(EeError::Busy)
    );
    drop(guard);

    assert!(!controls.is_loading());
    assert!(!controls.is_disabled());
    assert_matches!(
        dispatcher.delete(&mut tree, &table, |_| true),
        Ok(ActionOutcome::Committed(_))
    );
}

#[test]
fn vanished_target_closes_the_dialog_and_relists() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let table = Asset::new(id("projects/p/assets/table"), AssetKind::Table);

    dispatcher.prepare_delete(&mut tree, &table).unwrap();
    ns.remove_externally(&table.id);

    let err = dispatcher.commit(&mut tree).unwrap_err();
    assert_matches!(err, EeError::AssetNotFound(_));
    assert!(dispatcher.pending().is_none());
    assert!(tree.listing().find(&table.id).is_none());
    assert_eq!(tree.current_folder(), &id("projects/p/assets"));
}

#[test]
fn vanished_current_folder_falls_back_to_its_ancestor() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets/folder");
    let mut dispatcher = ActionDispatcher::default();

    ns.remove_externally(&id("projects/p/assets/folder"));
    let err = dispatcher
        .create_folder(&mut tree, &id("projects/p/assets/folder"), "new", |_| true)
        .unwrap_err();
    assert!(err.is_stale_path());
    assert!(dispatcher.pending().is_none());
    assert_eq!(tree.current_folder(), &id("projects/p/assets"));
    assert!(!ns.contains("projects/p/assets/folder/new"));
}

#[test]
fn folder_vanished_before_confirmation_relists() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let folder = Asset::new(id("projects/p/assets/folder"), AssetKind::Folder);

    ns.remove_externally(&folder.id);
    let err = dispatcher.prepare_delete(&mut tree, &folder).unwrap_err();
    assert!(err.is_stale_path());
    assert!(dispatcher.pending().is_none());
    assert!(tree.listing().find(&folder.id).is_none());
    assert!(ns.calls().is_empty());
}

#[test]
fn missing_destination_parent_stays_a_field_error() {
    let ns = namespace();
    let mut tree = open(&ns, "projects/p/assets");
    let mut dispatcher = ActionDispatcher::default();
    let table = Asset::new(id("projects/p/assets/table"), AssetKind::Table);

    dispatcher
        .prepare_move(&mut tree, &table, "projects/p/assets/nowhere/table")
        .unwrap();
    let err = dispatcher.commit(&mut tree).unwrap_err();
    assert!(err.is_stale_path());
    let confirmation = dispatcher.pending().unwrap();
    assert_matches!(confirmation.error.as_ref(), Some(error) => {
        assert_eq!(error.field, Field::Destination);
    });
}
