use std::sync::Mutex;

use assert_matches::assert_matches;
use serde_json::json;

use eeview::app::{App, ChartRequest, MutationStatus, ProgressEvent, ProgressSink};
use eeview::chart::{ChartKind, Glyph};
use eeview::domain::{AssetId, AssetKind};
use eeview::error::EeError;
use eeview::namespace::MemoryNamespace;
use eeview::output::JsonOutput;
use eeview::tasks::StaticTasks;

#[derive(Default)]
struct Phases(Mutex<Vec<String>>);

impl ProgressSink for Phases {
    fn event(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event.message);
    }
}

impl Phases {
    fn names(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|message| message.split(';').next())
            .map(str::to_string)
            .collect()
    }
}

fn id(value: &str) -> AssetId {
    value.parse().unwrap()
}

fn app() -> App<MemoryNamespace, StaticTasks> {
    let ns = MemoryNamespace::new()
        .with_project("demo", true)
        .with_asset("projects/demo/assets/landsat/scene1", AssetKind::Image)
        .with_asset("projects/demo/assets/landsat/scene2", AssetKind::Image)
        .with_asset("projects/demo/assets/zones", AssetKind::Table);
    App::new(ns, StaticTasks::default()).with_project(Some("demo".to_string()))
}

#[test]
fn list_reports_phases() {
    let app = app();
    let phases = Phases::default();
    let listing = app.list(&id("projects/demo/assets"), &phases).unwrap();
    assert_eq!(listing.children().count(), 2);
    assert_eq!(phases.names().first().map(String::as_str), Some("phase=Resolve"));
    assert_eq!(phases.names().last().map(String::as_str), Some("phase=Done"));
}

#[test]
fn move_folder_carries_children() {
    let app = app();
    let result = app
        .move_asset(
            &id("projects/demo/assets/landsat"),
            "projects/demo/assets/archive",
            |_| true,
            &JsonOutput,
        )
        .unwrap();

    assert_eq!(result.status, MutationStatus::Committed);
    assert_eq!(result.affected.len(), 3);
    let ns = app.namespace();
    assert!(ns.contains("projects/demo/assets/archive/scene2"));
    assert!(!ns.contains("projects/demo/assets/landsat"));
    let listing = result.listing.unwrap();
    assert!(listing.find(&id("projects/demo/assets/archive")).is_some());
}

#[test]
fn delete_of_project_is_ignored() {
    let app = app();
    let result = app
        .delete(&id("projects/demo/assets"), |_| true, &JsonOutput)
        .unwrap();
    assert_eq!(result.status, MutationStatus::Ignored);
    assert!(result.affected.is_empty());
    assert!(app.namespace().calls().is_empty());
}

#[test]
fn delete_of_missing_asset_fails() {
    let app = app();
    assert_matches!(
        app.delete(&id("projects/demo/assets/nothing"), |_| true, &JsonOutput),
        Err(EeError::AssetNotFound(_))
    );
}

#[test]
fn mkdir_rejects_root_and_bad_names() {
    let app = app();
    assert_matches!(
        app.mkdir(&AssetId::root(), "x", |_| true, &JsonOutput),
        Err(EeError::RelativeParent(_))
    );
    assert_matches!(
        app.mkdir(&id("projects/demo/assets"), "a b", |_| true, &JsonOutput),
        Err(EeError::InvalidFolderName(_))
    );
    assert!(app.namespace().calls().is_empty());

    let result = app
        .mkdir(&id("projects/demo/assets"), "exports", |_| true, &JsonOutput)
        .unwrap();
    assert_eq!(result.target, id("projects/demo/assets/exports"));
    assert!(app.namespace().contains("projects/demo/assets/exports"));
}

#[test]
fn tasks_carry_the_project() {
    let app = app();
    let result = app.tasks(&JsonOutput).unwrap();
    assert_eq!(result.project.as_deref(), Some("demo"));
    assert!(result.tasks.is_empty());
}

#[test]
fn chart_falls_back_to_configured_colors() {
    let app = app().with_chart_colors(Some(vec!["#123456".to_string()]));
    let series = serde_json::from_value(json!({"A": {"x": 1}, "B": {"x": 2}})).unwrap();
    let figure = app
        .chart(
            ChartRequest {
                kind: ChartKind::Bar,
                series,
                label_name: "label".to_string(),
                colors: None,
                target: None,
            },
            &JsonOutput,
        )
        .unwrap();
    let colors: Vec<_> = figure.panes[0]
        .glyphs
        .iter()
        .map(|glyph| glyph.color().unwrap_or_default().to_string())
        .collect();
    assert_eq!(colors, vec!["#123456", "#123456"]);
    assert_matches!(figure.panes[0].glyphs[0], Glyph::Vbar { .. });
}
