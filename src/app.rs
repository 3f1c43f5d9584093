use std::time::{Duration, Instant};

use serde::Serialize;

use crate::actions::{ActionDispatcher, ActionOutcome, Confirmation, Controls};
use crate::chart::{self, ChartKind, Figure, Series};
use crate::domain::{Asset, AssetId, AssetKind};
use crate::error::EeError;
use crate::lister::{AssetLister, Listing};
use crate::namespace::RemoteNamespace;
use crate::tasks::{self, TaskClient, TaskSummary};
use crate::tree::{AssetTree, TreeEvent};

#[derive(Debug, Clone, Serialize)]
pub struct TreeResult {
    pub root: AssetId,
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub id: AssetId,
    pub kind: AssetKind,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    Committed,
    Cancelled,
    /// The target kind does not allow the action.
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    pub action: &'static str,
    pub target: AssetId,
    pub status: MutationStatus,
    pub affected: Vec<AssetId>,
    /// The folder listing fetched after the mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<Listing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TasksResult {
    pub project: Option<String>,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub series: Series,
    pub label_name: String,
    pub colors: Option<Vec<String>>,
    pub target: Option<Figure>,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Browse,
    Mutate,
    Tasks,
    Chart,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn phase(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

/// Non-interactive entry points over a namespace and a task client.
pub struct App<N: RemoteNamespace, T: TaskClient> {
    namespace: N,
    tasks: T,
    project: Option<String>,
    chart_colors: Option<Vec<String>>,
}

impl<N: RemoteNamespace, T: TaskClient> App<N, T> {
    pub fn new(namespace: N, tasks: T) -> Self {
        Self {
            namespace,
            tasks,
            project: None,
            chart_colors: None,
        }
    }

    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project = project;
        self
    }

    pub fn with_chart_colors(mut self, colors: Option<Vec<String>>) -> Self {
        self.chart_colors = colors;
        self
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn list(&self, folder: &AssetId, sink: &dyn ProgressSink) -> Result<Listing, EeError> {
        phase(sink, format!("phase=Resolve; listing {folder}"));
        let started = Instant::now();
        let listing = AssetLister::new(&self.namespace).list_children(folder)?;
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} entries", listing.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(listing)
    }

    /// Walk every browsable asset below `folder`, depth first in listing order.
    pub fn tree(
        &self,
        folder: &AssetId,
        max_depth: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> Result<TreeResult, EeError> {
        phase(sink, format!("phase=Resolve; walking {folder}"));
        let lister = AssetLister::new(&self.namespace);
        let root = lister.list_children(folder)?;
        let mut nodes = Vec::new();
        let mut stack: Vec<(Asset, usize)> = root
            .children()
            .rev()
            .map(|asset| (asset.clone(), 0))
            .collect();

        while let Some((asset, depth)) = stack.pop() {
            let descend = asset.kind.is_browsable() && max_depth.is_none_or(|max| depth < max);
            nodes.push(TreeNode {
                id: asset.id.clone(),
                kind: asset.kind,
                depth,
            });
            if !descend {
                continue;
            }
            let listing = lister.list_children(&asset.id)?;
            // the folder vanished mid-walk; its ancestor is already walked
            if listing.recovered_from.is_some() {
                continue;
            }
            stack.extend(listing.children().rev().map(|child| (child.clone(), depth + 1)));
        }

        Ok(TreeResult {
            root: root.folder,
            nodes,
        })
    }

    pub fn delete(
        &self,
        id: &AssetId,
        confirm: impl FnOnce(&Confirmation) -> bool,
        sink: &dyn ProgressSink,
    ) -> Result<MutationResult, EeError> {
        let asset = self.resolve_asset(id)?;
        phase(sink, format!("phase=Resolve; delete {id}"));
        let run = |dispatcher: &mut ActionDispatcher,
                   tree: &mut AssetTree<&N>,
                   review: &mut dyn FnMut(&Confirmation) -> bool| {
            dispatcher.delete(tree, &asset, review)
        };
        self.mutate("delete", id, sink, run, confirm)
    }

    pub fn move_asset(
        &self,
        id: &AssetId,
        destination: &str,
        confirm: impl FnOnce(&Confirmation) -> bool,
        sink: &dyn ProgressSink,
    ) -> Result<MutationResult, EeError> {
        let asset = self.resolve_asset(id)?;
        phase(sink, format!("phase=Resolve; move {id} to {destination}"));
        let run = |dispatcher: &mut ActionDispatcher,
                   tree: &mut AssetTree<&N>,
                   review: &mut dyn FnMut(&Confirmation) -> bool| {
            dispatcher.move_to(tree, &asset, destination, review)
        };
        self.mutate("move", id, sink, run, confirm)
    }

    pub fn mkdir(
        &self,
        parent: &AssetId,
        name: &str,
        confirm: impl FnOnce(&Confirmation) -> bool,
        sink: &dyn ProgressSink,
    ) -> Result<MutationResult, EeError> {
        if !parent.is_absolute() {
            return Err(EeError::RelativeParent(parent.to_string()));
        }
        phase(sink, format!("phase=Resolve; create {name} in {parent}"));
        let target = parent.join(name)?;
        let run = |dispatcher: &mut ActionDispatcher,
                   tree: &mut AssetTree<&N>,
                   review: &mut dyn FnMut(&Confirmation) -> bool| {
            dispatcher.create_folder(tree, parent, name, review)
        };
        self.mutate_in(parent, "create folder", &target, sink, run, confirm)
    }

    pub fn tasks(&self, sink: &dyn ProgressSink) -> Result<TasksResult, EeError> {
        phase(sink, "phase=Fetch; listing operations");
        let started = Instant::now();
        let tasks = tasks::list_tasks(&self.tasks)?;
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} tasks", tasks.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(TasksResult {
            project: self.project.clone(),
            tasks,
        })
    }

    pub fn chart(&self, request: ChartRequest, sink: &dyn ProgressSink) -> Result<Figure, EeError> {
        phase(sink, format!("phase=Render; {} chart", request.kind));
        let colors = request.colors.or_else(|| self.chart_colors.clone());
        chart::render(
            request.kind,
            &request.series,
            &request.label_name,
            colors.as_deref(),
            request.target,
        )
    }

    fn resolve_asset(&self, id: &AssetId) -> Result<Asset, EeError> {
        if id.is_root() {
            return Ok(Asset::root());
        }
        Ok(Asset::new(id.clone(), self.namespace.kind(id)?))
    }

    fn mutate<F, C>(
        &self,
        action: &'static str,
        id: &AssetId,
        sink: &dyn ProgressSink,
        run: F,
        confirm: C,
    ) -> Result<MutationResult, EeError>
    where
        F: FnOnce(
            &mut ActionDispatcher,
            &mut AssetTree<&N>,
            &mut dyn FnMut(&Confirmation) -> bool,
        ) -> Result<ActionOutcome, EeError>,
        C: FnOnce(&Confirmation) -> bool,
    {
        let folder = id.parent().unwrap_or_else(AssetId::root);
        self.mutate_in(&folder, action, id, sink, run, confirm)
    }

    fn mutate_in<F, C>(
        &self,
        folder: &AssetId,
        action: &'static str,
        target: &AssetId,
        sink: &dyn ProgressSink,
        run: F,
        confirm: C,
    ) -> Result<MutationResult, EeError>
    where
        F: FnOnce(
            &mut ActionDispatcher,
            &mut AssetTree<&N>,
            &mut dyn FnMut(&Confirmation) -> bool,
        ) -> Result<ActionOutcome, EeError>,
        C: FnOnce(&Confirmation) -> bool,
    {
        let mut tree = AssetTree::open_at(&self.namespace, Some(folder.clone()))?;
        let mut dispatcher = ActionDispatcher::new(Controls::new());
        let mut affected = Vec::new();
        let mut confirm = Some(confirm);
        let mut review = |confirmation: &Confirmation| {
            affected = confirmation.affected.clone();
            confirm.take().is_some_and(|confirm| confirm(confirmation))
        };

        let started = Instant::now();
        let outcome = run(&mut dispatcher, &mut tree, &mut review)?;
        let status = match outcome {
            ActionOutcome::Ignored => MutationStatus::Ignored,
            ActionOutcome::Cancelled => MutationStatus::Cancelled,
            ActionOutcome::Committed(events) => {
                log_events(&events);
                MutationStatus::Committed
            }
        };
        sink.event(ProgressEvent {
            message: format!("phase=Done; {action} {}", status_label(status)),
            elapsed: Some(started.elapsed()),
        });

        Ok(MutationResult {
            action,
            target: target.clone(),
            status,
            affected,
            listing: (status == MutationStatus::Committed).then(|| tree.listing().clone()),
        })
    }
}

fn status_label(status: MutationStatus) -> &'static str {
    match status {
        MutationStatus::Committed => "committed",
        MutationStatus::Cancelled => "cancelled",
        MutationStatus::Ignored => "ignored",
    }
}

fn log_events(events: &[TreeEvent]) {
    for event in events {
        if let TreeEvent::FolderChanged(folder) = event {
            tracing::debug!(folder = %folder, "listing moved after mutation");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::namespace::MemoryNamespace;
    use crate::tasks::StaticTasks;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl ProgressSink for Recorder {
        fn event(&self, event: ProgressEvent) {
            self.0.borrow_mut().push(event.message);
        }
    }

    fn namespace() -> MemoryNamespace {
        MemoryNamespace::new()
            .with_project("p", true)
            .with_asset("projects/p/assets/a/img1", AssetKind::Image)
            .with_asset("projects/p/assets/a/b/img2", AssetKind::Image)
            .with_asset("projects/p/assets/table", AssetKind::Table)
    }

    #[test]
    fn tree_walks_depth_first() {
        let app = App::new(namespace(), StaticTasks::default());
        let result = app
            .tree(&"projects/p/assets".parse().unwrap(), None, &Recorder::default())
            .unwrap();
        let ids: Vec<_> = result.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "projects/p/assets/a",
                "projects/p/assets/a/b",
                "projects/p/assets/a/b/img2",
                "projects/p/assets/a/img1",
                "projects/p/assets/table",
            ]
        );
        assert_eq!(result.nodes[2].depth, 2);
    }

    #[test]
    fn tree_respects_max_depth() {
        let app = App::new(namespace(), StaticTasks::default());
        let result = app
            .tree(&"projects/p/assets".parse().unwrap(), Some(0), &Recorder::default())
            .unwrap();
        assert_eq!(result.nodes.len(), 2);
    }

    #[test]
    fn delete_reports_affected_and_relists() {
        let app = App::new(namespace(), StaticTasks::default());
        let sink = Recorder::default();
        let result = app
            .delete(&"projects/p/assets/a".parse().unwrap(), |_| true, &sink)
            .unwrap();
        assert_eq!(result.status, MutationStatus::Committed);
        assert_eq!(result.affected.len(), 4);
        let listing = result.listing.unwrap();
        assert_eq!(listing.children().count(), 1);
        assert!(sink.0.borrow().iter().any(|m| m.starts_with("phase=Done")));
    }

    #[test]
    fn declined_delete_keeps_asset() {
        let ns = namespace();
        let app = App::new(&ns, StaticTasks::default());
        let result = app
            .delete(&"projects/p/assets/table".parse().unwrap(), |_| false, &Recorder::default())
            .unwrap();
        assert_eq!(result.status, MutationStatus::Cancelled);
        assert!(ns.contains("projects/p/assets/table"));
    }
}
