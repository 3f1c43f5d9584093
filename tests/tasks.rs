use assert_matches::assert_matches;
use serde_json::json;

use eeview::error::EeError;
use eeview::tasks::{self, Operation, StaticTasks, TaskClient};

struct Unreachable;

impl TaskClient for Unreachable {
    fn list_operations(&self) -> Result<Vec<Operation>, EeError> {
        Err(EeError::RemoteStatus {
            status: 403,
            message: "permission denied".to_string(),
        })
    }
}

fn operations() -> Vec<Operation> {
    serde_json::from_value(json!([
        {
            "name": "projects/p/operations/AAA",
            "done": true,
            "metadata": {
                "state": "SUCCEEDED",
                "type": "EXPORT_FEATURES",
                "description": "zones",
                "attempt": 2,
                "startTime": "2024-01-01T00:00:00Z",
                "endTime": "2024-01-01T00:00:42Z",
                "batchEecuUsageSeconds": 0.25
            }
        },
        {
            "name": "projects/p/operations/BBB",
            "metadata": {"state": "PENDING", "type": "EXPORT_TILES"}
        },
        {"name": "projects/p/operations/CCC"}
    ]))
    .unwrap()
}

#[test]
fn summaries_keep_remote_order() {
    let summaries = tasks::list_tasks(&StaticTasks(operations())).unwrap();
    let ids: Vec<_> = summaries.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["AAA", "BBB", "CCC"]);

    let done = &summaries[0];
    assert_eq!(done.runtime.as_deref(), Some("00:00:42"));
    assert_eq!(done.consumption.as_deref(), Some("0.250000 EECU/s"));
    assert_eq!(done.attempted, "2 time");
    assert_eq!(done.type_icon, "mdi-table");
    assert_eq!((done.status_icon, done.status_color), ("mdi-check", "success"));
}

#[test]
fn unknown_states_and_types_get_fallback_icons() {
    let summaries = tasks::list_tasks(&StaticTasks(operations())).unwrap();
    let pending = &summaries[1];
    assert_eq!(pending.status_icon, "mdi-timer-sand");
    assert_eq!(pending.type_icon, "mdi-cog-outline");
    assert!(pending.runtime.is_none());

    // metadata is optional on the wire
    assert_eq!(summaries[2].state, "");
    assert_eq!(summaries[2].attempted, "0 time");
}

#[test]
fn client_errors_propagate() {
    assert_matches!(
        tasks::list_tasks(&Unreachable),
        Err(EeError::RemoteStatus { status: 403, .. })
    );
}
