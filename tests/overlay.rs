//! Execution overlay fed through the canvas subscription channel
mod common;
use common::*;
use flowcanvas::prelude::*;

fn collapsed_canvas() -> Canvas {
    let mut document = grouped_document();
    document.groups[0].collapsed = true;
    Canvas::builder(document).with_flow("flow-1", "1").build()
}

fn ended(id: &str, status: ExecutionStatus) -> OverlayChange {
    OverlayChange::Ended {
        element_id: id.to_string(),
        status,
    }
}

#[cfg(test)]
mod overlay_tests {
    use super::*;

    #[test]
    fn test_fan_in_group_glows_until_last_member_ends() {
        let mut canvas = collapsed_canvas();
        let sender = canvas.subscribe_execution("flow-1");
        assert_eq!(canvas.overlay().flow_id(), Some("flow-1"));

        for id in ["m1", "m2", "m3"] {
            sender.send(ExecutionMessage::start(id)).unwrap();
        }
        let changes = canvas.pump_execution();
        assert_eq!(changes, vec![OverlayChange::Started("g".to_string())]);
        assert!(canvas.overlay().is_executing("g"));
        assert_eq!(canvas.overlay().in_flight("g"), 3);

        sender.send(ExecutionMessage::end("m1", ExecutionStatus::Success)).unwrap();
        sender.send(ExecutionMessage::end("m2", ExecutionStatus::Success)).unwrap();
        assert!(canvas.pump_execution().is_empty());
        assert!(canvas.overlay().is_executing("g"));

        sender.send(ExecutionMessage::end("m3", ExecutionStatus::Success)).unwrap();
        assert_eq!(
            canvas.pump_execution(),
            vec![ended("g", ExecutionStatus::Success)]
        );
        assert!(!canvas.overlay().is_executing("g"));
        assert_eq!(
            canvas.overlay().state("g").status,
            Some(ExecutionStatus::Success)
        );
    }

    #[test]
    fn test_visible_nodes_glow_individually() {
        let mut canvas = collapsed_canvas();
        let sender = canvas.subscribe_execution("flow-1");
        sender.send(ExecutionMessage::start("src")).unwrap();
        sender.send(ExecutionMessage::start("m2")).unwrap();
        sender.send(ExecutionMessage::end("src", ExecutionStatus::Error)).unwrap();

        let changes = canvas.pump_execution();
        assert_eq!(
            changes,
            vec![
                OverlayChange::Started("src".to_string()),
                OverlayChange::Started("g".to_string()),
                ended("src", ExecutionStatus::Error),
            ]
        );
        assert_eq!(canvas.overlay().state("src").status, Some(ExecutionStatus::Error));
        assert!(canvas.overlay().is_executing("g"));
    }

    #[test]
    fn test_group_status_is_the_worst_member_status() {
        let mut canvas = collapsed_canvas();
        let sender = canvas.subscribe_execution("flow-1");
        sender.send(ExecutionMessage::start("m1")).unwrap();
        sender.send(ExecutionMessage::start("m2")).unwrap();
        sender.send(ExecutionMessage::end("m1", ExecutionStatus::Killed)).unwrap();
        sender.send(ExecutionMessage::end("m2", ExecutionStatus::Success)).unwrap();
        let changes = canvas.pump_execution();
        assert_eq!(changes.last(), Some(&ended("g", ExecutionStatus::Killed)));
    }

    #[test]
    fn test_run_end_clears_everything() {
        let mut canvas = collapsed_canvas();
        let sender = canvas.subscribe_execution("flow-1");
        sender.send(ExecutionMessage::start("m1")).unwrap();
        sender.send(ExecutionMessage::start("src")).unwrap();
        sender.send(ExecutionMessage::run_end()).unwrap();

        let changes = canvas.pump_execution();
        assert_eq!(changes.last(), Some(&OverlayChange::Cleared));
        assert!(!canvas.overlay().is_executing("g"));
        assert!(!canvas.overlay().is_executing("src"));
        assert_eq!(canvas.overlay().in_flight("g"), 0);
    }

    #[test]
    fn test_resubscribing_ignores_the_previous_flow() {
        let mut canvas = collapsed_canvas();
        let stale = canvas.subscribe_execution("flow-1");
        let fresh = canvas.subscribe_execution("flow-2");
        assert!(stale.send(ExecutionMessage::start("src")).is_err());
        fresh.send(ExecutionMessage::start("sink")).unwrap();

        assert_eq!(
            canvas.pump_execution(),
            vec![OverlayChange::Started("sink".to_string())]
        );
        assert!(!canvas.overlay().is_executing("src"));
        assert_eq!(canvas.overlay().flow_id(), Some("flow-2"));
    }

    #[test]
    fn test_messages_sent_from_an_async_producer() {
        let mut canvas = collapsed_canvas();
        let sender = canvas.subscribe_execution("flow-1");
        tokio_test::block_on(async move {
            sender.send(ExecutionMessage::start("m3")).unwrap();
            sender.send(ExecutionMessage::end("m3", ExecutionStatus::Error)).unwrap();
        });
        assert_eq!(
            canvas.pump_execution(),
            vec![
                OverlayChange::Started("g".to_string()),
                ended("g", ExecutionStatus::Error),
            ]
        );
    }

    #[test]
    fn test_nested_collapsed_groups_glow_on_the_outermost() {
        let mut canvas = Canvas::builder(grouped_document()).build();
        let inner = canvas.create_group(&["m2", "m3"], "Inner").unwrap();
        canvas.toggle_collapse(&inner);
        canvas.toggle_collapse("g");

        let sender = canvas.subscribe_execution("flow-1");
        sender.send(ExecutionMessage::start("m2")).unwrap();
        sender.send(ExecutionMessage::start("m1")).unwrap();
        assert_eq!(
            canvas.pump_execution(),
            vec![OverlayChange::Started("g".to_string())]
        );
        assert!(!canvas.overlay().is_executing(&inner));
        assert_eq!(canvas.overlay().in_flight("g"), 2);

        sender.send(ExecutionMessage::end("m2", ExecutionStatus::Success)).unwrap();
        sender.send(ExecutionMessage::end("m1", ExecutionStatus::Success)).unwrap();
        assert_eq!(
            canvas.pump_execution(),
            vec![ended("g", ExecutionStatus::Success)]
        );
    }

    #[test]
    fn test_wire_format_messages() {
        let start = ExecutionMessage::from_json(r#"{"node_id": "m1", "event": "start_node"}"#).unwrap();
        assert_eq!(start, ExecutionMessage::start("m1"));
        let end =
            ExecutionMessage::from_json(r#"{"node_id": "m1", "event": "end_node", "status": "killed"}"#)
                .unwrap();
        assert_eq!(end.status, Some(ExecutionStatus::Killed));
        let run_end = ExecutionMessage::from_json(r#"{"event": "run_end"}"#).unwrap();
        assert_eq!(run_end, ExecutionMessage::run_end());
        assert!(ExecutionMessage::from_json(r#"{"event": "explode"}"#).is_err());
    }

    #[test]
    fn test_overlay_never_touches_the_graph() {
        let mut canvas = collapsed_canvas();
        let before = canvas.store().to_document();
        let sender = canvas.subscribe_execution("flow-1");
        sender.send(ExecutionMessage::start("m1")).unwrap();
        sender.send(ExecutionMessage::end("m1", ExecutionStatus::Error)).unwrap();
        canvas.pump_execution();
        assert_eq!(canvas.store().to_document(), before);
    }
}
