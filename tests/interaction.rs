//! Pointer gestures: box select, drag, pan, wire drawing and resize
mod common;
use common::*;
use flowcanvas::prelude::*;

fn square(id: &str, x: f64, y: f64) -> Node {
    node(id, x, y, 50.0, 50.0)
}

fn port(node_id: &str, handle: &str, direction: PortDirection) -> HitTarget {
    HitTarget::Port {
        node_id: node_id.to_string(),
        handle: handle.to_string(),
        direction,
    }
}

/// Draws a wire between two hit targets with a bare controller.
fn draw_wire(store: &mut GraphStore, from: HitTarget, to: HitTarget) -> Commit {
    let mut controller = InteractionController::default();
    let mut viewport = Viewport::default();
    let mut router = ConnectorRouter::new(14.0);
    assert!(controller.pointer_down(from, Point::new(0.0, 0.0), &viewport, &mut router, false));
    assert!(router.pending().is_some());
    let commit = controller.pointer_up(&to, Point::new(50.0, 0.0), store, &mut viewport, &mut router);
    assert!(router.pending().is_none());
    assert!(controller.mode().is_idle());
    commit
}

/// A canvas over the chain document, zoomed to `zoom` around the screen origin.
fn zoomed_canvas(zoom: f64) -> Canvas {
    let mut canvas = Canvas::builder(chain_document()).build();
    canvas.viewport_mut().zoom_at(Point::new(0.0, 0.0), zoom);
    canvas.settle();
    canvas
}

#[cfg(test)]
mod selection_tests {
    use super::*;

    fn box_select(store: &mut GraphStore, to: Point) -> Commit {
        let mut controller = InteractionController::default();
        let mut viewport = Viewport::default();
        let mut router = ConnectorRouter::new(14.0);
        controller.set_tool(Tool::BoxSelect);
        controller.pointer_down(HitTarget::Canvas, Point::new(0.0, 0.0), &viewport, &mut router, false);
        assert!(matches!(controller.mode(), Mode::BoxSelecting(_)));
        controller.pointer_up(&HitTarget::Canvas, to, store, &mut viewport, &mut router)
    }

    #[test]
    fn test_box_selects_overlapping_nodes() {
        let mut store = GraphStore::new();
        store.add_node(square("n1", 0.0, 0.0));
        store.add_node(square("n2", 100.0, 100.0));

        assert_eq!(
            box_select(&mut store, Point::new(60.0, 60.0)),
            Commit::Selected(vec!["n1".to_string()])
        );
        assert_eq!(
            box_select(&mut store, Point::new(200.0, 200.0)),
            Commit::Selected(vec!["n1".to_string(), "n2".to_string()])
        );
    }

    #[test]
    fn test_box_respects_zoom_and_pan() {
        let mut store = GraphStore::new();
        store.add_node(square("n1", 0.0, 0.0));
        store.add_node(square("n2", 100.0, 100.0));

        let mut controller = InteractionController::default();
        let mut viewport = Viewport::default();
        viewport.zoom_at(Point::new(0.0, 0.0), 2.0);
        viewport.pan_by(Vector::new(-100.0, -100.0));
        let mut router = ConnectorRouter::new(14.0);

        controller.set_tool(Tool::BoxSelect);
        controller.pointer_down(HitTarget::Canvas, Point::new(110.0, 110.0), &viewport, &mut router, false);
        let commit = controller.pointer_up(
            &HitTarget::Canvas,
            Point::new(400.0, 400.0),
            &mut store,
            &mut viewport,
            &mut router,
        );
        assert_eq!(commit, Commit::Selected(vec!["n2".to_string()]));
    }

    #[test]
    fn test_shift_drag_on_background_box_selects() {
        let mut canvas = Canvas::builder(chain_document()).build();
        assert!(canvas.pointer_down(Point::new(-50.0, -50.0), true));
        assert!(matches!(canvas.controller().mode(), Mode::BoxSelecting(_)));
        let (commit, _) = canvas.pointer_up(Point::new(350.0, 150.0));
        assert_eq!(commit, Commit::Selected(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_click_selects_and_additive_click_toggles() {
        let mut canvas = Canvas::builder(chain_document()).build();
        canvas.pointer_down(Point::new(100.0, 20.0), false);
        canvas.pointer_up(Point::new(100.0, 20.0));
        assert_eq!(canvas.controller().selection().nodes, vec!["a".to_string()]);

        canvas.pointer_down(Point::new(400.0, 20.0), true);
        canvas.pointer_up(Point::new(400.0, 20.0));
        assert_eq!(
            canvas.controller().selection().nodes,
            vec!["a".to_string(), "b".to_string()]
        );

        canvas.pointer_down(Point::new(100.0, 20.0), true);
        canvas.pointer_up(Point::new(100.0, 20.0));
        assert_eq!(canvas.controller().selection().nodes, vec!["b".to_string()]);
    }

    #[test]
    fn test_select_all_skips_hidden_members() {
        let mut document = grouped_document();
        document.groups[0].collapsed = true;
        let mut canvas = Canvas::builder(document).build();
        canvas.select_all();
        let selection = canvas.controller().selection();
        assert_eq!(selection.nodes, vec!["src".to_string(), "sink".to_string()]);
        assert_eq!(selection.groups, vec!["g".to_string()]);
    }

    #[test]
    fn test_delete_selection_removes_group_content() {
        let mut document = grouped_document();
        document.groups[0].collapsed = true;
        let mut canvas = Canvas::builder(document).build();
        canvas.select_all();
        let removed = canvas.delete_selection();
        assert_eq!(removed.len(), 5);
        assert!(canvas.store().nodes().is_empty());
        assert!(canvas.store().groups().is_empty());
        assert!(canvas.store().connections().is_empty());
        assert!(canvas.router().paths().is_empty());
        assert!(canvas.controller().selection().is_empty());
    }
}

#[cfg(test)]
mod gesture_tests {
    use super::*;

    #[test]
    fn test_drag_moves_every_selected_node_by_same_local_delta() {
        let mut canvas = zoomed_canvas(2.0);
        canvas.controller_mut().select_nodes(&["a", "c"]);

        assert!(canvas.pointer_down(Point::new(100.0, 100.0), false));
        assert!(matches!(
            canvas.controller().mode(),
            Mode::DraggingSelection { .. }
        ));
        canvas.pointer_move(Point::new(120.0, 110.0));
        canvas.pointer_move(Point::new(140.0, 120.0));

        // Nothing moves until the frame tick.
        assert_eq!(canvas.store().node("a").unwrap().view.x, 0.0);
        canvas.animation_frame();

        let store = canvas.store();
        let a = &store.node("a").unwrap().view;
        let b = &store.node("b").unwrap().view;
        let c = &store.node("c").unwrap().view;
        assert_eq!((a.x, a.y), (20.0, 10.0));
        assert_eq!((b.x, b.y), (300.0, 0.0));
        assert_eq!((c.x, c.y), (620.0, 10.0));

        let (commit, _) = canvas.pointer_up(Point::new(140.0, 120.0));
        assert_eq!(commit, Commit::Moved(vec!["a".to_string(), "c".to_string()]));
        assert!(canvas.controller().mode().is_idle());
    }

    #[test]
    fn test_drag_updates_wire_paths() {
        let mut canvas = Canvas::builder(chain_document()).build();
        let before = *canvas.router().path("ab").unwrap();
        canvas.pointer_down(Point::new(100.0, 20.0), false);
        canvas.pointer_move(Point::new(100.0, 60.0));
        let report = canvas.animation_frame();
        assert!(report.routes.iter().any(|r| r.connection_id == "ab"));
        assert!(report.routes.iter().all(|r| r.connection_id != "bc"));
        let after = canvas.router().path("ab").unwrap();
        assert_eq!(after.start.y, before.start.y + 40.0);
        assert_eq!(after.end, before.end);
        canvas.pointer_up(Point::new(100.0, 60.0));
    }

    #[test]
    fn test_pan_is_raw_screen_delta() {
        let mut canvas = zoomed_canvas(2.0);
        canvas.controller_mut().select_nodes(&["a"]);
        assert!(canvas.pointer_down(Point::new(1000.0, 1000.0), false));
        assert!(canvas.controller().selection().is_empty());
        canvas.pointer_move(Point::new(1030.0, 1010.0));
        let (commit, _) = canvas.pointer_up(Point::new(1030.0, 1010.0));

        assert_eq!(commit, Commit::Panned);
        assert_eq!(canvas.viewport().pan, Vector::new(30.0, 10.0));
        assert_eq!(canvas.store().node("a").unwrap().view.x, 0.0);
    }

    #[test]
    fn test_second_press_during_gesture_is_ignored() {
        let mut canvas = Canvas::builder(chain_document()).build();
        assert!(canvas.pointer_down(Point::new(1000.0, 1000.0), false));
        assert!(!canvas.pointer_down(Point::new(100.0, 20.0), false));
        assert!(matches!(canvas.controller().mode(), Mode::Panning { .. }));
    }

    #[test]
    fn test_pointer_leave_commits_drag() {
        let mut canvas = Canvas::builder(chain_document()).build();
        canvas.pointer_down(Point::new(100.0, 20.0), false);
        canvas.pointer_move(Point::new(110.0, 20.0));
        let (commit, _) = canvas.pointer_leave();
        assert_eq!(commit, Commit::Moved(vec!["a".to_string()]));
        assert_eq!(canvas.store().node("a").unwrap().view.x, 10.0);
        assert!(canvas.controller().mode().is_idle());
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut canvas = Canvas::builder(chain_document()).build();
        assert!(canvas.pointer_down(Point::new(195.0, 95.0), false));
        assert!(matches!(
            canvas.controller().mode(),
            Mode::ResizingNode { node_id, .. } if node_id == "a"
        ));
        canvas.pointer_move(Point::new(-400.0, 145.0));
        let (commit, _) = canvas.pointer_up(Point::new(-400.0, 145.0));

        assert_eq!(commit, Commit::Resized("a".to_string()));
        let view = &canvas.store().node("a").unwrap().view;
        assert_eq!((view.width, view.height), (120.0, 150.0));
    }

    #[test]
    fn test_wheel_zooms_around_cursor() {
        let mut canvas = Canvas::builder(chain_document()).build();
        let cursor = Point::new(300.0, 200.0);
        let anchor = canvas.viewport().screen_to_local(cursor);
        canvas.wheel(cursor, -200.0);
        assert!(canvas.viewport().zoom > 1.0);
        assert!(canvas.viewport().screen_to_local(cursor).approx_eq(anchor, 1e-9));
    }
}

#[cfg(test)]
mod connection_tests {
    use super::*;

    #[test]
    fn test_drawing_a_wire_between_ports() {
        let mut canvas = Canvas::builder(chain_document()).build();
        assert!(canvas.pointer_down(Point::new(200.0, 68.0), false));
        assert!(matches!(
            canvas.controller().mode(),
            Mode::DrawingConnection { anchor } if anchor.node_id == "a"
        ));
        canvas.pointer_move(Point::new(400.0, 60.0));
        assert!(canvas.router().pending_path(canvas.scene()).is_some());

        let (commit, report) = canvas.pointer_up(Point::new(600.0, 44.0));
        let id = match commit {
            Commit::Connected(id) => id,
            other => panic!("Expected a connection, got {:?}", other),
        };
        let wire = canvas.store().connection(&id).unwrap();
        assert_eq!((wire.source_node_id.as_str(), wire.target_node_id.as_str()), ("a", "c"));
        assert!(report.routes.iter().any(|r| r.connection_id == id));
        assert!(canvas.router().pending().is_none());
    }

    #[test]
    fn test_release_over_background_cancels() {
        let mut canvas = Canvas::builder(chain_document()).build();
        canvas.pointer_down(Point::new(200.0, 68.0), false);
        let (commit, _) = canvas.pointer_up(Point::new(250.0, 500.0));
        assert_eq!(commit, Commit::ConnectionCancelled);
        assert_eq!(canvas.store().connections().len(), 2);
    }

    #[test]
    fn test_wire_can_be_drawn_from_an_input() {
        let mut store = store_of(chain_document());
        let commit = draw_wire(
            &mut store,
            port("c", "in", PortDirection::In),
            port("a", "out", PortDirection::Out),
        );
        assert!(matches!(commit, Commit::Connected(_)));
        assert_eq!(store.find_in_connections_by_node_id("c").len(), 2);
    }

    #[test]
    fn test_duplicate_and_self_wires_are_rejected() {
        let mut store = store_of(chain_document());
        assert_eq!(
            draw_wire(
                &mut store,
                port("a", "out", PortDirection::Out),
                port("b", "in", PortDirection::In)
            ),
            Commit::ConnectionCancelled
        );
        assert_eq!(
            draw_wire(
                &mut store,
                port("a", "out", PortDirection::Out),
                port("a", "in", PortDirection::In)
            ),
            Commit::ConnectionCancelled
        );
        assert_eq!(
            draw_wire(
                &mut store,
                port("a", "out", PortDirection::Out),
                port("c", "out", PortDirection::Out)
            ),
            Commit::ConnectionCancelled
        );
        assert_eq!(store.connections().len(), 2);
    }

    #[test]
    fn test_types_must_be_compatible() {
        let mut store = store_of(chain_document());
        let mut counter = Node::new("counter", "math");
        counter.variables = vec![
            NodeVariable::new("n", "number").with_ports(true, false),
            NodeVariable::new("anything", "any").with_ports(true, false),
        ];
        store.add_node(counter);

        assert_eq!(
            draw_wire(
                &mut store,
                port("a", "out", PortDirection::Out),
                port("counter", "n", PortDirection::In)
            ),
            Commit::ConnectionCancelled
        );
        assert!(matches!(
            draw_wire(
                &mut store,
                port("a", "out", PortDirection::Out),
                port("counter", "anything", PortDirection::In)
            ),
            Commit::Connected(_)
        ));
    }
}
