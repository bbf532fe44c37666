//! Common test utilities for building documents and canvases.
use flowcanvas::prelude::*;

/// A node at `(x, y)` with one string input `in` and one string output `out`.
#[allow(dead_code)]
pub fn node(id: &str, x: f64, y: f64, width: f64, height: f64) -> Node {
    let mut node = Node::new(id, "step");
    node.view.x = x;
    node.view.y = y;
    node.view.width = width;
    node.view.height = height;
    node.variables = vec![
        NodeVariable::new("in", "string").with_ports(true, false),
        NodeVariable::new("out", "string").with_ports(false, true),
    ];
    node
}

/// A wire from `source.out` to `target.in`.
#[allow(dead_code)]
pub fn wire(id: &str, source: &str, target: &str) -> Connection {
    Connection::new(id, (source, "out"), (target, "in"))
}

/// Three nodes in a chain: `a -> b -> c`.
#[allow(dead_code)]
pub fn chain_document() -> Document {
    Document {
        nodes: vec![
            node("a", 0.0, 0.0, 200.0, 100.0),
            node("b", 300.0, 0.0, 200.0, 100.0),
            node("c", 600.0, 0.0, 200.0, 100.0),
        ],
        connections: vec![wire("ab", "a", "b"), wire("bc", "b", "c")],
        groups: vec![],
    }
}

/// `src -> m1 -> m2 -> m3 -> sink`, with `m1`, `m2` and `m3` in group `g`.
///
/// `src_m1` and `m3_sink` cross the group boundary; `m1_m2` and `m2_m3` are internal.
#[allow(dead_code)]
pub fn grouped_document() -> Document {
    Document {
        nodes: vec![
            node("src", 0.0, 0.0, 200.0, 100.0),
            node("m1", 300.0, 0.0, 200.0, 100.0),
            node("m2", 300.0, 200.0, 200.0, 100.0),
            node("m3", 300.0, 400.0, 200.0, 100.0),
            node("sink", 700.0, 0.0, 200.0, 100.0),
        ],
        connections: vec![
            wire("src_m1", "src", "m1"),
            wire("m1_m2", "m1", "m2"),
            wire("m2_m3", "m2", "m3"),
            wire("m3_sink", "m3", "sink"),
        ],
        groups: vec![Group {
            id: "g".to_string(),
            name: "Middle".to_string(),
            nodes: vec!["m1".to_string(), "m2".to_string(), "m3".to_string()],
            parent: None,
            view: Rect::new(284.0, -16.0, 232.0, 532.0),
            collapsed: false,
        }],
    }
}

/// A node whose aggregate variable `fields` holds `[a, b, c]`:
/// `a` is a string input, `b` a string without ports, `c` a number output.
#[allow(dead_code)]
pub fn aggregate_node(id: &str) -> Node {
    let mut node = node(id, 300.0, 0.0, 200.0, 160.0);
    node.variables.push(
        NodeVariable::new("fields", "dict").with_value(VariableValue::Variables(vec![
            NodeVariable::new("a", "string").with_ports(true, false),
            NodeVariable::new("b", "string"),
            NodeVariable::new("c", "number").with_ports(false, true),
        ])),
    );
    node
}

#[allow(dead_code)]
pub fn store_of(document: Document) -> GraphStore {
    let mut store = GraphStore::from_document(document);
    store.sync_group_flags();
    store.drain_events();
    store
}

/// Every `(source node, source handle, target node, target handle)` tuple, sorted.
#[allow(dead_code)]
pub fn endpoint_set(store: &GraphStore) -> Vec<(String, String, String, String)> {
    let mut set: Vec<_> = store
        .connections()
        .iter()
        .map(|c| {
            (
                c.source_node_id.clone(),
                c.source_handle.clone(),
                c.target_node_id.clone(),
                c.target_handle.clone(),
            )
        })
        .collect();
    set.sort();
    set
}

/// A saved document covering every value shape and optional field.
#[allow(dead_code)]
pub const FULL_DOCUMENT_JSON: &str = r#"{
  "nodes": [
    {
      "id": "llm_1",
      "type": "llm",
      "category": "ai",
      "variables": [
        {"handle": "prompt", "name": "Prompt", "type": "string", "value": "Hello", "has_in": true, "has_out": false, "published": true, "group_name_override": "Question"},
        {"handle": "temperature", "name": "Temperature", "type": "number", "value": 0.7, "has_in": false, "has_out": false, "published": false},
        {"handle": "max_tokens", "name": "Max tokens", "type": "number", "value": 512, "has_in": false, "has_out": false, "published": false},
        {"handle": "stream", "name": "Stream", "type": "bool", "value": true, "has_in": false, "has_out": false, "published": false, "dock": {"visible": false}},
        {"handle": "docs", "name": "Docs", "type": "file", "value": [{"name": "a.pdf", "url": "https://files/a.pdf"}], "has_in": false, "has_out": false, "published": false},
        {"handle": "extra", "name": "Extra", "type": "dict", "value": [
          {"handle": "extra_k", "name": "Key", "type": "string", "value": null, "has_in": true, "has_out": false, "published": false}
        ], "has_in": false, "has_out": false, "published": false},
        {"handle": "answer", "name": "Answer", "type": "string", "value": null, "has_in": false, "has_out": true, "published": false}
      ],
      "view": {"x": 10.5, "y": -20.0, "width": 240.0, "height": 180.0, "collapsed": false, "disabled": true},
      "service": {"id": "svc_1", "name": "Summariser", "version": "3"}
    },
    {
      "id": "out_1",
      "type": "output",
      "category": "io",
      "variables": [
        {"handle": "text", "name": "Text", "type": "string", "value": null, "has_in": true, "has_out": false, "published": false}
      ],
      "view": {"x": 400.0, "y": 0.0, "width": 200.0, "height": 80.0, "collapsed": true, "disabled": false}
    }
  ],
  "connections": [
    {"id": "c1", "sourceNodeId": "llm_1", "sourceHandle": "answer", "targetNodeId": "out_1", "targetHandle": "text", "isInGroup": false},
    {"id": "c2", "sourceNodeId": "out_1", "sourceHandle": "text", "targetNodeId": "llm_1", "targetHandle": "extra_k", "isInGroup": false, "hidden": true}
  ]
}"#;
