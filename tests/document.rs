//! Document load/save, validation and snapshot tests
mod common;
use common::*;
use flowcanvas::prelude::*;

#[cfg(test)]
mod document_tests {
    use super::*;

    #[test]
    fn test_round_trip_is_byte_identical() {
        let document = Document::from_json(FULL_DOCUMENT_JSON).expect("Failed to parse document");
        let first = document.to_json().unwrap();
        let second = Document::from_json(&first).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_trip_through_store() {
        let document = Document::from_json(FULL_DOCUMENT_JSON).unwrap();
        let store = GraphStore::from_document(document.clone());
        assert_eq!(store.to_document(), document);
        assert_eq!(store.to_document().to_json().unwrap(), document.to_json().unwrap());
    }

    #[test]
    fn test_group_free_document_keeps_two_keys() {
        let json = chain_document().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(value.get("nodes").is_some());
        assert!(value.get("connections").is_some());
    }

    #[test]
    fn test_values_keep_their_shape() {
        let document = Document::from_json(FULL_DOCUMENT_JSON).unwrap();
        let llm = &document.nodes[0];
        assert!(matches!(
            llm.find_variable("prompt").unwrap().value,
            VariableValue::Text(ref s) if s == "Hello"
        ));
        assert!(matches!(
            llm.find_variable("stream").unwrap().value,
            VariableValue::Bool(true)
        ));
        assert!(matches!(
            llm.find_variable("docs").unwrap().value,
            VariableValue::Files(ref files) if files.len() == 1
        ));
        assert!(llm.find_variable("extra").unwrap().is_aggregate());
        assert_eq!(llm.find_variable("extra_k").unwrap().name, "Key");
        assert!(!llm.find_variable("stream").unwrap().is_dock_visible());

        let json = document.to_json().unwrap();
        assert!(json.contains("\"value\":512"));
        assert!(json.contains("\"value\":0.7"));
    }

    #[test]
    fn test_connection_uses_camel_case() {
        let json = chain_document().to_json().unwrap();
        assert!(json.contains("\"sourceNodeId\":\"a\""));
        assert!(json.contains("\"targetHandle\":\"in\""));
        assert!(!json.contains("hidden"));
        assert!(!json.contains("sourceGroupId"));
    }

    #[test]
    fn test_adding_flag_is_not_persisted() {
        let mut document = chain_document();
        document.nodes[0].view.adding = true;
        let json = document.to_json().unwrap();
        assert!(!json.contains("adding"));
        let reloaded = Document::from_json(&json).unwrap();
        assert!(!reloaded.nodes[0].view.adding);
    }

    #[test]
    fn test_validate_accepts_consistent_document() {
        assert!(grouped_document().validate().is_ok());
        assert!(Document::from_json(FULL_DOCUMENT_JSON).unwrap().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_duplicates_and_dangling_refs() {
        let mut duplicate = chain_document();
        duplicate.nodes.push(node("a", 0.0, 0.0, 10.0, 10.0));
        assert!(matches!(
            duplicate.validate(),
            Err(DocumentError::DuplicateId { kind: "node", .. })
        ));

        let mut dangling = chain_document();
        dangling.connections.push(wire("ax", "a", "ghost"));
        match dangling.validate() {
            Err(DocumentError::DanglingConnection {
                connection_id,
                missing_id,
                ..
            }) => {
                assert_eq!(connection_id, "ax");
                assert_eq!(missing_id, "ghost");
            }
            other => panic!("Expected a dangling connection, got {:?}", other),
        }

        let mut shared = grouped_document();
        shared.groups.push(Group {
            id: "g2".to_string(),
            name: "Other".to_string(),
            nodes: vec!["m1".to_string()],
            parent: None,
            view: Rect::default(),
            collapsed: false,
        });
        assert!(matches!(
            shared.validate(),
            Err(DocumentError::MultipleMembership { .. })
        ));
    }

    #[test]
    fn test_store_drops_dangling_connections_on_load() {
        let mut document = chain_document();
        document.connections.push(wire("ax", "a", "ghost"));
        let store = GraphStore::from_document(document);
        assert_eq!(store.connections().len(), 2);
        assert!(store.connection("ax").is_none());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            Document::from_json("{\"nodes\": 3}"),
            Err(DocumentError::JsonParseError(_))
        ));
    }

    #[test]
    fn test_snapshot_bytes_restore_document() {
        let document = Document::from_json(FULL_DOCUMENT_JSON).unwrap();
        let snapshot = DocumentSnapshot::capture("flow-1", 7, &document).unwrap();
        let bytes = snapshot.to_bytes().unwrap();
        let decoded = DocumentSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.flow_id, "flow-1");
        assert_eq!(decoded.version, 7);
        assert_eq!(decoded.restore().unwrap(), document);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let path = std::env::temp_dir().join(format!("flowcanvas-snapshot-{}.bin", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let snapshot = DocumentSnapshot::capture("flow-2", 1, &grouped_document()).unwrap();
        snapshot.save(&path).unwrap();
        let loaded = DocumentSnapshot::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_missing_snapshot_file_is_io_error() {
        assert!(matches!(
            DocumentSnapshot::from_file("/definitely/not/here.bin"),
            Err(DocumentError::Io { .. })
        ));
    }

    #[test]
    fn test_json_value_converts_into_document() {
        let value: serde_json::Value = serde_json::from_str(FULL_DOCUMENT_JSON).unwrap();
        let document = value.into_document().unwrap();
        assert_eq!(document.nodes.len(), 2);

        let broken = serde_json::json!({ "nodes": "nope" });
        assert!(broken.into_document().is_err());
    }

    #[test]
    fn test_canvas_save_matches_loaded_document() {
        let canvas = Canvas::builder(Document::from_json(FULL_DOCUMENT_JSON).unwrap()).build();
        let saved = canvas.save_json().unwrap();
        let reloaded = Document::from_json(&saved).unwrap();
        assert_eq!(reloaded, Document::from_json(FULL_DOCUMENT_JSON).unwrap());
    }
}
