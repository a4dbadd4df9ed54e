//! Wire-format tests for the operation tagged union and the relay envelope.

use serde_json::json;
use uml_collab_api::models::{
    ClassPayload, LinkLabel, Operation, Point, PresenceAction, RelationKind, Size, TextField,
    WireMessage,
};

#[test]
fn test_add_class_wire_shape() {
    let op = Operation::AddClass {
        id: "c1".to_string(),
        payload: ClassPayload {
            name: "Entidad".to_string(),
            position: Point::new(50.0, 50.0),
            size: Size::new(180.0, 110.0),
            attributes: "id: int\nnombre: string".to_string(),
            methods: "crear()\neliminar()".to_string(),
        },
    };

    let value = serde_json::to_value(&op).unwrap();
    assert_eq!(value["t"], "add_class");
    assert_eq!(value["id"], "c1");
    assert_eq!(value["payload"]["name"], "Entidad");
    assert_eq!(value["payload"]["position"]["x"], 50.0);
    assert_eq!(value["payload"]["size"]["w"], 180.0);
    assert_eq!(value["payload"]["size"]["h"], 110.0);
}

#[test]
fn test_add_class_deserializes_with_defaults() {
    // A minimal payload, as a peer that only knows name and position sends it.
    let json = r#"{"t":"add_class","id":"c1","payload":{"name":"Entidad","position":{"x":50,"y":50}}}"#;
    let op: Operation = serde_json::from_str(json).unwrap();

    match op {
        Operation::AddClass { id, payload } => {
            assert_eq!(id, "c1");
            assert_eq!(payload.position, Point::new(50.0, 50.0));
            assert_eq!(payload.size, Size::new(180.0, 110.0));
            assert_eq!(payload.attributes, "");
            assert_eq!(payload.methods, "");
        }
        other => panic!("expected add_class, got {other:?}"),
    }
}

#[test]
fn test_move_round_trip() {
    let json = r#"{"t":"move","id":"c1","x":200,"y":80}"#;
    let op: Operation = serde_json::from_str(json).unwrap();
    assert_eq!(
        op,
        Operation::Move {
            id: "c1".to_string(),
            x: 200.0,
            y: 80.0
        }
    );
    assert_eq!(serde_json::to_value(&op).unwrap()["t"], "move");
}

#[test]
fn test_add_link_uses_camel_case_endpoint_keys() {
    let op = Operation::AddLink {
        id: "l1".to_string(),
        source_id: "c1".to_string(),
        target_id: "c2".to_string(),
        payload: uml_collab_api::models::LinkPayload {
            kind: RelationKind::Composition,
            labels: vec![LinkLabel::new("1..*", -20.0, -10.0)],
        },
    };

    let value = serde_json::to_value(&op).unwrap();
    assert_eq!(value["t"], "add_link");
    assert_eq!(value["sourceId"], "c1");
    assert_eq!(value["targetId"], "c2");
    assert_eq!(value["payload"]["type"], "composition");
    assert_eq!(value["payload"]["labels"][0]["text"], "1..*");
    assert_eq!(value["payload"]["labels"][0]["position"]["distance"], -20.0);
}

#[test]
fn test_label_operations_use_link_id_key() {
    let edit = Operation::EditLabel {
        link_id: "l1".to_string(),
        index: 1,
        text: "0..1".to_string(),
    };
    let value = serde_json::to_value(&edit).unwrap();
    assert_eq!(value["t"], "edit_label");
    assert_eq!(value["linkId"], "l1");
    assert_eq!(value["index"], 1);

    let del: Operation = serde_json::from_str(r#"{"t":"del_label","linkId":"l1","index":0}"#).unwrap();
    assert_eq!(
        del,
        Operation::DelLabel {
            link_id: "l1".to_string(),
            index: 0
        }
    );
}

#[test]
fn test_edit_text_field_values() {
    for (field, tag) in [
        (TextField::Name, "name"),
        (TextField::Attributes, "attributes"),
        (TextField::Methods, "methods"),
    ] {
        let op = Operation::EditText {
            id: "c1".to_string(),
            field,
            value: "x".to_string(),
        };
        assert_eq!(serde_json::to_value(&op).unwrap()["field"], tag);
    }
}

#[test]
fn test_update_vertices_round_trip() {
    let json = r#"{"t":"update_vertices","id":"l1","vertices":[{"x":1,"y":2},{"x":3,"y":4}]}"#;
    let op: Operation = serde_json::from_str(json).unwrap();
    match &op {
        Operation::UpdateVertices { id, vertices } => {
            assert_eq!(id, "l1");
            assert_eq!(vertices.len(), 2);
            assert_eq!(vertices[1], Point::new(3.0, 4.0));
        }
        other => panic!("expected update_vertices, got {other:?}"),
    }
}

#[test]
fn test_negative_label_index_is_rejected_at_parse_time() {
    let result: Result<Operation, _> =
        serde_json::from_str(r#"{"t":"del_label","linkId":"l1","index":-1}"#);
    assert!(result.is_err());
}

#[test]
fn test_unknown_tag_is_rejected() {
    let result: Result<Operation, _> = serde_json::from_str(r#"{"t":"teleport","id":"c1"}"#);
    assert!(result.is_err());
}

#[test]
fn test_operations_carry_no_clock() {
    // Last-writer-wins: the wire format must not grow ordering metadata.
    let op = Operation::Delete {
        id: "c1".to_string(),
    };
    let value = serde_json::to_value(&op).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"t") && keys.contains(&"id"));
}

#[test]
fn test_broadcast_envelope_shape() {
    let msg = WireMessage::Broadcast {
        from: Some("peer-a".to_string()),
        payload: Operation::Delete {
            id: "c1".to_string(),
        },
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["type"], "broadcast");
    assert_eq!(value["from"], "peer-a");
    assert_eq!(value["payload"]["t"], "delete");
}

#[test]
fn test_presence_envelope_shape() {
    let msg: WireMessage =
        serde_json::from_value(json!({"type": "presence", "action": "join", "peer": "p1"}))
            .unwrap();
    assert_eq!(
        msg,
        WireMessage::Presence {
            action: PresenceAction::Join,
            peer: "p1".to_string()
        }
    );
}

#[test]
fn test_target_id_names_the_mutated_entity() {
    let op = Operation::Move {
        id: "c1".to_string(),
        x: 1.0,
        y: 2.0,
    };
    assert_eq!(op.target_id(), "c1");

    let label_op = Operation::DelLabel {
        link_id: "l1".to_string(),
        index: 0,
    };
    assert_eq!(label_op.target_id(), "l1");
}

#[test]
fn test_stamping_sets_state_sync_origin() {
    // state_sync fans out to the whole room like any other frame, so it
    // carries a sender id for the own-echo filter.
    let msg = WireMessage::StateSync {
        from: None,
        payload: uml_collab_api::models::DiagramSnapshot::default(),
    };
    let stamped = msg.stamped("peer-c");
    assert_eq!(stamped.sender(), Some("peer-c"));
}

#[test]
fn test_stamping_sets_broadcast_origin() {
    let msg = WireMessage::Broadcast {
        from: None,
        payload: Operation::Delete {
            id: "c1".to_string(),
        },
    };
    let stamped = msg.stamped("peer-b");
    assert_eq!(stamped.sender(), Some("peer-b"));

    // Presence is relay-owned and passes through unchanged.
    let presence = WireMessage::Presence {
        action: PresenceAction::Leave,
        peer: "p1".to_string(),
    };
    assert_eq!(presence.clone().stamped("peer-b"), presence);
}
