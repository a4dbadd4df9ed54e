//! Unit tests for the collaboration session: broadcast gating, idempotent
//! remote application, echo suppression and bounded coalesced broadcast.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;
use uml_collab_api::models::{
    ClassPayload, LinkPayload, Operation, Point, RelationKind, Size, TextField, WireMessage,
};
use uml_collab_api::services::{CollaborationService, DiagramService, Origin, Phase};
use uml_collab_api::transport::Transport;

/// Test transport that records every outbound frame and replays scripted
/// inbound frames.
#[derive(Default)]
struct RecordingTransport {
    sent: Rc<RefCell<Vec<WireMessage>>>,
    inbound: VecDeque<WireMessage>,
}

impl RecordingTransport {
    fn new() -> (Self, Rc<RefCell<Vec<WireMessage>>>) {
        let transport = Self::default();
        let sent = transport.sent.clone();
        (transport, sent)
    }

    fn push_inbound(&mut self, message: WireMessage) {
        self.inbound.push_back(message);
    }
}

impl Transport for RecordingTransport {
    fn init(&mut self, _room_id: &str) -> Result<()> {
        Ok(())
    }

    fn send_to_all(&mut self, message: &WireMessage) -> Result<()> {
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<WireMessage> {
        self.inbound.pop_front()
    }
}

fn class_payload(name: &str, x: f64, y: f64) -> ClassPayload {
    ClassPayload {
        name: name.to_string(),
        position: Point::new(x, y),
        size: Size::default(),
        attributes: String::new(),
        methods: String::new(),
    }
}

fn add_class_op(id: &str, x: f64, y: f64) -> Operation {
    Operation::AddClass {
        id: id.to_string(),
        payload: class_payload("Entidad", x, y),
    }
}

fn sent_ops(sent: &Rc<RefCell<Vec<WireMessage>>>) -> Vec<Operation> {
    sent.borrow()
        .iter()
        .filter_map(|m| match m {
            WireMessage::Broadcast { payload, .. } => Some(payload.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_broadcast_before_init_never_reaches_transport() {
    let (transport, sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);

    session.broadcast(add_class_op("c1", 0.0, 0.0));
    session.request_full_sync();
    assert!(sent.borrow().is_empty());

    session.init("room-1").unwrap();
    assert!(session.is_ready());
    session.broadcast(add_class_op("c1", 0.0, 0.0));
    assert_eq!(sent.borrow().len(), 1);
}

#[test]
fn test_applying_same_add_class_twice_keeps_one_entity() {
    let (transport, _sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);
    let mut diagram = DiagramService::new();

    let op = add_class_op("c1", 50.0, 50.0);
    session.apply_remote(&mut diagram, op.clone());
    session.apply_remote(&mut diagram, op);

    assert_eq!(diagram.graph().len(), 1);
    assert_eq!(diagram.graph().class("c1").unwrap().position, Point::new(50.0, 50.0));
}

#[test]
fn test_remote_delete_of_absent_id_is_a_noop() {
    let (transport, _sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);
    let mut diagram = DiagramService::new();

    session.apply_remote(
        &mut diagram,
        Operation::Delete {
            id: "never-created".to_string(),
        },
    );
    assert!(diagram.graph().is_empty());
}

#[test]
fn test_stale_remote_operations_do_not_crash_the_session() {
    let (transport, sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);
    session.init("room-1").unwrap();
    let mut diagram = DiagramService::new();

    // Every one of these references missing or out-of-range state.
    let stale = vec![
        Operation::EditText {
            id: "ghost".to_string(),
            field: TextField::Name,
            value: "X".to_string(),
        },
        Operation::Move {
            id: "ghost".to_string(),
            x: 1.0,
            y: 1.0,
        },
        Operation::Resize {
            id: "ghost".to_string(),
            w: 10.0,
            h: 10.0,
        },
        Operation::UpdateVertices {
            id: "ghost".to_string(),
            vertices: vec![],
        },
        Operation::MoveLink {
            id: "ghost".to_string(),
            source_id: "a".to_string(),
            target_id: "b".to_string(),
        },
        Operation::EditLabel {
            link_id: "ghost".to_string(),
            index: 3,
            text: "x".to_string(),
        },
        Operation::DelLabel {
            link_id: "ghost".to_string(),
            index: 0,
        },
        Operation::AddLink {
            id: "l1".to_string(),
            source_id: "ghost".to_string(),
            target_id: "ghost2".to_string(),
            payload: LinkPayload {
                kind: RelationKind::Association,
                labels: vec![],
            },
        },
    ];
    for op in stale {
        session.apply_remote(&mut diagram, op);
    }

    assert!(diagram.graph().is_empty());
    // And none of it produced outbound traffic.
    assert!(sent.borrow().is_empty());
}

#[test]
fn test_echo_suppression_for_every_operation_kind() {
    let (transport, sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);
    session.init("room-1").unwrap();
    let mut diagram = DiagramService::new();

    let ops = vec![
        add_class_op("c1", 50.0, 50.0),
        add_class_op("c2", 300.0, 50.0),
        Operation::AddLink {
            id: "l1".to_string(),
            source_id: "c1".to_string(),
            target_id: "c2".to_string(),
            payload: LinkPayload {
                kind: RelationKind::Aggregation,
                labels: vec![uml_collab_api::models::LinkLabel::new("0..1", 20.0, -10.0)],
            },
        },
        Operation::EditText {
            id: "c1".to_string(),
            field: TextField::Name,
            value: "Cliente".to_string(),
        },
        Operation::Move {
            id: "c1".to_string(),
            x: 80.0,
            y: 90.0,
        },
        Operation::Resize {
            id: "c2".to_string(),
            w: 220.0,
            h: 140.0,
        },
        Operation::UpdateVertices {
            id: "l1".to_string(),
            vertices: vec![Point::new(5.0, 5.0)],
        },
        Operation::EditLabel {
            link_id: "l1".to_string(),
            index: 0,
            text: "1..1".to_string(),
        },
        Operation::MoveLabel {
            link_id: "l1".to_string(),
            index: 0,
            position: uml_collab_api::models::LabelPosition {
                distance: 0.7,
                offset: 4.0,
            },
        },
        Operation::DelLabel {
            link_id: "l1".to_string(),
            index: 0,
        },
        Operation::Delete {
            id: "c2".to_string(),
        },
    ];

    for op in ops {
        session.apply_remote(&mut diagram, op);
        session.pump_local(&mut diagram);
        session.on_frame();
    }

    assert!(
        sent.borrow().is_empty(),
        "remote application must never generate outbound operations"
    );
    // The mutations themselves did land.
    assert_eq!(diagram.graph().class("c1").unwrap().name, "Cliente");
    assert!(!diagram.has_cell("c2"));
}

#[test]
fn test_coalesced_drag_is_bounded_by_frames_plus_final_flush() {
    let (transport, sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);
    session.init("room-1").unwrap();
    let mut diagram = DiagramService::new();

    let id = diagram
        .create_class(class_payload("Entidad", 0.0, 0.0), None, Origin::Local)
        .unwrap();
    session.pump_local(&mut diagram);
    sent.borrow_mut().clear();

    // 100 intermediate samples, a frame tick every 10th, then pointer-up.
    let frames = 10;
    for i in 0..100 {
        diagram
            .move_cell(&id, f64::from(i), f64::from(i), Origin::Local, Phase::Drag)
            .unwrap();
        session.pump_local(&mut diagram);
        if (i + 1) % 10 == 0 {
            session.on_frame();
        }
    }
    diagram
        .move_cell(&id, 200.0, 80.0, Origin::Local, Phase::Release)
        .unwrap();
    session.pump_local(&mut diagram);
    session.on_frame();

    let moves: Vec<Operation> = sent_ops(&sent)
        .into_iter()
        .filter(|op| matches!(op, Operation::Move { .. }))
        .collect();
    assert!(
        moves.len() <= frames + 1,
        "expected at most {} move broadcasts, got {}",
        frames + 1,
        moves.len()
    );
    assert_eq!(
        moves.last().unwrap(),
        &Operation::Move {
            id,
            x: 200.0,
            y: 80.0
        }
    );
}

#[test]
fn test_deferred_add_link_emits_exactly_once() {
    let (transport, sent) = RecordingTransport::new();
    let mut session = CollaborationService::new(transport);
    session.init("room-1").unwrap();
    let mut diagram = DiagramService::new();

    let a = diagram
        .create_class(class_payload("A", 0.0, 0.0), None, Origin::Local)
        .unwrap();
    let b = diagram
        .create_class(class_payload("B", 300.0, 0.0), None, Origin::Local)
        .unwrap();
    session.pump_local(&mut diagram);
    sent.borrow_mut().clear();

    let l = diagram
        .begin_relationship(&a, RelationKind::Composition, vec![], Origin::Local)
        .unwrap();
    session.pump_local(&mut diagram);
    assert!(
        sent_ops(&sent).is_empty(),
        "a pending link must not be announced"
    );

    diagram.attach_target(&l, &b, Origin::Local).unwrap();
    session.pump_local(&mut diagram);

    let links: Vec<Operation> = sent_ops(&sent)
        .into_iter()
        .filter(|op| matches!(op, Operation::AddLink { .. }))
        .collect();
    assert_eq!(links.len(), 1);
    match &links[0] {
        Operation::AddLink {
            id,
            source_id,
            target_id,
            payload,
        } => {
            assert_eq!(id, &l);
            assert_eq!(source_id, &a);
            assert_eq!(target_id, &b);
            assert_eq!(payload.kind, RelationKind::Composition);
        }
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn test_sync_request_is_answered_with_state_sync() {
    let (mut transport, sent) = RecordingTransport::new();
    transport.push_inbound(WireMessage::SyncRequest {
        from: Some("late-joiner".to_string()),
    });
    let mut session = CollaborationService::new(transport);
    session.init("room-1").unwrap();

    let mut diagram = DiagramService::new();
    diagram
        .create_class(class_payload("A", 10.0, 20.0), Some("c1".to_string()), Origin::Local)
        .unwrap();
    session.pump_local(&mut diagram);
    sent.borrow_mut().clear();

    session.pump_remote(&mut diagram);

    let frames = sent.borrow();
    assert_eq!(frames.len(), 1);
    match &frames[0] {
        WireMessage::StateSync { payload, .. } => {
            assert_eq!(payload.classes.len(), 1);
            assert_eq!(payload.classes[0].id, "c1");
        }
        other => panic!("expected state_sync, got {other:?}"),
    }
}

#[test]
fn test_state_sync_backfills_missing_entities_without_overwriting() {
    let (mut transport, sent) = RecordingTransport::new();

    let mut remote_diagram = DiagramService::new();
    remote_diagram
        .create_class(class_payload("A", 1.0, 2.0), Some("c1".to_string()), Origin::Local)
        .unwrap();
    remote_diagram
        .create_class(class_payload("B", 3.0, 4.0), Some("c2".to_string()), Origin::Local)
        .unwrap();
    transport.push_inbound(WireMessage::StateSync {
        from: Some("peer-with-state".to_string()),
        payload: remote_diagram.export_snapshot(),
    });

    let mut session = CollaborationService::new(transport);
    session.init("room-1").unwrap();

    // Locally we already have c1, at a newer position.
    let mut diagram = DiagramService::new();
    diagram
        .create_class(class_payload("A", 500.0, 500.0), Some("c1".to_string()), Origin::Local)
        .unwrap();
    session.pump_local(&mut diagram);
    sent.borrow_mut().clear();

    session.pump_remote(&mut diagram);

    // c2 was backfilled, c1 untouched, and nothing re-broadcast.
    assert!(diagram.has_cell("c2"));
    assert_eq!(diagram.graph().class("c1").unwrap().position, Point::new(500.0, 500.0));
    assert!(sent.borrow().is_empty());
}
