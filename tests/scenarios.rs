//! 端到端场景：定义 → 索引 → 注册 → 发射 → 历史，全部走公开接口。

use std::cell::RefCell;
use std::rc::Rc;

use pnflow::net::{NetMode, PetriNet, Position, io};
use pnflow::{DispatchRequest, MarkingStream};

fn order_pipeline() -> PetriNet {
    PetriNet::declare("orders", NetMode::PetriNet, |b| {
        let clerk = b.role("clerk");
        let picker = b.role("picker");
        let queue = b.place("queue", 2, 0, Position::new(0, 0));
        let packed = b.place("packed", 0, 3, Position::new(120, 0));
        let shipped = b.place("shipped", 0, 0, Position::new(240, 0));
        let halt = b.place("halt", 0, 0, Position::new(120, 90));
        let pack = b.transition("pack", &clerk, Position::new(60, 0));
        let ship = b.transition("ship", &picker, Position::new(180, 0));
        queue.tx(b, 1, &pack);
        pack.tx(b, 1, &packed);
        packed.tx(b, 1, &ship);
        ship.tx(b, 1, &shipped);
        halt.guard(b, 1, &ship);
    })
}

#[test]
fn order_pipeline_runs_to_completion() {
    let mut stream = MarkingStream::new();
    stream.register(order_pipeline()).unwrap();
    let shipped = Rc::new(RefCell::new(0u32));
    let sink = Rc::clone(&shipped);
    stream.on("ship", move |_| *sink.borrow_mut() += 1);

    for action in ["pack", "pack", "ship", "ship"] {
        let event = stream
            .dispatch(DispatchRequest::new("orders", action, 1))
            .unwrap();
        assert!(event.ok, "{action} should fire");
    }
    assert_eq!(*shipped.borrow(), 2);
    assert_eq!(stream.seq(), 4);
    assert_eq!(stream.marking("orders").unwrap().as_slice(), &[0, 0, 2, 0]);
    let seqs: Vec<u64> = stream.history().iter().map(|entry| entry.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
}

#[test]
fn halt_token_blocks_shipping_until_cleared() {
    let mut net = order_pipeline();
    net.index().unwrap();
    let mut marking = net.initial_marking();
    assert!(net.fire(&mut marking, "pack", 1).unwrap().ok);

    let halt = net.place("halt").unwrap().offset;
    *marking.tokens_mut(halt) = 1;
    assert!(net.guard_check(&marking, "ship", 1).unwrap());
    let refused = net.fire(&mut marking, "ship", 1).unwrap();
    assert!(!refused.ok);
    assert!(refused.out.is_none());

    *marking.tokens_mut(halt) = 0;
    assert!(!net.guard_check(&marking, "ship", 1).unwrap());
    assert!(net.fire(&mut marking, "ship", 1).unwrap().ok);
    assert_eq!(marking.as_slice(), &[1, 0, 1, 0]);
}

const REVIEW_FLOW: &str = r#"{
    "type": "stateMachine",
    "places": {
        "draft":     { "initial": 1, "capacity": 1 },
        "review":    { "initial": 0, "capacity": 1 },
        "published": { "initial": 0, "capacity": 1 }
    },
    "transitions": {
        "submit":  { "role": "author" },
        "approve": { "role": "editor" },
        "reject":  { "role": "editor" }
    },
    "arcs": [
        { "source": "draft", "target": "submit", "weight": 1 },
        { "source": "submit", "target": "review", "weight": 1 },
        { "source": "review", "target": "approve", "weight": 1 },
        { "source": "approve", "target": "published", "weight": 1 },
        { "source": "review", "target": "reject", "weight": 1 },
        { "source": "reject", "target": "draft", "weight": 1 }
    ]
}"#;

#[test]
fn review_state_machine_from_json_declaration() {
    let declaration = io::from_json_str(REVIEW_FLOW).unwrap();
    let net = PetriNet::from_declaration("review", declaration);
    let mut stream = MarkingStream::new();
    stream.register(net).unwrap();

    let net = stream.net("review").unwrap();
    assert_eq!(
        net.enabled_actions(&stream.marking("review").unwrap()),
        vec!["submit"]
    );

    let event = stream
        .dispatch(DispatchRequest::new("review", "submit", 1))
        .unwrap();
    assert!(event.ok);
    assert_eq!(event.role.label, "author");
    assert_eq!(stream.marking("review").unwrap().as_slice(), &[0, 1, 0]);

    let net = stream.net("review").unwrap();
    assert_eq!(
        net.enabled_actions(&stream.marking("review").unwrap()),
        vec!["approve", "reject"]
    );

    let event = stream
        .dispatch(DispatchRequest::new("review", "approve", 1))
        .unwrap();
    assert!(event.ok);
    assert_eq!(event.role.label, "editor");

    // 已发布，review 为空，再批准只能被拒绝
    let refused = stream
        .dispatch(DispatchRequest::new("review", "approve", 1))
        .unwrap();
    assert!(!refused.ok);
    assert_eq!(stream.marking("review").unwrap().as_slice(), &[0, 0, 1]);
    assert_eq!(stream.seq(), 2);
}

#[test]
fn restart_rewinds_every_net() {
    let mut stream = MarkingStream::new();
    stream.register(order_pipeline()).unwrap();
    let declaration = io::from_json_str(REVIEW_FLOW).unwrap();
    stream
        .register(PetriNet::from_declaration("review", declaration))
        .unwrap();

    stream
        .dispatch(DispatchRequest::new("orders", "pack", 1))
        .unwrap();
    stream
        .dispatch(DispatchRequest::new("review", "submit", 1))
        .unwrap();
    assert_eq!(stream.seq(), 2);

    stream.restart();
    assert_eq!(stream.seq(), 0);
    assert!(stream.history().is_empty());
    assert_eq!(stream.marking("orders").unwrap().as_slice(), &[2, 0, 0, 0]);
    assert_eq!(stream.marking("review").unwrap().as_slice(), &[1, 0, 0]);
    assert_eq!(
        stream.schemas().collect::<Vec<_>>(),
        vec!["orders", "review"]
    );
}
