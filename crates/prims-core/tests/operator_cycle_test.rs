//! Integration tests for a full select-and-execute operator cycle.

use mockall::mock;
use prims_core::operator::add_operator;
use prims_core::{
    BufferName, Buffers, Chunk, DeclarativeConfig, DeclarativeMemory, MemoryTrace,
    OperatorSelector, ProceduralConfig, ProceduralLayer, TraceConfig, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

mock! {
    Productions {}

    impl ProceduralLayer for Productions {
        fn find_matching_production(&mut self, buffers: &Buffers, now: f64) -> Option<String>;
        fn fire_production(&mut self, production: &str, buffers: &mut Buffers, now: f64) -> bool;
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

/// A counting task: one operator reads the goal, the other reports.
fn counting_model() -> DeclarativeMemory {
    let mut memory = DeclarativeMemory::new(DeclarativeConfig::deterministic().with_goal_operator_learning(0.2));
    let goal = memory.new_chunk("count-goal").with_slot("isa", text("goal"));
    memory.add_to_memory(goal, 0.0).unwrap();

    for (op, cond, state, actions) in [
        ("op-count", "cond-count", "counting", vec!["retrieve", "increment"]),
        ("op-report", "cond-report", "done", vec!["retrieve", "say"]),
    ] {
        let condition = memory.new_chunk(cond).with_slot("G1", text(state));
        memory.add_to_memory(condition, 0.0).unwrap();
        let mut operator = memory.new_chunk(op).with_slot("isa", text("operator"));
        let actions: Vec<String> = actions.into_iter().map(String::from).collect();
        add_operator(&mut memory, &mut operator, cond, &actions, 0.0).unwrap();
        memory.add_to_memory(operator, 0.0).unwrap();
    }
    memory
}

fn goal(state: &str) -> Chunk {
    Chunk::new("g", Default::default())
        .with_slot("slot1", text(state))
        .with_slot("slot2", Value::Symbol("count-goal".into()))
}

#[test]
fn test_select_then_execute() {
    let mut memory = counting_model();
    // The second operator reuses the shared prefix of the first.
    assert_eq!(
        memory.chunk("op-report").unwrap().slot("action"),
        Some(&text("retrieve;say"))
    );

    let trace = Rc::new(RefCell::new(MemoryTrace::new(TraceConfig::default())));
    let mut selector = OperatorSelector::new(ProceduralConfig::default(), Box::new(Rc::clone(&trace)));
    let mut buffers = Buffers::new().with(BufferName::Goal, goal("counting"));
    let mut clock = 0.0;

    assert!(selector.find_operator(&mut memory, &mut buffers, &mut clock).unwrap());
    assert_eq!(buffers.former(BufferName::Operator).unwrap().name(), "op-count");

    let mut productions = MockProductions::new();
    let mut remaining = 2;
    productions
        .expect_find_matching_production()
        .times(2)
        .returning(|_, _| Some("tprim".to_string()));
    productions
        .expect_fire_production()
        .times(2)
        .returning(move |_, buffers, _| {
            remaining -= 1;
            if remaining == 0 {
                buffers.clear(BufferName::Operator);
            }
            true
        });

    let start = clock;
    assert!(selector.run_operator_cycle(&mut productions, &mut buffers, &mut clock));
    assert!((clock - start - 0.075).abs() < 1e-12);
    assert!(trace.borrow().contains("Firing prim"));
    // Conflict set lines are above the default trace level.
    assert!(!trace.borrow().contains("Conflict Set"));
}

#[test]
fn test_cycle_until_no_operator_left() {
    let mut memory = counting_model();
    let mut selector = OperatorSelector::new(ProceduralConfig::default(), Box::new(MemoryTrace::default()));
    let mut buffers = Buffers::new().with(BufferName::Goal, goal("counting"));
    let mut clock = 0.0;

    let mut chosen = Vec::new();
    while selector.find_operator(&mut memory, &mut buffers, &mut clock).unwrap() {
        chosen.push(buffers.former(BufferName::Operator).unwrap().name().to_string());
    }
    // Both operators end up inhibited; the third attempt fails.
    assert_eq!(chosen, vec!["op-count", "op-report"]);
    assert_eq!(selector.previous_operators().len(), 2);
    let failure = DeclarativeConfig::default().latency(-2.0);
    assert!((clock - (0.05 + 0.05 + failure)).abs() < 1e-12);
}
