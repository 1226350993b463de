//! Property tests for control-flow reconstruction
//!
//! 1. Generation is deterministic for any function
//! 2. Every jump target gets exactly one case label, and every jump lands on one
//! 3. A group chained by forward gotos sorts into its walk order; a back edge is cyclic

mod common;

use std::collections::BTreeSet;

use bp_nativize::backend::FlowStrategy;
use bp_nativize::backend::control_flow::sort_nodes_in_execution_group;
use common::{case_labels, door, generate, member};
use compiled_ir::{CompiledClass, NodeKind, PinCategory, PinType, Statement, StatementId, StatementKind};
use proptest::prelude::*;

/// One node; `Some(t)` is a conditional jump to statement `t`, `None` an assignment
fn branching(ops: &[Option<usize>]) -> CompiledClass {
    let mut b = door();
    let (_, count) = member(&mut b, "Count", PinCategory::Int);
    let (_, open) = member(&mut b, "bOpen", PinCategory::Boolean);

    let ids: Vec<StatementId> = ops
        .iter()
        .map(|_| b.statement(Statement::new(StatementKind::Nop)))
        .collect();
    for (i, op) in ops.iter().enumerate() {
        let statement = match op {
            Some(target) => Statement::new(StatementKind::GotoIfNot)
                .with_lhs(open)
                .with_target(ids[target % ids.len()]),
            None => {
                let value = b.literal(PinType::new(PinCategory::Int), &i.to_string());
                Statement::new(StatementKind::Assignment)
                    .with_lhs(count)
                    .with_rhs([value])
            }
        };
        b.set_statement(ids[i], statement);
    }
    let ret = b.statement(Statement::new(StatementKind::GotoReturn));

    let function = b.function("Branchy");
    let entry = b.node("Entry", NodeKind::FunctionEntry);
    let mut statements = ids;
    statements.push(ret);
    b.function_context(function, vec![(entry, statements)], false);
    b.build()
}

/// Ubergraph whose single group is walked in `walk` order through unconditional gotos; with
/// `back_edge` the last node jumps to an already visited one
fn chained(walk: &[usize], back_edge: Option<usize>) -> CompiledClass {
    let mut b = door();
    let (_, count) = member(&mut b, "Count", PinCategory::Int);
    let execute = b.function("ExecuteUbergraph_BP_Door");
    b.param(execute, "EntryPoint", PinType::new(PinCategory::Int));

    let firsts: Vec<StatementId> = (0..walk.len())
        .map(|i| {
            let value = b.literal(PinType::new(PinCategory::Int), &i.to_string());
            b.statement(
                Statement::new(StatementKind::Assignment)
                    .with_lhs(count)
                    .with_rhs([value]),
            )
        })
        .collect();

    let mut terminators = vec![None; walk.len()];
    for (position, node) in walk.iter().enumerate() {
        let next = match walk.get(position + 1) {
            Some(next) => Some(*next),
            None => back_edge.map(|back| walk[back % walk.len()]),
        };
        let statement = match next {
            Some(next) => Statement::new(StatementKind::UnconditionalGoto).with_target(firsts[next]),
            None => Statement::new(StatementKind::EndOfThread),
        };
        terminators[*node] = Some(b.statement(statement));
    }

    let nodes: Vec<_> = (0..walk.len())
        .map(|i| {
            let kind = if i == walk[0] { NodeKind::Event } else { NodeKind::Other };
            let node = b.node(&format!("Node{i}"), kind);
            (node, [Some(firsts[i]), terminators[i]].into_iter().flatten().collect::<Vec<_>>())
        })
        .collect();
    let group = nodes.iter().map(|(node, _)| *node).collect();
    let context = b.function_context(execute, nodes, true);
    b.execution_groups(context, vec![group]);
    b.build()
}

fn walk_strategy() -> impl Strategy<Value = Vec<usize>> {
    (2usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_generation_is_deterministic(ops in prop::collection::vec(prop::option::of(0usize..12), 1..10)) {
        let ir = branching(&ops);
        let first = generate(&ir);
        let second = generate(&ir);
        prop_assert_eq!(first.header, second.header);
        prop_assert_eq!(first.body, second.body);
    }

    #[test]
    fn prop_jump_targets_have_one_case(ops in prop::collection::vec(prop::option::of(0usize..12), 1..10)) {
        let ir = branching(&ops);
        let generated = generate(&ir);
        let labels = case_labels(&generated.body);

        let unique: BTreeSet<i32> = labels.iter().copied().collect();
        prop_assert_eq!(unique.len(), labels.len(), "case labels repeat");

        let function = &ir.functions[0];
        let statements: Vec<_> = function.all_statements().collect();
        let targets = statements
            .iter()
            .filter(|id| ir.statements[id.0].is_jump_target)
            .count();
        let first_targeted = ir.statements[statements[0].0].is_jump_target;
        prop_assert_eq!(labels.len(), targets + usize::from(!first_targeted));

        for line in generated.body.lines() {
            let Some(state) = line
                .trim()
                .strip_prefix("__CurrentState = ")
                .and_then(|rest| rest.strip_suffix(';'))
                .and_then(|state| state.parse::<i32>().ok())
            else {
                continue;
            };
            prop_assert!(state == -1 || unique.contains(&state), "jump to missing state {}", state);
        }
    }

    #[test]
    fn prop_forward_chain_sorts_in_walk_order(walk in walk_strategy()) {
        let ir = chained(&walk, None);
        let function = &ir.functions[0];
        let group = &function.execution_groups[0];
        let entry = function.linear_execution_list[walk[0]];

        let sorted = sort_nodes_in_execution_group(&ir, function, entry, group);
        let expected: Vec<_> = walk.iter().map(|i| function.linear_execution_list[*i]).collect();
        prop_assert_eq!(sorted, Some(expected));
        let generated = generate(&ir);
        prop_assert_eq!(generated.reports[0].strategies.clone(), vec![FlowStrategy::NoGoto]);
    }

    #[test]
    fn prop_back_edge_is_cyclic(walk in walk_strategy(), back in 0usize..8) {
        let ir = chained(&walk, Some(back));
        let function = &ir.functions[0];
        let group = &function.execution_groups[0];
        let entry = function.linear_execution_list[walk[0]];

        prop_assert_eq!(sort_nodes_in_execution_group(&ir, function, entry, group), None);
        let generated = generate(&ir);
        prop_assert_eq!(generated.reports[0].strategies.clone(), vec![FlowStrategy::GotoWithSwitch]);
    }
}
