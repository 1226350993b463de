//! Reconstruction of control flow: straight-line code when the graph allows it, a state
//! dispatch loop otherwise

use std::fmt;

use compiled_ir::{
    CompiledClass, ExecutionGroup, FunctionContext, NodeId, NodeKind, StatementId, StatementKind,
};
use thiserror::Error;

use super::context::EmitterContext;
use super::error::Result;
use super::statement::emit_statement;

/// How a function body (or one execution group of the ubergraph) is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStrategy {
    NoGoto,
    GotoWithSwitch,
    GotoWithSwitchAndStack,
}

impl FlowStrategy {
    fn new(use_goto_state: bool, use_flow_stack: bool) -> Self {
        match (use_goto_state, use_flow_stack) {
            (_, true) => FlowStrategy::GotoWithSwitchAndStack,
            (true, false) => FlowStrategy::GotoWithSwitch,
            (false, false) => FlowStrategy::NoGoto,
        }
    }
}

impl fmt::Display for FlowStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStrategy::NoGoto => "NoGoto",
            FlowStrategy::GotoWithSwitch => "GotoWithSwitch",
            FlowStrategy::GotoWithSwitchAndStack => "GotoWithSwitchAndStack",
        };
        f.write_str(name)
    }
}

/// Why an execution group has to be emitted as a dispatch loop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StraightLineRejection {
    #[error("{0} is an execution sequence")]
    ExecutionSequence(NodeId),
    #[error("{0} is a {1:?}")]
    RequiresDispatch(StatementId, StatementKind),
    #[error("{0} is a function entry")]
    FunctionEntry(NodeId),
    #[error("both {0} and {1} are events")]
    SeveralEvents(NodeId, NodeId),
    #[error("latent call {call} does not resume at the first statement of {entry}")]
    LatentTargetMismatch { call: NodeId, entry: NodeId },
    #[error("latent calls resume at both {0} and {1}")]
    AmbiguousEntry(NodeId, NodeId),
    #[error("no entry point")]
    NoEntry,
    #[error("cyclic logic")]
    Cyclic,
}

/// Whether any statement of the function only works inside a dispatch loop
pub fn must_use_switch_state(ir: &CompiledClass, function: &FunctionContext) -> bool {
    function
        .all_statements()
        .filter_map(|id| ir.statement(id))
        .any(|statement| {
            let recursive_resume = statement.kind == StatementKind::Call
                && statement.target_label.is_some()
                && statement.function_to_call == Some(function.function);
            statement.kind.requires_switch() || recursive_resume
        })
}

fn contains_kind<'a>(
    ir: &CompiledClass,
    function: &FunctionContext,
    mut nodes: impl Iterator<Item = &'a NodeId>,
    kind: StatementKind,
) -> bool {
    nodes.any(|node| {
        function
            .statements(*node)
            .iter()
            .filter_map(|id| ir.statement(*id))
            .any(|s| s.kind == kind)
    })
}

/// Finds the only entry of an execution group, when it can be emitted without a dispatch loop
pub fn prepare_to_use_execution_group_without_goto(
    ir: &CompiledClass,
    function: &FunctionContext,
    group: &ExecutionGroup,
) -> Result<NodeId, StraightLineRejection> {
    let mut entry = None;
    for node in &group.nodes {
        let kind = ir.node(*node).map(|n| &n.kind);
        if let Some(NodeKind::ExecutionSequence) = kind {
            return Err(StraightLineRejection::ExecutionSequence(*node));
        }

        for id in function.statements(*node) {
            if let Some(statement) = ir.statement(*id)
                && matches!(
                    statement.kind,
                    StatementKind::PushState
                        | StatementKind::GotoIfNot
                        | StatementKind::ComputedGoto
                )
            {
                return Err(StraightLineRejection::RequiresDispatch(*id, statement.kind));
            }
        }

        match kind {
            Some(NodeKind::FunctionEntry) => {
                return Err(StraightLineRejection::FunctionEntry(*node));
            }
            Some(NodeKind::Event) => match entry {
                Some(first) => return Err(StraightLineRejection::SeveralEvents(first, *node)),
                None => entry = Some(*node),
            },
            _ => {}
        }
    }

    for call in &function.linear_execution_list {
        let Some(NodeKind::CallFunction {
            is_latent: true,
            then_links,
        }) = ir.node(*call).map(|n| &n.kind)
        else {
            continue;
        };

        for linked in then_links.iter().filter(|n| group.nodes.contains(*n)) {
            match entry {
                None => {
                    let first = function.statements(*linked).first().copied();
                    let resumes_here = first.is_some()
                        && function
                            .statements(*call)
                            .iter()
                            .filter_map(|id| ir.statement(*id))
                            .any(|s| s.kind == StatementKind::Call && s.target_label == first);
                    if !resumes_here {
                        return Err(StraightLineRejection::LatentTargetMismatch {
                            call: *call,
                            entry: *linked,
                        });
                    }
                    entry = Some(*linked);
                }
                Some(existing) if existing != *linked => {
                    return Err(StraightLineRejection::AmbiguousEntry(existing, *linked));
                }
                Some(_) => {}
            }
        }
    }

    entry.ok_or(StraightLineRejection::NoEntry)
}

/// Orders the nodes of an execution group by walking fall-through and unconditional gotos from
/// `entry`
///
/// Returns `None` when the walk jumps back to a visited node or falls through to a node that is
/// not next in the linear execution list.
pub fn sort_nodes_in_execution_group(
    ir: &CompiledClass,
    function: &FunctionContext,
    entry: NodeId,
    group: &ExecutionGroup,
) -> Option<Vec<NodeId>> {
    let linear = &function.linear_execution_list;

    // Indices into the linear execution list not visited yet
    let mut queue = vec![];
    let mut entry_position = None;
    for (node_index, node) in linear.iter().enumerate() {
        if group.nodes.contains(node) {
            if *node == entry {
                entry_position = Some(queue.len());
            }
            queue.push(node_index);
        }
    }

    let mut sorted = vec![];
    let mut cursor = entry_position?;
    while cursor < queue.len() {
        let node_index = queue.remove(cursor);
        let node = linear[node_index];
        sorted.push(node);

        let mut next = None;
        let mut return_expected = false;
        for statement in function
            .statements(node)
            .iter()
            .filter_map(|id| ir.statement(*id))
        {
            match statement.kind {
                StatementKind::UnconditionalGoto => {
                    let target = statement.target_label?;
                    let position = queue
                        .iter()
                        .position(|i| function.statements(linear[*i]).contains(&target));
                    // Target already visited
                    next = Some(position?);
                }
                StatementKind::GotoReturn | StatementKind::EndOfThread => return_expected = true,
                _ => {}
            }
        }

        cursor = match next {
            Some(next) => next,
            None => {
                let next = if cursor >= queue.len() { 0 } else { cursor };
                if queue.is_empty() {
                    if !return_expected {
                        return None;
                    }
                } else if queue[next] != node_index + 1 {
                    return None;
                }
                next
            }
        };
    }

    queue.is_empty().then_some(sorted)
}

struct EmittedStatements {
    opened_case: bool,
    irreducible: bool,
}

fn emit_all_statements(
    ctx: &mut EmitterContext,
    group: Option<&ExecutionGroup>,
    order: &[NodeId],
) -> Result<EmittedStatements> {
    let function = ctx.function_context();
    let mut first_case = true;
    let mut irreducible = false;

    for node in order {
        if group.is_some_and(|g| !g.nodes.contains(node)) {
            continue;
        }
        for id in function.statements(*node) {
            let statement = ctx.statement(*id)?;
            if ctx.use_goto_state && (statement.is_jump_target || first_case) {
                let state = ctx.state_index(*id);
                if first_case {
                    first_case = false;
                } else {
                    ctx.decrease_indent();
                    ctx.add_line("}");
                    ctx.decrease_indent();
                }
                ctx.add_line(format!("case {state}:"));
                ctx.increase_indent();
                ctx.add_line("{");
                ctx.increase_indent();
            }
            emit_statement(ctx, *id)?;
            irreducible |= !statement.kind.is_reducible();
        }
    }

    Ok(EmittedStatements {
        opened_case: !first_case,
        irreducible,
    })
}

/// Emits the body of the current function, or of one execution group of the ubergraph
pub fn inner_function_implementation(
    ctx: &mut EmitterContext,
    group: Option<usize>,
) -> Result<FlowStrategy> {
    let ir = ctx.ir();
    let function = ctx.function_context();
    let name = ir
        .reflection
        .function(function.function)
        .map_or("<unknown>", |f| f.name.as_str());
    let group_desc = group.and_then(|g| function.execution_groups.get(g));
    let label = match group {
        Some(g) => format!("{name} (group {g})"),
        None => name.to_string(),
    };
    ctx.execution_group = group;

    ctx.use_flow_stack = match group_desc {
        Some(g) => contains_kind(ir, function, g.nodes.iter(), StatementKind::PushState),
        None => contains_kind(
            ir,
            function,
            function.linear_execution_list.iter(),
            StatementKind::PushState,
        ),
    };

    let mut entry = None;
    let mut sorted = None;
    ctx.use_goto_state = match group_desc {
        Some(g) => {
            let prepared = prepare_to_use_execution_group_without_goto(ir, function, g).and_then(
                |e| {
                    sort_nodes_in_execution_group(ir, function, e, g)
                        .map(|order| (e, order))
                        .ok_or(StraightLineRejection::Cyclic)
                },
            );
            match prepared {
                Ok((e, order)) => {
                    entry = Some(e);
                    sorted = Some(order);
                    false
                }
                Err(rejection) => {
                    ctx.logger().debug(&format!(
                        "{label}: straight-line emission rejected, {rejection}"
                    ));
                    true
                }
            }
        }
        None => must_use_switch_state(ir, function) || function.is_ubergraph,
    };
    // The stack is only ever popped by the dispatch loop
    ctx.use_goto_state |= ctx.use_flow_stack;

    let strategy = FlowStrategy::new(ctx.use_goto_state, ctx.use_flow_stack);
    ctx.logger().debug(&format!("{label}: {strategy}"));

    if ctx.use_goto_state {
        if ctx.use_flow_stack {
            ctx.add_line("TArray< int32, TInlineAllocator<8> > __StateStack;");
        }
        if function.is_ubergraph {
            ctx.add_line("int32 __CurrentState = bpp__EntryPoint__pf;");
        } else {
            let first = match function.all_statements().next() {
                Some(statement) => ctx.state_index(statement),
                None => 0,
            };
            ctx.add_line(format!("int32 __CurrentState = {first};"));
        }
        ctx.add_line("do");
        ctx.add_line("{");
        ctx.increase_indent();
        ctx.add_line("switch( __CurrentState )");
        ctx.add_line("{");
    } else if function.is_ubergraph
        && let Some(entry) = entry
    {
        let entry_state = match function.statements(entry).first() {
            Some(first) => ctx.state_index(*first),
            None => -1,
        };
        ctx.add_line(format!("check(bpp__EntryPoint__pf == {entry_state});"));
    }

    let order = sorted
        .as_deref()
        .unwrap_or(&function.linear_execution_list);
    let emitted = emit_all_statements(ctx, group_desc, order)?;
    if emitted.irreducible {
        ctx.logger()
            .debug(&format!("{label}: contains irreducible statements"));
    }

    if ctx.use_goto_state {
        if emitted.opened_case {
            ctx.decrease_indent();
            ctx.add_line("}");
            ctx.decrease_indent();
        }
        ctx.add_line("default:");
        ctx.increase_indent();
        if ctx.use_flow_stack {
            ctx.add_line("check(false); // Invalid state");
        }
        ctx.add_line("break;");
        ctx.decrease_indent();
        ctx.add_line("}");
        ctx.decrease_indent();
        ctx.add_line("} while( __CurrentState != -1 );");
    }

    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::context::{ClassEmissionContext, StateMaps};
    use crate::backend::logger::{BufferedLogger, LogLevel};
    use crate::backend::options::BackendOptions;
    use compiled_ir::builder::ClassBuilder;
    use compiled_ir::{PinCategory, PinType, Statement, TerminalId};

    struct Graph {
        b: ClassBuilder,
        count: TerminalId,
        open: TerminalId,
    }

    fn graph() -> Graph {
        let mut b = ClassBuilder::new("BP_Door_C", "Actor");
        b.native_class("Actor", "A", Some("Object"));
        let count = b.member("Count", PinType::new(PinCategory::Int));
        let open = b.member("bOpen", PinType::new(PinCategory::Boolean));
        let count = b.property_term(count);
        let open = b.property_term(open);
        Graph { b, count, open }
    }

    impl Graph {
        fn set_count(&mut self, value: &str) -> StatementId {
            let value = self.b.literal(PinType::new(PinCategory::Int), value);
            self.b.statement(
                Statement::new(StatementKind::Assignment)
                    .with_lhs(self.count)
                    .with_rhs([value]),
            )
        }

        fn kind(&mut self, kind: StatementKind) -> StatementId {
            self.b.statement(Statement::new(kind))
        }

        fn goto(&mut self, kind: StatementKind, target: StatementId) -> StatementId {
            let mut statement = Statement::new(kind).with_target(target);
            if kind == StatementKind::GotoIfNot {
                statement = statement.with_lhs(self.open);
            }
            self.b.statement(statement)
        }
    }

    fn render(
        ir: &CompiledClass,
        function_index: usize,
        group: Option<usize>,
    ) -> (FlowStrategy, String, BufferedLogger) {
        let options = BackendOptions::default();
        let logger = BufferedLogger::all();
        let (strategy, code) = {
            let class = ClassEmissionContext::new(ir, &options, &logger);
            let mut states = StateMaps::default();
            let mut ctx = EmitterContext::new(&class, &mut states, function_index, 0);
            let strategy = inner_function_implementation(&mut ctx, group).unwrap();
            (strategy, ctx.code.into_string())
        };
        (strategy, code, logger)
    }

    #[test]
    fn test_straight_function_has_no_dispatch() {
        let mut g = graph();
        let a = g.set_count("1");
        let b = g.set_count("2");
        let function = g.b.function("Reset");
        let entry = g.b.node("Entry", NodeKind::FunctionEntry);
        let next = g.b.node("Set", NodeKind::Other);
        g.b.function_context(function, vec![(entry, vec![a]), (next, vec![b])], false);
        let ir = g.b.build();

        let (strategy, code, _) = render(&ir, 0, None);
        assert_eq!(strategy, FlowStrategy::NoGoto);
        assert_eq!(code, "bpv__Count__pf = 1;\nbpv__Count__pf = 2;\n");
    }

    #[test]
    fn test_conditional_branch_uses_dispatch_loop() {
        let mut g = graph();
        let skipped = g.set_count("1");
        let end = g.set_count("2");
        let ret = g.kind(StatementKind::GotoReturn);
        let branch = g.goto(StatementKind::GotoIfNot, end);
        let function = g.b.function("Toggle");
        let entry = g.b.node("Entry", NodeKind::FunctionEntry);
        let next = g.b.node("Set", NodeKind::Other);
        g.b.function_context(
            function,
            vec![(entry, vec![branch, skipped]), (next, vec![end, ret])],
            false,
        );
        let ir = g.b.build();

        let (strategy, code, _) = render(&ir, 0, None);
        assert_eq!(strategy, FlowStrategy::GotoWithSwitch);
        assert_eq!(
            code,
            "int32 __CurrentState = 1;\n\
             do\n\
             {\n\
             \tswitch( __CurrentState )\n\
             \t{\n\
             \tcase 1:\n\
             \t\t{\n\
             \t\t\tif (!bpv__bOpen__pf)\n\
             \t\t\t{\n\
             \t\t\t\t__CurrentState = 2;\n\
             \t\t\t\tbreak;\n\
             \t\t\t}\n\
             \t\t\tbpv__Count__pf = 1;\n\
             \t\t}\n\
             \tcase 2:\n\
             \t\t{\n\
             \t\t\tbpv__Count__pf = 2;\n\
             \t\t\t__CurrentState = -1;\n\
             \t\t\tbreak;\n\
             \t\t}\n\
             \tdefault:\n\
             \t\tbreak;\n\
             \t}\n\
             } while( __CurrentState != -1 );\n"
        );
    }

    #[test]
    fn test_push_state_adds_stack() {
        let mut g = graph();
        let resume = g.set_count("1");
        let end = g.kind(StatementKind::EndOfThread);
        let push = g.goto(StatementKind::PushState, resume);
        let function = g.b.function("Sequence");
        let entry = g.b.node("Entry", NodeKind::FunctionEntry);
        g.b.function_context(function, vec![(entry, vec![push, resume, end])], false);
        let ir = g.b.build();

        let (strategy, code, _) = render(&ir, 0, None);
        assert_eq!(strategy, FlowStrategy::GotoWithSwitchAndStack);
        assert!(code.starts_with("TArray< int32, TInlineAllocator<8> > __StateStack;\n"));
        assert!(code.contains("\t\t\t__StateStack.Push(2);\n"));
        assert!(code.contains("\t\tcheck(false); // Invalid state\n"));
    }

    #[test]
    fn test_ubergraph_without_groups_reads_entry_point() {
        let mut g = graph();
        let a = g.set_count("1");
        let end = g.kind(StatementKind::EndOfThread);
        let function = g.b.function("ExecuteUbergraph_BP_Door");
        let event = g.b.node("BeginPlay", NodeKind::Event);
        g.b.function_context(function, vec![(event, vec![a, end])], true);
        let ir = g.b.build();

        let (strategy, code, _) = render(&ir, 0, None);
        assert_eq!(strategy, FlowStrategy::GotoWithSwitch);
        assert!(code.starts_with("int32 __CurrentState = bpp__EntryPoint__pf;\ndo\n"));
        assert!(code.contains("\tcase 1:\n"));
    }

    /// Two events; the second resumes after a latent call into its own group
    fn split_ubergraph() -> CompiledClass {
        let mut g = graph();
        let first = g.set_count("1");
        let first_end = g.kind(StatementKind::EndOfThread);
        let resumed = g.set_count("2");
        let resumed_end = g.kind(StatementKind::EndOfThread);
        let latent = g.b.function("Wait");
        let latent_call = g.b.statement(Statement::call(latent).with_target(resumed));
        let latent_end = g.kind(StatementKind::EndOfThread);

        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let begin = g.b.node("BeginPlay", NodeKind::Event);
        let tick = g.b.node("Tick", NodeKind::Event);
        let resume = g.b.node("AfterWait", NodeKind::Other);
        let wait = g.b.node(
            "Wait",
            NodeKind::CallFunction {
                is_latent: true,
                then_links: vec![resume],
            },
        );
        let context = g.b.function_context(
            ubergraph,
            vec![
                (begin, vec![first, first_end]),
                (tick, vec![]),
                (wait, vec![latent_call, latent_end]),
                (resume, vec![resumed, resumed_end]),
            ],
            true,
        );
        g.b.execution_groups(context, vec![vec![begin], vec![tick, wait], vec![resume]]);
        g.b.build()
    }

    #[test]
    fn test_execution_group_emitted_straight() {
        let ir = split_ubergraph();
        let (strategy, code, _) = render(&ir, 0, Some(0));
        assert_eq!(strategy, FlowStrategy::NoGoto);
        assert_eq!(
            code,
            "check(bpp__EntryPoint__pf == 1);\nbpv__Count__pf = 1;\nreturn; // KCST_EndOfThread\n"
        );
    }

    #[test]
    fn test_latent_resume_is_group_entry() {
        let ir = split_ubergraph();
        let function = &ir.functions[0];
        let group = &function.execution_groups[2];
        let entry = prepare_to_use_execution_group_without_goto(&ir, function, group);
        assert_eq!(entry, Ok(NodeId(2)));

        let (strategy, code, _) = render(&ir, 0, Some(2));
        assert_eq!(strategy, FlowStrategy::NoGoto);
        assert!(code.starts_with("check(bpp__EntryPoint__pf == 1);\nbpv__Count__pf = 2;\n"));
    }

    #[test]
    fn test_sequence_node_rejects_straight_line() {
        let mut g = graph();
        let a = g.set_count("1");
        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let event = g.b.node("BeginPlay", NodeKind::Event);
        let sequence = g.b.node("Sequence", NodeKind::ExecutionSequence);
        let context = g.b.function_context(ubergraph, vec![(event, vec![a]), (sequence, vec![])], true);
        g.b.execution_groups(context, vec![vec![event, sequence]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        assert_eq!(
            prepare_to_use_execution_group_without_goto(&ir, function, &function.execution_groups[0]),
            Err(StraightLineRejection::ExecutionSequence(sequence))
        );
        let (strategy, _, logger) = render(&ir, 0, Some(0));
        assert_eq!(strategy, FlowStrategy::GotoWithSwitch);
        assert!(logger.contains(LogLevel::Debug, "is an execution sequence"));
    }

    #[test]
    fn test_two_events_reject_straight_line() {
        let mut g = graph();
        let a = g.set_count("1");
        let b = g.set_count("2");
        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let begin = g.b.node("BeginPlay", NodeKind::Event);
        let tick = g.b.node("Tick", NodeKind::Event);
        let context = g.b.function_context(ubergraph, vec![(begin, vec![a]), (tick, vec![b])], true);
        g.b.execution_groups(context, vec![vec![begin, tick]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        assert_eq!(
            prepare_to_use_execution_group_without_goto(&ir, function, &function.execution_groups[0]),
            Err(StraightLineRejection::SeveralEvents(begin, tick))
        );
    }

    #[test]
    fn test_conditional_branch_rejects_straight_line() {
        let mut g = graph();
        let target = g.set_count("1");
        let branch = g.goto(StatementKind::GotoIfNot, target);
        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let event = g.b.node("BeginPlay", NodeKind::Event);
        let context = g.b.function_context(ubergraph, vec![(event, vec![branch, target])], true);
        g.b.execution_groups(context, vec![vec![event]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        assert_eq!(
            prepare_to_use_execution_group_without_goto(&ir, function, &function.execution_groups[0]),
            Err(StraightLineRejection::RequiresDispatch(
                branch,
                StatementKind::GotoIfNot
            ))
        );
    }

    #[test]
    fn test_computed_goto_outside_function_entry_uses_dispatch() {
        let mut g = graph();
        let first = g.set_count("1");
        let jump = g.b.statement(Statement::new(StatementKind::ComputedGoto).with_lhs(g.count));
        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        g.b.param(ubergraph, "EntryPoint", PinType::new(PinCategory::Int));
        let event = g.b.node("BeginPlay", NodeKind::Event);
        let context = g.b.function_context(ubergraph, vec![(event, vec![first, jump])], true);
        g.b.execution_groups(context, vec![vec![event]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        assert_eq!(
            prepare_to_use_execution_group_without_goto(&ir, function, &function.execution_groups[0]),
            Err(StraightLineRejection::RequiresDispatch(
                jump,
                StatementKind::ComputedGoto
            ))
        );

        let (strategy, code, logger) = render(&ir, 0, Some(0));
        assert_eq!(strategy, FlowStrategy::GotoWithSwitch);
        assert!(code.contains("__CurrentState = bpv__Count__pf;\n"));
        assert!(logger.contains(LogLevel::Debug, "straight-line emission rejected"));
    }

    #[test]
    fn test_sort_follows_forward_gotos() {
        let mut g = graph();
        let late = g.set_count("1");
        let late_end = g.kind(StatementKind::EndOfThread);
        let middle = g.set_count("2");
        let middle_jump = g.goto(StatementKind::UnconditionalGoto, late);
        let entry_jump = g.goto(StatementKind::UnconditionalGoto, middle);

        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let event = g.b.node("BeginPlay", NodeKind::Event);
        let n1 = g.b.node("Late", NodeKind::Other);
        let n2 = g.b.node("Middle", NodeKind::Other);
        let context = g.b.function_context(
            ubergraph,
            vec![
                (event, vec![entry_jump]),
                (n1, vec![late, late_end]),
                (n2, vec![middle, middle_jump]),
            ],
            true,
        );
        g.b.execution_groups(context, vec![vec![event, n1, n2]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        let sorted = sort_nodes_in_execution_group(&ir, function, event, &function.execution_groups[0]);
        assert_eq!(sorted, Some(vec![event, n2, n1]));
    }

    #[test]
    fn test_sort_detects_back_edge() {
        let mut g = graph();
        let start = g.set_count("1");
        let back = g.goto(StatementKind::UnconditionalGoto, start);

        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let event = g.b.node("BeginPlay", NodeKind::Event);
        let next = g.b.node("Loop", NodeKind::Other);
        let context = g.b.function_context(
            ubergraph,
            vec![(event, vec![start]), (next, vec![back])],
            true,
        );
        g.b.execution_groups(context, vec![vec![event, next]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        let group = &function.execution_groups[0];
        assert_eq!(sort_nodes_in_execution_group(&ir, function, event, group), None);

        let (strategy, _, logger) = render(&ir, 0, Some(0));
        assert_eq!(strategy, FlowStrategy::GotoWithSwitch);
        assert!(logger.contains(LogLevel::Debug, "cyclic logic"));
    }

    #[test]
    fn test_sort_rejects_missing_return() {
        let mut g = graph();
        let a = g.set_count("1");
        let ubergraph = g.b.function("ExecuteUbergraph_BP_Door");
        let event = g.b.node("BeginPlay", NodeKind::Event);
        let context = g.b.function_context(ubergraph, vec![(event, vec![a])], true);
        g.b.execution_groups(context, vec![vec![event]]);
        let ir = g.b.build();

        let function = &ir.functions[0];
        let group = &function.execution_groups[0];
        assert_eq!(sort_nodes_in_execution_group(&ir, function, event, group), None);
    }

    #[test]
    fn test_recursive_resume_needs_switch() {
        let mut g = graph();
        let function = g.b.function("Loop");
        let target = g.set_count("1");
        let call = g.b.statement(Statement::call(function).with_target(target));
        let entry = g.b.node("Entry", NodeKind::FunctionEntry);
        g.b.function_context(function, vec![(entry, vec![target, call])], false);
        let ir = g.b.build();
        assert!(must_use_switch_state(&ir, &ir.functions[0]));
    }
}
