//! Compiled statement IR consumed by the native code backend
//!
//! A [`CompiledClass`] is produced once by the front-end compiler and never mutated afterwards.
//! Statements, terminals and graph nodes live in flat arenas and refer to each other by index.

pub mod builder;
pub mod reflection;
pub mod types;

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub use reflection::*;
pub use types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "statement #{}", self.0)
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminal #{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IrError {
    #[error("failed to parse compiled IR: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{what} refers to missing {target}")]
    Dangling { what: String, target: String },
    #[error("{0} is a {1:?} without a target label")]
    MissingTargetLabel(StatementId, StatementKind),
    #[error("{0} is a call without a function to call")]
    MissingCallee(StatementId),
    #[error("{0} is both literal and inline generated")]
    LiteralAndInline(TerminalId),
    #[error("context chain of {0} is cyclic")]
    CyclicContext(TerminalId),
    #[error("{0} is a switch value with {1} operands")]
    SwitchValueOperands(StatementId, usize),
    #[error("{0} is a switch value whose case operands are not paired ({1} operands)")]
    UnpairedSwitchCase(StatementId, usize),
    #[error("{0} creates a map from an odd number of operands ({1})")]
    OddMapOperands(StatementId, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Nop,
    Call,
    Assignment,
    CompileError,
    PushState,
    Return,
    EndOfThread,
    Comment,
    DebugSite,
    WireTraceSite,
    CastObjToInterface,
    CastInterfaceToObj,
    CastBetweenInterfaces,
    DynamicCast,
    MetaCast,
    ObjectToBool,
    AddDelegate,
    RemoveDelegate,
    ClearDelegate,
    BindDelegate,
    CallDelegate,
    CreateArray,
    CreateSet,
    CreateMap,
    ComputedGoto,
    UnconditionalGoto,
    GotoIfNot,
    EndOfThreadIfNot,
    GotoReturn,
    GotoReturnIfNot,
    SwitchValue,
    ArrayGetByRef,
    AssignmentOnPersistentFrame,
}

impl StatementKind {
    /// Kinds whose emitted text names the state index of their target
    pub fn requires_target_label(self) -> bool {
        matches!(
            self,
            StatementKind::UnconditionalGoto | StatementKind::GotoIfNot | StatementKind::PushState
        )
    }

    /// Kinds that only make sense inside a state dispatch loop
    pub fn requires_switch(self) -> bool {
        matches!(
            self,
            StatementKind::UnconditionalGoto
                | StatementKind::PushState
                | StatementKind::GotoIfNot
                | StatementKind::ComputedGoto
                | StatementKind::EndOfThread
                | StatementKind::EndOfThreadIfNot
                | StatementKind::GotoReturn
                | StatementKind::GotoReturnIfNot
        )
    }

    /// Kinds that never force a function into the dispatch loop on their own
    pub fn is_reducible(self) -> bool {
        !matches!(
            self,
            StatementKind::PushState
                | StatementKind::GotoIfNot
                | StatementKind::ComputedGoto
                | StatementKind::EndOfThreadIfNot
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    #[serde(default)]
    pub lhs: Option<TerminalId>,
    #[serde(default)]
    pub rhs: Vec<TerminalId>,
    #[serde(default)]
    pub target_label: Option<StatementId>,
    #[serde(default)]
    pub is_jump_target: bool,
    #[serde(default)]
    pub function_to_call: Option<FunctionId>,
    #[serde(default)]
    pub function_context: Option<TerminalId>,
    #[serde(default)]
    pub is_parent_context: bool,
    #[serde(default)]
    pub is_interface_context: bool,
    /// Parameter of the callee patched with the target's state index
    #[serde(default)]
    pub ubergraph_call_index: Option<usize>,
    #[serde(default)]
    pub comment: String,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            lhs: None,
            rhs: vec![],
            target_label: None,
            is_jump_target: false,
            function_to_call: None,
            function_context: None,
            is_parent_context: false,
            is_interface_context: false,
            ubergraph_call_index: None,
            comment: String::new(),
        }
    }

    pub fn call(function: FunctionId) -> Self {
        Self {
            function_to_call: Some(function),
            ..Self::new(StatementKind::Call)
        }
    }

    pub fn with_lhs(mut self, lhs: TerminalId) -> Self {
        self.lhs = Some(lhs);
        self
    }

    pub fn with_rhs(mut self, rhs: impl IntoIterator<Item = TerminalId>) -> Self {
        self.rhs = rhs.into_iter().collect();
        self
    }

    pub fn with_target(mut self, target: StatementId) -> Self {
        self.target_label = Some(target);
        self
    }

    pub fn on(mut self, context: TerminalId) -> Self {
        self.function_context = Some(context);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Terminal {
    pub name: String,
    #[serde(rename = "type")]
    pub pin_type: PinType,
    pub is_literal: bool,
    /// Object referenced by an object or class literal
    pub object_literal: Option<String>,
    pub text_literal: Option<String>,
    pub associated_property: Option<PropertyId>,
    pub context: Option<TerminalId>,
    pub inline_generated: Option<StatementId>,
}

impl Terminal {
    pub fn literal(pin_type: PinType, value: impl Into<String>) -> Self {
        Self {
            name: value.into(),
            pin_type,
            is_literal: true,
            ..Default::default()
        }
    }

    pub fn object_literal(pin_type: PinType, object: impl Into<String>) -> Self {
        Self {
            object_literal: Some(object.into()),
            ..Self::literal(pin_type, "")
        }
    }

    pub fn property(name: impl Into<String>, pin_type: PinType, property: PropertyId) -> Self {
        Self {
            name: name.into(),
            pin_type,
            associated_property: Some(property),
            ..Default::default()
        }
    }

    pub fn inline(pin_type: PinType, statement: StatementId) -> Self {
        Self {
            pin_type,
            inline_generated: Some(statement),
            ..Default::default()
        }
    }

    /// The implicit receiver of a member function
    pub fn self_context() -> Self {
        Self {
            name: PSC_SELF.to_string(),
            pin_type: PinType::self_pin(),
            ..Default::default()
        }
    }

    pub fn in_context(mut self, context: TerminalId) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_self(&self) -> bool {
        self.name == PSC_SELF
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Event,
    FunctionEntry,
    /// Sequence node fanning out to several exec outputs
    ExecutionSequence,
    CallFunction {
        #[serde(default)]
        is_latent: bool,
        /// Nodes linked to the `then` output
        #[serde(default)]
        then_links: Vec<NodeId>,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionGroup {
    pub nodes: IndexSet<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatements {
    pub node: NodeId,
    pub statements: Vec<StatementId>,
}

/// Insertion ordered map from node to its statements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NodeStatements>", into = "Vec<NodeStatements>")]
pub struct StatementsPerNode(IndexMap<NodeId, Vec<StatementId>>);

impl From<Vec<NodeStatements>> for StatementsPerNode {
    fn from(entries: Vec<NodeStatements>) -> Self {
        Self(entries.into_iter().map(|e| (e.node, e.statements)).collect())
    }
}

impl From<StatementsPerNode> for Vec<NodeStatements> {
    fn from(map: StatementsPerNode) -> Self {
        map.0
            .into_iter()
            .map(|(node, statements)| NodeStatements { node, statements })
            .collect()
    }
}

impl StatementsPerNode {
    pub fn get(&self, node: NodeId) -> Option<&[StatementId]> {
        self.0.get(&node).map(Vec::as_slice)
    }

    pub fn insert(&mut self, node: NodeId, statements: Vec<StatementId>) {
        self.0.insert(node, statements);
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[StatementId])> {
        self.0.iter().map(|(n, s)| (*n, s.as_slice()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionContext {
    pub function: FunctionId,
    pub linear_execution_list: Vec<NodeId>,
    pub statements_per_node: StatementsPerNode,
    #[serde(default)]
    pub execution_groups: Vec<ExecutionGroup>,
    #[serde(default)]
    pub is_ubergraph: bool,
}

impl FunctionContext {
    pub fn statements(&self, node: NodeId) -> &[StatementId] {
        self.statements_per_node.get(node).unwrap_or_default()
    }

    /// Statements of the whole function in linear execution order
    pub fn all_statements(&self) -> impl Iterator<Item = StatementId> + '_ {
        self.linear_execution_list
            .iter()
            .flat_map(|node| self.statements(*node).iter().copied())
    }

    /// Node whose statement list holds `statement`
    pub fn node_of(&self, statement: StatementId) -> Option<NodeId> {
        self.statements_per_node
            .iter()
            .find(|(_, list)| list.contains(&statement))
            .map(|(node, _)| node)
    }
}

/// Everything the backend needs to emit one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledClass {
    pub name: String,
    pub reflection: DescriptorTable,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub terminals: Vec<Terminal>,
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub functions: Vec<FunctionContext>,
}

impl CompiledClass {
    /// Parses and validates a class. Jump target flags are recomputed from the target labels.
    pub fn from_json(json: &str) -> Result<Self, IrError> {
        let mut class: CompiledClass = serde_json::from_str(json)?;
        class.mark_jump_targets();
        class.validate()?;
        Ok(class)
    }

    /// Sets `is_jump_target` on exactly the statements some statement's target label names
    pub fn mark_jump_targets(&mut self) {
        let targets: HashSet<StatementId> = self
            .statements
            .iter()
            .filter_map(|s| s.target_label)
            .collect();
        for (index, statement) in self.statements.iter_mut().enumerate() {
            statement.is_jump_target = targets.contains(&StatementId(index));
        }
    }

    pub fn statement(&self, id: StatementId) -> Option<&Statement> {
        self.statements.get(id.0)
    }

    pub fn terminal(&self, id: TerminalId) -> Option<&Terminal> {
        self.terminals.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    pub fn class_desc(&self) -> Option<&ClassDesc> {
        self.reflection.class(&self.name)
    }

    pub fn super_class(&self) -> Option<&str> {
        self.class_desc()?.super_class.as_deref()
    }

    pub fn ubergraph(&self) -> Option<&FunctionContext> {
        self.functions.iter().find(|f| f.is_ubergraph)
    }

    /// Checks the structural invariants the backend relies on, reporting the first violation
    pub fn validate(&self) -> Result<(), IrError> {
        for (index, statement) in self.statements.iter().enumerate() {
            let id = StatementId(index);
            let what = || id.to_string();
            for terminal in statement
                .lhs
                .iter()
                .chain(&statement.rhs)
                .chain(&statement.function_context)
            {
                self.check_terminal(*terminal, what)?;
            }
            if let Some(target) = statement.target_label {
                self.check_statement(target, what)?;
            } else if statement.kind.requires_target_label() {
                return Err(IrError::MissingTargetLabel(id, statement.kind));
            }
            match statement.kind {
                StatementKind::Call => {
                    let callee = statement
                        .function_to_call
                        .ok_or(IrError::MissingCallee(id))?;
                    if self.reflection.function(callee).is_none() {
                        return Err(dangling(what(), format!("function #{}", callee.0)));
                    }
                }
                StatementKind::SwitchValue if statement.rhs.len() < 2 => {
                    return Err(IrError::SwitchValueOperands(id, statement.rhs.len()));
                }
                StatementKind::SwitchValue if statement.rhs.len() % 2 != 0 => {
                    return Err(IrError::UnpairedSwitchCase(id, statement.rhs.len()));
                }
                StatementKind::CreateMap if statement.rhs.len() % 2 != 0 => {
                    return Err(IrError::OddMapOperands(id, statement.rhs.len()));
                }
                _ => {}
            }
        }

        for (index, terminal) in self.terminals.iter().enumerate() {
            let id = TerminalId(index);
            let what = || id.to_string();
            if terminal.is_literal && terminal.inline_generated.is_some() {
                return Err(IrError::LiteralAndInline(id));
            }
            if let Some(statement) = terminal.inline_generated {
                self.check_statement(statement, what)?;
            }
            if let Some(property) = terminal.associated_property
                && self.reflection.property(property).is_none()
            {
                return Err(dangling(what(), format!("property #{}", property.0)));
            }
            let mut seen = HashSet::from([id]);
            let mut link = terminal.context;
            while let Some(context) = link {
                self.check_terminal(context, what)?;
                if !seen.insert(context) {
                    return Err(IrError::CyclicContext(id));
                }
                link = self.terminals[context.0].context;
            }
        }

        for context in &self.functions {
            let what = || format!("function context #{}", context.function.0);
            if self.reflection.function(context.function).is_none() {
                return Err(dangling(what(), format!("function #{}", context.function.0)));
            }
            let groups = context.execution_groups.iter().flat_map(|g| &g.nodes);
            for node in context.linear_execution_list.iter().chain(groups) {
                self.check_node(*node, what)?;
            }
            for (node, statements) in context.statements_per_node.iter() {
                self.check_node(node, what)?;
                for statement in statements {
                    self.check_statement(*statement, what)?;
                }
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if let NodeKind::CallFunction { then_links, .. } = &node.kind {
                for link in then_links {
                    self.check_node(*link, || NodeId(index).to_string())?;
                }
            }
        }
        Ok(())
    }

    fn check_statement(&self, id: StatementId, what: impl Fn() -> String) -> Result<(), IrError> {
        match self.statement(id) {
            Some(_) => Ok(()),
            None => Err(dangling(what(), id.to_string())),
        }
    }

    fn check_terminal(&self, id: TerminalId, what: impl Fn() -> String) -> Result<(), IrError> {
        match self.terminal(id) {
            Some(_) => Ok(()),
            None => Err(dangling(what(), id.to_string())),
        }
    }

    fn check_node(&self, id: NodeId, what: impl Fn() -> String) -> Result<(), IrError> {
        match self.node(id) {
            Some(_) => Ok(()),
            None => Err(dangling(what(), id.to_string())),
        }
    }
}

fn dangling(what: String, target: String) -> IrError {
    IrError::Dangling { what, target }
}
