//! Output buffers and the state threaded through emission

use compiled_ir::{
    CompiledClass, FunctionContext, FunctionDesc, FunctionId, PropertyDesc, PropertyId, Statement,
    StatementId, Terminal, TerminalId,
};
use indexmap::IndexMap;

use super::error::{EmitError, Result};
use super::logger::LoggerRef;
use super::options::BackendOptions;

/// Line oriented source text, indented with one tab per level
#[derive(Debug, Clone, Default)]
pub struct CodeText {
    text: String,
    indent_level: usize,
}

impl CodeText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent_level: usize) -> Self {
        Self {
            text: String::new(),
            indent_level,
        }
    }

    fn indent(&self) -> String {
        "\t".repeat(self.indent_level)
    }

    pub fn add_line(&mut self, line: impl AsRef<str>) {
        let indent = self.indent();
        self.text.push_str(&indent);
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    pub fn add_indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn drop_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Appends already formatted text verbatim
    pub fn append(&mut self, other: &CodeText) {
        self.text.push_str(&other.text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// State indices of one function, in first-seen order starting at 1
#[derive(Debug, Clone, Default)]
pub struct StateMap {
    indices: IndexMap<StatementId, i32>,
}

impl StateMap {
    /// Index of `statement`, allocated on first lookup
    pub fn state_index(&mut self, statement: StatementId) -> i32 {
        let next = self.indices.len() as i32 + 1;
        *self.indices.entry(statement).or_insert(next)
    }

    pub fn get(&self, statement: StatementId) -> Option<i32> {
        self.indices.get(&statement).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Per-class data shared by every function of the class, read-only once built
pub struct ClassEmissionContext<'a> {
    pub ir: &'a CompiledClass,
    pub options: &'a BackendOptions,
    pub logger: LoggerRef<'a>,
    function_indices: IndexMap<FunctionId, usize>,
    ubergraph: Option<usize>,
    ubergraph_statement_to_group: IndexMap<StatementId, usize>,
}

impl<'a> ClassEmissionContext<'a> {
    pub fn new(ir: &'a CompiledClass, options: &'a BackendOptions, logger: LoggerRef<'a>) -> Self {
        let function_indices = ir
            .functions
            .iter()
            .enumerate()
            .map(|(index, f)| (f.function, index))
            .collect();
        let ubergraph = ir.functions.iter().position(|f| f.is_ubergraph);

        let mut ubergraph_statement_to_group = IndexMap::new();
        if let Some(context) = ubergraph.map(|u| &ir.functions[u]) {
            for (group_index, group) in context.execution_groups.iter().enumerate() {
                for node in &group.nodes {
                    for statement in context.statements(*node) {
                        ubergraph_statement_to_group.insert(*statement, group_index);
                    }
                }
            }
        }

        Self {
            ir,
            options,
            logger,
            function_indices,
            ubergraph,
            ubergraph_statement_to_group,
        }
    }

    pub fn function_index(&self, function: FunctionId) -> Option<usize> {
        self.function_indices.get(&function).copied()
    }

    pub fn ubergraph_index(&self) -> Option<usize> {
        self.ubergraph
    }

    pub fn ubergraph(&self) -> Option<&'a FunctionContext> {
        self.ubergraph.map(|u| &self.ir.functions[u])
    }

    /// Execution group of the ubergraph that holds `statement`
    pub fn ubergraph_group_of(&self, statement: StatementId) -> Option<usize> {
        self.ubergraph_statement_to_group.get(&statement).copied()
    }

    /// Name of the blueprint asset, the generated class name without its `_C` suffix
    pub fn blueprint_name(&self) -> &'a str {
        let name = self.ir.name.as_str();
        name.strip_suffix("_C").unwrap_or(name)
    }
}

/// State indices of every function of a class, owned by the assembler
#[derive(Debug, Default)]
pub struct StateMaps {
    per_function: IndexMap<usize, StateMap>,
}

impl StateMaps {
    pub fn for_function(&mut self, function_index: usize) -> &mut StateMap {
        self.per_function.entry(function_index).or_default()
    }

    pub fn get(&self, function_index: usize) -> Option<&StateMap> {
        self.per_function.get(&function_index)
    }
}

/// Emission state of one function body (or one execution group of it)
pub struct EmitterContext<'a> {
    pub class: &'a ClassEmissionContext<'a>,
    states: &'a mut StateMaps,
    pub code: CodeText,
    pub function_index: usize,
    pub execution_group: Option<usize>,
    pub use_goto_state: bool,
    pub use_flow_stack: bool,
    local_name_index: usize,
}

impl<'a> EmitterContext<'a> {
    pub fn new(
        class: &'a ClassEmissionContext<'a>,
        states: &'a mut StateMaps,
        function_index: usize,
        indent_level: usize,
    ) -> Self {
        Self {
            class,
            states,
            code: CodeText::with_indent(indent_level),
            function_index,
            execution_group: None,
            use_goto_state: false,
            use_flow_stack: false,
            local_name_index: 0,
        }
    }

    pub fn ir(&self) -> &'a CompiledClass {
        self.class.ir
    }

    pub fn logger(&self) -> LoggerRef<'a> {
        self.class.logger
    }

    pub fn function_context(&self) -> &'a FunctionContext {
        &self.class.ir.functions[self.function_index]
    }

    pub fn add_line(&mut self, line: impl AsRef<str>) {
        self.code.add_line(line);
    }

    pub fn increase_indent(&mut self) {
        self.code.add_indent();
    }

    pub fn decrease_indent(&mut self) {
        self.code.drop_indent();
    }

    pub fn generate_unique_local_name(&mut self) -> String {
        let name = format!("__Local__{}", self.local_name_index);
        self.local_name_index += 1;
        name
    }

    /// State index of `statement` within the function being emitted
    pub fn state_index(&mut self, statement: StatementId) -> i32 {
        self.states
            .for_function(self.function_index)
            .state_index(statement)
    }

    /// State index of `statement` within the ubergraph, used by calls that enter it
    pub fn ubergraph_state_index(&mut self, statement: StatementId) -> i32 {
        let index = self.class.ubergraph_index().unwrap_or(self.function_index);
        self.states.for_function(index).state_index(statement)
    }

    pub fn statement(&self, id: StatementId) -> Result<&'a Statement> {
        self.class
            .ir
            .statement(id)
            .ok_or(EmitError::DanglingStatement(id))
    }

    pub fn terminal(&self, id: TerminalId) -> Result<&'a Terminal> {
        self.class
            .ir
            .terminal(id)
            .ok_or(EmitError::DanglingTerminal(id))
    }

    pub fn property(&self, id: PropertyId) -> Result<&'a PropertyDesc> {
        self.class
            .ir
            .reflection
            .property(id)
            .ok_or(EmitError::DanglingProperty(id.0))
    }

    pub fn function(&self, id: FunctionId) -> Result<&'a FunctionDesc> {
        self.class
            .ir
            .reflection
            .function(id)
            .ok_or(EmitError::DanglingFunction(id.0))
    }

    /// Right hand side operand `index` of `statement`
    pub fn rhs(&self, id: StatementId, statement: &Statement, index: usize) -> Result<TerminalId> {
        statement
            .rhs
            .get(index)
            .copied()
            .ok_or(EmitError::MissingRhs {
                statement: id,
                expected: index + 1,
                found: statement.rhs.len(),
            })
    }

    pub fn lhs(&self, id: StatementId, statement: &Statement) -> Result<TerminalId> {
        statement.lhs.ok_or(EmitError::MissingLhs(id))
    }
}
