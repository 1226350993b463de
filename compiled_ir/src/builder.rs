//! Programmatic construction of a [`CompiledClass`]
//!
//! Used by tests and by embedders that produce the IR in-process instead of through JSON.

use crate::{
    ClassDesc, CompiledClass, DescriptorTable, EnumDesc, ExecutionGroup, FunctionContext,
    FunctionDesc, FunctionFlags, FunctionId, GraphNode, NodeId, NodeKind, PinType, PropertyDesc,
    PropertyFlags, PropertyId, PropertyOwner, Statement, StatementId, StatementsPerNode,
    StructDesc, Terminal, TerminalId,
};

pub struct ClassBuilder {
    class: CompiledClass,
    self_term: Option<TerminalId>,
}

impl ClassBuilder {
    /// Starts a non-native class deriving from `super_class`, registered as a native `U` class
    /// unless it is already known
    pub fn new(name: impl Into<String>, super_class: impl Into<String>) -> Self {
        let name = name.into();
        let super_class = super_class.into();

        let mut reflection = DescriptorTable::default();
        reflection
            .classes
            .insert("Object".to_string(), ClassDesc::native("Object", "U"));
        if super_class != "Object" {
            let mut desc = ClassDesc::native(super_class.clone(), "U");
            desc.super_class = Some("Object".to_string());
            reflection.classes.insert(super_class.clone(), desc);
        }
        reflection
            .classes
            .insert(name.clone(), ClassDesc::generated(name.clone(), super_class));

        Self {
            class: CompiledClass {
                name,
                reflection,
                nodes: vec![],
                terminals: vec![],
                statements: vec![],
                functions: vec![],
            },
            self_term: None,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    pub fn reflection(&self) -> &DescriptorTable {
        &self.class.reflection
    }

    /// Registers or replaces a class descriptor
    pub fn class(&mut self, desc: ClassDesc) -> &mut ClassDesc {
        let name = desc.name.clone();
        self.class.reflection.classes.insert(name.clone(), desc);
        &mut self.class.reflection.classes[&name]
    }

    pub fn native_class(
        &mut self,
        name: &str,
        cpp_prefix: &str,
        super_class: Option<&str>,
    ) -> &mut ClassDesc {
        let mut desc = ClassDesc::native(name, cpp_prefix);
        desc.super_class = super_class.map(str::to_string);
        self.class(desc)
    }

    /// Mutable access to the descriptor of the class being built
    pub fn this_class(&mut self) -> &mut ClassDesc {
        let name = self.class.name.clone();
        &mut self.class.reflection.classes[&name]
    }

    pub fn add_struct(&mut self, desc: StructDesc) {
        self.class.reflection.structs.insert(desc.name.clone(), desc);
    }

    pub fn add_enum(&mut self, desc: EnumDesc) {
        self.class.reflection.enums.insert(desc.name.clone(), desc);
    }

    pub fn property(&mut self, desc: PropertyDesc) -> PropertyId {
        let id = PropertyId(self.class.reflection.properties.len());
        match &desc.owner {
            PropertyOwner::Struct(name) => {
                if let Some(s) = self.class.reflection.structs.get_mut(name) {
                    s.properties.push(id);
                }
            }
            PropertyOwner::Function(f) => {
                if let Some(f) = self.class.reflection.functions.get_mut(f.0) {
                    f.properties.push(id);
                }
            }
            PropertyOwner::Class(_) => {}
        }
        self.class.reflection.properties.push(desc);
        id
    }

    /// Member variable of the class being built
    pub fn member(&mut self, name: &str, pin_type: PinType) -> PropertyId {
        let owner = PropertyOwner::Class(self.class.name.clone());
        self.property(PropertyDesc {
            name: name.to_string(),
            owner,
            pin_type,
            flags: Default::default(),
        })
    }

    pub fn local(&mut self, function: FunctionId, name: &str, pin_type: PinType) -> PropertyId {
        self.function_property(function, name, pin_type, Default::default())
    }

    pub fn param(&mut self, function: FunctionId, name: &str, pin_type: PinType) -> PropertyId {
        let flags = PropertyFlags {
            parm: true,
            ..Default::default()
        };
        self.function_property(function, name, pin_type, flags)
    }

    pub fn out_param(&mut self, function: FunctionId, name: &str, pin_type: PinType) -> PropertyId {
        let flags = PropertyFlags {
            parm: true,
            out_parm: true,
            ..Default::default()
        };
        self.function_property(function, name, pin_type, flags)
    }

    pub fn return_value(&mut self, function: FunctionId, pin_type: PinType) -> PropertyId {
        let flags = PropertyFlags {
            parm: true,
            out_parm: true,
            return_parm: true,
            ..Default::default()
        };
        self.function_property(function, "ReturnValue", pin_type, flags)
    }

    pub fn function_property(
        &mut self,
        function: FunctionId,
        name: &str,
        pin_type: PinType,
        flags: PropertyFlags,
    ) -> PropertyId {
        self.property(PropertyDesc {
            name: name.to_string(),
            owner: PropertyOwner::Function(function),
            pin_type,
            flags,
        })
    }

    /// Registers a function descriptor on its owner class
    pub fn function_desc(&mut self, desc: FunctionDesc) -> FunctionId {
        let id = FunctionId(self.class.reflection.functions.len());
        if let Some(owner) = self.class.reflection.classes.get_mut(&desc.owner) {
            owner.functions.push(id);
        }
        self.class.reflection.functions.push(desc);
        id
    }

    /// Non-native function declared on the class being built
    pub fn function(&mut self, name: &str) -> FunctionId {
        self.function_with_flags(name, Default::default())
    }

    pub fn function_with_flags(&mut self, name: &str, flags: FunctionFlags) -> FunctionId {
        let owner = self.class.name.clone();
        self.function_desc(FunctionDesc {
            name: name.to_string(),
            owner,
            flags,
            meta: Default::default(),
            properties: vec![],
        })
    }

    /// Native function declared on another class
    pub fn native_function(&mut self, owner: &str, name: &str, flags: FunctionFlags) -> FunctionId {
        self.function_desc(FunctionDesc {
            name: name.to_string(),
            owner: owner.to_string(),
            flags: FunctionFlags {
                native: true,
                ..flags
            },
            meta: Default::default(),
            properties: vec![],
        })
    }

    pub fn function_desc_mut(&mut self, function: FunctionId) -> &mut FunctionDesc {
        &mut self.class.reflection.functions[function.0]
    }

    pub fn node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        self.class.nodes.push(GraphNode {
            name: name.to_string(),
            kind,
        });
        NodeId(self.class.nodes.len() - 1)
    }

    pub fn terminal(&mut self, terminal: Terminal) -> TerminalId {
        self.class.terminals.push(terminal);
        TerminalId(self.class.terminals.len() - 1)
    }

    pub fn literal(&mut self, pin_type: PinType, value: &str) -> TerminalId {
        self.terminal(Terminal::literal(pin_type, value))
    }

    /// The shared `self` terminal
    pub fn self_term(&mut self) -> TerminalId {
        if let Some(id) = self.self_term {
            return id;
        }
        let id = self.terminal(Terminal::self_context());
        self.self_term = Some(id);
        id
    }

    /// Terminal reading or writing a property, with the property's name and type
    pub fn property_term(&mut self, property: PropertyId) -> TerminalId {
        let desc = &self.class.reflection.properties[property.0];
        let terminal = Terminal::property(desc.name.clone(), desc.pin_type.clone(), property);
        self.terminal(terminal)
    }

    pub fn property_term_in(&mut self, property: PropertyId, context: TerminalId) -> TerminalId {
        let desc = &self.class.reflection.properties[property.0];
        let terminal = Terminal::property(desc.name.clone(), desc.pin_type.clone(), property)
            .in_context(context);
        self.terminal(terminal)
    }

    pub fn statement(&mut self, statement: Statement) -> StatementId {
        self.class.statements.push(statement);
        StatementId(self.class.statements.len() - 1)
    }

    /// Replaces a statement added earlier, typically to patch a forward jump target
    pub fn set_statement(&mut self, id: StatementId, statement: Statement) {
        self.class.statements[id.0] = statement;
    }

    /// Adds a compiled function; nodes are listed in linear execution order
    pub fn function_context(
        &mut self,
        function: FunctionId,
        nodes: Vec<(NodeId, Vec<StatementId>)>,
        is_ubergraph: bool,
    ) -> usize {
        let mut statements_per_node = StatementsPerNode::default();
        let mut linear_execution_list = vec![];
        for (node, statements) in nodes {
            linear_execution_list.push(node);
            statements_per_node.insert(node, statements);
        }
        self.class.functions.push(FunctionContext {
            function,
            linear_execution_list,
            statements_per_node,
            execution_groups: vec![],
            is_ubergraph,
        });
        self.class.functions.len() - 1
    }

    pub fn execution_groups(&mut self, context: usize, groups: Vec<Vec<NodeId>>) {
        self.class.functions[context].execution_groups = groups
            .into_iter()
            .map(|nodes| ExecutionGroup {
                nodes: nodes.into_iter().collect(),
            })
            .collect();
    }

    /// Finishes the class, marking every statement some other statement jumps to
    pub fn build(mut self) -> CompiledClass {
        self.class.mark_jump_targets();
        self.class
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PinCategory, StatementKind};

    #[test]
    fn test_build_marks_jump_targets() {
        let mut builder = ClassBuilder::new("Test_C", "Object");
        let target = builder.statement(Statement::new(StatementKind::Nop));
        builder.statement(Statement::new(StatementKind::UnconditionalGoto).with_target(target));
        let class = builder.build();
        assert!(class.statements[0].is_jump_target);
        assert!(!class.statements[1].is_jump_target);
    }

    #[test]
    fn test_function_properties_are_registered() {
        let mut builder = ClassBuilder::new("Test_C", "Actor");
        let function = builder.function("Compute");
        builder.param(function, "Input", PinType::new(PinCategory::Int));
        builder.return_value(function, PinType::new(PinCategory::Float));
        let class = builder.build();
        let desc = class.reflection.function(function).unwrap();
        assert_eq!(desc.properties.len(), 2);
        assert_eq!(class.reflection.params(function).len(), 1);
        assert!(class.reflection.return_property(function).is_some());
        assert_eq!(class.super_class(), Some("Actor"));
        assert_eq!(
            class.reflection.class("Test_C").unwrap().functions,
            vec![function]
        );
    }

    #[test]
    fn test_self_term_is_shared() {
        let mut builder = ClassBuilder::new("Test_C", "Object");
        let a = builder.self_term();
        let b = builder.self_term();
        assert_eq!(a, b);
    }
}
