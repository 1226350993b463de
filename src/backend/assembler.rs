//! Declarations and definitions of every compiled function of a class

use compiled_ir::{
    CompiledClass, ContainerType, ExecutionGroup, FunctionContext, FunctionDesc, FunctionId,
    PinCategory, PropertyDesc, PropertyId, StatementKind,
};
use indexmap::IndexSet;

use super::context::{ClassEmissionContext, CodeText, EmitterContext, StateMaps};
use super::control_flow::{FlowStrategy, inner_function_implementation};
use super::error::{EmitError, Result};
use super::logger::LoggerRef;
use super::names::{class_name_of, function_name, property_name};
use super::native_types::{is_latent_action_info, property_type};
use super::options::BackendOptions;

/// Header and body text of one class
#[derive(Debug, Clone, Default)]
pub struct GeneratedClass {
    pub header: String,
    pub body: String,
    pub reports: Vec<FunctionReport>,
}

/// What happened to one compiled function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionReport {
    pub name: String,
    pub is_ubergraph: bool,
    pub execution_groups: usize,
    pub statements: usize,
    /// One entry per emitted body
    pub strategies: Vec<FlowStrategy>,
    pub error: Option<String>,
}

struct Signature {
    name: String,
    return_type: Option<String>,
    return_name: Option<String>,
    params: String,
    args: String,
    is_static: bool,
    is_const: bool,
}

impl Signature {
    fn new(ir: &CompiledClass, function: FunctionId, desc: &FunctionDesc) -> Result<Self> {
        let mut params = vec![];
        let mut args = vec![];
        for (_, param) in ir.reflection.params(function) {
            let name = property_name(&ir.reflection, param);
            params.push(param_declaration(ir, param, &name)?);
            args.push(name);
        }

        let (return_type, return_name) = match ir.reflection.return_property(function) {
            Some((_, ret)) => (
                Some(property_type(ir, ret)?),
                Some(property_name(&ir.reflection, ret)),
            ),
            None => (None, None),
        };

        Ok(Self {
            name: function_name(&ir.reflection, function)?,
            return_type,
            return_name,
            params: params.join(", "),
            args: args.join(", "),
            is_static: desc.flags.is_static,
            is_const: desc.flags.is_const,
        })
    }

    fn return_type(&self) -> &str {
        self.return_type.as_deref().unwrap_or("void")
    }

    fn declaration(&self, name: &str, is_const: bool) -> String {
        let prefix = if self.is_static { "static " } else { "" };
        let suffix = if is_const { " const" } else { "" };
        format!("{prefix}{} {name}({}){suffix};", self.return_type(), self.params)
    }

    fn definition(&self, class_name: &str, name: &str, is_const: bool) -> String {
        let suffix = if is_const { " const" } else { "" };
        format!("{} {class_name}::{name}({}){suffix}", self.return_type(), self.params)
    }

    /// Const member functions are forwarded to a mutable inner implementation
    fn needs_const_wrapper(&self) -> bool {
        self.is_const && !self.is_static
    }
}

fn param_declaration(ir: &CompiledClass, param: &PropertyDesc, name: &str) -> Result<String> {
    let ty = property_type(ir, param)?;
    if param.is_non_const_out() {
        return Ok(format!("{ty}& {name}"));
    }
    let pin = &param.pin_type;
    let by_const_ref = param.flags.const_parm
        || param.flags.reference_parm
        || pin.container != ContainerType::None
        || matches!(
            pin.category,
            PinCategory::Struct | PinCategory::String | PinCategory::Text
        );
    if by_const_ref {
        Ok(format!("const {ty}& {name}"))
    } else {
        Ok(format!("{ty} {name}"))
    }
}

fn ufunction_macro(desc: &FunctionDesc) -> String {
    let mut specifiers = vec![];
    if desc.flags.blueprint_pure {
        specifiers.push("BlueprintPure".to_string());
    } else if desc.flags.blueprint_callable {
        specifiers.push("BlueprintCallable".to_string());
    }
    if let Some(category) = &desc.meta.category {
        specifiers.push(format!("Category=\"{category}\""));
    }
    format!("UFUNCTION({})", specifiers.join(", "))
}

/// Properties read or written by the statements of an execution group, following context chains
/// and inline statements
pub fn referenced_properties(
    ir: &CompiledClass,
    function: &FunctionContext,
    group: &ExecutionGroup,
) -> IndexSet<PropertyId> {
    let mut properties = IndexSet::new();
    let mut seen_statements = IndexSet::new();
    let mut seen_terminals = IndexSet::new();
    let mut pending: Vec<_> = group
        .nodes
        .iter()
        .flat_map(|node| function.statements(*node))
        .copied()
        .rev()
        .collect();
    let mut terminals = vec![];

    while let Some(id) = pending.pop() {
        if !seen_statements.insert(id) {
            continue;
        }
        let Some(statement) = ir.statement(id) else {
            continue;
        };
        terminals.extend(
            statement
                .lhs
                .iter()
                .chain(&statement.rhs)
                .chain(&statement.function_context),
        );

        while let Some(term) = terminals.pop() {
            if !seen_terminals.insert(term) {
                continue;
            }
            let Some(terminal) = ir.terminal(term) else {
                continue;
            };
            if let Some(property) = terminal.associated_property {
                properties.insert(property);
            }
            terminals.extend(terminal.context);
            pending.extend(terminal.inline_generated);
        }
    }
    properties
}

/// Execution groups of the ubergraph that a latent call resumes into
fn latent_resumption_groups(class: &ClassEmissionContext) -> IndexSet<usize> {
    let ir = class.ir;
    ir.statements
        .iter()
        .filter(|s| s.kind == StatementKind::Call)
        .filter(|s| {
            let Some((callee, index)) = s.function_to_call.zip(s.ubergraph_call_index) else {
                return false;
            };
            ir.reflection
                .params(callee)
                .get(index)
                .is_some_and(|(_, param)| is_latent_action_info(&param.pin_type))
        })
        .filter_map(|s| s.target_label)
        .filter_map(|target| class.ubergraph_group_of(target))
        .collect()
}

struct ClassAssembler<'c, 'a> {
    class: &'c ClassEmissionContext<'a>,
    class_name: String,
    resumption_groups: IndexSet<usize>,
    states: StateMaps,
    header: CodeText,
    body: CodeText,
}

impl<'c, 'a> ClassAssembler<'c, 'a> {
    fn emit_declaration(&mut self, desc: &FunctionDesc, signature: &Signature) {
        let options = self.class.options;
        if signature.needs_const_wrapper() {
            self.header.add_line("private:");
            let inner = format!("{}__Inner", signature.name);
            self.header.add_line(signature.declaration(&inner, false));
            self.header.add_line("public:");
        }
        if options.emit_ufunction_macros {
            self.header.add_line(ufunction_macro(desc));
        }
        self.header
            .add_line(signature.declaration(&signature.name, signature.is_const));
    }

    fn emit_definition(&mut self, head: String, code: &CodeText) {
        self.body.add_line(head);
        self.body.add_line("{");
        self.body.append(code);
        self.body.add_line("}");
        self.body.add_line("");
    }

    /// Locals, the return local, the reconstructed body and the final return
    fn emit_body(
        &mut self,
        index: usize,
        group: Option<usize>,
        signature: &Signature,
        locals: &[(PropertyId, &PropertyDesc)],
    ) -> Result<(CodeText, FlowStrategy)> {
        let ir = self.class.ir;
        let mut ctx = EmitterContext::new(self.class, &mut self.states, index, 1);
        for (_, local) in locals {
            let ty = property_type(ir, local)?;
            let name = property_name(&ir.reflection, local);
            ctx.add_line(format!("{ty} {name}{{}};"));
        }
        if let (Some(ty), Some(name)) = (&signature.return_type, &signature.return_name) {
            ctx.add_line(format!("{ty} {name}{{}};"));
        }

        let strategy = inner_function_implementation(&mut ctx, group)?;

        if let Some(name) = &signature.return_name {
            ctx.add_line(format!("return {name};"));
        }
        Ok((ctx.code, strategy))
    }

    fn stub_body(signature: &Signature, error: &EmitError) -> CodeText {
        let mut code = CodeText::with_indent(1);
        code.add_line(format!("// Nativization failed: {error}"));
        code.add_line("check(false);");
        if let Some(ty) = &signature.return_type {
            code.add_line(format!("return {ty}{{}};"));
        }
        code
    }

    fn emit_function(&mut self, index: usize) -> FunctionReport {
        let ir = self.class.ir;
        let function = &ir.functions[index];
        let mut report = FunctionReport {
            name: ir
                .reflection
                .function(function.function)
                .map_or_else(|| format!("function #{}", function.function.0), |f| f.name.clone()),
            is_ubergraph: function.is_ubergraph,
            execution_groups: function.execution_groups.len(),
            statements: function.all_statements().count(),
            strategies: vec![],
            error: None,
        };

        if let Err(e) = self.emit_function_inner(index, &mut report) {
            self.class
                .logger
                .error(&format!("{}: nativization failed, {e}", report.name));
            report.error = Some(e.to_string());
        }
        report
    }

    fn emit_function_inner(&mut self, index: usize, report: &mut FunctionReport) -> Result<()> {
        let ir = self.class.ir;
        let function = &ir.functions[index];
        let desc = ir
            .reflection
            .function(function.function)
            .ok_or(EmitError::DanglingFunction(function.function.0))?;
        let signature = Signature::new(ir, function.function, desc)?;
        let locals = ir.reflection.locals(function.function);
        let class_name = self.class_name.clone();

        if function.is_ubergraph && !function.execution_groups.is_empty() {
            let mut failures = Vec::new();
            for (group_index, group) in function.execution_groups.iter().enumerate() {
                let name = format!("{}_{group_index}", signature.name);
                if self.class.options.emit_ufunction_macros
                    && self.resumption_groups.contains(&group_index)
                {
                    self.header.add_line("UFUNCTION()");
                }
                self.header.add_line(signature.declaration(&name, false));

                let referenced = referenced_properties(ir, function, group);
                let group_locals: Vec<_> = locals
                    .iter()
                    .filter(|(id, _)| referenced.contains(id))
                    .copied()
                    .collect();
                let head = signature.definition(&class_name, &name, false);
                match self.emit_body(index, Some(group_index), &signature, &group_locals) {
                    Ok((code, strategy)) => {
                        report.strategies.push(strategy);
                        self.emit_definition(head, &code);
                    }
                    // Other groups are still entered by events and latent callbacks
                    Err(e) => {
                        let stub = Self::stub_body(&signature, &e);
                        self.emit_definition(head, &stub);
                        self.class
                            .logger
                            .error(&format!("{name}: nativization failed, {e}"));
                        failures.push(format!("{name}: {e}"));
                    }
                }
            }
            if !failures.is_empty() {
                report.error = Some(failures.join("; "));
            }
            return Ok(());
        }

        self.emit_declaration(desc, &signature);

        let (name, is_const) = if signature.needs_const_wrapper() {
            let inner = format!("{}__Inner", signature.name);
            let head = signature.definition(&class_name, &signature.name, true);
            let mut forward = CodeText::with_indent(1);
            forward.add_line(format!(
                "return const_cast<{class_name}*>(this)->{inner}({});",
                signature.args
            ));
            self.emit_definition(head, &forward);
            (inner, false)
        } else {
            (signature.name.clone(), signature.is_const)
        };

        let head = signature.definition(&class_name, &name, is_const);
        match self.emit_body(index, None, &signature, &locals) {
            Ok((code, strategy)) => {
                report.strategies.push(strategy);
                self.emit_definition(head, &code);
                Ok(())
            }
            Err(e) => {
                let stub = Self::stub_body(&signature, &e);
                self.emit_definition(head, &stub);
                Err(e)
            }
        }
    }
}

/// Generates every compiled function of `ir`
pub fn generate_class(
    ir: &CompiledClass,
    options: &BackendOptions,
    logger: LoggerRef,
) -> Result<GeneratedClass> {
    generate_functions(ir, options, logger, |_| true)
}

/// Generates the compiled functions of `ir` accepted by `filter`
///
/// State indices of the ubergraph are shared with the functions that call into it, so filtering
/// can renumber them.
pub fn generate_functions(
    ir: &CompiledClass,
    options: &BackendOptions,
    logger: LoggerRef,
    filter: impl Fn(&FunctionDesc) -> bool,
) -> Result<GeneratedClass> {
    let class = ClassEmissionContext::new(ir, options, logger);
    let mut assembler = ClassAssembler {
        class: &class,
        class_name: class_name_of(&ir.reflection, &ir.name)?,
        resumption_groups: latent_resumption_groups(&class),
        states: StateMaps::default(),
        header: CodeText::new(),
        body: CodeText::new(),
    };

    let mut reports = vec![];
    for (index, function) in ir.functions.iter().enumerate() {
        if !ir.reflection.function(function.function).is_none_or(&filter) {
            continue;
        }
        reports.push(assembler.emit_function(index));
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    logger.info(&format!(
        "{}: generated {} functions, {failed} failed",
        ir.name,
        reports.len()
    ));

    Ok(GeneratedClass {
        header: assembler.header.into_string(),
        body: assembler.body.into_string(),
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::logger::{BufferedLogger, LogLevel};
    use compiled_ir::builder::ClassBuilder;
    use compiled_ir::{FunctionFlags, NodeKind, PinType, Statement, StructDesc, Terminal};

    fn door() -> ClassBuilder {
        let mut b = ClassBuilder::new("BP_Door_C", "Actor");
        b.native_class("Actor", "A", Some("Object"));
        b
    }

    fn generate(ir: &CompiledClass) -> (GeneratedClass, BufferedLogger) {
        let logger = BufferedLogger::all();
        let generated = generate_class(ir, &BackendOptions::default(), &logger).unwrap();
        (generated, logger)
    }

    /// `GetSpeed(Scale) -> float` assigning the parameter through a local
    fn get_speed(flags: FunctionFlags) -> CompiledClass {
        let mut b = door();
        let function = b.function_with_flags("GetSpeed", flags);
        b.function_desc_mut(function).meta.category = Some("Door".into());
        let scale = b.param(function, "Scale", PinType::new(PinCategory::Float));
        let temp = b.local(function, "Temp", PinType::new(PinCategory::Float));
        let ret = b.return_value(function, PinType::new(PinCategory::Float));
        let scale = b.property_term(scale);
        let temp = b.property_term(temp);
        let ret = b.property_term(ret);
        let a = b.statement(
            Statement::new(StatementKind::Assignment)
                .with_lhs(temp)
                .with_rhs([scale]),
        );
        let r = b.statement(
            Statement::new(StatementKind::Assignment)
                .with_lhs(ret)
                .with_rhs([temp]),
        );
        let entry = b.node("Entry", NodeKind::FunctionEntry);
        b.function_context(function, vec![(entry, vec![a, r])], false);
        b.build()
    }

    #[test]
    fn test_function_declaration_and_definition() {
        let flags = FunctionFlags {
            blueprint_callable: true,
            ..Default::default()
        };
        let (generated, _) = generate(&get_speed(flags));
        assert_eq!(
            generated.header,
            "UFUNCTION(BlueprintCallable, Category=\"Door\")\n\
             float bpf__GetSpeed__pf(float bpp__Scale__pf);\n"
        );
        assert_eq!(
            generated.body,
            "float UBP_Door_C__pf::bpf__GetSpeed__pf(float bpp__Scale__pf)\n\
             {\n\
             \tfloat bpfv__Temp__pf{};\n\
             \tfloat bpp__ReturnValue__pf{};\n\
             \tbpfv__Temp__pf = bpp__Scale__pf;\n\
             \tbpp__ReturnValue__pf = bpfv__Temp__pf;\n\
             \treturn bpp__ReturnValue__pf;\n\
             }\n\
             \n"
        );
        assert_eq!(
            generated.reports,
            vec![FunctionReport {
                name: "GetSpeed".into(),
                is_ubergraph: false,
                execution_groups: 0,
                statements: 2,
                strategies: vec![FlowStrategy::NoGoto],
                error: None,
            }]
        );
    }

    #[test]
    fn test_const_function_forwards_to_inner() {
        let flags = FunctionFlags {
            is_const: true,
            blueprint_pure: true,
            ..Default::default()
        };
        let options = BackendOptions {
            emit_ufunction_macros: false,
            ..Default::default()
        };
        let ir = get_speed(flags);
        let logger = BufferedLogger::all();
        let generated = generate_class(&ir, &options, &logger).unwrap();
        assert_eq!(
            generated.header,
            "private:\n\
             float bpf__GetSpeed__pf__Inner(float bpp__Scale__pf);\n\
             public:\n\
             float bpf__GetSpeed__pf(float bpp__Scale__pf) const;\n"
        );
        assert!(generated.body.starts_with(
            "float UBP_Door_C__pf::bpf__GetSpeed__pf(float bpp__Scale__pf) const\n\
             {\n\
             \treturn const_cast<UBP_Door_C__pf*>(this)->bpf__GetSpeed__pf__Inner(bpp__Scale__pf);\n\
             }\n\
             \n\
             float UBP_Door_C__pf::bpf__GetSpeed__pf__Inner(float bpp__Scale__pf)\n\
             {\n"
        ));
    }

    #[test]
    fn test_static_function_params() {
        let mut b = door();
        let function = b.function_with_flags(
            "Describe",
            FunctionFlags {
                is_static: true,
                ..Default::default()
            },
        );
        b.param(function, "Label", PinType::new(PinCategory::String));
        b.out_param(function, "Count", PinType::new(PinCategory::Int));
        b.param(function, "Names", PinType::new(PinCategory::Name).array());
        let entry = b.node("Entry", NodeKind::FunctionEntry);
        b.function_context(function, vec![(entry, vec![])], false);
        let ir = b.build();

        let (generated, _) = generate(&ir);
        assert!(generated.header.ends_with(
            "static void bpf__Describe__pf(const FString& bpp__Label__pf, int32& bpp__Count__pf, const TArray<FName>& bpp__Names__pf);\n"
        ));
        assert!(generated.body.starts_with(
            "void UBP_Door_C__pf::bpf__Describe__pf(const FString& bpp__Label__pf, int32& bpp__Count__pf, const TArray<FName>& bpp__Names__pf)\n{\n}\n"
        ));
    }

    #[test]
    fn test_malformed_function_gets_stub() {
        let mut b = door();
        let broken = b.function("Broken");
        b.return_value(broken, PinType::new(PinCategory::Int));
        let missing = b.statement(Statement::new(StatementKind::Assignment));
        let entry = b.node("Entry", NodeKind::FunctionEntry);
        b.function_context(broken, vec![(entry, vec![missing])], false);

        let fine = b.function("Fine");
        let nop = b.statement(Statement::new(StatementKind::Nop));
        let entry = b.node("Entry", NodeKind::FunctionEntry);
        b.function_context(fine, vec![(entry, vec![nop])], false);
        let ir = b.build();

        let (generated, logger) = generate(&ir);
        assert!(generated.body.starts_with(
            "int32 UBP_Door_C__pf::bpf__Broken__pf()\n\
             {\n\
             \t// Nativization failed: statement #0 has no left hand side operand\n\
             \tcheck(false);\n\
             \treturn int32{};\n\
             }\n"
        ));
        assert!(generated.body.contains("\t//No operation.\n"));
        assert_eq!(generated.reports[0].strategies, vec![]);
        assert!(generated.reports[0].error.is_some());
        assert_eq!(generated.reports[1].error, None);
        assert_eq!(logger.count(LogLevel::Error), 1);
    }

    /// Ubergraph split in two groups; the second resumes a latent `Delay`
    fn split_ubergraph() -> CompiledClass {
        let mut b = door();
        b.native_class("KismetSystemLibrary", "U", Some("Object"));
        b.add_struct(StructDesc::native("LatentActionInfo"));
        let execute = b.function("ExecuteUbergraph_BP_Door");
        b.param(execute, "EntryPoint", PinType::new(PinCategory::Int));
        let used = b.local(execute, "CallFunc_Result", PinType::new(PinCategory::Float));
        b.local(execute, "Temp_Bool", PinType::new(PinCategory::Boolean));

        let flags = FunctionFlags {
            is_static: true,
            ..Default::default()
        };
        let delay = b.native_function("KismetSystemLibrary", "Delay", flags);
        b.param(delay, "Duration", PinType::new(PinCategory::Float));
        b.param(delay, "LatentInfo", PinType::of(PinCategory::Struct, "LatentActionInfo"));

        let used = b.property_term(used);
        let half = b.literal(PinType::new(PinCategory::Float), "0.5");
        let info = b.literal(
            PinType::of(PinCategory::Struct, "LatentActionInfo"),
            "(Linkage=-1,UUID=3,ExecutionFunction=\"ExecuteUbergraph_BP_Door\",CallbackTarget=None)",
        );
        let start = b.statement(Statement::new(StatementKind::Nop));
        let resume = b.statement(
            Statement::new(StatementKind::Assignment)
                .with_lhs(used)
                .with_rhs([half]),
        );
        let end = b.statement(Statement::new(StatementKind::EndOfThread));
        let mut delay_call = Statement::call(delay).with_rhs([half, info]).with_target(resume);
        delay_call.ubergraph_call_index = Some(1);
        let delay_call = b.statement(delay_call);
        let delay_end = b.statement(Statement::new(StatementKind::EndOfThread));

        let event = b.node("BeginPlay", NodeKind::Event);
        let after = b.node("AfterDelay", NodeKind::Other);
        let wait = b.node(
            "Delay",
            NodeKind::CallFunction {
                is_latent: true,
                then_links: vec![after],
            },
        );
        let context = b.function_context(
            execute,
            vec![
                (event, vec![start]),
                (wait, vec![delay_call, delay_end]),
                (after, vec![resume, end]),
            ],
            true,
        );
        b.execution_groups(context, vec![vec![event, wait], vec![after]]);
        b.build()
    }

    #[test]
    fn test_split_ubergraph_emits_one_function_per_group() {
        let ir = split_ubergraph();
        let (generated, _) = generate(&ir);
        assert_eq!(
            generated.header,
            "void bpf__ExecuteUbergraph_BP_Door__pf_0(int32 bpp__EntryPoint__pf);\n\
             UFUNCTION()\n\
             void bpf__ExecuteUbergraph_BP_Door__pf_1(int32 bpp__EntryPoint__pf);\n"
        );
        assert!(generated.body.contains(
            "void UBP_Door_C__pf::bpf__ExecuteUbergraph_BP_Door__pf_1(int32 bpp__EntryPoint__pf)\n\
             {\n\
             \tfloat bpfv__CallFunc_Result__pf{};\n\
             \tcheck(bpp__EntryPoint__pf == 2);\n\
             \tbpfv__CallFunc_Result__pf = 0.500000;\n\
             \treturn; // KCST_EndOfThread\n\
             }\n"
        ));
        assert!(!generated.body.contains("bpfv__Temp_Bool__pf"));
        assert_eq!(
            generated.reports[0].strategies,
            vec![FlowStrategy::NoGoto, FlowStrategy::NoGoto]
        );
    }

    #[test]
    fn test_failed_group_keeps_later_groups() {
        let mut b = door();
        let execute = b.function("ExecuteUbergraph_BP_Door");
        b.param(execute, "EntryPoint", PinType::new(PinCategory::Int));
        let broken = b.statement(Statement::new(StatementKind::Assignment));
        let begin_end = b.statement(Statement::new(StatementKind::EndOfThread));
        let nop = b.statement(Statement::new(StatementKind::Nop));
        let tick_end = b.statement(Statement::new(StatementKind::EndOfThread));

        let begin = b.node("BeginPlay", NodeKind::Event);
        let tick = b.node("Tick", NodeKind::Event);
        let context = b.function_context(
            execute,
            vec![(begin, vec![broken, begin_end]), (tick, vec![nop, tick_end])],
            true,
        );
        b.execution_groups(context, vec![vec![begin], vec![tick]]);
        let ir = b.build();

        let (generated, logger) = generate(&ir);
        assert_eq!(
            generated.header,
            "void bpf__ExecuteUbergraph_BP_Door__pf_0(int32 bpp__EntryPoint__pf);\n\
             void bpf__ExecuteUbergraph_BP_Door__pf_1(int32 bpp__EntryPoint__pf);\n"
        );
        assert!(generated.body.starts_with(
            "void UBP_Door_C__pf::bpf__ExecuteUbergraph_BP_Door__pf_0(int32 bpp__EntryPoint__pf)\n\
             {\n\
             \t// Nativization failed: statement #0 has no left hand side operand\n\
             \tcheck(false);\n\
             }\n"
        ));
        assert!(generated.body.contains(
            "void UBP_Door_C__pf::bpf__ExecuteUbergraph_BP_Door__pf_1(int32 bpp__EntryPoint__pf)\n"
        ));
        assert!(generated.body.contains("\t//No operation.\n"));

        let report = &generated.reports[0];
        assert_eq!(report.strategies, vec![FlowStrategy::NoGoto]);
        assert_eq!(
            report.error.as_deref(),
            Some("bpf__ExecuteUbergraph_BP_Door__pf_0: statement #0 has no left hand side operand")
        );
        assert_eq!(logger.count(LogLevel::Error), 1);
    }

    #[test]
    fn test_referenced_properties_follow_inline_statements() {
        let mut b = door();
        let function = b.function("Compute");
        let a = b.local(function, "A", PinType::new(PinCategory::Int));
        let c = b.local(function, "C", PinType::new(PinCategory::Int));
        let a = b.property_term(a);
        let c = b.property_term(c);
        let add = b.native_function("KismetMathLibrary", "Add_IntInt", FunctionFlags {
            is_static: true,
            ..Default::default()
        });
        let inline = b.statement(Statement::call(add).with_rhs([c, c]));
        let sum = b.terminal(Terminal {
            inline_generated: Some(inline),
            pin_type: PinType::new(PinCategory::Int),
            ..Default::default()
        });
        let assign = b.statement(
            Statement::new(StatementKind::Assignment)
                .with_lhs(a)
                .with_rhs([sum]),
        );
        let entry = b.node("Entry", NodeKind::Event);
        let context = b.function_context(function, vec![(entry, vec![assign])], true);
        b.execution_groups(context, vec![vec![entry]]);
        let ir = b.build();

        let function = &ir.functions[0];
        let found = referenced_properties(&ir, function, &function.execution_groups[0]);
        assert_eq!(found.len(), 2);
    }
}
