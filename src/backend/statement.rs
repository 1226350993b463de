//! Lowering of compiled statements to C++ lines

use compiled_ir::{
    FunctionId, PinCategory, PinType, PropertyDesc, Statement, StatementId, StatementKind,
    Terminal, TerminalId,
};

use super::context::EmitterContext;
use super::error::{EmitError, Result};
use super::names;
use super::native_types::{
    self, generate_automatic_cast, pin_type_to_native_type, property_pin_type, property_type,
};
use super::term::{self, SetterExpression, TermUsage, term_to_text, with_safe_context};

const POP_STATE: &str =
    "__CurrentState = (__StateStack.Num() > 0) ? __StateStack.Pop(/*bAllowShrinking=*/ false) : -1;";

/// Array library functions with dedicated overloads for elements lacking `operator==`
const CUSTOM_THUNK_ARRAY_FUNCTIONS: [&str; 4] =
    ["Array_Find", "Array_Contains", "Array_RemoveItem", "Array_AddUnique"];

/// Appends the lines of one statement to the current body
pub fn emit_statement(ctx: &mut EmitterContext, id: StatementId) -> Result<()> {
    let statement = ctx.statement(id)?;
    match statement.kind {
        StatementKind::Nop => ctx.add_line("//No operation."),
        StatementKind::Call => emit_call(ctx, id, statement)?,
        StatementKind::Assignment => emit_assignment(ctx, id, statement)?,
        StatementKind::CompileError => {
            ctx.logger()
                .error(&format!("C++ backend encountered a CompileError statement ({id})"));
            ctx.add_line("static_assert(false); // KCST_CompileError");
        }
        StatementKind::PushState => emit_push_state(ctx, id, statement)?,
        StatementKind::Return => {
            ctx.logger()
                .error(&format!("C++ backend encountered a Return statement ({id})"));
            ctx.add_line("// Return statement.");
        }
        StatementKind::EndOfThread => emit_end_of_thread(ctx),
        StatementKind::Comment => {
            ctx.add_line(format!("// {}", statement.comment.replace('\n', " ")));
        }
        StatementKind::DebugSite | StatementKind::WireTraceSite => {}
        StatementKind::CastObjToInterface => emit_cast_obj_to_interface(ctx, id, statement)?,
        StatementKind::CastBetweenInterfaces => {
            emit_cast_between_interfaces(ctx, id, statement)?
        }
        StatementKind::CastInterfaceToObj | StatementKind::DynamicCast => {
            emit_dynamic_cast(ctx, id, statement)?
        }
        StatementKind::MetaCast | StatementKind::ObjectToBool => {
            emit_class_check(ctx, id, statement)?
        }
        StatementKind::AddDelegate
        | StatementKind::RemoveDelegate
        | StatementKind::ClearDelegate
        | StatementKind::BindDelegate => emit_delegate(ctx, id, statement)?,
        StatementKind::CallDelegate => emit_call_delegate(ctx, id, statement)?,
        StatementKind::CreateArray | StatementKind::CreateSet | StatementKind::CreateMap => {
            emit_container(ctx, id, statement)?
        }
        StatementKind::ComputedGoto => emit_computed_goto(ctx, id, statement)?,
        StatementKind::GotoIfNot
        | StatementKind::EndOfThreadIfNot
        | StatementKind::GotoReturnIfNot => emit_conditional_goto(ctx, id, statement)?,
        StatementKind::GotoReturn => {
            if ctx.use_goto_state {
                ctx.add_line("__CurrentState = -1;");
                ctx.add_line("break;");
            } else {
                ctx.add_line("return; // KCST_GotoReturn");
            }
        }
        StatementKind::UnconditionalGoto => {
            if ctx.use_goto_state {
                let state = target_state(ctx, id, statement)?;
                ctx.add_line(format!("__CurrentState = {state};"));
                ctx.add_line("break;");
            } else {
                ctx.add_line("// optimized KCST_UnconditionalGoto");
            }
        }
        // Only meaningful as inline expressions
        StatementKind::SwitchValue
        | StatementKind::ArrayGetByRef
        | StatementKind::AssignmentOnPersistentFrame => {
            ctx.add_line("// Warning: Ignoring unsupported statement");
            ctx.logger().error(&format!(
                "C++ backend encountered unsupported statement {:?} ({id})",
                statement.kind
            ));
        }
    }
    Ok(())
}

fn associated_property<'a>(
    ctx: &EmitterContext<'a>,
    terminal: &Terminal,
) -> Result<Option<&'a PropertyDesc>> {
    terminal
        .associated_property
        .map(|p| ctx.property(p))
        .transpose()
}

fn with_cast(cast: Option<(String, String)>, value: String) -> String {
    match cast {
        Some((begin, end)) => format!("{begin}{value}{end}"),
        None => value,
    }
}

/// Cast converting `rhs` into the type of `lhs`
fn operand_cast(
    ctx: &EmitterContext,
    lhs: TerminalId,
    rhs: TerminalId,
) -> Result<Option<(String, String)>> {
    let l = ctx.terminal(lhs)?;
    let r = ctx.terminal(rhs)?;
    Ok(generate_automatic_cast(
        ctx.ir(),
        &l.pin_type,
        &r.pin_type,
        associated_property(ctx, l)?,
        associated_property(ctx, r)?,
        false,
    ))
}

/// Right hand side operand `index` rendered for reading
fn operand(
    ctx: &mut EmitterContext,
    id: StatementId,
    statement: &Statement,
    index: usize,
) -> Result<String> {
    let term = ctx.rhs(id, statement, index)?;
    term_to_text(ctx, term, TermUsage::Getter, true)
}

fn callee_of(id: StatementId, statement: &Statement) -> Result<FunctionId> {
    statement.function_to_call.ok_or(EmitError::MissingCallee(id))
}

fn emit_call(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    let callee_id = callee_of(id, statement)?;
    let callee = ctx.function(callee_id)?;
    let on_different_object = match statement.function_context {
        Some(context) => !ctx.terminal(context)?.is_self(),
        None => false,
    };
    let guard = if on_different_object && !callee.flags.is_static {
        statement.function_context
    } else {
        None
    };

    // Calls into a split ubergraph target the function of the group holding the label
    let mut postfix = String::new();
    if let Some(target) = statement.target_label
        && let Some(ubergraph) = ctx.class.ubergraph()
        && ubergraph.function == callee_id
        && !ubergraph.execution_groups.is_empty()
    {
        match ctx.class.ubergraph_group_of(target) {
            Some(group) => postfix = format!("_{group}"),
            None => ctx.logger().error(&format!(
                "{target} is not part of any execution group of the ubergraph"
            )),
        }
    }

    with_safe_context(ctx, guard, |ctx| {
        let line = call_statement_inner(ctx, id, false, &postfix)?;
        ctx.add_line(line);
        Ok(())
    })
}

/// Parameter type of a wildcard function taken from the array argument it depends on
struct WildcardCast {
    dependent_params: Vec<String>,
    array_pin: Option<PinType>,
}

impl WildcardCast {
    fn new(
        ctx: &EmitterContext,
        id: StatementId,
        statement: &Statement,
        callee: FunctionId,
    ) -> Result<Self> {
        let desc = ctx.function(callee)?;
        let split = |meta: &Option<String>| -> Vec<String> {
            meta.as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        let dependent_params = split(&desc.meta.array_dependent_param);
        let array_params = split(&desc.meta.array_param);

        let mut array_pin = None;
        if let [array_param] = array_params.as_slice() {
            let params = ctx.ir().reflection.params(callee);
            if let Some(index) = params.iter().position(|(_, p)| &p.name == array_param) {
                let term = ctx.rhs(id, statement, index)?;
                array_pin = Some(ctx.terminal(term)?.pin_type.clone());
            }
        }
        Ok(Self {
            dependent_params,
            array_pin,
        })
    }

    fn fill(&self, param: &PropertyDesc, l_type: &mut PinType) {
        let Some(array) = &self.array_pin else {
            return;
        };
        let castable = param.flags.const_parm || !param.flags.out_parm;
        if castable
            && matches!(l_type.category, PinCategory::Wildcard | PinCategory::Int)
            && self.dependent_params.contains(&param.name)
        {
            l_type.category = array.category;
            l_type.sub_category = array.sub_category.clone();
            l_type.sub_category_object = array.sub_category_object.clone();
        }
    }
}

/// Argument list of a call, without the surrounding parentheses
pub fn method_input_parameter_list(ctx: &mut EmitterContext, id: StatementId) -> Result<String> {
    let ir = ctx.ir();
    let statement = ctx.statement(id)?;
    let callee = callee_of(id, statement)?;
    let wildcard = WildcardCast::new(ctx, id, statement, callee)?;

    let mut arguments = vec![];
    for (index, (_, param)) in ir.reflection.params(callee).into_iter().enumerate() {
        let term = ctx.rhs(id, statement, index)?;
        let argument = match statement.target_label {
            Some(target) if statement.ubergraph_call_index == Some(index) => {
                if native_types::is_latent_action_info(&param.pin_type) {
                    term::latent_function_info_term_to_text(ctx, term, target)?
                } else {
                    ctx.ubergraph_state_index(target).to_string()
                }
            }
            _ => {
                let terminal = ctx.terminal(term)?;
                let mut l_type = property_pin_type(param);
                wildcard.fill(param, &mut l_type);
                let cast = generate_automatic_cast(
                    ir,
                    &l_type,
                    &terminal.pin_type,
                    Some(param),
                    associated_property(ctx, terminal)?,
                    false,
                );
                let usage = if l_type.is_reference {
                    TermUsage::UnspecifiedOrReference
                } else {
                    TermUsage::Getter
                };
                with_cast(cast, term_to_text(ctx, term, usage, true)?)
            }
        };

        if param.is_non_const_out() {
            arguments.push(format!("/*out*/ {argument}"));
        } else {
            arguments.push(argument);
        }
    }
    Ok(arguments.join(", "))
}

fn custom_thunk_postfix(
    ctx: &EmitterContext,
    id: StatementId,
    statement: &Statement,
    callee: FunctionId,
) -> Result<&'static str> {
    let ir = ctx.ir();
    let desc = ctx.function(callee)?;
    if !CUSTOM_THUNK_ARRAY_FUNCTIONS.contains(&desc.name.as_str()) {
        return Ok("");
    }

    let params = ir.reflection.params(callee);
    let Some(index) = params.iter().position(|(_, p)| p.pin_type.is_array()) else {
        return Ok("");
    };
    let array = ctx.terminal(ctx.rhs(id, statement, index)?)?;
    match array.pin_type.category {
        PinCategory::Text => Ok("_FText"),
        PinCategory::Struct => {
            let exported = array
                .pin_type
                .sub_category_object
                .as_deref()
                .and_then(|s| ir.reflection.struct_desc(s))
                .is_some_and(|s| s.is_native && !s.no_export);
            Ok(if exported { "_Struct" } else { "" })
        }
        _ => Ok(""),
    }
}

/// Text of a call; `inline` calls are expressions without a result assignment or semicolon
pub fn call_statement_inner(
    ctx: &mut EmitterContext,
    id: StatementId,
    inline: bool,
    postfix: &str,
) -> Result<String> {
    let ir = ctx.ir();
    let reflection = &ir.reflection;
    let statement = ctx.statement(id)?;
    let callee_id = callee_of(id, statement)?;
    let callee = ctx.function(callee_id)?;

    let context = match statement.function_context {
        Some(term) => Some((term, ctx.terminal(term)?)),
        None => None,
    };
    let on_different_object = context.is_some_and(|(_, c)| !c.is_self());
    let is_static = callee.flags.is_static;
    let any_interface_call = on_different_object
        && (statement.is_interface_context
            || context.is_some_and(|(_, c)| c.pin_type.category == PinCategory::Interface));
    let interface_execute =
        any_interface_call && (callee.flags.event || callee.flags.blueprint_event);
    let native_event = callee.is_native_event();
    let net_rpc = !any_interface_call && callee.is_net_rpc();

    let parent_function = if statement.is_parent_context {
        ir.super_class()
            .and_then(|s| reflection.find_function_by_name(s, &callee.name))
    } else {
        None
    };
    if let Some(parent) = parent_function {
        let parent = ctx.function(parent)?;
        if !parent.flags.native && !parent.flags.has_script {
            ctx.logger().warn(&format!(
                "{} has no body in {} and cannot be called from generated code",
                callee.name, parent.owner
            ));
            return Ok(
                "/*This function cannot be called from BP. See bIsValidFunction in UObject::CallFunction*/"
                    .to_string(),
            );
        }
    }
    let named_function = match parent_function {
        Some(parent) if !native_event && !net_rpc => parent,
        _ => reflection.original_function(callee_id),
    };
    let function_name = names::function_name(reflection, named_function)? + postfix;

    // Native callees may append to output arrays without clearing them first
    if callee.flags.native {
        for (index, (_, param)) in reflection.params(callee_id).into_iter().enumerate() {
            let flags = param.flags;
            if param.pin_type.is_array()
                && flags.out_parm
                && !flags.reference_parm
                && !flags.const_parm
            {
                let term = ctx.rhs(id, statement, index)?;
                let array = term_to_text(ctx, term, TermUsage::UnspecifiedOrReference, true)?;
                ctx.add_line(format!("({array}).Reset();"));
            }
        }
    }

    let mut result = String::new();
    let mut close_cast = String::new();
    let mut setter = None;
    if !inline
        && let Some((_, return_property)) = reflection.return_property(callee_id)
        && let Some(lhs) = statement.lhs
    {
        let expression = SetterExpression::new(ctx, lhs)?;
        result.push_str(&expression.build_start());
        let lhs_term = ctx.terminal(lhs)?;
        if let Some((begin, end)) = generate_automatic_cast(
            ir,
            &lhs_term.pin_type,
            &property_pin_type(return_property),
            associated_property(ctx, lhs_term)?,
            Some(return_property),
            false,
        ) {
            result.push_str(&begin);
            close_cast = end;
        }
        setter = Some(expression);
    }

    let owner = reflection.class(&callee.owner);
    if interface_execute && let Some((context_term, context)) = context {
        let context_class = native_types::pin_class(ir, &context.pin_type);
        let input_is_interface = context_class.is_some_and(|c| c.is_interface);
        let interface = if input_is_interface { context_class } else { owner };
        let interface = interface.ok_or_else(|| EmitError::UnknownType {
            kind: "interface",
            name: callee.owner.clone(),
        })?;
        let mut object = term_to_text(ctx, context_term, TermUsage::Getter, false)?;
        if input_is_interface {
            object.push_str(".GetObject()");
        }
        result.push_str(&format!(
            "{}::Execute_{function_name}({object} ",
            names::class_name(interface, false)
        ));
    } else {
        let unconverted = owner.filter(|c| !c.is_native && !c.is_converted);
        let custom_thunk = callee.is_custom_thunk();

        if let Some(owner) = unconverted {
            let object = match context {
                Some((term, _)) if on_different_object => {
                    term_to_text(ctx, term, TermUsage::UnspecifiedOrReference, false)?
                }
                _ => "this".to_string(),
            };
            result.push_str(&format!(
                "FUnconvertedWrapper__{}({object}).",
                names::class_name(owner, false)
            ));
        } else if is_static {
            if custom_thunk {
                result.push_str("FCustomThunkTemplates::");
            } else {
                result.push_str(&names::class_name_of(reflection, &callee.owner)?);
                result.push_str("::");
            }
        } else if on_different_object && let Some((term, _)) = context {
            let object = term_to_text(ctx, term, TermUsage::Getter, false)?;
            result.push_str(&format!("{object}->"));
        }

        if statement.is_parent_context {
            result.push_str("Super::");
        } else if unconverted.is_none()
            && !is_static
            && callee.flags.is_final
            && let Some(owner) = owner.filter(|c| c.is_native)
        {
            result.push_str(&format!("{}::", names::class_name(owner, false)));
        }
        result.push_str(&function_name);

        if custom_thunk {
            result.push_str(custom_thunk_postfix(ctx, id, statement, callee_id)?);
        }
        if (statement.is_parent_context || statement.is_interface_context)
            && (native_event || net_rpc)
        {
            result.push_str("_Implementation");
        }
        result.push('(');
    }

    let parameters = method_input_parameter_list(ctx, id)?;
    if interface_execute && !parameters.is_empty() {
        result.push_str(", ");
    }
    result.push_str(&parameters);
    result.push(')');
    result.push_str(&close_cast);
    if let Some(setter) = setter {
        result.push_str(&setter.build_end(false));
    }
    if !inline {
        result.push(';');
    }
    Ok(result)
}

fn emit_call_delegate(
    ctx: &mut EmitterContext,
    id: StatementId,
    statement: &Statement,
) -> Result<()> {
    let delegate = statement
        .function_context
        .ok_or(EmitError::MissingCallee(id))?;
    let delegate_term = ctx.terminal(delegate)?;
    if delegate_term.associated_property.is_none() {
        return Err(EmitError::MissingProperty(delegate));
    }

    with_safe_context(ctx, delegate_term.context, |ctx| {
        let target = term_to_text(ctx, delegate, TermUsage::Getter, false)?;
        let parameters = method_input_parameter_list(ctx, id)?;
        ctx.add_line(format!("{target}.Broadcast({parameters});"));
        Ok(())
    })
}

fn emit_assignment(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    let lhs = ctx.lhs(id, statement)?;
    let rhs = ctx.rhs(id, statement, 0)?;
    let source = term_to_text(ctx, rhs, TermUsage::Getter, true)?;
    let setter = SetterExpression::new(ctx, lhs)?;
    let guard = ctx.terminal(lhs)?.context;

    with_safe_context(ctx, guard, |ctx| {
        let value = with_cast(operand_cast(ctx, lhs, rhs)?, source);
        ctx.add_line(setter.build_full(&value));
        Ok(())
    })
}

/// Fills an interface value from an object, or clears it when the check fails
fn emit_interface_fill(
    ctx: &mut EmitterContext,
    condition: &str,
    interface: &str,
    object: &str,
    class: &str,
) {
    ctx.add_line(condition);
    ctx.add_line("{");
    ctx.add_line(format!("\t{interface}.SetObject({object});"));
    ctx.add_line(format!("\tvoid* IAddress = {object}->GetInterfaceAddress({class});"));
    ctx.add_line(format!("\t{interface}.SetInterface(IAddress);"));
    ctx.add_line("}");
    ctx.add_line("else");
    ctx.add_line("{");
    ctx.add_line(format!("\t{interface}.SetObject(nullptr);"));
    ctx.add_line("}");
}

fn emit_cast_obj_to_interface(
    ctx: &mut EmitterContext,
    id: StatementId,
    statement: &Statement,
) -> Result<()> {
    let class = operand(ctx, id, statement, 0)?;
    let object = operand(ctx, id, statement, 1)?;
    let lhs = ctx.lhs(id, statement)?;
    let interface = term_to_text(ctx, lhs, TermUsage::UnspecifiedOrReference, true)?;

    // `this` is never null and a null check on it upsets strict compilers
    let condition = if object == "this" {
        format!("if ( this->GetClass()->ImplementsInterface({class}) )")
    } else {
        format!("if ( {object} && {object}->GetClass()->ImplementsInterface({class}) )")
    };
    emit_interface_fill(ctx, &condition, &interface, &object, &class);
    Ok(())
}

fn emit_cast_between_interfaces(
    ctx: &mut EmitterContext,
    id: StatementId,
    statement: &Statement,
) -> Result<()> {
    let class = operand(ctx, id, statement, 0)?;
    let input = operand(ctx, id, statement, 1)?;
    let lhs = ctx.lhs(id, statement)?;
    let interface = term_to_text(ctx, lhs, TermUsage::UnspecifiedOrReference, true)?;

    let object = format!("{input}.GetObjectRef()");
    let condition = format!("if ( {object} && {object}->GetClass()->IsChildOf({class}) )");
    emit_interface_fill(ctx, &condition, &interface, &object, &class);
    Ok(())
}

/// `Cast<T>(object)`, or a reflective cast when the target class is not emitted as native code
fn generate_cast_rhs(ctx: &mut EmitterContext, class_term: TerminalId, object: &str) -> Result<String> {
    let ir = ctx.ir();
    let terminal = ctx.terminal(class_term)?;
    let class_name = terminal
        .object_literal
        .as_deref()
        .ok_or(EmitError::NotAClassLiteral(class_term))?;
    let unknown = || EmitError::UnknownType {
        kind: "class",
        name: class_name.to_string(),
    };
    let class = ir.reflection.class(class_name).ok_or_else(unknown)?;

    if !class.is_native && !class.is_converted {
        let native = ir
            .reflection
            .first_native_or_converted_class(class_name)
            .ok_or_else(unknown)?;
        let target = native_types::literal_term(
            ctx,
            &PinType::new(PinCategory::Class),
            "",
            Some(class_name),
            None,
        )?;
        Ok(format!(
            "NoNativeCast<{}>({target}, {object})",
            names::class_name(native, false)
        ))
    } else {
        Ok(format!("Cast<{}>({object})", names::class_name(class, false)))
    }
}

fn emit_dynamic_cast(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    let class_term = ctx.rhs(id, statement, 0)?;
    let mut object = operand(ctx, id, statement, 1)?;
    if statement.kind == StatementKind::CastInterfaceToObj {
        object.push_str(".GetObjectRef()");
    }
    let lhs = ctx.lhs(id, statement)?;
    let setter = SetterExpression::new(ctx, lhs)?;
    let guard = ctx.terminal(lhs)?.context;

    with_safe_context(ctx, guard, |ctx| {
        let cast = generate_cast_rhs(ctx, class_term, &object)?;
        ctx.add_line(setter.build_full(&cast));
        Ok(())
    })
}

fn emit_class_check(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    let value = if statement.kind == StatementKind::MetaCast {
        let desired = operand(ctx, id, statement, 0)?;
        let source = operand(ctx, id, statement, 1)?;
        format!("DynamicMetaCast({desired}, {source})")
    } else {
        let object = operand(ctx, id, statement, 0)?;
        format!("({object} != nullptr)")
    };
    let lhs = ctx.lhs(id, statement)?;
    let setter = SetterExpression::new(ctx, lhs)?;
    let guard = ctx.terminal(lhs)?.context;

    with_safe_context(ctx, guard, |ctx| {
        ctx.add_line(setter.build_full(&value));
        Ok(())
    })
}

fn emit_delegate(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    let lhs = ctx.lhs(id, statement)?;
    let lhs_term = ctx.terminal(lhs)?;
    if lhs_term.associated_property.is_none() {
        return Err(EmitError::MissingProperty(lhs));
    }

    with_safe_context(ctx, lhs_term.context, |ctx| {
        let delegate = term_to_text(ctx, lhs, TermUsage::UnspecifiedOrReference, false)?;
        let line = match statement.kind {
            StatementKind::AddDelegate => {
                format!("{delegate}.AddUnique({});", operand(ctx, id, statement, 0)?)
            }
            StatementKind::RemoveDelegate => {
                format!("{delegate}.Remove({});", operand(ctx, id, statement, 0)?)
            }
            StatementKind::BindDelegate => {
                let name = operand(ctx, id, statement, 0)?;
                let object = operand(ctx, id, statement, 1)?;
                format!("{delegate}.BindUFunction({object},{name});")
            }
            _ => format!("{delegate}.Clear();"),
        };
        ctx.add_line(line);
        Ok(())
    })
}

fn emit_container(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    let lhs = ctx.lhs(id, statement)?;
    let container = term_to_text(ctx, lhs, TermUsage::UnspecifiedOrReference, true)?;
    let count = statement.rhs.len();

    match statement.kind {
        StatementKind::CreateArray => {
            ctx.add_line(format!("{container}.SetNum({count}, true);"));
            for (index, element) in statement.rhs.iter().enumerate() {
                let value = term_to_text(ctx, *element, TermUsage::Getter, true)?;
                ctx.add_line(format!("{container}[{index}] = {value};"));
            }
        }
        StatementKind::CreateSet => {
            ctx.add_line(format!("{container}.Reserve({count});"));
            for element in &statement.rhs {
                let value = term_to_text(ctx, *element, TermUsage::Getter, true)?;
                ctx.add_line(format!("{container}.Add( {value} );"));
            }
        }
        _ => {
            if count % 2 != 0 {
                return Err(EmitError::MissingRhs {
                    statement: id,
                    expected: count + 1,
                    found: count,
                });
            }
            ctx.add_line(format!("{container}.Reserve({});", count / 2));
            for pair in statement.rhs.chunks(2) {
                let key = term_to_text(ctx, pair[0], TermUsage::Getter, true)?;
                let value = term_to_text(ctx, pair[1], TermUsage::Getter, true)?;
                ctx.add_line(format!("{container}.Add( {key}, {value} );"));
            }
        }
    }
    Ok(())
}

fn target_state(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<i32> {
    let target = statement.target_label.ok_or(EmitError::MissingTarget(id))?;
    Ok(ctx.state_index(target))
}

/// Line ending the current thread of execution
fn end_of_thread_line(ctx: &EmitterContext, kind: &str) -> String {
    if ctx.use_flow_stack {
        POP_STATE.to_string()
    } else if ctx.use_goto_state {
        "__CurrentState = -1;".to_string()
    } else {
        format!("return; // {kind}")
    }
}

fn emit_end_of_thread(ctx: &mut EmitterContext) {
    let line = end_of_thread_line(ctx, "KCST_EndOfThread");
    ctx.add_line(line);
    if ctx.use_goto_state || ctx.use_flow_stack {
        ctx.add_line("break;");
    }
}

fn emit_push_state(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    if !ctx.use_flow_stack {
        return Err(EmitError::GotoWithoutDispatch(id, statement.kind));
    }
    let state = target_state(ctx, id, statement)?;
    ctx.add_line(format!("__StateStack.Push({state});"));
    Ok(())
}

fn emit_computed_goto(ctx: &mut EmitterContext, id: StatementId, statement: &Statement) -> Result<()> {
    if !ctx.use_goto_state {
        return Ok(());
    }
    let lhs = ctx.lhs(id, statement)?;
    let next_state = term_to_text(ctx, lhs, TermUsage::Getter, true)?;
    ctx.add_line(format!("__CurrentState = {next_state};"));
    ctx.add_line("break;");
    Ok(())
}

fn emit_conditional_goto(
    ctx: &mut EmitterContext,
    id: StatementId,
    statement: &Statement,
) -> Result<()> {
    let lhs = ctx.lhs(id, statement)?;
    let condition = term_to_text(ctx, lhs, TermUsage::Getter, true)?;
    let jump = match statement.kind {
        StatementKind::EndOfThreadIfNot => end_of_thread_line(ctx, "KCST_EndOfThreadIfNot"),
        StatementKind::GotoReturnIfNot if ctx.use_goto_state => "__CurrentState = -1;".to_string(),
        StatementKind::GotoReturnIfNot => "return; // KCST_GotoReturnIfNot".to_string(),
        _ if ctx.use_goto_state => format!("__CurrentState = {};", target_state(ctx, id, statement)?),
        kind => return Err(EmitError::GotoWithoutDispatch(id, kind)),
    };

    ctx.add_line(format!("if (!{condition})"));
    ctx.add_line("{");
    ctx.increase_indent();
    ctx.add_line(jump);
    if ctx.use_goto_state {
        ctx.add_line("break;");
    }
    ctx.decrease_indent();
    ctx.add_line("}");
    Ok(())
}

/// `TSwitchValue<Index, Value>(index, default, count, TSwitchPair<Index, Value>(i, v)...)`
pub fn switch_value_inner(ctx: &mut EmitterContext, id: StatementId) -> Result<String> {
    let ir = ctx.ir();
    let statement = ctx.statement(id)?;
    let [index_term, .., default_term] = statement.rhs[..] else {
        return Err(EmitError::MissingRhs {
            statement: id,
            expected: 2,
            found: statement.rhs.len(),
        });
    };
    // Index and default around index/value pairs
    if statement.rhs.len() % 2 != 0 {
        return Err(EmitError::MissingRhs {
            statement: id,
            expected: statement.rhs.len() + 1,
            found: statement.rhs.len(),
        });
    }
    let case_count = (statement.rhs.len() - 2) / 2;

    let index_terminal = ctx.terminal(index_term)?;
    let default_terminal = ctx.terminal(default_term)?;
    let default_property = associated_property(ctx, default_terminal)?;
    let index_type = match associated_property(ctx, index_terminal)? {
        Some(property) => property_type(ir, property)?,
        None => pin_type_to_native_type(ir, &index_terminal.pin_type)?,
    };
    let value_type = match default_property {
        Some(property) => property_type(ir, property)?,
        None => pin_type_to_native_type(ir, &default_terminal.pin_type)?,
    };
    let value_pin = default_property
        .map(property_pin_type)
        .unwrap_or_else(|| default_terminal.pin_type.clone());

    let index = term_to_text(ctx, index_term, TermUsage::UnspecifiedOrReference, true)?;
    let default = term_to_text(ctx, default_term, TermUsage::UnspecifiedOrReference, true)?;
    let mut result =
        format!("TSwitchValue<{index_type}, {value_type}>({index}, {default}, {case_count}");

    for case in 0..case_count {
        let case_index = statement.rhs[1 + 2 * case];
        let case_value = statement.rhs[2 + 2 * case];
        let case_index = term_to_text(ctx, case_index, TermUsage::UnspecifiedOrReference, true)?;
        let case_value = switch_case_value(ctx, case_value, &value_pin, default_property, &value_type)?;
        result.push_str(&format!(
            ", TSwitchPair<{index_type}, {value_type}>({case_index}, {case_value})"
        ));
    }
    result.push(')');
    Ok(result)
}

/// Case values are bound by reference; literals of another type get a local to bind to
fn switch_case_value(
    ctx: &mut EmitterContext,
    term: TerminalId,
    value_pin: &PinType,
    value_property: Option<&PropertyDesc>,
    value_type: &str,
) -> Result<String> {
    let terminal = ctx.terminal(term)?;
    let r = &terminal.pin_type;
    let hoist = terminal.is_literal
        && (r.category != value_pin.category
            || r.sub_category_object != value_pin.sub_category_object
            || r.container != value_pin.container);

    let cast = generate_automatic_cast(
        ctx.ir(),
        value_pin,
        r,
        value_property,
        associated_property(ctx, terminal)?,
        !hoist,
    );
    let value = with_cast(
        cast,
        term_to_text(ctx, term, TermUsage::UnspecifiedOrReference, true)?,
    );
    if !hoist {
        return Ok(value);
    }

    let local = ctx.generate_unique_local_name();
    ctx.add_line(format!("{value_type} {local} = {value};"));
    Ok(local)
}

/// `array[index]`, only used inline
pub fn array_get_by_ref(ctx: &mut EmitterContext, id: StatementId) -> Result<String> {
    let statement = ctx.statement(id)?;
    if statement.rhs.len() != 2 {
        return Err(EmitError::MissingRhs {
            statement: id,
            expected: 2,
            found: statement.rhs.len(),
        });
    }
    let array = term_to_text(ctx, statement.rhs[0], TermUsage::UnspecifiedOrReference, true)?;
    let index = term_to_text(ctx, statement.rhs[1], TermUsage::Getter, true)?;
    Ok(format!("{array}[{index}]"))
}
