//! Rendering of terminals as C++ expressions

use compiled_ir::{PropertyDesc, StatementId, StatementKind, TerminalId};

use super::context::EmitterContext;
use super::error::{EmitError, Result};
use super::names;
use super::native_types::{self, pin_type_to_native_type, property_type};
use super::statement;

/// How a rendered term is going to be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermUsage {
    Getter,
    Setter,
    UnspecifiedOrReference,
}

/// Renders `term` for reading or passing by reference
///
/// With `safe_context` the expression falls back to a default value when any object in the
/// term's context chain is invalid.
pub fn term_to_text(
    ctx: &mut EmitterContext,
    term: TerminalId,
    usage: TermUsage,
    safe_context: bool,
) -> Result<String> {
    debug_assert!(usage != TermUsage::Setter);
    term_text(ctx, term, usage, safe_context, None)
}

/// Assignment target split around the assigned value
#[derive(Debug, Clone)]
pub struct SetterExpression {
    pub destination: String,
    /// Closing text for setters that are function calls rather than lvalues
    pub end: String,
}

impl SetterExpression {
    pub fn new(ctx: &mut EmitterContext, lhs: TerminalId) -> Result<Self> {
        let mut end = String::new();
        let destination = term_text(ctx, lhs, TermUsage::Setter, false, Some(&mut end))?;
        Ok(Self { destination, end })
    }

    pub fn build_start(&self) -> String {
        if self.end.is_empty() {
            format!("{} = ", self.destination)
        } else {
            self.destination.clone()
        }
    }

    pub fn build_end(&self, add_semicolon: bool) -> String {
        if add_semicolon {
            format!("{};", self.end)
        } else {
            self.end.clone()
        }
    }

    pub fn build_full(&self, value: &str) -> String {
        format!("{}{}{}", self.build_start(), value, self.build_end(true))
    }
}

/// `IsValid(a) && IsValid(b)` over every object in the context chain starting at `term`,
/// outermost first
pub fn validation_chain(ctx: &mut EmitterContext, term: Option<TerminalId>) -> Result<String> {
    let mut conditions = vec![];
    let mut current = term;
    while let Some(id) = current {
        let link = ctx.terminal(id)?;
        if !link.pin_type.is_struct_context() && !link.pin_type.is_self() {
            conditions.push(term_to_text(ctx, id, TermUsage::Getter, false)?);
        }
        current = link.context;
    }
    Ok(conditions
        .iter()
        .rev()
        .map(|c| format!("IsValid({c})"))
        .collect::<Vec<_>>()
        .join(" && "))
}

/// Runs `emit` inside `if(<validation chain>) { ... }` when the chain is not empty
pub fn with_safe_context<'a, T>(
    ctx: &mut EmitterContext<'a>,
    term: Option<TerminalId>,
    emit: impl FnOnce(&mut EmitterContext<'a>) -> Result<T>,
) -> Result<T> {
    let condition = validation_chain(ctx, term)?;
    if condition.is_empty() {
        return emit(ctx);
    }

    ctx.add_line(format!("if({condition})"));
    ctx.add_line("{");
    ctx.increase_indent();
    let result = emit(ctx);
    ctx.decrease_indent();
    ctx.add_line("}");
    result
}

/// Declares a local initialized to the default value of `term`'s type
fn default_local(ctx: &mut EmitterContext, term: TerminalId) -> Result<String> {
    let ir = ctx.ir();
    let terminal = ctx.terminal(term)?;
    let local = ctx.generate_unique_local_name();
    let cpp_type = match terminal.associated_property {
        Some(property) => property_type(ir, ctx.property(property)?)?,
        None => pin_type_to_native_type(ir, &terminal.pin_type)?,
    };
    let constructor = if terminal.pin_type.is_container() {
        format!("{cpp_type}{{}}")
    } else {
        native_types::literal_term(ctx, &terminal.pin_type, "", None, Some(""))?
    };
    ctx.add_line(format!("{cpp_type} {local} = {constructor};"));
    Ok(local)
}

fn inline_statement(ctx: &mut EmitterContext, inline: StatementId) -> Result<String> {
    let statement = ctx.statement(inline)?;
    match statement.kind {
        StatementKind::SwitchValue => statement::switch_value_inner(ctx, inline),
        StatementKind::Call => statement::call_statement_inner(ctx, inline, true, ""),
        StatementKind::ArrayGetByRef => statement::array_get_by_ref(ctx, inline),
        kind => Err(EmitError::InvalidInline(inline, kind)),
    }
}

/// Whether the generated class may name `property` through `.` or `->`
fn is_accessible(
    ctx: &EmitterContext,
    property: &PropertyDesc,
    self_context: bool,
    usage: TermUsage,
) -> bool {
    let reflection = &ctx.ir().reflection;
    let getter = usage == TermUsage::Getter;
    let flags = property.flags;
    let mut accessible = getter || !flags.native_const;

    let of_parent = match &property.owner {
        compiled_ir::PropertyOwner::Class(owner) => reflection.is_child_of(&ctx.ir().name, owner),
        _ => false,
    };
    accessible &= !flags.private_access && ((of_parent && self_context) || !flags.protected_access);
    accessible
}

fn term_text(
    ctx: &mut EmitterContext,
    term: TerminalId,
    usage: TermUsage,
    safe_context: bool,
    setter_end: Option<&mut String>,
) -> Result<String> {
    let ir = ctx.ir();
    let terminal = ctx.terminal(term)?;

    if terminal.is_literal {
        return native_types::literal_term(
            ctx,
            &terminal.pin_type,
            &terminal.name,
            terminal.object_literal.as_deref(),
            terminal.text_literal.as_deref(),
        );
    }
    if let Some(inline) = terminal.inline_generated {
        return inline_statement(ctx, inline);
    }

    let Some(property_id) = terminal.associated_property else {
        if terminal.is_self() && terminal.context.is_none() {
            return Ok("this".to_string());
        }
        return Err(EmitError::MissingProperty(term));
    };
    let property = ctx.property(property_id)?;

    if property.flags.editor_only {
        let cpp_name = names::property_name(&ir.reflection, property);
        ctx.logger().warn(&format!(
            "generated code cannot use editor-only property {}",
            property.name
        ));
        ctx.add_line(format!("// EDITOR-ONLY Variable: {cpp_name}"));
        return default_local(ctx, term);
    }

    let getter = usage == TermUsage::Getter;
    let context = match terminal.context {
        Some(id) => Some((id, ctx.terminal(id)?)),
        None => None,
    };
    let self_context = context.is_none_or(|(_, c)| c.is_self());

    let mut context_text = String::new();
    if let Some((context_id, context_term)) = context
        && !context_term.is_self()
    {
        let from_default_object = context_term.pin_type.is_class_context();
        let mut wrapped = false;
        if from_default_object {
            let owner = ir
                .reflection
                .property_owner_class(property_id)
                .or(context_term.pin_type.sub_category_object.as_deref())
                .and_then(|c| ir.reflection.first_native_or_converted_class(c));
            match owner {
                Some(class) => {
                    context_text.push_str(&format!(
                        "GetDefaultValueSafe<{}>(",
                        names::class_name(class, false)
                    ));
                    wrapped = true;
                }
                None => ctx
                    .logger()
                    .warn("cannot find the class of a default object context"),
            }
        }
        context_text.push_str(&term_to_text(
            ctx,
            context_id,
            TermUsage::UnspecifiedOrReference,
            false,
        )?);
        if wrapped {
            context_text.push(')');
        }
    }

    let flags = property.flags;
    let mut accessible = is_accessible(ctx, property, self_context, usage);
    let mut result;
    if let Some((_, context_term)) = context
        && context_term.pin_type.is_struct_context()
    {
        accessible = (getter || !flags.native_const)
            && !flags.private_access
            && !flags.protected_access;
        result = if accessible {
            format!(
                "{context_text}.{}",
                names::property_name(&ir.reflection, property)
            )
        } else {
            native_types::access_inaccessible_property(
                ctx,
                property_id,
                &context_text,
                "&",
                usage,
                setter_end,
            )?
        };
    } else {
        let owner_class = ir
            .reflection
            .property_owner_class(property_id)
            .and_then(|c| ir.reflection.class(c));
        let unconverted_owner = owner_class.filter(|c| !c.is_native && !c.is_converted);

        if self_context {
            context_text = "this".to_string();
        }
        if let Some(owner) = unconverted_owner {
            result = format!(
                "FUnconvertedWrapper__{}({context_text}).GetRef__{}()",
                names::class_name(owner, false),
                names::cpp_identifier(&property.name, false, "")
            );
        } else if !accessible {
            result = native_types::access_inaccessible_property(
                ctx,
                property_id,
                &context_text,
                "",
                usage,
                setter_end,
            )?;
        } else {
            result = if self_context {
                String::new()
            } else {
                format!("{context_text}->")
            };
            result.push_str(&names::property_name(&ir.reflection, property));
            if getter && flags.bitfield {
                result = format!("({result} != 0)");
            }
        }
    }

    let weak_getter = terminal.pin_type.is_weak_pointer && getter;
    if weak_getter {
        result.push_str(".Get()");
    }

    if terminal.pin_type.is_array() && flags.native_const_template_arg && accessible && getter {
        let element = pin_type_to_native_type(ir, &terminal.pin_type.element())?;
        result = format!("TArrayCaster<const {element}>({result}).Get<{element}>()");
    } else if (flags.native_const || flags.native_const_template_arg) && accessible && getter {
        let cpp_type = pin_type_to_native_type(ir, &terminal.pin_type)?;
        result = format!("const_cast<{cpp_type}>({result})");
    }

    if safe_context {
        let conditions = validation_chain(ctx, terminal.context)?;
        if !conditions.is_empty() {
            let mut default = default_local(ctx, term)?;
            if weak_getter {
                default.push_str(".Get()");
            }
            return Ok(format!("(({conditions}) ? ({result}) : ({default}))"));
        }
    }
    Ok(result)
}

/// Latent action info argument resuming the ubergraph at `target`
pub fn latent_function_info_term_to_text(
    ctx: &mut EmitterContext,
    term: TerminalId,
    target: StatementId,
) -> Result<String> {
    let terminal = ctx.terminal(term)?;
    if !terminal.name.contains("Linkage") {
        return Err(EmitError::LatentLinkage(terminal.name.clone()));
    }

    let state = ctx.ubergraph_state_index(target);
    let mut values = terminal.name.replace("-1", &state.to_string());
    if let Some(group) = ctx.class.ubergraph_group_of(target) {
        let old_name = format!("ExecuteUbergraph_{}", ctx.class.blueprint_name());
        let new_name = format!("{old_name}_{group}");
        values = values.replace(&old_name, &new_name);
    }
    native_types::literal_term(ctx, &terminal.pin_type, &values, None, None)
}
