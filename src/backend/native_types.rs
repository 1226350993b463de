//! Native type names, literal values and implicit conversions

use compiled_ir::{
    ClassDesc, CompiledClass, ContainerType, PinCategory, PinType, PropertyDesc, PropertyId,
    PropertyOwner,
};

use super::context::EmitterContext;
use super::error::{EmitError, Result};
use super::names;
use super::term::TermUsage;

const LATENT_ACTION_INFO: &str = "LatentActionInfo";

fn unknown(kind: &'static str, name: impl Into<String>) -> EmitError {
    EmitError::UnknownType {
        kind,
        name: name.into(),
    }
}

/// Escapes text for a C++ string literal
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Class a pin refers to, the generated class itself for `self` pins
pub fn pin_class<'a>(ir: &'a CompiledClass, pin: &PinType) -> Option<&'a ClassDesc> {
    match pin.sub_category_object.as_deref() {
        Some(name) => ir.reflection.class(name),
        None if pin.is_self() => ir.class_desc(),
        None => None,
    }
}

/// Nearest class of `pin`'s class that generated code can name directly
pub fn native_class_of<'a>(ir: &'a CompiledClass, pin: &PinType) -> Option<&'a ClassDesc> {
    let class = pin_class(ir, pin)?;
    ir.reflection.first_native_or_converted_class(&class.name)
}

fn native_class_name(ir: &CompiledClass, pin: &PinType) -> Result<String> {
    let class = native_class_of(ir, pin)
        .ok_or_else(|| unknown("class", pin.sub_category_object.clone().unwrap_or_default()))?;
    Ok(names::class_name(class, false))
}

fn enum_type_name(ir: &CompiledClass, pin: &PinType) -> Option<(String, bool)> {
    let desc = ir.reflection.enum_desc(pin.sub_category_object.as_deref()?)?;
    let name = desc
        .cpp_type
        .clone()
        .unwrap_or_else(|| names::enum_name(desc));
    Some((name, desc.enum_class || desc.user_defined))
}

fn element_native_type(ir: &CompiledClass, pin: &PinType) -> Result<String> {
    let object = || pin.sub_category_object.clone().unwrap_or_default();
    Ok(match pin.category {
        PinCategory::String => "FString".to_string(),
        PinCategory::Boolean => "bool".to_string(),
        PinCategory::Byte | PinCategory::Enum => match enum_type_name(ir, pin) {
            Some((name, true)) => name,
            Some((name, false)) => format!("TEnumAsByte<{name}>"),
            None => "uint8".to_string(),
        },
        PinCategory::Int => "int32".to_string(),
        PinCategory::Float => "float".to_string(),
        PinCategory::Name => "FName".to_string(),
        PinCategory::Text => "FText".to_string(),
        PinCategory::Struct => names::struct_name_of(&ir.reflection, &object())?,
        PinCategory::Class => format!("TSubclassOf<{}>", native_class_name(ir, pin)?),
        PinCategory::SoftClass => format!("TSoftClassPtr<{}>", native_class_name(ir, pin)?),
        PinCategory::Interface => {
            let class = pin_class(ir, pin).ok_or_else(|| unknown("interface", object()))?;
            format!("TScriptInterface<{}>", names::class_name(class, false))
        }
        PinCategory::SoftObject => format!("TSoftObjectPtr<{}>", native_class_name(ir, pin)?),
        PinCategory::Object => format!("{}*", native_class_name(ir, pin)?),
        PinCategory::Delegate => "FScriptDelegate".to_string(),
        PinCategory::MulticastDelegate => "FMulticastScriptDelegate".to_string(),
        PinCategory::Wildcard | PinCategory::Exec => {
            return Err(unknown("pin type", format!("{:?}", pin.category)));
        }
    })
}

fn wrap_container(ir: &CompiledClass, pin: &PinType, element: String) -> Result<String> {
    Ok(match pin.container {
        ContainerType::None => element,
        ContainerType::Array => format!("TArray<{element}>"),
        ContainerType::Set => format!("TSet<{element}>"),
        ContainerType::Map => {
            let value = pin
                .value_type
                .as_deref()
                .ok_or_else(|| unknown("map value", element.clone()))?;
            let value = element_native_type(ir, value)?;
            format!("TMap<{element}, {value}>")
        }
    })
}

pub fn pin_type_to_native_type(ir: &CompiledClass, pin: &PinType) -> Result<String> {
    let element = element_native_type(ir, pin)?;
    wrap_container(ir, pin, element)
}

/// Type a property is declared with, honoring weak pointers and `TSubclassOf` wrappers
pub fn property_type(ir: &CompiledClass, desc: &PropertyDesc) -> Result<String> {
    let pin = &desc.pin_type;
    let element = match pin.category {
        PinCategory::Object if pin.is_weak_pointer => {
            format!("TWeakObjectPtr<{}>", native_class_name(ir, pin)?)
        }
        PinCategory::Class if !desc.flags.uobject_wrapper => "UClass*".to_string(),
        _ => element_native_type(ir, pin)?,
    };
    wrap_container(ir, pin, element)
}

/// Pin type of a property as seen by a call site
pub fn property_pin_type(desc: &PropertyDesc) -> PinType {
    let mut pin = desc.pin_type.clone();
    pin.is_reference |= desc.flags.reference_parm;
    pin.is_const |= desc.flags.const_parm;
    pin
}

pub fn float_to_string(ctx: &EmitterContext, value: f32) -> String {
    if value.is_nan() {
        ctx.logger()
            .warn("A NotANumber value cannot be nativized. It is changed into 0.0f.");
        return "/*The original value was NaN!*/ 0.0f".to_string();
    }
    format!("{value:.6}")
}

/// Longest parsable prefix of `text`, ignoring trailing garbage like `atof` does
fn parse_prefix<T: std::str::FromStr + Default>(text: &str) -> T {
    let text = text.trim();
    (1..=text.len())
        .rev()
        .filter(|end| text.is_char_boundary(*end))
        .find_map(|end| text[..end].parse::<T>().ok())
        .unwrap_or_default()
}

fn parse_float(text: &str) -> f32 {
    parse_prefix(text)
}

fn parse_int(text: &str) -> i32 {
    parse_prefix(text)
}

fn parse_bool(text: &str) -> bool {
    let text = text.trim();
    ["true", "yes", "on"]
        .iter()
        .any(|t| text.eq_ignore_ascii_case(t))
        || parse_int(text) != 0
}

/// Splits `(A=1,B=(C=2))` into its top level `Key=Value` pairs
pub fn parse_struct_fields(text: &str) -> Vec<(String, String)> {
    let text = text.trim();
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text);

    let mut fields = vec![];
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    let mut push = |part: &str| {
        if let Some((key, value)) = part.split_once('=') {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    };
    for (i, c) in inner.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&inner[start..]);
    fields
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn field_floats<const N: usize>(text: &str, keys: [&str; N], defaults: [f32; N]) -> [f32; N] {
    let fields = parse_struct_fields(text);
    let mut values = defaults;
    for (key, value) in fields {
        if let Some(i) = keys.iter().position(|k| k.eq_ignore_ascii_case(&key)) {
            values[i] = parse_float(&value);
        }
    }
    values
}

fn comma_floats<const N: usize>(text: &str) -> [f32; N] {
    let mut values = [0.0; N];
    for (slot, part) in values.iter_mut().zip(text.split(',')) {
        *slot = parse_float(part);
    }
    values
}

/// Quaternion of a pitch/yaw/roll rotation in degrees
fn rotator_to_quat(pitch: f32, yaw: f32, roll: f32) -> [f32; 4] {
    let half = std::f32::consts::PI / 360.0;
    let (sp, cp) = (pitch * half).sin_cos();
    let (sy, cy) = (yaw * half).sin_cos();
    let (sr, cr) = (roll * half).sin_cos();
    [
        cr * sp * sy - sr * cp * cy,
        -cr * sp * cy - sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
        cr * cp * cy + sr * sp * sy,
    ]
}

fn floats(ctx: &EmitterContext, values: &[f32]) -> String {
    values
        .iter()
        .map(|v| float_to_string(ctx, *v))
        .collect::<Vec<_>>()
        .join(",")
}

fn transform_literal(ctx: &EmitterContext, value: &str) -> String {
    let parts: Vec<&str> = value.split('|').collect();
    let (rotation, translation, scale) = if parts.len() == 3 {
        let [pitch, yaw, roll] = comma_floats::<3>(parts[1]);
        (
            rotator_to_quat(pitch, yaw, roll),
            comma_floats::<3>(parts[0]),
            comma_floats::<3>(parts[2]),
        )
    } else {
        ([0.0, 0.0, 0.0, 1.0], [0.0; 3], [1.0; 3])
    };
    format!(
        "FTransform( FQuat({}), FVector({}), FVector({}) )",
        floats(ctx, &rotation),
        floats(ctx, &translation),
        floats(ctx, &scale)
    )
}

fn struct_literal(ctx: &mut EmitterContext, pin: &PinType, value: &str) -> Result<String> {
    let ir = ctx.ir();
    let struct_name = pin.sub_category_object.as_deref().unwrap_or_default();

    match struct_name {
        "Vector" => return Ok(format!("FVector({})", floats(ctx, &comma_floats::<3>(value)))),
        "Rotator" => return Ok(format!("FRotator({})", floats(ctx, &comma_floats::<3>(value)))),
        "Transform" => return Ok(transform_literal(ctx, value)),
        "LinearColor" => {
            let rgba = field_floats(value, ["R", "G", "B", "A"], [0.0, 0.0, 0.0, 1.0]);
            return Ok(format!("FLinearColor({})", floats(ctx, &rgba)));
        }
        "Color" => {
            let fields = parse_struct_fields(value);
            let channel = |key: &str, default: i32| {
                fields
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| parse_int(v) as u8)
                    .unwrap_or(default as u8)
            };
            return Ok(format!(
                "FColor({},{},{},{})",
                channel("R", 0),
                channel("G", 0),
                channel("B", 0),
                channel("A", 255)
            ));
        }
        "Vector2D" => {
            let xy = field_floats(value, ["X", "Y"], [0.0, 0.0]);
            return Ok(format!("FVector2D({})", floats(ctx, &xy)));
        }
        LATENT_ACTION_INFO => return Ok(latent_action_info_literal(value)),
        _ => {}
    }

    let desc = ir
        .reflection
        .struct_desc(struct_name)
        .ok_or_else(|| unknown("struct", struct_name))?;

    let cpp_name = names::struct_name(desc);
    let local = ctx.generate_unique_local_name();
    let constructor = if desc.user_defined {
        "::GetDefaultValue()"
    } else {
        "{}"
    };
    ctx.add_line(format!("auto {local} = {cpp_name}{constructor};"));

    if value.is_empty() || value == "()" {
        return Ok(local);
    }
    for (key, field_value) in parse_struct_fields(value) {
        let field = desc.properties.iter().find_map(|p| {
            ir.reflection
                .property(*p)
                .filter(|prop| prop.name == key)
        });
        let Some(field) = field else {
            ctx.logger().error(&format!(
                "cannot parse struct \"{value}\": {struct_name} has no member {key} (class {})",
                ir.name
            ));
            continue;
        };
        let rendered = literal_term(ctx, &field.pin_type, unquote(&field_value), None, None)?;
        let member = names::property_name(&ir.reflection, field);
        ctx.add_line(format!("{local}.{member} = {rendered};"));
    }
    Ok(local)
}

/// Renders a literal of `pin` type; may hoist helper locals into the current body
pub fn literal_term(
    ctx: &mut EmitterContext,
    pin: &PinType,
    value: &str,
    object: Option<&str>,
    text: Option<&str>,
) -> Result<String> {
    let ir = ctx.ir();
    Ok(match pin.category {
        PinCategory::String => format!("FString(TEXT(\"{}\"))", escape_text(value)),
        PinCategory::Text => {
            let text = text.unwrap_or(value);
            if text.is_empty() {
                "FText::GetEmpty()".to_string()
            } else {
                format!("FText::FromString(TEXT(\"{}\"))", escape_text(text))
            }
        }
        PinCategory::Float => float_to_string(ctx, parse_float(value)),
        PinCategory::Int => parse_int(value).to_string(),
        PinCategory::Byte | PinCategory::Enum => {
            let desc = pin
                .sub_category_object
                .as_deref()
                .and_then(|e| ir.reflection.enum_desc(e));
            match desc {
                Some(_) if value.contains("::") => value.to_string(),
                Some(desc) => {
                    let name = names::enum_name(desc);
                    let entry = if value.is_empty() {
                        desc.values.first().map(String::as_str).unwrap_or_default()
                    } else {
                        value
                    };
                    format!("{name}::{entry}")
                }
                None => (parse_int(value) as u8).to_string(),
            }
        }
        PinCategory::Boolean => parse_bool(value).to_string(),
        PinCategory::Name => {
            if value.is_empty() {
                "FName()".to_string()
            } else {
                format!("FName(TEXT(\"{}\"))", escape_text(value))
            }
        }
        PinCategory::Struct => return struct_literal(ctx, pin, value),
        _ if pin.is_self() => "this".to_string(),
        PinCategory::Class => match object {
            Some(path) => match ir.reflection.class(path) {
                Some(class) if class.is_native || class.is_converted => {
                    format!("{}::StaticClass()", names::class_name(class, true))
                }
                found => {
                    let path = found.and_then(|c| c.path.as_deref()).unwrap_or(path);
                    format!(
                        "LoadClass<UClass>(nullptr, TEXT(\"{}\"), nullptr, 0, nullptr)",
                        escape_text(path)
                    )
                }
            },
            None => "((UClass*)nullptr)".to_string(),
        },
        PinCategory::SoftClass | PinCategory::SoftObject => {
            let class = native_class_of(ir, pin)
                .or_else(|| ir.reflection.class("Object"))
                .map(|c| names::class_name(c, false))
                .unwrap_or_else(|| "UObject".to_string());
            if value.is_empty() {
                format!("(({class}*)nullptr)")
            } else {
                let pointer = if pin.category == PinCategory::SoftClass {
                    "TSoftClassPtr"
                } else {
                    "TSoftObjectPtr"
                };
                format!(
                    "{pointer}<{class}>(FSoftObjectPath(TEXT(\"{}\")))",
                    escape_text(value)
                )
            }
        }
        PinCategory::Object => {
            let class = native_class_of(ir, pin)
                .or_else(|| ir.reflection.class("Object"))
                .map(|c| names::class_name(c, false))
                .unwrap_or_else(|| "UObject".to_string());
            match object {
                Some(path) => format!("LoadObject<{class}>(nullptr, TEXT(\"{}\"))", escape_text(path)),
                None => format!("(({class}*)nullptr)"),
            }
        }
        PinCategory::Interface if object.is_none() && value.is_empty() => "nullptr".to_string(),
        _ => {
            ctx.logger().error(&format!(
                "a {:?} cannot be expressed as a literal value",
                pin.category
            ));
            value.to_string()
        }
    })
}

/// `FLatentActionInfo(...)` from the `Key=Value` list carried by a latent info term
pub fn latent_action_info_literal(value: &str) -> String {
    let fields = parse_struct_fields(value);
    let field = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| unquote(v).to_string())
    };
    let int_field = |key: &str| field(key).map(|v| parse_int(&v)).unwrap_or(-1);
    let function = field("ExecutionFunction").unwrap_or_default();
    format!(
        "FLatentActionInfo({}, {}, TEXT(\"{}\"), this)",
        int_field("Linkage"),
        int_field("UUID"),
        escape_text(&function)
    )
}

pub fn is_latent_action_info(pin: &PinType) -> bool {
    pin.category == PinCategory::Struct
        && pin.sub_category_object.as_deref() == Some(LATENT_ACTION_INFO)
}

fn object_type_string(
    class: &ClassDesc,
    property: Option<&PropertyDesc>,
    is_class_term: bool,
) -> String {
    let cpp = names::class_name(class, false);
    let matches = property
        .is_some_and(|p| p.pin_type.sub_category_object.as_deref() == Some(class.name.as_str()));
    match property {
        Some(p) if matches && is_class_term && p.flags.uobject_wrapper => {
            format!("TSubclassOf<{cpp}>")
        }
        _ if is_class_term => "UClass*".to_string(),
        _ => format!("{cpp}*"),
    }
}

/// Opening and closing text converting a value of type `r` into type `l`, when one is needed
pub fn generate_automatic_cast(
    ir: &CompiledClass,
    l: &PinType,
    r: &PinType,
    l_prop: Option<&PropertyDesc>,
    r_prop: Option<&PropertyDesc>,
    force_reference: bool,
) -> Option<(String, String)> {
    if l.container != r.container || l.category != r.category {
        return None;
    }

    match l.category {
        PinCategory::Byte | PinCategory::Enum => {
            if r.is_container() {
                return None;
            }
            match (enum_type_name(ir, l), enum_type_name(ir, r)) {
                (Some((name, _)), None) => Some(if force_reference {
                    (format!("*({name}*)(&("), "))".to_string())
                } else {
                    (format!("static_cast<{name}>("), ")".to_string())
                }),
                (None, Some(_)) => Some(if force_reference {
                    ("*static_cast<uint8*>(&(".to_string(), "))".to_string())
                } else {
                    ("static_cast<uint8>(".to_string(), ")".to_string())
                }),
                _ => None,
            }
        }
        PinCategory::Class | PinCategory::Object => {
            let is_class_term = l.category == PinCategory::Class;
            let l_class = native_class_of(ir, l);
            let r_class = native_class_of(ir, r);
            let related = |a: &ClassDesc, b: &ClassDesc| {
                a.name != b.name
                    && (ir.reflection.is_child_of(&a.name, &b.name)
                        || ir.reflection.is_child_of(&b.name, &a.name))
            };
            let array_cast = |l_str: String, r_str: String| {
                (
                    format!("TArrayCaster< {r_str} >("),
                    format!(").Get< {l_str} >()"),
                )
            };

            if is_class_term {
                if !r.is_array() {
                    return None;
                }
                let l_wrapped = l_prop.is_some_and(|p| p.flags.uobject_wrapper);
                let r_wrapped = r_prop.is_some_and(|p| p.flags.uobject_wrapper);
                let (l_class, r_class) = (l_class?, r_class?);
                if l_wrapped != r_wrapped || (l_wrapped && related(l_class, r_class)) {
                    return Some(array_cast(
                        object_type_string(l_class, l_prop, true),
                        object_type_string(r_class, r_prop, true),
                    ));
                }
                return None;
            }

            let (l_class, r_class) = (l_class?, r_class?);
            let l_child_of_r = ir.reflection.is_child_of(&l_class.name, &r_class.name);
            let r_child_of_l = ir.reflection.is_child_of(&r_class.name, &l_class.name);
            if !r.is_container()
                && (l.is_reference || force_reference)
                && l_class.name != r_class.name
                && r_child_of_l
            {
                let l_str = object_type_string(l_class, l_prop, false);
                return Some((format!("*({l_str})(&("), "))".to_string()));
            }
            if !r.is_container() && l_child_of_r && !r_child_of_l {
                return Some((
                    format!("CastChecked<{}>(", names::class_name(l_class, false)),
                    ", ECastCheckedType::NullAllowed)".to_string(),
                ));
            }
            if r.is_array() && related(l_class, r_class) {
                return Some(array_cast(
                    object_type_string(l_class, l_prop, false),
                    object_type_string(r_class, r_prop, false),
                ));
            }
            None
        }
        _ => None,
    }
}

/// Expression for the reflected owner of a property, `C::StaticClass()` or `S::StaticStruct()`
fn owner_struct_expression(ctx: &EmitterContext, desc: &PropertyDesc) -> Result<String> {
    let reflection = &ctx.ir().reflection;
    match &desc.owner {
        PropertyOwner::Class(class) => Ok(format!(
            "{}::StaticClass()",
            names::class_name_of(reflection, class)?
        )),
        PropertyOwner::Struct(name) => Ok(format!(
            "{}::StaticStruct()",
            names::struct_name_of(reflection, name)?
        )),
        PropertyOwner::Function(f) => {
            let function = ctx.function(*f)?;
            Ok(format!(
                "{}::StaticClass()->FindFunctionByName(FName(TEXT(\"{}\")))",
                names::class_name_of(reflection, &function.owner)?,
                escape_text(&function.name)
            ))
        }
    }
}

/// Declares a local holding the reflected `UProperty*` of `property`, returning its name
pub fn generate_get_property_by_name(ctx: &mut EmitterContext, property: PropertyId) -> Result<String> {
    let desc = ctx.property(property)?;
    let owner = owner_struct_expression(ctx, desc)?;
    let property_ptr = ctx.generate_unique_local_name();
    let name = escape_text(&desc.name);

    if ctx.class.options.use_static_property_lookups {
        let weak_ptr = ctx.generate_unique_local_name();
        ctx.add_line(format!("static TWeakObjectPtr<UProperty> {weak_ptr}{{}};"));
        ctx.add_line(format!("const UProperty* {property_ptr} = {weak_ptr}.Get();"));
        ctx.add_line(format!("if (nullptr == {property_ptr})"));
        ctx.add_line("{");
        ctx.increase_indent();
        ctx.add_line(format!(
            "{property_ptr} = ({owner})->FindPropertyByName(FName(TEXT(\"{name}\")));"
        ));
        ctx.add_line(format!("check({property_ptr});"));
        ctx.add_line(format!("{weak_ptr} = {property_ptr};"));
        ctx.decrease_indent();
        ctx.add_line("}");
    } else {
        ctx.add_line(format!(
            "const UProperty* {property_ptr} = ({owner})->FindPropertyByName(FName(TEXT(\"{name}\")));"
        ));
        ctx.add_line(format!("check({property_ptr});"));
    }
    Ok(property_ptr)
}

/// Reaches a property generated code may not name directly
///
/// Returns the expression; for a bitfield setter `setter_end` receives the closing text.
pub fn access_inaccessible_property(
    ctx: &mut EmitterContext,
    property: PropertyId,
    context: &str,
    address_op: &str,
    usage: TermUsage,
    setter_end: Option<&mut String>,
) -> Result<String> {
    let ir = ctx.ir();
    let desc = ctx.property(property)?;

    if desc.pin_type.category == PinCategory::Boolean && desc.flags.bitfield {
        let property_ptr = generate_get_property_by_name(ctx, property)?;
        if usage == TermUsage::Setter
            && let Some(end) = setter_end
        {
            *end = ", 0))".to_string();
            return Ok(format!(
                "(((UBoolProperty*){property_ptr})->SetPropertyValue_InContainer({address_op}{context}, "
            ));
        }
        return Ok(format!(
            "(((UBoolProperty*){property_ptr})->GetPropertyValue_InContainer({address_op}{context}, 0))"
        ));
    }

    let type_name = property_type(ir, desc)?;
    if !desc.flags.private_access && !desc.flags.protected_access {
        let property_ptr = generate_get_property_by_name(ctx, property)?;
        return Ok(format!(
            "(*({property_ptr}->ContainerPtrToValuePtr<{type_name}>({address_op}{context}, 0)))"
        ));
    }

    let owner = match &desc.owner {
        PropertyOwner::Class(class) => names::class_name_of(&ir.reflection, class)?,
        PropertyOwner::Struct(name) => names::struct_name_of(&ir.reflection, name)?,
        PropertyOwner::Function(f) => {
            names::class_name_of(&ir.reflection, &ctx.function(*f)?.owner)?
        }
    };
    Ok(format!(
        "(*(AccessPrivateProperty<{type_name}>({address_op}{context}, {owner}::__PPO__{}() )))",
        desc.name
    ))
}
