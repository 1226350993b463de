//! C++ identifiers for reflected fields

use compiled_ir::{
    ClassDesc, DescriptorTable, EnumDesc, FunctionId, PropertyDesc, PropertyOwner, StructDesc,
};

use super::error::{EmitError, Result};

/// Base-63 digit for one code point chunk, least significant first
fn identifier_digit(digit: u32) -> char {
    let offset = match digit {
        0..=25 => b'a' as u32 + (25 - digit),
        26..=51 => b'A' as u32 + (51 - digit),
        52..=61 => b'0' as u32 + (61 - digit),
        _ => b'_' as u32,
    };
    char::from_u32(offset).unwrap_or('_')
}

fn encode_invalid_char(c: char) -> String {
    let mut value = c as u32;
    let mut encoded = String::new();
    while value != 0 {
        encoded.push(identifier_digit(value % 63));
        value /= 63;
    }
    encoded
}

/// Turns an arbitrary display name into a C++ identifier that cannot collide with native names
pub fn cpp_identifier(name: &str, deprecated: bool, prefix: &str) -> String {
    let name = if name == "Replicate to server" {
        "MagicNameWorkaround"
    } else {
        name
    };

    let mut postfix = String::from("__pf");
    let mut ident = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            ident.push(c);
        } else {
            ident.push('x');
            postfix.push_str(&encode_invalid_char(c));
        }
    }

    if prefix.is_empty() && ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }

    let mut result = format!("{prefix}{ident}{postfix}");
    if deprecated {
        result.push_str("_DEPRECATED");
    }
    result
}

/// Native name of a class; interfaces are named after their `I` half unless `u_interface`
pub fn class_name(desc: &ClassDesc, u_interface: bool) -> String {
    if desc.is_interface {
        let prefix = if u_interface { "U" } else { "I" };
        return format!("{prefix}{}", desc.name);
    }
    if desc.is_native {
        format!("{}{}", desc.cpp_prefix, desc.name)
    } else {
        cpp_identifier(&desc.name, false, &desc.cpp_prefix) + &desc.path_postfix
    }
}

pub fn struct_name(desc: &StructDesc) -> String {
    if desc.is_native {
        format!("{}{}", desc.cpp_prefix, desc.name)
    } else {
        cpp_identifier(&desc.name, false, &desc.cpp_prefix) + &desc.path_postfix
    }
}

pub fn enum_name(desc: &EnumDesc) -> String {
    if desc.user_defined {
        cpp_identifier(&desc.name, false, "E__")
    } else {
        desc.name.clone()
    }
}

pub fn class_name_of(reflection: &DescriptorTable, class: &str) -> Result<String> {
    reflection
        .class(class)
        .map(|desc| class_name(desc, false))
        .ok_or_else(|| EmitError::UnknownType {
            kind: "class",
            name: class.to_string(),
        })
}

pub fn struct_name_of(reflection: &DescriptorTable, name: &str) -> Result<String> {
    reflection
        .struct_desc(name)
        .map(struct_name)
        .ok_or_else(|| EmitError::UnknownType {
            kind: "struct",
            name: name.to_string(),
        })
}

fn is_owner_native(reflection: &DescriptorTable, owner: &PropertyOwner) -> bool {
    match owner {
        PropertyOwner::Class(class) => reflection.class(class).is_none_or(|c| c.is_native),
        PropertyOwner::Struct(name) => reflection.struct_desc(name).is_none_or(|s| s.is_native),
        PropertyOwner::Function(f) => reflection.function(*f).is_none_or(|f| f.flags.native),
    }
}

/// Member, parameter or local name as declared in generated code
pub fn property_name(reflection: &DescriptorTable, desc: &PropertyDesc) -> String {
    if is_owner_native(reflection, &desc.owner) {
        return desc.name.clone();
    }

    let prefix = match &desc.owner {
        PropertyOwner::Class(class) if desc.flags.ubergraph_persistent => {
            format!("b{}l__", reflection.inheritance_level(class))
        }
        _ if desc.flags.parm => "bpp__".to_string(),
        PropertyOwner::Function(_) => "bpfv__".to_string(),
        _ => "bpv__".to_string(),
    };
    cpp_identifier(&desc.name, desc.flags.deprecated, &prefix)
}

pub fn function_name(reflection: &DescriptorTable, function: FunctionId) -> Result<String> {
    let desc = reflection
        .function(function)
        .ok_or(EmitError::DanglingFunction(function.0))?;
    if desc.flags.native {
        Ok(desc.name.clone())
    } else {
        Ok(cpp_identifier(&desc.name, false, "bpf__"))
    }
}
