//! Static descriptor table standing in for runtime reflection
//!
//! The front-end exports every class, struct, enum, property and function the compiled IR refers
//! to. The backend only ever queries this table by name or arena index.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::PinType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub usize);

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDesc {
    pub name: String,
    /// Native class prefix such as `U` or `A`
    #[serde(default = "default_class_prefix")]
    pub cpp_prefix: String,
    #[serde(default)]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub is_interface: bool,
    /// Non-native classes that are not emitted as native code are reached through a wrapper
    #[serde(default = "default_true")]
    pub is_converted: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub path_postfix: String,
    #[serde(default)]
    pub functions: Vec<FunctionId>,
}

fn default_class_prefix() -> String {
    "U".to_string()
}

impl ClassDesc {
    pub fn native(name: impl Into<String>, cpp_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpp_prefix: cpp_prefix.into(),
            super_class: None,
            interfaces: vec![],
            is_native: true,
            is_interface: false,
            is_converted: true,
            path: None,
            path_postfix: String::new(),
            functions: vec![],
        }
    }

    pub fn generated(name: impl Into<String>, super_class: impl Into<String>) -> Self {
        Self {
            is_native: false,
            super_class: Some(super_class.into()),
            ..Self::native(name, "U")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDesc {
    pub name: String,
    #[serde(default = "default_struct_prefix")]
    pub cpp_prefix: String,
    #[serde(default = "default_true")]
    pub is_native: bool,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default)]
    pub no_export: bool,
    #[serde(default)]
    pub path_postfix: String,
    #[serde(default)]
    pub properties: Vec<PropertyId>,
}

fn default_struct_prefix() -> String {
    "F".to_string()
}

impl StructDesc {
    pub fn native(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpp_prefix: default_struct_prefix(),
            is_native: true,
            user_defined: false,
            no_export: false,
            path_postfix: String::new(),
            properties: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDesc {
    pub name: String,
    /// Native type name, when it differs from the enum name
    pub cpp_type: Option<String>,
    pub values: Vec<String>,
    pub user_defined: bool,
    pub enum_class: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyOwner {
    Class(String),
    Struct(String),
    Function(FunctionId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFlags {
    pub parm: bool,
    pub out_parm: bool,
    pub return_parm: bool,
    pub const_parm: bool,
    pub reference_parm: bool,
    pub editor_only: bool,
    pub private_access: bool,
    pub protected_access: bool,
    pub native_const: bool,
    pub native_const_template_arg: bool,
    /// Bool stored as a bitfield rather than a native `bool`
    pub bitfield: bool,
    /// Ubergraph frame variable persisted on the object
    pub ubergraph_persistent: bool,
    pub deprecated: bool,
    pub net: bool,
    /// Class reference declared as `TSubclassOf<T>` rather than `UClass*`
    pub uobject_wrapper: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDesc {
    pub name: String,
    pub owner: PropertyOwner,
    #[serde(rename = "type")]
    pub pin_type: PinType,
    #[serde(default)]
    pub flags: PropertyFlags,
}

impl PropertyDesc {
    pub fn is_param(&self) -> bool {
        self.flags.parm && !self.flags.return_parm
    }

    /// Output parameter the callee writes through
    pub fn is_non_const_out(&self) -> bool {
        self.flags.out_parm && !self.flags.const_parm
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionFlags {
    pub is_static: bool,
    pub is_final: bool,
    pub native: bool,
    pub event: bool,
    pub blueprint_event: bool,
    pub net: bool,
    pub net_response: bool,
    pub is_const: bool,
    pub blueprint_callable: bool,
    pub blueprint_pure: bool,
    pub has_script: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionMeta {
    pub custom_thunk: bool,
    pub custom_structure_param: Option<String>,
    pub array_param: Option<String>,
    /// Comma separated names of parameters typed after the array parameter
    pub array_dependent_param: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDesc {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub flags: FunctionFlags,
    #[serde(default)]
    pub meta: FunctionMeta,
    /// Parameters in declaration order followed by locals
    #[serde(default)]
    pub properties: Vec<PropertyId>,
}

impl FunctionDesc {
    /// Function that must be routed through the `_Implementation` body when called on a parent
    pub fn is_native_event(&self) -> bool {
        self.flags.event && self.flags.blueprint_event && self.flags.native
    }

    pub fn is_net_rpc(&self) -> bool {
        self.flags.net && !self.flags.net_response
    }

    pub fn is_custom_thunk(&self) -> bool {
        self.flags.is_static
            && (self.meta.custom_thunk
                || self.meta.custom_structure_param.is_some()
                || self.meta.array_param.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorTable {
    pub classes: IndexMap<String, ClassDesc>,
    pub structs: IndexMap<String, StructDesc>,
    pub enums: IndexMap<String, EnumDesc>,
    pub properties: Vec<PropertyDesc>,
    pub functions: Vec<FunctionDesc>,
}

/// Guards hierarchy walks against malformed super-class cycles
const MAX_HIERARCHY_DEPTH: usize = 256;

impl DescriptorTable {
    pub fn class(&self, name: &str) -> Option<&ClassDesc> {
        self.classes.get(name)
    }

    pub fn struct_desc(&self, name: &str) -> Option<&StructDesc> {
        self.structs.get(name)
    }

    pub fn enum_desc(&self, name: &str) -> Option<&EnumDesc> {
        self.enums.get(name)
    }

    pub fn property(&self, id: PropertyId) -> Option<&PropertyDesc> {
        self.properties.get(id.0)
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDesc> {
        self.functions.get(id.0)
    }

    /// The class itself followed by its super classes, nearest first
    pub fn hierarchy<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a ClassDesc> + 'a {
        let mut next = self.class(class);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.super_class.as_deref().and_then(|s| self.class(s));
            Some(current)
        })
        .take(MAX_HIERARCHY_DEPTH)
    }

    pub fn is_child_of(&self, class: &str, ancestor: &str) -> bool {
        self.hierarchy(class).any(|c| c.name == ancestor)
    }

    /// Number of non-native classes strictly above `class`
    pub fn inheritance_level(&self, class: &str) -> usize {
        self.hierarchy(class)
            .skip(1)
            .filter(|c| !c.is_native)
            .count()
    }

    /// Nearest class in the hierarchy that is native or emitted as native code
    pub fn first_native_or_converted_class<'a>(&'a self, class: &'a str) -> Option<&'a ClassDesc> {
        self.hierarchy(class).find(|c| c.is_native || c.is_converted)
    }

    /// Looks up a function declared directly on `class`
    pub fn find_declared_function(&self, class: &str, name: &str) -> Option<FunctionId> {
        self.class(class)?
            .functions
            .iter()
            .copied()
            .find(|id| self.function(*id).is_some_and(|f| f.name == name))
    }

    /// Looks up a function on `class` or any of its super classes
    pub fn find_function_by_name(&self, class: &str, name: &str) -> Option<FunctionId> {
        self.hierarchy(class)
            .find_map(|c| self.find_declared_function(&c.name, name))
    }

    /// The declaration a function overrides: first searched on the owner's interfaces, then on
    /// its super classes, recursively
    pub fn original_function(&self, id: FunctionId) -> FunctionId {
        let mut current = id;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(function) = self.function(current) else {
                return current;
            };
            let Some(owner) = self.class(&function.owner) else {
                return current;
            };

            let from_interface = owner
                .interfaces
                .iter()
                .find_map(|i| self.find_function_by_name(i, &function.name));
            let from_super = || {
                self.hierarchy(&owner.name)
                    .skip(1)
                    .find_map(|c| self.find_declared_function(&c.name, &function.name))
            };

            match from_interface.or_else(from_super) {
                Some(parent) if parent != current => current = parent,
                _ => return current,
            }
        }
        current
    }

    /// Class that owns a property, through the owning function for parameters and locals
    pub fn property_owner_class(&self, id: PropertyId) -> Option<&str> {
        match &self.property(id)?.owner {
            PropertyOwner::Class(class) => Some(class.as_str()),
            PropertyOwner::Struct(_) => None,
            PropertyOwner::Function(f) => self.function(*f).map(|f| f.owner.as_str()),
        }
    }

    /// Whether the struct or class owning a property is native
    pub fn is_property_owner_native(&self, id: PropertyId) -> bool {
        let Some(property) = self.property(id) else {
            return false;
        };
        match &property.owner {
            PropertyOwner::Class(class) => self.class(class).is_some_and(|c| c.is_native),
            PropertyOwner::Struct(name) => self.struct_desc(name).is_some_and(|s| s.is_native),
            PropertyOwner::Function(f) => self
                .function(*f)
                .and_then(|f| self.class(&f.owner))
                .is_some_and(|c| c.is_native),
        }
    }

    /// Non-return parameters of a function, in declaration order
    pub fn params(&self, id: FunctionId) -> Vec<(PropertyId, &PropertyDesc)> {
        self.function(id)
            .map(|f| {
                f.properties
                    .iter()
                    .filter_map(|p| self.property(*p).map(|desc| (*p, desc)))
                    .filter(|(_, desc)| desc.is_param())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn return_property(&self, id: FunctionId) -> Option<(PropertyId, &PropertyDesc)> {
        self.function(id)?
            .properties
            .iter()
            .filter_map(|p| self.property(*p).map(|desc| (*p, desc)))
            .find(|(_, desc)| desc.flags.return_parm)
    }

    /// Properties of a function that are neither parameters nor the return value
    pub fn locals(&self, id: FunctionId) -> Vec<(PropertyId, &PropertyDesc)> {
        self.function(id)
            .map(|f| {
                f.properties
                    .iter()
                    .filter_map(|p| self.property(*p).map(|desc| (*p, desc)))
                    .filter(|(_, desc)| !desc.flags.parm)
                    .collect()
            })
            .unwrap_or_default()
    }
}
