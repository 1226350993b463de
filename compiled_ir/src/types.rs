use serde::{Deserialize, Serialize};

/// Sub-category marking a pin that refers to the owning object itself
pub const PSC_SELF: &str = "self";

/// Primary pin category, mirrors the K2 schema categories the backend understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinCategory {
    #[default]
    Wildcard,
    Exec,
    Boolean,
    Byte,
    Enum,
    Int,
    Float,
    Name,
    String,
    Text,
    Struct,
    Class,
    SoftClass,
    Object,
    SoftObject,
    Interface,
    Delegate,
    MulticastDelegate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContainerType {
    #[default]
    None,
    Array,
    Set,
    Map,
}

/// Static type of a terminal or property
///
/// `sub_category_object` names an entry of the descriptor table: a class for object-like
/// categories, a struct for `Struct` and an enum for `Byte`/`Enum`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PinType {
    pub category: PinCategory,
    pub sub_category: String,
    pub sub_category_object: Option<String>,
    pub container: ContainerType,
    pub is_reference: bool,
    pub is_const: bool,
    pub is_weak_pointer: bool,
    /// Value type of a map; the key type is described by the pin itself
    pub value_type: Option<Box<PinType>>,
}

impl PinType {
    pub fn new(category: PinCategory) -> Self {
        Self {
            category,
            ..Default::default()
        }
    }

    /// Pin type whose sub-category object is a class, struct or enum
    pub fn of(category: PinCategory, object: impl Into<String>) -> Self {
        Self {
            category,
            sub_category_object: Some(object.into()),
            ..Default::default()
        }
    }

    /// The `self` pin of an object graph
    pub fn self_pin() -> Self {
        Self {
            category: PinCategory::Object,
            sub_category: PSC_SELF.to_string(),
            ..Default::default()
        }
    }

    pub fn array(mut self) -> Self {
        self.container = ContainerType::Array;
        self
    }

    pub fn set(mut self) -> Self {
        self.container = ContainerType::Set;
        self
    }

    pub fn map(mut self) -> Self {
        self.container = ContainerType::Map;
        self
    }

    /// Map keyed by this pin type
    pub fn map_to(mut self, value: PinType) -> Self {
        self.container = ContainerType::Map;
        self.value_type = Some(Box::new(value));
        self
    }

    pub fn by_ref(mut self) -> Self {
        self.is_reference = true;
        self
    }

    pub fn weak(mut self) -> Self {
        self.is_weak_pointer = true;
        self
    }

    pub fn is_self(&self) -> bool {
        self.sub_category == PSC_SELF
    }

    pub fn is_array(&self) -> bool {
        self.container == ContainerType::Array
    }

    pub fn is_container(&self) -> bool {
        self.container != ContainerType::None
    }

    /// Terms of this type are dereferenced with `.` rather than `->`
    pub fn is_struct_context(&self) -> bool {
        self.category == PinCategory::Struct
    }

    /// Terms of this type are read through the class default object
    pub fn is_class_context(&self) -> bool {
        self.category == PinCategory::Class
    }

    /// Element type of a container, with const-ness stripped
    pub fn element(&self) -> PinType {
        PinType {
            container: ContainerType::None,
            is_const: false,
            value_type: None,
            ..self.clone()
        }
    }
}
