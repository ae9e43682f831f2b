use std::fmt;
use std::rc::Rc;

use crate::codemodel::ReferenceType;
use crate::naming::normalize_signature;
use crate::types::{TypeEntry, TypeEntryKind, TypeEntryRef, same_entry};

/// How a type usage is marshaled, decided from its entry and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeUsagePattern {
    Primitive,
    Flags,
    Enum,
    Value,
    Object,
    ValuePointer,
    NativePointer,
    Void,
    Container,
    SmartPointer,
    Array,
    TemplateArgument,
}

/// A concrete usage of a type entry with const, reference, pointer and
/// template-instantiation modifiers.
#[derive(Debug, Clone)]
pub struct MetaType {
    entry: TypeEntryRef,
    is_const: bool,
    reference: ReferenceType,
    indirections: usize,
    instantiations: Vec<MetaType>,
    array_element: Option<Box<MetaType>>,
    array_length: Option<String>,
    original_template_type: Option<Box<MetaType>>,
    original_description: Option<String>,
}

impl MetaType {
    pub fn new(entry: TypeEntryRef) -> Self {
        Self {
            entry,
            is_const: false,
            reference: ReferenceType::NoReference,
            indirections: 0,
            instantiations: Vec::new(),
            array_element: None,
            array_length: None,
            original_template_type: None,
            original_description: None,
        }
    }

    pub fn void() -> Self {
        Self::new(Rc::new(
            TypeEntry::new("void", TypeEntryKind::Void).with_generate_code(false),
        ))
    }

    /// An array of `element`; `length` is `None` for unsized arrays.
    pub fn array_of(element: MetaType, length: Option<String>) -> Self {
        let entry = TypeEntry::new(
            format!("{}[]", element.entry.qualified_cpp_name()),
            TypeEntryKind::Array {
                nested: element.entry.clone(),
            },
        )
        .with_generate_code(false);
        let mut ty = Self::new(Rc::new(entry));
        ty.array_element = Some(Box::new(element));
        ty.array_length = length;
        ty
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    pub fn with_reference(mut self, reference: ReferenceType) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_indirections(mut self, indirections: usize) -> Self {
        self.indirections = indirections;
        self
    }

    pub fn with_instantiations(mut self, instantiations: Vec<MetaType>) -> Self {
        self.instantiations = instantiations;
        self
    }

    pub fn set_const(&mut self, is_const: bool) {
        self.is_const = is_const;
    }

    pub fn set_reference_type(&mut self, reference: ReferenceType) {
        self.reference = reference;
    }

    pub fn set_indirections(&mut self, indirections: usize) {
        self.indirections = indirections;
    }

    pub fn set_instantiations(&mut self, instantiations: Vec<MetaType>) {
        self.instantiations = instantiations;
    }

    pub fn set_original_template_type(&mut self, original: Option<MetaType>) {
        self.original_template_type = original.map(Box::new);
    }

    pub fn set_original_description(&mut self, description: impl Into<String>) {
        self.original_description = Some(description.into());
    }

    pub fn type_entry(&self) -> &TypeEntryRef {
        &self.entry
    }

    /// The unqualified entry name.
    pub fn name(&self) -> &str {
        self.entry.entry_name()
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    pub fn reference_type(&self) -> ReferenceType {
        self.reference
    }

    pub fn indirections(&self) -> usize {
        self.indirections
    }

    /// Indirections counting an lvalue reference as one more level.
    pub fn actual_indirections(&self) -> usize {
        self.indirections + usize::from(self.reference == ReferenceType::LValueReference)
    }

    pub fn instantiations(&self) -> &[MetaType] {
        &self.instantiations
    }

    pub fn has_instantiations(&self) -> bool {
        !self.instantiations.is_empty()
    }

    pub fn array_element(&self) -> Option<&MetaType> {
        self.array_element.as_deref()
    }

    pub fn array_length(&self) -> Option<&str> {
        self.array_length.as_deref()
    }

    pub fn original_template_type(&self) -> Option<&MetaType> {
        self.original_template_type.as_deref()
    }

    /// The spelling found in the header, falling back to the C++ signature.
    pub fn original_type_description(&self) -> String {
        self.original_description
            .clone()
            .unwrap_or_else(|| self.cpp_signature())
    }

    pub fn pass_by_const_ref(&self) -> bool {
        self.is_const && self.reference == ReferenceType::LValueReference && self.indirections == 0
    }

    pub fn usage_pattern(&self) -> TypeUsagePattern {
        let entry = &self.entry;
        if entry.is_template_argument() {
            return TypeUsagePattern::TemplateArgument;
        }
        if entry.is_primitive() && (self.actual_indirections() == 0 || self.pass_by_const_ref()) {
            return TypeUsagePattern::Primitive;
        }
        if entry.is_void() {
            return if self.indirections == 0 && self.reference == ReferenceType::NoReference {
                TypeUsagePattern::Void
            } else {
                TypeUsagePattern::NativePointer
            };
        }
        if entry.is_enum() && (self.actual_indirections() == 0 || self.pass_by_const_ref()) {
            return TypeUsagePattern::Enum;
        }
        if entry.is_object() {
            return if self.indirections == 0 && self.reference == ReferenceType::NoReference {
                TypeUsagePattern::Value
            } else {
                TypeUsagePattern::Object
            };
        }
        if entry.is_container() && self.indirections == 0 {
            return TypeUsagePattern::Container;
        }
        if entry.is_smart_pointer() && self.indirections == 0 {
            return TypeUsagePattern::SmartPointer;
        }
        if entry.is_flags() && (self.actual_indirections() == 0 || self.pass_by_const_ref()) {
            return TypeUsagePattern::Flags;
        }
        if entry.is_array() {
            return TypeUsagePattern::Array;
        }
        if entry.is_complex() {
            return match self.indirections {
                0 => TypeUsagePattern::Value,
                1 => TypeUsagePattern::ValuePointer,
                _ => TypeUsagePattern::NativePointer,
            };
        }
        TypeUsagePattern::NativePointer
    }

    pub fn is_void(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Void
    }

    pub fn is_primitive(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Primitive
    }

    /// A builtin C++ scalar used by value or const reference.
    pub fn is_cpp_primitive(&self) -> bool {
        self.is_primitive() && self.entry.is_cpp_primitive()
    }

    pub fn is_enum(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Enum
    }

    pub fn is_flags(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Flags
    }

    pub fn is_object(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Object
    }

    pub fn is_value(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Value
    }

    pub fn is_value_pointer(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::ValuePointer
    }

    pub fn is_native_pointer(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::NativePointer
    }

    pub fn is_container(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Container
    }

    pub fn is_smart_pointer(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::SmartPointer
    }

    pub fn is_array(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::Array
    }

    pub fn is_template_argument(&self) -> bool {
        self.usage_pattern() == TypeUsagePattern::TemplateArgument
    }

    pub fn is_pointer(&self) -> bool {
        self.indirections > 0
    }

    /// Whether any instantiation, at any depth, is a template parameter.
    pub fn has_template_children(&self) -> bool {
        self.instantiations
            .iter()
            .any(|t| t.entry.is_template_argument() || t.has_template_children())
    }

    /// A copy with pointer, const and reference modifiers removed.
    pub fn simplified(&self) -> MetaType {
        let mut ty = self.clone();
        ty.indirections = 0;
        ty.is_const = false;
        ty.reference = ReferenceType::NoReference;
        ty
    }

    /// The C++ spelling, e.g. `const std::vector<int> &`.
    pub fn cpp_signature(&self) -> String {
        if let Some(element) = &self.array_element {
            return format!(
                "{}[{}]",
                element.cpp_signature(),
                self.array_length.as_deref().unwrap_or_default()
            );
        }

        let mut signature = String::new();
        if self.is_const {
            signature.push_str("const ");
        }
        signature.push_str(self.entry.qualified_cpp_name());
        if !self.instantiations.is_empty() {
            let arguments: Vec<_> = self.instantiations.iter().map(|t| t.cpp_signature()).collect();
            signature.push('<');
            signature.push_str(&arguments.join(", "));
            signature.push('>');
        }
        if self.indirections > 0 || self.reference != ReferenceType::NoReference {
            signature.push(' ');
        }
        for _ in 0..self.indirections {
            signature.push('*');
        }
        match self.reference {
            ReferenceType::NoReference => {}
            ReferenceType::LValueReference => signature.push('&'),
            ReferenceType::RValueReference => signature.push_str("&&"),
        }
        signature
    }

    /// The signature with insignificant whitespace removed.
    pub fn minimal_signature(&self) -> String {
        normalize_signature(&self.cpp_signature())
    }
}

impl PartialEq for MetaType {
    fn eq(&self, other: &Self) -> bool {
        same_entry(&self.entry, &other.entry)
            && self.is_const == other.is_const
            && self.reference == other.reference
            && self.indirections == other.indirections
            && self.instantiations == other.instantiations
            && self.array_element == other.array_element
            && self.array_length == other.array_length
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cpp_signature())
    }
}
