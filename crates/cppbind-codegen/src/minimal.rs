//! Minimal constructors: placeholder values for any type of the API model.
//!
//! Generated code sometimes needs a value of a type without having one at
//! hand, for example on the error path of a virtual method override. The
//! resolver produces the cheapest expression that constructs such a value.
//!
//! | Type                              | Result                                          |
//! |-----------------------------------|-------------------------------------------------|
//! | `bool`                            | `Boolean`                                       |
//! | `int`, `unsigned long`            | `CppScalar`                                     |
//! | enum with a null value            | `Enum` naming that value                        |
//! | `Widget *`                        | `Pointer` to `::Widget`                         |
//! | class with a default constructor  | `DefaultConstructor`                            |
//! | class with other constructors     | `Custom` call of the cheapest constructor       |

use std::fmt;

use crate::codemodel::ReferenceType;
use crate::error::ResolveError;
use crate::model::{ApiExtractorResult, FunctionKind, MetaClass, MetaFunction, MetaType};
use crate::signature::{full_type_name_entry, full_type_name_without_modifiers};
use crate::types::{TypeEntryKind, TypeEntryRef, same_entry};

/// Nested constructor searches deeper than this are abandoned.
pub const MAX_RECURSION_DEPTH: usize = 16;

/// Score added to constructors taking non-scalar arguments.
const COMPLEX_ARGUMENT_PENALTY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValueKind {
    Boolean,
    CppScalar,
    Custom,
    DefaultConstructor,
    /// Constructible with `T()`, but not with empty braces.
    DefaultConstructorWithDefaultValues,
    Enum,
    Pointer,
    Void,
}

/// How to produce a placeholder value of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultValue {
    kind: DefaultValueKind,
    value: String,
}

impl DefaultValue {
    pub fn new(kind: DefaultValueKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> DefaultValueKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_void(&self) -> bool {
        self.kind == DefaultValueKind::Void
    }

    /// Expression for a `return` statement.
    pub fn return_value(&self) -> String {
        match self.kind {
            DefaultValueKind::Boolean => "false".to_string(),
            DefaultValueKind::CppScalar => "0".to_string(),
            DefaultValueKind::Custom | DefaultValueKind::Enum => self.value.clone(),
            DefaultValueKind::Pointer => "nullptr".to_string(),
            DefaultValueKind::Void => String::new(),
            DefaultValueKind::DefaultConstructorWithDefaultValues => format!("{}()", self.value),
            DefaultValueKind::DefaultConstructor => "{}".to_string(),
        }
    }

    /// Initializer appended to a variable declaration.
    pub fn initialization(&self) -> String {
        match self.kind {
            DefaultValueKind::Boolean => "{false}".to_string(),
            DefaultValueKind::CppScalar => "{0}".to_string(),
            DefaultValueKind::Custom => format!(" = {}", self.value),
            DefaultValueKind::Enum => format!("{{{}}}", self.value),
            DefaultValueKind::Pointer => "{nullptr}".to_string(),
            DefaultValueKind::DefaultConstructor => "{}".to_string(),
            DefaultValueKind::DefaultConstructorWithDefaultValues | DefaultValueKind::Void => {
                String::new()
            }
        }
    }

    /// Expression passed as an argument of another constructor call.
    pub fn constructor_parameter(&self) -> String {
        match self.kind {
            DefaultValueKind::Boolean => "false".to_string(),
            DefaultValueKind::CppScalar if self.value.contains(' ') => {
                format!("static_cast<{}>(0)", self.value)
            }
            DefaultValueKind::CppScalar => format!("{}(0)", self.value),
            DefaultValueKind::Custom | DefaultValueKind::Enum => self.value.clone(),
            DefaultValueKind::Pointer => format!("static_cast<{}*>(nullptr)", self.value),
            DefaultValueKind::Void => String::new(),
            DefaultValueKind::DefaultConstructor
            | DefaultValueKind::DefaultConstructorWithDefaultValues => format!("{}()", self.value),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultValue({:?}, \"{}\")", self.kind, self.value)
    }
}

/// Minimal constructor for a type usage.
pub fn minimal_constructor(api: &ApiExtractorResult, ty: &MetaType) -> Result<DefaultValue, ResolveError> {
    Resolver { api }.for_type(ty, 0)
}

/// Minimal constructor for a type entry, ignoring usage modifiers.
pub fn minimal_constructor_for_entry(
    api: &ApiExtractorResult,
    entry: &TypeEntryRef,
) -> Result<DefaultValue, ResolveError> {
    Resolver { api }.for_entry(entry, 0)
}

/// Minimal constructor for a class.
pub fn minimal_constructor_for_class(
    api: &ApiExtractorResult,
    class: &MetaClass,
) -> Result<DefaultValue, ResolveError> {
    Resolver { api }.for_class(class, 0)
}

struct Resolver<'a> {
    api: &'a ApiExtractorResult,
}

impl Resolver<'_> {
    fn for_type(&self, ty: &MetaType, depth: usize) -> Result<DefaultValue, ResolveError> {
        let entry = ty.type_entry();
        if ty.reference_type() == ReferenceType::LValueReference && entry.is_object() {
            return Err(ResolveError::ReferenceToObjectType(ty.cpp_signature()));
        }

        if ty.is_container() {
            let mut ctor = ty.cpp_signature();
            if let Some(stripped) = ctor.strip_suffix('*') {
                return Ok(DefaultValue::new(DefaultValueKind::Pointer, stripped.trim()));
            }
            if let Some(stripped) = ctor.strip_prefix("const ") {
                ctor = stripped.to_string();
            }
            if let Some(stripped) = ctor.strip_suffix('&') {
                ctor = stripped.trim().to_string();
            }
            return Ok(DefaultValue::new(DefaultValueKind::DefaultConstructor, format!("::{ctor}")));
        }

        if ty.is_native_pointer() {
            return Ok(DefaultValue::new(DefaultValueKind::Pointer, entry.qualified_cpp_name()));
        }
        if ty.is_pointer() {
            return Ok(DefaultValue::new(
                DefaultValueKind::Pointer,
                format!("::{}", entry.qualified_cpp_name()),
            ));
        }

        if entry.is_smart_pointer() {
            return self.for_entry(entry, depth);
        }

        if entry.is_complex() {
            if let Some(expression) = entry.default_constructor() {
                return Ok(DefaultValue::new(DefaultValueKind::Custom, expression));
            }
            let class = self
                .api
                .find_class_by_entry(entry)
                .ok_or_else(|| ResolveError::ClassNotFound(entry.qualified_cpp_name().to_string()))?;
            let mut value = self.for_class(class, depth)?;
            if ty.has_instantiations() {
                value.value = value
                    .value
                    .replace(&full_type_name_entry(entry), &full_type_name_without_modifiers(ty));
            }
            return Ok(value);
        }

        self.for_entry(entry, depth)
    }

    fn for_entry(&self, entry: &TypeEntryRef, depth: usize) -> Result<DefaultValue, ResolveError> {
        let name = entry.qualified_cpp_name();
        match entry.kind() {
            TypeEntryKind::Primitive { cpp_primitive: true } => Ok(if name == "bool" {
                DefaultValue::new(DefaultValueKind::Boolean, "")
            } else {
                DefaultValue::new(DefaultValueKind::CppScalar, name)
            }),
            TypeEntryKind::Enum { null_value, .. } => Ok(match null_value {
                Some(value) => DefaultValue::new(DefaultValueKind::Enum, value.as_str()),
                None => DefaultValue::new(DefaultValueKind::Custom, format!("static_cast< ::{name}>(0)")),
            }),
            TypeEntryKind::Flags { .. } => Ok(DefaultValue::new(DefaultValueKind::Custom, format!("{name}(0)"))),
            // A user primitive without an explicit expression falls back to `T()`;
            // a wrong guess surfaces when the generated code is compiled.
            TypeEntryKind::Primitive { cpp_primitive: false } => Ok(match entry.default_constructor() {
                Some(expression) => DefaultValue::new(DefaultValueKind::Custom, expression),
                None => DefaultValue::new(DefaultValueKind::DefaultConstructorWithDefaultValues, format!("::{name}")),
            }),
            TypeEntryKind::SmartPointer { .. } => Ok(DefaultValue::new(DefaultValueKind::DefaultConstructor, name)),
            _ if entry.is_complex() => {
                let class = self
                    .api
                    .find_class_by_entry(entry)
                    .ok_or_else(|| ResolveError::ClassNotFound(name.to_string()))?;
                self.for_class(class, depth)
            }
            _ => Err(ResolveError::NoDefaultValue(name.to_string())),
        }
    }

    fn for_class(&self, class: &MetaClass, depth: usize) -> Result<DefaultValue, ResolveError> {
        let entry = class.type_entry();
        if let Some(expression) = entry.default_constructor() {
            return Ok(DefaultValue::new(DefaultValueKind::Custom, expression));
        }
        let qualified = class.qualified_cpp_name();
        if depth >= MAX_RECURSION_DEPTH {
            return Err(ResolveError::RecursionLimit(qualified.to_string()));
        }

        let mut candidates: Vec<(usize, &MetaFunction)> = Vec::new();
        for ctor in class.functions() {
            if ctor.is_user_added() || ctor.is_private() || ctor.kind() != FunctionKind::Constructor {
                continue;
            }
            let arguments = ctor.arguments();
            let Some(first) = arguments.first() else {
                return Ok(DefaultValue::new(DefaultValueKind::DefaultConstructor, format!("::{qualified}")));
            };
            if first.has_unmodified_default_value_expression() {
                return Ok(DefaultValue::new(
                    DefaultValueKind::DefaultConstructorWithDefaultValues,
                    format!("::{qualified}"),
                ));
            }

            // Arguments up to the first one with a default; a constructor taking
            // the class itself would recurse forever.
            let collected: Vec<_> = arguments
                .iter()
                .take_while(|a| !a.has_original_default_value_expression())
                .collect();
            let suitable = collected.iter().all(|a| !same_entry(a.ty().type_entry(), entry));
            if !suitable {
                continue;
            }
            let simple = collected.iter().all(|a| {
                let arg_entry = a.ty().type_entry();
                arg_entry.is_cpp_primitive() || arg_entry.is_enum() || a.ty().is_pointer()
            });
            let score = collected.len() + if simple { 0 } else { COMPLEX_ARGUMENT_PENALTY };
            candidates.push((score, ctor));
        }

        // Stable: equal scores keep declaration order.
        candidates.sort_by_key(|(score, _)| *score);
        let Some((_, ctor)) = candidates.first() else {
            return Err(ResolveError::NoSuitableConstructor(qualified.to_string()));
        };

        let mut arguments = Vec::new();
        for argument in ctor.arguments() {
            if argument.has_modified_default_value_expression() {
                if let Some(expression) = argument.default_value_expression() {
                    arguments.push(expression.to_string());
                }
                break;
            }
            if argument.has_original_default_value_expression() {
                break;
            }
            let value = self.for_type(argument.ty(), depth + 1)?;
            arguments.push(value.constructor_parameter());
        }
        Ok(DefaultValue::new(
            DefaultValueKind::Custom,
            format!("::{qualified}({})", arguments.join(", ")),
        ))
    }
}
