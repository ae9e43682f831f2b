//! Type entries: the records of the type-rule database.
//!
//! A [`TypeEntry`] describes one named C++ type category and the generation
//! rules attached to it. The kind set is closed ([`TypeEntryKind`]), so all
//! kind-specific decisions are made by matching on it.

use std::fmt;
use std::rc::Rc;

use crate::codemodel::Access;
use crate::registry::ApiVersion;

/// Shared handle to a type entry. Entries are compared by identity.
pub type TypeEntryRef = Rc<TypeEntry>;

/// Returns true when both handles point at the same entry.
pub fn same_entry(a: &TypeEntryRef, b: &TypeEntryRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// The builtin C++ arithmetic and library scalar types.
pub const CPP_PRIMITIVES: &[&str] = &[
    "bool",
    "char",
    "signed char",
    "unsigned char",
    "wchar_t",
    "char16_t",
    "char32_t",
    "short",
    "unsigned short",
    "int",
    "unsigned int",
    "unsigned",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "float",
    "double",
    "long double",
    "std::size_t",
    "size_t",
    "std::ptrdiff_t",
    "ptrdiff_t",
    "std::nullptr_t",
    "int8_t",
    "uint8_t",
    "int16_t",
    "uint16_t",
    "int32_t",
    "uint32_t",
    "int64_t",
    "uint64_t",
    "intptr_t",
    "uintptr_t",
];

/// Whether a namespace shows up in the naming hierarchy of generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamespaceVisibility {
    /// Visible unless the namespace is an inline namespace.
    #[default]
    Auto,
    Visible,
    Invisible,
}

/// Semantic category of a container template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Set,
    Map,
    MultiMap,
    Pair,
    Span,
}

impl ContainerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list" | "vector" => Some(ContainerKind::List),
            "set" => Some(ContainerKind::Set),
            "map" | "hash" => Some(ContainerKind::Map),
            "multi-map" | "multi-hash" => Some(ContainerKind::MultiMap),
            "pair" => Some(ContainerKind::Pair),
            "span" => Some(ContainerKind::Span),
            _ => None,
        }
    }
}

/// Kind-specific payload of a [`TypeEntry`].
#[derive(Debug, Clone)]
pub enum TypeEntryKind {
    Void,
    Primitive {
        /// A builtin C++ type as opposed to a user-declared primitive.
        cpp_primitive: bool,
    },
    Enum {
        null_value: Option<String>,
        flags: Option<String>,
    },
    Flags {
        original_enum: String,
    },
    Container {
        kind: ContainerKind,
    },
    SmartPointer {
        getter: String,
        ref_count_method: Option<String>,
    },
    Complex {
        object_type: bool,
        generic_class: bool,
    },
    Namespace {
        visibility: NamespaceVisibility,
        inline: bool,
    },
    Array {
        nested: TypeEntryRef,
    },
    /// A template parameter placeholder such as `T` in `template <class T>`.
    TemplateArgument {
        ordinal: usize,
    },
    /// A global function rule.
    Function {
        signatures: Vec<String>,
    },
    /// The module (package) entry of a type-system file.
    TypeSystem,
}

/// A modification of one argument of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentModification {
    /// 1-based argument index.
    pub index: usize,
    pub remove: bool,
    pub replace_default_expression: Option<String>,
    pub remove_default_expression: bool,
}

/// A user rule changing a function matched by its minimal signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionModification {
    /// Minimal signature, e.g. `Point(int,int)`.
    pub signature: String,
    pub remove: bool,
    pub arguments: Vec<ArgumentModification>,
}

impl FunctionModification {
    pub fn argument(&self, index: usize) -> Option<&ArgumentModification> {
        self.arguments.iter().find(|a| a.index == index)
    }
}

/// A function declared only in the type rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedFunction {
    /// Declaration such as `Point(double x, double y = 0)`.
    pub signature: String,
    pub return_type: Option<String>,
    pub is_static: bool,
    pub access: Access,
}

/// One named C++ type and its generation rules.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    name: String,
    package: String,
    generate_code: bool,
    private: bool,
    default_constructor: Option<String>,
    since: Option<ApiVersion>,
    modifications: Vec<FunctionModification>,
    added_functions: Vec<AddedFunction>,
    kind: TypeEntryKind,
}

impl TypeEntry {
    pub fn new(name: impl Into<String>, kind: TypeEntryKind) -> Self {
        Self {
            name: name.into(),
            package: String::new(),
            generate_code: true,
            private: false,
            default_constructor: None,
            since: None,
            modifications: Vec::new(),
            added_functions: Vec::new(),
            kind,
        }
    }

    pub fn cpp_primitive(name: impl Into<String>) -> Self {
        Self::new(name, TypeEntryKind::Primitive { cpp_primitive: true })
            .with_generate_code(false)
    }

    pub fn value_type(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TypeEntryKind::Complex {
                object_type: false,
                generic_class: false,
            },
        )
    }

    pub fn object_type(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TypeEntryKind::Complex {
                object_type: true,
                generic_class: false,
            },
        )
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_generate_code(mut self, generate: bool) -> Self {
        self.generate_code = generate;
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn with_default_constructor(mut self, expression: impl Into<String>) -> Self {
        self.default_constructor = Some(expression.into());
        self
    }

    pub fn with_since(mut self, since: ApiVersion) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_modification(mut self, modification: FunctionModification) -> Self {
        self.modifications.push(modification);
        self
    }

    pub fn with_added_function(mut self, function: AddedFunction) -> Self {
        self.added_functions.push(function);
        self
    }

    /// Fully qualified C++ name, e.g. `ns::Point` or `std::vector`.
    pub fn qualified_cpp_name(&self) -> &str {
        &self.name
    }

    /// The unqualified name, e.g. `Point` for `ns::Point`.
    pub fn entry_name(&self) -> &str {
        // Builtins like "unsigned long" carry no scope; only split on "::".
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn generate_code(&self) -> bool {
        self.generate_code
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn default_constructor(&self) -> Option<&str> {
        self.default_constructor.as_deref()
    }

    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor.is_some()
    }

    pub fn since(&self) -> Option<&ApiVersion> {
        self.since.as_ref()
    }

    pub fn modifications(&self) -> &[FunctionModification] {
        &self.modifications
    }

    pub fn added_functions(&self) -> &[AddedFunction] {
        &self.added_functions
    }

    pub fn kind(&self) -> &TypeEntryKind {
        &self.kind
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Primitive { .. })
    }

    pub fn is_cpp_primitive(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Primitive { cpp_primitive: true })
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Enum { .. })
    }

    pub fn is_flags(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Flags { .. })
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Container { .. })
    }

    pub fn is_smart_pointer(&self) -> bool {
        matches!(self.kind, TypeEntryKind::SmartPointer { .. })
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Namespace { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Array { .. })
    }

    pub fn is_template_argument(&self) -> bool {
        matches!(self.kind, TypeEntryKind::TemplateArgument { .. })
    }

    pub fn is_type_system(&self) -> bool {
        matches!(self.kind, TypeEntryKind::TypeSystem)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, TypeEntryKind::Function { .. })
    }

    /// Class-like entries: classes, namespaces, containers and smart pointers.
    pub fn is_complex(&self) -> bool {
        matches!(
            self.kind,
            TypeEntryKind::Complex { .. }
                | TypeEntryKind::Namespace { .. }
                | TypeEntryKind::Container { .. }
                | TypeEntryKind::SmartPointer { .. }
        )
    }

    pub fn is_object(&self) -> bool {
        matches!(
            self.kind,
            TypeEntryKind::Complex {
                object_type: true,
                ..
            }
        )
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            TypeEntryKind::Complex {
                object_type: false,
                ..
            }
        )
    }

    pub fn is_generic_class(&self) -> bool {
        matches!(
            self.kind,
            TypeEntryKind::Complex {
                generic_class: true,
                ..
            }
        )
    }

    pub fn container_kind(&self) -> Option<ContainerKind> {
        match &self.kind {
            TypeEntryKind::Container { kind } => Some(*kind),
            _ => None,
        }
    }

    pub fn null_value(&self) -> Option<&str> {
        match &self.kind {
            TypeEntryKind::Enum { null_value, .. } => null_value.as_deref(),
            _ => None,
        }
    }

    pub fn smart_pointer_getter(&self) -> Option<&str> {
        match &self.kind {
            TypeEntryKind::SmartPointer { getter, .. } => Some(getter),
            _ => None,
        }
    }

    /// The element entry of an array entry, the entry itself otherwise.
    pub fn nested_entry(&self) -> Option<&TypeEntryRef> {
        match &self.kind {
            TypeEntryKind::Array { nested } => Some(nested),
            _ => None,
        }
    }

    /// Whether code generation may address names through this scope.
    pub fn is_visible_scope(&self) -> bool {
        match &self.kind {
            TypeEntryKind::Namespace { visibility, inline } => match visibility {
                NamespaceVisibility::Visible => true,
                NamespaceVisibility::Invisible => false,
                NamespaceVisibility::Auto => !inline,
            },
            _ => true,
        }
    }
}

impl fmt::Display for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_strips_scope() {
        let entry = TypeEntry::value_type("ns::inner::Point");
        assert_eq!(entry.entry_name(), "Point");
        assert_eq!(entry.qualified_cpp_name(), "ns::inner::Point");

        let builtin = TypeEntry::cpp_primitive("unsigned long");
        assert_eq!(builtin.entry_name(), "unsigned long");
    }

    #[test]
    fn test_complex_kinds() {
        let container = TypeEntry::new(
            "std::vector",
            TypeEntryKind::Container {
                kind: ContainerKind::List,
            },
        );
        assert!(container.is_complex());
        assert!(container.is_container());
        assert!(!container.is_value());

        let object = TypeEntry::object_type("Widget");
        assert!(object.is_complex());
        assert!(object.is_object());
        assert!(!TypeEntry::cpp_primitive("int").is_complex());
    }

    #[test]
    fn test_namespace_visibility() {
        let auto = TypeEntry::new(
            "ns",
            TypeEntryKind::Namespace {
                visibility: NamespaceVisibility::Auto,
                inline: false,
            },
        );
        assert!(auto.is_visible_scope());

        let inline = TypeEntry::new(
            "v1",
            TypeEntryKind::Namespace {
                visibility: NamespaceVisibility::Auto,
                inline: true,
            },
        );
        assert!(!inline.is_visible_scope());

        let hidden = TypeEntry::new(
            "detail",
            TypeEntryKind::Namespace {
                visibility: NamespaceVisibility::Invisible,
                inline: false,
            },
        );
        assert!(!hidden.is_visible_scope());
        assert!(TypeEntry::value_type("Point").is_visible_scope());
    }

    #[test]
    fn test_container_kind_names() {
        assert_eq!(ContainerKind::from_name("list"), Some(ContainerKind::List));
        assert_eq!(ContainerKind::from_name("multi-map"), Some(ContainerKind::MultiMap));
        assert_eq!(ContainerKind::from_name("tree"), None);
    }
}
