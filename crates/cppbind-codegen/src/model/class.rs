use crate::codemodel::Access;
use crate::types::{TypeEntryRef, same_entry};

use super::{FunctionKind, MetaFunction, MetaType};

/// Stable index of a class in the [`ApiExtractorResult`](super::ApiExtractorResult) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaField {
    pub name: String,
    pub ty: MetaType,
    pub access: Access,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEnumValue {
    pub name: String,
    pub value: Option<String>,
}

/// An enum declared globally or inside a class.
#[derive(Debug, Clone)]
pub struct MetaEnum {
    pub(crate) entry: TypeEntryRef,
    pub(crate) values: Vec<MetaEnumValue>,
    pub(crate) access: Access,
    pub(crate) is_scoped: bool,
    pub(crate) enclosing: Option<ClassId>,
}

impl MetaEnum {
    pub fn type_entry(&self) -> &TypeEntryRef {
        &self.entry
    }

    pub fn qualified_cpp_name(&self) -> &str {
        self.entry.qualified_cpp_name()
    }

    pub fn name(&self) -> &str {
        self.entry.entry_name()
    }

    pub fn values(&self) -> &[MetaEnumValue] {
        &self.values
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// `enum class` as opposed to a plain enum.
    pub fn is_scoped(&self) -> bool {
        self.is_scoped
    }

    pub fn enclosing_class(&self) -> Option<ClassId> {
        self.enclosing
    }

    /// The value name qualified the way C++ code must spell it.
    pub fn qualified_value(&self, value: &str) -> String {
        let scope = if self.is_scoped {
            self.qualified_cpp_name()
        } else {
            match self.qualified_cpp_name().rsplit_once("::") {
                Some((scope, _)) => scope,
                None => return value.to_string(),
            }
        };
        format!("{scope}::{value}")
    }
}

/// A class, struct or namespace of the API model.
#[derive(Debug, Clone)]
pub struct MetaClass {
    pub(crate) id: ClassId,
    pub(crate) entry: TypeEntryRef,
    pub(crate) enclosing: Option<ClassId>,
    pub(crate) inner_classes: Vec<ClassId>,
    pub(crate) functions: Vec<MetaFunction>,
    pub(crate) fields: Vec<MetaField>,
    pub(crate) enums: Vec<MetaEnum>,
    pub(crate) template_arguments: Vec<TypeEntryRef>,
    pub(crate) base_classes: Vec<String>,
    pub(crate) invisible_namespace: bool,
    pub(crate) is_final: bool,
}

impl MetaClass {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn type_entry(&self) -> &TypeEntryRef {
        &self.entry
    }

    pub fn qualified_cpp_name(&self) -> &str {
        self.entry.qualified_cpp_name()
    }

    pub fn name(&self) -> &str {
        self.entry.entry_name()
    }

    pub fn package(&self) -> &str {
        self.entry.package()
    }

    pub fn enclosing_class(&self) -> Option<ClassId> {
        self.enclosing
    }

    pub fn inner_classes(&self) -> &[ClassId] {
        &self.inner_classes
    }

    pub fn functions(&self) -> &[MetaFunction] {
        &self.functions
    }

    pub fn fields(&self) -> &[MetaField] {
        &self.fields
    }

    pub fn enums(&self) -> &[MetaEnum] {
        &self.enums
    }

    /// Entries for the template parameters of a template class.
    pub fn template_arguments(&self) -> &[TypeEntryRef] {
        &self.template_arguments
    }

    pub fn base_classes(&self) -> &[String] {
        &self.base_classes
    }

    pub fn is_namespace(&self) -> bool {
        self.entry.is_namespace()
    }

    /// A namespace left out of the naming hierarchy of generated code.
    pub fn is_invisible_namespace(&self) -> bool {
        self.invisible_namespace
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_polymorphic(&self) -> bool {
        self.functions.iter().any(MetaFunction::is_virtual)
    }

    pub fn is_abstract(&self) -> bool {
        self.functions.iter().any(MetaFunction::is_abstract)
    }

    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetaFunction> {
        self.functions.iter().filter(move |f| f.name() == name)
    }

    /// All constructors including copy and move constructors.
    pub fn constructors(&self) -> impl Iterator<Item = &MetaFunction> {
        self.functions.iter().filter(|f| f.is_constructor())
    }

    /// Constructors of kind [`FunctionKind::Constructor`] usable from generated code.
    pub fn query_constructors(&self) -> impl Iterator<Item = &MetaFunction> {
        self.functions
            .iter()
            .filter(|f| f.kind() == FunctionKind::Constructor && !f.is_private() && !f.is_user_added())
    }

    pub fn has_default_constructor(&self) -> bool {
        self.query_constructors().any(|f| f.arguments().is_empty())
    }

    pub fn has_private_destructor(&self) -> bool {
        self.functions
            .iter()
            .any(|f| f.kind() == FunctionKind::Destructor && f.is_private())
    }

    pub fn has_entry(&self, entry: &TypeEntryRef) -> bool {
        same_entry(&self.entry, entry)
    }
}
