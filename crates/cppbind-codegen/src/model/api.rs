use std::path::{Path, PathBuf};

use crate::types::{TypeEntryRef, same_entry};

use super::{ClassId, MetaClass, MetaEnum, MetaFunction};

/// The immutable outcome of one extraction run.
///
/// Classes live in an arena addressed by [`ClassId`]. Ordinary classes and
/// smart-pointer classes are exposed as separate ordered lists.
#[derive(Debug, Clone, Default)]
pub struct ApiExtractorResult {
    pub(crate) arena: Vec<MetaClass>,
    pub(crate) classes: Vec<ClassId>,
    pub(crate) smart_pointers: Vec<ClassId>,
    pub(crate) global_functions: Vec<MetaFunction>,
    pub(crate) global_enums: Vec<MetaEnum>,
    pub(crate) typesystem_path: Option<PathBuf>,
    pub(crate) headers: Vec<PathBuf>,
}

impl ApiExtractorResult {
    pub fn class(&self, id: ClassId) -> &MetaClass {
        &self.arena[id.0]
    }

    pub fn get(&self, id: ClassId) -> Option<&MetaClass> {
        self.arena.get(id.0)
    }

    /// Ordinary classes and namespaces, outer scopes before inner ones.
    pub fn classes(&self) -> impl Iterator<Item = &MetaClass> {
        self.classes.iter().map(|id| &self.arena[id.0])
    }

    pub fn smart_pointers(&self) -> impl Iterator<Item = &MetaClass> {
        self.smart_pointers.iter().map(|id| &self.arena[id.0])
    }

    pub fn global_functions(&self) -> &[MetaFunction] {
        &self.global_functions
    }

    pub fn global_enums(&self) -> &[MetaEnum] {
        &self.global_enums
    }

    pub fn typesystem_path(&self) -> Option<&Path> {
        self.typesystem_path.as_deref()
    }

    /// The headers the API was extracted from.
    pub fn headers(&self) -> &[PathBuf] {
        &self.headers
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&MetaClass> {
        let qualified_name = qualified_name.trim_start_matches("::");
        self.classes().find(|c| c.qualified_cpp_name() == qualified_name)
    }

    pub fn find_class_by_entry(&self, entry: &TypeEntryRef) -> Option<&MetaClass> {
        self.classes().find(|c| c.has_entry(entry))
    }

    pub fn find_smart_pointer_by_entry(&self, entry: &TypeEntryRef) -> Option<&MetaClass> {
        self.smart_pointers().find(|c| c.has_entry(entry))
    }

    /// The enum declared for an enum type entry, global or nested.
    pub fn find_enum(&self, entry: &TypeEntryRef) -> Option<&MetaEnum> {
        self.global_enums
            .iter()
            .chain(self.arena.iter().flat_map(|c| c.enums.iter()))
            .find(|e| same_entry(&e.entry, entry))
    }

    pub fn enclosing(&self, class: &MetaClass) -> Option<&MetaClass> {
        class.enclosing.map(|id| self.class(id))
    }

    /// The enclosing scopes of a class, innermost first.
    pub fn enclosing_chain<'a>(&'a self, class: &'a MetaClass) -> impl Iterator<Item = &'a MetaClass> {
        std::iter::successors(self.enclosing(class), move |c| self.enclosing(c))
    }

    /// Visit the invisible namespaces nested in `class`, depth first.
    pub fn invisible_namespace_recursion<'a>(
        &'a self,
        class: &'a MetaClass,
        f: &mut impl FnMut(&'a MetaClass),
    ) {
        for inner in class.inner_classes.iter().map(|id| self.class(*id)) {
            if inner.is_invisible_namespace() {
                f(inner);
                self.invisible_namespace_recursion(inner, f);
            }
        }
    }
}
