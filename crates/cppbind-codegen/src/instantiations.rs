//! Collects the container and smart-pointer instantiations used by the API.
//!
//! Wrapper code is emitted once per distinct instantiation, so the collector
//! folds differently spelled usages of the same instantiation together:
//! `const std::vector<int> &` and `std::vector<int>` record one container,
//! `std::shared_ptr<const Foo>` and `std::shared_ptr<Foo>` one smart pointer.

use std::collections::HashSet;

use crate::codemodel::ReferenceType;
use crate::model::{ApiExtractorResult, MetaClass, MetaFunction, MetaType};
use crate::types::{TypeEntryRef, same_entry};

/// The distinct instantiations found in one API model, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Instantiations {
    containers: Vec<MetaType>,
    smart_pointers: Vec<MetaType>,
    container_names: HashSet<String>,
}

impl Instantiations {
    /// Walk global functions, then every generated class with its fields and
    /// inner classes.
    pub fn collect(api: &ApiExtractorResult) -> Self {
        let mut collected = Self::default();
        for function in api.global_functions() {
            collected.add_function(function);
        }
        for class in api.classes() {
            collected.add_class(api, class);
        }
        log::debug!(
            "Collected {} container and {} smart pointer instantiations",
            collected.containers.len(),
            collected.smart_pointers.len()
        );
        collected
    }

    /// Simplified container instantiations: no const, reference or pointer.
    pub fn containers(&self) -> &[MetaType] {
        &self.containers
    }

    /// Canonical smart-pointer instantiations.
    pub fn smart_pointers(&self) -> &[MetaType] {
        &self.smart_pointers
    }

    fn add_class(&mut self, api: &ApiExtractorResult, class: &MetaClass) {
        if !class.type_entry().generate_code() {
            return;
        }
        for function in class.functions() {
            self.add_function(function);
        }
        for field in class.fields() {
            self.add_type(&field.ty, &field.name);
        }
        for inner in class.inner_classes() {
            self.add_class(api, api.class(*inner));
        }
    }

    fn add_function(&mut self, function: &MetaFunction) {
        let context = function.signature();
        self.add_type(function.return_type(), &context);
        for argument in function.arguments() {
            self.add_type(argument.ty(), &context);
        }
    }

    /// Record `ty` and, first, any instantiation nested inside it.
    pub fn add_type(&mut self, ty: &MetaType, context: &str) {
        for nested in ty.instantiations() {
            self.add_type(nested, context);
        }

        let entry = ty.type_entry();
        let is_container = entry.is_container();
        if !is_container && !(entry.is_smart_pointer() && entry.generate_code()) {
            return;
        }

        if ty.has_template_children() {
            let piece = if is_container { "container" } else { "smart pointer" };
            let mut warning = format!(
                "Skipping instantiation of {piece} '{}' because it has template arguments.",
                ty.original_type_description()
            );
            if !context.is_empty() {
                warning.push_str(" Calling context: ");
                warning.push_str(context);
            }
            log::warn!("{warning}");
            return;
        }

        if is_container {
            let simplified = ty.simplified();
            if self.container_names.insert(simplified.cpp_signature()) {
                self.containers.push(simplified);
            }
            return;
        }

        let pointee = pointee_entry(ty);
        let present = self.smart_pointers.iter().any(|known| {
            same_entry(known.type_entry(), entry)
                && match (pointee_entry(known), pointee) {
                    (Some(a), Some(b)) => same_entry(a, b),
                    (None, None) => true,
                    _ => false,
                }
        });
        if !present {
            self.smart_pointers.push(canonical_smart_pointer(ty));
        }
    }
}

fn pointee_entry(ty: &MetaType) -> Option<&TypeEntryRef> {
    ty.instantiations().first().map(MetaType::type_entry)
}

/// `const std::shared_ptr<const Foo> &` -> `std::shared_ptr<Foo>`.
pub fn canonical_smart_pointer(ty: &MetaType) -> MetaType {
    let mut canonical = ty.clone();
    if canonical.is_const() || canonical.reference_type() != ReferenceType::NoReference {
        canonical.set_const(false);
        canonical.set_reference_type(ReferenceType::NoReference);
    }
    if ty.instantiations().first().is_some_and(MetaType::is_const) {
        let mut instantiations = ty.instantiations().to_vec();
        instantiations[0].set_const(false);
        canonical.set_instantiations(instantiations);
    }
    canonical
}
