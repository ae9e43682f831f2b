//! Type signature translation and full-name helpers used by generators.

use bitflags::bitflags;

use crate::codemodel::ReferenceType;
use crate::model::{ApiExtractorResult, MetaClass, MetaEnum, MetaFunction, MetaType};
use crate::naming::{IdentifierStyle, canonical_identifier};
use crate::types::TypeEntry;

bitflags! {
    /// Options controlling how types and functions are rendered.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Options: u32 {
        const EXCLUDE_CONST             = 1 << 0;
        const EXCLUDE_REFERENCE         = 1 << 1;
        const SKIP_RETURN_TYPE          = 1 << 2;
        const SKIP_DEFAULT_VALUES       = 1 << 3;
        const SKIP_REMOVED_ARGUMENTS    = 1 << 4;
        const SKIP_NAME                 = 1 << 5;
        const VIRTUAL_CALL              = 1 << 6;
        const ORIGINAL_TYPE_DESCRIPTION = 1 << 7;
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::empty()
    }
}

/// Render a type usage for generated C++ code.
///
/// Inside a generic class, a type carrying its original template type is
/// rendered as that type instead.
pub fn translate_type(ty: &MetaType, context: Option<&MetaClass>, options: Options) -> String {
    if let Some(class) = context
        && class.type_entry().is_generic_class()
        && let Some(original) = ty.original_template_type()
    {
        return translate_type(original, context, options);
    }

    if options.contains(Options::ORIGINAL_TYPE_DESCRIPTION) {
        return ty.original_type_description();
    }
    if ty.is_void() {
        return "void".to_string();
    }
    if let Some(element) = ty.array_element() {
        return format!("{}[]", translate_type(element, context, options));
    }

    if options.intersects(Options::EXCLUDE_CONST | Options::EXCLUDE_REFERENCE) {
        let mut copy = ty.clone();
        if options.contains(Options::EXCLUDE_CONST) {
            copy.set_const(false);
        }
        if options.contains(Options::EXCLUDE_REFERENCE) {
            copy.set_reference_type(ReferenceType::NoReference);
        }
        let signature = copy.cpp_signature();
        let entry = copy.type_entry();
        if entry.is_void() || entry.is_cpp_primitive() {
            return signature;
        }
        return format!("::{signature}");
    }

    ty.cpp_signature()
}

/// Render a function as a C++ declaration, honoring the skip options.
pub fn function_signature(function: &MetaFunction, context: Option<&MetaClass>, options: Options) -> String {
    let mut out = String::new();
    if !options.contains(Options::SKIP_RETURN_TYPE) && !function.is_constructor() {
        out.push_str(&translate_type(function.return_type(), context, options));
        out.push(' ');
    }
    out.push_str(function.name());

    let arguments: Vec<_> = function
        .arguments()
        .iter()
        .filter(|a| !(options.contains(Options::SKIP_REMOVED_ARGUMENTS) && a.is_removed()))
        .map(|a| {
            let mut text = translate_type(a.ty(), context, options);
            if !options.contains(Options::SKIP_NAME) && !a.name().is_empty() {
                text.push(' ');
                text.push_str(a.name());
            }
            if !options.contains(Options::SKIP_DEFAULT_VALUES)
                && let Some(value) = a.default_value_expression()
            {
                text.push_str(" = ");
                text.push_str(value);
            }
            text
        })
        .collect();
    out.push('(');
    out.push_str(&arguments.join(", "));
    out.push(')');
    if function.is_constant() {
        out.push_str(" const");
    }
    if options.contains(Options::VIRTUAL_CALL) && function.is_virtual() {
        out.push_str(" override");
    }
    out
}

/// `::ns::Point` for complex entries, the bare name for builtins.
pub fn full_type_name_entry(entry: &TypeEntry) -> String {
    if entry.is_cpp_primitive() || entry.is_void() {
        entry.qualified_cpp_name().to_string()
    } else {
        format!("::{}", entry.qualified_cpp_name())
    }
}

/// Fully qualified name of a type usage without const or reference, keeping pointers.
pub fn full_type_name(ty: &MetaType) -> String {
    if ty.type_entry().is_void() && ty.indirections() > 0 {
        return format!("void{}", "*".repeat(ty.indirections()));
    }
    if ty.type_entry().is_container() {
        return format!("::{}", ty.cpp_signature());
    }
    let name = if ty.type_entry().is_complex() && ty.has_instantiations() {
        full_type_name_without_modifiers(ty)
    } else {
        full_type_name_entry(ty.type_entry())
    };
    format!("{name}{}", "*".repeat(ty.indirections()))
}

/// `::std::vector<int>` for `const std::vector<int> &`.
pub fn full_type_name_without_modifiers(ty: &MetaType) -> String {
    let signature = ty.simplified().cpp_signature();
    let entry = ty.type_entry();
    if entry.is_cpp_primitive() || entry.is_void() {
        signature
    } else {
        format!("::{signature}")
    }
}

pub fn full_class_name(class: &MetaClass) -> String {
    format!("::{}", class.qualified_cpp_name())
}

/// Dotted target name of a class, skipping invisible namespaces.
///
/// `geo::detail::Point` with `detail` invisible -> `geo.Point`, or
/// `sample.geo.Point` with the package included.
pub fn class_target_full_name(api: &ApiExtractorResult, class: &MetaClass, include_package: bool) -> String {
    let mut parts = vec![class.name().to_string()];
    parts.extend(
        api.enclosing_chain(class)
            .filter(|c| !c.is_invisible_namespace())
            .map(|c| c.name().to_string()),
    );
    if include_package && !class.package().is_empty() {
        parts.push(class.package().to_string());
    }
    parts.reverse();
    parts.join(".")
}

pub fn enum_target_full_name(api: &ApiExtractorResult, meta_enum: &MetaEnum, include_package: bool) -> String {
    match meta_enum.enclosing_class().map(|id| api.class(id)) {
        Some(class) => format!(
            "{}.{}",
            class_target_full_name(api, class, include_package),
            meta_enum.name()
        ),
        None if include_package && !meta_enum.type_entry().package().is_empty() => {
            format!("{}.{}", meta_enum.type_entry().package(), meta_enum.name())
        }
        None => meta_enum.name().to_string(),
    }
}

/// Target name of an instantiated type: `std::vector<int>` -> `std_vector_int`.
pub fn type_target_full_name(ty: &MetaType, include_package: bool) -> String {
    let name = canonical_identifier(&ty.cpp_signature(), IdentifierStyle::Compact);
    let package = ty.type_entry().package();
    if include_package && !package.is_empty() {
        format!("{package}.{name}")
    } else {
        name
    }
}

/// The C++ signature as an identifier: `std::vector<int>` -> `std_vector_int_`.
pub fn filtered_cpp_signature(ty: &MetaType) -> String {
    canonical_identifier(&ty.cpp_signature(), IdentifierStyle::Filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ApiBuilder;
    use crate::codemodel::CodeModel;
    use crate::registry::TypeDatabase;
    use crate::types::{ContainerKind, TypeEntryKind};
    use std::rc::Rc;

    fn point_ref() -> MetaType {
        MetaType::new(Rc::new(TypeEntry::value_type("geo::Point")))
            .with_const(true)
            .with_reference(ReferenceType::LValueReference)
    }

    #[test]
    fn test_translate_basic() {
        assert_eq!(translate_type(&MetaType::void(), None, Options::empty()), "void");
        assert_eq!(translate_type(&point_ref(), None, Options::empty()), "const geo::Point &");
        assert_eq!(
            translate_type(&point_ref(), None, Options::EXCLUDE_CONST),
            "::geo::Point &"
        );

        let int = MetaType::new(Rc::new(TypeEntry::cpp_primitive("int")))
            .with_const(true)
            .with_reference(ReferenceType::LValueReference);
        assert_eq!(
            translate_type(&int, None, Options::EXCLUDE_CONST | Options::EXCLUDE_REFERENCE),
            "int"
        );

        let array = MetaType::array_of(MetaType::new(Rc::new(TypeEntry::cpp_primitive("double"))), None);
        assert_eq!(translate_type(&array, None, Options::empty()), "double[]");
    }

    #[test]
    fn test_translate_roundtrip_without_modifiers() {
        let vector = Rc::new(TypeEntry::new(
            "std::vector",
            TypeEntryKind::Container {
                kind: ContainerKind::List,
            },
        ));
        let ty = MetaType::new(vector)
            .with_const(true)
            .with_reference(ReferenceType::LValueReference)
            .with_instantiations(vec![point_ref().with_const(false).with_reference(ReferenceType::NoReference)]);

        let translated = translate_type(&ty, None, Options::EXCLUDE_CONST | Options::EXCLUDE_REFERENCE);
        let rederived = ty
            .clone()
            .with_const(false)
            .with_reference(ReferenceType::NoReference);
        assert_eq!(translated, format!("::{}", rederived.cpp_signature()));
        assert_eq!(translated, "::std::vector<geo::Point>");
    }

    #[test]
    fn test_translate_generic_context() {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str("package = \"m\"\n[[object-type]]\nname = \"Box\"\ngeneric-class = true\n")
            .unwrap();
        let model = CodeModel::from_json_str(r#"{ "classes": [{ "name": "Box" }] }"#).unwrap();
        let api = ApiBuilder::new(&db).build(&model).unwrap();
        let class = api.find_class("Box").unwrap();

        let param = Rc::new(TypeEntry::new("T", TypeEntryKind::TemplateArgument { ordinal: 0 }));
        let mut ty = MetaType::new(param);
        ty.set_original_template_type(Some(MetaType::new(Rc::new(TypeEntry::object_type("Base"))).with_indirections(1)));
        assert_eq!(translate_type(&ty, Some(class), Options::empty()), "Base *");
        assert_eq!(translate_type(&ty, None, Options::empty()), "T");
    }

    #[test]
    fn test_full_type_names() {
        let widget = MetaType::new(Rc::new(TypeEntry::object_type("ui::Widget"))).with_indirections(1);
        assert_eq!(full_type_name(&widget), "::ui::Widget*");
        assert_eq!(full_type_name(&MetaType::void().with_indirections(1)), "void*");
        assert_eq!(full_type_name_without_modifiers(&point_ref()), "::geo::Point");
        assert_eq!(full_type_name_entry(&TypeEntry::cpp_primitive("int")), "int");
        assert_eq!(filtered_cpp_signature(&point_ref()), "const_geo_Point__");
    }

    #[test]
    fn test_target_names() {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(
            r#"
package = "sample"
[[namespace-type]]
name = "geo"
[[namespace-type]]
name = "geo::detail"
visible = "no"
[[value-type]]
name = "geo::detail::Point"
[[enum-type]]
name = "geo::detail::Point::Axis"
"#,
        )
        .unwrap();
        let model = CodeModel::from_json_str(
            r#"{ "namespaces": [{ "name": "geo", "namespaces": [{ "name": "detail",
                "classes": [{ "name": "Point", "enums": [{ "name": "Axis" }] }] }] }] }"#,
        )
        .unwrap();
        let api = ApiBuilder::new(&db).build(&model).unwrap();
        let point = api.find_class("geo::detail::Point").unwrap();
        assert_eq!(class_target_full_name(&api, point, false), "geo.Point");
        assert_eq!(class_target_full_name(&api, point, true), "sample.geo.Point");
        assert_eq!(enum_target_full_name(&api, &point.enums()[0], true), "sample.geo.Point.Axis");
    }
}
