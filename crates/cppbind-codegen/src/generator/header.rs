//! C++ glue headers.
//!
//! Declares the wrapper subclasses used by [`super::WrapperGenerator`] and
//! writes the module header `<module>_bindings.h`, which includes the
//! wrapped library headers and enumerates a type index for every generated
//! class, container and smart-pointer instantiation.

use crate::error::GeneratorError;
use crate::model::{MetaClass, MetaType};
use crate::naming::{IdentifierStyle, canonical_identifier, class_file_base, package_sub_directory};
use crate::signature::{Options, filtered_cpp_signature, function_signature, translate_type};

use super::wrapper::{argument_name, declaration};
use super::{Generator, GeneratorContext, Session, virtual_overrides, wrapped_context, write_license};

/// Generates wrapper class declarations and the module header.
#[derive(Debug, Default)]
pub struct HeaderGenerator;

impl HeaderGenerator {
    pub fn new() -> Self {
        Self
    }
}

fn class_index_name(class: &MetaClass) -> String {
    format!(
        "CPPBIND_{}_IDX",
        canonical_identifier(class.qualified_cpp_name(), IdentifierStyle::Compact).to_uppercase()
    )
}

fn type_index_name(ty: &MetaType) -> String {
    format!("CPPBIND_{}IDX", filtered_cpp_signature(ty).to_uppercase())
}

fn write_index_enum(out: &mut String, names: &[String], count_name: &str) {
    out.push_str("enum : int {\n");
    for (index, name) in names.iter().enumerate() {
        out.push_str(&format!("    {name} = {index},\n"));
    }
    out.push_str(&format!("    {count_name} = {}\n}};\n\n", names.len()));
}

impl HeaderGenerator {
    fn write_wrapper_class(&self, session: &Session<'_>, out: &mut String, class: &MetaClass, wrapper: &str) {
        let guard = format!("CPPBIND_{}_WRAPPER_H", class_file_base(class.qualified_cpp_name()).to_uppercase());
        let base = format!("::{}", class.qualified_cpp_name());

        write_license(out, session.license_comment());
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
        out.push_str(&format!("#include \"{}_bindings.h\"\n\n", session.module_name()));
        out.push_str(&format!("class {wrapper} : public {base}\n{{\npublic:\n"));
        out.push_str(&format!("    using {base}::{};\n", class.name()));

        let overrides = virtual_overrides(class);
        if !overrides.is_empty() {
            out.push('\n');
        }
        for (function, _) in &overrides {
            let options = Options::SKIP_DEFAULT_VALUES | Options::VIRTUAL_CALL;
            let signature = function_signature(function, Some(class), options);
            out.push_str(&format!("    {signature};\n"));
        }
        if !overrides.is_empty() {
            out.push('\n');
        }
        for (function, name) in &overrides {
            let self_type = if function.is_constant() {
                format!("const {wrapper} *")
            } else {
                format!("{wrapper} *")
            };
            let parameters: Vec<_> = std::iter::once(declaration(&self_type, "self"))
                .chain(function.arguments().iter().map(|a| {
                    declaration(&translate_type(a.ty(), Some(class), Options::empty()), &argument_name(a))
                }))
                .collect();
            out.push_str(&format!(
                "    {} (*{name}_override)({}) = nullptr;\n",
                translate_type(function.return_type(), Some(class), Options::empty()),
                parameters.join(", ")
            ));
        }
        out.push_str("};\n\n");
        out.push_str(&format!("#endif // {guard}\n"));
    }
}

impl Generator for HeaderGenerator {
    fn name(&self) -> &'static str {
        "header"
    }

    fn file_name_suffix(&self) -> &'static str {
        "_wrapper.h"
    }

    /// Only classes with a wrapper get a header of their own.
    fn file_name_for_context(&self, _session: &Session<'_>, context: &GeneratorContext<'_>) -> String {
        match context {
            GeneratorContext::WrappedClass { class, .. } => {
                format!("{}{}", class_file_base(class.qualified_cpp_name()), self.file_name_suffix())
            }
            _ => String::new(),
        }
    }

    fn context_for_class<'a>(&self, _session: &Session<'_>, class: &'a MetaClass) -> GeneratorContext<'a> {
        wrapped_context(class)
    }

    fn generate_class(
        &mut self,
        session: &Session<'_>,
        out: &mut String,
        context: &GeneratorContext<'_>,
    ) -> Result<(), GeneratorError> {
        let Some(wrapper) = context.wrapper_name() else {
            return Err(GeneratorError::generation(
                self.name(),
                format!("{} has no wrapper class", context.class().qualified_cpp_name()),
            ));
        };
        self.write_wrapper_class(session, out, context.class(), wrapper);
        Ok(())
    }

    fn finish_generation(&mut self, session: &Session<'_>) -> Result<(), GeneratorError> {
        let module = session.module_name();
        let upper = module.to_uppercase();
        let api = session.api();

        let mut public = Vec::new();
        let mut private = Vec::new();
        for class in api.classes() {
            if !self.should_generate(class) || class.is_namespace() {
                continue;
            }
            if class.type_entry().is_private() {
                private.push(class_index_name(class));
            } else {
                public.push(class_index_name(class));
            }
        }
        public.extend(session.instantiated_containers().iter().map(type_index_name));
        public.extend(session.instantiated_smart_pointers().iter().map(type_index_name));

        let guard = format!("CPPBIND_{upper}_BINDINGS_H");
        let mut out = String::new();
        write_license(&mut out, session.license_comment());
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
        for header in api.headers() {
            let name = header.file_name().unwrap_or(header.as_os_str()).to_string_lossy();
            out.push_str(&format!("#include <{name}>\n"));
        }
        if !api.headers().is_empty() {
            out.push('\n');
        }
        write_index_enum(&mut out, &public, &format!("CPPBIND_{upper}_IDX_COUNT"));
        out.push_str(&format!("#endif // {guard}\n"));

        let directory = package_sub_directory(session.package_name());
        session.write_file(directory.join(format!("{module}_bindings.h")), &out)?;

        if session.has_private_classes() {
            let guard = format!("CPPBIND_{upper}_BINDINGS_P_H");
            let mut out = String::new();
            write_license(&mut out, session.license_comment());
            out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
            out.push_str(&format!("#include \"{module}_bindings.h\"\n\n"));
            write_index_enum(&mut out, &private, &format!("CPPBIND_{upper}_PRIVATE_IDX_COUNT"));
            out.push_str(&format!("#endif // {guard}\n"));
            session.write_file(directory.join(format!("{module}_bindings_p.h")), &out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ApiBuilder;
    use crate::codemodel::CodeModel;
    use crate::generator::{DriverConfig, GeneratorDriver};
    use crate::registry::TypeDatabase;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;

    const RULES: &str = r#"
package = "geo"

[[container-type]]
name = "std::vector"
kind = "list"

[[namespace-type]]
name = "geo"

[[value-type]]
name = "geo::Point"

[[object-type]]
name = "geo::Shape"

[[value-type]]
name = "geo::Cache"
private = true
"#;

    const MODEL: &str = r#"{ "namespaces": [{ "name": "geo", "classes": [
        { "name": "Point" },
        { "name": "Shape", "functions": [
            { "name": "Shape" },
            { "name": "area", "returnType": "double", "isPureVirtual": true, "isConstant": true },
            { "name": "resize", "isVirtual": true,
              "arguments": [{ "name": "w", "type": "int" }, { "name": "h", "type": "int", "defaultValue": "1" }] },
            { "name": "outline", "returnType": "std::vector<geo::Point>" }
        ]},
        { "name": "Cache" }
    ]}]}"#;

    fn generate() -> tempfile::TempDir {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(RULES).unwrap();
        let model = CodeModel::from_json_str(MODEL).unwrap();
        let mut api = ApiBuilder::new(&db).build(&model).unwrap();
        api.headers = vec![PathBuf::from("/usr/include/geo/shape.h")];
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig {
            output_directory: dir.path().to_path_buf(),
            ..DriverConfig::default()
        };
        let mut driver = GeneratorDriver::new(&db, Box::new(HeaderGenerator::new()), config);
        assert!(driver.setup(&api));
        assert!(driver.generate());
        dir
    }

    #[test]
    fn test_wrapper_header() {
        let dir = generate();
        let header = fs::read_to_string(dir.path().join("geo").join("geo_shape_wrapper.h")).unwrap();
        assert_eq!(
            header,
            r#"/*
 * Auto-generated by cppbind
 * DO NOT EDIT MANUALLY
 */

#ifndef CPPBIND_GEO_SHAPE_WRAPPER_H
#define CPPBIND_GEO_SHAPE_WRAPPER_H

#include "geo_bindings.h"

class geo_ShapeWrapper : public ::geo::Shape
{
public:
    using ::geo::Shape::Shape;

    double area() const override;
    void resize(int w, int h) override;

    double (*area_override)(const geo_ShapeWrapper *self) = nullptr;
    void (*resize_override)(geo_ShapeWrapper *self, int w, int h) = nullptr;
};

#endif // CPPBIND_GEO_SHAPE_WRAPPER_H
"#
        );
        assert!(!dir.path().join("geo").join("geo_point_wrapper.h").exists());
    }

    #[test]
    fn test_module_header() {
        let dir = generate();
        let header = fs::read_to_string(dir.path().join("geo").join("geo_bindings.h")).unwrap();
        assert!(header.contains("#include <shape.h>\n"));
        assert!(header.contains(
            "enum : int {\n    CPPBIND_GEO_POINT_IDX = 0,\n    CPPBIND_GEO_SHAPE_IDX = 1,\n    CPPBIND_STD_VECTOR_GEO_POINT_IDX = 2,\n    CPPBIND_GEO_IDX_COUNT = 3\n};\n"
        ));
        assert!(!header.contains("CACHE"));

        let private = fs::read_to_string(dir.path().join("geo").join("geo_bindings_p.h")).unwrap();
        assert!(private.contains("    CPPBIND_GEO_CACHE_IDX = 0,\n"));
    }
}
