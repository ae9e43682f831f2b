//! Experimental Dart FFI bindings on top of the C glue layer.
//!
//! Each class becomes a Dart class holding the native pointer in `_handle`;
//! every entry point of [`super::WrapperGenerator`] is looked up by symbol
//! name. Types that `dart:ffi` cannot express are skipped with a comment.
//! Containers are not bound yet.

use heck::ToUpperCamelCase;

use crate::error::GeneratorError;
use crate::model::{MetaClass, MetaEnum, MetaFunction, MetaType};
use crate::naming::{class_file_base, package_sub_directory};

use super::wrapper::{Passing, argument_name};
use super::{
    Generator, GeneratorContext, Session, entry_points, module_entry_points, module_enums,
    smart_pointer_symbol_prefix, write_license,
};

/// `(native type, Dart type)` of a value crossing the C boundary.
fn ffi_types(ty: &MetaType) -> Option<(&'static str, &'static str)> {
    let types = match Passing::of(ty) {
        Passing::Void => ("Void", "void"),
        Passing::Enum => ("Int32", "int"),
        Passing::Pointer | Passing::Value | Passing::Reference => ("Pointer<Void>", "Pointer<Void>"),
        Passing::Scalar => match ty.type_entry().qualified_cpp_name() {
            "bool" => ("Bool", "bool"),
            "char" | "signed char" => ("Int8", "int"),
            "unsigned char" => ("Uint8", "int"),
            "short" => ("Int16", "int"),
            "unsigned short" => ("Uint16", "int"),
            "int" => ("Int32", "int"),
            "unsigned int" | "unsigned" => ("Uint32", "int"),
            "long" => ("Long", "int"),
            "unsigned long" => ("UnsignedLong", "int"),
            "long long" => ("Int64", "int"),
            "unsigned long long" => ("Uint64", "int"),
            "float" => ("Float", "double"),
            "double" => ("Double", "double"),
            _ => return None,
        },
    };
    Some(types)
}

struct Binding {
    native: String,
    dart: String,
    parameters: Vec<String>,
    arguments: Vec<String>,
    returns: &'static str,
}

/// The lookup signatures of an entry point, `Err` naming the first type
/// without an FFI equivalent.
fn binding(function: &MetaFunction, with_self: bool) -> Result<Binding, String> {
    let unsupported = |ty: &MetaType| ty.cpp_signature();
    let (native_return, dart_return) = if function.is_constructor() {
        ("Pointer<Void>", "Pointer<Void>")
    } else {
        ffi_types(function.return_type()).ok_or_else(|| unsupported(function.return_type()))?
    };

    let mut native = Vec::new();
    let mut dart = Vec::new();
    let mut parameters = Vec::new();
    let mut arguments = Vec::new();
    if with_self {
        native.push("Pointer<Void>");
        dart.push("Pointer<Void>");
        arguments.push("_handle".to_string());
    }
    for argument in function.visible_arguments() {
        let (n, d) = ffi_types(argument.ty()).ok_or_else(|| unsupported(argument.ty()))?;
        let name = argument_name(argument);
        native.push(n);
        dart.push(d);
        parameters.push(format!("{d} {name}"));
        arguments.push(name);
    }
    Ok(Binding {
        native: format!("{native_return} Function({})", native.join(", ")),
        dart: format!("{dart_return} Function({})", dart.join(", ")),
        parameters,
        arguments,
        returns: dart_return,
    })
}

/// Generates the experimental Dart set.
#[derive(Debug, Default)]
pub struct DartGenerator {
    files: Vec<String>,
}

impl DartGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn library(session: &Session<'_>) -> String {
        format!("{}Library", session.module_name())
    }

    fn write_lookup(out: &mut String, library: &str, name: &str, binding: &Binding, symbol: &str) {
        out.push_str(&format!(
            "  static final _{name} = {library}.lookupFunction<{}, {}>('{symbol}');\n",
            binding.native, binding.dart
        ));
    }

    fn write_class(&self, session: &Session<'_>, out: &mut String, class: &MetaClass) {
        let library = Self::library(session);
        let dart_class = class.name();
        let prefix = format!("{}_{}", session.module_name(), class_file_base(class.qualified_cpp_name()));
        let instances = !class.is_namespace();

        if instances {
            out.push_str(&format!("final class {dart_class} {{\n  final Pointer<Void> _handle;\n\n  {dart_class}._(this._handle);\n"));
        } else {
            out.push_str(&format!("abstract final class {dart_class} {{\n"));
        }

        for (function, name) in entry_points(class) {
            let with_self = instances && !function.is_constructor() && !function.is_static();
            let binding = match binding(function, with_self) {
                Ok(binding) => binding,
                Err(ty) => {
                    let qualified = class.qualified_cpp_name();
                    log::debug!("Dart: skipping {qualified}::{}: unsupported type {ty}", function.name());
                    out.push_str(&format!("\n  // Skipped {}: unsupported type {ty}\n", function.signature()));
                    continue;
                }
            };
            out.push('\n');
            Self::write_lookup(out, &library, &name, &binding, &format!("{prefix}_{name}"));

            let parameters = binding.parameters.join(", ");
            let call = format!("_{name}({})", binding.arguments.join(", "));
            if function.is_constructor() {
                let constructor = if name == "new" {
                    dart_class.to_string()
                } else {
                    format!("{dart_class}.{name}")
                };
                out.push_str(&format!("  factory {constructor}({parameters}) => {dart_class}._({call});\n"));
            } else {
                let modifier = if with_self { "" } else { "static " };
                out.push_str(&format!("  {modifier}{} {name}({parameters}) => {call};\n", binding.returns));
            }
        }

        if instances && !class.has_private_destructor() {
            out.push('\n');
            out.push_str(&format!(
                "  static final _delete = {library}.lookupFunction<Void Function(Pointer<Void>), void Function(Pointer<Void>)>('{prefix}_delete');\n"
            ));
            out.push_str("  void dispose() => _delete(_handle);\n");
        }
        out.push_str("}\n");

        for meta_enum in class.enums() {
            out.push('\n');
            write_enum(out, &format!("{dart_class}{}", meta_enum.name()), meta_enum);
        }
    }

    fn write_smart_pointer(&self, session: &Session<'_>, out: &mut String, class: &MetaClass, ty: &MetaType) {
        let library = Self::library(session);
        let prefix = smart_pointer_symbol_prefix(session, class, ty);
        let pointee = ty.instantiations().first().map(MetaType::name).unwrap_or("Void");
        let dart_class = format!("{}{pointee}", class.name().to_upper_camel_case());

        out.push_str(&format!("/// {}\n", ty.cpp_signature()));
        out.push_str(&format!("final class {dart_class} {{\n  final Pointer<Void> _handle;\n\n  {dart_class}._(this._handle);\n\n"));
        if let Some(getter) = class.type_entry().smart_pointer_getter() {
            out.push_str(&format!(
                "  static final _{getter} = {library}.lookupFunction<Pointer<Void> Function(Pointer<Void>), Pointer<Void> Function(Pointer<Void>)>('{prefix}_{getter}');\n"
            ));
            out.push_str(&format!("  Pointer<Void> {getter}() => _{getter}(_handle);\n\n"));
        }
        out.push_str(&format!(
            "  static final _delete = {library}.lookupFunction<Void Function(Pointer<Void>), void Function(Pointer<Void>)>('{prefix}_delete');\n"
        ));
        out.push_str("  void dispose() => _delete(_handle);\n}\n");
    }
}

fn write_enum(out: &mut String, name: &str, meta_enum: &MetaEnum) {
    out.push_str(&format!("abstract final class {name} {{\n"));
    let mut next = 0i64;
    for value in meta_enum.values() {
        let parsed = match &value.value {
            Some(text) => text.trim().parse::<i64>().ok(),
            None => Some(next),
        };
        match parsed {
            Some(number) => {
                out.push_str(&format!("  static const int {} = {number};\n", value.name));
                next = number + 1;
            }
            // Expressions such as `A | B` are left to the reader.
            None => out.push_str(&format!(
                "  // {} = {}\n",
                value.name,
                value.value.as_deref().unwrap_or_default()
            )),
        }
    }
    out.push_str("}\n");
}

impl Generator for DartGenerator {
    fn name(&self) -> &'static str {
        "dart"
    }

    fn file_name_suffix(&self) -> &'static str {
        ".dart"
    }

    fn generate_class(
        &mut self,
        session: &Session<'_>,
        out: &mut String,
        context: &GeneratorContext<'_>,
    ) -> Result<(), GeneratorError> {
        let class = context.class();
        write_license(out, session.license_comment());
        out.push_str("import 'dart:ffi';\n\n");
        out.push_str(&format!("import '{}_bindings.dart';\n\n", session.module_name()));
        match context {
            GeneratorContext::SmartPointer { ty, .. } => self.write_smart_pointer(session, out, class, ty),
            _ => self.write_class(session, out, class),
        }
        self.files.push(self.file_name_for_context(session, context));
        Ok(())
    }

    fn finish_generation(&mut self, session: &Session<'_>) -> Result<(), GeneratorError> {
        let module = session.module_name();
        let mut out = String::new();
        write_license(&mut out, session.license_comment());
        out.push_str("import 'dart:ffi';\n\n");
        for file in &self.files {
            out.push_str(&format!("export '{file}';\n"));
        }
        if !self.files.is_empty() {
            out.push('\n');
        }
        let library = Self::library(session);
        out.push_str(&format!("final DynamicLibrary {library} = DynamicLibrary.open('lib{module}.so');\n"));

        for (_, function, name) in module_entry_points(session) {
            out.push('\n');
            let binding = match binding(function, false) {
                Ok(binding) => binding,
                Err(ty) => {
                    out.push_str(&format!("// Skipped {}: unsupported type {ty}\n", function.signature()));
                    continue;
                }
            };
            out.push_str(&format!(
                "final _{name} = {library}.lookupFunction<{}, {}>('{module}_{name}');\n",
                binding.native, binding.dart
            ));
            out.push_str(&format!(
                "{} {name}({}) => _{name}({});\n",
                binding.returns,
                binding.parameters.join(", "),
                binding.arguments.join(", ")
            ));
        }

        for meta_enum in module_enums(session) {
            out.push('\n');
            write_enum(&mut out, meta_enum.name(), meta_enum);
        }

        let path = package_sub_directory(session.package_name()).join(format!("{module}_bindings.dart"));
        session.write_file(path, &out)?;
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

    const RULES: &str = r#"
package = "geo"

[[primitive-type]]
name = "Text"

[[enum-type]]
name = "Mode"

[[smart-pointer-type]]
name = "std::shared_ptr"
getter = "get"

[[value-type]]
name = "Point"

[[enum-type]]
name = "Point::Axis"

[[function]]
name = "version"
"#;

    const MODEL: &str = r#"{
        "functions": [{ "name": "version", "returnType": "int" }],
        "enums": [{ "name": "Mode", "values": [{ "name": "Fast", "value": "4" }, { "name": "Slow" }, { "name": "Both", "value": "Fast | Slow" }] }],
        "namespaces": [{ "name": "std", "classes": [{ "name": "shared_ptr", "templateParameters": ["T"] }] }],
        "classes": [{ "name": "Point",
            "functions": [
                { "name": "Point", "arguments": [{ "name": "x", "type": "int" }, { "name": "y", "type": "int" }] },
                { "name": "Point", "arguments": [{ "name": "other", "type": "const Point &" }] },
                { "name": "x", "returnType": "int", "isConstant": true },
                { "name": "contains", "returnType": "bool", "arguments": [{ "name": "p", "type": "const Point &" }] },
                { "name": "origin", "returnType": "Point", "isStatic": true },
                { "name": "label", "returnType": "Text" },
                { "name": "shared", "returnType": "std::shared_ptr<Point>" }
            ],
            "enums": [{ "name": "Axis", "values": [{ "name": "X" }, { "name": "Y" }] }]
        }]
    }"#;

    fn generate() -> tempfile::TempDir {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(RULES).unwrap();
        let model = CodeModel::from_json_str(MODEL).unwrap();
        let api = ApiBuilder::new(&db).build(&model).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig {
            output_directory: dir.path().to_path_buf(),
            ..DriverConfig::default()
        };
        let mut driver = GeneratorDriver::new(&db, Box::new(DartGenerator::new()), config);
        assert!(driver.setup(&api));
        assert!(driver.generate());
        dir
    }

    #[test]
    fn test_class_bindings() {
        let dir = generate();
        let point = fs::read_to_string(dir.path().join("geo").join("point.dart")).unwrap();
        assert!(point.contains("import 'geo_bindings.dart';\n"));
        assert!(point.contains(
            "  static final _new = geoLibrary.lookupFunction<Pointer<Void> Function(Int32, Int32), Pointer<Void> Function(int, int)>('geo_point_new');\n  factory Point(int x, int y) => Point._(_new(x, y));\n"
        ));
        assert!(point.contains("  factory Point.new_1(Pointer<Void> other) => Point._(_new_1(other));\n"));
        assert!(point.contains(
            "  static final _x = geoLibrary.lookupFunction<Int32 Function(Pointer<Void>), int Function(Pointer<Void>)>('geo_point_x');\n  int x() => _x(_handle);\n"
        ));
        assert!(point.contains("  bool contains(Pointer<Void> p) => _contains(_handle, p);\n"));
        assert!(point.contains("  static Pointer<Void> origin() => _origin();\n"));
        assert!(point.contains("  // Skipped label(): unsupported type Text\n"));
        assert!(point.contains("  void dispose() => _delete(_handle);\n"));
        assert!(point.ends_with(
            "abstract final class PointAxis {\n  static const int X = 0;\n  static const int Y = 1;\n}\n"
        ));
    }

    #[test]
    fn test_module_library() {
        let dir = generate();
        let shared = fs::read_to_string(dir.path().join("geo").join("std_shared_ptr_point.dart")).unwrap();
        assert!(shared.contains("final class SharedPtrPoint {\n"));
        assert!(shared.contains("('geo_std_shared_ptr_point_get');\n  Pointer<Void> get() => _get(_handle);\n"));

        let library = fs::read_to_string(dir.path().join("geo").join("geo_bindings.dart")).unwrap();
        assert!(library.contains("export 'point.dart';\nexport 'std_shared_ptr_point.dart';\n"));
        assert!(library.contains("final DynamicLibrary geoLibrary = DynamicLibrary.open('libgeo.so');\n"));
        assert!(library.contains(
            "final _version = geoLibrary.lookupFunction<Int32 Function(), int Function()>('geo_version');\nint version() => _version();\n"
        ));
        assert!(library.ends_with(
            "abstract final class Mode {\n  static const int Fast = 4;\n  static const int Slow = 5;\n  // Both = Fast | Slow\n}\n"
        ));
    }

}
