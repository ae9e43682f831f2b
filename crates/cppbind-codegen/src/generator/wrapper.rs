//! C++ glue sources.
//!
//! Every generated class gets a `<class>_wrapper.cpp` holding `extern "C"`
//! entry points for its bindable functions. Polymorphic object types are
//! subclassed by a wrapper whose virtual overrides dispatch to host-provided
//! callbacks first. The module file `<module>_module_wrapper.cpp` carries
//! global functions and the container instantiations.

use crate::codemodel::ReferenceType;
use crate::error::GeneratorError;
use crate::minimal::minimal_constructor;
use crate::model::{FunctionKind, MetaArgument, MetaClass, MetaFunction, MetaType, TypeUsagePattern};
use crate::naming::{class_file_base, package_sub_directory};
use crate::signature::{
    Options, full_class_name, full_type_name_without_modifiers, translate_type, type_target_full_name,
};
use crate::types::{ContainerKind, TypeEntryKind};

use super::{
    Generator, GeneratorContext, OptionDescription, Session, entry_points, module_entry_points,
    smart_pointer_symbol_prefix, virtual_overrides, wrapped_context, write_license,
};

const VERBOSE_ERRORS_OPTION: &str = "disable-verbose-error-messages";

/// How a C++ type crosses the `extern "C"` boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Passing {
    Void,
    /// Primitives by value.
    Scalar,
    /// Enums and flags as `int`.
    Enum,
    Pointer,
    /// Values are copied to and from the heap.
    Value,
    /// References become pointers.
    Reference,
}

impl Passing {
    pub(crate) fn of(ty: &MetaType) -> Self {
        match ty.usage_pattern() {
            TypeUsagePattern::Void => Passing::Void,
            TypeUsagePattern::Primitive => Passing::Scalar,
            TypeUsagePattern::Enum | TypeUsagePattern::Flags => Passing::Enum,
            TypeUsagePattern::NativePointer | TypeUsagePattern::ValuePointer if ty.indirections() == 0 => {
                Passing::Reference
            }
            TypeUsagePattern::Array
            | TypeUsagePattern::TemplateArgument
            | TypeUsagePattern::NativePointer
            | TypeUsagePattern::ValuePointer => Passing::Pointer,
            TypeUsagePattern::Object if ty.indirections() > 0 => Passing::Pointer,
            TypeUsagePattern::Object => Passing::Reference,
            TypeUsagePattern::Value | TypeUsagePattern::Container | TypeUsagePattern::SmartPointer => {
                if ty.reference_type() == ReferenceType::NoReference {
                    Passing::Value
                } else {
                    Passing::Reference
                }
            }
        }
    }
}

fn const_prefix(ty: &MetaType) -> &'static str {
    if ty.is_const() { "const " } else { "" }
}

/// The C-side spelling of a type, e.g. `const ::geo::Point *` for `const geo::Point &`.
pub(crate) fn c_type(ty: &MetaType) -> String {
    match Passing::of(ty) {
        Passing::Void => "void".to_string(),
        Passing::Scalar => translate_type(ty, None, Options::EXCLUDE_CONST | Options::EXCLUDE_REFERENCE),
        Passing::Enum => "int".to_string(),
        Passing::Pointer => match ty.array_element() {
            Some(element) => format!("{} *", full_type_name_without_modifiers(element)),
            None => format!(
                "{}{} {}",
                const_prefix(ty),
                full_type_name_without_modifiers(ty),
                "*".repeat(ty.indirections())
            ),
        },
        Passing::Value => format!("{} *", full_type_name_without_modifiers(ty)),
        Passing::Reference => format!("{}{} *", const_prefix(ty), full_type_name_without_modifiers(ty)),
    }
}

/// `int x`, but `::Foo *self` without a space after the star.
pub(crate) fn declaration(ty: &str, name: &str) -> String {
    if ty.ends_with('*') || ty.ends_with('&') {
        format!("{ty}{name}")
    } else {
        format!("{ty} {name}")
    }
}

pub(crate) fn argument_name(argument: &MetaArgument) -> String {
    if argument.name().is_empty() {
        format!("arg{}", argument.index())
    } else {
        argument.name().to_string()
    }
}

fn call_argument(ty: &MetaType, name: &str) -> String {
    match Passing::of(ty) {
        Passing::Void | Passing::Scalar | Passing::Pointer => name.to_string(),
        Passing::Enum => format!("static_cast<{}>({name})", full_type_name_without_modifiers(ty)),
        Passing::Value | Passing::Reference => format!("*{name}"),
    }
}

fn return_statement(ty: &MetaType, call: &str) -> String {
    match Passing::of(ty) {
        Passing::Void => format!("    {call};\n"),
        Passing::Scalar | Passing::Pointer => format!("    return {call};\n"),
        Passing::Enum => format!("    return static_cast<int>({call});\n"),
        Passing::Value => format!("    return new {}({call});\n", full_type_name_without_modifiers(ty)),
        Passing::Reference => format!("    return &{call};\n"),
    }
}

/// Generates the C++ glue source files.
#[derive(Debug)]
pub struct WrapperGenerator {
    verbose_errors: bool,
}

impl Default for WrapperGenerator {
    fn default() -> Self {
        Self { verbose_errors: true }
    }
}

impl WrapperGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The expressions passed for each argument, filling removed ones with
    /// their default value or a minimal constructor.
    fn call_arguments(&self, session: &Session<'_>, function: &MetaFunction) -> Result<Vec<String>, String> {
        let mut arguments = Vec::new();
        for argument in function.arguments() {
            if !argument.is_removed() {
                arguments.push(call_argument(argument.ty(), &argument_name(argument)));
                continue;
            }
            if let Some(expression) = argument.default_value_expression() {
                arguments.push(expression.to_string());
                continue;
            }
            let value = minimal_constructor(session.api(), argument.ty()).map_err(|err| {
                format!("removed argument '{}' has no default value: {err}", argument_name(argument))
            })?;
            arguments.push(value.constructor_parameter());
        }
        Ok(arguments)
    }

    fn write_entry_point(
        &self,
        session: &Session<'_>,
        out: &mut String,
        class: Option<&MetaClass>,
        wrapper: Option<&str>,
        function: &MetaFunction,
        symbol: &str,
    ) {
        let arguments = match self.call_arguments(session, function) {
            Ok(arguments) => arguments,
            Err(message) => {
                log::warn!("Skipping entry point for '{}': {message}", function.signature());
                out.push_str(&format!("// Skipped {}: {message}\n\n", function.signature()));
                return;
            }
        };

        let mut parameters = Vec::new();
        let (return_type, body) = match class {
            Some(class) if function.is_constructor() => {
                let target = match (wrapper, function.kind()) {
                    (Some(wrapper), FunctionKind::Constructor) => wrapper.to_string(),
                    _ => full_class_name(class),
                };
                (
                    format!("{} *", full_class_name(class)),
                    format!("    return new {target}({});\n", arguments.join(", ")),
                )
            }
            _ => {
                let callee = match class {
                    Some(class) if !class.is_namespace() && !function.is_static() => {
                        let self_type = format!(
                            "{}{} *",
                            if function.is_constant() { "const " } else { "" },
                            full_class_name(class)
                        );
                        parameters.push(declaration(&self_type, "self"));
                        format!("self->{}", function.name())
                    }
                    Some(class) => format!("{}::{}", full_class_name(class), function.name()),
                    None => format!("::{}", function.name()),
                };
                let call = format!("{callee}({})", arguments.join(", "));
                (c_type(function.return_type()), return_statement(function.return_type(), &call))
            }
        };
        parameters.extend(
            function
                .visible_arguments()
                .map(|a| declaration(&c_type(a.ty()), &argument_name(a))),
        );

        out.push_str(&format!(
            "extern \"C\" {}({})\n{{\n{body}}}\n\n",
            declaration(&return_type, symbol),
            parameters.join(", ")
        ));
    }

    fn write_class(&self, session: &Session<'_>, out: &mut String, class: &MetaClass, wrapper: Option<&str>) {
        if let Some(wrapper) = wrapper {
            self.write_wrapper_definitions(session, out, class, wrapper);
        }
        if !class.template_arguments().is_empty() {
            out.push_str("// Template class: entry points are generated per instantiation.\n");
            return;
        }

        let prefix = format!("{}_{}", session.module_name(), class_file_base(class.qualified_cpp_name()));
        for (function, name) in entry_points(class) {
            self.write_entry_point(session, out, Some(class), wrapper, function, &format!("{prefix}_{name}"));
        }
        if !class.is_namespace() && !class.has_private_destructor() {
            out.push_str(&format!(
                "extern \"C\" void {prefix}_delete({})\n{{\n    delete self;\n}}\n\n",
                declaration(&format!("{} *", full_class_name(class)), "self")
            ));
        }
    }

    fn write_wrapper_definitions(&self, session: &Session<'_>, out: &mut String, class: &MetaClass, wrapper: &str) {
        for (function, name) in virtual_overrides(class) {
            let return_type = function.return_type();
            let parameters: Vec<_> = function
                .arguments()
                .iter()
                .map(|a| declaration(&translate_type(a.ty(), Some(class), Options::empty()), &argument_name(a)))
                .collect();
            let names: Vec<_> = function.arguments().iter().map(argument_name).collect();
            let hook_arguments: Vec<_> = std::iter::once("this".to_string()).chain(names.iter().cloned()).collect();
            let returns_void = return_type.is_void();

            out.push_str(&format!(
                "{} {wrapper}::{}({}){}\n{{\n",
                translate_type(return_type, Some(class), Options::empty()),
                function.name(),
                parameters.join(", "),
                if function.is_constant() { " const" } else { "" }
            ));
            if returns_void {
                out.push_str(&format!(
                    "    if ({name}_override != nullptr) {{\n        {name}_override({});\n        return;\n    }}\n",
                    hook_arguments.join(", ")
                ));
            } else {
                out.push_str(&format!(
                    "    if ({name}_override != nullptr)\n        return {name}_override({});\n",
                    hook_arguments.join(", ")
                ));
            }

            if !function.is_abstract() {
                let call = format!("this->{}::{}({})", full_class_name(class), function.name(), names.join(", "));
                if returns_void {
                    out.push_str(&format!("    {call};\n"));
                } else {
                    out.push_str(&format!("    return {call};\n"));
                }
            } else if !returns_void {
                // Nothing to fall back on: hand back a placeholder value.
                match minimal_constructor(session.api(), return_type) {
                    Ok(value) => out.push_str(&format!("    return {};\n", value.return_value())),
                    Err(err) => {
                        log::warn!(
                            "Cannot generate a default return value for {}::{}: {err}",
                            class.qualified_cpp_name(),
                            function.name()
                        );
                        if self.verbose_errors {
                            out.push_str(&format!("#error {err}\n"));
                        } else {
                            out.push_str("#error No default return value\n");
                        }
                    }
                }
            }
            out.push_str("}\n\n");
        }
    }

    fn write_smart_pointer(&self, session: &Session<'_>, out: &mut String, class: &MetaClass, ty: &MetaType) {
        let prefix = smart_pointer_symbol_prefix(session, class, ty);
        let full = full_type_name_without_modifiers(ty);
        out.push_str(&format!("// {}\n\n", ty.cpp_signature()));

        if let TypeEntryKind::SmartPointer {
            getter,
            ref_count_method,
        } = class.type_entry().kind()
        {
            let pointee = ty
                .instantiations()
                .first()
                .map(|p| format!("{} *", full_type_name_without_modifiers(p)))
                .unwrap_or_else(|| "void *".to_string());
            out.push_str(&format!(
                "extern \"C\" {}(const {full} *self)\n{{\n    return self->{getter}();\n}}\n\n",
                declaration(&pointee, &format!("{prefix}_{getter}"))
            ));
            if let Some(method) = ref_count_method {
                out.push_str(&format!(
                    "extern \"C\" long {prefix}_{method}(const {full} *self)\n{{\n    return static_cast<long>(self->{method}());\n}}\n\n"
                ));
            }
        }
        out.push_str(&format!(
            "extern \"C\" void {prefix}_delete({full} *self)\n{{\n    delete self;\n}}\n\n"
        ));
    }

    fn write_container(&self, session: &Session<'_>, out: &mut String, ty: &MetaType) {
        let prefix = format!("{}_{}", session.module_name(), type_target_full_name(ty, false));
        let full = full_type_name_without_modifiers(ty);
        out.push_str(&format!(
            "extern \"C\" {full} *{prefix}_new()\n{{\n    return new {full}();\n}}\n\n"
        ));
        out.push_str(&format!(
            "extern \"C\" void {prefix}_delete({full} *self)\n{{\n    delete self;\n}}\n\n"
        ));
        if ty.type_entry().container_kind() != Some(ContainerKind::Pair) {
            out.push_str(&format!(
                "extern \"C\" long {prefix}_size(const {full} *self)\n{{\n    return static_cast<long>(self->size());\n}}\n\n"
            ));
        }
    }
}

impl Generator for WrapperGenerator {
    fn name(&self) -> &'static str {
        "wrapper"
    }

    fn options(&self) -> Vec<OptionDescription> {
        vec![OptionDescription {
            key: VERBOSE_ERRORS_OPTION,
            description: "Emit terse #error directives for unresolvable default values",
        }]
    }

    fn handle_option(&mut self, key: &str, _value: &str) -> bool {
        if key == VERBOSE_ERRORS_OPTION {
            self.verbose_errors = false;
            return true;
        }
        false
    }

    fn file_name_suffix(&self) -> &'static str {
        "_wrapper.cpp"
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
        let class = context.class();
        write_license(out, session.license_comment());
        out.push_str(&format!("#include \"{}_bindings.h\"\n", session.module_name()));
        if context.use_wrapper() {
            out.push_str(&format!(
                "#include \"{}_wrapper.h\"\n",
                class_file_base(class.qualified_cpp_name())
            ));
        }
        out.push('\n');

        match context {
            GeneratorContext::SmartPointer { ty, .. } => self.write_smart_pointer(session, out, class, ty),
            _ => self.write_class(session, out, class, context.wrapper_name()),
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(())
    }

    fn finish_generation(&mut self, session: &Session<'_>) -> Result<(), GeneratorError> {
        let mut out = String::new();
        write_license(&mut out, session.license_comment());
        out.push_str(&format!("#include \"{}_bindings.h\"\n\n", session.module_name()));

        for ty in session.instantiated_containers() {
            self.write_container(session, &mut out, ty);
        }
        for (owner, function, name) in module_entry_points(session) {
            let symbol = format!("{}_{name}", session.module_name());
            self.write_entry_point(session, &mut out, owner, None, function, &symbol);
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        let path = package_sub_directory(session.package_name())
            .join(format!("{}_module_wrapper.cpp", session.module_name()));
        session.write_file(path, &out)?;
        Ok(())
    }
}
