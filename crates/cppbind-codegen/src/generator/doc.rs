//! reStructuredText reference pages, one per class plus an `index.rst`.

use crate::codemodel::Access;
use crate::error::GeneratorError;
use crate::model::{FunctionKind, MetaClass, MetaEnumValue, MetaFunction};
use crate::naming::package_sub_directory;
use crate::signature::{Options, class_target_full_name, function_signature, translate_type};

use super::{Generator, GeneratorContext, Session, module_entry_points, module_enums};

/// Generates the documentation-only output set.
#[derive(Debug, Default)]
pub struct DocGenerator {
    pages: Vec<String>,
}

impl DocGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

fn heading(out: &mut String, title: &str, underline: char) {
    out.push_str(title);
    out.push('\n');
    out.extend(std::iter::repeat_n(underline, title.chars().count()));
    out.push_str("\n\n");
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    heading(out, title, '=');
    for item in items {
        out.push_str(&format!("* {item}\n"));
    }
    out.push('\n');
}

fn enum_value(value: &MetaEnumValue) -> String {
    match &value.value {
        Some(number) => format!("``{} = {number}``", value.name),
        None => format!("``{}``", value.name),
    }
}

fn documented(function: &MetaFunction) -> bool {
    function.access() == Access::Public
        && matches!(
            function.kind(),
            FunctionKind::Normal | FunctionKind::Operator | FunctionKind::ConversionOperator
        )
}

impl Generator for DocGenerator {
    fn name(&self) -> &'static str {
        "doc"
    }

    fn file_name_suffix(&self) -> &'static str {
        ".rst"
    }

    fn file_name_for_context(&self, session: &Session<'_>, context: &GeneratorContext<'_>) -> String {
        match context {
            GeneratorContext::SmartPointer { .. } => String::new(),
            _ => format!(
                "{}{}",
                class_target_full_name(session.api(), context.class(), false),
                self.file_name_suffix()
            ),
        }
    }

    fn generate_class(
        &mut self,
        session: &Session<'_>,
        out: &mut String,
        context: &GeneratorContext<'_>,
    ) -> Result<(), GeneratorError> {
        let class: &MetaClass = context.class();
        let title = class_target_full_name(session.api(), class, false);
        let package = match class.package() {
            "" => session.package_name(),
            package => package,
        };

        out.push_str(&format!(".. currentmodule:: {package}\n\n"));
        heading(out, &title, '*');
        let qualified = class.qualified_cpp_name();
        if class.is_namespace() {
            out.push_str(&format!(".. module:: {title}\n\n   Wraps the C++ namespace ``{qualified}``.\n\n"));
        } else {
            out.push_str(&format!(".. class:: {title}\n\n   Wraps the C++ class ``{qualified}``.\n"));
            if !class.base_classes().is_empty() {
                let bases: Vec<_> = class.base_classes().iter().map(|b| format!("``{b}``")).collect();
                out.push_str(&format!("   Inherits {}.\n", bases.join(", ")));
            }
            out.push('\n');
        }

        let constructors: Vec<_> = class
            .constructors()
            .filter(|f| f.is_public())
            .map(|f| format!("``{}``", function_signature(f, Some(class), Options::empty())))
            .collect();
        section(out, "Constructors", &constructors);

        let methods: Vec<_> = class
            .functions()
            .iter()
            .filter(|f| documented(f))
            .map(|f| {
                let signature = function_signature(f, Some(class), Options::empty());
                let static_prefix = if f.is_static() { "static " } else { "" };
                if f.is_user_added() {
                    format!("``{static_prefix}{signature}`` (added)")
                } else {
                    format!("``{static_prefix}{signature}``")
                }
            })
            .collect();
        section(out, "Methods", &methods);

        let fields: Vec<_> = class
            .fields()
            .iter()
            .filter(|f| f.access == Access::Public)
            .map(|f| format!("``{} {}``", translate_type(&f.ty, Some(class), Options::empty()), f.name))
            .collect();
        section(out, "Fields", &fields);

        for meta_enum in class.enums() {
            let values: Vec<_> = meta_enum.values().iter().map(enum_value).collect();
            section(out, &format!("Enum {}", meta_enum.name()), &values);
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        self.pages.push(title);
        Ok(())
    }

    fn finish_generation(&mut self, session: &Session<'_>) -> Result<(), GeneratorError> {
        self.pages.sort();
        self.pages.dedup();

        let mut out = String::new();
        heading(&mut out, session.package_name(), '*');
        out.push_str(".. toctree::\n   :maxdepth: 1\n\n");
        for page in &self.pages {
            out.push_str(&format!("   {page}\n"));
        }

        let functions: Vec<_> = module_entry_points(session)
            .into_iter()
            .map(|(owner, function, _)| format!("``{}``", function_signature(function, owner, Options::empty())))
            .collect();
        if !functions.is_empty() {
            out.push('\n');
            section(&mut out, "Functions", &functions);
        }
        for meta_enum in module_enums(session) {
            let values: Vec<_> = meta_enum.values().iter().map(enum_value).collect();
            if !out.ends_with("\n\n") {
                out.push('\n');
            }
            section(&mut out, &format!("Enum {}", meta_enum.name()), &values);
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        session.write_file(package_sub_directory(session.package_name()).join("index.rst"), &out)?;
        Ok(())
    }
}
