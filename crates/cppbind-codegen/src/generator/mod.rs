//! Output generators and the driver that runs them.
//!
//! A [`Generator`] turns one [`GeneratorContext`] (a class, a class needing a
//! wrapper, or a smart-pointer instantiation) into the text of one file. The
//! [`GeneratorDriver`] decides which contexts exist, where their files go and
//! in which order they are produced.
//!
//! | Set       | Generators                                  |
//! |-----------|---------------------------------------------|
//! | `default` | [`WrapperGenerator`], [`HeaderGenerator`]   |
//! | `doc`     | [`DocGenerator`]                            |
//! | `dart`    | [`DartGenerator`] (experimental)            |

mod dart;
mod doc;
mod fileout;
mod header;
mod wrapper;

use std::path::{Path, PathBuf};

pub use dart::DartGenerator;
pub use doc::DocGenerator;
pub use fileout::{FileOut, FileOutOptions, FileOutState};
pub use header::HeaderGenerator;
pub use wrapper::WrapperGenerator;

use crate::error::GeneratorError;
use crate::instantiations::Instantiations;
use crate::model::{
    ApiExtractorResult, ClassId, FunctionKind, MetaArgument, MetaClass, MetaEnum, MetaFunction, MetaType,
};
use crate::naming::{
    IdentifierStyle, canonical_identifier, class_file_base, module_name, operator_name,
    package_sub_directory, smart_pointer_file_base,
};
use crate::registry::TypeDatabase;

/// A generator-specific command line option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDescription {
    pub key: &'static str,
    pub description: &'static str,
}

/// The output unit currently being generated.
#[derive(Debug, Clone)]
pub enum GeneratorContext<'a> {
    Class(&'a MetaClass),
    /// A class that gets a C++ subclass overriding its virtual functions.
    WrappedClass {
        class: &'a MetaClass,
        wrapper_name: String,
    },
    SmartPointer {
        class: &'a MetaClass,
        /// The canonical instantiation, e.g. `std::shared_ptr<Foo>`.
        ty: MetaType,
        pointee: Option<&'a MetaClass>,
    },
}

impl<'a> GeneratorContext<'a> {
    pub fn class(&self) -> &'a MetaClass {
        match self {
            GeneratorContext::Class(class)
            | GeneratorContext::WrappedClass { class, .. }
            | GeneratorContext::SmartPointer { class, .. } => class,
        }
    }

    pub fn for_smart_pointer(&self) -> bool {
        matches!(self, GeneratorContext::SmartPointer { .. })
    }

    pub fn use_wrapper(&self) -> bool {
        matches!(self, GeneratorContext::WrappedClass { .. })
    }

    pub fn wrapper_name(&self) -> Option<&str> {
        match self {
            GeneratorContext::WrappedClass { wrapper_name, .. } => Some(wrapper_name),
            _ => None,
        }
    }

    pub fn precise_type(&self) -> Option<&MetaType> {
        match self {
            GeneratorContext::SmartPointer { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn pointee_class(&self) -> Option<&'a MetaClass> {
        match self {
            GeneratorContext::SmartPointer { pointee, .. } => *pointee,
            _ => None,
        }
    }
}

/// Output location and file handling shared by all generators of a run.
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    pub output_directory: PathBuf,
    pub license_comment: String,
    pub file_out: FileOutOptions,
}

/// Read-only state handed to generators once setup succeeded.
#[derive(Debug)]
pub struct Session<'a> {
    db: &'a TypeDatabase,
    api: &'a ApiExtractorResult,
    instantiations: Instantiations,
    invisible_top_namespaces: Vec<ClassId>,
    config: DriverConfig,
    has_private_classes: bool,
}

impl<'a> Session<'a> {
    pub fn db(&self) -> &'a TypeDatabase {
        self.db
    }

    pub fn api(&self) -> &'a ApiExtractorResult {
        self.api
    }

    pub fn package_name(&self) -> &'a str {
        self.db.default_package_name()
    }

    pub fn module_name(&self) -> &'a str {
        module_name(self.package_name())
    }

    pub fn instantiated_containers(&self) -> &[MetaType] {
        self.instantiations.containers()
    }

    pub fn instantiated_smart_pointers(&self) -> &[MetaType] {
        self.instantiations.smart_pointers()
    }

    /// Top-level invisible namespaces and the invisible namespaces nested in them.
    pub fn invisible_top_namespaces(&self) -> impl Iterator<Item = &'a MetaClass> + '_ {
        self.invisible_top_namespaces.iter().map(|id| self.api.class(*id))
    }

    pub fn license_comment(&self) -> &str {
        &self.config.license_comment
    }

    pub fn output_directory(&self) -> &Path {
        &self.config.output_directory
    }

    /// Whether a generated class has a private type entry. Complete once all
    /// class files are written.
    pub fn has_private_classes(&self) -> bool {
        self.has_private_classes
    }

    /// Write a file below the output directory.
    pub fn write_file(&self, relative: impl AsRef<Path>, contents: &str) -> Result<FileOutState, GeneratorError> {
        FileOut::new(self.config.output_directory.join(relative), self.config.file_out).done(contents)
    }
}

/// One kind of output produced from the extracted API.
pub trait Generator {
    fn name(&self) -> &'static str;

    fn options(&self) -> Vec<OptionDescription> {
        Vec::new()
    }

    /// Returns `true` when the option is known to this generator.
    fn handle_option(&mut self, _key: &str, _value: &str) -> bool {
        false
    }

    /// Appended to the base name of every per-class file; empty disables them.
    fn file_name_suffix(&self) -> &'static str;

    fn file_name_for_context(&self, _session: &Session<'_>, context: &GeneratorContext<'_>) -> String {
        let suffix = self.file_name_suffix();
        if suffix.is_empty() {
            return String::new();
        }
        let base = match context {
            GeneratorContext::SmartPointer { class, ty, .. } => {
                let pointee = ty.instantiations().first().map(MetaType::name).unwrap_or_default();
                smart_pointer_file_base(class.qualified_cpp_name(), pointee)
            }
            _ => class_file_base(context.class().qualified_cpp_name()),
        };
        format!("{base}{suffix}")
    }

    fn do_setup(&mut self, _session: &Session<'_>) -> Result<(), GeneratorError> {
        Ok(())
    }

    fn context_for_class<'a>(&self, _session: &Session<'_>, class: &'a MetaClass) -> GeneratorContext<'a> {
        GeneratorContext::Class(class)
    }

    fn should_generate(&self, class: &MetaClass) -> bool {
        let entry = class.type_entry();
        entry.generate_code() && entry.is_visible_scope()
    }

    fn sub_directory_for_class(&self, session: &Session<'_>, class: &MetaClass) -> PathBuf {
        let package = match class.package() {
            "" => session.package_name(),
            package => package,
        };
        package_sub_directory(package)
    }

    fn generate_class(
        &mut self,
        session: &Session<'_>,
        out: &mut String,
        context: &GeneratorContext<'_>,
    ) -> Result<(), GeneratorError>;

    fn finish_generation(&mut self, _session: &Session<'_>) -> Result<(), GeneratorError> {
        Ok(())
    }
}

/// The generators of a named set, `None` for an unknown name.
pub fn generator_set(name: &str) -> Option<Vec<Box<dyn Generator>>> {
    let generators: Vec<Box<dyn Generator>> = match name {
        "default" => vec![Box::new(WrapperGenerator::new()), Box::new(HeaderGenerator::new())],
        "doc" => vec![Box::new(DocGenerator::new())],
        "dart" => vec![Box::new(DartGenerator::new())],
        _ => return None,
    };
    Some(generators)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Unconfigured,
    Ready,
    Done,
    Failed,
}

/// Runs one generator over an extraction result: `setup()` once, then `generate()`.
pub struct GeneratorDriver<'a> {
    db: &'a TypeDatabase,
    generator: Box<dyn Generator + 'a>,
    config: DriverConfig,
    state: DriverState,
    session: Option<Session<'a>>,
}

impl<'a> GeneratorDriver<'a> {
    pub fn new(db: &'a TypeDatabase, generator: Box<dyn Generator + 'a>, config: DriverConfig) -> Self {
        Self {
            db,
            generator,
            config,
            state: DriverState::Unconfigured,
            session: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    pub fn session(&self) -> Option<&Session<'a>> {
        self.session.as_ref()
    }

    pub fn setup(&mut self, api: &'a ApiExtractorResult) -> bool {
        if self.state != DriverState::Unconfigured {
            log::error!("{}: {}", self.generator.name(), GeneratorError::AlreadySetUp);
            return false;
        }
        match self.try_setup(api) {
            Ok(()) => {
                self.state = DriverState::Ready;
                true
            }
            Err(err) => {
                log::error!("{}: {err}", self.generator.name());
                self.state = DriverState::Failed;
                false
            }
        }
    }

    fn try_setup(&mut self, api: &'a ApiExtractorResult) -> Result<(), GeneratorError> {
        let module = self.db.default_type_system_type().ok_or(GeneratorError::NoModuleEntry)?;
        if !module.generate_code() {
            return Err(GeneratorError::RootGenerationDisabled);
        }

        let instantiations = Instantiations::collect(api);
        let mut invisible_top_namespaces = Vec::new();
        for class in api.classes() {
            if class.enclosing_class().is_none() && class.is_invisible_namespace() {
                invisible_top_namespaces.push(class.id());
                api.invisible_namespace_recursion(class, &mut |inner| invisible_top_namespaces.push(inner.id()));
            }
        }

        let session = Session {
            db: self.db,
            api,
            instantiations,
            invisible_top_namespaces,
            config: self.config.clone(),
            has_private_classes: false,
        };
        self.generator.do_setup(&session)?;
        self.session = Some(session);
        Ok(())
    }

    pub fn generate(&mut self) -> bool {
        if self.state != DriverState::Ready {
            log::error!("{}: {}", self.generator.name(), GeneratorError::NotSetUp);
            return false;
        }
        match self.try_generate() {
            Ok(()) => {
                self.state = DriverState::Done;
                true
            }
            Err(err) => {
                log::error!("{}: {err}", self.generator.name());
                self.state = DriverState::Failed;
                false
            }
        }
    }

    fn try_generate(&mut self) -> Result<(), GeneratorError> {
        let session = self.session.as_mut().ok_or(GeneratorError::NotSetUp)?;
        let generator = self.generator.as_mut();
        let api = session.api;
        log::info!("Running generator {}", generator.name());

        for class in api.classes() {
            let context = generator.context_for_class(session, class);
            generate_file_for_context(generator, session, &context)?;
            if generator.should_generate(class) && class.type_entry().is_private() {
                session.has_private_classes = true;
            }
        }

        let session = &*session;
        for ty in session.instantiated_smart_pointers() {
            let class = api.find_smart_pointer_by_entry(ty.type_entry()).ok_or_else(|| {
                let known: Vec<_> = api.smart_pointers().map(MetaClass::qualified_cpp_name).collect();
                GeneratorError::SmartPointerNotFound {
                    signature: ty.cpp_signature(),
                    known: known.join(", "),
                }
            })?;
            // Primitive or opaque pointees have no class.
            let pointee = ty
                .instantiations()
                .first()
                .map(MetaType::type_entry)
                .filter(|entry| entry.is_complex())
                .and_then(|entry| api.find_class_by_entry(entry));
            let context = GeneratorContext::SmartPointer {
                class,
                ty: ty.clone(),
                pointee,
            };
            generate_file_for_context(generator, session, &context)?;
        }

        generator.finish_generation(session)
    }
}

fn generate_file_for_context(
    generator: &mut dyn Generator,
    session: &Session<'_>,
    context: &GeneratorContext<'_>,
) -> Result<(), GeneratorError> {
    let class = context.class();
    if !generator.should_generate(class) {
        return Ok(());
    }
    let file_name = generator.file_name_for_context(session, context);
    if file_name.is_empty() {
        return Ok(());
    }

    let path = generator.sub_directory_for_class(session, class).join(file_name);
    let mut contents = String::new();
    generator.generate_class(session, &mut contents, context)?;
    let state = session.write_file(&path, &contents)?;
    log::debug!("{}: {} ({state:?})", generator.name(), path.display());
    Ok(())
}

/// Run each generator in turn, stopping at the first failure.
pub fn run_generators<'a>(
    db: &'a TypeDatabase,
    api: &'a ApiExtractorResult,
    generators: Vec<Box<dyn Generator + 'a>>,
    config: &DriverConfig,
) -> bool {
    for generator in generators {
        let mut driver = GeneratorDriver::new(db, generator, config.clone());
        if !driver.setup(api) || !driver.generate() {
            return false;
        }
    }
    true
}

/// Whether generated code subclasses `class` to forward its virtual functions.
pub fn needs_wrapper(class: &MetaClass) -> bool {
    !class.is_namespace()
        && !class.is_final()
        && class.type_entry().is_object()
        && class.is_polymorphic()
        && !class.has_private_destructor()
}

/// `ns::Shape` -> `ns_ShapeWrapper`.
pub fn wrapper_name(class: &MetaClass) -> String {
    format!(
        "{}Wrapper",
        canonical_identifier(class.qualified_cpp_name(), IdentifierStyle::Compact)
    )
}

pub(crate) fn wrapped_context<'a>(class: &'a MetaClass) -> GeneratorContext<'a> {
    if needs_wrapper(class) {
        GeneratorContext::WrappedClass {
            class,
            wrapper_name: wrapper_name(class),
        }
    } else {
        GeneratorContext::Class(class)
    }
}

/// Functions reachable through the C glue layer. `class` is `None` for
/// global functions.
pub(crate) fn bindable(class: Option<&MetaClass>, function: &MetaFunction) -> bool {
    if !function.is_public() || function.is_user_added() || uses_template_argument(function) {
        return false;
    }
    let is_namespace = class.is_some_and(MetaClass::is_namespace);
    let is_abstract = class.is_some_and(MetaClass::is_abstract);
    match function.kind() {
        FunctionKind::Constructor => !is_namespace && (!is_abstract || class.is_some_and(needs_wrapper)),
        FunctionKind::CopyConstructor => !is_namespace && !is_abstract,
        FunctionKind::Normal => true,
        FunctionKind::Operator => operator_name(function.name(), function.arguments().len()).is_some(),
        _ => false,
    }
}

fn uses_template_argument(function: &MetaFunction) -> bool {
    std::iter::once(function.return_type())
        .chain(function.arguments().iter().map(MetaArgument::ty))
        .any(|ty| ty.type_entry().is_template_argument() || ty.has_template_children())
}

/// Bindable functions of a class with their entry point names.
pub(crate) fn entry_points(class: &MetaClass) -> Vec<(&MetaFunction, String)> {
    entry_point_names(class.functions().iter().filter(|f| bindable(Some(class), f)))
}

/// Functions bound at module level: the global functions, then the functions
/// of invisible top namespaces. Each comes with its owning namespace and its
/// entry point name.
pub(crate) fn module_entry_points<'a>(
    session: &Session<'a>,
) -> Vec<(Option<&'a MetaClass>, &'a MetaFunction, String)> {
    let api = session.api();
    let globals = api.global_functions().iter().filter(|f| bindable(None, f));
    let namespaced = session
        .invisible_top_namespaces()
        .flat_map(|namespace| namespace.functions().iter().filter(move |f| bindable(Some(namespace), f)));
    entry_point_names(globals.chain(namespaced))
        .into_iter()
        .map(|(function, name)| (function.owner().map(|id| api.class(id)), function, name))
        .collect()
}

/// Global enums followed by the enums of invisible top namespaces.
pub(crate) fn module_enums<'a>(session: &Session<'a>) -> Vec<&'a MetaEnum> {
    let api = session.api();
    api.global_enums()
        .iter()
        .chain(session.invisible_top_namespaces().flat_map(|namespace| namespace.enums()))
        .collect()
}

/// Virtual functions a wrapper class overrides, with the names of their hooks.
pub(crate) fn virtual_overrides(class: &MetaClass) -> Vec<(&MetaFunction, String)> {
    let overridable = class.functions().iter().filter(|f| {
        f.is_virtual()
            && !f.is_private()
            && !f.is_user_added()
            && matches!(f.kind(), FunctionKind::Normal | FunctionKind::Operator)
    });
    entry_point_names(overridable)
}

/// Symbol prefix of a smart-pointer instantiation: `geo_std_shared_ptr_shape`.
pub(crate) fn smart_pointer_symbol_prefix(session: &Session<'_>, class: &MetaClass, ty: &MetaType) -> String {
    let pointee = ty.instantiations().first().map(MetaType::name).unwrap_or_default();
    format!(
        "{}_{}",
        session.module_name(),
        smart_pointer_file_base(class.qualified_cpp_name(), pointee)
    )
}

/// Unique symbol-friendly names for the bindable functions of a class.
///
/// Overloads after the first get a numeric suffix: `area`, `area_1`.
pub(crate) fn entry_point_names<'f>(
    functions: impl IntoIterator<Item = &'f MetaFunction>,
) -> Vec<(&'f MetaFunction, String)> {
    let mut seen: Vec<(String, usize)> = Vec::new();
    let mut names = Vec::new();
    for function in functions {
        let base = if function.is_constructor() {
            "new".to_string()
        } else if let Some(op) = operator_name(function.name(), function.arguments().len()) {
            op.to_string()
        } else {
            canonical_identifier(function.name(), IdentifierStyle::Compact)
        };
        let name = match seen.iter_mut().find(|(known, _)| *known == base) {
            Some((_, count)) => {
                *count += 1;
                format!("{base}_{count}")
            }
            None => {
                seen.push((base.clone(), 0));
                base
            }
        };
        names.push((function, name));
    }
    names
}

/// Write the license comment, or the generated-file banner, as a block comment.
pub(crate) fn write_license(out: &mut String, license: &str) {
    out.push_str("/*\n");
    if license.trim().is_empty() {
        out.push_str(" * Auto-generated by cppbind\n");
        out.push_str(" * DO NOT EDIT MANUALLY\n");
    } else {
        for line in license.lines() {
            if line.is_empty() {
                out.push_str(" *\n");
            } else {
                out.push_str(" * ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out.push_str(" */\n\n");
}
