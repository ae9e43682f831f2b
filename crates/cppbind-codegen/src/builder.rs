//! Builds the API model from a declaration graph and the type-rule database.
//!
//! Every declaration is matched against the [`TypeDatabase`]: classes,
//! namespaces, enums and global functions without a rule are rejected, type
//! spellings are resolved to entries through the enclosing scopes, and
//! function modifications and added functions from the rules are applied.

use std::fmt;
use std::rc::Rc;

use crate::codemodel::{
    Access, ClassModel, CodeModel, EnumModel, FieldModel, FunctionModel, ReferenceType, ScopeModel,
    TypeInfo, split_top_level,
};
use crate::error::ExtractError;
use crate::model::{
    ApiExtractorResult, ClassId, FunctionKind, MetaArgument, MetaClass, MetaEnum, MetaEnumValue,
    MetaField, MetaFunction, MetaType,
};
use crate::registry::TypeDatabase;
use crate::types::{
    AddedFunction, FunctionModification, NamespaceVisibility, TypeEntry, TypeEntryKind,
    TypeEntryRef, same_entry,
};

/// Why a declaration was left out of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoTypeEntry,
    NotAClass,
    Private,
    Deleted,
    Deprecated,
    RemovedByRule,
    DroppedType,
    SignatureMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::NoTypeEntry => "no type entry",
            RejectReason::NotAClass => "type entry is not a class",
            RejectReason::Private => "private",
            RejectReason::Deleted => "deleted",
            RejectReason::Deprecated => "deprecated",
            RejectReason::RemovedByRule => "removed by a modification rule",
            RejectReason::DroppedType => "uses a dropped type",
            RejectReason::SignatureMismatch => "signature not listed in the function rule",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderOptions {
    pub skip_deprecated: bool,
}

/// Where a declaration sits: its qualifier, innermost modelled class and
/// the template parameters in effect.
#[derive(Debug, Clone, Default)]
struct Scope {
    prefix: Vec<String>,
    class: Option<ClassId>,
    template_parameters: Vec<TypeEntryRef>,
}

impl Scope {
    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.prefix.join("::"), name)
        }
    }

    fn enter(&self, name: &str, class: Option<ClassId>) -> Scope {
        let mut prefix = self.prefix.clone();
        prefix.push(name.to_string());
        Scope {
            prefix,
            class: class.or(self.class),
            template_parameters: self.template_parameters.clone(),
        }
    }
}

/// Converts a [`CodeModel`] into an [`ApiExtractorResult`].
pub struct ApiBuilder<'db> {
    db: &'db TypeDatabase,
    options: BuilderOptions,
    result: ApiExtractorResult,
    rejections: Vec<Rejection>,
}

impl<'db> ApiBuilder<'db> {
    pub fn new(db: &'db TypeDatabase) -> Self {
        Self {
            db,
            options: BuilderOptions::default(),
            result: ApiExtractorResult::default(),
            rejections: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    /// Declarations left out of the last build.
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    pub fn build(&mut self, model: &CodeModel) -> Result<ApiExtractorResult, ExtractError> {
        self.result = ApiExtractorResult::default();
        self.rejections.clear();
        self.traverse_scope(&model.global, &Scope::default())?;
        log::debug!(
            "Built API model: {} classes, {} smart pointers, {} global functions, {} rejected",
            self.result.classes.len(),
            self.result.smart_pointers.len(),
            self.result.global_functions.len(),
            self.rejections.len()
        );
        Ok(std::mem::take(&mut self.result))
    }

    fn reject(&mut self, name: impl Into<String>, reason: RejectReason) {
        let name = name.into();
        log::debug!("Rejected '{name}': {reason}");
        self.rejections.push(Rejection { name, reason });
    }

    fn traverse_scope(&mut self, scope_model: &ScopeModel, scope: &Scope) -> Result<(), ExtractError> {
        for namespace in &scope_model.namespaces {
            let qualified = scope.qualify(&namespace.name);
            let (class, created) = match self.db.find(&qualified) {
                Some(entry) if entry.is_namespace() => {
                    let (id, created) = self.namespace_class(entry.clone(), scope.class, namespace.inline);
                    (Some(id), created)
                }
                Some(_) => {
                    self.reject(&qualified, RejectReason::NotAClass);
                    continue;
                }
                // An unmodelled namespace still qualifies the names inside it.
                None => (None, false),
            };
            let inner_scope = scope.enter(&namespace.name, class);
            if let Some(id) = class
                && created
            {
                let entry = self.result.arena[id.0].entry.clone();
                for added in entry.added_functions() {
                    let function = self.added_function(added, &inner_scope, id, &entry)?;
                    self.result.arena[id.0].functions.push(function);
                }
            }
            self.traverse_scope(&namespace.scope, &inner_scope)?;
        }

        for class in &scope_model.classes {
            self.traverse_class(class, scope)?;
        }

        for enum_model in &scope_model.enums {
            if let Some(meta_enum) = self.build_enum(enum_model, scope) {
                match scope.class {
                    Some(id) => self.result.arena[id.0].enums.push(meta_enum),
                    None => self.result.global_enums.push(meta_enum),
                }
            }
        }

        for function in &scope_model.functions {
            let qualified = scope.qualify(&function.name);
            match scope.class {
                Some(id) => {
                    let entry = self.result.arena[id.0].entry.clone();
                    if let Some(f) = self.build_function(function, scope, Some((id, &entry)))? {
                        self.result.arena[id.0].functions.push(f);
                    }
                }
                None => {
                    let Some(rule) = self.db.find_function(&qualified).cloned() else {
                        self.reject(qualified, RejectReason::NoTypeEntry);
                        continue;
                    };
                    let Some(f) = self.build_function(function, scope, None)? else {
                        continue;
                    };
                    if let TypeEntryKind::Function { signatures } = rule.kind()
                        && !signatures.is_empty()
                        && !signatures.contains(&f.minimal_signature())
                    {
                        self.reject(f.minimal_signature(), RejectReason::SignatureMismatch);
                        continue;
                    }
                    self.result.global_functions.push(f);
                }
            }
        }
        Ok(())
    }

    /// Namespaces may be reopened; all openings share one class.
    fn namespace_class(
        &mut self,
        entry: TypeEntryRef,
        enclosing: Option<ClassId>,
        inline: bool,
    ) -> (ClassId, bool) {
        if let Some(existing) = self.result.classes.iter().find(|id| self.result.arena[id.0].has_entry(&entry)) {
            return (*existing, false);
        }
        let invisible = match entry.kind() {
            TypeEntryKind::Namespace {
                visibility: NamespaceVisibility::Auto,
                ..
            } => inline || !entry.is_visible_scope(),
            _ => !entry.is_visible_scope(),
        };
        let id = self.allocate_class(entry, enclosing, false);
        self.result.arena[id.0].invisible_namespace = invisible;
        (id, true)
    }

    fn allocate_class(&mut self, entry: TypeEntryRef, enclosing: Option<ClassId>, smart_pointer: bool) -> ClassId {
        let id = ClassId(self.result.arena.len());
        self.result.arena.push(MetaClass {
            id,
            entry,
            enclosing,
            inner_classes: Vec::new(),
            functions: Vec::new(),
            fields: Vec::new(),
            enums: Vec::new(),
            template_arguments: Vec::new(),
            base_classes: Vec::new(),
            invisible_namespace: false,
            is_final: false,
        });
        if smart_pointer {
            self.result.smart_pointers.push(id);
        } else {
            self.result.classes.push(id);
        }
        if let Some(parent) = enclosing {
            self.result.arena[parent.0].inner_classes.push(id);
        }
        id
    }

    fn traverse_class(&mut self, class: &ClassModel, scope: &Scope) -> Result<(), ExtractError> {
        let qualified = scope.qualify(&class.name);
        if class.access == Access::Private {
            self.reject(qualified, RejectReason::Private);
            return Ok(());
        }
        let Some(entry) = self.db.find(&qualified).cloned() else {
            self.reject(qualified, RejectReason::NoTypeEntry);
            return Ok(());
        };
        if entry.is_container() {
            return Ok(());
        }
        if !matches!(entry.kind(), TypeEntryKind::Complex { .. } | TypeEntryKind::SmartPointer { .. }) {
            self.reject(qualified, RejectReason::NotAClass);
            return Ok(());
        }

        let id = self.allocate_class(entry.clone(), scope.class, entry.is_smart_pointer());
        let mut class_scope = scope.enter(&class.name, Some(id));
        let template_arguments: Vec<TypeEntryRef> = class
            .template_parameters
            .iter()
            .enumerate()
            .map(|(ordinal, name)| {
                Rc::new(
                    TypeEntry::new(name, TypeEntryKind::TemplateArgument { ordinal })
                        .with_generate_code(false),
                )
            })
            .collect();
        class_scope.template_parameters.extend(template_arguments.iter().cloned());

        let base_classes = class
            .base_classes
            .iter()
            .map(|base| {
                self.lookup(base, scope)
                    .map(|e| e.qualified_cpp_name().to_string())
                    .unwrap_or_else(|| base.clone())
            })
            .collect();

        let mut functions = Vec::new();
        for function in &class.functions {
            if let Some(f) = self.build_function(function, &class_scope, Some((id, &entry)))? {
                functions.push(f);
            }
        }
        for added in entry.added_functions() {
            functions.push(self.added_function(added, &class_scope, id, &entry)?);
        }

        let mut fields = Vec::new();
        for field in &class.fields {
            if let Some(f) = self.build_field(field, &class_scope, &qualified)? {
                fields.push(f);
            }
        }

        let enums = class
            .enums
            .iter()
            .filter_map(|e| self.build_enum(e, &class_scope))
            .collect();

        {
            let meta = &mut self.result.arena[id.0];
            meta.template_arguments = template_arguments;
            meta.base_classes = base_classes;
            meta.functions = functions;
            meta.fields = fields;
            meta.enums = enums;
            meta.is_final = class.is_final;
        }

        for inner in &class.classes {
            self.traverse_class(inner, &class_scope)?;
        }
        Ok(())
    }

    fn build_enum(&mut self, enum_model: &EnumModel, scope: &Scope) -> Option<MetaEnum> {
        let qualified = scope.qualify(&enum_model.name);
        if enum_model.access == Access::Private {
            self.reject(qualified, RejectReason::Private);
            return None;
        }
        match self.db.find(&qualified) {
            Some(entry) if entry.is_enum() => Some(MetaEnum {
                entry: entry.clone(),
                values: enum_model
                    .values
                    .iter()
                    .map(|v| MetaEnumValue {
                        name: v.name.clone(),
                        value: v.value.clone(),
                    })
                    .collect(),
                access: enum_model.access,
                is_scoped: enum_model.is_scoped,
                enclosing: scope.class,
            }),
            Some(_) => {
                self.reject(qualified, RejectReason::NotAClass);
                None
            }
            None => {
                self.reject(qualified, RejectReason::NoTypeEntry);
                None
            }
        }
    }

    fn build_field(
        &mut self,
        field: &FieldModel,
        scope: &Scope,
        class_name: &str,
    ) -> Result<Option<MetaField>, ExtractError> {
        let context = format!("{class_name}::{}", field.name);
        if field.access == Access::Private {
            self.reject(context, RejectReason::Private);
            return Ok(None);
        }
        let Some(ty) = self.resolve_or_drop(&field.type_info, scope, &context)? else {
            return Ok(None);
        };
        Ok(Some(MetaField {
            name: field.name.clone(),
            ty,
            access: field.access,
            is_static: field.is_static,
        }))
    }

    fn build_function(
        &mut self,
        function: &FunctionModel,
        scope: &Scope,
        owner: Option<(ClassId, &TypeEntryRef)>,
    ) -> Result<Option<MetaFunction>, ExtractError> {
        let context = scope.qualify(&function.name);
        let kind = match owner {
            Some((_, entry)) => function_kind(&function.name, entry),
            None => FunctionKind::Normal,
        };

        if function.is_deleted {
            self.reject(context, RejectReason::Deleted);
            return Ok(None);
        }
        if function.access == Access::Private
            && !matches!(kind, FunctionKind::Constructor | FunctionKind::Destructor)
        {
            self.reject(context, RejectReason::Private);
            return Ok(None);
        }
        if function.is_deprecated && self.options.skip_deprecated {
            self.reject(context, RejectReason::Deprecated);
            return Ok(None);
        }

        let mut meta = MetaFunction::new(&function.name, kind).with_access(function.access);
        meta.owner = owner.map(|(id, _)| id);
        meta.is_static = function.is_static;
        meta.is_virtual = function.is_virtual || function.is_pure_virtual;
        meta.is_abstract = function.is_pure_virtual;
        meta.is_constant = function.is_constant;
        meta.is_deprecated = function.is_deprecated;

        if !matches!(kind, FunctionKind::Constructor | FunctionKind::Destructor) {
            let Some(ty) = self.resolve_or_drop(&function.return_type, scope, &context)? else {
                return Ok(None);
            };
            meta.return_type = ty;
        }

        for (index, argument) in function.arguments.iter().enumerate() {
            let Some(ty) = self.resolve_or_drop(&argument.type_info, scope, &context)? else {
                return Ok(None);
            };
            let mut meta_argument = MetaArgument::new(&argument.name, ty, index);
            if let Some(value) = &argument.default_value {
                meta_argument = meta_argument.with_default_value(value);
            }
            meta.arguments.push(meta_argument);
        }

        if let Some((_, entry)) = owner {
            meta.kind = refine_kind(&meta, entry);
            let signature = meta.minimal_signature();
            if let Some(modification) = entry.modifications().iter().find(|m| m.signature == signature) {
                if modification.remove {
                    self.reject(context, RejectReason::RemovedByRule);
                    return Ok(None);
                }
                apply_modification(&mut meta, modification);
            }
        }
        Ok(Some(meta))
    }

    fn added_function(
        &mut self,
        added: &AddedFunction,
        scope: &Scope,
        owner: ClassId,
        entry: &TypeEntryRef,
    ) -> Result<MetaFunction, ExtractError> {
        let invalid = || ExtractError::InvalidType(added.signature.clone());
        let signature = added.signature.trim();
        let open = signature.find('(').ok_or_else(invalid)?;
        let close = signature.rfind(')').ok_or_else(invalid)?;
        let name = signature[..open].trim();
        let kind = function_kind(name, entry);
        let context = scope.qualify(name);

        let mut function = MetaFunction::new(name, kind)
            .with_access(added.access)
            .with_user_added(true);
        function.owner = Some(owner);
        function.is_static = added.is_static;
        function.is_constant = signature[close + 1..].trim() == "const";

        for (index, text) in split_top_level(&signature[open + 1..close]).into_iter().enumerate() {
            let (declaration, default_value) = match split_default(text) {
                Some((declaration, value)) => (declaration, Some(value)),
                None => (text, None),
            };
            let (ty, name) = self.resolve_declaration(declaration, scope, &context)?;
            let mut argument = MetaArgument::new(name, ty, index);
            if let Some(value) = default_value {
                argument = argument.with_default_value(value);
            }
            function.arguments.push(argument);
        }

        if let Some(return_type) = &added.return_type {
            let info = TypeInfo::parse(return_type)?;
            function.return_type = self.resolve_required(&info, scope, &context)?;
        }
        Ok(function)
    }

    /// Split `const Point & p` into its type and argument name.
    fn resolve_declaration(
        &self,
        declaration: &str,
        scope: &Scope,
        context: &str,
    ) -> Result<(MetaType, String), ExtractError> {
        let info = TypeInfo::parse(declaration)?;
        if let Ok(ty) = self.resolve(&info, scope) {
            return Ok((ty, String::new()));
        }
        if let Some((head, name)) = declaration.trim().rsplit_once(|c: char| c.is_whitespace() || c == '*' || c == '&')
            && !name.is_empty()
            && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            let type_text = &declaration.trim()[..head.len() + 1];
            let info = TypeInfo::parse(type_text)?;
            let ty = self.resolve_required(&info, scope, context)?;
            return Ok((ty, name.to_string()));
        }
        Err(ExtractError::UnresolvedType {
            type_name: info.qualified_name_string(),
            context: context.to_string(),
        })
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Option<&'db TypeEntryRef> {
        let name = name.trim_start_matches("::");
        for depth in (0..=scope.prefix.len()).rev() {
            let candidate = if depth == 0 {
                name.to_string()
            } else {
                format!("{}::{}", scope.prefix[..depth].join("::"), name)
            };
            if let Some(entry) = self.db.find(&candidate) {
                return Some(entry);
            }
        }
        None
    }

    fn is_dropped(&self, name: &str, scope: &Scope) -> bool {
        (0..=scope.prefix.len()).any(|depth| {
            let candidate = if depth == 0 {
                name.to_string()
            } else {
                format!("{}::{}", scope.prefix[..depth].join("::"), name)
            };
            self.db.is_dropped(&candidate)
        })
    }

    /// Resolve a spelling; `Err` carries the first unresolved name.
    fn resolve(&self, info: &TypeInfo, scope: &Scope) -> Result<MetaType, String> {
        if let Some((dimension, rest)) = info.array_dimensions.split_first() {
            let mut element_info = info.clone();
            element_info.array_dimensions = rest.to_vec();
            let element = self.resolve(&element_info, scope)?;
            let length = (!dimension.is_empty()).then(|| dimension.clone());
            return Ok(MetaType::array_of(element, length));
        }

        let name = info.qualified_name_string();
        let entry = if info.qualified_name.len() == 1 {
            scope
                .template_parameters
                .iter()
                .rev()
                .find(|p| p.qualified_cpp_name() == name)
                .cloned()
        } else {
            None
        };
        let entry = match entry {
            Some(entry) => entry,
            None => self.lookup(&name, scope).cloned().ok_or_else(|| name.clone())?,
        };

        let instantiations = info
            .arguments
            .iter()
            .map(|argument| self.resolve(argument, scope))
            .collect::<Result<Vec<_>, _>>()?;

        let mut ty = MetaType::new(entry)
            .with_const(info.is_const)
            .with_reference(info.reference)
            .with_indirections(info.indirections)
            .with_instantiations(instantiations);
        ty.set_original_description(info.to_string());
        Ok(ty)
    }

    fn resolve_required(&self, info: &TypeInfo, scope: &Scope, context: &str) -> Result<MetaType, ExtractError> {
        self.resolve(info, scope).map_err(|type_name| ExtractError::UnresolvedType {
            type_name,
            context: context.to_string(),
        })
    }

    /// Resolve a spelling, or `None` when it names a dropped entry.
    fn resolve_or_drop(
        &mut self,
        info: &TypeInfo,
        scope: &Scope,
        context: &str,
    ) -> Result<Option<MetaType>, ExtractError> {
        match self.resolve(info, scope) {
            Ok(ty) => Ok(Some(ty)),
            Err(type_name) if self.is_dropped(&type_name, scope) => {
                self.reject(context, RejectReason::DroppedType);
                Ok(None)
            }
            Err(type_name) => Err(ExtractError::UnresolvedType {
                type_name,
                context: context.to_string(),
            }),
        }
    }
}

fn function_kind(name: &str, owner: &TypeEntryRef) -> FunctionKind {
    if name == owner.entry_name() {
        return FunctionKind::Constructor;
    }
    if name.starts_with('~') {
        return FunctionKind::Destructor;
    }
    match name.strip_prefix("operator") {
        Some("=") => FunctionKind::AssignmentOperator,
        Some(rest) if rest.starts_with(|c: char| c.is_whitespace()) => {
            let rest = rest.trim();
            if rest.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == ':')
                && !rest.starts_with("new")
                && !rest.starts_with("delete")
            {
                FunctionKind::ConversionOperator
            } else {
                FunctionKind::Operator
            }
        }
        Some(rest) if !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') => FunctionKind::Operator,
        _ => FunctionKind::Normal,
    }
}

/// Copy and move forms: `const Own &` or `Own &&` as the sole required argument.
fn refine_kind(function: &MetaFunction, owner: &TypeEntryRef) -> FunctionKind {
    let kind = function.kind();
    if !matches!(kind, FunctionKind::Constructor | FunctionKind::AssignmentOperator) {
        return kind;
    }
    let arguments = function.arguments();
    let Some(first) = arguments.first() else {
        return kind;
    };
    if arguments[1..].iter().any(|a| !a.has_default_value_expression())
        || !same_entry(first.ty().type_entry(), owner)
        || first.ty().indirections() > 0
    {
        return kind;
    }
    match (kind, first.ty().reference_type()) {
        (FunctionKind::Constructor, ReferenceType::LValueReference) if first.ty().is_const() => {
            FunctionKind::CopyConstructor
        }
        (FunctionKind::Constructor, ReferenceType::RValueReference) => FunctionKind::MoveConstructor,
        (FunctionKind::AssignmentOperator, ReferenceType::RValueReference) => {
            FunctionKind::MoveAssignmentOperator
        }
        _ => kind,
    }
}

fn apply_modification(function: &mut MetaFunction, modification: &FunctionModification) {
    for argument in function.arguments_mut() {
        let Some(rule) = modification.argument(argument.index() + 1) else {
            continue;
        };
        if rule.remove {
            argument.set_removed(true);
        }
        if rule.remove_default_expression {
            argument.set_default_value_expression(None);
        }
        if let Some(expression) = &rule.replace_default_expression {
            argument.set_default_value_expression(Some(expression.clone()));
        }
    }
}

/// Split `int x = 0` at the top-level `=`.
fn split_default(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            '=' if depth == 0 => return Some((text[..i].trim(), text[i + 1..].trim())),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
package = "sample"

[[primitive-type]]
name = "std::string"

[[enum-type]]
name = "geo::Color"
null-value = "geo::Color::Red"

[[container-type]]
name = "std::vector"
kind = "list"

[[smart-pointer-type]]
name = "std::shared_ptr"
getter = "get"

[[namespace-type]]
name = "geo"

[[namespace-type]]
name = "geo::detail"
visible = "no"

[[value-type]]
name = "geo::Point"

[[value-type.modify-function]]
signature = "Point(int, int)"

[[value-type.modify-function.modify-argument]]
index = 2
replace-default-expression = "1"

[[value-type.add-function]]
signature = "Point(const std::string & text)"

[[object-type]]
name = "geo::Shape"

[[object-type.modify-function]]
signature = "legacy()"
remove = true

[[value-type]]
name = "geo::Shape::Style"

[[function]]
name = "origin"
"#;

    const MODEL: &str = r#"{
        "namespaces": [{
            "name": "geo",
            "enums": [{ "name": "Color", "isScoped": true, "values": [{ "name": "Red" }, { "name": "Blue" }] }],
            "namespaces": [{ "name": "detail" }],
            "classes": [
                { "name": "Point", "functions": [
                    { "name": "Point" },
                    { "name": "Point", "arguments": [
                        { "name": "x", "type": "int" },
                        { "name": "y", "type": "int", "defaultValue": "0" }
                    ]},
                    { "name": "Point", "arguments": [{ "name": "other", "type": "const Point &" }] },
                    { "name": "operator+", "returnType": "Point", "arguments": [{ "name": "o", "type": "const Point &" }] },
                    { "name": "secret", "access": "private" }
                ],
                "fields": [{ "name": "x", "type": "int" }]},
                { "name": "Shape", "functions": [
                    { "name": "area", "returnType": "double", "isVirtual": true },
                    { "name": "points", "returnType": "std::vector<Point>" },
                    { "name": "share", "returnType": "std::shared_ptr<const Shape>" },
                    { "name": "legacy" },
                    { "name": "color", "returnType": "Color" }
                  ],
                  "classes": [{ "name": "Style" }]
                },
                { "name": "Unknown" }
            ]
        }],
        "functions": [
            { "name": "origin", "returnType": "geo::Point" },
            { "name": "helper" }
        ]
    }"#;

    fn build() -> (ApiExtractorResult, Vec<Rejection>) {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(RULES).unwrap();
        let model = CodeModel::from_json_str(MODEL).unwrap();
        let mut builder = ApiBuilder::new(&db);
        let api = builder.build(&model).unwrap();
        (api, builder.rejections().to_vec())
    }

    #[test]
    fn test_build_classes() {
        let (api, rejections) = build();
        let names: Vec<_> = api.classes().map(|c| c.qualified_cpp_name()).collect();
        assert_eq!(names, ["geo", "geo::detail", "geo::Point", "geo::Shape", "geo::Shape::Style"]);

        let detail = api.find_class("geo::detail").unwrap();
        assert!(detail.is_invisible_namespace());
        assert_eq!(api.enclosing(detail).map(|c| c.name()), Some("geo"));

        let style = api.find_class("::geo::Shape::Style").unwrap();
        let chain: Vec<_> = api.enclosing_chain(style).map(|c| c.name()).collect();
        assert_eq!(chain, ["Shape", "geo"]);

        assert!(rejections.iter().any(|r| r.name == "geo::Unknown" && r.reason == RejectReason::NoTypeEntry));
        assert!(rejections.iter().any(|r| r.name == "helper"));
        assert_eq!(api.global_functions().len(), 1);
        assert_eq!(api.global_enums().len(), 0);
    }

    #[test]
    fn test_build_functions() {
        let (api, _) = build();
        let point = api.find_class("geo::Point").unwrap();
        let kinds: Vec<_> = point.functions().iter().map(|f| f.kind()).collect();
        assert_eq!(
            kinds,
            [
                FunctionKind::Constructor,
                FunctionKind::Constructor,
                FunctionKind::CopyConstructor,
                FunctionKind::Operator,
                FunctionKind::Constructor,
            ]
        );
        assert!(point.functions().iter().all(|f| f.name() != "secret"));

        let two_args = &point.functions()[1];
        assert_eq!(two_args.minimal_signature(), "Point(int,int)");
        let y = &two_args.arguments()[1];
        assert_eq!(y.default_value_expression(), Some("1"));
        assert!(y.has_modified_default_value_expression());

        let added = &point.functions()[4];
        assert!(added.is_user_added());
        assert_eq!(added.arguments()[0].name(), "text");
        assert_eq!(added.arguments()[0].ty().cpp_signature(), "const std::string &");
        assert_eq!(point.fields()[0].name, "x");
    }

    #[test]
    fn test_build_types_and_rules() {
        let (api, rejections) = build();
        let shape = api.find_class("geo::Shape").unwrap();
        assert!(shape.functions_named("legacy").next().is_none());
        assert!(rejections.iter().any(|r| r.reason == RejectReason::RemovedByRule));
        assert!(shape.is_polymorphic());

        let points = shape.functions_named("points").next().unwrap();
        assert!(points.return_type().is_container());
        assert_eq!(points.return_type().cpp_signature(), "std::vector<geo::Point>");

        let share = shape.functions_named("share").next().unwrap();
        assert!(share.return_type().is_smart_pointer());
        assert!(share.return_type().instantiations()[0].is_const());

        let color = shape.functions_named("color").next().unwrap();
        assert!(color.return_type().is_enum());
        let meta_enum = api.find_enum(color.return_type().type_entry()).unwrap();
        assert_eq!(meta_enum.values().len(), 2);
        assert_eq!(meta_enum.enclosing_class(), api.find_class("geo").map(|c| c.id()));
    }

    #[test]
    fn test_unresolved_type_is_fatal() {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str("package = \"m\"\n[[value-type]]\nname = \"A\"\n").unwrap();
        let model = CodeModel::from_json_str(
            r#"{ "classes": [{ "name": "A", "functions": [{ "name": "f", "returnType": "Missing" }] }] }"#,
        )
        .unwrap();
        let err = ApiBuilder::new(&db).build(&model).unwrap_err();
        assert!(matches!(err, ExtractError::UnresolvedType { ref type_name, .. } if type_name == "Missing"));
    }

    #[test]
    fn test_dropped_type_drops_declaration() {
        let mut db = TypeDatabase::with_builtins();
        db.set_drop_type_entries(["Legacy"]);
        db.load_typesystem_str(
            "package = \"m\"\n[[value-type]]\nname = \"A\"\n[[value-type]]\nname = \"Legacy\"\n",
        )
        .unwrap();
        let model = CodeModel::from_json_str(
            r#"{ "classes": [
                { "name": "A", "functions": [
                    { "name": "old", "returnType": "Legacy" },
                    { "name": "fine", "returnType": "int" }
                ]},
                { "name": "Legacy" }
            ] }"#,
        )
        .unwrap();
        let mut builder = ApiBuilder::new(&db);
        let api = builder.build(&model).unwrap();
        let a = api.find_class("A").unwrap();
        assert_eq!(a.functions().len(), 1);
        assert!(api.find_class("Legacy").is_none());
        assert!(builder.rejections().iter().any(|r| r.reason == RejectReason::DroppedType));
    }

    #[test]
    fn test_modify_const_method() {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(
            r#"
package = "m"

[[value-type]]
name = "A"

[[value-type.modify-function]]
signature = "x() const"
remove = true

[[value-type.modify-function]]
signature = "scale(double)const"

[[value-type.modify-function.modify-argument]]
index = 1
replace-default-expression = "2.0"
"#,
        )
        .unwrap();
        let model = CodeModel::from_json_str(
            r#"{ "classes": [{ "name": "A", "functions": [
                { "name": "x", "returnType": "int", "isConstant": true },
                { "name": "x", "returnType": "int" },
                { "name": "scale", "returnType": "A", "isConstant": true,
                  "arguments": [{ "name": "factor", "type": "double", "defaultValue": "1.0" }] }
            ]}] }"#,
        )
        .unwrap();
        let mut builder = ApiBuilder::new(&db);
        let api = builder.build(&model).unwrap();
        let a = api.find_class("A").unwrap();

        let xs: Vec<_> = a.functions_named("x").collect();
        assert_eq!(xs.len(), 1);
        assert!(!xs[0].is_constant());
        assert!(builder.rejections().iter().any(|r| r.reason == RejectReason::RemovedByRule));

        let scale = a.functions_named("scale").next().unwrap();
        assert_eq!(scale.arguments()[0].default_value_expression(), Some("2.0"));
    }

    #[test]
    fn test_template_class_parameters() {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(
            "package = \"m\"\n[[smart-pointer-type]]\nname = \"Ptr\"\ngetter = \"get\"\n",
        )
        .unwrap();
        let model = CodeModel::from_json_str(
            r#"{ "classes": [{ "name": "Ptr", "templateParameters": ["T"], "functions": [
                { "name": "get", "returnType": "T *", "isConstant": true }
            ]}] }"#,
        )
        .unwrap();
        let api = ApiBuilder::new(&db).build(&model).unwrap();
        assert_eq!(api.classes().count(), 0);
        let ptr = api.smart_pointers().next().unwrap();
        let get = &ptr.functions()[0];
        assert!(get.return_type().type_entry().is_template_argument());
        assert_eq!(get.minimal_signature(), "get()const");
    }

    #[test]
    fn test_function_kinds() {
        let owner = Rc::new(TypeEntry::value_type("ns::Point"));
        assert_eq!(function_kind("Point", &owner), FunctionKind::Constructor);
        assert_eq!(function_kind("~Point", &owner), FunctionKind::Destructor);
        assert_eq!(function_kind("operator=", &owner), FunctionKind::AssignmentOperator);
        assert_eq!(function_kind("operator==", &owner), FunctionKind::Operator);
        assert_eq!(function_kind("operator bool", &owner), FunctionKind::ConversionOperator);
        assert_eq!(function_kind("operator new", &owner), FunctionKind::Operator);
        assert_eq!(function_kind("operatorName", &owner), FunctionKind::Normal);
        assert_eq!(function_kind("length", &owner), FunctionKind::Normal);
    }

    #[test]
    fn test_split_default() {
        assert_eq!(split_default("int x = 0"), Some(("int x", "0")));
        assert_eq!(split_default("Map<int, int> m = Map<int, int>()"), Some(("Map<int, int> m", "Map<int, int>()")));
        assert_eq!(split_default("int x"), None);
    }
}
