//! Loader for type-rule files.
//!
//! Type rules are TOML documents. Each file declares one package (the module
//! generated from it) and arrays of type entries:
//!
//! ```toml
//! package = "sample"
//!
//! [[load-typesystem]]
//! name = "typesystem_core.toml"
//!
//! [[primitive-type]]
//! name = "Handle"
//! default-constructor = "Handle(nullptr)"
//!
//! [[enum-type]]
//! name = "Color"
//! null-value = "Color::Red"
//!
//! [[container-type]]
//! name = "std::vector"
//! kind = "list"
//!
//! [[smart-pointer-type]]
//! name = "std::shared_ptr"
//! getter = "get"
//!
//! [[value-type]]
//! name = "Point"
//!
//! [[value-type.modify-function]]
//! signature = "Point(int,int)"
//!
//! [[value-type.modify-function.modify-argument]]
//! index = 2
//! replace-default-expression = "1"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::codemodel::Access;
use crate::error::TypeSystemError;
use crate::naming::normalize_signature;
use crate::registry::{ApiVersion, TypeDatabase};
use crate::types::{
    AddedFunction, ArgumentModification, ContainerKind, FunctionModification, NamespaceVisibility,
    TypeEntry, TypeEntryKind,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TypeSystemFile {
    package: String,
    #[serde(default = "default_true")]
    generate: bool,
    #[serde(default)]
    load_typesystem: Vec<LoadRule>,
    #[serde(default)]
    primitive_type: Vec<PrimitiveRule>,
    #[serde(default)]
    enum_type: Vec<EnumRule>,
    #[serde(default)]
    container_type: Vec<ContainerRule>,
    #[serde(default)]
    smart_pointer_type: Vec<SmartPointerRule>,
    #[serde(default)]
    value_type: Vec<ComplexRule>,
    #[serde(default)]
    object_type: Vec<ComplexRule>,
    #[serde(default)]
    namespace_type: Vec<NamespaceRule>,
    #[serde(default)]
    function: Vec<FunctionRule>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LoadRule {
    name: String,
    #[serde(default)]
    generate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CommonRule {
    name: String,
    generate: Option<bool>,
    #[serde(default)]
    private: bool,
    default_constructor: Option<String>,
    since: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PrimitiveRule {
    #[serde(flatten)]
    common: CommonRule,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct EnumRule {
    #[serde(flatten)]
    common: CommonRule,
    null_value: Option<String>,
    flags: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ContainerRule {
    #[serde(flatten)]
    common: CommonRule,
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SmartPointerRule {
    #[serde(flatten)]
    common: CommonRule,
    getter: String,
    ref_count_method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ComplexRule {
    #[serde(flatten)]
    common: CommonRule,
    #[serde(default)]
    generic_class: bool,
    #[serde(default)]
    modify_function: Vec<ModifyFunctionRule>,
    #[serde(default)]
    add_function: Vec<AddFunctionRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct NamespaceRule {
    #[serde(flatten)]
    common: CommonRule,
    #[serde(default)]
    visible: Visible,
    #[serde(default)]
    inline: bool,
    #[serde(default)]
    add_function: Vec<AddFunctionRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Visible {
    #[default]
    Auto,
    Yes,
    No,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FunctionRule {
    #[serde(flatten)]
    common: CommonRule,
    #[serde(default)]
    signature: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ModifyFunctionRule {
    signature: String,
    #[serde(default)]
    remove: bool,
    #[serde(default)]
    modify_argument: Vec<ModifyArgumentRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ModifyArgumentRule {
    index: usize,
    #[serde(default)]
    remove: bool,
    replace_default_expression: Option<String>,
    #[serde(default)]
    remove_default_expression: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AddFunctionRule {
    signature: String,
    return_type: Option<String>,
    #[serde(default, rename = "static")]
    is_static: bool,
    #[serde(default)]
    access: Access,
}

/// Tracks state while one top-level file and its dependencies are loaded.
struct Loader<'a> {
    db: &'a mut TypeDatabase,
    visited: HashSet<PathBuf>,
}

impl TypeDatabase {
    /// Load a type-rule file and every file it pulls in with `load-typesystem`.
    ///
    /// The name is resolved directly first and then against the type-system
    /// search paths.
    pub fn load_typesystem(&mut self, name: &str) -> Result<(), TypeSystemError> {
        let path = self
            .resolve_typesystem_file(name)
            .ok_or_else(|| TypeSystemError::NotFound(name.to_string()))?;
        let mut loader = Loader {
            db: self,
            visited: HashSet::new(),
        };
        loader.load_file(&path, None)
    }

    /// Load type rules from a string.
    pub fn load_typesystem_str(&mut self, contents: &str) -> Result<(), TypeSystemError> {
        let mut loader = Loader {
            db: self,
            visited: HashSet::new(),
        };
        loader.load_contents(contents, Path::new("<string>"), None)
    }
}

impl Loader<'_> {
    fn load_file(&mut self, path: &Path, generate: Option<bool>) -> Result<(), TypeSystemError> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !self.visited.insert(key) {
            return Ok(());
        }
        log::debug!("Loading type system file '{}'", path.display());
        let contents = fs::read_to_string(path).map_err(|source| TypeSystemError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_contents(&contents, path, generate)
    }

    fn load_contents(
        &mut self,
        contents: &str,
        path: &Path,
        generate: Option<bool>,
    ) -> Result<(), TypeSystemError> {
        let file: TypeSystemFile =
            toml::from_str(contents).map_err(|source| TypeSystemError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let generate = generate.unwrap_or(file.generate);
        let package = file.package.clone();

        self.db
            .register(TypeEntry::new(&package, TypeEntryKind::TypeSystem).with_generate_code(generate));

        for dependency in &file.load_typesystem {
            let resolved = path
                .parent()
                .map(|dir| dir.join(&dependency.name))
                .filter(|candidate| candidate.is_file())
                .or_else(|| self.db.resolve_typesystem_file(&dependency.name))
                .ok_or_else(|| TypeSystemError::NotFound(dependency.name.clone()))?;
            self.load_file(&resolved, Some(dependency.generate && generate))?;
        }

        let mut scope = FileScope {
            package: &package,
            generate,
            seen: HashSet::new(),
        };

        for rule in &file.primitive_type {
            scope.add(
                self.db,
                &rule.common,
                TypeEntryKind::Primitive {
                    cpp_primitive: false,
                },
            )?;
        }

        for rule in &file.enum_type {
            scope.add(
                self.db,
                &rule.common,
                TypeEntryKind::Enum {
                    null_value: rule.null_value.clone(),
                    flags: rule.flags.clone(),
                },
            )?;
            if let Some(flags) = &rule.flags {
                let common = CommonRule {
                    name: flags.clone(),
                    generate: rule.common.generate,
                    private: rule.common.private,
                    default_constructor: None,
                    since: rule.common.since.clone(),
                };
                scope.add(
                    self.db,
                    &common,
                    TypeEntryKind::Flags {
                        original_enum: rule.common.name.clone(),
                    },
                )?;
            }
        }

        for rule in &file.container_type {
            let kind = ContainerKind::from_name(&rule.kind)
                .ok_or_else(|| TypeSystemError::InvalidContainerKind(rule.kind.clone()))?;
            scope.add(self.db, &rule.common, TypeEntryKind::Container { kind })?;
        }

        for rule in &file.smart_pointer_type {
            scope.add(
                self.db,
                &rule.common,
                TypeEntryKind::SmartPointer {
                    getter: rule.getter.clone(),
                    ref_count_method: rule.ref_count_method.clone(),
                },
            )?;
        }

        for rule in &file.namespace_type {
            let visibility = match rule.visible {
                Visible::Auto => NamespaceVisibility::Auto,
                Visible::Yes => NamespaceVisibility::Visible,
                Visible::No => NamespaceVisibility::Invisible,
            };
            let mut entry = scope.entry(
                &rule.common,
                TypeEntryKind::Namespace {
                    visibility,
                    inline: rule.inline,
                },
            )?;
            for function in &rule.add_function {
                entry = entry.with_added_function(added_function(function)?);
            }
            self.db.register(entry);
        }

        for (rules, object_type) in [(&file.value_type, false), (&file.object_type, true)] {
            for rule in rules {
                let mut entry = scope.entry(
                    &rule.common,
                    TypeEntryKind::Complex {
                        object_type,
                        generic_class: rule.generic_class,
                    },
                )?;
                for modification in &rule.modify_function {
                    entry = entry.with_modification(function_modification(modification)?);
                }
                for function in &rule.add_function {
                    entry = entry.with_added_function(added_function(function)?);
                }
                self.db.register(entry);
            }
        }

        for rule in &file.function {
            for signature in &rule.signature {
                check_signature(signature)?;
            }
            scope.add(
                self.db,
                &rule.common,
                TypeEntryKind::Function {
                    signatures: rule.signature.iter().map(|s| normalize_signature(s)).collect(),
                },
            )?;
        }

        Ok(())
    }
}

/// Per-file defaults applied to every entry the file declares.
struct FileScope<'p> {
    package: &'p str,
    generate: bool,
    seen: HashSet<String>,
}

impl FileScope<'_> {
    fn entry(&mut self, common: &CommonRule, kind: TypeEntryKind) -> Result<TypeEntry, TypeSystemError> {
        if !self.seen.insert(common.name.clone()) {
            return Err(TypeSystemError::DuplicateEntry(common.name.clone()));
        }

        let mut entry = TypeEntry::new(&common.name, kind)
            .with_package(self.package)
            .with_generate_code(self.generate && common.generate.unwrap_or(true))
            .with_private(common.private);
        if let Some(expression) = &common.default_constructor {
            entry = entry.with_default_constructor(expression);
        }
        if let Some(since) = &common.since {
            let version = ApiVersion::parse(since).ok_or_else(|| TypeSystemError::InvalidVersion {
                package: self.package.to_string(),
                version: since.clone(),
            })?;
            entry = entry.with_since(version);
        }
        Ok(entry)
    }

    fn add(
        &mut self,
        db: &mut TypeDatabase,
        common: &CommonRule,
        kind: TypeEntryKind,
    ) -> Result<(), TypeSystemError> {
        let entry = self.entry(common, kind)?;
        db.register(entry);
        Ok(())
    }
}

/// `name(args)`, optionally followed by `const`.
fn check_signature(signature: &str) -> Result<(), TypeSystemError> {
    let trimmed = signature.trim();
    let valid = match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if open > 0 && close > open => {
            matches!(trimmed[close + 1..].trim(), "" | "const")
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(TypeSystemError::InvalidSignature(signature.to_string()))
    }
}

fn function_modification(rule: &ModifyFunctionRule) -> Result<FunctionModification, TypeSystemError> {
    check_signature(&rule.signature)?;
    Ok(FunctionModification {
        signature: normalize_signature(&rule.signature),
        remove: rule.remove,
        arguments: rule
            .modify_argument
            .iter()
            .map(|a| ArgumentModification {
                index: a.index,
                remove: a.remove,
                replace_default_expression: a.replace_default_expression.clone(),
                remove_default_expression: a.remove_default_expression,
            })
            .collect(),
    })
}

fn added_function(rule: &AddFunctionRule) -> Result<AddedFunction, TypeSystemError> {
    check_signature(&rule.signature)?;
    Ok(AddedFunction {
        signature: rule.signature.clone(),
        return_type: rule.return_type.clone(),
        is_static: rule.is_static,
        access: rule.access,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
package = "sample"

[[primitive-type]]
name = "Handle"

[[enum-type]]
name = "Color"
null-value = "Color::Red"
flags = "Colors"

[[container-type]]
name = "std::vector"
kind = "list"

[[smart-pointer-type]]
name = "std::shared_ptr"
getter = "get"
ref-count-method = "use_count"

[[namespace-type]]
name = "detail"
visible = "no"

[[value-type]]
name = "Point"

[[value-type.modify-function]]
signature = "Point(int, int)"

[[value-type.modify-function.modify-argument]]
index = 2
replace-default-expression = "1"

[[value-type.modify-function]]
signature = "length( ) const"
remove = true

[[object-type]]
name = "Widget"
generate = false

[[object-type.add-function]]
signature = "show(bool visible)"
access = "protected"

[[function]]
name = "origin"
"#;

    #[test]
    fn test_load_sample() {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(SAMPLE).unwrap();

        assert_eq!(db.default_package_name(), "sample");
        assert!(db.find("Handle").is_some_and(|e| e.is_primitive() && !e.is_cpp_primitive()));
        assert_eq!(db.find("Color").and_then(|e| e.null_value()), Some("Color::Red"));
        assert!(db.find("Colors").is_some_and(|e| e.is_flags()));
        assert_eq!(
            db.find("std::vector").and_then(|e| e.container_kind()),
            Some(ContainerKind::List)
        );
        assert_eq!(
            db.find("std::shared_ptr").and_then(|e| e.smart_pointer_getter()),
            Some("get")
        );
        assert!(db.find("detail").is_some_and(|e| !e.is_visible_scope()));
        assert!(db.find_function("origin").is_some());

        let point = db.find("Point").unwrap();
        assert!(point.is_value());
        assert_eq!(point.package(), "sample");
        let modification = &point.modifications()[0];
        assert_eq!(modification.signature, "Point(int,int)");
        assert_eq!(
            modification.argument(2).and_then(|a| a.replace_default_expression.as_deref()),
            Some("1")
        );
        assert_eq!(point.modifications()[1].signature, "length()const");
        assert!(point.modifications()[1].remove);

        let widget = db.find("Widget").unwrap();
        assert!(widget.is_object());
        assert!(!widget.generate_code());
        assert_eq!(widget.added_functions()[0].access, Access::Protected);
    }

    #[test]
    fn test_duplicate_entry() {
        let mut db = TypeDatabase::new();
        let err = db
            .load_typesystem_str(
                r#"
package = "dup"
[[value-type]]
name = "Point"
[[value-type]]
name = "Point"
"#,
            )
            .unwrap_err();
        assert!(matches!(err, TypeSystemError::DuplicateEntry(name) if name == "Point"));
    }

    #[test]
    fn test_invalid_values() {
        let mut db = TypeDatabase::new();
        let err = db
            .load_typesystem_str("package = \"p\"\n[[container-type]]\nname = \"Q\"\nkind = \"tree\"\n")
            .unwrap_err();
        assert!(matches!(err, TypeSystemError::InvalidContainerKind(_)));

        let err = db
            .load_typesystem_str("package = \"p\"\n[[value-type]]\nname = \"V\"\nsince = \"x.y\"\n")
            .unwrap_err();
        assert!(matches!(err, TypeSystemError::InvalidVersion { .. }));

        let err = db
            .load_typesystem_str("package = \"p\"\n[[function]]\nname = \"f\"\nsignature = [\"f\"]\n")
            .unwrap_err();
        assert!(matches!(err, TypeSystemError::InvalidSignature(_)));
        let err = db
            .load_typesystem_str("package = \"p\"\n[[function]]\nname = \"g\"\nsignature = [\"g() volatile\"]\n")
            .unwrap_err();
        assert!(matches!(err, TypeSystemError::InvalidSignature(_)));

        let err = db.load_typesystem_str("package = ").unwrap_err();
        assert!(matches!(err, TypeSystemError::Parse { .. }));
    }

    #[test]
    fn test_load_dependency_without_generation() {
        let dir = tempfile::tempdir().unwrap();
        let core = dir.path().join("typesystem_core.toml");
        let mut file = fs::File::create(&core).unwrap();
        writeln!(file, "package = \"core\"\n[[value-type]]\nname = \"Size\"").unwrap();

        let main = dir.path().join("typesystem_main.toml");
        let mut file = fs::File::create(&main).unwrap();
        writeln!(
            file,
            "package = \"main\"\n[[load-typesystem]]\nname = \"typesystem_core.toml\"\n[[value-type]]\nname = \"Rect\""
        )
        .unwrap();

        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem(main.to_str().unwrap()).unwrap();

        assert_eq!(db.default_package_name(), "main");
        assert!(db.find("Rect").is_some_and(|e| e.generate_code()));
        let size = db.find("Size").unwrap();
        assert!(!size.generate_code());
        assert_eq!(size.package(), "core");
    }

    #[test]
    fn test_missing_file() {
        let mut db = TypeDatabase::new();
        db.add_typesystem_path("/nonexistent");
        let err = db.load_typesystem("typesystem_missing.toml").unwrap_err();
        assert!(matches!(err, TypeSystemError::NotFound(_)));
    }
}
