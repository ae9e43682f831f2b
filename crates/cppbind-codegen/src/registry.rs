//! The type-rule database.
//!
//! The [`TypeDatabase`] is the central place where the generator learns how to
//! treat each C++ type. It is constructed once by the driver, populated from
//! the type-rule files (see [`crate::typesystem`]) and then passed by reference
//! to every component that needs lookups. After extraction starts it is never
//! mutated again.
//!
//! # Built-in entries
//!
//! [`TypeDatabase::with_builtins`] registers `void` and every builtin C++
//! scalar listed in [`CPP_PRIMITIVES`], all with code generation disabled.
//! Type-rule files may override any of them.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::TypeSystemError;
use crate::types::{CPP_PRIMITIVES, TypeEntry, TypeEntryKind, TypeEntryRef};

/// A dotted numeric version such as `5.15` or `1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiVersion(Vec<u32>);

impl ApiVersion {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut parts = text
            .split('.')
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        while parts.len() > 1 && parts.last() == Some(&0) {
            parts.pop();
        }
        Some(Self(parts))
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.0.iter().map(|p| p.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

/// A table of qualified C++ name -> [`TypeEntry`] rules.
#[derive(Debug, Clone, Default)]
pub struct TypeDatabase {
    entries: Vec<TypeEntryRef>,
    by_name: HashMap<String, TypeEntryRef>,
    default_type_system: Option<TypeEntryRef>,
    drop_entries: HashSet<String>,
    /// Package name ("*" for any) -> requested version.
    api_versions: Vec<(String, ApiVersion)>,
    typesystem_paths: Vec<PathBuf>,
}

impl TypeDatabase {
    /// Create an empty database with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database pre-populated with `void` and the C++ builtins.
    pub fn with_builtins() -> Self {
        let mut db = Self::new();
        db.register_builtins();
        db
    }

    /// Register `void` and the builtin C++ scalar types.
    pub fn register_builtins(&mut self) {
        self.register(TypeEntry::new("void", TypeEntryKind::Void).with_generate_code(false));
        for name in CPP_PRIMITIVES {
            self.register(TypeEntry::cpp_primitive(*name));
        }
    }

    /// Register an entry under its qualified name.
    ///
    /// Entries on the drop list or newer than the requested API version of
    /// their package are discarded and `None` is returned. An entry with an
    /// already registered name replaces the previous one.
    pub fn register(&mut self, entry: TypeEntry) -> Option<TypeEntryRef> {
        let name = entry.qualified_cpp_name().to_string();
        if self.is_dropped(&name) {
            log::debug!("Dropping type entry '{name}' as requested");
            return None;
        }
        if let Some(since) = entry.since()
            && !self.check_api_version(entry.package(), since)
        {
            log::debug!("Skipping type entry '{name}' (since {since})");
            return None;
        }

        let entry = Rc::new(entry);
        if entry.is_type_system() && self.default_type_system.is_none() {
            self.default_type_system = Some(entry.clone());
        }
        if let Some(previous) = self.by_name.insert(name, entry.clone()) {
            self.entries.retain(|e| !Rc::ptr_eq(e, &previous));
        }
        self.entries.push(entry.clone());
        Some(entry)
    }

    /// Look up the entry for a fully-qualified C++ name.
    pub fn find(&self, name: &str) -> Option<&TypeEntryRef> {
        self.by_name.get(name)
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Remove an entry.
    pub fn unregister(&mut self, name: &str) -> Option<TypeEntryRef> {
        let removed = self.by_name.remove(name)?;
        self.entries.retain(|e| !Rc::ptr_eq(e, &removed));
        if self
            .default_type_system
            .as_ref()
            .is_some_and(|d| Rc::ptr_eq(d, &removed))
        {
            self.default_type_system = None;
        }
        Some(removed)
    }

    /// All entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &TypeEntryRef> {
        self.entries.iter()
    }

    /// The module entry of the first loaded type-system file.
    pub fn default_type_system_type(&self) -> Option<&TypeEntryRef> {
        self.default_type_system.as_ref()
    }

    /// The package of the module being generated, e.g. `sample.core`.
    pub fn default_package_name(&self) -> &str {
        self.default_type_system
            .as_ref()
            .map(|e| e.qualified_cpp_name())
            .unwrap_or_default()
    }

    pub fn primitive_types(&self) -> Vec<&TypeEntryRef> {
        self.entries.iter().filter(|e| e.is_primitive()).collect()
    }

    pub fn container_types(&self) -> Vec<&TypeEntryRef> {
        self.entries.iter().filter(|e| e.is_container()).collect()
    }

    pub fn smart_pointer_types(&self) -> Vec<&TypeEntryRef> {
        self.entries.iter().filter(|e| e.is_smart_pointer()).collect()
    }

    /// Find the global function rule whose name matches.
    pub fn find_function(&self, name: &str) -> Option<&TypeEntryRef> {
        self.by_name.get(name).filter(|e| e.is_function())
    }

    /// Set the qualified names of entries to drop from generation.
    pub fn set_drop_type_entries<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_entries = names.into_iter().map(Into::into).collect();
    }

    pub fn is_dropped(&self, name: &str) -> bool {
        self.drop_entries.contains(name)
    }

    /// Request a version of a package's API; `"*"` matches every package.
    pub fn set_api_version(&mut self, package: &str, version: &str) -> Result<(), TypeSystemError> {
        let parsed = ApiVersion::parse(version).ok_or_else(|| TypeSystemError::InvalidVersion {
            package: package.to_string(),
            version: version.to_string(),
        })?;
        self.api_versions.retain(|(p, _)| p != package);
        self.api_versions.push((package.to_string(), parsed));
        Ok(())
    }

    /// Whether an entry introduced in `since` belongs to the requested API.
    pub fn check_api_version(&self, package: &str, since: &ApiVersion) -> bool {
        let requested = self
            .api_versions
            .iter()
            .find(|(p, _)| p == package)
            .or_else(|| self.api_versions.iter().find(|(p, _)| p == "*"));
        match requested {
            Some((_, version)) => since <= version,
            None => true,
        }
    }

    pub fn add_typesystem_path(&mut self, path: impl Into<PathBuf>) {
        self.typesystem_paths.push(path.into());
    }

    pub fn typesystem_paths(&self) -> &[PathBuf] {
        &self.typesystem_paths
    }

    /// Resolve a type-system file name against the search paths.
    pub fn resolve_typesystem_file(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        self.typesystem_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_with_builtins() {
        let db = TypeDatabase::with_builtins();
        assert!(db.contains("void"));
        assert!(db.contains("int"));
        assert!(db.contains("unsigned long long"));
        assert!(db.find("bool").is_some_and(|e| e.is_cpp_primitive()));
        assert!(!db.contains("Point"));
        assert!(db.default_type_system_type().is_none());
    }

    #[test]
    fn test_registry_override_builtin() {
        let mut db = TypeDatabase::with_builtins();
        let before = db.entries().count();
        db.register(TypeEntry::new(
            "int",
            TypeEntryKind::Primitive { cpp_primitive: true },
        ));
        assert_eq!(db.entries().count(), before);
        assert!(db.find("int").is_some_and(|e| e.generate_code()));
    }

    #[test]
    fn test_registry_unregister() {
        let mut db = TypeDatabase::with_builtins();
        assert!(db.unregister("double").is_some());
        assert!(!db.contains("double"));
        assert!(db.unregister("double").is_none());
    }

    #[test]
    fn test_default_type_system_is_first_module() {
        let mut db = TypeDatabase::new();
        db.register(TypeEntry::new("sample", TypeEntryKind::TypeSystem));
        db.register(TypeEntry::new("other", TypeEntryKind::TypeSystem));
        assert_eq!(db.default_package_name(), "sample");
    }

    #[test]
    fn test_drop_type_entries() {
        let mut db = TypeDatabase::new();
        db.set_drop_type_entries(["Legacy"]);
        assert!(db.register(TypeEntry::value_type("Legacy")).is_none());
        assert!(db.register(TypeEntry::value_type("Modern")).is_some());
    }

    #[test]
    fn test_api_version_filters_newer_entries() {
        let mut db = TypeDatabase::new();
        db.set_api_version("sample", "5.12").unwrap();
        let newer = TypeEntry::value_type("Newer")
            .with_package("sample")
            .with_since(ApiVersion::parse("5.14").unwrap());
        let older = TypeEntry::value_type("Older")
            .with_package("sample")
            .with_since(ApiVersion::parse("5.12.0").unwrap());
        let elsewhere = TypeEntry::value_type("Elsewhere")
            .with_package("other")
            .with_since(ApiVersion::parse("9").unwrap());
        assert!(db.register(newer).is_none());
        assert!(db.register(older).is_some());
        assert!(db.register(elsewhere).is_some());
    }

    #[test]
    fn test_invalid_api_version() {
        let mut db = TypeDatabase::new();
        let err = db.set_api_version("*", "five").unwrap_err();
        assert!(err.to_string().contains("five"));
    }

    #[test]
    fn test_version_ordering() {
        let v = |s| ApiVersion::parse(s).unwrap();
        assert!(v("1.2") < v("1.10"));
        assert_eq!(v("2.0.0"), v("2"));
        assert_eq!(v("2.0").cmp(&v("2")), Ordering::Equal);
        assert_eq!(v("3.1").to_string(), "3.1");
        assert!(ApiVersion::parse("1..2").is_none());
    }
}
