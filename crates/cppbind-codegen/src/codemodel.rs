//! The declaration graph produced by a C++ front end.
//!
//! A front end (clang-based or otherwise) reads the synthetic translation unit
//! and emits its declarations as JSON. This module defines that document and
//! the [`TypeInfo`] parser for the C++ type spellings it contains.
//!
//! ```json
//! {
//!   "namespaces": [{
//!     "name": "geo",
//!     "classes": [{
//!       "name": "Point",
//!       "functions": [
//!         { "name": "Point", "arguments": [] },
//!         { "name": "translate", "returnType": "void",
//!           "arguments": [{ "name": "dx", "type": "int", "defaultValue": "0" }] }
//!       ]
//!     }]
//!   }]
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Member access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// Reference kind of a type usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceType {
    #[default]
    NoReference,
    LValueReference,
    RValueReference,
}

/// A parsed C++ type spelling such as `const std::vector<int> &`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeInfo {
    /// Name segments, e.g. `["std", "vector"]`.
    pub qualified_name: Vec<String>,
    pub is_const: bool,
    pub reference: ReferenceType,
    pub indirections: usize,
    pub arguments: Vec<TypeInfo>,
    /// Array dimensions from outermost to innermost; empty strings are unsized.
    pub array_dimensions: Vec<String>,
}

impl TypeInfo {
    pub fn void() -> Self {
        Self::named("void")
    }

    pub fn named(name: &str) -> Self {
        Self {
            qualified_name: split_qualified(name),
            is_const: false,
            reference: ReferenceType::NoReference,
            indirections: 0,
            arguments: Vec::new(),
            array_dimensions: Vec::new(),
        }
    }

    /// Parse a C++ type spelling.
    pub fn parse(text: &str) -> Result<Self, ExtractError> {
        let invalid = || ExtractError::InvalidType(text.to_string());
        let mut rest = text.trim();

        let mut array_dimensions = Vec::new();
        while rest.ends_with(']') {
            let open = rest.rfind('[').ok_or_else(invalid)?;
            array_dimensions.insert(0, rest[open + 1..rest.len() - 1].trim().to_string());
            rest = rest[..open].trim_end();
        }

        let mut reference = ReferenceType::NoReference;
        if let Some(stripped) = rest.strip_suffix("&&") {
            reference = ReferenceType::RValueReference;
            rest = stripped.trim_end();
        } else if let Some(stripped) = rest.strip_suffix('&') {
            reference = ReferenceType::LValueReference;
            rest = stripped.trim_end();
        }

        // `const` directly after a `*` qualifies the pointer itself.
        let mut indirections = 0;
        loop {
            if let Some(stripped) = rest.strip_suffix('*') {
                indirections += 1;
                rest = stripped.trim_end();
            } else if indirections > 0
                && let Some(stripped) = strip_keyword_suffix(rest, "const")
            {
                rest = stripped;
            } else {
                break;
            }
        }

        let mut is_const = false;
        let mut arguments = Vec::new();
        let (head, tail) = match rest.find('<') {
            Some(open) => {
                let close = matching_angle(rest, open).ok_or_else(invalid)?;
                for argument in split_top_level(&rest[open + 1..close]) {
                    arguments.push(TypeInfo::parse(argument)?);
                }
                (&rest[..open], &rest[close + 1..])
            }
            None => (rest, ""),
        };

        let mut words = Vec::new();
        for word in head.split_whitespace().chain(tail.split_whitespace()) {
            match word {
                "const" => is_const = true,
                "volatile" | "struct" | "class" | "union" | "enum" | "typename" => {}
                _ => words.push(word),
            }
        }
        if words.is_empty() {
            return Err(invalid());
        }
        let name = words.join(" ");
        let qualified_name = split_qualified(&name);
        if qualified_name.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        Ok(Self {
            qualified_name,
            is_const,
            reference,
            indirections,
            arguments,
            array_dimensions,
        })
    }

    /// The qualified name without modifiers or template arguments.
    pub fn qualified_name_string(&self) -> String {
        self.qualified_name.join("::")
    }

    pub fn is_void(&self) -> bool {
        self.qualified_name == ["void"]
            && self.indirections == 0
            && self.reference == ReferenceType::NoReference
            && self.array_dimensions.is_empty()
    }

    pub fn is_array(&self) -> bool {
        !self.array_dimensions.is_empty()
    }
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self::void()
    }
}

impl TryFrom<String> for TypeInfo {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeInfo::parse(&value)
    }
}

impl From<TypeInfo> for String {
    fn from(value: TypeInfo) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        f.write_str(&self.qualified_name_string())?;
        if !self.arguments.is_empty() {
            let arguments: Vec<_> = self.arguments.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", arguments.join(", "))?;
        }
        if self.indirections > 0 || self.reference != ReferenceType::NoReference {
            f.write_str(" ")?;
        }
        for _ in 0..self.indirections {
            f.write_str("*")?;
        }
        match self.reference {
            ReferenceType::NoReference => {}
            ReferenceType::LValueReference => f.write_str("&")?,
            ReferenceType::RValueReference => f.write_str("&&")?,
        }
        for dimension in &self.array_dimensions {
            write!(f, "[{dimension}]")?;
        }
        Ok(())
    }
}

fn split_qualified(name: &str) -> Vec<String> {
    let name = name.trim().trim_start_matches("::");
    name.split("::").map(|s| s.trim().to_string()).collect()
}

fn strip_keyword_suffix<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let stripped = text.strip_suffix(keyword)?.trim_end();
    stripped.ends_with('*').then_some(stripped)
}

fn matching_angle(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside `<>` or `()`.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// Declarations found at one scope level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeModel {
    pub namespaces: Vec<NamespaceModel>,
    pub classes: Vec<ClassModel>,
    pub functions: Vec<FunctionModel>,
    pub enums: Vec<EnumModel>,
}

/// The whole parsed translation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeModel {
    #[serde(flatten)]
    pub global: ScopeModel,
}

impl CodeModel {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ExtractError::CodeModel {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&contents).map_err(|e| ExtractError::CodeModel {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamespaceModel {
    pub name: String,
    pub inline: bool,
    #[serde(flatten)]
    pub scope: ScopeModel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassModel {
    pub name: String,
    pub access: Access,
    /// Template parameter names, e.g. `["T"]` for `template <class T>`.
    pub template_parameters: Vec<String>,
    pub base_classes: Vec<String>,
    pub is_final: bool,
    pub functions: Vec<FunctionModel>,
    pub fields: Vec<FieldModel>,
    pub enums: Vec<EnumModel>,
    pub classes: Vec<ClassModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FunctionModel {
    pub name: String,
    pub access: Access,
    pub return_type: TypeInfo,
    pub arguments: Vec<ArgumentModel>,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_constant: bool,
    pub is_deprecated: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArgumentModel {
    pub name: String,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldModel {
    pub name: String,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    pub access: Access,
    pub is_static: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumModel {
    pub name: String,
    pub access: Access,
    pub is_scoped: bool,
    pub values: Vec<EnumValueModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumValueModel {
    pub name: String,
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_types() {
        let int = TypeInfo::parse("int").unwrap();
        assert_eq!(int.qualified_name, ["int"]);
        assert_eq!(int.indirections, 0);

        let unsigned = TypeInfo::parse("unsigned long").unwrap();
        assert_eq!(unsigned.qualified_name_string(), "unsigned long");

        assert!(TypeInfo::parse("void").unwrap().is_void());
        assert!(!TypeInfo::parse("void *").unwrap().is_void());
    }

    #[test]
    fn test_parse_modifiers() {
        let ty = TypeInfo::parse("const ::geo::Point &").unwrap();
        assert!(ty.is_const);
        assert_eq!(ty.reference, ReferenceType::LValueReference);
        assert_eq!(ty.qualified_name, ["geo", "Point"]);

        let ty = TypeInfo::parse("Point&&").unwrap();
        assert_eq!(ty.reference, ReferenceType::RValueReference);

        let ty = TypeInfo::parse("const char * const *").unwrap();
        assert!(ty.is_const);
        assert_eq!(ty.indirections, 2);

        let ty = TypeInfo::parse("Widget const*").unwrap();
        assert!(ty.is_const);
        assert_eq!(ty.indirections, 1);
    }

    #[test]
    fn test_parse_templates() {
        let ty = TypeInfo::parse("const std::map<std::string, std::vector<int>> &").unwrap();
        assert_eq!(ty.qualified_name_string(), "std::map");
        assert_eq!(ty.arguments.len(), 2);
        assert_eq!(ty.arguments[1].qualified_name_string(), "std::vector");
        assert_eq!(ty.arguments[1].arguments[0].qualified_name, ["int"]);
        assert_eq!(ty.to_string(), "const std::map<std::string, std::vector<int>> &");
    }

    #[test]
    fn test_parse_arrays() {
        let ty = TypeInfo::parse("int[3][4]").unwrap();
        assert_eq!(ty.array_dimensions, ["3", "4"]);
        assert_eq!(ty.to_string(), "int[3][4]");

        let ty = TypeInfo::parse("double[]").unwrap();
        assert_eq!(ty.array_dimensions, [""]);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TypeInfo::parse("").is_err());
        assert!(TypeInfo::parse("const &").is_err());
        assert!(TypeInfo::parse("std::vector<int").is_err());
    }

    #[test]
    fn test_code_model_from_json() {
        let json = r#"{
            "namespaces": [{
                "name": "geo",
                "classes": [{
                    "name": "Point",
                    "functions": [
                        { "name": "Point" },
                        { "name": "Point", "arguments": [
                            { "name": "x", "type": "int" },
                            { "name": "y", "type": "int", "defaultValue": "0" }
                        ]},
                        { "name": "hidden", "access": "private" }
                    ],
                    "fields": [{ "name": "x", "type": "int" }]
                }]
            }],
            "functions": [{ "name": "origin", "returnType": "geo::Point" }]
        }"#;

        let model = CodeModel::from_json_str(json).unwrap();
        let geo = &model.global.namespaces[0];
        assert_eq!(geo.name, "geo");
        let point = &geo.scope.classes[0];
        assert_eq!(point.functions.len(), 3);
        assert!(point.functions[0].return_type.is_void());
        assert_eq!(point.functions[1].arguments[1].default_value.as_deref(), Some("0"));
        assert_eq!(point.functions[2].access, Access::Private);
        assert_eq!(
            model.global.functions[0].return_type.qualified_name,
            ["geo", "Point"]
        );
    }

    #[test]
    fn test_code_model_rejects_bad_type() {
        let json = r#"{ "functions": [{ "name": "f", "returnType": "std::vector<" }] }"#;
        assert!(CodeModel::from_json_str(json).is_err());
    }
}
