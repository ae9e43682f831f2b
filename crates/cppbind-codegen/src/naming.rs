//! Name canonicalization for generated identifiers, files and directories.
//!
//! All names derived from C++ spellings go through [`canonical_identifier`],
//! so the same qualified name always maps to the same identifier and file.

use std::path::PathBuf;

/// How template brackets and separators are rendered by [`canonical_identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierStyle {
    /// Every separator becomes `_`: `std::vector<int>` -> `std_vector_int_`.
    Filtered,
    /// Closing brackets and whitespace are dropped: `std::vector<int>` -> `std_vector_int`.
    Compact,
}

/// Convert a C++ spelling (qualifiers and template arguments) into an identifier.
///
/// | Input                    | Filtered               | Compact              |
/// |--------------------------|------------------------|----------------------|
/// | `ns::Point`              | `ns_Point`             | `ns_Point`           |
/// | `std::vector<int>`       | `std_vector_int_`      | `std_vector_int`     |
/// | `std::map<int, ns::Key>` | `std_map_int__ns_Key_` | `std_map_int_ns_Key` |
/// | `unsigned int *`         | `unsigned_int__`       | `unsignedint_`       |
pub fn canonical_identifier(text: &str, style: IdentifierStyle) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.push('_');
            }
            '<' | ',' | '*' | '&' => out.push('_'),
            '>' => {
                if style == IdentifierStyle::Filtered {
                    out.push('_');
                }
            }
            c if c.is_whitespace() => {
                if style == IdentifierStyle::Filtered {
                    out.push('_');
                }
            }
            c if c.is_alphanumeric() || c == '_' => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

/// Remove whitespace that does not separate two identifier characters.
///
/// `Point(unsigned  int, const Foo &)` -> `Point(unsigned int,const Foo&)`.
pub fn normalize_signature(text: &str) -> String {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && is_ident(c) && out.chars().next_back().is_some_and(is_ident) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// The base name of the file generated for a class, e.g. `ns_point` for `ns::Point`.
pub fn class_file_base(qualified_cpp_name: &str) -> String {
    canonical_identifier(qualified_cpp_name, IdentifierStyle::Compact).to_lowercase()
}

/// The base name of the file generated for a smart-pointer instantiation.
///
/// `std::shared_ptr` holding `ns::Widget` -> `std_shared_ptr_widget`.
pub fn smart_pointer_file_base(wrapper_qualified_name: &str, pointee_name: &str) -> String {
    format!(
        "{}_{}",
        class_file_base(wrapper_qualified_name),
        canonical_identifier(pointee_name, IdentifierStyle::Compact).to_lowercase()
    )
}

/// Sub-directory for a package: `sample.core` -> `sample/core`.
pub fn package_sub_directory(package: &str) -> PathBuf {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

/// The module name of a package: its last dotted segment.
pub fn module_name(package: &str) -> &str {
    package.rsplit('.').next().unwrap_or(package)
}

/// The module name derived from a type-rule file name: `typesystem_sample.toml` -> `sample`.
pub fn module_name_from_typesystem_file(file_name: &str) -> &str {
    let stem = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let stem = stem.split('.').next().unwrap_or(stem);
    stem.strip_prefix("typesystem_").unwrap_or(stem)
}

/// Host-language method name for a C++ operator, `None` for non-operators.
pub fn operator_name(function_name: &str, arity: usize) -> Option<&'static str> {
    let op = function_name.strip_prefix("operator")?.trim();
    let name = match (op, arity) {
        ("+", 0) => "pos",
        ("-", 0) => "neg",
        ("+", _) => "add",
        ("-", _) => "sub",
        ("*", 0) => "deref",
        ("*", _) => "mul",
        ("/", _) => "div",
        ("%", _) => "mod",
        ("+=", _) => "add_assign",
        ("-=", _) => "sub_assign",
        ("*=", _) => "mul_assign",
        ("/=", _) => "div_assign",
        ("%=", _) => "mod_assign",
        ("&", _) => "bit_and",
        ("|", _) => "bit_or",
        ("^", _) => "bit_xor",
        ("~", _) => "invert",
        ("<<", _) => "shl",
        (">>", _) => "shr",
        ("&=", _) => "bit_and_assign",
        ("|=", _) => "bit_or_assign",
        ("^=", _) => "bit_xor_assign",
        ("<<=", _) => "shl_assign",
        (">>=", _) => "shr_assign",
        ("==", _) => "eq",
        ("!=", _) => "ne",
        ("<", _) => "lt",
        ("<=", _) => "le",
        (">", _) => "gt",
        (">=", _) => "ge",
        ("!", _) => "not",
        ("[]", _) => "index",
        ("()", _) => "call",
        ("++", 0) => "inc",
        ("--", 0) => "dec",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_identifier() {
        use IdentifierStyle::*;
        assert_eq!(canonical_identifier("ns::Point", Filtered), "ns_Point");
        assert_eq!(canonical_identifier("std::vector<int>", Filtered), "std_vector_int_");
        assert_eq!(canonical_identifier("std::vector<int>", Compact), "std_vector_int");
        assert_eq!(
            canonical_identifier("std::map<int, ns::Key>", Filtered),
            "std_map_int__ns_Key_"
        );
        assert_eq!(
            canonical_identifier("std::map<int, ns::Key>", Compact),
            "std_map_int_ns_Key"
        );
        assert_eq!(canonical_identifier("unsigned int *", Filtered), "unsigned_int__");
        assert_eq!(canonical_identifier("unsigned int *", Compact), "unsignedint_");
        assert_eq!(canonical_identifier("::Point", Compact), "_Point");
    }

    #[test]
    fn test_normalize_signature() {
        assert_eq!(normalize_signature("Point(int, int)"), "Point(int,int)");
        assert_eq!(
            normalize_signature(" Point( unsigned  int , const Foo & ) "),
            "Point(unsigned int,const Foo&)"
        );
        assert_eq!(normalize_signature("f()"), "f()");
    }

    #[test]
    fn test_file_bases() {
        assert_eq!(class_file_base("ns::Point"), "ns_point");
        assert_eq!(
            smart_pointer_file_base("std::shared_ptr", "Widget"),
            "std_shared_ptr_widget"
        );
    }

    #[test]
    fn test_package_helpers() {
        assert_eq!(
            package_sub_directory("sample.core"),
            PathBuf::from("sample").join("core")
        );
        assert_eq!(module_name("sample.core"), "core");
        assert_eq!(module_name("sample"), "sample");
        assert_eq!(module_name_from_typesystem_file("dir/typesystem_sample.toml"), "sample");
        assert_eq!(module_name_from_typesystem_file("rules.toml"), "rules");
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(operator_name("operator+", 1), Some("add"));
        assert_eq!(operator_name("operator-", 0), Some("neg"));
        assert_eq!(operator_name("operator==", 1), Some("eq"));
        assert_eq!(operator_name("operator new", 1), None);
        assert_eq!(operator_name("length", 0), None);
    }
}
