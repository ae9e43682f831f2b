//! The extraction driver: headers in, [`ApiExtractorResult`] out.
//!
//! The headers are combined into one synthetic translation unit, handed to a
//! C++ [`Frontend`] together with the compiler arguments, and the returned
//! declaration graph is turned into the API model by [`ApiBuilder`].
//!
//! ```rust,ignore
//! let mut extractor = ApiExtractor::new();
//! extractor.add_header_path("include/")?;
//! extractor.add_include_path(HeaderPath::new("include/", HeaderType::Standard));
//! let api = extractor.run(&db, &JsonFrontend::new("model.json"))?;
//! ```

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builder::{ApiBuilder, BuilderOptions};
use crate::codemodel::CodeModel;
use crate::error::ExtractError;
use crate::model::ApiExtractorResult;
use crate::registry::TypeDatabase;

/// Extensions picked up when a header argument is a directory.
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx"];

/// Set this variable to keep the generated translation unit on disk.
pub const KEEP_TEMP_FILES_VAR: &str = "KEEP_TEMP_FILES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    Standard,
    /// A macOS framework directory.
    Framework,
    /// System headers; warnings in them are suppressed by the front end.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPath {
    pub path: PathBuf,
    pub kind: HeaderType,
}

impl HeaderPath {
    pub fn new(path: impl Into<PathBuf>, kind: HeaderType) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn compiler_argument(&self) -> String {
        let flag = match self.kind {
            HeaderType::Standard => "-I",
            HeaderType::Framework => "-F",
            HeaderType::System => "-isystem",
        };
        format!("{flag}{}", self.path.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LanguageLevel {
    Cpp11,
    Cpp14,
    #[default]
    Cpp17,
    Cpp20,
}

impl LanguageLevel {
    pub const ALL: [LanguageLevel; 4] = [
        LanguageLevel::Cpp11,
        LanguageLevel::Cpp14,
        LanguageLevel::Cpp17,
        LanguageLevel::Cpp20,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LanguageLevel::Cpp11 => "c++11",
            LanguageLevel::Cpp14 => "c++14",
            LanguageLevel::Cpp17 => "c++17",
            LanguageLevel::Cpp20 => "c++20",
        }
    }

    /// Accepts `c++17` as well as the compiler spelling `-std=c++17`.
    pub fn from_option(option: &str) -> Option<Self> {
        let name = option.strip_prefix("-std=").unwrap_or(option);
        Self::ALL.into_iter().find(|level| level.as_str() == name)
    }

    pub fn compiler_argument(self) -> String {
        format!("-std={}", self.as_str())
    }
}

/// Everything a front end needs to parse the translation unit.
#[derive(Debug)]
pub struct ParseRequest<'a> {
    pub translation_unit: &'a Path,
    pub headers: &'a [PathBuf],
    pub arguments: &'a [String],
}

/// A C++ front end producing the declaration graph of a translation unit.
pub trait Frontend {
    fn parse(&self, request: &ParseRequest<'_>) -> Result<CodeModel, ExtractError>;
}

/// An already parsed declaration graph.
impl Frontend for CodeModel {
    fn parse(&self, _request: &ParseRequest<'_>) -> Result<CodeModel, ExtractError> {
        Ok(self.clone())
    }
}

/// Reads the declaration graph an external front end wrote as JSON.
#[derive(Debug, Clone)]
pub struct JsonFrontend {
    path: PathBuf,
}

impl JsonFrontend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Frontend for JsonFrontend {
    fn parse(&self, request: &ParseRequest<'_>) -> Result<CodeModel, ExtractError> {
        log::debug!(
            "Reading code model {} for {} ({} arguments)",
            self.path.display(),
            request.translation_unit.display(),
            request.arguments.len()
        );
        CodeModel::from_file(&self.path)
    }
}

/// Collects the extraction inputs and runs the extraction once.
#[derive(Debug, Default)]
pub struct ApiExtractor {
    headers: Vec<PathBuf>,
    include_paths: Vec<HeaderPath>,
    typesystem_path: Option<PathBuf>,
    compiler_options: Vec<String>,
    language_level: LanguageLevel,
    skip_deprecated: bool,
    has_run: bool,
}

impl ApiExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.headers.push(path.into());
        self
    }

    /// Add a header file, or every header below a directory in sorted order.
    pub fn add_header_path(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, ExtractError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ExtractError::MissingHeader(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Ok(self.add_header(path));
        }
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            let is_header = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| HEADER_EXTENSIONS.contains(&e));
            if entry.file_type().is_file() && is_header {
                self.headers.push(file.to_path_buf());
            }
        }
        Ok(self)
    }

    pub fn headers(&self) -> &[PathBuf] {
        &self.headers
    }

    pub fn add_include_path(&mut self, path: HeaderPath) -> &mut Self {
        self.include_paths.push(path);
        self
    }

    pub fn set_typesystem_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.typesystem_path = Some(path.into());
        self
    }

    /// Extra compiler arguments. A lone `-` as first option disables the
    /// built-in arguments.
    pub fn add_compiler_option(&mut self, option: impl Into<String>) -> &mut Self {
        self.compiler_options.push(option.into());
        self
    }

    pub fn set_language_level(&mut self, level: LanguageLevel) -> &mut Self {
        self.language_level = level;
        self
    }

    pub fn language_level(&self) -> LanguageLevel {
        self.language_level
    }

    pub fn set_skip_deprecated(&mut self, skip: bool) -> &mut Self {
        self.skip_deprecated = skip;
        self
    }

    /// The argument list handed to the front end.
    pub fn compiler_arguments(&self) -> Vec<String> {
        let mut arguments = Vec::new();
        let user_options = match self.compiler_options.split_first() {
            Some((first, rest)) if first == "-" => rest,
            _ => {
                arguments.extend([
                    "-x".to_string(),
                    "c++".to_string(),
                    self.language_level.compiler_argument(),
                    "-DCPPBIND_EXTRACTION".to_string(),
                ]);
                &self.compiler_options[..]
            }
        };
        arguments.extend(self.include_paths.iter().map(HeaderPath::compiler_argument));
        arguments.extend(user_options.iter().cloned());
        arguments
    }

    /// Parse the headers and build the API model. Can be called only once.
    pub fn run(&mut self, db: &TypeDatabase, frontend: &dyn Frontend) -> Result<ApiExtractorResult, ExtractError> {
        if self.has_run {
            return Err(ExtractError::AlreadyRun);
        }
        self.has_run = true;

        if self.headers.is_empty() {
            return Err(ExtractError::NoHeaders);
        }
        let mut headers = Vec::with_capacity(self.headers.len());
        for header in &self.headers {
            let absolute = fs::canonicalize(header).map_err(|_| ExtractError::MissingHeader(header.clone()))?;
            headers.push(absolute);
        }

        let stem = headers[0]
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cppbind".to_string());
        let mut unit = tempfile::Builder::new()
            .prefix(&format!("{stem}_"))
            .suffix(".hpp")
            .tempfile()
            .map_err(ExtractError::TempFile)?;
        unit.write_all(translation_unit(&headers).as_bytes())
            .map_err(ExtractError::TempFile)?;

        let arguments = self.compiler_arguments();
        log::debug!("Parsing {} with {}", unit.path().display(), arguments.join(" "));
        let request = ParseRequest {
            translation_unit: unit.path(),
            headers: &headers,
            arguments: &arguments,
        };
        let model = match frontend.parse(&request) {
            Ok(model) => model,
            Err(err) => {
                keep_translation_unit(unit);
                return Err(err);
            }
        };
        if env::var_os(KEEP_TEMP_FILES_VAR).is_some() {
            keep_translation_unit(unit);
        }

        let mut builder = ApiBuilder::new(db).with_options(BuilderOptions {
            skip_deprecated: self.skip_deprecated,
        });
        let mut result = builder.build(&model)?;
        result.headers = headers;
        result.typesystem_path = self.typesystem_path.clone();
        Ok(result)
    }
}

/// `#include "<path>"` for every header.
fn translation_unit(headers: &[PathBuf]) -> String {
    headers
        .iter()
        .map(|h| format!("#include \"{}\"\n", h.display()))
        .collect()
}

fn keep_translation_unit(unit: tempfile::NamedTempFile) {
    match unit.keep() {
        Ok((_, path)) => log::info!("Keeping translation unit {}", path.display()),
        Err(err) => log::warn!("Could not keep translation unit: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const RULES: &str = r#"
package = "sample"

[[value-type]]
name = "Point"
"#;

    const MODEL: &str = r#"{ "classes": [{ "name": "Point" }, { "name": "Unlisted" }] }"#;

    struct Recording {
        seen: RefCell<Option<(String, Vec<String>)>>,
        fail: bool,
    }

    impl Frontend for Recording {
        fn parse(&self, request: &ParseRequest<'_>) -> Result<CodeModel, ExtractError> {
            let unit = fs::read_to_string(request.translation_unit).unwrap();
            *self.seen.borrow_mut() = Some((unit, request.arguments.to_vec()));
            if self.fail {
                return Err(ExtractError::Frontend("syntax error".to_string()));
            }
            Ok(CodeModel::from_json_str(MODEL).unwrap())
        }
    }

    fn database() -> TypeDatabase {
        let mut db = TypeDatabase::with_builtins();
        db.load_typesystem_str(RULES).unwrap();
        db
    }

    #[test]
    fn test_language_level() {
        assert_eq!(LanguageLevel::from_option("c++20"), Some(LanguageLevel::Cpp20));
        assert_eq!(LanguageLevel::from_option("-std=c++14"), Some(LanguageLevel::Cpp14));
        assert_eq!(LanguageLevel::from_option("c++98"), None);
        assert_eq!(LanguageLevel::default().compiler_argument(), "-std=c++17");
    }

    #[test]
    fn test_compiler_arguments() {
        let mut extractor = ApiExtractor::new();
        extractor
            .add_include_path(HeaderPath::new("/opt/include", HeaderType::Standard))
            .add_include_path(HeaderPath::new("/Library/Frameworks", HeaderType::Framework))
            .add_include_path(HeaderPath::new("/usr/include", HeaderType::System))
            .add_compiler_option("-DNDEBUG")
            .set_language_level(LanguageLevel::Cpp20);
        assert_eq!(
            extractor.compiler_arguments(),
            vec![
                "-x",
                "c++",
                "-std=c++20",
                "-DCPPBIND_EXTRACTION",
                "-I/opt/include",
                "-F/Library/Frameworks",
                "-isystem/usr/include",
                "-DNDEBUG",
            ]
        );

        let mut bare = ApiExtractor::new();
        bare.add_compiler_option("-").add_compiler_option("-DX");
        assert_eq!(bare.compiler_arguments(), vec!["-DX"]);
    }

    #[test]
    fn test_run_builds_model_once() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("point.h");
        fs::write(&header, "struct Point {};\n").unwrap();

        let db = database();
        let frontend = Recording {
            seen: RefCell::new(None),
            fail: false,
        };
        let mut extractor = ApiExtractor::new();
        extractor.add_header(&header).set_typesystem_path("typesystem_sample.toml");
        let api = extractor.run(&db, &frontend).unwrap();

        let names: Vec<_> = api.classes().map(|c| c.qualified_cpp_name()).collect();
        assert_eq!(names, vec!["Point"]);
        assert_eq!(api.headers(), [fs::canonicalize(&header).unwrap()]);
        assert_eq!(api.typesystem_path(), Some(Path::new("typesystem_sample.toml")));

        let (unit, arguments) = frontend.seen.borrow().clone().unwrap();
        assert_eq!(unit, format!("#include \"{}\"\n", fs::canonicalize(&header).unwrap().display()));
        assert!(arguments.contains(&"-std=c++17".to_string()));

        assert!(matches!(extractor.run(&db, &frontend), Err(ExtractError::AlreadyRun)));
    }

    #[test]
    fn test_run_failures() {
        let db = database();
        let frontend = CodeModel::default();
        assert!(matches!(ApiExtractor::new().run(&db, &frontend), Err(ExtractError::NoHeaders)));

        let mut extractor = ApiExtractor::new();
        extractor.add_header("/nonexistent/point.h");
        assert!(matches!(extractor.run(&db, &frontend), Err(ExtractError::MissingHeader(_))));

        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("point.h");
        fs::write(&header, "").unwrap();
        let failing = Recording {
            seen: RefCell::new(None),
            fail: true,
        };
        let mut extractor = ApiExtractor::new();
        extractor.add_header(&header);
        assert!(matches!(extractor.run(&db, &failing), Err(ExtractError::Frontend(_))));
    }

    #[test]
    fn test_header_directory_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        for name in ["b.hpp", "a.h", "notes.txt", "sub/c.hxx", "d.cpp"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let mut extractor = ApiExtractor::new();
        extractor.add_header_path(dir.path()).unwrap();
        let names: Vec<_> = extractor
            .headers()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("a.h"), PathBuf::from("b.hpp"), PathBuf::from("sub/c.hxx")]
        );
        assert!(extractor.add_header_path(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_json_frontend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, MODEL).unwrap();
        let request = ParseRequest {
            translation_unit: Path::new("unit.hpp"),
            headers: &[],
            arguments: &[],
        };
        let model = JsonFrontend::new(&path).parse(&request).unwrap();
        assert_eq!(model.global.classes.len(), 2);
        assert!(JsonFrontend::new(dir.path().join("missing.json")).parse(&request).is_err());
    }
}
