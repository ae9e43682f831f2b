//! `cppbind`: generate bindings for a C++ library.
//!
//! ```text
//! cppbind [options] header-file... typesystem-file
//! cppbind --project-file=geo.project
//! ```

mod project;
mod report;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cppbind_codegen::generator::{self, DriverConfig, FileOutOptions};
use cppbind_codegen::naming::module_name_from_typesystem_file;
use cppbind_codegen::{
    ApiExtractor, ExtractError, HeaderPath, HeaderType, JsonFrontend, LanguageLevel, TypeDatabase, TypeSystemError,
};
use thiserror::Error;

use crate::project::ProjectError;
use crate::report::{DebugLevel, Reporter};

#[derive(Debug, Parser)]
#[command(
    name = "cppbind",
    version,
    about = "Generate host language bindings for a C++ library",
    after_help = "Options can also be read from a file given with --project-file=<file>."
)]
struct Cli {
    /// Header files followed by the type-system file
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Include paths, separated by ':'
    #[arg(short = 'I', long, value_delimiter = ':')]
    include_paths: Vec<PathBuf>,

    /// Framework include paths, separated by ':'
    #[arg(short = 'F', long, value_delimiter = ':')]
    framework_include_paths: Vec<PathBuf>,

    /// System include paths, separated by ':'
    #[arg(long, value_delimiter = ':')]
    system_include_paths: Vec<PathBuf>,

    /// Directories searched for type-system files, separated by ':'
    #[arg(short = 'T', long, value_delimiter = ':')]
    typesystem_paths: Vec<PathBuf>,

    /// Option passed to the C++ front end; a leading "-" disables the builtin ones
    #[arg(long, allow_hyphen_values = true)]
    compiler_option: Vec<String>,

    /// C++ language level
    #[arg(long, default_value = "c++17")]
    language_level: String,

    /// Qualified names of type entries to drop, separated by ';'
    #[arg(long, value_delimiter = ';')]
    drop_type_entries: Vec<String>,

    /// API versions as "[package,]version", separated by '|'
    #[arg(long, value_delimiter = '|')]
    api_version: Vec<String>,

    /// Declarations dumped by the C++ front end, as JSON
    #[arg(long)]
    code_model: Option<PathBuf>,

    #[arg(short, long, default_value = "out")]
    output_directory: PathBuf,

    /// File whose contents head every generated source file
    #[arg(long)]
    license_file: Option<PathBuf>,

    /// Run the generators without writing files
    #[arg(long)]
    dry_run: bool,

    /// Log the lines that differ from the files on disk
    #[arg(long)]
    diff: bool,

    /// default, doc or dart
    #[arg(long, default_value = "default")]
    generator_set: String,

    /// Generator option as "key[=value]"
    #[arg(long)]
    generator_option: Vec<String>,

    /// Skip functions marked deprecated
    #[arg(long)]
    skip_deprecated: bool,

    #[arg(long, value_enum, default_value_t = DebugLevel::Sparse)]
    debug_level: DebugLevel,

    /// Only report errors
    #[arg(long)]
    silent: bool,

    /// Report repeated warnings every time
    #[arg(long)]
    no_suppress_warnings: bool,
}

impl Cli {
    fn headers(&self) -> &[String] {
        &self.inputs[..self.inputs.len().saturating_sub(1)]
    }

    fn typesystem_file(&self) -> Option<&str> {
        self.inputs.last().map(String::as_str)
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    TypeSystem(#[from] TypeSystemError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("No type-system file given")]
    NoTypeSystem,

    #[error("No code model given; pass --code-model=<file> with the declarations of the headers")]
    NoCodeModel,

    #[error("Invalid language level '{0}'")]
    LanguageLevel(String),

    #[error("Invalid API version '{0}'")]
    ApiVersion(String),

    #[error("Unknown generator set '{0}'")]
    GeneratorSet(String),

    #[error("Unknown generator option '{0}'")]
    GeneratorOption(String),

    #[error("Cannot read license file '{path}': {source}")]
    LicenseFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generation failed")]
    Generation,
}

/// Split "[package,]version" into its package (`*` when absent) and version.
fn parse_api_version(text: &str) -> (&str, &str) {
    match text.split_once(',') {
        Some((package, version)) => (package.trim(), version.trim()),
        None => ("*", text.trim()),
    }
}

fn split_generator_option(option: &str) -> (&str, &str) {
    option.split_once('=').unwrap_or((option, ""))
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let typesystem = cli.typesystem_file().ok_or(CliError::NoTypeSystem)?;

    let mut db = TypeDatabase::with_builtins();
    for path in &cli.typesystem_paths {
        db.add_typesystem_path(path);
    }
    db.set_drop_type_entries(cli.drop_type_entries.iter().filter(|name| !name.is_empty()).cloned());
    for entry in cli.api_version.iter().filter(|v| !v.is_empty()) {
        let (package, version) = parse_api_version(entry);
        if version.is_empty() {
            return Err(CliError::ApiVersion(entry.clone()));
        }
        db.set_api_version(package, version)?;
    }
    db.load_typesystem(typesystem)?;
    log::info!("Loaded type system '{typesystem}', package '{}'", db.default_package_name());

    let language_level = LanguageLevel::from_option(&cli.language_level)
        .ok_or_else(|| CliError::LanguageLevel(cli.language_level.clone()))?;
    let mut extractor = ApiExtractor::new();
    extractor
        .set_typesystem_path(typesystem)
        .set_language_level(language_level)
        .set_skip_deprecated(cli.skip_deprecated);
    for header in cli.headers() {
        extractor.add_header_path(header)?;
    }
    let include_paths = [
        (&cli.include_paths, HeaderType::Standard),
        (&cli.framework_include_paths, HeaderType::Framework),
        (&cli.system_include_paths, HeaderType::System),
    ];
    for (paths, kind) in include_paths {
        for path in paths {
            extractor.add_include_path(HeaderPath::new(path, kind));
        }
    }
    for option in &cli.compiler_option {
        extractor.add_compiler_option(option);
    }
    log::debug!("Compiler arguments: {}", extractor.compiler_arguments().join(" "));

    let code_model = cli.code_model.as_ref().ok_or(CliError::NoCodeModel)?;
    let api = extractor.run(&db, &JsonFrontend::new(code_model))?;

    let mut generators =
        generator::generator_set(&cli.generator_set).ok_or_else(|| CliError::GeneratorSet(cli.generator_set.clone()))?;
    for option in &cli.generator_option {
        let (key, value) = split_generator_option(option);
        let mut handled = false;
        for generator in generators.iter_mut() {
            handled |= generator.handle_option(key, value);
        }
        if !handled {
            return Err(CliError::GeneratorOption(option.clone()));
        }
    }

    let license_comment = match &cli.license_file {
        Some(path) => fs::read_to_string(path).map_err(|source| CliError::LicenseFile {
            path: path.clone(),
            source,
        })?,
        None => String::new(),
    };
    let config = DriverConfig {
        output_directory: cli.output_directory.clone(),
        license_comment,
        file_out: FileOutOptions {
            dry_run: cli.dry_run,
            diff: cli.diff,
        },
    };
    if !generator::run_generators(&db, &api, generators, &config) {
        return Err(CliError::Generation);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command_line = args.join(" ");
    let args = match project::expand_args(args) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("cppbind: {}", CliError::from(err));
            return ExitCode::FAILURE;
        }
    };
    let cli = Cli::parse_from(args);

    let level = if cli.silent {
        log::LevelFilter::Off
    } else {
        cli.debug_level.level_filter()
    };
    let module = cli.typesystem_file().map(module_name_from_typesystem_file);
    let reporter = match Reporter::new(level, module, !cli.no_suppress_warnings).install() {
        Ok(reporter) => reporter,
        Err(err) => {
            eprintln!("cppbind: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(()) => {
            log::info!("{}", reporter.summary());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("cppbind: {err}");
            eprintln!("Command line: {command_line}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli() {
        let cli = Cli::parse_from([
            "cppbind",
            "--include-paths=include:/usr/include/geo",
            "--drop-type-entries=geo::Legacy;geo::Old",
            "--api-version=geo,1.2|2.0",
            "--compiler-option=-DGEO",
            "--generator-option=disable-verbose-error-messages",
            "geo.h",
            "shape.h",
            "typesystem_geo.toml",
        ]);
        assert_eq!(cli.headers(), ["geo.h", "shape.h"]);
        assert_eq!(cli.typesystem_file(), Some("typesystem_geo.toml"));
        assert_eq!(cli.include_paths, vec![PathBuf::from("include"), PathBuf::from("/usr/include/geo")]);
        assert_eq!(cli.drop_type_entries, vec!["geo::Legacy", "geo::Old"]);
        assert_eq!(cli.api_version, vec!["geo,1.2", "2.0"]);
        assert_eq!(cli.compiler_option, vec!["-DGEO"]);
        assert_eq!(cli.output_directory, PathBuf::from("out"));
        assert_eq!(cli.debug_level, DebugLevel::Sparse);
    }

    #[test]
    fn test_option_splitting() {
        assert_eq!(parse_api_version("geo, 1.2"), ("geo", "1.2"));
        assert_eq!(parse_api_version("2.0"), ("*", "2.0"));
        assert_eq!(split_generator_option("key=value"), ("key", "value"));
        assert_eq!(split_generator_option("flag"), ("flag", ""));
    }

    #[test]
    fn test_run_without_code_model() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("geo.h");
        fs::write(&header, "struct Point {};\n").unwrap();
        let typesystem = dir.path().join("typesystem_geo.toml");
        fs::write(&typesystem, "package = \"geo\"\n\n[[value-type]]\nname = \"Point\"\n").unwrap();

        let cli = Cli::parse_from([
            "cppbind".to_string(),
            header.display().to_string(),
            typesystem.display().to_string(),
        ]);
        assert!(matches!(run(&cli), Err(CliError::NoCodeModel)));
    }

    #[test]
    fn test_run_generates_files() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("geo.h");
        fs::write(&header, "struct Point { int x() const; };\n").unwrap();
        let typesystem = dir.path().join("typesystem_geo.toml");
        fs::write(&typesystem, "package = \"geo\"\n\n[[value-type]]\nname = \"Point\"\n").unwrap();
        let code_model = dir.path().join("geo.json");
        fs::write(
            &code_model,
            r#"{
                "classes": [
                    { "name": "Point", "functions": [ { "name": "x", "returnType": "int", "isConstant": true } ] }
                ]
            }"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        let cli = Cli::parse_from([
            "cppbind".to_string(),
            format!("--code-model={}", code_model.display()),
            format!("--output-directory={}", out.display()),
            "--generator-set=doc".to_string(),
            header.display().to_string(),
            typesystem.display().to_string(),
        ]);
        run(&cli).unwrap();
        assert!(out.join("geo").join("index.rst").is_file());

        let bad = Cli::parse_from([
            "cppbind".to_string(),
            format!("--code-model={}", code_model.display()),
            "--generator-option=no-such-option".to_string(),
            header.display().to_string(),
            typesystem.display().to_string(),
        ]);
        assert!(matches!(run(&bad), Err(CliError::GeneratorOption(_))));
    }
}
