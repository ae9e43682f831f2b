//! Error types for type-system loading, extraction, resolution and generation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading type-rule files into a [`TypeDatabase`](crate::TypeDatabase).
#[derive(Debug, Error)]
pub enum TypeSystemError {
    #[error("Cannot read type system file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse type system file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Type system file '{0}' not found in any type system path")]
    NotFound(String),

    #[error("Duplicate type entry '{0}'")]
    DuplicateEntry(String),

    #[error("Type entry '{entry}' references unknown type '{referenced}'")]
    UnknownReference { entry: String, referenced: String },

    #[error("Invalid version \"{version}\" specified for package {package}")]
    InvalidVersion { package: String, version: String },

    #[error("Invalid container kind '{0}'")]
    InvalidContainerKind(String),

    #[error("Invalid signature '{0}'")]
    InvalidSignature(String),
}

/// Errors raised by the extraction driver and the model builder.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("The extractor has already been run")]
    AlreadyRun,

    #[error("No header files given")]
    NoHeaders,

    #[error("\"{0}\" does not exist")]
    MissingHeader(PathBuf),

    #[error("Could not create temporary file for the translation unit: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Could not read code model '{path}': {message}")]
    CodeModel { path: PathBuf, message: String },

    #[error("C++ front end failed: {0}")]
    Frontend(String),

    #[error("Cannot resolve type '{type_name}' used in '{context}'")]
    UnresolvedType { type_name: String, context: String },

    #[error("Invalid type spelling '{0}'")]
    InvalidType(String),
}

/// Reasons why no minimal constructor could be synthesized for a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Cannot default-construct reference to object type '{0}'")]
    ReferenceToObjectType(String),

    #[error("Could not find class for type \"{0}\"")]
    ClassNotFound(String),

    #[error("No suitable constructor found for class \"{0}\"")]
    NoSuitableConstructor(String),

    #[error("No default value could be determined for \"{0}\"")]
    NoDefaultValue(String),

    #[error("Recursion limit reached while searching a constructor for \"{0}\"")]
    RecursionLimit(String),
}

/// Errors raised by the generator driver.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Couldn't find the package name")]
    NoModuleEntry,

    #[error("Code generation of root typesystem is disabled")]
    RootGenerationDisabled,

    #[error("setup() has already been called")]
    AlreadySetUp,

    #[error("generate() called before a successful setup()")]
    NotSetUp,

    #[error("Unable to find smart pointer type for {signature} (known: {known})")]
    SmartPointerNotFound { signature: String, known: String },

    #[error("Cannot write '{path}': {source}")]
    FileOut {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{generator}: {message}")]
    Generation { generator: String, message: String },
}

impl GeneratorError {
    pub fn generation(generator: &str, message: impl Into<String>) -> Self {
        GeneratorError::Generation {
            generator: generator.to_string(),
            message: message.into(),
        }
    }
}
