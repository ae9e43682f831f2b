//! # cppbind-codegen
//!
//! Binding generator core for C++ libraries. The crate extracts the public
//! API of a library from its parsed headers, matches it against a set of
//! type rules and emits the glue source that exposes every class, function
//! and enum to a host language.
//!
//! ## Pipeline
//!
//! | Stage        | Module                         | Output                         |
//! |--------------|--------------------------------|--------------------------------|
//! | Type rules   | [`typesystem`], [`registry`]   | [`TypeDatabase`]               |
//! | Extraction   | [`extractor`], [`builder`]     | [`ApiExtractorResult`]         |
//! | Generation   | [`generator`]                  | files below the output dir     |
//!
//! ## Usage
//!
//! ### 1. Describe the types to bind
//!
//! ```toml
//! # typesystem_geo.toml
//! package = "geo"
//!
//! [[value-type]]
//! name = "Point"
//!
//! [[object-type]]
//! name = "Shape"
//! ```
//!
//! ### 2. Extract and generate
//!
//! ```rust,ignore
//! use cppbind_codegen::{ApiExtractor, DriverConfig, JsonFrontend, TypeDatabase, generator};
//!
//! let mut db = TypeDatabase::with_builtins();
//! db.load_typesystem("typesystem_geo.toml")?;
//!
//! let mut extractor = ApiExtractor::new();
//! extractor.add_header_path("include/geo.h")?;
//! let api = extractor.run(&db, &JsonFrontend::new("geo.json"))?;
//!
//! let config = DriverConfig { output_directory: "out".into(), ..Default::default() };
//! let generators = generator::generator_set("default").unwrap();
//! assert!(generator::run_generators(&db, &api, generators, &config));
//! ```
//!
//! The declaration graph comes from an external C++ front end; see
//! [`codemodel`] for its JSON shape.

pub mod builder;
pub mod codemodel;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod instantiations;
pub mod minimal;
pub mod model;
pub mod naming;
pub mod registry;
pub mod signature;
pub mod types;
pub mod typesystem;

pub use builder::{ApiBuilder, BuilderOptions, RejectReason, Rejection};
pub use codemodel::CodeModel;
pub use error::{ExtractError, GeneratorError, ResolveError, TypeSystemError};
pub use extractor::{ApiExtractor, Frontend, HeaderPath, HeaderType, JsonFrontend, LanguageLevel, ParseRequest};
pub use generator::{DriverConfig, FileOutOptions, Generator, GeneratorContext, GeneratorDriver};
pub use instantiations::Instantiations;
pub use minimal::{DefaultValue, DefaultValueKind};
pub use model::{ApiExtractorResult, MetaClass, MetaFunction, MetaType};
pub use registry::{ApiVersion, TypeDatabase};
pub use types::{TypeEntry, TypeEntryKind, TypeEntryRef};
