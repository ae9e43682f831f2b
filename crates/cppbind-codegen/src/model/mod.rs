//! The API model: an in-memory graph of the extracted C++ API.
//!
//! Built once by [`crate::builder`] and read-only afterwards.

mod api;
mod class;
mod function;
mod metatype;

pub use api::ApiExtractorResult;
pub use class::{ClassId, MetaClass, MetaEnum, MetaEnumValue, MetaField};
pub use function::{FunctionKind, MetaArgument, MetaFunction};
pub use metatype::{MetaType, TypeUsagePattern};
