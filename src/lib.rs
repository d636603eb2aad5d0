//! Core entry point for the rdlc_generator crate.
//!
//! A [`ReportGenerator`] loads an RDLC report definition from a
//! [`DefinitionStore`], resolves each declared dataset to a method of a
//! registered provider type, calls the providers with the caller's
//! parameters and hands everything to a [`RenderingEngine`]. Subreport data
//! is fetched on demand while the engine renders.

pub mod binder;
pub mod config;
pub mod context;
pub mod definition;
pub mod demo;
pub mod document;
pub mod engine;
pub mod error;
pub mod expression;
pub mod invoker;
pub mod page_count;
pub mod params;
pub mod provider;
pub mod resolver;
pub mod store;
pub mod subreport;
pub mod value;

mod generator;

#[cfg(feature = "pdf-engine")]
pub mod fonts;
#[cfg(feature = "pdf-engine")]
pub mod pdf;

pub use config::GeneratorConfig;
pub use definition::ReportDefinition;
pub use document::Document;
pub use engine::{RenderError, RenderRequest, RenderingEngine, SubreportDataHandler};
pub use error::{GenerateError, Stage};
pub use generator::{GenerationState, ReportGenerator};
pub use params::ParameterBag;
pub use provider::{DataRow, ParamSpec, ProviderRegistry, ProviderType, Rows};
pub use store::{DefinitionStore, DirectoryStore, MemoryStore};
pub use value::{ParamKind, Value};

#[cfg(feature = "pdf-engine")]
pub use pdf::PdfEngine;
