pub mod config;
pub mod error;
pub mod graph;
pub mod mapping;
pub mod model;
pub mod reader;
pub mod schema;

pub use config::Config;
pub use error::{Result, SysbioError};
pub use graph::{ExtractionOptions, GraphExtraction, GraphSink, JsonlSink, Namespace, RandomTokens};
pub use model::SourceModel;
pub use reader::{discover_models, load_model};
pub use schema::{SchemaManager, SchemaRegistry};
