//! Loading pipelines from JSON documents.
//!
//! A [`PipelineConfig`] describes stages and components by name and type.
//! [`PipelineConfig::build`] turns it into a [`Pipeline`](crate::pipeline::Pipeline),
//! creating each component through a [`ComponentRegistry`].
//!
//! ```rust,ignore
//! let mut registry = ComponentRegistry::new();
//! registry.register_typed("ValidateID", |p: ValidateIdParams| ValidateId::new(p.min_id));
//!
//! let pipeline = PipelineConfig::from_file("pipeline.json")?.build(&registry)?;
//! ```

mod document;
mod registry;

pub use document::{ComponentConfig, PipelineConfig, StageConfig};
pub use registry::{ComponentFactory, ComponentRegistry};
