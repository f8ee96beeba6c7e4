//! inspection_report — renders a completed inspection aggregate into a
//! Word-compatible document.
//!
//! The pipeline: hydrate the aggregate into a template value tree
//! ([`hydrate`]), repair placeholders split across XML runs and render
//! scalars, boolean-gated containers and array loops ([`placeholder`]),
//! embed images as drawing runs backed by new media parts ([`docx`],
//! [`media`]), then sweep residual empty paragraphs ([`sweep`]).

pub mod compose;
pub mod docx;
pub mod error;
pub mod hydrate;
pub mod mapping;
pub mod media;
pub mod placeholder;
pub mod sweep;
pub mod value;

pub use compose::{Composer, ComposerConfig};
pub use error::ReportError;
pub use media::ImageContent;
pub use value::TplValue;
