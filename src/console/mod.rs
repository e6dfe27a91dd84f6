//! Console log folding.
//!
//! Lines written by a build agent carry a two-character prefix telling which
//! phase of the job produced them. This module classifies those lines, folds
//! consecutive ones into typed sections, and extracts the status metadata
//! the renderers show in section headers.

pub mod annotation;
pub mod ansi;
pub mod duration;
pub mod line;
pub mod prefix;
pub mod section;
pub mod transformer;

pub use annotation::StatusAnnotation;
pub use duration::humanize;
pub use line::LogLine;
pub use prefix::SectionKind;
pub use section::Section;
pub use transformer::{LogOutputTransformer, Node};
