//! Source recognition and parsing for Robot Framework inputs.
//!
//! Two input formats feed the index:
//! - plain-text test-suite and resource files ([`robot`])
//! - libdoc XML generated for external libraries ([`libdoc`])
//!
//! Both parsers produce the same [`ParsedFile`] shape.

pub mod libdoc;
mod parsed;
pub mod recognize;
pub mod robot;

pub use parsed::{ArgumentSpec, LibraryImport, ParsedEntry, ParsedFile};
pub use recognize::{Classification, classify, is_libdoc_file, is_robot, is_robot_file};
