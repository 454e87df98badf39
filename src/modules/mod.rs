//! Analysis modules.
//!
//! Every module is a pure function over `(bundle, context)`: no shared
//! mutable state, no side effects beyond opening the document or invoking
//! an injected primitive. Each returns a [`ModuleResult`] and nothing else;
//! modules never read each other's output.

use crate::analyzer::AnalyzerOptions;
use crate::bundle::DocumentBundle;
use crate::model::ModuleResult;
use crate::services::Services;

pub mod content;
pub mod external;
pub mod fonts;
pub mod forensics;
pub mod images;
pub mod metadata;
pub mod structure;
pub mod twoddoc;
pub mod visual;

/// Everything a module may read.
pub struct ModuleContext<'a> {
    /// The shared document bundle
    pub bundle: &'a DocumentBundle,
    /// Injected primitives
    pub services: &'a Services,
    /// Analyzer options
    pub options: &'a AnalyzerOptions,
}

/// The uniform module contract.
pub type ModuleFn = fn(&ModuleContext<'_>) -> ModuleResult;
