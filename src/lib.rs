#![warn(missing_docs)]

//! # veridoc
//!
//! Document fraud detection for PDF invoices and official documents.
//!
//! veridoc ingests an untrusted PDF and produces a structured forensic
//! report: a trust score (0–100), a risk level, and a ranked list of
//! evidence flags for human review.
//!
//! ## Pipeline
//!
//! One extraction pass builds a [`bundle::DocumentBundle`] (content hash,
//! metadata, per-page text and positioned spans, font records, image
//! descriptors). Independent analysis modules then each produce a
//! [`model::ModuleResult`]:
//!
//! - **metadata** — producer classification, impossible metadata dates
//! - **content** — dates, amounts, invoice references, SIRET/SIREN/VAT
//!   checksum algebra
//! - **visual** — QR payload policy, watermark tokens
//! - **fonts** — family graph, mid-line family switches
//! - **images** — descriptor heuristics, amount-region paste detection
//! - **structure** — incremental updates, revision diffs, JavaScript,
//!   embedded files, signature trust
//! - **forensics** — error-level analysis of embedded images
//! - **twoddoc** — 2D-DOC barcode parsing and cross-verification
//! - **external** — company-registry and VAT lookups (opt-in, the only
//!   module allowed to touch the network)
//!
//! The scoring engine combines the results into a single calibrated score
//! with severity-cap business rules that keep one weak module from masking
//! a certain finding.
//!
//! ## Quick start
//!
//! ```no_run
//! use veridoc::{Analyzer, AnalyzerOptions};
//!
//! # fn main() -> veridoc::Result<()> {
//! let analyzer = Analyzer::new(AnalyzerOptions::default());
//! let result = analyzer.analyze("invoice.pdf")?;
//! println!("Trust score: {}/100 ({})", result.trust_score, result.risk_level);
//! for module in &result.modules {
//!     for flag in &module.flags {
//!         println!("  [{:?}] {}: {}", flag.severity, flag.code, flag.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Determinism: with a pinned [`services::Clock`] the whole analysis is a
//! pure function of the file bytes.

pub mod analyzer;
pub mod bundle;
pub mod error;
pub mod model;
pub mod modules;
pub mod pdf;
pub mod scoring;
pub mod services;
pub mod summary;

pub use analyzer::{quick_analyze, Analyzer, AnalyzerOptions, CancelToken, QuickVerdict};
pub use bundle::{extract_bundle, DocumentBundle};
pub use error::{Error, Result};
pub use model::{
    AnalysisResult, AnalysisSummary, Flag, FlagCode, FlagDetails, ModuleName, ModuleResult,
    RiskLevel, Severity,
};
pub use scoring::{collect_all_flags, count_flags_by_severity};
pub use services::{Clock, FixedClock, Services, SystemClock};
pub use summary::{generate_rich_summary, generate_summary};
