//! Analysis orchestrator.
//!
//! Loads the document once (C1), fans the bundle out to the analysis
//! modules — one scoped worker thread each, results collected over a
//! channel — and hands the collected results to the scoring engine. No
//! module ever sees another module's output.
//!
//! A module that panics or misbehaves is logged and reported with
//! confidence 0.0, no flags and a neutral score, so one broken detector
//! degrades the answer instead of destroying it.

use crate::bundle::{extract_bundle, DocumentBundle};
use crate::error::{Error, Result};
use crate::model::{AnalysisResult, AnalysisSummary, ModuleName, ModuleResult, RiskLevel};
use crate::modules::structure::signature::TrustStore;
use crate::modules::{ModuleContext, ModuleFn};
use crate::scoring::create_analysis_result;
use crate::services::Services;
use crate::summary::generate_rich_summary;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation handle. Cloneable; any clone cancels all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Analyzer options.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Run the external verification module (network I/O)
    pub enable_external: bool,
    /// Scan pages for QR codes (needs the raster + barcode primitives)
    pub enable_qr: bool,
    /// Expected sender domains for QR validation; derived from the text
    /// when absent
    pub expected_domains: Option<Vec<String>>,
    /// Expected company name for registry comparison
    pub expected_company_name: Option<String>,
    /// Per-query timeout hint passed to registry implementations
    pub external_timeout: Duration,
    /// Authorities recognized by the signature check
    pub trust_store: TrustStore,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            enable_external: false,
            enable_qr: true,
            expected_domains: None,
            expected_company_name: None,
            external_timeout: Duration::from_secs(10),
            trust_store: TrustStore::default(),
        }
    }
}

/// The document fraud analyzer.
#[derive(Default)]
pub struct Analyzer {
    /// Options
    pub options: AnalyzerOptions,
    /// Injected primitives
    pub services: Services,
}

/// Compact verdict for simple callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickVerdict {
    /// Trust score 0–100
    pub score: u8,
    /// Risk level
    pub risk_level: RiskLevel,
    /// Total number of flags
    pub flag_count: usize,
    /// Analysis duration
    pub analysis_time_ms: u64,
}

impl Analyzer {
    /// Analyzer with the given options and default (offline) services.
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            services: Services::default(),
        }
    }

    /// Attach services.
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    fn module_table(&self) -> Vec<(ModuleName, ModuleFn)> {
        let mut table: Vec<(ModuleName, ModuleFn)> = vec![
            (ModuleName::Metadata, crate::modules::metadata::analyze),
            (ModuleName::Content, crate::modules::content::analyze),
            (ModuleName::Visual, crate::modules::visual::analyze),
            (ModuleName::Fonts, crate::modules::fonts::analyze),
            (ModuleName::Images, crate::modules::images::analyze),
            (ModuleName::Structure, crate::modules::structure::analyze),
            (ModuleName::Forensics, crate::modules::forensics::analyze),
            (ModuleName::Twoddoc, crate::modules::twoddoc::analyze),
        ];
        if self.options.enable_external {
            table.push((ModuleName::External, crate::modules::external::analyze));
        }
        table
    }

    /// Analyze a document.
    pub fn analyze(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        self.analyze_cancellable(path, &CancelToken::new())
    }

    /// Analyze with a cancellation token. Cancellation is atomic: either a
    /// full result is produced or `Err(Cancelled)` and nothing else.
    pub fn analyze_cancellable(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult> {
        let start = Instant::now();
        let path = path.as_ref();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        info!("analyzing {}", path.display());
        let bundle: DocumentBundle = extract_bundle(path)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let table = self.module_table();
        let mut slots: Vec<Option<ModuleResult>> = vec![None; table.len()];
        let (tx, rx) = mpsc::channel::<(usize, ModuleResult)>();

        std::thread::scope(|scope| {
            for (index, (name, run)) in table.iter().enumerate() {
                let tx = tx.clone();
                let bundle = &bundle;
                let services = &self.services;
                let options = &self.options;
                let cancel = cancel.clone();
                let name = *name;
                let run = *run;
                scope.spawn(move || {
                    if cancel.is_cancelled() {
                        return; // pending module aborted
                    }
                    let ctx = ModuleContext {
                        bundle,
                        services,
                        options,
                    };
                    let result = match catch_unwind(AssertUnwindSafe(|| run(&ctx))) {
                        Ok(result) => result,
                        Err(_) => {
                            warn!("module '{}' panicked; reported with zero weight", name);
                            ModuleResult::degraded(name)
                        }
                    };
                    let _ = tx.send((index, result));
                });
            }
            drop(tx);
            while let Ok((index, result)) = rx.recv() {
                slots[index] = Some(result);
            }
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let modules: Vec<ModuleResult> = table
            .iter()
            .enumerate()
            .map(|(index, (name, _))| {
                slots[index].take().unwrap_or_else(|| {
                    warn!("module '{}' returned nothing; reported with zero weight", name);
                    ModuleResult::degraded(*name)
                })
            })
            .collect();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let result = create_analysis_result(bundle.content_hash.clone(), modules, elapsed_ms);
        info!(
            "analysis complete: score={} risk={}",
            result.trust_score, result.risk_level
        );
        Ok(result)
    }

    /// Analyze and render the human summary in one call.
    pub fn analyze_with_summary(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(AnalysisResult, AnalysisSummary)> {
        let result = self.analyze(path)?;
        let summary = generate_rich_summary(&result);
        Ok((result, summary))
    }
}

/// One-call convenience analysis with default options.
pub fn quick_analyze(path: impl AsRef<Path>) -> Result<QuickVerdict> {
    let analyzer = Analyzer::default();
    let result = analyzer.analyze(path)?;
    Ok(QuickVerdict {
        score: result.trust_score,
        risk_level: result.risk_level,
        flag_count: result.flag_count(),
        analysis_time_ms: result.analysis_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancelled_before_start_returns_cancelled() {
        let analyzer = Analyzer::default();
        let token = CancelToken::new();
        token.cancel();
        let err = analyzer
            .analyze_cancellable("does-not-matter.pdf", &token)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn external_module_is_opt_in() {
        let analyzer = Analyzer::default();
        assert_eq!(analyzer.module_table().len(), 8);
        let analyzer = Analyzer::new(AnalyzerOptions {
            enable_external: true,
            ..Default::default()
        });
        assert_eq!(analyzer.module_table().len(), 9);
        assert_eq!(
            analyzer.module_table().last().unwrap().0,
            ModuleName::External
        );
    }
}
