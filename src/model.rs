//! Flag model and result shapes.
//!
//! Everything the modules emit flows through the types here: [`Flag`] with
//! its stable [`FlagCode`], [`ModuleResult`], and the final
//! [`AnalysisResult`]. Codes are the public API — tests and downstream
//! consumers match on them, so they are a closed enum whose string form
//! never changes. Messages may change freely.
//!
//! `Flag::details` is a tagged sum keyed by code family. It serializes
//! untagged, so the wire JSON stays a plain object per flag.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Severity of a finding. Totally ordered: critical > high > medium > low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor issue, might be normal
    Low,
    /// Worth noting
    Medium,
    /// Suspicious
    High,
    /// Very likely fraud
    Critical,
}

impl Severity {
    /// Score penalty applied per flag of this severity.
    pub fn penalty(self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 15,
            Severity::High => 30,
            Severity::Critical => 50,
        }
    }
}

/// Risk classification derived from the trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// 80–100: document appears legitimate
    Low,
    /// 50–79: some concerns, manual verification recommended
    Medium,
    /// 20–49: multiple red flags, likely manipulated
    High,
    /// 0–19: strong evidence of fraud
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Names of the analysis modules, in result order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleName {
    /// Producer/date metadata checks
    Metadata,
    /// Text content checks
    Content,
    /// QR and watermark checks
    Visual,
    /// Font graph checks
    Fonts,
    /// Embedded image heuristics
    Images,
    /// File structure and revisions
    Structure,
    /// Error-level analysis
    Forensics,
    /// 2D-DOC barcode verification
    Twoddoc,
    /// Registry lookups
    External,
}

impl ModuleName {
    /// All modules in result order.
    pub const ALL: [ModuleName; 9] = [
        ModuleName::Metadata,
        ModuleName::Content,
        ModuleName::Visual,
        ModuleName::Fonts,
        ModuleName::Images,
        ModuleName::Structure,
        ModuleName::Forensics,
        ModuleName::Twoddoc,
        ModuleName::External,
    ];

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleName::Metadata => "metadata",
            ModuleName::Content => "content",
            ModuleName::Visual => "visual",
            ModuleName::Fonts => "fonts",
            ModuleName::Images => "images",
            ModuleName::Structure => "structure",
            ModuleName::Forensics => "forensics",
            ModuleName::Twoddoc => "twoddoc",
            ModuleName::External => "external",
        }
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifiers for findings. The string form is the wire format and
/// must never be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum FlagCode {
    // metadata
    #[serde(rename = "META_AI_GENERATED")]
    MetaAiGenerated,
    #[serde(rename = "META_SUSPICIOUS_PRODUCER")]
    MetaSuspiciousProducer,
    #[serde(rename = "META_ONLINE_CONVERTER")]
    MetaOnlineConverter,
    #[serde(rename = "META_NO_METADATA")]
    MetaNoMetadata,
    #[serde(rename = "META_NO_PRODUCER")]
    MetaNoProducer,
    #[serde(rename = "META_FUTURE_CREATION_DATE")]
    MetaFutureCreationDate,
    #[serde(rename = "META_IMPOSSIBLE_DATES")]
    MetaImpossibleDates,
    #[serde(rename = "META_DOCUMENT_MODIFIED")]
    MetaDocumentModified,
    // content
    #[serde(rename = "CONTENT_FAR_FUTURE_DATE")]
    ContentFarFutureDate,
    #[serde(rename = "CONTENT_VERY_OLD_DATE")]
    ContentVeryOldDate,
    #[serde(rename = "CONTENT_FUTURE_INVOICE_DATE")]
    ContentFutureInvoiceDate,
    #[serde(rename = "CONTENT_ANACHRONISM_SERVICE")]
    ContentAnachronismService,
    #[serde(rename = "CONTENT_ANACHRONISM_DUE")]
    ContentAnachronismDue,
    #[serde(rename = "CONTENT_ANACHRONISM_ORDER")]
    ContentAnachronismOrder,
    #[serde(rename = "CONTENT_REPEATED_AMOUNT")]
    ContentRepeatedAmount,
    #[serde(rename = "CONTENT_REFERENCE_DATE_MISMATCH")]
    ContentReferenceDateMismatch,
    #[serde(rename = "CONTENT_INCONSISTENT_REFERENCES")]
    ContentInconsistentReferences,
    #[serde(rename = "CONTENT_INVALID_SIRET")]
    ContentInvalidSiret,
    #[serde(rename = "CONTENT_INVALID_SIREN")]
    ContentInvalidSiren,
    #[serde(rename = "CONTENT_INVALID_VAT")]
    ContentInvalidVat,
    #[serde(rename = "CONTENT_SIREN_VAT_MISMATCH")]
    ContentSirenVatMismatch,
    #[serde(rename = "CONTENT_MISSING_COMPANY_ID")]
    ContentMissingCompanyId,
    // fonts
    #[serde(rename = "FONTS_EXCESSIVE_DIVERSITY")]
    FontsExcessiveDiversity,
    #[serde(rename = "FONTS_HIGH_DIVERSITY")]
    FontsHighDiversity,
    #[serde(rename = "FONTS_SYSTEM_FONTS")]
    FontsSystemFonts,
    #[serde(rename = "FONTS_NOT_EMBEDDED")]
    FontsNotEmbedded,
    #[serde(rename = "FONTS_MIXED_SUBSETS")]
    FontsMixedSubsets,
    #[serde(rename = "FONTS_MIDLINE_CHANGE")]
    FontsMidlineChange,
    // images
    #[serde(rename = "IMAGES_SCREENSHOT_DETECTED")]
    ImagesScreenshotDetected,
    #[serde(rename = "IMAGES_RESOLUTION_MISMATCH")]
    ImagesResolutionMismatch,
    #[serde(rename = "IMAGES_HEAVY_COMPRESSION")]
    ImagesHeavyCompression,
    #[serde(rename = "IMAGES_EXCESSIVE_COUNT")]
    ImagesExcessiveCount,
    #[serde(rename = "IMAGES_NO_IMAGES")]
    ImagesNoImages,
    #[serde(rename = "IMAGES_IMAGE_ONLY_PDF")]
    ImagesImageOnlyPdf,
    #[serde(rename = "IMAGES_MOSTLY_IMAGE_PDF")]
    ImagesMostlyImagePdf,
    #[serde(rename = "IMAGES_PASTE_NOISE_ANOMALY")]
    ImagesPasteNoiseAnomaly,
    // visual
    #[serde(rename = "VISUAL_QR_URL_SHORTENER")]
    VisualQrUrlShortener,
    #[serde(rename = "VISUAL_QR_SUSPICIOUS_TLD")]
    VisualQrSuspiciousTld,
    #[serde(rename = "VISUAL_QR_DOMAIN_MISMATCH")]
    VisualQrDomainMismatch,
    #[serde(rename = "VISUAL_WATERMARK")]
    VisualWatermark,
    #[serde(rename = "VISUAL_CONVERTER_WATERMARK")]
    VisualConverterWatermark,
    // structure
    #[serde(rename = "STRUCT_INCREMENTAL_UPDATES")]
    StructIncrementalUpdates,
    #[serde(rename = "STRUCT_JAVASCRIPT_DETECTED")]
    StructJavascriptDetected,
    #[serde(rename = "STRUCT_EMBEDDED_FILES")]
    StructEmbeddedFiles,
    #[serde(rename = "STRUCT_HIDDEN_ANNOTATIONS")]
    StructHiddenAnnotations,
    #[serde(rename = "STRUCT_SUSPICIOUS_ANNOTATIONS")]
    StructSuspiciousAnnotations,
    #[serde(rename = "STRUCT_ACROFORM_DETECTED")]
    StructAcroformDetected,
    #[serde(rename = "STRUCT_DELETED_OBJECTS")]
    StructDeletedObjects,
    #[serde(rename = "STRUCT_XMP_EDITOR_MISMATCH")]
    StructXmpEditorMismatch,
    #[serde(rename = "STRUCT_SIGNATURE_TRUSTED")]
    StructSignatureTrusted,
    #[serde(rename = "STRUCT_SIGNATURE_TRUSTED_EXPIRED")]
    StructSignatureTrustedExpired,
    #[serde(rename = "STRUCT_SIGNATURE_NOT_TRUSTED")]
    StructSignatureNotTrusted,
    #[serde(rename = "STRUCT_SIGNATURE_UNVERIFIABLE")]
    StructSignatureUnverifiable,
    #[serde(rename = "STRUCT_SIGNATURE_INVALID")]
    StructSignatureInvalid,
    // forensics
    #[serde(rename = "FORENSICS_ELA_MAJOR_EDIT")]
    ForensicsElaMajorEdit,
    #[serde(rename = "FORENSICS_ELA_MINOR_EDIT")]
    ForensicsElaMinorEdit,
    // twoddoc
    #[serde(rename = "TWODDOC_PARSE_ERROR")]
    TwoddocParseError,
    #[serde(rename = "TWODDOC_FIELD_MISMATCH")]
    TwoddocFieldMismatch,
    #[serde(rename = "TWODDOC_MISSING_TAX_FIELD")]
    TwoddocMissingTaxField,
    #[serde(rename = "TWODDOC_BALANCE_MISMATCH")]
    TwoddocBalanceMismatch,
    #[serde(rename = "TWODDOC_INCOME_TOO_LOW")]
    TwoddocIncomeTooLow,
    #[serde(rename = "TWODDOC_INCOME_TOO_HIGH")]
    TwoddocIncomeTooHigh,
    // external
    #[serde(rename = "EXTERNAL_SIRET_NOT_FOUND")]
    ExternalSiretNotFound,
    #[serde(rename = "EXTERNAL_SIREN_NOT_FOUND")]
    ExternalSirenNotFound,
    #[serde(rename = "EXTERNAL_COMPANY_CLOSED")]
    ExternalCompanyClosed,
    #[serde(rename = "EXTERNAL_COMPANY_NAME_MISMATCH")]
    ExternalCompanyNameMismatch,
    #[serde(rename = "EXTERNAL_SIRET_VERIFICATION_FAILED")]
    ExternalSiretVerificationFailed,
    #[serde(rename = "EXTERNAL_SIREN_VERIFICATION_FAILED")]
    ExternalSirenVerificationFailed,
    #[serde(rename = "EXTERNAL_VAT_VERIFICATION_FAILED")]
    ExternalVatVerificationFailed,
    #[serde(rename = "EXTERNAL_VAT_INVALID")]
    ExternalVatInvalid,
    #[serde(rename = "EXTERNAL_FILE_REPUTATION")]
    ExternalFileReputation,
    #[serde(rename = "EXTERNAL_REPUTATION_FAILED")]
    ExternalReputationFailed,
}

impl FlagCode {
    /// Wire string for this code (same names serde uses).
    pub fn as_str(self) -> &'static str {
        use FlagCode::*;
        match self {
            MetaAiGenerated => "META_AI_GENERATED",
            MetaSuspiciousProducer => "META_SUSPICIOUS_PRODUCER",
            MetaOnlineConverter => "META_ONLINE_CONVERTER",
            MetaNoMetadata => "META_NO_METADATA",
            MetaNoProducer => "META_NO_PRODUCER",
            MetaFutureCreationDate => "META_FUTURE_CREATION_DATE",
            MetaImpossibleDates => "META_IMPOSSIBLE_DATES",
            MetaDocumentModified => "META_DOCUMENT_MODIFIED",
            ContentFarFutureDate => "CONTENT_FAR_FUTURE_DATE",
            ContentVeryOldDate => "CONTENT_VERY_OLD_DATE",
            ContentFutureInvoiceDate => "CONTENT_FUTURE_INVOICE_DATE",
            ContentAnachronismService => "CONTENT_ANACHRONISM_SERVICE",
            ContentAnachronismDue => "CONTENT_ANACHRONISM_DUE",
            ContentAnachronismOrder => "CONTENT_ANACHRONISM_ORDER",
            ContentRepeatedAmount => "CONTENT_REPEATED_AMOUNT",
            ContentReferenceDateMismatch => "CONTENT_REFERENCE_DATE_MISMATCH",
            ContentInconsistentReferences => "CONTENT_INCONSISTENT_REFERENCES",
            ContentInvalidSiret => "CONTENT_INVALID_SIRET",
            ContentInvalidSiren => "CONTENT_INVALID_SIREN",
            ContentInvalidVat => "CONTENT_INVALID_VAT",
            ContentSirenVatMismatch => "CONTENT_SIREN_VAT_MISMATCH",
            ContentMissingCompanyId => "CONTENT_MISSING_COMPANY_ID",
            FontsExcessiveDiversity => "FONTS_EXCESSIVE_DIVERSITY",
            FontsHighDiversity => "FONTS_HIGH_DIVERSITY",
            FontsSystemFonts => "FONTS_SYSTEM_FONTS",
            FontsNotEmbedded => "FONTS_NOT_EMBEDDED",
            FontsMixedSubsets => "FONTS_MIXED_SUBSETS",
            FontsMidlineChange => "FONTS_MIDLINE_CHANGE",
            ImagesScreenshotDetected => "IMAGES_SCREENSHOT_DETECTED",
            ImagesResolutionMismatch => "IMAGES_RESOLUTION_MISMATCH",
            ImagesHeavyCompression => "IMAGES_HEAVY_COMPRESSION",
            ImagesExcessiveCount => "IMAGES_EXCESSIVE_COUNT",
            ImagesNoImages => "IMAGES_NO_IMAGES",
            ImagesImageOnlyPdf => "IMAGES_IMAGE_ONLY_PDF",
            ImagesMostlyImagePdf => "IMAGES_MOSTLY_IMAGE_PDF",
            ImagesPasteNoiseAnomaly => "IMAGES_PASTE_NOISE_ANOMALY",
            VisualQrUrlShortener => "VISUAL_QR_URL_SHORTENER",
            VisualQrSuspiciousTld => "VISUAL_QR_SUSPICIOUS_TLD",
            VisualQrDomainMismatch => "VISUAL_QR_DOMAIN_MISMATCH",
            VisualWatermark => "VISUAL_WATERMARK",
            VisualConverterWatermark => "VISUAL_CONVERTER_WATERMARK",
            StructIncrementalUpdates => "STRUCT_INCREMENTAL_UPDATES",
            StructJavascriptDetected => "STRUCT_JAVASCRIPT_DETECTED",
            StructEmbeddedFiles => "STRUCT_EMBEDDED_FILES",
            StructHiddenAnnotations => "STRUCT_HIDDEN_ANNOTATIONS",
            StructSuspiciousAnnotations => "STRUCT_SUSPICIOUS_ANNOTATIONS",
            StructAcroformDetected => "STRUCT_ACROFORM_DETECTED",
            StructDeletedObjects => "STRUCT_DELETED_OBJECTS",
            StructXmpEditorMismatch => "STRUCT_XMP_EDITOR_MISMATCH",
            StructSignatureTrusted => "STRUCT_SIGNATURE_TRUSTED",
            StructSignatureTrustedExpired => "STRUCT_SIGNATURE_TRUSTED_EXPIRED",
            StructSignatureNotTrusted => "STRUCT_SIGNATURE_NOT_TRUSTED",
            StructSignatureUnverifiable => "STRUCT_SIGNATURE_UNVERIFIABLE",
            StructSignatureInvalid => "STRUCT_SIGNATURE_INVALID",
            ForensicsElaMajorEdit => "FORENSICS_ELA_MAJOR_EDIT",
            ForensicsElaMinorEdit => "FORENSICS_ELA_MINOR_EDIT",
            TwoddocParseError => "TWODDOC_PARSE_ERROR",
            TwoddocFieldMismatch => "TWODDOC_FIELD_MISMATCH",
            TwoddocMissingTaxField => "TWODDOC_MISSING_TAX_FIELD",
            TwoddocBalanceMismatch => "TWODDOC_BALANCE_MISMATCH",
            TwoddocIncomeTooLow => "TWODDOC_INCOME_TOO_LOW",
            TwoddocIncomeTooHigh => "TWODDOC_INCOME_TOO_HIGH",
            ExternalSiretNotFound => "EXTERNAL_SIRET_NOT_FOUND",
            ExternalSirenNotFound => "EXTERNAL_SIREN_NOT_FOUND",
            ExternalCompanyClosed => "EXTERNAL_COMPANY_CLOSED",
            ExternalCompanyNameMismatch => "EXTERNAL_COMPANY_NAME_MISMATCH",
            ExternalSiretVerificationFailed => "EXTERNAL_SIRET_VERIFICATION_FAILED",
            ExternalSirenVerificationFailed => "EXTERNAL_SIREN_VERIFICATION_FAILED",
            ExternalVatVerificationFailed => "EXTERNAL_VAT_VERIFICATION_FAILED",
            ExternalVatInvalid => "EXTERNAL_VAT_INVALID",
            ExternalFileReputation => "EXTERNAL_FILE_REPUTATION",
            ExternalReputationFailed => "EXTERNAL_REPUTATION_FAILED",
        }
    }
}

impl std::fmt::Display for FlagCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FlagCode {
    /// Informational findings are reported but never penalize the score
    /// (a trusted signature is good news, not a defect).
    pub fn is_informational(self) -> bool {
        matches!(
            self,
            FlagCode::StructSignatureTrusted | FlagCode::StructSignatureNotTrusted
        )
    }
}

/// User-facing grouping of findings for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    /// Evidence the file was edited after production
    Tampering,
    /// Date incoherences
    Dates,
    /// Company identity problems
    Identity,
    /// Suspicious producing software
    Software,
    /// Visible marks: watermarks, QR codes
    Visual,
    /// File structure anomalies
    Structure,
    /// Image-level anomalies
    Images,
    /// Registry verification results
    External,
    /// 2D-DOC barcode findings
    Barcode,
}

impl FlagCode {
    /// Theme used to group this finding in summaries. Exhaustive on
    /// purpose: adding a code without classifying it is a compile error.
    pub fn theme(self) -> Theme {
        use FlagCode::*;
        match self {
            MetaAiGenerated | MetaSuspiciousProducer | MetaOnlineConverter => Theme::Software,
            MetaNoMetadata | MetaNoProducer => Theme::Software,
            MetaFutureCreationDate | MetaImpossibleDates => Theme::Dates,
            MetaDocumentModified => Theme::Tampering,
            ContentFarFutureDate | ContentVeryOldDate | ContentFutureInvoiceDate
            | ContentAnachronismService | ContentAnachronismDue | ContentAnachronismOrder
            | ContentReferenceDateMismatch => Theme::Dates,
            ContentRepeatedAmount | ContentInconsistentReferences => Theme::Tampering,
            ContentInvalidSiret | ContentInvalidSiren | ContentInvalidVat
            | ContentSirenVatMismatch | ContentMissingCompanyId => Theme::Identity,
            FontsExcessiveDiversity | FontsHighDiversity | FontsSystemFonts
            | FontsNotEmbedded | FontsMixedSubsets | FontsMidlineChange => Theme::Tampering,
            ImagesScreenshotDetected | ImagesResolutionMismatch | ImagesHeavyCompression
            | ImagesExcessiveCount | ImagesNoImages | ImagesImageOnlyPdf
            | ImagesMostlyImagePdf | ImagesPasteNoiseAnomaly => Theme::Images,
            VisualQrUrlShortener | VisualQrSuspiciousTld | VisualQrDomainMismatch
            | VisualWatermark | VisualConverterWatermark => Theme::Visual,
            StructIncrementalUpdates | StructDeletedObjects | StructXmpEditorMismatch => {
                Theme::Tampering
            }
            StructJavascriptDetected | StructEmbeddedFiles | StructHiddenAnnotations
            | StructSuspiciousAnnotations | StructAcroformDetected => Theme::Structure,
            StructSignatureTrusted | StructSignatureTrustedExpired | StructSignatureNotTrusted
            | StructSignatureUnverifiable | StructSignatureInvalid => Theme::Structure,
            ForensicsElaMajorEdit | ForensicsElaMinorEdit => Theme::Images,
            TwoddocParseError | TwoddocFieldMismatch | TwoddocMissingTaxField
            | TwoddocBalanceMismatch | TwoddocIncomeTooLow | TwoddocIncomeTooHigh => {
                Theme::Barcode
            }
            ExternalSiretNotFound | ExternalSirenNotFound | ExternalCompanyClosed
            | ExternalCompanyNameMismatch | ExternalSiretVerificationFailed
            | ExternalSirenVerificationFailed | ExternalVatVerificationFailed
            | ExternalVatInvalid | ExternalFileReputation | ExternalReputationFailed => {
                Theme::External
            }
        }
    }
}

/// One revision of an incrementally-updated file, as diffed against the
/// previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionSummary {
    /// 1-based revision number (revision 1 is the original save)
    pub revision: usize,
    /// Pages whose text changed
    pub pages_touched: Vec<usize>,
    /// Sample of added lines (capped)
    pub added_lines: Vec<String>,
    /// Sample of removed lines (capped)
    pub removed_lines: Vec<String>,
    /// Kinds of objects rewritten in this revision
    pub changed_kinds: Vec<String>,
}

/// One cross-verified field of a 2D-DOC barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    /// Data identifier
    pub di: String,
    /// Registry name of the field
    pub name: String,
    /// Signed value carried by the barcode
    pub value: String,
    /// Whether the value was found in the visible text
    pub matched: bool,
}

/// Structured context attached to a flag, one variant per code family.
/// Serialized untagged: the wire stays a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum FlagDetails {
    ProducerMatch {
        matched_term: String,
        producer: Option<String>,
        creator: Option<String>,
    },
    DateDelta {
        delta_seconds: i64,
        display: String,
    },
    DateFinding {
        dates: Vec<String>,
        context: Option<String>,
    },
    AmountRepetition {
        amount: f64,
        occurrences: usize,
    },
    ReferenceReport {
        references: Vec<String>,
        embedded_date: Option<String>,
        mismatch_part: Option<String>,
    },
    IdentifierReport {
        kind: String,
        value: String,
    },
    IdentifierSets {
        document_sirens: Vec<String>,
        vat_sirens: Vec<String>,
    },
    FontReport {
        families: Vec<String>,
        family_count: usize,
    },
    MidlineReport {
        sample_lines: Vec<String>,
        affected_lines: usize,
    },
    ImageReport {
        xref: u32,
        page: usize,
        width: u32,
        height: u32,
    },
    DpiReport {
        min_dpi: f64,
        max_dpi: f64,
    },
    CountReport {
        count: usize,
        threshold: usize,
    },
    UrlReport {
        url: String,
        host: String,
        expected_domains: Vec<String>,
    },
    WatermarkReport {
        token: String,
        pages: Vec<usize>,
    },
    RevisionReport {
        eof_count: usize,
        edit_count: usize,
        revisions: Vec<RevisionSummary>,
    },
    SignatureReport {
        status: String,
        signer: Option<String>,
        sub_filter: Option<String>,
    },
    ElaReport {
        xref: u32,
        page: usize,
        edited_ratio: f64,
        regions: Vec<[u32; 4]>,
    },
    RegistryReport {
        identifier: String,
        registered_name: Option<String>,
        status: Option<String>,
        similarity: Option<f64>,
    },
    BarcodeReport {
        doc_type: Option<String>,
        fields: Vec<FieldMatch>,
    },
    IncomeReport {
        tax_amount: f64,
        household_parts: f64,
        plausible_min: f64,
        plausible_max: f64,
        found_value: f64,
    },
    XmpReport {
        xmp_toolkit: String,
        info_producer: String,
    },
    /// Free-form fallback for codes without a structured family.
    Map(IndexMap<String, serde_json::Value>),
}

/// A single suspicious finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    /// How serious the finding is
    pub severity: Severity,
    /// Stable identifier
    pub code: FlagCode,
    /// Human-readable description; wording may change between releases
    pub message: String,
    /// Optional structured context
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub details: Option<FlagDetails>,
}

impl Flag {
    /// Create a flag without details.
    pub fn new(severity: Severity, code: FlagCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: FlagDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// Result returned by each analysis module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    /// Module identity
    pub module: ModuleName,
    /// Trust score 0–100 (100 = nothing suspicious)
    pub score: u8,
    /// How much data the module had to work with, 0.0–1.0
    pub confidence: f64,
    /// Findings, insertion order
    pub flags: Vec<Flag>,
}

impl ModuleResult {
    /// Build a result from flags: start at 100, subtract per-severity
    /// penalties (informational codes exempt), floor at 0.
    pub fn from_flags(module: ModuleName, flags: Vec<Flag>, confidence: f64) -> Self {
        let penalty: u32 = flags
            .iter()
            .filter(|f| !f.code.is_informational())
            .map(|f| f.severity.penalty())
            .sum();
        let score = 100i64.saturating_sub(penalty as i64).max(0) as u8;
        Self {
            module,
            score,
            confidence: confidence.clamp(0.0, 1.0),
            flags,
        }
    }

    /// Placeholder for a module that crashed: carries zero weight.
    pub fn degraded(module: ModuleName) -> Self {
        Self {
            module,
            score: 100,
            confidence: 0.0,
            flags: Vec::new(),
        }
    }
}

/// Final combined result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// SHA-256 of the analyzed file
    pub content_hash: String,
    /// Combined trust score 0–100
    pub trust_score: u8,
    /// Risk classification
    pub risk_level: RiskLevel,
    /// Duration of the analysis
    pub analysis_time_ms: u64,
    /// Per-module results, fixed order
    pub modules: Vec<ModuleResult>,
}

impl AnalysisResult {
    /// Total number of flags across modules.
    pub fn flag_count(&self) -> usize {
        self.modules.iter().map(|m| m.flags.len()).sum()
    }
}

/// A short verdict plus bullet findings, for humans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// One-line verdict
    pub verdict: String,
    /// Finding sentences, most severe themes first
    pub bullets: Vec<String>,
}
