//! Injected collaborator primitives.
//!
//! The core pipeline never talks to the network, a rasterizer or a barcode
//! library directly; it consumes the traits here. Implementations are
//! supplied by the embedding application (or by tests, which is why the
//! clock is a trait: determinism of every date check depends on it).

use chrono::{DateTime, TimeZone, Utc};
use image::GrayImage;
use std::sync::Arc;

/// Source of "now". Mandatory injection point.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant, for reproducible analyses and tests.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pin to a calendar date at midnight UTC.
    pub fn at(year: i32, month: u32, day: u32) -> Self {
        Self(
            Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
                .single()
                .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().expect("epoch")),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Renders one page of the document to a grayscale bitmap.
///
/// `zoom` 1.0 means 72 DPI; callers pass ~1.4 for 100 DPI and ~2.8 for
/// 200 DPI. Returns `None` when the page cannot be rendered.
pub trait PageRasterizer: Send + Sync {
    /// Render page `index` (zero-based) at the given zoom.
    fn render(&self, page: usize, zoom: f32) -> Option<GrayImage>;
}

/// A decoded barcode: payload plus bounding box in bitmap pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBarcode {
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Bounding box `[x, y, w, h]`
    pub bbox: [u32; 4],
}

/// Decodes 2D barcodes out of bitmaps.
pub trait BarcodeDecoder: Send + Sync {
    /// Find and decode DataMatrix codes.
    fn decode_datamatrix(&self, bitmap: &GrayImage) -> Vec<DecodedBarcode>;
    /// Find and decode QR codes.
    fn decode_qr(&self, bitmap: &GrayImage) -> Vec<DecodedBarcode>;
}

/// Administrative status of a registered company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyStatus {
    /// Administratively active
    Active,
    /// Closed / ceased
    Closed,
    /// Registry did not say
    Unknown,
}

/// Company record returned by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyInfo {
    /// 9-digit SIREN
    pub siren: String,
    /// 14-digit SIRET when an establishment was matched
    pub siret: Option<String>,
    /// Registered legal name
    pub name: String,
    /// Trade name
    pub trade_name: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// City
    pub city: Option<String>,
    /// Administrative status
    pub status: CompanyStatus,
    /// Legal form (SAS, SARL, …)
    pub legal_form: Option<String>,
    /// Registration date, ISO `YYYY-MM-DD`
    pub creation_date: Option<String>,
}

/// Outcome of a registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The registry returned a record
    Found(CompanyInfo),
    /// The registry explicitly knows no such identifier
    NotFound,
    /// Network/timeout/server failure — must degrade to a low flag
    Error(String),
}

/// French company registry (SIRENE-style).
pub trait CompanyRegistry: Send + Sync {
    /// Look up an establishment by its 14-digit SIRET.
    fn lookup_siret(&self, siret: &str) -> LookupOutcome;
    /// Look up a company by its 9-digit SIREN.
    fn lookup_siren(&self, siren: &str) -> LookupOutcome;
}

/// Outcome of a VAT number validation.
#[derive(Debug, Clone, PartialEq)]
pub enum VatOutcome {
    /// The service judged the number valid
    Valid {
        /// Registered name, when disclosed
        name: Option<String>,
        /// Registered address, when disclosed
        address: Option<String>,
    },
    /// The service judged the number invalid
    Invalid,
    /// Network/timeout/server failure
    Error(String),
}

/// EU VAT validation service (VIES-style).
pub trait VatValidator: Send + Sync {
    /// Validate `number` for country `cc` (two letters).
    fn validate(&self, cc: &str, number: &str) -> VatOutcome;
}

/// Verdict from a file-reputation service.
#[derive(Debug, Clone, PartialEq)]
pub enum ReputationOutcome {
    /// No engine flagged the hash
    Clean,
    /// At least one engine flagged the hash
    Malicious {
        /// Engines that flagged it
        positives: u32,
        /// Engines consulted
        total: u32,
        /// Link to the full report
        report_url: Option<String>,
    },
    /// Hash unknown to the service
    Unknown,
    /// Network/timeout/server failure
    Error(String),
}

/// Hash-reputation service (VirusTotal-style).
pub trait ReputationService: Send + Sync {
    /// Query the reputation of a SHA-256 hex digest.
    fn reputation(&self, sha256: &str) -> ReputationOutcome;
}

/// The bundle of primitives handed to the analyzer. Every slot except the
/// clock is optional; modules degrade when a primitive is absent.
#[derive(Clone)]
pub struct Services {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Page rasterizer
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,
    /// Barcode decoder
    pub barcode: Option<Arc<dyn BarcodeDecoder>>,
    /// Company registry
    pub registry: Option<Arc<dyn CompanyRegistry>>,
    /// VAT validator
    pub vat: Option<Arc<dyn VatValidator>>,
    /// File reputation
    pub reputation: Option<Arc<dyn ReputationService>>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            rasterizer: None,
            barcode: None,
            registry: None,
            vat: None,
            reputation: None,
        }
    }
}

impl Services {
    /// Services with a pinned clock and nothing else.
    pub fn offline(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("rasterizer", &self.rasterizer.is_some())
            .field("barcode", &self.barcode.is_some())
            .field("registry", &self.registry.is_some())
            .field("vat", &self.vat.is_some())
            .field("reputation", &self.reputation.is_some())
            .finish()
    }
}
