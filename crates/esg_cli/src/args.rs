// crates/esg_cli/src/args.rs
//
// Deterministic, offline CLI argument parsing & validation.
// - No networked paths (reject scheme:// inputs)
// - `--doc ORG:YEAR` selects which (org, fiscal_year) pairs to run the
//   matrix over; `--ingest PDF:ORG:YEAR` optionally builds bronze/silver
//   for a pair before the matrix runs.

use std::{
    env,
    fs,
    path::PathBuf,
};

use clap::{Parser, ValueEnum};

use esg_core::ids::OrgId;

/// Phase flag from the external interface contract (spec §6): `fetch` may
/// contact the network through the cache, `replay` must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    Fetch,
    Replay,
}

#[derive(Debug, Parser)]
#[command(name = "esg", about = "Deterministic ESG maturity evaluation engine")]
pub struct Args {
    /// Path to the rubric document (schema-validated structured JSON, §4.5).
    #[arg(long)]
    pub rubric: PathBuf,

    /// `fetch` (may populate the cache over the network) or `replay`
    /// (offline, fails closed on a cache miss). Overrides `OFFLINE_REPLAY`.
    #[arg(long, value_enum)]
    pub phase: Option<Phase>,

    /// `ORG:YEAR` pairs to run the matrix over. Silver must already exist
    /// for each pair unless a matching `--ingest` entry is given.
    #[arg(long = "doc")]
    pub docs: Vec<String>,

    /// `PDF_PATH:ORG:YEAR` triples to ingest (C1) and consolidate before
    /// the matrix runs.
    #[arg(long = "ingest")]
    pub ingest: Vec<String>,

    /// Overrides `ARTIFACTS_ROOT`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Overrides `DATA_ROOT`.
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Overrides `CACHE_ROOT`.
    #[arg(long)]
    pub cache_root: Option<PathBuf>,

    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
    BadDocSelector(String),
    BadIngestSelector(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be local (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
            BadDocSelector(s) => write!(f, "invalid --doc selector (want ORG:YEAR): {s}"),
            BadIngestSelector(s) => write!(f, "invalid --ingest selector (want PDF_PATH:ORG:YEAR): {s}"),
        }
    }
}
impl std::error::Error for CliError {}

/// A parsed `--ingest` entry.
pub struct IngestSelector {
    pub pdf_path: PathBuf,
    pub org_id: OrgId,
    pub fiscal_year: u16,
}

/// A parsed `--doc` entry.
pub struct DocSelector {
    pub org_id: OrgId,
    pub fiscal_year: u16,
}

pub fn parse_and_validate() -> Result<Args, CliError> {
    let mut args = Args::parse();

    if args.docs.is_empty() && args.ingest.is_empty() {
        return Err(CliError::Missing("--doc (or --ingest)"));
    }

    ensure_local_exists(&args.rubric, "--rubric")?;
    args.rubric = normalize_path(&args.rubric);

    // Validate shape only here; structured parsing happens in parse_docs/
    // parse_ingests so main.rs can build OrgId/DocId once, not twice.
    for d in &args.docs {
        parse_doc_selector(d)?;
    }
    for i in &args.ingest {
        parse_ingest_selector(i)?;
    }

    Ok(args)
}

pub fn parse_doc_selector(s: &str) -> Result<DocSelector, CliError> {
    let (org, year) = s
        .split_once(':')
        .ok_or_else(|| CliError::BadDocSelector(s.to_string()))?;
    let org_id = OrgId::try_from(org).map_err(|_| CliError::BadDocSelector(s.to_string()))?;
    let fiscal_year: u16 = year.parse().map_err(|_| CliError::BadDocSelector(s.to_string()))?;
    Ok(DocSelector { org_id, fiscal_year })
}

pub fn parse_ingest_selector(s: &str) -> Result<IngestSelector, CliError> {
    let mut parts = s.splitn(3, ':');
    let pdf = parts.next().ok_or_else(|| CliError::BadIngestSelector(s.to_string()))?;
    let org = parts.next().ok_or_else(|| CliError::BadIngestSelector(s.to_string()))?;
    let year = parts.next().ok_or_else(|| CliError::BadIngestSelector(s.to_string()))?;

    let pdf_path = PathBuf::from(pdf);
    ensure_local_exists(&pdf_path, "--ingest")?;
    let org_id = OrgId::try_from(org).map_err(|_| CliError::BadIngestSelector(s.to_string()))?;
    let fiscal_year: u16 = year.parse().map_err(|_| CliError::BadIngestSelector(s.to_string()))?;

    Ok(IngestSelector {
        pdf_path: normalize_path(&pdf_path),
        org_id,
        fiscal_year,
    })
}

fn ensure_local_exists(p: &PathBuf, label: &'static str) -> Result<(), CliError> {
    let s = p.to_string_lossy().to_string();
    if has_scheme(&s) {
        return Err(CliError::NonLocalPath(format!("{label} {s}")));
    }
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {s}")))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {s}")));
    }
    Ok(())
}

fn normalize_path(p: &PathBuf) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.clone()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}

fn has_scheme(s: &str) -> bool {
    s.contains("://") || s.starts_with("http:") || s.starts_with("https:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_selector_parses_org_and_year() {
        let d = parse_doc_selector("ACME:2024").unwrap();
        assert_eq!(d.org_id.as_str(), "ACME");
        assert_eq!(d.fiscal_year, 2024);
    }

    #[test]
    fn doc_selector_rejects_missing_colon() {
        assert!(parse_doc_selector("ACME2024").is_err());
    }

    #[test]
    fn doc_selector_rejects_non_numeric_year() {
        assert!(parse_doc_selector("ACME:abcd").is_err());
    }

    #[test]
    fn non_local_path_detection() {
        assert!(has_scheme("http://x"));
        assert!(has_scheme("scheme://x"));
        assert!(!has_scheme(r"/tmp/file.json"));
    }
}
