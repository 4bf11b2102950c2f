use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 3 * 1024 * 1024;

/// How the fetcher treats a response whose `Content-Length` is absent or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SizePolicy {
    /// Only the declared length is checked; a missing length counts as zero and passes.
    #[default]
    DeclaredOnly,
    /// A missing length is rejected and the streamed body is capped as well.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    pub max_bytes: u64,
    pub size_policy: SizePolicy,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub accept_invalid_certs: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            size_policy: SizePolicy::DeclaredOnly,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            redirect_limit: 5,
            accept_invalid_certs: true,
        }
    }
}

/// Static tables the link selector consults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorTables {
    /// Document extensions without the leading dot, lower-case.
    pub extensions: Vec<String>,
    /// Lower-case keyword stems searched in the anchor markup.
    pub keywords: Vec<String>,
    /// The keyword filter only applies when more links than this were harvested.
    pub keyword_threshold: usize,
}

impl Default for SelectorTables {
    fn default() -> Self {
        Self {
            extensions: ["pdf", "doc", "docx", "rtf", "csv", "xls", "xlsx"]
                .into_iter()
                .map(String::from)
                .collect(),
            keywords: [
                "договор",
                "оферт",
                "услов",
                "политика",
                "конфиденц",
                "реквизиты",
                "соглаш",
                "пользов",
                "персональн",
                "юридич",
                "право",
                "информ",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            keyword_threshold: 10,
        }
    }
}

impl SelectorTables {
    /// True when `href` ends with `.` followed by one of the document extensions.
    pub fn has_document_extension(&self, href: &str) -> bool {
        let href = href.trim();
        self.extensions.iter().any(|ext| {
            let suffix_len = ext.len() + 1;
            href.len() > suffix_len
                && href.is_char_boundary(href.len() - suffix_len)
                && {
                    let tail = &href[href.len() - suffix_len..];
                    tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(ext)
                }
        })
    }

    /// True when the lower-cased markup contains any keyword stem.
    pub fn matches_keyword(&self, markup: &str) -> bool {
        let lowered = markup.to_lowercase();
        self.keywords.iter().any(|kw| lowered.contains(kw.as_str()))
    }
}

/// Everything a pipeline run needs, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub root_dir: PathBuf,
    pub scratch_dir: PathBuf,
    /// Where ZIPs nested in RARs are exported once they are processed.
    pub results_dir: Option<PathBuf>,
    pub rar_ledger_path: PathBuf,
    pub zip_ledger_path: PathBuf,
    pub selector: SelectorTables,
    pub fetch: FetchPolicy,
    /// Hosts whose links are recorded but never fetched.
    pub external_hosts: Vec<String>,
    pub max_links_per_archive: usize,
    pub fetch_concurrency: usize,
    /// Rebuild absolute URLs for relative links from the archive's directory name.
    pub resolve_relative_links: bool,
    /// Also pack loose `.txt` files found next to the archive.
    pub sweep_loose_text: bool,
    /// External tool used to unpack RAR archives.
    pub unar_program: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./data"),
            scratch_dir: PathBuf::from("./tmp"),
            results_dir: Some(PathBuf::from("./results")),
            rar_ledger_path: PathBuf::from("./processed_rar.ledger"),
            zip_ledger_path: PathBuf::from("./processed_zip.ledger"),
            selector: SelectorTables::default(),
            fetch: FetchPolicy::default(),
            external_hosts: vec![
                "drive.google.com".to_string(),
                "disk.yandex.ru".to_string(),
                "yadi.sk".to_string(),
            ],
            max_links_per_archive: 10,
            fetch_concurrency: 4,
            resolve_relative_links: false,
            sweep_loose_text: true,
            unar_program: PathBuf::from("unar"),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with every path placed under `base`.
    pub fn rooted_at(base: &std::path::Path) -> Self {
        Self {
            root_dir: base.join("data"),
            scratch_dir: base.join("tmp"),
            results_dir: Some(base.join("results")),
            rar_ledger_path: base.join("processed_rar.ledger"),
            zip_ledger_path: base.join("processed_zip.ledger"),
            ..Self::default()
        }
    }
}
