use std::collections::HashSet;
use std::path::Path;

use url::Url;

use crate::PipelineConfig;

/// A document link found in one of an archive's HTML members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub href: String,
    pub anchor_text: Option<String>,
    /// Ledger key of the archive the link was found in.
    pub archive: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Fetch(Url),
    /// Hosted on a file-sharing service we do not download from.
    SkipExternal { host: String },
    /// Relative reference and resolution is off or no base could be derived.
    SkipRelative,
    SkipUnsupported { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub link: CandidateLink,
    pub action: LinkAction,
}

/// Drops repeated hrefs, keeping first-seen order, then keeps at most `cap`.
pub fn dedupe_and_cap(links: Vec<CandidateLink>, cap: usize) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.href.trim().to_string()))
        .take(cap)
        .collect()
}

/// Decides what to do with a single href.
pub fn classify_link(href: &str, external_hosts: &[String], base: Option<&Url>) -> LinkAction {
    let trimmed = href.trim();
    match Url::parse(trimmed) {
        Ok(url) => classify_absolute(url, external_hosts),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => match base.join(trimmed) {
                Ok(url) => classify_absolute(url, external_hosts),
                Err(err) => LinkAction::SkipUnsupported {
                    reason: err.to_string(),
                },
            },
            None => LinkAction::SkipRelative,
        },
        Err(err) => LinkAction::SkipUnsupported {
            reason: err.to_string(),
        },
    }
}

fn classify_absolute(url: Url, external_hosts: &[String]) -> LinkAction {
    if !matches!(url.scheme(), "http" | "https") {
        return LinkAction::SkipUnsupported {
            reason: format!("scheme {}", url.scheme()),
        };
    }
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let external = external_hosts.iter().any(|known| {
        let known = known.to_ascii_lowercase();
        host == known || host.ends_with(&format!(".{known}"))
    });
    if external {
        LinkAction::SkipExternal { host }
    } else {
        LinkAction::Fetch(url)
    }
}

/// Derives `https://<dir name>/` from the directory an archive sits in.
///
/// Only directory names that look like a host (contain a dot) qualify.
pub fn base_url_for_archive(archive_path: &Path) -> Option<Url> {
    let dir_name = archive_path.parent()?.file_name()?.to_str()?;
    if !dir_name.contains('.') || dir_name.starts_with('.') || dir_name.contains(char::is_whitespace)
    {
        return None;
    }
    Url::parse(&format!("https://{dir_name}/"))
        .ok()
        .filter(|url| url.host_str().is_some())
}

/// Dedupes, caps and classifies the links pooled from one archive.
pub fn plan_links(
    links: Vec<CandidateLink>,
    config: &PipelineConfig,
    archive_path: &Path,
) -> Vec<PlannedLink> {
    let base = if config.resolve_relative_links {
        base_url_for_archive(archive_path)
    } else {
        None
    };
    dedupe_and_cap(links, config.max_links_per_archive)
        .into_iter()
        .map(|link| {
            let action = classify_link(&link.href, &config.external_hosts, base.as_ref());
            PlannedLink { link, action }
        })
        .collect()
}
