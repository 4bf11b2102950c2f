use docsweep_core::SelectorTables;
use scraper::{ElementRef, Html, Selector};

use sweep_logging::sweep_debug;

use crate::decode::decode_html;

const DEFAULT_MAX_LINKS: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedLink {
    pub href: String,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read member {member}: {message}")]
    Read { member: String, message: String },
    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Picks document links out of archived HTML pages.
///
/// Three steps, all driven by [`SelectorTables`]:
/// - a page with no Cyrillic character anywhere (markup included) yields nothing
/// - anchors are kept when their href ends with a document extension
/// - over `keyword_threshold` survivors, only anchors whose markup names a keyword stay
pub struct LinkSelector {
    tables: SelectorTables,
    max_links_per_page: usize,
}

impl LinkSelector {
    pub fn new(tables: SelectorTables) -> Self {
        Self::with_max_links(tables, DEFAULT_MAX_LINKS)
    }

    pub fn with_max_links(tables: SelectorTables, max_links_per_page: usize) -> Self {
        Self {
            tables,
            max_links_per_page,
        }
    }

    pub fn select(&self, html_bytes: &[u8]) -> Result<Vec<SelectedLink>, ParseError> {
        let decoded = decode_html(html_bytes);
        if decoded.had_replacements {
            sweep_debug!("Replaced undecodable bytes while reading a page as {}", decoded.encoding_label);
        }
        if !contains_cyrillic(&decoded.text) {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(&decoded.text);
        let anchors = Selector::parse("a[href]").map_err(|e| ParseError::Selector(e.to_string()))?;

        let harvested: Vec<ElementRef> = document
            .select(&anchors)
            .filter(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| self.tables.has_document_extension(href))
            })
            .take(self.max_links_per_page)
            .collect();

        let over_broad = harvested.len() > self.tables.keyword_threshold;
        let links = harvested
            .into_iter()
            .filter(|a| !over_broad || self.tables.matches_keyword(&a.html()))
            .filter_map(to_selected)
            .collect();
        Ok(links)
    }
}

fn to_selected(anchor: ElementRef) -> Option<SelectedLink> {
    let href = anchor.value().attr("href")?.trim().to_string();
    let text = anchor
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(SelectedLink {
        href,
        text: if text.is_empty() { None } else { Some(text) },
    })
}

/// Any character from the Cyrillic block, U+0400 to U+04FF.
pub fn contains_cyrillic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}
