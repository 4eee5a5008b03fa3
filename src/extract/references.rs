//! References extraction from movie-connections pages
//!
//! A connections page lists groups of related titles ("Follows", "Followed
//! by", "References", ...) as a flat run of sibling elements: a group header
//! followed by its items. Only the "References" group is collected.
//!
//! # State machine
//!
//! | State        | Node                          | Action            | Next         |
//! |--------------|-------------------------------|-------------------|--------------|
//! | `Scanning`   | header text + header class    | -                 | `Collecting` |
//! | `Scanning`   | anything else                 | skip              | `Scanning`   |
//! | `Collecting` | item class                    | append a record   | `Collecting` |
//! | `Collecting` | anything else                 | re-examine node   | `Scanning`   |
//!
//! A node that ends a group is re-examined while scanning, so a header that
//! directly follows another references group re-opens collection and its
//! items append to the same record list.

use crate::extract::{parse_selector, ExtractError, MarkupNode};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Selector of the region(s) whose children are walked
pub const DEFAULT_REGION_SELECTOR: &str = "#connections_content > .list";

/// Markers that separate the subject link from the description
const LINE_BREAKS: &[&str] = &["<br>", "<br/>", "<br />"];

/// One reference to another title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reference {
    /// `href` of the referenced title link (empty if none)
    pub subject: String,

    /// Markup following the first line break (empty if none)
    pub description: String,
}

impl Reference {
    /// Builds a record from an item node
    pub fn from_node<N: MarkupNode>(node: &N) -> Self {
        let markup = node.inner_html();
        Self {
            subject: node.child_href().unwrap_or_default(),
            description: after_line_break(&markup).unwrap_or_default().to_string(),
        }
    }
}

/// All references extracted from one page, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Movie {
    pub link: String,
    pub references: Vec<Reference>,
}

impl Movie {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            references: Vec::new(),
        }
    }
}

/// State of the sibling walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Looking for the group header
    Scanning,

    /// Inside the references group
    Collecting,
}

/// Markers identifying the references group
#[derive(Debug, Clone)]
pub struct ReferenceRules {
    /// Exact text of the group header
    pub header_text: String,

    /// Class carried by group headers
    pub header_class: String,

    /// Class carried by group items
    pub item_class: String,
}

impl Default for ReferenceRules {
    fn default() -> Self {
        Self {
            header_text: "References ".to_string(),
            header_class: "li_group".to_string(),
            item_class: "soda".to_string(),
        }
    }
}

impl ReferenceRules {
    /// Runs the state machine over a sibling sequence
    ///
    /// Returns the collected records in document order. A sequence without a
    /// header yields no records.
    pub fn collect<N, I>(&self, siblings: I) -> Vec<Reference>
    where
        N: MarkupNode,
        I: IntoIterator<Item = N>,
    {
        let mut state = ScanState::Scanning;
        let mut records = Vec::new();

        for node in siblings {
            state = self.step(state, &node, &mut records);
        }

        records
    }

    /// Applies one transition for `node`
    pub fn step<N: MarkupNode>(
        &self,
        state: ScanState,
        node: &N,
        records: &mut Vec<Reference>,
    ) -> ScanState {
        match state {
            ScanState::Collecting if node.has_class(&self.item_class) => {
                records.push(Reference::from_node(node));
                ScanState::Collecting
            }
            ScanState::Collecting => self.step(ScanState::Scanning, node, records),
            ScanState::Scanning if self.is_header(node) => ScanState::Collecting,
            ScanState::Scanning => ScanState::Scanning,
        }
    }

    fn is_header<N: MarkupNode>(&self, node: &N) -> bool {
        node.has_class(&self.header_class) && node.text() == self.header_text
    }
}

/// Extracts the references group from connections pages
#[derive(Debug)]
pub struct ReferenceExtractor {
    region: Selector,
    rules: ReferenceRules,
}

impl ReferenceExtractor {
    /// Creates an extractor with the default region selector and rules
    pub fn new() -> Result<Self, ExtractError> {
        Self::with_rules(DEFAULT_REGION_SELECTOR, ReferenceRules::default())
    }

    /// Creates an extractor with a custom region selector and rules
    pub fn with_rules(region_selector: &str, rules: ReferenceRules) -> Result<Self, ExtractError> {
        Ok(Self {
            region: parse_selector(region_selector)?,
            rules,
        })
    }

    /// Parses a page and collects references from every matching region
    pub fn extract(&self, link: &str, html: &str) -> Movie {
        let document = Html::parse_document(html);
        let mut movie = Movie::new(link);

        for region in document.select(&self.region) {
            let siblings = region.children().filter_map(ElementRef::wrap);
            movie.references.extend(self.rules.collect(siblings));
        }

        movie
    }
}

/// Returns the markup after the first line-break marker
fn after_line_break(markup: &str) -> Option<&str> {
    LINE_BREAKS
        .iter()
        .filter_map(|marker| markup.find(marker).map(|at| at + marker.len()))
        .min()
        .map(|start| &markup[start..])
}
