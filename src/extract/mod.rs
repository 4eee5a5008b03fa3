//! Extraction module turning fetched markup into structured records
//!
//! This module contains:
//! - The `MarkupNode` seam the extraction state machine walks over
//! - The references extractor (movie-connections pages)
//! - The title details extractor (title main pages)
//! - The `Extraction` result shared by both, renderable as CSV rows or JSON

mod details;
mod references;

pub use details::{DetailsExtractor, TitleDetails};
pub use references::{Movie, Reference, ReferenceExtractor, ReferenceRules, ScanState};

use crate::config::Profile;
use crate::identifier::Identifier;
use scraper::ElementRef;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while preparing extractors
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Delimiter joining multi-valued fields in CSV output
pub const MULTI_VALUE_DELIMITER: &str = ",";

/// Per-node capabilities needed by the extractors
pub trait MarkupNode {
    /// Concatenated text content of the node
    fn text(&self) -> String;

    /// Whether the node's class list contains `class`
    fn has_class(&self, class: &str) -> bool;

    /// Serialized markup of the node's children
    fn inner_html(&self) -> String;

    /// `href` of the first child element carrying one
    fn child_href(&self) -> Option<String>;
}

impl MarkupNode for ElementRef<'_> {
    fn text(&self) -> String {
        ElementRef::text(self).collect()
    }

    fn has_class(&self, class: &str) -> bool {
        self.value().classes().any(|c| c == class)
    }

    fn inner_html(&self) -> String {
        ElementRef::inner_html(self)
    }

    fn child_href(&self) -> Option<String> {
        self.children()
            .filter_map(ElementRef::wrap)
            .find_map(|child| child.value().attr("href").map(str::to_string))
    }
}

/// Structured result extracted from one page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    References(Movie),
    Details(TitleDetails),
}

impl Extraction {
    /// True if there is nothing worth persisting
    pub fn is_empty(&self) -> bool {
        match self {
            Self::References(movie) => movie.references.is_empty(),
            Self::Details(_) => false,
        }
    }

    /// Number of top-level records
    pub fn record_count(&self) -> usize {
        match self {
            Self::References(movie) => movie.references.len(),
            Self::Details(_) => 1,
        }
    }

    /// Flattens the extraction into CSV rows, one per top-level record
    pub fn csv_rows(&self, id: &Identifier) -> Vec<Vec<String>> {
        match self {
            Self::References(movie) => movie
                .references
                .iter()
                .map(|r| vec![id.to_string(), r.subject.clone(), r.description.clone()])
                .collect(),
            Self::Details(details) => vec![details.csv_row()],
        }
    }
}

/// Extractor selected by the crawl profile
#[derive(Debug)]
pub enum Extractor {
    References(ReferenceExtractor),
    Details(DetailsExtractor),
}

impl Extractor {
    /// Builds the extractor for a profile with its default rules
    pub fn for_profile(profile: Profile) -> Result<Self, ExtractError> {
        Ok(match profile {
            Profile::References => Self::References(ReferenceExtractor::new()?),
            Profile::Details => Self::Details(DetailsExtractor::new()?),
        })
    }

    /// Extracts structured data from a page body
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier of the page being processed
    /// * `link` - URL the page was fetched from
    /// * `html` - Raw page body
    ///
    /// # Returns
    ///
    /// * `Some(Extraction)` - Data extracted (possibly with zero records)
    /// * `None` - The page does not contain the expected region
    pub fn extract(&self, id: &Identifier, link: &str, html: &str) -> Option<Extraction> {
        match self {
            Self::References(extractor) => {
                Some(Extraction::References(extractor.extract(link, html)))
            }
            Self::Details(extractor) => extractor.extract(id, html).map(Extraction::Details),
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<scraper::Selector, ExtractError> {
    scraper::Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn with_node<F: FnOnce(ElementRef<'_>)>(html: &str, f: F) {
        let fragment = Html::parse_fragment(html);
        let selector = Selector::parse("div.node").unwrap();
        let node = fragment.select(&selector).next().unwrap();
        f(node);
    }

    #[test]
    fn test_markup_node_capabilities() {
        with_node(
            r#"<div class="node soda odd"><a href="/title/tt5">link</a><br>Some text</div>"#,
            |node| {
                assert!(node.has_class("soda"));
                assert!(node.has_class("odd"));
                assert!(!node.has_class("li_group"));
                assert_eq!(MarkupNode::text(&node), "linkSome text");
                assert_eq!(
                    MarkupNode::inner_html(&node),
                    r#"<a href="/title/tt5">link</a><br>Some text"#
                );
                assert_eq!(node.child_href(), Some("/title/tt5".to_string()));
            },
        );
    }

    #[test]
    fn test_child_href_ignores_grandchildren() {
        with_node(
            r#"<div class="node"><span><a href="/deep">x</a></span></div>"#,
            |node| assert_eq!(node.child_href(), None),
        );
    }

    #[test]
    fn test_references_csv_rows() {
        let id = Identifier::parse("tt0000005").unwrap();
        let extraction = Extraction::References(Movie {
            link: "https://www.imdb.com/title/tt0000005/movieconnections/".to_string(),
            references: vec![Reference {
                subject: "/title/tt0000777".to_string(),
                description: "Followed by".to_string(),
            }],
        });

        assert!(!extraction.is_empty());
        assert_eq!(
            extraction.csv_rows(&id),
            vec![vec![
                "tt0000005".to_string(),
                "/title/tt0000777".to_string(),
                "Followed by".to_string()
            ]]
        );
    }

    #[test]
    fn test_empty_movie_is_empty() {
        let extraction = Extraction::References(Movie::new("https://example.com/title/tt1"));
        assert!(extraction.is_empty());
        assert_eq!(extraction.record_count(), 0);
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            parse_selector("div[[["),
            Err(ExtractError::Selector { .. })
        ));
    }
}
