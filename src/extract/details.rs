//! Title details extraction from title main pages
//!
//! Pulls rating, origin countries, runtime, box office figures and review
//! counts from the title overview. Pages without the overview region are
//! ignored.

use crate::extract::{parse_selector, ExtractError, MULTI_VALUE_DELIMITER};
use crate::identifier::Identifier;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

const ROOT: &str = ".dDUGgO";
const RATING: &str = ".iTLWoV";
const COUNTRIES: &str =
    "[data-testid=\"title-details-origin\"] .ipc-metadata-list-item__list-content-item--link";
const RUNTIME: &str =
    "[data-testid=\"title-techspec_runtime\"] .ipc-metadata-list-item__list-content-item";
const BUDGET: &str =
    "[data-testid=\"title-boxoffice-budget\"] .ipc-metadata-list-item__list-content-item";
const GROSS_WORLDWIDE: &str = "[data-testid=\"title-boxoffice-cumulativeworldwidegross\"] .ipc-metadata-list-item__list-content-item";
const REVIEW_LABEL: &str = ".bUNAEL .label";
const REVIEW_SCORE: &str = ".score";

const BUDGET_SUFFIX: &str = " (estimated)";
const USER_REVIEWS_LABEL: &str = "User reviews";
const CRITIC_REVIEWS_LABEL: &str = "Critic reviews";

/// Overview figures of one title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TitleDetails {
    pub movie_id: String,
    pub rating: String,
    pub countries: Vec<String>,
    pub runtime: String,
    pub budget: String,
    pub gross_worldwide: String,
    pub user_reviews: String,
    pub critic_reviews: String,
}

impl TitleDetails {
    /// Flattens the record into CSV columns
    pub fn csv_row(&self) -> Vec<String> {
        vec![
            self.movie_id.clone(),
            self.rating.clone(),
            self.countries.join(MULTI_VALUE_DELIMITER),
            self.runtime.clone(),
            self.budget.clone(),
            self.gross_worldwide.clone(),
            self.user_reviews.clone(),
            self.critic_reviews.clone(),
        ]
    }
}

#[derive(Debug)]
pub struct DetailsExtractor {
    root: Selector,
    rating: Selector,
    countries: Selector,
    runtime: Selector,
    budget: Selector,
    gross_worldwide: Selector,
    review_label: Selector,
    review_score: Selector,
}

impl DetailsExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            root: parse_selector(ROOT)?,
            rating: parse_selector(RATING)?,
            countries: parse_selector(COUNTRIES)?,
            runtime: parse_selector(RUNTIME)?,
            budget: parse_selector(BUDGET)?,
            gross_worldwide: parse_selector(GROSS_WORLDWIDE)?,
            review_label: parse_selector(REVIEW_LABEL)?,
            review_score: parse_selector(REVIEW_SCORE)?,
        })
    }

    /// Extracts details from a title page
    ///
    /// Single-valued fields take the last match in document order.
    pub fn extract(&self, id: &Identifier, html: &str) -> Option<TitleDetails> {
        let document = Html::parse_document(html);
        let mut found = None;

        for root in document.select(&self.root) {
            let details = found.get_or_insert_with(|| TitleDetails {
                movie_id: id.to_string(),
                ..TitleDetails::default()
            });
            self.fill(root, details);
        }

        found
    }

    fn fill(&self, root: ElementRef<'_>, details: &mut TitleDetails) {
        if let Some(rating) = last_text(root, &self.rating) {
            details.rating = rating;
        }

        details
            .countries
            .extend(root.select(&self.countries).map(element_text));

        if let Some(runtime) = last_text(root, &self.runtime) {
            details.runtime = runtime;
        }

        if let Some(budget) = last_text(root, &self.budget) {
            details.budget = budget.replace(BUDGET_SUFFIX, "");
        }

        if let Some(gross) = last_text(root, &self.gross_worldwide) {
            details.gross_worldwide = gross;
        }

        for label in root.select(&self.review_label) {
            let target = match element_text(label).as_str() {
                USER_REVIEWS_LABEL => &mut details.user_reviews,
                CRITIC_REVIEWS_LABEL => &mut details.critic_reviews,
                _ => continue,
            };

            if let Some(parent) = label.parent().and_then(ElementRef::wrap) {
                *target = parent.select(&self.review_score).map(element_text).collect();
            }
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn last_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).last().map(element_text)
}
