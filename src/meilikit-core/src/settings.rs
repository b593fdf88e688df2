//! Index settings.
//!
//! The server exposes one settings object whose fields are all optional and
//! independently resettable. `None` fields are never serialized, so a partial
//! [`Settings`] value is a partial update.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<HashMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typo_tolerance: Option<TypoTolerance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faceting: Option<Faceting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_tokens: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_separator_tokens: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<Vec<String>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranking_rules<S: Into<String>>(mut self, rules: impl IntoIterator<Item = S>) -> Self {
        self.ranking_rules = Some(rules.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_filterable_attributes<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.filterable_attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sortable_attributes<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sortable_attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_searchable_attributes<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.searchable_attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_stop_words<S: Into<String>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        self.stop_words = Some(words.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_distinct_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.distinct_attribute = Some(attribute.into());
        self
    }

    pub fn with_synonyms(mut self, synonyms: HashMap<String, Vec<String>>) -> Self {
        self.synonyms = Some(synonyms);
        self
    }

    pub fn with_typo_tolerance(mut self, typo_tolerance: TypoTolerance) -> Self {
        self.typo_tolerance = Some(typo_tolerance);
        self
    }

    pub fn with_faceting(mut self, faceting: Faceting) -> Self {
        self.faceting = Some(faceting);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinWordSizeForTypos {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_typo: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_typos: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypoTolerance {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_on_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_on_words: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_word_size_for_typos: Option<MinWordSizeForTypos>,
}

fn default_true() -> bool {
    true
}

impl Default for TypoTolerance {
    fn default() -> Self {
        Self {
            enabled: true,
            disable_on_attributes: None,
            disable_on_words: None,
            min_word_size_for_typos: None,
        }
    }
}

/// Order in which facet values are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetOrder {
    Alpha,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faceting {
    pub max_values_per_facet: u32,
    // Keyed by attribute name, "*" applies to every facet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_facet_values_by: Option<BTreeMap<String, FacetOrder>>,
}

impl Faceting {
    pub fn new(max_values_per_facet: u32) -> Self {
        Self {
            max_values_per_facet,
            sort_facet_values_by: None,
        }
    }

    pub fn with_sort(mut self, attribute: impl Into<String>, order: FacetOrder) -> Self {
        self.sort_facet_values_by
            .get_or_insert_with(BTreeMap::new)
            .insert(attribute.into(), order);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub max_total_hits: u64,
}
