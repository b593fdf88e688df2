use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Filter is either one filter expression or a nested array of expressions.
///
/// Inside an inner array expressions are OR-ed, the outer array AND-s them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Expression(String),
    Array(Vec<Filter>),
}

impl From<&str> for Filter {
    fn from(expression: &str) -> Self {
        Filter::Expression(expression.to_string())
    }
}

impl From<String> for Filter {
    fn from(expression: String) -> Self {
        Filter::Expression(expression)
    }
}

impl<T: Into<Filter>> From<Vec<T>> for Filter {
    fn from(items: Vec<T>) -> Self {
        Filter::Array(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStrategy {
    #[default]
    All,
    Last,
    Frequency,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// SearchParams holds every search option.
///
/// The defaults mirror the server defaults so an untouched value behaves like
/// a bare query. `index_uid` is only used by multi-search and `facet_name` /
/// `facet_query` only by facet search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_query: Option<String>,
    pub offset: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<String>>,
    pub attributes_to_retrieve: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_crop: Option<Vec<String>>,
    pub crop_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_highlight: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    pub show_matches_position: bool,
    pub highlight_pre_tag: String,
    pub highlight_post_tag: String,
    pub crop_marker: String,
    pub matching_strategy: MatchingStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_search_on: Option<Vec<String>>,
    pub show_ranking_score: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub show_ranking_score_details: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            index_uid: None,
            q: None,
            facet_name: None,
            facet_query: None,
            offset: 0,
            limit: 20,
            filter: None,
            facets: None,
            attributes_to_retrieve: vec!["*".to_string()],
            attributes_to_crop: None,
            crop_length: 200,
            attributes_to_highlight: None,
            sort: None,
            show_matches_position: false,
            highlight_pre_tag: "<em>".to_string(),
            highlight_post_tag: "</em>".to_string(),
            crop_marker: "...".to_string(),
            matching_strategy: MatchingStrategy::All,
            hits_per_page: None,
            page: None,
            attributes_to_search_on: None,
            show_ranking_score: false,
            show_ranking_score_details: false,
            vector: None,
        }
    }
}

fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a query with the given search terms
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    /// Target an index, for use with multi-search
    pub fn with_index_uid(mut self, index_uid: impl Into<String>) -> Self {
        self.index_uid = Some(index_uid.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_facets<S: Into<String>>(mut self, facets: impl IntoIterator<Item = S>) -> Self {
        self.facets = Some(strings(facets));
        self
    }

    pub fn with_attributes_to_retrieve<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.attributes_to_retrieve = strings(attributes);
        self
    }

    pub fn with_attributes_to_crop<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.attributes_to_crop = Some(strings(attributes));
        self
    }

    pub fn with_crop_length(mut self, crop_length: usize) -> Self {
        self.crop_length = crop_length;
        self
    }

    pub fn with_attributes_to_highlight<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.attributes_to_highlight = Some(strings(attributes));
        self
    }

    pub fn with_sort<S: Into<String>>(mut self, sort: impl IntoIterator<Item = S>) -> Self {
        self.sort = Some(strings(sort));
        self
    }

    pub fn with_matches_position(mut self, show: bool) -> Self {
        self.show_matches_position = show;
        self
    }

    pub fn with_highlight_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.highlight_pre_tag = pre.into();
        self.highlight_post_tag = post.into();
        self
    }

    pub fn with_crop_marker(mut self, marker: impl Into<String>) -> Self {
        self.crop_marker = marker.into();
        self
    }

    pub fn with_matching_strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.matching_strategy = strategy;
        self
    }

    /// Switch to page-based pagination
    pub fn with_page(mut self, page: usize, hits_per_page: usize) -> Self {
        self.page = Some(page);
        self.hits_per_page = Some(hits_per_page);
        self
    }

    pub fn with_attributes_to_search_on<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.attributes_to_search_on = Some(strings(attributes));
        self
    }

    pub fn with_ranking_score(mut self, show: bool) -> Self {
        self.show_ranking_score = show;
        self
    }

    /// Experimental on the server side, needs the `scoreDetails` feature
    pub fn with_ranking_score_details(mut self, show: bool) -> Self {
        self.show_ranking_score_details = show;
        self
    }

    /// Experimental on the server side, needs the `vectorStore` feature
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub(crate) fn for_facet(mut self, facet_name: String, facet_query: String) -> Self {
        self.facet_name = Some(facet_name);
        self.facet_query = Some(facet_query);
        self
    }
}

/// Build the body of a facet search from a facet name, a facet query and
/// the regular search options
pub fn facet_search_params(
    facet_name: impl Into<String>,
    facet_query: impl Into<String>,
    params: SearchParams,
) -> SearchParams {
    params.for_facet(facet_name.into(), facet_query.into())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetStats {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub hits: Vec<serde_json::Value>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub estimated_total_hits: Option<usize>,
    #[serde(default)]
    pub total_hits: Option<usize>,
    #[serde(default)]
    pub total_pages: Option<usize>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub hits_per_page: Option<usize>,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub facet_distribution: Option<HashMap<String, HashMap<String, u64>>>,
    #[serde(default)]
    pub facet_stats: Option<HashMap<String, FacetStats>>,
}

/// One entry of a multi-search response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultsWithUid {
    pub index_uid: String,
    #[serde(flatten)]
    pub results: SearchResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSearchResponse {
    pub results: Vec<SearchResultsWithUid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetHit {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSearchResults {
    pub facet_hits: Vec<FacetHit>,
    #[serde(default)]
    pub facet_query: Option<String>,
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_params_match_server_defaults() {
        let body = serde_json::to_value(SearchParams::query("batman")).unwrap();

        assert_eq!(
            body,
            json!({
                "q": "batman",
                "offset": 0,
                "limit": 20,
                "attributesToRetrieve": ["*"],
                "cropLength": 200,
                "showMatchesPosition": false,
                "highlightPreTag": "<em>",
                "highlightPostTag": "</em>",
                "cropMarker": "...",
                "matchingStrategy": "all",
                "showRankingScore": false
            })
        );
    }

    #[test]
    fn test_experimental_fields_only_sent_when_set() {
        let body = serde_json::to_value(
            SearchParams::new()
                .with_ranking_score_details(true)
                .with_vector(vec![0.5, 0.25]),
        )
        .unwrap();

        assert_eq!(body["showRankingScoreDetails"], json!(true));
        assert_eq!(body["vector"], json!([0.5, 0.25]));
    }

    #[test]
    fn test_nested_filter_serializes_as_arrays() {
        let filter: Filter = vec![
            Filter::from(vec!["genre = horror", "genre = comedy"]),
            Filter::from("release_date > 795484800"),
        ]
        .into();

        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!([["genre = horror", "genre = comedy"], "release_date > 795484800"])
        );
    }

    #[test]
    fn test_facet_search_params_carry_facet_fields() {
        let params = facet_search_params("genre", "fic", SearchParams::new().with_limit(5));
        let body = serde_json::to_value(&params).unwrap();

        assert_eq!(body["facetName"], json!("genre"));
        assert_eq!(body["facetQuery"], json!("fic"));
        assert_eq!(body["limit"], json!(5));
    }

    #[test]
    fn test_multi_search_results_flatten() {
        let response: MultiSearchResponse = serde_json::from_value(json!({
            "results": [{
                "indexUid": "movies",
                "hits": [{ "id": 1 }],
                "query": "x",
                "processingTimeMs": 1,
                "limit": 20,
                "offset": 0,
                "estimatedTotalHits": 1
            }]
        }))
        .unwrap();

        assert_eq!(response.results[0].index_uid, "movies");
        assert_eq!(response.results[0].results.hits.len(), 1);
        assert_eq!(response.results[0].results.estimated_total_hits, Some(1));
    }
}
