use std::collections::HashMap;

use meilikit_core::{Faceting, Pagination, Settings, TaskInfo, TypoTolerance};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::index::Index;
use crate::Result;

impl Index {
    fn settings_path(&self, setting: &str) -> String {
        if setting.is_empty() {
            self.path("settings")
        } else {
            self.path(&format!("settings/{setting}"))
        }
    }

    async fn get_setting<T: DeserializeOwned>(&self, setting: &str) -> Result<T> {
        self.transport.get(&self.settings_path(setting), &[]).await
    }

    async fn update_setting<B>(&self, method: Method, setting: &str, body: &B) -> Result<TaskInfo>
    where
        B: Serialize + ?Sized,
    {
        self.transport
            .request(method, &self.settings_path(setting), &[], Some(body))
            .await
    }

    async fn reset_setting(&self, setting: &str) -> Result<TaskInfo> {
        self.transport.delete(&self.settings_path(setting), &[]).await
    }

    pub async fn get_settings(&self) -> Result<Settings> {
        self.get_setting("").await
    }

    /// Update several settings at once; `None` fields are left untouched
    pub async fn update_settings(&self, settings: &Settings) -> Result<TaskInfo> {
        self.update_setting(Method::PATCH, "", settings).await
    }

    pub async fn reset_settings(&self) -> Result<TaskInfo> {
        self.reset_setting("").await
    }

    pub async fn get_ranking_rules(&self) -> Result<Vec<String>> {
        self.get_setting("ranking-rules").await
    }

    pub async fn update_ranking_rules(&self, rules: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "ranking-rules", rules).await
    }

    pub async fn reset_ranking_rules(&self) -> Result<TaskInfo> {
        self.reset_setting("ranking-rules").await
    }

    pub async fn get_distinct_attribute(&self) -> Result<Option<String>> {
        self.get_setting("distinct-attribute").await
    }

    pub async fn update_distinct_attribute(&self, attribute: &str) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "distinct-attribute", attribute)
            .await
    }

    pub async fn reset_distinct_attribute(&self) -> Result<TaskInfo> {
        self.reset_setting("distinct-attribute").await
    }

    pub async fn get_searchable_attributes(&self) -> Result<Vec<String>> {
        self.get_setting("searchable-attributes").await
    }

    pub async fn update_searchable_attributes(&self, attributes: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "searchable-attributes", attributes)
            .await
    }

    pub async fn reset_searchable_attributes(&self) -> Result<TaskInfo> {
        self.reset_setting("searchable-attributes").await
    }

    pub async fn get_displayed_attributes(&self) -> Result<Vec<String>> {
        self.get_setting("displayed-attributes").await
    }

    pub async fn update_displayed_attributes(&self, attributes: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "displayed-attributes", attributes)
            .await
    }

    pub async fn reset_displayed_attributes(&self) -> Result<TaskInfo> {
        self.reset_setting("displayed-attributes").await
    }

    /// `None` when no stop words are configured
    pub async fn get_stop_words(&self) -> Result<Option<Vec<String>>> {
        let words: Vec<String> = self.get_setting("stop-words").await?;
        Ok((!words.is_empty()).then_some(words))
    }

    pub async fn update_stop_words(&self, words: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "stop-words", words).await
    }

    pub async fn reset_stop_words(&self) -> Result<TaskInfo> {
        self.reset_setting("stop-words").await
    }

    /// `None` when no synonyms are configured
    pub async fn get_synonyms(&self) -> Result<Option<HashMap<String, Vec<String>>>> {
        let synonyms: HashMap<String, Vec<String>> = self.get_setting("synonyms").await?;
        Ok((!synonyms.is_empty()).then_some(synonyms))
    }

    pub async fn update_synonyms(&self, synonyms: &HashMap<String, Vec<String>>) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "synonyms", synonyms).await
    }

    pub async fn reset_synonyms(&self) -> Result<TaskInfo> {
        self.reset_setting("synonyms").await
    }

    /// `None` when no attribute is filterable
    pub async fn get_filterable_attributes(&self) -> Result<Option<Vec<String>>> {
        let attributes: Vec<String> = self.get_setting("filterable-attributes").await?;
        Ok((!attributes.is_empty()).then_some(attributes))
    }

    pub async fn update_filterable_attributes(&self, attributes: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "filterable-attributes", attributes)
            .await
    }

    pub async fn reset_filterable_attributes(&self) -> Result<TaskInfo> {
        self.reset_setting("filterable-attributes").await
    }

    pub async fn get_sortable_attributes(&self) -> Result<Vec<String>> {
        self.get_setting("sortable-attributes").await
    }

    pub async fn update_sortable_attributes(&self, attributes: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "sortable-attributes", attributes)
            .await
    }

    pub async fn reset_sortable_attributes(&self) -> Result<TaskInfo> {
        self.reset_setting("sortable-attributes").await
    }

    pub async fn get_typo_tolerance(&self) -> Result<TypoTolerance> {
        self.get_setting("typo-tolerance").await
    }

    pub async fn update_typo_tolerance(&self, typo_tolerance: &TypoTolerance) -> Result<TaskInfo> {
        self.update_setting(Method::PATCH, "typo-tolerance", typo_tolerance)
            .await
    }

    pub async fn reset_typo_tolerance(&self) -> Result<TaskInfo> {
        self.reset_setting("typo-tolerance").await
    }

    pub async fn get_faceting(&self) -> Result<Faceting> {
        self.get_setting("faceting").await
    }

    pub async fn update_faceting(&self, faceting: &Faceting) -> Result<TaskInfo> {
        self.update_setting(Method::PATCH, "faceting", faceting).await
    }

    pub async fn reset_faceting(&self) -> Result<TaskInfo> {
        self.reset_setting("faceting").await
    }

    pub async fn get_pagination(&self) -> Result<Pagination> {
        self.get_setting("pagination").await
    }

    pub async fn update_pagination(&self, pagination: &Pagination) -> Result<TaskInfo> {
        self.update_setting(Method::PATCH, "pagination", pagination).await
    }

    pub async fn reset_pagination(&self) -> Result<TaskInfo> {
        self.reset_setting("pagination").await
    }

    pub async fn get_separator_tokens(&self) -> Result<Vec<String>> {
        self.get_setting("separator-tokens").await
    }

    pub async fn update_separator_tokens(&self, tokens: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "separator-tokens", tokens).await
    }

    pub async fn reset_separator_tokens(&self) -> Result<TaskInfo> {
        self.reset_setting("separator-tokens").await
    }

    pub async fn get_non_separator_tokens(&self) -> Result<Vec<String>> {
        self.get_setting("non-separator-tokens").await
    }

    pub async fn update_non_separator_tokens(&self, tokens: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "non-separator-tokens", tokens)
            .await
    }

    pub async fn reset_non_separator_tokens(&self) -> Result<TaskInfo> {
        self.reset_setting("non-separator-tokens").await
    }

    pub async fn get_dictionary(&self) -> Result<Vec<String>> {
        self.get_setting("dictionary").await
    }

    pub async fn update_dictionary(&self, words: &[&str]) -> Result<TaskInfo> {
        self.update_setting(Method::PUT, "dictionary", words).await
    }

    pub async fn reset_dictionary(&self) -> Result<TaskInfo> {
        self.reset_setting("dictionary").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::WaitOptions;
    use crate::transport::HttpTransport;
    use meilikit_core::{Config, FacetOrder};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index(server: &MockServer) -> Index {
        let transport = HttpTransport::new(&Config::new(server.uri(), None)).unwrap();
        Index::new(Arc::new(transport), WaitOptions::default(), "movies")
    }

    fn accepted() -> ResponseTemplate {
        ResponseTemplate::new(202).set_body_json(json!({
            "taskUid": 1,
            "indexUid": "movies",
            "status": "enqueued",
            "type": "settingsUpdate",
            "enqueuedAt": "2023-06-09T01:03:48Z"
        }))
    }

    #[tokio::test]
    async fn test_update_settings_patches_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/indexes/movies/settings"))
            .and(body_json(json!({
                "filterableAttributes": ["genre"],
                "distinctAttribute": "movie_id"
            })))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;

        let settings = Settings::new()
            .with_filterable_attributes(["genre"])
            .with_distinct_attribute("movie_id");
        index(&server).update_settings(&settings).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_settings_use_put_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/indexes/movies/settings/ranking-rules"))
            .and(body_json(json!(["words", "typo", "release_date:desc"])))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/indexes/movies/settings/distinct-attribute"))
            .and(body_json(json!("movie_id")))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/movies/settings/dictionary"))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;

        let index = index(&server);
        index
            .update_ranking_rules(&["words", "typo", "release_date:desc"])
            .await
            .unwrap();
        index.update_distinct_attribute("movie_id").await.unwrap();
        index.reset_dictionary().await.unwrap();
    }

    #[tokio::test]
    async fn test_object_settings_use_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/indexes/movies/settings/faceting"))
            .and(body_json(json!({
                "maxValuesPerFacet": 50,
                "sortFacetValuesBy": { "*": "count" }
            })))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/indexes/movies/settings/pagination"))
            .and(body_json(json!({ "maxTotalHits": 5000 })))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/indexes/movies/settings/typo-tolerance"))
            .and(body_json(json!({ "enabled": false })))
            .respond_with(accepted())
            .expect(1)
            .mount(&server)
            .await;

        let index = index(&server);
        index
            .update_faceting(&Faceting::new(50).with_sort("*", FacetOrder::Count))
            .await
            .unwrap();
        index
            .update_pagination(&Pagination { max_total_hits: 5000 })
            .await
            .unwrap();
        index
            .update_typo_tolerance(&TypoTolerance {
                enabled: false,
                ..TypoTolerance::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_collections_read_as_none() {
        let server = MockServer::start().await;
        for setting in ["stop-words", "filterable-attributes"] {
            Mock::given(method("GET"))
                .and(path(format!("/indexes/movies/settings/{setting}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/indexes/movies/settings/synonyms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies/settings/sortable-attributes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let index = index(&server);
        assert!(index.get_stop_words().await.unwrap().is_none());
        assert!(index.get_filterable_attributes().await.unwrap().is_none());
        assert!(index.get_synonyms().await.unwrap().is_none());
        assert!(index.get_sortable_attributes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synonyms_and_null_distinct_attribute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies/settings/synonyms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "wolverine": ["xmen", "logan"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies/settings/distinct-attribute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;

        let index = index(&server);
        let synonyms = index.get_synonyms().await.unwrap().unwrap();
        assert_eq!(synonyms["wolverine"], vec!["xmen", "logan"]);
        assert!(index.get_distinct_attribute().await.unwrap().is_none());
    }
}
