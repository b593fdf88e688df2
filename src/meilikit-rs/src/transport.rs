use crate::{ClientError, Result};
use meilikit_core::{Config, ErrorBody};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

/// Query string pairs, appended verbatim
pub(crate) type Query<'a> = &'a [(&'static str, String)];

/// HttpTransport issues requests against one Meilisearch server.
///
/// Built once per client; authentication, timeout and TLS settings are fixed
/// at construction and shared by every request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let mut base = config.url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("meilikit-rs/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(path) = &config.ca_cert_path {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn builder(&self, method: Method, path: &str, query: Query<'_>) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        debug!(%method, path, "Sending request");

        let mut request = self.client.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        Ok(request)
    }

    /// Send the request and turn non-2xx responses into `ClientError::Api`
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| ErrorBody {
            message: String::from_utf8_lossy(&bytes).into_owned(),
            code: String::new(),
            error_type: String::new(),
            link: String::new(),
        });

        warn!(status = status.as_u16(), code = %body.code, "Request failed: {}", body.message);
        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.builder(method, path, query)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    /// Send a request and return only the status code
    pub(crate) async fn request_status(&self, method: Method, path: &str) -> Result<u16> {
        let request = self.builder(method, path, &[])?;
        let response = self.execute(request).await?;
        Ok(response.status().as_u16())
    }

    /// Send a pre-encoded body with its own content type
    pub(crate) async fn request_raw<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<T> {
        let request = self
            .builder(method, path, query)?
            .header(CONTENT_TYPE, content_type)
            .body(body);
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T> {
        self.request::<(), T>(Method::GET, path, query, None).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, query: Query<'_>, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, query, Some(body)).await
    }

    pub(crate) async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, &[], Some(body)).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T> {
        self.request::<(), T>(Method::DELETE, path, query, None).await
    }
}
