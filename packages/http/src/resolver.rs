//! Resolving resource keys over HTTP.

use futures::future::FutureExt;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use reqwest::{Client, Request};
use url::Url;

use statetree::{Method, ResolveError, ResolveFuture, ResolveOptions, Resolver};
use statetree_core::{json_to_value, value_to_json, Value};

use crate::error::HttpError;

/// A [`Resolver`] that fetches resource keys relative to a base URL.
///
/// Requests are `GET` unless the [`ResolveOptions`] say otherwise; a
/// request body is sent as JSON. A `204 No Content` resolves to no value,
/// any other 2xx body is parsed as JSON, and everything else fails with
/// [`HttpError::Status`].
///
/// ```rust,no_run
/// use statetree::Store;
/// use statetree_http::HttpResolver;
///
/// let store = Store::new();
/// let resolver = HttpResolver::new("https://api.example.com")?
///     .with_header("accept", "application/json")?;
/// store.set_resolver(resolver);
/// # Ok::<(), statetree_http::HttpError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: Client,
    base_url: Url,
    default_headers: HeaderMap,
}

impl HttpResolver {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
            default_headers: HeaderMap::new(),
        })
    }

    /// Use a preconfigured client (timeouts, proxies, TLS).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Add a default header sent with every request
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, HttpError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The URL a resource key resolves to.
    pub fn url_for(&self, key: &str) -> Result<Url, HttpError> {
        if key.starts_with("http://") || key.starts_with("https://") {
            Ok(Url::parse(key)?)
        } else {
            Ok(self.base_url.join(key)?)
        }
    }

    fn build(&self, key: &str, options: &ResolveOptions) -> Result<Request, HttpError> {
        let url = self.url_for(key)?;
        let mut builder = self
            .client
            .request(http_method(options.method), url)
            .headers(self.default_headers.clone());

        if let Some(body) = &options.body {
            builder = builder.json(&value_to_json(body.clone()));
        }
        Ok(builder.build()?)
    }

    /// Send one request and decode its response.
    pub async fn request(
        &self,
        key: &str,
        options: &ResolveOptions,
    ) -> Result<Option<Value>, HttpError> {
        let request = self.build(key, options)?;
        send(self.client.clone(), request).await
    }
}

impl Resolver for HttpResolver {
    fn resolve(&self, key: &str, options: &ResolveOptions) -> ResolveFuture {
        let client = self.client.clone();
        let request = self.build(key, options);
        async move {
            let request = request.map_err(ResolveError::new)?;
            send(client, request).await.map_err(ResolveError::new)
        }
        .boxed_local()
    }
}

async fn send(client: Client, request: Request) -> Result<Option<Value>, HttpError> {
    log::debug!("{} {}", request.method(), request.url());
    let response = client.execute(request).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let body = response.bytes().await?;
    if body.is_empty() {
        return Ok(None);
    }
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    Ok(Some(json_to_value(json)))
}

fn http_method(method: Method) -> http::Method {
    match method {
        Method::Get => http::Method::GET,
        Method::Post => http::Method::POST,
        Method::Put => http::Method::PUT,
        Method::Patch => http::Method::PATCH,
        Method::Delete => http::Method::DELETE,
    }
}
