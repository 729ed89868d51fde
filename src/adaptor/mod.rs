//! The site adaptor: resolves a request definition, runs it, and hands the
//! body to the parser.

pub mod decode;
pub mod errors;
pub mod types;

pub use decode::weak_decode;
pub use errors::{AdaptError, SiteError};
pub use types::{DataResult, Extraction, ExtractionResult, ListResult, RawResult, RequestInfo};

use crate::config::AdaptorConfig;
use crate::parser::{FieldParser, ParseError, ResponseParser};
use crate::request::{self, CallOverrides, RequestError, RequestTemplate};
use crate::site::{RequestDefinition, SiteConfig};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Response body of a successful call, plus what produced it.
struct Fetched<'a> {
    definition: Cow<'a, RequestDefinition>,
    body: Bytes,
    info: RequestInfo,
}

/// Runs declarative requests against one site.
///
/// Cheap to clone and safe to share: the site config is never mutated, and
/// every call keeps its merged parameters and headers to itself.
#[derive(Clone)]
pub struct SiteAdaptor {
    site: Arc<SiteConfig>,
    config: AdaptorConfig,
    parser: Arc<dyn ResponseParser>,
}

impl SiteAdaptor {
    pub fn new(site: impl Into<Arc<SiteConfig>>, config: AdaptorConfig) -> Self {
        Self {
            site: site.into(),
            config,
            parser: Arc::new(FieldParser),
        }
    }

    /// Replaces the default [`FieldParser`].
    pub fn with_parser(mut self, parser: impl ResponseParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Fetches a list result and decodes every entry into `T`.
    pub async fn fetch_list<T: DeserializeOwned>(
        &self,
        overrides: &CallOverrides,
    ) -> Result<ListResult<T>, SiteError> {
        let result = self.extract(overrides).await?;
        let list = match result.extraction {
            Extraction::List(list) => list,
            other => {
                return Err(self.error(AdaptError::UnexpectedShape {
                    expected: "list",
                    actual: other.kind(),
                }));
            }
        };
        let entries = Value::Array(list.into_iter().map(Value::Object).collect());
        let items = weak_decode(entries).map_err(|e| self.error(e.into()))?;
        Ok(ListResult {
            items,
            next_page: result.next_page,
            info: result.info,
        })
    }

    /// Fetches a single object result and decodes it into `T`.
    pub async fn fetch_data<T: DeserializeOwned>(
        &self,
        overrides: &CallOverrides,
    ) -> Result<DataResult<T>, SiteError> {
        let result = self.extract(overrides).await?;
        let data = match result.extraction {
            Extraction::Data(data) => data,
            other => {
                return Err(self.error(AdaptError::UnexpectedShape {
                    expected: "data",
                    actual: other.kind(),
                }));
            }
        };
        let data = weak_decode(Value::Object(data)).map_err(|e| self.error(e.into()))?;
        Ok(DataResult {
            data,
            info: result.info,
        })
    }

    /// Fetches a raw payload without decoding.
    pub async fn fetch_raw(&self, overrides: &CallOverrides) -> Result<RawResult, SiteError> {
        let result = self.extract(overrides).await?;
        match result.extraction {
            Extraction::Raw(data) => Ok(RawResult {
                data,
                info: result.info,
            }),
            other => Err(self.error(AdaptError::UnexpectedShape {
                expected: "raw",
                actual: other.kind(),
            })),
        }
    }

    /// Decodes the response body as JSON straight into `T`, skipping the
    /// parser and its filters.
    #[instrument(skip_all, fields(site = %self.site.name, request = %overrides.request_id))]
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        overrides: &CallOverrides,
    ) -> Result<T, SiteError> {
        let fetched = self.fetch(overrides).await.map_err(|e| self.error(e))?;
        let value: Value = serde_json::from_slice(&fetched.body)
            .map_err(|e| self.error(ParseError::Json(e).into()))?;
        weak_decode(value).map_err(|e| self.error(e.into()))
    }

    /// Runs the request and the parser, returning the untyped result.
    #[instrument(skip_all, fields(site = %self.site.name, request = %overrides.request_id))]
    pub async fn extract(&self, overrides: &CallOverrides) -> Result<ExtractionResult, SiteError> {
        let fetched = self.fetch(overrides).await.map_err(|e| self.error(e))?;
        let parsed = self
            .parser
            .parse(&fetched.body, &self.site, &fetched.definition)
            .map_err(|e| self.error(e.into()))?;
        let result = ExtractionResult::new(parsed, fetched.info);
        debug!(kind = result.extraction.kind(), "extracted response");
        Ok(result)
    }

    fn error(&self, source: AdaptError) -> SiteError {
        SiteError::new(self.site.name.clone(), source)
    }

    fn resolve_definition<'a>(
        &'a self,
        overrides: &'a CallOverrides,
    ) -> Result<Cow<'a, RequestDefinition>, AdaptError> {
        let definition = match &overrides.definition {
            Some(inline) => inline,
            None => self
                .site
                .request(&overrides.request_id)
                .ok_or_else(|| AdaptError::UnknownRequest(overrides.request_id.clone()))?,
        };
        if overrides.path.is_empty() {
            Ok(Cow::Borrowed(definition))
        } else {
            Ok(Cow::Owned(RequestDefinition {
                path: overrides.path.clone(),
                ..definition.clone()
            }))
        }
    }

    async fn fetch<'a>(&'a self, overrides: &'a CallOverrides) -> Result<Fetched<'a>, AdaptError> {
        let definition = self.resolve_definition(overrides)?;
        let domain = non_empty(&overrides.domain).unwrap_or(&self.site.domain);
        let api = non_empty(&overrides.api).unwrap_or(&self.site.api);

        let request = RequestTemplate {
            domain,
            api,
            definition: &definition,
            overrides,
            default_user_agent: self.config.default_user_agent(),
        }
        .build()?;
        let url = request.url.clone();
        let timeout = overrides.timeout.unwrap_or(self.config.timeout());

        let response = request::send(request, timeout).await?;
        let status = response.status().as_u16();
        if !definition.is_success(status) {
            return Err(AdaptError::Status { url, status });
        }

        let body = response.bytes().await.map_err(|source| {
            if source.is_timeout() {
                AdaptError::Request(RequestError::from_reqwest_error(source))
            } else {
                AdaptError::Io {
                    url: url.clone(),
                    source,
                }
            }
        })?;
        info!(%url, status, bytes = body.len(), "request completed");

        Ok(Fetched {
            definition,
            body,
            info: RequestInfo {
                domain: domain.to_string(),
                request_url: url,
                status_code: status,
            },
        })
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}
