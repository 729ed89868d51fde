use crate::request::{
    errors::RequestError,
    types::{CallOverrides, PreparedRequest, RequestBody},
};
use crate::site::RequestDefinition;
use crate::util::is_full_url;
use reqwest::{
    Method,
    header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
use std::collections::HashMap;
use tracing::debug;

/// Replaces every `{key}` with its value from `env`. Unknown placeholders stay.
pub fn substitute(text: &str, env: &HashMap<String, String>) -> String {
    if !text.contains('{') {
        return text.to_string();
    }
    env.iter().fold(text.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

/// Builds requests for one site target. Holds only borrowed, read-only data;
/// everything derived from it lives in the returned [`PreparedRequest`].
#[derive(Debug, Clone, Copy)]
pub struct RequestTemplate<'a> {
    pub domain: &'a str,
    pub api: &'a str,
    pub definition: &'a RequestDefinition,
    pub overrides: &'a CallOverrides,
    pub default_user_agent: &'a str,
}

impl RequestTemplate<'_> {
    pub fn build(&self) -> Result<PreparedRequest, RequestError> {
        let definition = self.definition;
        let overrides = self.overrides;
        let env = &overrides.env;

        let mut params = definition.params.map_values(|v| substitute(v, env));
        params.append(&overrides.params);
        let mut form_data = definition.form_data.map_values(|v| substitute(v, env));
        form_data.append(&overrides.form_data);

        let mut url = self.base_url();
        if !params.is_empty() {
            url = format!("{url}?{}", params.encode());
        }

        let body = if !form_data.is_empty() {
            Some(RequestBody::Form(form_data.encode()))
        } else if let Some(payload) = &overrides.body {
            let json = payload
                .to_json()
                .map_err(|source| RequestError::BodySerialization {
                    url: url.clone(),
                    payload: format!("{payload:?}"),
                    source,
                })?;
            Some(RequestBody::Json(json))
        } else {
            None
        };

        let url = substitute(&url, env);
        let method = parse_method(&definition.method)?;
        let headers = self.resolve_headers(body.as_ref())?;

        for required in &definition.required_headers {
            let present = headers
                .get(required.as_str())
                .is_some_and(|value| !value.is_empty());
            if !present {
                return Err(RequestError::MissingHeader(required.clone()));
            }
        }

        debug!(%method, %url, "built request");
        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn base_url(&self) -> String {
        let path = &self.definition.path;
        if is_full_url(path) {
            return path.clone();
        }
        let base = if self.definition.use_api {
            self.api
        } else {
            self.domain
        };
        format!("{base}{path}")
    }

    /// Defaults, then definition headers, then caller headers; later wins.
    fn resolve_headers(&self, body: Option<&RequestBody>) -> Result<HeaderMap, RequestError> {
        let overrides = self.overrides;
        let mut headers = HeaderMap::new();

        let user_agent = if overrides.user_agent.is_empty() {
            self.default_user_agent
        } else {
            overrides.user_agent.as_str()
        };
        headers.insert(USER_AGENT, header_value("User-Agent", user_agent)?);
        if !overrides.cookie.is_empty() {
            headers.insert(COOKIE, header_value("Cookie", &overrides.cookie)?);
        }

        for (name, value) in &self.definition.headers {
            let value = substitute(value, &overrides.env);
            headers.insert(header_name(name)?, header_value(name, &value)?);
        }
        for (name, value) in &overrides.headers {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }

        if let Some(body) = body
            && !headers.contains_key(CONTENT_TYPE)
        {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type()));
        }
        Ok(headers)
    }
}

fn parse_method(method: &str) -> Result<Method, RequestError> {
    let method = method.trim();
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RequestError::InvalidMethod(method.to_string()))
}

fn header_name(name: &str) -> Result<HeaderName, RequestError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| RequestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, RequestError> {
    HeaderValue::from_str(value).map_err(|e| RequestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
