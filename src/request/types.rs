use crate::site::{Params, RequestDefinition};
use reqwest::{Method, header::HeaderMap};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A JSON request body. Serialization happens when the request is built.
pub trait JsonPayload: Debug + Send + Sync {
    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error>;
}

impl<T: Serialize + Debug + Send + Sync> JsonPayload for T {
    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Caller-supplied values for a single adaptor call.
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    /// Looked up in the site's definitions unless `definition` is set.
    pub request_id: String,
    pub definition: Option<RequestDefinition>,
    pub domain: String,
    pub api: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub params: Params,
    pub form_data: Params,
    pub body: Option<Arc<dyn JsonPayload>>,
    /// Values for `{placeholder}` substitution.
    pub env: HashMap<String, String>,
    pub user_agent: String,
    pub cookie: String,
    /// Deadline for the HTTP call; the adaptor default applies when unset.
    pub timeout: Option<Duration>,
}

impl CallOverrides {
    pub fn request(id: impl Into<String>) -> Self {
        Self {
            request_id: id.into(),
            ..Self::default()
        }
    }

    pub fn inline(definition: RequestDefinition) -> Self {
        Self {
            definition: Some(definition),
            ..Self::default()
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.add(key, value);
        self
    }

    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.add(key, value);
        self
    }

    pub fn with_body(mut self, body: impl JsonPayload + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = api.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Form(String),
    Json(Vec<u8>),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Form(_) => "application/x-www-form-urlencoded",
            Self::Json(_) => "application/json",
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Form(encoded) => encoded.into_bytes(),
            Self::Json(bytes) => bytes,
        }
    }
}

/// A fully resolved request, ready to send.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}
