use crate::parser::{FieldMap, ParsedFields};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Where a result came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub domain: String,
    pub request_url: String,
    pub status_code: u16,
}

/// Exactly one shape per response, picked list, then raw, then data.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    List(Vec<FieldMap>),
    Raw(Bytes),
    Data(FieldMap),
}

impl Extraction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Raw(_) => "raw",
            Self::Data(_) => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub extraction: Extraction,
    pub next_page: Option<String>,
    pub info: RequestInfo,
}

impl ExtractionResult {
    pub fn new(parsed: ParsedFields, info: RequestInfo) -> Self {
        let extraction = if let Some(list) = parsed.list {
            Extraction::List(list)
        } else if let Some(raw) = parsed.raw {
            Extraction::Raw(raw)
        } else {
            Extraction::Data(parsed.data)
        };
        Self {
            extraction,
            next_page: parsed.next_page,
            info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub next_page: Option<String>,
    pub info: RequestInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataResult<T> {
    pub data: T,
    pub info: RequestInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub data: Bytes,
    pub info: RequestInfo,
}
