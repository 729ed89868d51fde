pub mod adaptor;
pub mod config;
pub mod filter;
pub mod parser;
pub mod request;
pub mod site;
pub mod util;

pub use adaptor::{
    DataResult, Extraction, ExtractionResult, ListResult, RawResult, RequestInfo, SiteAdaptor,
    SiteError,
};
pub use config::AdaptorConfig;
pub use filter::{Filter, FilterChain};
pub use parser::{MapParser, ResponseParser, ResponseSpec};
pub use request::CallOverrides;
pub use site::{Params, RequestDefinition, SiteConfig};
