// Core library for the CatPaw framework
// Dependency container, route resolution, handler invocation, responses,
// sessions and static file serving.

pub mod application;
pub mod attributes;
pub mod body_parser;
pub mod byte_range;
pub mod container;
pub mod content_negotiation;
pub mod cookie;
pub mod dependencies;
pub mod error;
pub mod file_server;
pub mod filter;
pub mod http;
pub mod invoker;
pub mod logging;
pub mod mime;
pub mod order;
pub mod page;
pub mod path_resolver;
pub mod query;
pub mod request_context;
pub mod request_handler;
pub mod response;
pub mod route;
pub mod route_resolver;
pub mod router;
pub mod session;
pub mod sse;
pub mod symbolics;
pub mod xml;

// Re-export commonly used types
pub use application::*;
// `attributes::Body` stays behind its module path; `Body` is the request body
pub use attributes::{
    Consumes, Header, OnRequest, OnResponse, Param, ParameterAttribute, Produces, Query,
    ResponseShape, SessionAttr,
};
pub use body_parser::{Body, BodyParser, FormData, FormFile};
pub use byte_range::{ByteRange, ByteRangeService, ByteRangeWriter, FileRangeWriter};
pub use container::*;
pub use content_negotiation::*;
pub use cookie::*;
pub use dependencies::*;
pub use error::*;
pub use file_server::*;
pub use filter::*;
pub use self::http::*;
pub use invoker::*;
pub use order::*;
pub use page::*;
pub use path_resolver::{MatchingPathConfiguration, PathMatch, PathResolver, PathResolverCache};
pub use query::parse_query_string;
pub use request_context::*;
pub use request_handler::*;
pub use response::*;
pub use route::*;
pub use route_resolver::*;
pub use router::*;
pub use session::*;
pub use sse::{EventBroadcaster, EventSender, EventStream, ServerSentEvent, TEXT_EVENT_STREAM};
pub use symbolics::*;
pub use xml::to_xml;
