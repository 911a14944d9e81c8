//! Deep-link decoding: one immutable [`ParsedRequest`] per URI.

mod parser;
mod types;

pub use parser::{parse_api_url, ApiUrlParser, DEFAULT_SCHEMES};
pub use types::{
    LatLon, MapPoint, MapRequest, ParsedRequest, ParsedRoutingData, RequestKind, RoutePoint,
    RouterType, SearchRequest,
};
