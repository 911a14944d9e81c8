use super::types::{
    LatLon, MapPoint, MapRequest, ParsedRequest, ParsedRoutingData, RoutePoint, RouterType,
    SearchRequest,
};
use url::Url;

pub const DEFAULT_SCHEMES: &[&str] = &["om", "mapsme", "mwm", "mapswithme"];

const MAX_ZOOM: u8 = 20;

/// Decoder for the application's API deep links.
#[derive(Debug, Clone)]
pub struct ApiUrlParser {
    schemes: Vec<String>,
}

impl Default for ApiUrlParser {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMES.iter().copied())
    }
}

/// Parse with the default scheme list.
pub fn parse_api_url(uri: &str) -> ParsedRequest {
    ApiUrlParser::default().parse(uri)
}

impl ApiUrlParser {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            schemes: schemes
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// Whether `uri` uses one of the deep-link schemes, regardless of validity.
    pub fn is_api_url(&self, uri: &str) -> bool {
        match Url::parse(uri.trim()) {
            Ok(url) => self.schemes.iter().any(|s| s == url.scheme()),
            Err(_) => false,
        }
    }

    pub fn parse(&self, uri: &str) -> ParsedRequest {
        let uri = uri.trim();
        if uri.is_empty() {
            return ParsedRequest::Incorrect;
        }
        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(error = %e, "deep link is not a URL");
                return ParsedRequest::Incorrect;
            }
        };
        if !self.schemes.iter().any(|s| s == url.scheme()) {
            tracing::debug!(scheme = url.scheme(), "unsupported deep link scheme");
            return ParsedRequest::Incorrect;
        }

        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        match command(&url).as_str() {
            "map" => parse_map(&params),
            "route" => parse_route(&params),
            "search" => parse_search(&params),
            "crosshair" => parse_crosshair(&params),
            other => {
                tracing::debug!(command = other, "unknown deep link command");
                ParsedRequest::Incorrect
            }
        }
    }
}

/// `om://route?..` puts the command in the host; `om:route?..` in the path.
fn command(url: &Url) -> String {
    let raw = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => url.path().trim_matches('/').to_string(),
    };
    raw.to_lowercase()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_map(params: &[(String, String)]) -> ParsedRequest {
    let mut points: Vec<MapPoint> = Vec::new();
    let mut zoom = None;
    let mut back_url = None;
    let mut app_name = None;
    // Attributes following a malformed `ll` must not attach to the previous point.
    let mut current_valid = false;

    for (key, value) in params {
        match key.as_str() {
            "ll" => match LatLon::parse(value) {
                Some(lat_lon) => {
                    points.push(MapPoint {
                        lat_lon,
                        name: String::new(),
                        id: String::new(),
                        style: String::new(),
                    });
                    current_valid = true;
                }
                None => {
                    tracing::debug!(value = %value, "ignoring malformed map point");
                    current_valid = false;
                }
            },
            "n" | "id" | "s" if current_valid => {
                if let Some(point) = points.last_mut() {
                    let slot = match key.as_str() {
                        "n" => &mut point.name,
                        "id" => &mut point.id,
                        _ => &mut point.style,
                    };
                    *slot = value.clone();
                }
            }
            "z" => {
                zoom = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|z| z.is_finite())
                    .map(|z| z.round().clamp(1.0, f64::from(MAX_ZOOM)) as u8);
            }
            "backurl" => back_url = non_empty(value),
            "appname" => app_name = non_empty(value),
            _ => {}
        }
    }

    if points.is_empty() {
        return ParsedRequest::Incorrect;
    }
    ParsedRequest::Map(MapRequest {
        points,
        zoom,
        back_url,
        app_name,
    })
}

fn parse_route(params: &[(String, String)]) -> ParsedRequest {
    let mut origin: Option<LatLon> = None;
    let mut destination: Option<LatLon> = None;
    let mut origin_name = String::new();
    let mut destination_name = String::new();
    let mut router_type = None;

    for (key, value) in params {
        match key.as_str() {
            "sll" => origin = LatLon::parse(value),
            "saddr" => origin_name = value.clone(),
            "dll" => destination = LatLon::parse(value),
            "daddr" => destination_name = value.clone(),
            "type" => router_type = RouterType::from_param(value.trim()),
            _ => {}
        }
    }

    match (origin, destination, router_type) {
        (Some(from), Some(to), Some(router_type)) => ParsedRequest::Route(ParsedRoutingData {
            router_type,
            points: [
                RoutePoint {
                    lat_lon: from,
                    name: origin_name,
                },
                RoutePoint {
                    lat_lon: to,
                    name: destination_name,
                },
            ],
        }),
        _ => {
            tracing::debug!("route link needs two valid endpoints and a known type");
            ParsedRequest::Incorrect
        }
    }
}

fn parse_search(params: &[(String, String)]) -> ParsedRequest {
    let mut query = String::new();
    let mut locale = String::new();
    let mut center = None;
    let mut on_map = false;
    let mut app_name = None;

    for (key, value) in params {
        match key.as_str() {
            "query" => query = value.trim().to_string(),
            "locale" => locale = value.trim().to_string(),
            "cll" => center = LatLon::parse(value),
            "map" => on_map = true,
            "appname" => app_name = non_empty(value),
            _ => {}
        }
    }

    if query.is_empty() && center.is_none() {
        return ParsedRequest::Incorrect;
    }
    ParsedRequest::Search {
        request: SearchRequest {
            query,
            locale,
            is_search_on_map: on_map,
            center,
        },
        app_name,
    }
}

fn parse_crosshair(params: &[(String, String)]) -> ParsedRequest {
    let mut center = None;
    let mut app_name = String::new();
    for (key, value) in params {
        match key.as_str() {
            "cll" => center = LatLon::parse(value),
            "appname" => app_name = value.trim().to_string(),
            _ => {}
        }
    }
    ParsedRequest::Crosshair { center, app_name }
}
