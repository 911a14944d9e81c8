use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an API deep link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Incorrect,
    Map,
    Route,
    Search,
    Crosshair,
}

/// A validated coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// Returns `None` for non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Parse the `lat,lon` form used by deep links.
    pub fn parse(value: &str) -> Option<Self> {
        let (lat, lon) = value.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lon = lon.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// Routing profile requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterType {
    Vehicle,
    Pedestrian,
    Bicycle,
    Transit,
}

impl RouterType {
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "vehicle" => Some(Self::Vehicle),
            "pedestrian" => Some(Self::Pedestrian),
            "bicycle" => Some(Self::Bicycle),
            "transit" => Some(Self::Transit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Pedestrian => "pedestrian",
            Self::Bicycle => "bicycle",
            Self::Transit => "transit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePoint {
    pub lat_lon: LatLon,
    /// Display name, may be empty.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRoutingData {
    pub router_type: RouterType,
    /// Origin then destination, in decode order.
    pub points: [RoutePoint; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub locale: String,
    /// Show results as a map overlay instead of a results list.
    pub is_search_on_map: bool,
    pub center: Option<LatLon>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat_lon: LatLon,
    pub name: String,
    pub id: String,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRequest {
    /// Never empty.
    pub points: Vec<MapPoint>,
    pub zoom: Option<u8>,
    pub back_url: Option<String>,
    pub app_name: Option<String>,
}

/// Result of decoding one deep link. Immutable, so every accessor below can be
/// called any number of times with the same answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedRequest {
    Incorrect,
    Map(MapRequest),
    Route(ParsedRoutingData),
    Search {
        request: SearchRequest,
        app_name: Option<String>,
    },
    Crosshair {
        center: Option<LatLon>,
        app_name: String,
    },
}

impl ParsedRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Incorrect => RequestKind::Incorrect,
            Self::Map(_) => RequestKind::Map,
            Self::Route(_) => RequestKind::Route,
            Self::Search { .. } => RequestKind::Search,
            Self::Crosshair { .. } => RequestKind::Crosshair,
        }
    }

    pub fn routing_data(&self) -> Option<&ParsedRoutingData> {
        match self {
            Self::Route(data) => Some(data),
            _ => None,
        }
    }

    /// Crosshair requests yield an empty query around their center.
    pub fn search_request(&self) -> Option<SearchRequest> {
        match self {
            Self::Search { request, .. } => Some(request.clone()),
            Self::Crosshair { center, .. } => Some(SearchRequest {
                query: String::new(),
                locale: String::new(),
                is_search_on_map: false,
                center: *center,
            }),
            _ => None,
        }
    }

    pub fn center_lat_lon(&self) -> Option<LatLon> {
        match self {
            Self::Search { request, .. } => request.center,
            Self::Crosshair { center, .. } => *center,
            _ => None,
        }
    }

    pub fn app_name(&self) -> Option<&str> {
        match self {
            Self::Map(map) => map.app_name.as_deref(),
            Self::Search { app_name, .. } => app_name.as_deref(),
            Self::Crosshair { app_name, .. } => Some(app_name),
            _ => None,
        }
    }

    pub fn map_request(&self) -> Option<&MapRequest> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}
