use super::{ExternalRequest, IntentProcessor};
use crate::api::{ApiUrlParser, LatLon, ParsedRequest};
use crate::host::{ExternalPoint, MapHost};

/// Zoom used when a deep link recenters the map for a viewport search.
pub const SEARCH_IN_VIEWPORT_ZOOM: u8 = 16;

/// Dispatches API deep links to exactly one host action.
pub struct UrlProcessor {
    parser: ApiUrlParser,
    search_zoom: u8,
}

impl Default for UrlProcessor {
    fn default() -> Self {
        Self::new(ApiUrlParser::default(), SEARCH_IN_VIEWPORT_ZOOM)
    }
}

impl UrlProcessor {
    pub fn new(parser: ApiUrlParser, search_zoom: u8) -> Self {
        Self {
            parser,
            search_zoom,
        }
    }

    pub fn parser(&self) -> &ApiUrlParser {
        &self.parser
    }

    /// Run one already-parsed request. Returns whether it was consumed.
    pub fn dispatch(&self, parsed: &ParsedRequest, host: &mut dyn MapHost) -> bool {
        match parsed {
            ParsedRequest::Incorrect => false,

            ParsedRequest::Map(request) => {
                tracing::info!(points = request.points.len(), "showing map point from deep link");
                host.show_map_point(request);
                true
            }

            ParsedRequest::Route(data) => {
                host.cancel_interactive_search();
                host.set_router_type(data.router_type);
                let [from, to] = &data.points;
                tracing::info!(
                    router = data.router_type.as_str(),
                    from = %from.lat_lon,
                    to = %to.lat_lon,
                    "preparing route from deep link"
                );
                host.prepare_route(
                    ExternalPoint {
                        name: from.name.clone(),
                        lat_lon: from.lat_lon,
                    },
                    ExternalPoint {
                        name: to.name.clone(),
                        lat_lon: to.lat_lon,
                    },
                    true,
                );
                true
            }

            ParsedRequest::Search { request, .. } => {
                host.cancel_interactive_search();
                if let Some(center) = request.center {
                    self.recenter(center, host);
                    // The search screen does not observe viewport changes once shown,
                    // so list searches need the center pushed explicitly.
                    if !request.is_search_on_map {
                        host.set_search_viewport(center, self.search_zoom);
                    }
                }
                tracing::info!(
                    query = %request.query,
                    on_map = request.is_search_on_map,
                    "starting search from deep link"
                );
                host.start_search_ui(&request.query, &request.locale, request.is_search_on_map);
                true
            }

            ParsedRequest::Crosshair { center, app_name } => {
                host.cancel_interactive_search();
                tracing::info!(caller = %app_name, "entering position picker for API caller");
                host.enter_position_picker_mode(app_name);
                if let Some(center) = center {
                    self.recenter(*center, host);
                }
                true
            }
        }
    }

    fn recenter(&self, center: LatLon, host: &mut dyn MapHost) {
        host.stop_location_follow();
        host.recenter_viewport(center, self.search_zoom);
    }
}

impl IntentProcessor for UrlProcessor {
    fn name(&self) -> &'static str {
        "url"
    }

    fn process(&self, request: &ExternalRequest, host: &mut dyn MapHost) -> bool {
        let Some(uri) = request.data.as_deref() else {
            return false;
        };
        let parsed = self.parser.parse(uri);
        tracing::debug!(kind = ?parsed.kind(), "classified deep link");
        self.dispatch(&parsed, host)
    }
}
