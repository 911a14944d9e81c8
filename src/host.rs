use crate::api::{LatLon, MapRequest, RouterType};
use serde::Serialize;

/// A point handed to the router on behalf of an external caller. It has no
/// persistent identity and no category, only a name and coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalPoint {
    pub name: String,
    pub lat_lon: LatLon,
}

/// The application's action surface, as seen by the dispatcher.
///
/// Implemented by the host application's routing, search and map controllers.
/// All calls happen on the caller's thread and must not block.
pub trait MapHost {
    /// Switch the view to the point(s) decoded from a map link.
    fn show_map_point(&mut self, request: &MapRequest);
    fn set_router_type(&mut self, router_type: RouterType);
    fn prepare_route(&mut self, from: ExternalPoint, to: ExternalPoint, from_api: bool);
    fn start_search_ui(&mut self, query: &str, locale: &str, on_map: bool);
    fn enter_position_picker_mode(&mut self, caller_name: &str);
    fn recenter_viewport(&mut self, lat_lon: LatLon, zoom: u8);
    /// Push a viewport center straight to the search engine.
    fn set_search_viewport(&mut self, lat_lon: LatLon, zoom: u8);
    fn stop_location_follow(&mut self);
    fn cancel_interactive_search(&mut self);
}

/// One recorded [`MapHost`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    ShowMapPoint {
        request: MapRequest,
    },
    SetRouterType {
        router_type: RouterType,
    },
    PrepareRoute {
        from: ExternalPoint,
        to: ExternalPoint,
        from_api: bool,
    },
    StartSearchUi {
        query: String,
        locale: String,
        on_map: bool,
    },
    EnterPositionPickerMode {
        caller_name: String,
    },
    RecenterViewport {
        lat_lon: LatLon,
        zoom: u8,
    },
    SetSearchViewport {
        lat_lon: LatLon,
        zoom: u8,
    },
    StopLocationFollow,
    CancelInteractiveSearch,
}

/// Host that only records what it was asked to do. Used by the CLI and tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Vec<HostCall>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<HostCall> {
        self.calls
    }
}

impl MapHost for RecordingHost {
    fn show_map_point(&mut self, request: &MapRequest) {
        self.calls.push(HostCall::ShowMapPoint {
            request: request.clone(),
        });
    }

    fn set_router_type(&mut self, router_type: RouterType) {
        self.calls.push(HostCall::SetRouterType { router_type });
    }

    fn prepare_route(&mut self, from: ExternalPoint, to: ExternalPoint, from_api: bool) {
        self.calls.push(HostCall::PrepareRoute { from, to, from_api });
    }

    fn start_search_ui(&mut self, query: &str, locale: &str, on_map: bool) {
        self.calls.push(HostCall::StartSearchUi {
            query: query.into(),
            locale: locale.into(),
            on_map,
        });
    }

    fn enter_position_picker_mode(&mut self, caller_name: &str) {
        self.calls.push(HostCall::EnterPositionPickerMode {
            caller_name: caller_name.into(),
        });
    }

    fn recenter_viewport(&mut self, lat_lon: LatLon, zoom: u8) {
        self.calls.push(HostCall::RecenterViewport { lat_lon, zoom });
    }

    fn set_search_viewport(&mut self, lat_lon: LatLon, zoom: u8) {
        self.calls.push(HostCall::SetSearchViewport { lat_lon, zoom });
    }

    fn stop_location_follow(&mut self) {
        self.calls.push(HostCall::StopLocationFollow);
    }

    fn cancel_interactive_search(&mut self) {
        self.calls.push(HostCall::CancelInteractiveSearch);
    }
}
