use std::sync::{Arc, Mutex};

use waymark_lib::api::{parse_api_url, LatLon, ParsedRequest, RequestKind, RouterType};
use waymark_lib::host::{ExternalPoint, HostCall, RecordingHost};
use waymark_lib::import::{ImportJob, ImportScheduler};
use waymark_lib::intent::{
    is_started_for_api_result, BookmarkFileProcessor, ExternalRequest, ProcessorChain,
    UrlProcessor,
};

#[derive(Default)]
struct Jobs(Mutex<Vec<ImportJob>>);

impl ImportScheduler for Jobs {
    fn schedule(&self, job: ImportJob) {
        self.0.lock().unwrap().push(job);
    }
}

fn chain() -> (ProcessorChain, Arc<Jobs>) {
    let jobs = Arc::new(Jobs::default());
    let chain = ProcessorChain::new()
        .with(BookmarkFileProcessor::new(jobs.clone(), "/tmp/waymark-staging"))
        .with(UrlProcessor::default());
    (chain, jobs)
}

fn dispatch(uri: &str) -> (bool, Vec<HostCall>) {
    let (chain, _) = chain();
    let mut host = RecordingHost::new();
    let consumed = chain.process(&ExternalRequest::view(uri), &mut host);
    (consumed, host.into_calls())
}

fn ll(lat: f64, lon: f64) -> LatLon {
    LatLon::new(lat, lon).unwrap()
}

#[test]
fn unparseable_input_is_silent() {
    for uri in [
        "",
        "   ",
        "not a url",
        "https://example.com/map?ll=1,2",
        "om://teleport?ll=1,2",
        "om://map",
        "om://map?ll=91,0",
        "om://search",
    ] {
        let (consumed, calls) = dispatch(uri);
        assert!(!consumed, "{uri:?} should not be consumed");
        assert!(calls.is_empty(), "{uri:?} produced {calls:?}");
    }
}

#[test]
fn route_prepares_exactly_once_after_cancel() {
    let (consumed, calls) =
        dispatch("mapsme://route?sll=55.75,37.62&saddr=Home&dll=55.70,37.50&daddr=Work&type=vehicle");
    assert!(consumed);
    assert_eq!(calls[0], HostCall::CancelInteractiveSearch);
    let prepares: Vec<_> = calls
        .iter()
        .filter(|c| matches!(c, HostCall::PrepareRoute { .. }))
        .collect();
    assert_eq!(prepares.len(), 1);
    assert_eq!(
        prepares[0],
        &HostCall::PrepareRoute {
            from: ExternalPoint {
                name: "Home".into(),
                lat_lon: ll(55.75, 37.62)
            },
            to: ExternalPoint {
                name: "Work".into(),
                lat_lon: ll(55.70, 37.50)
            },
            from_api: true,
        }
    );
}

#[test]
fn list_search_with_center_orders_viewport_calls() {
    let (consumed, calls) = dispatch("om://search?query=coffee&cll=55.75,37.62&locale=ru");
    assert!(consumed);
    let center = ll(55.75, 37.62);
    assert_eq!(
        calls,
        vec![
            HostCall::CancelInteractiveSearch,
            HostCall::StopLocationFollow,
            HostCall::RecenterViewport {
                lat_lon: center,
                zoom: 16
            },
            HostCall::SetSearchViewport {
                lat_lon: center,
                zoom: 16
            },
            HostCall::StartSearchUi {
                query: "coffee".into(),
                locale: "ru".into(),
                on_map: false
            },
        ]
    );
}

#[test]
fn map_search_skips_search_viewport() {
    let (consumed, calls) = dispatch("om://search?query=coffee&cll=55.75,37.62&map");
    assert!(consumed);
    assert!(!calls
        .iter()
        .any(|c| matches!(c, HostCall::SetSearchViewport { .. })));
    assert!(calls.contains(&HostCall::StartSearchUi {
        query: "coffee".into(),
        locale: String::new(),
        on_map: true
    }));
}

#[test]
fn crosshair_never_pushes_search_viewport() {
    for uri in [
        "om://crosshair?cll=10,20&appname=Taxi",
        "om://crosshair?appname=Taxi",
        "om://crosshair",
    ] {
        let (consumed, calls) = dispatch(uri);
        assert!(consumed, "{uri} should be consumed");
        assert_eq!(calls[0], HostCall::CancelInteractiveSearch);
        assert!(calls
            .iter()
            .any(|c| matches!(c, HostCall::EnterPositionPickerMode { .. })));
        assert!(!calls
            .iter()
            .any(|c| matches!(c, HostCall::SetSearchViewport { .. })));
    }
}

#[test]
fn route_round_trip_keeps_type_order_and_values() {
    let parsed = parse_api_url("om://route?sll=1,2&saddr=A&dll=3,4&daddr=B&type=pedestrian");
    assert_eq!(parsed.kind(), RequestKind::Route);
    let data = parsed.routing_data().expect("route data");
    assert_eq!(data.router_type, RouterType::Pedestrian);
    assert_eq!(data.points[0].lat_lon, ll(1.0, 2.0));
    assert_eq!(data.points[0].name, "A");
    assert_eq!(data.points[1].lat_lon, ll(3.0, 4.0));
    assert_eq!(data.points[1].name, "B");
    // Accessors are idempotent.
    assert_eq!(parsed.routing_data(), Some(data));
}

#[test]
fn shared_file_is_scheduled_and_never_consumed() {
    let (chain, jobs) = chain();
    let mut host = RecordingHost::new();

    assert!(!chain.process(&ExternalRequest::view("file:///sdcard/walk.kmz"), &mut host));
    assert!(!chain.process(&ExternalRequest::send("content://downloads/7"), &mut host));
    assert!(host.calls().is_empty());

    let jobs = jobs.0.lock().unwrap();
    let resources: Vec<_> = jobs.iter().map(|j| j.resource.as_str()).collect();
    assert_eq!(resources, ["file:///sdcard/walk.kmz", "content://downloads/7"]);
}

#[test]
fn map_only_shows_point() {
    let (consumed, calls) = dispatch("om://map?ll=55.75,37.62&n=Red%20Square&z=15&appname=Guide");
    assert!(consumed);
    assert_eq!(calls.len(), 1);
    let HostCall::ShowMapPoint { request } = &calls[0] else {
        panic!("expected ShowMapPoint, got {calls:?}");
    };
    assert_eq!(request.points[0].name, "Red Square");
    assert_eq!(request.zoom, Some(15));
    assert_eq!(request.app_name.as_deref(), Some("Guide"));
}

#[test]
fn deep_link_through_chain_leaves_scheduler_alone() {
    let (chain, jobs) = chain();
    let mut host = RecordingHost::new();
    assert!(chain.process(&ExternalRequest::view("om://map?ll=1,2"), &mut host));
    assert!(jobs.0.lock().unwrap().is_empty());
}

#[test]
fn api_result_flag_is_reported() {
    let request = ExternalRequest::view("om://crosshair").with_forward_result(true);
    assert!(is_started_for_api_result(&request));
    assert!(!is_started_for_api_result(&ExternalRequest::view("om://crosshair")));
}

#[test]
fn parsed_request_serializes_for_inspection() {
    let parsed = parse_api_url("om://search?query=park");
    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(json["kind"], "search");
    assert_eq!(json["request"]["query"], "park");
    assert_eq!(parse_api_url("om://nope"), ParsedRequest::Incorrect);
}
