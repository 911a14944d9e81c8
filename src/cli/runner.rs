use super::output::{
    print_error, print_heading, print_info, print_json, print_kv, print_success, print_warning,
};
use super::progress::ImportSpinner;
use super::Commands;
use crate::api::{ApiUrlParser, LatLon, ParsedRequest, RequestKind};
use crate::bookmarks::BookmarkStore;
use crate::config;
use crate::context::AppContext;
use crate::host::{ExternalPoint, HostCall, RecordingHost};
use crate::import::{display_name, ChannelReporter, ImportJob, ImportOutcome, ImportProgress, ImportScheduler};
use crate::intent::ExternalRequest;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How long the CLI waits for a background import before giving up.
const IMPORT_WAIT: Duration = Duration::from_secs(120);

/// Run a CLI command and return the exit code
pub fn run_command(cmd: Commands) -> i32 {
    match cmd {
        Commands::Parse { uri, json } => cmd_parse(&uri, json),
        Commands::Dispatch { uri, send, json } => cmd_dispatch(&uri, send, json),
        Commands::Import { file, quiet } => cmd_import(&file, quiet),
        Commands::Bookmarks { json } => cmd_bookmarks(json),
        Commands::Config { path } => cmd_config(path),
    }
}

fn cmd_parse(uri: &str, json: bool) -> i32 {
    let cfg = config::get_config();
    let parser = ApiUrlParser::new(&cfg.api.schemes);
    let parsed = parser.parse(uri);

    if json {
        if let Err(e) = print_json(&parsed) {
            print_error(&format!("JSON serialization failed: {e}"));
            return 1;
        }
    } else {
        print_parsed(&parsed);
        if parsed.kind() == RequestKind::Incorrect {
            print_info(rejection_hint(&parser, uri));
        }
    }

    if parsed.kind() == RequestKind::Incorrect {
        1
    } else {
        0
    }
}

fn print_parsed(parsed: &ParsedRequest) {
    print_heading("Deep link");
    print_kv("kind", &format!("{:?}", parsed.kind()).to_lowercase());
    match parsed {
        ParsedRequest::Incorrect => print_warning("Not a recognized deep link"),
        ParsedRequest::Map(map) => {
            for point in &map.points {
                let mut line = format_point(&point.name, point.lat_lon);
                if !point.id.is_empty() {
                    line.push_str(&format!(" id={}", point.id));
                }
                if !point.style.is_empty() {
                    line.push_str(&format!(" style={}", point.style));
                }
                print_kv("point", &line);
            }
            if let Some(zoom) = map.zoom {
                print_kv("zoom", &zoom.to_string());
            }
            if let Some(back_url) = &map.back_url {
                print_kv("back url", back_url);
            }
        }
        ParsedRequest::Route(route) => {
            let [from, to] = &route.points;
            print_kv("router", route.router_type.as_str());
            print_kv("from", &format_point(&from.name, from.lat_lon));
            print_kv("to", &format_point(&to.name, to.lat_lon));
        }
        ParsedRequest::Search { request, .. } => {
            print_kv("query", &request.query);
            if !request.locale.is_empty() {
                print_kv("locale", &request.locale);
            }
            print_kv("on map", &request.is_search_on_map.to_string());
        }
        ParsedRequest::Crosshair { .. } => {}
    }
    if let Some(center) = parsed.center_lat_lon() {
        print_kv("center", &center.to_string());
    }
    if let Some(app_name) = parsed.app_name() {
        print_kv("caller", app_name);
    }
}

/// Tell an unknown scheme apart from a malformed link on a known one.
fn rejection_hint(parser: &ApiUrlParser, uri: &str) -> &'static str {
    if parser.is_api_url(uri) {
        "The scheme is known but the link is malformed or incomplete"
    } else {
        "Expected one of the configured deep-link schemes"
    }
}

fn format_point(name: &str, lat_lon: LatLon) -> String {
    if name.is_empty() {
        format!("({lat_lon})")
    } else {
        format!("{name} ({lat_lon})")
    }
}

fn format_external(point: &ExternalPoint) -> String {
    format_point(&point.name, point.lat_lon)
}

/// One-line, human readable form of a recorded host call.
fn describe_call(call: &HostCall) -> String {
    match call {
        HostCall::ShowMapPoint { request } => {
            let points: Vec<String> = request
                .points
                .iter()
                .map(|p| format_point(&p.name, p.lat_lon))
                .collect();
            format!("show map point: {}", points.join(", "))
        }
        HostCall::SetRouterType { router_type } => {
            format!("set router type: {}", router_type.as_str())
        }
        HostCall::PrepareRoute { from, to, .. } => format!(
            "prepare route: {} -> {}",
            format_external(from),
            format_external(to)
        ),
        HostCall::StartSearchUi {
            query,
            locale,
            on_map,
        } => {
            let mode = if *on_map { "on map" } else { "list" };
            if locale.is_empty() {
                format!("start search: \"{query}\" ({mode})")
            } else {
                format!("start search: \"{query}\" ({mode}, locale {locale})")
            }
        }
        HostCall::EnterPositionPickerMode { caller_name } => {
            format!("enter position picker for \"{caller_name}\"")
        }
        HostCall::RecenterViewport { lat_lon, zoom } => {
            format!("recenter viewport: {lat_lon} at zoom {zoom}")
        }
        HostCall::SetSearchViewport { lat_lon, zoom } => {
            format!("set search viewport: {lat_lon} at zoom {zoom}")
        }
        HostCall::StopLocationFollow => "stop location follow".into(),
        HostCall::CancelInteractiveSearch => "cancel interactive search".into(),
    }
}

#[derive(Serialize)]
struct DispatchOutput {
    consumed: bool,
    calls: Vec<HostCall>,
    imports: Option<ImportProgress>,
}

fn cmd_dispatch(uri: &str, send: bool, json: bool) -> i32 {
    let ctx = match AppContext::from_config(config::get_config()) {
        Ok(ctx) => ctx,
        Err(e) => {
            print_error(&e);
            return 1;
        }
    };

    let request = if send {
        ExternalRequest::send(uri)
    } else {
        ExternalRequest::view(uri)
    };
    let before = ctx.queue().progress();
    let mut host = RecordingHost::new();
    let consumed = ctx.handle(&request, &mut host);
    let imports = wait_for_imports(&ctx, &before, json);
    let imported = imports.as_ref().is_some_and(|p| p.imported > 0);

    let output = DispatchOutput {
        consumed,
        calls: host.into_calls(),
        imports,
    };

    if json {
        if let Err(e) = print_json(&output) {
            print_error(&format!("JSON serialization failed: {e}"));
            return 1;
        }
    } else {
        print_heading("Dispatch");
        print_kv("consumed", &output.consumed.to_string());
        if output.calls.is_empty() {
            print_info("No map actions");
        }
        for call in &output.calls {
            print_info(&describe_call(call));
        }
        if let Some(report) = output.imports.as_ref().and_then(|p| p.last_result.as_ref()) {
            match &report.outcome {
                ImportOutcome::Imported { collection_id, .. } => {
                    print_success(&format!("Imported {} as \"{collection_id}\"", report.resource))
                }
                ImportOutcome::Failed { error } => {
                    print_error(&format!("Import of {} failed: {error}", report.resource))
                }
            }
        }
    }

    if output.consumed || imported {
        0
    } else {
        1
    }
}

/// Block on imports scheduled since `before` was taken. `None` when nothing was scheduled.
fn wait_for_imports(
    ctx: &AppContext,
    before: &ImportProgress,
    quiet: bool,
) -> Option<ImportProgress> {
    if !scheduled_since(before, &ctx.queue().progress()) {
        return None;
    }
    let spinner = ImportSpinner::new("Importing shared file...", quiet);
    let idle = ctx.queue().wait_idle(IMPORT_WAIT);
    let progress = ctx.queue().progress();
    if !idle {
        spinner.finish_error("Import still running, giving up");
    } else if progress.failed > 0 {
        spinner.finish_error("Import failed");
    } else {
        spinner.finish_success("Import finished");
    }
    Some(progress)
}

/// True when a job is still running or one finished after `before`.
fn scheduled_since(before: &ImportProgress, now: &ImportProgress) -> bool {
    now.pending > 0 || now.imported + now.failed > before.imported + before.failed
}

fn cmd_import(file: &str, quiet: bool) -> i32 {
    let cfg = config::get_config();
    let (reporter, mut reports) = ChannelReporter::new();
    let ctx = match AppContext::with_reporter(cfg, Arc::new(reporter)) {
        Ok(ctx) => ctx,
        Err(e) => {
            print_error(&e);
            return 1;
        }
    };

    ctx.queue().schedule(ImportJob {
        resource: file.to_string(),
        staging_dir: ctx.staging_dir().to_path_buf(),
    });
    let spinner = ImportSpinner::new(&format!("Importing {}", display_name(file)), quiet);

    if !ctx.queue().wait_idle(IMPORT_WAIT) {
        spinner.finish_error("Timed out waiting for import");
        return 1;
    }

    let (ok, msg) = match reports.try_recv() {
        Ok(report) => match report.outcome {
            ImportOutcome::Imported {
                collection_id,
                bookmarks,
                tracks,
            } => (
                true,
                format!("Imported {bookmarks} bookmarks and {tracks} tracks as \"{collection_id}\""),
            ),
            ImportOutcome::Failed { error } => (false, format!("Import failed: {error}")),
        },
        Err(_) => (false, "Import finished without a report".to_string()),
    };

    match (ok, quiet) {
        (true, false) => spinner.finish_success(&msg),
        (false, false) => spinner.finish_error(&msg),
        (false, true) => print_error(&msg),
        (true, true) => spinner.finish_clear(),
    }
    if ok {
        0
    } else {
        1
    }
}

fn cmd_bookmarks(json: bool) -> i32 {
    let store = BookmarkStore::new(config::get_config().bookmarks.path());
    let collections = match store.list() {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("Failed to read bookmark store: {e}"));
            return 1;
        }
    };

    if json {
        if let Err(e) = print_json(&collections) {
            print_error(&format!("JSON serialization failed: {e}"));
            return 1;
        }
        return 0;
    }

    if collections.is_empty() {
        print_info(&format!("No collections in {}", store.dir().display()));
        return 0;
    }
    print_heading("Bookmark collections");
    for c in &collections {
        print_kv(
            &c.id,
            &format!("{} ({} bookmarks, {} tracks)", c.name, c.bookmarks, c.tracks),
        );
    }
    0
}

fn cmd_config(path_only: bool) -> i32 {
    let path = config::config_path();

    if path_only {
        println!("{}", path.display());
        return 0;
    }

    let cfg = config::get_config();
    match toml::to_string_pretty(cfg) {
        Ok(toml_str) => {
            print_heading("Configuration");
            print_kv("file", &path.display().to_string());
            println!();
            println!("{toml_str}");
            0
        }
        Err(e) => {
            print_error(&format!("Failed to render config: {e}"));
            1
        }
    }
}
