//! Dispatch layer for requests that reach a mapping application from outside:
//! API deep links become map actions, shared KML/KMZ/GPX files become
//! background bookmark imports.

pub mod api;
pub mod bookmarks;
pub mod cli;
pub mod config;
pub mod context;
pub mod host;
pub mod import;
pub mod intent;
pub mod logging;
