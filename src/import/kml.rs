//! KML and KMZ decoding. Placemarks with a `Point` become bookmarks, those
//! with a `LineString` become tracks.

use super::gpx::{hex_bytes, rgba};
use super::ImportError;
use crate::api::LatLon;
use crate::bookmarks::{
    Bookmark, BookmarkCollection, BookmarkColor, PredefinedColor, Track, TrackPoint,
    DEFAULT_TRACK_COLOR, DEFAULT_TRACK_WIDTH,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const MAIN_KML: &str = "doc.kml";

#[derive(Default)]
struct Placemark {
    name: String,
    description: String,
    point: Option<(LatLon, Option<i32>)>,
    line: Vec<TrackPoint>,
    line_color: u32,
}

pub fn parse_kml(content: &[u8]) -> Result<BookmarkCollection, ImportError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut data = BookmarkCollection::default();
    let mut tags: Vec<String> = Vec::new();
    let mut placemark: Option<Placemark> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if tag == "Placemark" {
                    placemark = Some(Placemark::default());
                }
                tags.push(tag);
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"Placemark" {
                    if let Some(pm) = placemark.take() {
                        finish_placemark(&mut data, pm);
                    }
                }
                tags.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                char_data(&mut data, placemark.as_mut(), &tags, text.trim());
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                char_data(&mut data, placemark.as_mut(), &tags, text.trim());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(data)
}

/// KMZ is a zip archive holding `doc.kml`, or failing that any `.kml` entry.
/// The inflated entry may not exceed `max_size` bytes.
pub fn parse_kmz(content: &[u8], max_size: u64) -> Result<BookmarkCollection, ImportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let entry = names
        .iter()
        .find(|n| n.eq_ignore_ascii_case(MAIN_KML))
        .or_else(|| {
            names
                .iter()
                .find(|n| n.to_ascii_lowercase().ends_with(".kml"))
        })
        .cloned()
        .ok_or_else(|| ImportError::Empty("kmz archive has no kml entry".into()))?;

    tracing::debug!(entry = %entry, "reading kml from kmz");
    let file = archive.by_name(&entry)?;
    let declared = file.size();
    if declared > max_size {
        return Err(ImportError::TooLarge {
            size: declared,
            limit: max_size,
        });
    }
    // The declared size comes from the archive and is not trusted.
    let mut kml = Vec::with_capacity(declared as usize);
    let read = file
        .take(max_size.saturating_add(1))
        .read_to_end(&mut kml)? as u64;
    if read > max_size {
        return Err(ImportError::TooLarge {
            size: read,
            limit: max_size,
        });
    }
    parse_kml(&kml)
}

fn char_data(
    data: &mut BookmarkCollection,
    placemark: Option<&mut Placemark>,
    tags: &[String],
    value: &str,
) {
    if value.is_empty() || tags.len() < 2 {
        return;
    }
    let curr = tags[tags.len() - 1].as_str();
    let prev = tags[tags.len() - 2].as_str();

    match placemark {
        Some(pm) => match (prev, curr) {
            ("Placemark", "name") => pm.name = value.to_string(),
            ("Placemark", "description") => pm.description = value.to_string(),
            ("Point", "coordinates") => {
                pm.point = parse_coordinates(value).into_iter().next();
            }
            ("LineString", "coordinates") => {
                pm.line = parse_coordinates(value)
                    .into_iter()
                    .map(|(lat_lon, altitude)| TrackPoint { lat_lon, altitude })
                    .collect();
            }
            ("LineStyle", "color") => match parse_kml_color(value) {
                Some(color) => pm.line_color = color,
                None => tracing::warn!(value, "invalid kml color"),
            },
            _ => {}
        },
        None => match (prev, curr) {
            ("Document" | "Folder", "name") if data.name.is_empty() => {
                data.name = value.to_string()
            }
            ("Document" | "Folder", "description") if data.description.is_empty() => {
                data.description = value.to_string()
            }
            _ => {}
        },
    }
}

fn finish_placemark(data: &mut BookmarkCollection, pm: Placemark) {
    if let Some((point, altitude)) = pm.point {
        let name = if pm.name.is_empty() {
            point.to_string()
        } else {
            pm.name
        };
        data.bookmarks.push(Bookmark {
            custom_name: name.clone(),
            name,
            description: pm.description,
            point,
            altitude,
            color: BookmarkColor {
                predefined: PredefinedColor::Red,
                rgba: 0,
            },
        });
    } else if pm.line.len() > 1 {
        data.tracks.push(Track {
            name: pm.name,
            description: pm.description,
            color: if pm.line_color != 0 {
                pm.line_color
            } else {
                DEFAULT_TRACK_COLOR
            },
            width: DEFAULT_TRACK_WIDTH,
            lines: vec![pm.line],
        });
    } else {
        tracing::debug!(name = %pm.name, "skipping placemark without usable geometry");
    }
}

/// Whitespace separated `lon,lat[,alt]` tuples. Invalid tuples are skipped.
fn parse_coordinates(value: &str) -> Vec<(LatLon, Option<i32>)> {
    value
        .split_whitespace()
        .filter_map(|tuple| {
            let mut parts = tuple.split(',');
            let lon = parts.next()?.parse::<f64>().ok()?;
            let lat = parts.next()?.parse::<f64>().ok()?;
            let altitude = parts
                .next()
                .and_then(|a| a.parse::<f64>().ok())
                .filter(|a| a.is_finite())
                .map(|a| a.round() as i32);
            Some((LatLon::new(lat, lon)?, altitude))
        })
        .collect()
}

/// KML colors are `aabbggrr`.
fn parse_kml_color(value: &str) -> Option<u32> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    match hex_bytes(hex).as_deref() {
        Some(&[a, b, g, r]) => Some(rgba(r, g, b, a)),
        _ => None,
    }
}
