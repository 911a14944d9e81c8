//! GPX decoding: waypoints become bookmarks, tracks and routes become tracks.

use super::ImportError;
use crate::api::LatLon;
use crate::bookmarks::{
    Bookmark, BookmarkCollection, BookmarkColor, PredefinedColor, Track, TrackPoint,
    DEFAULT_TRACK_COLOR, DEFAULT_TRACK_WIDTH,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const TRK: &str = "trk";
const TRKSEG: &str = "trkseg";
const RTE: &str = "rte";
const TRKPT: &str = "trkpt";
const WPT: &str = "wpt";
const RTEPT: &str = "rtept";
const NAME: &str = "name";
const COLOR: &str = "color";
const OSMAND_COLOR: &str = "osmand:color";
const GPX: &str = "gpx";
const GARMIN_COLOR: &str = "gpxx:DisplayColor";
const DESC: &str = "desc";
const METADATA: &str = "metadata";
const ELE: &str = "ele";
const CMT: &str = "cmt";

const NO_COLOR: u32 = 0;
/// Consecutive track points closer than this (degrees) are merged.
const POINT_EPSILON: f64 = 1e-5;

pub fn parse_gpx(content: &[u8]) -> Result<BookmarkCollection, ImportError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut parser = GpxParser::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.start(&e),
            Event::Empty(e) => {
                parser.start(&e);
                parser.end(&tag_name(&e));
            }
            Event::End(e) => parser.end(&String::from_utf8_lossy(e.name().as_ref())),
            Event::Text(e) => {
                let text = e.unescape()?;
                parser.char_data(&text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                parser.char_data(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(parser.data)
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Geometry {
    #[default]
    Unknown,
    Point,
    Line,
}

#[derive(Default)]
struct GpxParser {
    data: BookmarkCollection,
    tags: Vec<String>,
    geometry: Geometry,
    name: String,
    description: String,
    comment: String,
    color: u32,
    global_color: u32,
    lat: f64,
    lon: f64,
    altitude: Option<i32>,
    waypoint: Option<(f64, f64, Option<i32>)>,
    line: Vec<TrackPoint>,
    lines: Vec<Vec<TrackPoint>>,
}

impl GpxParser {
    fn reset_point(&mut self) {
        self.name.clear();
        self.description.clear();
        self.comment.clear();
        self.color = NO_COLOR;
        self.geometry = Geometry::Unknown;
        self.lat = 0.0;
        self.lon = 0.0;
        self.altitude = None;
        self.waypoint = None;
        self.line.clear();
        self.lines.clear();
    }

    fn tag_from_end(&self, n: usize) -> Option<&str> {
        self.tags
            .len()
            .checked_sub(n + 1)
            .map(|i| self.tags[i].as_str())
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let tag = tag_name(e);
        if tag == WPT {
            self.geometry = Geometry::Point;
        } else if tag == TRKPT || tag == RTEPT {
            self.geometry = Geometry::Line;
        }
        self.tags.push(tag);

        if !self.is_coordinates_position() {
            return;
        }
        self.lat = f64::NAN;
        self.lon = f64::NAN;
        for attr in e.attributes().flatten() {
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            let slot = match attr.key.as_ref() {
                b"lat" => &mut self.lat,
                b"lon" => &mut self.lon,
                _ => continue,
            };
            match value.trim().parse::<f64>() {
                Ok(v) => *slot = v,
                Err(_) => tracing::warn!(value = %value, "bad gpx coordinate"),
            }
        }
    }

    /// Coordinates count only on waypoints and on points nested where they belong.
    fn is_coordinates_position(&self) -> bool {
        match self.tag_from_end(0) {
            Some(WPT) => true,
            Some(TRKPT) => self.tag_from_end(1) == Some(TRKSEG),
            Some(RTEPT) => self.tag_from_end(1) == Some(RTE),
            _ => false,
        }
    }

    fn end(&mut self, tag: &str) {
        match tag {
            TRKPT | RTEPT if self.is_coordinates_position() => {
                match LatLon::new(self.lat, self.lon) {
                    Some(lat_lon) => {
                        let duplicate = self.line.last().is_some_and(|last| {
                            (last.lat_lon.lat - lat_lon.lat).abs() < POINT_EPSILON
                                && (last.lat_lon.lon - lat_lon.lon).abs() < POINT_EPSILON
                        });
                        if !duplicate {
                            self.line.push(TrackPoint {
                                lat_lon,
                                altitude: self.altitude,
                            });
                        }
                    }
                    None => tracing::warn!(lat = self.lat, lon = self.lon, "dropping invalid track point"),
                }
                self.altitude = None;
            }
            TRKSEG | RTE => {
                let line = std::mem::take(&mut self.line);
                self.lines.push(line);
            }
            WPT => {
                self.waypoint = Some((self.lat, self.lon, self.altitude));
                self.altitude = None;
            }
            _ => {}
        }

        if tag == RTE || tag == TRK || tag == WPT {
            self.finish_feature();
            self.reset_point();
        }
        self.tags.pop();
    }

    fn finish_feature(&mut self) {
        match self.geometry {
            Geometry::Point => {
                let Some((lat, lon, altitude)) = self.waypoint else {
                    return;
                };
                let Some(point) = LatLon::new(lat, lon) else {
                    tracing::warn!(lat, lon, "dropping waypoint with invalid coordinates");
                    return;
                };
                let name = if self.name.is_empty() {
                    point.to_string()
                } else {
                    std::mem::take(&mut self.name)
                };
                self.data.bookmarks.push(Bookmark {
                    custom_name: name.clone(),
                    name,
                    description: self.build_description(),
                    point,
                    altitude,
                    color: BookmarkColor {
                        predefined: PredefinedColor::Red,
                        rgba: self.color,
                    },
                });
            }
            Geometry::Line => {
                let lines: Vec<_> = std::mem::take(&mut self.lines)
                    .into_iter()
                    .filter(|l| l.len() > 1)
                    .collect();
                if lines.is_empty() {
                    return;
                }
                let color = if self.color != NO_COLOR {
                    self.color
                } else if self.global_color != NO_COLOR {
                    self.global_color
                } else {
                    DEFAULT_TRACK_COLOR
                };
                self.data.tracks.push(Track {
                    name: std::mem::take(&mut self.name),
                    description: self.build_description(),
                    color,
                    width: DEFAULT_TRACK_WIDTH,
                    lines,
                });
            }
            Geometry::Unknown => {}
        }
    }

    fn char_data(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() || self.tags.len() < 2 {
            return;
        }
        let curr = self.tags[self.tags.len() - 1].clone();
        let prev = self.tags[self.tags.len() - 2].clone();

        match curr.as_str() {
            NAME => self.parse_name(value, &prev),
            DESC => self.parse_description(value, &prev),
            GARMIN_COLOR => self.parse_garmin_color(value),
            OSMAND_COLOR => self.parse_osmand_color(value),
            COLOR => self.parse_color(value),
            ELE => self.altitude = parse_altitude(value),
            CMT => self.comment = value.to_string(),
            _ => {}
        }
    }

    fn parse_name(&mut self, value: &str, prev: &str) {
        match prev {
            WPT => self.name = value.to_string(),
            TRK | RTE => {
                self.name = value.to_string();
                if self.data.name.is_empty() {
                    self.data.name = value.to_string();
                }
            }
            METADATA => self.data.name = value.to_string(),
            _ => {}
        }
    }

    fn parse_description(&mut self, value: &str, prev: &str) {
        match prev {
            WPT => self.description = value.to_string(),
            TRK | RTE => {
                self.description = value.to_string();
                if self.data.description.is_empty() {
                    self.data.description = value.to_string();
                }
            }
            METADATA => self.data.description = value.to_string(),
            _ => {}
        }
    }

    fn parse_color(&mut self, value: &str) {
        match hex_bytes(value).as_deref() {
            Some(&[r, g, b]) => self.color = rgba(r, g, b, 0xFF),
            _ => tracing::warn!(value, "invalid gpx color"),
        }
    }

    /// `#AARRGGBB`, `#RRGGBB`, `AARRGGBB` or `RRGGBB`. At `gpx/extensions`
    /// level it applies to every track in the file.
    fn parse_osmand_color(&mut self, value: &str) {
        let hex = value.strip_prefix('#').unwrap_or(value);
        let color = match hex_bytes(hex).as_deref() {
            Some(&[r, g, b]) => rgba(r, g, b, 0xFF),
            Some(&[a, r, g, b]) => rgba(r, g, b, a),
            _ => {
                tracing::warn!(value, "invalid osmand color");
                return;
            }
        };
        if self.tags.len() > 2 && self.tag_from_end(2) == Some(GPX) {
            self.global_color = color;
            for track in &mut self.data.tracks {
                track.color = color;
            }
        } else {
            self.color = color;
        }
    }

    fn parse_garmin_color(&mut self, value: &str) {
        let hex = match value {
            "Black" => "000000",
            "DarkRed" => "8b0000",
            "DarkGreen" => "006400",
            "DarkYellow" => "b5b820",
            "DarkBlue" => "00008b",
            "DarkMagenta" => "8b008b",
            "DarkCyan" => "008b8b",
            "LightGray" => "cccccc",
            "DarkGray" => "444444",
            "Red" => "ff0000",
            "Green" => "00ff00",
            "Yellow" => "ffff00",
            "Blue" => "0000ff",
            "Magenta" => "ff00ff",
            "Cyan" => "00ffff",
            "White" => "ffffff",
            "Transparent" => "ff0000",
            other => {
                tracing::warn!(value = other, "unsupported garmin color, using red");
                "ff0000"
            }
        };
        self.parse_color(hex);
    }

    fn build_description(&self) -> String {
        if self.description.is_empty() {
            self.comment.clone()
        } else if self.comment.is_empty() || self.description == self.comment {
            self.description.clone()
        } else {
            format!("{}\n\n{}", self.description, self.comment)
        }
    }
}

fn parse_altitude(value: &str) -> Option<i32> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i32)
}

pub(crate) fn hex_bytes(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

pub(crate) fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_be_bytes([r, g, b, a])
}
