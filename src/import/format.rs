use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Kml,
    Kmz,
    Gpx,
    /// Binary bookmark format. Recognized but not decodable here.
    Kmb,
    Unknown,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const SNIFF_BYTES: usize = 1024;

/// Pick a format from the file name, falling back to the content.
pub fn detect_format(file_name: &str, content: &[u8]) -> FileFormat {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "kml" => return FileFormat::Kml,
        "kmz" => return FileFormat::Kmz,
        "gpx" => return FileFormat::Gpx,
        "kmb" => return FileFormat::Kmb,
        _ => {}
    }

    if content.starts_with(ZIP_MAGIC) {
        return FileFormat::Kmz;
    }
    let head = &content[..content.len().min(SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    if head.contains("<gpx") {
        FileFormat::Gpx
    } else if head.contains("<kml") {
        FileFormat::Kml
    } else {
        FileFormat::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_wins() {
        assert_eq!(detect_format("a.KML", b""), FileFormat::Kml);
        assert_eq!(detect_format("a.kmz", b"<gpx"), FileFormat::Kmz);
        assert_eq!(detect_format("track.gpx", b""), FileFormat::Gpx);
        assert_eq!(detect_format("x.kmb", b""), FileFormat::Kmb);
    }

    #[test]
    fn sniffs_content_without_extension() {
        assert_eq!(detect_format("42", b"PK\x03\x04rest"), FileFormat::Kmz);
        assert_eq!(
            detect_format("download", br#"<?xml version="1.0"?><gpx version="1.1">"#),
            FileFormat::Gpx
        );
        assert_eq!(
            detect_format("download.bin", br#"<?xml version="1.0"?><kml xmlns="http://www.opengis.net/kml/2.2">"#),
            FileFormat::Kml
        );
        assert_eq!(detect_format("notes.txt", b"hello"), FileFormat::Unknown);
    }
}
