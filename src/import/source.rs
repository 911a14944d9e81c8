use super::ImportError;
use std::io::Read;
use std::path::PathBuf;

/// Opens the byte stream behind a shared resource reference.
pub trait ContentResolver: Send + Sync {
    fn open(&self, resource: &str) -> Result<Box<dyn Read + Send>, ImportError>;

    /// Size of the resource if it is cheap to know up front.
    fn size_hint(&self, _resource: &str) -> Option<u64> {
        None
    }
}

/// Resolves `file://` URLs and plain filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentResolver;

/// Local path behind a resource reference, if it has one.
pub fn local_path(resource: &str) -> Result<PathBuf, ImportError> {
    let resource = resource.trim();
    match url::Url::parse(resource) {
        Ok(url) if url.scheme() == "file" => {
            url.to_file_path()
                .map_err(|()| ImportError::UnsupportedScheme {
                    resource: resource.to_string(),
                    scheme: "file".into(),
                })
        }
        Ok(url) => Err(ImportError::UnsupportedScheme {
            resource: resource.to_string(),
            scheme: url.scheme().to_string(),
        }),
        Err(_) => Ok(PathBuf::from(resource)),
    }
}

/// File name of the resource, used to pick a format and name the collection.
pub fn display_name(resource: &str) -> String {
    let path = match local_path(resource) {
        Ok(p) => p,
        Err(_) => PathBuf::from(resource.rsplit('/').next().unwrap_or(resource)),
    };
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl ContentResolver for FsContentResolver {
    fn open(&self, resource: &str) -> Result<Box<dyn Read + Send>, ImportError> {
        let path = local_path(resource)?;
        Ok(Box::new(std::fs::File::open(path)?))
    }

    fn size_hint(&self, resource: &str) -> Option<u64> {
        let path = local_path(resource).ok()?;
        std::fs::metadata(path).ok().map(|m| m.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_is_local() {
        assert_eq!(
            local_path("/tmp/a.kml").unwrap(),
            PathBuf::from("/tmp/a.kml")
        );
    }

    #[test]
    fn file_url_is_decoded() {
        assert_eq!(
            local_path("file:///tmp/my%20trip.gpx").unwrap(),
            PathBuf::from("/tmp/my trip.gpx")
        );
    }

    #[test]
    fn content_uri_is_unsupported() {
        let err = local_path("content://media/external/42").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedScheme { ref scheme, .. } if scheme == "content"));
    }

    #[test]
    fn display_name_from_any_reference() {
        assert_eq!(display_name("/data/walk.kmz"), "walk.kmz");
        assert_eq!(display_name("file:///data/ride.gpx"), "ride.gpx");
        assert_eq!(display_name("content://downloads/doc.kml"), "doc.kml");
    }

    #[test]
    fn fs_resolver_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.gpx");
        std::fs::write(&path, "<gpx/>").unwrap();

        let mut content = String::new();
        FsContentResolver
            .open(path.to_str().unwrap())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<gpx/>");
        assert_eq!(FsContentResolver.size_hint(path.to_str().unwrap()), Some(6));
    }

    #[test]
    fn fs_resolver_missing_file_is_io_error() {
        let err = FsContentResolver.open("/definitely/not/here.kml").err().unwrap();
        assert!(matches!(err, ImportError::Io(_)));
    }
}
