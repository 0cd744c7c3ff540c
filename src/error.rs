use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Load-time failures. Frame-time numeric edge cases never surface here;
/// they degrade to local misses inside the traversal instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: malformed triangle record: {reason}", path.display())]
    TriFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to load OBJ {}: {source}", path.display())]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
}
