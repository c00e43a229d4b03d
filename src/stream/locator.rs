//! Resolving resource locators to file paths
//!
//! Streams are bound to either a `file://` URI or a plain filesystem path.

use std::path::PathBuf;

use url::{ParseError, Url};

use crate::error::{StreamError, StreamResult};

/// Resolve a locator to the file path it names.
///
/// Fails with [`StreamError::ResourceUnavailable`] for empty locators,
/// malformed URIs, non-`file` schemes and file URIs naming a remote host.
pub fn resolve(locator: &str) -> StreamResult<PathBuf> {
    if locator.trim().is_empty() {
        return Err(StreamError::ResourceUnavailable(
            "empty resource locator".to_string(),
        ));
    }

    match Url::parse(locator) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().map_err(|_| {
            StreamError::ResourceUnavailable(format!("{locator}: not a local file path"))
        }),
        Ok(url) => Err(StreamError::ResourceUnavailable(format!(
            "{locator}: unsupported scheme '{}'",
            url.scheme()
        ))),
        // No scheme at all: a plain filesystem path
        Err(ParseError::RelativeUrlWithoutBase) => Ok(PathBuf::from(locator)),
        Err(e) => Err(StreamError::ResourceUnavailable(format!("{locator}: {e}"))),
    }
}
