mod http_transport;
mod local_transport;
mod s3_transport;

pub use http_transport::HttpAssetTransport;
pub use local_transport::LocalAssetTransport;
pub use s3_transport::S3AssetTransport;

use crate::application::ports::asset_transport::TransportError;
use crate::domain::images::ImageFile;

pub(crate) fn ensure_within_limit(file: &ImageFile, limit: usize) -> Result<(), TransportError> {
    if file.size() > limit {
        return Err(TransportError::TooLarge {
            size: file.size(),
            limit,
        });
    }
    Ok(())
}

/// Keys are single path segments; anything that could escape the store is refused.
pub(crate) fn validate_key(key: &str) -> Result<(), TransportError> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(TransportError::InvalidResponse(format!(
            "invalid storage key: {key:?}"
        )));
    }
    Ok(())
}

pub(crate) fn join_url(base: Option<&str>, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match base {
        Some(origin) => format!("{}/{}", origin.trim_end_matches('/'), path),
        None => format!("/{}", path),
    }
}
