use url::Url;

use crate::ExtractError;

/// Turn a user-supplied channel reference into an identifier the listing
/// provider understands.
///
/// Accepts full channel URLs (`/channel/UC...`, `/user/Name`, `/c/Name`,
/// `/@Handle`) as well as bare identifiers. Custom-name and handle URLs keep
/// their first two path segments joined with a slash; that join is how the
/// upstream listing library expects those channels to be addressed, even
/// though it is not documented anywhere.
pub fn resolve_channel_reference(reference: &str) -> Result<String, ExtractError> {
    let parsed = match Url::parse(reference) {
        Ok(url) => url,
        // Not a URL at all: assume the user pasted a bare identifier or handle.
        Err(_) => return Ok(reference.to_string()),
    };

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.first() {
        Some(&first) if first == "c" || first.starts_with('@') => match segments.get(1) {
            Some(second) => Ok(format!("{}/{}", first, second)),
            None => Ok(first.to_string()),
        },
        Some(&"channel") | Some(&"user") => segments
            .get(1)
            .map(|s| s.to_string())
            .ok_or_else(|| ExtractError::UnrecognizedChannelReference(reference.to_string())),
        _ => Err(ExtractError::UnrecognizedChannelReference(
            reference.to_string(),
        )),
    }
}
