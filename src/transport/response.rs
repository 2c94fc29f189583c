//! Response decoding by declared content type.

use crate::client::types::{ParsedBody, RequestError, RequestResult};
use crate::transport::RawResponse;

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Decode a raw response.
///
/// Non-2xx is a failure regardless of body. 204 and empty bodies yield
/// [`ParsedBody::Success`]; JSON content types are parsed structurally and
/// everything else is returned as text.
pub fn parse_response(raw: RawResponse) -> RequestResult<ParsedBody> {
    if !(200..300).contains(&raw.status) {
        return Err(RequestError::HttpStatus {
            status: raw.status,
            body: raw.body,
        });
    }

    if raw.status == 204 || raw.body.trim().is_empty() {
        return Ok(ParsedBody::Success);
    }

    if is_json(raw.content_type.as_deref()) {
        return serde_json::from_str(&raw.body)
            .map(ParsedBody::Json)
            .map_err(|e| RequestError::Parse {
                status: raw.status,
                message: e.to_string(),
            });
    }

    Ok(ParsedBody::Text(raw.body))
}
