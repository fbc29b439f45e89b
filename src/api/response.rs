use http::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{error::ApiError, prelude::*};

/// Usage analysis response envelope.
///
/// The payload sits next to `Status` at the top level, so the body is read into
/// [`serde_json::Value`] first: the header decides whether the payload is parsed at all.
#[derive(Deserialize)]
struct Header {
    #[serde(rename = "Status")]
    status: Status,

    #[serde(rename = "ErrorMsg", default)]
    error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
enum Status {
    #[serde(rename = "OK")]
    Ok,

    #[serde(rename = "ERROR")]
    Error,

    #[serde(other)]
    Unknown,
}

/// Check the HTTP status and the envelope, then parse the payload.
pub fn parse<P: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<P, ApiError> {
    if status != StatusCode::OK {
        // Error pages may still carry the envelope, take the message if so:
        let message = serde_json::from_slice::<Header>(body).ok().and_then(|header| header.error_message);
        return Err(ApiError::UnexpectedStatus { status: status.as_u16(), message });
    }
    let value: serde_json::Value = serde_json::from_slice(body).map_err(ApiError::MalformedResponse)?;
    trace!(%value, "received");
    let header = Header::deserialize(&value).map_err(ApiError::MalformedResponse)?;
    if header.status != Status::Ok {
        warn!(status = ?header.status, message = ?header.error_message, "the portal reported an error");
        return Err(ApiError::UpstreamError(header.error_message));
    }
    P::deserialize(&value).map_err(ApiError::MalformedResponse)
}
