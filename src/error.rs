use thiserror::Error;

/// Failure to complete an HTTP exchange at all.
///
/// Never retried: the caller decides whether to try again on its own schedule.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("the request timed out")]
    Timeout,

    #[error("failed to build the request")]
    InvalidRequest(#[from] http::Error),

    #[error("the request failed: {0}")]
    Failed(String),
}

impl From<ureq::Error> for TransportError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Timeout(_) => Self::Timeout,
            error => Self::Failed(error.to_string()),
        }
    }
}

/// Login failure.
///
/// # Note
///
/// The portal answers HTTP 200 to a login with a wrong password, so an `Ok` from login does **not**
/// mean the credentials were accepted. Bad credentials only show up later, as an [`ApiError`] from the
/// first data call made with the session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("the portal rejected the login (status: {status:?})")]
    LoginRejected {
        /// HTTP status when the portal answered with anything other than 200.
        status: Option<u16>,

        /// Transport failure when the portal did not answer at all.
        #[source]
        source: Option<TransportError>,
    },
}

impl From<TransportError> for AuthError {
    fn from(error: TransportError) -> Self {
        Self::LoginRejected { status: None, source: Some(error) }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("the meter dropdown is missing from the usage analysis page")]
    MarkupNotFound,

    #[error("the meter dropdown items are not the expected JSON")]
    MalformedItems(#[source] serde_json::Error),

    #[error("`{text}` is not a `<TYPE> - <ID>` meter label")]
    MalformedItem { text: String },

    #[error("the usage analysis page responded with HTTP {0}")]
    UnexpectedStatus(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The portal responded with `"Status": "ERROR"` (or anything but `OK`).
    #[error("the portal reported an error: {}", .0.as_deref().unwrap_or("no message"))]
    UpstreamError(Option<String>),

    #[error("unsupported meter type `{0}`")]
    UnsupportedMeterType(String),

    #[error("the response does not match the expected schema")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("the portal responded with HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    UnexpectedStatus { status: u16, message: Option<String> },

    #[error("failed to serialize the request")]
    InvalidRequest(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// Build [`ApiError::MalformedResponse`] for a shape problem `serde` itself cannot express.
    pub(crate) fn malformed(message: &str) -> Self {
        Self::MalformedResponse(serde::de::Error::custom(message))
    }
}

/// Failure of a facade operation that spans several components.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
