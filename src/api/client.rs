use http::{
    Response,
    header::{COOKIE, USER_AGENT},
    request::Builder,
};

use crate::{
    api::Session,
    config::Config,
    error::{Error, TransportError},
    meter::{Meter, Refresh},
    prelude::*,
    transport::{Transport, UreqTransport},
};

/// Duke Energy portal client.
///
/// Holds the credentials and the transport. Sessions are short-lived: one per discovery pass and
/// one per meter refresh.
pub struct Client<T = UreqTransport> {
    transport: T,
    config: Config,
}

impl Client {
    /// Build a client with the blocking production transport.
    pub fn new(config: Config) -> Self {
        Self::with_transport(UreqTransport::new(config.timeout), config)
    }
}

impl<T: Transport> Client<T> {
    pub const fn with_transport(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Log in and discover the account's meters.
    ///
    /// Every call is a fresh discovery pass, the meter list is never cached.
    #[instrument(skip_all, fields(email = %self.config.credentials.email))]
    pub fn get_meters(&self) -> Result<Vec<Meter>, Error> {
        let session = self.login()?;
        let meters = self.discover(session)?;
        info!(n_meters = meters.len(), "discovered");
        Ok(meters)
    }

    /// Refresh the meter unless it is cooling down.
    pub fn refresh(&self, meter: &mut Meter) -> Result<Refresh, Error> {
        meter.update(self, false)
    }

    /// Send the request on behalf of the session.
    ///
    /// Attaches the user agent and the session cookies, and absorbs whatever cookies the portal sets.
    pub(super) fn send(
        &self,
        session: &mut Session,
        request: Builder,
        body: Vec<u8>,
    ) -> Result<Response<Vec<u8>>, TransportError> {
        let mut request = request.header(USER_AGENT, self.config.user_agent.as_str());
        if let Some(cookie) = session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }
        let response = self.transport.send(request.body(body)?)?;
        session.absorb(response.headers());
        Ok(response)
    }
}
