use std::time::Duration;

use http::{Request, Response};
use ureq::Agent;

use crate::{error::TransportError, prelude::*};

/// Blocking HTTP exchange: one request in, one fully-read response out.
///
/// Cookies are **not** kept here, the [`crate::Session`] carries them.
pub trait Transport {
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError>;
}

/// Production transport.
pub struct UreqTransport(Agent);

impl UreqTransport {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self(agent)
    }
}

impl Transport for UreqTransport {
    #[instrument(skip_all, level = Level::DEBUG, fields(method = %request.method(), uri = %request.uri()))]
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        let (parts, body) = request.into_parts();
        let response = if body.is_empty() {
            self.0.run(Request::from_parts(parts, ()))?
        } else {
            self.0.run(Request::from_parts(parts, body))?
        };
        let (parts, mut body) = response.into_parts();
        let body = body.read_to_vec()?;
        debug!(status = parts.status.as_u16(), n_bytes = body.len(), "received");
        Ok(Response::from_parts(parts, body))
    }
}

#[cfg(test)]
pub mod testing {
    use std::{cell::RefCell, collections::VecDeque};

    use http::{Request, Response, header::SET_COOKIE};

    use super::Transport;
    use crate::error::TransportError;

    /// Replays canned responses in order and records every request it was given.
    #[derive(Default)]
    pub struct Replay {
        responses: RefCell<VecDeque<Result<Response<Vec<u8>>, TransportError>>>,
        requests: RefCell<Vec<Request<Vec<u8>>>>,
    }

    impl Replay {
        #[must_use]
        pub fn respond(self, status: u16, body: &str) -> Self {
            let response = Response::builder().status(status).body(body.as_bytes().to_vec()).unwrap();
            self.responses.borrow_mut().push_back(Ok(response));
            self
        }

        #[must_use]
        pub fn respond_with_cookie(self, status: u16, cookie: &str, body: &str) -> Self {
            let response = Response::builder()
                .status(status)
                .header(SET_COOKIE, cookie)
                .body(body.as_bytes().to_vec())
                .unwrap();
            self.responses.borrow_mut().push_back(Ok(response));
            self
        }

        #[must_use]
        pub fn fail(self, error: TransportError) -> Self {
            self.responses.borrow_mut().push_back(Err(error));
            self
        }

        pub fn n_requests(&self) -> usize {
            self.requests.borrow().len()
        }

        /// Run the assertion against the n-th recorded request.
        pub fn inspect<R>(&self, index: usize, f: impl FnOnce(&Request<Vec<u8>>) -> R) -> R {
            f(&self.requests.borrow()[index])
        }
    }

    impl Transport for Replay {
        fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
            self.requests.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Failed("no more canned responses".into())))
        }
    }
}
