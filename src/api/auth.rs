use std::collections::BTreeMap;

use http::{
    HeaderMap,
    Method,
    Request,
    StatusCode,
    header::{CONTENT_TYPE, SET_COOKIE},
};
use itertools::Itertools;
use url::form_urlencoded;

use crate::{api::Client, error::AuthError, prelude::*, transport::Transport};

/// Authenticated portal session: the cookies the portal has set so far.
///
/// Only [`Client::login`] creates one, so an unauthenticated session is simply the absence of a value.
/// Not synchronized: one session serves one caller at a time.
#[must_use]
#[derive(Debug)]
pub struct Session {
    cookies: BTreeMap<String, String>,
}

impl Session {
    pub(super) const fn new() -> Self {
        Self { cookies: BTreeMap::new() }
    }

    /// Remember the `name=value` pair of every `Set-Cookie`, ignoring the attributes.
    pub(super) fn absorb(&mut self, headers: &HeaderMap) {
        for header in headers.get_all(SET_COOKIE) {
            if let Ok(header) = header.to_str()
                && let Some((name, value)) = header.split(';').next().and_then(|pair| pair.split_once('='))
            {
                self.cookies.insert(name.trim().to_owned(), value.trim().to_owned());
            }
        }
    }

    /// `Cookie` header value, if there is anything to send.
    pub(super) fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            None
        } else {
            Some(self.cookies.iter().map(|(name, value)| format!("{name}={value}")).join("; "))
        }
    }

    #[must_use]
    pub fn n_cookies(&self) -> usize {
        self.cookies.len()
    }
}

impl<T: Transport> Client<T> {
    const LOGIN_PATH: &'static str = "form/Login/GetAccountValidationMessage";

    /// Log in with the configured credentials.
    ///
    /// See [`AuthError`] on why a successful login does not prove the password was right.
    #[instrument(skip_all, fields(email = %self.config().credentials.email))]
    pub fn login(&self) -> Result<Session, AuthError> {
        debug!("logging in…");
        let credentials = &self.config().credentials;
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("userId", &credentials.email)
            .append_pair("userPassword", &credentials.password)
            .append_pair("deviceprofile", "mobile")
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.config().endpoint(Self::LOGIN_PATH))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");

        let mut session = Session::new();
        let response = self.send(&mut session, request, form.into_bytes())?;
        if response.status() != StatusCode::OK {
            warn!(status = response.status().as_u16(), "login rejected");
            return Err(AuthError::LoginRejected { status: Some(response.status().as_u16()), source: None });
        }
        debug!(n_cookies = session.n_cookies(), "logged in");
        Ok(session)
    }

    /// Discard the session.
    ///
    /// The portal has no logout call the client needs: the cookies are simply forgotten.
    #[instrument(skip_all, level = Level::DEBUG)]
    pub fn logout(&self, session: Session) {
        debug!(n_cookies = session.n_cookies(), "logging out");
        drop(session);
    }
}

#[cfg(test)]
mod tests {
    use http::header::HeaderValue;

    use super::*;
    use crate::{
        config::{Config, Credentials},
        error::TransportError,
        transport::testing::Replay,
    };

    fn client(transport: Replay) -> Client<Replay> {
        let credentials =
            Credentials { email: "jane@example.com".into(), password: "p&ss word".into() };
        Client::with_transport(transport, Config::builder().credentials(credentials).build())
    }

    #[test]
    fn test_login_ok() -> Result {
        let client = client(Replay::default().respond_with_cookie(
            200,
            "ASP.NET_SessionId=abc123; path=/; HttpOnly",
            "",
        ));
        let session = client.login()?;
        assert_eq!(session.cookie_header().as_deref(), Some("ASP.NET_SessionId=abc123"));
        client.transport().inspect(0, |request| {
            assert_eq!(request.method(), Method::POST);
            assert_eq!(
                request.uri(),
                "https://www.duke-energy.com/form/Login/GetAccountValidationMessage"
            );
            assert_eq!(request.headers()[CONTENT_TYPE], "application/x-www-form-urlencoded");
            assert!(request.headers().contains_key(http::header::USER_AGENT));
            let body = String::from_utf8_lossy(request.body());
            assert!(body.contains("userId=jane%40example.com"), "{body}");
            assert!(body.contains("deviceprofile=mobile"), "{body}");
            assert!(!body.contains("p&ss"), "the password must be escaped: {body}");
        });
        Ok(())
    }

    #[test]
    fn test_login_rejected() {
        let client = client(Replay::default().respond(403, ""));
        assert!(matches!(
            client.login(),
            Err(AuthError::LoginRejected { status: Some(403), source: None }),
        ));
    }

    #[test]
    fn test_login_transport_failure_is_rejection() {
        let client = client(Replay::default().fail(TransportError::Timeout));
        assert!(matches!(
            client.login(),
            Err(AuthError::LoginRejected { status: None, source: Some(TransportError::Timeout) }),
        ));
    }

    #[test]
    fn test_session_sends_cookies() -> Result {
        let client = client(
            Replay::default()
                .respond_with_cookie(200, "ASP.NET_SessionId=abc123; path=/", "")
                .respond(200, "<html></html>"),
        );
        let mut session = client.login()?;
        client.send(&mut session, Request::builder().uri("https://www.duke-energy.com/"), Vec::new())?;
        client.transport().inspect(1, |request| {
            assert_eq!(request.headers()[http::header::COOKIE], "ASP.NET_SessionId=abc123");
        });
        client.logout(session);
        Ok(())
    }

    #[test]
    fn test_absorb_overwrites_and_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Secure"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.append(SET_COOKIE, HeaderValue::from_static("garbage"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=3"));
        let mut session = Session::new();
        session.absorb(&headers);
        assert_eq!(session.cookie_header().as_deref(), Some("a=3; b=2"));
    }

    #[test]
    fn test_login_is_the_only_way_to_a_session() -> Result {
        let client = client(Replay::default().respond(200, ""));
        let session = client.login()?;
        assert_eq!(session.n_cookies(), 0);
        assert_eq!(client.transport().n_requests(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_session_sends_no_cookie() {
        assert_eq!(Session::new().cookie_header(), None);
    }
}
