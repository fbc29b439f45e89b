use std::sync::LazyLock;

use http::{Method, Request, StatusCode};
use itertools::Itertools;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::{
    api::{Client, Session},
    error::DiscoveryError,
    meter::{Meter, MeterType},
    prelude::*,
    transport::Transport,
};

/// The meter dropdown on the usage analysis page, with the meters listed in its `items` attribute.
///
/// Other widgets on the page carry `items` too, hence the element name.
static METER_DROPDOWN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("duke-dropdown[items]").expect("the dropdown selector should be valid"));

/// Separator between the type and the ID in a meter label, e.g. `ELECTRIC - 12345`.
const LABEL_SEPARATOR: &str = " - ";

#[derive(Deserialize)]
struct DropdownItem {
    text: String,

    #[serde(rename = "CalendarStartDate")]
    calendar_start_date: String,
}

impl<T: Transport> Client<T> {
    const USAGE_ANALYSIS_PATH: &'static str = "my-account/usage-analysis";

    /// Scrape the account's meters off the usage analysis page.
    ///
    /// The session is single-use: it is logged out whatever the outcome.
    #[instrument(skip_all)]
    pub fn discover(&self, mut session: Session) -> Result<Vec<Meter>, DiscoveryError> {
        let meters = self.discover_with(&mut session);
        self.logout(session);
        meters
    }

    fn discover_with(&self, session: &mut Session) -> Result<Vec<Meter>, DiscoveryError> {
        info!("fetching the usage analysis page…");
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.config().endpoint(Self::USAGE_ANALYSIS_PATH));
        let response = self.send(session, request, Vec::new())?;
        if response.status() != StatusCode::OK {
            return Err(DiscoveryError::UnexpectedStatus(response.status().as_u16()));
        }
        parse_meters(&String::from_utf8_lossy(response.body()), self.config().update_interval_minutes)
    }
}

/// Parse the meter dropdown out of the usage analysis page.
pub fn parse_meters(html: &str, update_interval_minutes: u32) -> Result<Vec<Meter>, DiscoveryError> {
    let document = Html::parse_document(html);
    let items = document
        .select(&METER_DROPDOWN)
        .find_map(|element| element.value().attr("items"))
        .ok_or(DiscoveryError::MarkupNotFound)?;
    serde_json::from_str::<Vec<DropdownItem>>(items)
        .map_err(DiscoveryError::MalformedItems)?
        .into_iter()
        .map(|item| -> Result<Meter, DiscoveryError> {
            let (kind, id) = item
                .text
                .split(LABEL_SEPARATOR)
                .collect_tuple()
                .ok_or_else(|| DiscoveryError::MalformedItem { text: item.text.clone() })?;
            debug!(kind, id, start_date = %item.calendar_start_date, "found a meter");
            Ok(Meter::new(MeterType::from(kind), id, item.calendar_start_date, update_interval_minutes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Config, Credentials},
        error::{AuthError, Error, TransportError},
        transport::testing::Replay,
    };

    // language=html
    const PAGE: &str = r#"
        <html>
            <body>
                <div class="usage-analysis">
                    <duke-dropdown
                        id="meter-dropdown"
                        items='[{"text":"ELECTRIC - 12345","CalendarStartDate":"2018-01-01"},{"text":"GAS - 67890","CalendarStartDate":"2018-02-15","value":"2"}]'
                    ></duke-dropdown>
                </div>
            </body>
        </html>
    "#;

    fn client(transport: Replay) -> Client<Replay> {
        let credentials = Credentials { email: "jane@example.com".into(), password: "hunter2".into() };
        Client::with_transport(
            transport,
            Config::builder().credentials(credentials).update_interval_minutes(30).build(),
        )
    }

    #[test]
    fn test_parse_single_meter() -> Result {
        // language=html
        let html = r#"<duke-dropdown items='[{"text":"ELECTRIC - 12345","CalendarStartDate":"2018-01-01"}]'></duke-dropdown>"#;
        let meters = parse_meters(html, 10)?;
        assert_eq!(meters.len(), 1);
        assert_eq!(meters[0].kind(), &MeterType::Electric);
        assert_eq!(meters[0].id(), "12345");
        assert_eq!(meters[0].start_date(), "2018-01-01");
        Ok(())
    }

    #[test]
    fn test_parse_several_meters() -> Result {
        let meters = parse_meters(PAGE, 30)?;
        assert_eq!(meters.len(), 2);
        assert_eq!(meters[1].kind(), &MeterType::Gas);
        assert_eq!(meters[1].id(), "67890");
        assert_eq!(meters[1].start_date(), "2018-02-15");
        assert_eq!(meters[1].update_interval(), chrono::TimeDelta::minutes(30));
        Ok(())
    }

    #[test]
    fn test_parse_unknown_type_is_kept() -> Result {
        // language=html
        let html = r#"<duke-dropdown items='[{"text":"WATER - 1","CalendarStartDate":"2019-01-01"}]'></duke-dropdown>"#;
        let meters = parse_meters(html, 10)?;
        assert_eq!(meters[0].kind(), &MeterType::Other("WATER".into()));
        Ok(())
    }

    #[test]
    fn test_parse_skips_other_widgets_with_items() -> Result {
        // language=html
        let html = r#"
            <nav-menu items='["Home", "Billing"]'></nav-menu>
            <div class="tabs" items="usage,outages"></div>
            <duke-dropdown
                id="meter-dropdown"
                items='[{"text":"ELECTRIC - 12345","CalendarStartDate":"2018-01-01"}]'
            ></duke-dropdown>
        "#;
        let meters = parse_meters(html, 10)?;
        assert_eq!(meters.len(), 1);
        assert_eq!(meters[0].number(), "ELECTRIC - 12345");
        Ok(())
    }

    #[test]
    fn test_parse_only_other_widgets() {
        // language=html
        let html = r#"<nav-menu items='["Home", "Billing"]'></nav-menu><duke-dropdown></duke-dropdown>"#;
        assert!(matches!(parse_meters(html, 10), Err(DiscoveryError::MarkupNotFound)));
    }

    #[test]
    fn test_parse_missing_dropdown() {
        assert!(matches!(
            parse_meters("<html><body>Please sign in</body></html>", 10),
            Err(DiscoveryError::MarkupNotFound),
        ));
    }

    #[test]
    fn test_parse_missing_separator() {
        // language=html
        let html = r#"<duke-dropdown items='[{"text":"ELECTRIC12345","CalendarStartDate":"2018-01-01"}]'></duke-dropdown>"#;
        assert!(matches!(
            parse_meters(html, 10),
            Err(DiscoveryError::MalformedItem { text }) if text == "ELECTRIC12345",
        ));
    }

    #[test]
    fn test_parse_repeated_separator() {
        // language=html
        let html = r#"<duke-dropdown items='[{"text":"ELECTRIC - 1 - 2","CalendarStartDate":"2018-01-01"}]'></duke-dropdown>"#;
        assert!(matches!(parse_meters(html, 10), Err(DiscoveryError::MalformedItem { .. })));
    }

    #[test]
    fn test_parse_malformed_items() {
        // language=html
        let html = r#"<duke-dropdown items='{"text": "ELECTRIC - 1"}'></duke-dropdown>"#;
        assert!(matches!(parse_meters(html, 10), Err(DiscoveryError::MalformedItems(_))));
    }

    #[test]
    fn test_get_meters_ok() -> Result {
        let client = client(Replay::default().respond(200, "").respond(200, PAGE));
        let meters = client.get_meters()?;
        assert_eq!(meters.len(), 2);
        assert_eq!(client.transport().n_requests(), 2);
        client.transport().inspect(1, |request| {
            assert_eq!(request.method(), Method::GET);
            assert_eq!(request.uri(), "https://www.duke-energy.com/my-account/usage-analysis");
        });
        Ok(())
    }

    #[test]
    fn test_get_meters_is_never_cached() -> Result {
        let client = client(
            Replay::default().respond(200, "").respond(200, PAGE).respond(200, "").respond(200, PAGE),
        );
        client.get_meters()?;
        client.get_meters()?;
        assert_eq!(client.transport().n_requests(), 4);
        Ok(())
    }

    #[test]
    fn test_get_meters_login_rejected() {
        let client = client(Replay::default().respond(500, ""));
        assert!(matches!(client.get_meters(), Err(Error::Auth(AuthError::LoginRejected { .. }))));
        assert_eq!(client.transport().n_requests(), 1);
    }

    #[test]
    fn test_get_meters_page_failures() {
        let redirected = client(Replay::default().respond(200, "").respond(302, ""));
        assert!(matches!(
            redirected.get_meters(),
            Err(Error::Discovery(DiscoveryError::UnexpectedStatus(302))),
        ));

        let timed_out = client(Replay::default().respond(200, "").fail(TransportError::Timeout));
        assert!(matches!(
            timed_out.get_meters(),
            Err(Error::Discovery(DiscoveryError::Transport(TransportError::Timeout))),
        ));
    }
}
