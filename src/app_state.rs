//! Implements a struct that holds the state of the web server.

use std::time::Duration;

use crate::{Error, api::ApiClient, timezone::get_local_offset};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The client for the upstream invoice API.
    pub api: ApiClient,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] that fetches invoices from the API at `api_url`.
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "America/Sao_Paulo".
    /// `session_cookie` is the name of the cookie holding the session token
    /// that is forwarded to the upstream API.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if `local_timezone` is not a known
    /// timezone, [Error::InvalidApiUrl] if `api_url` is not an absolute URL,
    /// or [Error::Upstream] if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        local_timezone: &str,
        session_cookie: &str,
        api_timeout: Duration,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezone(local_timezone.to_owned()));
        }

        Ok(Self {
            api: ApiClient::new(api_url, session_cookie, api_timeout)?,
            local_timezone: local_timezone.to_owned(),
        })
    }
}
