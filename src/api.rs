//! HTTP client for the upstream REST API that stores invoices.

use std::time::Duration;

use axum::http::{StatusCode, header};
use axum_extra::extract::cookie::CookieJar;
use reqwest::{
    Client, Response, Url,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{Error, invoice::Invoice};

/// The invoice collection of the upstream API.
const INVOICES_SEGMENT: &str = "faturas";
/// The per-user upload endpoint under [INVOICES_SEGMENT].
const USER_SEGMENT: &str = "usuario";

/// The session token of the current user, forwarded to the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session(Option<String>);

impl Session {
    /// Read the session cookie called `cookie_name` from `jar`.
    pub fn from_jar(jar: &CookieJar, cookie_name: &str) -> Self {
        Self(jar.get(cookie_name).map(|cookie| cookie.value().to_owned()))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// A statement file to be sent to the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InvoiceList {
    Wrapped {
        #[serde(default)]
        faturas: Vec<Invoice>,
    },
    Bare(Vec<Invoice>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SingleInvoice {
    Wrapped { fatura: Invoice },
    Bare(Invoice),
}

/// Talks to the upstream invoice API.
///
/// Cloning is cheap, the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session_cookie: String,
}

impl ApiClient {
    /// Create a client for the API at `base_url`.
    ///
    /// `session_cookie` is the name of the cookie that carries the session
    /// token, both on incoming requests and on requests to the upstream API.
    ///
    /// # Errors
    /// Returns [Error::InvalidApiUrl] if `base_url` is not an absolute HTTP URL,
    /// or [Error::Upstream] if the HTTP client cannot be built.
    pub fn new(base_url: &str, session_cookie: &str, timeout: Duration) -> Result<Self, Error> {
        let parsed_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::InvalidApiUrl(base_url.to_owned()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .inspect_err(|error| tracing::error!("could not build HTTP client: {error}"))
            .map_err(|error| Error::Upstream(error.to_string()))?;

        Ok(Self {
            client,
            base_url: parsed_url,
            session_cookie: session_cookie.to_owned(),
        })
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// The URL of `segments` under the base URL.
    ///
    /// Each segment is percent-encoded, so a `/`, `?` or `#` inside one stays
    /// part of that segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();

        // Always `Ok`, the base URL was checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    fn with_session(
        &self,
        request: reqwest::RequestBuilder,
        session: &Session,
    ) -> reqwest::RequestBuilder {
        match session.token() {
            Some(token) => request.header(header::COOKIE, format!("{}={token}", self.session_cookie)),
            None => request,
        }
    }

    /// Fetch every invoice of the current user.
    pub async fn list_invoices(&self, session: &Session) -> Result<Vec<Invoice>, Error> {
        let url = self.url(&[INVOICES_SEGMENT, ""]);
        let request = self.with_session(self.client.get(url), session);
        let response = send(request).await?;

        let invoices = match decode::<InvoiceList>(response).await? {
            InvoiceList::Wrapped { faturas } => faturas,
            InvoiceList::Bare(invoices) => invoices,
        };

        tracing::debug!("fetched {} invoices", invoices.len());

        Ok(invoices)
    }

    /// Fetch a single invoice.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the upstream API does not know `invoice_id`,
    /// or [Error::InvalidId] if `invoice_id` cannot name a path segment.
    pub async fn get_invoice(&self, invoice_id: &str, session: &Session) -> Result<Invoice, Error> {
        let url = self.url(&[INVOICES_SEGMENT, path_segment(invoice_id)?]);
        let response = send(self.with_session(self.client.get(url), session)).await?;

        match decode::<SingleInvoice>(response).await? {
            SingleInvoice::Wrapped { fatura } => Ok(fatura),
            SingleInvoice::Bare(invoice) => Ok(invoice),
        }
    }

    /// Send statement files to be attached to the invoices of `user_id`.
    ///
    /// The acknowledgement from the upstream API is returned as is.
    ///
    /// # Errors
    /// Returns [Error::NoFiles] if `files` is empty, or [Error::InvalidId] if
    /// `user_id` cannot name a path segment.
    pub async fn upload_statements(
        &self,
        user_id: &str,
        files: Vec<StatementFile>,
        session: &Session,
    ) -> Result<serde_json::Value, Error> {
        let user_id = path_segment(user_id)?;

        if files.is_empty() {
            return Err(Error::NoFiles);
        }

        let mut form = Form::new();

        for file in files {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);

            if let Some(content_type) = file.content_type {
                part = part
                    .mime_str(&content_type)
                    .map_err(|error| Error::Multipart(error.to_string()))?;
            }

            form = form.part("file", part);
        }

        let url = self.url(&[INVOICES_SEGMENT, USER_SEGMENT, user_id]);
        let request = self.with_session(self.client.post(url).multipart(form), session);

        decode(send(request).await?).await
    }
}

/// Checks that `id` can be sent as a single path segment.
///
/// Blank ids and dot segments would change which resource is addressed.
fn path_segment(id: &str) -> Result<&str, Error> {
    match id.trim() {
        "" | "." | ".." => Err(Error::InvalidId(id.to_owned())),
        _ => Ok(id),
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<Response, Error> {
    let response = request
        .send()
        .await
        .inspect_err(|error| tracing::error!("upstream request failed: {error}"))
        .map_err(|error| Error::Upstream(error.to_string()))?;

    let status = response.status();

    if status.as_u16() == StatusCode::NOT_FOUND.as_u16() {
        return Err(Error::NotFound);
    }

    if !status.is_success() {
        tracing::error!("upstream responded with {status} for {}", response.url());
        return Err(Error::UpstreamStatus(status.as_u16()));
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response
        .text()
        .await
        .map_err(|error| Error::Upstream(error.to_string()))?;

    serde_json::from_str(&body)
        .inspect_err(|error| tracing::error!("could not decode upstream response: {error}"))
        .map_err(|error| Error::Decode(error.to_string()))
}
