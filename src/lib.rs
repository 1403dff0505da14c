//! Painel is a web dashboard for invoices ("faturas"), their bank statements
//! ("extratos") and the transactions in them.
//!
//! Invoices are fetched from an upstream REST API, aggregated in memory and
//! served as HTML pages with charts, plus a small JSON API for the aggregates.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod aggregation;
mod aggregation_api;
mod alert;
mod api;
mod app_state;
mod charts;
mod dashboard;
mod date;
mod endpoints;
mod flatten;
mod format;
mod html;
mod internal_server_error;
mod invoice;
mod invoices;
mod logging;
mod month;
mod navigation;
mod not_found;
mod payments;
mod ranking;
mod routing;
mod timezone;
mod upload;
mod view_state;

pub use app_state::AppState;
pub use logging::logging_middleware;
pub use routing::build_router;

use crate::{
    alert::Alert,
    internal_server_error::{InternalServerError, bad_gateway},
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
///
/// Aggregation itself never fails, these all come from talking to the
/// upstream API or from bad input.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// The upstream API could not be reached or the connection broke.
    #[error("não foi possível contatar o servidor: {0}")]
    Upstream(String),

    /// The upstream API answered with an unexpected status code.
    #[error("o servidor respondeu com o status {0}")]
    UpstreamStatus(u16),

    /// The upstream API answered with something that is not the expected JSON.
    #[error("resposta inválida do servidor: {0}")]
    Decode(String),

    /// The requested resource was not found.
    #[error("o recurso solicitado não foi encontrado")]
    NotFound,

    /// A month was not written as `YYYY-MM`.
    #[error("mês inválido \"{0}\", use o formato AAAA-MM")]
    InvalidMonth(String),

    /// The query string of a request could not be parsed.
    #[error("parâmetros inválidos: {0}")]
    InvalidQuery(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("fuso horário inválido {0}")]
    InvalidTimezone(String),

    /// The multipart form could not be read.
    #[error("não foi possível ler o formulário: {0}")]
    Multipart(String),

    /// The multipart form did not contain any statement files.
    #[error("nenhum arquivo enviado")]
    NoFiles,

    /// A statement file is not a PDF.
    #[error("o arquivo \"{0}\" não é um PDF")]
    NotPdf(String),

    /// An id taken from the request cannot be used as a path segment upstream.
    #[error("identificador inválido \"{0}\"")]
    InvalidId(String),

    /// The configured upstream API address is not an absolute HTTP URL.
    #[error("endereço da API inválido \"{0}\"")]
    InvalidApiUrl(String),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidMonth(_)
            | Error::InvalidQuery(_)
            | Error::InvalidId(_)
            | Error::Multipart(_)
            | Error::NoFiles
            | Error::NotPdf(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) | Error::UpstreamStatus(_) | Error::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::InvalidTimezone(_) | Error::InvalidApiUrl(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The response for JSON API handlers.
    fn into_json_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("API request failed: {self}");
        }

        (status, Json(json!({ "erro": self.to_string() }))).into_response()
    }

    /// The response for htmx requests, an alert swapped into the alert container.
    fn into_alert_response(self) -> Response {
        let status = self.status_code();

        let alert = match &self {
            Error::NoFiles | Error::NotPdf(_) | Error::Multipart(_) | Error::InvalidId(_) => {
                Alert::Error {
                    message: "Não foi possível enviar o extrato".to_owned(),
                    details: self.to_string(),
                }
            }
            Error::Upstream(_) | Error::UpstreamStatus(_) | Error::Decode(_) => Alert::Error {
                message: "Falha ao falar com o servidor".to_owned(),
                details: self.to_string(),
            },
            _ => Alert::Error {
                message: "Algo deu errado".to_owned(),
                details: "Ocorreu um erro inesperado, verifique os logs do servidor.".to_owned(),
            },
        };

        (status, alert).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidMonth(_)
            | Error::InvalidQuery(_)
            | Error::InvalidId(_)
            | Error::Multipart(_)
            | Error::NoFiles
            | Error::NotPdf(_) => self.into_json_response(),
            Error::Upstream(_) | Error::UpstreamStatus(_) | Error::Decode(_) => {
                tracing::error!("upstream request failed: {self}");
                bad_gateway(&self.to_string())
            }
            Error::InvalidTimezone(timezone) => InternalServerError {
                description: "Fuso horário inválido",
                fix: &format!(
                    "Não foi possível obter o fuso horário \"{timezone}\". Verifique a \
                    configuração do servidor e use um nome canônico, como America/Sao_Paulo."
                ),
            }
            .into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                InternalServerError::default().into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn errors_map_to_status_codes() {
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::InvalidMonth("2024-13".to_owned()), StatusCode::BAD_REQUEST),
            (Error::InvalidQuery("x".to_owned()), StatusCode::BAD_REQUEST),
            (Error::UpstreamStatus(500), StatusCode::BAD_GATEWAY),
            (Error::Upstream("recusado".to_owned()), StatusCode::BAD_GATEWAY),
            (Error::Decode("eof".to_owned()), StatusCode::BAD_GATEWAY),
            (Error::InvalidTimezone("Lua/Base".to_owned()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::InvalidId("..".to_owned()), StatusCode::BAD_REQUEST),
            (Error::InvalidApiUrl("api".to_owned()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want) in cases {
            let description = error.to_string();
            let response = error.into_response();

            assert_eq!(response.status(), want, "{description}");
        }
    }

    #[test]
    fn alert_responses_keep_status() {
        assert_eq!(
            Error::NoFiles.into_alert_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::UpstreamStatus(503).into_alert_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn json_responses_carry_message() {
        let response = Error::InvalidQuery("sign".to_owned()).into_json_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
