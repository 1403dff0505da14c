//! Error pages for failures on the server or the upstream API.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

pub struct InternalServerError<'a> {
    pub description: &'a str,
    pub fix: &'a str,
}

impl Default for InternalServerError<'_> {
    fn default() -> Self {
        Self {
            description: "Desculpe, algo deu errado.",
            fix: "Tente novamente mais tarde ou verifique os logs do servidor.",
        }
    }
}

impl InternalServerError<'_> {
    pub fn into_html(self) -> Html<String> {
        Html(error_view("Erro interno", "500", self.description, self.fix).into_string())
    }
}

impl IntoResponse for InternalServerError<'_> {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.into_html()).into_response()
    }
}

/// The page shown when the upstream API failed, with `details` from the error.
pub fn bad_gateway(details: &str) -> Response {
    let page = error_view(
        "Servidor indisponível",
        "502",
        "Não foi possível carregar os dados",
        details,
    );

    (StatusCode::BAD_GATEWAY, Html(page.into_string())).into_response()
}
