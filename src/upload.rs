//! Forwarding of uploaded statement files to the upstream API.

use axum::{
    Json,
    extract::{FromRef, Multipart, Path, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use axum_htmx::HxRequest;

use crate::{
    AppState, Error,
    alert::Alert,
    api::{ApiClient, Session, StatementFile},
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// The state needed for uploading statements.
#[derive(Debug, Clone)]
pub struct UploadState {
    pub api: ApiClient,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
        }
    }
}

/// Route handler for uploading statement PDFs for `user_id`.
///
/// htmx requests get an [Alert] back, other clients get the upstream
/// acknowledgement as JSON.
pub async fn upload_statements(
    State(state): State<UploadState>,
    Path(user_id): Path<String>,
    jar: CookieJar,
    HxRequest(is_htmx): HxRequest,
    multipart: Multipart,
) -> Response {
    let session = Session::from_jar(&jar, state.api.session_cookie());

    let result = match read_statement_files(multipart).await {
        Ok(files) => {
            let count = files.len();
            state
                .api
                .upload_statements(&user_id, files, &session)
                .await
                .map(|acknowledgement| (count, acknowledgement))
        }
        Err(error) => Err(error),
    };

    match (result, is_htmx) {
        (Ok((count, _)), true) => {
            tracing::info!("forwarded {count} statement file(s) for user {user_id}");
            (
                StatusCode::CREATED,
                Alert::Success {
                    message: "Extrato enviado".to_owned(),
                    details: format!("{count} arquivo(s) enviado(s)"),
                },
            )
                .into_response()
        }
        (Ok((count, acknowledgement)), false) => {
            tracing::info!("forwarded {count} statement file(s) for user {user_id}");
            (StatusCode::CREATED, Json(acknowledgement)).into_response()
        }
        (Err(error), true) => error.into_alert_response(),
        (Err(error), false) => error.into_json_response(),
    }
}

/// Reads every non-empty file field of `multipart`.
///
/// # Errors
/// Returns [Error::NotPdf] for the first file that is not a PDF, and
/// [Error::NoFiles] if the form did not carry any file.
async fn read_statement_files(mut multipart: Multipart) -> Result<Vec<StatementFile>, Error> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .inspect_err(|error| tracing::error!("could not read multipart field: {error}"))
        .map_err(|error| Error::Multipart(error.body_text()))?
    {
        if let Some(file) = parse_multipart_field(field).await? {
            files.push(file);
        }
    }

    if files.is_empty() {
        return Err(Error::NoFiles);
    }

    Ok(files)
}

async fn parse_multipart_field(field: Field<'_>) -> Result<Option<StatementFile>, Error> {
    let file_name = match field.file_name() {
        Some(file_name) => file_name.to_owned(),
        // Plain form values are not files.
        None => return Ok(None),
    };
    let content_type = field.content_type().map(str::to_owned);

    let bytes = field
        .bytes()
        .await
        .inspect_err(|error| tracing::error!("could not read data from multipart field: {error}"))
        .map_err(|error| Error::Multipart(error.body_text()))?;

    // Browsers send an empty part for a file input with nothing selected.
    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }

    if !is_pdf(&file_name, content_type.as_deref()) {
        return Err(Error::NotPdf(file_name));
    }

    Ok(Some(StatementFile {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

fn is_pdf(file_name: &str, content_type: Option<&str>) -> bool {
    content_type == Some(PDF_CONTENT_TYPE) || file_name.to_lowercase().ends_with(".pdf")
}
