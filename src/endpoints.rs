//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/faturas/{invoice_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page with the overview charts.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The dashboard content, loaded by htmx once the page shell is shown.
pub const DASHBOARD_CONTENT: &str = "/dashboard/content";
/// The page for received and made payments.
pub const PAYMENTS_VIEW: &str = "/pagamentos";
/// The payments content, loaded by htmx once the page shell is shown.
pub const PAYMENTS_CONTENT: &str = "/pagamentos/content";
/// The page listing every invoice.
pub const INVOICES_VIEW: &str = "/faturas";
/// The page showing the statements and transactions of one invoice.
pub const INVOICE_VIEW: &str = "/faturas/{invoice_id}";

/// The route to upload statement files for a user.
pub const UPLOAD_STATEMENTS: &str = "/api/faturas/usuario/{user_id}/extratos";
/// The route to query aggregated transaction totals as JSON.
pub const AGGREGATIONS_API: &str = "/api/aggregations";
/// The route to get the month window used by the charts as JSON.
pub const MONTHS_API: &str = "/api/months";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/faturas/{invoice_id}', '{invoice_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
