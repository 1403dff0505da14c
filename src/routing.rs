//! Application router configuration with the page, htmx partial and JSON API routes.

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState,
    aggregation_api::{get_aggregations, get_months},
    dashboard::{get_dashboard_content, get_dashboard_page},
    endpoints,
    invoices::{get_invoice_page, get_invoices_page},
    not_found::get_404_not_found,
    payments::{get_payments_content, get_payments_page},
    upload::upload_statements,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::DASHBOARD_CONTENT, get(get_dashboard_content))
        .route(endpoints::PAYMENTS_VIEW, get(get_payments_page))
        .route(endpoints::PAYMENTS_CONTENT, get(get_payments_content))
        .route(endpoints::INVOICES_VIEW, get(get_invoices_page))
        .route(endpoints::INVOICE_VIEW, get(get_invoice_page));

    let api_routes = Router::new()
        .route(endpoints::UPLOAD_STATEMENTS, post(upload_statements))
        .route(endpoints::AGGREGATIONS_API, get(get_aggregations))
        .route(endpoints::MONTHS_API, get(get_months));

    page_routes
        .merge(api_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod router_tests {
    use std::{net::SocketAddr, time::Duration};

    use axum::{Json, Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints};

    use super::build_router;

    async fn spawn_upstream() -> SocketAddr {
        let invoices = json!({"faturas": [{
            "_id": "f1",
            "user_id": "u1",
            "fatura": "Junho",
            "extratos": [[{
                "banco": "Banco X",
                "transferencias": [
                    {"valor": 500.0, "data": "01/06/2024", "categoria": "Serviços", "origem": "PIX"},
                    {"valor": -200.0, "data": "02/06/2024", "categoria": "Aluguel", "origem": "Boleto"}
                ]
            }]]
        }]});

        let app = Router::new().route("/faturas/", get(move || async move { Json(invoices) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        address
    }

    async fn get_test_server() -> TestServer {
        let address = spawn_upstream().await;
        let state = AppState::new(
            &format!("http://{address}"),
            "America/Sao_Paulo",
            "session",
            Duration::from_secs(5),
        )
        .unwrap();

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn pages_are_served() {
        let server = get_test_server().await;

        for path in [
            endpoints::DASHBOARD_VIEW,
            endpoints::PAYMENTS_VIEW,
            endpoints::INVOICES_VIEW,
        ] {
            let response = server.get(path).await;
            response.assert_status_ok();
            assert!(response.text().contains("- Painel</title>"), "{path} is not a page");
        }
    }

    #[tokio::test]
    async fn content_partials_render_without_errors() {
        let server = get_test_server().await;

        for path in [endpoints::DASHBOARD_CONTENT, endpoints::PAYMENTS_CONTENT] {
            let response = server.get(path).await;
            response.assert_status_ok();
            assert!(!response.text().contains("Erro:"), "{path} rendered an error");
        }
    }

    #[tokio::test]
    async fn aggregation_api_returns_json() {
        let server = get_test_server().await;

        let response = server
            .get(endpoints::AGGREGATIONS_API)
            .add_query_param("dimension", "category")
            .add_query_param("sign", "expense")
            .add_query_param("month", "2024-06")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body[0]["key"], "Aluguel");
        assert_eq!(body[0]["percentage"], 100);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let server = get_test_server().await;

        server
            .get("/nao-existe")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
