//! JSON endpoints exposing the aggregated totals behind the charts.

use axum::{
    Json,
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    AppState, Error,
    aggregation::{AggregatedBucket, AggregationQuery, Dimension, SignFilter, run_query},
    api::{ApiClient, Session},
    month::{MonthBucket, MonthKey, month_buckets},
    ranking::SortKey,
    timezone::local_today,
};

/// The state needed for the aggregation API.
#[derive(Debug, Clone)]
pub struct AggregationApiState {
    pub api: ApiClient,
    pub local_timezone: String,
}

impl FromRef<AppState> for AggregationApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string of [get_aggregations].
#[derive(Debug, Deserialize)]
pub struct AggregationParams {
    pub dimension: Dimension,
    #[serde(default)]
    pub sign: SignFilter,
    /// The selected month as `YYYY-MM`.
    pub month: Option<String>,
    pub limit: Option<usize>,
    pub sort: Option<SortKey>,
}

/// The query string of [get_months].
#[derive(Debug, Deserialize)]
pub struct MonthsParams {
    pub month: Option<String>,
}

/// Parses an optional month, treating an empty value as no month.
fn parse_month(month: Option<&str>) -> Result<Option<MonthKey>, Error> {
    match month.map(str::trim) {
        None | Some("") => Ok(None),
        Some(month) => month.parse().map(Some),
    }
}

/// Aggregate the transactions of every invoice as requested by the query string.
pub async fn get_aggregations(
    State(state): State<AggregationApiState>,
    jar: CookieJar,
    params: Result<Query<AggregationParams>, QueryRejection>,
) -> Result<Json<Vec<AggregatedBucket>>, Response> {
    let Query(params) = params
        .map_err(|rejection| Error::InvalidQuery(rejection.body_text()).into_json_response())?;
    let anchor = parse_month(params.month.as_deref()).map_err(Error::into_json_response)?;
    let today = local_today(&state.local_timezone).map_err(Error::into_json_response)?;

    let query = AggregationQuery {
        dimension: params.dimension,
        sign: params.sign,
        anchor,
        limit: params.limit,
        sort: params.sort,
    };

    let session = Session::from_jar(&jar, state.api.session_cookie());
    let invoices = state
        .api
        .list_invoices(&session)
        .await
        .map_err(Error::into_json_response)?;

    Ok(Json(run_query(&invoices, &query, today)))
}

/// The months the charts cover for the selected month, or the months up to today.
pub async fn get_months(
    State(state): State<AggregationApiState>,
    params: Result<Query<MonthsParams>, QueryRejection>,
) -> Result<Json<Vec<MonthBucket>>, Response> {
    let Query(params) = params
        .map_err(|rejection| Error::InvalidQuery(rejection.body_text()).into_json_response())?;
    let anchor = parse_month(params.month.as_deref()).map_err(Error::into_json_response)?;
    let today = local_today(&state.local_timezone).map_err(Error::into_json_response)?;

    Ok(Json(month_buckets(anchor, today)))
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, time::Duration};

    use axum::{
        Json, Router,
        body::to_bytes,
        extract::{Query, State},
        http::{StatusCode, Uri},
        routing::get,
    };
    use axum_extra::extract::cookie::CookieJar;
    use serde_json::{Value, json};

    use crate::{Error, api::ApiClient, month::MonthKey};

    use super::{AggregationApiState, get_aggregations, get_months, parse_month};

    async fn spawn_upstream() -> SocketAddr {
        let invoices = json!({"faturas": [{
            "_id": "f1",
            "user_id": "u1",
            "fatura": "Junho",
            "extratos": [[{
                "banco": "Banco X",
                "transferencias": [
                    {"valor": 500.0, "data": "01/06/2024", "categoria": "Serviços", "origem": "PIX"},
                    {"valor": -200.0, "data": "02/06/2024", "categoria": "Aluguel", "origem": "Boleto"},
                    {"valor": -50.0, "data": "03/05/2024", "categoria": "Mercado", "origem": "Cartão"}
                ]
            }]]
        }]});

        let app = Router::new().route("/faturas/", get(move || async move { Json(invoices) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        address
    }

    fn state_for(address: SocketAddr) -> AggregationApiState {
        AggregationApiState {
            api: ApiClient::new(&format!("http://{address}"), "session", Duration::from_secs(5))
                .unwrap(),
            local_timezone: "America/Sao_Paulo".to_owned(),
        }
    }

    fn query<T: serde::de::DeserializeOwned>(
        uri: &str,
    ) -> Result<Query<T>, axum::extract::rejection::QueryRejection> {
        Query::try_from_uri(&uri.parse::<Uri>().unwrap())
    }

    #[tokio::test]
    async fn aggregates_expenses_by_category_for_month() {
        let address = spawn_upstream().await;

        let Json(buckets) = get_aggregations(
            State(state_for(address)),
            CookieJar::new(),
            query("/api/aggregations?dimension=category&sign=expense&month=2024-06"),
        )
        .await
        .unwrap();

        let buckets = serde_json::to_value(buckets).unwrap();
        assert_eq!(
            buckets,
            json!([{"key": "Aluguel", "positive_total": 0.0, "negative_total": 200.0, "percentage": 100}])
        );
    }

    #[tokio::test]
    async fn accepts_portuguese_names_and_limit() {
        let address = spawn_upstream().await;

        let Json(buckets) = get_aggregations(
            State(state_for(address)),
            CookieJar::new(),
            query("/api/aggregations?dimension=origem&sign=despesa&limit=1"),
        )
        .await
        .unwrap();

        let keys: Vec<&str> = buckets.iter().map(|bucket| bucket.key.as_str()).collect();
        assert_eq!(keys, vec!["Boleto"]);
    }

    #[tokio::test]
    async fn bad_query_is_a_json_bad_request() {
        let address = spawn_upstream().await;

        let response = get_aggregations(
            State(state_for(address)),
            CookieJar::new(),
            query("/api/aggregations?dimension=cor"),
        )
        .await
        .unwrap_err();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["erro"].is_string(), "{body}");
    }

    #[tokio::test]
    async fn months_are_centred_on_selected_month() {
        let address = spawn_upstream().await;

        let Json(buckets) = get_months(State(state_for(address)), query("/api/months?month=2024-06"))
            .await
            .unwrap();

        let keys: Vec<String> = buckets.iter().map(|bucket| bucket.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["2024-03", "2024-04", "2024-05", "2024-06", "2024-07", "2024-08", "2024-09"]
        );
        assert_eq!(buckets[3].label, "jun/24");
    }

    #[tokio::test]
    async fn invalid_month_is_rejected() {
        let address = spawn_upstream().await;

        let response = get_months(State(state_for(address)), query("/api/months?month=2024-13"))
            .await
            .unwrap_err();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_month_means_no_month() {
        assert_eq!(parse_month(None), Ok(None));
        assert_eq!(parse_month(Some(" ")), Ok(None));
        assert_eq!(parse_month(Some("2024-06")), Ok(MonthKey::new(2024, 6)));
        assert_eq!(
            parse_month(Some("junho")),
            Err(Error::InvalidMonth("junho".to_owned()))
        );
    }
}
