//! The payments page: money received or paid, by month and by origin.

use axum::{
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    aggregation::{
        AggregatedBucket, AggregationQuery, Dimension, OTHER_ORIGIN_LABEL, SignFilter,
        monthly_totals, period_summary, run_query,
    },
    api::{ApiClient, Session},
    charts::{DashboardChart, charts_script, charts_view, payments_line_chart},
    endpoints,
    flatten::{TransactionRecord, flatten_transactions},
    format::{date_label_or_fallback, format_brl},
    html::{
        BUTTON_TOGGLE_ACTIVE_STYLE, BUTTON_TOGGLE_INACTIVE_STYLE, BUTTON_TOGGLE_STYLE, CARD_STYLE,
        ECHARTS_SCRIPT, HeadElement, PAGE_CONTAINER_STYLE, base, inline_error,
        loading_placeholder,
    },
    invoice::{Invoice, non_empty},
    month::{DateRange, MonthKey, month_buckets},
    navigation::NavBar,
    ranking::most_recent,
    timezone::local_today,
    view_state::{LoadState, load},
};

/// How many origins and recent payments are listed.
const PAYMENTS_LIST_LIMIT: usize = 5;

/// The state needed for displaying the payments page.
#[derive(Debug, Clone)]
pub struct PaymentsState {
    pub api: ApiClient,
    pub local_timezone: String,
}

impl FromRef<AppState> for PaymentsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Whether the page shows money coming in or going out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentsView {
    #[default]
    Recebidos,
    Feitos,
}

impl PaymentsView {
    fn sign(self) -> SignFilter {
        match self {
            PaymentsView::Recebidos => SignFilter::Revenue,
            PaymentsView::Feitos => SignFilter::Expense,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PaymentsView::Recebidos => "recebidos",
            PaymentsView::Feitos => "feitos",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            PaymentsView::Recebidos => "Recebimentos",
            PaymentsView::Feitos => "Despesas",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentsQuery {
    #[serde(default)]
    pub view: PaymentsView,
}

fn parse_query(query: Result<Query<PaymentsQuery>, QueryRejection>) -> Result<PaymentsView, Error> {
    query
        .map(|Query(query)| query.view)
        .map_err(|rejection| Error::InvalidQuery(rejection.body_text()))
}

/// Display the payments shell, the content is loaded by htmx.
pub async fn get_payments_page(
    query: Result<Query<PaymentsQuery>, QueryRejection>,
) -> Result<Markup, Error> {
    let view = parse_query(query)?;

    Ok(payments_page_view(view))
}

/// Render the payments content for the selected view.
pub async fn get_payments_content(
    State(state): State<PaymentsState>,
    jar: CookieJar,
    query: Result<Query<PaymentsQuery>, QueryRejection>,
) -> Response {
    let view = match parse_query(query) {
        Ok(view) => view,
        Err(error) => return inline_error(&error.to_string()).into_response(),
    };

    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return inline_error(&error.to_string()).into_response(),
    };

    let session = Session::from_jar(&jar, state.api.session_cookie());
    let load_state = load(state.api.list_invoices(&session)).await;

    match load_state {
        LoadState::Success(invoices) => payments_content(&invoices, view, today).into_response(),
        LoadState::Error(message) => inline_error(&message).into_response(),
        LoadState::Idle | LoadState::Loading => {
            loading_placeholder(&content_url(view)).into_response()
        }
    }
}

fn content_url(view: PaymentsView) -> String {
    format!("{}?view={}", endpoints::PAYMENTS_CONTENT, view.as_str())
}

fn payments_page_view(view: PaymentsView) -> Markup {
    let nav_bar = NavBar::new(endpoints::PAYMENTS_VIEW).into_html();
    let description = match view {
        PaymentsView::Recebidos => "Acompanhe todos os pagamentos recebidos",
        PaymentsView::Feitos => "Acompanhe todas as suas despesas",
    };

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex items-center justify-between w-full mb-6"
            {
                div
                {
                    h1 class="text-3xl font-bold" { (view.heading()) }
                    p class="text-gray-500 dark:text-gray-400" { (description) }
                }

                div class="flex items-center gap-2"
                {
                    @for (option, title) in [(PaymentsView::Recebidos, "Recebidos"), (PaymentsView::Feitos, "Feitos")] {
                        @let style = if option == view {
                            BUTTON_TOGGLE_ACTIVE_STYLE
                        } else {
                            BUTTON_TOGGLE_INACTIVE_STYLE
                        };

                        a
                            href={(endpoints::PAYMENTS_VIEW) "?view=" (option.as_str())}
                            class={(BUTTON_TOGGLE_STYLE) " " (style)}
                            aria-current=[(option == view).then_some("page")]
                        {
                            (title)
                        }
                    }
                }
            }

            (loading_placeholder(&content_url(view)))
        }
    );

    base(
        view.heading(),
        &[HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned())],
        &content,
    )
}

/// One row of the recent payments list.
struct RecentPayment {
    description: String,
    method: String,
    date: String,
    amount: f64,
}

impl RecentPayment {
    fn new(record: &TransactionRecord<'_>, view: PaymentsView) -> Self {
        let transaction = record.transaction;
        let fallback = match view {
            PaymentsView::Recebidos => "Recebido",
            PaymentsView::Feitos => "Despesa",
        };

        Self {
            description: non_empty(transaction.category.as_deref())
                .unwrap_or(fallback)
                .to_owned(),
            method: non_empty(transaction.source.as_deref())
                .unwrap_or(OTHER_ORIGIN_LABEL)
                .to_owned(),
            date: date_label_or_fallback(transaction.date.as_deref(), &[transaction.date.as_deref()]),
            amount: transaction.amount,
        }
    }
}

fn payments_content(invoices: &[Invoice], view: PaymentsView, today: Date) -> Markup {
    let sign = view.sign();
    let records = flatten_transactions(invoices);
    let matching: Vec<TransactionRecord<'_>> = records
        .iter()
        .filter(|record| sign.accepts(record.transaction.amount))
        .copied()
        .collect();

    let this_month = DateRange::month(MonthKey::from_date(today));
    let summary = period_summary(&matching, Some(this_month));
    let (total_title, total, count_title) = match view {
        PaymentsView::Recebidos => ("Recebido este Mês", summary.revenue, "Transações Recebidas"),
        PaymentsView::Feitos => ("Gasto este Mês", summary.expenses.abs(), "Transações Feitas"),
    };

    let buckets = month_buckets(None, today);
    let totals = monthly_totals(&records, &buckets, sign);
    let charts = [DashboardChart {
        id: "payments-chart",
        options: payments_line_chart(&totals, sign).to_string(),
    }];

    let origins = run_query(
        invoices,
        &AggregationQuery::new(Dimension::Origin, sign, None).with_limit(PAYMENTS_LIST_LIMIT),
        today,
    );

    let recent: Vec<RecentPayment> = most_recent(&records, sign, PAYMENTS_LIST_LIMIT)
        .iter()
        .map(|record| RecentPayment::new(record, view))
        .collect();

    html!(
        div id="payments-content" class="w-full"
        {
            div class="grid grid-cols-1 md:grid-cols-2 gap-4 mb-6"
            {
                div class=(CARD_STYLE)
                {
                    span class="text-sm font-medium text-gray-500 dark:text-gray-400" { (total_title) }
                    p class="text-3xl font-bold" { (format_brl(total)) }
                }

                div class=(CARD_STYLE)
                {
                    span class="text-sm font-medium text-gray-500 dark:text-gray-400" { (count_title) }
                    p class="text-3xl font-bold" { (summary.transaction_count) }
                    p class="text-sm text-gray-500 dark:text-gray-400" { "Este mês" }
                }
            }

            div class="grid grid-cols-1 lg:grid-cols-3 gap-4 mb-6"
            {
                div class="lg:col-span-2"
                {
                    (charts_view(&charts))
                }

                (origins_view(&origins, view))
            }

            (recent_payments_view(&recent, view))

            (charts_script(&charts))
        }
    )
}

fn origins_view(origins: &[AggregatedBucket], view: PaymentsView) -> Markup {
    let description = match view {
        PaymentsView::Recebidos => "De onde você recebe",
        PaymentsView::Feitos => "Para onde você paga",
    };
    let bar_style = match view {
        PaymentsView::Recebidos => "h-2 bg-green-600 rounded-full",
        PaymentsView::Feitos => "h-2 bg-red-600 rounded-full",
    };

    html!(
        section id="payment-origins" class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold" { "Origens" }
            p class="mb-4 text-sm text-gray-500 dark:text-gray-400" { (description) }

            @if origins.is_empty() {
                p class="text-center py-8 text-gray-500" { "Nenhum dado disponível" }
            } @else {
                div class="space-y-4"
                {
                    @for origin in origins {
                        div class="space-y-1"
                        {
                            div class="flex justify-between text-sm"
                            {
                                span class="font-medium" { (origin.key) }
                                span class="font-semibold" { (origin.percentage) "%" }
                            }

                            div class="h-2 bg-gray-200 rounded-full dark:bg-gray-700"
                            {
                                div class=(bar_style) style={"width: " (origin.percentage) "%"} {}
                            }

                            p class="text-xs text-right text-gray-500 dark:text-gray-400"
                            {
                                (format_brl(origin.total()))
                            }
                        }
                    }
                }
            }
        }
    )
}

fn recent_payments_view(payments: &[RecentPayment], view: PaymentsView) -> Markup {
    let (title, status) = match view {
        PaymentsView::Recebidos => ("Recebimentos Recentes", "Concluído"),
        PaymentsView::Feitos => ("Despesas Recentes", "Pago"),
    };

    html!(
        section id="recent-payments" class="w-full"
        {
            h2 class="text-xl font-semibold" { (title) }
            p class="mb-4 text-sm text-gray-500 dark:text-gray-400" { "Últimas 5 transações" }

            @if payments.is_empty() {
                div class={(CARD_STYLE) " text-center text-gray-500"}
                {
                    "Nenhuma transação encontrada"
                }
            } @else {
                ul class="space-y-3"
                {
                    @for payment in payments {
                        li class={(CARD_STYLE) " flex items-center justify-between"}
                        {
                            div
                            {
                                div class="flex items-center gap-3 mb-1"
                                {
                                    span class="font-semibold" { (payment.description) }
                                    span
                                        class="px-2.5 py-0.5 rounded-full text-xs font-medium
                                            bg-green-100 text-green-700"
                                    {
                                        (status)
                                    }
                                }
                                p class="text-sm text-gray-500 dark:text-gray-400"
                                {
                                    (payment.method) " • " (payment.date)
                                }
                            }

                            @if payment.amount > 0.0 {
                                p class="text-lg font-bold text-green-600"
                                {
                                    "+ " (format_brl(payment.amount))
                                }
                            } @else {
                                p class="text-lg font-bold text-red-600"
                                {
                                    "- " (format_brl(payment.amount.abs()))
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

#[cfg(test)]
mod tests {
    use axum::{extract::Query, http::Uri};
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::invoice::test_utils::{invoice_with_transactions, transaction};

    use super::{PaymentsQuery, PaymentsView, get_payments_page, payments_content};

    fn parse_query(uri: &str) -> Result<Query<PaymentsQuery>, axum::extract::rejection::QueryRejection> {
        Query::try_from_uri(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn view_defaults_to_received() {
        let Query(query) = parse_query("/pagamentos").unwrap();

        assert_eq!(query.view, PaymentsView::Recebidos);

        let Query(query) = parse_query("/pagamentos?view=feitos").unwrap();

        assert_eq!(query.view, PaymentsView::Feitos);
    }

    #[tokio::test]
    async fn page_rejects_unknown_view() {
        let result = get_payments_page(parse_query("/pagamentos?view=todos")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn page_marks_selected_view() {
        let page = get_payments_page(parse_query("/pagamentos?view=feitos"))
            .await
            .unwrap();
        let html = Html::parse_document(&page.into_string());

        assert!(html.errors.is_empty(), "{:?}", html.errors);
        let current = Selector::parse("a[aria-current='page'][href='/pagamentos?view=feitos']").unwrap();
        assert!(html.select(&current).next().is_some());
        let placeholder = Selector::parse("div[hx-get='/pagamentos/content?view=feitos']").unwrap();
        assert!(html.select(&placeholder).next().is_some());
    }

    fn invoices() -> Vec<crate::invoice::Invoice> {
        vec![invoice_with_transactions(
            "Banco X",
            vec![
                transaction(1000.0, "05/10/2024", "Salário", "TED"),
                transaction(250.0, "20/10/2024", "", "PIX"),
                transaction(-80.0, "21/10/2024", "Mercado", "Cartão"),
                transaction(300.0, "15/09/2024", "Freela", "PIX"),
            ],
        )]
    }

    #[test]
    fn received_view_totals_this_month() {
        let markup = payments_content(&invoices(), PaymentsView::Recebidos, date!(2024 - 10 - 28));
        let html = Html::parse_fragment(&markup.into_string());
        let text = html.root_element().text().collect::<String>();

        assert!(text.contains("Recebido este Mês"), "{text}");
        assert!(text.contains("R$ 1.250,00"), "{text}");
        assert!(text.contains("Concluído"), "{text}");
        assert!(!text.contains("Mercado"), "{text}");

        let description = Selector::parse("#recent-payments span.font-semibold").unwrap();
        let descriptions: Vec<String> = html
            .select(&description)
            .map(|element| element.text().collect())
            .collect();
        assert_eq!(descriptions, vec!["Recebido", "Salário", "Freela"]);

        let chart = Selector::parse("#payments-chart").unwrap();
        assert!(html.select(&chart).next().is_some());
    }

    #[test]
    fn made_view_lists_expenses() {
        let markup = payments_content(&invoices(), PaymentsView::Feitos, date!(2024 - 10 - 28));
        let html = Html::parse_fragment(&markup.into_string());
        let text = html.root_element().text().collect::<String>();

        assert!(text.contains("Gasto este Mês"), "{text}");
        assert!(text.contains("R$ 80,00"), "{text}");
        assert!(text.contains("Mercado"), "{text}");
        assert!(text.contains("Cartão • 21 out 2024"), "{text}");
        assert!(text.contains("Pago"), "{text}");
        assert!(!text.contains("Salário"), "{text}");
    }

    #[test]
    fn origins_are_ranked_with_percentages() {
        let markup = payments_content(&invoices(), PaymentsView::Recebidos, date!(2024 - 10 - 28));
        let html = Html::parse_fragment(&markup.into_string());
        let origin_selector = Selector::parse("#payment-origins span.font-medium").unwrap();

        let origins: Vec<String> = html
            .select(&origin_selector)
            .map(|element| element.text().collect())
            .collect();

        // TED 1000, PIX 550 of 1550
        assert_eq!(origins, vec!["TED", "PIX"]);
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("65%"), "{text}");
        assert!(text.contains("35%"), "{text}");
    }

    #[test]
    fn empty_lists_show_placeholders() {
        let markup = payments_content(&[], PaymentsView::Feitos, date!(2024 - 10 - 28));
        let text = Html::parse_fragment(&markup.into_string())
            .root_element()
            .text()
            .collect::<String>();

        assert!(text.contains("Nenhum dado disponível"));
        assert!(text.contains("Nenhuma transação encontrada"));
    }
}
