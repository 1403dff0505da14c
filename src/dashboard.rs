//! Dashboard HTTP handlers and view rendering.
//!
//! The page is served as a shell with a loading placeholder. htmx then
//! requests the content, which fetches the invoices from the upstream API and
//! renders:
//! - A month selector over the most recent months with transactions
//! - Revenue, expense and net cards for the selected month
//! - Revenue vs expense, category and origin charts
//! - Per-bank activity, the most recent invoices and the statement upload form

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    aggregation::{
        BankActivity, Dimension, InvoiceSummary, SignFilter, aggregate, bank_activity,
        monthly_totals, period_summary, recent_invoices,
    },
    api::{ApiClient, Session},
    charts::{
        DashboardChart, breakdown_pie_chart, charts_script, charts_view, revenue_expense_chart,
    },
    endpoints::{self, format_endpoint},
    flatten::flatten_transactions,
    format::{format_brl, long_month_label, month_label},
    html::{
        BADGE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, ECHARTS_SCRIPT, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, inline_error, link,
        loading_placeholder,
    },
    invoice::Invoice,
    month::{DateRange, MonthKey, available_months, month_buckets},
    navigation::NavBar,
    ranking::{SortKey, sort_descending},
    timezone::local_today,
    view_state::{LoadState, load},
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The client for the upstream invoice API.
    pub api: ApiClient,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string of the dashboard page and content.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The selected month as `YYYY-MM`. Defaults to the newest month with transactions.
    #[serde(default)]
    pub month: Option<String>,
}

impl DashboardQuery {
    fn selected_month(&self) -> Result<Option<MonthKey>, Error> {
        match self.month.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => text.parse().map(Some),
        }
    }
}

/// Display the dashboard shell, the content is loaded by htmx.
pub async fn get_dashboard_page(Query(query): Query<DashboardQuery>) -> Result<Markup, Error> {
    let month = query.selected_month()?;

    Ok(dashboard_page_view(&dashboard_content_url(month)))
}

/// Render the dashboard content for the selected month.
///
/// Failing to fetch the invoices is not an error response, the content is
/// replaced by the error message so htmx swaps it into the page.
pub async fn get_dashboard_content(
    State(state): State<DashboardState>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let month = match query.selected_month() {
        Ok(month) => month,
        Err(error) => return inline_error(&error.to_string()).into_response(),
    };

    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return inline_error(&error.to_string()).into_response(),
    };

    let session = Session::from_jar(&jar, state.api.session_cookie());
    let load_state = load(state.api.list_invoices(&session)).await;

    match load_state {
        LoadState::Success(invoices) => dashboard_content(&invoices, month, today).into_response(),
        LoadState::Error(message) => inline_error(&message).into_response(),
        LoadState::Idle | LoadState::Loading => {
            loading_placeholder(&dashboard_content_url(month)).into_response()
        }
    }
}

fn dashboard_content_url(month: Option<MonthKey>) -> String {
    match month {
        Some(month) => format!("{}?month={month}", endpoints::DASHBOARD_CONTENT),
        None => endpoints::DASHBOARD_CONTENT.to_owned(),
    }
}

fn dashboard_page_view(content_url: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full mb-6"
            {
                h1 class="text-3xl font-bold" { "Dashboard" }
                p class="text-gray-500 dark:text-gray-400"
                {
                    "Visão geral das suas faturas e extratos"
                }
            }

            (loading_placeholder(content_url))
        }
    );

    base(
        "Dashboard",
        &[HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned())],
        &content,
    )
}

/// Renders the dashboard content for `invoices`.
///
/// `requested_month` is the month picked by the user, if any. Otherwise the
/// newest month with transactions is selected.
fn dashboard_content(invoices: &[Invoice], requested_month: Option<MonthKey>, today: Date) -> Markup {
    let records = flatten_transactions(invoices);

    if records.is_empty() {
        return dashboard_no_data_view(upload_user_id(invoices));
    }

    let mut months = available_months(&records);
    let selected = requested_month.or_else(|| months.first().copied());

    if let Some(selected) = selected
        && !months.contains(&selected)
    {
        months.insert(0, selected);
    }

    let scope = selected.map(DateRange::month);
    let summary = period_summary(&records, scope);

    let subtitle = match selected {
        Some(month) => format!("Mês: {}", month_label(month)),
        None => "Últimos 6 meses".to_owned(),
    };
    let period = match selected {
        Some(month) => long_month_label(month),
        None => "Todos os meses".to_owned(),
    };

    let buckets = month_buckets(selected, today);
    let totals = monthly_totals(&records, &buckets, SignFilter::Both);

    let categories = sort_descending(
        aggregate(&records, Dimension::Category, SignFilter::Expense, scope),
        SortKey::Expense,
    );
    let origins = sort_descending(
        aggregate(&records, Dimension::Origin, SignFilter::Revenue, scope),
        SortKey::Revenue,
    );

    let charts = [
        DashboardChart {
            id: "revenue-expense-chart",
            options: revenue_expense_chart(&totals, &subtitle).to_string(),
        },
        DashboardChart {
            id: "category-chart",
            options: breakdown_pie_chart(
                "Distribuição por Categoria",
                &period,
                &categories,
                SignFilter::Expense,
            )
            .to_string(),
        },
        DashboardChart {
            id: "origin-chart",
            options: breakdown_pie_chart(
                "Distribuição por Tipo",
                &period,
                &origins,
                SignFilter::Revenue,
            )
            .to_string(),
        },
    ];

    let banks = bank_activity(&records, scope);
    let recent = recent_invoices(invoices, selected);

    html!(
        div id="dashboard-content" class="w-full"
        {
            (month_selector(&months, selected))

            div class="grid grid-cols-1 md:grid-cols-3 gap-4 mb-6"
            {
                (metric_card("Receita Total", &format_brl(summary.revenue), "text-green-600"))
                (metric_card("Despesas Totais", &format_brl(summary.expenses.abs()), "text-red-600"))
                (metric_card(
                    "Saldo",
                    &format_brl(summary.net),
                    if summary.net < 0.0 { "text-red-600" } else { "text-green-600" },
                ))
            }

            p class="mb-4 text-sm text-gray-500 dark:text-gray-400"
            {
                (summary.transaction_count) " transações em " (period)
            }

            (charts_view(&charts))

            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                (bank_analysis_view(&banks))
                (recent_invoices_view(&recent))
            }

            @if let Some(user_id) = upload_user_id(invoices) {
                (upload_form(user_id))
            }

            (charts_script(&charts))
        }
    )
}

/// The statements are uploaded for the owner of the invoices being shown.
fn upload_user_id(invoices: &[Invoice]) -> Option<&str> {
    invoices
        .iter()
        .map(|invoice| invoice.owner_user_id.as_str())
        .find(|user_id| !user_id.is_empty())
}

fn dashboard_no_data_view(user_id: Option<&str>) -> Markup {
    html!(
        div id="dashboard-content" class="w-full flex flex-col items-center"
        {
            h2 class="text-xl font-bold" { "Nenhuma fatura encontrada." }

            p
            {
                "Os gráficos aparecerão aqui assim que suas faturas tiverem transações."
            }

            @if let Some(user_id) = user_id {
                (upload_form(user_id))
            }
        }
    )
}

fn month_selector(months: &[MonthKey], selected: Option<MonthKey>) -> Markup {
    html!(
        form
            hx-get=(endpoints::DASHBOARD_CONTENT)
            hx-target="#dashboard-content"
            hx-swap="outerHTML"
            hx-trigger="change"
            hx-target-error="#alert-container"
            class="flex items-center gap-3 mb-6"
        {
            label for="month" class=(FORM_LABEL_STYLE) { "Mês" }

            select id="month" name="month" class=(FORM_TEXT_INPUT_STYLE)
            {
                @for month in months {
                    option value=(month.to_string()) selected[Some(*month) == selected]
                    {
                        (long_month_label(*month))
                    }
                }
            }
        }
    )
}

fn metric_card(title: &str, value: &str, value_style: &str) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            span class="text-sm font-medium text-gray-500 dark:text-gray-400" { (title) }
            p class={"text-3xl font-bold " (value_style)} { (value) }
        }
    )
}

fn bank_analysis_view(banks: &[BankActivity]) -> Markup {
    html!(
        section id="bank-analysis" class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-4" { "Análise por Banco" }

            @if banks.is_empty() {
                p class="text-center py-8 text-gray-500" { "Nenhum dado disponível" }
            } @else {
                div class="space-y-4"
                {
                    @for bank in banks {
                        div class="space-y-1"
                        {
                            div class="flex justify-between text-sm font-medium"
                            {
                                span { (bank.bank) }
                                span
                                {
                                    span class="text-green-600" { (format_brl(bank.revenue)) }
                                    " / "
                                    span class="text-red-600" { (format_brl(-bank.expenses)) }
                                }
                            }

                            div class="h-2 bg-gray-200 rounded-full dark:bg-gray-700"
                            {
                                div
                                    class="h-2 bg-green-600 rounded-full"
                                    style={"width: " (bank.revenue_width) "%"}
                                {}
                            }

                            div class="h-2 bg-gray-200 rounded-full dark:bg-gray-700"
                            {
                                div
                                    class="h-2 bg-red-600 rounded-full"
                                    style={"width: " (bank.expense_width) "%"}
                                {}
                            }
                        }
                    }
                }
            }
        }
    )
}

fn recent_invoices_view(invoices: &[InvoiceSummary]) -> Markup {
    html!(
        section id="recent-invoices" class=(CARD_STYLE)
        {
            div class="flex items-center justify-between mb-4"
            {
                h3 class="text-lg font-semibold" { "Faturas Recentes" }
                (link(endpoints::INVOICES_VIEW, "Ver todos"))
            }

            @if invoices.is_empty() {
                p class="text-center py-8 text-gray-500" { "Nenhuma fatura encontrada." }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for invoice in invoices {
                        li class="flex items-center justify-between py-3"
                        {
                            div
                            {
                                a
                                    href=(format_endpoint(endpoints::INVOICE_VIEW, &invoice.id))
                                    class="font-medium hover:underline"
                                {
                                    (invoice.name)
                                }
                                p class="text-sm text-gray-500 dark:text-gray-400" { (invoice.date_label) }
                            }

                            div class="flex items-center gap-3"
                            {
                                span class="font-semibold" { (format_brl(invoice.total)) }
                                span class=(BADGE_STYLE) { "Pendente" }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn upload_form(user_id: &str) -> Markup {
    let upload_endpoint = format_endpoint(endpoints::UPLOAD_STATEMENTS, user_id);

    html!(
        section id="upload-statements" class={(CARD_STYLE) " mt-6"}
        {
            h3 class="text-lg font-semibold mb-4" { "+ Novo Extrato" }

            form
                hx-post=(upload_endpoint)
                hx-encoding="multipart/form-data"
                hx-target="#alert-container"
                hx-target-error="#alert-container"
                class="flex flex-col gap-4"
            {
                label for="statement-files" class=(FORM_LABEL_STYLE)
                {
                    "Selecione os extratos em PDF"
                }

                input
                    id="statement-files"
                    type="file"
                    name="file"
                    accept=".pdf,application/pdf"
                    multiple
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Enviar" }
            }
        }
    )
}
