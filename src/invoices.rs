//! Pages listing every invoice and showing the statements of one invoice.

use axum::extract::{FromRef, Path, State};
use axum_extra::extract::cookie::CookieJar;
use maud::{Markup, html};

use crate::{
    AppState, Error,
    aggregation::{InvoiceSummary, invoice_summaries},
    api::{ApiClient, Session},
    endpoints::{self, format_endpoint},
    flatten::invoice_statements,
    format::{date_label_or_fallback, format_brl, invoice_date_label},
    html::{
        BADGE_STYLE, CARD_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, link,
    },
    invoice::{Invoice, Statement},
    navigation::NavBar,
};

/// Label for statements that do not name their bank.
const NO_BANK_LABEL: &str = "Sem banco";

/// The state needed for the invoice pages.
#[derive(Debug, Clone)]
pub struct InvoicesState {
    pub api: ApiClient,
}

impl FromRef<AppState> for InvoicesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
        }
    }
}

/// Display every invoice with the net of its transactions.
pub async fn get_invoices_page(
    State(state): State<InvoicesState>,
    jar: CookieJar,
) -> Result<Markup, Error> {
    let session = Session::from_jar(&jar, state.api.session_cookie());
    let invoices = state.api.list_invoices(&session).await?;

    Ok(invoices_view(&invoice_summaries(&invoices, None)))
}

/// Display the statements and transactions of one invoice.
pub async fn get_invoice_page(
    State(state): State<InvoicesState>,
    jar: CookieJar,
    Path(invoice_id): Path<String>,
) -> Result<Markup, Error> {
    let session = Session::from_jar(&jar, state.api.session_cookie());
    let invoice = state.api.get_invoice(&invoice_id, &session).await?;

    Ok(invoice_view(&invoice))
}

fn invoices_view(invoices: &[InvoiceSummary]) -> Markup {
    let nav_bar = NavBar::new(endpoints::INVOICES_VIEW).into_html();

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full mb-6"
            {
                h1 class="text-3xl font-bold" { "Faturas" }
                p class="text-gray-500 dark:text-gray-400" { "Todas as suas faturas" }
            }

            @if invoices.is_empty() {
                p class="py-8 text-gray-500" { "Nenhuma fatura encontrada." }
            } @else {
                div class="w-full overflow-x-auto rounded-lg shadow"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Fatura" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Data" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                            }
                        }

                        tbody
                        {
                            @for invoice in invoices {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (link(&format_endpoint(endpoints::INVOICE_VIEW, &invoice.id), &invoice.name))
                                    }
                                    td class=(TABLE_CELL_STYLE) { (invoice.date_label) }
                                    td class=(TABLE_CELL_STYLE) { (format_brl(invoice.total)) }
                                    td class=(TABLE_CELL_STYLE) { span class=(BADGE_STYLE) { "Pendente" } }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Faturas", &[], &content)
}

fn invoice_view(invoice: &Invoice) -> Markup {
    let nav_bar = NavBar::new(endpoints::INVOICES_VIEW).into_html();
    let statements = invoice_statements(invoice);
    let total: f64 = statements
        .iter()
        .flat_map(|statement| &statement.transactions)
        .map(|transaction| transaction.amount)
        .filter(|amount| amount.is_finite())
        .sum();

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex items-center justify-between w-full mb-6"
            {
                div
                {
                    h1 class="text-3xl font-bold" { (invoice.display_name()) }
                    p class="text-gray-500 dark:text-gray-400" { (invoice_date_label(invoice)) }
                }

                p class="text-2xl font-bold" { (format_brl(total)) }
            }

            @if statements.is_empty() {
                p class="py-8 text-gray-500" { "Nenhum extrato nesta fatura." }
            }

            @for statement in &statements {
                (statement_view(statement))
            }

            p class="w-full mt-4" { (link(endpoints::INVOICES_VIEW, "Voltar às faturas")) }
        }
    );

    base(invoice.display_name(), &[], &content)
}

fn statement_view(statement: &Statement) -> Markup {
    html!(
        section class={(CARD_STYLE) " mb-4"}
        {
            h2 class="text-lg font-semibold mb-2"
            {
                (statement.bank_name().unwrap_or(NO_BANK_LABEL))
            }

            @if statement.transactions.is_empty() {
                p class="text-gray-500" { "Nenhuma transação encontrada" }
            } @else {
                div class="overflow-x-auto"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Data" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Categoria" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Origem" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Valor" }
                            }
                        }

                        tbody
                        {
                            @for transaction in &statement.transactions {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (date_label_or_fallback(
                                            transaction.date.as_deref(),
                                            &[transaction.date.as_deref()],
                                        ))
                                    }
                                    td class=(TABLE_CELL_STYLE) { (transaction.category.as_deref().unwrap_or("")) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.source.as_deref().unwrap_or("")) }
                                    td
                                        class={(TABLE_CELL_STYLE) " " (amount_style(transaction.amount))}
                                    {
                                        (format_brl(transaction.amount))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn amount_style(amount: f64) -> &'static str {
    if amount < 0.0 {
        "text-red-600"
    } else {
        "text-green-600"
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, time::Duration};

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
    };
    use axum_extra::extract::cookie::CookieJar;
    use scraper::{Html, Selector};
    use serde_json::json;

    use crate::{Error, api::ApiClient};

    use super::{InvoicesState, get_invoice_page, get_invoices_page};

    async fn spawn_upstream() -> SocketAddr {
        let invoice = json!({
            "_id": "f1",
            "user_id": "u1",
            "fatura": "Outubro",
            "data_criacao": "2024-10-28T12:00:00Z",
            "extratos": [[
                {
                    "_id": "e1",
                    "banco": "Banco X",
                    "transferencias": [
                        {"valor": 500.0, "data": "01/10/2024", "categoria": "Serviços", "origem": "PIX"},
                        {"valor": -200.0, "data": "lixo", "categoria": "Aluguel", "origem": "Boleto"}
                    ]
                },
                {"_id": "e2", "transferencias": []}
            ]]
        });
        let list = json!({ "faturas": [invoice.clone()] });

        let app = Router::new()
            .route("/faturas/", get(move || async move { Json(list) }))
            .route(
                "/faturas/{invoice_id}",
                get(move |Path(invoice_id): Path<String>| async move {
                    if invoice_id == "f1" {
                        Json(json!({ "fatura": invoice })).into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        address
    }

    fn state_for(address: SocketAddr) -> InvoicesState {
        InvoicesState {
            api: ApiClient::new(&format!("http://{address}"), "session", Duration::from_secs(5))
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn lists_invoices_with_links() {
        let address = spawn_upstream().await;

        let page = get_invoices_page(State(state_for(address)), CookieJar::new())
            .await
            .unwrap();
        let html = Html::parse_document(&page.into_string());

        assert!(html.errors.is_empty(), "{:?}", html.errors);
        let link = Selector::parse("a[href='/faturas/f1']").unwrap();
        let link = html.select(&link).next().expect("invoice link not found");
        assert_eq!(link.text().collect::<String>(), "Outubro");

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("R$ 300,00"), "{text}");
        assert!(text.contains("28 out 2024"), "{text}");
    }

    #[tokio::test]
    async fn shows_statements_of_invoice() {
        let address = spawn_upstream().await;

        let page = get_invoice_page(
            State(state_for(address)),
            CookieJar::new(),
            Path("f1".to_owned()),
        )
        .await
        .unwrap();
        let html = Html::parse_document(&page.into_string());

        assert!(html.errors.is_empty(), "{:?}", html.errors);
        let headings: Vec<String> = html
            .select(&Selector::parse("section h2").unwrap())
            .map(|heading| heading.text().collect())
            .collect();
        assert_eq!(headings, vec!["Banco X", "Sem banco"]);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("01 out 2024"), "{text}");
        // Unparseable dates are shown as they came.
        assert!(text.contains("lixo"), "{text}");
        assert!(text.contains("-R$ 200,00"), "{text}");
    }

    #[tokio::test]
    async fn unknown_invoice_is_not_found() {
        let address = spawn_upstream().await;

        let result = get_invoice_page(
            State(state_for(address)),
            CookieJar::new(),
            Path("nada".to_owned()),
        )
        .await;

        assert_eq!(result.map(|_| ()), Err(Error::NotFound));
    }
}
