//! Chart generation and rendering for the dashboard and payments views.
//!
//! Charts are built as ECharts options with charming and initialised by a
//! script that ships with the htmx partial that contains them:
//! - **Receita vs Despesas**: revenue and expenses per month as bars
//! - **Breakdowns**: pie charts of an aggregated dimension (category, origin)
//! - **Payments**: received or paid amounts per month as a line

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, ItemStyle, JsFunction, Tooltip, Trigger,
    },
    series::{Line, Pie, bar::Bar},
};
use maud::{Markup, PreEscaped, html};

use crate::aggregation::{AggregatedBucket, MonthlyTotals, SignFilter};

const REVENUE_COLOR: &str = "#16a34a";
const EXPENSE_COLOR: &str = "#dc2626";

/// A chart with its HTML container ID and ECharts configuration.
pub struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JavaScript object literal
    pub options: String,
}

/// Renders the HTML containers for `charts` in a responsive grid.
pub fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded bg-white dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates the script that initialises `charts`.
///
/// The script runs as soon as it is inserted, so it works both on a full
/// page load and when htmx swaps in a partial. Any chart already attached to
/// a container is disposed first.
pub fn charts_script(charts: &[DashboardChart]) -> Markup {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    if (!chartDom) {{ return; }}
                    const previous = echarts.getInstanceByDom(chartDom);
                    if (previous) {{ previous.dispose(); }}
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', () => chart.resize());

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id,
                // Category names come from user data and must not close the script tag.
                chart.options.replace("</", "<\\/")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    html!(script { (PreEscaped(script_content)) })
}

/// Revenue and expense bars for each month, expenses shown as magnitudes.
pub fn revenue_expense_chart(monthly_totals: &[MonthlyTotals], subtitle: &str) -> Chart {
    let labels: Vec<String> = monthly_totals
        .iter()
        .map(|totals| totals.bucket.label.clone())
        .collect();
    let revenue: Vec<f64> = monthly_totals.iter().map(|totals| totals.revenue).collect();
    let expenses: Vec<f64> = monthly_totals
        .iter()
        .map(|totals| totals.expenses)
        .collect();

    Chart::new()
        .title(Title::new().text("Receita vs Despesas").subtext(subtitle))
        .tooltip(currency_tooltip())
        .legend(Legend::new().right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name("Receita")
                .item_style(ItemStyle::new().color(REVENUE_COLOR))
                .data(revenue),
        )
        .series(
            Bar::new()
                .name("Despesas")
                .item_style(ItemStyle::new().color(EXPENSE_COLOR))
                .data(expenses),
        )
}

/// A pie chart of `buckets`, using the totals that match `sign`.
pub fn breakdown_pie_chart(
    title: &str,
    subtitle: &str,
    buckets: &[AggregatedBucket],
    sign: SignFilter,
) -> Chart {
    let data: Vec<(f64, &str)> = buckets
        .iter()
        .map(|bucket| {
            let value = match sign {
                SignFilter::Revenue => bucket.positive_total,
                SignFilter::Expense => bucket.negative_total,
                SignFilter::Both => bucket.total(),
            };

            (round_cents(value), bucket.key.as_str())
        })
        .collect();

    Chart::new()
        .title(Title::new().text(title).subtext(subtitle))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("0%"))
        .series(Pie::new().name(title).radius("60%").data(data))
}

/// A line of the monthly received (`SignFilter::Revenue`) or paid amounts.
pub fn payments_line_chart(monthly_totals: &[MonthlyTotals], sign: SignFilter) -> Chart {
    let (name, color) = match sign {
        SignFilter::Expense => ("Evolução de Despesas", EXPENSE_COLOR),
        SignFilter::Revenue | SignFilter::Both => ("Evolução de Recebimentos", REVENUE_COLOR),
    };

    let labels: Vec<String> = monthly_totals
        .iter()
        .map(|totals| totals.bucket.label.clone())
        .collect();
    let values: Vec<f64> = monthly_totals
        .iter()
        .map(|totals| match sign {
            SignFilter::Expense => totals.expenses,
            SignFilter::Revenue => totals.revenue,
            SignFilter::Both => totals.revenue + totals.expenses,
        })
        .map(round_cents)
        .collect();

    Chart::new()
        .title(Title::new().text(name).subtext("Últimos 6 meses"))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Line::new()
                .name(name)
                .item_style(ItemStyle::new().color(color))
                .data(values),
        )
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('pt-BR', {
              style: 'currency',
              currency: 'BRL'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        aggregation::{AggregatedBucket, SignFilter, monthly_totals},
        flatten::flatten_transactions,
        invoice::test_utils::{invoice_with_transactions, transaction},
        month::{MonthKey, month_buckets},
    };

    use super::{
        DashboardChart, breakdown_pie_chart, charts_script, charts_view, payments_line_chart,
        revenue_expense_chart,
    };

    #[test]
    fn revenue_expense_chart_has_month_labels_and_series() {
        let invoices = vec![invoice_with_transactions(
            "Banco X",
            vec![
                transaction(500.0, "01/06/2024", "Serviços", "PIX"),
                transaction(-200.0, "02/06/2024", "Aluguel", "Boleto"),
            ],
        )];
        let records = flatten_transactions(&invoices);
        let buckets = month_buckets(MonthKey::new(2024, 6), date!(2024 - 10 - 01));
        let totals = monthly_totals(&records, &buckets, SignFilter::Both);

        let options = revenue_expense_chart(&totals, "Mês: jun/24").to_string();

        assert!(options.contains("Receita vs Despesas"));
        assert!(options.contains("jun/24"));
        assert!(options.contains("mar/24"));
        assert!(options.contains("Despesas"));
        assert!(options.contains("500"));
        assert!(options.contains("200"));
    }

    #[test]
    fn pie_chart_uses_totals_for_sign() {
        let buckets = vec![AggregatedBucket {
            key: "Aluguel".to_owned(),
            positive_total: 0.0,
            negative_total: 200.0,
            percentage: 100,
        }];

        let options =
            breakdown_pie_chart("Distribuição por Categoria", "jun 2024", &buckets, SignFilter::Expense)
                .to_string();

        assert!(options.contains("Aluguel"));
        assert!(options.contains("200"));
    }

    #[test]
    fn payments_chart_is_titled_for_sign() {
        let buckets = month_buckets(None, date!(2024 - 06 - 15));
        let totals = monthly_totals(&[], &buckets, SignFilter::Expense);

        let options = payments_line_chart(&totals, SignFilter::Expense).to_string();

        assert!(options.contains("Evolução de Despesas"));
        assert!(options.contains("jan/24"));
        assert!(options.contains("jun/24"));
    }

    #[test]
    fn view_renders_one_container_per_chart() {
        let charts = [
            DashboardChart {
                id: "a-chart",
                options: "{}".to_owned(),
            },
            DashboardChart {
                id: "b-chart",
                options: "{}".to_owned(),
            },
        ];

        let html = Html::parse_fragment(&charts_view(&charts).into_string());

        for id in ["#a-chart", "#b-chart"] {
            let selector = Selector::parse(id).unwrap();
            assert!(html.select(&selector).next().is_some(), "{id} not found");
        }
    }

    #[test]
    fn script_cannot_be_closed_by_chart_data() {
        let charts = [DashboardChart {
            id: "a-chart",
            options: r#"{"name": "</script><b>"}"#.to_owned(),
        }];

        let script = charts_script(&charts).into_string();

        assert_eq!(script.matches("</script>").count(), 1);
        assert!(script.contains(r#"<\/script><b>"#));
    }
}
