//! Aggregates flattened transactions into chart-ready totals.
//!
//! Everything here is synchronous and infallible: records with missing or
//! malformed fields either fall back to a placeholder label or are skipped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    date::parse_date,
    flatten::{TransactionRecord, flatten_transactions, invoice_statements},
    format::invoice_date_label,
    invoice::{Invoice, non_empty},
    month::{DateRange, MonthBucket, MonthKey, month_buckets},
    ranking::{SortKey, sort_descending, top_n},
};

/// Key used for transactions without a category.
pub const OTHER_CATEGORY_LABEL: &str = "Outros";
/// Key used for transactions without an origin.
pub const OTHER_ORIGIN_LABEL: &str = "Outra Origem";
/// How many invoices the dashboard lists as recent.
pub const RECENT_INVOICES_LIMIT: usize = 5;

/// The attribute transactions are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    #[serde(alias = "mes")]
    Month,
    #[serde(alias = "categoria")]
    Category,
    #[serde(alias = "origem")]
    Origin,
    #[serde(alias = "banco")]
    Bank,
}

impl Dimension {
    /// The bucket key of `record`, or `None` if the record has no key in this
    /// dimension and should be skipped.
    pub fn key_of(self, record: &TransactionRecord<'_>) -> Option<String> {
        match self {
            Dimension::Month => parse_date(record.transaction.date.as_deref())
                .map(|date| MonthKey::from_date(date).to_string()),
            Dimension::Category => Some(
                non_empty(record.transaction.category.as_deref())
                    .unwrap_or(OTHER_CATEGORY_LABEL)
                    .to_owned(),
            ),
            Dimension::Origin => Some(
                non_empty(record.transaction.source.as_deref())
                    .unwrap_or(OTHER_ORIGIN_LABEL)
                    .to_owned(),
            ),
            Dimension::Bank => record.statement.bank_name().map(str::to_owned),
        }
    }
}

/// Which transactions take part in an aggregation, by the sign of their amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignFilter {
    #[serde(alias = "receita")]
    Revenue,
    #[serde(alias = "despesa")]
    Expense,
    #[default]
    #[serde(alias = "ambos")]
    Both,
}

impl SignFilter {
    pub fn accepts(self, amount: f64) -> bool {
        match self {
            SignFilter::Revenue => amount > 0.0,
            SignFilter::Expense => amount < 0.0,
            SignFilter::Both => amount != 0.0,
        }
    }

    /// The ranking that fits this filter when the caller gives none.
    pub fn default_sort(self) -> SortKey {
        match self {
            SignFilter::Revenue => SortKey::Revenue,
            SignFilter::Expense => SortKey::Expense,
            SignFilter::Both => SortKey::Combined,
        }
    }
}

/// The totals of one group of transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedBucket {
    pub key: String,
    /// Sum of the positive amounts.
    pub positive_total: f64,
    /// Sum of the magnitudes of the negative amounts.
    pub negative_total: f64,
    /// This bucket's share of the grand total, rounded to a whole percent.
    pub percentage: u8,
}

impl AggregatedBucket {
    fn new(key: String) -> Self {
        Self {
            key,
            positive_total: 0.0,
            negative_total: 0.0,
            percentage: 0,
        }
    }

    pub fn total(&self) -> f64 {
        self.positive_total + self.negative_total
    }
}

/// Groups `records` by `dimension`.
///
/// See [aggregate_by] for the inclusion rules.
pub fn aggregate(
    records: &[TransactionRecord<'_>],
    dimension: Dimension,
    sign: SignFilter,
    scope: Option<DateRange>,
) -> Vec<AggregatedBucket> {
    aggregate_by(records, sign, scope, |record| dimension.key_of(record))
}

/// Groups `records` by the key returned from `key_of`.
///
/// A record is counted if its amount passes `sign`, its date falls inside
/// `scope` (when given), and `key_of` returns a key for it. Zero amounts are
/// never counted. Buckets are returned in order of first occurrence, and the
/// result is empty when nothing was counted.
pub fn aggregate_by<F>(
    records: &[TransactionRecord<'_>],
    sign: SignFilter,
    scope: Option<DateRange>,
    key_of: F,
) -> Vec<AggregatedBucket>
where
    F: Fn(&TransactionRecord<'_>) -> Option<String>,
{
    let mut buckets: Vec<AggregatedBucket> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let amount = record.transaction.amount;

        if !amount.is_finite() || !sign.accepts(amount) || !in_scope(record, scope) {
            continue;
        }

        let Some(key) = key_of(record) else {
            continue;
        };

        let position = *positions.entry(key.clone()).or_insert_with(|| {
            buckets.push(AggregatedBucket::new(key));
            buckets.len() - 1
        });
        let bucket = &mut buckets[position];

        if amount > 0.0 {
            bucket.positive_total += amount;
        } else {
            bucket.negative_total += amount.abs();
        }
    }

    let grand_total: f64 = buckets.iter().map(AggregatedBucket::total).sum();

    if grand_total == 0.0 {
        return Vec::new();
    }

    for bucket in &mut buckets {
        bucket.percentage = (bucket.total() / grand_total * 100.0).round() as u8;
    }

    buckets
}

fn in_scope(record: &TransactionRecord<'_>, scope: Option<DateRange>) -> bool {
    match scope {
        Some(range) => parse_date(record.transaction.date.as_deref())
            .is_some_and(|date| range.contains(date)),
        None => true,
    }
}

/// A breakdown request as made by the views and the JSON API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationQuery {
    pub dimension: Dimension,
    pub sign: SignFilter,
    /// The selected month, if any.
    pub anchor: Option<MonthKey>,
    /// Keep only the top `limit` buckets.
    pub limit: Option<usize>,
    /// How to rank the buckets. Defaults to [SignFilter::default_sort] when a
    /// limit is set, otherwise buckets keep their first-occurrence order.
    pub sort: Option<SortKey>,
}

impl AggregationQuery {
    pub fn new(dimension: Dimension, sign: SignFilter, anchor: Option<MonthKey>) -> Self {
        Self {
            dimension,
            sign,
            anchor,
            limit: None,
            sort: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The date range the query looks at.
    ///
    /// Monthly breakdowns always cover a month window. Other breakdowns cover
    /// the selected month, or everything when no month is selected.
    pub fn scope(&self, today: Date) -> Option<DateRange> {
        match (self.dimension, self.anchor) {
            (Dimension::Month, anchor) => DateRange::covering(&month_buckets(anchor, today)),
            (_, Some(anchor)) => Some(DateRange::month(anchor)),
            (_, None) => None,
        }
    }
}

/// Runs `query` over `invoices`.
pub fn run_query(invoices: &[Invoice], query: &AggregationQuery, today: Date) -> Vec<AggregatedBucket> {
    let records = flatten_transactions(invoices);
    let buckets = aggregate(&records, query.dimension, query.sign, query.scope(today));

    match (query.limit, query.sort) {
        (Some(limit), sort) => top_n(buckets, sort.unwrap_or(query.sign.default_sort()), limit),
        (None, Some(sort)) => sort_descending(buckets, sort),
        (None, None) => buckets,
    }
}

/// Revenue and expenses of one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    pub bucket: MonthBucket,
    pub revenue: f64,
    /// Magnitude of the month's expenses.
    pub expenses: f64,
}

/// Totals per month for every bucket in `buckets`, zero-filled and in bucket order.
pub fn monthly_totals(
    records: &[TransactionRecord<'_>],
    buckets: &[MonthBucket],
    sign: SignFilter,
) -> Vec<MonthlyTotals> {
    let scope = DateRange::covering(buckets);
    let by_month: HashMap<String, AggregatedBucket> =
        aggregate(records, Dimension::Month, sign, scope)
            .into_iter()
            .map(|bucket| (bucket.key.clone(), bucket))
            .collect();

    buckets
        .iter()
        .map(|bucket| {
            let totals = by_month.get(&bucket.key.to_string());

            MonthlyTotals {
                bucket: bucket.clone(),
                revenue: totals.map_or(0.0, |totals| totals.positive_total),
                expenses: totals.map_or(0.0, |totals| totals.negative_total),
            }
        })
        .collect()
}

/// Headline figures for a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub revenue: f64,
    /// Sum of the negative amounts, so this is zero or negative.
    pub expenses: f64,
    pub net: f64,
    pub transaction_count: usize,
}

/// Sums the transactions within `range`, or all of them if `range` is `None`.
pub fn period_summary(records: &[TransactionRecord<'_>], range: Option<DateRange>) -> PeriodSummary {
    records
        .iter()
        .filter(|record| in_scope(record, range))
        .map(|record| record.transaction.amount)
        .filter(|amount| amount.is_finite())
        .fold(PeriodSummary::default(), |mut summary, amount| {
            if amount > 0.0 {
                summary.revenue += amount;
            } else {
                summary.expenses += amount;
            }
            summary.net += amount;
            summary.transaction_count += 1;
            summary
        })
}

/// One row of an invoice listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub id: String,
    pub name: String,
    /// Net of the invoice's counted transactions.
    pub total: f64,
    pub date_label: String,
}

/// Summarises each invoice in input order.
///
/// With a `month`, only invoices with at least one transaction dated in that
/// month are listed and only those transactions are summed. Without one,
/// every invoice is listed with the net of all its transactions.
pub fn invoice_summaries(invoices: &[Invoice], month: Option<MonthKey>) -> Vec<InvoiceSummary> {
    let scope = month.map(DateRange::month);

    invoices
        .iter()
        .filter_map(|invoice| {
            let amounts: Vec<f64> = invoice_statements(invoice)
                .into_iter()
                .flat_map(|statement| &statement.transactions)
                .filter(|transaction| match scope {
                    Some(range) => {
                        parse_date(transaction.date.as_deref()).is_some_and(|date| range.contains(date))
                    }
                    None => true,
                })
                .map(|transaction| transaction.amount)
                .collect();

            if scope.is_some() && amounts.is_empty() {
                return None;
            }

            Some(InvoiceSummary {
                id: invoice.id.clone(),
                name: invoice.display_name().to_owned(),
                total: amounts.iter().filter(|amount| amount.is_finite()).sum(),
                date_label: invoice_date_label(invoice),
            })
        })
        .collect()
}

/// The first [RECENT_INVOICES_LIMIT] invoices with activity in `month`.
pub fn recent_invoices(invoices: &[Invoice], month: Option<MonthKey>) -> Vec<InvoiceSummary> {
    let mut summaries = invoice_summaries(invoices, month);
    summaries.truncate(RECENT_INVOICES_LIMIT);
    summaries
}

/// Revenue and expenses of one bank, with bar widths for the bank analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankActivity {
    pub bank: String,
    pub revenue: f64,
    pub expenses: f64,
    /// `revenue` as a percentage of the largest single value across all banks.
    pub revenue_width: u8,
    /// `expenses` as a percentage of the largest single value across all banks.
    pub expense_width: u8,
}

/// Per-bank activity within `scope`, busiest bank first.
///
/// Returns an empty list when no bank has any activity.
pub fn bank_activity(records: &[TransactionRecord<'_>], scope: Option<DateRange>) -> Vec<BankActivity> {
    let buckets = sort_descending(
        aggregate(records, Dimension::Bank, SignFilter::Both, scope),
        SortKey::Combined,
    );

    let largest = buckets
        .iter()
        .flat_map(|bucket| [bucket.positive_total, bucket.negative_total])
        .fold(0.0_f64, f64::max);

    if largest <= 0.0 {
        return Vec::new();
    }

    let width = |value: f64| (value / largest * 100.0).round() as u8;

    buckets
        .into_iter()
        .map(|bucket| BankActivity {
            revenue_width: width(bucket.positive_total),
            expense_width: width(bucket.negative_total),
            revenue: bucket.positive_total,
            expenses: bucket.negative_total,
            bank: bucket.key,
        })
        .collect()
}
