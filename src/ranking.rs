//! Ranking aggregated buckets for "top N" lists.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::{
    aggregation::{AggregatedBucket, SignFilter},
    date::parse_date,
    flatten::TransactionRecord,
};

/// The value buckets are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[serde(alias = "receita")]
    Revenue,
    #[serde(alias = "despesa")]
    Expense,
    /// Revenue plus the magnitude of the expenses.
    #[serde(alias = "total")]
    Combined,
}

impl SortKey {
    pub fn value(self, bucket: &AggregatedBucket) -> f64 {
        match self {
            SortKey::Revenue => bucket.positive_total,
            SortKey::Expense => bucket.negative_total,
            SortKey::Combined => bucket.total(),
        }
    }
}

/// Sorts `buckets` from largest to smallest. Ties keep their original order.
pub fn sort_descending(mut buckets: Vec<AggregatedBucket>, key: SortKey) -> Vec<AggregatedBucket> {
    buckets.sort_by(|a, b| key.value(b).total_cmp(&key.value(a)));
    buckets
}

/// The `n` largest buckets, largest first.
///
/// The remaining buckets are dropped rather than rolled up into an "other" bucket.
pub fn top_n(buckets: Vec<AggregatedBucket>, key: SortKey, n: usize) -> Vec<AggregatedBucket> {
    let mut ranked = sort_descending(buckets, key);
    ranked.truncate(n);
    ranked
}

/// The `n` newest records whose amount matches `sign`, newest first.
///
/// Records without a parseable date go last, in document order.
pub fn most_recent<'a>(
    records: &[TransactionRecord<'a>],
    sign: SignFilter,
    n: usize,
) -> Vec<TransactionRecord<'a>> {
    let mut matching: Vec<TransactionRecord<'a>> = records
        .iter()
        .filter(|record| sign.accepts(record.transaction.amount))
        .copied()
        .collect();

    // `None` sorts before any date, so reversing puts undated records last.
    matching.sort_by_key(|record| Reverse(parse_date(record.transaction.date.as_deref())));
    matching.truncate(n);
    matching
}

#[cfg(test)]
mod tests {
    use crate::{
        aggregation::{AggregatedBucket, SignFilter},
        flatten::flatten_transactions,
        invoice::test_utils::{invoice_with_transactions, transaction},
    };

    use super::{SortKey, most_recent, sort_descending, top_n};

    fn bucket(key: &str, positive_total: f64, negative_total: f64) -> AggregatedBucket {
        AggregatedBucket {
            key: key.to_owned(),
            positive_total,
            negative_total,
            percentage: 0,
        }
    }

    fn keys(buckets: &[AggregatedBucket]) -> Vec<&str> {
        buckets.iter().map(|bucket| bucket.key.as_str()).collect()
    }

    #[test]
    fn top_five_of_six() {
        let buckets = vec![
            bucket("C", 80.0, 0.0),
            bucket("F", 50.0, 0.0),
            bucket("A", 100.0, 0.0),
            bucket("E", 60.0, 0.0),
            bucket("B", 90.0, 0.0),
            bucket("D", 70.0, 0.0),
        ];

        let top = top_n(buckets, SortKey::Revenue, 5);

        assert_eq!(keys(&top), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn ties_keep_first_occurrence_order() {
        let buckets = vec![
            bucket("primeiro", 0.0, 10.0),
            bucket("maior", 0.0, 20.0),
            bucket("segundo", 0.0, 10.0),
        ];

        let sorted = sort_descending(buckets, SortKey::Expense);

        assert_eq!(keys(&sorted), vec!["maior", "primeiro", "segundo"]);
    }

    #[test]
    fn combined_ranks_by_total_volume() {
        let buckets = vec![bucket("receita", 30.0, 0.0), bucket("misto", 20.0, 15.0)];

        let top = top_n(buckets, SortKey::Combined, 1);

        assert_eq!(keys(&top), vec!["misto"]);
    }

    #[test]
    fn n_larger_than_input_keeps_everything() {
        let buckets = vec![bucket("A", 1.0, 0.0)];

        assert_eq!(top_n(buckets, SortKey::Revenue, 10).len(), 1);
        assert!(top_n(Vec::new(), SortKey::Revenue, 3).is_empty());
    }

    #[test]
    fn most_recent_orders_by_date_and_filters_sign() {
        let invoices = vec![invoice_with_transactions(
            "Banco X",
            vec![
                transaction(10.0, "01/06/2024", "Antiga", "PIX"),
                transaction(-5.0, "20/06/2024", "Despesa", "PIX"),
                transaction(30.0, "data ruim", "Sem data", "PIX"),
                transaction(20.0, "2024-06-15", "Nova", "TED"),
                transaction(15.0, "10/06/2024", "Meio", "PIX"),
            ],
        )];
        let records = flatten_transactions(&invoices);

        let recent = most_recent(&records, SignFilter::Revenue, 3);

        let categories: Vec<&str> = recent
            .iter()
            .map(|record| record.transaction.category.as_deref().unwrap())
            .collect();
        assert_eq!(categories, vec!["Nova", "Meio", "Antiga"]);
    }

    #[test]
    fn most_recent_puts_undated_records_last() {
        let invoices = vec![invoice_with_transactions(
            "Banco X",
            vec![
                transaction(-30.0, "", "Sem data", "PIX"),
                transaction(-10.0, "01/06/2024", "Datada", "PIX"),
            ],
        )];
        let records = flatten_transactions(&invoices);

        let recent = most_recent(&records, SignFilter::Expense, 5);

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].transaction.category.as_deref(), Some("Sem data"));
    }
}
