//! The invoice documents returned by the upstream REST API.
//!
//! The upstream JSON uses Portuguese field names and is loosely shaped: any
//! field may be missing or `null`, amounts are sometimes strings, and the
//! statements of an invoice are nested inside extra arrays. The types here
//! absorb all of that so the rest of the crate can treat every field as
//! present.

use serde::{Deserialize, Deserializer};

/// Label used for invoices without any of the name fields.
pub const DEFAULT_INVOICE_NAME: &str = "Fatura";

/// One signed money movement ("transferência").
///
/// Positive amounts are revenue, negative amounts are expenses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Transaction {
    #[serde(rename = "valor", default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    /// The date as written in the statement, either `DD/MM/YYYY` or ISO 8601.
    #[serde(rename = "data", default)]
    pub date: Option<String>,
    /// Where the money came from or went to, e.g. "PIX".
    #[serde(rename = "origem", default)]
    pub source: Option<String>,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
}

/// A bank statement ("extrato") belonging to an invoice.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Statement {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "banco", default)]
    pub bank_name: Option<String>,
    #[serde(rename = "transferencias", default, deserialize_with = "skip_nulls")]
    pub transactions: Vec<Transaction>,
}

impl Statement {
    /// The bank name, or `None` if it is missing or blank.
    pub fn bank_name(&self) -> Option<&str> {
        non_empty(self.bank_name.as_deref())
    }
}

/// An entry of an invoice's statement collection.
///
/// Upstream wraps statements in one or two levels of arrays, and sometimes
/// leaves `null` holes in them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StatementNode {
    Group(Vec<StatementNode>),
    Statement(Statement),
    Missing,
}

/// A top-level invoice ("fatura") grouping one or more statements.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "user_id", default)]
    pub owner_user_id: String,
    #[serde(rename = "fatura", default)]
    pub name: Option<String>,
    #[serde(rename = "fatura2", default)]
    pub alternate_name: Option<String>,
    #[serde(rename = "fatura3", default)]
    pub second_alternate_name: Option<String>,
    /// When the invoice was created, usually an ISO 8601 timestamp.
    #[serde(rename = "data_criacao", default)]
    pub created_at: Option<String>,
    /// A pre-formatted reference period such as "Março/2024".
    #[serde(rename = "mes_referencia", default)]
    pub reference_month: Option<String>,
    #[serde(rename = "extratos", default, deserialize_with = "skip_nulls")]
    pub statements: Vec<StatementNode>,
}

impl Invoice {
    /// The first non-empty name field, falling back to [DEFAULT_INVOICE_NAME].
    pub fn display_name(&self) -> &str {
        [
            &self.name,
            &self.alternate_name,
            &self.second_alternate_name,
        ]
        .into_iter()
        .find_map(|name| non_empty(name.as_deref()))
        .unwrap_or(DEFAULT_INVOICE_NAME)
    }
}

/// `text` trimmed, or `None` if it is missing or blank.
pub(crate) fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// Deserializes a list where both the list and its items may be `null`.
fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;

    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

/// Reads an amount written as a number, a numeric string, or `null` (zero).
fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = match Option::<RawAmount>::deserialize(deserializer)? {
        Some(RawAmount::Number(number)) => number,
        Some(RawAmount::Text(text)) => {
            let text = text.trim();
            let normalized = if text.contains(',') {
                text.replace('.', "").replace(',', ".")
            } else {
                text.to_owned()
            };

            normalized.parse().unwrap_or_else(|_| {
                tracing::debug!("could not parse amount {text:?}, treating it as zero");
                0.0
            })
        }
        None => 0.0,
    };

    Ok(amount)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::{Invoice, Statement, StatementNode, Transaction};

    pub fn transaction(amount: f64, date: &str, category: &str, source: &str) -> Transaction {
        Transaction {
            amount,
            date: Some(date.to_owned()),
            source: Some(source.to_owned()),
            category: Some(category.to_owned()),
        }
    }

    pub fn statement(bank_name: &str, transactions: Vec<Transaction>) -> Statement {
        Statement {
            id: format!("extrato-{bank_name}"),
            bank_name: Some(bank_name.to_owned()),
            transactions,
        }
    }

    /// An invoice whose statements are nested the way upstream sends them.
    pub fn invoice(id: &str, statements: Vec<Statement>) -> Invoice {
        Invoice {
            id: id.to_owned(),
            owner_user_id: "user-1".to_owned(),
            name: Some(format!("Fatura {id}")),
            statements: vec![StatementNode::Group(
                statements.into_iter().map(StatementNode::Statement).collect(),
            )],
            ..Default::default()
        }
    }

    pub fn invoice_with_transactions(bank_name: &str, transactions: Vec<Transaction>) -> Invoice {
        invoice("fatura-1", vec![statement(bank_name, transactions)])
    }
}
