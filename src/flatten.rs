//! Flattens nested invoice documents into a flat list of transactions.

use crate::invoice::{Invoice, Statement, StatementNode, Transaction};

/// How many levels of array nesting are unwrapped around statements.
///
/// Groups nested deeper than this are ignored.
const MAX_STATEMENT_NESTING: usize = 2;

/// A transaction together with the statement and invoice it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionRecord<'a> {
    pub transaction: &'a Transaction,
    pub statement: &'a Statement,
    pub invoice: &'a Invoice,
}

/// The statements of `invoice` in document order, with the nesting removed.
pub fn invoice_statements(invoice: &Invoice) -> Vec<&Statement> {
    let mut statements = Vec::new();
    collect_statements(&invoice.statements, 0, &mut statements);
    statements
}

fn collect_statements<'a>(
    nodes: &'a [StatementNode],
    depth: usize,
    statements: &mut Vec<&'a Statement>,
) {
    for node in nodes {
        match node {
            StatementNode::Statement(statement) => statements.push(statement),
            StatementNode::Group(children) if depth < MAX_STATEMENT_NESTING => {
                collect_statements(children, depth + 1, statements)
            }
            StatementNode::Group(_) => {
                tracing::debug!("ignoring statements nested deeper than {MAX_STATEMENT_NESTING}")
            }
            StatementNode::Missing => {}
        }
    }
}

/// Every transaction of every invoice, in document order.
///
/// Statements without a bank name are included; it is up to bank-keyed
/// aggregations to skip them.
pub fn flatten_transactions(invoices: &[Invoice]) -> Vec<TransactionRecord<'_>> {
    invoices
        .iter()
        .flat_map(|invoice| {
            invoice_statements(invoice)
                .into_iter()
                .flat_map(move |statement| {
                    statement
                        .transactions
                        .iter()
                        .map(move |transaction| TransactionRecord {
                            transaction,
                            statement,
                            invoice,
                        })
                })
        })
        .collect()
}
