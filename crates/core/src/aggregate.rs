//! Group-by/reduce/rank primitive shared by every summary view.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::ranked::RankedResult;
use crate::domain::transaction::Transaction;
use crate::errors::ComputationError;

/// The transactions that share one grouping key.
#[derive(Clone, Copy, Debug)]
pub struct Group<'a> {
    pub key: &'a str,
    pub transactions: &'a [&'a Transaction],
}

impl Group<'_> {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Groups `records` by `group_key` and reduces each group, keyed in ascending
/// key order. Empty input gives an empty map.
pub fn group_and_reduce<'a, V, K, R>(
    records: impl IntoIterator<Item = &'a Transaction>,
    group_key: K,
    reduce: R,
) -> Result<BTreeMap<String, V>, ComputationError>
where
    K: Fn(&Transaction) -> String,
    R: Fn(&Group<'_>) -> Result<V, ComputationError>,
{
    let mut groups: BTreeMap<String, Vec<&'a Transaction>> = BTreeMap::new();
    for record in records {
        groups.entry(group_key(record)).or_default().push(record);
    }

    groups
        .iter()
        .map(|(key, transactions)| {
            let value = reduce(&Group { key, transactions })?;
            Ok((key.clone(), value))
        })
        .collect()
}

/// Ranks the reduced groups by descending metric, ties by ascending key, and
/// keeps the first `top_n` (`0` keeps all).
pub fn aggregate<'a, V, K, R>(
    records: impl IntoIterator<Item = &'a Transaction>,
    group_key: K,
    reduce: R,
    top_n: usize,
) -> Result<RankedResult<V>, ComputationError>
where
    V: Ord,
    K: Fn(&Transaction) -> String,
    R: Fn(&Group<'_>) -> Result<V, ComputationError>,
{
    let reduced = group_and_reduce(records, group_key, reduce)?;
    Ok(RankedResult::ranked(reduced, top_n))
}

pub mod keys {
    use crate::domain::transaction::Transaction;

    pub fn product(transaction: &Transaction) -> String {
        transaction.product_name().to_string()
    }

    pub fn customer(transaction: &Transaction) -> String {
        transaction.customer_id().0.clone()
    }

    pub fn region(transaction: &Transaction) -> String {
        transaction.region().to_string()
    }

    /// `YYYY-MM`, which sorts chronologically.
    pub fn month(transaction: &Transaction) -> String {
        transaction.date().format("%Y-%m").to_string()
    }

    pub fn weekday(transaction: &Transaction) -> String {
        transaction.date().format("%A").to_string()
    }
}

pub mod reducers {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::Group;
    use crate::errors::ComputationError;

    pub fn sum_quantity(group: &Group<'_>) -> Result<u64, ComputationError> {
        group.transactions.iter().try_fold(0_u64, |total, transaction| {
            total.checked_add(u64::from(transaction.quantity())).ok_or_else(|| {
                ComputationError::Overflow { key: group.key.to_string(), metric: "quantity_sum" }
            })
        })
    }

    pub fn sum_revenue(group: &Group<'_>) -> Result<Decimal, ComputationError> {
        super::checked_revenue(group.key, group.transactions)
    }

    pub fn mean_revenue(group: &Group<'_>) -> Result<Decimal, ComputationError> {
        if group.is_empty() {
            return Err(ComputationError::EmptyGroup {
                key: group.key.to_string(),
                metric: "revenue_mean",
            });
        }
        let total = sum_revenue(group)?;
        total.checked_div(Decimal::from(group.len())).ok_or_else(|| {
            ComputationError::DivisionFailed { key: group.key.to_string(), metric: "revenue_mean" }
        })
    }

    pub fn latest_date(group: &Group<'_>) -> Result<NaiveDate, ComputationError> {
        group.transactions.iter().map(|transaction| transaction.date()).max().ok_or_else(|| {
            ComputationError::EmptyGroup { key: group.key.to_string(), metric: "latest_date" }
        })
    }

    pub fn count(group: &Group<'_>) -> Result<u64, ComputationError> {
        Ok(group.len() as u64)
    }
}

pub(crate) fn checked_revenue(
    key: &str,
    transactions: &[&Transaction],
) -> Result<Decimal, ComputationError> {
    transactions.iter().try_fold(Decimal::ZERO, |total, transaction| {
        total
            .checked_add(transaction.total_price())
            .ok_or_else(|| ComputationError::Overflow { key: key.to_string(), metric: "revenue_sum" })
    })
}

/// Earliest and latest transaction dates, if any.
pub fn date_span<'a>(
    records: impl IntoIterator<Item = &'a Transaction>,
) -> Option<(NaiveDate, NaiveDate)> {
    records.into_iter().fold(None, |span, transaction| match span {
        None => Some((transaction.date(), transaction.date())),
        Some((first, last)) => Some((first.min(transaction.date()), last.max(transaction.date()))),
    })
}
