//! Ad-hoc queries over the normalized record set: headline figures, the
//! product catalog table and product search.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregate::{
    aggregate, checked_revenue, date_span, group_and_reduce, keys, reducers, Group,
};
use crate::domain::ranked::RankedResult;
use crate::domain::transaction::{Transaction, TransactionSet};
use crate::errors::ComputationError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total_revenue: Decimal,
    pub transactions: usize,
    /// Zero when there are no transactions.
    pub average_sale: Decimal,
    pub customers: usize,
    pub products: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn overview(records: &TransactionSet) -> Result<Overview, ComputationError> {
    let all: Vec<&Transaction> = records.iter().collect();
    let total_revenue = checked_revenue("all", &all)?;
    let average_sale = if all.is_empty() {
        Decimal::ZERO
    } else {
        total_revenue.checked_div(Decimal::from(all.len())).ok_or_else(|| {
            ComputationError::DivisionFailed { key: "all".to_string(), metric: "average_sale" }
        })?
    };
    let customers = records.iter().map(|record| record.customer_id().as_str()).collect::<BTreeSet<_>>();
    let products = records.iter().map(|record| record.product_name()).collect::<BTreeSet<_>>();
    let span = date_span(records);

    Ok(Overview {
        total_revenue,
        transactions: all.len(),
        average_sale,
        customers: customers.len(),
        products: products.len(),
        first_date: span.map(|(first, _)| first),
        last_date: span.map(|(_, last)| last),
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub product_name: String,
    pub total_quantity: u64,
    pub total_sales: Decimal,
    pub transactions: u64,
}

/// One row per product, by descending total sales then name.
pub fn product_catalog<'a>(
    records: impl IntoIterator<Item = &'a Transaction>,
) -> Result<Vec<ProductSummary>, ComputationError> {
    let reduced = group_and_reduce(records, keys::product, |group: &Group<'_>| -> Result<_, ComputationError> {
        Ok(ProductSummary {
            product_name: group.key.to_string(),
            total_quantity: reducers::sum_quantity(group)?,
            total_sales: reducers::sum_revenue(group)?,
            transactions: reducers::count(group)?,
        })
    })?;

    let mut catalog: Vec<ProductSummary> = reduced.into_values().collect();
    catalog.sort_by(|left, right| {
        right
            .total_sales
            .cmp(&left.total_sales)
            .then_with(|| left.product_name.cmp(&right.product_name))
    });
    Ok(catalog)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProductSearch {
    pub term: String,
    /// Distinct matching product names, ascending.
    pub matched_products: Vec<String>,
    pub transactions: usize,
    pub total_sales: Decimal,
    pub total_quantity: u64,
    pub regional_breakdown: RankedResult<Decimal>,
    pub monthly_trend: RankedResult<Decimal>,
}

impl ProductSearch {
    pub fn is_empty(&self) -> bool {
        self.matched_products.is_empty()
    }
}

/// Case-insensitive substring search over product names. A blank term
/// matches nothing.
pub fn search_products(
    records: &TransactionSet,
    term: &str,
) -> Result<ProductSearch, ComputationError> {
    let term = term.trim();
    let needle = term.to_lowercase();
    let matches: Vec<&Transaction> = if needle.is_empty() {
        Vec::new()
    } else {
        records
            .iter()
            .filter(|record| record.product_name().to_lowercase().contains(&needle))
            .collect()
    };

    let matched_products = matches
        .iter()
        .map(|record| record.product_name().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let total_quantity = reducers::sum_quantity(&Group { key: term, transactions: &matches })?;

    Ok(ProductSearch {
        term: term.to_string(),
        matched_products,
        transactions: matches.len(),
        total_sales: checked_revenue(term, &matches)?,
        total_quantity,
        regional_breakdown: aggregate(
            matches.iter().copied(),
            keys::region,
            reducers::sum_revenue,
            0,
        )?,
        monthly_trend: RankedResult::by_key(group_and_reduce(
            matches.iter().copied(),
            keys::month,
            reducers::sum_revenue,
        )?),
    })
}
