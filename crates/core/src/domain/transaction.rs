use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("quantity must be a positive integer")]
    ZeroQuantity,
    #[error("price per unit `{0}` is negative")]
    NegativePrice(Decimal),
    #[error("total price overflows for quantity {quantity} at {price_per_unit}")]
    TotalOverflow { quantity: u32, price_per_unit: Decimal },
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),
}

/// One purchased product line. Fields are read-only once built so that
/// `total_price` always equals `quantity * price_per_unit`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Transaction {
    transaction_id: TransactionId,
    customer_id: CustomerId,
    product_name: String,
    region: String,
    date: NaiveDate,
    quantity: u32,
    price_per_unit: Decimal,
    total_price: Decimal,
}

impl Transaction {
    pub fn new(
        transaction_id: impl Into<String>,
        customer_id: impl Into<String>,
        product_name: impl Into<String>,
        region: impl Into<String>,
        date: NaiveDate,
        quantity: u32,
        price_per_unit: Decimal,
    ) -> Result<Self, TransactionError> {
        let transaction_id = transaction_id.into();
        let customer_id = customer_id.into();
        let product_name = product_name.into();
        let region = region.into();

        for (name, value) in [
            ("transaction_id", &transaction_id),
            ("customer_id", &customer_id),
            ("product_name", &product_name),
            ("region", &region),
        ] {
            if value.trim().is_empty() {
                return Err(TransactionError::EmptyField(name));
            }
        }
        if quantity == 0 {
            return Err(TransactionError::ZeroQuantity);
        }
        if price_per_unit.is_sign_negative() && !price_per_unit.is_zero() {
            return Err(TransactionError::NegativePrice(price_per_unit));
        }
        let total_price = Decimal::from(quantity)
            .checked_mul(price_per_unit)
            .ok_or(TransactionError::TotalOverflow { quantity, price_per_unit })?;

        Ok(Self {
            transaction_id: TransactionId(transaction_id),
            customer_id: CustomerId(customer_id),
            product_name,
            region,
            date,
            quantity,
            price_per_unit,
            total_price,
        })
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price_per_unit(&self) -> Decimal {
        self.price_per_unit
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }
}

/// The normalized record set. Owned by the caller and passed by reference to
/// every analysis; it never changes after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransactionSet {
    records: Vec<Transaction>,
}

impl TransactionSet {
    /// Builds a set keeping the first occurrence of field-wise identical
    /// transactions. Returns the set and the number of duplicates removed.
    pub fn deduplicated(transactions: impl IntoIterator<Item = Transaction>) -> (Self, usize) {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut duplicates = 0;

        for transaction in transactions {
            if seen.contains(&transaction) {
                duplicates += 1;
                continue;
            }
            seen.insert(transaction.clone());
            records.push(transaction);
        }

        (Self { records }, duplicates)
    }

    /// Caller guarantees `records` holds no duplicates.
    pub(crate) fn from_unique(records: Vec<Transaction>) -> Self {
        Self { records }
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Transaction> for TransactionSet {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self::deduplicated(iter).0
    }
}

impl<'a> IntoIterator for &'a TransactionSet {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{Transaction, TransactionError, TransactionSet};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date")
    }

    fn price(raw: &str) -> Decimal {
        Decimal::from_str(raw).expect("valid decimal")
    }

    #[test]
    fn total_price_is_exact_product_of_quantity_and_unit_price() {
        let transaction =
            Transaction::new("T1", "C1", "Milk", "North", date(), 3, price("0.10")).expect("valid");
        assert_eq!(transaction.total_price(), price("0.30"));
    }

    #[test]
    fn rejects_zero_quantity_and_negative_price() {
        assert_eq!(
            Transaction::new("T1", "C1", "Milk", "North", date(), 0, price("1.00")),
            Err(TransactionError::ZeroQuantity)
        );
        assert!(matches!(
            Transaction::new("T1", "C1", "Milk", "North", date(), 1, price("-1.00")),
            Err(TransactionError::NegativePrice(_))
        ));
    }

    #[test]
    fn free_items_are_allowed() {
        let transaction =
            Transaction::new("T1", "C1", "Sample", "North", date(), 2, Decimal::ZERO)
                .expect("zero price is valid");
        assert_eq!(transaction.total_price(), Decimal::ZERO);
    }

    #[test]
    fn rejects_blank_identifiers() {
        assert_eq!(
            Transaction::new("T1", "  ", "Milk", "North", date(), 1, price("1")),
            Err(TransactionError::EmptyField("customer_id"))
        );
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let result = Transaction::new("T1", "C1", "Gold", "North", date(), u32::MAX, Decimal::MAX);
        assert!(matches!(result, Err(TransactionError::TotalOverflow { .. })));
    }

    #[test]
    fn collected_records_keep_total_in_step_with_quantity_and_price() {
        let single =
            Transaction::new("T1", "C1", "Milk", "North", date(), 1, price("2.00")).expect("valid");
        let bulk =
            Transaction::new("T1", "C1", "Milk", "North", date(), 50, price("2.00")).expect("valid");

        let set: TransactionSet = vec![single, bulk].into_iter().collect();

        assert_eq!(set.len(), 2, "records differing only in quantity are distinct");
        for record in &set {
            assert_eq!(
                record.total_price(),
                Decimal::from(record.quantity()) * record.price_per_unit()
            );
        }
        assert_eq!(set.as_slice()[1].total_price(), price("100.00"));
    }

    #[test]
    fn deduplicated_keeps_first_occurrence_and_counts_the_rest() {
        let first =
            Transaction::new("T1", "C1", "Milk", "North", date(), 1, price("2.50")).expect("valid");
        let other =
            Transaction::new("T2", "C1", "Milk", "North", date(), 1, price("2.50")).expect("valid");
        // 2.5 and 2.50 are the same amount.
        let same_amount =
            Transaction::new("T1", "C1", "Milk", "North", date(), 1, price("2.5")).expect("valid");

        let (set, duplicates) =
            TransactionSet::deduplicated(vec![first.clone(), other, same_amount, first]);

        assert_eq!(set.len(), 2);
        assert_eq!(duplicates, 2);
        assert_eq!(set.as_slice()[0].transaction_id().0, "T1");
    }
}
