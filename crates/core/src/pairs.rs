//! Co-purchase pair mining.
//!
//! Every customer contributes each unordered pair of distinct products they
//! bought exactly once. Work per customer is `C(k, 2)` for `k` distinct
//! products, so customers above `max_distinct_products` are skipped and
//! reported instead of mined.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_DISTINCT_PRODUCTS;
use crate::domain::pair::ProductPair;
use crate::domain::transaction::Transaction;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PairMiningStats {
    pub customers_seen: usize,
    pub customers_skipped: usize,
    /// Skipped customer ids, ascending.
    pub skipped_customers: Vec<String>,
    pub pair_increments: u64,
    pub distinct_pairs: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PairMining {
    pub pairs: Vec<ProductPair>,
    pub stats: PairMiningStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairMiner {
    max_distinct_products: usize,
}

impl Default for PairMiner {
    fn default() -> Self {
        Self { max_distinct_products: DEFAULT_MAX_DISTINCT_PRODUCTS }
    }
}

impl PairMiner {
    /// `0` disables the per-customer cap.
    pub fn new(max_distinct_products: usize) -> Self {
        Self { max_distinct_products }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn max_distinct_products(&self) -> usize {
        self.max_distinct_products
    }

    fn exceeds_cap(&self, distinct_products: usize) -> bool {
        self.max_distinct_products > 0 && distinct_products > self.max_distinct_products
    }

    pub fn mine<'a>(
        &self,
        records: impl IntoIterator<Item = &'a Transaction>,
        top_n: usize,
    ) -> PairMining {
        let mut baskets: BTreeMap<&'a str, BTreeSet<&'a str>> = BTreeMap::new();
        for record in records {
            baskets
                .entry(record.customer_id().as_str())
                .or_default()
                .insert(record.product_name());
        }

        let mut stats = PairMiningStats { customers_seen: baskets.len(), ..Default::default() };
        let mut counter: HashMap<(&'a str, &'a str), u64> = HashMap::new();

        for (customer, products) in &baskets {
            if self.exceeds_cap(products.len()) {
                warn!(
                    event_name = "engine.pairs.customer_skipped",
                    customer_id = %customer,
                    distinct_products = products.len(),
                    max_distinct_products = self.max_distinct_products,
                    "customer exceeds distinct product cap, skipped in pair mining"
                );
                stats.customers_skipped += 1;
                stats.skipped_customers.push((*customer).to_string());
                continue;
            }

            // BTreeSet iteration is sorted, so (left, right) is already canonical.
            let products: Vec<&'a str> = products.iter().copied().collect();
            for (index, left) in products.iter().enumerate() {
                for right in &products[index + 1..] {
                    *counter.entry((*left, *right)).or_insert(0) += 1;
                    stats.pair_increments += 1;
                }
            }
        }

        stats.distinct_pairs = counter.len();
        let mut pairs: Vec<ProductPair> = counter
            .into_iter()
            .map(|((left, right), frequency)| ProductPair::new(left, right, frequency))
            .collect();
        pairs.sort_by(|left, right| {
            right.frequency.cmp(&left.frequency).then_with(|| left.label.cmp(&right.label))
        });
        if top_n > 0 {
            pairs.truncate(top_n);
        }

        debug!(
            event_name = "engine.pairs.completed",
            customers_seen = stats.customers_seen,
            customers_skipped = stats.customers_skipped,
            pair_increments = stats.pair_increments,
            distinct_pairs = stats.distinct_pairs,
            "pair mining completed"
        );

        PairMining { pairs, stats }
    }
}

/// Mines pairs with the default per-customer cap.
pub fn mine_pairs<'a>(
    records: impl IntoIterator<Item = &'a Transaction>,
    top_n: usize,
) -> Vec<ProductPair> {
    PairMiner::default().mine(records, top_n).pairs
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{mine_pairs, PairMiner};
    use crate::domain::pair::ProductPair;
    use crate::domain::transaction::{Transaction, TransactionSet};

    fn purchases(rows: &[(&str, &str)]) -> TransactionSet {
        rows.iter()
            .enumerate()
            .map(|(index, (customer, product))| {
                Transaction::new(
                    format!("T{index}"),
                    *customer,
                    *product,
                    "North",
                    NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
                    1,
                    Decimal::from_str("1.00").expect("decimal"),
                )
                .expect("valid transaction")
            })
            .collect()
    }

    fn buyers<'a>(records: &'a TransactionSet, product: &str) -> HashSet<&'a str> {
        records
            .iter()
            .filter(|record| record.product_name() == product)
            .map(|record| record.customer_id().as_str())
            .collect()
    }

    #[test]
    fn single_shared_pair_is_found_once() {
        let records = purchases(&[("C1", "ProdX"), ("C1", "ProdY"), ("C2", "ProdX")]);

        let pairs = mine_pairs(&records, 10);
        assert_eq!(pairs, vec![ProductPair::new("ProdX", "ProdY", 1)]);
        assert_eq!(pairs[0].label, "ProdX & ProdY");
    }

    #[test]
    fn five_distinct_products_yield_ten_increments() {
        let records = purchases(&[("C1", "A"), ("C1", "B"), ("C1", "C"), ("C1", "D"), ("C1", "E")]);

        let mining = PairMiner::unlimited().mine(&records, 0);
        assert_eq!(mining.stats.pair_increments, 10);
        assert_eq!(mining.stats.distinct_pairs, 10);
        assert!(mining.pairs.iter().all(|pair| pair.frequency == 1));
    }

    #[test]
    fn repeat_purchases_count_once_per_customer() {
        let records = purchases(&[
            ("C1", "Milk"),
            ("C1", "Milk"),
            ("C1", "Bread"),
            ("C1", "Bread"),
            ("C2", "Bread"),
            ("C2", "Milk"),
        ]);

        let pairs = mine_pairs(&records, 0);
        assert_eq!(pairs, vec![ProductPair::new("Bread", "Milk", 2)]);
    }

    #[test]
    fn customers_with_fewer_than_two_products_contribute_nothing() {
        let records = purchases(&[("C1", "Milk"), ("C1", "Milk"), ("C2", "Bread")]);

        let mining = PairMiner::default().mine(&records, 0);
        assert!(mining.pairs.is_empty());
        assert_eq!(mining.stats.customers_seen, 2);
        assert_eq!(mining.stats.pair_increments, 0);
        assert!(mine_pairs(&TransactionSet::default(), 10).is_empty());
    }

    #[test]
    fn ranks_by_frequency_then_label_and_truncates() {
        let records = purchases(&[
            ("C1", "A"),
            ("C1", "B"),
            ("C2", "A"),
            ("C2", "B"),
            ("C3", "C"),
            ("C3", "D"),
            ("C4", "A"),
            ("C4", "C"),
        ]);

        let labels: Vec<String> =
            mine_pairs(&records, 2).into_iter().map(|pair| pair.label).collect();
        assert_eq!(labels, vec!["A & B".to_string(), "A & C".to_string()]);
    }

    #[test]
    fn adversarial_customer_above_cap_is_skipped() {
        let mut rows: Vec<(String, String)> =
            (0..1_000).map(|n| ("WHALE".to_string(), format!("P{n:04}"))).collect();
        rows.push(("C1".to_string(), "P0001".to_string()));
        rows.push(("C1".to_string(), "P0002".to_string()));
        let borrowed: Vec<(&str, &str)> =
            rows.iter().map(|(customer, product)| (customer.as_str(), product.as_str())).collect();
        let records = purchases(&borrowed);

        let mining = PairMiner::new(200).mine(&records, 10);

        assert_eq!(mining.stats.customers_skipped, 1);
        assert_eq!(mining.stats.skipped_customers, vec!["WHALE".to_string()]);
        assert_eq!(mining.stats.pair_increments, 1);
        assert_eq!(mining.pairs, vec![ProductPair::new("P0001", "P0002", 1)]);
    }

    #[test]
    fn unlimited_miner_pays_the_full_quadratic_cost() {
        let rows: Vec<(String, String)> =
            (0..300).map(|n| ("WHALE".to_string(), format!("P{n:03}"))).collect();
        let borrowed: Vec<(&str, &str)> =
            rows.iter().map(|(customer, product)| (customer.as_str(), product.as_str())).collect();
        let records = purchases(&borrowed);

        let mining = PairMiner::unlimited().mine(&records, 10);

        assert_eq!(mining.stats.customers_skipped, 0);
        assert_eq!(mining.stats.pair_increments, 300 * 299 / 2);
        assert_eq!(mining.pairs.len(), 10);
        assert_eq!(mining.pairs[0].label, "P000 & P001");
    }

    #[test]
    fn frequency_never_exceeds_customers_buying_both() {
        let records = purchases(&[
            ("C1", "A"),
            ("C1", "B"),
            ("C1", "C"),
            ("C2", "B"),
            ("C2", "C"),
            ("C3", "A"),
            ("C3", "C"),
            ("C3", "C"),
        ]);

        for pair in mine_pairs(&records, 0) {
            let both = buyers(&records, &pair.product_a)
                .intersection(&buyers(&records, &pair.product_b))
                .count();
            assert!(both as u64 >= pair.frequency, "{} counted too often", pair.label);
        }
    }
}
