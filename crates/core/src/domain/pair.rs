use serde::Serialize;

/// Two products bought by the same customers. `product_a < product_b` always
/// holds, so a pair has exactly one representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ProductPair {
    pub product_a: String,
    pub product_b: String,
    pub frequency: u64,
    pub label: String,
}

impl ProductPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>, frequency: u64) -> Self {
        let (first, second) = (first.into(), second.into());
        let (product_a, product_b) = if first <= second { (first, second) } else { (second, first) };
        let label = format!("{product_a} & {product_b}");
        Self { product_a, product_b, frequency, label }
    }

    pub fn contains(&self, product: &str) -> bool {
        self.product_a == product || self.product_b == product
    }
}
