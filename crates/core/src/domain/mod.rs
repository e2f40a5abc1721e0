pub mod pair;
pub mod ranked;
pub mod transaction;
