pub mod txn;
pub mod txn_policy;

pub use txn::{with_txn, TxnFuture};
pub use txn_policy::{set_txn_policy, TxnPolicy};
