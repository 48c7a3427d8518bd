use std::future::Future;
use std::pin::Pin;

use sea_orm::{DatabaseTransaction, TransactionTrait};

use super::txn_policy;
use crate::error::AppError;
use crate::state::app_state::AppState;

/// Boxed future returned by `with_txn` closures.
pub type TxnFuture<'t, R> = Pin<Box<dyn Future<Output = Result<R, AppError>> + Send + 't>>;

/// Execute a function within a database transaction.
///
/// Begins a transaction on the state's connection, runs the closure, then
/// applies the process-wide policy on Ok and rolls back on Err. Callers must
/// never wrap agent I/O or other slow awaits in here; transactions are for
/// the short read/write sections only.
pub async fn with_txn<R, F>(state: &AppState, f: F) -> Result<R, AppError>
where
    F: for<'t> FnOnce(&'t DatabaseTransaction) -> TxnFuture<'t, R>,
{
    let txn = state.db.begin().await?;
    let out = f(&txn).await;

    match out {
        Ok(val) => match txn_policy::current() {
            txn_policy::TxnPolicy::CommitOnOk => {
                txn.commit().await?;
                Ok(val)
            }
            txn_policy::TxnPolicy::RollbackOnOk => {
                txn.rollback().await?;
                Ok(val)
            }
        },
        Err(err) => {
            // Best-effort rollback; preserve original error
            let _ = txn.rollback().await;
            Err(err)
        }
    }
}
