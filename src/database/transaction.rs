use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

/// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
///
/// The closure gets the open transaction and must return a boxed future:
///
/// ```ignore
/// with_transaction(&pool, |tx| Box::pin(async move {
///     sqlx::query("UPDATE stock SET qty = qty - 1 WHERE id = $1")
///         .bind(id)
///         .execute(&mut **tx)
///         .await?;
///     Ok::<_, DatabaseError>(())
/// })).await?;
/// ```
pub async fn with_transaction<T, E, F>(pool: &PgPool, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut Transaction<'static, Postgres>) -> BoxFuture<'c, Result<T, E>>,
    E: From<sqlx::Error>,
{
    let mut tx = pool.begin().await?;

    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}
