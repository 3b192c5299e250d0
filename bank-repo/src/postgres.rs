//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use bank_types::{
    Account, AccountId, BankRepository, CreateAccountRequest, CurrencyCode, ExchangeRate,
    ExchangeRateId, NewExchangeRate, RepoError, Transaction, TransactionId, Transfer, TransferId,
    TransferStatus, next_balance,
};

use crate::types::{DbAccount, DbBalance, DbExchangeRate, DbTransaction, DbTransfer};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        execute_migration(
            &pool,
            include_str!("../migrations/0001_create_tables_pg.sql"),
            "0001",
        )
        .await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Locks the given account rows in id order so that two transfers touching
/// the same pair of accounts can never deadlock.
async fn lock_accounts(conn: &mut PgConnection, ids: &[AccountId]) -> Result<(), RepoError> {
    let mut ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
    ids.sort();
    ids.dedup();

    let locked: Vec<(Uuid,)> =
        sqlx::query_as(r#"SELECT id FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE"#)
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

    if locked.len() != ids.len() {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

/// Checks and moves one locked account balance, then inserts the row.
async fn apply_leg(conn: &mut PgConnection, tx: &Transaction) -> Result<(), RepoError> {
    let row: Option<DbBalance> =
        sqlx::query_as(r#"SELECT balance FROM accounts WHERE id = $1 FOR UPDATE"#)
            .bind(tx.account_id.into_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

    let balance = row.ok_or(RepoError::NotFound)?.into_decimal()?;
    let updated = next_balance(balance, tx.direction, tx.amount)?;

    sqlx::query(r#"UPDATE accounts SET balance = $1, updated_at = NOW() WHERE id = $2"#)
        .bind(updated)
        .bind(tx.account_id.into_uuid())
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

    sqlx::query(
        r#"INSERT INTO transactions (id, account_id, transaction_timestamp, amount, direction, notes, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(tx.id.into_uuid())
    .bind(tx.account_id.into_uuid())
    .bind(tx.timestamp)
    .bind(tx.amount)
    .bind(tx.direction.as_str())
    .bind(&tx.notes)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BankRepository for PostgresRepo {
    async fn create_account(&self, req: CreateAccountRequest) -> Result<Account, RepoError> {
        let account = Account::new(req.account_number, req.account_name, req.currency)
            .map_err(RepoError::Domain)?;

        sqlx::query(
            r#"INSERT INTO accounts (id, account_number, account_name, currency, balance, created_at, updated_at)
               VALUES ($1, $2, $3, $4, 0, $5, $5)"#,
        )
        .bind(account.id.into_uuid())
        .bind(&account.account_number)
        .bind(&account.account_name)
        .bind(account.currency.code())
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(format!(
                "Account number already exists: {}",
                account.account_number
            )),
            e => RepoError::Database(e.to_string()),
        })?;

        Ok(account)
    }

    async fn get_account_by_number(&self, number: &str) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, account_number, account_name, currency, balance, created_at, updated_at
               FROM accounts WHERE account_number = $1"#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn get_balance_by_number(&self, number: &str) -> Result<Option<Decimal>, RepoError> {
        let row: Option<DbBalance> =
            sqlx::query_as(r#"SELECT balance FROM accounts WHERE account_number = $1"#)
                .bind(number)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBalance::into_decimal).transpose()
    }

    async fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRateId, RepoError> {
        rate.validate().map_err(RepoError::Domain)?;
        let rate = rate.into_rate();

        sqlx::query(
            r#"INSERT INTO exchange_rates (id, from_currency, to_currency, rate, valid_from, valid_to, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(rate.id.into_uuid())
        .bind(rate.from_currency.code())
        .bind(rate.to_currency.code())
        .bind(rate.rate)
        .bind(rate.valid_from)
        .bind(rate.valid_to)
        .bind(rate.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rate.id)
    }

    async fn get_rates_at_timestamp(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, RepoError> {
        let rows: Vec<DbExchangeRate> = sqlx::query_as(
            r#"SELECT id, from_currency, to_currency, rate, valid_from, valid_to, created_at
               FROM exchange_rates
               WHERE from_currency = $1 AND to_currency = $2 AND valid_from <= $3 AND valid_to >= $3
               ORDER BY valid_from DESC
               LIMIT 2"#,
        )
        .bind(from.code())
        .bind(to.code())
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbExchangeRate::into_domain).collect()
    }

    async fn apply_account_transaction(
        &self,
        account: &Account,
        tx: &Transaction,
    ) -> Result<TransactionId, RepoError> {
        if tx.account_id != account.id {
            return Err(RepoError::Conflict(format!(
                "Transaction {} does not belong to account {}",
                tx.id, account.account_number
            )));
        }

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        apply_leg(&mut *db_tx, tx).await?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(tx.id)
    }

    async fn create_transfer(&self, transfer: &Transfer) -> Result<TransferId, RepoError> {
        sqlx::query(
            r#"INSERT INTO transfers (id, from_account_id, to_account_id, currency, amount, notes, transfer_timestamp, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(transfer.id.into_uuid())
        .bind(transfer.from_account_id.into_uuid())
        .bind(transfer.to_account_id.into_uuid())
        .bind(transfer.currency.code())
        .bind(transfer.amount)
        .bind(&transfer.notes)
        .bind(transfer.timestamp)
        .bind(transfer.status.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(transfer.id)
    }

    async fn apply_transfer_pair(
        &self,
        debit: &Transaction,
        credit: &Transaction,
    ) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        lock_accounts(&mut *db_tx, &[debit.account_id, credit.account_id]).await?;
        apply_leg(&mut *db_tx, debit).await?;
        apply_leg(&mut *db_tx, credit).await?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        tracing::debug!(debit = %debit.id, credit = %credit.id, "transfer pair committed");
        Ok(())
    }

    async fn update_transfer_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE transfers SET status = $1 WHERE id = $2 AND status = 'PENDING'"#)
                .bind(status.as_ref())
                .bind(id.into_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.get_transfer(id).await? {
                Some(existing) => Err(RepoError::Conflict(format!(
                    "Transfer {} is already {}",
                    id, existing.status
                ))),
                None => Err(RepoError::NotFound),
            };
        }

        Ok(())
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError> {
        let row: Option<DbTransfer> = sqlx::query_as(
            r#"SELECT id, from_account_id, to_account_id, currency, amount, notes, transfer_timestamp, status
               FROM transfers WHERE id = $1"#,
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransfer::into_domain).transpose()
    }

    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, account_id, transaction_timestamp, amount, direction, notes, created_at
               FROM transactions
               WHERE account_id = $1
               ORDER BY transaction_timestamp ASC, created_at ASC"#,
        )
        .bind(account_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }
}
