//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;

use bank_types::{
    Account, AccountId, BankRepository, CreateAccountRequest, CurrencyCode, ExchangeRate,
    ExchangeRateId, NewExchangeRate, RepoError, Transaction, TransactionId, Transfer, TransferId,
    TransferStatus, next_balance,
};

use crate::types::{
    DbAccount, DbBalance, DbExchangeRate, DbTransaction, DbTransfer, timestamp_text,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// The pool holds exactly one connection, so every atomic unit runs alone and
/// balance read-check-write sequences cannot interleave. It also keeps a
/// `:memory:` database alive for the lifetime of the repo.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        // Run migration from migration file
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Reads, checks and rewrites one account balance, then inserts the row.
///
/// Must run on a connection that is inside a transaction.
async fn apply_leg(conn: &mut SqliteConnection, tx: &Transaction) -> Result<(), RepoError> {
    let account_id_str = tx.account_id.to_string();

    let row: Option<DbBalance> = sqlx::query_as(r#"SELECT balance FROM accounts WHERE id = ?"#)
        .bind(&account_id_str)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

    let balance = row.ok_or(RepoError::NotFound)?.into_decimal()?;
    let updated = next_balance(balance, tx.direction, tx.amount)?;
    let now = timestamp_text(Utc::now());

    sqlx::query(r#"UPDATE accounts SET balance = ?, updated_at = ? WHERE id = ?"#)
        .bind(updated.to_string())
        .bind(&now)
        .bind(&account_id_str)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

    sqlx::query(
        r#"INSERT INTO transactions (id, account_id, transaction_timestamp, amount, direction, notes, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(tx.id.to_string())
    .bind(&account_id_str)
    .bind(timestamp_text(tx.timestamp))
    .bind(tx.amount.to_string())
    .bind(tx.direction.as_str())
    .bind(&tx.notes)
    .bind(timestamp_text(tx.created_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BankRepository for SqliteRepo {
    async fn create_account(&self, req: CreateAccountRequest) -> Result<Account, RepoError> {
        // Validate first
        let account = Account::new(req.account_number, req.account_name, req.currency)
            .map_err(RepoError::Domain)?;

        let created_at_str = timestamp_text(account.created_at);

        sqlx::query(
            r#"INSERT INTO accounts (id, account_number, account_name, currency, balance, created_at, updated_at)
               VALUES (?, ?, ?, ?, '0', ?, ?)"#,
        )
        .bind(account.id.to_string())
        .bind(&account.account_number)
        .bind(&account.account_name)
        .bind(account.currency.code())
        .bind(&created_at_str)
        .bind(&created_at_str)
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
               FROM accounts WHERE account_number = ?"#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn get_balance_by_number(&self, number: &str) -> Result<Option<Decimal>, RepoError> {
        let row: Option<DbBalance> =
            sqlx::query_as(r#"SELECT balance FROM accounts WHERE account_number = ?"#)
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
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(rate.id.to_string())
        .bind(rate.from_currency.code())
        .bind(rate.to_currency.code())
        .bind(rate.rate.to_string())
        .bind(timestamp_text(rate.valid_from))
        .bind(timestamp_text(rate.valid_to))
        .bind(timestamp_text(rate.created_at))
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
        let at_str = timestamp_text(at);

        let rows: Vec<DbExchangeRate> = sqlx::query_as(
            r#"SELECT id, from_currency, to_currency, rate, valid_from, valid_to, created_at
               FROM exchange_rates
               WHERE from_currency = ? AND to_currency = ? AND valid_from <= ? AND valid_to >= ?
               ORDER BY valid_from DESC
               LIMIT 2"#,
        )
        .bind(from.code())
        .bind(to.code())
        .bind(&at_str)
        .bind(&at_str)
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
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(transfer.id.to_string())
        .bind(transfer.from_account_id.to_string())
        .bind(transfer.to_account_id.to_string())
        .bind(transfer.currency.code())
        .bind(transfer.amount.to_string())
        .bind(&transfer.notes)
        .bind(timestamp_text(transfer.timestamp))
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

        // Any error drops `db_tx`, which rolls back both legs.
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
        let result = sqlx::query(
            r#"UPDATE transfers SET status = ? WHERE id = ? AND status = 'PENDING'"#,
        )
        .bind(status.as_ref())
        .bind(id.to_string())
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
               FROM transfers WHERE id = ?"#,
        )
        .bind(id.to_string())
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
               WHERE account_id = ?
               ORDER BY transaction_timestamp ASC, created_at ASC, rowid ASC"#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }
}
