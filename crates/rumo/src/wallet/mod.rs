//! Wallet balance and transaction history behind a swappable store.
//!
//! Amounts are integer cents. The balance is always derived from the transaction log,
//! so a store only has to persist the log.

use std::{
    fs,
    future::Future,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const WALLET_FILE_NAME: &str = "wallet.json";
pub const DATA_DIR_DEFAULT: &str = "./rumo_data";
/// Largest amount a single transaction may carry.
pub const MAX_AMOUNT_CENTS: u64 = i64::MAX.unsigned_abs();

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Wallet file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: u64 },
    #[error("Transaction amount must be between 1 and {max} cents", max = MAX_AMOUNT_CENTS)]
    InvalidAmount,
    #[error("Balance would overflow: balance {balance}, credit {requested}")]
    BalanceOverflow { balance: i64, requested: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Assigned by the store on append
    pub id: u64,
    pub kind: TransactionKind,
    pub amount_cents: u64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn credit(amount_cents: u64, description: impl Into<String>) -> Self {
        Self::new(TransactionKind::Credit, amount_cents, description)
    }

    pub fn debit(amount_cents: u64, description: impl Into<String>) -> Self {
        Self::new(TransactionKind::Debit, amount_cents, description)
    }

    fn new(kind: TransactionKind, amount_cents: u64, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind,
            amount_cents,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Effect on the balance.
    pub fn signed_amount(&self) -> i64 {
        let amount = i64::try_from(self.amount_cents).unwrap_or(i64::MAX);
        match self.kind {
            TransactionKind::Credit => amount,
            TransactionKind::Debit => -amount,
        }
    }
}

/// Saturates instead of overflowing on a hand-edited log.
pub fn balance_of(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .map(Transaction::signed_amount)
        .fold(0, i64::saturating_add)
}

/// Storage boundary for the wallet, so a remote backend can replace the local ones.
pub trait WalletStore: Send + Sync {
    fn balance(&self) -> impl Future<Output = Result<i64, WalletError>> + Send;

    /// Newest first.
    fn transactions(&self) -> impl Future<Output = Result<Vec<Transaction>, WalletError>> + Send;

    /// Validate, assign an id and persist. Returns the stored transaction.
    fn append_transaction(
        &self,
        transaction: Transaction,
    ) -> impl Future<Output = Result<Transaction, WalletError>> + Send;
}

/// Checks `transaction` against `log` and appends it with the next id.
fn append_checked(
    log: &mut Vec<Transaction>,
    mut transaction: Transaction,
) -> Result<Transaction, WalletError> {
    if transaction.amount_cents == 0 || transaction.amount_cents > MAX_AMOUNT_CENTS {
        return Err(WalletError::InvalidAmount);
    }
    let balance = balance_of(log);
    let requested = transaction.amount_cents;
    match balance.checked_add(transaction.signed_amount()) {
        None if transaction.kind == TransactionKind::Credit => {
            return Err(WalletError::BalanceOverflow { balance, requested });
        }
        Some(next) if next >= 0 => {}
        _ => return Err(WalletError::InsufficientFunds { balance, requested }),
    }
    transaction.id = log.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    log.push(transaction.clone());
    Ok(transaction)
}

fn newest_first(log: &[Transaction]) -> Vec<Transaction> {
    log.iter().rev().cloned().collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct InMemoryWallet {
    log: Mutex<Vec<Transaction>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for InMemoryWallet {
    async fn balance(&self) -> Result<i64, WalletError> {
        Ok(balance_of(&lock(&self.log)))
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, WalletError> {
        Ok(newest_first(&lock(&self.log)))
    }

    async fn append_transaction(&self, transaction: Transaction) -> Result<Transaction, WalletError> {
        append_checked(&mut lock(&self.log), transaction)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WalletFile {
    transactions: Vec<Transaction>,
}

/// Wallet persisted as a JSON file, rewritten atomically on every append.
#[derive(Debug)]
pub struct JsonFileWallet {
    path: PathBuf,
    log: Mutex<Vec<Transaction>>,
}

impl JsonFileWallet {
    /// Open the wallet at `path`, starting empty if the file does not exist yet.
    #[instrument(name = "Open wallet", level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref().to_path_buf();
        let log = if path.exists() {
            let file: WalletFile = serde_json::from_slice(&fs::read(&path)?)?;
            debug!(transactions = file.transactions.len(), "Loaded wallet");
            file.transactions
        } else {
            info!("No wallet file yet, starting empty");
            Vec::new()
        };
        Ok(Self {
            path,
            log: Mutex::new(log),
        })
    }

    /// Open the wallet at [`default_wallet_path`].
    pub fn open_default() -> Result<Self, WalletError> {
        Self::open(default_wallet_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, log: &[Transaction]) -> Result<(), WalletError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(
            &mut tmp,
            &WalletFile {
                transactions: log.to_vec(),
            },
        )?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| WalletError::Io(e.error))?;
        Ok(())
    }
}

impl WalletStore for JsonFileWallet {
    async fn balance(&self) -> Result<i64, WalletError> {
        Ok(balance_of(&lock(&self.log)))
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, WalletError> {
        Ok(newest_first(&lock(&self.log)))
    }

    async fn append_transaction(&self, transaction: Transaction) -> Result<Transaction, WalletError> {
        let mut log = lock(&self.log);
        let mut next = log.clone();
        let stored = append_checked(&mut next, transaction)?;
        if let Err(e) = self.persist(&next) {
            warn!(error = %e, "Failed to write wallet file, transaction not recorded");
            return Err(e);
        }
        *log = next;
        Ok(stored)
    }
}

/// `$RUMO_DATA_DIR/wallet.json`, else the platform data directory when the
/// `system-dirs` feature is on, else `./rumo_data/wallet.json`.
pub fn default_wallet_path() -> PathBuf {
    data_dir().join(WALLET_FILE_NAME)
}

fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("RUMO_DATA_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    #[cfg(feature = "system-dirs")]
    if let Some(dirs) = directories::ProjectDirs::from("", "", "rumo") {
        return dirs.data_dir().to_path_buf();
    }
    PathBuf::from(DATA_DIR_DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise<W: WalletStore>(wallet: &W) {
        assert_eq!(wallet.balance().await.unwrap(), 0);

        let first = wallet
            .append_transaction(Transaction::credit(10_000, "Recarga"))
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        let second = wallet
            .append_transaction(Transaction::debit(2_500, "Passeio de barco"))
            .await
            .unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(wallet.balance().await.unwrap(), 7_500);

        let err = wallet
            .append_transaction(Transaction::debit(7_501, "Hotel"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds {
                balance: 7_500,
                requested: 7_501
            }
        ));
        assert!(matches!(
            wallet
                .append_transaction(Transaction::credit(0, "nada"))
                .await,
            Err(WalletError::InvalidAmount)
        ));

        let history = wallet.transactions().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "Passeio de barco");
        assert_eq!(wallet.balance().await.unwrap(), 7_500);
    }

    #[tokio::test]
    async fn test_in_memory_wallet() {
        exercise(&InMemoryWallet::new()).await;
    }

    #[tokio::test]
    async fn test_json_wallet_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(WALLET_FILE_NAME);

        let wallet = JsonFileWallet::open(&path).unwrap();
        exercise(&wallet).await;
        assert!(path.exists());

        let reopened = JsonFileWallet::open(&path).unwrap();
        assert_eq!(reopened.balance().await.unwrap(), 7_500);
        let next = reopened
            .append_transaction(Transaction::debit(7_500, "Jantar"))
            .await
            .unwrap();
        assert_eq!(next.id, 3);
        assert_eq!(reopened.balance().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_transaction_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WALLET_FILE_NAME);
        let wallet = JsonFileWallet::open(&path).unwrap();
        assert!(
            wallet
                .append_transaction(Transaction::debit(1, "x"))
                .await
                .is_err()
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_amounts_that_would_overflow_are_rejected() {
        let wallet = InMemoryWallet::new();
        assert!(matches!(
            wallet
                .append_transaction(Transaction::credit(u64::MAX, "too much"))
                .await,
            Err(WalletError::InvalidAmount)
        ));

        wallet
            .append_transaction(Transaction::credit(MAX_AMOUNT_CENTS, "max"))
            .await
            .unwrap();
        assert!(matches!(
            wallet.append_transaction(Transaction::credit(1, "one more")).await,
            Err(WalletError::BalanceOverflow {
                balance: i64::MAX,
                requested: 1
            })
        ));
        assert_eq!(wallet.balance().await.unwrap(), i64::MAX);
        assert_eq!(wallet.transactions().await.unwrap().len(), 1);

        let spent = wallet
            .append_transaction(Transaction::debit(MAX_AMOUNT_CENTS, "all of it"))
            .await
            .unwrap();
        assert_eq!(spent.id, 2);
        assert_eq!(wallet.balance().await.unwrap(), 0);
    }

    #[test]
    fn test_balance_saturates_on_hand_edited_log() {
        let log = vec![
            Transaction::credit(MAX_AMOUNT_CENTS, "a"),
            Transaction::credit(MAX_AMOUNT_CENTS, "b"),
        ];
        assert_eq!(balance_of(&log), i64::MAX);
    }

    #[test]
    fn test_corrupt_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(matches!(
            JsonFileWallet::open(file.path()),
            Err(WalletError::Serde(_))
        ));
    }

    #[test]
    fn test_file_format() {
        let mut tx = Transaction::credit(500, "Bônus de check-in");
        tx.id = 1;
        let json = serde_json::to_value(&WalletFile {
            transactions: vec![tx],
        })
        .unwrap();
        let stored = &json["transactions"][0];
        assert_eq!(stored["kind"], "credit");
        assert_eq!(stored["amountCents"], 500);
        assert!(stored["createdAt"].is_string());
    }

    #[test]
    fn test_default_path_file_name() {
        assert!(default_wallet_path().ends_with(WALLET_FILE_NAME));
    }
}
