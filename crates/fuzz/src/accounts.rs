//! The account table: a fixed, ordered set of `(address, private key)` pairs
//! loaded from CSV key files at startup. Accounts are immutable after load;
//! the per-address fuzzer nonce counters live with the executor, not here.

use crate::errors::AccountLoadError;
use alloy_primitives::{Address, B256};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use tracing::{info, warn};

/// One loaded account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Checksummed address.
    pub address: Address,
    /// Raw 32-byte secret key.
    pub secret: B256,
}

/// A CSV key-file row: `pub_key`, `priv_key`.
#[derive(Debug, Deserialize)]
struct KeyRow {
    pub_key: String,
    priv_key: String,
}

/// Ordered, immutable account table with index and address lookups.
#[derive(Debug, Clone, Default)]
pub struct AccountTable {
    accounts: Vec<Account>,
    by_address: HashMap<Address, usize>,
}

impl AccountTable {
    /// Loads up to `cap` unique accounts from the given CSV files, in order.
    ///
    /// Rows with missing or malformed fields are skipped with a warning;
    /// duplicate addresses are kept first-seen. Fails if no usable account
    /// remains.
    pub fn from_csv_files(
        paths: &[impl AsRef<Path>],
        cap: usize,
    ) -> Result<Self, AccountLoadError> {
        let mut table = Self::default();

        for path in paths {
            if table.accounts.len() >= cap {
                break;
            }
            let path = path.as_ref();
            let path_str = path.display().to_string();
            let mut reader = csv::Reader::from_path(path).map_err(|err| {
                if err.is_io_error() {
                    AccountLoadError::Io {
                        path: path_str.clone(),
                        source: std::io::Error::other(err),
                    }
                } else {
                    AccountLoadError::Csv { path: path_str.clone(), source: err }
                }
            })?;

            for row in reader.deserialize::<KeyRow>() {
                if table.accounts.len() >= cap {
                    break;
                }
                let row = match row {
                    Ok(row) => row,
                    Err(err) => {
                        warn!(target: "accounts", path = %path_str, %err, "skipping unparsable key row");
                        continue;
                    }
                };
                match parse_row(&row) {
                    Ok(account) => table.push(account),
                    Err(reason) => {
                        warn!(target: "accounts", path = %path_str, reason, "skipping invalid key row");
                    }
                }
            }
        }

        if table.accounts.is_empty() {
            return Err(AccountLoadError::NoAccounts);
        }
        info!(target: "accounts", count = table.accounts.len(), "loaded account table");
        Ok(table)
    }

    fn push(&mut self, account: Account) {
        if self.by_address.contains_key(&account.address) {
            return;
        }
        self.by_address.insert(account.address, self.accounts.len());
        self.accounts.push(account);
    }

    /// Address at the given table slot.
    pub fn address(&self, index: usize) -> Option<Address> {
        self.accounts.get(index).map(|account| account.address)
    }

    /// Secret key for an address.
    pub fn secret(&self, address: &Address) -> Option<B256> {
        self.by_address.get(address).map(|index| self.accounts[*index].secret)
    }

    /// Table slot of an address.
    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.by_address.get(address).copied()
    }

    /// All loaded accounts, in load order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Number of loaded accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// A synthetic table of `count` deterministic accounts for tests. The
    /// addresses do not correspond to the secrets.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn synthetic(count: usize) -> Self {
        let mut table = Self::default();
        for i in 0..count {
            let tag = (i + 1) as u8;
            table.push(Account {
                address: Address::repeat_byte(tag),
                secret: B256::repeat_byte(tag),
            });
        }
        table
    }
}

/// Validates one CSV row: checksummed address, 64-hex-char secret with an
/// optional `0x` prefix.
fn parse_row(row: &KeyRow) -> Result<Account, &'static str> {
    let address = Address::parse_checksummed(row.pub_key.trim(), None)
        .map_err(|_| "address is not checksummed")?;

    let secret_hex = row.priv_key.trim();
    let secret_hex = secret_hex.strip_prefix("0x").unwrap_or(secret_hex);
    if secret_hex.len() != 64 {
        return Err("private key must be 64 hex chars");
    }
    let secret: B256 = secret_hex.parse().map_err(|_| "private key is not hex")?;

    Ok(Account { address, secret })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ADDR_A: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";
    const ADDR_B: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn write_keys(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("txfuzz-keys-{name}-{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "pub_key,priv_key").unwrap();
        write!(file, "{body}").unwrap();
        path
    }

    #[test]
    fn loads_valid_rows() {
        let path = write_keys("valid", &format!("{ADDR_A},{KEY}\n{ADDR_B},{KEY}\n"));
        let table = AccountTable::from_csv_files(&[&path], 100).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.address(0), Some(ADDR_A.parse().unwrap()));
        assert_eq!(table.index_of(&ADDR_B.parse().unwrap()), Some(1));
        assert!(table.secret(&ADDR_A.parse().unwrap()).is_some());
    }

    #[test]
    fn skips_bad_rows_and_duplicates() {
        let body = format!(
            "not-an-address,{KEY}\n{ADDR_A},deadbeef\n{ADDR_A},{KEY}\n{ADDR_A},{KEY}\n"
        );
        let path = write_keys("bad", &body);
        let table = AccountTable::from_csv_files(&[&path], 100).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn honors_the_cap() {
        let path = write_keys("cap", &format!("{ADDR_A},{KEY}\n{ADDR_B},{KEY}\n"));
        let table = AccountTable::from_csv_files(&[&path], 1).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn empty_table_is_an_error() {
        let path = write_keys("empty", "");
        let err = AccountTable::from_csv_files(&[&path], 100).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, AccountLoadError::NoAccounts));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AccountTable::from_csv_files(&["/nonexistent/keys.csv"], 100).unwrap_err();
        assert!(matches!(err, AccountLoadError::Io { .. }));
    }

    #[test]
    fn synthetic_table_is_deterministic() {
        let table = AccountTable::synthetic(3);
        assert_eq!(table.len(), 3);
        assert_eq!(table.address(0), Some(Address::repeat_byte(1)));
        assert_eq!(table.index_of(&Address::repeat_byte(3)), Some(2));
    }
}
