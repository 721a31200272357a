//! Row layout of the `bank_accounts` table
//!
//! PII columns hold `v1:` tokens; balance and overdraft are integer cents.

use rusqlite::Row;

use crate::crypto::FieldCipher;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountHolder, AccountId, AccountKind, Money};

pub(crate) const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS bank_accounts (
        account_no       TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        address_line_1   TEXT,
        address_line_2   TEXT,
        address_line_3   TEXT,
        town             TEXT NOT NULL,
        balance          INTEGER NOT NULL,
        account_type     INTEGER NOT NULL,
        overdraft_amount INTEGER,
        interest_rate    REAL
    ) WITHOUT ROWID;
";

pub(crate) const INSERT_SQL: &str = "
    INSERT INTO bank_accounts (
        account_no, name, address_line_1, address_line_2, address_line_3, town,
        balance, account_type, overdraft_amount, interest_rate
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
";

pub(crate) const SELECT_ALL_SQL: &str = "
    SELECT account_no, name, address_line_1, address_line_2, address_line_3, town,
           balance, account_type, overdraft_amount, interest_rate
    FROM bank_accounts
";

pub(crate) const UPDATE_BALANCE_SQL: &str =
    "UPDATE bank_accounts SET balance = ?1 WHERE account_no = ?2";

pub(crate) const DELETE_SQL: &str = "DELETE FROM bank_accounts WHERE account_no = ?1";

/// An account ready to be bound to [`INSERT_SQL`]
#[derive(Debug)]
pub(crate) struct EncodedRow {
    pub account_no: String,
    /// name, address lines 1-3, town as tokens
    pub pii: [String; 5],
    pub balance: i64,
    pub account_type: i64,
    pub overdraft_amount: Option<i64>,
    pub interest_rate: Option<f64>,
}

impl EncodedRow {
    /// Encrypt every PII field; nothing is produced unless all succeed
    pub fn encode(account: &Account, cipher: &FieldCipher) -> LedgerResult<Self> {
        let fields = account.holder.fields();
        let pii = [
            cipher.encrypt(fields[0])?,
            cipher.encrypt(fields[1])?,
            cipher.encrypt(fields[2])?,
            cipher.encrypt(fields[3])?,
            cipher.encrypt(fields[4])?,
        ];

        let (overdraft_amount, interest_rate) = match account.kind {
            AccountKind::Current { overdraft_limit } => (Some(overdraft_limit.cents()), None),
            AccountKind::Savings { interest_rate } => (None, Some(interest_rate)),
        };

        Ok(Self {
            account_no: account.id.to_string(),
            pii,
            balance: account.balance.cents(),
            account_type: account.kind.discriminator(),
            overdraft_amount,
            interest_rate,
        })
    }
}

/// A row as read from SQLite, before decryption
#[derive(Debug)]
pub(crate) struct StoredRow {
    pub account_no: String,
    pub pii: [Option<String>; 5],
    pub balance: i64,
    pub account_type: i64,
    pub overdraft_amount: Option<i64>,
    pub interest_rate: Option<f64>,
}

impl StoredRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            account_no: row.get(0)?,
            pii: [row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?],
            balance: row.get(6)?,
            account_type: row.get(7)?,
            overdraft_amount: row.get(8)?,
            interest_rate: row.get(9)?,
        })
    }

    /// Decrypt and rebuild the account
    pub fn decode(self, cipher: &FieldCipher) -> Result<Account, RowFault> {
        let kind = match self.account_type {
            AccountKind::CURRENT_DISCRIMINATOR => AccountKind::Current {
                overdraft_limit: Money::from_cents(self.overdraft_amount.unwrap_or(0)),
            },
            AccountKind::SAVINGS_DISCRIMINATOR => AccountKind::Savings {
                interest_rate: self.interest_rate.unwrap_or(0.0),
            },
            other => return Err(RowFault::UnsupportedType(other)),
        };

        let id = AccountId::parse(&self.account_no).map_err(|_| {
            RowFault::Corrupt(LedgerError::MalformedToken(
                "account number is not a valid identifier".to_string(),
            ))
        })?;

        let [name, a1, a2, a3, town] = self.pii;
        let decrypt = |value: Option<String>| -> LedgerResult<String> {
            cipher.decrypt(value.as_deref().unwrap_or_default())
        };

        let holder = AccountHolder::from_fields([
            decrypt(name).map_err(RowFault::Corrupt)?,
            decrypt(a1).map_err(RowFault::Corrupt)?,
            decrypt(a2).map_err(RowFault::Corrupt)?,
            decrypt(a3).map_err(RowFault::Corrupt)?,
            decrypt(town).map_err(RowFault::Corrupt)?,
        ]);

        let account = Account {
            id,
            holder,
            balance: Money::from_cents(self.balance),
            kind,
        };

        // Plaintext columns are not authenticated; hold them to the same rules as new accounts
        account.validate().map_err(|e| {
            RowFault::Corrupt(LedgerError::Validation(format!(
                "stored account violates its terms: {}",
                e
            )))
        })?;

        Ok(account)
    }
}

/// Why a stored row could not be turned back into an account
#[derive(Debug)]
pub(crate) enum RowFault {
    /// Unreadable column, decryption, identifier or terms failure; the row may
    /// have been tampered with
    Corrupt(LedgerError),
    /// The discriminator names no known account kind
    UnsupportedType(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new(&[7u8; 32]).unwrap()
    }

    fn savings() -> Account {
        Account::new_savings(
            AccountHolder::new("Alice", "1 Main St", "", "", "Dublin"),
            Money::from_units(100),
            0.5,
        )
    }

    fn stored(encoded: EncodedRow) -> StoredRow {
        StoredRow {
            account_no: encoded.account_no,
            pii: encoded.pii.map(Some),
            balance: encoded.balance,
            account_type: encoded.account_type,
            overdraft_amount: encoded.overdraft_amount,
            interest_rate: encoded.interest_rate,
        }
    }

    #[test]
    fn test_encode_hides_pii() {
        let encoded = EncodedRow::encode(&savings(), &cipher()).unwrap();
        for token in &encoded.pii {
            assert!(token.starts_with("v1:"));
        }
        assert!(!encoded.pii[0].contains("Alice"));
        assert_eq!(encoded.balance, 10000);
        assert_eq!(encoded.account_type, 2);
        assert_eq!(encoded.overdraft_amount, None);
        assert_eq!(encoded.interest_rate, Some(0.5));
    }

    #[test]
    fn test_decode_restores_account() {
        let account = savings();
        let encoded = EncodedRow::encode(&account, &cipher()).unwrap();
        let decoded = stored(encoded).decode(&cipher()).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_decode_current_account() {
        let account = Account::new_current(
            AccountHolder::new("Bob", "2 High St", "Apt 4", "", "Cork"),
            Money::from_cents(-2500),
            Money::from_units(500),
        );
        let encoded = EncodedRow::encode(&account, &cipher()).unwrap();
        assert_eq!(encoded.overdraft_amount, Some(50000));
        assert_eq!(stored(encoded).decode(&cipher()).unwrap(), account);
    }

    #[test]
    fn test_decode_unknown_discriminator() {
        let mut row = stored(EncodedRow::encode(&savings(), &cipher()).unwrap());
        row.account_type = 3;
        assert!(matches!(
            row.decode(&cipher()),
            Err(RowFault::UnsupportedType(3))
        ));
    }

    #[test]
    fn test_decode_wrong_key_is_corrupt() {
        let row = stored(EncodedRow::encode(&savings(), &cipher()).unwrap());
        let other = FieldCipher::new(&[8u8; 32]).unwrap();
        assert!(matches!(
            row.decode(&other),
            Err(RowFault::Corrupt(LedgerError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_decode_null_address_lines() {
        let mut row = stored(EncodedRow::encode(&savings(), &cipher()).unwrap());
        row.pii[2] = None;
        row.pii[3] = None;
        let account = row.decode(&cipher()).unwrap();
        assert_eq!(account.holder.address_line_2, "");
    }

    #[test]
    fn test_decode_rejects_out_of_terms_columns() {
        let current = Account::new_current(
            AccountHolder::new("Bob", "2 High St", "", "", "Cork"),
            Money::from_units(10),
            Money::from_units(100),
        );

        let mut row = stored(EncodedRow::encode(&current, &cipher()).unwrap());
        row.overdraft_amount = Some(i64::MIN);
        assert!(matches!(
            row.decode(&cipher()),
            Err(RowFault::Corrupt(LedgerError::Validation(_)))
        ));

        let mut row = stored(EncodedRow::encode(&current, &cipher()).unwrap());
        row.balance = -1_000_000;
        assert!(matches!(row.decode(&cipher()), Err(RowFault::Corrupt(_))));

        for rate in [f64::NAN, -0.5] {
            let mut row = stored(EncodedRow::encode(&savings(), &cipher()).unwrap());
            row.interest_rate = Some(rate);
            assert!(matches!(row.decode(&cipher()), Err(RowFault::Corrupt(_))));
        }
    }
}
