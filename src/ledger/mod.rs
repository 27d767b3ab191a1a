//! Fjall-based persistence for discovered keys
//!
//! Every key the scanners ever report is recorded here exactly once. The
//! store is the dedup gate for the whole pipeline: a key reaches the
//! notifier only if [`KeyStore::try_insert`] returned `true` for it.
//!
//! ## Layout
//!
//! - `keys` partition: one JSON [`KeyRecord`] per key text
//! - `metadata` partition: store bookkeeping (creation time)
//!
//! Records are never deleted by the scanner. Their status moves from
//! unclaimed to claimed only through [`FjallKeyStore::mark_claimed`], which
//! the `claim` CLI command exposes to whoever redeems the key.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keysweep::ledger::{FjallKeyStore, KeyStore};
//!
//! let store = FjallKeyStore::open("data/keys")?;
//! let fresh = store.try_insert("ABCDE-FGHIJ-KLMNO", Platform::Steam, "https://...", Utc::now())?;
//! ```

pub mod error;
pub mod partitions;
pub mod record;
pub mod store;
pub mod traits;

pub use error::{LedgerError, Result};
pub use record::{KeyRecord, KeyStatus};
pub use store::{FjallKeyStore, StoreStats};
pub use traits::KeyStore;
