use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tracing::{debug, info};

use crate::patterns::Platform;

use super::error::{LedgerError, Result};
use super::partitions::{decode_record_key, encode_meta_key, encode_record_key};
use super::record::{KeyRecord, KeyStatus};
use super::traits::KeyStore;

const META_CREATED_AT: &str = "created_at";

/// Fjall-backed persistent store of discovered keys
///
/// Record writes go through a single mutex so the existence check and the
/// insert form one step. Clones share the keyspace and the lock.
#[derive(Clone)]
pub struct FjallKeyStore {
    keyspace: Keyspace,
    keys: PartitionHandle,
    metadata: PartitionHandle,
    write_lock: Arc<Mutex<()>>,
}

impl FjallKeyStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening key store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let keys = keyspace.open_partition("keys", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        if metadata.get(encode_meta_key(META_CREATED_AT))?.is_none() {
            metadata.insert(
                encode_meta_key(META_CREATED_AT),
                Utc::now().to_rfc3339().as_bytes(),
            )?;
        }

        info!("Key store opened successfully");
        Ok(Self {
            keyspace,
            keys,
            metadata,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Fetch the stored record for a key
    pub fn get(&self, key: &str) -> Result<Option<KeyRecord>> {
        match self.keys.get(encode_record_key(key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Move a key from unclaimed to claimed
    ///
    /// Claiming an already claimed key is a no-op that returns the record.
    pub fn mark_claimed(&self, key: &str) -> Result<KeyRecord> {
        let _guard = self.write_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let mut record = self
            .get(key)?
            .ok_or_else(|| LedgerError::KeyNotFound(key.to_string()))?;

        if record.status != KeyStatus::Claimed {
            record.status = KeyStatus::Claimed;
            self.keys
                .insert(encode_record_key(key), serde_json::to_vec(&record)?)?;
            self.keyspace.persist(PersistMode::SyncAll)?;
            info!(key, "Key marked as claimed");
        }

        Ok(record)
    }

    /// When this store was first created
    pub fn created_at(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(value) = self.metadata.get(encode_meta_key(META_CREATED_AT))? else {
            return Ok(None);
        };
        let parsed = std::str::from_utf8(&value)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(parsed)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    /// Record counts (for startup logging and the CLI)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();

        for item in self.keys.iter() {
            let (key, value) = item?;
            if decode_record_key(&key).is_none() {
                continue;
            }
            let record: KeyRecord = serde_json::from_slice(&value)?;
            stats.total += 1;
            match record.status {
                KeyStatus::Unclaimed => stats.unclaimed += 1,
                KeyStatus::Claimed => stats.claimed += 1,
            }
        }

        Ok(stats)
    }
}

impl KeyStore for FjallKeyStore {
    fn try_insert(
        &self,
        key: &str,
        platform: Platform,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let record_key = encode_record_key(key);
        let _guard = self.write_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;

        if self.keys.contains_key(&record_key)? {
            debug!(key, "Key already known");
            return Ok(false);
        }

        let record = KeyRecord::new(key, platform, source, now);
        self.keys.insert(record_key, serde_json::to_vec(&record)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!(key, %platform, source, "Key recorded");
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.keys.contains_key(encode_record_key(key))?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub unclaimed: usize,
    pub claimed: usize,
}
