//! Rule store: persisted learned mappings, kept columns, default values and
//! promoted cleaning rules.
//!
//! Reads never fail: a missing file is an empty rule set and an unreadable
//! one is reported and treated the same way. Every write is a
//! read-modify-write performed under a lock so concurrent sessions cannot
//! drop each other's promotions.
//!
//! # Storage Format
//!
//! A single JSON document (see [`RuleSet`]), replaced atomically on every
//! write (temp file + rename). An exclusive OS lock on a sibling `.lock`
//! file serializes writers across processes; the lock dies with its holder.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use recon_model::{CleaningRule, DefaultValueRule, LearnedMapping, RuleSet};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Current time as an RFC 3339 timestamp.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Read/write contract for persisted rules.
pub trait RuleStore: Send + Sync {
    /// Current rules; defaults when nothing is stored.
    fn load(&self) -> RuleSet;

    /// Apply `edit` to the latest stored rules and persist the result atomically.
    ///
    /// Nothing is written when `edit` fails.
    fn update(
        &self,
        edit: &mut dyn FnMut(&mut RuleSet) -> Result<(), StoreError>,
    ) -> Result<RuleSet, StoreError>;

    /// Persist a learned mapping, superseding any earlier one for the same source column.
    fn promote_mapping(
        &self,
        source_column: &str,
        target_field: &str,
        confidence: f32,
    ) -> Result<RuleSet, StoreError> {
        let mut mapping = LearnedMapping::new(source_column.trim(), target_field.trim());
        mapping.confidence = confidence.clamp(0.0, 1.0);
        self.update(&mut |rules: &mut RuleSet| {
            rules.upsert_mapping(mapping.clone());
            Ok(())
        })
    }

    /// Keep a non-canonical column verbatim under `output_name`.
    ///
    /// Fails when another source column already keeps that output name.
    fn promote_column(&self, source_column: &str, output_name: &str) -> Result<RuleSet, StoreError> {
        let source = source_column.to_string();
        let output = output_name.trim().to_string();
        self.update(&mut |rules: &mut RuleSet| {
            if let Some((holder, _)) = rules
                .column_promotions
                .iter()
                .find(|(column, name)| **name == output && **column != source)
            {
                return Err(StoreError::OutputNameTaken {
                    output: output.clone(),
                    holder: holder.clone(),
                });
            }
            rules.column_promotions.insert(source.clone(), output.clone());
            Ok(())
        })
    }

    fn save_default_value(
        &self,
        column: &str,
        value: &str,
        rule_type: &str,
    ) -> Result<RuleSet, StoreError> {
        let rule = DefaultValueRule {
            value: value.to_string(),
            rule_type: rule_type.to_string(),
            created_at: timestamp(),
        };
        let column = column.to_string();
        self.update(&mut |rules: &mut RuleSet| {
            rules.default_values.insert(column.clone(), rule.clone());
            Ok(())
        })
    }

    /// Persist a cleaning rule, replacing one with the same type and column.
    fn promote_cleaning_rule(&self, rule: CleaningRule) -> Result<RuleSet, StoreError> {
        self.update(&mut |rules: &mut RuleSet| {
            rules.upsert_cleaning_rule(rule.clone());
            Ok(())
        })
    }
}

/// Rules kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: Mutex<RuleSet>,
}

impl MemoryRuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }
}

impl RuleStore for MemoryRuleStore {
    fn load(&self) -> RuleSet {
        self.rules
            .lock()
            .map(|rules| rules.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn update(
        &self,
        edit: &mut dyn FnMut(&mut RuleSet) -> Result<(), StoreError>,
    ) -> Result<RuleSet, StoreError> {
        let mut rules = self
            .rules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut next = rules.clone();
        edit(&mut next)?;
        next.updated_at = Some(timestamp());
        *rules = next.clone();
        Ok(next)
    }
}

const LOCK_RETRY: Duration = Duration::from_millis(20);
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusive advisory lock on the store's `.lock` file, released on drop.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: PathBuf, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Io {
                operation: "open lock",
                path: path.clone(),
                source,
            })?;
        let contended = fs2::lock_contended_error().raw_os_error();
        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(e) if e.raw_os_error() == contended => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::LockTimeout { path });
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(source) => {
                    return Err(StoreError::Io {
                        operation: "lock",
                        path,
                        source,
                    });
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            warn!(%error, "failed to release rule store lock");
        }
    }
}

/// Rules persisted as a JSON file.
#[derive(Debug)]
pub struct JsonRuleStore {
    path: PathBuf,
    guard: Mutex<()>,
    lock_timeout: Duration,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Strict read used inside the write lock: corruption is an error.
    fn read_current(&self) -> Result<RuleSet, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(RuleSet::default()),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RuleSet::default()),
            Err(source) => Err(StoreError::Io {
                operation: "read",
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_atomic(&self, rules: &RuleSet) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(rules).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|source| StoreError::Io {
            operation: "create",
            path: temp_path.clone(),
            source,
        })?;
        file.write_all(json.as_bytes())
            .map_err(|source| StoreError::Io {
                operation: "write",
                path: temp_path.clone(),
                source,
            })?;
        file.sync_all().map_err(|source| StoreError::Io {
            operation: "sync",
            path: temp_path.clone(),
            source,
        })?;

        fs::rename(&temp_path, &self.path).map_err(|source| StoreError::AtomicWriteFailed {
            temp_path: temp_path.clone(),
            target_path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

impl RuleStore for JsonRuleStore {
    fn load(&self) -> RuleSet {
        match self.read_current() {
            Ok(rules) => {
                debug!(
                    path = %self.path.display(),
                    mappings = rules.mappings.len(),
                    cleaning_rules = rules.cleaning_rules.len(),
                    "loaded rules"
                );
                rules
            }
            Err(error) => {
                warn!(%error, "ignoring unreadable rule store");
                RuleSet::default()
            }
        }
    }

    fn update(
        &self,
        edit: &mut dyn FnMut(&mut RuleSet) -> Result<(), StoreError>,
    ) -> Result<RuleSet, StoreError> {
        let _guard = self
            .guard
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _lock = FileLock::acquire(self.lock_path(), self.lock_timeout)?;

        let mut rules = self.read_current()?;
        edit(&mut rules)?;
        rules.updated_at = Some(timestamp());
        self.write_atomic(&rules)?;
        info!("Saved rules to {}", self.path.display());
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_is_sibling() {
        let store = JsonRuleStore::new("/tmp/rules/mapping_rules.json");
        assert_eq!(
            store.lock_path(),
            PathBuf::from("/tmp/rules/mapping_rules.json.lock")
        );
    }

    #[test]
    fn memory_store_updates_timestamp() {
        let store = MemoryRuleStore::default();
        let rules = store.promote_column("Coupon", "coupon_code").unwrap();
        assert!(rules.updated_at.is_some());
        assert_eq!(store.load().promotion_for("Coupon"), Some("coupon_code"));
    }

    #[test]
    fn held_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            JsonRuleStore::new(dir.path().join("rules.json")).with_lock_timeout(Duration::from_millis(50));
        let _held = FileLock::acquire(store.lock_path(), Duration::from_millis(50)).unwrap();
        assert!(matches!(
            store.promote_column("a", "b"),
            Err(StoreError::LockTimeout { .. })
        ));
    }

    #[test]
    fn leftover_lock_file_does_not_block_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            JsonRuleStore::new(dir.path().join("rules.json")).with_lock_timeout(Duration::from_millis(50));
        fs::write(store.lock_path(), "12345").unwrap();
        store.promote_column("Coupon", "coupon_code").unwrap();

        drop(FileLock::acquire(store.lock_path(), Duration::from_millis(50)).unwrap());
        store.promote_column("Gift", "gift_note").unwrap();
        assert!(store.lock_path().exists());
        assert_eq!(store.load().column_promotions.len(), 2);
    }

    #[test]
    fn kept_output_name_belongs_to_one_column() {
        let store = MemoryRuleStore::default();
        store.promote_column("Coupon", "promo").unwrap();
        assert!(matches!(
            store.promote_column("Promo Code", " promo "),
            Err(StoreError::OutputNameTaken { ref holder, .. }) if holder == "Coupon"
        ));
        store.promote_column("Coupon", "promo").unwrap();
        store.promote_column("Coupon", "coupon_code").unwrap();
        store.promote_column("Promo Code", "promo").unwrap();

        let rules = store.load();
        assert_eq!(rules.promotion_for("Coupon"), Some("coupon_code"));
        assert_eq!(rules.promotion_for("Promo Code"), Some("promo"));
    }

    #[test]
    fn failed_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRuleStore::new(dir.path().join("rules.json"));
        store.promote_column("Coupon", "promo").unwrap();
        let before = fs::read_to_string(store.path()).unwrap();
        assert!(store.promote_column("Voucher", "promo").is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }
}
