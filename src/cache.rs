//! Merchant directory flows over the snapshot cache.

use anyhow::{bail, Context, Result};
use fairsplit::MerchantDirectory;
use std::{thread, time::Duration};
use tracing::{info, warn};

use crate::snapshot::{SnapshotStore, SwapOutcome};

pub const MAX_WRITE_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Autocomplete answers never fail on the cache: a missing snapshot is seeded
/// and stored, an unreadable one is answered from a fresh seed and left alone.
pub fn suggest(store: &SnapshotStore, query: &str, limit: usize) -> Vec<String> {
    if query.is_empty() {
        return Vec::new();
    }

    let directory = match store.load() {
        Ok(Some(snapshot)) => MerchantDirectory::restore_or_seed(Some(snapshot.blob.as_str())),
        Ok(None) => {
            let directory = MerchantDirectory::seeded();
            if let Err(err) = cache_seed(store, &directory) {
                warn!(error = %err, "failed to cache seeded directory");
            }
            directory
        }
        Err(err) => {
            warn!(error = %err, "snapshot unavailable, using fresh directory");
            MerchantDirectory::seeded()
        }
    };

    directory
        .search(query, limit)
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn cache_seed(store: &SnapshotStore, directory: &MerchantDirectory) -> Result<()> {
    match store.compare_and_swap(None, &directory.serialize()?)? {
        SwapOutcome::Stored { version } => info!(%version, "cached seeded directory"),
        outcome => info!(?outcome, "another writer cached the directory first"),
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added { version: String },
    AlreadyPresent,
}

/// One read-insert step, not yet written back.
pub struct PendingInsert {
    directory: MerchantDirectory,
    expected: Option<String>,
}

impl PendingInsert {
    /// Reads the cache and inserts `name`. `None` when it is already there.
    ///
    /// A snapshot that cannot be decoded is an error: writing a reseeded
    /// directory over it would drop every merchant it holds.
    pub fn prepare(store: &SnapshotStore, name: &str) -> Result<Option<Self>> {
        let (mut directory, expected) = match store.load()? {
            Some(snapshot) => {
                let directory = MerchantDirectory::deserialize(&snapshot.blob).with_context(|| {
                    format!(
                        "refusing to update unreadable snapshot {}",
                        store.path().display()
                    )
                })?;
                (directory, Some(snapshot.version))
            }
            None => (MerchantDirectory::seeded(), None),
        };
        if directory.contains(name) {
            return Ok(None);
        }

        directory.insert(name);
        Ok(Some(PendingInsert {
            directory,
            expected,
        }))
    }

    pub fn commit(&self, store: &SnapshotStore) -> Result<SwapOutcome> {
        store.compare_and_swap(self.expected.as_deref(), &self.directory.serialize()?)
    }
}

pub fn add_merchant(store: &SnapshotStore, name: &str) -> Result<AddOutcome> {
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let Some(pending) = PendingInsert::prepare(store, name)? else {
            info!(merchant = %name, "merchant already present");
            return Ok(AddOutcome::AlreadyPresent);
        };

        match pending.commit(store)? {
            SwapOutcome::Stored { version } => {
                info!(merchant = %name, %version, merchants = pending.directory.len(), "added merchant");
                return Ok(AddOutcome::Added { version });
            }
            SwapOutcome::Conflict { current } => {
                warn!(attempt, ?current, "snapshot changed underneath, retrying");
            }
            SwapOutcome::Locked => warn!(attempt, "snapshot locked by another writer, retrying"),
        }
        thread::sleep(RETRY_BACKOFF * attempt);
    }

    bail!(
        "could not update {} after {MAX_WRITE_ATTEMPTS} attempts",
        store.path().display()
    )
}

pub fn seed(store: &SnapshotStore, force: bool) -> Result<String> {
    let existing = store.load()?;
    if existing.is_some() && !force {
        bail!(
            "{} already exists, pass --force to replace it",
            store.path().display()
        );
    }

    let directory = MerchantDirectory::seeded();
    let expected = existing.as_ref().map(|s| s.version.as_str());
    match store.compare_and_swap(expected, &directory.serialize()?)? {
        SwapOutcome::Stored { version } => {
            info!(%version, merchants = directory.len(), "seeded merchant snapshot");
            Ok(version)
        }
        outcome => bail!("snapshot was modified concurrently: {outcome:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("merchants.json"));
        (dir, store)
    }

    fn cached(store: &SnapshotStore) -> MerchantDirectory {
        let snapshot = store.load().unwrap().unwrap();
        MerchantDirectory::deserialize(&snapshot.blob).unwrap()
    }

    #[test]
    fn missing_cache_is_seeded_and_stored() {
        let (_dir, store) = store();

        assert_eq!(suggest(&store, "sta", 10), vec!["Starbucks"]);
        assert_eq!(cached(&store), MerchantDirectory::seeded());
    }

    #[test]
    fn empty_query_suggests_nothing() {
        let (_dir, store) = store();

        assert!(suggest(&store, "", 10).is_empty());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn unwritable_cache_still_answers() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("missing-dir").join("m.json"));

        assert_eq!(suggest(&store, "sta", 10), vec!["Starbucks"]);
    }

    #[test]
    fn malformed_cache_answers_from_seed_without_overwrite() {
        let (_dir, store) = store();
        fs::write(store.path(), "{\"children\":").unwrap();

        assert_eq!(suggest(&store, "star", 10), vec!["Starbucks"]);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{\"children\":");
    }

    #[test]
    fn suggestions_come_from_cache() {
        let (_dir, store) = store();
        let mut directory = MerchantDirectory::new();
        directory.insert("Joe's Diner");
        fs::write(store.path(), directory.serialize().unwrap()).unwrap();

        assert_eq!(suggest(&store, "JOE", 10), vec!["Joe's Diner"]);
        assert!(suggest(&store, "sta", 10).is_empty());
    }

    #[test]
    fn adds_to_seeded_directory() {
        let (_dir, store) = store();

        assert!(matches!(
            add_merchant(&store, "Joe's Diner").unwrap(),
            AddOutcome::Added { .. }
        ));
        let directory = cached(&store);
        assert!(directory.contains("Joe's Diner"));
        assert!(directory.contains("Starbucks"));
    }

    #[test]
    fn existing_merchant_is_a_no_op() {
        let (_dir, store) = store();
        seed(&store, false).unwrap();
        let before = store.load().unwrap();

        assert_eq!(
            add_merchant(&store, "Starbucks").unwrap(),
            AddOutcome::AlreadyPresent
        );
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn interleaved_inserts_both_survive() {
        let (_dir, store) = store();
        seed(&store, false).unwrap();

        let first = PendingInsert::prepare(&store, "Joe's Diner").unwrap().unwrap();
        let second = PendingInsert::prepare(&store, "Blue Bottle").unwrap().unwrap();

        assert!(matches!(first.commit(&store).unwrap(), SwapOutcome::Stored { .. }));
        assert!(matches!(
            second.commit(&store).unwrap(),
            SwapOutcome::Conflict { .. }
        ));

        // The losing writer starts over from the new version
        add_merchant(&store, "Blue Bottle").unwrap();
        let directory = cached(&store);
        assert!(directory.contains("Joe's Diner"));
        assert!(directory.contains("Blue Bottle"));
    }

    #[test]
    fn malformed_cache_is_not_overwritten_by_inserts() {
        let (_dir, store) = store();
        fs::write(store.path(), "not json").unwrap();

        assert!(add_merchant(&store, "Joe's Diner").is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "not json");
    }

    #[test]
    fn seed_refuses_to_replace_without_force() {
        let (_dir, store) = store();
        add_merchant(&store, "Joe's Diner").unwrap();

        assert!(seed(&store, false).is_err());
        assert!(cached(&store).contains("Joe's Diner"));

        seed(&store, true).unwrap();
        assert_eq!(cached(&store), MerchantDirectory::seeded());
    }

    #[test]
    fn leftover_lock_does_not_block_forever() {
        let (_dir, store) = store();
        let mut lock = store.path().as_os_str().to_owned();
        lock.push(".lock");
        fs::write(&lock, "").unwrap();

        let store = store.with_stale_lock_after(Duration::ZERO);
        assert!(matches!(
            add_merchant(&store, "Joe's Diner").unwrap(),
            AddOutcome::Added { .. }
        ));
    }
}
