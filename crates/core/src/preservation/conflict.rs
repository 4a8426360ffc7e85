//! Version conflict resolution

use tether_domain::{ConflictRecord, ConflictStrategy, Reminder};

/// Merge a local edit with the current remote copy.
///
/// If the local copy was modified strictly later, its field values win.
/// Otherwise the remote copy wins, except that optional fields the remote
/// left unset (and an empty remote task list) are taken from local. Tasks are
/// replaced as a whole list, never merged item by item.
///
/// The result's version is `max(local, remote) + 1`: the version the remote
/// will assign once the merged copy is written against `remote.version`.
pub fn merge(local: &Reminder, remote: &Reminder) -> Reminder {
    let mut merged = if local.updated_at > remote.updated_at {
        Reminder { created_at: remote.created_at, ..local.clone() }
    } else {
        let mut merged = remote.clone();
        if merged.due_time.is_none() {
            merged.due_time = local.due_time;
        }
        if merged.end_date.is_none() {
            merged.end_date = local.end_date;
        }
        if merged.parent_id.is_none() {
            merged.parent_id.clone_from(&local.parent_id);
        }
        if merged.tasks.is_empty() {
            merged.tasks.clone_from(&local.tasks);
        }
        merged
    };

    let base = local.version.unwrap_or(0).max(remote.version.unwrap_or(0));
    merged.id.clone_from(&remote.id);
    merged.version = Some(base + 1);
    merged.updated_at = local.updated_at.max(remote.updated_at);
    merged
}

/// The copy to write for a caller-selected strategy.
///
/// `Remote` keeps the remote snapshot unchanged. `Local` and `Merge` produce a
/// copy carrying the remote version, ready for a versioned write.
pub fn resolve(record: &ConflictRecord, strategy: ConflictStrategy) -> Reminder {
    match strategy {
        ConflictStrategy::Remote => record.remote_snapshot.clone(),
        ConflictStrategy::Local => {
            Reminder { version: record.remote_version, ..record.local_snapshot.clone() }
        }
        ConflictStrategy::Merge => {
            let merged = merge(&record.local_snapshot, &record.remote_snapshot);
            Reminder { version: record.remote_version, ..merged }
        }
    }
}
