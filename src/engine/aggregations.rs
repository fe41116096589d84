//! Per-family aggregation scans
//!
//! Each function reads the event slice once and never mutates it. Date
//! comparisons are at UTC day granularity and both range ends are
//! inclusive.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::event::{Event, EventKind};

/// Whether a lifetime `[created, destroyed)` touches `[from, to]`.
///
/// Created on or before `to`, and either still alive or destroyed strictly
/// after `from`. An entity destroyed on `from` itself is excluded.
#[must_use]
pub fn lifetime_intersects(
    created: NaiveDate,
    destroyed: Option<NaiveDate>,
    from: NaiveDate,
    to: NaiveDate,
) -> bool {
    created <= to && destroyed.map_or(true, |d| d > from)
}

/// Workspaces whose lifetime intersects `[from, to]`, sorted ascending.
///
/// A lifetime opens at `TenantCreated`, or implicitly at the first
/// `ProjectCreated` in a workspace that has no open lifetime, and closes at
/// `TenantDestroyed`. Events are replayed in timestamp order (append order
/// on ties) because the log itself is not sorted.
pub(crate) fn active_workspaces(events: &[Event], from: NaiveDate, to: NaiveDate) -> Vec<String> {
    let mut lifecycle: Vec<&Event> = events
        .iter()
        .filter(|e| {
            matches!(
                e.kind(),
                EventKind::TenantCreated | EventKind::TenantDestroyed | EventKind::ProjectCreated
            )
        })
        .collect();
    lifecycle.sort_by_key(|e| e.timestamp());

    let mut open: FxHashMap<&str, NaiveDate> = FxHashMap::default();
    let mut active: FxHashSet<&str> = FxHashSet::default();

    for event in lifecycle {
        let Some(ws) = event.workspace() else {
            continue;
        };
        match event.kind() {
            EventKind::TenantCreated | EventKind::ProjectCreated => {
                open.entry(ws).or_insert_with(|| event.day());
            }
            EventKind::TenantDestroyed => {
                // Destruction without an open lifetime is ignored
                if let Some(created) = open.remove(ws) {
                    if lifetime_intersects(created, Some(event.day()), from, to) {
                        active.insert(ws);
                    }
                }
            }
            EventKind::UserCreated | EventKind::ShellLaunched => {}
        }
    }

    for (ws, created) in open {
        if lifetime_intersects(created, None, from, to) {
            active.insert(ws);
        }
    }

    let mut workspaces: Vec<String> = active.into_iter().map(str::to_string).collect();
    workspaces.sort_unstable();
    workspaces
}

/// One `[workspace, user]` pair per `kind` event inside `[from, to]`.
///
/// Duplicates are kept here; the result set collapses them.
pub(crate) fn workspace_user_pairs(
    events: &[Event],
    kind: EventKind,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<Vec<String>> {
    events
        .iter()
        .filter(|e| e.kind() == kind && (from..=to).contains(&e.day()))
        .filter_map(|e| {
            e.workspace()
                .map(|ws| vec![ws.to_string(), e.owner_id().to_string()])
        })
        .collect()
}

// Greater is better: more projects, then the smaller user id
#[derive(Debug, PartialEq, Eq)]
struct CreatorRank<'a> {
    projects: u64,
    user: &'a str,
}

impl Ord for CreatorRank<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.projects
            .cmp(&other.projects)
            .then_with(|| other.user.cmp(self.user))
    }
}

impl PartialOrd for CreatorRank<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Up to `limit` users with the most `ProjectCreated` events in `[from, to]`.
///
/// Min-heap Top-K: O(N log K) time, O(K) heap space.
pub(crate) fn top_project_creators(
    events: &[Event],
    from: NaiveDate,
    to: NaiveDate,
    limit: usize,
) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let mut tally: FxHashMap<&str, u64> = FxHashMap::default();
    for event in events.iter().filter(|e| {
        e.kind() == EventKind::ProjectCreated
            && !e.owner_id().is_empty()
            && (from..=to).contains(&e.day())
    }) {
        *tally.entry(event.owner_id()).or_default() += 1;
    }

    // Reverse keeps the weakest candidate at the top
    let mut heap: BinaryHeap<Reverse<CreatorRank<'_>>> = BinaryHeap::with_capacity(limit);
    for (user, projects) in tally {
        let rank = CreatorRank { projects, user };
        if heap.len() < limit {
            heap.push(Reverse(rank));
        } else if let Some(Reverse(weakest)) = heap.peek() {
            if rank > *weakest {
                heap.pop();
                heap.push(Reverse(rank));
            }
        }
    }

    let mut ranked: Vec<CreatorRank<'_>> = heap.into_iter().map(|Reverse(r)| r).collect();
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    ranked.into_iter().map(|r| r.user.to_string()).collect()
}
