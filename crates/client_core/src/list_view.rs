//! Keyed list rendering for truck snapshots.
//!
//! Row identity is tracked explicitly: every row gets a [`MountId`] when its
//! key first appears and keeps it for as long as the key stays in the
//! sequence, however often the sequence is replaced.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde_json::Value;
use shared::{domain::Truck, status::ConnectionStatus};
use tracing::warn;

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Truck {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl<T: Keyed + ?Sized> Keyed for &T {
    fn key(&self) -> &str {
        (**self).key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Removed { key: String },
    Added { key: String, index: usize },
    Updated { key: String, index: usize },
}

impl RowChange {
    pub fn key(&self) -> &str {
        match self {
            RowChange::Removed { key }
            | RowChange::Added { key, .. }
            | RowChange::Updated { key, .. } => key,
        }
    }
}

impl fmt::Display for RowChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowChange::Removed { key } => write!(f, "- {key}"),
            RowChange::Added { key, index } => write!(f, "+ {key} @{index}"),
            RowChange::Updated { key, index } => write!(f, "~ {key} @{index}"),
        }
    }
}

/// Computes the changes turning `previous` into `next`. Both sides must hold
/// unique keys. Removals come first in `previous` order, followed by
/// additions and updates in `next` order. Keys present on both sides with
/// equal content produce nothing.
pub fn diff_by_key<T: Keyed + PartialEq>(previous: &[T], next: &[T]) -> Vec<RowChange> {
    let before: HashMap<&str, &T> = previous.iter().map(|item| (item.key(), item)).collect();
    let after: HashSet<&str> = next.iter().map(Keyed::key).collect();

    let mut changes: Vec<RowChange> = previous
        .iter()
        .filter(|item| !after.contains(item.key()))
        .map(|item| RowChange::Removed {
            key: item.key().to_string(),
        })
        .collect();

    for (index, item) in next.iter().enumerate() {
        match before.get(item.key()) {
            None => changes.push(RowChange::Added {
                key: item.key().to_string(),
                index,
            }),
            Some(old) if *old != item => changes.push(RowChange::Updated {
                key: item.key().to_string(),
                index,
            }),
            Some(_) => {}
        }
    }

    changes
}

/// Drops every item whose key was already seen, keeping the first.
pub fn dedupe_by_key<T: Keyed>(items: &[T]) -> Vec<&T> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.key()) {
            unique.push(item);
        } else {
            warn!(key = item.key(), "duplicate key in snapshot, keeping first occurrence");
        }
    }
    unique
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(pub u64);

/// Trucks handed to the list from outside rather than read from the live
/// subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TruckListProps {
    pub trucks: Vec<Truck>,
}

impl TruckListProps {
    pub fn new(trucks: Vec<Truck>) -> Self {
        Self { trucks }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub key: String,
    pub mount_id: MountId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedList {
    pub header: String,
    pub rows: Vec<RenderedRow>,
    pub changes: Vec<RowChange>,
}

impl RenderedList {
    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.key.as_str()).collect()
    }

    pub fn mount_of(&self, key: &str) -> Option<MountId> {
        self.rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| row.mount_id)
    }
}

impl fmt::Display for RenderedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        writeln!(f, "{}", "-".repeat(self.header.len()))?;
        for row in &self.rows {
            writeln!(f, "{}", row.text)?;
        }
        Ok(())
    }
}

pub fn header(status: ConnectionStatus) -> String {
    format!("Trucks - state [{}]", status.label())
}

struct Row {
    truck: Truck,
    mount_id: MountId,
}

#[derive(Default)]
pub struct TruckList {
    rows: Vec<Row>,
    next_mount: u64,
}

impl TruckList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replaces the rows with `trucks`, keeping the mount of every key that
    /// survives.
    pub fn reconcile(&mut self, trucks: &[Truck]) -> Vec<RowChange> {
        let next = dedupe_by_key(trucks);
        let previous: Vec<&Truck> = self.rows.iter().map(|row| &row.truck).collect();
        let changes = diff_by_key(&previous, &next);

        let mut mounts: HashMap<String, MountId> = self
            .rows
            .drain(..)
            .map(|row| (row.truck.id.0, row.mount_id))
            .collect();

        let mut rows = Vec::with_capacity(next.len());
        for truck in next {
            let mount_id = match mounts.remove(truck.key()) {
                Some(mount_id) => mount_id,
                None => {
                    self.next_mount += 1;
                    MountId(self.next_mount)
                }
            };
            rows.push(Row {
                truck: truck.clone(),
                mount_id,
            });
        }
        self.rows = rows;

        changes
    }

    pub fn render(&mut self, status: ConnectionStatus, trucks: &[Truck]) -> RenderedList {
        let changes = self.reconcile(trucks);
        RenderedList {
            header: header(status),
            rows: self
                .rows
                .iter()
                .map(|row| RenderedRow {
                    key: row.truck.id.0.clone(),
                    mount_id: row.mount_id,
                    text: row_text(&row.truck),
                })
                .collect(),
            changes,
        }
    }

    pub fn render_props(&mut self, status: ConnectionStatus, props: &TruckListProps) -> RenderedList {
        self.render(status, &props.trucks)
    }
}

fn row_text(truck: &Truck) -> String {
    let mut text = truck.id.to_string();
    for (name, value) in &truck.attributes {
        text.push_str("  ");
        text.push_str(name);
        text.push('=');
        match value {
            Value::String(s) => text.push_str(s),
            other => text.push_str(&other.to_string()),
        }
    }
    text
}

#[cfg(test)]
#[path = "tests/list_view_tests.rs"]
mod tests;
