//! Stratified train/test partitioning with small-category rescue.
//!
//! Categories whose cardinality is at or below a configurable floor cannot be
//! split while preserving stratification, so their records are routed wholly
//! to train instead of being discarded. The remaining categories are split
//! per category with a deterministic, seeded ordering so repeated runs over
//! the same dataset produce identical partitions.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;

/// Parameters for the stratified split.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitOptions {
    /// Target proportion of splittable records assigned to train, in (0, 1).
    pub train_fraction: f64,
    /// Seed for the deterministic per-record ordering.
    pub seed: u64,
    /// Categories with at most this many records go wholly to train.
    pub min_splittable_count: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            seed: 42,
            min_splittable_count: 5,
        }
    }
}

/// Errors raised for invalid partitioning inputs. All fail fast with no
/// partial result.
#[derive(Debug, Error)]
pub enum SplitError {
    /// `train_fraction` must lie strictly between 0 and 1.
    #[error("invalid train fraction {0} (expected a value strictly between 0 and 1)")]
    InvalidFraction(f64),
    /// No record carries a value for the stratification column.
    #[error("no records carry a stratification value")]
    EmptyCategory,
    /// Nothing remains to stratify once small categories are set aside.
    #[error("no categories remain splittable after the small-category cutoff")]
    DegenerateSplit,
}

/// Which partition a record landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Training partition.
    Train,
    /// Test partition.
    Test,
}

/// Per-record split decision, parallel to the input record order.
#[derive(Debug, Clone)]
pub struct SplitAssignment {
    slots: Vec<Slot>,
    /// Records routed unconditionally to train (small categories, singletons,
    /// missing stratification values).
    pub rescued_records: usize,
    /// Distinct categories routed unconditionally to train.
    pub rescued_categories: usize,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    split: Split,
    order: u128,
}

/// The two output partitions, each in a fresh deterministic order that is
/// independent of the source ordering.
#[derive(Debug, Clone)]
pub struct Partitions<T> {
    /// Training partition; always receives the rescued categories.
    pub train: Vec<T>,
    /// Test partition; only holds records from splittable categories.
    pub test: Vec<T>,
    /// Records routed unconditionally to train.
    pub rescued_records: usize,
    /// Distinct categories routed unconditionally to train.
    pub rescued_categories: usize,
}

/// Split `records` into train and test partitions, stratified by `category`.
///
/// `record_id` must be unique within the dataset; it feeds the seeded hash
/// that fixes each record's position, so identical inputs and seed yield
/// byte-identical partitions.
pub fn partition<T>(
    records: Vec<T>,
    options: &SplitOptions,
    category: impl Fn(&T) -> Option<&str>,
    record_id: impl Fn(&T) -> &str,
) -> Result<Partitions<T>, SplitError> {
    let assignment = assign(&records, options, &category, &record_id)?;
    Ok(apply(records, &assignment))
}

/// Compute split decisions without consuming the records.
///
/// Callers that want to treat [`SplitError::DegenerateSplit`] as "nothing to
/// stratify" can keep the dataset and fall back to an all-train output.
pub fn assign<T>(
    records: &[T],
    options: &SplitOptions,
    category: impl Fn(&T) -> Option<&str>,
    record_id: impl Fn(&T) -> &str,
) -> Result<SplitAssignment, SplitError> {
    if !(options.train_fraction > 0.0 && options.train_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(options.train_fraction));
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        if let Some(value) = category(record).filter(|value| !value.is_empty()) {
            *counts.entry(value).or_default() += 1;
        }
    }
    if counts.is_empty() {
        return Err(SplitError::EmptyCategory);
    }

    // A category of one cannot appear in both partitions, so it is
    // unsplittable even when the floor is zero.
    let splittable: BTreeSet<&str> = counts
        .iter()
        .filter(|&(_, &count)| count > options.min_splittable_count && count > 1)
        .map(|(&value, _)| value)
        .collect();
    if splittable.is_empty() {
        return Err(SplitError::DegenerateSplit);
    }
    let rescued_categories = counts.len() - splittable.len();

    let mut slots = vec![
        Slot {
            split: Split::Train,
            order: 0,
        };
        records.len()
    ];
    let mut rescued_records = 0usize;
    let mut by_category: BTreeMap<&str, Vec<(u128, usize)>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let value = category(record).filter(|value| !value.is_empty());
        let key = order_key(options.seed, value.unwrap_or(""), record_id(record));
        slots[idx].order = key;
        match value {
            Some(value) if splittable.contains(value) => {
                by_category.entry(value).or_default().push((key, idx));
            }
            // Small categories and records without a stratification value
            // (an upstream cleaning miss) stay in train.
            _ => rescued_records += 1,
        }
    }

    for entries in by_category.values_mut() {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let count = entries.len();
        // Explicit rounding rule: train gets round(n * fraction), remainder
        // to test. 10 records at 0.8 give exactly 8; 2 records at 0.8 round
        // to 2 and the category is absent from test.
        let train_count = (((count as f64) * options.train_fraction).round() as usize).min(count);
        for (position, (_, idx)) in entries.iter().enumerate() {
            slots[*idx].split = if position < train_count {
                Split::Train
            } else {
                Split::Test
            };
        }
    }

    Ok(SplitAssignment {
        slots,
        rescued_records,
        rescued_categories,
    })
}

/// Materialize partitions from a previously computed assignment.
///
/// `assignment` must come from [`assign`] over the same record sequence.
pub fn apply<T>(records: Vec<T>, assignment: &SplitAssignment) -> Partitions<T> {
    let mut train: Vec<(u128, T)> = Vec::new();
    let mut test: Vec<(u128, T)> = Vec::new();
    for (record, slot) in records.into_iter().zip(assignment.slots.iter()) {
        match slot.split {
            Split::Train => train.push((slot.order, record)),
            Split::Test => test.push((slot.order, record)),
        }
    }
    // Re-index both partitions by hash order so the output layout does not
    // leak the source ordering.
    train.sort_by(|a, b| a.0.cmp(&b.0));
    test.sort_by(|a, b| a.0.cmp(&b.0));
    Partitions {
        train: train.into_iter().map(|(_, record)| record).collect(),
        test: test.into_iter().map(|(_, record)| record).collect(),
        rescued_records: assignment.rescued_records,
        rescued_categories: assignment.rescued_categories,
    }
}

fn order_key(seed: u64, category: &str, record_id: &str) -> u128 {
    let hash = blake3::hash(format!("{seed}|{category}|{record_id}").as_bytes());
    u128::from_le_bytes(hash.as_bytes()[0..16].try_into().expect("slice size"))
}
