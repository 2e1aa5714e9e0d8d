//! Collision-free output naming.
//!
//! Names have the form `{label}_{YYYYMMDD}_{counter:03}{ext}`. The counter
//! is found by probing the filesystem from 1 upwards; the in-memory per-day
//! tally is bookkeeping only and never decides a name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::date::ResolvedDate;

/// Allocates output names for one batch.
#[derive(Debug, Default)]
pub struct Namer {
    day_counts: HashMap<String, u32>,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the `{label}_{YYYYMMDD}_` stem for a date.
    pub fn stem(parent_label: &str, date: &ResolvedDate) -> String {
        format!("{}_{}_", parent_label, date.day_key())
    }

    /// First `output_dir/{stem}{n:03}{extension}` (n = 1, 2, ...) that does
    /// not exist yet. Counters past 999 simply get wider.
    pub fn next_available_name(output_dir: &Path, stem: &str, extension: &str) -> PathBuf {
        let mut counter: u64 = 1;
        loop {
            let candidate = output_dir.join(format!("{stem}{counter:03}{extension}"));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Count one more image for `day_key` and return the new tally.
    pub fn record(&mut self, day_key: &str) -> u32 {
        let count = self.day_counts.entry(day_key.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}
