//! In-memory deduplicating record store
//!
//! Pagination tasks run concurrently and fold records in through `upsert`.
//! The store is read once, through `snapshot`, after every task has joined.

use crate::records::{Course, CourseCode, Program};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

/// A keyed map where every write replaces the previous value for its key
#[derive(Debug)]
pub struct RecordStore<K, V> {
    records: Mutex<HashMap<K, V>>,
}

impl<K, V> RecordStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the record stored under `key`
    ///
    /// Returns true if the key was not present before.
    pub fn upsert(&self, key: K, record: V) -> bool {
        self.lock().insert(key, record).is_none()
    }

    /// Copies the current contents out of the store
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A writer that panicked mid-insert cannot leave the map half-written,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K, V> Default for RecordStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// The records of one harvest run, split into disjoint keyspaces
#[derive(Debug, Default)]
pub struct HarvestStore {
    pub courses: RecordStore<CourseCode, Course>,
    pub programs: RecordStore<String, Program>,
}

impl HarvestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_course(&self, course: Course) -> bool {
        self.courses.upsert(course.code.clone(), course)
    }

    pub fn upsert_program(&self, program: Program) -> bool {
        self.programs.upsert(program.code.clone(), program)
    }

    /// Takes the read-only view handed to the loader, ordered by code
    pub fn snapshot(&self) -> HarvestSnapshot {
        let mut courses: Vec<Course> = self.courses.snapshot().into_values().collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));

        let mut programs: Vec<Program> = self.programs.snapshot().into_values().collect();
        programs.sort_by(|a, b| a.code.cmp(&b.code));

        HarvestSnapshot { courses, programs }
    }
}

/// Frozen contents of a [`HarvestStore`]
#[derive(Debug, Clone, Default)]
pub struct HarvestSnapshot {
    pub courses: Vec<Course>,
    pub programs: Vec<Program>,
}

impl HarvestSnapshot {
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty() && self.programs.is_empty()
    }
}
