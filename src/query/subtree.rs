//! Descendant reachability over the family tables
//!
//! A person reaches another if a chain of parent -> family -> child links
//! leads from one to the other:
//! - `families.father_id` / `families.mother_id` link a parent to a family
//! - `children(family_id, person_id)` links a family to each child

use std::collections::{HashSet, VecDeque};
use crate::Result;
use crate::storage::Store;
use crate::storage::schema;

/// Reachability queries against a store
pub struct SubtreeQuery<'a> {
    store: &'a Store,
}

impl<'a> SubtreeQuery<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Whether `target_id` is `root_id` or one of its descendants.
    ///
    /// Breadth-first, returning as soon as the target shows up as a child.
    /// Every person is expanded at most once, so cyclic data terminates.
    pub fn is_reachable(&self, root_id: &str, target_id: &str) -> Result<bool> {
        if root_id == target_id {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(root_id.to_string());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            for family_id in self.families_of(&current)? {
                for child_id in self.children_of(&family_id)? {
                    if child_id == target_id {
                        tracing::debug!("{} reaches {} via family {}", root_id, target_id, family_id);
                        return Ok(true);
                    }
                    if !visited.contains(&child_id) {
                        queue.push_back(child_id);
                    }
                }
            }
        }

        Ok(false)
    }

    /// Families where the person is father or mother
    fn families_of(&self, person_id: &str) -> Result<Vec<String>> {
        self.store.query_strings(schema::FAMILIES_BY_PARENT, [person_id])
    }

    fn children_of(&self, family_id: &str) -> Result<Vec<String>> {
        self.store.query_strings(schema::CHILDREN_OF_FAMILY, [family_id])
    }
}
