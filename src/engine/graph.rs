//! Hierarchy Builder: arena-backed parent/child forest.
//!
//! Tasks are addressed by slot (their position in the deduplicated input),
//! never by reference, so the forest carries no pointer cycles.

use super::error::EngineError;
use super::types::Task;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct TaskForest<'a> {
    tasks: Vec<&'a Task>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    index: HashMap<i64, usize>,
}

impl<'a> TaskForest<'a> {
    /// Builds the forest from a flat snapshot.
    ///
    /// Tasks whose parent is absent from the snapshot become roots.
    /// Sibling order follows input order.
    ///
    /// # Errors
    /// Returns `MalformedHierarchy` if parent links form a cycle.
    pub fn build(input: &'a [Task]) -> Result<Self, EngineError> {
        let mut tasks = Vec::with_capacity(input.len());
        let mut index = HashMap::with_capacity(input.len());

        // Pass 1: id -> slot.
        for task in input {
            if index.contains_key(&task.id) {
                warn!(task_id = task.id, "duplicate task id in snapshot, keeping first");
                continue;
            }
            index.insert(task.id, tasks.len());
            tasks.push(task);
        }

        // Pass 2: link by slot.
        let mut children = vec![Vec::new(); tasks.len()];
        let mut roots = Vec::new();
        let mut links = DiGraphMap::<i64, ()>::new();

        for (slot, task) in tasks.iter().enumerate() {
            links.add_node(task.id);
            match task.parent_task_id.and_then(|pid| index.get(&pid).map(|&p| (pid, p))) {
                Some((pid, parent_slot)) => {
                    links.add_edge(pid, task.id, ());
                    children[parent_slot].push(slot);
                }
                None => {
                    if let Some(pid) = task.parent_task_id {
                        debug!(task_id = task.id, parent_id = pid, "parent not in snapshot, promoting to root");
                    }
                    roots.push(slot);
                }
            }
        }

        if is_cyclic_directed(&links) {
            return Err(EngineError::MalformedHierarchy {
                ids: cycle_members(&links),
            });
        }

        Ok(Self {
            tasks,
            children,
            roots,
            index,
        })
    }

    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    #[must_use]
    pub fn children(&self, slot: usize) -> &[usize] {
        &self.children[slot]
    }

    #[must_use]
    pub fn task(&self, slot: usize) -> &'a Task {
        self.tasks[slot]
    }

    /// Slot of the task with the given id, if present.
    #[must_use]
    pub fn slot_of(&self, id: i64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Collects the ids of every task sitting on a parent cycle, sorted.
fn cycle_members(links: &DiGraphMap<i64, ()>) -> Vec<i64> {
    let mut ids: Vec<i64> = tarjan_scc(links)
        .into_iter()
        .filter(|scc| scc.len() > 1 || links.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_task(id: i64, parent: Option<i64>) -> Task {
        let mut task = Task::new(id, &format!("task {id}"), Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        task.parent_task_id = parent;
        task
    }

    fn ids(forest: &TaskForest<'_>, slots: &[usize]) -> Vec<i64> {
        slots.iter().map(|&s| forest.task(s).id).collect()
    }

    #[test]
    fn test_children_keep_input_order() {
        let tasks = vec![
            make_task(1, None),
            make_task(3, Some(1)),
            make_task(2, Some(1)),
            make_task(4, None),
        ];
        let forest = TaskForest::build(&tasks).unwrap();
        assert_eq!(ids(&forest, forest.roots()), vec![1, 4]);
        assert_eq!(ids(&forest, forest.children(0)), vec![3, 2]);
    }

    #[test]
    fn test_child_listed_before_parent() {
        let tasks = vec![make_task(2, Some(1)), make_task(1, None)];
        let forest = TaskForest::build(&tasks).unwrap();
        assert_eq!(ids(&forest, forest.roots()), vec![1]);
        let parent = forest.slot_of(1).unwrap();
        assert_eq!(ids(&forest, forest.children(parent)), vec![2]);
    }

    #[test]
    fn test_dangling_parent_becomes_root() {
        let tasks = vec![make_task(1, None), make_task(2, Some(99))];
        let forest = TaskForest::build(&tasks).unwrap();
        assert_eq!(ids(&forest, forest.roots()), vec![1, 2]);
    }

    #[test]
    fn test_cycle_is_malformed() {
        let tasks = vec![make_task(1, Some(3)), make_task(2, Some(1)), make_task(3, Some(2)), make_task(4, None)];
        let err = TaskForest::build(&tasks).err().unwrap();
        assert_eq!(err, EngineError::MalformedHierarchy { ids: vec![1, 2, 3] });
    }

    #[test]
    fn test_self_parent_is_malformed() {
        let tasks = vec![make_task(7, Some(7))];
        let err = TaskForest::build(&tasks).err().unwrap();
        assert_eq!(err, EngineError::MalformedHierarchy { ids: vec![7] });
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut dup = make_task(1, None);
        dup.title = "second".to_string();
        let tasks = vec![make_task(1, None), dup];
        let forest = TaskForest::build(&tasks).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.task(0).title, "task 1");
    }
}
