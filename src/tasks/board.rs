//! Board assembly and the task dependency graph.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::shared::models::{Task, TaskDependency};
use crate::tasks::types::{DependencyEdge, TaskResponse};

/// Hierarchical board view: top-level tasks with their direct subtasks.
/// Dependency edges ride alongside the tree since a task may depend on a
/// task outside its parent/child chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub entries: Vec<BoardEntry>,
    pub dependencies: Vec<DependencyEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEntry {
    pub task: TaskResponse,
    pub subtasks: Vec<TaskResponse>,
}

/// Builds the board hierarchy from a project's flat task set.
///
/// Ordering is creation order (created_at ascending, id as tiebreak) at both
/// levels. A subtask whose parent is missing from the set is surfaced
/// top-level rather than dropped.
pub fn assemble(tasks: Vec<Task>, dependencies: Vec<TaskDependency>) -> Board {
    let mut tasks = tasks;
    tasks.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

    let ids: HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut children: HashMap<Uuid, Vec<TaskResponse>> = HashMap::new();
    let mut top_level: Vec<Task> = Vec::new();

    for task in tasks {
        match task.parent_task_id {
            Some(parent) if ids.contains(&parent) => {
                children.entry(parent).or_default().push(task.into());
            }
            _ => top_level.push(task),
        }
    }

    let entries = top_level
        .into_iter()
        .map(|task| {
            let subtasks = children.remove(&task.id).unwrap_or_default();
            BoardEntry {
                task: task.into(),
                subtasks,
            }
        })
        .collect();

    Board {
        entries,
        dependencies: dependencies.into_iter().map(Into::into).collect(),
    }
}

/// Directed dependency edges as adjacency sets, used to validate insertions
/// before commit.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: HashMap<Uuid, HashSet<Uuid>>,
}

impl DependencyGraph {
    pub fn from_edges(edges: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        let mut graph = Self::default();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    pub fn add_edge(&mut self, from: Uuid, to: Uuid) {
        self.edges.entry(from).or_default().insert(to);
    }

    /// True when `to` can already reach `from`, so adding `from -> to`
    /// would close a cycle. A self-edge always counts.
    pub fn would_create_cycle(&self, from: Uuid, to: Uuid) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![to];
        while let Some(node) = stack.pop() {
            if node == from {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = self.edges.get(&node) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }
}

/// Walks the parent chain upward from `candidate_parent`; assigning it as
/// the parent of `child` must not revisit `child`.
pub fn parent_chain_has_cycle(
    parents: &HashMap<Uuid, Option<Uuid>>,
    child: Uuid,
    candidate_parent: Uuid,
) -> bool {
    if child == candidate_parent {
        return true;
    }
    let mut seen = HashSet::new();
    let mut current = Some(candidate_parent);
    while let Some(node) = current {
        if node == child {
            return true;
        }
        if !seen.insert(node) {
            // Pre-existing loop in stored data; treat as cyclic.
            return true;
        }
        current = parents.get(&node).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn task(id: Uuid, parent: Option<Uuid>, offset_secs: i64) -> Task {
        let now = Utc::now() + Duration::seconds(offset_secs);
        Task {
            id,
            project_id: Uuid::new_v4(),
            key: format!("SP-{}", offset_secs),
            title: "t".to_string(),
            description: None,
            status: "todo".to_string(),
            priority: "Medium".to_string(),
            assignee_id: None,
            reporter_id: None,
            parent_task_id: parent,
            due_date: None,
            generated_by: "user".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn nests_direct_subtasks_under_parents() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let board = assemble(
            vec![task(a, None, 0), task(b, Some(a), 1), task(c, None, 2)],
            vec![],
        );

        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].task.id, a);
        assert_eq!(board.entries[0].subtasks.len(), 1);
        assert_eq!(board.entries[0].subtasks[0].id, b);
        assert!(board.entries[1].subtasks.is_empty());
    }

    #[test]
    fn orders_by_creation_at_both_levels() {
        let p = Uuid::new_v4();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let board = assemble(
            vec![task(s2, Some(p), 30), task(p, None, 0), task(s1, Some(p), 10)],
            vec![],
        );

        assert_eq!(board.entries.len(), 1);
        let subtasks: Vec<Uuid> = board.entries[0].subtasks.iter().map(|t| t.id).collect();
        assert_eq!(subtasks, vec![s1, s2]);
    }

    #[test]
    fn orphan_subtask_surfaces_top_level() {
        let missing_parent = Uuid::new_v4();
        let orphan = Uuid::new_v4();
        let board = assemble(vec![task(orphan, Some(missing_parent), 0)], vec![]);
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].task.id, orphan);
    }

    #[test]
    fn dependencies_ride_alongside() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let board = assemble(
            vec![task(a, None, 0), task(b, None, 1)],
            vec![TaskDependency {
                task_id: b,
                depends_on_task_id: a,
                created_at: Utc::now(),
            }],
        );
        assert_eq!(board.dependencies.len(), 1);
        assert_eq!(board.dependencies[0].task_id, b);
    }

    #[test]
    fn detects_dependency_cycles() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let graph = DependencyGraph::from_edges([(a, b), (b, c)]);

        assert!(graph.would_create_cycle(c, a));
        assert!(graph.would_create_cycle(c, b));
        assert!(graph.would_create_cycle(a, a));
        assert!(!graph.would_create_cycle(a, c));
    }

    #[test]
    fn detects_parent_chain_cycles() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut parents = HashMap::new();
        parents.insert(a, None::<Uuid>);
        parents.insert(b, Some(a));
        parents.insert(c, Some(b));

        assert!(parent_chain_has_cycle(&parents, a, c));
        assert!(parent_chain_has_cycle(&parents, a, a));
        assert!(!parent_chain_has_cycle(&parents, c, a));
    }
}
