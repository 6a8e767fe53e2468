//! Process-tree discovery: which processes were (transitively) spawned by a
//! launched root process.

use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;

use dashmap::DashMap;
use tracing::debug;

use crate::desktop::{Desktop, Pid, ProcessEntry};

/// One process of a snapshot. `parent_id` is 0 when the parent could not be
/// resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessNode {
    pub id: Pid,
    pub parent_id: Pid,
}

#[derive(Debug, Clone)]
pub struct ProcessTreeScanner {
    workers: usize,
}

impl Default for ProcessTreeScanner {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .min(8);
        Self::new(workers)
    }
}

impl ProcessTreeScanner {
    /// `workers` threads resolve parent ids in parallel; 0 and 1 both mean inline.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Descendants of `root` in a fresh snapshot, in discovery order. `root`
    /// itself is never part of the result.
    pub fn descendants_of<D: Desktop + ?Sized>(&self, desktop: &D, root: Pid) -> Vec<Pid> {
        let snapshot = desktop.list_processes();
        self.descendants_in(desktop, &snapshot, root)
    }

    /// Same as [`descendants_of`](Self::descendants_of) against a snapshot the
    /// caller already took.
    pub fn descendants_in<D: Desktop + ?Sized>(
        &self,
        desktop: &D,
        snapshot: &[ProcessEntry],
        root: Pid,
    ) -> Vec<Pid> {
        let nodes = self.resolve_parents(desktop, snapshot);
        let descendants = collect_descendants(&nodes, root);
        debug!(
            event = "core.ps.scan_completed",
            root,
            processes = snapshot.len(),
            descendants = descendants.len()
        );
        descendants
    }

    /// Looks up the parent of every process in `snapshot`. Lookups are
    /// independent, so they are spread over the worker threads.
    pub fn resolve_parents<D: Desktop + ?Sized>(
        &self,
        desktop: &D,
        snapshot: &[ProcessEntry],
    ) -> Vec<ProcessNode> {
        let workers = self.workers.min(snapshot.len());
        if workers <= 1 {
            return snapshot
                .iter()
                .map(|p| ProcessNode {
                    id: p.id,
                    parent_id: desktop.parent_id_of(p.id).unwrap_or(0),
                })
                .collect();
        }

        let parents: DashMap<Pid, Pid> = DashMap::with_capacity(snapshot.len());
        let (tx, rx) = crossbeam_channel::unbounded::<Pid>();
        for p in snapshot {
            if tx.send(p.id).is_err() {
                break;
            }
        }
        drop(tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let parents = &parents;
                scope.spawn(move || {
                    for pid in rx.iter() {
                        parents.insert(pid, desktop.parent_id_of(pid).unwrap_or(0));
                    }
                });
            }
        });

        snapshot
            .iter()
            .map(|p| ProcessNode {
                id: p.id,
                parent_id: parents.get(&p.id).map(|entry| *entry).unwrap_or(0),
            })
            .collect()
    }
}

/// Breadth-first walk from `root` over parent links. A node is taken when its
/// parent was already taken; nothing is taken twice, which also bounds the
/// walk when the parent data contains a cycle.
pub fn collect_descendants(nodes: &[ProcessNode], root: Pid) -> Vec<Pid> {
    // 0 stands for "unknown parent" and must not adopt every orphan.
    if root == 0 {
        return Vec::new();
    }

    let mut accepted: HashSet<Pid> = HashSet::from([root]);
    let mut descendants = Vec::new();
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        for node in nodes {
            if node.parent_id == current && accepted.insert(node.id) {
                descendants.push(node.id);
                queue.push_back(node.id);
            }
        }
    }

    descendants
}

/// Pids whose image name matches `name`, ignoring case and an `.exe` suffix
/// on either side.
pub fn processes_named(snapshot: &[ProcessEntry], name: &str) -> Vec<Pid> {
    let wanted = strip_exe(name.trim().trim_matches('"'));
    let wanted = wanted
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(wanted)
        .to_ascii_lowercase();
    snapshot
        .iter()
        .filter(|p| strip_exe(&p.name).eq_ignore_ascii_case(&wanted))
        .map(|p| p.id)
        .collect()
}

fn strip_exe(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}
