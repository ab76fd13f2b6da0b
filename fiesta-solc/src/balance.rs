//! Partitioning of per version workloads across a fixed number of workers
//!
//! Every version is compiled by exactly one worker, so the unit of work is the whole version. The
//! queues are filled with the greedy Longest-Processing-Time-first heuristic: versions are taken
//! heaviest first and each one goes to the queue with the smallest total so far, lowest index on
//! ties. The resulting makespan is at most `(4/3 - 1/(3k))` times the optimum.

/// The versions assigned to a single worker, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    pub versions: Vec<String>,
    /// Sum of the weights of all versions in this queue
    pub weight: usize,
}

impl Queue {
    fn push(&mut self, version: String, weight: usize) {
        self.versions.push(version);
        self.weight += weight;
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }
}

/// Splits the `(version, weight)` workloads into `k` queues.
///
/// The result is deterministic for a given input order: versions of equal weight keep their
/// relative order. `k == 0` yields no queues.
pub fn partition<I, S>(workloads: I, k: usize) -> Vec<Queue>
where
    I: IntoIterator<Item = (S, usize)>,
    S: Into<String>,
{
    if k == 0 {
        return Vec::new()
    }
    let mut workloads: Vec<(String, usize)> =
        workloads.into_iter().map(|(version, weight)| (version.into(), weight)).collect();
    // stable, equal weights keep input order
    workloads.sort_by(|(_, a), (_, b)| b.cmp(a));

    let mut queues = vec![Queue::default(); k];
    for (version, weight) in workloads {
        // `min_by_key` returns the first of equally light queues
        let lightest = (0..k).min_by_key(|&idx| queues[idx].weight).unwrap_or_default();
        queues[lightest].push(version, weight);
    }
    queues
}

/// The largest total weight of all queues
pub fn makespan(queues: &[Queue]) -> usize {
    queues.iter().map(|q| q.weight).max().unwrap_or_default()
}
