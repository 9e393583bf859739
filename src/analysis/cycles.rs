//! 最短环与 Parikh 向量分析.
//!
//! 对每个起点状态（或仅初始状态）做分层 BFS，收集回到起点的全部最短环；
//! 并列的最短环全部保留。环按轮换取字典序最小的形式规范化，结果排序去重，
//! 因此重复计算得到完全相同的结果。不在非平凡强连通分量中的状态直接跳过。
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use cancel_this::{Cancellable, is_cancelled};
use itertools::Itertools;
use log::debug;
use petgraph::algo::tarjan_scc;

use crate::analysis::AnalysisError;
use crate::config::CycleMode;
use crate::graph::{Edge, Identified};
use crate::lts::{ParikhVector, TransitionSystem};

/// A cycle `states[0] -labels[0]-> states[1] -> ... -labels[n-1]-> states[0]`,
/// rotated so that its `(state, label)` steps are lexicographically smallest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle {
    pub states: Vec<String>,
    pub labels: Vec<String>,
    pub parikh: ParikhVector,
}

impl Cycle {
    fn from_steps(steps: &[(&str, &str)]) -> Self {
        let rotation = |offset: usize| steps[offset..].iter().chain(&steps[..offset]);
        let best = (0..steps.len())
            .min_by(|&left, &right| rotation(left).cmp(rotation(right)))
            .unwrap_or(0);
        let (states, labels): (Vec<String>, Vec<String>) = rotation(best)
            .map(|&(state, label)| (state.to_owned(), label.to_owned()))
            .unzip();
        let parikh = ParikhVector::from_sequence(&labels);
        Self {
            states,
            labels,
            parikh,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (state, label) in self.states.iter().zip(&self.labels) {
            write!(f, "{state} -{label}-> ")?;
        }
        match self.states.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

/// Smallest cycles of a transition system and the Parikh-vector checks
/// built on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmallestCycles {
    cycles: Vec<Cycle>,
    counter_example: Option<(Cycle, Cycle)>,
}

impl SmallestCycles {
    /// Sorted, without duplicates.
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn parikh_vectors(&self) -> BTreeSet<&ParikhVector> {
        self.cycles.iter().map(|cycle| &cycle.parikh).collect()
    }

    /// The pair that made the last failing check fail.
    pub fn counter_example(&self) -> Option<&(Cycle, Cycle)> {
        self.counter_example.as_ref()
    }

    /// All cycles have the same Parikh vector.
    pub fn check_same_pvs(&mut self) -> bool {
        self.check_pairs(|left, right| left == right)
    }

    /// Any two Parikh vectors are equal or share no label.
    pub fn check_same_or_mutually_disjoint_pvs(&mut self) -> bool {
        self.check_pairs(|left, right| left == right || left.is_disjoint(right))
    }

    fn check_pairs<F>(&mut self, compatible: F) -> bool
    where
        F: Fn(&ParikhVector, &ParikhVector) -> bool,
    {
        self.counter_example = self
            .cycles
            .iter()
            .tuple_combinations()
            .find(|(left, right)| !compatible(&left.parikh, &right.parikh))
            .map(|(left, right)| (left.clone(), right.clone()));
        self.counter_example.is_none()
    }
}

/// Finds, for every start state selected by `mode`, all cycles of minimal
/// length returning to it.
pub fn compute_smallest_cycles(
    ts: &TransitionSystem,
    mode: CycleMode,
) -> Result<SmallestCycles, AnalysisError> {
    let graph = ts.to_petgraph();
    let mut component_of: HashMap<&str, usize> = HashMap::new();
    let mut cyclic = Vec::new();
    for (idx, component) in tarjan_scc(&graph).into_iter().enumerate() {
        let looped = component.len() > 1
            || component
                .first()
                .is_some_and(|&node| graph.contains_edge(node, node));
        cyclic.push(looped);
        for node in component {
            component_of.insert(graph[node].as_str(), idx);
        }
    }

    let starts: Vec<&str> = match mode {
        CycleMode::AllStates => ts.states().map(|state| state.id()).collect(),
        CycleMode::InitialState => vec![
            ts.initial_state()
                .ok_or(AnalysisError::NoInitialState)?
                .id(),
        ],
    };

    let mut found = BTreeSet::new();
    for start in starts {
        is_cancelled!()?;
        let Some(&component) = component_of.get(start) else {
            continue;
        };
        if !cyclic[component] {
            continue;
        }
        let within = |state: &str| component_of.get(state) == Some(&component);
        found.extend(shortest_cycles_through(ts, start, within)?);
    }

    debug!("{} smallest cycle(s) in {}", found.len(), ts.name());
    Ok(SmallestCycles {
        cycles: found.into_iter().collect(),
        counter_example: None,
    })
}

fn shortest_cycles_through<'a, F>(
    ts: &'a TransitionSystem,
    start: &'a str,
    within: F,
) -> Cancellable<Vec<Cycle>>
where
    F: Fn(&str) -> bool,
{
    let mut depth_of: HashMap<&'a str, usize> = HashMap::from([(start, 0)]);
    let mut predecessors: HashMap<&'a str, Vec<(&'a str, &'a str)>> = HashMap::new();
    let mut closing: Vec<(&'a str, &'a str)> = Vec::new();
    let mut closing_depth = None;
    let mut queue = VecDeque::from([start]);

    while let Some(state) = queue.pop_front() {
        is_cancelled!()?;
        let depth = depth_of.get(state).copied().unwrap_or_default();
        if closing_depth.is_some_and(|closed| depth > closed) {
            break;
        }
        for arc in ts.outgoing_arcs(state).unwrap_or_default() {
            let target = arc.target();
            if target == start {
                closing_depth = Some(depth);
                closing.push((state, arc.label()));
                continue;
            }
            if !within(target) {
                continue;
            }
            match depth_of.get(target) {
                None => {
                    depth_of.insert(target, depth + 1);
                    predecessors.entry(target).or_default().push((state, arc.label()));
                    queue.push_back(target);
                }
                Some(&known) if known == depth + 1 => {
                    predecessors.entry(target).or_default().push((state, arc.label()));
                }
                Some(_) => {}
            }
        }
    }

    let mut cycles = Vec::new();
    for (last, label) in closing {
        for mut steps in shortest_paths(start, last, &predecessors) {
            steps.push((last, label));
            cycles.push(Cycle::from_steps(&steps));
        }
    }
    Ok(cycles)
}

/// Every shortest path from `start` to `target` as `(state, label)` steps,
/// `target` itself excluded.
fn shortest_paths<'a>(
    start: &str,
    target: &'a str,
    predecessors: &HashMap<&'a str, Vec<(&'a str, &'a str)>>,
) -> Vec<Vec<(&'a str, &'a str)>> {
    if target == start {
        return vec![Vec::new()];
    }
    let mut paths = Vec::new();
    for &(previous, label) in predecessors.get(target).into_iter().flatten() {
        for mut path in shortest_paths(start, previous, predecessors) {
            path.push((previous, label));
            paths.push(path);
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use cancel_this::Cancelled;

    fn build(arcs: &[(&str, &str, &str)], initial: &str) -> TransitionSystem {
        let mut ts = TransitionSystem::new("cycles");
        for &(source, target, label) in arcs {
            for state in [source, target] {
                if !ts.contains_state(state) {
                    ts.create_state(Some(state)).unwrap();
                }
            }
            ts.create_arc(source, target, label).unwrap();
        }
        ts.set_initial_state(initial).unwrap();
        ts
    }

    /// two loops sharing s1: s0 -a-> s1 -b-> s0 and s1 -c-> s2 -d-> s1
    fn figure_eight() -> TransitionSystem {
        build(
            &[
                ("s0", "s1", "a"),
                ("s1", "s0", "b"),
                ("s1", "s2", "c"),
                ("s2", "s1", "d"),
            ],
            "s0",
        )
    }

    fn labels(cycle: &Cycle) -> Vec<&str> {
        cycle.labels.iter().map(String::as_str).collect()
    }

    #[test]
    fn cycles_are_reported_once_in_canonical_rotation() {
        let cycles = compute_smallest_cycles(&figure_eight(), CycleMode::AllStates).unwrap();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles.cycles()[0].states, vec!["s0", "s1"]);
        assert_eq!(labels(&cycles.cycles()[0]), vec!["a", "b"]);
        assert_eq!(labels(&cycles.cycles()[1]), vec!["c", "d"]);
        assert_eq!(cycles.cycles()[1].to_string(), "s1 -c-> s2 -d-> s1");
    }

    #[test]
    fn initial_state_mode_only_returns_to_the_initial_state() {
        let cycles = compute_smallest_cycles(&figure_eight(), CycleMode::InitialState).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles.cycles()[0].parikh, ParikhVector::from_sequence(["a", "b"]));

        let mut ts = TransitionSystem::new("no initial");
        ts.create_state(None).unwrap();
        assert!(matches!(
            compute_smallest_cycles(&ts, CycleMode::InitialState),
            Err(AnalysisError::NoInitialState)
        ));
    }

    #[test]
    fn ties_are_all_kept() {
        let diamond = build(
            &[
                ("s0", "s1", "a"),
                ("s0", "s2", "b"),
                ("s1", "s3", "c"),
                ("s2", "s3", "d"),
                ("s3", "s0", "e"),
            ],
            "s0",
        );
        let mut cycles = compute_smallest_cycles(&diamond, CycleMode::InitialState).unwrap();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles.parikh_vectors().len(), 2);
        assert!(!cycles.check_same_pvs());
        assert!(!cycles.check_same_or_mutually_disjoint_pvs());
        let (left, right) = cycles.counter_example().unwrap();
        assert_eq!(labels(left), vec!["a", "c", "e"]);
        assert_eq!(labels(right), vec!["b", "d", "e"]);
    }

    #[test]
    fn disjoint_vectors_pass_the_weaker_check() {
        let mut cycles = compute_smallest_cycles(&figure_eight(), CycleMode::AllStates).unwrap();

        assert!(!cycles.check_same_pvs());
        assert!(cycles.counter_example().is_some());
        assert!(cycles.check_same_or_mutually_disjoint_pvs());
        assert!(cycles.counter_example().is_none());
    }

    #[test]
    fn acyclic_parts_and_self_loops() {
        let ts = build(&[("s0", "s1", "go"), ("s1", "s1", "spin")], "s0");
        let mut cycles = compute_smallest_cycles(&ts, CycleMode::AllStates).unwrap();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles.cycles()[0].states, vec!["s1"]);
        assert!(cycles.check_same_pvs());
        assert!(
            compute_smallest_cycles(&ts, CycleMode::InitialState)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn recomputation_is_identical() {
        let ts = figure_eight();
        let first = compute_smallest_cycles(&ts, CycleMode::AllStates).unwrap();
        let second = compute_smallest_cycles(&ts, CycleMode::AllStates).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_is_reported() {
        let ts = figure_eight();
        let outcome = cancel_this::on_timeout(Duration::from_millis(50), || {
            Ok::<_, Cancelled>(compute_smallest_cycles(&ts, CycleMode::AllStates))
        });
        match outcome {
            Ok(Ok(cycles)) => assert_eq!(cycles.len(), 2),
            Ok(Err(AnalysisError::Cancelled(_))) | Err(_) => {
                // timing out is an acceptable outcome
            }
            Ok(Err(other)) => panic!("unexpected error: {other}"),
        }
    }
}
