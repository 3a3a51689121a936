//! Stable topological ordering of a stage's components.

use crate::components::ComponentSpec;
use crate::errors::ConfigError;
use std::collections::{BTreeSet, HashMap};

/// Orders `priority` so every component follows its dependencies.
///
/// Kahn's algorithm with a ready set keyed by position in `priority`: among
/// the components whose dependencies are all emitted, the earliest one in
/// `priority` goes next. Components without constraints therefore keep their
/// relative order.
///
/// # Errors
///
/// - [`ConfigError::UnresolvedDependency`] if a dependency is not in `priority`
/// - [`ConfigError::CycleDetected`] if the dependencies form a cycle
pub(crate) fn topological_order(
    stage: &str,
    priority: &[String],
    specs: &HashMap<String, ComponentSpec>,
) -> Result<Vec<String>, ConfigError> {
    let index: HashMap<&str, usize> = priority
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    // deps[i] lists the distinct positions node i waits on.
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); priority.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); priority.len()];

    for (i, name) in priority.iter().enumerate() {
        let Some(spec) = specs.get(name) else {
            return Err(ConfigError::ComponentNotFound {
                stage: stage.to_string(),
                component: name.clone(),
            });
        };
        for dep in &spec.dependencies {
            let Some(&d) = index.get(dep.as_str()) else {
                return Err(ConfigError::UnresolvedDependency {
                    stage: stage.to_string(),
                    component: name.clone(),
                    dependency: dep.clone(),
                });
            };
            if !deps[i].contains(&d) {
                deps[i].push(d);
                dependents[d].push(i);
            }
        }
    }

    let mut in_degree: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &n)| n == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(priority.len());
    let mut emitted = vec![false; priority.len()];

    while let Some(next) = ready.pop_first() {
        emitted[next] = true;
        order.push(priority[next].clone());
        for &child in &dependents[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() < priority.len() {
        return Err(ConfigError::CycleDetected {
            stage: stage.to_string(),
            cycle: find_cycle(priority, &deps, &emitted),
        });
    }

    Ok(order)
}

/// Walks unemitted nodes along unemitted dependencies until one repeats.
///
/// Every unemitted node waits on at least one other unemitted node, so the
/// walk always closes a loop. The returned path repeats its first name at
/// the end.
fn find_cycle(priority: &[String], deps: &[Vec<usize>], emitted: &[bool]) -> Vec<String> {
    let Some(start) = emitted.iter().position(|done| !done) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = path.iter().position(|&n| n == current) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|&n| priority[n].clone()).collect();
            cycle.push(priority[current].clone());
            return cycle;
        }
        path.push(current);
        match deps[current].iter().find(|&&d| !emitted[d]) {
            Some(&d) => current = d,
            None => return path.iter().map(|&n| priority[n].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::NoOpComponent;
    use pretty_assertions::assert_eq;

    fn specs(entries: &[(&str, &[&str])]) -> (Vec<String>, HashMap<String, ComponentSpec>) {
        let order = entries.iter().map(|(n, _)| (*n).to_string()).collect();
        let map = entries
            .iter()
            .map(|(n, deps)| {
                (
                    (*n).to_string(),
                    ComponentSpec::of(NoOpComponent).with_dependencies(deps.iter().copied()),
                )
            })
            .collect();
        (order, map)
    }

    #[test]
    fn test_no_dependencies_keeps_priority() {
        let (order, map) = specs(&[("c", &[]), ("a", &[]), ("b", &[])]);
        assert_eq!(topological_order("s", &order, &map).unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dependency_moves_after() {
        let (order, map) = specs(&[("load", &["validate"]), ("validate", &[]), ("log", &[])]);
        assert_eq!(
            topological_order("s", &order, &map).unwrap(),
            vec!["validate", "load", "log"]
        );
    }

    #[test]
    fn test_diamond_is_stable() {
        let (order, map) = specs(&[
            ("root", &[]),
            ("left", &["root"]),
            ("right", &["root"]),
            ("join", &["left", "right"]),
        ]);
        assert_eq!(
            topological_order("s", &order, &map).unwrap(),
            vec!["root", "left", "right", "join"]
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let (order, map) = specs(&[("a", &["ghost"])]);
        let err = topological_order("s", &order, &map).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnresolvedDependency {
                stage: "s".into(),
                component: "a".into(),
                dependency: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_two_node_cycle() {
        let (order, map) = specs(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);
        let err = topological_order("s", &order, &map).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CycleDetected {
                stage: "s".into(),
                cycle: vec!["a".into(), "b".into(), "a".into()],
            }
        );
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let (order, map) = specs(&[("a", &["a"])]);
        let err = topological_order("s", &order, &map).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CycleDetected {
                stage: "s".into(),
                cycle: vec!["a".into(), "a".into()],
            }
        );
    }

    #[test]
    fn test_cycle_reached_through_tail() {
        // x waits on the a/b loop but is not part of it.
        let (order, map) = specs(&[("x", &["a"]), ("a", &["b"]), ("b", &["a"])]);
        let err = topological_order("s", &order, &map).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CycleDetected {
                stage: "s".into(),
                cycle: vec!["a".into(), "b".into(), "a".into()],
            }
        );
    }

    #[test]
    fn test_duplicate_dependency_counted_once() {
        let (order, map) = specs(&[("b", &["a", "a"]), ("a", &[])]);
        assert_eq!(topological_order("s", &order, &map).unwrap(), vec!["a", "b"]);
    }
}
