//! Устранение мёртвого кода (DCE).
//!
//! Многоисточниковый обход в ширину от всех выходных узлов назад по
//! рёбрам входов: входы узла — его зависимости, так что обход движется
//! от выходов к их транзитивным зависимостям. Недостижимые узлы
//! удаляются целиком — и из порядка, и из индекса.

use crate::ir::{Graph, NodeId};
use crate::opt::{OptPass, OptResult};
use log::{debug, trace};
use std::collections::{HashSet, VecDeque};

pub struct DeadCodeElimination;

impl OptPass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn apply(&self, graph: &mut Graph) -> OptResult<()> {
        if graph.is_empty() {
            return Ok(());
        }

        let mut roots: Vec<NodeId> = graph
            .iter()
            .filter(|node| node.is_output)
            .map(|node| node.id.clone())
            .collect();
        if roots.is_empty() {
            // Запасной вариант: без помеченных выходов корнем считается
            // последний вставленный узел.
            debug!("no output nodes found, using the last inserted node as root");
            roots.extend(graph.ids().last().cloned());
        }
        trace!("starting from root nodes: {:?}", roots);

        let mut reachable: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = roots.into();

        while let Some(id) = queue.pop_front() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            let Some(node) = graph.get(&id) else { continue };
            for input in node.inputs() {
                if graph.contains(input) && !reachable.contains(input) {
                    queue.push_back(input.clone());
                }
            }
        }

        let before = graph.len();
        graph.retain(|node| reachable.contains(&node.id));
        debug!("eliminated {} unreachable nodes", before - graph.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Node, OpKind};
    use crate::tensor::Tensor;

    fn apply(graph: &mut Graph) {
        DeadCodeElimination.apply(graph).unwrap();
    }

    #[test]
    fn test_unreachable_node_is_removed() {
        let mut graph = Graph::new();
        graph.add(Node::constant("input", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::op("dead", OpKind::Add, ["input", "input"])).unwrap();
        graph.add(Node::op("intermediate", OpKind::Multiply, ["input", "input"])).unwrap();
        graph
            .add(Node::op("output", OpKind::Multiply, ["intermediate", "intermediate"]).with_output())
            .unwrap();

        apply(&mut graph);

        assert!(graph.get("dead").is_none());
        assert!(graph.get("input").is_some());
        assert!(graph.get("intermediate").is_some());
        assert!(graph.get("output").is_some());
    }

    #[test]
    fn test_fallback_root_is_last_inserted_node() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(1.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(2.0))).unwrap();
        graph.add(Node::op("orphan", OpKind::Add, ["a", "a"])).unwrap();
        graph.add(Node::op("last", OpKind::Add, ["a", "b"])).unwrap();

        apply(&mut graph);

        // Достижимо только то, что нужно последнему узлу.
        assert!(graph.get("orphan").is_none());
        assert_eq!(graph.ids(), ["a".to_string(), "b".to_string(), "last".to_string()]);
    }

    #[test]
    fn test_alias_target_is_kept_alive() {
        use crate::ir::NodeKind;
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::op("add1", OpKind::Add, ["a", "b"])).unwrap();
        graph
            .add(Node {
                id: "add2".to_string(),
                kind: NodeKind::Alias("add1".to_string()),
                is_output: true,
            })
            .unwrap();

        apply(&mut graph);

        // Ребро псевдонима удерживает представителя и его входы.
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_terminates_with_cycle_among_dead_nodes() {
        let mut graph = Graph::new();
        graph.add(Node::op("x", OpKind::Add, ["y", "y"])).unwrap();
        graph.add(Node::op("y", OpKind::Add, ["x", "x"])).unwrap();
        graph.add(Node::constant("out", Tensor::scalar(1.0)).with_output()).unwrap();

        apply(&mut graph);

        assert_eq!(graph.ids(), ["out".to_string()]);
    }

    #[test]
    fn test_empty_graph_is_a_no_op() {
        let mut graph = Graph::new();
        apply(&mut graph);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_dce_is_idempotent() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(1.0))).unwrap();
        graph.add(Node::op("dead", OpKind::Add, ["a", "a"])).unwrap();
        graph.add(Node::op("out", OpKind::Multiply, ["a", "a"]).with_output()).unwrap();

        apply(&mut graph);
        let after_first = graph.clone();
        apply(&mut graph);
        assert_eq!(graph, after_first);
    }
}
