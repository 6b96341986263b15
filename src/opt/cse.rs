//! Устранение общих подвыражений (CSE).
//!
//! Один прямой проход по узлам в текущем порядке вставки с таблицей
//! подпись → id представителя. Узел с уже зарегистрированной подписью —
//! дубликат: он переписывается в псевдоним представителя, а все ссылки
//! на него во входах остальных узлов немедленно перенаправляются на
//! представителя. Дубликат не удаляется — это забота устранения
//! мёртвого кода.

use crate::ir::{Graph, Node, NodeId, NodeKind, OpKind};
use crate::opt::{OptPass, OptResult};
use log::{debug, trace};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Каноническая подпись узла.
///
/// Константы сравниваются по форме и каноническим байтам значения:
/// одинаковые байты при разных формах не совпадают. Коммутативные
/// операции сравнивают входы без учёта порядка, остальные — по порядку.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Signature {
    Const { shape: Vec<usize>, bytes: Vec<u8> },
    Op { op: OpKind, inputs: Vec<NodeId> },
}

fn signature(node: &Node) -> Option<Signature> {
    match &node.kind {
        NodeKind::Const(value) => Some(Signature::Const {
            shape: value.shape().to_vec(),
            bytes: value.canonical_bytes(),
        }),
        // Псевдонимы подписи не получают: повторный запуск прохода не
        // должен сцеплять их друг с другом.
        NodeKind::Alias(_) => None,
        NodeKind::Op { op, inputs } => {
            let mut inputs = inputs.clone();
            if op.is_commutative() {
                inputs.sort();
            }
            Some(Signature::Op { op: *op, inputs })
        }
    }
}

pub struct CommonSubexpressionElimination;

impl OptPass for CommonSubexpressionElimination {
    fn name(&self) -> &'static str {
        "common-subexpression-elimination"
    }

    fn apply(&self, graph: &mut Graph) -> OptResult<()> {
        let mut representatives: HashMap<Signature, NodeId> = HashMap::new();
        let order: Vec<NodeId> = graph.ids().to_vec();

        for id in &order {
            let Some(node) = graph.get(id) else { continue };
            let Some(sig) = signature(node) else { continue };

            match representatives.entry(sig) {
                Entry::Occupied(entry) => {
                    let representative = entry.get().clone();
                    debug!(
                        "common subexpression detected: '{}' is a duplicate of '{}'",
                        id, representative
                    );
                    if let Some(duplicate) = graph.get_mut(id) {
                        duplicate.kind = NodeKind::Alias(representative.clone());
                    }
                    redirect_references(graph, &order, id, &representative);
                }
                Entry::Vacant(entry) => {
                    trace!("registering node '{}' as a representative", id);
                    entry.insert(id.clone());
                }
            }
        }
        Ok(())
    }
}

/// Глобальная подстановка: во входах каждого узла графа ссылка на
/// дубликат заменяется ссылкой на представителя. Полный проход по всем
/// узлам на каждое совпадение — O(V) на замену; простота здесь
/// предпочтена обратному индексу зависимостей.
fn redirect_references(graph: &mut Graph, order: &[NodeId], duplicate: &NodeId, representative: &NodeId) {
    for other_id in order {
        if other_id == duplicate {
            continue;
        }
        let Some(other) = graph.get_mut(other_id) else { continue };
        match &mut other.kind {
            NodeKind::Op { inputs, .. } => {
                for input in inputs.iter_mut() {
                    if input == duplicate {
                        *input = representative.clone();
                    }
                }
            }
            NodeKind::Alias(target) => {
                if target == duplicate {
                    *target = representative.clone();
                }
            }
            NodeKind::Const(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    fn apply(graph: &mut Graph) {
        CommonSubexpressionElimination.apply(graph).unwrap();
    }

    fn op_inputs<'a>(graph: &'a Graph, id: &str) -> &'a [NodeId] {
        graph.get(id).map(Node::inputs).unwrap_or_default()
    }

    #[test]
    fn test_simple_common_subexpression() {
        // add2 дублирует add1; mul должен читать add1 дважды.
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::op("add1", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("add2", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("mul", OpKind::Multiply, ["add1", "add2"])).unwrap();

        apply(&mut graph);

        assert_eq!(
            graph.get("add2").unwrap().kind,
            NodeKind::Alias("add1".to_string())
        );
        assert_eq!(op_inputs(&graph, "mul"), ["add1".to_string(), "add1".to_string()]);
    }

    #[test]
    fn test_commutative_match_ignores_operand_order() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::op("add1", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("add2", OpKind::Add, ["b", "a"])).unwrap();
        graph.add(Node::op("mul", OpKind::Multiply, ["add1", "add2"])).unwrap();

        apply(&mut graph);

        assert_eq!(
            graph.get("add2").unwrap().kind,
            NodeKind::Alias("add1".to_string())
        );
        assert_eq!(op_inputs(&graph, "mul"), ["add1".to_string(), "add1".to_string()]);
    }

    #[test]
    fn test_non_commutative_ops_are_order_sensitive() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::op("sub1", OpKind::Subtract, ["a", "b"])).unwrap();
        graph.add(Node::op("sub2", OpKind::Subtract, ["b", "a"])).unwrap();

        apply(&mut graph);

        // a - b и b - a — разные вычисления.
        assert!(matches!(graph.get("sub2").unwrap().kind, NodeKind::Op { .. }));
    }

    #[test]
    fn test_multiple_common_subexpressions() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::constant("c", Tensor::scalar(2.0))).unwrap();
        graph.add(Node::op("add1", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("add2", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("add3", OpKind::Add, ["b", "c"])).unwrap();
        graph.add(Node::op("add4", OpKind::Add, ["b", "c"])).unwrap();
        graph.add(Node::op("mul", OpKind::Multiply, ["add1", "add3"])).unwrap();

        apply(&mut graph);

        assert_eq!(op_inputs(&graph, "add2"), ["add1".to_string()]);
        assert_eq!(op_inputs(&graph, "add4"), ["add3".to_string()]);
        assert_eq!(op_inputs(&graph, "mul"), ["add1".to_string(), "add3".to_string()]);
    }

    #[test]
    fn test_nested_common_subexpressions() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::op("add1", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("mul1", OpKind::Multiply, ["add1", "b"])).unwrap();
        graph.add(Node::op("mul2", OpKind::Multiply, ["add1", "b"])).unwrap();
        graph.add(Node::op("result", OpKind::Add, ["mul1", "mul2"])).unwrap();

        apply(&mut graph);

        assert_eq!(op_inputs(&graph, "mul2"), ["mul1".to_string()]);
        assert_eq!(op_inputs(&graph, "result"), ["mul1".to_string(), "mul1".to_string()]);
    }

    #[test]
    fn test_no_common_subexpressions_means_no_change() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::constant("c", Tensor::scalar(2.0))).unwrap();
        graph.add(Node::op("add", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("mul", OpKind::Multiply, ["b", "c"])).unwrap();
        graph.add(Node::op("result", OpKind::Subtract, ["add", "mul"])).unwrap();

        let before = graph.clone();
        apply(&mut graph);
        assert_eq!(graph, before);
    }

    #[test]
    fn test_equal_constants_are_merged() {
        let mut graph = Graph::new();
        graph.add(Node::constant("c1", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("c2", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::op("add", OpKind::Add, ["c1", "c2"])).unwrap();

        apply(&mut graph);

        assert_eq!(graph.get("c2").unwrap().kind, NodeKind::Alias("c1".to_string()));
        assert_eq!(op_inputs(&graph, "add"), ["c1".to_string(), "c1".to_string()]);
    }

    #[test]
    fn test_constants_with_different_shapes_do_not_merge() {
        // Одинаковые байты, разные формы: строка 1x2 против столбца 2x1.
        let mut graph = Graph::new();
        let row = Tensor::matrix(vec![vec![1.0, 2.0]]).unwrap();
        let col = Tensor::matrix(vec![vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(row.canonical_bytes(), col.canonical_bytes());
        graph.add(Node::constant("row", row)).unwrap();
        graph.add(Node::constant("col", col)).unwrap();

        apply(&mut graph);

        assert!(matches!(graph.get("col").unwrap().kind, NodeKind::Const(_)));
    }

    #[test]
    fn test_cse_is_idempotent() {
        let mut graph = Graph::new();
        graph.add(Node::constant("a", Tensor::scalar(5.0))).unwrap();
        graph.add(Node::constant("b", Tensor::scalar(3.0))).unwrap();
        graph.add(Node::op("add1", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("add2", OpKind::Add, ["a", "b"])).unwrap();
        graph.add(Node::op("add3", OpKind::Add, ["a", "b"])).unwrap();

        apply(&mut graph);
        let after_first = graph.clone();
        apply(&mut graph);
        assert_eq!(graph, after_first);
    }
}
