//! Свёртка констант.
//!
//! Цикл до неподвижной точки над всем списком узлов: полные сканы
//! повторяются, пока очередной скан не выполнит ни одной свёртки.
//! Это гарантирует полное схлопывание многоуровневых константных
//! выражений вида `(5 + 3) * 2` независимо от их глубины, ценой до
//! O(глубина × число узлов) работы.

use crate::ir::{Graph, NodeId, NodeKind, OpKind};
use crate::ops;
use crate::opt::{OptPass, OptResult};
use crate::tensor::Tensor;
use log::debug;

pub struct ConstantFolding;

impl OptPass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn apply(&self, graph: &mut Graph) -> OptResult<()> {
        let mut changed = true;
        while changed {
            changed = false;
            let order: Vec<NodeId> = graph.ids().to_vec();
            for id in &order {
                let Some((op, operands)) = foldable(graph, id) else { continue };
                let folded = ops::dispatch(op, &operands)?;
                if let Some(node) = graph.get_mut(id) {
                    node.kind = NodeKind::Const(folded);
                    debug!("folded node '{}'", id);
                    changed = true;
                }
            }
        }
        Ok(())
    }
}

/// Узел сворачиваем, если это операция минимум с двумя входами, каждый
/// из которых разрешается в существующий узел-константу. Псевдоним
/// собственного значения не несёт и топливом для свёртки не считается.
fn foldable(graph: &Graph, id: &str) -> Option<(OpKind, Vec<Tensor>)> {
    let node = graph.get(id)?;
    let NodeKind::Op { op, inputs } = &node.kind else { return None };
    if inputs.len() < 2 {
        return None;
    }
    let operands = inputs
        .iter()
        .map(|input| match graph.get(input).map(|n| &n.kind) {
            Some(NodeKind::Const(value)) => Some(value.clone()),
            _ => None,
        })
        .collect::<Option<Vec<Tensor>>>()?;
    Some((*op, operands))
}
