//! Модуль, реализующий исполнитель графа.
//!
//! Исполнитель — эталонный последовательный бэкенд: он линеаризует граф
//! топологической сортировкой и вычисляет узлы по одному, накапливая
//! отображение id → значение. Константы записывают своё значение,
//! псевдонимы читают уже вычисленное значение своей цели, операции
//! вычисляются через общую диспетчеризацию.

use crate::ir::{Graph, IrError, NodeId, NodeKind};
use crate::ops::{self, OpError};
use crate::tensor::Tensor;
use log::trace;
use std::collections::HashMap;

pub type ExecResult<T> = std::result::Result<T, ExecError>;

/// Ошибки, которые могут возникнуть при выполнении графа.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error(transparent)]
    Ir(#[from] IrError),

    #[error("Для узла '{node}' отсутствует значение входа '{input}'")]
    MissingInput { node: NodeId, input: NodeId },

    #[error(transparent)]
    Op(#[from] OpError),
}

/// Последовательный исполнитель графа.
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Вычисляет граф в зависимость-согласованном порядке и возвращает
    /// значение каждого узла. Пустой граф даёт пустое отображение.
    pub fn execute(&self, graph: &Graph) -> ExecResult<HashMap<NodeId, Tensor>> {
        let order = graph.topological_order()?;
        let mut values: HashMap<NodeId, Tensor> = HashMap::with_capacity(order.len());

        for id in &order {
            let Some(node) = graph.get(id) else { continue };
            trace!("evaluating node '{}'", id);

            let result = match &node.kind {
                NodeKind::Const(value) => value.clone(),
                // Псевдоним не несёт собственного значения: его результат —
                // уже вычисленное значение единственного входа.
                NodeKind::Alias(target) => values
                    .get(target)
                    .cloned()
                    .ok_or_else(|| ExecError::MissingInput {
                        node: id.clone(),
                        input: target.clone(),
                    })?,
                NodeKind::Op { op, inputs } => {
                    let operands = inputs
                        .iter()
                        .map(|input| {
                            values.get(input).cloned().ok_or_else(|| ExecError::MissingInput {
                                node: id.clone(),
                                input: input.clone(),
                            })
                        })
                        .collect::<ExecResult<Vec<Tensor>>>()?;
                    ops::dispatch(*op, &operands)?
                }
            };
            values.insert(id.clone(), result);
        }
        Ok(values)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
