//! IR: плоский граф потока данных.
//!
//! Граф состоит из узлов трёх видов: константы с конкретным значением,
//! псевдонимы (результат CSE, читают значение другого узла) и бинарные
//! операции над упорядоченными входами. Граф хранит порядок вставки и
//! индекс по идентификатору; оба всегда содержат один и тот же набор id.
//!
//! Все проходы оптимизации мутируют узлы на месте. Единственный проход,
//! удаляющий узлы, — устранение мёртвого кода.

use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Идентификатор узла: стабильный, уникальный в пределах графа.
pub type NodeId = String;

pub type IrResult<T> = std::result::Result<T, IrError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Узел с ID '{0}' уже существует в графе")]
    DuplicateNodeId(NodeId),
    #[error("В графе обнаружен цикл через узел '{0}'")]
    CycleDetected(NodeId),
}

/// Закрытый набор бинарных операций IR.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Matmul,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Subtract => "subtract",
            OpKind::Multiply => "multiply",
            OpKind::Divide => "divide",
            OpKind::Matmul => "matmul",
        }
    }

    /// Для коммутативных операций CSE сравнивает входы без учёта порядка.
    pub fn is_commutative(&self) -> bool {
        matches!(self, OpKind::Add | OpKind::Multiply)
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Полезная нагрузка узла.
///
/// Случай "константа без значения" из ранних версий дизайна здесь выражен
/// явным вариантом `Alias`: такой узел не несёт собственного значения,
/// а читает значение, уже вычисленное для его единственного входа.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Лист с конкретным значением.
    Const(Tensor),
    /// Сквозной узел, созданный CSE: читает значение узла-представителя.
    Alias(NodeId),
    /// Операция над упорядоченными входами. Порядок значим для
    /// некоммутативных операций.
    Op { op: OpKind, inputs: Vec<NodeId> },
}

/// Одна инструкция IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// ID узла (дублирует ключ индекса графа для удобства вызовов).
    pub id: NodeId,
    pub kind: NodeKind,
    /// Узел является внешне наблюдаемым выходом графа.
    pub is_output: bool,
}

impl Node {
    pub fn constant(id: impl Into<NodeId>, value: Tensor) -> Self {
        Self { id: id.into(), kind: NodeKind::Const(value), is_output: false }
    }

    pub fn op<I>(id: impl Into<NodeId>, op: OpKind, inputs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        Self {
            id: id.into(),
            kind: NodeKind::Op { op, inputs: inputs.into_iter().map(Into::into).collect() },
            is_output: false,
        }
    }

    pub fn with_output(mut self) -> Self {
        self.is_output = true;
        self
    }

    /// Рёбра зависимостей узла: пусто для констант, единственная цель
    /// для псевдонима, список входов для операции.
    pub fn inputs(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Const(_) => &[],
            NodeKind::Alias(target) => std::slice::from_ref(target),
            NodeKind::Op { inputs, .. } => inputs,
        }
    }
}

/// Граф: последовательность узлов в порядке вставки плюс индекс id → узел.
///
/// Инвариант: `order` и `nodes` всегда содержат один и тот же набор id.
/// Входы узла могут ссылаться на отсутствующие в графе id; обход такие
/// ссылки молча пропускает, ошибкой они становятся только при выполнении.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет узел. Повторная вставка существующего id отклоняется.
    pub fn add(&mut self, node: Node) -> IrResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(IrError::DuplicateNodeId(node.id));
        }
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Идентификаторы узлов в порядке вставки.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Узлы в порядке вставки.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Оставляет только узлы, удовлетворяющие предикату, сохраняя
    /// относительный порядок. Используется устранением мёртвого кода.
    pub fn retain(&mut self, mut keep: impl FnMut(&Node) -> bool) {
        let nodes = &mut self.nodes;
        self.order.retain(|id| match nodes.get(id) {
            Some(node) if keep(node) => true,
            _ => {
                nodes.remove(id);
                false
            }
        });
    }

    /// Топологический порядок: каждый узел идёт после всех узлов, от
    /// которых он транзитивно зависит через входы.
    ///
    /// Обход в глубину с трёхцветной раскраской (не посещён / в работе /
    /// завершён); внешний цикл идёт в порядке вставки, что даёт
    /// детерминированное разрешение неоднозначностей. Попадание в узел
    /// "в работе" означает цикл. Ссылка на отсутствующий id молча
    /// пропускается — на этом этапе она считается внешним листом.
    pub fn topological_order(&self) -> IrResult<Vec<NodeId>> {
        let mut done: HashSet<NodeId> = HashSet::new();
        let mut in_progress: HashSet<NodeId> = HashSet::new();
        let mut sorted: Vec<NodeId> = Vec::with_capacity(self.order.len());

        for id in &self.order {
            self.visit(id, &mut done, &mut in_progress, &mut sorted)?;
        }
        Ok(sorted)
    }

    fn visit(
        &self,
        id: &NodeId,
        done: &mut HashSet<NodeId>,
        in_progress: &mut HashSet<NodeId>,
        sorted: &mut Vec<NodeId>,
    ) -> IrResult<()> {
        if done.contains(id) {
            return Ok(());
        }
        if in_progress.contains(id) {
            return Err(IrError::CycleDetected(id.clone()));
        }
        let Some(node) = self.nodes.get(id) else {
            // Внешний лист: не ошибка при сортировке.
            return Ok(());
        };
        in_progress.insert(id.clone());
        for input in node.inputs() {
            if self.nodes.contains_key(input) {
                self.visit(input, done, in_progress, sorted)?;
            }
        }
        in_progress.remove(id);
        done.insert(id.clone());
        sorted.push(id.clone());
        Ok(())
    }
}
