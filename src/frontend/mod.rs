//! Front-end builder for constructing computation graphs.
//!
//! `GraphBuilder` turns a sequence of constant and binary-operation
//! declarations into a [`Graph`], generating a fresh id of the form
//! `{tag}_{n}` for every declared node. Nodes are inserted into the
//! graph immediately, so the resulting graph always satisfies the IR
//! invariants by construction.

use crate::ir::{Graph, Node, NodeId, NodeKind, OpKind};
use crate::tensor::Tensor;

#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    counter: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a constant node and returns its generated id.
    pub fn constant(&mut self, value: Tensor) -> NodeId {
        let id = self.fresh("const");
        self.push(Node::constant(id.clone(), value));
        id
    }

    pub fn add(&mut self, a: &NodeId, b: &NodeId) -> NodeId {
        self.operation(OpKind::Add, a, b)
    }

    pub fn subtract(&mut self, a: &NodeId, b: &NodeId) -> NodeId {
        self.operation(OpKind::Subtract, a, b)
    }

    pub fn multiply(&mut self, a: &NodeId, b: &NodeId) -> NodeId {
        self.operation(OpKind::Multiply, a, b)
    }

    pub fn divide(&mut self, a: &NodeId, b: &NodeId) -> NodeId {
        self.operation(OpKind::Divide, a, b)
    }

    pub fn matmul(&mut self, a: &NodeId, b: &NodeId) -> NodeId {
        self.operation(OpKind::Matmul, a, b)
    }

    /// Declares a binary operation over two previously declared nodes.
    pub fn operation(&mut self, op: OpKind, a: &NodeId, b: &NodeId) -> NodeId {
        let id = self.fresh(op.as_str());
        self.push(Node {
            id: id.clone(),
            kind: NodeKind::Op { op, inputs: vec![a.clone(), b.clone()] },
            is_output: false,
        });
        id
    }

    /// Marks a previously declared node as a graph output. Unknown ids
    /// are ignored: the builder only hands out ids it has created.
    pub fn mark_output(&mut self, id: &NodeId) {
        if let Some(node) = self.graph.get_mut(id) {
            node.is_output = true;
        }
    }

    pub fn finish(self) -> Graph {
        self.graph
    }

    fn fresh(&mut self, tag: &str) -> NodeId {
        let id = format!("{}_{}", tag, self.counter);
        self.counter += 1;
        id
    }

    fn push(&mut self, node: Node) {
        // Generated ids are unique by construction.
        if self.graph.add(node).is_err() {
            unreachable!("builder generated a duplicate node id");
        }
    }
}
