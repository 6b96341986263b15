//! Read-only DOT rendering of a computation graph.
//!
//! Produces a Graphviz `digraph` description: constants as boxes
//! labelled with their value, aliases as dashed boxes, operations as
//! ellipses labelled with the op tag, and one edge per input reference.
//! The module never writes to the graph and performs no file IO.

use crate::ir::{Graph, NodeKind};
use crate::tensor::Tensor;

pub fn to_dot(graph: &Graph) -> String {
    let mut out = String::from("digraph computation {\n    rankdir=TB;\n");

    for node in graph.iter() {
        let (label, attrs) = match &node.kind {
            NodeKind::Const(value) => {
                (format!("{}\\n{}", node.id, value_label(value)), "shape=box")
            }
            NodeKind::Alias(_) => (format!("{}\\nalias", node.id), "shape=box, style=dashed"),
            NodeKind::Op { op, .. } => (format!("{}\\n{}", node.id, op), "shape=ellipse"),
        };
        out.push_str(&format!("    \"{}\" [label=\"{}\", {}];\n", node.id, label, attrs));
    }

    for node in graph.iter() {
        for input in node.inputs() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", input, node.id));
        }
    }

    out.push_str("}\n");
    out
}

fn value_label(value: &Tensor) -> String {
    value
        .to_string()
        .replace('\n', " ")
        .replace('"', "'")
}
