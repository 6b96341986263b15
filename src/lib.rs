//! # RustyXLA: Graph-based Compiler Middle-End in Rust
//!
//! **RustyXLA** is a small compiler middle-end for a tensor dataflow IR.
//! A computation is represented as a flat graph of nodes (constants and
//! binary operations over named inputs), which can be rewritten in place
//! by classic optimization passes and then evaluated to concrete tensors.
//!
//! The three provided passes are:
//! - **Common Subexpression Elimination** — collapses structurally equal
//!   computations onto a single representative node;
//! - **Constant Folding** — evaluates operations over constants at
//!   optimization time, down to a fixed point;
//! - **Dead Code Elimination** — removes nodes unreachable from the
//!   graph outputs.
//!
//! ## Usage Example
//!
//! ```no_run
//! use rustyxla::execution::Executor;
//! use rustyxla::frontend::GraphBuilder;
//! use rustyxla::opt::{self, ConstantFolding, DeadCodeElimination, OptPass};
//! use rustyxla::tensor::Tensor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Build the computation graph: (5 + 3) * 2
//! let mut builder = GraphBuilder::new();
//! let five = builder.constant(Tensor::scalar(5.0));
//! let three = builder.constant(Tensor::scalar(3.0));
//! let two = builder.constant(Tensor::scalar(2.0));
//! let sum = builder.add(&five, &three);
//! let product = builder.multiply(&sum, &two);
//! builder.mark_output(&product);
//! let mut graph = builder.finish();
//!
//! // 2. Optimize it in place
//! let passes: Vec<Box<dyn OptPass>> = vec![
//!     Box::new(ConstantFolding),
//!     Box::new(DeadCodeElimination),
//! ];
//! opt::run_pipeline(&mut graph, &passes)?;
//!
//! // 3. Evaluate the optimized graph
//! let results = Executor::new().execute(&graph)?;
//! println!("{}", results[&product]);
//! # Ok(())
//! # }
//! ```

// Declare public modules that constitute the core library API.
pub mod execution;
pub mod frontend;
pub mod ir;
pub mod ops;
pub mod opt;
pub mod tensor;
pub mod viz;
