//! Демонстрация полного конвейера: построение графа, три прохода
//! оптимизации и выполнение.
//!
//! Запуск с журналом проходов:
//! `RUST_LOG=debug cargo run --example pipeline`

use rustyxla::execution::Executor;
use rustyxla::frontend::GraphBuilder;
use rustyxla::opt::{
    self, CommonSubexpressionElimination, ConstantFolding, DeadCodeElimination, OptPass,
};
use rustyxla::tensor::Tensor;
use rustyxla::viz;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // (5 + 3) * 2, плюс дублирующая сумма и мёртвая ветка.
    let mut builder = GraphBuilder::new();
    let five = builder.constant(Tensor::scalar(5.0));
    let three = builder.constant(Tensor::scalar(3.0));
    let two = builder.constant(Tensor::scalar(2.0));
    let _sum = builder.add(&five, &three);
    let dup_sum = builder.add(&three, &five);
    let _dead = builder.subtract(&five, &three);
    let product = builder.multiply(&dup_sum, &two);
    builder.mark_output(&product);
    let mut graph = builder.finish();

    println!("[GRAPH] до оптимизации: {} узлов", graph.len());
    println!("{}", viz::to_dot(&graph));

    let passes: Vec<Box<dyn OptPass>> = vec![
        Box::new(CommonSubexpressionElimination),
        Box::new(ConstantFolding),
        Box::new(DeadCodeElimination),
    ];
    opt::run_pipeline(&mut graph, &passes)?;

    println!("[GRAPH] после оптимизации: {} узлов", graph.len());
    println!("{}", viz::to_dot(&graph));

    let results = Executor::new().execute(&graph)?;
    println!("[RESULT] {} = {}", product, results[&product]);
    Ok(())
}
