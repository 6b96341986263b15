//! Модуль, содержащий проходы оптимизации графа.
//!
//! Каждый проход — независимая стратегия с единым контрактом: он берёт
//! исключительный изменяемый доступ к графу на время своей работы и
//! переписывает узлы на месте. Ошибка прерывает проход немедленно,
//! граф остаётся в частично переписанном состоянии — отката нет.

pub mod cse;
pub mod dce;
pub mod folding;

pub use cse::CommonSubexpressionElimination;
pub use dce::DeadCodeElimination;
pub use folding::ConstantFolding;

use crate::ir::Graph;
use crate::ops::OpError;
use log::debug;
use thiserror::Error;

pub type OptResult<T> = std::result::Result<T, OptError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptError {
    #[error(transparent)]
    Op(#[from] OpError),
}

/// Общий контракт прохода оптимизации.
pub trait OptPass {
    /// Имя прохода для журналирования.
    fn name(&self) -> &'static str;

    /// Применяет проход, мутируя граф на месте.
    fn apply(&self, graph: &mut Graph) -> OptResult<()>;
}

/// Применяет проходы к графу последовательно, в заданном порядке.
///
/// Граф передаётся по изменяемой ссылке через весь конвейер; ни один
/// проход не удерживает ссылку на граф после возврата.
pub fn run_pipeline(graph: &mut Graph, passes: &[Box<dyn OptPass>]) -> OptResult<()> {
    for pass in passes {
        debug!("applying pass '{}' ({} nodes)", pass.name(), graph.len());
        pass.apply(graph)?;
    }
    Ok(())
}
