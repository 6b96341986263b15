//! Общая диспетчеризация операций.
//!
//! Тонкий слой, отображающий тег операции на соответствующую функцию
//! уровня `Tensor`. Им пользуются и исполнитель графа, и свёртка
//! констант — семантика операции задана ровно в одном месте.

use crate::ir::OpKind;
use crate::tensor::{Tensor, TensorError};
use thiserror::Error;

pub type OpResult<T> = std::result::Result<T, OpError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    #[error("operation '{op}' expects {expected} operands, got {actual}")]
    InvalidArity { op: OpKind, expected: usize, actual: usize },

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Применяет операцию к операндам в заданном порядке.
///
/// Все операции закрытого набора бинарны; иное число операндов — ошибка
/// арности. Сам набор операций закрыт типом `OpKind`, поэтому случая
/// "неизвестная операция" на этом уровне не существует.
pub fn dispatch(op: OpKind, operands: &[Tensor]) -> OpResult<Tensor> {
    match operands {
        [a, b] => {
            let result = match op {
                OpKind::Add => a.add(b),
                OpKind::Subtract => a.subtract(b),
                OpKind::Multiply => a.multiply(b),
                OpKind::Divide => a.divide(b),
                OpKind::Matmul => a.matmul(b),
            }?;
            Ok(result)
        }
        _ => Err(OpError::InvalidArity { op, expected: 2, actual: operands.len() }),
    }
}
