//! Модуль, определяющий `Tensor` — числовую полезную нагрузку IR.
//!
//! `Tensor` — неизменяемое значение с формой: скаляр, вектор или матрица
//! поверх `ndarray::ArrayD<f32>`. Модуль предоставляет поэлементные
//! операции с трансляцией скаляров и матричное умножение; этой
//! поверхностью пользуются исполнитель графа и свёртка констант.
//!
//! Деление здесь строгое: нулевой делитель (скаляр или элемент) — это
//! ошибка, а не бесконечность.

use ndarray::{Array1, Array2, ArrayD, Ix1, Ix2, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TensorResult<T> = std::result::Result<T, TensorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("incompatible shapes for {op}: {lhs:?} and {rhs:?}")]
    ShapeMismatch { op: String, lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid tensor construction: {0}")]
    InvalidConstruction(String),
}

/// Неизменяемое числовое значение с формой.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// Скаляр (тензор нулевой размерности).
    pub fn scalar(value: f32) -> Self {
        Self { data: ndarray::arr0(value).into_dyn() }
    }

    /// Одномерный вектор.
    pub fn vector(values: Vec<f32>) -> Self {
        Self { data: Array1::from(values).into_dyn() }
    }

    /// Матрица из строк. Строки обязаны быть одной длины.
    pub fn matrix(rows: Vec<Vec<f32>>) -> TensorResult<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map(|row| row.len()).unwrap_or(0);
        if rows.iter().any(|row| row.len() != col_count) {
            return Err(TensorError::InvalidConstruction(
                "matrix rows must all have the same length".to_string(),
            ));
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((row_count, col_count), flat)
            .map_err(|e| TensorError::InvalidConstruction(e.to_string()))?;
        Ok(Self { data: data.into_dyn() })
    }

    pub fn from_array(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn is_scalar(&self) -> bool {
        self.data.ndim() == 0
    }

    pub fn is_vector(&self) -> bool {
        self.data.ndim() == 1
    }

    pub fn is_matrix(&self) -> bool {
        self.data.ndim() == 2
    }

    pub fn is_row_vector(&self) -> bool {
        self.is_matrix() && self.data.shape()[0] == 1
    }

    pub fn is_column_vector(&self) -> bool {
        self.is_matrix() && self.data.shape()[1] == 1
    }

    /// Каноническое байтовое представление элементов: каждое значение —
    /// фиксированные big-endian байты IEEE754, в порядке обхода строк.
    /// Форма сюда намеренно не входит; подпись CSE несёт её отдельно.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    pub fn add(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.elementwise(other, "add", |x, y| x + y)
    }

    pub fn subtract(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.elementwise(other, "subtract", |x, y| x - y)
    }

    pub fn multiply(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.elementwise(other, "multiply", |x, y| x * y)
    }

    /// Строгое поэлементное деление: любой нулевой элемент делителя
    /// (после трансляции скаляра) — ошибка `DivisionByZero`.
    pub fn divide(&self, other: &Tensor) -> TensorResult<Tensor> {
        let (a, b) = self.broadcast_with(other);
        check_same_shape("divide", &a, &b)?;
        if b.iter().any(|&v| v == 0.0) {
            return Err(TensorError::DivisionByZero);
        }
        let data = Zip::from(&a).and(&b).map_collect(|&x, &y| x / y);
        Ok(Tensor { data })
    }

    /// Матричное умножение: матрица×матрица, матрица×вектор или
    /// вектор×матрица с проверкой совместимости внутренних размерностей.
    /// Скаляры и прочие ранги отклоняются.
    pub fn matmul(&self, other: &Tensor) -> TensorResult<Tensor> {
        let mismatch = || TensorError::ShapeMismatch {
            op: "matmul".to_string(),
            lhs: self.shape().to_vec(),
            rhs: other.shape().to_vec(),
        };
        match (self.data.ndim(), other.data.ndim()) {
            (2, 2) => {
                let a = self.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
                let b = other.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
                if a.shape()[1] != b.shape()[0] {
                    return Err(mismatch());
                }
                Ok(Tensor { data: a.dot(&b).into_dyn() })
            }
            (2, 1) => {
                let a = self.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
                let b = other.data.view().into_dimensionality::<Ix1>().map_err(|_| mismatch())?;
                if a.shape()[1] != b.len() {
                    return Err(mismatch());
                }
                Ok(Tensor { data: a.dot(&b).into_dyn() })
            }
            (1, 2) => {
                let a = self.data.view().into_dimensionality::<Ix1>().map_err(|_| mismatch())?;
                let b = other.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
                if a.len() != b.shape()[0] {
                    return Err(mismatch());
                }
                Ok(Tensor { data: a.dot(&b).into_dyn() })
            }
            _ => Err(mismatch()),
        }
    }

    fn elementwise(
        &self,
        other: &Tensor,
        op: &str,
        f: fn(f32, f32) -> f32,
    ) -> TensorResult<Tensor> {
        let (a, b) = self.broadcast_with(other);
        check_same_shape(op, &a, &b)?;
        let data = Zip::from(&a).and(&b).map_collect(|&x, &y| f(x, y));
        Ok(Tensor { data })
    }

    /// Транслирует скалярный операнд до формы второго; остальные пары
    /// возвращаются как есть и проверяются на точное совпадение форм.
    fn broadcast_with(&self, other: &Tensor) -> (ArrayD<f32>, ArrayD<f32>) {
        if self.is_scalar() && !other.is_scalar() {
            (
                ArrayD::from_elem(other.data.raw_dim(), self.item()),
                other.data.clone(),
            )
        } else if other.is_scalar() && !self.is_scalar() {
            (
                self.data.clone(),
                ArrayD::from_elem(self.data.raw_dim(), other.item()),
            )
        } else {
            (self.data.clone(), other.data.clone())
        }
    }

    fn item(&self) -> f32 {
        // Скалярный тензор всегда содержит ровно один элемент.
        self.data.first().copied().unwrap_or(0.0)
    }
}

fn check_same_shape(op: &str, a: &ArrayD<f32>, b: &ArrayD<f32>) -> TensorResult<()> {
    if a.shape() != b.shape() {
        return Err(TensorError::ShapeMismatch {
            op: op.to_string(),
            lhs: a.shape().to_vec(),
            rhs: b.shape().to_vec(),
        });
    }
    Ok(())
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.data)
    }
}
