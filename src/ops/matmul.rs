//! Matrix product operators.

use smallvec::smallvec;

use crate::ops::binary_elementwise::broadcast_shapes;
use crate::ops::{check_rank, check_same_shape, InferError, InferMeta, InputList, OutputList};
use crate::value::{Dim, InferMode, Shape, TensorMeta};

/// Broadcast the batch prefixes of two stacked-matrix shapes.
///
/// The trailing two dimensions of each operand are the matrix and take no
/// part in broadcasting; the remaining leading dimensions are resolved with
/// the standard right-to-left alignment.
pub fn batch_broadcast_shapes(x: &[Dim], y: &[Dim]) -> Result<Shape, InferError> {
    let x_batch = &x[..x.len().saturating_sub(2)];
    let y_batch = &y[..y.len().saturating_sub(2)];
    broadcast_shapes(x_batch, y_batch)
}

/// Batched matrix product with optional transposition of either operand.
///
/// Rank-1 operands are promoted to matrices for the product and the
/// corresponding output dimension is dropped again, following the usual
/// matmul convention: a rank-1 first operand is a row vector, a rank-1
/// second operand a column vector.
#[derive(Clone, Debug, Default)]
pub struct MatMul {
    pub trans_x: bool,
    pub trans_y: bool,
}

impl InferMeta for MatMul {
    fn name(&self) -> &str {
        "matmul"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        for input in [x, y] {
            if input.ndim() < 1 {
                return Err(InferError::RankTooLow {
                    rank: input.ndim(),
                    min: 1,
                });
            }
        }

        let mut x_dims = Shape::from_slice(x.shape());
        let mut y_dims = Shape::from_slice(y.shape());
        let x_promoted = x_dims.len() == 1;
        let y_promoted = y_dims.len() == 1;
        if x_promoted {
            x_dims.insert(0, Dim::Fixed(1));
        }
        if y_promoted {
            y_dims.push(Dim::Fixed(1));
        }

        let (m, k_x) = if self.trans_x {
            (x_dims[x_dims.len() - 1], x_dims[x_dims.len() - 2])
        } else {
            (x_dims[x_dims.len() - 2], x_dims[x_dims.len() - 1])
        };
        let (k_y, n) = if self.trans_y {
            (y_dims[y_dims.len() - 1], y_dims[y_dims.len() - 2])
        } else {
            (y_dims[y_dims.len() - 2], y_dims[y_dims.len() - 1])
        };
        match (k_x.size(), k_y.size()) {
            (Some(a), Some(b)) if a != b => {
                return Err(InferError::InvalidValue(
                    "matmul contracted dims do not match",
                ));
            }
            (None, _) | (_, None) if mode.is_runtime() => {
                return Err(InferError::InvalidValue(
                    "matmul contracted dims do not match",
                ));
            }
            _ => {}
        }

        let mut out_dims = batch_broadcast_shapes(&x_dims, &y_dims)?;
        if !x_promoted {
            out_dims.push(m);
        }
        if !y_promoted {
            out_dims.push(n);
        }
        if x_promoted && y_promoted {
            out_dims.push(Dim::Fixed(1));
        }

        let out = TensorMeta::new(out_dims, x.dtype()).with_layout(x.layout());
        Ok(smallvec![out])
    }
}

/// Matrix-vector product.
#[derive(Clone, Debug, Default)]
pub struct Mv {}

impl InferMeta for Mv {
    fn name(&self) -> &str {
        "mv"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let vec = inputs.require(1)?;
        check_rank(x, 2)?;
        check_rank(vec, 1)?;
        match (x.dim(1).size(), vec.dim(0).size()) {
            (Some(a), Some(b)) if a != b => {
                return Err(InferError::IncompatibleShapes {
                    dim: 1,
                    x: x.shape().into(),
                    y: vec.shape().into(),
                });
            }
            (None, _) | (_, None) if mode.is_runtime() => {
                return Err(InferError::IncompatibleShapes {
                    dim: 1,
                    x: x.shape().into(),
                    y: vec.shape().into(),
                });
            }
            _ => {}
        }
        let out = TensorMeta::new([x.dim(0)].into_iter().collect(), x.dtype())
            .with_layout(x.layout())
            .with_lod_from(x);
        Ok(smallvec![out])
    }
}

/// Inner product along the last dimension, optionally batched over a
/// leading dimension.
#[derive(Clone, Debug, Default)]
pub struct Dot {}

impl InferMeta for Dot {
    fn name(&self) -> &str {
        "dot"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        if x.ndim() < 1 || x.ndim() > 2 {
            return Err(InferError::InvalidValue("dot requires 1-d or 2-d inputs"));
        }
        check_same_shape(x, y, mode)?;

        let mut out_dims = Shape::from_slice(x.shape());
        let last = out_dims.len() - 1;
        out_dims[last] = Dim::Fixed(1);
        let out = TensorMeta::new(out_dims, x.dtype()).with_layout(x.layout());
        Ok(smallvec![out])
    }
}
