//! Linear system solvers over batches of matrices.

use smallvec::smallvec;

use crate::ops::matmul::batch_broadcast_shapes;
use crate::ops::{
    check_min_rank, check_trailing_square, InferError, InferMeta, InputList, OutputList,
};
use crate::value::{InferMode, TensorMeta};

/// Solve `op(x) * out = y` where `x` holds triangular matrices.
///
/// The first input is the system and must be square in its trailing two
/// dimensions; the second is the right-hand side, whose trailing two
/// dimensions carry through to the output.
#[derive(Clone, Debug)]
pub struct TriangularSolve {
    pub upper: bool,
    pub transpose: bool,
    pub unitriangular: bool,
}

impl Default for TriangularSolve {
    fn default() -> TriangularSolve {
        TriangularSolve {
            upper: true,
            transpose: false,
            unitriangular: false,
        }
    }
}

impl InferMeta for TriangularSolve {
    fn name(&self) -> &str {
        "triangular_solve"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        check_trailing_square(x, mode)?;
        check_min_rank(y, 2)?;

        let mut out_dims = batch_broadcast_shapes(x.shape(), y.shape())?;
        out_dims.extend_from_slice(&y.shape()[y.ndim() - 2..]);

        let out = TensorMeta::new(out_dims, y.dtype())
            .with_layout(y.layout())
            .with_lod_from(y);
        Ok(smallvec![out])
    }
}

/// Solve `x = chol * out` given the Cholesky factor `y` of a
/// positive-definite system.
///
/// Unlike [`TriangularSolve`] the right-hand side comes first and the
/// factor second, so here the second input must be square and the output
/// takes its trailing dimensions and metadata from the first.
#[derive(Clone, Debug, Default)]
pub struct CholeskySolve {
    pub upper: bool,
}

impl InferMeta for CholeskySolve {
    fn name(&self) -> &str {
        "cholesky_solve"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        check_min_rank(x, 2)?;
        check_trailing_square(y, mode)?;

        // The row counts of the right-hand side and the factor must agree.
        let row_dim = |meta: &TensorMeta| meta.ndim() - 2;
        match (x.dim(row_dim(x)).size(), y.dim(row_dim(y)).size()) {
            (Some(a), Some(b)) if a != b => {
                return Err(InferError::IncompatibleShapes {
                    dim: row_dim(x),
                    x: x.shape().into(),
                    y: y.shape().into(),
                });
            }
            (None, _) | (_, None) if mode.is_runtime() => {
                return Err(InferError::IncompatibleShapes {
                    dim: row_dim(x),
                    x: x.shape().into(),
                    y: y.shape().into(),
                });
            }
            _ => {}
        }

        let mut out_dims = batch_broadcast_shapes(x.shape(), y.shape())?;
        out_dims.extend_from_slice(&x.shape()[x.ndim() - 2..]);

        let out = TensorMeta::new(out_dims, x.dtype())
            .with_layout(x.layout())
            .with_lod_from(x);
        Ok(smallvec![out])
    }
}
