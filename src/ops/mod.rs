//! Shape inference rules for individual operators.
//!
//! Each operator is a struct holding its attributes and implementing the
//! [`InferMeta`] trait. Rules validate their inputs, then describe every
//! output as a [`TensorMeta`] record. A rule either succeeds with a complete
//! output list or fails with an [`InferError`]; it never produces a partial
//! result.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use smallvec::SmallVec;

use crate::value::{fmt_dims, Dim, InferMode, Shape, TensorMeta};

mod binary_elementwise;
mod compare;
mod cross;
mod gather;
mod loss;
mod matmul;
mod norm;
mod segment;
mod solve;

pub use binary_elementwise::{
    broadcast_shapes, broadcast_shapes_with_axis, Add, Atan2, BroadcastShapes, Div, Mul, Sub,
};
pub use compare::{
    AllClose, Equal, EqualAll, Greater, GreaterOrEqual, Less, LessOrEqual, NotEqual,
};
pub use cross::Cross;
pub use gather::{GatherNd, GatherTree, IndexSample};
pub use loss::{BceLoss, HuberLoss, LogLoss, SigmoidCrossEntropy};
pub use matmul::{batch_broadcast_shapes, Dot, MatMul, Mv};
pub use norm::Dist;
pub use segment::{Bincount, SegmentPool};
pub use solve::{CholeskySolve, TriangularSolve};

/// An error that occurred while inferring output metadata for an operator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InferError {
    /// Two inputs that must have the same rank do not.
    RankMismatch { x: usize, y: usize },

    /// An input does not have the rank the operator requires.
    IncorrectRank { actual: usize, expected: usize },

    /// An input has fewer dimensions than the operator requires.
    RankTooLow { rank: usize, min: usize },

    /// An axis attribute is outside the valid range for the input ranks.
    AxisOutOfRange { axis: i32, max_rank: usize },

    /// An axis attribute is not meaningful for the input ranks.
    InvalidAxis { axis: i32 },

    /// Two shapes cannot be broadcast or matched at a given dimension.
    IncompatibleShapes { dim: usize, x: Shape, y: Shape },

    /// The trailing two dimensions of an input do not form a square matrix.
    NotSquareMatrix { rows: Dim, cols: Dim },

    /// An operator attribute has an invalid value.
    InvalidAttribute {
        name: &'static str,
        reason: String,
    },

    /// An input has an invalid value for the operator.
    InvalidValue(&'static str),

    /// A required input was not supplied.
    MissingInputs,

    /// No inference rule is registered under the requested name.
    UnknownOperator(String),
}

impl Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::RankMismatch { x, y } => {
                write!(f, "inputs have different ranks {} and {}", x, y)
            }
            InferError::IncorrectRank { actual, expected } => {
                write!(
                    f,
                    "input has {} dims but operator requires {}",
                    actual, expected
                )
            }
            InferError::RankTooLow { rank, min } => {
                write!(
                    f,
                    "input has {} dims but operator requires at least {}",
                    rank, min
                )
            }
            InferError::AxisOutOfRange { axis, max_rank } => {
                write!(
                    f,
                    "axis {} is outside the range [{}, {})",
                    axis,
                    -(*max_rank as i64),
                    max_rank
                )
            }
            InferError::InvalidAxis { axis } => {
                write!(f, "axis {} is invalid for equal-rank inputs", axis)
            }
            InferError::IncompatibleShapes { dim, x, y } => {
                write!(
                    f,
                    "shapes {} and {} are incompatible at dim {}",
                    fmt_dims(x),
                    fmt_dims(y),
                    dim
                )
            }
            InferError::NotSquareMatrix { rows, cols } => {
                write!(
                    f,
                    "trailing dims [{}, {}] do not form a square matrix",
                    rows, cols
                )
            }
            InferError::InvalidAttribute { name, reason } => {
                write!(f, "attribute \"{}\" is invalid: {}", name, reason)
            }
            InferError::InvalidValue(reason) => {
                write!(f, "invalid input value: {}", reason)
            }
            InferError::MissingInputs => write!(f, "required inputs were missing"),
            InferError::UnknownOperator(name) => {
                write!(f, "no inference rule registered for \"{}\"", name)
            }
        }
    }
}

impl Error for InferError {}

/// Output metadata produced by a single operator.
pub type OutputList = SmallVec<[TensorMeta; 2]>;

/// Inputs to an inference rule.
///
/// Positions are significant and optional inputs are represented as `None`,
/// so an operator with an omitted middle input still sees later inputs at
/// their usual positions.
#[derive(Clone, Default)]
pub struct InputList<'a> {
    inputs: SmallVec<[Option<&'a TensorMeta>; 3]>,
}

impl<'a> InputList<'a> {
    pub fn new() -> InputList<'a> {
        InputList {
            inputs: SmallVec::new(),
        }
    }

    pub fn push(&mut self, meta: &'a TensorMeta) {
        self.inputs.push(Some(meta));
    }

    pub fn push_optional(&mut self, meta: Option<&'a TensorMeta>) {
        self.inputs.push(meta);
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Return the input at position `index`, if supplied.
    pub fn get(&self, index: usize) -> Option<&'a TensorMeta> {
        self.inputs.get(index).copied().flatten()
    }

    /// Return the input at position `index` or fail with
    /// [`InferError::MissingInputs`].
    pub fn require(&self, index: usize) -> Result<&'a TensorMeta, InferError> {
        self.get(index).ok_or(InferError::MissingInputs)
    }
}

impl<'a> From<&[&'a TensorMeta]> for InputList<'a> {
    fn from(metas: &[&'a TensorMeta]) -> InputList<'a> {
        InputList {
            inputs: metas.iter().map(|meta| Some(*meta)).collect(),
        }
    }
}

/// An operator's shape inference rule.
///
/// Implementations hold the operator's attributes and compute output
/// metadata from input metadata alone.
pub trait InferMeta: fmt::Debug {
    /// Name of this operator as it appears in a graph.
    fn name(&self) -> &str;

    /// Compute the output metadata for the given inputs.
    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError>;
}

/// Check that `x` and `y` have the same rank.
pub(crate) fn check_same_rank(x: &TensorMeta, y: &TensorMeta) -> Result<(), InferError> {
    if x.ndim() != y.ndim() {
        return Err(InferError::RankMismatch {
            x: x.ndim(),
            y: y.ndim(),
        });
    }
    Ok(())
}

/// Check that `x` and `y` have equal shapes.
///
/// At construction time a comparison is skipped when either side of it is
/// unknown.
pub(crate) fn check_same_shape(
    x: &TensorMeta,
    y: &TensorMeta,
    mode: InferMode,
) -> Result<(), InferError> {
    check_same_rank(x, y)?;
    for dim in 0..x.ndim() {
        check_dim_eq(dim, x, y, mode)?;
    }
    Ok(())
}

/// Check that `x` and `y` agree at dimension `dim`, skipping the comparison
/// at construction time if either side is unknown.
pub(crate) fn check_dim_eq(
    dim: usize,
    x: &TensorMeta,
    y: &TensorMeta,
    mode: InferMode,
) -> Result<(), InferError> {
    match (x.dim(dim).size(), y.dim(dim).size()) {
        (Some(a), Some(b)) if a != b => Err(InferError::IncompatibleShapes {
            dim,
            x: x.shape().into(),
            y: y.shape().into(),
        }),
        (None, _) | (_, None) if mode.is_runtime() => Err(InferError::IncompatibleShapes {
            dim,
            x: x.shape().into(),
            y: y.shape().into(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn check_rank(meta: &TensorMeta, expected: usize) -> Result<(), InferError> {
    if meta.ndim() != expected {
        return Err(InferError::IncorrectRank {
            actual: meta.ndim(),
            expected,
        });
    }
    Ok(())
}

pub(crate) fn check_min_rank(meta: &TensorMeta, min: usize) -> Result<(), InferError> {
    if meta.ndim() < min {
        return Err(InferError::RankTooLow {
            rank: meta.ndim(),
            min,
        });
    }
    Ok(())
}

/// Check that the trailing two dimensions of `meta` form a square matrix.
///
/// At construction time the check is skipped if either dimension is unknown.
pub(crate) fn check_trailing_square(meta: &TensorMeta, mode: InferMode) -> Result<(), InferError> {
    check_min_rank(meta, 2)?;
    let rows = meta.dim(meta.ndim() - 2);
    let cols = meta.dim(meta.ndim() - 1);
    match (rows.size(), cols.size()) {
        (Some(m), Some(n)) if m != n => Err(InferError::NotSquareMatrix { rows, cols }),
        (None, _) | (_, None) if mode.is_runtime() => {
            Err(InferError::NotSquareMatrix { rows, cols })
        }
        _ => Ok(()),
    }
}

/// Convert a possibly-negative axis to a positive index into a shape of
/// rank `ndim`.
pub(crate) fn resolve_axis(ndim: usize, axis: i32) -> Result<usize, InferError> {
    let rank = ndim as i64;
    let axis = axis as i64;
    if axis < -rank || axis >= rank {
        return Err(InferError::AxisOutOfRange {
            axis: axis as i32,
            max_rank: ndim,
        });
    }
    if axis < 0 {
        Ok((rank + axis) as usize)
    } else {
        Ok(axis as usize)
    }
}

#[cfg(test)]
mod tests {
    use infermeta_testing::eval_cases;

    use super::{
        check_dim_eq, check_same_shape, check_trailing_square, resolve_axis, InferError, InputList,
    };
    use crate::value::{dims, DataType, Dim, InferMode, TensorMeta};

    #[test]
    fn test_input_list_optional() {
        let x = TensorMeta::new(dims!(2, 3), DataType::Float);
        let y = TensorMeta::new(dims!(3), DataType::Float);

        let mut inputs = InputList::new();
        inputs.push(&x);
        inputs.push_optional(None);
        inputs.push(&y);

        assert_eq!(inputs.len(), 3);
        assert!(inputs.require(0).is_ok());
        assert_eq!(inputs.get(1), None);
        assert_eq!(inputs.require(1), Err(InferError::MissingInputs));
        assert_eq!(inputs.get(2).map(|m| m.ndim()), Some(1));
        assert_eq!(inputs.require(3), Err(InferError::MissingInputs));
    }

    #[test]
    fn test_check_same_shape() {
        #[derive(Debug)]
        struct Case {
            x: TensorMeta,
            y: TensorMeta,
            mode: InferMode,
            ok: bool,
        }

        let cases = [
            Case {
                x: TensorMeta::new(dims!(2, 3), DataType::Float),
                y: TensorMeta::new(dims!(2, 3), DataType::Float),
                mode: InferMode::Runtime,
                ok: true,
            },
            Case {
                x: TensorMeta::new(dims!(2, 3), DataType::Float),
                y: TensorMeta::new(dims!(2, 4), DataType::Float),
                mode: InferMode::Construction,
                ok: false,
            },
            // Unknown dims are not compared at construction time.
            Case {
                x: TensorMeta::new(dims!(Dim::Unknown, 3), DataType::Float),
                y: TensorMeta::new(dims!(2, 3), DataType::Float),
                mode: InferMode::Construction,
                ok: true,
            },
            // At runtime an unknown dim is itself an error.
            Case {
                x: TensorMeta::new(dims!(Dim::Unknown, 3), DataType::Float),
                y: TensorMeta::new(dims!(2, 3), DataType::Float),
                mode: InferMode::Runtime,
                ok: false,
            },
            Case {
                x: TensorMeta::new(dims!(2, 3), DataType::Float),
                y: TensorMeta::new(dims!(2, 3, 4), DataType::Float),
                mode: InferMode::Runtime,
                ok: false,
            },
        ];

        eval_cases(cases, |case| {
            let result = check_same_shape(&case.x, &case.y, case.mode);
            assert_eq!(result.is_ok(), case.ok);
        });
    }

    #[test]
    fn test_check_dim_eq_reports_shapes() {
        let x = TensorMeta::new(dims!(2, 3), DataType::Float);
        let y = TensorMeta::new(dims!(2, 4), DataType::Float);
        assert_eq!(
            check_dim_eq(1, &x, &y, InferMode::Construction),
            Err(InferError::IncompatibleShapes {
                dim: 1,
                x: dims!(2, 3),
                y: dims!(2, 4),
            })
        );
    }

    #[test]
    fn test_check_trailing_square() {
        let square = TensorMeta::new(dims!(2, 3, 3), DataType::Float);
        assert_eq!(check_trailing_square(&square, InferMode::Runtime), Ok(()));

        let rect = TensorMeta::new(dims!(2, 3, 4), DataType::Float);
        assert_eq!(
            check_trailing_square(&rect, InferMode::Construction),
            Err(InferError::NotSquareMatrix {
                rows: Dim::Fixed(3),
                cols: Dim::Fixed(4),
            })
        );

        let unknown = TensorMeta::new(dims!(Dim::Unknown, 3), DataType::Float);
        assert!(check_trailing_square(&unknown, InferMode::Construction).is_ok());
        assert!(check_trailing_square(&unknown, InferMode::Runtime).is_err());
    }

    #[test]
    fn test_resolve_axis() {
        assert_eq!(resolve_axis(3, 0), Ok(0));
        assert_eq!(resolve_axis(3, 2), Ok(2));
        assert_eq!(resolve_axis(3, -1), Ok(2));
        assert_eq!(resolve_axis(3, -3), Ok(0));
        assert_eq!(
            resolve_axis(3, 3),
            Err(InferError::AxisOutOfRange {
                axis: 3,
                max_rank: 3
            })
        );
        assert_eq!(
            resolve_axis(3, -4),
            Err(InferError::AxisOutOfRange {
                axis: -4,
                max_rank: 3
            })
        );
    }
}
