//! Elementwise binary operators and the shape broadcast resolver.

use smallvec::smallvec;

use crate::ops::{InferError, InferMeta, InputList, OutputList};
use crate::value::{Dim, InferMode, Shape, TensorMeta};

/// Resolve a single pair of dimensions under broadcast rules.
///
/// Returns `None` if the dimensions are incompatible. An unknown dimension
/// paired with a known extent greater than one resolves to that extent,
/// since broadcasting is the only way the pair can be valid. Paired with an
/// extent of one the result stays unknown, because the unknown side may
/// still turn out to be anything.
fn broadcast_dim(a: Dim, b: Dim) -> Option<Dim> {
    use Dim::{Fixed, Unknown};
    match (a, b) {
        (Unknown, Unknown) => Some(Unknown),
        (Unknown, Fixed(1)) | (Fixed(1), Unknown) => Some(Unknown),
        (Unknown, Fixed(n)) | (Fixed(n), Unknown) => Some(Fixed(n)),
        (Fixed(a), Fixed(b)) if a == b => Some(Fixed(a)),
        (Fixed(1), Fixed(b)) => Some(Fixed(b)),
        (Fixed(a), Fixed(1)) => Some(Fixed(a)),
        (Fixed(_), Fixed(_)) => None,
    }
}

/// The aligned operand shapes and result shape of a broadcast.
///
/// The aligned shapes both have the rank of `out` and describe how each
/// operand's dimensions line up against the result, with inserted
/// dimensions of extent one where the operand had none.
#[derive(Clone, Debug, PartialEq)]
pub struct BroadcastShapes {
    pub x_aligned: Shape,
    pub y_aligned: Shape,
    pub out: Shape,
}

/// Broadcast `x` against `y` with the standard right-to-left alignment.
pub fn broadcast_shapes(x: &[Dim], y: &[Dim]) -> Result<Shape, InferError> {
    Ok(broadcast_shapes_with_axis(x, y, -1)?.out)
}

/// Broadcast `x` against `y`, aligning the lower-rank operand's leading
/// dimension at `axis` within the higher-rank operand.
///
/// An axis of `-1` selects the conventional right-to-left alignment. When
/// the operands have equal rank there is nothing to align, so only `-1` and
/// `0` are accepted. Negative axes are measured from the alignment that
/// leaves no trailing gap, so for ranks 4 and 2 an axis of `-1` means
/// offset 2 and `-2` means offset 1.
pub fn broadcast_shapes_with_axis(
    x: &[Dim],
    y: &[Dim],
    axis: i32,
) -> Result<BroadcastShapes, InferError> {
    let max_rank = x.len().max(y.len());
    if max_rank == 0 {
        return Ok(BroadcastShapes {
            x_aligned: Shape::new(),
            y_aligned: Shape::new(),
            out: Shape::new(),
        });
    }
    if x.len() == y.len() && axis != -1 && axis != 0 {
        return Err(InferError::InvalidAxis { axis });
    }
    if (axis as i64) < -(max_rank as i64) || axis as i64 >= max_rank as i64 {
        return Err(InferError::AxisOutOfRange { axis, max_rank });
    }
    let short_len = x.len().min(y.len());
    let offset = if axis < 0 {
        (x.len() as i64 - y.len() as i64).abs() + axis as i64 + 1
    } else {
        axis as i64
    };
    if offset < 0 || offset as usize + short_len > max_rank {
        return Err(InferError::AxisOutOfRange { axis, max_rank });
    }
    let offset = offset as usize;

    let align = |dims: &[Dim]| -> Shape {
        let mut aligned = Shape::new();
        aligned.extend(std::iter::repeat(Dim::Fixed(1)).take(offset));
        aligned.extend_from_slice(dims);
        aligned.extend(std::iter::repeat(Dim::Fixed(1)).take(max_rank - offset - dims.len()));
        aligned
    };
    let (x_aligned, y_aligned) = if x.len() < y.len() {
        (align(x), Shape::from_slice(y))
    } else {
        (Shape::from_slice(x), align(y))
    };

    let mut out = Shape::with_capacity(max_rank);
    for (dim, (&a, &b)) in x_aligned.iter().zip(&y_aligned).enumerate() {
        let resolved = broadcast_dim(a, b).ok_or_else(|| InferError::IncompatibleShapes {
            dim,
            x: x.into(),
            y: y.into(),
        })?;
        out.push(resolved);
    }
    Ok(BroadcastShapes {
        x_aligned,
        y_aligned,
        out,
    })
}

fn elementwise_infer(inputs: &InputList, axis: i32) -> Result<OutputList, InferError> {
    let x = inputs.require(0)?;
    let y = inputs.require(1)?;
    let out_shape = if x.shape() == y.shape() {
        Shape::from_slice(x.shape())
    } else {
        broadcast_shapes_with_axis(x.shape(), y.shape(), axis)?.out
    };
    let out = TensorMeta::new(out_shape, x.dtype())
        .with_layout(x.layout())
        .with_lod_from(x);
    Ok(smallvec![out])
}

macro_rules! arithmetic_op {
    ($op:ident, $name:literal) => {
        #[derive(Clone, Debug)]
        pub struct $op {
            pub axis: i32,
        }

        impl Default for $op {
            fn default() -> $op {
                $op { axis: -1 }
            }
        }

        impl InferMeta for $op {
            fn name(&self) -> &str {
                $name
            }

            fn infer(
                &self,
                inputs: &InputList,
                _mode: InferMode,
            ) -> Result<OutputList, InferError> {
                elementwise_infer(inputs, self.axis)
            }
        }
    };
}

arithmetic_op!(Add, "add");
arithmetic_op!(Sub, "subtract");
arithmetic_op!(Mul, "multiply");
arithmetic_op!(Div, "divide");

/// Elementwise two-argument arctangent. Inputs must already have equal
/// shapes, so the output mirrors the first input entirely.
#[derive(Clone, Debug, Default)]
pub struct Atan2 {}

impl InferMeta for Atan2 {
    fn name(&self) -> &str {
        "atan2"
    }

    fn infer(&self, inputs: &InputList, _mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        inputs.require(1)?;
        Ok(smallvec![x.clone()])
    }
}
