//! Elementwise and whole-tensor comparison operators.
//!
//! All comparisons produce boolean outputs. The elementwise forms broadcast
//! their operands with the standard right-to-left alignment; there is no
//! axis attribute to override it.

use smallvec::smallvec;

use crate::ops::binary_elementwise::broadcast_shapes;
use crate::ops::{check_same_shape, InferError, InferMeta, InputList, OutputList};
use crate::value::{DataType, InferMode, Shape, TensorMeta};

fn compare_infer(inputs: &InputList) -> Result<OutputList, InferError> {
    let x = inputs.require(0)?;
    let y = inputs.require(1)?;
    let out_shape = if x.shape() == y.shape() {
        Shape::from_slice(x.shape())
    } else {
        broadcast_shapes(x.shape(), y.shape())?
    };
    let out = TensorMeta::new(out_shape, DataType::Bool)
        .with_layout(x.layout())
        .with_lod_from(x);
    Ok(smallvec![out])
}

macro_rules! compare_op {
    ($op:ident, $name:literal) => {
        #[derive(Clone, Debug, Default)]
        pub struct $op {}

        impl InferMeta for $op {
            fn name(&self) -> &str {
                $name
            }

            fn infer(
                &self,
                inputs: &InputList,
                _mode: InferMode,
            ) -> Result<OutputList, InferError> {
                compare_infer(inputs)
            }
        }
    };
}

compare_op!(Equal, "equal");
compare_op!(NotEqual, "not_equal");
compare_op!(Greater, "greater_than");
compare_op!(GreaterOrEqual, "greater_equal");
compare_op!(Less, "less_than");
compare_op!(LessOrEqual, "less_equal");

/// Whole-tensor equality. Produces a single boolean scalar.
#[derive(Clone, Debug, Default)]
pub struct EqualAll {}

impl InferMeta for EqualAll {
    fn name(&self) -> &str {
        "equal_all"
    }

    fn infer(&self, inputs: &InputList, _mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        if y.ndim() > x.ndim() {
            return Err(InferError::RankMismatch {
                x: x.ndim(),
                y: y.ndim(),
            });
        }
        let out = TensorMeta::new([1.into()].into_iter().collect(), DataType::Bool)
            .with_layout(x.layout())
            .with_lod_from(x);
        Ok(smallvec![out])
    }
}

/// Whole-tensor approximate equality within the given tolerances.
#[derive(Clone, Debug)]
pub struct AllClose {
    pub rtol: f32,
    pub atol: f32,
}

impl Default for AllClose {
    fn default() -> AllClose {
        AllClose {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl InferMeta for AllClose {
    fn name(&self) -> &str {
        "allclose"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        check_same_shape(x, y, mode)?;
        let out = TensorMeta::new([1.into()].into_iter().collect(), DataType::Bool);
        Ok(smallvec![out])
    }
}

#[cfg(test)]
mod tests {
    use infermeta_testing::eval_cases;

    use super::{AllClose, Equal, EqualAll, Less};
    use crate::ops::{InferError, InferMeta, InputList};
    use crate::value::{dims, DataType, Dim, InferMode, LodInfo, Shape, TensorMeta};

    #[test]
    fn test_compare_broadcasts() {
        #[derive(Debug)]
        struct Case {
            x: Shape,
            y: Shape,
            expected: Result<Shape, InferError>,
        }

        let cases = [
            Case {
                x: dims!(2, 3),
                y: dims!(2, 3),
                expected: Ok(dims!(2, 3)),
            },
            Case {
                x: dims!(2, 1, 4),
                y: dims!(3, 1),
                expected: Ok(dims!(2, 3, 4)),
            },
            Case {
                x: dims!(Dim::Unknown, 3),
                y: dims!(5, 3),
                expected: Ok(dims!(5, 3)),
            },
            Case {
                x: dims!(2, 3),
                y: dims!(4, 3),
                expected: Err(InferError::IncompatibleShapes {
                    dim: 0,
                    x: dims!(2, 3),
                    y: dims!(4, 3),
                }),
            },
        ];

        eval_cases(cases, |case| {
            let x = TensorMeta::new(case.x.clone(), DataType::Float);
            let y = TensorMeta::new(case.y.clone(), DataType::Float);
            let result = Equal::default().infer(
                &InputList::from([&x, &y].as_slice()),
                InferMode::Construction,
            );
            assert_eq!(
                result.map(|outs| Shape::from_slice(outs[0].shape())),
                case.expected
            );
        });
    }

    #[test]
    fn test_compare_output_is_bool() {
        let lod = LodInfo::new(vec![vec![0, 3]]);
        let x = TensorMeta::new(dims!(3, 2), DataType::Int64).with_lod(lod.clone());
        let y = TensorMeta::new(dims!(3, 2), DataType::Int64);

        let outputs = Less::default()
            .infer(&InputList::from([&x, &y].as_slice()), InferMode::Runtime)
            .unwrap();
        assert_eq!(outputs[0].dtype(), DataType::Bool);
        assert_eq!(outputs[0].lod(), Some(&lod));
    }

    #[test]
    fn test_equal_all() {
        let x = TensorMeta::new(dims!(2, 3), DataType::Float);
        let y = TensorMeta::new(dims!(3), DataType::Float);

        let outputs = EqualAll::default()
            .infer(&InputList::from([&x, &y].as_slice()), InferMode::Runtime)
            .unwrap();
        assert_eq!(outputs[0].shape(), dims!(1).as_slice());
        assert_eq!(outputs[0].dtype(), DataType::Bool);

        // The second input may not out-rank the first.
        let result = EqualAll::default().infer(
            &InputList::from([&y, &x].as_slice()),
            InferMode::Runtime,
        );
        assert_eq!(result, Err(InferError::RankMismatch { x: 1, y: 2 }));
    }

    #[test]
    fn test_allclose() {
        let x = TensorMeta::new(dims!(2, 3), DataType::Float);
        let y = TensorMeta::new(dims!(2, 3), DataType::Float);
        let outputs = AllClose::default()
            .infer(&InputList::from([&x, &y].as_slice()), InferMode::Runtime)
            .unwrap();
        assert_eq!(outputs[0].shape(), dims!(1).as_slice());
        assert_eq!(outputs[0].dtype(), DataType::Bool);

        let z = TensorMeta::new(dims!(2, 4), DataType::Float);
        let result = AllClose::default().infer(
            &InputList::from([&x, &z].as_slice()),
            InferMode::Construction,
        );
        assert!(result.is_err());

        // Unknown dims defer the shape check to runtime.
        let u = TensorMeta::new(dims!(2, Dim::Unknown), DataType::Float);
        assert!(AllClose::default()
            .infer(
                &InputList::from([&x, &u].as_slice()),
                InferMode::Construction
            )
            .is_ok());
        assert!(AllClose::default()
            .infer(&InputList::from([&x, &u].as_slice()), InferMode::Runtime)
            .is_err());
    }
}
