//! Vector cross product along a chosen axis.

use smallvec::smallvec;

use crate::ops::{check_same_shape, resolve_axis, InferError, InferMeta, InputList, OutputList};
use crate::value::InferMode;

/// Cross product of 3-element vectors laid out along `axis`.
///
/// With no axis the kernel picks the first dimension of extent 3 at
/// execution time, so no axis validation is possible here.
#[derive(Clone, Debug, Default)]
pub struct Cross {
    pub axis: Option<i32>,
}

impl InferMeta for Cross {
    fn name(&self) -> &str {
        "cross"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        check_same_shape(x, y, mode)?;

        if let Some(axis) = self.axis {
            let axis = resolve_axis(x.ndim(), axis)?;
            match x.dim(axis).size() {
                Some(3) => {}
                Some(_) => {
                    return Err(InferError::InvalidValue("cross axis must have extent 3"));
                }
                None if mode.is_runtime() => {
                    return Err(InferError::InvalidValue("cross axis must have extent 3"));
                }
                None => {}
            }
        }

        Ok(smallvec![x.clone()])
    }
}

#[cfg(test)]
mod tests {
    use infermeta_testing::eval_cases;

    use super::Cross;
    use crate::ops::{InferError, InferMeta, InputList};
    use crate::value::{dims, DataType, Dim, InferMode, Shape, TensorMeta};

    #[test]
    fn test_cross() {
        #[derive(Debug)]
        struct Case {
            shape: Shape,
            axis: Option<i32>,
            mode: InferMode,
            expected: Result<Shape, InferError>,
        }

        let cases = [
            Case {
                shape: dims!(4, 3),
                axis: Some(1),
                mode: InferMode::Runtime,
                expected: Ok(dims!(4, 3)),
            },
            Case {
                shape: dims!(4, 3),
                axis: Some(-1),
                mode: InferMode::Runtime,
                expected: Ok(dims!(4, 3)),
            },
            // Without an axis any shape passes.
            Case {
                shape: dims!(4, 5),
                axis: None,
                mode: InferMode::Runtime,
                expected: Ok(dims!(4, 5)),
            },
            Case {
                shape: dims!(4, 5),
                axis: Some(1),
                mode: InferMode::Runtime,
                expected: Err(InferError::InvalidValue("cross axis must have extent 3")),
            },
            Case {
                shape: dims!(4, 3),
                axis: Some(2),
                mode: InferMode::Runtime,
                expected: Err(InferError::AxisOutOfRange {
                    axis: 2,
                    max_rank: 2,
                }),
            },
            // An unknown extent defers the check to runtime.
            Case {
                shape: dims!(4, Dim::Unknown),
                axis: Some(1),
                mode: InferMode::Construction,
                expected: Ok(dims!(4, Dim::Unknown)),
            },
            // At runtime an unknown dim already fails the shape check.
            Case {
                shape: dims!(4, Dim::Unknown),
                axis: Some(1),
                mode: InferMode::Runtime,
                expected: Err(InferError::IncompatibleShapes {
                    dim: 1,
                    x: dims!(4, Dim::Unknown),
                    y: dims!(4, Dim::Unknown),
                }),
            },
        ];

        eval_cases(cases, |case| {
            let x = TensorMeta::new(case.shape.clone(), DataType::Float);
            let y = TensorMeta::new(case.shape.clone(), DataType::Float);
            let result = Cross { axis: case.axis }
                .infer(&InputList::from([&x, &y].as_slice()), case.mode);
            assert_eq!(
                result.map(|outs| Shape::from_slice(outs[0].shape())),
                case.expected
            );
        });
    }

    #[test]
    fn test_cross_requires_equal_shapes() {
        let x = TensorMeta::new(dims!(4, 3), DataType::Float);
        let y = TensorMeta::new(dims!(5, 3), DataType::Float);
        let result = Cross::default().infer(
            &InputList::from([&x, &y].as_slice()),
            InferMode::Construction,
        );
        assert!(result.is_err());
    }
}
