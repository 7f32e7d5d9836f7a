//! Distance and norm reductions over pairs of tensors.

use smallvec::smallvec;

use crate::ops::{InferError, InferMeta, InputList, OutputList};
use crate::value::{known_numel, InferMode, TensorMeta};

/// The p-norm of the broadcast difference of two tensors. Reduces to a
/// single scalar regardless of the input shapes.
#[derive(Clone, Debug)]
pub struct Dist {
    pub p: f32,
}

impl Default for Dist {
    fn default() -> Dist {
        Dist { p: 2.0 }
    }
}

impl InferMeta for Dist {
    fn name(&self) -> &str {
        "dist"
    }

    fn infer(&self, inputs: &InputList, _mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let y = inputs.require(1)?;
        if known_numel(x.shape()) == Some(0) || known_numel(y.shape()) == Some(0) {
            return Err(InferError::InvalidValue("dist inputs must be non-empty"));
        }
        let out = TensorMeta::new([1.into()].into_iter().collect(), x.dtype());
        Ok(smallvec![out])
    }
}

#[cfg(test)]
mod tests {
    use super::Dist;
    use crate::ops::{InferError, InferMeta, InputList};
    use crate::value::{dims, DataType, Dim, InferMode, TensorMeta};

    #[test]
    fn test_dist() {
        let x = TensorMeta::new(dims!(2, 3), DataType::Double);
        let y = TensorMeta::new(dims!(3), DataType::Double);
        let outputs = Dist::default()
            .infer(&InputList::from([&x, &y].as_slice()), InferMode::Runtime)
            .unwrap();
        assert_eq!(outputs[0].shape(), dims!(1).as_slice());
        assert_eq!(outputs[0].dtype(), DataType::Double);
    }

    #[test]
    fn test_dist_rejects_empty_inputs() {
        let x = TensorMeta::new(dims!(2, 0), DataType::Float);
        let y = TensorMeta::new(dims!(2, 3), DataType::Float);
        let result = Dist::default().infer(
            &InputList::from([&x, &y].as_slice()),
            InferMode::Construction,
        );
        assert_eq!(
            result,
            Err(InferError::InvalidValue("dist inputs must be non-empty"))
        );

        // An unknown extent is not known to be zero.
        let u = TensorMeta::new(dims!(2, Dim::Unknown), DataType::Float);
        assert!(Dist::default()
            .infer(
                &InputList::from([&u, &y].as_slice()),
                InferMode::Construction
            )
            .is_ok());
    }
}
