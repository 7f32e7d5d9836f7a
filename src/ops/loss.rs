//! Pairwise loss operators.
//!
//! These all consume a prediction and a target of matching shape. While a
//! graph is under construction the shape comparison is skipped if either
//! operand is not fully known yet; it always runs at runtime.

use smallvec::smallvec;

use crate::ops::{
    check_rank, check_same_rank, check_same_shape, InferError, InferMeta, InputList, OutputList,
};
use crate::value::{
    contains_unknown_dim, known_numel, Dim, InferMode, Shape, TensorMeta,
};

/// Check that `x` and `y` have equal shapes once both are fully known and
/// non-empty.
fn check_equal_when_known(
    x: &TensorMeta,
    y: &TensorMeta,
    mode: InferMode,
) -> Result<(), InferError> {
    check_same_rank(x, y)?;
    let known_positive = |m: &TensorMeta| known_numel(m.shape()).map_or(false, |n| n > 0);
    if mode.is_runtime() || (known_positive(x) && known_positive(y)) {
        check_same_shape(x, y, mode)?;
    }
    Ok(())
}

/// Huber loss between predictions and labels.
///
/// Produces the loss and a residual tensor of the same shape, which the
/// backward pass consumes.
#[derive(Clone, Debug)]
pub struct HuberLoss {
    pub delta: f32,
}

impl Default for HuberLoss {
    fn default() -> HuberLoss {
        HuberLoss { delta: 1.0 }
    }
}

impl InferMeta for HuberLoss {
    fn name(&self) -> &str {
        "huber_loss"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let input = inputs.require(0)?;
        let label = inputs.require(1)?;
        check_same_rank(input, label)?;
        if mode.is_runtime()
            || (!contains_unknown_dim(input.shape()) && !contains_unknown_dim(label.shape()))
        {
            check_same_shape(input, label, mode)?;
        }

        let out = TensorMeta::new(Shape::from_slice(label.shape()), input.dtype())
            .with_lod_from(input);
        let residual = TensorMeta::new(Shape::from_slice(label.shape()), input.dtype());
        Ok(smallvec![out, residual])
    }
}

/// Logistic regression loss over probabilities.
#[derive(Clone, Debug)]
pub struct LogLoss {
    pub epsilon: f32,
}

impl Default for LogLoss {
    fn default() -> LogLoss {
        LogLoss { epsilon: 1e-4 }
    }
}

impl InferMeta for LogLoss {
    fn name(&self) -> &str {
        "log_loss"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let pred = inputs.require(0)?;
        let label = inputs.require(1)?;
        check_equal_when_known(pred, label, mode)?;
        check_rank(pred, 2)?;
        if mode.is_runtime() && pred.dim(1) != Dim::Fixed(1) {
            return Err(InferError::InvalidValue(
                "log_loss predictions must have a single column",
            ));
        }

        let out_dims: Shape = [pred.dim(0), Dim::Fixed(1)].into_iter().collect();
        let out = TensorMeta::new(out_dims, pred.dtype());
        Ok(smallvec![out])
    }
}

/// Binary cross entropy between probabilities and labels.
#[derive(Clone, Debug, Default)]
pub struct BceLoss {}

impl InferMeta for BceLoss {
    fn name(&self) -> &str {
        "bce_loss"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let input = inputs.require(0)?;
        let label = inputs.require(1)?;
        check_equal_when_known(input, label, mode)?;

        let out = TensorMeta::new(Shape::from_slice(input.shape()), input.dtype())
            .with_lod_from(input);
        Ok(smallvec![out])
    }
}

/// Sigmoid activation fused with binary cross entropy over logits.
#[derive(Clone, Debug)]
pub struct SigmoidCrossEntropy {
    pub normalize: bool,
    pub ignore_index: i32,
}

impl Default for SigmoidCrossEntropy {
    fn default() -> SigmoidCrossEntropy {
        SigmoidCrossEntropy {
            normalize: false,
            ignore_index: -100,
        }
    }
}

impl InferMeta for SigmoidCrossEntropy {
    fn name(&self) -> &str {
        "sigmoid_cross_entropy_with_logits"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let label = inputs.require(1)?;
        check_equal_when_known(x, label, mode)?;

        let out = TensorMeta::new(Shape::from_slice(x.shape()), x.dtype()).with_lod_from(x);
        Ok(smallvec![out])
    }
}
