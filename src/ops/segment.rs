//! Segment reductions and histogram operators.
//!
//! Both operators here have data-dependent output extents: the number of
//! segments or bins is only known once the index values are read, so the
//! affected output dimension is always unknown at inference time.

use smallvec::smallvec;

use crate::ops::{check_min_rank, check_rank, InferError, InferMeta, InputList, OutputList};
use crate::value::{Dim, InferMode, Shape, TensorMeta};

const POOL_TYPES: [&str; 4] = ["SUM", "MEAN", "MAX", "MIN"];

/// Reduce rows of the input over contiguous segments given by a rank-1 id
/// tensor.
///
/// Mean pooling additionally produces the per-segment counts, which the
/// backward pass reuses.
#[derive(Clone, Debug)]
pub struct SegmentPool {
    pub pooltype: String,
}

impl Default for SegmentPool {
    fn default() -> SegmentPool {
        SegmentPool {
            pooltype: "SUM".to_string(),
        }
    }
}

impl InferMeta for SegmentPool {
    fn name(&self) -> &str {
        "segment_pool"
    }

    fn infer(&self, inputs: &InputList, _mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let segment_ids = inputs.require(1)?;
        if !POOL_TYPES.contains(&self.pooltype.as_str()) {
            return Err(InferError::InvalidAttribute {
                name: "pooltype",
                reason: format!("\"{}\" is not one of SUM, MEAN, MAX, MIN", self.pooltype),
            });
        }
        check_min_rank(x, 1)?;
        check_rank(segment_ids, 1)?;

        let mut out_dims = Shape::from_slice(x.shape());
        out_dims[0] = Dim::Unknown;
        let out = TensorMeta::new(out_dims, x.dtype()).with_layout(x.layout());

        let mut outputs: OutputList = smallvec![out];
        if self.pooltype == "MEAN" {
            let counts: Shape = [Dim::Unknown, Dim::Fixed(1)].into_iter().collect();
            outputs.push(TensorMeta::new(counts, x.dtype()).with_layout(x.layout()));
        }
        Ok(outputs)
    }
}

/// Histogram of a rank-1 integer tensor, optionally weighted.
#[derive(Clone, Debug, Default)]
pub struct Bincount {
    pub minlength: i32,
}

impl InferMeta for Bincount {
    fn name(&self) -> &str {
        "bincount"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let weights = inputs.get(1);
        if self.minlength < 0 {
            return Err(InferError::InvalidAttribute {
                name: "minlength",
                reason: format!("must be non-negative, got {}", self.minlength),
            });
        }
        check_rank(x, 1)?;

        if let Some(weights) = weights {
            check_rank(weights, 1)?;
            match (weights.dim(0).size(), x.dim(0).size()) {
                (Some(a), Some(b)) if a != b => {
                    return Err(InferError::IncompatibleShapes {
                        dim: 0,
                        x: x.shape().into(),
                        y: weights.shape().into(),
                    });
                }
                (None, _) | (_, None) if mode.is_runtime() => {
                    return Err(InferError::IncompatibleShapes {
                        dim: 0,
                        x: x.shape().into(),
                        y: weights.shape().into(),
                    });
                }
                _ => {}
            }
        }

        // The bin count depends on the maximum value in x.
        let dtype = weights.map_or(x.dtype(), |w| w.dtype());
        let out = TensorMeta::new([Dim::Unknown].into_iter().collect(), dtype).with_lod_from(x);
        Ok(smallvec![out])
    }
}
