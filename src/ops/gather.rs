//! Indexed selection operators.

use smallvec::smallvec;

use crate::ops::{
    check_min_rank, check_rank, check_same_shape, InferError, InferMeta, InputList, OutputList,
};
use crate::value::{InferMode, Shape, TensorMeta};

/// Gather slices of the first input at multi-dimensional indices.
///
/// The last dimension of the index tensor addresses a prefix of the data
/// tensor's dimensions; each such index selects the remaining suffix as a
/// slice. The output is the index shape minus its last dimension, followed
/// by that suffix.
#[derive(Clone, Debug, Default)]
pub struct GatherNd {}

impl InferMeta for GatherNd {
    fn name(&self) -> &str {
        "gather_nd"
    }

    fn infer(&self, inputs: &InputList, _mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let index = inputs.require(1)?;
        check_min_rank(index, 1)?;

        let depth = index
            .dim(index.ndim() - 1)
            .size()
            .ok_or(InferError::InvalidValue(
                "gather_nd index depth must be known",
            ))?;
        if depth > x.ndim() {
            return Err(InferError::RankTooLow {
                rank: x.ndim(),
                min: depth,
            });
        }

        let mut out_dims = Shape::from_slice(&index.shape()[..index.ndim() - 1]);
        out_dims.extend_from_slice(&x.shape()[depth..]);

        let out = TensorMeta::new(out_dims, x.dtype())
            .with_layout(x.layout())
            .with_lod_from(x);
        Ok(smallvec![out])
    }
}

/// Walk beam-search parent pointers to recover full output sequences.
/// Pure bookkeeping at the metadata level: the output mirrors the ids.
#[derive(Clone, Debug, Default)]
pub struct GatherTree {}

impl InferMeta for GatherTree {
    fn name(&self) -> &str {
        "gather_tree"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let ids = inputs.require(0)?;
        let parents = inputs.require(1)?;
        check_same_shape(ids, parents, mode)?;
        let out = TensorMeta::new(Shape::from_slice(ids.shape()), ids.dtype());
        Ok(smallvec![out])
    }
}

/// Gather one element per row of the first input at the column positions
/// given by the second.
#[derive(Clone, Debug, Default)]
pub struct IndexSample {}

impl InferMeta for IndexSample {
    fn name(&self) -> &str {
        "index_sample"
    }

    fn infer(&self, inputs: &InputList, mode: InferMode) -> Result<OutputList, InferError> {
        let x = inputs.require(0)?;
        let index = inputs.require(1)?;
        check_rank(x, 2)?;
        check_rank(index, 2)?;

        // Row counts are only compared at runtime; batch dims are commonly
        // unknown while a graph is being built.
        if mode.is_runtime() {
            match (x.dim(0).size(), index.dim(0).size()) {
                (Some(a), Some(b)) if a == b => {}
                _ => {
                    return Err(InferError::IncompatibleShapes {
                        dim: 0,
                        x: x.shape().into(),
                        y: index.shape().into(),
                    });
                }
            }
        }

        let out = TensorMeta::new(Shape::from_slice(index.shape()), x.dtype())
            .with_layout(x.layout())
            .with_lod_from(index);
        Ok(smallvec![out])
    }
}
