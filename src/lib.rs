//! Static shape, dtype and layout inference for tensor computation graphs.
//!
//! Given only the metadata of an operator's inputs, this crate computes the
//! metadata of its outputs: shapes with possibly-unknown dimensions, the
//! element type, memory layout and optional variable-length sequence
//! descriptor. No tensor data is touched, so a whole graph can be checked
//! before anything runs.
//!
//! Inference runs in one of two modes. At graph-construction time some
//! dimensions may still be unknown, and checks involving them are deferred;
//! at runtime every dimension is concrete and all checks are strict. See
//! [`InferMode`].
//!
//! ## Example
//!
//! ```
//! use infermeta::{Attrs, DataType, Dim, InferMode, InferRegistry, InputList, TensorMeta};
//!
//! let registry = InferRegistry::with_all_ops();
//!
//! let x = TensorMeta::new(
//!     [Dim::Unknown, Dim::Fixed(3)].into_iter().collect(),
//!     DataType::Float,
//! );
//! let y = TensorMeta::new(
//!     [Dim::Fixed(5), Dim::Fixed(3)].into_iter().collect(),
//!     DataType::Float,
//! );
//!
//! let outputs = registry.infer(
//!     "add",
//!     &Attrs::new(),
//!     &InputList::from([&x, &y].as_slice()),
//!     InferMode::Construction,
//! )?;
//! assert_eq!(outputs[0].shape(), &[Dim::Fixed(5), Dim::Fixed(3)]);
//! # Ok::<(), infermeta::InferError>(())
//! ```
//!
//! Individual rules can also be used directly, without the registry, via
//! the operator structs in [`ops`].

pub mod ops;
pub mod registry;
pub mod value;

pub use ops::{InferError, InferMeta, InputList, OutputList};
pub use registry::{AttrValue, Attrs, FromAttrs, InferRegistry};
pub use value::{
    contains_unknown_dim, known_numel, DataLayout, DataType, Dim, InferMode, LodInfo, Shape,
    TensorMeta,
};
