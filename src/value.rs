//! Metadata types describing tensors without their data.
//!
//! [`TensorMeta`] is the unit the inference engine reads and writes: the
//! shape, element type, memory layout and (optionally) the variable-length
//! sequence descriptor of a tensor. Shapes are sequences of [`Dim`], which
//! may be concrete or unknown; ranks are always concrete.

use std::fmt;

use smallvec::SmallVec;

/// A single tensor dimension.
///
/// During graph construction a dimension may not have a concrete extent yet,
/// for example the batch size of a placeholder input. Such dimensions are
/// represented as [`Dim::Unknown`] rather than a sentinel extent, so that
/// "is this extent known" is a type-level question and unknown extents can
/// never leak into size arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim {
    /// A dimension with a fixed, known extent.
    Fixed(usize),

    /// A dimension whose extent is determined at runtime.
    Unknown,
}

impl Dim {
    /// Return the extent if it is known.
    pub fn size(self) -> Option<usize> {
        match self {
            Dim::Fixed(size) => Some(size),
            Dim::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Dim::Unknown)
    }
}

impl From<usize> for Dim {
    fn from(size: usize) -> Dim {
        Dim::Fixed(size)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(size) => write!(f, "{}", size),
            Dim::Unknown => write!(f, "?"),
        }
    }
}

/// An ordered sequence of dimensions. The rank of a shape is its length.
pub type Shape = SmallVec<[Dim; 4]>;

/// Return true if any dimension of `dims` is [`Dim::Unknown`].
pub fn contains_unknown_dim(dims: &[Dim]) -> bool {
    dims.iter().any(|dim| dim.is_unknown())
}

/// Return the total element count of `dims`, or `None` if any dimension is
/// unknown.
pub fn known_numel(dims: &[Dim]) -> Option<usize> {
    dims.iter().try_fold(1usize, |numel, dim| {
        dim.size().map(|size| numel.saturating_mul(size))
    })
}

/// Format `dims` the way shapes appear in error messages, eg. `[2, ?, 3]`.
pub(crate) fn fmt_dims(dims: &[Dim]) -> String {
    let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Element type of a tensor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum DataType {
    Float,
    Double,
    Int32,
    Int64,
    Bool,
}

impl fmt::Display for DataType {
    /// Format this value as the corresponding Rust type name (eg. "i32"
    /// for `DataType::Int32`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataType::Float => "f32",
                DataType::Double => "f64",
                DataType::Int32 => "i32",
                DataType::Int64 => "i64",
                DataType::Bool => "bool",
            }
        )
    }
}

/// Memory layout of a tensor.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DataLayout {
    /// Dense row-major ("NCHW") layout. The default.
    #[default]
    RowMajor,

    /// Channels-last ("NHWC") layout.
    ChannelLast,

    /// An accelerator-owned layout the engine treats as opaque.
    Opaque,
}

/// Sequence-length descriptor for tensors that pack variable-length
/// sequences into their leading dimension.
///
/// Each level is a table of offsets into the level below, or into the
/// tensor's rows for the last level. The inference engine only ever copies
/// this descriptor verbatim from a designated input to an output; it never
/// computes one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LodInfo {
    levels: Vec<Vec<usize>>,
}

impl LodInfo {
    pub fn new(levels: Vec<Vec<usize>>) -> LodInfo {
        LodInfo { levels }
    }

    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }
}

/// Evaluation mode for shape inference.
///
/// At graph-construction time some dimensions may still be unknown, so
/// checks that involve them are skipped rather than failed; the affected
/// output dimensions become unknown and any real mismatch resurfaces at
/// runtime, when every dimension is concrete and all checks are strict.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InferMode {
    Construction,
    Runtime,
}

impl InferMode {
    pub fn is_runtime(self) -> bool {
        matches!(self, InferMode::Runtime)
    }
}

/// Shape, dtype and layout metadata for a single tensor.
///
/// Inference rules receive their inputs as `&TensorMeta` and produce their
/// outputs as new `TensorMeta` values, which the caller then commits to its
/// long-lived output records. A rule that fails returns an error before any
/// output exists, so callers never observe partially-populated outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorMeta {
    shape: Shape,
    dtype: DataType,
    layout: DataLayout,
    lod: Option<LodInfo>,
}

impl TensorMeta {
    pub fn new(shape: Shape, dtype: DataType) -> TensorMeta {
        TensorMeta {
            shape,
            dtype,
            layout: DataLayout::default(),
            lod: None,
        }
    }

    pub fn with_layout(mut self, layout: DataLayout) -> TensorMeta {
        self.layout = layout;
        self
    }

    pub fn with_lod(mut self, lod: LodInfo) -> TensorMeta {
        self.lod = Some(lod);
        self
    }

    /// Copy the sequence descriptor of `other`, if any, onto this metadata.
    ///
    /// This is the only way an output acquires a sequence descriptor.
    pub fn with_lod_from(mut self, other: &TensorMeta) -> TensorMeta {
        self.lod = other.lod.clone();
        self
    }

    pub fn shape(&self) -> &[Dim] {
        &self.shape
    }

    /// Return the rank of this tensor.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Return the size of dimension `dim`.
    ///
    /// Panics if `dim` is out of bounds, like indexing a slice.
    pub fn dim(&self, dim: usize) -> Dim {
        self.shape[dim]
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn lod(&self) -> Option<&LodInfo> {
        self.lod.as_ref()
    }
}

/// Construct a [`Shape`] from a list of extents.
///
/// Entries may be `usize` extents or `Dim` values, eg.
/// `dims!(2, Dim::Unknown, 3)`.
#[cfg(test)]
macro_rules! dims {
    ($($dim:expr),* $(,)?) => {{
        let shape: $crate::value::Shape =
            [$($crate::value::Dim::from($dim)),*].into_iter().collect();
        shape
    }};
}

#[cfg(test)]
pub(crate) use dims;

#[cfg(test)]
mod tests {
    use super::{contains_unknown_dim, dims, known_numel, DataType, Dim, LodInfo, TensorMeta};

    #[test]
    fn test_known_numel() {
        assert_eq!(known_numel(&dims!(2, 3, 4)), Some(24));
        assert_eq!(known_numel(&dims!()), Some(1));
        assert_eq!(known_numel(&dims!(2, 0, 4)), Some(0));
        assert_eq!(known_numel(&dims!(2, Dim::Unknown)), None);
    }

    #[test]
    fn test_contains_unknown_dim() {
        assert!(!contains_unknown_dim(&dims!(2, 3)));
        assert!(contains_unknown_dim(&dims!(2, Dim::Unknown)));
    }

    #[test]
    fn test_dim_display() {
        assert_eq!(Dim::Fixed(5).to_string(), "5");
        assert_eq!(Dim::Unknown.to_string(), "?");
    }

    #[test]
    fn test_lod_sharing() {
        let lod = LodInfo::new(vec![vec![0, 2, 5]]);
        let x = TensorMeta::new(dims!(5, 3), DataType::Float).with_lod(lod.clone());
        let y = TensorMeta::new(dims!(5, 3), DataType::Float);

        let out = TensorMeta::new(dims!(5, 3), DataType::Float).with_lod_from(&x);
        assert_eq!(out.lod(), Some(&lod));

        let out = TensorMeta::new(dims!(5, 3), DataType::Float).with_lod_from(&y);
        assert_eq!(out.lod(), None);
    }
}
