//! Registry mapping operator names to inference rules.
//!
//! A graph loader looks operators up by name and supplies their attributes
//! as an [`Attrs`] bag; the registry constructs the typed rule and runs it.
//! Callers that only need a subset of operators can register just those.

use rustc_hash::FxHashMap;

use crate::ops;
use crate::ops::{InferError, InferMeta, InputList, OutputList};
use crate::value::InferMode;

/// An attribute value attached to an operator in a graph.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
}

impl From<i32> for AttrValue {
    fn from(val: i32) -> AttrValue {
        AttrValue::Int(val)
    }
}

impl From<f32> for AttrValue {
    fn from(val: f32) -> AttrValue {
        AttrValue::Float(val)
    }
}

impl From<bool> for AttrValue {
    fn from(val: bool) -> AttrValue {
        AttrValue::Bool(val)
    }
}

impl From<&str> for AttrValue {
    fn from(val: &str) -> AttrValue {
        AttrValue::String(val.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(val: String) -> AttrValue {
        AttrValue::String(val)
    }
}

/// Named operator attributes.
#[derive(Clone, Debug, Default)]
pub struct Attrs {
    values: FxHashMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Attrs {
        Attrs::default()
    }

    /// Add an attribute, consuming and returning the bag for chaining.
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Attrs {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Return an int attribute, or `None` if absent.
    pub fn opt_int(&self, name: &'static str) -> Result<Option<i32>, InferError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(AttrValue::Int(val)) => Ok(Some(*val)),
            Some(other) => Err(wrong_type(name, "an int", other)),
        }
    }

    /// Return an int attribute, or `default` if absent.
    pub fn int_or(&self, name: &'static str, default: i32) -> Result<i32, InferError> {
        Ok(self.opt_int(name)?.unwrap_or(default))
    }

    pub fn float_or(&self, name: &'static str, default: f32) -> Result<f32, InferError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(AttrValue::Float(val)) => Ok(*val),
            Some(other) => Err(wrong_type(name, "a float", other)),
        }
    }

    pub fn bool_or(&self, name: &'static str, default: bool) -> Result<bool, InferError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(AttrValue::Bool(val)) => Ok(*val),
            Some(other) => Err(wrong_type(name, "a bool", other)),
        }
    }

    pub fn str_or(&self, name: &'static str, default: &str) -> Result<String, InferError> {
        match self.values.get(name) {
            None => Ok(default.to_string()),
            Some(AttrValue::String(val)) => Ok(val.clone()),
            Some(other) => Err(wrong_type(name, "a string", other)),
        }
    }
}

fn wrong_type(name: &'static str, expected: &str, actual: &AttrValue) -> InferError {
    InferError::InvalidAttribute {
        name,
        reason: format!("expected {}, got {:?}", expected, actual),
    }
}

/// Construct an operator's inference rule from graph attributes.
pub trait FromAttrs: Sized {
    /// Name under which this operator is registered.
    const NAME: &'static str;

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError>;
}

macro_rules! impl_from_attrs_default {
    ($($op:ident => $name:literal),* $(,)?) => {
        $(
            impl FromAttrs for ops::$op {
                const NAME: &'static str = $name;

                fn from_attrs(_attrs: &Attrs) -> Result<Self, InferError> {
                    Ok(Self::default())
                }
            }
        )*
    };
}

impl_from_attrs_default!(
    Atan2 => "atan2",
    Equal => "equal",
    NotEqual => "not_equal",
    Greater => "greater_than",
    GreaterOrEqual => "greater_equal",
    Less => "less_than",
    LessOrEqual => "less_equal",
    EqualAll => "equal_all",
    Mv => "mv",
    Dot => "dot",
    GatherNd => "gather_nd",
    GatherTree => "gather_tree",
    IndexSample => "index_sample",
    BceLoss => "bce_loss",
);

macro_rules! impl_from_attrs_arithmetic {
    ($($op:ident => $name:literal),* $(,)?) => {
        $(
            impl FromAttrs for ops::$op {
                const NAME: &'static str = $name;

                fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
                    Ok(Self {
                        axis: attrs.int_or("axis", -1)?,
                    })
                }
            }
        )*
    };
}

impl_from_attrs_arithmetic!(
    Add => "add",
    Sub => "subtract",
    Mul => "multiply",
    Div => "divide",
);

impl FromAttrs for ops::AllClose {
    const NAME: &'static str = "allclose";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::AllClose {
            rtol: attrs.float_or("rtol", 1e-5)?,
            atol: attrs.float_or("atol", 1e-8)?,
        })
    }
}

impl FromAttrs for ops::MatMul {
    const NAME: &'static str = "matmul";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::MatMul {
            trans_x: attrs.bool_or("trans_x", false)?,
            trans_y: attrs.bool_or("trans_y", false)?,
        })
    }
}

impl FromAttrs for ops::TriangularSolve {
    const NAME: &'static str = "triangular_solve";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::TriangularSolve {
            upper: attrs.bool_or("upper", true)?,
            transpose: attrs.bool_or("transpose", false)?,
            unitriangular: attrs.bool_or("unitriangular", false)?,
        })
    }
}

impl FromAttrs for ops::CholeskySolve {
    const NAME: &'static str = "cholesky_solve";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::CholeskySolve {
            upper: attrs.bool_or("upper", false)?,
        })
    }
}

impl FromAttrs for ops::Cross {
    const NAME: &'static str = "cross";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::Cross {
            axis: attrs.opt_int("axis")?,
        })
    }
}

impl FromAttrs for ops::Dist {
    const NAME: &'static str = "dist";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::Dist {
            p: attrs.float_or("p", 2.0)?,
        })
    }
}

impl FromAttrs for ops::HuberLoss {
    const NAME: &'static str = "huber_loss";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::HuberLoss {
            delta: attrs.float_or("delta", 1.0)?,
        })
    }
}

impl FromAttrs for ops::LogLoss {
    const NAME: &'static str = "log_loss";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::LogLoss {
            epsilon: attrs.float_or("epsilon", 1e-4)?,
        })
    }
}

impl FromAttrs for ops::SigmoidCrossEntropy {
    const NAME: &'static str = "sigmoid_cross_entropy_with_logits";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::SigmoidCrossEntropy {
            normalize: attrs.bool_or("normalize", false)?,
            ignore_index: attrs.int_or("ignore_index", -100)?,
        })
    }
}

impl FromAttrs for ops::SegmentPool {
    const NAME: &'static str = "segment_pool";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::SegmentPool {
            pooltype: attrs.str_or("pooltype", "SUM")?,
        })
    }
}

impl FromAttrs for ops::Bincount {
    const NAME: &'static str = "bincount";

    fn from_attrs(attrs: &Attrs) -> Result<Self, InferError> {
        Ok(ops::Bincount {
            minlength: attrs.int_or("minlength", 0)?,
        })
    }
}

type OpFactory = fn(&Attrs) -> Result<Box<dyn InferMeta + Send + Sync>, InferError>;

/// Registry of inference rules keyed by operator name.
pub struct InferRegistry {
    ops: FxHashMap<&'static str, OpFactory>,
}

impl InferRegistry {
    /// Create an empty registry.
    pub fn new() -> InferRegistry {
        InferRegistry {
            ops: FxHashMap::default(),
        }
    }

    /// Create a registry with all operators in this crate registered.
    pub fn with_all_ops() -> InferRegistry {
        let mut reg = InferRegistry::new();
        reg.register_op::<ops::Add>();
        reg.register_op::<ops::Sub>();
        reg.register_op::<ops::Mul>();
        reg.register_op::<ops::Div>();
        reg.register_op::<ops::Atan2>();
        reg.register_op::<ops::Equal>();
        reg.register_op::<ops::NotEqual>();
        reg.register_op::<ops::Greater>();
        reg.register_op::<ops::GreaterOrEqual>();
        reg.register_op::<ops::Less>();
        reg.register_op::<ops::LessOrEqual>();
        reg.register_op::<ops::EqualAll>();
        reg.register_op::<ops::AllClose>();
        reg.register_op::<ops::MatMul>();
        reg.register_op::<ops::Mv>();
        reg.register_op::<ops::Dot>();
        reg.register_op::<ops::TriangularSolve>();
        reg.register_op::<ops::CholeskySolve>();
        reg.register_op::<ops::Cross>();
        reg.register_op::<ops::Dist>();
        reg.register_op::<ops::GatherNd>();
        reg.register_op::<ops::GatherTree>();
        reg.register_op::<ops::IndexSample>();
        reg.register_op::<ops::HuberLoss>();
        reg.register_op::<ops::LogLoss>();
        reg.register_op::<ops::BceLoss>();
        reg.register_op::<ops::SigmoidCrossEntropy>();
        reg.register_op::<ops::SegmentPool>();
        reg.register_op::<ops::Bincount>();
        reg
    }

    /// Register the inference rule for operator type `Op`.
    pub fn register_op<Op: FromAttrs + InferMeta + Send + Sync + 'static>(&mut self) {
        self.ops.insert(Op::NAME, |attrs| {
            Op::from_attrs(attrs).map(|op| Box::new(op) as Box<dyn InferMeta + Send + Sync>)
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Construct the inference rule registered under `name`.
    pub fn create_op(
        &self,
        name: &str,
        attrs: &Attrs,
    ) -> Result<Box<dyn InferMeta + Send + Sync>, InferError> {
        let factory = self
            .ops
            .get(name)
            .ok_or_else(|| InferError::UnknownOperator(name.to_string()))?;
        factory(attrs)
    }

    /// Look up `name` and run its inference rule in one step.
    pub fn infer(
        &self,
        name: &str,
        attrs: &Attrs,
        inputs: &InputList,
        mode: InferMode,
    ) -> Result<OutputList, InferError> {
        self.create_op(name, attrs)?.infer(inputs, mode)
    }
}

impl Default for InferRegistry {
    fn default() -> InferRegistry {
        InferRegistry::with_all_ops()
    }
}

#[cfg(test)]
mod tests {
    use super::{Attrs, InferRegistry};
    use crate::ops::{InferError, InputList};
    use crate::value::{dims, DataType, InferMode, TensorMeta};

    #[test]
    fn test_registry_lookup() {
        let reg = InferRegistry::with_all_ops();
        assert!(reg.contains("matmul"));
        assert!(reg.contains("bincount"));
        assert!(!reg.contains("transpose"));

        let result = reg.create_op("transpose", &Attrs::new());
        assert!(matches!(result, Err(InferError::UnknownOperator(name)) if name == "transpose"));
    }

    #[test]
    fn test_registry_infer() {
        let reg = InferRegistry::with_all_ops();
        let x = TensorMeta::new(dims!(2, 3, 4, 5), DataType::Float);
        let y = TensorMeta::new(dims!(3, 4), DataType::Float);

        let attrs = Attrs::new().with("axis", 1);
        let outputs = reg
            .infer(
                "add",
                &attrs,
                &InputList::from([&x, &y].as_slice()),
                InferMode::Construction,
            )
            .unwrap();
        assert_eq!(outputs[0].shape(), dims!(2, 3, 4, 5).as_slice());
    }

    #[test]
    fn test_registry_infer_matmul_attrs() {
        let reg = InferRegistry::with_all_ops();
        let x = TensorMeta::new(dims!(3, 4), DataType::Float);
        let y = TensorMeta::new(dims!(5, 4), DataType::Float);

        let attrs = Attrs::new().with("trans_y", true);
        let outputs = reg
            .infer(
                "matmul",
                &attrs,
                &InputList::from([&x, &y].as_slice()),
                InferMode::Runtime,
            )
            .unwrap();
        assert_eq!(outputs[0].shape(), dims!(3, 5).as_slice());
    }

    #[test]
    fn test_attr_type_mismatch() {
        let reg = InferRegistry::with_all_ops();
        let x = TensorMeta::new(dims!(2, 3), DataType::Float);
        let y = TensorMeta::new(dims!(2, 3), DataType::Float);

        let attrs = Attrs::new().with("axis", true);
        let result = reg.infer(
            "add",
            &attrs,
            &InputList::from([&x, &y].as_slice()),
            InferMode::Runtime,
        );
        assert!(matches!(
            result,
            Err(InferError::InvalidAttribute { name: "axis", .. })
        ));
    }

    #[test]
    fn test_attr_getters() {
        let attrs = Attrs::new()
            .with("delta", 0.5f32)
            .with("pooltype", "MEAN");
        assert_eq!(attrs.float_or("delta", 1.0), Ok(0.5));
        assert_eq!(attrs.float_or("epsilon", 1e-4), Ok(1e-4));
        assert_eq!(attrs.str_or("pooltype", "SUM"), Ok("MEAN".to_string()));
        assert_eq!(attrs.opt_int("axis"), Ok(None));
    }
}
