use thiserror::Error;

// --- Shape ---

#[derive(Error, Debug)]
#[error("Data length ({data_length}) does not match size of tensor ({tensor_size}).")]
pub(crate) struct InvalidDataLengthError {
    pub data_length: usize,
    pub tensor_size: usize,
}

#[derive(Error, Debug)]
#[error("Tensor of shape {current_shape:?} cannot be viewed/reshaped to {new_shape:?}.")]
pub(crate) struct ReshapeError {
    pub current_shape: Vec<usize>,
    pub new_shape: Vec<usize>,
}

#[derive(Error, Debug)]
pub(crate) enum EmptyTensorError {
    #[error("Empty tensor. No max.")]
    ReduceMax,

    #[error("Empty tensor. No min.")]
    ReduceMin,

    #[error("Empty tensor. No mean.")]
    ReduceMean,
}

#[derive(Error, Debug)]
#[error("Shape is not contiguous. Use `to_contiguous()` or an alternate function.")]
pub(crate) struct NonContiguousError;

#[derive(Error, Debug)]
#[error("Size {size} cannot be expanded to size {expansion}. To be expanded, size should be 1.")]
pub(crate) struct ExpansionError {
    pub size: usize,
    pub expansion: usize,
}

#[derive(Error, Debug)]
#[error("Operation requires at least {required} dimensions, tensor has {rank}.")]
pub(crate) struct RankError {
    pub required: usize,
    pub rank: usize,
}

#[derive(Error, Debug)]
#[error("Shapes {lhs_sizes:?} and {rhs_sizes:?} cannot broadcasted together.")]
pub(crate) struct BroadcastError {
    pub lhs_sizes: Vec<usize>,
    pub rhs_sizes: Vec<usize>,
}

// --- Index, Range, Dims ---

#[derive(Error, Debug)]
pub(crate) enum IndexError {
    #[error("Index {index} is out of range for dimension {dimension}, of size {size}.")]
    OutOfRange {
        index: usize,
        dimension: usize,
        size: usize,
    },

    #[error("Number of indices ({num_indices}) does not match the number of dimensions {num_dimensions}.")]
    IndicesLength {
        num_indices: usize,
        num_dimensions: usize,
    },
}

#[derive(Error, Debug)]
pub(crate) enum DimensionError {
    #[error("Dimension {dimension} is out of range for a tensor of rank {rank}.")]
    OutOfRange { dimension: isize, rank: usize },

    #[error("Dimension {0} repeats.")]
    Repetition(usize),
}

#[derive(Error, Debug)]
pub(crate) enum RangeError {
    #[error("{range:?} is out of range for dimension {dimension}, of size {size}.")]
    OutOfRange {
        range: (usize, usize),
        dimension: usize,
        size: usize,
    },

    #[error("Range start index {0} is greater than range end index {1}.")]
    GreaterStartRange(usize, usize),
}

// --- Matmul, Einsum ---

#[derive(Error, Debug)]
pub(crate) enum MatmulShapeError {
    #[error("Cannot matrix mutltiply with 0d tensor.")]
    Matmul0d,

    #[error("Cannot be matrix multiplied. [m x n1] @ [n2 x l], n1 ({n1}) != n2 ({n2}).")]
    Matmul2d { n1: usize, n2: usize },

    #[error("Cannot be matrix multiplied. [.. x m x n1] @ [.. x n2 x l], n1 ({n1}) != n2 ({n2}).")]
    MatmulNd { n1: usize, n2: usize },
}

#[derive(Error, Debug)]
pub(crate) enum EinsumError {
    #[error("Invalid einsum equation {0:?}. Subscripts must be ASCII letters.")]
    Syntax(String),

    #[error("Einsum equation names {expected} operands, {found} were given.")]
    OperandCount { expected: usize, found: usize },

    #[error("Subscripts {subscripts:?} of operand {operand} do not match its rank ({rank}).")]
    SubscriptRank {
        operand: usize,
        subscripts: String,
        rank: usize,
    },

    #[error("Label '{label}' is bound to sizes {first} and {second}.")]
    SizeMismatch {
        label: char,
        first: usize,
        second: usize,
    },

    #[error("Output label '{0}' does not appear in any input.")]
    UnknownOutput(char),

    #[error("Output label '{0}' repeats.")]
    RepeatedOutput(char),
}

// --- Selection, Sampling ---

#[derive(Error, Debug)]
#[error("Cannot select top {k} elements from dimension of size {size}.")]
pub(crate) struct TopkError {
    pub k: usize,
    pub size: usize,
}

#[derive(Error, Debug)]
#[error("Probability {0} is outside [0, 1].")]
pub(crate) struct ProbabilityError(pub f64);

#[derive(Error, Debug)]
#[error("Cannot sample integers from the empty range [0, 0).")]
pub(crate) struct EmptyRangeError;

// --- Attention ---

#[derive(Error, Debug)]
pub(crate) enum AttentionShapeError {
    #[error("Expected a [batch, length, heads, features] tensor, got {0:?}.")]
    Layout(Vec<usize>),

    #[error("Masked ProbSparse attention needs as many queries ({queries}) as values ({values}).")]
    MaskedLength { queries: usize, values: usize },

    #[error("Model dimension {d_model} is not divisible by {heads} heads.")]
    Heads { d_model: usize, heads: usize },
}

// --- Misc ---

#[derive(Error, Debug)]
#[error("Cannot convert {value} from `usize` to type {dtype}.")]
pub(crate) struct UsizeCastError {
    pub value: usize,
    pub dtype: &'static str,
}

#[derive(Error, Debug)]
#[error("Cannot convert {value} from `f64` to type {dtype}.")]
pub(crate) struct FloatCastError {
    pub value: f64,
    pub dtype: &'static str,
}

#[derive(Error, Debug)]
pub(crate) enum ArangeError {
    #[error("Step size cannot be zero.")]
    Zero,

    #[error("Step size is positive, but start > end.")]
    Positive,

    #[error("Step size is negative, but end > start.")]
    Negative,

    #[error("Step size cannot compared with zero.")]
    Comparison,
}
