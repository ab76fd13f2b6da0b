use thiserror::Error;

/// Errors raised while canonicalizing raw ABI items
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// The item is not of kind `function`
    #[error("not a function: `{0}`")]
    NotAFunction(String),
    /// A function entry without a name
    #[error("function entry without a name")]
    MissingName,
    /// A parameter type that can not be rendered
    #[error("invalid parameter type `{0}`")]
    InvalidType(String),
    /// A tuple parameter without its components
    #[error("tuple parameter `{0}` has no components")]
    EmptyTuple(String),
}
