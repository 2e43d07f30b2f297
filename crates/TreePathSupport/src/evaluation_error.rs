/// Hard failures raised while evaluating a path expression.
///
/// Operand combinations that merely have no defined result (mismatched arithmetic
/// kinds, division by zero, an out-of-range index) are not errors: they evaluate
/// to the empty collection. The variants below abort evaluation and are surfaced to
/// the caller.
///
/// # Examples
///
/// ```rust
/// use treepath_support::EvaluationError;
///
/// let error = EvaluationError::InvalidTypeSpecifier(
///     "Argument 'Unknown' cannot be resolved to a valid type identifier".to_string(),
/// );
/// assert!(error.to_string().starts_with("Invalid Type Specifier:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// An operand or argument had a type the operation cannot accept.
    ///
    /// Example: "Expected String input for function 'upper', found Integer"
    TypeError(String),
    /// Invalid argument provided to a function.
    ///
    /// Example: "'iif' function criterion must evaluate to a boolean or empty"
    InvalidArgument(String),
    /// An operation was invoked outside its precondition.
    ///
    /// Raised when two nodes that are not comparable are asked for an ordering.
    ///
    /// Example: "Cannot compare String with Integer"
    InvalidOperation(String),
    /// Incorrect number of arguments provided to a function.
    ///
    /// Example: "Unexpected number of arguments: 3 for function: 'iif'"
    InvalidArity(String),
    /// The index expression of an indexer did not produce an integer.
    ///
    /// Example: "Index must be an integer, found String"
    InvalidIndex(String),
    /// Invalid regular expression pattern.
    ///
    /// Example: "Invalid regex pattern: unclosed parenthesis"
    InvalidRegex(String),
    /// A type identifier could not be resolved.
    ///
    /// Example: "Argument 'Foo' cannot be resolved to a valid type identifier"
    InvalidTypeSpecifier(String),
    /// An operation requiring a single element received more than one.
    ///
    /// Example: "Input collection has 3 items, but only 1 is allowed"
    SingletonEvaluationError(String),
    /// The function name is neither built in nor registered.
    ///
    /// Example: "Function: 'frobnicate' not found"
    UnsupportedFunction(String),
}

// === Standard Error Trait Implementations ===

impl std::error::Error for EvaluationError {}

impl std::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationError::TypeError(msg) => write!(f, "Type Error: {}", msg),
            EvaluationError::InvalidArgument(msg) => write!(f, "Invalid Argument: {}", msg),
            EvaluationError::InvalidOperation(msg) => write!(f, "Invalid Operation: {}", msg),
            EvaluationError::InvalidArity(msg) => write!(f, "Invalid Arity: {}", msg),
            EvaluationError::InvalidIndex(msg) => write!(f, "Invalid Index: {}", msg),
            EvaluationError::InvalidRegex(msg) => write!(f, "Invalid Regex: {}", msg),
            EvaluationError::InvalidTypeSpecifier(msg) => {
                write!(f, "Invalid Type Specifier: {}", msg)
            }
            EvaluationError::SingletonEvaluationError(msg) => {
                write!(f, "Singleton Evaluation Error: {}", msg)
            }
            EvaluationError::UnsupportedFunction(msg) => write!(f, "Unsupported Function: {}", msg),
        }
    }
}
