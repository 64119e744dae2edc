#![forbid(unsafe_code)]

/// The closed lattice of semantic types inference results are drawn from.
///
/// `Error` signals a detected type mismatch and propagates as a value;
/// `Unknown` signals that no rule matched (open-ended host references only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    Boolean,
    Integer,
    Rational,
    Decimal,
    Enumeration,
    IntegerRange,
    Record,
    Array,
    Void,
    Error,
    Unknown,
}

impl ExpressionType {
    /// Lowercase canonical name, used verbatim in findings.
    pub fn display(&self) -> &'static str {
        match self {
            ExpressionType::Boolean => "boolean",
            ExpressionType::Integer => "integer",
            ExpressionType::Rational => "rational",
            ExpressionType::Decimal => "decimal",
            ExpressionType::Enumeration => "enumeration",
            ExpressionType::IntegerRange => "integer range",
            ExpressionType::Record => "record",
            ExpressionType::Array => "array",
            ExpressionType::Void => "void",
            ExpressionType::Error => "error",
            ExpressionType::Unknown => "unknown",
        }
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            ExpressionType::Integer | ExpressionType::Rational | ExpressionType::Decimal
        )
    }
}
