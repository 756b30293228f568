//! The predicate AST.
//!
//! Callers express filters as a small tagged union of comparison,
//! containment and string-match nodes over entity properties. Values are
//! resolved eagerly when the AST is built; nothing here is evaluated per
//! row. A thin front end (or plain constructor calls via [`col`]) builds
//! the tree; the translator walks it.

use sqlrepo_core::Value;

/// Right-hand side of a comparison: a bound value or a reference to
/// another column (used for join conditions, emitted as an identifier
/// rather than a parameter).
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal value, bound as a parameter
    Value(Value),
    /// A column reference on the compared entity
    Column(String),
}

/// Comparison operators supported in predicate leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`=`)
    Eq,
    /// Not equal (`<>`)
    Ne,
    /// Less than (`<`)
    Lt,
    /// Less than or equal (`<=`)
    Le,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    Ge,
}

impl CompareOp {
    /// SQL spelling of this operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// The fixed, enumerable set of method-style calls the translator knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Substring containment, `LIKE '%value%'`
    Contains,
    /// Prefix match, `LIKE 'value%'`
    StartsWith,
    /// Suffix match, `LIKE '%value'`
    EndsWith,
    /// Bit-flag test, `(column & @p) = @p`
    HasFlag,
}

impl CallKind {
    /// Name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            CallKind::Contains => "Contains",
            CallKind::StartsWith => "StartsWith",
            CallKind::EndsWith => "EndsWith",
            CallKind::HasFlag => "HasFlag",
        }
    }
}

/// A boolean predicate over entity properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Both branches must hold
    And(Box<Predicate>, Box<Predicate>),
    /// Either branch must hold
    Or(Box<Predicate>, Box<Predicate>),
    /// Negation; applies to call and member leaves only
    Not(Box<Predicate>),
    /// Binary comparison leaf
    Compare {
        /// Logical property name
        column: String,
        /// Comparison operator
        op: CompareOp,
        /// Right-hand operand
        rhs: Operand,
    },
    /// Method-style call leaf
    Call {
        /// Which call
        kind: CallKind,
        /// Logical property name
        column: String,
        /// Eagerly-resolved argument
        value: Value,
    },
    /// A boolean-typed column used directly as a leaf
    Member {
        /// Logical property name
        column: String,
    },
}

impl Predicate {
    /// Combine with AND.
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Combine with OR.
    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Negate this predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

/// Start building a predicate leaf for a column.
pub fn col(name: impl Into<String>) -> ColumnRef {
    ColumnRef { name: name.into() }
}

/// A column reference awaiting its comparison; produced by [`col`].
#[derive(Debug, Clone)]
pub struct ColumnRef {
    name: String,
}

impl ColumnRef {
    fn compare(self, op: CompareOp, rhs: Operand) -> Predicate {
        Predicate::Compare {
            column: self.name,
            op,
            rhs,
        }
    }

    /// `column = value` (or `IS NULL` when the value is null).
    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, Operand::Value(value.into()))
    }

    /// `column <> value` (or `IS NOT NULL` when the value is null).
    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne, Operand::Value(value.into()))
    }

    /// `column < value`.
    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, Operand::Value(value.into()))
    }

    /// `column <= value`.
    pub fn le(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, Operand::Value(value.into()))
    }

    /// `column > value`.
    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, Operand::Value(value.into()))
    }

    /// `column >= value`.
    pub fn ge(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, Operand::Value(value.into()))
    }

    /// `column = other_column`, emitted as a column reference.
    pub fn eq_column(self, other: impl Into<String>) -> Predicate {
        self.compare(CompareOp::Eq, Operand::Column(other.into()))
    }

    /// Substring containment.
    pub fn contains(self, value: impl Into<Value>) -> Predicate {
        Predicate::Call {
            kind: CallKind::Contains,
            column: self.name,
            value: value.into(),
        }
    }

    /// Prefix match.
    pub fn starts_with(self, value: impl Into<Value>) -> Predicate {
        Predicate::Call {
            kind: CallKind::StartsWith,
            column: self.name,
            value: value.into(),
        }
    }

    /// Suffix match.
    pub fn ends_with(self, value: impl Into<Value>) -> Predicate {
        Predicate::Call {
            kind: CallKind::EndsWith,
            column: self.name,
            value: value.into(),
        }
    }

    /// Bit-flag containment test.
    pub fn has_flag(self, flag: impl Into<Value>) -> Predicate {
        Predicate::Call {
            kind: CallKind::HasFlag,
            column: self.name,
            value: flag.into(),
        }
    }

    /// Use a boolean column directly as a leaf (`column = TRUE`).
    pub fn is_true(self) -> Predicate {
        Predicate::Member { column: self.name }
    }
}
