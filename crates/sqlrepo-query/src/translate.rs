//! The predicate translator.
//!
//! Walks a [`Predicate`] tree depth-first, left to right, and emits one
//! [`QueryFragment`] per leaf. The boolean combinator of an `And`/`Or`
//! node becomes the *linking* operator of the next leaf, so the first
//! fragment in a sequence never carries a link. [`bind_predicate`] then
//! renders the fragments into a builder's WHERE slot with positional
//! parameters.

use sqlrepo_core::{Entity, Error, Result, TableDefinition, Value};
use tracing::trace;

use crate::builder::SqlBuilder;
use crate::predicate::{CallKind, CompareOp, Operand, Predicate};

/// Boolean operator linking a fragment to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOp {
    /// Both conditions must hold
    And,
    /// Either condition must hold
    Or,
}

impl LinkOp {
    /// SQL spelling.
    pub const fn as_sql(self) -> &'static str {
        match self {
            LinkOp::And => "AND",
            LinkOp::Or => "OR",
        }
    }
}

/// One translated leaf condition.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFragment {
    /// Linking operator; `None` on the first fragment of a sequence
    pub link: Option<LinkOp>,
    /// Logical property name of the target column
    pub column: String,
    /// Comparison operator text (`=`, `LIKE`, `IS NULL`, `= TRUE`, ...)
    pub operator: String,
    /// Value to bind; `None` when the operator needs no operand
    pub value: Option<Value>,
    /// When set, the right-hand side is this column reference, emitted as
    /// an identifier instead of a bound parameter
    pub column_ref: Option<String>,
    /// When set, the column renders as a bit-test `(column & @pN)`
    pub flag_format: bool,
}

/// Translate a predicate tree into ordered fragments.
pub fn translate(predicate: &Predicate) -> Result<Vec<QueryFragment>> {
    let mut out = Vec::new();
    walk(predicate, None, false, &mut out)?;
    trace!(fragments = out.len(), "predicate translated");
    Ok(out)
}

fn walk(
    predicate: &Predicate,
    link: Option<LinkOp>,
    negated: bool,
    out: &mut Vec<QueryFragment>,
) -> Result<()> {
    match predicate {
        Predicate::And(left, right) => {
            if negated {
                return Err(unsupported("NOT over AND"));
            }
            walk(left, link, false, out)?;
            walk(right, Some(LinkOp::And), false, out)
        }
        Predicate::Or(left, right) => {
            if negated {
                return Err(unsupported("NOT over OR"));
            }
            walk(left, link, false, out)?;
            walk(right, Some(LinkOp::Or), false, out)
        }
        Predicate::Not(inner) => walk(inner, link, !negated, out),
        Predicate::Compare { column, op, rhs } => {
            if negated {
                return Err(unsupported("NOT over comparison"));
            }
            out.push(compare_fragment(link, column, *op, rhs));
            Ok(())
        }
        Predicate::Call {
            kind,
            column,
            value,
        } => {
            out.push(call_fragment(link, *kind, column, value, negated)?);
            Ok(())
        }
        Predicate::Member { column } => {
            out.push(QueryFragment {
                link,
                column: column.clone(),
                operator: if negated { "= FALSE" } else { "= TRUE" }.to_string(),
                value: None,
                column_ref: None,
                flag_format: false,
            });
            Ok(())
        }
    }
}

fn compare_fragment(
    link: Option<LinkOp>,
    column: &str,
    op: CompareOp,
    rhs: &Operand,
) -> QueryFragment {
    let mut fragment = QueryFragment {
        link,
        column: column.to_string(),
        operator: op.as_sql().to_string(),
        value: None,
        column_ref: None,
        flag_format: false,
    };
    match rhs {
        // A null right-hand side degrades equality to IS [NOT] NULL and
        // suppresses value binding.
        Operand::Value(Value::Null) if op == CompareOp::Eq => {
            fragment.operator = "IS NULL".to_string();
        }
        Operand::Value(Value::Null) if op == CompareOp::Ne => {
            fragment.operator = "IS NOT NULL".to_string();
        }
        Operand::Value(value) => fragment.value = Some(value.clone()),
        Operand::Column(other) => fragment.column_ref = Some(other.clone()),
    }
    fragment
}

fn call_fragment(
    link: Option<LinkOp>,
    kind: CallKind,
    column: &str,
    value: &Value,
    negated: bool,
) -> Result<QueryFragment> {
    let fragment = match kind {
        CallKind::Contains | CallKind::StartsWith | CallKind::EndsWith => {
            let text = value
                .pattern_text()
                .ok_or_else(|| unsupported(kind.name()))?;
            let pattern = match kind {
                CallKind::Contains => format!("%{text}%"),
                CallKind::StartsWith => format!("{text}%"),
                CallKind::EndsWith => format!("%{text}"),
                CallKind::HasFlag => unreachable!(),
            };
            QueryFragment {
                link,
                column: column.to_string(),
                operator: if negated { "NOT LIKE" } else { "LIKE" }.to_string(),
                value: Some(Value::Text(pattern)),
                column_ref: None,
                flag_format: false,
            }
        }
        CallKind::HasFlag => QueryFragment {
            link,
            column: column.to_string(),
            operator: if negated { "<>" } else { "=" }.to_string(),
            value: Some(value.clone()),
            column_ref: None,
            flag_format: true,
        },
    };
    Ok(fragment)
}

fn unsupported(call: &str) -> Error {
    Error::UnsupportedOperation { call: call.into() }
}

/// Translate a predicate and bind it into the builder's WHERE slot.
///
/// Columns resolve through the table definition (unknown properties fail
/// with [`Error::UnknownProperty`]); values bind under positional `p{N}`
/// names; column-reference operands render as quoted identifiers.
pub fn bind_predicate<E: Entity>(
    mut builder: SqlBuilder,
    table: &TableDefinition<E>,
    predicate: &Predicate,
) -> Result<SqlBuilder> {
    let fragments = translate(predicate)?;
    let mut parts: Vec<String> = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let member = table.member(&fragment.column).ok_or_else(|| {
            Error::UnknownProperty {
                property: fragment.column.clone(),
                table: table.table_name(),
            }
        })?;

        let mut piece = String::new();
        if let Some(op) = fragment.link {
            piece.push_str(op.as_sql());
            piece.push(' ');
        }

        if fragment.flag_format {
            let index = builder.parameters().len();
            piece.push_str(&format!("({} & @p{index})", member.quoted_db_name()));
        } else {
            piece.push_str(member.quoted_db_name());
        }
        piece.push(' ');
        piece.push_str(&fragment.operator);

        if let Some(other) = fragment.column_ref {
            let other_member =
                table
                    .member(&other)
                    .ok_or_else(|| Error::UnknownProperty {
                        property: other.clone(),
                        table: table.table_name(),
                    })?;
            piece.push(' ');
            piece.push_str(other_member.quoted_db_name());
        } else if let Some(value) = fragment.value {
            let name = builder.add_positional(value)?;
            piece.push_str(&format!(" @{name}"));
        }

        parts.push(piece);
    }

    builder.where_(parts.join(" "))
}
