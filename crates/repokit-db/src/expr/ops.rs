//! Predicate nodes produced by the [`Expression`] combinators.

use rusqlite::types::Value;

use crate::traits::Expression;

/// Comparison operators usable in a [`Comparison`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compare {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Compare {
    pub fn as_sql(self) -> &'static str {
        match self {
            Compare::Eq => "=",
            Compare::Ne => "!=",
            Compare::Gt => ">",
            Compare::Lt => "<",
            Compare::Gte => ">=",
            Compare::Lte => "<=",
        }
    }
}

/// `<expr> <op> ?`
pub struct Comparison<L> {
    operand: L,
    op: Compare,
    value: Value,
}

impl<L> Comparison<L> {
    pub fn new(operand: L, op: Compare, value: Value) -> Self {
        Self { operand, op, value }
    }
}

impl<L: Expression> Expression for Comparison<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let operand = self.operand.to_sql(params);
        params.push(self.value.clone());
        format!("{operand} {} ?", self.op.as_sql())
    }
}

/// Substring match: `<expr> LIKE '%pattern%'`, optionally case-folded.
pub struct Pattern<L> {
    operand: L,
    needle: String,
    fold_case: bool,
}

impl<L> Pattern<L> {
    pub fn contains(operand: L, needle: String) -> Self {
        Self {
            operand,
            needle,
            fold_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.fold_case = true;
        self
    }
}

impl<L: Expression> Expression for Pattern<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let operand = self.operand.to_sql(params);
        params.push(Value::Text(format!("%{}%", self.needle)));
        if self.fold_case {
            format!("LOWER({operand}) LIKE LOWER(?)")
        } else {
            format!("{operand} LIKE ?")
        }
    }
}

/// `<expr> [NOT] IN (?, ...)`.
///
/// An empty list renders as a constant, since `x IN ()` matches nothing and
/// `x NOT IN ()` matches everything.
pub struct Membership<L> {
    operand: L,
    values: Vec<Value>,
    negated: bool,
}

impl<L> Membership<L> {
    pub fn new(operand: L, values: Vec<Value>, negated: bool) -> Self {
        Self {
            operand,
            values,
            negated,
        }
    }
}

impl<L: Expression> Expression for Membership<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        if self.values.is_empty() {
            return if self.negated { "1" } else { "0" }.to_string();
        }

        let operand = self.operand.to_sql(params);
        params.extend(self.values.iter().cloned());
        let placeholders = vec!["?"; self.values.len()].join(", ");
        let keyword = if self.negated { "NOT IN" } else { "IN" };
        format!("{operand} {keyword} ({placeholders})")
    }
}

/// `<expr> IS [NOT] NULL`
pub struct NullCheck<L> {
    operand: L,
    want_null: bool,
}

impl<L> NullCheck<L> {
    pub fn new(operand: L, want_null: bool) -> Self {
        Self { operand, want_null }
    }
}

impl<L: Expression> Expression for NullCheck<L> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let operand = self.operand.to_sql(params);
        if self.want_null {
            format!("{operand} IS NULL")
        } else {
            format!("{operand} IS NOT NULL")
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// Two predicates joined by `AND`/`OR`, always parenthesized.
pub struct Junction<L, R> {
    connective: Connective,
    left: L,
    right: R,
}

impl<L, R> Junction<L, R> {
    pub fn new(connective: Connective, left: L, right: R) -> Self {
        Self {
            connective,
            left,
            right,
        }
    }
}

impl<L: Expression, R: Expression> Expression for Junction<L, R> {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let left = self.left.to_sql(params);
        let right = self.right.to_sql(params);
        let word = match self.connective {
            Connective::And => "AND",
            Connective::Or => "OR",
        };
        format!("({left} {word} {right})")
    }
}

/// A type-erased predicate.
///
/// Lets predicates whose shape depends on runtime conditions be folded into a
/// single value, e.g. an `OR` chain with optional branches.
pub struct BoxedExpr {
    render: Box<dyn Fn(&mut Vec<Value>) -> String + Send + Sync>,
}

impl BoxedExpr {
    pub fn new<E: Expression + Send + Sync + 'static>(expr: E) -> Self {
        Self {
            render: Box::new(move |params| expr.to_sql(params)),
        }
    }
}

impl Expression for BoxedExpr {
    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        (self.render)(params)
    }
}
