//! Abstract syntax tree for slot expressions
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use std::fmt;

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    Literal(Literal),
    /// List or tuple display
    List(Vec<Expr>),
    /// Dict display
    Dict(Vec<(Expr, Expr)>),
    /// Bare name, resolves to null when unbound
    Name(String),
    /// Braced name `{x}`, null-propagating
    Braced(String),
    /// Attribute access `a.b`
    Attribute { object: Box<Expr>, attr: String },
    /// Subscript `a[i]`
    Subscript { object: Box<Expr>, index: Box<Expr> },
    /// Unary operator
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary arithmetic operator
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison chain `a < b <= c`
    Compare {
        left: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    /// Short-circuiting `and`/`or`
    BoolOp { op: BoolOp, values: Vec<Expr> },
    /// `body if test else orelse`
    Conditional {
        body: Box<Expr>,
        test: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// Call of a named function
    Call { func: String, args: Vec<Expr> },
    /// Method call `a.m(args)`, only available to the permissive evaluator
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// A statement of a multi-line block
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name = expr`
    Assign { target: String, value: Expr },
    /// A bare expression, evaluated for its value
    Expr(Expr),
}

impl Expr {
    /// Whether this expression is a single bare identifier
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Name(name) | Expr::Braced(name) => Some(name),
            _ => None,
        }
    }

    /// Names referenced by this expression, in first-use order
    pub fn referenced_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Expr::Name(name) | Expr::Braced(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Expr::Literal(_) => {}
            Expr::List(items) => items.iter().for_each(|e| e.collect_names(names)),
            Expr::Dict(entries) => {
                for (k, v) in entries {
                    k.collect_names(names);
                    v.collect_names(names);
                }
            }
            Expr::Attribute { object, .. } => object.collect_names(names),
            Expr::Subscript { object, index } => {
                object.collect_names(names);
                index.collect_names(names);
            }
            Expr::Unary { operand, .. } => operand.collect_names(names),
            Expr::Binary { left, right, .. } => {
                left.collect_names(names);
                right.collect_names(names);
            }
            Expr::Compare { left, rest } => {
                left.collect_names(names);
                rest.iter().for_each(|(_, e)| e.collect_names(names));
            }
            Expr::BoolOp { values, .. } => values.iter().for_each(|e| e.collect_names(names)),
            Expr::Conditional { body, test, orelse } => {
                body.collect_names(names);
                test.collect_names(names);
                orelse.collect_names(names);
            }
            Expr::Call { args, .. } => args.iter().for_each(|e| e.collect_names(names)),
            Expr::MethodCall { object, args, .. } => {
                object.collect_names(names);
                args.iter().for_each(|e| e.collect_names(names));
            }
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        };
        write!(f, "{}", symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_names_deduplicated() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::Braced("x".into())),
            right: Box::new(Expr::Call {
                func: "str".into(),
                args: vec![Expr::Name("x".into()), Expr::Name("y".into())],
            }),
        };
        assert_eq!(expr.referenced_names(), vec!["x", "y"]);
        assert_eq!(Expr::Name("age".into()).as_identifier(), Some("age"));
    }
}
