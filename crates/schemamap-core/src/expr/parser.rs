//! Recursive descent parser for slot expressions
//!
//! The grammar is a small Python-like expression language: literals, list,
//! tuple and dict displays, arithmetic, comparisons, `and`/`or`/`not`,
//! conditional expressions, attribute access, subscripts and function calls.
//! Multi-line blocks additionally accept `name = expr` assignments.
//!
//! Copyright (c) 2025 Schemamap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{Error, Result};

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "else", "in", "is", "None", "True", "False", "lambda", "for",
];

/// Expression parser over a token stream
pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    current: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input
    pub fn new(input: &'a str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::expression(input, "empty expression"));
        }
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            input,
            tokens,
            current: 0,
        })
    }

    /// Parse a single expression; trailing input is an error
    pub fn parse_expression(mut self) -> Result<Expr> {
        self.skip_newlines();
        let expr = self.expression()?;
        self.skip_newlines();
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    /// Parse a block of statements separated by newlines
    pub fn parse_block(mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Eof) {
            statements.push(self.statement()?);
            if !self.check(&TokenKind::Eof) {
                self.expect(TokenKind::Newline, "newline")?;
            }
            self.skip_newlines();
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Stmt> {
        if let (Some(TokenKind::Name(name)), Some(TokenKind::Assign)) =
            (self.peek_kind(0), self.peek_kind(1))
        {
            let target = name.clone();
            if KEYWORDS.contains(&target.as_str()) {
                return Err(self.unexpected("assignable name"));
            }
            self.current += 2;
            let value = self.expression()?;
            return Ok(Stmt::Assign { target, value });
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr> {
        let body = self.or_expr()?;
        if self.eat_keyword("if") {
            let test = self.or_expr()?;
            if !self.eat_keyword("else") {
                return Err(self.unexpected("'else'"));
            }
            let orelse = self.expression()?;
            return Ok(Expr::Conditional {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            });
        }
        Ok(body)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let first = self.and_expr()?;
        let mut values = vec![first];
        while self.eat_keyword("or") {
            values.push(self.and_expr()?);
        }
        Ok(fold_bool(BoolOp::Or, values))
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let first = self.not_expr()?;
        let mut values = vec![first];
        while self.eat_keyword("and") {
            values.push(self.not_expr()?);
        }
        Ok(fold_bool(BoolOp::And, values))
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                rest,
            })
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek_kind(0)? {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::LtE => CompareOp::LtE,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::GtE => CompareOp::GtE,
            TokenKind::Name(n) if n == "in" => CompareOp::In,
            TokenKind::Name(n) if n == "is" => {
                if matches!(self.peek_kind(1), Some(TokenKind::Name(m)) if m == "not") {
                    self.current += 2;
                    return Some(CompareOp::IsNot);
                }
                CompareOp::Is
            }
            TokenKind::Name(n) if n == "not" => {
                if matches!(self.peek_kind(1), Some(TokenKind::Name(m)) if m == "in") {
                    self.current += 2;
                    return Some(CompareOp::NotIn);
                }
                return None;
            }
            _ => return None,
        };
        self.current += 1;
        Some(op)
    }

    fn arith(&mut self) -> Result<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind(0) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.current += 1;
            let right = self.term()?;
            left = binary(op, left, right);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek_kind(0) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::DoubleSlash) => BinaryOp::FloorDiv,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.current += 1;
            let right = self.factor()?;
            left = binary(op, left, right);
        }
    }

    fn factor(&mut self) -> Result<Expr> {
        let op = match self.peek_kind(0) {
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Plus) => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            self.current += 1;
            let operand = self.factor()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.check(&TokenKind::DoubleStar) {
            self.current += 1;
            // right associative, binds tighter than unary minus on the left
            let exponent = self.factor()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.atom()?;
        loop {
            match self.peek_kind(0) {
                Some(TokenKind::Dot) => {
                    self.current += 1;
                    let attr = self.identifier()?;
                    if self.check(&TokenKind::LParen) {
                        let args = self.call_arguments()?;
                        expr = Expr::MethodCall {
                            object: Box::new(expr),
                            method: attr,
                            args,
                        };
                    } else {
                        expr = Expr::Attribute {
                            object: Box::new(expr),
                            attr,
                        };
                    }
                }
                Some(TokenKind::LBracket) => {
                    self.current += 1;
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(TokenKind::LParen) => {
                    let func = match &expr {
                        Expr::Name(name) => name.clone(),
                        _ => return Err(self.unexpected("callable name before '('")),
                    };
                    let args = self.call_arguments()?;
                    expr = Expr::Call { func, args };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_arguments(&mut self) -> Result<Vec<Expr>> {
        self.expect(TokenKind::LParen, "'('")?;
        let args = self.sequence(&TokenKind::RParen)?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }

    /// Comma-separated expressions up to (not including) `close`
    fn sequence(&mut self, close: &TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn atom(&mut self) -> Result<Expr> {
        let Some(token) = self.tokens.get(self.current).cloned() else {
            return Err(self.unexpected("expression"));
        };
        match token.kind {
            TokenKind::Int(i) => {
                self.current += 1;
                Ok(Expr::Literal(Literal::Int(i)))
            }
            TokenKind::Float(f) => {
                self.current += 1;
                Ok(Expr::Literal(Literal::Float(f)))
            }
            TokenKind::Str(s) => {
                self.current += 1;
                let mut value = s;
                // implicit concatenation of adjacent literals
                while let Some(TokenKind::Str(next)) = self.peek_kind(0) {
                    value.push_str(next);
                    self.current += 1;
                }
                Ok(Expr::Literal(Literal::Str(value)))
            }
            TokenKind::Name(name) => {
                self.current += 1;
                match name.as_str() {
                    "None" => Ok(Expr::Literal(Literal::Null)),
                    "True" => Ok(Expr::Literal(Literal::Bool(true))),
                    "False" => Ok(Expr::Literal(Literal::Bool(false))),
                    n if KEYWORDS.contains(&n) => {
                        self.current -= 1;
                        Err(self.unexpected("expression"))
                    }
                    _ => Ok(Expr::Name(name)),
                }
            }
            TokenKind::LParen => {
                self.current += 1;
                if self.eat(&TokenKind::RParen) {
                    return Ok(Expr::List(Vec::new()));
                }
                let first = self.expression()?;
                if self.eat(&TokenKind::RParen) {
                    return Ok(first);
                }
                self.expect(TokenKind::Comma, "',' or ')'")?;
                let mut items = vec![first];
                items.extend(self.sequence(&TokenKind::RParen)?);
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::List(items))
            }
            TokenKind::LBracket => {
                self.current += 1;
                let items = self.sequence(&TokenKind::RBracket)?;
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            TokenKind::LBrace => {
                self.current += 1;
                self.brace()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `{name}` variable reference or a dict display
    fn brace(&mut self) -> Result<Expr> {
        if let (Some(TokenKind::Name(name)), Some(TokenKind::RBrace)) =
            (self.peek_kind(0), self.peek_kind(1))
        {
            if !KEYWORDS.contains(&name.as_str()) {
                let name = name.clone();
                self.current += 2;
                return Ok(Expr::Braced(name));
            }
        }

        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.expression()?;
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.expression()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Expr::Dict(entries))
    }

    fn identifier(&mut self) -> Result<String> {
        match self.peek_kind(0) {
            Some(TokenKind::Name(name)) => {
                let name = name.clone();
                self.current += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("attribute name")),
        }
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind(0) == Some(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek_kind(0), Some(TokenKind::Name(n)) if n == keyword) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn unexpected(&self, expected: &str) -> Error {
        let (found, position) = match self.tokens.get(self.current) {
            Some(Token {
                kind: TokenKind::Eof,
                position,
            }) => ("end of input".to_string(), *position),
            Some(token) => (format!("{:?}", token.kind), token.position),
            None => ("end of input".to_string(), self.input.chars().count()),
        };
        Error::expression(
            self.input,
            format!("expected {}, found {} at position {}", expected, found, position),
        )
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn fold_bool(op: BoolOp, mut values: Vec<Expr>) -> Expr {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Expr::BoolOp { op, values }
    }
}

/// Parse a single expression
pub fn parse_expression(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse_expression()
}

/// Parse a multi-line block
pub fn parse_block(input: &str) -> Result<Vec<Stmt>> {
    Parser::new(input)?.parse_block()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Add,
                Expr::Literal(Literal::Int(1)),
                binary(
                    BinaryOp::Mul,
                    Expr::Literal(Literal::Int(2)),
                    Expr::Literal(Literal::Int(3))
                )
            )
        );
    }

    #[test]
    fn test_braced_and_dict() {
        assert_eq!(parse_expression("{x}").unwrap(), Expr::Braced("x".into()));
        assert!(matches!(
            parse_expression("{'a': 1, 'b': {y}}").unwrap(),
            Expr::Dict(entries) if entries.len() == 2
        ));
        assert_eq!(parse_expression("{}").unwrap(), Expr::Dict(vec![]));
    }

    #[test]
    fn test_conditional_and_comparisons() {
        let expr = parse_expression("'adult' if {age} >= 18 else 'minor'").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));

        let expr = parse_expression("x not in [1, 2]").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare { ref rest, .. } if rest[0].0 == CompareOp::NotIn
        ));

        let expr = parse_expression("x is not None").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare { ref rest, .. } if rest[0].0 == CompareOp::IsNot
        ));
    }

    #[test]
    fn test_calls_and_attributes() {
        let expr = parse_expression("str(person.employer.name)").unwrap();
        let Expr::Call { func, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(func, "str");
        assert!(matches!(args[0], Expr::Attribute { .. }));

        let expr = parse_expression("', '.join(items)").unwrap();
        assert!(matches!(expr, Expr::MethodCall { ref method, .. } if method == "join"));
    }

    #[test]
    fn test_tuple_and_case() {
        let expr = parse_expression("case(({x} < 10, 'low'), (True, 'high'))").unwrap();
        let Expr::Call { args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(&args[0], Expr::List(items) if items.len() == 2));
    }

    #[test]
    fn test_block() {
        let stmts = parse_block("x = src.name\n\ntarget = x.upper()\n").unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[1], Stmt::Assign { target, .. } if target == "target"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_expression("1 +").is_err());
        assert!(parse_expression("(1, 2").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("x\ny").is_err());
        assert!(parse_expression("   ").is_err());
    }
}
