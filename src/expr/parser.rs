//! Recursive-descent parser, one function per grammar production.

use ordered_float::OrderedFloat;

use super::lexer::{tokenize, Token, TokenKind};
use super::{CmpOp, Expr, ExprError, FieldRef};
use crate::ir::Literal;

/// Parse a constraint expression. Syntax only; see [`super::check`] for typing.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    if src.trim().is_empty() {
        return Err(ExprError::new("empty expression", 0));
    }
    let mut p = Parser { tokens: tokenize(src)?, pos: 0 };
    let expr = p.parse_or()?;
    let next = p.peek();
    if next.kind != TokenKind::Eof {
        return Err(unexpected(next, "`and`, `or` or end of expression"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn unexpected(tok: &Token, expected: &str) -> ExprError {
    ExprError::new(format!("expected {expected}, found `{}`", tok.kind.name()), tok.offset)
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ExprError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(unexpected(self.peek(), &format!("`{}`", kind.name())))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_comparison()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_term()?;
        let Some(op) = self.cmp_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_term()?;
        if self.cmp_op().is_some() {
            return Err(ExprError::new(
                "comparisons cannot be chained; combine them with `and`",
                self.peek().offset,
            ));
        }
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn cmp_op(&self) -> Option<CmpOp> {
        match self.peek().kind {
            TokenKind::EqEq => Some(CmpOp::Eq),
            TokenKind::NotEq => Some(CmpOp::Ne),
            TokenKind::Gt => Some(CmpOp::Gt),
            TokenKind::GtEq => Some(CmpOp::Ge),
            TokenKind::Lt => Some(CmpOp::Lt),
            TokenKind::LtEq => Some(CmpOp::Le),
            _ => None,
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        match &self.peek().kind {
            TokenKind::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.parse_term()?)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Len if self.peek_at(1) == &TokenKind::LParen => {
                self.advance();
                self.advance();
                let r = self.parse_field_ref()?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::Len(r))
            }
            TokenKind::Ident(_) => {
                let r = self.parse_field_ref()?;
                if self.check(&TokenKind::In) {
                    self.advance();
                    let lits = self.parse_list()?;
                    return Ok(Expr::In(r, lits));
                }
                Ok(Expr::Field(r))
            }
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::True
            | TokenKind::False => Ok(Expr::Literal(self.parse_literal()?)),
            _ => Err(unexpected(self.peek(), "a field, literal, `len(...)`, `not` or `(`")),
        }
    }

    fn parse_field_ref(&mut self) -> Result<FieldRef, ExprError> {
        let tok = self.advance();
        let TokenKind::Ident(first) = tok.kind else {
            return Err(unexpected(&tok, "a field name"));
        };
        if !self.check(&TokenKind::Dot) {
            return Ok(FieldRef { entity: None, field: first, offset: tok.offset });
        }
        self.advance();
        let next = self.advance();
        match next.kind {
            TokenKind::Ident(field) => Ok(FieldRef { entity: Some(first), field, offset: tok.offset }),
            _ => Err(unexpected(&next, "a field name after `.`")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Literal>, ExprError> {
        self.expect(&TokenKind::LBracket)?;
        let mut out = vec![self.parse_literal()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            out.push(self.parse_literal()?);
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(out)
    }

    fn parse_literal(&mut self) -> Result<Literal, ExprError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Int(i) => Ok(Literal::Int(i)),
            TokenKind::Float(f) => Ok(Literal::Float(OrderedFloat(f))),
            TokenKind::Str(s) => Ok(Literal::String(s)),
            TokenKind::True => Ok(Literal::Bool(true)),
            TokenKind::False => Ok(Literal::Bool(false)),
            _ => Err(unexpected(&tok, "a literal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldRef {
        FieldRef { entity: None, field: name.into(), offset: 0 }
    }

    #[test]
    fn precedence_or_binds_loosest() {
        let e = parse("a > 1 or b < 2 and c == 3").unwrap();
        let Expr::Or(_, rhs) = e else { panic!("expected `or` at the root") };
        assert!(matches!(*rhs, Expr::And(_, _)));
    }

    #[test]
    fn membership_and_len_calls() {
        let e = parse("status in ['active', 'pending']").unwrap();
        match e {
            Expr::In(r, lits) => {
                assert_eq!(r.field, "status");
                assert_eq!(lits, vec![Literal::String("active".into()), Literal::String("pending".into())]);
            }
            other => panic!("unexpected {other:?}"),
        }
        let e = parse("len(summary) <= 300").unwrap();
        assert!(matches!(e, Expr::Compare(CmpOp::Le, ref l, _) if matches!(**l, Expr::Len(_))));
    }

    #[test]
    fn not_applies_to_a_term() {
        // `not` binds tighter than comparison, as the grammar says.
        let e = parse("not (price < 0)").unwrap();
        assert!(matches!(e, Expr::Not(_)));
        let e = parse("not flag == true").unwrap();
        assert!(matches!(e, Expr::Compare(CmpOp::Eq, ref l, _) if matches!(**l, Expr::Not(_))));
    }

    #[test]
    fn qualified_identifiers() {
        let e = parse("Product.price > 0").unwrap();
        let Expr::Compare(_, l, _) = e else { panic!() };
        let Expr::Field(r) = *l else { panic!() };
        assert_eq!(r.entity.as_deref(), Some("Product"));
        assert_eq!(r.field, "price");
    }

    #[test]
    fn literal_on_the_left_is_fine() {
        let e = parse("0 <= age").unwrap();
        assert_eq!(
            e,
            Expr::Compare(
                CmpOp::Le,
                Box::new(Expr::Literal(Literal::Int(0))),
                Box::new(Expr::Field(FieldRef { offset: 5, ..field("age") })),
            )
        );
    }

    #[test]
    fn syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("a >").is_err());
        assert!(parse("a in []").is_err());
        assert!(parse("(a > 1").is_err());
        assert!(parse("a > 1 b").is_err());
        let err = parse("0 < a < 10").unwrap_err();
        assert!(err.message.contains("chained"), "{err}");
        let err = parse("len(3)").unwrap_err();
        assert!(err.message.contains("field name"), "{err}");
    }
}
