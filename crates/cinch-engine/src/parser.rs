//! Pratt parser for constraint expressions.
//!
//! Binding powers, loosest first: `|`, `&`, `||`, `&&`, comparisons,
//! `+ -`, `* /`, prefix operators (`-`, `!`, `*`, unary bounds), then
//! selectors, indexing and calls.

use cinch_core::{BoundOp, Value};

use crate::error::SyntaxError;
use crate::expr::{BinaryOp, Disjunct, Expr, FieldDecl, UnaryOp};
use crate::lexer::{tokenize, Spanned, Token};

/// Upper bound on the elements produced by `N * [ ... ]`.
pub const MAX_REPEAT: usize = 1 << 16;

const PREFIX_POWER: u8 = 15;

/// Parses constraint text into an unresolved expression.
pub fn parse(src: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr(0)?;
    parser.expect(&Token::Eof, "end of input")?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

fn infix_power(token: &Token) -> Option<(u8, u8)> {
    let power = match token {
        Token::Pipe => 1,
        Token::Amp => 3,
        Token::OrOr => 5,
        Token::AndAnd => 7,
        Token::EqEq | Token::NotEq | Token::Lt | Token::Le | Token::Gt | Token::Ge => 9,
        Token::Plus | Token::Minus => 11,
        Token::Star | Token::Slash => 13,
        _ => return None,
    };
    Some((power, power + 1))
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].offset
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), SyntaxError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> SyntaxError {
        SyntaxError::new(
            self.offset(),
            format!("expected {}, found {:?}", what, self.peek()),
        )
    }

    fn expr(&mut self, min_power: u8) -> Result<Expr, SyntaxError> {
        let mut lhs = self.prefix()?;

        loop {
            let token = self.peek().clone();
            let Some((left, right)) = infix_power(&token) else {
                break;
            };
            if left < min_power {
                break;
            }
            let offset = self.offset();
            self.advance();
            let rhs = self.expr(right)?;
            lhs = combine(token, lhs, rhs, offset)?;
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, SyntaxError> {
        let offset = self.offset();
        let expr = match self.advance() {
            Token::Null => Expr::Literal(Value::Null),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Int(v) => Expr::Literal(Value::Int(v)),
            Token::Float(v) => Expr::Literal(Value::Float(v)),
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::Underscore => Expr::top(),
            Token::BottomLit => Expr::Literal(Value::bottom("explicit error (_|_ literal)")),
            Token::KindName(kind) => Expr::kind(kind),
            Token::Ident(name) => self.postfix(Expr::Ident(name))?,
            Token::LParen => {
                let inner = self.expr(0)?;
                self.expect(&Token::RParen, "')'")?;
                self.postfix(inner)?
            }
            Token::LBrace => {
                let lit = self.struct_literal()?;
                self.postfix(lit)?
            }
            Token::LBracket => {
                let lit = self.list_literal()?;
                self.postfix(lit)?
            }
            Token::Minus => Expr::Unary(UnaryOp::Neg, Box::new(self.expr(PREFIX_POWER)?)),
            Token::Bang => Expr::Unary(UnaryOp::Not, Box::new(self.expr(PREFIX_POWER)?)),
            Token::Star => Expr::Default(Box::new(self.expr(PREFIX_POWER)?)),
            Token::Lt => Expr::bound(BoundOp::Lt, self.expr(PREFIX_POWER)?),
            Token::Le => Expr::bound(BoundOp::Le, self.expr(PREFIX_POWER)?),
            Token::Gt => Expr::bound(BoundOp::Gt, self.expr(PREFIX_POWER)?),
            Token::Ge => Expr::bound(BoundOp::Ge, self.expr(PREFIX_POWER)?),
            Token::NotEq => Expr::bound(BoundOp::Ne, self.expr(PREFIX_POWER)?),
            token => {
                return Err(SyntaxError::new(
                    offset,
                    format!("expected expression, found {:?}", token),
                ))
            }
        };
        Ok(expr)
    }

    fn postfix(&mut self, mut expr: Expr) -> Result<Expr, SyntaxError> {
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    match self.advance() {
                        Token::Ident(name) | Token::Str(name) => {
                            expr = Expr::select(expr, name);
                        }
                        _ => return Err(SyntaxError::new(self.offset(), "expected selector")),
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expr(0)?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::index(expr, index);
                }
                Token::LParen => {
                    let Expr::Ident(name) = &expr else {
                        return Ok(expr);
                    };
                    let name = name.clone();
                    self.advance();
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.expr(0)?);
                            if self.eat(&Token::RParen) {
                                break;
                            }
                            self.expect(&Token::Comma, "',' or ')'")?;
                        }
                    }
                    expr = Expr::Call(name, args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn struct_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut decls: Vec<FieldDecl> = Vec::new();

        loop {
            if self.eat(&Token::RBrace) {
                break;
            }
            let label = match self.peek().clone() {
                Token::Ident(name) | Token::Str(name) => {
                    self.advance();
                    name
                }
                _ => return Err(self.unexpected("field label")),
            };
            let optional = self.eat(&Token::Question);
            self.expect(&Token::Colon, "':'")?;
            let value = self.expr(0)?;

            // Repeated labels unify.
            match decls.iter_mut().find(|d| d.label == label) {
                Some(existing) => {
                    let previous = std::mem::replace(&mut existing.value, Expr::top());
                    existing.value = Expr::unify(previous, value);
                    existing.optional &= optional;
                }
                None => decls.push(FieldDecl {
                    label,
                    optional,
                    value,
                }),
            }
            self.eat(&Token::Comma);
        }

        Ok(Expr::Struct(decls))
    }

    fn list_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut elems = Vec::new();

        loop {
            if self.eat(&Token::RBracket) {
                return Ok(Expr::list(elems));
            }
            if self.eat(&Token::Ellipsis) {
                let tail = if self.peek() == &Token::RBracket {
                    Expr::top()
                } else {
                    self.expr(0)?
                };
                self.eat(&Token::Comma);
                self.expect(&Token::RBracket, "']' after list tail")?;
                return Ok(Expr::open_list(elems, tail));
            }
            elems.push(self.expr(0)?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RBracket, "',' or ']'")?;
                return Ok(Expr::list(elems));
            }
        }
    }
}

fn combine(token: Token, lhs: Expr, rhs: Expr, offset: usize) -> Result<Expr, SyntaxError> {
    let op = match token {
        Token::Pipe => {
            let mut disjuncts = match lhs {
                Expr::Disjunction(disjuncts) => disjuncts,
                other => vec![disjunct(other)],
            };
            disjuncts.push(disjunct(rhs));
            return Ok(Expr::Disjunction(disjuncts));
        }
        Token::Amp => return Ok(Expr::unify(lhs, rhs)),
        Token::Star => {
            if let Some(list) = repeat(&lhs, &rhs, offset)? {
                return Ok(list);
            }
            BinaryOp::Mul
        }
        Token::OrOr => BinaryOp::Or,
        Token::AndAnd => BinaryOp::And,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Slash => BinaryOp::Div,
        other => {
            return Err(SyntaxError::new(
                offset,
                format!("unexpected operator {:?}", other),
            ))
        }
    };
    Ok(Expr::binary(op, lhs, rhs))
}

fn disjunct(expr: Expr) -> Disjunct {
    match expr {
        Expr::Default(inner) => Disjunct {
            expr: *inner,
            default: true,
        },
        expr => Disjunct {
            expr,
            default: false,
        },
    }
}

/// Expands `N * [elems]` into a closed list of `N` copies of `elems`.
fn repeat(lhs: &Expr, rhs: &Expr, offset: usize) -> Result<Option<Expr>, SyntaxError> {
    let (Expr::Literal(Value::Int(count)), Expr::List { elems, tail }) = (lhs, rhs) else {
        return Ok(None);
    };
    if tail.is_some() {
        return Err(SyntaxError::new(offset, "cannot repeat an open list"));
    }
    let count = usize::try_from(*count)
        .map_err(|_| SyntaxError::new(offset, "negative list repetition"))?;
    let total = count.saturating_mul(elems.len());
    if total > MAX_REPEAT {
        return Err(SyntaxError::new(
            offset,
            format!("list repetition of {} elements exceeds {}", total, MAX_REPEAT),
        ));
    }
    let repeated = elems.iter().cycle().take(total).cloned().collect();
    Ok(Some(Expr::list(repeated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinch_core::Kind;

    #[test]
    fn test_precedence() {
        let expr = parse("a + b & >=5").unwrap();
        assert_eq!(
            expr,
            Expr::unify(
                Expr::binary(BinaryOp::Add, Expr::ident("a"), Expr::ident("b")),
                Expr::bound(BoundOp::Ge, Expr::int(5)),
            )
        );

        let expr = parse("1 + 2 * 3 == 7 && true").unwrap();
        let Expr::Binary(BinaryOp::And, lhs, _) = expr else {
            panic!("expected &&");
        };
        assert!(matches!(*lhs, Expr::Binary(BinaryOp::Eq, _, _)));
    }

    #[test]
    fn test_disjunction_defaults() {
        let expr = parse("int | *1 | 2").unwrap();
        let Expr::Disjunction(disjuncts) = expr else {
            panic!("expected disjunction");
        };
        assert_eq!(disjuncts.len(), 3);
        assert_eq!(disjuncts[0].expr, Expr::kind(Kind::INT));
        assert!(disjuncts[1].default);
        assert!(!disjuncts[2].default);
    }

    #[test]
    fn test_list_repetition() {
        let expr = parse("3 * [int | *1]").unwrap();
        let Expr::List { elems, tail } = expr else {
            panic!("expected list");
        };
        assert_eq!(elems.len(), 3);
        assert!(tail.is_none());
        assert!(parse("100000 * [int]").is_err());
        assert!(parse("2 * [...int]").is_err());
    }

    #[test]
    fn test_repetition_of_empty_list() {
        assert_eq!(parse("9000000000000000000 * []").unwrap(), Expr::list(vec![]));
        assert_eq!(
            parse("2 * [1, 2]").unwrap(),
            Expr::list(vec![Expr::int(1), Expr::int(2), Expr::int(1), Expr::int(2)])
        );
    }

    #[test]
    fn test_open_list() {
        let expr = parse(r#"[_, "b", ...]"#).unwrap();
        assert_eq!(
            expr,
            Expr::open_list(vec![Expr::top(), Expr::string("b")], Expr::top())
        );
        let expr = parse("[...int | *1]").unwrap();
        assert!(matches!(expr, Expr::List { tail: Some(_), .. }));
    }

    #[test]
    fn test_struct_literal() {
        let expr = parse(r#"{a: 1, "b c"?: int d: a}"#).unwrap();
        let Expr::Struct(decls) = expr else {
            panic!("expected struct");
        };
        let labels: Vec<_> = decls.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["a", "b c", "d"]);
        assert!(decls[1].optional);
        assert_eq!(decls[2].value, Expr::ident("a"));
    }

    #[test]
    fn test_selectors_and_calls() {
        let expr = parse("len(m.items[0]) + mod(x, 2)").unwrap();
        let Expr::Binary(BinaryOp::Add, lhs, rhs) = expr else {
            panic!("expected +");
        };
        assert_eq!(
            *lhs,
            Expr::Call(
                "len".into(),
                vec![Expr::index(
                    Expr::select(Expr::ident("m"), "items"),
                    Expr::int(0)
                )]
            )
        );
        assert!(matches!(*rhs, Expr::Call(ref name, ref args) if name == "mod" && args.len() == 2));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("a +").is_err());
        assert!(parse("{a 1}").is_err());
        assert!(parse("(1").is_err());
        assert_eq!(parse("1 2").unwrap_err().offset, 2);
    }
}
