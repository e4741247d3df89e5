//! Tokenizer for constraint expressions.

use cinch_core::Kind;

use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    True,
    False,
    Underscore,
    BottomLit,
    KindName(Kind),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Question,
    Amp,
    Pipe,
    Star,
    Plus,
    Minus,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Ellipsis,
    Dot,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if c == b'/' && bytes.get(pos + 1) == Some(&b'/') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        let token = if c.is_ascii_digit() {
            let (token, end) = lex_number(src, pos)?;
            pos = end;
            token
        } else if c == b'_' && src[pos..].starts_with("_|_") {
            pos += 3;
            Token::BottomLit
        } else if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            keyword_or_ident(&src[start..pos])
        } else if c == b'"' {
            let (s, end) = lex_string(src, pos)?;
            pos = end;
            Token::Str(s)
        } else {
            let two = src.get(pos..pos + 2).unwrap_or("");
            let (token, len) = match two {
                "==" => (Token::EqEq, 2),
                "!=" => (Token::NotEq, 2),
                "<=" => (Token::Le, 2),
                ">=" => (Token::Ge, 2),
                "&&" => (Token::AndAnd, 2),
                "||" => (Token::OrOr, 2),
                _ if src[pos..].starts_with("...") => (Token::Ellipsis, 3),
                _ => {
                    let token = match c {
                        b'{' => Token::LBrace,
                        b'}' => Token::RBrace,
                        b'[' => Token::LBracket,
                        b']' => Token::RBracket,
                        b'(' => Token::LParen,
                        b')' => Token::RParen,
                        b',' => Token::Comma,
                        b':' => Token::Colon,
                        b'?' => Token::Question,
                        b'&' => Token::Amp,
                        b'|' => Token::Pipe,
                        b'*' => Token::Star,
                        b'+' => Token::Plus,
                        b'-' => Token::Minus,
                        b'/' => Token::Slash,
                        b'<' => Token::Lt,
                        b'>' => Token::Gt,
                        b'!' => Token::Bang,
                        b'.' => Token::Dot,
                        _ => {
                            let ch = src[pos..].chars().next().unwrap_or('?');
                            return Err(SyntaxError::new(
                                pos,
                                format!("unexpected character {:?}", ch),
                            ));
                        }
                    };
                    (token, 1)
                }
            };
            pos += len;
            token
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> Token {
    match word {
        "_" => Token::Underscore,
        "null" => Token::Null,
        "true" => Token::True,
        "false" => Token::False,
        "int" => Token::KindName(Kind::INT),
        "float" => Token::KindName(Kind::FLOAT),
        "number" => Token::KindName(Kind::NUMBER),
        "string" => Token::KindName(Kind::STRING),
        "bool" => Token::KindName(Kind::BOOL),
        _ => Token::Ident(word.to_string()),
    }
}

fn lex_number(src: &str, start: usize) -> Result<(Token, usize), SyntaxError> {
    let bytes = src.as_bytes();
    let mut pos = start;
    let mut is_float = false;

    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
        pos += 1;
    }
    if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
        is_float = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            is_float = true;
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text: String = src[start..pos].chars().filter(|c| *c != '_').collect();
    let token = if is_float {
        let value = text
            .parse::<f64>()
            .map_err(|e| SyntaxError::new(start, format!("invalid float {}: {}", text, e)))?;
        if !value.is_finite() {
            return Err(SyntaxError::new(start, format!("float {} is out of range", text)));
        }
        Token::Float(value)
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|e| SyntaxError::new(start, format!("invalid integer {}: {}", text, e)))?
    };
    Ok((token, pos))
}

fn lex_string(src: &str, start: usize) -> Result<(String, usize), SyntaxError> {
    let mut out = String::new();
    let mut chars = src[start + 1..].char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, start + 1 + i + 1)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((j, other)) => {
                    return Err(SyntaxError::new(
                        start + 1 + j,
                        format!("unknown escape sequence \\{}", other),
                    ))
                }
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(SyntaxError::new(start, "unterminated string literal"))
}
