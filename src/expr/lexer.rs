//! Tokenizer for constraint expressions.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords (case-sensitive)
    And,
    Or,
    Not,
    In,
    Len,
    True,
    False,

    // Literals
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Symbols
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Dot,      // .
    EqEq,     // ==
    NotEq,    // !=
    Gt,       // >
    GtEq,     // >=
    Lt,       // <
    LtEq,     // <=

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::In => "in",
            TokenKind::Len => "len",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Int(_) => "integer",
            TokenKind::Float(_) => "number",
            TokenKind::Str(_) => "string",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Eof => "end of expression",
        }
    }
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    Lexer { src, chars: src.char_indices().peekable() }.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, ExprError> {
        let mut out = Vec::new();
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            let kind = match c {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '=' => self.pair('=', TokenKind::EqEq, None, offset)?,
                '!' => self.pair('=', TokenKind::NotEq, None, offset)?,
                '>' => self.pair('=', TokenKind::GtEq, Some(TokenKind::Gt), offset)?,
                '<' => self.pair('=', TokenKind::LtEq, Some(TokenKind::Lt), offset)?,
                '"' | '\'' => self.string(c, offset)?,
                '-' | '0'..='9' => self.number(offset)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.word(),
                other => {
                    return Err(ExprError::new(format!("unexpected character `{other}`"), offset));
                }
            };
            out.push(Token { kind, offset });
        }
        out.push(Token { kind: TokenKind::Eof, offset: self.src.len() });
        Ok(out)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.chars.next();
        kind
    }

    /// `c` followed by `second` yields `joined`; a lone `c` yields `alone` (or an error).
    fn pair(
        &mut self,
        second: char,
        joined: TokenKind,
        alone: Option<TokenKind>,
        offset: usize,
    ) -> Result<TokenKind, ExprError> {
        let (_, first) = self.chars.next().unwrap_or((offset, ' '));
        if self.chars.peek().map(|&(_, c)| c) == Some(second) {
            self.chars.next();
            return Ok(joined);
        }
        alone.ok_or_else(|| {
            ExprError::new(format!("unexpected `{first}`, did you mean `{}`?", joined.name()), offset)
        })
    }

    fn string(&mut self, quote: char, offset: usize) -> Result<TokenKind, ExprError> {
        self.chars.next();
        let mut out = String::new();
        loop {
            let Some((at, c)) = self.chars.next() else {
                return Err(ExprError::new("unterminated string literal", offset));
            };
            match c {
                c if c == quote => return Ok(TokenKind::Str(out)),
                '\\' => {
                    let Some((_, esc)) = self.chars.next() else {
                        return Err(ExprError::new("unterminated string literal", offset));
                    };
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '\\' | '"' | '\'' | '/' => out.push(esc),
                        'u' => out.push(self.unicode_escape(at)?),
                        other => {
                            return Err(ExprError::new(format!("unknown escape `\\{other}`"), at));
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self, at: usize) -> Result<char, ExprError> {
        let mut hex = String::new();
        for _ in 0..4 {
            match self.chars.next() {
                Some((_, h)) if h.is_ascii_hexdigit() => hex.push(h),
                _ => return Err(ExprError::new("malformed \\u escape", at)),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| ExprError::new("malformed \\u escape", at))
    }

    fn number(&mut self, offset: usize) -> Result<TokenKind, ExprError> {
        let mut text = String::new();
        if let Some(&(_, '-')) = self.chars.peek() {
            text.push('-');
            self.chars.next();
        }
        let mut is_float = false;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '0'..='9' => text.push(c),
                '.' if !is_float => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.chars.next();
                    if let Some(&(_, sign @ ('+' | '-'))) = self.chars.peek() {
                        text.push(sign);
                    } else {
                        continue;
                    }
                }
                _ => break,
            }
            self.chars.next();
        }
        let malformed = || ExprError::new(format!("malformed number `{text}`"), offset);
        if text == "-" || text.ends_with('.') {
            return Err(malformed());
        }
        if is_float {
            match text.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(TokenKind::Float(f)),
                Ok(_) => Err(ExprError::new(format!("number `{text}` is out of range"), offset)),
                Err(_) => Err(malformed()),
            }
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| malformed())
        }
    }

    fn word(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match text.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "len" => TokenKind::Len,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident(text),
        }
    }
}
