//! Token scanner for the expanded source text.

use std::fmt;

use glint_ir::Diagnostic;

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Float(f32),
    Int(i32),
    Uint(u32),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Question,
    Colon,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Increment,
    Decrement,

    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Float(v) => write!(f, "`{v:?}`"),
            Self::Int(v) => write!(f, "`{v}`"),
            Self::Uint(v) => write!(f, "`{v}u`"),
            other => {
                let text = match other {
                    Self::LParen => "(",
                    Self::RParen => ")",
                    Self::LBrace => "{",
                    Self::RBrace => "}",
                    Self::LBracket => "[",
                    Self::RBracket => "]",
                    Self::Semicolon => ";",
                    Self::Comma => ",",
                    Self::Dot => ".",
                    Self::Question => "?",
                    Self::Colon => ":",
                    Self::Plus => "+",
                    Self::Minus => "-",
                    Self::Star => "*",
                    Self::Slash => "/",
                    Self::Percent => "%",
                    Self::Bang => "!",
                    Self::Assign => "=",
                    Self::PlusAssign => "+=",
                    Self::MinusAssign => "-=",
                    Self::StarAssign => "*=",
                    Self::SlashAssign => "/=",
                    Self::Increment => "++",
                    Self::Decrement => "--",
                    Self::Eq => "==",
                    Self::NotEq => "!=",
                    Self::Less => "<",
                    Self::LessEq => "<=",
                    Self::Greater => ">",
                    Self::GreaterEq => ">=",
                    Self::AndAnd => "&&",
                    Self::OrOr => "||",
                    _ => unreachable!(),
                };
                write!(f, "`{text}`")
            }
        }
    }
}

/// A token plus the 1-based source line it started on.
#[derive(Clone, Debug)]
pub struct SpannedToken {
    pub token: Token,
    pub line: u32,
}

/// Scans the expanded source into tokens.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, Diagnostic> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            _ if c.is_whitespace() => {
                i += 1;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(SpannedToken {
                    token: Token::Ident(name),
                    line,
                });
            }
            _ if c.is_ascii_digit() || (c == '.' && matches!(chars.get(i + 1), Some(d) if d.is_ascii_digit())) =>
            {
                let (token, next) = scan_number(&chars, i, line)?;
                tokens.push(SpannedToken { token, line });
                i = next;
            }
            _ => {
                let (token, width) = scan_operator(&chars, i).ok_or_else(|| {
                    Diagnostic::error(format!("unexpected character `{c}`")).with_line(line)
                })?;
                tokens.push(SpannedToken { token, line });
                i += width;
            }
        }
    }

    Ok(tokens)
}

fn scan_number(chars: &[char], start: usize, line: u32) -> Result<(Token, usize), Diagnostic> {
    let mut i = start;
    let mut is_float = false;

    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text: String = chars[start..i].iter().collect();
    let invalid =
        || Diagnostic::error(format!("invalid numeric literal `{text}`")).with_line(line);

    if i < chars.len() && (chars[i] == 'f' || chars[i] == 'F') {
        let value: f32 = text.parse().map_err(|_| invalid())?;
        return Ok((Token::Float(value), i + 1));
    }
    if i < chars.len() && (chars[i] == 'u' || chars[i] == 'U') {
        if is_float {
            return Err(invalid());
        }
        let value: u32 = text.parse().map_err(|_| invalid())?;
        return Ok((Token::Uint(value), i + 1));
    }

    if is_float {
        let value: f32 = text.parse().map_err(|_| invalid())?;
        Ok((Token::Float(value), i))
    } else {
        let value: i32 = text.parse().map_err(|_| invalid())?;
        Ok((Token::Int(value), i))
    }
}

fn scan_operator(chars: &[char], i: usize) -> Option<(Token, usize)> {
    let two = |a: char, b: char| chars.get(i) == Some(&a) && chars.get(i + 1) == Some(&b);

    let token = if two('+', '+') {
        (Token::Increment, 2)
    } else if two('-', '-') {
        (Token::Decrement, 2)
    } else if two('+', '=') {
        (Token::PlusAssign, 2)
    } else if two('-', '=') {
        (Token::MinusAssign, 2)
    } else if two('*', '=') {
        (Token::StarAssign, 2)
    } else if two('/', '=') {
        (Token::SlashAssign, 2)
    } else if two('=', '=') {
        (Token::Eq, 2)
    } else if two('!', '=') {
        (Token::NotEq, 2)
    } else if two('<', '=') {
        (Token::LessEq, 2)
    } else if two('>', '=') {
        (Token::GreaterEq, 2)
    } else if two('&', '&') {
        (Token::AndAnd, 2)
    } else if two('|', '|') {
        (Token::OrOr, 2)
    } else {
        let single = match chars[i] {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '?' => Token::Question,
            ':' => Token::Colon,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '!' => Token::Bang,
            '=' => Token::Assign,
            '<' => Token::Less,
            '>' => Token::Greater,
            _ => return None,
        };
        (single, 1)
    };
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            tokens("float x = 1.0;"),
            vec![
                Token::Ident("float".into()),
                Token::Ident("x".into()),
                Token::Assign,
                Token::Float(1.0),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn scans_numbers() {
        assert_eq!(tokens("42"), vec![Token::Int(42)]);
        assert_eq!(tokens("42u"), vec![Token::Uint(42)]);
        assert_eq!(tokens("1.5"), vec![Token::Float(1.5)]);
        assert_eq!(tokens(".5"), vec![Token::Float(0.5)]);
        assert_eq!(tokens("2."), vec![Token::Float(2.0)]);
        assert_eq!(tokens("1e3"), vec![Token::Float(1000.0)]);
        assert_eq!(tokens("1.5e-2"), vec![Token::Float(0.015)]);
        assert_eq!(tokens("3f"), vec![Token::Float(3.0)]);
    }

    #[test]
    fn scans_operators() {
        assert_eq!(
            tokens("a += b++ <= c && d"),
            vec![
                Token::Ident("a".into()),
                Token::PlusAssign,
                Token::Ident("b".into()),
                Token::Increment,
                Token::LessEq,
                Token::Ident("c".into()),
                Token::AndAnd,
                Token::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn tracks_lines() {
        let spanned = tokenize("a\nb\n  c").unwrap();
        let lines: Vec<u32> = spanned.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("float @x;").unwrap_err();
        assert!(err.message.contains('@'));
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn rejects_float_with_uint_suffix() {
        assert!(tokenize("1.5u").is_err());
    }

    #[test]
    fn member_access_is_dot() {
        assert_eq!(
            tokens("v.xy"),
            vec![
                Token::Ident("v".into()),
                Token::Dot,
                Token::Ident("xy".into()),
            ]
        );
    }
}
