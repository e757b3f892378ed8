use super::ScriptError;

/// Token stream of the scripting sublanguage.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    Assign,
    AssignCreate,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,

    Question,
    Colon,
    OrOr,
    AndAnd,
    DotDot,
    Pipe,
    Caret,
    Amp,
    EqEq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Plus,
    Minus,
    Star,
    Slash,
    Tilde,
    Bang,
    LParen,
    RParen,
    Semicolon,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '@'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some(ch) if ch == quote => break,
                    Some('\\') => match chars.next() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some(esc @ ('\\' | '\'' | '"')) => text.push(esc),
                        Some(other) => {
                            return Err(ScriptError::Parse(format!(
                                "unknown escape sequence \\{other}"
                            )))
                        }
                        None => {
                            return Err(ScriptError::Parse("unterminated string".to_string()))
                        }
                    },
                    Some(ch) => text.push(ch),
                    None => return Err(ScriptError::Parse("unterminated string".to_string())),
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }

        if c.is_ascii_digit() {
            let mut text = String::new();
            while let Some(&d) = chars.peek() {
                if d == '.' {
                    // a second dot is the concat operator, not a decimal point
                    let mut ahead = chars.clone();
                    ahead.next();
                    if ahead.peek() == Some(&'.') {
                        break;
                    }
                }
                if d.is_ascii_alphanumeric() || d == '.' {
                    text.push(d);
                    chars.next();
                } else {
                    break;
                }
            }

            if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                let value = u64::from_str_radix(hex, 16).map_err(|_| {
                    ScriptError::Parse(format!("invalid hexadecimal literal [{text}]"))
                })?;
                tokens.push(Token::Int(value as i64));
            } else if text.contains('.') || text.contains('e') || text.contains('E') {
                let value = text.parse::<f64>().map_err(|_| {
                    ScriptError::Parse(format!("invalid numeric literal [{text}]"))
                })?;
                tokens.push(Token::Float(value));
            } else {
                let value = text.parse::<i64>().map_err(|_| {
                    ScriptError::Parse(format!("invalid numeric literal [{text}]"))
                })?;
                tokens.push(Token::Int(value));
            }
            continue;
        }

        if is_ident_start(c) {
            let mut name = String::new();
            name.push(c);
            chars.next();
            while let Some(&d) = chars.peek() {
                if is_ident_continue(d) {
                    name.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(name));
            continue;
        }

        chars.next();
        let next = chars.peek().copied();

        let token = match (c, next) {
            (':', Some('=')) => {
                chars.next();
                Token::AssignCreate
            }
            (':', _) => Token::Colon,
            ('=', Some('=')) => {
                chars.next();
                Token::EqEq
            }
            ('=', _) => Token::Assign,
            ('!', Some('=')) => {
                chars.next();
                Token::NotEq
            }
            ('!', _) => Token::Bang,
            ('<', Some('=')) => {
                chars.next();
                Token::LessEq
            }
            ('<', _) => Token::Less,
            ('>', Some('=')) => {
                chars.next();
                Token::GreaterEq
            }
            ('>', _) => Token::Greater,
            ('&', Some('&')) => {
                chars.next();
                Token::AndAnd
            }
            ('&', _) => Token::Amp,
            ('|', Some('|')) => {
                chars.next();
                Token::OrOr
            }
            ('|', _) => Token::Pipe,
            ('.', Some('.')) => {
                chars.next();
                Token::DotDot
            }
            ('+', Some('=')) => {
                chars.next();
                Token::AddAssign
            }
            ('+', _) => Token::Plus,
            ('-', Some('=')) => {
                chars.next();
                Token::SubAssign
            }
            ('-', _) => Token::Minus,
            ('*', Some('=')) => {
                chars.next();
                Token::MulAssign
            }
            ('*', _) => Token::Star,
            ('/', Some('=')) => {
                chars.next();
                Token::DivAssign
            }
            ('/', _) => Token::Slash,
            ('^', _) => Token::Caret,
            ('~', _) => Token::Tilde,
            ('?', _) => Token::Question,
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            (';', _) => Token::Semicolon,
            (other, _) => {
                return Err(ScriptError::Parse(format!(
                    "unexpected character [{other}]"
                )))
            }
        };

        tokens.push(token);
    }

    Ok(tokens)
}
