use crate::error::{ProxyError, ProxyResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: keyword or unquoted identifier, original spelling kept.
    Word(String),
    /// Backtick-quoted identifier, unescaped.
    Quoted(String),
    /// String literal, unescaped.
    Str(String),
    Number(String),
    Placeholder,
    Symbol(&'static str),
}

impl Token {
    pub fn is_word(&self, kw: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }

    pub fn is_symbol(&self, sym: &str) -> bool {
        matches!(self, Token::Symbol(s) if *s == sym)
    }
}

const SYMBOLS: [&str; 19] = [
    "<=>", "<>", "!=", "<=", ">=", "=", "<", ">", "(", ")", ",", ".", ";", "+", "-", "*", "/",
    "%", "@",
];

pub fn tokenize(input: &str) -> ProxyResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // comments
        if c == '#' || (c == '-' && chars.get(i + 1) == Some(&'-')) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            if i + 1 >= chars.len() {
                return Err(ProxyError::Parse("unterminated comment".into()));
            }
            i += 2;
            continue;
        }
        if c == '\'' || c == '"' {
            let (s, next) = read_string(&chars, i)?;
            tokens.push(Token::Str(s));
            i = next;
            continue;
        }
        if c == '`' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(ProxyError::Parse("unterminated quoted identifier".into())),
                    Some('`') if chars.get(i + 1) == Some(&'`') => {
                        s.push('`');
                        i += 2;
                    }
                    Some('`') => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(*ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Quoted(s));
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            // 1abc is an identifier in MySQL
            if i < chars.len() && is_ident_char(chars[i]) {
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            } else {
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            continue;
        }
        if is_ident_char(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
            continue;
        }
        if c == '?' {
            tokens.push(Token::Placeholder);
            i += 1;
            continue;
        }
        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        match SYMBOLS.iter().find(|s| rest.starts_with(*s)) {
            Some(&sym) => {
                tokens.push(Token::Symbol(sym));
                i += sym.len();
            }
            None => return Err(ProxyError::Parse(format!("unexpected character '{}'", c))),
        }
    }
    Ok(tokens)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn read_string(chars: &[char], start: usize) -> ProxyResult<(String, usize)> {
    let quote = chars[start];
    let mut s = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(ProxyError::Parse("unterminated string literal".into())),
            Some('\\') => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| ProxyError::Parse("unterminated string literal".into()))?;
                s.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    'Z' => '\u{1a}',
                    other => *other,
                });
                i += 2;
            }
            Some(ch) if *ch == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    s.push(quote);
                    i += 2;
                } else {
                    return Ok((s, i + 1));
                }
            }
            Some(ch) => {
                s.push(*ch);
                i += 1;
            }
        }
    }
}
