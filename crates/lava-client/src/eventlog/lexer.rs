//! Lexer for event log lines.

use std::fmt;

use logos::Logos;

/// Tokens of an event log line: quoted strings, integers and floats
/// separated by blanks.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[regex(r"-?[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"-?[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // A doubled quote inside a string stands for one quote.
    #[regex(r#""([^"]|"")*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len() - 1].replace("\"\"", "\""))
    })]
    Str(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Float(v) => write!(f, "{v}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        }
    }
}

impl Token {
    fn kind(&self) -> &'static str {
        match self {
            Token::Float(_) => "float",
            Token::Int(_) => "integer",
            Token::Str(_) => "string",
        }
    }
}

/// Split a line into tokens, failing on the first unrecognised input.
pub fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(()) => {
                let span = lexer.span();
                return Err(format!(
                    "invalid token '{}' at column {}",
                    &line[span.clone()],
                    span.start + 1
                ));
            }
        }
    }

    Ok(tokens)
}

/// Positional reader over a tokenized line.
#[derive(Debug)]
pub struct Fields<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Fields<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn next(&mut self, field: &str) -> Result<&'a Token, String> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| format!("missing field {field}"))?;
        self.pos += 1;
        Ok(token)
    }

    fn mismatch(field: &str, expected: &str, got: &Token) -> String {
        format!("field {field}: expected {expected}, found {} {got}", got.kind())
    }

    pub fn int(&mut self, field: &str) -> Result<i64, String> {
        match self.next(field)? {
            Token::Int(v) => Ok(*v),
            other => Err(Self::mismatch(field, "integer", other)),
        }
    }

    pub fn i32(&mut self, field: &str) -> Result<i32, String> {
        let v = self.int(field)?;
        i32::try_from(v).map_err(|_| format!("field {field}: {v} out of range"))
    }

    pub fn count(&mut self, field: &str) -> Result<usize, String> {
        let v = self.int(field)?;
        usize::try_from(v).map_err(|_| format!("field {field}: negative count {v}"))
    }

    /// Integers are accepted where a float is expected.
    pub fn float(&mut self, field: &str) -> Result<f64, String> {
        match self.next(field)? {
            Token::Float(v) => Ok(*v),
            Token::Int(v) => Ok(*v as f64),
            other => Err(Self::mismatch(field, "number", other)),
        }
    }

    pub fn string(&mut self, field: &str) -> Result<String, String> {
        match self.next(field)? {
            Token::Str(s) => Ok(s.clone()),
            other => Err(Self::mismatch(field, "string", other)),
        }
    }

    /// `count` strings.
    pub fn strings(&mut self, field: &str, count: usize) -> Result<Vec<String>, String> {
        (0..count).map(|_| self.string(field)).collect()
    }

    /// Count field followed by that many strings.
    pub fn string_list(&mut self, field: &str) -> Result<Vec<String>, String> {
        let n = self.count(field)?;
        if n > self.remaining() {
            return Err(format!(
                "field {field}: count {n} exceeds {} remaining fields",
                self.remaining()
            ));
        }
        self.strings(field, n)
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> Vec<Token> {
        let rest = self.tokens[self.pos..].to_vec();
        self.pos = self.tokens.len();
        rest
    }
}
