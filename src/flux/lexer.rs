use super::ast::Duration;
use super::error::{Span, SyntaxError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Duration(Vec<Duration>),
    DateTime(String),
    String(Vec<StrPiece>),
    Regex(String),

    // Identifiers & keywords
    Ident(String),
    And,
    Or,
    Not,
    Exists,
    Import,
    Package,
    Option,
    Return,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    PipeForward, // |>
    PipeReceive, // <-
    Arrow,       // =>

    // Operators
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    RegexEq, // =~
    RegexNe, // !~
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,

    Eof,
}

/// Part of a string literal: plain text or the tokens of a `${...}` hole.
#[derive(Debug, Clone, PartialEq)]
pub enum StrPiece {
    Text(String),
    Interpolated(Vec<SpannedToken>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

const DURATION_UNITS: &[&str] = &["y", "mo", "w", "d", "h", "m", "s", "ms", "us", "µs", "ns"];

/// Tokenize Flux source. Never fails outright: bad input is reported in the
/// error list and skipped.
pub fn lex(source: &str) -> (Vec<SpannedToken>, Vec<SyntaxError>) {
    let mut lexer = Lexer::new(source);
    let mut tokens = lexer.tokenize(false);
    tokens.push(SpannedToken {
        token: Token::Eof,
        span: Span::new(lexer.pos, lexer.pos),
        newline_before: true,
    });
    (tokens, lexer.errors)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Lex until end of input, or when `in_interpolation` is set, until the
    /// `}` that closes the current `${` hole (consumed).
    fn tokenize(&mut self, in_interpolation: bool) -> Vec<SpannedToken> {
        let mut tokens: Vec<SpannedToken> = Vec::new();
        let mut depth = 0usize;

        loop {
            let newline_before = self.skip_whitespace_and_comments();
            let Some(ch) = self.peek() else {
                if in_interpolation {
                    self.errors.push(SyntaxError::lexer(
                        "unterminated string interpolation",
                        Span::new(self.pos, self.pos),
                    ));
                }
                return tokens;
            };

            let start = self.pos;
            let token = match ch {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '{' => {
                    depth += 1;
                    self.single(Token::LBrace)
                }
                '}' => {
                    if in_interpolation && depth == 0 {
                        self.bump();
                        return tokens;
                    }
                    depth = depth.saturating_sub(1);
                    self.single(Token::RBrace)
                }
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                ',' => self.single(Token::Comma),
                '.' => self.single(Token::Dot),
                ':' => self.single(Token::Colon),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '%' => self.single(Token::Percent),
                '^' => self.single(Token::Caret),
                '|' => {
                    self.bump();
                    if self.eat('>') {
                        Some(Token::PipeForward)
                    } else {
                        self.errors.push(SyntaxError::lexer(
                            "unexpected character '|', expected '|>'",
                            Span::new(start, self.pos),
                        ));
                        None
                    }
                }
                '<' => {
                    self.bump();
                    if self.eat('-') {
                        Some(Token::PipeReceive)
                    } else if self.eat('=') {
                        Some(Token::Le)
                    } else {
                        Some(Token::Lt)
                    }
                }
                '>' => {
                    self.bump();
                    if self.eat('=') {
                        Some(Token::Ge)
                    } else {
                        Some(Token::Gt)
                    }
                }
                '=' => {
                    self.bump();
                    if self.eat('=') {
                        Some(Token::Eq)
                    } else if self.eat('>') {
                        Some(Token::Arrow)
                    } else if self.eat('~') {
                        Some(Token::RegexEq)
                    } else {
                        Some(Token::Assign)
                    }
                }
                '!' => {
                    self.bump();
                    if self.eat('=') {
                        Some(Token::Ne)
                    } else if self.eat('~') {
                        Some(Token::RegexNe)
                    } else {
                        self.errors.push(SyntaxError::lexer(
                            "unexpected character '!'",
                            Span::new(start, self.pos),
                        ));
                        None
                    }
                }
                '/' => {
                    self.bump();
                    if regex_allowed(tokens.last().map(|t| &t.token)) {
                        self.lex_regex(start)
                    } else {
                        Some(Token::Slash)
                    }
                }
                '"' => {
                    self.bump();
                    Some(self.lex_string(start))
                }
                '0'..='9' => self.lex_number(start),
                c if c.is_alphabetic() || c == '_' => Some(self.lex_ident()),
                c => {
                    self.bump();
                    self.errors.push(SyntaxError::lexer(
                        format!("unexpected character '{c}'"),
                        Span::new(start, self.pos),
                    ));
                    None
                }
            };

            if let Some(token) = token {
                tokens.push(SpannedToken {
                    token,
                    span: Span::new(start, self.pos),
                    newline_before,
                });
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos..).and_then(|s| s.chars().next())
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source.get(self.pos..).and_then(|s| s.chars().nth(n))
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn single(&mut self, token: Token) -> Option<Token> {
        self.bump();
        Some(token)
    }

    /// Skips blanks and `//` comments; returns whether a newline was crossed.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = self.pos == 0;
        while let Some(ch) = self.peek() {
            match ch {
                '\n' => {
                    newline = true;
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        newline
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.source[start..self.pos] {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "exists" => Token::Exists,
            "import" => Token::Import,
            "package" => Token::Package,
            "option" => Token::Option,
            "return" => Token::Return,
            name => Token::Ident(name.to_string()),
        }
    }

    fn take_digits(&mut self) -> &'a str {
        let source = self.source;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        &source[start..self.pos]
    }

    fn lex_number(&mut self, start: usize) -> Option<Token> {
        let digits = self.take_digits();

        // 2019-01-01T00:00:00Z; `2019-1` stays a subtraction.
        let rest = self.source.get(start..).unwrap_or_default();
        if digits.len() == 4 && is_date_prefix(rest) {
            return self.lex_date_time(start, rest);
        }

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.take_digits();
            let text = &self.source[start..self.pos];
            return match text.parse::<f64>() {
                Ok(v) => Some(Token::Float(v)),
                Err(_) => {
                    self.errors.push(SyntaxError::lexer(
                        format!("invalid float literal {text}"),
                        Span::new(start, self.pos),
                    ));
                    None
                }
            };
        }

        if self.peek().is_some_and(char::is_alphabetic) {
            return self.lex_duration(start, digits);
        }

        match digits.parse::<i64>() {
            Ok(v) => Some(Token::Int(v)),
            Err(_) => {
                self.errors.push(SyntaxError::lexer(
                    format!("invalid integer literal {digits}"),
                    Span::new(start, self.pos),
                ));
                None
            }
        }
    }

    fn lex_date_time(&mut self, start: usize, rest: &str) -> Option<Token> {
        if let Some(len) = date_time_len(rest) {
            self.pos = start + len;
            if !self.peek().is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.')) {
                return Some(Token::DateTime(self.source[start..self.pos].to_string()));
            }
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '+' | '-'))
        {
            self.bump();
        }
        self.errors.push(SyntaxError::lexer(
            format!("invalid date-time literal {}", &self.source[start..self.pos]),
            Span::new(start, self.pos),
        ));
        None
    }

    fn lex_duration(&mut self, start: usize, first: &'a str) -> Option<Token> {
        let mut parts = Vec::new();
        let mut digits = first;
        let mut ok = true;
        loop {
            let unit_start = self.pos;
            while self.peek().is_some_and(char::is_alphabetic) {
                self.bump();
            }
            let unit = &self.source[unit_start..self.pos];
            if !DURATION_UNITS.contains(&unit) {
                self.errors.push(SyntaxError::lexer(
                    format!("invalid duration unit \"{unit}\""),
                    Span::new(unit_start, self.pos),
                ));
                ok = false;
            }
            match digits.parse::<i64>() {
                Ok(magnitude) => parts.push(Duration {
                    magnitude,
                    unit: unit.to_string(),
                }),
                Err(_) => {
                    self.errors.push(SyntaxError::lexer(
                        format!("invalid duration magnitude {digits}"),
                        Span::new(start, self.pos),
                    ));
                    ok = false;
                }
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                break;
            }
            digits = self.take_digits();
            if !self.peek().is_some_and(char::is_alphabetic) {
                self.errors.push(SyntaxError::lexer(
                    "duration magnitude is missing a unit",
                    Span::new(start, self.pos),
                ));
                ok = false;
                break;
            }
        }
        ok.then_some(Token::Duration(parts))
    }

    fn lex_string(&mut self, start: usize) -> Token {
        let mut pieces = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    self.errors.push(SyntaxError::lexer(
                        "unterminated string literal",
                        Span::new(start, self.pos),
                    ));
                    break;
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    let esc_start = self.pos;
                    self.bump();
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('r') => text.push('\r'),
                        Some('t') => text.push('\t'),
                        Some(c @ ('\\' | '"' | '$')) => text.push(c),
                        Some(c) => {
                            self.errors.push(SyntaxError::lexer(
                                format!("invalid escape sequence \\{c}"),
                                Span::new(esc_start, self.pos),
                            ));
                        }
                        None => {}
                    }
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    if !text.is_empty() {
                        pieces.push(StrPiece::Text(std::mem::take(&mut text)));
                    }
                    let inner = self.tokenize(true);
                    pieces.push(StrPiece::Interpolated(inner));
                }
                Some(_) => {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
            }
        }
        if !text.is_empty() || pieces.is_empty() {
            pieces.push(StrPiece::Text(text));
        }
        Token::String(pieces)
    }

    fn lex_regex(&mut self, start: usize) -> Option<Token> {
        let mut body = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.errors.push(SyntaxError::lexer(
                        "unterminated regex literal",
                        Span::new(start, self.pos),
                    ));
                    return None;
                }
                Some('/') => {
                    self.bump();
                    return Some(Token::Regex(body));
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some('/') => {
                            self.bump();
                            body.push('/');
                        }
                        Some(c) if c != '\n' => {
                            self.bump();
                            body.push('\\');
                            body.push(c);
                        }
                        _ => body.push('\\'),
                    }
                }
                Some(_) => {
                    if let Some(c) = self.bump() {
                        body.push(c);
                    }
                }
            }
        }
    }
}

/// `YYYY-MM-D` at the start of `s`: the text commits to a date literal.
fn is_date_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    let digit = |i: usize| b.get(i).is_some_and(u8::is_ascii_digit);
    (0..4).all(digit)
        && b.get(4) == Some(&b'-')
        && digit(5)
        && digit(6)
        && b.get(7) == Some(&b'-')
        && digit(8)
}

/// Length of the RFC 3339 date or date-time at the start of `s`.
fn date_time_len(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    let number = |at: usize, len: usize| -> Option<u32> {
        let text = s.get(at..at + len)?;
        if text.bytes().all(|c| c.is_ascii_digit()) {
            text.parse().ok()
        } else {
            None
        }
    };
    let sep = |at: usize, c: u8| (b.get(at) == Some(&c)).then_some(());

    number(0, 4)?;
    sep(4, b'-')?;
    let month = number(5, 2)?;
    sep(7, b'-')?;
    let day = number(8, 2)?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if b.get(10) != Some(&b'T') {
        return Some(10);
    }

    let (hour, minute, second) = (number(11, 2)?, number(14, 2)?, number(17, 2)?);
    sep(13, b':')?;
    sep(16, b':')?;
    if hour > 23 || minute > 59 || second > 60 {
        return None;
    }
    let mut len = 19;
    if b.get(len) == Some(&b'.') {
        let frac = b.iter().skip(len + 1).take_while(|c| c.is_ascii_digit()).count();
        if frac == 0 {
            return None;
        }
        len += 1 + frac;
    }
    match b.get(len) {
        Some(b'Z') => Some(len + 1),
        Some(b'+' | b'-') => {
            let (h, m) = (number(len + 1, 2)?, number(len + 4, 2)?);
            sep(len + 3, b':')?;
            (h <= 23 && m <= 59).then_some(len + 6)
        }
        _ => None,
    }
}

/// A `/` starts a regex unless the previous token ends an operand.
fn regex_allowed(prev: Option<&Token>) -> bool {
    !matches!(
        prev,
        Some(
            Token::Ident(_)
                | Token::Int(_)
                | Token::Float(_)
                | Token::Duration(_)
                | Token::DateTime(_)
                | Token::String(_)
                | Token::Regex(_)
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
        )
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn lex_pipe_and_call() {
        let toks = kinds("data |> range(start: -1d)");
        assert_eq!(
            toks,
            vec![
                Token::Ident("data".into()),
                Token::PipeForward,
                Token::Ident("range".into()),
                Token::LParen,
                Token::Ident("start".into()),
                Token::Colon,
                Token::Minus,
                Token::Duration(vec![Duration { magnitude: 1, unit: "d".into() }]),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lex_numbers() {
        let toks = kinds("10 10.5 1h30m 2019-01-01T00:00:00Z");
        assert_eq!(toks[0], Token::Int(10));
        assert_eq!(toks[1], Token::Float(10.5));
        assert_eq!(
            toks[2],
            Token::Duration(vec![
                Duration { magnitude: 1, unit: "h".into() },
                Duration { magnitude: 30, unit: "m".into() },
            ])
        );
        assert_eq!(toks[3], Token::DateTime("2019-01-01T00:00:00Z".into()));
    }

    #[test]
    fn lex_keywords_and_arrows() {
        let toks = kinds("(r) => r._value > 1 and not exists r.x");
        assert!(toks.contains(&Token::Arrow));
        assert!(toks.contains(&Token::And));
        assert!(toks.contains(&Token::Not));
        assert!(toks.contains(&Token::Exists));
        let toks = kinds("(tables=<-) => tables");
        assert!(toks.contains(&Token::PipeReceive));
    }

    #[test]
    fn lex_string_escapes() {
        let toks = kinds(r#""say \"hi\"\n\$""#);
        assert_eq!(toks[0], Token::String(vec![StrPiece::Text("say \"hi\"\n$".into())]));
    }

    #[test]
    fn lex_string_interpolation() {
        let toks = kinds(r#""value ${r._value} ok""#);
        let Token::String(pieces) = &toks[0] else {
            panic!("expected string, got {:?}", toks[0]);
        };
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], StrPiece::Text("value ".into()));
        assert!(matches!(&pieces[1], StrPiece::Interpolated(inner) if inner.len() == 3));
        assert_eq!(pieces[2], StrPiece::Text(" ok".into()));
    }

    #[test]
    fn lex_regex_versus_division() {
        let toks = kinds(r#"r.host =~ /^web\/\d+$/"#);
        assert_eq!(toks[4], Token::Regex(r"^web/\d+$".into()));
        let toks = kinds("a / 2");
        assert_eq!(toks[1], Token::Slash);
    }

    #[test]
    fn lex_regex_with_escaped_backslash() {
        let toks = kinds(r"r.path =~ /C:\\/");
        assert_eq!(toks[4], Token::Regex(r"C:\\".into()));
        let toks = kinds(r"x =~ /a\\\/b/");
        assert_eq!(toks[2], Token::Regex(r"a\\/b".into()));
    }

    #[test]
    fn lex_date_times() {
        let toks = kinds("2019-01-01 2019-01-01T00:00:00.5Z 2019-01-01T08:30:00-07:00");
        assert_eq!(toks[0], Token::DateTime("2019-01-01".into()));
        assert_eq!(toks[1], Token::DateTime("2019-01-01T00:00:00.5Z".into()));
        assert_eq!(toks[2], Token::DateTime("2019-01-01T08:30:00-07:00".into()));
    }

    #[test]
    fn lex_year_minus_number_is_subtraction() {
        let toks = kinds("x = 2019-1");
        assert_eq!(toks[2..5], [Token::Int(2019), Token::Minus, Token::Int(1)]);
        let toks = kinds("2019-12");
        assert_eq!(toks[..3], [Token::Int(2019), Token::Minus, Token::Int(12)]);
    }

    #[test]
    fn lex_malformed_date_time() {
        for source in ["x = 2019-99-99xyz", "x = 2019-01-01xyz", "x = 2019-01-01T00:00:00"] {
            let (tokens, errors) = lex(source);
            assert_eq!(errors.len(), 1, "{source}");
            assert!(errors[0].message.starts_with("invalid date-time literal"), "{source}");
            assert!(!tokens.iter().any(|t| matches!(t.token, Token::DateTime(_))));
        }
    }

    #[test]
    fn lex_comments_and_newlines() {
        let (tokens, errors) = lex("a = 1 // one\nb = 2");
        assert!(errors.is_empty());
        assert!(tokens[0].newline_before);
        assert!(!tokens[1].newline_before);
        assert!(tokens[3].newline_before);
        assert_eq!(tokens[3].token, Token::Ident("b".into()));
    }

    #[test]
    fn lex_reports_errors_and_continues() {
        let (tokens, errors) = lex("a = 1 @ 2 # 3");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains('@'));
        assert!(errors[1].message.contains('#'));
        // The surrounding tokens are still produced.
        assert!(tokens.iter().any(|t| t.token == Token::Int(3)));
    }

    #[test]
    fn lex_unterminated_string() {
        let (_, errors) = lex("x = \"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "unterminated string literal");
    }

    #[test]
    fn lex_bad_duration_unit() {
        let (_, errors) = lex("x = 5q");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("invalid duration unit"));
    }
}
