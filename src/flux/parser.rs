use super::ast::*;
use super::error::{Span, SyntaxError};
use super::lexer::{SpannedToken, StrPiece, Token};

/// Parse a token stream into a file. Every error is collected; the parser
/// resynchronizes at the next line and keeps going, so the returned file
/// holds whatever statements parsed cleanly.
pub fn parse(tokens: Vec<SpannedToken>) -> (File, Vec<SyntaxError>) {
    let mut parser = Parser::new(tokens);
    let file = parser.parse_file();
    (file, parser.errors)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(mut tokens: Vec<SpannedToken>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.token == Token::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(SpannedToken {
                token: Token::Eof,
                span: Span::new(end, end),
                newline_before: true,
            });
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn parse_file(&mut self) -> File {
        let mut file = File::default();

        if matches!(self.peek(), Token::Package) {
            self.advance();
            match self.expect_ident() {
                Ok((name, _)) => file.package = Some(name),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_next_line();
                }
            }
        }

        while matches!(self.peek(), Token::Import) {
            match self.parse_import() {
                Ok(import) => file.imports.push(import),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_next_line();
                }
            }
        }

        while !self.at_eof() {
            if matches!(self.peek(), Token::Import) {
                self.errors.push(SyntaxError::parser(
                    "import declarations must come before any statements",
                    self.span(),
                ));
                self.recover_to_next_line();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => file.body.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_next_line();
                }
            }
        }

        file
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |t| &t.token)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).map_or(&Token::Eof, |t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens.get(self.pos).map_or(Span::default(), |t| t.span)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, SyntaxError> {
        if self.peek() == expected {
            let sp = self.span();
            self.advance();
            Ok(sp)
        } else {
            Err(self.unexpected(&describe(expected)))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), SyntaxError> {
        if let Token::Ident(name) = self.peek().clone() {
            let sp = self.span();
            self.advance();
            Ok((name, sp))
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::parser(
            format!("expected {expected}, got {}", describe(self.peek())),
            self.span(),
        )
    }

    /// Skip the offending token, then everything up to the next line break.
    fn recover_to_next_line(&mut self) {
        self.advance();
        while !self.at_eof() && !self.tokens.get(self.pos).is_some_and(|t| t.newline_before) {
            self.advance();
        }
    }

    // ── Declarations ──────────────────────────────────────────────

    fn parse_import(&mut self) -> Result<ImportDeclaration, SyntaxError> {
        self.expect(&Token::Import)?;
        let alias = match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let path = self.expect_plain_string()?;
        Ok(ImportDeclaration { alias, path })
    }

    fn expect_plain_string(&mut self) -> Result<String, SyntaxError> {
        if let Token::String(pieces) = self.peek() {
            if let [StrPiece::Text(text)] = pieces.as_slice() {
                let text = text.clone();
                self.advance();
                return Ok(text);
            }
            return Err(SyntaxError::parser(
                "string interpolation is not allowed here",
                self.span(),
            ));
        }
        Err(self.unexpected("string literal"))
    }

    // ── Statements ────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek() {
            Token::Option => {
                self.advance();
                let (name, name_span) = self.expect_ident()?;
                if matches!(self.peek(), Token::Dot) {
                    self.advance();
                    let (property, _) = self.expect_ident()?;
                    self.expect(&Token::Assign)?;
                    let init = self.parse_expr()?;
                    let member = MemberExpression {
                        object: Box::new(Expression::Identifier(name)),
                        property: PropertyKey::Identifier(property),
                    };
                    Ok(Statement::Option(Assignment::Member { member, init }))
                } else {
                    if !matches!(self.peek(), Token::Assign) {
                        return Err(SyntaxError::parser(
                            format!("expected '=' after option {name}"),
                            name_span,
                        ));
                    }
                    self.advance();
                    let init = self.parse_expr()?;
                    Ok(Statement::Option(Assignment::Variable(VariableAssignment {
                        id: name,
                        init,
                    })))
                }
            }
            Token::Return => {
                self.advance();
                Ok(Statement::Return(self.parse_expr()?))
            }
            Token::Ident(name) if matches!(self.peek_nth(1), Token::Assign) => {
                let id = name.clone();
                self.advance();
                self.advance();
                let init = self.parse_expr()?;
                Ok(Statement::Variable(VariableAssignment { id, init }))
            }
            _ => Ok(Statement::Expression(self.parse_expr()?)),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        while !matches!(self.peek(), Token::RBrace | Token::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(body)
    }

    // ── Expressions (lowest to highest precedence) ────────────────

    fn parse_expr(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_logical_unary()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_logical_unary()?;
            left = Expression::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_unary(&mut self) -> Result<Expression, SyntaxError> {
        let op = match self.peek() {
            Token::Not => UnaryOp::Not,
            Token::Exists => UnaryOp::Exists,
            _ => return self.parse_comparison(),
        };
        self.advance();
        let argument = self.parse_logical_unary()?;
        Ok(Expression::Unary {
            op,
            argument: Box::new(argument),
        })
    }

    fn parse_comparison(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::RegexEq => BinaryOp::RegexMatch,
                Token::RegexNe => BinaryOp::RegexNotMatch,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_pipe()?;
        while matches!(self.peek(), Token::Caret) {
            self.advance();
            let right = self.parse_pipe()?;
            left = binary(BinaryOp::Pow, left, right);
        }
        Ok(left)
    }

    fn parse_pipe(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek(), Token::PipeForward) {
            self.advance();
            let dest_span = self.span();
            match self.parse_unary()? {
                Expression::Call(call) => {
                    left = Expression::Pipe {
                        argument: Box::new(left),
                        call,
                    };
                }
                _ => {
                    return Err(SyntaxError::parser(
                        "pipe destination must be a function call",
                        dest_span,
                    ));
                }
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, SyntaxError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let argument = self.parse_unary()?;
        Ok(Expression::Unary {
            op,
            argument: Box::new(argument),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let (property, _) = self.expect_ident()?;
                    expr = Expression::Member(MemberExpression {
                        object: Box::new(expr),
                        property: PropertyKey::Identifier(property),
                    });
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = match index {
                        Expression::StringLit(key) => Expression::Member(MemberExpression {
                            object: Box::new(expr),
                            property: PropertyKey::String(key),
                        }),
                        index => Expression::Index {
                            array: Box::new(expr),
                            index: Box::new(index),
                        },
                    };
                }
                Token::LParen => {
                    self.advance();
                    let arguments = if matches!(self.peek(), Token::RParen) {
                        None
                    } else {
                        Some(self.parse_object_body(None, &Token::RParen)?)
                    };
                    self.expect(&Token::RParen)?;
                    expr = Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(Expression::Identifier(name))
            }
            Token::Int(v) => {
                self.advance();
                Ok(Expression::Integer(v))
            }
            Token::Float(v) => {
                self.advance();
                Ok(Expression::Float(v))
            }
            Token::Duration(parts) => {
                self.advance();
                Ok(Expression::Duration(parts))
            }
            Token::DateTime(text) => {
                self.advance();
                Ok(Expression::DateTime(text))
            }
            Token::Regex(body) => {
                self.advance();
                Ok(Expression::Regex(body))
            }
            Token::String(pieces) => {
                self.advance();
                self.string_expression(pieces)
            }
            Token::LBracket => self.parse_array(),
            Token::LBrace => {
                self.advance();
                let with = match (self.peek(), self.peek_nth(1)) {
                    (Token::Ident(name), Token::Ident(kw)) if kw == "with" => {
                        let name = name.clone();
                        self.advance();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                let object = self.parse_object_body(with, &Token::RBrace)?;
                self.expect(&Token::RBrace)?;
                Ok(Expression::Object(object))
            }
            Token::LParen if self.is_function_literal() => self.parse_function(),
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn string_expression(&mut self, pieces: Vec<StrPiece>) -> Result<Expression, SyntaxError> {
        if let [StrPiece::Text(text)] = pieces.as_slice() {
            return Ok(Expression::StringLit(text.clone()));
        }
        let mut parts = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                StrPiece::Text(text) => parts.push(StringPart::Text(text)),
                StrPiece::Interpolated(tokens) => {
                    let mut inner = Parser::new(tokens);
                    let expr = inner.parse_expr();
                    if expr.is_ok() && !inner.at_eof() {
                        inner.errors.push(inner.unexpected("'}'"));
                    }
                    self.errors.append(&mut inner.errors);
                    parts.push(StringPart::Interpolated(expr?));
                }
            }
        }
        Ok(Expression::StringExpr(parts))
    }

    fn parse_array(&mut self) -> Result<Expression, SyntaxError> {
        self.expect(&Token::LBracket)?;
        let mut elements = Vec::new();
        while !matches!(self.peek(), Token::RBracket) {
            elements.push(self.parse_expr()?);
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(Expression::Array(elements))
    }

    /// Properties up to (not including) `close`, comma separated.
    fn parse_object_body(
        &mut self,
        with: Option<String>,
        close: &Token,
    ) -> Result<ObjectExpression, SyntaxError> {
        let mut properties = Vec::new();
        while self.peek() != close {
            let key = match self.peek() {
                Token::Ident(name) => PropertyKey::Identifier(name.clone()),
                Token::String(_) => PropertyKey::String(self.expect_plain_string()?),
                _ => return Err(self.unexpected("property key")),
            };
            if matches!(key, PropertyKey::Identifier(_)) {
                self.advance();
            }
            let value = if matches!(self.peek(), Token::Colon) {
                self.advance();
                Some(self.parse_expr()?)
            } else if matches!(key, PropertyKey::Identifier(_)) {
                None
            } else {
                return Err(self.unexpected("':'"));
            };
            properties.push(Property { key, value });
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(ObjectExpression { with, properties })
    }

    /// At `(`: does the matching `)` precede `=>`?
    fn is_function_literal(&self) -> bool {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(self.pos) {
            match tok.token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self
                            .tokens
                            .get(i + 1)
                            .is_some_and(|t| t.token == Token::Arrow);
                    }
                }
                Token::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_function(&mut self) -> Result<Expression, SyntaxError> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !matches!(self.peek(), Token::RParen) {
            let (name, _) = self.expect_ident()?;
            let value = if matches!(self.peek(), Token::Assign) {
                self.advance();
                if matches!(self.peek(), Token::PipeReceive) {
                    self.advance();
                    Some(Expression::PipeLit)
                } else {
                    Some(self.parse_expr()?)
                }
            } else {
                None
            };
            params.push(Property {
                key: PropertyKey::Identifier(name),
                value,
            });
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        self.expect(&Token::Arrow)?;
        let body = if matches!(self.peek(), Token::LBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expression(Box::new(self.parse_expr()?))
        };
        Ok(Expression::Function(FunctionExpression { params, body }))
    }
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Human-readable token name for error messages.
fn describe(token: &Token) -> String {
    match token {
        Token::Int(v) => format!("integer {v}"),
        Token::Float(v) => format!("float {v}"),
        Token::Duration(_) => "duration".to_string(),
        Token::DateTime(v) => format!("time {v}"),
        Token::String(_) => "string".to_string(),
        Token::Regex(_) => "regex".to_string(),
        Token::Ident(name) => format!("identifier {name}"),
        Token::And => "'and'".to_string(),
        Token::Or => "'or'".to_string(),
        Token::Not => "'not'".to_string(),
        Token::Exists => "'exists'".to_string(),
        Token::Import => "'import'".to_string(),
        Token::Package => "'package'".to_string(),
        Token::Option => "'option'".to_string(),
        Token::Return => "'return'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Colon => "':'".to_string(),
        Token::PipeForward => "'|>'".to_string(),
        Token::PipeReceive => "'<-'".to_string(),
        Token::Arrow => "'=>'".to_string(),
        Token::Assign => "'='".to_string(),
        Token::Eq => "'=='".to_string(),
        Token::Ne => "'!='".to_string(),
        Token::Lt => "'<'".to_string(),
        Token::Le => "'<='".to_string(),
        Token::Gt => "'>'".to_string(),
        Token::Ge => "'>='".to_string(),
        Token::RegexEq => "'=~'".to_string(),
        Token::RegexNe => "'!~'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}
