//! Canonical text rendering of Flux ASTs.
//!
//! The output is deterministic and re-parses to the same tree: formatting the
//! result of parsing formatted text yields that text again.

use std::fmt::Write;

use super::ast::*;

/// Render a whole package as one script.
///
/// Flux only accepts imports at the top of a script, so the imports of every
/// file are hoisted above the first statement, in file order and without
/// duplicates. File bodies follow in order as one statement list, so the
/// result formats the same after being parsed back as a single file.
pub fn format_package(package: &Package) -> String {
    let mut f = Formatter::default();

    let name = package
        .package
        .as_ref()
        .or_else(|| package.files.iter().find_map(|file| file.package.as_ref()));
    if let Some(name) = name {
        f.write(&format!("package {name}"));
        f.blank_line();
    }

    let mut imports: Vec<&ImportDeclaration> = Vec::new();
    for import in package.files.iter().flat_map(|file| &file.imports) {
        if !imports.contains(&import) {
            imports.push(import);
        }
    }
    f.format_imports(imports);

    f.format_statements(package.files.iter().flat_map(|file| &file.body));

    f.finish()
}

/// Render a single file.
pub fn format_file(file: &File) -> String {
    let mut f = Formatter::default();
    if let Some(name) = &file.package {
        f.write(&format!("package {name}"));
        f.blank_line();
    }
    f.format_imports(file.imports.iter().collect());
    f.format_statements(&file.body);
    f.finish()
}

/// Render a single expression.
pub fn format_expression(expr: &Expression) -> String {
    let mut f = Formatter::default();
    f.format_expr(expr);
    f.finish()
}

// Binding strength, loosest first.
const PREC_FUNCTION: u8 = 0;
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_COMPARISON: u8 = 4;
const PREC_ADDITIVE: u8 = 5;
const PREC_MULTIPLICATIVE: u8 = 6;
const PREC_POWER: u8 = 7;
const PREC_PIPE: u8 = 8;
const PREC_UNARY: u8 = 9;
const PREC_POSTFIX: u8 = 10;
const PREC_PRIMARY: u8 = 11;

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Function(_) => PREC_FUNCTION,
        Expression::Logical { op: LogicalOp::Or, .. } => PREC_OR,
        Expression::Logical { op: LogicalOp::And, .. } => PREC_AND,
        Expression::Unary { op: UnaryOp::Not | UnaryOp::Exists, .. } => PREC_NOT,
        Expression::Unary { .. } => PREC_UNARY,
        Expression::Binary { op, .. } => binary_precedence(*op),
        Expression::Pipe { .. } => PREC_PIPE,
        Expression::Member(_) | Expression::Index { .. } | Expression::Call(_) => PREC_POSTFIX,
        // A negative literal renders with a leading minus and re-parses as
        // unary negation.
        Expression::Integer(v) if *v < 0 => PREC_UNARY,
        Expression::Float(v) if v.is_sign_negative() => PREC_UNARY,
        _ => PREC_PRIMARY,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::RegexMatch
        | BinaryOp::RegexNotMatch => PREC_COMPARISON,
        BinaryOp::Add | BinaryOp::Sub => PREC_ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => PREC_MULTIPLICATIVE,
        BinaryOp::Pow => PREC_POWER,
    }
}

#[derive(Default)]
struct Formatter {
    out: String,
    indent: usize,
}

impl Formatter {
    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn blank_line(&mut self) {
        self.out.push_str("\n\n");
    }

    fn format_imports(&mut self, imports: Vec<&ImportDeclaration>) {
        if imports.is_empty() {
            return;
        }
        for (i, import) in imports.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.write("import ");
            if let Some(alias) = &import.alias {
                self.write(alias);
                self.write(" ");
            }
            self.format_string_literal(&import.path);
        }
        self.blank_line();
    }

    fn format_statements<'s>(&mut self, body: impl IntoIterator<Item = &'s Statement>) {
        for (i, stmt) in body.into_iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.format_statement(stmt);
        }
    }

    fn format_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Variable(assign) => self.format_variable(assign),
            Statement::Option(Assignment::Variable(assign)) => {
                self.write("option ");
                self.format_variable(assign);
            }
            Statement::Option(Assignment::Member { member, init }) => {
                self.write("option ");
                self.format_member(member);
                self.write(" = ");
                self.format_expr(init);
            }
            Statement::Return(expr) => {
                self.write("return ");
                self.format_expr(expr);
            }
            Statement::Expression(expr) => self.format_expr(expr),
        }
    }

    fn format_variable(&mut self, assign: &VariableAssignment) {
        self.write(&assign.id);
        self.write(" = ");
        self.format_expr(&assign.init);
    }

    /// Format `expr`, parenthesized if it binds looser than `min`.
    fn format_operand(&mut self, expr: &Expression, min: u8) {
        if precedence(expr) < min {
            self.write("(");
            self.format_expr(expr);
            self.write(")");
        } else {
            self.format_expr(expr);
        }
    }

    fn format_expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Identifier(name) => self.write(name),
            Expression::Member(member) => self.format_member(member),
            Expression::Index { array, index } => {
                self.format_operand(array, PREC_POSTFIX);
                self.write("[");
                self.format_expr(index);
                self.write("]");
            }
            Expression::Call(call) => self.format_call(call),
            Expression::Pipe { argument, call } => {
                self.format_operand(argument, PREC_PIPE);
                self.write(" |> ");
                self.format_call(call);
            }
            Expression::Function(func) => self.format_function(func),
            Expression::Binary { op, left, right } => {
                let prec = binary_precedence(*op);
                self.format_operand(left, prec);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.format_operand(right, prec + 1);
            }
            Expression::Logical { op, left, right } => {
                let prec = precedence(expr);
                self.format_operand(left, prec);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.format_operand(right, prec + 1);
            }
            Expression::Unary { op, argument } => {
                self.write(op.as_str());
                self.format_operand(argument, precedence(expr));
            }
            Expression::Object(obj) => {
                self.write("{");
                if let Some(with) = &obj.with {
                    self.write(with);
                    self.write(" with ");
                }
                self.format_properties(&obj.properties);
                self.write("}");
            }
            Expression::Array(elements) => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.format_expr(element);
                }
                self.write("]");
            }
            Expression::StringLit(s) => self.format_string_literal(s),
            Expression::StringExpr(parts) => {
                self.write("\"");
                for part in parts {
                    match part {
                        StringPart::Text(text) => self.write(&escape_string(text)),
                        StringPart::Interpolated(inner) => {
                            self.write("${");
                            self.format_expr(inner);
                            self.write("}");
                        }
                    }
                }
                self.write("\"");
            }
            Expression::Integer(v) => self.write(&v.to_string()),
            Expression::Float(v) => self.write(&format_float(*v)),
            Expression::Duration(parts) => {
                for part in parts {
                    let _ = write!(self.out, "{}{}", part.magnitude, part.unit);
                }
            }
            Expression::DateTime(text) => self.write(text),
            Expression::Regex(body) => {
                self.write("/");
                self.write(&body.replace('/', "\\/"));
                self.write("/");
            }
            Expression::PipeLit => self.write("<-"),
        }
    }

    fn format_member(&mut self, member: &MemberExpression) {
        self.format_operand(&member.object, PREC_POSTFIX);
        match &member.property {
            PropertyKey::Identifier(name) => {
                self.write(".");
                self.write(name);
            }
            PropertyKey::String(key) => {
                self.write("[");
                self.format_string_literal(key);
                self.write("]");
            }
        }
    }

    fn format_call(&mut self, call: &CallExpression) {
        self.format_operand(&call.callee, PREC_POSTFIX);
        self.write("(");
        if let Some(args) = &call.arguments {
            self.format_properties(&args.properties);
        }
        self.write(")");
    }

    fn format_function(&mut self, func: &FunctionExpression) {
        self.write("(");
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(param.key.name());
            if let Some(default) = &param.value {
                self.write("=");
                self.format_expr(default);
            }
        }
        self.write(") => ");
        match &func.body {
            FunctionBody::Expression(body) => {
                // An object body must be wrapped or it would read as a block.
                if matches!(body.as_ref(), Expression::Object(_)) {
                    self.write("(");
                    self.format_expr(body);
                    self.write(")");
                } else {
                    self.format_expr(body);
                }
            }
            FunctionBody::Block(stmts) => {
                self.write("{");
                self.indent += 1;
                for stmt in stmts {
                    self.newline();
                    self.format_statement(stmt);
                }
                self.indent -= 1;
                self.newline();
                self.write("}");
            }
        }
    }

    fn format_properties(&mut self, properties: &[Property]) {
        for (i, prop) in properties.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match &prop.key {
                PropertyKey::Identifier(name) => self.write(name),
                PropertyKey::String(key) => self.format_string_literal(key),
            }
            if let Some(value) = &prop.value {
                self.write(": ");
                self.format_expr(value);
            }
        }
    }

    fn format_string_literal(&mut self, s: &str) {
        self.write("\"");
        self.write(&escape_string(s));
        self.write("\"");
    }
}

/// Escape text for a double-quoted Flux string.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

/// Floats always carry a decimal point so they re-parse as floats.
fn format_float(v: f64) -> String {
    let s = v.to_string();
    if s.contains('.') || !v.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}
