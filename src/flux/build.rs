//! Small constructors for AST nodes.
//!
//! Every function here is pure and total (except [`pipe`], see its docs).
//! The check builders compose scripts exclusively through these, so the
//! shape of generated code is decided in one place.

use super::ast::{
    BinaryOp, CallExpression, Expression, File, FunctionBody, FunctionExpression,
    ImportDeclaration, LogicalOp, MemberExpression, ObjectExpression, Property, PropertyKey,
    Statement, VariableAssignment,
};

pub fn identifier(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

/// `object.property`, e.g. `member("r", "_value")`.
pub fn member(object: &str, property: &str) -> MemberExpression {
    MemberExpression {
        object: Box::new(identifier(object)),
        property: PropertyKey::for_name(property),
    }
}

pub fn binary(op: BinaryOp, lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(lhs.into()),
        right: Box::new(rhs.into()),
    }
}

pub fn greater_than(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Gt, lhs, rhs)
}

pub fn less_than(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Lt, lhs, rhs)
}

pub fn and(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Expression {
    Expression::Logical {
        op: LogicalOp::And,
        left: Box::new(lhs.into()),
        right: Box::new(rhs.into()),
    }
}

pub fn string(value: &str) -> Expression {
    Expression::StringLit(value.to_string())
}

pub fn float(value: f64) -> Expression {
    Expression::Float(value)
}

/// Parameter list without defaults: `(r, check)`.
pub fn function_params(names: &[&str]) -> Vec<Property> {
    names
        .iter()
        .map(|name| Property {
            key: PropertyKey::for_name(name),
            value: None,
        })
        .collect()
}

/// `(params) => body`
pub fn function(params: Vec<Property>, body: impl Into<Expression>) -> FunctionExpression {
    FunctionExpression {
        params,
        body: FunctionBody::Expression(Box::new(body.into())),
    }
}

/// `name = init`
pub fn define_variable(name: &str, init: impl Into<Expression>) -> Statement {
    VariableAssignment {
        id: name.to_string(),
        init: init.into(),
    }
    .into()
}

pub fn property(key: &str, value: impl Into<Expression>) -> Property {
    Property {
        key: PropertyKey::for_name(key),
        value: Some(value.into()),
    }
}

pub fn object(properties: Vec<Property>) -> ObjectExpression {
    ObjectExpression {
        with: None,
        properties,
    }
}

pub fn call(callee: impl Into<Expression>, arguments: ObjectExpression) -> CallExpression {
    CallExpression {
        callee: Box::new(callee.into()),
        arguments: Some(arguments),
    }
}

/// Chains `base |> calls[0] |> calls[1] ...`.
///
/// # Panics
///
/// Panics if `calls` is empty. A pipe with no destination is not an
/// expression, and every caller in this crate passes at least one call.
pub fn pipe(
    base: impl Into<Expression>,
    calls: impl IntoIterator<Item = CallExpression>,
) -> Expression {
    let mut calls = calls.into_iter().peekable();
    assert!(
        calls.peek().is_some(),
        "pipe requires at least one call expression"
    );
    calls.fold(base.into(), |argument, call| Expression::Pipe {
        argument: Box::new(argument),
        call,
    })
}

pub fn expression_statement(expr: impl Into<Expression>) -> Statement {
    Statement::Expression(expr.into())
}

pub fn import_declaration(path: &str) -> ImportDeclaration {
    ImportDeclaration {
        alias: None,
        path: path.to_string(),
    }
}

pub fn imports(paths: &[&str]) -> Vec<ImportDeclaration> {
    paths.iter().copied().map(import_declaration).collect()
}

pub fn file(name: &str, imports: Vec<ImportDeclaration>, body: Vec<Statement>) -> File {
    File {
        name: name.to_string(),
        package: None,
        imports,
        body,
    }
}
