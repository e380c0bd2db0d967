//! AST node types for the Flux pipeline language.
//!
//! The node set is closed: every construct the parser produces or the check
//! builders emit is one of the variants below. Nodes carry no source spans;
//! positions only matter for syntax errors, which the parser reports
//! separately.

/// A set of files that are rendered together as one script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    /// Name from a `package` clause, if any file declared one.
    pub package: Option<String>,
    pub files: Vec<File>,
}

/// One source file: imports followed by statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    pub name: String,
    pub package: Option<String>,
    pub imports: Vec<ImportDeclaration>,
    pub body: Vec<Statement>,
}

/// `import "path"` or `import alias "path"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`
    Variable(VariableAssignment),
    /// `option name = expr` or `option a.b = expr`
    Option(Assignment),
    /// `return expr` (only meaningful inside a function block)
    Return(Expression),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableAssignment {
    pub id: String,
    pub init: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Variable(VariableAssignment),
    /// `object.property = init`
    Member {
        member: MemberExpression,
        init: Expression,
    },
}

/// The key of an object property or member access.
///
/// Keys that are valid identifiers render bare (`r._value`, `{a: 1}`); any
/// other key renders as a string literal (`r["host-name"]`, `{"a b": 1}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKey {
    Identifier(String),
    String(String),
}

impl PropertyKey {
    /// Picks the identifier form when `key` is a valid Flux identifier.
    pub fn for_name(key: &str) -> Self {
        if is_identifier(key) {
            PropertyKey::Identifier(key.to_string())
        } else {
            PropertyKey::String(key.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PropertyKey::Identifier(s) | PropertyKey::String(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    /// `None` for shorthand properties (`{a, b}`) and parameters without defaults.
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: PropertyKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    /// Flux calls take a single object of named arguments.
    pub arguments: Option<ObjectExpression>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectExpression {
    /// `{r with ...}`
    pub with: Option<String>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub params: Vec<Property>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expression(Box<Expression>),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Text(String),
    Interpolated(Expression),
}

/// One `<magnitude><unit>` pair of a duration literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duration {
    pub magnitude: i64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    Member(MemberExpression),
    Index {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    Call(CallExpression),
    Pipe {
        argument: Box<Expression>,
        call: CallExpression,
    },
    Function(FunctionExpression),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Expression>,
    },
    Object(ObjectExpression),
    Array(Vec<Expression>),
    StringLit(String),
    /// String with `${...}` interpolation.
    StringExpr(Vec<StringPart>),
    Integer(i64),
    Float(f64),
    Duration(Vec<Duration>),
    /// RFC 3339 timestamp, kept as written.
    DateTime(String),
    /// Regex body without the surrounding slashes.
    Regex(String),
    /// `<-` in a parameter default.
    PipeLit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    RegexMatch,
    RegexNotMatch,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::RegexMatch => "=~",
            BinaryOp::RegexNotMatch => "!~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    Exists,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "not ",
            UnaryOp::Exists => "exists ",
        }
    }
}

impl From<MemberExpression> for Expression {
    fn from(member: MemberExpression) -> Self {
        Expression::Member(member)
    }
}

impl From<CallExpression> for Expression {
    fn from(call: CallExpression) -> Self {
        Expression::Call(call)
    }
}

impl From<ObjectExpression> for Expression {
    fn from(object: ObjectExpression) -> Self {
        Expression::Object(object)
    }
}

impl From<FunctionExpression> for Expression {
    fn from(func: FunctionExpression) -> Self {
        Expression::Function(func)
    }
}

impl From<VariableAssignment> for Statement {
    fn from(assign: VariableAssignment) -> Self {
        Statement::Variable(assign)
    }
}

pub const KEYWORDS: &[&str] = &[
    "and", "or", "not", "exists", "import", "package", "option", "return",
];

/// True if `s` can be written as a bare Flux identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&s)
}
