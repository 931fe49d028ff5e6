//! Abstract syntax tree produced by the parser (§1a.1 of the expanded spec).
//!
//! The compiler (`compiler.rs`) is the only consumer of this module; nothing
//! here is revisited once `Compiler::compile_program` has run.

/// Whether a `let`/`exception` declaration is reachable from outside its
/// enclosing class body (§4.2.5, §4.3.3 "public-access entries only").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        name: String,
        access: Access,
        value: Expr,
        line: u32,
    },
    FuncDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        line: u32,
    },
    ClassDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        line: u32,
    },
    ExceptionDecl {
        name: String,
        access: Access,
        line: u32,
    },
    ExprStmt(Expr),
    Return(Option<Expr>, u32),
    Break(u32),
    Continue(u32),
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        line: u32,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        line: u32,
    },
    TryCatch {
        body: Vec<Stmt>,
        catches: Vec<Catch>,
        line: u32,
    },
    Raise {
        value: Expr,
        line: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Catch {
    pub selector: Option<Expr>,
    pub bind: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    LogicalAnd,
    LogicalOr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    NumberLit(f64, u32),
    StringLit(String, u32),
    NullLit(u32),
    Ident(String, u32),
    ListLit(Vec<Expr>, u32),
    SetLit(Vec<Expr>, u32),
    MapLit(Vec<(Expr, Expr)>, u32),
    Unary {
        negate: bool,
        not: bool,
        expr: Box<Expr>,
        line: u32,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        line: u32,
    },
    Attribute {
        target: Box<Expr>,
        name: String,
        line: u32,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        line: u32,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        line: u32,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        line: u32,
    },
    FuncExpr {
        params: Vec<String>,
        body: Vec<Stmt>,
        line: u32,
    },
}

impl Expr {
    pub fn line(&self) -> u32 {
        match self {
            Expr::NumberLit(_, l)
            | Expr::StringLit(_, l)
            | Expr::NullLit(l)
            | Expr::Ident(_, l)
            | Expr::ListLit(_, l)
            | Expr::SetLit(_, l)
            | Expr::MapLit(_, l)
            | Expr::Unary { line: l, .. }
            | Expr::Binary { line: l, .. }
            | Expr::Attribute { line: l, .. }
            | Expr::Index { line: l, .. }
            | Expr::Call { line: l, .. }
            | Expr::Assign { line: l, .. }
            | Expr::FuncExpr { line: l, .. } => *l,
        }
    }
}
