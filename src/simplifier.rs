//! Expression simplifier: constant-folds numeric/string literal subtrees
//! before emission (§4.2.1, §8.2 "folding laws").
//!
//! A pure AST → AST rewrite, run once over the whole program before the
//! compiler walks it. Folding only ever replaces a node with a cheaper
//! equivalent of the same shape, so it never changes a program's bytecode
//! stack-top semantics (§8.2: folding `a op b` must equal evaluating the
//! unfolded tree).

use crate::ast::{BinOp, Expr, Program, Stmt};

pub fn simplify_program(program: &mut Program) {
    simplify_stmts(&mut program.stmts);
}

fn simplify_stmts(stmts: &mut [Stmt]) {
    for s in stmts {
        simplify_stmt(s);
    }
}

fn simplify_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::Let { value, .. } => simplify_expr(value),
        Stmt::FuncDecl { body, .. } | Stmt::ClassDecl { body, .. } => simplify_stmts(body),
        Stmt::ExceptionDecl { .. } => {}
        Stmt::ExprStmt(e) => simplify_expr(e),
        Stmt::Return(Some(e), _) => simplify_expr(e),
        Stmt::Return(None, _) | Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::If {
            arms, else_body, ..
        } => {
            for (cond, body) in arms {
                simplify_expr(cond);
                simplify_stmts(body);
            }
            if let Some(body) = else_body {
                simplify_stmts(body);
            }
        }
        Stmt::While { cond, body, .. } => {
            simplify_expr(cond);
            simplify_stmts(body);
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
            ..
        } => {
            if let Some(init) = init {
                simplify_stmt(init);
            }
            if let Some(cond) = cond {
                simplify_expr(cond);
            }
            if let Some(step) = step {
                simplify_stmt(step);
            }
            simplify_stmts(body);
        }
        Stmt::TryCatch { body, catches, .. } => {
            simplify_stmts(body);
            for c in catches {
                if let Some(sel) = &mut c.selector {
                    simplify_expr(sel);
                }
                simplify_stmts(&mut c.body);
            }
        }
        Stmt::Raise { value, .. } => simplify_expr(value),
    }
}

fn simplify_expr(expr: &mut Expr) {
    match expr {
        Expr::NumberLit(..) | Expr::StringLit(..) | Expr::NullLit(_) | Expr::Ident(..) => {}
        Expr::ListLit(items, _) | Expr::SetLit(items, _) => {
            for e in items {
                simplify_expr(e);
            }
        }
        Expr::MapLit(entries, _) => {
            for (k, v) in entries {
                simplify_expr(k);
                simplify_expr(v);
            }
        }
        Expr::Unary { expr: inner, negate, not, line } => {
            simplify_expr(inner);
            if let Expr::NumberLit(n, _) = inner.as_ref() {
                if *negate {
                    *expr = Expr::NumberLit(-n, *line);
                } else if *not {
                    *expr = Expr::NumberLit(if *n == 0.0 { 1.0 } else { 0.0 }, *line);
                }
            }
        }
        Expr::Binary { op, lhs, rhs, line } => {
            simplify_expr(lhs);
            simplify_expr(rhs);
            if let Some(folded) = fold_binary(*op, lhs, rhs, *line) {
                *expr = folded;
            }
        }
        Expr::Attribute { target, .. } => simplify_expr(target),
        Expr::Index { target, index, .. } => {
            simplify_expr(target);
            simplify_expr(index);
        }
        Expr::Call { callee, args, .. } => {
            simplify_expr(callee);
            for a in args {
                simplify_expr(a);
            }
        }
        Expr::Assign { target, value, .. } => {
            simplify_expr(target);
            simplify_expr(value);
        }
        Expr::FuncExpr { body, .. } => simplify_stmts(body),
    }
}

/// Fold `lhs op rhs` when both sides are already literals. Returns `None`
/// (leave the node alone, to be lowered normally) for anything that isn't a
/// pure numeric/string literal combination — in particular division, which
/// the simplifier never folds since `DivisionByZero` must surface as a
/// runtime exception rather than a compile-time failure (§7).
fn fold_binary(op: BinOp, lhs: &Expr, rhs: &Expr, line: u32) -> Option<Expr> {
    use BinOp::*;
    match (lhs, rhs) {
        (Expr::NumberLit(a, _), Expr::NumberLit(b, _)) => {
            let (a, b) = (*a, *b);
            let n = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Mod => {
                    if b == 0.0 {
                        return None;
                    }
                    ((a as i32).wrapping_rem(b as i32)) as f64
                }
                Pow => a.powf(b),
                BitAnd => ((a as i32) & (b as i32)) as f64,
                BitOr => ((a as i32) | (b as i32)) as f64,
                BitXor => ((a as i32) ^ (b as i32)) as f64,
                Shl => ((a as i32).wrapping_shl(b as u32 & 31)) as f64,
                Shr => ((a as i32).wrapping_shr(b as u32 & 31)) as f64,
                Gt => return Some(Expr::NumberLit(bool_num(a > b), line)),
                Ge => return Some(Expr::NumberLit(bool_num(a >= b), line)),
                Lt => return Some(Expr::NumberLit(bool_num(a < b), line)),
                Le => return Some(Expr::NumberLit(bool_num(a <= b), line)),
                Eq => return Some(Expr::NumberLit(bool_num(a == b), line)),
                Div | LogicalAnd | LogicalOr => return None,
            };
            Some(Expr::NumberLit(n, line))
        }
        (Expr::StringLit(a, _), Expr::StringLit(b, _)) => match op {
            Add => Some(Expr::StringLit(format!("{a}{b}"), line)),
            Eq => Some(Expr::NumberLit(bool_num(a == b), line)),
            _ => None,
        },
        _ => None,
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
