//! Free-variable analysis (§4.1).
//!
//! Walks a function/class body and returns the set of identifiers referenced
//! but not declared inside it — the compiler (§4.2.2) turns this into a
//! closure's capture list. `bound` is a stack of scopes; ordinary block
//! bodies (`if`/`while`/`try`) recurse *without* pushing a new scope (their
//! `let`s just extend the enclosing function-level scope, matching §4.1's
//! literal wording: only function/class bodies and `for` headers get a fresh
//! nesting level). Being slightly over-inclusive in what a closure captures
//! is harmless; under-inclusion would silently drop a capture, so the rule
//! favors the conservative direction where the spec leaves it underspecified.

use std::collections::HashSet;

use crate::ast::{Catch, Expr, Stmt};
use crate::builtins;

struct Analysis {
    /// One `HashSet` per nesting level; `bound[0]` is the function/class's
    /// own parameter scope.
    bound: Vec<HashSet<String>>,
    free: Vec<String>,
    free_set: HashSet<String>,
}

impl Analysis {
    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|scope| scope.contains(name))
    }

    fn bind(&mut self, name: &str) {
        self.bound
            .last_mut()
            .expect("at least one scope active")
            .insert(name.to_string());
    }

    fn occurrence(&mut self, name: &str) {
        if self.is_bound(name) || builtins::is_builtin(name) {
            return;
        }
        if self.free_set.insert(name.to_string()) {
            self.free.push(name.to_string());
        }
    }

    fn push_scope(&mut self) {
        self.bound.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.bound.pop();
    }

    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for s in stmts {
            self.walk_stmt(s);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, value, .. } => {
                self.walk_expr(value);
                self.bind(name);
            }
            Stmt::FuncDecl {
                name, params, body, ..
            } => {
                self.bind(name);
                self.walk_function(params, body);
            }
            Stmt::ClassDecl {
                name, params, body, ..
            } => {
                self.bind(name);
                self.walk_function(params, body);
            }
            Stmt::ExceptionDecl { name, .. } => {
                self.bind(name);
            }
            Stmt::ExprStmt(e) => self.walk_expr(e),
            Stmt::Return(Some(e), _) => self.walk_expr(e),
            Stmt::Return(None, _) | Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::If {
                arms, else_body, ..
            } => {
                for (cond, body) in arms {
                    self.walk_expr(cond);
                    self.walk_stmts(body);
                }
                if let Some(body) = else_body {
                    self.walk_stmts(body);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.walk_expr(cond);
                self.walk_stmts(body);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                // One shared scope across init/cond/step/body (§4.1 edge case):
                // the induction variable stays bound across the conditional and
                // step, so no prune happens between these four parts.
                self.push_scope();
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond);
                }
                self.walk_stmts(body);
                if let Some(step) = step {
                    self.walk_stmt(step);
                }
                self.pop_scope();
            }
            Stmt::TryCatch { body, catches, .. } => {
                self.walk_stmts(body);
                for Catch {
                    selector,
                    bind,
                    body,
                } in catches
                {
                    if let Some(sel) = selector {
                        self.walk_expr(sel);
                    }
                    self.push_scope();
                    if let Some(name) = bind {
                        self.bind(name);
                    }
                    self.walk_stmts(body);
                    self.pop_scope();
                }
            }
            Stmt::Raise { value, .. } => self.walk_expr(value),
        }
    }

    fn walk_function(&mut self, params: &[String], body: &[Stmt]) {
        self.push_scope();
        for p in params {
            self.bind(p);
        }
        self.walk_stmts(body);
        self.pop_scope();
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::NumberLit(..) | Expr::StringLit(..) | Expr::NullLit(_) => {}
            Expr::Ident(name, _) => self.occurrence(name),
            Expr::ListLit(items, _) | Expr::SetLit(items, _) => {
                for e in items {
                    self.walk_expr(e);
                }
            }
            Expr::MapLit(entries, _) => {
                for (k, v) in entries {
                    self.walk_expr(k);
                    self.walk_expr(v);
                }
            }
            Expr::Unary { expr, .. } => self.walk_expr(expr),
            Expr::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs);
                self.walk_expr(rhs);
            }
            Expr::Attribute { target, .. } => self.walk_expr(target),
            Expr::Index { target, index, .. } => {
                self.walk_expr(target);
                self.walk_expr(index);
            }
            Expr::Call { callee, args, .. } => {
                self.walk_expr(callee);
                for a in args {
                    self.walk_expr(a);
                }
            }
            Expr::Assign { target, value, .. } => {
                // The target's base identifier is an occurrence too (an
                // assignment reads the existing binding before mutating it,
                // via MUTATE_VAR/LOAD_INDEX/LOAD_ATTRIBUTE).
                self.walk_expr(target);
                self.walk_expr(value);
            }
            Expr::FuncExpr { params, body, .. } => self.walk_function(params, body),
        }
    }
}

/// Free variables of `body`, given it will run with `params` bound as its
/// own parameter scope (used for both function and class bodies — §4.2.5
/// compiles a class body "as if it were a parameterless function").
pub fn free_variables(params: &[String], body: &[Stmt]) -> Vec<String> {
    let mut a = Analysis {
        bound: Vec::new(),
        free: Vec::new(),
        free_set: HashSet::new(),
    };
    a.walk_function(params, body);
    a.free
}
