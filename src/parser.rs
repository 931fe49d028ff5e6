//! Recursive-descent parser: token stream → [`ast::Program`] (§1a).
//!
//! One function per grammar production, precedence-climbing for binary
//! operators in the order fixed by §6.2: `||`, `&&`, equality, relational,
//! bitwise or/xor/and, shift, additive, multiplicative, power, unary `! -`,
//! then postfix `-> [...] (...)`. Not a grounding surface for this crate's
//! engineering interest (§1): a plain hand-written descent, no parser
//! generator, no lookahead beyond one token.

use crate::ast::*;
use crate::error::{CompileError, CompileResult};
use crate::lexer::{Lexer, Tok, Token};

pub fn parse(src: &str) -> CompileResult<Program> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut p = Parser { tokens, pos: 0 };
    let stmts = p.parse_stmts_until(&[Tok::Eof])?;
    Ok(Program { stmts })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn check(&self, tok: &Tok) -> bool {
        &self.cur().tok == tok
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: Tok) -> CompileResult<Token> {
        if self.check(&tok) {
            Ok(self.advance())
        } else {
            Err(CompileError::new(
                self.cur_line(),
                format!("expected {tok:?}, found {:?}", self.cur().tok),
            ))
        }
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.check(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> CompileResult<String> {
        match self.advance().tok {
            Tok::Ident(name) => Ok(name),
            other => Err(CompileError::new(
                self.cur_line(),
                format!("expected identifier, found {other:?}"),
            )),
        }
    }

    // --- Statements --------------------------------------------------

    fn parse_stmts_until(&mut self, terminators: &[Tok]) -> CompileResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !terminators.iter().any(|t| self.check(t)) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> CompileResult<Vec<Stmt>> {
        self.expect(Tok::LBrace)?;
        let stmts = self.parse_stmts_until(&[Tok::RBrace])?;
        self.expect(Tok::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        match &self.cur().tok {
            Tok::Let | Tok::Global => self.parse_let(Access::Public),
            Tok::Private => {
                self.advance();
                match self.cur().tok {
                    Tok::Let => self.parse_let(Access::Private),
                    Tok::Exception => self.parse_exception_decl(Access::Private),
                    _ => Err(CompileError::new(
                        line,
                        "'private' must precede 'let' or 'exception'",
                    )),
                }
            }
            Tok::Exception => self.parse_exception_decl(Access::Public),
            Tok::Func => self.parse_func_decl(),
            Tok::Class => self.parse_class_decl(),
            Tok::Return => {
                self.advance();
                if self.eat(&Tok::Semi) {
                    Ok(Stmt::Return(None, line))
                } else {
                    let e = self.parse_expr()?;
                    self.expect(Tok::Semi)?;
                    Ok(Stmt::Return(Some(e), line))
                }
            }
            Tok::Break => {
                self.advance();
                self.expect(Tok::Semi)?;
                Ok(Stmt::Break(line))
            }
            Tok::Continue => {
                self.advance();
                self.expect(Tok::Semi)?;
                Ok(Stmt::Continue(line))
            }
            Tok::If => self.parse_if(),
            Tok::While => self.parse_while(),
            Tok::For => self.parse_for(),
            Tok::Try => self.parse_try(),
            Tok::Raise => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(Tok::Semi)?;
                Ok(Stmt::Raise { value, line })
            }
            Tok::LBrace => {
                let body = self.parse_block()?;
                // A bare block is sugar for an `if (true)` with no else, reusing
                // the If-arm scoping/DEREF machinery rather than a new AST node.
                Ok(Stmt::If {
                    arms: vec![(Expr::NumberLit(1.0, line), body)],
                    else_body: None,
                    line,
                })
            }
            _ => {
                let e = self.parse_expr()?;
                self.expect(Tok::Semi)?;
                Ok(Stmt::ExprStmt(e))
            }
        }
    }

    fn parse_let(&mut self, access: Access) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'let' or 'global'
        let name = self.ident()?;
        self.expect(Tok::Eq)?;
        let value = self.parse_expr()?;
        self.expect(Tok::Semi)?;
        Ok(Stmt::Let {
            name,
            access,
            value,
            line,
        })
    }

    fn parse_exception_decl(&mut self, access: Access) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'exception'
        let name = self.ident()?;
        self.expect(Tok::Semi)?;
        Ok(Stmt::ExceptionDecl { name, access, line })
    }

    fn parse_params(&mut self) -> CompileResult<Vec<String>> {
        self.expect(Tok::LParen)?;
        let mut params = Vec::new();
        if !self.check(&Tok::RParen) {
            loop {
                params.push(self.ident()?);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RParen)?;
        Ok(params)
    }

    fn parse_func_decl(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'func'
        let name = self.ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::FuncDecl {
            name,
            params,
            body,
            line,
        })
    }

    fn parse_class_decl(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'class'
        let name = self.ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::ClassDecl {
            name,
            params,
            body,
            line,
        })
    }

    fn parse_if(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        let mut arms = Vec::new();
        let mut else_body = None;
        self.advance(); // 'if'
        self.expect(Tok::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Tok::RParen)?;
        let body = self.parse_block()?;
        arms.push((cond, body));
        loop {
            if self.check(&Tok::Else) {
                self.advance();
                if self.check(&Tok::If) {
                    self.advance();
                    self.expect(Tok::LParen)?;
                    let cond = self.parse_expr()?;
                    self.expect(Tok::RParen)?;
                    let body = self.parse_block()?;
                    arms.push((cond, body));
                    continue;
                } else {
                    else_body = Some(self.parse_block()?);
                    break;
                }
            }
            break;
        }
        Ok(Stmt::If {
            arms,
            else_body,
            line,
        })
    }

    fn parse_while(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'while'
        self.expect(Tok::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Tok::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, line })
    }

    fn parse_for(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'for'
        self.expect(Tok::LParen)?;
        let init = if self.check(&Tok::Semi) {
            None
        } else {
            Some(Box::new(self.parse_for_clause_stmt()?))
        };
        self.expect(Tok::Semi)?;
        let cond = if self.check(&Tok::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(Tok::Semi)?;
        let step = if self.check(&Tok::RParen) {
            None
        } else {
            Some(Box::new(Stmt::ExprStmt(self.parse_expr()?)))
        };
        self.expect(Tok::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
            line,
        })
    }

    /// The `init` clause of a `for` header: either `let x = ...` (no
    /// trailing `;` consumed here — the caller's `for` loop consumes the
    /// separator) or a bare expression statement.
    fn parse_for_clause_stmt(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        if self.check(&Tok::Let) {
            self.advance();
            let name = self.ident()?;
            self.expect(Tok::Eq)?;
            let value = self.parse_expr()?;
            Ok(Stmt::Let {
                name,
                access: Access::Public,
                value,
                line,
            })
        } else {
            Ok(Stmt::ExprStmt(self.parse_expr()?))
        }
    }

    fn parse_try(&mut self) -> CompileResult<Stmt> {
        let line = self.cur_line();
        self.advance(); // 'try'
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.check(&Tok::Catch) {
            self.advance();
            let (selector, bind) = if self.eat(&Tok::LParen) {
                let selector = self.parse_expr()?;
                let bind = if self.eat(&Tok::Comma) {
                    Some(self.ident()?)
                } else {
                    None
                };
                self.expect(Tok::RParen)?;
                (Some(selector), bind)
            } else {
                (None, None)
            };
            let catch_body = self.parse_block()?;
            catches.push(Catch {
                selector,
                bind,
                body: catch_body,
            });
        }
        if catches.is_empty() {
            return Err(CompileError::new(line, "'try' requires at least one 'catch'"));
        }
        Ok(Stmt::TryCatch {
            body,
            catches,
            line,
        })
    }

    // --- Expressions ---------------------------------------------------

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> CompileResult<Expr> {
        let lhs = self.parse_or()?;
        if self.check(&Tok::Eq) {
            let line = self.cur_line();
            self.advance();
            let value = self.parse_assign()?;
            match &lhs {
                Expr::Ident(..) | Expr::Attribute { .. } | Expr::Index { .. } => Ok(Expr::Assign {
                    target: Box::new(lhs),
                    value: Box::new(value),
                    line,
                }),
                _ => Err(CompileError::new(line, "invalid assignment target")),
            }
        } else {
            Ok(lhs)
        }
    }

    fn parse_or(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(&Tok::PipePipe) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = bin(BinOp::LogicalOr, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check(&Tok::AmpAmp) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = bin(BinOp::LogicalAnd, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_relational()?;
        while self.check(&Tok::EqEq) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = bin(BinOp::Eq, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = match self.cur().tok {
                Tok::Gt => BinOp::Gt,
                Tok::Ge => BinOp::Ge,
                Tok::Lt => BinOp::Lt,
                Tok::Le => BinOp::Le,
                _ => break,
            };
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_bitor()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_bitxor()?;
        while self.check(&Tok::Pipe) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_bitxor()?;
            lhs = bin(BinOp::BitOr, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_bitand()?;
        while self.check(&Tok::Caret) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_bitand()?;
            lhs = bin(BinOp::BitXor, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_shift()?;
        while self.check(&Tok::Amp) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = bin(BinOp::BitAnd, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.cur().tok {
                Tok::Shl => BinOp::Shl,
                Tok::Shr => BinOp::Shr,
                _ => break,
            };
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.cur().tok {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => break,
            };
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.cur().tok {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Mod,
                _ => break,
            };
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_power()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> CompileResult<Expr> {
        let lhs = self.parse_unary()?;
        if self.check(&Tok::StarStar) {
            let line = self.cur_line();
            self.advance();
            let rhs = self.parse_power()?; // right-associative
            Ok(bin(BinOp::Pow, lhs, rhs, line))
        } else {
            Ok(lhs)
        }
    }

    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let line = self.cur_line();
        if self.eat(&Tok::Bang) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                negate: false,
                not: true,
                expr: Box::new(expr),
                line,
            });
        }
        if self.eat(&Tok::Minus) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                negate: true,
                not: false,
                expr: Box::new(expr),
                line,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let line = self.cur_line();
            if self.eat(&Tok::Arrow) {
                let name = self.ident()?;
                expr = Expr::Attribute {
                    target: Box::new(expr),
                    name,
                    line,
                };
            } else if self.check(&Tok::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(Tok::RBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else if self.check(&Tok::LParen) {
                self.advance();
                let mut args = Vec::new();
                if !self.check(&Tok::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Tok::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    line,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let line = self.cur_line();
        match self.cur().tok.clone() {
            Tok::Number(n) => {
                self.advance();
                Ok(Expr::NumberLit(n, line))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(Expr::StringLit(s, line))
            }
            Tok::Null => {
                self.advance();
                Ok(Expr::NullLit(line))
            }
            Tok::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name, line))
            }
            Tok::Func => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expr::FuncExpr { params, body, line })
            }
            Tok::LParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Tok::RParen)?;
                Ok(e)
            }
            Tok::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&Tok::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Tok::RBracket)?;
                Ok(Expr::ListLit(items, line))
            }
            Tok::Set => {
                self.advance();
                self.expect(Tok::LBrace)?;
                let mut items = Vec::new();
                if !self.check(&Tok::RBrace) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Tok::RBrace)?;
                Ok(Expr::SetLit(items, line))
            }
            Tok::Map => {
                self.advance();
                self.expect(Tok::LBrace)?;
                let mut entries = Vec::new();
                if !self.check(&Tok::RBrace) {
                    loop {
                        let key = self.parse_expr()?;
                        self.expect(Tok::Colon)?;
                        let value = self.parse_expr()?;
                        entries.push((key, value));
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Tok::RBrace)?;
                Ok(Expr::MapLit(entries, line))
            }
            other => Err(CompileError::new(line, format!("unexpected token {other:?}"))),
        }
    }
}

fn bin(op: BinOp, lhs: Expr, rhs: Expr, line: u32) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        line,
    }
}
