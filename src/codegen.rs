//! C source emitter.
//!
//! Mirrors the AST node for node: every statement becomes the C statement of
//! the same shape and every binary expression is fully parenthesized, so the
//! emitted program does not depend on C's precedence table. `bool` has no
//! C89 spelling and is lowered to `int`.

use crate::ast::{Block, Decl, Expr, FuncDef, Program, Stmt, TypeName, UnaryOp};

pub struct CEmitter {
    out: String,
    /// Result type of the function being emitted; decides how a bare
    /// `return;` is spelled.
    ret_type: TypeName,
}

impl CEmitter {
    pub fn emit(program: &Program) -> String {
        let mut emitter = CEmitter {
            out: String::from("#include <stdio.h>\n\n"),
            ret_type: TypeName::Int,
        };

        let mut has_globals = false;
        for decl in program.globals() {
            emitter.decl(decl, 0);
            has_globals = true;
        }
        if has_globals {
            emitter.out.push('\n');
        }

        for func in program.functions() {
            emitter.signature(func);
            emitter.out.push_str(";\n");
        }
        emitter.out.push('\n');

        for func in program.functions() {
            emitter.signature(func);
            emitter.out.push('\n');
            emitter.ret_type = func.ret_type;
            emitter.block(&func.body, 0);
            emitter.out.push('\n');
        }

        emitter.out
    }

    fn signature(&mut self, func: &FuncDef) {
        let params: Vec<String> = func
            .params
            .iter()
            .map(|p| format!("{} {}", c_type(p.ty), p.name))
            .collect();

        self.out.push_str(&format!(
            "{} {}({})",
            c_type(func.ret_type),
            func.name,
            params.join(", ")
        ));
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    // ── statements ─────────────────────────────────────────────────────

    fn block(&mut self, block: &Block, depth: usize) {
        self.indent(depth);
        self.out.push_str("{\n");

        for stmt in &block.stmts {
            self.stmt(stmt, depth + 1);
        }

        self.indent(depth);
        self.out.push_str("}\n");
    }

    fn decl(&mut self, decl: &Decl, depth: usize) {
        self.indent(depth);
        self.out
            .push_str(&format!("{} {}", c_type(decl.ty), decl.name));

        if let Some(init) = &decl.init {
            self.out.push_str(" = ");
            self.expr(init, false);
        }

        self.out.push_str(";\n");
    }

    /// Body of `if`/`while`/`for`: blocks stay at `depth`, single
    /// statements are indented one level further.
    fn body(&mut self, stmt: &Stmt, depth: usize) {
        match stmt {
            Stmt::Block(block) => self.block(block, depth),
            other => self.stmt(other, depth + 1),
        }
    }

    /// Braced rendering of a single statement.
    fn braced(&mut self, stmt: &Stmt, depth: usize) {
        self.indent(depth);
        self.out.push_str("{\n");
        self.stmt(stmt, depth + 1);
        self.indent(depth);
        self.out.push_str("}\n");
    }

    fn stmt(&mut self, stmt: &Stmt, depth: usize) {
        match stmt {
            Stmt::Decl(decl) => self.decl(decl, depth),

            Stmt::Expr(expr) => {
                self.indent(depth);
                self.expr(expr, false);
                self.out.push_str(";\n");
            }

            Stmt::Return(value) => {
                self.indent(depth);
                match value {
                    Some(value) => {
                        self.out.push_str("return ");
                        self.expr(value, false);
                        self.out.push_str(";\n");
                    }
                    None if self.ret_type == TypeName::Void => self.out.push_str("return;\n"),
                    None => self.out.push_str("return 0;\n"),
                }
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.indent(depth);
                self.out.push_str("if (");
                self.expr(cond, false);
                self.out.push_str(")\n");

                // C binds `else` to the nearest `if`.
                if else_branch.is_some() && ends_in_open_if(then_branch) {
                    self.braced(then_branch, depth);
                } else {
                    self.body(then_branch, depth);
                }

                if let Some(else_branch) = else_branch {
                    self.indent(depth);
                    self.out.push_str("else\n");
                    self.body(else_branch, depth);
                }
            }

            Stmt::While { cond, body } => {
                self.indent(depth);
                self.out.push_str("while (");
                self.expr(cond, false);
                self.out.push_str(")\n");
                self.body(body, depth);
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.indent(depth);
                self.out.push_str("for (");
                if let Some(init) = init {
                    self.expr(init, false);
                }
                self.out.push_str("; ");
                if let Some(cond) = cond {
                    self.expr(cond, false);
                }
                self.out.push_str("; ");
                if let Some(step) = step {
                    self.expr(step, false);
                }
                self.out.push_str(")\n");
                self.body(body, depth);
            }

            Stmt::Block(block) => self.block(block, depth),
        }
    }

    // ── expressions ────────────────────────────────────────────────────

    /// `nested` is set for operands, where an assignment needs parentheses.
    fn expr(&mut self, expr: &Expr, nested: bool) {
        match expr {
            Expr::Number(n) => self.out.push_str(&n.to_string()),

            Expr::Bool(b) => self.out.push_str(if *b { "1" } else { "0" }),

            Expr::Var(name) => self.out.push_str(name),

            Expr::Unary { op, operand } => {
                self.out.push_str(match op {
                    UnaryOp::Neg => "-(",
                    UnaryOp::Not => "!(",
                });
                self.expr(operand, false);
                self.out.push(')');
            }

            Expr::Assign { name, value } => {
                if nested {
                    self.out.push('(');
                }
                self.out.push_str(name);
                self.out.push_str(" = ");
                self.expr(value, false);
                if nested {
                    self.out.push(')');
                }
            }

            Expr::Binary { op, left, right } => {
                self.out.push('(');
                self.expr(left, true);
                self.out.push_str(&format!(" {} ", op));
                self.expr(right, true);
                self.out.push(')');
            }

            Expr::Call { name, args } => {
                self.out.push_str(name);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg, false);
                }
                self.out.push(')');
            }
        }
    }
}

fn c_type(ty: TypeName) -> &'static str {
    match ty {
        TypeName::Int => "int",
        TypeName::Double => "double",
        TypeName::Bool => "int",
        TypeName::Void => "void",
    }
}

/// Whether `stmt`, printed without braces, ends in an `if` that has no
/// `else` and would capture a following one.
fn ends_in_open_if(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If {
            else_branch: None, ..
        } => true,
        Stmt::If {
            else_branch: Some(else_branch),
            ..
        } => ends_in_open_if(else_branch),
        Stmt::While { body, .. } | Stmt::For { body, .. } => ends_in_open_if(body),
        _ => false,
    }
}
