use crate::ast::{Block, Decl, Expr, FuncDef, Item, Program, Stmt};

/// Renders an AST as a Graphviz `digraph`
/// (`dot -Tpng ast.dot -o ast.png`).
///
/// Node ids are handed out in pre-order starting at 1, so the program root
/// is always `n1`.
pub struct DotPrinter {
    next_id: usize,
    out: String,
}

impl DotPrinter {
    pub fn print(program: &Program) -> String {
        let mut printer = DotPrinter {
            next_id: 1,
            out: String::from("digraph AST {\n  node [shape=box, fontname=Courier];\n"),
        };

        printer.program(program);
        printer.out.push_str("}\n");
        printer.out
    }

    /// Emit a node labelled `label`, linked from `parent` when given.
    fn open(&mut self, parent: Option<usize>, label: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        if let Some(parent) = parent {
            self.out.push_str(&format!("  n{} -> n{};\n", parent, id));
        }
        self.out
            .push_str(&format!("  n{} [label=\"{}\"];\n", id, escape(label)));

        id
    }

    // ── items ──────────────────────────────────────────────────────────

    fn program(&mut self, program: &Program) {
        let id = self.open(None, "Program");

        for item in &program.items {
            match item {
                Item::Function(func) => self.function(id, func),
                Item::Global(decl) => self.decl(id, decl),
            }
        }
    }

    fn function(&mut self, parent: usize, func: &FuncDef) {
        let id = self.open(
            Some(parent),
            &format!("Func:{} ->{}", func.name, func.ret_type),
        );

        for param in &func.params {
            self.open(Some(id), &format!("Param:{} :{}", param.name, param.ty));
        }

        self.block(id, &func.body);
    }

    // ── statements ─────────────────────────────────────────────────────

    fn block(&mut self, parent: usize, block: &Block) {
        let id = self.open(Some(parent), "Block");

        for stmt in &block.stmts {
            self.stmt(id, stmt);
        }
    }

    fn decl(&mut self, parent: usize, decl: &Decl) {
        let id = self.open(Some(parent), &format!("Decl:{} :{}", decl.name, decl.ty));

        if let Some(init) = &decl.init {
            self.expr(id, init);
        }
    }

    fn stmt(&mut self, parent: usize, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => self.decl(parent, decl),

            Stmt::Expr(expr) => {
                let id = self.open(Some(parent), "ExprStmt");
                self.expr(id, expr);
            }

            Stmt::Return(value) => {
                let id = self.open(Some(parent), "Return");
                if let Some(value) = value {
                    self.expr(id, value);
                }
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let id = self.open(Some(parent), "If");
                self.expr(id, cond);
                self.stmt(id, then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(id, else_branch);
                }
            }

            Stmt::While { cond, body } => {
                let id = self.open(Some(parent), "While");
                self.expr(id, cond);
                self.stmt(id, body);
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let id = self.open(Some(parent), "For");
                for clause in [init, cond, step].into_iter().flatten() {
                    self.expr(id, clause);
                }
                self.stmt(id, body);
            }

            Stmt::Block(block) => self.block(parent, block),
        }
    }

    // ── expressions ────────────────────────────────────────────────────

    fn expr(&mut self, parent: usize, expr: &Expr) {
        match expr {
            Expr::Assign { name, value } => {
                let id = self.open(Some(parent), &format!("Assign:{}", name));
                self.expr(id, value);
            }

            Expr::Binary { op, left, right } => {
                let id = self.open(Some(parent), &format!("Bin:{}", op));
                self.expr(id, left);
                self.expr(id, right);
            }

            Expr::Unary { op, operand } => {
                let id = self.open(Some(parent), &format!("Un:{}", op));
                self.expr(id, operand);
            }

            Expr::Number(n) => {
                self.open(Some(parent), &format!("Num:{}", number_label(*n)));
            }

            Expr::Bool(b) => {
                self.open(Some(parent), &format!("Bool:{}", b));
            }

            Expr::Var(name) => {
                self.open(Some(parent), &format!("Var:{}", name));
            }

            Expr::Call { name, args } => {
                let id = self.open(Some(parent), &format!("Call:{}", name));
                for arg in args {
                    self.expr(id, arg);
                }
            }
        }
    }
}

/// 3 → "3.0", 3.25 → "3.25".
fn number_label(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
