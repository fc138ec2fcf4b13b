/*!
Recursive‑descent parser for mini‑cpp
=====================================

Consumes the token slice produced by the [`Scanner`](crate::scanner::Scanner)
and builds an owned [`Program`]. Every token is consumed once, so the parse is
Θ(n) in the number of tokens; call‑stack depth grows with syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `item`, `statement`          | `debug`| High‑level descent into grammar branches. |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program    → item* EOF ;
item       → type IDENT ( "(" params? ")" block | ( "=" expr )? ";" ) ;
params     → type IDENT ( "," type IDENT )* ;
type       → "int" | "double" | "bool" | "void" ;
statement  → decl | block | ifStmt | whileStmt | forStmt | returnStmt | exprStmt ;
decl       → type IDENT ( "=" expr )? ";" ;
block      → "{" statement* "}" ;
ifStmt     → "if" "(" expr ")" statement ( "else" statement )? ;
whileStmt  → "while" "(" expr ")" statement ;
forStmt    → "for" "(" expr? ";" expr? ";" expr? ")" statement ;
returnStmt → "return" expr? ";" ;
exprStmt   → expr ";" ;
expr       → IDENT "=" expr | or ;
or         → and ( "||" and )* ;
and        → equality ( "&&" equality )* ;
equality   → comparison ( ( "==" | "!=" ) comparison )* ;
comparison → term ( ( "<" | "<=" | ">" | ">=" ) term )* ;
term       → factor ( ( "+" | "-" ) factor )* ;
factor     → unary ( ( "*" | "/" | "%" ) unary )* ;
unary      → ( "!" | "-" ) unary | call ;
call       → IDENT "(" args? ")" | primary ;
primary    → NUMBER | "true" | "false" | IDENT | "(" expr ")" ;
```
*/

use crate::ast::{BinaryOp, Block, Decl, Expr, FuncDef, Item, Param, Program, Stmt, TypeName, UnaryOp};
use crate::error::{MiniError, Result};
use crate::scanner;
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Parameters and arguments beyond this count are rejected.
const MAX_ARITY: usize = 255;

/// Top‑level parser over an immutable slice of tokens.
///
/// The slice must end with an `EOF` token, as produced by the scanner.
pub struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    current: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self { tokens, current: 0 }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. The first syntax error aborts the parse.
    pub fn parse(&mut self) -> Result<Program> {
        info!("Beginning parse phase");

        if !matches!(self.tokens.last(), Some(t) if t.token_type == TokenType::EOF) {
            return Err(MiniError::parse(0, "Token stream must end with EOF"));
        }

        let mut items: Vec<Item> = Vec::new();

        while !self.is_at_end() {
            items.push(self.item()?);
        }

        info!("Parsed {} top-level items", items.len());

        Ok(Program { items })
    }

    // ──────────────────────── top‑level rules ─────────────────────

    fn item(&mut self) -> Result<Item> {
        debug!("Entering item");

        let ty: TypeName = self.type_name("Expected type at top level")?;
        let name: &Token<'a> = self.consume(TokenType::IDENTIFIER, "Expected name after type")?;

        if self.matches(TokenType::LEFT_PAREN) {
            return Ok(Item::Function(self.function(ty, name)?));
        }

        Ok(Item::Global(self.declaration_rest(ty, name)?))
    }

    fn function(&mut self, ret_type: TypeName, name: &Token<'a>) -> Result<FuncDef> {
        let mut params: Vec<Param> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    return Err(MiniError::parse(
                        name.line,
                        "Cannot have more than 255 parameters",
                    ));
                }

                let ty: TypeName = self.type_name("Expected parameter type")?;
                let pname = self.consume(TokenType::IDENTIFIER, "Expected parameter name")?;

                params.push(Param {
                    ty,
                    name: pname.lexeme.to_string(),
                });

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body")?;

        let body: Block = self.block()?;

        debug!("Parsed function '{}' with {} parameters", name.lexeme, params.len());

        Ok(FuncDef {
            ret_type,
            name: name.lexeme.to_string(),
            params,
            body,
        })
    }

    /// Everything after `type IDENT` in a declaration.
    fn declaration_rest(&mut self, ty: TypeName, name: &Token<'a>) -> Result<Decl> {
        let init: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Decl {
            ty,
            name: name.lexeme.to_string(),
            init,
        })
    }

    fn type_name(&mut self, message: &str) -> Result<TypeName> {
        let ty = match self.peek().token_type {
            TokenType::INT => TypeName::Int,
            TokenType::DOUBLE => TypeName::Double,
            TokenType::BOOL => TypeName::Bool,
            TokenType::VOID => TypeName::Void,
            _ => return Err(MiniError::parse(self.peek().line, message)),
        };

        self.advance();
        Ok(ty)
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at line {}", self.peek().line);

        if self.peek().token_type.is_type_keyword() {
            let ty: TypeName = self.type_name("Expected type")?;
            let name = self.consume(TokenType::IDENTIFIER, "Expected variable name")?;
            return Ok(Stmt::Decl(self.declaration_rest(ty, name)?));
        }

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let init = self.optional_expression(TokenType::SEMICOLON)?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop initializer")?;

        let cond = self.optional_expression(TokenType::SEMICOLON)?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let step = self.optional_expression(TokenType::RIGHT_PAREN)?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn optional_expression(&mut self, terminator: TokenType) -> Result<Option<Expr>> {
        if self.check(terminator) {
            Ok(None)
        } else {
            Ok(Some(self.expression()?))
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let cond: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let cond: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { cond, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let value: Option<Expr> = self.optional_expression(TokenType::SEMICOLON)?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;
        Ok(Stmt::Return(value))
    }

    /// Statements up to the closing brace; the opening brace is already consumed.
    fn block(&mut self) -> Result<Block> {
        let mut stmts: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            stmts.push(self.statement()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        Ok(Block { stmts })
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: &Token<'a> = self.previous();
            let value: Expr = self.assignment()?;

            return match expr {
                Expr::Var(name) => Ok(Expr::assign(name, value)),
                _ => Err(MiniError::parse(equals.line, "Invalid assignment target")),
            };
        }

        Ok(expr)
    }

    /// One left‑associative precedence level: `next ( op next )*`.
    fn binary_level(
        &mut self,
        operators: &[(TokenType, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = next(self)?;

        'outer: loop {
            for (tt, op) in operators {
                if self.matches(tt.clone()) {
                    let right: Expr = next(self)?;
                    expr = Expr::binary(*op, expr, right);
                    continue 'outer;
                }
            }

            return Ok(expr);
        }
    }

    fn logical_or(&mut self) -> Result<Expr> {
        self.binary_level(&[(TokenType::PIPE_PIPE, BinaryOp::Or)], Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        self.binary_level(&[(TokenType::AND_AND, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::EQUAL_EQUAL, BinaryOp::Eq),
                (TokenType::BANG_EQUAL, BinaryOp::Ne),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::LESS, BinaryOp::Lt),
                (TokenType::LESS_EQUAL, BinaryOp::Le),
                (TokenType::GREATER, BinaryOp::Gt),
                (TokenType::GREATER_EQUAL, BinaryOp::Ge),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::PLUS, BinaryOp::Add),
                (TokenType::MINUS, BinaryOp::Sub),
            ],
            Self::factor,
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::STAR, BinaryOp::Mul),
                (TokenType::SLASH, BinaryOp::Div),
                (TokenType::PERCENT, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) {
            return Ok(Expr::unary(UnaryOp::Not, self.unary()?));
        }

        if self.matches(TokenType::MINUS) {
            return Ok(Expr::unary(UnaryOp::Neg, self.unary()?));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        if self.check(TokenType::IDENTIFIER) && self.check_next(TokenType::LEFT_PAREN) {
            let name: &Token<'a> = self.advance();
            self.advance(); // '('

            return self.finish_call(name);
        }

        self.primary()
    }

    fn finish_call(&mut self, name: &Token<'a>) -> Result<Expr> {
        let mut args: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if args.len() >= MAX_ARITY {
                    return Err(MiniError::parse(
                        self.peek().line,
                        "Cannot have more than 255 arguments",
                    ));
                }

                args.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Expr::call(name.lexeme, args))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Bool(false));
        }

        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Bool(true));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Number(n));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::var(self.previous().lexeme));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

            return Ok(expr);
        }

        Err(MiniError::parse(self.peek().line, "Expected expression"))
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'t Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!("consume failed at '{}': {}", self.peek().lexeme, message);

        Err(MiniError::parse(self.peek().line, message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> &'t Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'t Token<'a> {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'t Token<'a> {
        &self.tokens[self.current.saturating_sub(1)]
    }
}

/// Scan and parse `src` in one go.
pub fn parse_source(src: &[u8]) -> Result<Program> {
    let tokens: Vec<Token<'_>> = scanner::tokenize(src)?;

    Parser::new(&tokens).parse()
}
