//! Recursive-descent parser for the expanded source text.

use glint_ir::{BinaryOp, Diagnostic, UnaryOp};

use crate::ast::{
    AssignOp, Ast, Decl, Expr, FunctionDecl, Param, Qualifier, Stmt, TypeSpec, VarDecl,
};
use crate::lex::{tokenize, SpannedToken, Token};

/// Parses expanded source text into an AST.
pub fn parse(text: &str) -> Result<Ast, Diagnostic> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut decls = Vec::new();
    while parser.peek().is_some() {
        parser.parse_external_declaration(&mut decls)?;
    }
    Ok(Ast { decls })
}

const PRECISION_QUALIFIERS: &[&str] = &["highp", "mediump", "lowp"];

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes the next token if it is the identifier `name`.
    fn eat_keyword(&mut self, name: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(ident)) if ident == name => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(message).with_line(self.line())
    }

    fn expect(&mut self, token: Token, context: &str) -> Result<(), Diagnostic> {
        match self.peek() {
            Some(found) if *found == token => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(self.error(format!(
                "syntax error: expected {token} {context}, found {found}"
            ))),
            None => Err(self.error(format!(
                "syntax error: expected {token} {context}, found end of input"
            ))),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, u32), Diagnostic> {
        let line = self.line();
        match self.advance() {
            Some(Token::Ident(name)) => Ok((name, line)),
            Some(found) => Err(Diagnostic::error(format!(
                "syntax error: expected {what}, found {found}"
            ))
            .with_line(line)),
            None => Err(Diagnostic::error(format!(
                "syntax error: expected {what}, found end of input"
            ))
            .with_line(line)),
        }
    }

    fn skip_precision_qualifier(&mut self) {
        for q in PRECISION_QUALIFIERS {
            if self.eat_keyword(q) {
                return;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn parse_external_declaration(&mut self, decls: &mut Vec<Decl>) -> Result<(), Diagnostic> {
        // Stray semicolons are allowed at global scope.
        if self.eat(&Token::Semicolon) {
            return Ok(());
        }

        // `precision highp float;` — accepted and discarded.
        if self.eat_keyword("precision") {
            let (prec, line) = self.expect_ident("a precision qualifier")?;
            if !PRECISION_QUALIFIERS.contains(&prec.as_str()) {
                return Err(Diagnostic::error(format!(
                    "unknown precision qualifier `{prec}`"
                ))
                .with_line(line));
            }
            self.expect_ident("a type name")?;
            self.expect(Token::Semicolon, "after precision statement")?;
            return Ok(());
        }

        let location = self.parse_layout()?;
        let qualifier = self.parse_qualifier();
        self.skip_precision_qualifier();

        let (ty, ty_line) = self.parse_type()?;
        let (name, name_line) = self.expect_ident("a declaration name")?;

        if self.peek() == Some(&Token::LParen) {
            if let Some(q) = qualifier {
                return Err(Diagnostic::error(format!(
                    "storage qualifier `{}` not allowed on a function",
                    q.keyword()
                ))
                .with_line(name_line));
            }
            if location.is_some() {
                return Err(Diagnostic::error(
                    "layout qualifier not allowed on a function",
                )
                .with_line(name_line));
            }
            let func = self.parse_function(ty, name, name_line)?;
            decls.push(Decl::Function(func));
            return Ok(());
        }

        if ty == TypeSpec::Void {
            return Err(
                Diagnostic::error("variables cannot be declared `void`").with_line(ty_line)
            );
        }

        // One or more declarators sharing the qualifier and type.
        let mut current = name;
        let mut current_line = name_line;
        loop {
            let array_size = self.parse_array_suffix()?;
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            decls.push(Decl::Variable(VarDecl {
                qualifier,
                ty,
                name: current,
                array_size,
                init,
                location,
                line: current_line,
            }));
            if self.eat(&Token::Comma) {
                let (next, next_line) = self.expect_ident("a declaration name")?;
                current = next;
                current_line = next_line;
            } else {
                break;
            }
        }
        self.expect(Token::Semicolon, "after declaration")?;
        Ok(())
    }

    fn parse_layout(&mut self) -> Result<Option<u32>, Diagnostic> {
        if !self.eat_keyword("layout") {
            return Ok(None);
        }
        self.expect(Token::LParen, "after `layout`")?;
        let (key, key_line) = self.expect_ident("a layout qualifier")?;
        if key != "location" {
            return Err(Diagnostic::error(format!(
                "unsupported layout qualifier `{key}`"
            ))
            .with_line(key_line));
        }
        self.expect(Token::Assign, "in layout qualifier")?;
        let line = self.line();
        let value = match self.advance() {
            Some(Token::Int(v)) if v >= 0 => v as u32,
            _ => {
                return Err(Diagnostic::error(
                    "layout location must be a non-negative integer",
                )
                .with_line(line))
            }
        };
        self.expect(Token::RParen, "after layout qualifier")?;
        Ok(Some(value))
    }

    fn parse_qualifier(&mut self) -> Option<Qualifier> {
        let qualifier = match self.peek() {
            Some(Token::Ident(name)) => match name.as_str() {
                "const" => Qualifier::Const,
                "uniform" => Qualifier::Uniform,
                "in" => Qualifier::In,
                "out" => Qualifier::Out,
                "attribute" => Qualifier::Attribute,
                "varying" => Qualifier::Varying,
                _ => return None,
            },
            _ => return None,
        };
        self.pos += 1;
        Some(qualifier)
    }

    fn parse_type(&mut self) -> Result<(TypeSpec, u32), Diagnostic> {
        let (name, line) = self.expect_ident("a type name")?;
        match TypeSpec::from_name(&name) {
            Some(ty) => Ok((ty, line)),
            None => Err(Diagnostic::error(format!("unknown type `{name}`")).with_line(line)),
        }
    }

    fn parse_array_suffix(&mut self) -> Result<Option<u32>, Diagnostic> {
        if !self.eat(&Token::LBracket) {
            return Ok(None);
        }
        let line = self.line();
        let size = match self.advance() {
            Some(Token::Int(v)) if v > 0 => v as u32,
            _ => {
                return Err(
                    Diagnostic::error("array size must be a positive integer").with_line(line)
                )
            }
        };
        self.expect(Token::RBracket, "after array size")?;
        Ok(Some(size))
    }

    fn parse_function(
        &mut self,
        result: TypeSpec,
        name: String,
        line: u32,
    ) -> Result<FunctionDecl, Diagnostic> {
        self.expect(Token::LParen, "after function name")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                while self.eat_keyword("in") || self.eat_keyword("const") {}
                self.skip_precision_qualifier();
                let (ty, ty_line) = self.parse_type()?;
                if ty == TypeSpec::Void {
                    if params.is_empty() && self.peek() == Some(&Token::RParen) {
                        self.pos += 1;
                        break;
                    }
                    return Err(
                        Diagnostic::error("parameters cannot be `void`").with_line(ty_line)
                    );
                }
                let param_name = match self.peek() {
                    Some(Token::Ident(_)) => {
                        let (n, _) = self.expect_ident("a parameter name")?;
                        n
                    }
                    _ => String::new(),
                };
                params.push(Param {
                    name: param_name,
                    ty,
                    line: ty_line,
                });
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(Token::RParen, "after parameters")?;
                break;
            }
        }

        let body = if self.eat(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_block()?)
        };
        Ok(FunctionDecl {
            result,
            name,
            params,
            body,
            line,
        })
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        self.expect(Token::LBrace, "to open a block")?;
        let mut stmts = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(stmts);
            }
            if self.peek().is_none() {
                return Err(self.error("syntax error: unterminated block, expected `}`"));
            }
            self.parse_statement(&mut stmts)?;
        }
    }

    /// Parses one statement or a brace-delimited sub-block, as a block.
    fn parse_branch(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        if self.peek() == Some(&Token::LBrace) {
            self.parse_block()
        } else {
            let mut stmts = Vec::new();
            self.parse_statement(&mut stmts)?;
            Ok(stmts)
        }
    }

    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), Diagnostic> {
        if self.eat(&Token::Semicolon) {
            return Ok(());
        }
        if self.peek() == Some(&Token::LBrace) {
            let block = self.parse_block()?;
            out.push(Stmt::Block(block));
            return Ok(());
        }

        let line = self.line();
        if self.eat_keyword("if") {
            self.expect(Token::LParen, "after `if`")?;
            let condition = self.parse_expr()?;
            self.expect(Token::RParen, "after condition")?;
            let then_branch = self.parse_branch()?;
            let else_branch = if self.eat_keyword("else") {
                self.parse_branch()?
            } else {
                Vec::new()
            };
            out.push(Stmt::If {
                condition,
                then_branch,
                else_branch,
                line,
            });
            return Ok(());
        }
        if self.eat_keyword("while") {
            self.expect(Token::LParen, "after `while`")?;
            let condition = self.parse_expr()?;
            self.expect(Token::RParen, "after condition")?;
            let body = self.parse_branch()?;
            out.push(Stmt::While {
                condition,
                body,
                line,
            });
            return Ok(());
        }
        if self.eat_keyword("for") {
            self.expect(Token::LParen, "after `for`")?;
            let init = if self.eat(&Token::Semicolon) {
                None
            } else {
                Some(Box::new(self.parse_simple_statement()?))
            };
            let condition = if self.peek() == Some(&Token::Semicolon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(Token::Semicolon, "after loop condition")?;
            let step = if self.peek() == Some(&Token::RParen) {
                None
            } else {
                Some(Box::new(self.parse_assign_or_expr()?))
            };
            self.expect(Token::RParen, "after loop header")?;
            let body = self.parse_branch()?;
            out.push(Stmt::For {
                init,
                condition,
                step,
                body,
                line,
            });
            return Ok(());
        }
        if self.eat_keyword("return") {
            let value = if self.peek() == Some(&Token::Semicolon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(Token::Semicolon, "after `return`")?;
            out.push(Stmt::Return { value, line });
            return Ok(());
        }
        if self.eat_keyword("break") {
            self.expect(Token::Semicolon, "after `break`")?;
            out.push(Stmt::Break { line });
            return Ok(());
        }
        if self.eat_keyword("continue") {
            self.expect(Token::Semicolon, "after `continue`")?;
            out.push(Stmt::Continue { line });
            return Ok(());
        }
        if self.eat_keyword("discard") {
            self.expect(Token::Semicolon, "after `discard`")?;
            out.push(Stmt::Discard { line });
            return Ok(());
        }

        if self.at_declaration_start() {
            self.parse_local_declaration(out)?;
            return Ok(());
        }

        let stmt = self.parse_assign_or_expr()?;
        self.expect(Token::Semicolon, "after statement")?;
        out.push(stmt);
        Ok(())
    }

    /// Returns `true` if the upcoming tokens start a local declaration.
    fn at_declaration_start(&self) -> bool {
        match self.peek() {
            Some(Token::Ident(name)) => {
                name == "const"
                    || PRECISION_QUALIFIERS.contains(&name.as_str())
                    || (TypeSpec::from_name(name).is_some()
                        // A constructor call (`vec4(...)`) is an expression.
                        && !matches!(
                            self.tokens.get(self.pos + 1).map(|t| &t.token),
                            Some(Token::LParen)
                        ))
            }
            _ => false,
        }
    }

    fn parse_local_declaration(&mut self, out: &mut Vec<Stmt>) -> Result<(), Diagnostic> {
        let qualifier = if self.eat_keyword("const") {
            Some(Qualifier::Const)
        } else {
            None
        };
        self.skip_precision_qualifier();
        let (ty, ty_line) = self.parse_type()?;
        if ty == TypeSpec::Void {
            return Err(
                Diagnostic::error("variables cannot be declared `void`").with_line(ty_line)
            );
        }
        loop {
            let (name, line) = self.expect_ident("a variable name")?;
            let array_size = self.parse_array_suffix()?;
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            out.push(Stmt::Decl(VarDecl {
                qualifier,
                ty,
                name,
                array_size,
                init,
                location: None,
                line,
            }));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon, "after declaration")?;
        Ok(())
    }

    /// A declaration or assignment/expression statement including its `;`,
    /// as allowed in a `for` initializer.
    fn parse_simple_statement(&mut self) -> Result<Stmt, Diagnostic> {
        if self.at_declaration_start() {
            let mut stmts = Vec::new();
            self.parse_local_declaration(&mut stmts)?;
            if stmts.len() != 1 {
                return Err(self.error("only one declarator is allowed in a `for` initializer"));
            }
            return Ok(stmts.remove(0));
        }
        let stmt = self.parse_assign_or_expr()?;
        self.expect(Token::Semicolon, "after `for` initializer")?;
        Ok(stmt)
    }

    /// An assignment or bare expression, without a trailing `;`.
    fn parse_assign_or_expr(&mut self) -> Result<Stmt, Diagnostic> {
        let expr = self.parse_expr()?;
        let line = expr.line();
        let op = match self.peek() {
            Some(Token::Assign) => Some(AssignOp::Assign),
            Some(Token::PlusAssign) => Some(AssignOp::Add),
            Some(Token::MinusAssign) => Some(AssignOp::Sub),
            Some(Token::StarAssign) => Some(AssignOp::Mul),
            Some(Token::SlashAssign) => Some(AssignOp::Div),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    target: expr,
                    op,
                    value,
                    line,
                })
            }
            None => Ok(Stmt::Expr { expr, line }),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, Diagnostic> {
        let condition = self.parse_binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let line = condition.line();
        let accept = self.parse_expr()?;
        self.expect(Token::Colon, "in conditional expression")?;
        let reject = self.parse_ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            accept: Box::new(accept),
            reject: Box::new(reject),
            line,
        })
    }

    /// Precedence-climbing binary expression parser.
    fn parse_binary(&mut self, min_level: u8) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;
        loop {
            let Some((op, level)) = self.peek().and_then(binary_op) else {
                return Ok(left);
            };
            if level < min_level {
                return Ok(left);
            }
            self.pos += 1;
            let right = self.parse_binary(level + 1)?;
            let line = left.line();
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let line = self.line();
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary {
                op: UnaryOp::Negate,
                expr: Box::new(self.parse_unary()?),
                line,
            });
        }
        if self.eat(&Token::Bang) {
            return Ok(Expr::Unary {
                op: UnaryOp::LogicalNot,
                expr: Box::new(self.parse_unary()?),
                line,
            });
        }
        if self.eat(&Token::Plus) {
            return self.parse_unary();
        }
        if self.eat(&Token::Increment) {
            return Ok(Expr::IncDec {
                target: Box::new(self.parse_unary()?),
                increment: true,
                line,
            });
        }
        if self.eat(&Token::Decrement) {
            return Ok(Expr::IncDec {
                target: Box::new(self.parse_unary()?),
                increment: false,
                line,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            let line = expr.line();
            if self.eat(&Token::Dot) {
                let (member, _) = self.expect_ident("a member name")?;
                expr = Expr::Member {
                    base: Box::new(expr),
                    member,
                    line,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(Token::RBracket, "after index")?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else if self.eat(&Token::Increment) {
                expr = Expr::IncDec {
                    target: Box::new(expr),
                    increment: true,
                    line,
                };
            } else if self.eat(&Token::Decrement) {
                expr = Expr::IncDec {
                    target: Box::new(expr),
                    increment: false,
                    line,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let line = self.line();
        match self.advance() {
            Some(Token::Int(value)) => Ok(Expr::IntLit { value, line }),
            Some(Token::Uint(value)) => Ok(Expr::UintLit { value, line }),
            Some(Token::Float(value)) => Ok(Expr::FloatLit { value, line }),
            Some(Token::Ident(name)) if name == "true" => Ok(Expr::BoolLit { value: true, line }),
            Some(Token::Ident(name)) if name == "false" => {
                Ok(Expr::BoolLit { value: false, line })
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.eat(&Token::Comma) {
                                continue;
                            }
                            self.expect(Token::RParen, "after arguments")?;
                            break;
                        }
                    }
                    Ok(Expr::Call { name, args, line })
                } else {
                    Ok(Expr::Ident { name, line })
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "after expression")?;
                Ok(expr)
            }
            Some(found) => Err(Diagnostic::error(format!(
                "syntax error: expected an expression, found {found}"
            ))
            .with_line(line)),
            None => Err(Diagnostic::error(
                "syntax error: expected an expression, found end of input",
            )
            .with_line(line)),
        }
    }
}

/// Binary operator and its precedence level (higher binds tighter).
fn binary_op(token: &Token) -> Option<(BinaryOp, u8)> {
    Some(match token {
        Token::OrOr => (BinaryOp::LogicalOr, 0),
        Token::AndAnd => (BinaryOp::LogicalAnd, 1),
        Token::Eq => (BinaryOp::Equal, 2),
        Token::NotEq => (BinaryOp::NotEqual, 2),
        Token::Less => (BinaryOp::Less, 3),
        Token::LessEq => (BinaryOp::LessEqual, 3),
        Token::Greater => (BinaryOp::Greater, 3),
        Token::GreaterEq => (BinaryOp::GreaterEqual, 3),
        Token::Plus => (BinaryOp::Add, 4),
        Token::Minus => (BinaryOp::Subtract, 4),
        Token::Star => (BinaryOp::Multiply, 5),
        Token::Slash => (BinaryOp::Divide, 5),
        Token::Percent => (BinaryOp::Modulo, 5),
        _ => return None,
    })
}
