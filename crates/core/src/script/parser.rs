//! Recursive-descent parser
//!
//! Nesting is bounded twice: the parser's own recursion (blocks, parentheses,
//! call arguments, unary chains) and the depth of every expression tree it
//! builds, so that left-associative chains such as `a + a + a ...` cannot
//! produce a tree deep enough to exhaust the interpreter's stack.

use crate::script::{
    ast::{Arg, BinaryOp, Block, Expr, ExprKind, LogicalOp, Program, Stmt, StmtKind, UnaryOp},
    error::{ParseError, Position},
    lexer::{Token, TokenKind, tokenize},
};

/// Parse source into a [`Program`].
pub(crate) fn parse(source: &str, max_depth: usize) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;

    Parser {
        tokens,
        cursor: 0,
        depth: 0,
        max_depth,
    }
    .program()
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        while self.peek_kind() != &TokenKind::Eof {
            statements.push(self.statement()?);
        }

        Ok(Program { statements })
    }

    // -- tokens ---------------------------------------------------------------

    fn peek_kind(&self) -> &TokenKind {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.cursor + offset)
            .map_or(&TokenKind::Eof, |token| &token.kind)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.cursor)
            .or_else(|| self.tokens.last())
            .map(|token| token.position)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek_kind().clone();

        if kind != TokenKind::Eof {
            self.cursor += 1;
        }

        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            self.position(),
            format!("expected {expected}, found {}", self.peek_kind().describe()),
        )
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;

        if self.depth > self.max_depth {
            return Err(ParseError::new(
                self.position(),
                format!("nesting deeper than {}", self.max_depth),
            ));
        }

        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- statements -----------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.position();

        let kind = match self.peek_kind().clone() {
            TokenKind::Let => {
                self.advance();
                let name = self.ident()?;
                self.expect(&TokenKind::Assign)?;
                let value = self.expr()?;
                self.expect(&TokenKind::Semicolon)?;

                StmtKind::Let { name, value }
            }
            TokenKind::If => {
                self.advance();
                self.if_chain()?
            }
            TokenKind::For => {
                self.advance();
                let binding = self.ident()?;
                self.expect(&TokenKind::In)?;
                let iterable = self.expr()?;
                let body = self.block()?;

                StmtKind::For {
                    binding,
                    iterable,
                    body,
                }
            }
            TokenKind::While => {
                self.advance();
                let condition = self.expr()?;
                let body = self.block()?;

                StmtKind::While { condition, body }
            }
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;

                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;

                StmtKind::Continue
            }
            TokenKind::Raise => {
                self.advance();
                let value = self.expr()?;
                self.expect(&TokenKind::Semicolon)?;

                StmtKind::Raise(value)
            }
            TokenKind::Ident(_) if self.peek_kind_at(1) == &TokenKind::Assign => {
                let name = self.ident()?;
                self.advance();
                let value = self.expr()?;
                self.expect(&TokenKind::Semicolon)?;

                StmtKind::Assign { name, value }
            }
            _ => {
                let value = self.expr()?;
                self.expect(&TokenKind::Semicolon)?;

                StmtKind::Expr(value)
            }
        };

        Ok(Stmt { kind, position })
    }

    /// Parses after the leading `if`.
    fn if_chain(&mut self) -> Result<StmtKind, ParseError> {
        let mut branches = Vec::new();
        let mut otherwise = None;

        loop {
            let condition = self.expr()?;
            let body = self.block()?;
            branches.push((condition, body));

            if !self.eat(&TokenKind::Else) {
                break;
            }

            if !self.eat(&TokenKind::If) {
                otherwise = Some(self.block()?);
                break;
            }
        }

        Ok(StmtKind::If {
            branches,
            otherwise,
        })
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        self.enter()?;

        let mut statements = Vec::new();

        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            statements.push(self.statement()?);
        }

        self.expect(&TokenKind::RBrace)?;
        self.leave();

        Ok(statements)
    }

    // -- expressions ----------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.or();
        self.leave();

        expr
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        self.logical_level(Self::and, &TokenKind::Or, LogicalOp::Or)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        self.logical_level(Self::equality, &TokenKind::And, LogicalOp::And)
    }

    fn logical_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        token: &TokenKind,
        op: LogicalOp,
    ) -> Result<Expr, ParseError> {
        let mut lhs = next(self)?;

        while self.peek_kind() == token {
            let position = self.position();
            self.advance();
            let rhs = next(self)?;

            lhs = self.node(
                ExprKind::Logical {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            )?;
        }

        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::comparison, |kind| match kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::term, |kind| match kind {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::factor, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        operator: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expr, ParseError> {
        let mut lhs = next(self)?;

        while let Some(op) = operator(self.peek_kind()) {
            let position = self.position();
            self.advance();
            let rhs = next(self)?;

            lhs = self.node(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            )?;
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };

        let position = self.position();
        self.advance();

        self.enter()?;
        let operand = self.unary();
        self.leave();

        self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand?),
            },
            position,
        )
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            let position = self.position();

            if self.eat(&TokenKind::Dot) {
                let name = self.ident()?;

                let kind = if self.peek_kind() == &TokenKind::LParen {
                    ExprKind::MethodCall {
                        target: Box::new(expr),
                        name,
                        args: self.args()?,
                    }
                } else {
                    ExprKind::Property {
                        target: Box::new(expr),
                        name,
                    }
                };

                expr = self.node(kind, position)?;
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.expr()?;
                self.expect(&TokenKind::RBracket)?;

                expr = self.node(
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    position,
                )?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();

        let kind = match self.peek_kind().clone() {
            TokenKind::Number(number) => ExprKind::Number(number),
            TokenKind::Str(text) => ExprKind::Str(text),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Nil => ExprKind::Nil,
            TokenKind::Ident(name) => {
                self.advance();

                let kind = if self.peek_kind() == &TokenKind::LParen {
                    ExprKind::Call {
                        name,
                        args: self.args()?,
                    }
                } else {
                    ExprKind::Var(name)
                };

                return self.node(kind, position);
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(&TokenKind::RParen)?;

                return Ok(inner);
            }
            _ => return Err(self.unexpected("expression")),
        };

        self.advance();

        self.node(kind, position)
    }

    fn args(&mut self) -> Result<Vec<Arg>, ParseError> {
        self.expect(&TokenKind::LParen)?;

        let mut args = Vec::new();

        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            let name = if matches!(self.peek_kind(), TokenKind::Ident(_))
                && self.peek_kind_at(1) == &TokenKind::Colon
            {
                let name = self.ident()?;
                self.advance();
                Some(name)
            } else {
                None
            };

            let value = self.expr()?;
            args.push(Arg { name, value });

            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen)?;

                return Ok(args);
            }
        }
    }

    /// Build an expression node, rejecting trees deeper than the limit.
    fn node(&self, kind: ExprKind, position: Position) -> Result<Expr, ParseError> {
        let depth = 1 + child_depth(&kind);

        if depth > self.max_depth {
            return Err(ParseError::new(
                position,
                format!("expression nested deeper than {}", self.max_depth),
            ));
        }

        Ok(Expr {
            kind,
            position,
            depth,
        })
    }
}

fn child_depth(kind: &ExprKind) -> usize {
    match kind {
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Nil
        | ExprKind::Var(_) => 0,
        ExprKind::Unary { operand, .. } => operand.depth,
        ExprKind::Property { target, .. } => target.depth,
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
            lhs.depth.max(rhs.depth)
        }
        ExprKind::Index { target, index } => target.depth.max(index.depth),
        ExprKind::Call { args, .. } => args_depth(args),
        ExprKind::MethodCall { target, args, .. } => target.depth.max(args_depth(args)),
    }
}

fn args_depth(args: &[Arg]) -> usize {
    args.iter().map(|arg| arg.value.depth).max().unwrap_or(0)
}
