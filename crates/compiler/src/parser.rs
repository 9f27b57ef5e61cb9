//! Recursive-descent parser.
//!
//! Two mutually recursive functions build the arena: `parse_expr`
//! dispatches on the current token, `parse_list` chains cons cells in
//! source order. There is no recovery; the first malformed token ends
//! the compilation.

use crate::ast::{Ast, NIL, Node, NodeId};
use crate::tokenizer::{Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    ast: Ast,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
            ast: Ast::new(),
        }
    }

    /// Parse one top-level expression. Anything after it is ignored.
    pub fn parse(mut self) -> Result<(Ast, NodeId), String> {
        let root = self.parse_expr()?;
        Ok((self.ast, root))
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.position).copied()
    }

    fn parse_expr(&mut self) -> Result<NodeId, String> {
        let token = self
            .peek()
            .ok_or_else(|| "unexpected end of list".to_string())?;
        match token.kind {
            TokenKind::LParen => {
                self.position += 1;
                self.parse_list()
            }
            TokenKind::StringLit => {
                self.position += 1;
                Ok(self.ast.push(Node::StringLit {
                    offset: token.index,
                }))
            }
            TokenKind::Symbol => {
                self.position += 1;
                Ok(self.ast.push(Node::Symbol {
                    offset: token.index,
                }))
            }
            TokenKind::RParen => Err("unexpected end of list".to_string()),
        }
    }

    fn parse_list(&mut self) -> Result<NodeId, String> {
        let mut head = NIL;
        let mut tail = NIL;
        loop {
            match self.peek() {
                None => return Err("unexpected end of list".to_string()),
                Some(token) if token.kind == TokenKind::RParen => {
                    self.position += 1;
                    return Ok(head);
                }
                Some(_) => {
                    let cell = self.ast.push(Node::List {
                        elem: NIL,
                        next: NIL,
                    });
                    let elem = self.parse_expr()?;
                    self.ast.set_elem(cell, elem);
                    if head == NIL {
                        head = cell;
                    } else {
                        self.ast.set_next(tail, cell);
                    }
                    tail = cell;
                }
            }
        }
    }
}
