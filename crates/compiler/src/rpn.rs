//! Reverse-Polish lowering.
//!
//! Walks the expression tree and emits a flat instruction list for the
//! runtime's stack machine. Five forms exist: number and string
//! literals, identifiers, `lambda`, `if`, `let`, and the general call.
//! `lambda`, `if` and `let` are special only in head position; anywhere
//! else they are ordinary identifiers.
//!
//! Name references come out of this stage symbolic (`get x`, `set x`,
//! `bind x`); capture analysis and hop resolution rewrite them before
//! code generation. The id carried by a `scope_begin`/`scope_end` pair
//! is the RPN index of the opening instruction, which is unique and
//! stable across passes.

use crate::ast::{Ast, NIL, Node, NodeId};
use crate::tokenizer::SourceBuffer;

/// One stack-machine instruction. Name payloads are source offsets of
/// the symbol's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Lambda { params: u32 },
    LambdaContextLoad,
    LambdaRet,
    ScopeBegin { id: u32 },
    ScopeEnd { id: u32 },
    ConditionStart { target: u32 },
    ConditionElse { target: u32 },
    ConditionEnd,
    Bind { name: u32 },
    BindCaptured { name: u32 },
    Get { name: u32 },
    GetCaptured { name: u32 },
    Set { name: u32 },
    SetCaptured { name: u32 },
    GetByHops { hops: u32 },
    GetCapturedByHops { hops: u32 },
    SetByHops { hops: u32 },
    SetCapturedByHops { hops: u32 },
    PushNumber { value: i64 },
    Call { arity: u32 },
    Str { offset: u32 },
    /// Reserved slot; never emitted by the lowering below.
    Placeholder,
}

struct Lowering<'a> {
    source: &'a SourceBuffer,
    ast: &'a Ast,
    code: Vec<Instruction>,
}

/// Lower the expression rooted at `root` into an instruction list.
pub fn lower(
    source: &SourceBuffer,
    ast: &Ast,
    root: NodeId,
) -> Result<Vec<Instruction>, String> {
    let mut lowering = Lowering {
        source,
        ast,
        code: Vec::new(),
    };
    lowering.expr(root)?;
    Ok(lowering.code)
}

impl Lowering<'_> {
    fn emit(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    fn expr(&mut self, id: NodeId) -> Result<(), String> {
        if id == NIL {
            return Err("empty call detected".to_string());
        }
        match self.ast.node(id) {
            Node::Symbol { offset } => {
                let text = self.source.symbol_at(offset);
                if let Ok(value) = text.parse::<i64>() {
                    self.emit(Instruction::PushNumber { value });
                } else {
                    self.emit(Instruction::Get { name: offset });
                }
                Ok(())
            }
            Node::StringLit { offset } => {
                self.emit(Instruction::Str { offset });
                Ok(())
            }
            Node::List { .. } => self.call(id),
        }
    }

    fn call(&mut self, head_cell: NodeId) -> Result<(), String> {
        let items: Vec<NodeId> = self.ast.list(head_cell).collect();
        let head = items[0];
        if head != NIL
            && let Node::Symbol { offset } = self.ast.node(head)
        {
            match self.source.symbol_at(offset) {
                "lambda" => return self.lambda(&items),
                "if" => return self.conditional(&items),
                "let" => return self.let_form(&items),
                _ => {}
            }
        }
        for &argument in &items[1..] {
            self.expr(argument)?;
        }
        self.expr(head)?;
        self.emit(Instruction::Call {
            arity: (items.len() - 1) as u32,
        });
        Ok(())
    }

    fn begin_scope(&mut self) -> u32 {
        let id = self.code.len() as u32;
        self.emit(Instruction::ScopeBegin { id });
        id
    }

    fn end_scope(&mut self, id: u32) {
        self.emit(Instruction::ScopeEnd { id });
    }

    fn scoped_expr(&mut self, id: NodeId) -> Result<(), String> {
        let scope = self.begin_scope();
        self.expr(id)?;
        self.end_scope(scope);
        Ok(())
    }

    fn lambda(&mut self, items: &[NodeId]) -> Result<(), String> {
        if items.len() != 3 {
            return Err("lambda expects a parameter list and a body".to_string());
        }
        let params = self.assert_list(items[1], "lambda parameters")?;
        let mut names = Vec::with_capacity(params.len());
        for &param in &params {
            names.push(self.assert_symbol(param, "lambda parameter")?);
        }
        self.emit(Instruction::Lambda {
            params: names.len() as u32,
        });
        let scope = self.begin_scope();
        self.emit(Instruction::LambdaContextLoad);
        for name in names {
            self.emit(Instruction::Bind { name });
        }
        self.expr(items[2])?;
        self.end_scope(scope);
        self.emit(Instruction::LambdaRet);
        Ok(())
    }

    fn conditional(&mut self, items: &[NodeId]) -> Result<(), String> {
        if items.len() != 4 {
            return Err("if expects a condition and two branches".to_string());
        }
        self.scoped_expr(items[1])?;
        let start = self.emit(Instruction::ConditionStart { target: 0 });
        self.scoped_expr(items[2])?;
        let else_at = self.emit(Instruction::ConditionElse { target: 0 });
        self.code[start] = Instruction::ConditionStart {
            target: else_at as u32,
        };
        self.scoped_expr(items[3])?;
        let end_at = self.emit(Instruction::ConditionEnd);
        self.code[else_at] = Instruction::ConditionElse {
            target: end_at as u32,
        };
        Ok(())
    }

    fn let_form(&mut self, items: &[NodeId]) -> Result<(), String> {
        if items.len() != 3 {
            return Err("let expects a binding list and a body".to_string());
        }
        let bindings = self.assert_list(items[1], "let bindings")?;
        if bindings.len() % 2 != 0 {
            return Err("let bindings must be name/value pairs".to_string());
        }
        let scope = self.begin_scope();
        for pair in bindings.chunks(2) {
            let name = self.assert_symbol(pair[0], "let binding name")?;
            // Bind a placeholder zero first so the initializer can refer
            // to the name (recursion through a closure), then assign.
            self.emit(Instruction::PushNumber { value: 0 });
            self.emit(Instruction::Bind { name });
            self.expr(pair[1])?;
            self.emit(Instruction::Set { name });
        }
        self.expr(items[2])?;
        self.end_scope(scope);
        Ok(())
    }

    fn assert_symbol(&self, id: NodeId, what: &str) -> Result<u32, String> {
        if id != NIL
            && let Node::Symbol { offset } = self.ast.node(id)
        {
            return Ok(offset);
        }
        Err(format!("{what}: expected a symbol"))
    }

    fn assert_list(&self, id: NodeId, what: &str) -> Result<Vec<NodeId>, String> {
        if id == NIL {
            return Ok(Vec::new());
        }
        match self.ast.node(id) {
            Node::List { .. } => Ok(self.ast.list(id).collect()),
            _ => Err(format!("{what}: expected a list")),
        }
    }
}

/// Render the instruction list, one instruction per line, for
/// `--dump-rpn`.
pub fn dump(code: &[Instruction], source: &SourceBuffer) -> String {
    let mut out = String::new();
    for (index, instruction) in code.iter().enumerate() {
        let line = match *instruction {
            Instruction::Lambda { params } => format!("lambda {params}"),
            Instruction::LambdaContextLoad => "lambda_context_load".to_string(),
            Instruction::LambdaRet => "lambda_ret".to_string(),
            Instruction::ScopeBegin { id } => format!("scope_begin {id}"),
            Instruction::ScopeEnd { id } => format!("scope_end {id}"),
            Instruction::ConditionStart { target } => format!("condition_start {target}"),
            Instruction::ConditionElse { target } => format!("condition_else {target}"),
            Instruction::ConditionEnd => "condition_end".to_string(),
            Instruction::Bind { name } => format!("bind {}", source.symbol_at(name)),
            Instruction::BindCaptured { name } => {
                format!("bind_captured {}", source.symbol_at(name))
            }
            Instruction::Get { name } => format!("get {}", source.symbol_at(name)),
            Instruction::GetCaptured { name } => {
                format!("get_captured {}", source.symbol_at(name))
            }
            Instruction::Set { name } => format!("set {}", source.symbol_at(name)),
            Instruction::SetCaptured { name } => {
                format!("set_captured {}", source.symbol_at(name))
            }
            Instruction::GetByHops { hops } => format!("get_by_hops {hops}"),
            Instruction::GetCapturedByHops { hops } => format!("get_captured_by_hops {hops}"),
            Instruction::SetByHops { hops } => format!("set_by_hops {hops}"),
            Instruction::SetCapturedByHops { hops } => format!("set_captured_by_hops {hops}"),
            Instruction::PushNumber { value } => format!("push_number {value}"),
            Instruction::Call { arity } => format!("call {arity}"),
            Instruction::Str { offset } => format!("str {}", source.string_at(offset)),
            Instruction::Placeholder => "placeholder".to_string(),
        };
        out.push_str(&format!("{index:5}: {line}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::tokenizer::{SourceBuffer, tokenize};

    fn lower_text(text: &str) -> (SourceBuffer, Vec<Instruction>) {
        let mut source = SourceBuffer::new();
        source.append(text);
        let tokens = tokenize(&source).expect("tokenize failed");
        let (ast, root) = Parser::new(&tokens).parse().expect("parse failed");
        let code = lower(&source, &ast, root).expect("lowering failed");
        (source, code)
    }

    fn lower_err(text: &str) -> String {
        let mut source = SourceBuffer::new();
        source.append(text);
        let tokens = tokenize(&source).expect("tokenize failed");
        let (ast, root) = Parser::new(&tokens).parse().expect("parse failed");
        lower(&source, &ast, root).unwrap_err()
    }

    #[test]
    fn test_identity_lambda() {
        let (source, code) = lower_text("(lambda (x) x)");
        assert!(matches!(code[0], Instruction::Lambda { params: 1 }));
        assert!(matches!(code[1], Instruction::ScopeBegin { id: 1 }));
        assert!(matches!(code[2], Instruction::LambdaContextLoad));
        match code[3] {
            Instruction::Bind { name } => assert_eq!(source.symbol_at(name), "x"),
            other => panic!("expected bind, got {other:?}"),
        }
        match code[4] {
            Instruction::Get { name } => assert_eq!(source.symbol_at(name), "x"),
            other => panic!("expected get, got {other:?}"),
        }
        assert!(matches!(code[5], Instruction::ScopeEnd { id: 1 }));
        assert!(matches!(code[6], Instruction::LambdaRet));
    }

    #[test]
    fn test_number_literals() {
        let (_, code) = lower_text("(lambda () -42)");
        assert!(code.contains(&Instruction::PushNumber { value: -42 }));
        // `+` alone is an identifier, not a number.
        let (source, code) = lower_text("(lambda () +)");
        assert!(code.iter().any(|i| matches!(
            i,
            Instruction::Get { name } if source.symbol_at(*name) == "+"
        )));
    }

    #[test]
    fn test_call_lowers_arguments_then_callee() {
        let (source, code) = lower_text("(f 1 2)");
        assert_eq!(code[0], Instruction::PushNumber { value: 1 });
        assert_eq!(code[1], Instruction::PushNumber { value: 2 });
        match code[2] {
            Instruction::Get { name } => assert_eq!(source.symbol_at(name), "f"),
            other => panic!("expected get, got {other:?}"),
        }
        assert_eq!(code[3], Instruction::Call { arity: 2 });
    }

    #[test]
    fn test_conditional_backpatching() {
        let (_, code) = lower_text("(if 1 2 3)");
        let start = code
            .iter()
            .position(|i| matches!(i, Instruction::ConditionStart { .. }))
            .unwrap();
        let else_at = code
            .iter()
            .position(|i| matches!(i, Instruction::ConditionElse { .. }))
            .unwrap();
        let end_at = code
            .iter()
            .position(|i| matches!(i, Instruction::ConditionEnd))
            .unwrap();
        assert_eq!(
            code[start],
            Instruction::ConditionStart {
                target: else_at as u32
            }
        );
        assert_eq!(
            code[else_at],
            Instruction::ConditionElse {
                target: end_at as u32
            }
        );
    }

    #[test]
    fn test_let_binds_zero_then_assigns() {
        let (source, code) = lower_text("(let (a 7) a)");
        assert!(matches!(code[0], Instruction::ScopeBegin { id: 0 }));
        assert_eq!(code[1], Instruction::PushNumber { value: 0 });
        match code[2] {
            Instruction::Bind { name } => assert_eq!(source.symbol_at(name), "a"),
            other => panic!("expected bind, got {other:?}"),
        }
        assert_eq!(code[3], Instruction::PushNumber { value: 7 });
        match code[4] {
            Instruction::Set { name } => assert_eq!(source.symbol_at(name), "a"),
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn test_scope_ids_are_opening_indices_and_nest() {
        let (_, code) = lower_text("(lambda (x) (if (let (a 1) a) x 2))");
        let mut open = Vec::new();
        for (index, instruction) in code.iter().enumerate() {
            match *instruction {
                Instruction::ScopeBegin { id } => {
                    assert_eq!(id as usize, index);
                    open.push(id);
                }
                Instruction::ScopeEnd { id } => {
                    assert_eq!(open.pop(), Some(id));
                }
                _ => {}
            }
        }
        assert!(open.is_empty());
    }

    #[test]
    fn test_special_forms_only_in_head_position() {
        // `if` as an argument is an ordinary identifier.
        let (source, code) = lower_text("(f if)");
        assert!(code.iter().any(|i| matches!(
            i,
            Instruction::Get { name } if source.symbol_at(*name) == "if"
        )));
    }

    #[test]
    fn test_lowering_errors() {
        assert_eq!(lower_err("()"), "empty call detected");
        assert_eq!(lower_err("(f ())"), "empty call detected");
        assert_eq!(
            lower_err("(lambda x x)"),
            "lambda parameters: expected a list"
        );
        assert_eq!(
            lower_err("(lambda (x))"),
            "lambda expects a parameter list and a body"
        );
        assert_eq!(
            lower_err("(let (x) x)"),
            "let bindings must be name/value pairs"
        );
        assert_eq!(
            lower_err("(let ((a) 1) 2)"),
            "let binding name: expected a symbol"
        );
        assert_eq!(lower_err("(if 1 2)"), "if expects a condition and two branches");
    }
}
