//! C code generation.
//!
//! Emits one `void genLambdaK(void)` function per `lambda` instruction,
//! innermost first so no forward declarations are needed, followed by a
//! `main` driver. Each function body is straight-line code against the
//! runtime ABI declared in `support.h`; scope brackets become C blocks
//! that snapshot and restore `context_stack` and `binds_index`, so the
//! bracket structure of the instruction stream survives into the C.
//!
//! Emission walks the instruction list once per lambda with a depth
//! counter: instructions belonging to nested lambdas are skipped, and
//! the nested `lambda` itself contributes only the `supPushLambda`
//! reference to its descriptor.

use crate::builtins;
use crate::rpn::Instruction;
use crate::tokenizer::SourceBuffer;
use std::fmt;
use std::fmt::Write as _;

/// Error type for code generation.
///
/// Distinguishes logical errors (unknown primitives, malformed
/// instruction streams) from formatting failures so both propagate
/// with `?`.
#[derive(Debug)]
pub enum CodeGenError {
    Logic(String),
    Format(fmt::Error),
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::Logic(message) => write!(f, "{}", message),
            CodeGenError::Format(error) => write!(f, "C generation error: {}", error),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(message: String) -> Self {
        CodeGenError::Logic(message)
    }
}

impl From<fmt::Error> for CodeGenError {
    fn from(error: fmt::Error) -> Self {
        CodeGenError::Format(error)
    }
}

pub struct CodeGen<'a> {
    source: &'a SourceBuffer,
    code: &'a [Instruction],
    /// Indices of `lambda` instructions, in stream order; position K
    /// names `genLambdaK` and `lambda_type_K`.
    lambdas: Vec<usize>,
}

/// Generate the full translation unit.
pub fn generate(source: &SourceBuffer, code: &[Instruction]) -> Result<String, CodeGenError> {
    CodeGen::new(source, code).generate()
}

impl<'a> CodeGen<'a> {
    pub fn new(source: &'a SourceBuffer, code: &'a [Instruction]) -> Self {
        let lambdas = code
            .iter()
            .enumerate()
            .filter(|(_, instruction)| matches!(instruction, Instruction::Lambda { .. }))
            .map(|(index, _)| index)
            .collect();
        Self {
            source,
            code,
            lambdas,
        }
    }

    pub fn generate(&self) -> Result<String, CodeGenError> {
        if !matches!(self.code.first(), Some(Instruction::Lambda { .. })) {
            return Err(CodeGenError::Logic(
                "program must be a single lambda expression".to_string(),
            ));
        }

        let mut out = String::new();
        writeln!(out, "#include \"support.h\"")?;
        writeln!(out)?;
        for k in (0..self.lambdas.len()).rev() {
            self.emit_lambda(k, &mut out)?;
        }
        self.emit_main(&mut out)?;
        Ok(out)
    }

    fn lambda_number_at(&self, position: usize) -> Result<usize, CodeGenError> {
        self.lambdas
            .binary_search(&position)
            .map_err(|_| CodeGenError::Logic("lambda table out of sync".to_string()))
    }

    fn emit_lambda(&self, k: usize, out: &mut String) -> Result<(), CodeGenError> {
        writeln!(out, "void genLambda{k}(void) {{")?;
        let mut depth = 1u32;
        let mut position = self.lambdas[k] + 1;
        while position < self.code.len() {
            match self.code[position] {
                Instruction::Lambda { .. } => {
                    if depth == 1 {
                        let nested = self.lambda_number_at(position)?;
                        writeln!(out, "    supPushLambda(&lambda_type_{nested});")?;
                    }
                    depth += 1;
                }
                Instruction::LambdaRet => {
                    depth -= 1;
                    if depth == 0 {
                        writeln!(out, "}}")?;
                        writeln!(
                            out,
                            "static const ManagedType lambda_type_{k} = {{ \"lambda\", genLambda{k} }};"
                        )?;
                        writeln!(out)?;
                        return Ok(());
                    }
                }
                instruction if depth == 1 => self.emit_instruction(instruction, out)?,
                _ => {}
            }
            position += 1;
        }
        Err(CodeGenError::Logic("unterminated lambda body".to_string()))
    }

    fn emit_instruction(
        &self,
        instruction: Instruction,
        out: &mut String,
    ) -> Result<(), CodeGenError> {
        match instruction {
            // Handled by the walk in emit_lambda.
            Instruction::Lambda { .. } | Instruction::LambdaRet => {}
            Instruction::LambdaContextLoad => {
                writeln!(out, "    context_stack = top.v.context;")?;
                writeln!(out, "    supStackDrop();")?;
            }
            Instruction::ScopeBegin { id } => {
                writeln!(out, "    {{")?;
                writeln!(out, "    HeapVariable *saved_context_{id} = context_stack;")?;
                writeln!(out, "    int64_t saved_binds_{id} = binds_index;")?;
            }
            Instruction::ScopeEnd { id } => {
                writeln!(out, "    context_stack = saved_context_{id};")?;
                writeln!(out, "    binds_index = saved_binds_{id};")?;
                writeln!(out, "    }}")?;
            }
            Instruction::ConditionStart { .. } => {
                writeln!(out, "    if (top.v.number) {{")?;
                writeln!(out, "    supStackDrop();")?;
            }
            Instruction::ConditionElse { .. } => {
                writeln!(out, "    }} else {{")?;
                writeln!(out, "    supStackDrop();")?;
            }
            Instruction::ConditionEnd => writeln!(out, "    }}")?,
            Instruction::Bind { .. } => writeln!(out, "    supBind();")?,
            Instruction::BindCaptured { .. } => writeln!(out, "    supBindCaptured();")?,
            Instruction::GetByHops { hops } => writeln!(out, "    supGet({hops});")?,
            Instruction::SetByHops { hops } => writeln!(out, "    supSet({hops});")?,
            Instruction::GetCapturedByHops { hops } => {
                writeln!(out, "    supGetCaptured({hops});")?
            }
            Instruction::SetCapturedByHops { hops } => {
                writeln!(out, "    supSetCaptured({hops});")?
            }
            Instruction::PushNumber { value } => {
                // INT64_MIN has no literal form in C.
                if value == i64::MIN {
                    writeln!(out, "    supPushNumber(INT64_MIN);")?;
                } else {
                    writeln!(out, "    supPushNumber({value});")?;
                }
            }
            Instruction::Call { .. } => writeln!(out, "    supCall();")?,
            Instruction::Str { offset } => {
                let literal = c_string_literal(self.source.string_at(offset));
                writeln!(out, "    supPushString({literal});")?;
            }
            Instruction::Get { name } => {
                let text = self.source.symbol_at(name);
                match builtins::lookup(text) {
                    Some(symbol) => writeln!(out, "    supPushLambda(&{symbol});")?,
                    None => {
                        return Err(CodeGenError::Logic(format!("unknown primitive: {text}")));
                    }
                }
            }
            Instruction::Set { name }
            | Instruction::GetCaptured { name }
            | Instruction::SetCaptured { name } => {
                return Err(CodeGenError::Logic(format!(
                    "unresolved reference: {}",
                    self.source.symbol_at(name)
                )));
            }
            Instruction::Placeholder => {
                return Err(CodeGenError::Logic(
                    "placeholder instruction in generated stream".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn emit_main(&self, out: &mut String) -> Result<(), CodeGenError> {
        writeln!(out, "int main(int argc, char **argv) {{")?;
        writeln!(out, "    program_args = (const char **)argv;")?;
        writeln!(out, "    program_args_count = argc;")?;
        writeln!(out, "    supPushNumber(argc);")?;
        writeln!(out, "    supPushLambda(&lambda_type_0);")?;
        writeln!(out, "    supCall();")?;
        writeln!(out, "    return (int)top.v.number;")?;
        writeln!(out, "}}")?;
        Ok(())
    }
}

/// Re-escape a source string lexeme (quotes included) as a C literal.
/// Backslash escapes pass through verbatim; raw control characters that
/// C literals cannot contain are escaped.
fn c_string_literal(lexeme: &str) -> String {
    let mut out = String::with_capacity(lexeme.len());
    for ch in lexeme.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
