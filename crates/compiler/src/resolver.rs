//! Hop resolution.
//!
//! Replaces every name-based reference that capture analysis classified
//! with an integer hop count against the runtime structure it lives in:
//! the bind array for locals, the closure chain for captured bindings.
//!
//! A hop is the number of same-kind bindings between the reference and
//! its target, counted over visible (non-positive depth) instructions
//! only. That static count matches the runtime exactly because scope
//! exit restores `binds_index` and `context_stack`: bindings in closed
//! scopes are gone from the structures by the time the reference runs,
//! and they are skipped here at positive depth.
//!
//! A `get` that matches nothing is left alone; the code generator
//! resolves it as a built-in or rejects it. Any other leftover name
//! reference is rejected at code generation.

use crate::rpn::Instruction;
use crate::tokenizer::SourceBuffer;

/// Run local and captured resolution.
pub fn resolve(source: &SourceBuffer, code: &mut [Instruction]) {
    resolve_local_hops(source, code);
    resolve_captured_hops(source, code);
}

fn names_equal(source: &SourceBuffer, a: u32, b: u32) -> bool {
    source.symbol_at(a) == source.symbol_at(b)
}

/// Rewrite `get`/`set` into `get_by_hops`/`set_by_hops`, counting plain
/// binds between the reference and its binding.
pub fn resolve_local_hops(source: &SourceBuffer, code: &mut [Instruction]) {
    for reference in 0..code.len() {
        let (name, is_load) = match code[reference] {
            Instruction::Get { name } => (name, true),
            Instruction::Set { name } => (name, false),
            _ => continue,
        };
        let mut depth = 0i32;
        let mut hops = 0u32;
        for j in (0..reference).rev() {
            match code[j] {
                Instruction::ScopeBegin { .. } => depth -= 1,
                Instruction::ScopeEnd { .. } => depth += 1,
                Instruction::Bind { name: bound } if depth <= 0 => {
                    if names_equal(source, bound, name) {
                        code[reference] = if is_load {
                            Instruction::GetByHops { hops }
                        } else {
                            Instruction::SetByHops { hops }
                        };
                        break;
                    }
                    hops += 1;
                }
                _ => {}
            }
        }
    }
}

/// Rewrite `get_captured`/`set_captured` into their by-hops forms,
/// counting captured binds between the reference and its binding.
pub fn resolve_captured_hops(source: &SourceBuffer, code: &mut [Instruction]) {
    for reference in 0..code.len() {
        let (name, is_load) = match code[reference] {
            Instruction::GetCaptured { name } => (name, true),
            Instruction::SetCaptured { name } => (name, false),
            _ => continue,
        };
        let mut depth = 0i32;
        let mut hops = 0u32;
        for j in (0..reference).rev() {
            match code[j] {
                Instruction::ScopeBegin { .. } => depth -= 1,
                Instruction::ScopeEnd { .. } => depth += 1,
                Instruction::BindCaptured { name: bound } if depth <= 0 => {
                    if names_equal(source, bound, name) {
                        code[reference] = if is_load {
                            Instruction::GetCapturedByHops { hops }
                        } else {
                            Instruction::SetCapturedByHops { hops }
                        };
                        break;
                    }
                    hops += 1;
                }
                _ => {}
            }
        }
    }
}
