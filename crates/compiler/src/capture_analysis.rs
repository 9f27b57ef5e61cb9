//! Capture analysis.
//!
//! Decides, for every binding, whether it lives in the bind array or on
//! the heap closure chain. Three passes, each a backward scan from a
//! reference toward the start of the instruction list.
//!
//! Walking backward, `scope_begin` decrements a depth counter and
//! `scope_end` increments it; a binding is *visible* from the reference
//! when it sits at non-positive depth. Binds only ever appear directly
//! inside a lambda or `let` scope, so closed sibling scopes (positive
//! depth) can never leak a binding into the scan.
//!
//! Pass A promotes any binding that is referenced from inside a nested
//! lambda (`lambda_context_load` crossed at non-positive depth) to
//! `bind_captured`. Passes B and C then point each load/store at the
//! right structure: `get`/`set` stay local when their visible binding is
//! a plain `bind`, and become `get_captured`/`set_captured` when it was
//! promoted. The innermost visible binding always wins.

use crate::rpn::Instruction;
use crate::tokenizer::SourceBuffer;

/// Run all three passes in order.
pub fn analyze(source: &SourceBuffer, code: &mut [Instruction]) {
    promote_captured_binds(source, code);
    reclassify_loads(source, code);
    reclassify_stores(source, code);
}

fn names_equal(source: &SourceBuffer, a: u32, b: u32) -> bool {
    source.symbol_at(a) == source.symbol_at(b)
}

/// Pass A: rewrite `bind x` to `bind_captured x` wherever some use of
/// `x` crosses a lambda boundary to reach it.
pub fn promote_captured_binds(source: &SourceBuffer, code: &mut [Instruction]) {
    for reference in 0..code.len() {
        let name = match code[reference] {
            Instruction::Get { name } | Instruction::Set { name } => name,
            _ => continue,
        };
        let mut depth = 0i32;
        let mut lambda_passed = false;
        for j in (0..reference).rev() {
            match code[j] {
                Instruction::ScopeBegin { .. } => depth -= 1,
                Instruction::ScopeEnd { .. } => depth += 1,
                Instruction::LambdaContextLoad if depth <= 0 => lambda_passed = true,
                Instruction::Bind { name: bound }
                    if depth <= 0 && names_equal(source, bound, name) =>
                {
                    if depth < 0 && lambda_passed {
                        code[j] = Instruction::BindCaptured { name: bound };
                    }
                    break;
                }
                Instruction::BindCaptured { name: bound }
                    if depth <= 0 && names_equal(source, bound, name) =>
                {
                    break;
                }
                _ => {}
            }
        }
    }
}

/// Pass B: retarget each `get` at its visible binding's storage class.
pub fn reclassify_loads(source: &SourceBuffer, code: &mut [Instruction]) {
    for reference in 0..code.len() {
        let name = match code[reference] {
            Instruction::Get { name } => name,
            _ => continue,
        };
        let mut depth = 0i32;
        for j in (0..reference).rev() {
            match code[j] {
                Instruction::ScopeBegin { .. } => depth -= 1,
                Instruction::ScopeEnd { .. } => depth += 1,
                Instruction::BindCaptured { name: bound }
                    if depth <= 0 && names_equal(source, bound, name) =>
                {
                    code[reference] = Instruction::GetCaptured { name };
                    break;
                }
                Instruction::Bind { name: bound }
                    if depth <= 0 && names_equal(source, bound, name) =>
                {
                    // Local binding: the `get` stays as it is and hop
                    // resolution will rewrite it.
                    break;
                }
                _ => {}
            }
        }
    }
}

/// Pass C: as pass B, for `set`.
pub fn reclassify_stores(source: &SourceBuffer, code: &mut [Instruction]) {
    for reference in 0..code.len() {
        let name = match code[reference] {
            Instruction::Set { name } => name,
            _ => continue,
        };
        let mut depth = 0i32;
        for j in (0..reference).rev() {
            match code[j] {
                Instruction::ScopeBegin { .. } => depth -= 1,
                Instruction::ScopeEnd { .. } => depth += 1,
                Instruction::BindCaptured { name: bound }
                    if depth <= 0 && names_equal(source, bound, name) =>
                {
                    code[reference] = Instruction::SetCaptured { name };
                    break;
                }
                Instruction::Bind { name: bound }
                    if depth <= 0 && names_equal(source, bound, name) =>
                {
                    break;
                }
                _ => {}
            }
        }
    }
}
