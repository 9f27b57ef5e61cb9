//! Whole-pipeline tests: LOL source in, C translation unit out.

use lolc::{CompilerConfig, compile_source};

fn compile(text: &str) -> String {
    compile_source(text, &CompilerConfig::default()).expect("compilation failed")
}

#[test]
fn identity_lambda() {
    let unit = compile("(lambda (x) x)");
    assert!(unit.contains("void genLambda0(void) {"));
    assert!(unit.contains("    supBind();\n    supGet(0);"));
    assert!(unit.contains("int main(int argc, char **argv) {"));
    assert!(unit.contains("    supPushNumber(argc);"));
    assert!(unit.contains("    supPushLambda(&lambda_type_0);"));
    // Exactly one generated lambda.
    assert_eq!(unit.matches("void genLambda").count(), 1);
}

#[test]
fn addition_uses_builtin_descriptor() {
    let unit = compile("(lambda (x) (+ x 1))");
    assert!(unit.contains("    supGet(0);"));
    assert!(unit.contains("    supPushNumber(1);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_add);"));
    assert!(unit.contains("    supCall();"));
}

#[test]
fn nested_call_emits_two_lambdas() {
    let unit = compile("(lambda (x) ((lambda (a b) (+ a b)) x 1))");
    assert!(unit.contains("void genLambda0(void) {"));
    assert!(unit.contains("void genLambda1(void) {"));
    assert!(unit.contains("    supPushLambda(&lambda_type_1);"));
    // Two binds in the inner body, one in the outer.
    assert_eq!(unit.matches("    supBind();").count(), 3);
}

#[test]
fn capture_promotes_to_closure_chain() {
    let unit = compile("(lambda (x) ((lambda (y) (+ x y)) 332))");
    assert!(unit.contains("    supBindCaptured();"));
    assert!(unit.contains("    supGetCaptured(0);"));
    assert!(unit.contains("    supPushNumber(332);"));
    // y stays in the bind array.
    assert!(unit.contains("    supBind();"));
    assert!(unit.contains("    supGet(0);"));
}

#[test]
fn fibonacci_demo_compiles() {
    let unit = compile(include_str!("../../../demos/fibonacci.lsp"));
    // Recursion through the let binding runs over the closure chain.
    assert!(unit.contains("    supBindCaptured();"));
    assert!(unit.contains("    supSetCaptured(0);"));
    assert!(unit.contains("    supGetCaptured(0);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_less_than);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_subtract);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_string_to_number);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_number_to_string);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_program_argument);"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_put_string);"));
    assert!(unit.contains("    if (top.v.number) {"));
    // Brace structure survives into the C.
    assert_eq!(unit.matches('{').count(), unit.matches('}').count());
}

#[test]
fn add_one_demo_compiles() {
    let unit = compile(include_str!("../../../demos/add-one.lsp"));
    assert!(unit.contains("    supPushLambda(&sup_builtin_add);"));
}

#[test]
fn tokenizer_error_reports_char_and_position() {
    let error = compile_source("(let (x @ 1) x)", &CompilerConfig::default()).unwrap_err();
    assert!(error.contains("char: \"@\""), "got: {error}");
    assert!(error.contains("line 1, column 9"), "got: {error}");
    assert!(error.contains("(let (x @ 1) x)"), "got: {error}");
}

#[test]
fn compile_errors_propagate() {
    let config = CompilerConfig::default();
    assert_eq!(
        compile_source("(lambda (x) ())", &config).unwrap_err(),
        "empty call detected"
    );
    assert_eq!(
        compile_source("(lambda (x) (mystery x))", &config).unwrap_err(),
        "unknown primitive: mystery"
    );
    assert_eq!(
        compile_source("42", &config).unwrap_err(),
        "program must be a single lambda expression"
    );
    assert_eq!(
        compile_source("(f", &config).unwrap_err(),
        "unexpected end of list"
    );
}

#[test]
fn comments_and_whitespace_are_ignored() {
    let plain = compile("(lambda (x) x)");
    let commented = compile("; leading comment\n(lambda (x) \n  x) ; trailing\n");
    assert_eq!(plain, commented);
}

#[test]
fn string_literals_reach_the_output() {
    let unit = compile("(lambda (x) (put-str \"hello world\"))");
    assert!(unit.contains("    supPushString(\"hello world\");"));
}
