//! LOL compiler library.
//!
//! Lowers a minimal Lisp-like language to a C translation unit that
//! runs against the `lol-runtime` stack VM. The pipeline is strictly
//! linear (characters, tokens, expression tree, stack-machine
//! instructions, resolved instructions, C text) and each stage only
//! reads its predecessor's output:
//!
//! 1. [`tokenizer`]: streaming five-state automaton.
//! 2. [`parser`]: recursive descent into an arena of cons cells.
//! 3. [`rpn`]: lowering to reverse-Polish stack instructions.
//! 4. [`capture_analysis`]: promote closure-captured bindings.
//! 5. [`resolver`]: replace name references with hop counts.
//! 6. [`codegen`]: one C function per lambda plus a `main` driver.
//!
//! [`compile_source`] runs the whole pipeline; [`build_file`] goes one
//! step further and drives the host C compiler against the runtime
//! static library.

pub mod ast;
pub mod builtins;
pub mod capture_analysis;
pub mod codegen;
pub mod config;
pub mod parser;
pub mod resolver;
pub mod rpn;
pub mod tokenizer;

pub use codegen::{CodeGen, CodeGenError};
pub use config::CompilerConfig;
pub use parser::Parser;
pub use rpn::Instruction;
pub use tokenizer::{SourceBuffer, Token, TokenKind, TokenizeError, Tokenizer};

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The runtime header the generated unit includes, embedded so `build`
/// works without a source checkout next to the binary.
pub static SUPPORT_HEADER: &str = include_str!("../../runtime/include/support.h");

const RUNTIME_LIB: &str = "liblol_runtime.a";

/// Compile LOL source text to a C translation unit.
pub fn compile_source(text: &str, config: &CompilerConfig) -> Result<String, String> {
    let mut source = SourceBuffer::new();
    source.append(text);

    let tokens = tokenizer::tokenize(&source).map_err(|error| error.describe(&source))?;
    if config.dump_tokens {
        eprint!("{}", tokenizer::dump(&tokens, &source));
    }

    let (ast, root) = Parser::new(&tokens).parse()?;
    if config.dump_ast {
        eprintln!("{}", ast::pretty(&ast, &source, root));
    }

    let mut code = rpn::lower(&source, &ast, root)?;
    capture_analysis::analyze(&source, &mut code);
    resolver::resolve(&source, &mut code);
    if config.dump_rpn {
        eprint!("{}", rpn::dump(&code, &source));
    }

    codegen::generate(&source, &code).map_err(|error| error.to_string())
}

/// Compile a source file (or stdin for `-`) and write the C unit to
/// `output` (or stdout for `None`).
pub fn emit_file(
    input: Option<&Path>,
    output: Option<&Path>,
    config: &CompilerConfig,
) -> Result<(), String> {
    let text = read_source(input)?;
    let unit = compile_source(&text, config)?;
    match output {
        Some(path) => fs::write(path, unit)
            .map_err(|error| format!("failed to write {}: {error}", path.display())),
        None => {
            print!("{unit}");
            Ok(())
        }
    }
}

/// Compile a source file all the way to an executable: emit C, extract
/// the support header, and invoke the host C compiler against the
/// runtime static library.
pub fn build_file(input: &Path, output: &Path, config: &CompilerConfig) -> Result<(), String> {
    let text = read_source(Some(input))?;
    let unit = compile_source(&text, config)?;

    let c_path = output.with_extension("c");
    fs::write(&c_path, unit)
        .map_err(|error| format!("failed to write {}: {error}", c_path.display()))?;

    let include_dir = env::temp_dir().join("lol-support");
    fs::create_dir_all(&include_dir)
        .map_err(|error| format!("failed to create include dir: {error}"))?;
    fs::write(include_dir.join("support.h"), SUPPORT_HEADER)
        .map_err(|error| format!("failed to write support.h: {error}"))?;

    let runtime_dir = find_runtime_dir(config)?;
    let cc = config
        .cc
        .clone()
        .or_else(|| env::var("CC").ok())
        .unwrap_or_else(|| "cc".to_string());

    let mut command = Command::new(&cc);
    command
        .arg(&c_path)
        .arg("-o")
        .arg(output)
        .arg("-I")
        .arg(&include_dir)
        .arg("-L")
        .arg(&runtime_dir)
        .arg("-llol_runtime");
    #[cfg(target_os = "linux")]
    command.args(["-lpthread", "-ldl", "-lm"]);

    let result = command
        .output()
        .map_err(|error| format!("failed to run {cc}: {error}"))?;

    if !config.keep_c {
        fs::remove_file(&c_path).ok();
    }

    if !result.status.success() {
        return Err(format!(
            "{cc} failed:\n{}",
            String::from_utf8_lossy(&result.stderr)
        ));
    }
    Ok(())
}

fn read_source(input: Option<&Path>) -> Result<String, String> {
    match input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .map_err(|error| format!("failed to read {}: {error}", path.display())),
        _ => {
            use std::io::Read as _;
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|error| format!("failed to read stdin: {error}"))?;
            Ok(text)
        }
    }
}

/// Locate the directory holding the runtime static library: an explicit
/// setting first, then next to the running executable, then the local
/// cargo target directories.
fn find_runtime_dir(config: &CompilerConfig) -> Result<PathBuf, String> {
    if let Some(dir) = &config.runtime_dir {
        if dir.join(RUNTIME_LIB).exists() {
            return Ok(dir.clone());
        }
        return Err(format!("{RUNTIME_LIB} not found in {}", dir.display()));
    }

    let mut candidates = Vec::new();
    if let Ok(exe) = env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(PathBuf::from("target/release"));
    candidates.push(PathBuf::from("target/debug"));

    for candidate in candidates {
        if candidate.join(RUNTIME_LIB).exists() {
            return Ok(candidate);
        }
    }
    Err(format!(
        "{RUNTIME_LIB} not found; build it with `cargo build -p lol-runtime` \
         or pass --runtime-dir"
    ))
}
