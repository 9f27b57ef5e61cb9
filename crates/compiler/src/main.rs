//! LOL compiler CLI.
//!
//! `lolc emit` is the canonical pipeline mode: LOL source in, C out,
//! ready for `cc` together with the runtime's `support.h`. `lolc build`
//! drives the C compiler too.

use clap::{Args, CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "lolc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "LOL compiler - lower Lisp-like programs to C", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CompileFlags {
    /// Path to a lolc.toml configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump the token stream to stderr
    #[arg(long)]
    dump_tokens: bool,

    /// Dump the parsed expression tree to stderr
    #[arg(long)]
    dump_ast: bool,

    /// Dump the lowered instruction stream to stderr
    #[arg(long)]
    dump_rpn: bool,

    /// Enable all dumps
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a LOL program to a C translation unit
    Emit {
        /// Input source file ("-" or omitted for standard input)
        input: Option<PathBuf>,

        /// Output file (defaults to standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        flags: CompileFlags,
    },

    /// Compile a LOL program to an executable via the host C compiler
    Build {
        /// Input source file
        input: PathBuf,

        /// Output executable (defaults to the input name without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the intermediate .c file
        #[arg(long)]
        keep_c: bool,

        /// C compiler to invoke (default: $CC, then cc)
        #[arg(long)]
        cc: Option<String>,

        /// Directory containing liblol_runtime.a
        #[arg(long)]
        runtime_dir: Option<PathBuf>,

        #[command(flatten)]
        flags: CompileFlags,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Emit {
            input,
            output,
            flags,
        } => resolve_config(&flags).and_then(|config| {
            lolc::emit_file(input.as_deref(), output.as_deref(), &config)
        }),
        Commands::Build {
            input,
            output,
            keep_c,
            cc,
            runtime_dir,
            flags,
        } => resolve_config(&flags).and_then(|mut config| {
            config.keep_c |= keep_c;
            if cc.is_some() {
                config.cc = cc;
            }
            if runtime_dir.is_some() {
                config.runtime_dir = runtime_dir;
            }
            let output = output.unwrap_or_else(|| {
                PathBuf::from(input.file_stem().unwrap_or_default())
            });
            lolc::build_file(&input, &output, &config)
        }),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            generate(shell, &mut command, "lolc", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        process::exit(1);
    }
}

fn resolve_config(flags: &CompileFlags) -> Result<lolc::CompilerConfig, String> {
    let mut config = lolc::CompilerConfig::load(flags.config.as_deref())?;
    config.dump_tokens |= flags.dump_tokens || flags.verbose;
    config.dump_ast |= flags.dump_ast || flags.verbose;
    config.dump_rpn |= flags.dump_rpn || flags.verbose;
    Ok(config)
}
