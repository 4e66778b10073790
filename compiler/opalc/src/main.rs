//! Opal compiler CLI.
//!
//! ```text
//! opalc [options] file...
//! ```
//!
//! Compiles each input to an artifact (`--emit llvm|asm|obj`), or links all
//! inputs in memory and runs the entry function (`--JIT`), exiting with its
//! return value.

use std::path::PathBuf;
use std::process::ExitCode;

use opal_diagnostic::SourceFile;
use opal_llvm::aot::{OptLevel, OutputFormat, RelocModel};
use opal_llvm::{CompileOptions, Compiler, ParsedUnit};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Cli {
    help: bool,
    version: bool,
    jit: bool,
    emit: Option<OutputFormat>,
    opt_level: Option<OptLevel>,
    reloc_model: Option<RelocModel>,
    inputs: Vec<PathBuf>,
}

/// Error from command-line parsing; printed to stderr with the program name.
#[derive(Debug, PartialEq)]
struct CliError(String);

fn parse_args(args: &[String]) -> Result<Cli, CliError> {
    let mut cli = Cli::default();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => cli.help = true,
            "--version" | "-v" => cli.version = true,
            "--JIT" => cli.jit = true,
            "--emit" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError("--emit requires an argument".into()))?;
                cli.emit = Some(
                    OutputFormat::from_name(&value.to_lowercase()).ok_or_else(|| {
                        CliError(format!(
                            "invalid --emit target '{value}' (expected llvm, asm, or obj)"
                        ))
                    })?,
                );
            }
            "--Opt" | "-O" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError("--Opt requires an argument".into()))?;
                let digit: u32 = value
                    .parse()
                    .map_err(|_| CliError(format!("invalid optimization level '{value}'")))?;
                cli.opt_level = Some(OptLevel::from_digit(digit).ok_or_else(|| {
                    CliError(format!("invalid optimization level '{value}' (expected 0..3)"))
                })?);
            }
            "--relocation-model" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError("--relocation-model requires an argument".into()))?;
                cli.reloc_model =
                    Some(RelocModel::from_name(&value.to_lowercase()).ok_or_else(|| {
                        CliError(format!(
                            "invalid relocation model '{value}' (expected static or pic)"
                        ))
                    })?);
            }
            "--input-file" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError("--input-file requires an argument".into()))?;
                cli.inputs.push(PathBuf::from(value));
            }
            other if other.starts_with('-') => {
                return Err(CliError(format!("unrecognized option '{other}'")));
            }
            path => cli.inputs.push(PathBuf::from(path)),
        }
    }

    Ok(cli)
}

fn print_usage() {
    println!("Usage: opalc [options] file...");
    println!();
    println!("Options:");
    println!("  --help, -h             Display this information.");
    println!("  --version, -v          Display version.");
    println!("  --JIT                  Perform just-in-time compilation.");
    println!("                         Multiple input files are linked and executed.");
    println!("  --emit <llvm|asm|obj>  Set the compilation target per input file.");
    println!("                         Default is 'obj'.");
    println!("  --Opt, -O <0..3>       Set the optimization level.");
    println!("  --relocation-model <static|pic>");
    println!("                         Set the relocation model for emitted code.");
    println!("  --input-file <path>    Input file; bare arguments are equivalent.");
}

fn program_name() -> String {
    std::env::args()
        .next()
        .unwrap_or_else(|| "opalc".to_string())
}

fn run() -> Result<Option<i32>, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() {
        print_usage();
        return Ok(None);
    }

    let cli = parse_args(&args).map_err(|e| e.0)?;

    if cli.version {
        println!("opalc version {VERSION}");
        return Ok(None);
    }
    if cli.help {
        print_usage();
        return Ok(None);
    }
    if cli.inputs.is_empty() {
        return Err("no input files".to_string());
    }

    let mut units = Vec::with_capacity(cli.inputs.len());
    for path in cli.inputs {
        let src = std::fs::read_to_string(&path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        let file = SourceFile::new(path.display().to_string(), src);
        let program = opal_parse::parse(&file).map_err(|diag| file.render(&diag))?;
        units.push(ParsedUnit {
            path,
            file,
            program,
        });
    }

    let options = CompileOptions {
        jit: cli.jit,
        emit: cli.emit.unwrap_or(OutputFormat::Object),
        opt_level: cli.opt_level.unwrap_or_default(),
        reloc_model: cli.reloc_model.unwrap_or_default(),
    };
    let outcome = Compiler::new(options)
        .run(units)
        .map_err(|e| e.to_string())?;

    Ok(outcome.jit_exit)
}

fn main() -> ExitCode {
    opal_llvm::init_tracing();

    match run() {
        Ok(Some(code)) => ExitCode::from(code as u8),
        Ok(None) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}: {}", program_name(), message);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn positional_and_input_file_are_equivalent() {
        let a = parse_args(&args(&["main.opal"])).unwrap();
        let b = parse_args(&args(&["--input-file", "main.opal"])).unwrap();
        assert_eq!(a.inputs, b.inputs);
    }

    #[test]
    fn parses_all_options() {
        let cli = parse_args(&args(&[
            "--JIT",
            "--emit",
            "llvm",
            "-O",
            "2",
            "--relocation-model",
            "static",
            "a.opal",
            "b.opal",
        ]))
        .unwrap();
        assert!(cli.jit);
        assert_eq!(cli.emit, Some(OutputFormat::LlvmIr));
        assert_eq!(cli.opt_level, Some(OptLevel::O2));
        assert_eq!(cli.reloc_model, Some(RelocModel::Static));
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn rejects_bad_emit_target() {
        assert!(parse_args(&args(&["--emit", "wasm"])).is_err());
    }

    #[test]
    fn rejects_bad_opt_level() {
        assert!(parse_args(&args(&["-O", "4"])).is_err());
        assert!(parse_args(&args(&["-O", "two"])).is_err());
    }

    #[test]
    fn rejects_unknown_option() {
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn help_and_version_flags() {
        assert!(parse_args(&args(&["--help"])).unwrap().help);
        assert!(parse_args(&args(&["-v"])).unwrap().version);
    }
}
