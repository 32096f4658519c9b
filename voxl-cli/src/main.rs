use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use voxl_core::{
    BuildArtifact, BuildTarget, Compilation, CompileOptions, CoreError, PlacerKind, compile,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, help = "Input file (defaults to stdin)")]
    input: Option<String>,

    #[arg(short, long)]
    output: String,

    #[arg(
        long,
        value_name = "TARGET",
        default_value = "script",
        help = "Output target: script, gamefile"
    )]
    emit: String,

    #[arg(
        long,
        value_name = "STRATEGY",
        default_value = "ground",
        help = "Block layout strategy: ground, tower"
    )]
    placer: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let target = match cli.emit.as_str() {
        "script" => BuildTarget::EditorScript,
        "gamefile" => BuildTarget::GameFile,
        other => return Err(CoreError::UnsupportedTarget(other.to_string()).into()),
    };
    let placer = match cli.placer.as_str() {
        "ground" => PlacerKind::Ground,
        "tower" => PlacerKind::Tower,
        other => return Err(CoreError::UnsupportedPlacer(other.to_string()).into()),
    };

    let source = match cli.input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let compilation = compile(
        &source,
        CompileOptions {
            target,
            placer,
            ..CompileOptions::default()
        },
    );
    report_diagnostics(&compilation);

    let Some(artifact) = compilation.artifact else {
        let errors = compilation
            .diagnostics
            .iter()
            .filter(|d| d.is_error)
            .count();
        return Err(CoreError::CompilationFailed { errors }.into());
    };

    let rendered = match artifact {
        BuildArtifact::Script(script) => script,
        BuildArtifact::GameFile(file) => {
            let mut listing = String::new();
            for block in &file.blocks {
                writeln!(listing, "block {} {} at {}", block.def_id, block.name, block.position)?;
            }
            for setting in &file.settings {
                writeln!(listing, "setting {} {:?}", setting.block, setting.value)?;
            }
            for connection in &file.connections {
                writeln!(
                    listing,
                    "connect {}:{} -> {}:{}",
                    connection.from.block,
                    connection.from.terminal,
                    connection.to.block,
                    connection.to.terminal
                )?;
            }
            listing
        }
    };
    write_output(&cli.output, rendered.as_bytes())
}

fn report_diagnostics(compilation: &Compilation) {
    for diagnostic in &compilation.diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}
