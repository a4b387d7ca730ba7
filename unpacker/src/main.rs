use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use swf_nls::Encoding;
use unpacker::{trace::DEFAULT_STEP_LIMIT, UnpackConfig, Unpacker};

/// Undo jump-trampoline obfuscation in SWF action bytecode
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, required = true)]
    input: PathBuf,

    #[arg(short, long, required = true)]
    output: PathBuf,

    /// string encoding of the traced code (utf8, sjis, gbk)
    #[arg(short, long, default_value = "utf8")]
    nls: Encoding,

    /// write a YAML report of the restored tags
    #[arg(short, long)]
    report: Option<PathBuf>,

    #[arg(long, default_value_t = 253)]
    marker_tag: u16,

    #[arg(long, default_value_t = 255)]
    padding_tag: u16,

    #[arg(long, default_value_t = DEFAULT_STEP_LIMIT)]
    step_limit: u64,
}

fn run(args: Args) -> Result<()> {
    let input = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut unpacker = Unpacker::new(UnpackConfig {
        marker_code: args.marker_tag,
        padding_code: args.padding_tag,
        nls: args.nls,
        step_limit: args.step_limit,
    });
    let output = unpacker
        .unpack(&input)
        .with_context(|| format!("failed to unpack {}", args.input.display()))?;

    std::fs::write(&args.output, &output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!(
        "{} -> {}: {} bytes -> {} bytes",
        args.input.display(),
        args.output.display(),
        input.len(),
        output.len()
    );

    if let Some(path) = &args.report {
        unpacker.report().write(path)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
