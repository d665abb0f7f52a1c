use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use fsplit_core::fsio::base_dir;
use fsplit_core::localize::FluentLoc;
use fsplit_core::merge::{default_output_path, MergeConfig, Merger};
use fsplit_core::path_safety::PathPolicy;
use fsplit_core::progress::Progress;
use fsplit_core::size::parse_chunk_size;
use fsplit_core::split::{SplitConfig, Splitter};
use fsplit_core::{verify, CancelToken, ErrorKind, Manifest};

#[derive(Parser)]
#[command(name = "fsplit", version, about = "Split files into fixed-size chunks and merge them back")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Split a file into numbered chunks plus a manifest
    Split {
        input_file: PathBuf,
        /// Directory for chunks and manifest [default: the input's directory]
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,
        /// Chunk size: a plain number is MiB, or use a B/K/M/G suffix
        #[arg(short = 's', long, env = "FSPLIT_CHUNK_SIZE", default_value = "10", value_parser = chunk_size_arg)]
        chunk_size: u64,
        /// Do not record BLAKE3 checksums in the manifest
        #[arg(long)]
        no_checksums: bool,
        /// Skip the free-space check on the output directory
        #[arg(long)]
        no_space_check: bool,
        /// Log the percentage of bytes written every few seconds
        #[arg(long)]
        progress: bool,
    },
    /// Reassemble a file from its manifest and chunks
    Merge {
        manifest_file: PathBuf,
        /// Output path [default: merged_<original name> next to the manifest]
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,
        /// Skip checksum verification (size is always checked)
        #[arg(long)]
        no_verify: bool,
        /// Allow symlinked chunks that stay inside the manifest directory
        #[arg(long)]
        follow_symlinks: bool,
        /// Log the percentage of chunks merged every few seconds
        #[arg(long)]
        progress: bool,
    },
    /// Check every chunk against the manifest without writing output
    Verify {
        manifest_file: PathBuf,
        /// Allow symlinked chunks that stay inside the manifest directory
        #[arg(long)]
        follow_symlinks: bool,
    },
    /// Show what a manifest describes
    Info { manifest_file: PathBuf },
}

impl Cmd {
    fn wants_progress(&self) -> bool {
        matches!(self, Cmd::Split { progress: true, .. } | Cmd::Merge { progress: true, .. })
    }
}

fn chunk_size_arg(s: &str) -> std::result::Result<u64, String> {
    parse_chunk_size(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose, cli.cmd.wants_progress()) {
        eprintln!("fsplit: {e:#}");
    }
    let loc = FluentLoc::builtin("en-GB");
    match run(cli.cmd, &loc) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", loc.msg("error-line", &[("detail", format!("{err:#}").as_str())]));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cmd: Cmd, loc: &FluentLoc) -> Result<ExitCode> {
    match cmd {
        Cmd::Split { input_file, output_dir, chunk_size, no_checksums, no_space_check, progress } => {
            let cfg = SplitConfig {
                chunk_size,
                checksums: !no_checksums,
                check_free_space: !no_space_check,
            };
            split(&input_file, output_dir, &cfg, progress, loc)
        }
        Cmd::Merge { manifest_file, output_file, no_verify, follow_symlinks, progress } => {
            let cfg = MergeConfig {
                verify_checksums: !no_verify,
                policy: PathPolicy { follow_symlinks },
            };
            merge(&manifest_file, output_file, &cfg, progress, loc)
        }
        Cmd::Verify { manifest_file, follow_symlinks } => {
            verify_chunks(&manifest_file, PathPolicy { follow_symlinks }, loc)
        }
        Cmd::Info { manifest_file } => info(&manifest_file, loc),
    }
}

/// Map a failure onto the process exit status.
fn exit_code(err: &anyhow::Error) -> u8 {
    let Some(e) = err.downcast_ref::<fsplit_core::Error>() else {
        return 1;
    };
    match e.kind() {
        ErrorKind::IoFailure => 1,
        ErrorKind::InvalidArgument => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::InvalidManifest => 4,
        ErrorKind::ChunkMissing => 5,
        ErrorKind::Corrupt => 6,
        ErrorKind::Cancelled => 130,
    }
}

fn init_tracing(verbose: u8, progress: bool) -> Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let mut filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("create env filter")?;
    if progress {
        filter = filter.add_directive("fsplit::progress=info".parse()?);
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing: {e}"))
}

fn split(
    input: &Path,
    output_dir: Option<PathBuf>,
    cfg: &SplitConfig,
    show_progress: bool,
    loc: &FluentLoc,
) -> Result<ExitCode> {
    let out_dir = output_dir.unwrap_or_else(|| base_dir(input).to_path_buf());

    let prog = Progress::new(show_progress);
    prog.set_stage("Splitting");
    prog.start();
    let res = Splitter::split_with(input, &out_dir, cfg, &prog, &CancelToken::new());
    prog.stop();
    let res = res.with_context(|| format!("split {}", input.display()))?;

    let mf = &res.manifest;
    let dir = out_dir.display().to_string();
    let summary = if mf.chunk_count == 0 {
        loc.msg("split-empty", &[("file", mf.original_filename.as_str()), ("dir", dir.as_str())])
    } else {
        loc.msg(
            "split-done",
            &[
                ("file", mf.original_filename.as_str()),
                ("chunks", mf.chunk_count.to_string().as_str()),
                ("chunk_size", mf.chunk_size.to_string().as_str()),
                ("dir", dir.as_str()),
            ],
        )
    };
    eprintln!("{summary}");
    println!("{}", res.manifest_path.display());
    Ok(ExitCode::SUCCESS)
}

fn merge(
    manifest_path: &Path,
    output_file: Option<PathBuf>,
    cfg: &MergeConfig,
    show_progress: bool,
    loc: &FluentLoc,
) -> Result<ExitCode> {
    let mf = Manifest::load(manifest_path)?;
    let output = output_file.unwrap_or_else(|| default_output_path(manifest_path, &mf));

    let prog = Progress::new(show_progress);
    prog.set_stage("Merging");
    prog.start();
    let res = Merger::merge_with(manifest_path, &output, cfg, &prog, &CancelToken::new());
    prog.stop();
    let output = res.with_context(|| format!("merge {}", manifest_path.display()))?;

    eprintln!(
        "{}",
        loc.msg(
            "merge-done",
            &[
                ("chunks", mf.chunk_count.to_string().as_str()),
                ("bytes", mf.original_size.to_string().as_str()),
                ("output", output.display().to_string().as_str()),
            ],
        )
    );
    println!("{}", output.display());
    Ok(ExitCode::SUCCESS)
}

fn verify_chunks(manifest_path: &Path, policy: PathPolicy, loc: &FluentLoc) -> Result<ExitCode> {
    let rep = verify::verify_with_policy(manifest_path, policy)?;
    if !rep.checksums_checked {
        eprintln!("{}", loc.msg("verify-no-checksums", &[]));
    }
    for name in &rep.missing {
        eprintln!("  missing     {name}");
    }
    for name in &rep.wrong_size {
        eprintln!("  wrong size  {name}");
    }
    for name in &rep.corrupt {
        eprintln!("  corrupt     {name}");
    }
    if rep.file_ok == Some(false) {
        eprintln!("{}", loc.msg("verify-file-mismatch", &[]));
    }

    if rep.is_ok() {
        println!("{}", loc.msg("verify-ok", &[("chunks", rep.chunks_ok.to_string().as_str())]));
        return Ok(ExitCode::SUCCESS);
    }
    println!(
        "{}",
        loc.msg(
            "verify-bad",
            &[
                ("missing", rep.missing.len().to_string().as_str()),
                ("wrong_size", rep.wrong_size.len().to_string().as_str()),
                ("corrupt", rep.corrupt.len().to_string().as_str()),
            ],
        )
    );
    let code = if rep.missing.is_empty() && rep.wrong_size.is_empty() { 6 } else { 5 };
    Ok(ExitCode::from(code))
}

fn info(manifest_path: &Path, loc: &FluentLoc) -> Result<ExitCode> {
    let mf = Manifest::load(manifest_path)?;
    println!(
        "{}",
        loc.msg(
            "info-summary",
            &[
                ("file", mf.original_filename.as_str()),
                ("bytes", mf.original_size.to_string().as_str()),
                ("chunks", mf.chunk_count.to_string().as_str()),
                ("chunk_size", mf.chunk_size.to_string().as_str()),
                ("created", mf.created_utc.as_str()),
            ],
        )
    );
    let state = if mf.has_checksums() { "blake3" } else { "none" };
    println!("{}", loc.msg("info-checksums", &[("state", state)]));
    for (i, name) in mf.chunk_names.iter().enumerate() {
        println!("  {name}  {}", mf.chunk_len(i));
    }
    Ok(ExitCode::SUCCESS)
}
