use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dfatrie_dfa::{Automaton, DEFAULT_SPLIT_THRESHOLD};
use dfatrie_gen::{GenConfig, Orchestrator, Progress};
use dfatrie_oracle::NativeValidator;
use dfatrie_proof::{IcedDisassembler, Operands, TrieDiffSet};
use dfatrie_trie::{read_trie, write_trie, NodeCache};
use dfatrie_types::{hex_bytes, Bitness};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dfatrie", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Enumerate a decoder automaton, confirm every candidate with the validator and write the
    /// resulting trie.
    Gen(GenArgs),
    /// Print the instructions accepted by only one of two tries.
    Diff(DiffArgs),
    /// List every sequence a trie accepts.
    Dump(DumpArgs),
}

#[derive(Debug, Parser)]
struct GenArgs {
    /// Instruction set mode, 32 or 64.
    #[arg(long)]
    bitness: Bitness,

    /// Validator shared library exporting `ValidateChunk` and
    /// `ValidateAndGetFinalRestrictedRegister`.
    #[arg(long)]
    validator_dll: PathBuf,

    /// Output trie file.
    #[arg(long)]
    trie_path: PathBuf,

    /// Worker threads (defaults to the number of CPUs).
    #[arg(long, env = "DFATRIE_JOBS")]
    jobs: Option<usize>,

    /// Split automaton states into separate tasks while they emit more candidates than this.
    #[arg(long, env = "DFATRIE_SPLIT_THRESHOLD", default_value_t = DEFAULT_SPLIT_THRESHOLD)]
    split_threshold: u64,

    /// Hide the progress bar.
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Decoder automaton in JSON form.
    dfa: PathBuf,
}

#[derive(Debug, Parser)]
struct DiffArgs {
    /// Instruction set mode the tries were built for, 32 or 64.
    #[arg(long)]
    bitness: Bitness,

    /// Print the differences as JSON instead of one instruction per line.
    #[arg(long, default_value_t = false)]
    json: bool,

    first: PathBuf,
    second: PathBuf,
}

#[derive(Debug, Parser)]
struct DumpArgs {
    trie: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Gen(args) => gen(args),
        Commands::Diff(args) => diff(args),
        Commands::Dump(args) => dump(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dfatrie: {err:#}");
            ExitCode::from(2)
        }
    }
}

struct BarProgress(ProgressBar);

impl Progress for BarProgress {
    fn on_start(&mut self, expected: u64, tasks: usize) {
        self.0.set_length(expected);
        self.0.set_message(format!("{tasks} tasks"));
    }

    fn on_merged(&mut self, processed: u64, _expected: u64) {
        self.0.set_position(processed);
    }
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} instructions {msg} ({eta})",
        )?
        .progress_chars("##-"),
    );
    Ok(pb)
}

fn gen(args: GenArgs) -> Result<ExitCode> {
    let automaton = Automaton::load(&args.dfa)
        .with_context(|| format!("load automaton {}", args.dfa.display()))?;
    let validator = NativeValidator::load(&args.validator_dll)
        .with_context(|| format!("load validator {}", args.validator_dll.display()))?;

    let mut config = GenConfig::new(args.bitness);
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    config.split_threshold = args.split_threshold;

    let mut progress = BarProgress(progress_bar(args.quiet)?);
    let output = Orchestrator::new(&automaton, &validator, config).run(&mut progress);
    progress.0.finish_and_clear();
    let output = output.context("enumeration failed")?;

    write_trie(&output.cache, output.root, &args.trie_path)
        .with_context(|| format!("write trie {}", args.trie_path.display()))?;
    eprintln!(
        "{} of {} instructions accepted; trie written to {}",
        output.num_valid,
        output.total_instructions,
        args.trie_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn load_trie(cache: &mut NodeCache, path: &Path) -> Result<dfatrie_trie::NodeId> {
    read_trie(cache, path).with_context(|| format!("read trie {}", path.display()))
}

#[derive(Serialize)]
struct DiffReport<'a> {
    accept_trie1: Vec<&'a Operands>,
    accept_trie2: Vec<&'a Operands>,
}

fn diff(args: DiffArgs) -> Result<ExitCode> {
    let mut cache = NodeCache::new();
    let first = load_trie(&mut cache, &args.first)?;
    let second = load_trie(&mut cache, &args.second)?;

    let mut diff_set = TrieDiffSet::new(&IcedDisassembler, args.bitness);
    diff_set
        .collect(&cache, first, second)
        .context("compare tries")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let report = DiffReport {
            accept_trie1: diff_set.accept_trie1.iter().collect(),
            accept_trie2: diff_set.accept_trie2.iter().collect(),
        };
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for (label, set) in [
            (args.first.display(), &diff_set.accept_trie1),
            (args.second.display(), &diff_set.accept_trie2),
        ] {
            writeln!(out, "accepted only by {label}: {}", set.len())?;
            for ops in set {
                writeln!(out, "  {ops}")?;
            }
        }
    }

    Ok(if diff_set.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn dump(args: DumpArgs) -> Result<ExitCode> {
    let mut cache = NodeCache::new();
    let root = load_trie(&mut cache, &args.trie)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (sequence, info) in cache.sequences(root) {
        writeln!(out, "{}\t{info}", hex_bytes(&sequence))?;
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn gen_help_mentions_default_split_threshold() {
        let mut cmd = Cli::command();
        let gen = cmd.find_subcommand_mut("gen").expect("gen subcommand");
        let help = gen.render_long_help().to_string();
        assert!(
            help.contains(&format!("[default: {DEFAULT_SPLIT_THRESHOLD}]")),
            "gen help did not mention the split threshold default; help was:\n{help}"
        );
    }

    #[test]
    fn bitness_is_validated_at_parse_time() {
        let err = Cli::try_parse_from(["dfatrie", "diff", "--bitness", "16", "a", "b"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
