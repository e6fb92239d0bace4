use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use asm14::asm::encoding::{write_records, ObjFileFormat, TextFormat};
use asm14::asm::{assemble_expanded, AsmFlags, UnitErr};
use asm14::err::Diagnostic;
use asm14::macros::expand;
use clap::Parser;
use crossbeam_channel as cbc;
use tracing::Level;

const SOURCE_EXT: &str = "as";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Assembly source files (the `.as` extension may be omitted)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory for the output files (default: next to each source file)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Source lines are truncated to this many characters
    #[arg(long, default_value_t = AsmFlags::default().max_line_len)]
    max_line_len: usize,

    /// Number of files assembled at the same time (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Only expand macros (writes the `.am` file)
    #[arg(long)]
    expand_only: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::WARN)]
    log_level: Level,
}

/// Settings shared by every unit.
#[derive(Clone, Copy)]
struct UnitConfig<'a> {
    out_dir: Option<&'a Path>,
    flags: AsmFlags,
    expand_only: bool,
}

enum Outcome {
    Expanded,
    Assembled { code: usize, data: usize },
    Failed(Vec<Diagnostic>),
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = UnitConfig {
        out_dir: args.out_dir.as_deref(),
        flags: AsmFlags { max_line_len: args.max_line_len },
        expand_only: args.expand_only,
    };
    let jobs = args.jobs
        .or_else(|| thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .clamp(1, args.files.len().max(1));
    tracing::debug!("assembling {} file(s) with {jobs} worker(s)", args.files.len());

    let mut results = run_units(&args.files, config, jobs);
    results.sort_by_key(|&(i, _)| i);

    let mut failed = 0;
    for (i, result) in results {
        let name = args.files[i].display();
        match result {
            Ok(Outcome::Expanded) => println!("{name}: expanded"),
            Ok(Outcome::Assembled { code, data }) => println!("{name}: assembled ({code} code words, {data} data words)"),
            Ok(Outcome::Failed(diags)) => {
                failed += 1;
                for d in &diags {
                    match d.line {
                        0 => eprintln!("{name}: {d}"),
                        _ => eprintln!("{name}:{d}"),
                    }
                    if let Some(help) = &d.help {
                        eprintln!("    help: {help}");
                    }
                }
                println!("{name}: failed with {} error(s)", diags.len());
            },
            Err(e) => {
                failed += 1;
                tracing::error!("{name}: {e:#}");
            },
        }
    }

    match failed {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Processes every file on a pool of `jobs` workers.
///
/// Each unit is independent, so one failing never stops the others.
fn run_units(files: &[PathBuf], config: UnitConfig<'_>, jobs: usize) -> Vec<(usize, anyhow::Result<Outcome>)> {
    let (job_tx, job_rx) = cbc::unbounded::<(usize, &Path)>();
    let (report_tx, report_rx) = cbc::unbounded();

    for (i, path) in files.iter().enumerate() {
        if job_tx.send((i, path.as_path())).is_err() {
            break;
        }
    }
    drop(job_tx);

    thread::scope(|s| {
        for _ in 0..jobs {
            let job_rx = job_rx.clone();
            let report_tx = report_tx.clone();
            s.spawn(move || {
                for (i, path) in job_rx {
                    let result = process_unit(path, config);
                    if report_tx.send((i, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(report_tx);

        report_rx.iter().collect()
    })
}

fn process_unit(path: &Path, config: UnitConfig<'_>) -> anyhow::Result<Outcome> {
    let src_path = match path.extension() {
        Some(_) => path.to_path_buf(),
        None => path.with_extension(SOURCE_EXT),
    };
    let src = fs::read_to_string(&src_path)
        .with_context(|| format!("cannot read {}", src_path.display()))?;

    let base = match (config.out_dir, src_path.file_stem()) {
        (Some(dir), Some(stem)) => dir.join(stem),
        _ => src_path.with_extension(""),
    };
    let _span = tracing::info_span!("unit", file = %src_path.display()).entered();

    let expanded = match expand(&src, &config.flags) {
        Ok(e) => e,
        Err(errs) => return Ok(Outcome::Failed(UnitErr::Macro(errs).diagnostics())),
    };
    write_output(&base, "am", &expanded.to_string())?;
    if config.expand_only {
        return Ok(Outcome::Expanded);
    }

    let obj = match assemble_expanded(&expanded) {
        Ok(obj) => obj,
        Err(errs) => return Ok(Outcome::Failed(UnitErr::Asm(errs).diagnostics())),
    };
    write_output(&base, "ob", &TextFormat::serialize(&obj))?;
    if !obj.entries().is_empty() {
        write_output(&base, "ent", &write_records(obj.entries()))?;
    }
    if !obj.externs().is_empty() {
        write_output(&base, "ext", &write_records(obj.externs()))?;
    }

    Ok(Outcome::Assembled { code: obj.code_len(), data: obj.data_len() })
}

fn write_output(base: &Path, ext: &str, contents: &str) -> anyhow::Result<()> {
    let mut path = OsString::from(base.as_os_str());
    path.push(".");
    path.push(ext);
    let path = PathBuf::from(path);

    fs::write(&path, contents)
        .with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}
