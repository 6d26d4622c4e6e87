use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use mpdf::config::Config;
use mpdf::editor::Editor;
use mpdf::error::{AppError, AppResult};
use mpdf::script::{ScriptCommand, parse_script, run_script};

/// Paint mosaic redactions over PDF pages and export the result as a new PDF.
#[derive(Debug, Parser)]
#[command(name = "mpdf", version)]
struct Cli {
    /// Edit script applied to every input.
    #[arg(long)]
    script: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Config file; defaults to the per-user config location.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let mut commands = match &cli.script {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| {
                AppError::io_with_context(
                    source,
                    format!("failed to read script: {}", path.display()),
                )
            })?;
            parse_script(&text)?
        }
        None => Vec::new(),
    };
    if !commands.contains(&ScriptCommand::Export) {
        commands.push(ScriptCommand::Export);
    }

    fs::create_dir_all(&cli.out_dir).map_err(|source| {
        AppError::io_with_context(
            source,
            format!("failed to create output directory: {}", cli.out_dir.display()),
        )
    })?;

    let file_name = config.export.file_name.clone();
    let mut editor = Editor::new(config)?;
    let writer = editor.default_writer();
    let prefixed = cli.inputs.len() > 1;
    let mut failures = 0;

    for input in &cli.inputs {
        let output = output_path(&cli.out_dir, input, &file_name, prefixed);
        match process_input(&mut editor, input, &output, &commands, &writer).await {
            Ok(()) => log::info!("wrote {}", output.display()),
            Err(err) => {
                failures += 1;
                log::error!("{}: {err}", input.display());
            }
        }
    }
    editor.close_document();

    if failures > 0 {
        return Err(AppError::unsupported(format!(
            "{failures} of {} input(s) failed",
            cli.inputs.len()
        )));
    }
    Ok(())
}

async fn process_input(
    editor: &mut Editor,
    input: &Path,
    output: &Path,
    commands: &[ScriptCommand],
    writer: &mpdf::writer::LopdfWriter,
) -> AppResult<()> {
    let bytes = fs::read(input).map_err(|source| {
        AppError::io_with_context(source, format!("failed to read input: {}", input.display()))
    })?;
    editor.open_document(bytes)?;
    editor.settle().await;

    let reports = run_script(editor, commands, writer).await?;
    let Some(report) = reports.last() else {
        return Err(AppError::export("script produced no export"));
    };
    fs::write(output, &report.bytes).map_err(|source| {
        AppError::io_with_context(
            source,
            format!("failed to write output: {}", output.display()),
        )
    })
}

fn output_path(out_dir: &Path, input: &Path, file_name: &str, prefixed: bool) -> PathBuf {
    if !prefixed {
        return out_dir.join(file_name);
    }
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    out_dir.join(format!("{stem}-{file_name}"))
}
