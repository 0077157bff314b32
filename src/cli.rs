use crate::config::load_config;
use crate::diagnostics::{Report, generate_auto_fix_suggestions, generate_diagnostic_report, write_report};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_scene, write_output_svg};
use crate::scene::parse_scene;
use crate::theme::Theme;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "svgscene", version, about = "Scene-graph SVG renderer with boundary enforcement")]
pub struct Args {
    /// Scene file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON5 file (theme + render knobs)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write the machine-readable diagnostics report here
    #[arg(long = "report")]
    pub report: Option<PathBuf>,

    /// Enforce only, skip painting; exits nonzero if errors were found
    #[arg(long = "check", default_value_t = false)]
    pub check: bool,

    /// Named theme
    #[arg(long = "theme", value_enum)]
    pub theme: Option<ThemeName>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ThemeName {
    Light,
    Midnight,
}

pub fn run() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = args.theme {
        config.theme = match name {
            ThemeName::Light => Theme::light(),
            ThemeName::Midnight => Theme::midnight(),
        };
    }

    let input = read_input(args.input.as_deref())?;
    let scene = parse_scene(&input)?;

    if args.check {
        let report = generate_diagnostic_report(&scene);
        if let Some(path) = &args.report {
            write_report(path, &report)?;
        }
        print_check_summary(&report);
        if report.summary.errors > 0 {
            anyhow::bail!(
                "{} boundary violation(s) in scene '{}'",
                report.summary.errors,
                report.scene_id
            );
        }
        return Ok(());
    }

    let output = render_scene(&scene, &config)?;

    if let Some(path) = &args.report {
        // Reuse the pass-1 result instead of enforcing twice.
        let report = Report {
            scene_id: scene.id.clone(),
            summary: output.enforcement.summary,
            suggestions: generate_auto_fix_suggestions(&output.enforcement),
            diagnostics: output.enforcement.diagnostics.clone(),
        };
        write_report(path, &report)?;
    }

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&output.svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            #[cfg(feature = "png")]
            {
                let path = ensure_output(&args.output, "png")?;
                write_output_png(&output.svg, &path, &config.render)?;
            }
            #[cfg(not(feature = "png"))]
            anyhow::bail!("PNG output requires the 'png' feature");
        }
    }

    Ok(())
}

fn print_check_summary(report: &Report) {
    println!(
        "scene '{}': {} nodes, {} boundaries, {} error(s), {} warning(s)",
        report.scene_id,
        report.summary.total_nodes,
        report.summary.boundaries_processed,
        report.summary.errors,
        report.summary.warnings
    );
    for diagnostic in &report.diagnostics {
        println!("  {}", diagnostic.message);
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
