use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use log::{debug, info};
use postview_core::{
    ContentPipeline, Diagnostic, DiagnosticSeverity, MountedDocument, PipelineConfig, TocEntry,
    nest_toc,
};
use postview_renderer::{Highlighter, HighlighterConfig, Renderer, Theme};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut input: Option<String> = None;
    let mut api_base: Option<String> = None;
    let mut highlight = true;
    let mut theme = Theme::Auto;
    let mut standalone = false;
    let mut title: Option<String> = None;
    let mut assets_dir: Option<PathBuf> = None;
    let mut toc_mode: Option<OutputMode> = None;
    let mut diagnostics_mode: Option<OutputMode> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--api-base" => api_base = Some(expect_value(&mut args, "--api-base")),
            "--no-highlight" => highlight = false,
            "--standalone" => standalone = true,
            "--title" => title = Some(expect_value(&mut args, "--title")),
            "--assets" => assets_dir = Some(PathBuf::from(expect_value(&mut args, "--assets"))),
            "--theme" => {
                let value = expect_value(&mut args, "--theme");
                theme = Theme::parse(&value).unwrap_or_else(|| {
                    eprintln!("--theme expects: light | dark | auto");
                    print_usage();
                    process::exit(2);
                });
            }
            "--toc" => toc_mode = Some(output_mode(args.next().as_deref(), "--toc")),
            "--diagnostics" => {
                diagnostics_mode = Some(output_mode(args.next().as_deref(), "--diagnostics"))
            }
            _ => {
                if input.is_none() && !arg.starts_with("--") {
                    input = Some(arg);
                } else {
                    eprintln!("unexpected argument: {}", arg);
                    print_usage();
                    process::exit(2);
                }
            }
        }
    }

    let config = PipelineConfig::from_env().and_then(|config| match &api_base {
        Some(base) => config.with_api_base(base),
        None => Ok(config),
    });
    let config = config.unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(2);
    });
    debug!("cli: api base {}", config.api_base());

    let source = match input {
        Some(path) => fs::read_to_string(&path).unwrap_or_else(|err| {
            eprintln!("failed to read {}: {}", path, err);
            process::exit(1);
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .unwrap_or_else(|err| {
                    eprintln!("failed to read stdin: {}", err);
                    process::exit(1);
                });
            buffer
        }
    };

    let pipeline = ContentPipeline::new(config);
    let document = pipeline.render(&source);
    info!("cli: rendered {} content", document.encoding().as_str());

    let mut mounted = MountedDocument::mount(&document);
    let toc = mounted.extract_toc();
    if highlight {
        let highlighter = Highlighter::new(HighlighterConfig::default_set(theme));
        let report = highlighter.highlight_all(&mut mounted);
        debug!("cli: {:?}", report);
    }

    if let Some(mode) = diagnostics_mode {
        emit_diagnostics(document.diagnostics(), mode);
    }

    let renderer = Renderer::new(theme);
    if let Some(dir) = &assets_dir {
        if let Err(err) = renderer.generate_files(dir) {
            eprintln!("failed to write assets to {}: {}", dir.display(), err);
            process::exit(1);
        }
    }

    if let Some(mode) = toc_mode {
        print!("{}", toc_output(&toc, mode));
        return;
    }

    let body = mounted.to_safe_html();
    if standalone {
        let inline = assets_dir.is_none();
        print!(
            "{}",
            renderer.embed_html(title.as_deref(), &body, &toc, inline, inline)
        );
    } else {
        println!("{}", body);
    }
}

fn print_usage() {
    eprintln!(
        "Usage: postview [--api-base URL] [--no-highlight] [--theme light|dark|auto] [--standalone] [--title TEXT] [--assets DIR] [--toc json|pretty] [--diagnostics json|pretty] [input]"
    );
}

fn expect_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("{} expects a value", flag);
        print_usage();
        process::exit(2);
    })
}

#[derive(Clone, Copy)]
enum OutputMode {
    Json,
    Pretty,
}

fn output_mode(value: Option<&str>, flag: &str) -> OutputMode {
    match value {
        Some("json") => OutputMode::Json,
        Some("pretty") => OutputMode::Pretty,
        _ => {
            eprintln!("{} expects: json | pretty", flag);
            print_usage();
            process::exit(2);
        }
    }
}

fn emit_diagnostics(diagnostics: &[Diagnostic], mode: OutputMode) {
    match mode {
        OutputMode::Json => eprintln!("{}", to_json(diagnostics)),
        OutputMode::Pretty => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic_to_pretty(diagnostic));
            }
        }
    }
}

fn diagnostic_to_pretty(diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        DiagnosticSeverity::Warning => "warning",
        DiagnosticSeverity::Info => "info",
    };
    format!("{} {} {}", severity, diagnostic.code, diagnostic.message)
}

fn toc_output(toc: &[TocEntry], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => format!("{}\n", to_json(&nest_toc(toc))),
        OutputMode::Pretty => {
            let mut out = String::new();
            for entry in toc {
                out.push_str(&"  ".repeat(usize::from(entry.level.saturating_sub(1))));
                out.push_str(&format!("{} #{}\n", entry.text, entry.id));
            }
            out
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        eprintln!("failed to encode json: {}", err);
        process::exit(1);
    })
}
