use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tplexpand::fs_utils::load_tag_files;
use tplexpand::{
    LineEnding, ReferenceKind, Result, TagDictionary, TagReference, TemplateEngine, find_references,
};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt};

const LONG_HELP: &str = r#"
Directives (whole lines):
  !!ifempty: NAME!!       - Emit the block if NAME is undefined or empty
  !!ifnotempty: NAME!!    - Emit the block if NAME has a value
  !!elifempty: NAME!!     - Alternative branch of the current block
  !!elifnotempty: NAME!!  - Alternative branch of the current block
  !!else!!                - Taken when no earlier branch matched
  !!endif!!               - Close the block

Placeholders:
  %%NAME%%                 - Replaced by the value of NAME
  %%NAME:spaceindent=N%%   - Indent every inserted line with N spaces
  %%NAME:tabindent=N%%     - Indent every inserted line with N tabs
  %%NAME:keepindent%%      - Continue multi-line values at the line's indentation
  %%NAME:skipempty%%       - Drop the whole line if NAME is empty
  Options combine with ':', e.g. %%NAME:keepindent:skipempty%%

Tag files are JSON objects. Strings are used verbatim, numbers as text,
true as "true", false/null as undefined, arrays of strings as multi-line values.

Examples:
  # Expand a template with tags from a JSON file
  tplexpand Custom.shader.template --tags tags.json -o Custom.shader
  # Define tags on the command line (a bare NAME means "true")
  tplexpand template.txt -D ShaderName=Custom -D UseOutline
  # Read the template from stdin and write CRLF line endings
  cat template.txt | tplexpand - -t tags.json --newline crlf
  # Validate conditional blocks and report undefined tags
  tplexpand template.txt -t tags.json --check
  # List all tags the template uses
  tplexpand template.txt --list
  # List with details and whether each tag is defined
  tplexpand template.txt -t tags.json --list=detailed
  # Output as JSON for scripting
  tplexpand template.txt --list=json
"#;

/// Expands line-oriented code generation templates.
#[derive(Parser, Debug)]
#[command(
    name = "tplexpand",
    version,
    about = "Expands code generation templates with conditional blocks and tag substitution.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Template file to expand. Use '-' for stdin.
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON tag files (repeatable, later files override earlier ones)
    #[arg(
        short,
        long = "tags",
        value_name = "FILE",
        env = "TPLEXPAND_TAGS",
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    tags: Vec<PathBuf>,

    /// Define a tag as NAME=VALUE, or NAME alone for "true" (overrides tag files)
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]", action = clap::ArgAction::Append)]
    define: Vec<String>,

    /// Line ending written after every output line
    #[arg(
        short,
        long,
        value_enum,
        env = "TPLEXPAND_NEWLINE",
        default_value_t = LineEnding::default()
    )]
    newline: LineEnding,

    /// Validate the template and report undefined tags without writing output
    #[arg(long, conflicts_with = "list")]
    check: bool,

    /// List tags used by the template (optionally with format: plain, detailed, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain", conflicts_with = "check")]
    list: Option<ListFormat>,

    /// Fail instead of writing output when the template uses undefined tags
    #[arg(long)]
    strict: bool,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// Unique tag names
    Plain,
    /// Every reference with position and options
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct ReferenceInfo<'a> {
    #[serde(flatten)]
    reference: &'a TagReference,
    defined: bool,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.quiet, cli.verbose);
    debug!(?cli, "parsed arguments");

    let template_content = match read_template(&cli.template) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let tags = match build_tags(&cli.tags, &cli.define) {
        Ok(tags) => tags,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    let engine = TemplateEngine::new(tags, cli.newline);

    let result = if cli.check {
        check(&engine, &template_content)
    } else if let Some(list_format) = cli.list {
        list_references(&template_content, list_format, engine.tags())
    } else {
        expand_template(&engine, &template_content, cli.output.as_deref(), cli.strict)
    };

    if let Err(e) = result {
        error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let log_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn read_template(template_path: &Path) -> Result<String> {
    let content = if template_path == Path::new("-") {
        info!("Reading template from stdin...");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("Reading template from {}", template_path.display());
        tplexpand::fs_utils::read_file_contents(template_path)?
    };
    Ok(match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

fn build_tags(tag_files: &[PathBuf], definitions: &[String]) -> Result<TagDictionary> {
    let mut tags = load_tag_files(tag_files)?;
    for definition in definitions {
        tags.define(definition)?;
    }
    debug!(count = tags.len(), "tag dictionary ready");
    Ok(tags)
}

fn expand_template(
    engine: &TemplateEngine,
    template_content: &str,
    output: Option<&Path>,
    strict: bool,
) -> Result<()> {
    debug!("Starting template expansion...");
    let expansion = engine.expand_str(template_content)?;

    if strict && !expansion.warnings.is_empty() {
        for warning in &expansion.warnings {
            error!(line = warning.line, tag = %warning.tag, "tag is not defined");
        }
        eprintln!(
            "Error: {} undefined tag reference(s), no output written",
            expansion.warnings.len()
        );
        std::process::exit(1);
    }

    if let Some(output_path) = output {
        info!("Writing output to {}", output_path.display());
        std::fs::write(output_path, expansion.output)?;
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(expansion.output.as_bytes())?;
        stdout.flush()?;
    }

    info!("Expansion complete!");
    Ok(())
}

fn check(engine: &TemplateEngine, template_content: &str) -> Result<()> {
    info!("Checking template...");

    let references = find_references(template_content);
    let warnings = engine.check(template_content)?;

    println!(
        "Summary: {} tag references, conditional blocks balanced",
        references.len()
    );
    if warnings.is_empty() {
        println!("  ✓ all placeholders defined");
        return Ok(());
    }

    println!("  ✗ {} undefined placeholder(s)", warnings.len());
    for warning in &warnings {
        println!("    line {}: {}", warning.line, warning.tag);
    }
    std::process::exit(1);
}

fn list_references(template_content: &str, format: ListFormat, tags: &TagDictionary) -> Result<()> {
    debug!("Listing template tags...");

    let references = find_references(template_content);

    match format {
        ListFormat::Plain => {
            let mut seen = std::collections::HashSet::new();
            for reference in &references {
                if seen.insert(reference.tag.as_str()) {
                    println!("{}", reference.tag);
                }
            }
        }
        ListFormat::Detailed => {
            for reference in &references {
                println!("Tag: {}", reference.tag);
                println!(
                    "  Kind: {}",
                    match reference.kind {
                        ReferenceKind::Placeholder => "placeholder",
                        ReferenceKind::Condition => "condition",
                    }
                );
                println!("  Position: {}:{}", reference.line, reference.column);
                if let Some(options) = &reference.options {
                    println!("  Options: {options}");
                }
                match tags.get(&reference.tag) {
                    Some(value) if value.is_empty() => println!("  Defined: yes (empty)"),
                    Some(value) => println!("  Defined: yes ({} bytes)", value.len()),
                    None => println!("  Defined: no"),
                }
            }
        }
        ListFormat::Json => {
            let infos: Vec<ReferenceInfo<'_>> = references
                .iter()
                .map(|reference| ReferenceInfo {
                    reference,
                    defined: tags.contains(&reference.tag),
                })
                .collect();

            let json = serde_json::to_string_pretty(&infos)?;
            println!("{json}");
        }
    }

    Ok(())
}
