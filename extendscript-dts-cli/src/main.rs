use anyhow::{Context, Result};
use clap::Parser;
use extendscript_dts::{convert, convert_definitions, Blob};
use std::fs;
use std::io::{stdout, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extendscript-dts", version, about = "Recover TypeScript declarations from ExtendScript API XML and native library strings")]
struct Cli {
  /// API definition XML document.
  xml: PathBuf,

  /// Native library file to recover strings from. Repeatable; order decides
  /// lookup precedence.
  #[arg(long = "blob", value_name = "PATH")]
  blobs: Vec<PathBuf>,

  /// Output destination; omit for stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Write the repaired definition tree as JSON instead of declarations.
  #[arg(long)]
  dump_defs: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();
  let cli = Cli::parse();

  let xml_text = fs::read_to_string(&cli.xml)
    .with_context(|| format!("failed to read {}", cli.xml.display()))?;
  let doc = roxmltree::Document::parse(&xml_text)
    .with_context(|| format!("failed to parse {}", cli.xml.display()))?;

  let blobs = cli
    .blobs
    .iter()
    .map(|path| {
      let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
      let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
      Ok(Blob::new(name, bytes))
    })
    .collect::<Result<Vec<_>>>()?;

  let text = if cli.dump_defs {
    let defs = convert_definitions(&doc, &blobs)?;
    let mut json = serde_json::to_string_pretty(&defs)?;
    json.push('\n');
    json
  } else {
    convert(&doc, &blobs)?
  };

  match &cli.output {
    Some(path) => fs::write(path, text)
      .with_context(|| format!("failed to write {}", path.display()))?,
    None => stdout().write_all(text.as_bytes())?,
  }
  Ok(())
}
