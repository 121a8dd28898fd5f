use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use fetchplan::config::EngineConfig;
use fetchplan::domain_model::{DomainModel, JdbcType};
use fetchplan::mapping::document::MappingDocument;
use fetchplan::plan_cache::PlanCache;
use fetchplan::result_metadata::{ColumnDescriptor, ResultSetMetadata};

/// fetchplan - Compile a result set mapping and print its assembly plan
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Domain model YAML (falls back to FETCHPLAN_MODEL or the config file)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Result set mapping YAML
    #[arg(long)]
    mapping: PathBuf,

    /// Raw result columns in order, as `name` or `name:type`
    #[arg(long, value_delimiter = ',', required = true)]
    columns: Vec<String>,

    /// Engine configuration YAML (defaults to FETCHPLAN_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_column(raw: &str) -> anyhow::Result<ColumnDescriptor> {
    let (name, jdbc_type) = match raw.split_once(':') {
        Some((name, ty)) => (
            name.trim(),
            ty.trim()
                .parse::<JdbcType>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("column `{}`", raw))?,
        ),
        None => (raw.trim(), JdbcType::default()),
    };
    if name.is_empty() {
        bail!("empty column name in `{}`", raw);
    }
    Ok(ColumnDescriptor::new(name, jdbc_type))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path),
        None => EngineConfig::from_env(),
    }
    .context("Configuration error")?;

    // RUST_LOG still wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let model_path = match cli.model.or_else(|| config.model_path.clone()) {
        Some(path) => path,
        None => bail!("no domain model given; pass --model or set FETCHPLAN_MODEL"),
    };
    let model = DomainModel::from_yaml_file(&model_path)
        .with_context(|| format!("loading domain model {}", model_path.display()))?;
    log::info!("Loaded domain model from {}", model_path.display());

    let mapping = MappingDocument::from_yaml_file(&cli.mapping)
        .and_then(|document| document.to_mapping())
        .with_context(|| format!("loading mapping {}", cli.mapping.display()))?;

    let columns = cli
        .columns
        .iter()
        .map(|raw| parse_column(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let metadata = ResultSetMetadata::new(columns);

    let cache = PlanCache::new(config.plan_cache());
    let plan = cache
        .get_or_compile(&mapping, &model, &metadata)
        .context("compiling mapping")?;

    println!("{}", plan.explain_json()?);
    Ok(())
}
