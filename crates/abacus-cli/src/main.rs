//! Abacus CLI - evaluate and check configured formulas

use abacus_formula::{EngineConfig, FormulaEngine, FormulaId, MemorySink, Number, Precedence};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "abacus")]
#[command(author, version, about = "Evaluate and check configured decimal formulas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Do not memoize results (overrides the config file)
    #[arg(long, global = true)]
    no_cache: bool,

    /// Group operators with the single-level precedence rule
    #[arg(long, global = true)]
    single_level_precedence: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a formula and print the result
    Eval {
        /// JSON configuration file
        config: PathBuf,

        /// Formula id
        id: FormulaId,

        /// Arguments in parameter order
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Parse every formula and report the invalid ones
    Check {
        /// JSON configuration file
        config: PathBuf,
    },

    /// Print the parsed structure of a formula with explicit groups
    Show {
        /// JSON configuration file
        config: PathBuf,

        /// Formula id
        id: FormulaId,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let output = run(&cli)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<String> {
    match &cli.command {
        Commands::Eval { config, id, args } => {
            let config = load_config(config, cli)?;
            evaluate(config, *id, args)
        }
        Commands::Check { config } => {
            let config = load_config(config, cli)?;
            check(config)
        }
        Commands::Show { config, id } => {
            let config = load_config(config, cli)?;
            show(config, *id)
        }
    }
}

/// Load a configuration file and apply command-line overrides
fn load_config(path: &Path, cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_json_file(path)
        .with_context(|| format!("Failed to load '{}'", path.display()))?;

    if cli.no_cache {
        config.options.cache_results = false;
    }
    if cli.single_level_precedence {
        config.options.precedence = Precedence::SingleLevel;
    }

    log::debug!(
        "Loaded {} formulas from '{}' ({:?})",
        config.formulas.len(),
        path.display(),
        config.options
    );
    Ok(config)
}

fn evaluate(config: EngineConfig, id: FormulaId, args: &[String]) -> Result<String> {
    let args: Vec<Number> = args
        .iter()
        .map(|arg| {
            let value = Number::parse(arg);
            if value.is_nan() && arg.trim() != "NaN" {
                log::warn!("Argument [{arg}] is not a number");
            }
            value
        })
        .collect();

    let mut engine = FormulaEngine::from_config(config);
    Ok(engine.evaluate(id, &args).to_string())
}

fn check(config: EngineConfig) -> Result<String> {
    let ids: Vec<FormulaId> = config.formulas.iter().map(|(id, _)| id).collect();
    let total = ids.len();
    let mut engine = FormulaEngine::from_config(config).with_sink(MemorySink::new());

    let mut lines = Vec::with_capacity(total);
    let mut invalid = 0;
    for id in ids {
        if engine.structure(id).is_invalid() {
            invalid += 1;
            for message in engine.sink().drain() {
                lines.push(format!("{id}\terror\t{message}"));
            }
        } else {
            lines.push(format!("{id}\tok"));
        }
    }

    if invalid > 0 {
        eprintln!("{}", lines.join("\n"));
        bail!("{invalid} of {total} formulas are invalid");
    }
    Ok(lines.join("\n"))
}

fn show(config: EngineConfig, id: FormulaId) -> Result<String> {
    let parameters = config
        .formulas
        .get(id)
        .map(|definition| definition.parameters.clone())
        .with_context(|| format!("Formula {id} is not configured"))?;

    let mut engine = FormulaEngine::from_config(config).with_sink(MemorySink::new());
    let structure = engine.structure(id);
    let invalid = structure.is_invalid();
    let text = structure.display_with(&parameters).to_string();

    if invalid {
        bail!("{}", engine.sink().drain().join("; "));
    }
    Ok(text)
}
