//! SkillForge CLI - self-healing synthesis of math skill generators
//!
//! The `skillforge` command drives the synthesis pipeline and its pieces.
//!
//! ## Commands
//!
//! - `synthesize`: generate, repair and persist one skill module
//! - `experiment`: run a skills x tiers ablation grid
//! - `prompt`: print the prompt an attempt would send
//! - `repair`: run the repair pipeline over an existing file
//! - `validate`: syntax and logic verdicts for a file
//! - `log`: show experiment log records

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use skillforge_core::{
    extract_code, validate_syntax, AblationTier, LogicChecker, RepairPipeline, StaticLogicLinter,
    SynthConfig, SynthesisOptions, Synthesizer, METRICS,
};
use skillforge_llm::{LlmClient, OpenAiCompatClient};
use skillforge_store::{ExperimentRecord, SkillLibrary};

#[derive(Parser)]
#[command(name = "skillforge")]
#[command(author = "SkillForge Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Self-healing LLM synthesis of math skill generators", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON command output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one skill module
    Synthesize {
        /// Skill id (also the artifact file stem)
        skill_id: String,

        /// Repair tier: 1 bare, 2 structural, 3 full
        #[arg(short, long, default_value_t = 1, env = "SKILLFORGE_ABLATION",
              value_parser = clap::value_parser!(u8).range(1..=3))]
        ablation: u8,

        /// Model size label recorded in the experiment log
        #[arg(long, default_value = "Cloud", env = "SKILLFORGE_MODEL_SIZE_CLASS")]
        model_size_class: String,

        /// Prompt level label recorded in the experiment log
        #[arg(long, default_value = "Bare", env = "SKILLFORGE_PROMPT_LEVEL")]
        prompt_level: String,
    },

    /// Run every skill against every tier, sequentially
    Experiment {
        /// Skill ids (default: every id in the library)
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,

        /// Tiers to run
        #[arg(long, value_delimiter = ',', default_values_t = [1u8, 2, 3],
              value_parser = clap::value_parser!(u8).range(1..=3))]
        tiers: Vec<u8>,

        /// Model size label recorded in the experiment log
        #[arg(long, default_value = "Cloud", env = "SKILLFORGE_MODEL_SIZE_CLASS")]
        model_size_class: String,
    },

    /// Print the prompt an attempt for a skill would send
    Prompt {
        skill_id: String,
    },

    /// Run the repair pipeline over a Python file
    Repair {
        /// File holding generated source (fences and chatter are stripped)
        file: PathBuf,

        /// Repair tier: 1 bare, 2 structural, 3 full
        #[arg(short, long, default_value_t = 3,
              value_parser = clap::value_parser!(u8).range(1..=3))]
        ablation: u8,

        /// Overwrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
    },

    /// Report syntax and logic verdicts for a Python file
    Validate {
        file: PathBuf,
    },

    /// Show experiment log records
    Log {
        /// Only records for this skill id
        #[arg(short, long)]
        skill: Option<String>,

        /// Maximum number of records to show (most recent)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    skillforge_core::init_tracing(cli.json, level);

    let config = SynthConfig::from_env();

    let result = match cli.command {
        Commands::Synthesize {
            skill_id,
            ablation,
            model_size_class,
            prompt_level,
        } => {
            let options = SynthesisOptions::default()
                .with_ablation(AblationTier::try_from(ablation)?)
                .with_model_size_class(model_size_class)
                .with_prompt_level(prompt_level);
            cmd_synthesize(&config, &skill_id, options, cli.json).await
        }
        Commands::Experiment {
            skills,
            tiers,
            model_size_class,
        } => cmd_experiment(&config, skills, &tiers, &model_size_class, cli.json).await,
        Commands::Prompt { skill_id } => cmd_prompt(&config, &skill_id).await,
        Commands::Repair {
            file,
            ablation,
            write,
        } => cmd_repair(&file, AblationTier::try_from(ablation)?, write, cli.json),
        Commands::Validate { file } => cmd_validate(&file, cli.json),
        Commands::Log { skill, limit } => cmd_log(&config, skill.as_deref(), limit, cli.json).await,
    };

    METRICS.flush();
    result
}

fn llm_client() -> Result<Arc<dyn LlmClient>> {
    let client = OpenAiCompatClient::from_env().context("Failed to configure LLM client")?;
    Ok(Arc::new(client))
}

async fn synthesizer(config: &SynthConfig) -> Result<Synthesizer> {
    let log = config
        .experiment_log()
        .await
        .context("Failed to open experiment log")?;
    Ok(Synthesizer::from_config(
        config,
        llm_client()?,
        Arc::new(config.library()),
        log,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Generate one skill module
async fn cmd_synthesize(
    config: &SynthConfig,
    skill_id: &str,
    options: SynthesisOptions,
    json: bool,
) -> Result<()> {
    let synth = synthesizer(config).await?;
    let outcome = synth.synthesize(skill_id, options).await;

    if json {
        print_json(&outcome.record)?;
    } else {
        println!("{}", outcome.message);
        for note in &outcome.record.repair_notes {
            println!("  {}", note);
        }
    }

    if !outcome.success {
        bail!("synthesis of '{}' failed", skill_id);
    }
    Ok(())
}

#[derive(Serialize)]
struct GridRow {
    skill_id: String,
    ablation_id: u8,
    success: bool,
    syntax_valid: bool,
    logic_valid: bool,
    fixes: u32,
    duration_ms: u64,
}

impl From<&ExperimentRecord> for GridRow {
    fn from(record: &ExperimentRecord) -> Self {
        Self {
            skill_id: record.skill_id.clone(),
            ablation_id: record.ablation_id,
            success: record.success,
            syntax_valid: record.is_valid,
            logic_valid: record.logic_valid,
            fixes: record.regex_fix_count + record.ast_repair_count + record.logic_fix_count,
            duration_ms: record.total_duration_ms,
        }
    }
}

/// Run a skills x tiers grid
async fn cmd_experiment(
    config: &SynthConfig,
    skills: Vec<String>,
    tiers: &[u8],
    model_size_class: &str,
    json: bool,
) -> Result<()> {
    let skills = if skills.is_empty() {
        config
            .library()
            .skill_ids()
            .await
            .context("Failed to list library skills")?
    } else {
        skills
    };
    if skills.is_empty() {
        bail!("no skills to run; pass --skills or populate the library");
    }

    let synth = synthesizer(config).await?;
    let mut rows = Vec::with_capacity(skills.len() * tiers.len());

    for skill_id in &skills {
        for &tier in tiers {
            let options = SynthesisOptions::default()
                .with_ablation(AblationTier::try_from(tier)?)
                .with_model_size_class(model_size_class);
            info!(skill_id = %skill_id, ablation_id = tier, "running grid cell");
            let outcome = synth.synthesize(skill_id, options).await;
            rows.push(GridRow::from(&outcome.record));
        }
    }

    if json {
        return print_json(&rows);
    }

    println!(
        "{:<28} {:>4} {:>7} {:>6} {:>6} {:>5} {:>9}",
        "SKILL", "TIER", "SUCCESS", "SYNTAX", "LOGIC", "FIXES", "MS"
    );
    for row in &rows {
        println!(
            "{:<28} {:>4} {:>7} {:>6} {:>6} {:>5} {:>9}",
            row.skill_id,
            row.ablation_id,
            yes_no(row.success),
            yes_no(row.syntax_valid),
            yes_no(row.logic_valid),
            row.fixes,
            row.duration_ms
        );
    }

    let valid = rows.iter().filter(|r| r.syntax_valid).count();
    println!();
    println!("{} runs, {} syntax-valid", rows.len(), valid);
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Print the composed prompt
async fn cmd_prompt(config: &SynthConfig, skill_id: &str) -> Result<()> {
    let synth = synthesizer(config).await?;
    let prompt = synth.compose(skill_id).await;
    eprintln!(
        "strategy: {} | examples: {}",
        prompt.strategy, prompt.example_count
    );
    println!("{}", prompt.text);
    Ok(())
}

/// Repair a file in place or to stdout
fn cmd_repair(file: &Path, tier: AblationTier, write: bool, json: bool) -> Result<()> {
    let raw = fs::read_to_string(file).context(format!("Failed to read {:?}", file))?;
    let report = RepairPipeline::new().run(&extract_code(&raw), tier);

    if json {
        print_json(&report.passes)?;
    } else {
        for note in report.notes() {
            eprintln!("{}", note);
        }
    }

    if write {
        fs::write(file, &report.text).context(format!("Failed to write {:?}", file))?;
        eprintln!(
            "Repaired {:?} ({} fixes)",
            file,
            report.counters.total()
        );
    } else if !json {
        print!("{}", report.text);
    }
    Ok(())
}

#[derive(Serialize)]
struct ValidationReport {
    syntax_valid: bool,
    syntax_issue: Option<String>,
    logic_valid: bool,
    logic_issues: Vec<String>,
}

/// Validate a file
fn cmd_validate(file: &Path, json: bool) -> Result<()> {
    let text = fs::read_to_string(file).context(format!("Failed to read {:?}", file))?;
    let syntax = validate_syntax(&text);
    let logic = StaticLogicLinter.check(&text);

    let report = ValidationReport {
        syntax_valid: syntax.is_valid,
        syntax_issue: syntax.issue.as_ref().map(ToString::to_string),
        logic_valid: logic.is_valid,
        logic_issues: logic.diagnostic.issues.iter().map(ToString::to_string).collect(),
    };

    if json {
        print_json(&report)?;
    } else {
        match &report.syntax_issue {
            None => println!("syntax: valid"),
            Some(issue) => println!("syntax: INVALID ({})", issue),
        }
        if report.logic_valid {
            println!("logic:  valid");
        } else {
            println!("logic:  {}", report.logic_issues.join("; "));
        }
    }

    if !report.syntax_valid {
        bail!("{:?} does not parse", file);
    }
    Ok(())
}

/// Show experiment log records
async fn cmd_log(config: &SynthConfig, skill: Option<&str>, limit: usize, json: bool) -> Result<()> {
    let log = config
        .experiment_log()
        .await
        .context("Failed to open experiment log")?;
    let records = match skill {
        Some(skill_id) => log.entries_for(skill_id).await?,
        None => log.entries().await?,
    };
    let recent = &records[records.len().saturating_sub(limit)..];

    if json {
        return print_json(&recent);
    }
    if recent.is_empty() {
        println!("No experiment records found");
        return Ok(());
    }

    for record in recent {
        println!(
            "{}  {:<28} tier {}  {:<7} syntax={} fixes={}/{}/{}  {}ms",
            record.start_time.format("%Y-%m-%d %H:%M:%S"),
            record.skill_id,
            record.ablation_id,
            if record.success { "ok" } else { "FAILED" },
            yes_no(record.is_valid),
            record.regex_fix_count,
            record.ast_repair_count,
            record.logic_fix_count,
            record.total_duration_ms
        );
        if !record.success {
            println!("    {}", record.error_msg);
        }
    }
    Ok(())
}
