use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mindforge_core::{
    Domain, EngineConfig, OnboardingForm, OpenAICompatibleClient, ReflectionEngine,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

mod logging;

/// MindForge - Reflective journaling with alignment and theme analysis
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User whose data to operate on
    #[arg(short, long, env = "MINDFORGE_USER", default_value = "default")]
    user: String,

    /// Root directory for per-user data (overrides config)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the profile from onboarding answers
    Onboard {
        /// Name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Age, 10 to 100 (prompted when omitted)
        #[arg(long)]
        age: Option<u32>,

        /// Short bio
        #[arg(long)]
        bio: Option<String>,

        /// Domain currently felt as a challenge; repeatable
        #[arg(long = "challenge", value_name = "DOMAIN")]
        challenges: Vec<String>,

        /// Ask the model for the functional tier instead of the heuristic
        #[arg(long)]
        classify: bool,
    },

    /// Reflect on a thought and get a reply
    Reflect {
        /// The thought
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show profile, level and alignment
    Status {
        /// JSON output for integrations
        #[arg(long)]
        json: bool,
    },

    /// List past reflections
    History {
        /// Only the most recent N
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Alignment and symbolic clusters over stored reflections
    Analyze {
        /// Number of clusters (default from config)
        #[arg(long)]
        k: Option<usize>,

        /// Name clusters with the model
        #[arg(long)]
        label: bool,

        #[arg(long)]
        json: bool,
    },

    /// Copy new reflections into the analysis store
    Promote,

    /// Clear conversation history and progression
    StartOver,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Check the configuration for invalid values
    Validate,
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    Ok(config)
}

/// Engine with a generator attached only when the command needs one
fn build_engine(
    config: EngineConfig,
    user: &str,
    needs_generator: bool,
) -> anyhow::Result<ReflectionEngine> {
    let generator = if needs_generator {
        let client = OpenAICompatibleClient::from_config(&config)
            .context("this command needs text generation")?;
        Some(client)
    } else {
        None
    };
    let engine = ReflectionEngine::new(config, user);
    Ok(match generator {
        Some(g) => engine.with_generator(Box::new(g)),
        None => engine,
    })
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn ask_yes_no(question: &str) -> anyhow::Result<bool> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn collect_form(
    name: Option<String>,
    age: Option<u32>,
    bio: Option<String>,
    challenges: Vec<String>,
) -> anyhow::Result<OnboardingForm> {
    let interactive = name.is_none();
    let name = match name {
        Some(n) => n,
        None => prompt("What's your name? ")?,
    };
    let age = match age {
        Some(a) => a,
        None => prompt("How old are you? ")?
            .parse()
            .context("age must be a whole number")?,
    };
    let bio = match bio {
        Some(b) => b,
        None if interactive => prompt("Tell me a little about yourself: ")?,
        None => String::new(),
    };

    let mut flagged = Vec::new();
    for raw in &challenges {
        match Domain::parse(raw) {
            Some(d) => flagged.push(d),
            None => bail!(
                "unknown domain '{raw}', expected one of: {}",
                Domain::ALL.map(|d| d.to_string()).join(", ")
            ),
        }
    }
    if interactive && challenges.is_empty() {
        for domain in Domain::ALL {
            if ask_yes_no(domain.challenge_question())? {
                flagged.push(domain);
            }
        }
    }

    Ok(OnboardingForm {
        name,
        age,
        bio,
        challenges: flagged,
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Onboard {
            name,
            age,
            bio,
            challenges,
            classify,
        } => {
            let form = collect_form(name, age, bio, challenges)?;
            let engine = build_engine(config, &cli.user, classify)?;
            let profile = engine.onboard(form, classify)?;
            println!("Welcome, {}!", profile.name);
            println!("Avatar: {} ({})", profile.avatar, profile.dimension);
            if let Some(tier) = profile.tier {
                println!("Functional tier: {}", tier.value());
            }
        }
        Commands::Reflect { text } => {
            let engine = build_engine(config, &cli.user, true)?;
            let report = engine.reflect(&text.join(" "))?;
            println!("{}", report.reply);
            if report.answered {
                println!();
                println!("RCA score: {}  Level: {}", report.rca_score, report.level);
                if report.leveled_up {
                    println!("Level up! Welcome to Level {}", report.level);
                }
                if !report.persisted {
                    eprintln!("Warning: progress could not be saved");
                }
            }
        }
        Commands::Status { json } => {
            let engine = build_engine(config, &cli.user, false)?;
            let status = engine.status()?;
            if json {
                println!("{}", serde_json::to_string(&status)?);
            } else {
                println!("USER: {} ({})", status.name, status.avatar);
                println!("DOMAIN: {}", status.dimension);
                if let Some(tier) = status.tier {
                    println!("TIER: {}", tier.value());
                }
                println!(
                    "LEVEL: {}  RCA SCORE: {}/{}",
                    status.level, status.rca_score, status.next_level_at
                );
                println!("REFLECTIONS: {}", status.reflections);
                println!(
                    "ALIGNMENT: {:.3} ({:?}){}",
                    status.alignment.score,
                    status.alignment.trend,
                    if status.alignment.aligned { "" } else { " - below threshold" }
                );
            }
        }
        Commands::History { limit, json } => {
            let engine = build_engine(config, &cli.user, false)?;
            let entries = engine.history(limit);
            if json {
                println!("{}", serde_json::to_string(&entries)?);
            } else if entries.is_empty() {
                println!("No reflections yet.");
            } else {
                for entry in entries {
                    println!("[{}] {}", entry.timestamp, entry.thought);
                    println!("    -> {}", entry.response);
                }
            }
        }
        Commands::Analyze { k, label, json } => {
            let engine = build_engine(config, &cli.user, label)?;
            let report = engine.analyze(k, label);
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("SOURCE: {} ({} entries)", report.source, report.entries);
                println!(
                    "ALIGNMENT: {:.3} ({:?})",
                    report.alignment.score, report.alignment.trend
                );
                if report.clusters.is_empty() {
                    println!("Not enough reflections to find themes.");
                }
                for cluster in &report.clusters {
                    println!();
                    println!("#{} {}", cluster.id, cluster.label);
                    for member in &cluster.members {
                        println!("  - {member}");
                    }
                }
            }
        }
        Commands::Promote => {
            let engine = build_engine(config, &cli.user, false)?;
            let added = engine.promote()?;
            println!("Promoted {added} reflection(s).");
        }
        Commands::StartOver => {
            let engine = build_engine(config, &cli.user, false)?;
            engine.start_over()?;
            println!("Progress reset. Starting fresh at Level 1.");
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.to_toml()?),
            ConfigAction::Validate => {
                config.validate()?;
                println!("Configuration OK");
            }
        },
    }

    Ok(())
}
