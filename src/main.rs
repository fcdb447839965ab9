use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::io::{AsyncBufReadExt, BufReader};

use skin_tracker::chat::{self, ChatSession, Responder, ScriptedResponder, TurnOutcome};
use skin_tracker::config::Settings;
use skin_tracker::exercises::{Exercise, ExerciseRunner, GuidedAction};
use skin_tracker::models::AdherenceTrend;
use skin_tracker::speech::{ConsoleNarrator, VoiceSettings};
use skin_tracker::{db, insights, logging, meditation, report};

#[derive(Parser)]
#[command(name = "skin-tracker")]
#[command(about = "Skin health tracking with insights and guided wellbeing exercises", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct VoiceArgs {
    /// Narration rate (0.1-10); scales every pause
    #[arg(long, default_value_t = 1.0)]
    rate: f32,
    /// Narration volume (0-1, 0 mutes)
    #[arg(long, default_value_t = 1.0)]
    volume: f32,
    /// Divide every pause by this factor
    #[arg(long, default_value_t = 1)]
    speedup: u32,
}

impl VoiceArgs {
    fn narrator(&self) -> anyhow::Result<ConsoleNarrator<std::io::Stdout>> {
        let settings = VoiceSettings::new(self.rate, self.volume)?;
        Ok(ConsoleNarrator::new(std::io::stdout(), settings))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample profile with analysis history
    Seed,
    /// Import analyses exported by the scan pipeline
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Create or update a profile
    Profile {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        skin_type: Option<String>,
        #[arg(long)]
        birth_year: Option<i32>,
    },
    /// Record routine adherence for a profile
    Adherence {
        #[arg(long)]
        email: String,
        #[arg(long)]
        percentage: f64,
        #[arg(long, value_enum, default_value = "stable")]
        trend: AdherenceTrend,
    },
    /// Show the score history as a chart
    History {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 12)]
        limit: usize,
    },
    /// Show the top insights for a profile
    Insights {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown dashboard report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
    /// Talk things through, with guided exercises when needed
    Chat {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_turns: Option<u32>,
        #[command(flatten)]
        voice: VoiceArgs,
    },
    /// Run a guided exercise
    Exercise {
        #[arg(value_enum)]
        action: GuidedAction,
        #[command(flatten)]
        voice: VoiceArgs,
    },
    /// List or play a narrated meditation
    Meditate {
        slug: Option<String>,
        #[command(flatten)]
        voice: VoiceArgs,
    },
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!(error = ?err, "command failed");
        eprintln!("Something went wrong: {err:#}");
        std::process::exit(1);
    }
}

async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(settings.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&settings).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&settings).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&settings).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} analyses from {}.", csv.display());
        }
        Commands::Profile {
            email,
            name,
            skin_type,
            birth_year,
        } => {
            let pool = connect(&settings).await?;
            let id =
                db::upsert_profile(&pool, &name, &email, skin_type.as_deref(), birth_year).await?;
            println!("Profile {id} saved for {email}.");
        }
        Commands::Adherence {
            email,
            percentage,
            trend,
        } => {
            let pool = connect(&settings).await?;
            db::record_adherence(&pool, &email, percentage, trend).await?;
            println!("Recorded {percentage:.0}% adherence ({trend}) for {email}.");
        }
        Commands::History { email, limit } => {
            let pool = connect(&settings).await?;
            let records = db::fetch_analyses(&pool, &email).await?;
            if records.is_empty() {
                println!("No analyses yet for {email}.");
                return Ok(());
            }
            print!("{}", report::render_history(&records, limit));
        }
        Commands::Insights { email, json } => {
            let pool = connect(&settings).await?;
            let records = db::fetch_analyses(&pool, &email).await?;
            let adherence = db::fetch_latest_adherence(&pool, &email).await?;
            if let Some(latest) = records.last() {
                tracing::debug!(analysis_id = %latest.id, total = records.len(), "latest analysis");
            }
            let insights = insights::generate_insights(&records, adherence.as_ref());

            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else if insights.is_empty() {
                println!("No insights yet for {email}.");
            } else {
                for insight in insights.iter() {
                    println!(
                        "- [{}] {}: {}",
                        insight.kind.label(),
                        insight.title,
                        insight.message
                    );
                }
            }
        }
        Commands::Report { email, out } => {
            let pool = connect(&settings).await?;
            let profile = db::fetch_profile(&pool, &email).await?;
            if let Some(profile) = &profile {
                tracing::debug!(profile_id = %profile.id, "building report");
            }
            let records = db::fetch_analyses(&pool, &email).await?;
            let adherence = db::fetch_latest_adherence(&pool, &email).await?;
            let trends = db::fetch_score_trends(&pool, &email).await?;
            let report = report::build_report(&report::ReportInput {
                email: &email,
                profile: profile.as_ref(),
                records: &records,
                adherence: adherence.as_ref(),
                trends: &trends,
                generated_on: chrono::Utc::now().date_naive(),
            });
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Chat { max_turns, voice } => {
            run_chat(max_turns.unwrap_or(settings.max_turns), voice).await?;
        }
        Commands::Exercise { action, voice } => {
            let mut narrator = voice.narrator()?;
            let mut runner = ExerciseRunner::new(Exercise::for_action(action));
            println!("{action}");
            runner.run(&mut narrator, voice.speedup).await?;
        }
        Commands::Meditate { slug, voice } => match slug {
            None => {
                println!("Available meditations:");
                for item in meditation::CATALOG {
                    println!(
                        "- {} ({}, {} min)",
                        item.slug,
                        item.title,
                        item.duration().as_secs().div_ceil(60)
                    );
                }
            }
            Some(slug) => {
                let item = meditation::find(&slug)
                    .with_context(|| format!("no meditation named '{slug}'"))?;
                let mut narrator = voice.narrator()?;
                meditation::play(item, &mut narrator, voice.speedup).await?;
            }
        },
    }

    Ok(())
}

async fn prompt(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
) -> anyhow::Result<Option<String>> {
    print!("you> ");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

async fn run_chat(max_turns: u32, voice: VoiceArgs) -> anyhow::Result<()> {
    let mut session = ChatSession::new(max_turns);
    let mut responder = ScriptedResponder::default();
    let mut narrator = voice.narrator()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!(max_turns, "chat session started");
    println!("I'm here to listen. Type 'quit' to leave.");

    while let Some(line) = prompt(&mut lines).await? {
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }

        match session.submit_user_message(&line) {
            Err(chat::ChatError::EmptyMessage) => continue,
            Err(err) => return Err(err.into()),
            Ok(TurnOutcome::Continue) => {
                let reply = responder.reply(&session);
                println!("companion> {reply}");
                session.record_assistant_message(reply);
            }
            Ok(TurnOutcome::OfferActions(menu)) => {
                let offer = "It sounds like a lot right now. Would one of these help?";
                println!("companion> {offer}");
                session.record_assistant_message(offer);
                for (index, action) in menu.iter().enumerate() {
                    println!("  {}. {action}", index + 1);
                }
                println!("  (anything else to keep talking)");

                let choice = prompt(&mut lines).await?.unwrap_or_default();
                match choice.parse::<GuidedAction>() {
                    Ok(action) => {
                        let runner = session.choose_action(action)?;
                        runner.run(&mut narrator, voice.speedup).await?;
                        session.finish_exercise()?;
                        session.record_assistant_message(format!("We finished {action}."));
                        println!("companion> How are you feeling now?");
                    }
                    Err(_) => {
                        session.dismiss_actions()?;
                        println!("companion> Of course. I'm still here, tell me more.");
                    }
                }
            }
        }
    }

    tracing::info!(messages = session.messages().len(), "chat session ended");
    println!("Take care.");
    Ok(())
}
