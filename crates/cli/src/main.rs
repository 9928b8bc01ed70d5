//! NeuroCoach CLI - goal tracking with an AI coach.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use neurocoach_ai::{GeneratorConfig, GoalCoach, OpenAiGenerator};
use neurocoach_core::{
    Achievement, Goal, GoalDraft, GoalId, Priority, SessionId, SessionType, Subgoal, SubgoalDraft,
    SubgoalId, SubgoalStatus, Time, UserId,
};
use neurocoach_progress::GoalService;
use neurocoach_storage::{JsonStorage, Storage};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "neurocoach")]
#[command(about = "Goal tracking with an AI coach", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding NeuroCoach data
    #[arg(long, env = "NEUROCOACH_DATA", default_value = ".neurocoach", global = true)]
    data_dir: PathBuf,

    /// User whose goals are managed
    #[arg(long, env = "NEUROCOACH_USER", default_value = "local", global = true)]
    user: String,

    /// Storage backend
    #[arg(long, value_enum, default_value = "json", global = true)]
    backend: Backend,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Json,
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage goals
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Manage subgoals
    #[command(subcommand)]
    Subgoal(SubgoalCommand),
    /// Replace a goal's subgoals with an AI decomposition
    Decompose {
        /// Goal ID
        goal: GoalId,
        /// Confirm replacing existing subgoals
        #[arg(long)]
        yes: bool,
    },
    /// Manage coaching sessions
    #[command(subcommand)]
    Session(SessionCommand),
    /// Send a message to the coach
    Coach {
        /// Session ID
        session: SessionId,
        /// Message text
        message: String,
    },
    /// List earned achievements
    Achievements,
    /// Show a progress summary
    Stats,
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Add a new goal
    Add {
        /// Goal title
        title: String,
        #[command(flatten)]
        details: GoalDetails,
    },
    /// Edit a goal's details
    Edit {
        /// Goal ID
        id: GoalId,
        /// New title
        title: String,
        #[command(flatten)]
        details: GoalDetails,
    },
    /// List goals
    List {
        /// Include archived goals
        #[arg(long)]
        all: bool,
    },
    /// Show goal details and subgoals
    Show {
        /// Goal ID
        id: GoalId,
    },
    /// Show recorded progress over time
    History {
        /// Only this goal
        id: Option<GoalId>,
    },
    /// Set progress by hand (0-100)
    Progress {
        /// Goal ID
        id: GoalId,
        /// Percentage
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Mark a goal completed
    Complete {
        /// Goal ID
        id: GoalId,
    },
    /// Pause a goal
    Pause {
        /// Goal ID
        id: GoalId,
    },
    /// Resume a paused goal
    Resume {
        /// Goal ID
        id: GoalId,
    },
    /// Reopen a completed goal
    Reopen {
        /// Goal ID
        id: GoalId,
        /// Progress to reopen at, for goals without subgoals
        #[arg(long)]
        progress: Option<i64>,
    },
    /// Archive a goal
    Archive {
        /// Goal ID
        id: GoalId,
    },
    /// Delete a goal and its subgoals
    Delete {
        /// Goal ID
        id: GoalId,
    },
}

#[derive(clap::Args)]
struct GoalDetails {
    /// Description
    #[arg(long)]
    description: Option<String>,
    /// Category
    #[arg(long)]
    category: Option<String>,
    /// Priority (low, medium, high)
    #[arg(long)]
    priority: Option<Priority>,
    /// Target date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    target: Option<Time>,
}

impl GoalDetails {
    fn into_draft(self, title: String) -> GoalDraft {
        GoalDraft {
            title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            target_date: self.target,
        }
    }
}

#[derive(Subcommand)]
enum SubgoalCommand {
    /// Add a subgoal to a goal
    Add {
        /// Goal ID
        goal: GoalId,
        /// Subgoal title
        title: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
    },
    /// Set a subgoal's status (not_started, in_progress, completed)
    Status {
        /// Subgoal ID
        id: SubgoalId,
        /// New status
        status: SubgoalStatus,
    },
    /// Toggle a subgoal between done and not started
    Toggle {
        /// Subgoal ID
        id: SubgoalId,
    },
    /// Rename a subgoal
    Rename {
        /// Subgoal ID
        id: SubgoalId,
        /// New title
        title: String,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a subgoal
    Delete {
        /// Subgoal ID
        id: SubgoalId,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a coaching session
    Start {
        /// Session type (goal-setting, progress-review, problem-solving, emotional-support, general)
        #[arg(long, default_value = "general")]
        kind: SessionType,
        /// Title
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Finish a session
    End {
        /// Session ID
        id: SessionId,
        /// Rating from 1 to 5
        #[arg(long)]
        rating: Option<i64>,
    },
    /// List sessions
    List,
    /// Print a session transcript
    Show {
        /// Session ID
        id: SessionId,
    },
}

fn parse_date(s: &str) -> Result<Time, String> {
    let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}': {e}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date '{s}'"))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("Failed to create {}", cli.data_dir.display()))?;

    match cli.backend {
        Backend::Json => {
            let storage = JsonStorage::new(&cli.data_dir).await?;
            run(storage, cli).await
        }
        Backend::Sqlite => run_sqlite(cli).await,
    }
}

#[cfg(feature = "sqlite")]
async fn run_sqlite(cli: Cli) -> Result<()> {
    let path = cli.data_dir.join("neurocoach.db");
    let storage = neurocoach_storage::SqliteStorage::new_from_path(&path).await?;
    run(storage, cli).await
}

#[cfg(not(feature = "sqlite"))]
async fn run_sqlite(_cli: Cli) -> Result<()> {
    bail!("SQLite support is not compiled in; rebuild with --features sqlite")
}

async fn run<S: Storage>(storage: S, cli: Cli) -> Result<()> {
    let user = UserId::new(cli.user);
    let config = GeneratorConfig::from_env();
    debug!(model = %config.model, configured = config.is_configured(), "Text generation");
    let mut coach = GoalCoach::new(GoalService::new(storage), OpenAiGenerator::new(config));

    match cli.command {
        Commands::Goal(command) => goal_command(coach.service_mut(), &user, command).await?,
        Commands::Subgoal(command) => subgoal_command(coach.service_mut(), command).await?,
        Commands::Decompose { goal, yes } => {
            let existing = coach.service().subgoals(goal).await?;
            if !existing.is_empty() && !yes {
                bail!(
                    "Goal already has {} subgoals; pass --yes to replace them",
                    existing.len()
                );
            }
            let subgoals = coach.decompose_goal(goal).await?;
            println!("New plan ({} subgoals):", subgoals.len());
            print_subgoals(&subgoals);
        }
        Commands::Session(command) => session_command(coach.service_mut(), &user, command).await?,
        Commands::Coach { session, message } => {
            let reply = coach.coach_reply(session, &message).await?;
            println!("{}", reply);
        }
        Commands::Achievements => {
            let achievements = coach.service().achievements(&user).await?;
            let points: u32 = achievements.iter().map(|a| a.points).sum();
            println!("Achievements ({}, {} points)", achievements.len(), points);
            for a in achievements {
                println!(
                    "  {} {} (+{}) - {}  [{}]",
                    a.icon,
                    a.title,
                    a.points,
                    a.description,
                    a.earned_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Stats => {
            let stats = coach.service().analytics(&user).await?;
            println!("NeuroCoach Stats");
            println!("  Goals: {}", stats.total_goals);
            println!("    Active: {}", stats.active_goals);
            println!("    Completed: {}", stats.completed_goals);
            println!("    Paused: {}", stats.paused_goals);
            println!("    Archived: {}", stats.archived_goals);
            println!("  Average progress: {}%", stats.avg_progress);
            println!("  Sessions: {}", stats.total_sessions);
            println!("  Average rating: {:.1}", stats.avg_rating);
            println!("  Points: {}", stats.total_points);
        }
    }

    print_earned(&coach.service_mut().take_earned());
    Ok(())
}

async fn goal_command<S: Storage>(
    service: &mut GoalService<S>,
    user: &UserId,
    command: GoalCommand,
) -> Result<()> {
    match command {
        GoalCommand::Add { title, details } => {
            let goal = service.create_goal(user, details.into_draft(title)).await?;
            println!("Added goal: {} - {}", goal.id, goal.title);
        }
        GoalCommand::Edit { id, title, details } => {
            let goal = service.edit_goal(id, details.into_draft(title)).await?;
            println!("Updated goal: {} - {}", goal.id, goal.title);
        }
        GoalCommand::List { all } => {
            let goals: Vec<Goal> = service
                .list_goals(user)
                .await?
                .into_iter()
                .filter(|g| all || g.status != neurocoach_core::GoalStatus::Archived)
                .collect();
            println!("Goals ({})", goals.len());
            for goal in goals {
                print_goal_line(&goal);
            }
        }
        GoalCommand::Show { id } => {
            let goal = service.goal(id).await?;
            let subgoals = service.subgoals(id).await?;

            println!("Goal: {}", goal.id);
            println!("  Title: {}", goal.title);
            if let Some(description) = &goal.description {
                println!("  Description: {}", description);
            }
            println!("  Category: {}", goal.category);
            println!("  Priority: {:?}", goal.priority);
            println!("  Status: {}", goal.status);
            println!("  Progress: {}% {}", goal.progress, progress_bar(goal.progress));
            if let Some(target) = goal.target_date {
                println!("  Target: {}", target.format("%Y-%m-%d"));
            }
            if let Some(done) = goal.completed_at {
                println!("  Completed: {}", done.format("%Y-%m-%d %H:%M"));
            }
            println!("  Created: {}", goal.created_at);
            println!("  Subgoals ({}):", subgoals.len());
            print_subgoals(&subgoals);
        }
        GoalCommand::History { id } => {
            let entries = service.progress_history(user, id).await?;
            println!("Progress history ({})", entries.len());
            for entry in entries {
                println!(
                    "  {}  {}  {:>3}% {}",
                    entry.recorded_at.format("%Y-%m-%d %H:%M"),
                    entry.goal_id,
                    entry.progress,
                    progress_bar(entry.progress)
                );
            }
        }
        GoalCommand::Progress { id, value } => {
            let goal = service.on_manual_progress_set(id, value).await?;
            print_goal_line(&goal);
        }
        GoalCommand::Complete { id } => print_goal_line(&service.complete_goal(id).await?),
        GoalCommand::Pause { id } => print_goal_line(&service.pause_goal(id).await?),
        GoalCommand::Resume { id } => print_goal_line(&service.resume_goal(id).await?),
        GoalCommand::Reopen { id, progress } => {
            print_goal_line(&service.reopen_goal(id, progress).await?)
        }
        GoalCommand::Archive { id } => print_goal_line(&service.archive_goal(id).await?),
        GoalCommand::Delete { id } => {
            service.delete_goal(id).await?;
            println!("Deleted goal {}", id);
        }
    }
    Ok(())
}

async fn subgoal_command<S: Storage>(
    service: &mut GoalService<S>,
    command: SubgoalCommand,
) -> Result<()> {
    match command {
        SubgoalCommand::Add { goal, title, description } => {
            let (subgoal, goal) = service
                .add_subgoal(goal, SubgoalDraft::new(title, description))
                .await?;
            println!("Added subgoal: {} - {}", subgoal.id, subgoal.title);
            print_goal_line(&goal);
        }
        SubgoalCommand::Status { id, status } => {
            let (_, goal) = service.set_subgoal_status(id, status).await?;
            print_goal_line(&goal);
        }
        SubgoalCommand::Toggle { id } => {
            let (subgoal, goal) = service.toggle_subgoal(id).await?;
            println!("{} {}", status_marker(subgoal.status), subgoal.title);
            print_goal_line(&goal);
        }
        SubgoalCommand::Rename { id, title, description } => {
            let subgoal = service
                .rename_subgoal(id, SubgoalDraft::new(title, description))
                .await?;
            println!("Renamed subgoal: {} - {}", subgoal.id, subgoal.title);
        }
        SubgoalCommand::Delete { id } => {
            let goal = service.delete_subgoal(id).await?;
            println!("Deleted subgoal {}", id);
            print_goal_line(&goal);
        }
    }
    Ok(())
}

async fn session_command<S: Storage>(
    service: &mut GoalService<S>,
    user: &UserId,
    command: SessionCommand,
) -> Result<()> {
    match command {
        SessionCommand::Start { kind, title } => {
            let session = service.start_session(user, kind, &title).await?;
            println!("Started session: {} - {}", session.id, session.title);
        }
        SessionCommand::End { id, rating } => {
            let session = service.complete_session(id, rating).await?;
            let minutes = session.duration_minutes().unwrap_or(0);
            println!("Finished session {} after {} min", session.id, minutes);
        }
        SessionCommand::List => {
            let sessions = service.sessions(user).await?;
            println!("Sessions ({})", sessions.len());
            for s in sessions {
                let rating = s.rating.map(|r| format!("{}/5", r)).unwrap_or_else(|| "-".into());
                println!(
                    "  {} | {:?} | {} | {} - {}",
                    s.id,
                    s.status,
                    rating,
                    s.session_type.label(),
                    s.title
                );
            }
        }
        SessionCommand::Show { id } => {
            let session = service.session(id).await?;
            println!("Session: {} - {}", session.id, session.title);
            for message in &session.transcript {
                println!("[{:?}] {}", message.role, message.content);
            }
        }
    }
    Ok(())
}

fn print_goal_line(goal: &Goal) {
    println!(
        "  {} | {:<11} | {:>3}% | {}",
        goal.id,
        goal.status.as_str().to_uppercase(),
        goal.progress,
        goal.title
    );
}

fn print_subgoals(subgoals: &[Subgoal]) {
    for s in subgoals {
        println!("    {} {} ({})", status_marker(s.status), s.title, s.id);
    }
}

fn print_earned(earned: &[Achievement]) {
    for a in earned {
        println!("{} Achievement unlocked: {} (+{} points)", a.icon, a.title, a.points);
    }
}

fn status_marker(status: SubgoalStatus) -> &'static str {
    match status {
        SubgoalStatus::NotStarted => "[ ]",
        SubgoalStatus::InProgress => "[~]",
        SubgoalStatus::Completed => "[x]",
    }
}

fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress) / 5;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(20 - filled))
}
