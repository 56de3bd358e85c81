//! quizforge CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::exam::ExamCommand;
use commands::practice::PracticeCommand;
use commands::quiz::QuizCommand;
use commands::review::ReviewCommand;
use commands::App;

#[derive(Parser)]
#[command(
    name = "quizforge",
    version,
    about = "Local-first quizzes, spaced review and timed exams"
)]
struct Cli {
    /// State file (overrides `state_path` from the config)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and a sample CSV quiz
    Init,

    /// List exam presets
    Presets,

    /// Manage quizzes
    #[command(subcommand)]
    Quiz(QuizCommand),

    /// Export every quiz, preset and attempt to a JSON backup
    Export {
        /// Output file (default: quizforge-backup-YYYY-MM-DD.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON backup, appending to the current state
    Import {
        /// Backup file
        file: PathBuf,
    },

    /// Spaced-repetition review
    #[command(subcommand)]
    Review(ReviewCommand),

    /// Timed exams
    #[command(subcommand)]
    Exam(ExamCommand),

    /// Per-tag performance analysis
    Analyze {
        /// Quiz id (default: the active quiz)
        #[arg(long)]
        quiz: Option<String>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a micro-drill from your weakest tags
    Drill {
        /// Quiz id (default: the active quiz)
        #[arg(long)]
        quiz: Option<String>,

        /// Number of questions
        #[arg(long, default_value = "5")]
        size: usize,

        /// Seed for the shuffle
        #[arg(long)]
        seed: Option<u64>,

        /// Discard the current drill
        #[arg(long)]
        clear: bool,
    },

    /// List the models of each configured provider
    Models {
        /// Only this provider
        #[arg(long)]
        provider: Option<String>,
    },

    /// Untimed practice sessions
    #[command(subcommand)]
    Practice(PracticeCommand),

    /// Results report for a finished exam
    Report {
        /// Attempt id (default: the most recent attempt)
        #[arg(long)]
        attempt: Option<String>,

        /// Output format: md, json, html
        #[arg(long, default_value = "md")]
        format: String,

        /// Output file (md and json print to stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Generate questions with the build assistant
    Generate {
        /// What the questions should cover
        #[arg(long)]
        topic: String,

        /// Number of questions to ask for
        #[arg(long, default_value = "10")]
        count: usize,

        /// Append to this quiz instead of creating a new one
        #[arg(long)]
        quiz: Option<String>,

        /// Title of the new quiz (default: the topic)
        #[arg(long)]
        title: Option<String>,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,
    },

    /// Ask the study coach about your weak spots
    Coach {
        /// Quiz id (default: the active quiz)
        #[arg(long)]
        quiz: Option<String>,

        /// Message to send instead of the generated opener
        #[arg(long)]
        message: Option<String>,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizforge=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        command => match App::open(cli.state, cli.config) {
            Ok(mut app) => run(&mut app, command).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(app: &mut App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => commands::init::execute(),
        Commands::Presets => commands::presets::execute(app),
        Commands::Quiz(cmd) => commands::quiz::execute(app, cmd),
        Commands::Export { output } => commands::transfer::export(app, output),
        Commands::Import { file } => commands::transfer::import(app, file),
        Commands::Review(cmd) => commands::review::execute(app, cmd),
        Commands::Exam(cmd) => commands::exam::execute(app, cmd).await,
        Commands::Analyze { quiz, json } => commands::analyze::execute(app, quiz, json),
        Commands::Drill {
            quiz,
            size,
            seed,
            clear,
        } => commands::drill::execute(app, quiz, size, seed, clear),
        Commands::Models { provider } => commands::models::execute(app, provider),
        Commands::Practice(cmd) => commands::practice::execute(app, cmd),
        Commands::Report {
            attempt,
            format,
            output,
        } => commands::report::execute(app, attempt, format, output),
        Commands::Generate {
            topic,
            count,
            quiz,
            title,
            provider,
        } => commands::generate::execute(app, topic, count, quiz, title, provider).await,
        Commands::Coach {
            quiz,
            message,
            provider,
        } => commands::coach::execute(app, quiz, message, provider).await,
    }
}
