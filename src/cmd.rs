//! Command implementations for the CLI interface.
//!
//! Each subcommand resolves the backend from the shared [`Context`], runs
//! against a freshly mounted [`Session`], prints plain text and exits with
//! status 1 on failure.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::api::{HttpBackend, ProfileFields, ProfileUpdate, TimelineBackend};
use crate::claims::decode_claims;
use crate::config::{Config, TokenStore};
use crate::display::{print_timeline, progress_lines};
use crate::fields::*;
use crate::milestone::OverallProgress;
use crate::session::Session;
use crate::timeline::{Effect, Timeline, TimelineError};
use crate::tui::run::run_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive timeline view.
    Ui,

    /// List milestones and their tasks.
    List {
        /// Only show milestones with this status.
        #[arg(long, value_enum)]
        status: Option<MilestoneStatus>,
        /// One line per milestone, without tasks.
        #[arg(long)]
        compact: bool,
    },

    /// Show overall programme progress.
    Progress,

    /// Tick or untick a task, using the numbers printed by `list`.
    Toggle {
        /// Milestone number (1-based).
        milestone: usize,
        /// Task number within the milestone (1-based).
        task: usize,
    },

    /// Show who the current token belongs to.
    Whoami,

    /// Manage the saved bearer token.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Show or update your profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Save a bearer token for later commands.
    Set {
        /// Token as issued by the portal login.
        token: String,
    },
    /// Forget the saved token.
    Clear,
    /// Show the saved token's owner and expiry.
    Show,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Print your profile.
    Show,
    /// Change profile fields. Fields not given keep their current values.
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        /// Programme start date, e.g. 2025-09-01.
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        interests: Option<String>,
        #[arg(long = "linkedin")]
        linkedin_link: Option<String>,
        #[arg(long = "github")]
        github_link: Option<String>,
    },
}

/// Settings resolved once per invocation.
pub struct Context {
    pub config: Config,
    pub data_dir: PathBuf,
    pub api_url: String,
    /// Explicit token from `--token` / `GRADPATH_TOKEN`, else the saved one.
    pub token: Option<String>,
}

impl Context {
    pub fn backend(&self) -> HttpBackend {
        HttpBackend::new(&self.api_url, self.token.clone(), self.config.timeout())
    }

    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.config.scroll_delay())
    }

    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(&self.data_dir)
    }

    /// Mount a session, exiting if there is no token or the load fails.
    fn mount(&self) -> Session<HttpBackend> {
        if self.token.is_none() {
            eprintln!("Not signed in. Save a token with `gp token set <token>`.");
            std::process::exit(1);
        }
        let session = Session::mount(self.backend(), self.timeline());
        if let Some(e) = session.load_error() {
            eprintln!("Error: could not load timeline from {}: {}", self.api_url, e);
            std::process::exit(1);
        }
        session
    }
}

/// Launch the terminal user interface.
pub fn cmd_ui(ctx: &Context) {
    if let Err(e) = run_tui(ctx) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Print the timeline, optionally filtered by displayed status.
pub fn cmd_list(ctx: &Context, status: Option<MilestoneStatus>, compact: bool) {
    let session = ctx.mount();
    let milestones = session.timeline().milestones();
    if milestones.is_empty() {
        println!("No milestones have been set up yet.");
        return;
    }

    let entries: Vec<_> = milestones
        .iter()
        .enumerate()
        .filter(|(_, m)| status.map_or(true, |s| m.display_status() == s))
        .collect();
    if entries.is_empty() {
        println!("No milestones match.");
        return;
    }
    print_timeline(&entries, compact);
}

/// Print the overall progress summary.
pub fn cmd_progress(ctx: &Context) {
    let session = ctx.mount();
    if let Some(user) = session.user() {
        println!("{}", user.display_name());
    }
    let progress = OverallProgress::from_milestones(session.timeline().milestones());
    for line in progress_lines(&progress) {
        println!("{line}");
    }
}

/// Toggle one task through the progress controller and report the outcome.
pub fn cmd_toggle(ctx: &Context, milestone: usize, task: usize) {
    if milestone == 0 || task == 0 {
        eprintln!("Error: milestone and task numbers start at 1");
        std::process::exit(1);
    }
    let mut session = ctx.mount();
    let (mi, ti) = (milestone - 1, task - 1);

    let report = match session.toggle(mi, ti) {
        Ok(report) => report,
        Err(e) => {
            let msg = match e {
                TimelineError::NoSuchMilestone(_) => format!("no milestone {milestone}"),
                TimelineError::NoSuchTask { .. } => {
                    format!("milestone {milestone} has no task {task}")
                }
                other => other.to_string(),
            };
            eprintln!("Error: {msg}");
            std::process::exit(1);
        }
    };

    if let Some(e) = report.error {
        eprintln!("Error: change not saved, nothing was updated: {e}");
        std::process::exit(1);
    }

    let milestones = session.timeline().milestones();
    let m = &milestones[mi];
    let t = &m.tasks[ti];
    let verb = if t.completed { "Completed" } else { "Reopened" };
    println!("{verb}: {} ({})", t.name, m.title);

    for effect in report.effects {
        match effect {
            Effect::Celebrate { title, .. } => {
                println!("Congratulations! You have completed \"{title}\".");
            }
            Effect::ScrollTo { milestone_index, .. } if milestone_index > mi => {
                if let Some(next) = milestones.get(milestone_index) {
                    println!("Up next: {} ({})", next.title, next.week_label);
                }
            }
            Effect::ScrollTo { .. } => {}
        }
    }
}

/// Show the token's claims and the backend's view of the account.
pub fn cmd_whoami(ctx: &Context) {
    let Some(token) = ctx.token.as_deref() else {
        eprintln!("Not signed in. Save a token with `gp token set <token>`.");
        std::process::exit(1);
    };
    print_claims(token);

    match ctx.backend().current_user() {
        Ok(user) => {
            println!("Name:    {}", user.display_name());
            println!("Id:      {}", user.id);
            if let Some(dept) = user.profile.department.as_deref() {
                println!("Dept:    {dept}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_claims(token: &str) {
    match decode_claims(token) {
        Ok(claims) => {
            if let Some(sub) = claims.sub.as_deref() {
                println!("Email:   {sub}");
            }
            if let Some(role) = claims.effective_role() {
                println!("Role:    {role}");
            }
            if let Some(exp) = claims.exp {
                let when = DateTime::<Utc>::from_timestamp(exp, 0)
                    .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| exp.to_string());
                if claims.is_expired(Utc::now().timestamp()) {
                    println!("Expired: {when}");
                } else {
                    println!("Expires: {when}");
                }
            }
        }
        Err(e) => println!("Token:   unreadable ({e})"),
    }
}

/// Handle token management commands.
pub fn cmd_token(ctx: &Context, action: TokenAction) {
    let store = ctx.token_store();
    match action {
        TokenAction::Set { token } => {
            if token.trim().is_empty() {
                eprintln!("Error: token is empty");
                std::process::exit(1);
            }
            if let Err(e) = decode_claims(&token) {
                eprintln!("Warning: {e}; saving anyway");
            }
            if let Err(e) = store.save(&token) {
                eprintln!("Failed to save token: {e}");
                std::process::exit(1);
            }
            println!("Token saved to {}", store.path().display());
        }
        TokenAction::Clear => match store.clear() {
            Ok(true) => println!("Token removed."),
            Ok(false) => println!("No token saved."),
            Err(e) => {
                eprintln!("Failed to remove token: {e}");
                std::process::exit(1);
            }
        },
        TokenAction::Show => match store.load() {
            Ok(Some(token)) => {
                println!("Saved in {}", store.path().display());
                print_claims(&token);
            }
            Ok(None) => println!("No token saved."),
            Err(e) => {
                eprintln!("Failed to read token: {e}");
                std::process::exit(1);
            }
        },
    }
}

/// Handle profile commands.
pub fn cmd_profile(ctx: &Context, action: ProfileAction) {
    let backend = ctx.backend();
    if !backend.is_authenticated() {
        eprintln!("Not signed in. Save a token with `gp token set <token>`.");
        std::process::exit(1);
    }
    let user = match backend.current_user() {
        Ok(user) => user,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match action {
        ProfileAction::Show => print_profile(&user.profile),
        ProfileAction::Update {
            email,
            first_name,
            last_name,
            phone,
            department,
            branch,
            start_date,
            bio,
            interests,
            linkedin_link,
            github_link,
        } => {
            let changes = ProfileFields {
                email,
                first_name,
                last_name,
                phone,
                department,
                branch,
                start_date,
                bio,
                interests,
                linkedin_link,
                github_link,
            };
            if changes == ProfileFields::default() {
                eprintln!("Error: nothing to update; pass at least one field");
                std::process::exit(1);
            }
            let update = ProfileUpdate::new(&user, changes);
            if let Err(e) = backend.update_profile(&update) {
                eprintln!("Error: profile not updated: {e}");
                std::process::exit(1);
            }
            println!("Profile updated.");
            print_profile(update.fields());
        }
    }
}

fn print_profile(p: &ProfileFields) {
    let rows = [
        ("Email", &p.email),
        ("First name", &p.first_name),
        ("Last name", &p.last_name),
        ("Phone", &p.phone),
        ("Department", &p.department),
        ("Branch", &p.branch),
        ("Start date", &p.start_date),
        ("Bio", &p.bio),
        ("Interests", &p.interests),
        ("LinkedIn", &p.linkedin_link),
        ("GitHub", &p.github_link),
    ];
    for (label, value) in rows {
        println!("{:<11} {}", format!("{label}:"), value.as_deref().unwrap_or("-"));
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
