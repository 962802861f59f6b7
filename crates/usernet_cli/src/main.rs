//! Command-line access to the user network store.
//!
//! # Responsibility
//! - Run one service operation per invocation against a SQLite file.
//! - Print results as pretty JSON on stdout and failures on stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, warn};
use serde::Serialize;
use std::process::ExitCode;
use usernet_core::db::open_db;
use usernet_core::{
    init_console_logging, Ack, GraphView, NewUser, ScoredUser, ServiceResult,
    SqliteUserRepository, UserId, UserPatch, UserRepository, UserService,
};

/// usernet - manage users, hobbies and friendships
#[derive(Parser, Debug)]
#[command(name = "usernet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database file; `:memory:` keeps everything in memory
    #[arg(long, default_value = "usernet.sqlite3", env = "USERNET_DB_PATH")]
    db: String,

    /// Log level written to stderr
    #[arg(long, default_value = "warn", env = "USERNET_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every user with its popularity score
    List,
    /// Show one user
    Show { id: UserId },
    /// Create a user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        age: i64,
        /// Repeat for each hobby
        #[arg(long = "hobby", required = true)]
        hobbies: Vec<String>,
    },
    /// Update selected fields of a user
    Update {
        id: UserId,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        age: Option<i64>,
        /// Replaces the whole hobby list; repeat for each hobby
        #[arg(long = "hobby")]
        hobbies: Vec<String>,
    },
    /// Delete a user without friendships
    Delete { id: UserId },
    /// Make two users friends
    Link { id: UserId, friend: UserId },
    /// Remove a friendship
    Unlink { id: UserId, friend: UserId },
    /// Print the node/edge view of the network
    Graph,
    /// List distinct hobbies
    Hobbies {
        /// Case-insensitive substring filter
        #[arg(long)]
        query: Option<String>,
    },
    /// Append one hobby to a user
    AddHobby { id: UserId, hobby: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_console_logging(&cli.log_level) {
        eprintln!("error: {err}");
        return ExitCode::from(2);
    }

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let conn =
        open_db(&cli.db).with_context(|| format!("failed to open database at {}", cli.db))?;
    let repo = SqliteUserRepository::try_new(&conn)?;
    let service = UserService::new(repo);
    let output = execute(&service, cli.command)?;
    serde_json::to_string_pretty(&output).context("failed to encode command output")
}

/// Result of one command, printed as JSON.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Output {
    Users(Vec<ScoredUser>),
    User(ScoredUser),
    Ack(Ack),
    Graph(GraphView),
    Hobbies(Vec<String>),
}

fn execute<R: UserRepository>(
    service: &UserService<R>,
    command: Command,
) -> ServiceResult<Output> {
    let name = command.name();
    let result = match command {
        Command::List => service.list_users().map(Output::Users),
        Command::Show { id } => service.get_user(id).map(Output::User),
        Command::Create {
            username,
            age,
            hobbies,
        } => service
            .create_user(NewUser {
                username,
                age,
                hobbies,
            })
            .map(Output::User),
        Command::Update {
            id,
            username,
            age,
            hobbies,
        } => {
            let patch = UserPatch {
                username,
                age,
                hobbies: (!hobbies.is_empty()).then_some(hobbies),
            };
            service.update_user(id, patch).map(Output::User)
        }
        Command::Delete { id } => service.delete_user(id).map(Output::Ack),
        Command::Link { id, friend } => service.link_users(id, friend).map(Output::Ack),
        Command::Unlink { id, friend } => service.unlink_users(id, friend).map(Output::Ack),
        Command::Graph => service.graph().map(Output::Graph),
        Command::Hobbies { query } => service.hobbies(query.as_deref()).map(Output::Hobbies),
        Command::AddHobby { id, hobby } => service.add_hobby(id, &hobby).map(Output::User),
    };

    match &result {
        Ok(_) => debug!("event=cli_command module=cli status=ok command={name}"),
        Err(err) => warn!(
            "event=cli_command module=cli status=error command={name} kind={:?}",
            err.kind()
        ),
    }
    result
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Show { .. } => "show",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::Graph => "graph",
            Self::Hobbies { .. } => "hobbies",
            Self::AddHobby { .. } => "add-hobby",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{execute, Cli, Command};
    use clap::Parser;
    use serde_json::Value;
    use usernet_core::db::open_db_in_memory;
    use usernet_core::{
        ErrorKind, ServiceResult, SqliteUserRepository, UserRepository, UserService,
    };

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["usernet", "--db", ":memory:"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    fn run_json<R: UserRepository>(
        service: &UserService<R>,
        args: &[&str],
    ) -> ServiceResult<Value> {
        execute(service, parse(args)).map(|output| serde_json::to_value(output).unwrap())
    }

    #[test]
    fn create_requires_at_least_one_hobby() {
        let result = Cli::try_parse_from([
            "usernet", "create", "--username", "alice", "--age", "20",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(Cli::try_parse_from(["usernet", "show", "not-a-uuid"]).is_err());
    }

    #[test]
    fn commands_drive_the_service() {
        let conn = open_db_in_memory().unwrap();
        let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

        let alice = run_json(
            &service,
            &[
                "create", "--username", "alice", "--age", "25", "--hobby", "reading", "--hobby",
                "gaming",
            ],
        )
        .unwrap();
        let bob = run_json(
            &service,
            &["create", "--username", "bob", "--age", "30", "--hobby", "gaming"],
        )
        .unwrap();
        let alice_id = alice["id"].as_str().unwrap();
        let bob_id = bob["id"].as_str().unwrap();

        let ack = run_json(&service, &["link", alice_id, bob_id]).unwrap();
        assert_eq!(ack, serde_json::json!({"message": "Users linked successfully"}));

        let shown = run_json(&service, &["show", alice_id]).unwrap();
        assert_eq!(shown["popularityScore"], 1.5);

        let updated = run_json(&service, &["update", bob_id, "--age", "31"]).unwrap();
        assert_eq!(updated["age"], 31);
        assert_eq!(updated["hobbies"], serde_json::json!(["gaming"]));

        let listed = run_json(&service, &["list"]).unwrap();
        assert_eq!(listed.as_array().map(Vec::len), Some(2));

        let graph = run_json(&service, &["graph"]).unwrap();
        assert_eq!(graph["edges"].as_array().map(Vec::len), Some(1));

        let hobbies = run_json(&service, &["hobbies", "--query", "GAM"]).unwrap();
        assert_eq!(hobbies, serde_json::json!(["gaming"]));

        let err = run_json(&service, &["delete", alice_id]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
