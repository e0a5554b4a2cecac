use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::config::{self, AppConfig};
use crate::model::timer::{format_elapsed, TaskRef, TimerState};
use crate::notifications::NotificationQueue;
use crate::providers;
use crate::timer::{TimerController, ToggleCommand, ToggleOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tui,
    Status,
    Toggle(ToggleCommand),
    Whoami,
    Projects,
    Help,
}

/// Parse the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(first) = args.first() else {
        return Ok(Command::Tui);
    };
    match first.as_str() {
        "status" => Ok(Command::Status),
        "toggle" => parse_toggle_args(&args[1..]).map(Command::Toggle),
        "whoami" => Ok(Command::Whoami),
        "projects" => Ok(Command::Projects),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command: {other}\n\nRun `timeboard help` for usage."),
    }
}

/// Parse `toggle` arguments.
///
/// Supported forms:
///   timeboard toggle 123 456
///   timeboard toggle 123 456 -n "Pairing on login"
///   timeboard toggle 123 456 --note Pairing on login
pub fn parse_toggle_args(args: &[String]) -> Result<ToggleCommand> {
    const USAGE: &str = "Usage: timeboard toggle <project_id> <task_id> [-n <note>]";

    let mut ids: Vec<u64> = Vec::new();
    let mut note_parts: Vec<String> = Vec::new();
    let mut in_note = false;
    for arg in args {
        match arg.as_str() {
            "-n" | "--note" => in_note = true,
            _ if in_note => note_parts.push(arg.clone()),
            _ => {
                let id = arg
                    .parse::<u64>()
                    .with_context(|| format!("Invalid id {arg:?}\n\n{USAGE}"))?;
                ids.push(id);
            }
        }
    }

    let [project_id, task_id] = ids[..] else {
        bail!("Expected a project id and a task id\n\n{USAGE}");
    };
    if in_note && note_parts.is_empty() {
        bail!("Missing value for -n/--note flag");
    }

    let target = TaskRef {
        project_id,
        task_id,
    };
    Ok(if note_parts.is_empty() {
        ToggleCommand::task(target)
    } else {
        ToggleCommand::with_note(target, &note_parts.join(" "))
    })
}

fn controller(config: &AppConfig) -> Result<TimerController> {
    if config.harvest.is_none() {
        bail!("Harvest is not configured. Add a [harvest] section to ~/.timeboard/config.toml");
    }
    let client = providers::create_time_tracker(config);
    Ok(TimerController::new(client, NotificationQueue::new(config.notifications.ttl())))
}

pub async fn handle_status() -> Result<()> {
    let config = config::load_config()?;
    let timer = controller(&config)?;
    timer
        .poll_once()
        .await
        .context("Failed to fetch the running timer")?;
    print_state(&timer.snapshot());
    Ok(())
}

pub async fn handle_toggle(cmd: ToggleCommand) -> Result<()> {
    let config = config::load_config()?;
    let timer = controller(&config)?;
    // Learn what is running first so the toggle stops it when needed.
    timer
        .poll_once()
        .await
        .context("Failed to fetch the running timer")?;
    let outcome = timer.toggle(cmd).await.context("Failed to toggle timer")?;
    match outcome {
        ToggleOutcome::Started(e) => println!("Started timer on task {} (entry {})", e.task_id, e.time_entry_id),
        ToggleOutcome::Stopped(e) => println!("Stopped timer on task {} (entry {})", e.task_id, e.time_entry_id),
        ToggleOutcome::Switched { stopped, started } => println!(
            "Stopped task {} and started task {} (entry {})",
            stopped.task_id, started.task_id, started.time_entry_id
        ),
    }
    Ok(())
}

pub async fn handle_whoami() -> Result<()> {
    let config = config::load_config()?;
    if config.jira_profiles.is_empty() {
        bail!("No Jira profiles configured. Add [[jira_profiles]] to ~/.timeboard/config.toml");
    }
    let client = providers::create_issue_tracker();
    let mut failed = 0;
    for profile in &config.jira_profiles {
        match client.profile_identity(profile).await {
            Ok(identity) => println!(
                "{}: {} ({}) at {}",
                profile.name, identity.display_name, identity.account_id, profile.url
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", profile.name);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} profile(s) could not be verified");
    }
    Ok(())
}

/// List every project visible to each profile, marking the linked ones.
pub async fn handle_projects() -> Result<()> {
    let config = config::load_config()?;
    if config.jira_profiles.is_empty() {
        bail!("No Jira profiles configured. Add [[jira_profiles]] to ~/.timeboard/config.toml");
    }
    let client = providers::create_issue_tracker();
    for profile in &config.jira_profiles {
        let projects = client
            .list_projects(profile)
            .await
            .with_context(|| format!("Failed to list projects for {}", profile.name))?;
        println!("{} ({})", profile.name, profile.url);
        for project in projects {
            let linked: Vec<String> = config
                .links
                .iter()
                .filter(|l| l.profile == profile.name && l.jira_project == project.key)
                .map(|l| l.harvest_project_id.to_string())
                .collect();
            if linked.is_empty() {
                println!("  {:<10} {}", project.key, project.name);
            } else {
                println!("  {:<10} {}  <- harvest {}", project.key, project.name, linked.join(", "));
            }
        }
    }
    Ok(())
}

fn print_state(state: &TimerState) {
    match state.running() {
        Some(entry) => {
            println!(
                "Running: project {} task {} for {}",
                entry.project_id,
                entry.task_id,
                format_elapsed(entry.elapsed_secs(Utc::now()))
            );
            if let Some(note) = &entry.note {
                println!("  {note}");
            }
        }
        None => println!("No timer running"),
    }
}

pub fn print_help() {
    println!("timeboard: time tracking next to your sprint board\n");
    println!("USAGE:");
    println!("  timeboard                                   Launch the terminal UI");
    println!("  timeboard status                            Show the running timer");
    println!("  timeboard toggle <project_id> <task_id>     Start or stop a timer");
    println!("  timeboard whoami                            Verify each Jira profile");
    println!("  timeboard projects                          List Jira projects and their links");
    println!("  timeboard help                              Show this help");
    println!();
    println!("TOGGLE OPTIONS:");
    println!("  -n, --note <text>  Start the timer with a note");
    println!();
    println!("Configuration lives in ~/.timeboard/config.toml; logs in ~/.timeboard/timeboard.log.");
    println!("Set TIMEBOARD_LOG (e.g. timeboard=debug) to change log verbosity.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    fn target(p: u64, t: u64) -> TaskRef {
        TaskRef {
            project_id: p,
            task_id: t,
        }
    }

    #[test]
    fn no_args_launches_tui() {
        assert_eq!(parse_args(&args(&[])).unwrap(), Command::Tui);
    }

    #[test]
    fn parse_subcommands() {
        assert_eq!(parse_args(&args(&["status"])).unwrap(), Command::Status);
        assert_eq!(parse_args(&args(&["whoami"])).unwrap(), Command::Whoami);
        assert_eq!(parse_args(&args(&["projects"])).unwrap(), Command::Projects);
        assert_eq!(parse_args(&args(&["--help"])).unwrap(), Command::Help);
        assert!(parse_args(&args(&["bogus"])).is_err());
    }

    #[test]
    fn parse_toggle_without_note() {
        let cmd = parse_toggle_args(&args(&["12", "34"])).unwrap();
        assert_eq!(cmd, ToggleCommand::task(target(12, 34)));
    }

    #[test]
    fn parse_toggle_with_multi_word_note() {
        let cmd = parse_toggle_args(&args(&["12", "34", "-n", "Pairing", "on", "login"])).unwrap();
        assert_eq!(cmd.target, target(12, 34));
        assert_eq!(cmd.note.as_deref(), Some("Pairing on login"));
        assert!(!cmd.workflow_ticket);
    }

    #[test]
    fn parse_toggle_long_flag() {
        let cmd = parse_toggle_args(&args(&["12", "34", "--note", "Review"])).unwrap();
        assert_eq!(cmd.note.as_deref(), Some("Review"));
    }

    #[test]
    fn blank_note_means_no_note() {
        let cmd = parse_toggle_args(&args(&["12", "34", "-n", "  "])).unwrap();
        assert_eq!(cmd.note, None);
    }

    #[test]
    fn parse_toggle_requires_two_ids() {
        let err = parse_toggle_args(&args(&["12"])).unwrap_err();
        assert!(err.to_string().contains("project id and a task id"));
        assert!(parse_toggle_args(&args(&["1", "2", "3"])).is_err());
    }

    #[test]
    fn parse_toggle_rejects_non_numeric_id() {
        let err = parse_toggle_args(&args(&["abc", "34"])).unwrap_err();
        assert!(err.to_string().contains("Invalid id"));
    }

    #[test]
    fn parse_missing_note_value_fails() {
        let err = parse_toggle_args(&args(&["12", "34", "-n"])).unwrap_err();
        assert!(err.to_string().contains("Missing value"));
    }
}
