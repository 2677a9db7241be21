//! Command-line surface: one discovery run by default, plus upkeep of the
//! application history and stored search terms.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use crate::dedup::applications::NewApplication;
use crate::dedup::search_terms::TermType;
use crate::dedup::DedupStore;
use crate::run;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "scout", version, about = "Discover and score job postings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Search every enabled source and analyze the best local matches
    Run,

    /// Record a submitted application; the URL is never rediscovered
    Apply {
        url: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "manual")]
        source: String,
        /// Match score the posting was given, 0-100
        #[arg(long)]
        score: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Move an application to a new status (interview, rejected, ...)
    Status {
        url: String,
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show what the store knows about a posting URL
    Show { url: String },

    /// Manage the search terms a run pivots to
    Terms {
        #[command(subcommand)]
        action: TermAction,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum TermAction {
    /// Add a title or location term
    Add {
        term: String,
        #[arg(long, value_enum, default_value = "title")]
        kind: TermType,
    },
    /// Delete a term of either kind
    Remove { term: String },
    /// List active terms
    List,
}

/// Runs one command and returns its JSON output.
pub async fn execute(command: Command, state: &AppState) -> Result<Value> {
    let store = &state.store;
    match command {
        Command::Run => Ok(serde_json::to_value(run::run(state).await)?),

        Command::Apply {
            url,
            company,
            title,
            source,
            score,
            notes,
        } => {
            let recorded = store
                .record_application(NewApplication {
                    job_url: &url,
                    company: &company,
                    title: &title,
                    source: &source,
                    match_score: score,
                    notes: notes.as_deref(),
                })
                .await?;
            let Some(id) = recorded else {
                bail!("An application for {url} is already recorded");
            };
            Ok(json!({ "id": id, "url": url, "status": "submitted" }))
        }

        Command::Status { url, status, notes } => {
            if !store.update_status(&url, &status, notes.as_deref()).await? {
                bail!("No application recorded for {url}");
            }
            Ok(json!({ "url": url, "status": status }))
        }

        Command::Show { url } => Ok(json!({
            "url": url,
            "discovered": store.seen_record(&url).await?,
            "applied": store.is_applied(&url).await?,
            "application": store.application(&url).await?,
            "history": store.status_history(&url).await?,
        })),

        Command::Terms { action } => match action {
            TermAction::Add { term, kind } => {
                store.add_search_term(&term, kind).await?;
                Ok(json!({ "added": term.trim(), "kind": kind.as_str() }))
            }
            TermAction::Remove { term } => {
                store.delete_search_term(&term).await?;
                Ok(json!({ "removed": term.trim() }))
            }
            TermAction::List => Ok(json!({
                "titles": store.search_terms(TermType::Title).await?,
                "locations": store.search_terms(TermType::Location).await?,
            })),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ProviderChain;
    use crate::run::tests::{config, state};

    fn parse(args: &[&str]) -> Option<Command> {
        Cli::try_parse_from(args.iter().copied()).unwrap().command
    }

    async fn app_state(dir: &tempfile::TempDir) -> AppState {
        state(config(), ProviderChain::default(), dir).await
    }

    #[test]
    fn test_parses_commands() {
        assert_eq!(parse(&["scout"]), None);
        assert_eq!(
            parse(&["scout", "terms", "add", "Detroit", "--kind", "location"]),
            Some(Command::Terms {
                action: TermAction::Add {
                    term: "Detroit".to_string(),
                    kind: TermType::Location,
                },
            })
        );
        assert_eq!(
            parse(&[
                "scout",
                "apply",
                "https://jobs.example/1",
                "--company",
                "Acme",
                "--title",
                "QA",
            ]),
            Some(Command::Apply {
                url: "https://jobs.example/1".to_string(),
                company: "Acme".to_string(),
                title: "QA".to_string(),
                source: "manual".to_string(),
                score: None,
                notes: None,
            })
        );
        assert!(Cli::try_parse_from(["scout", "apply", "https://jobs.example/1"]).is_err());
    }

    #[tokio::test]
    async fn test_application_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let url = "https://jobs.example/applied";

        let apply = parse(&[
            "scout", "apply", url, "--company", "Acme", "--title", "Safety Lead", "--score", "84",
        ])
        .unwrap();
        execute(apply, &state).await.unwrap();

        let status =
            parse(&["scout", "status", url, "interview", "--notes", "phone screen"]).unwrap();
        execute(status, &state).await.unwrap();

        let shown = execute(Command::Show { url: url.to_string() }, &state)
            .await
            .unwrap();
        assert_eq!(shown["applied"], true);
        assert_eq!(shown["application"]["status"], "interview");
        assert_eq!(shown["application"]["match_score"], 84);
        assert_eq!(shown["history"], json!(["submitted", "interview"]));
        assert!(state.store.has_seen(url).await.unwrap());
    }

    #[tokio::test]
    async fn test_repeat_application_and_unknown_status_fail() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let apply = || Command::Apply {
            url: "https://jobs.example/twice".to_string(),
            company: "Acme".to_string(),
            title: "QA".to_string(),
            source: "manual".to_string(),
            score: None,
            notes: None,
        };

        assert!(execute(apply(), &state).await.is_ok());
        assert!(execute(apply(), &state).await.is_err());

        let status = Command::Status {
            url: "https://jobs.example/never".to_string(),
            status: "rejected".to_string(),
            notes: None,
        };
        assert!(execute(status, &state).await.is_err());
    }

    #[tokio::test]
    async fn test_show_reports_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let url = "https://jobs.example/found";
        state.store.mark_seen(url).await.unwrap();

        let shown = execute(Command::Show { url: url.to_string() }, &state)
            .await
            .unwrap();
        assert_eq!(shown["discovered"]["job_url"], url);
        assert_eq!(shown["applied"], false);
        assert_eq!(shown["application"], Value::Null);

        let unknown = execute(Command::Show { url: "https://nope".to_string() }, &state)
            .await
            .unwrap();
        assert_eq!(unknown["discovered"], Value::Null);
    }

    #[tokio::test]
    async fn test_stored_terms_steer_the_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let commands: [&[&str]; 4] = [
            &["scout", "terms", "add", "Safety Engineer"],
            &["scout", "terms", "add", "Test Engineer"],
            &["scout", "terms", "add", "Detroit", "--kind", "location"],
            &["scout", "terms", "remove", "Test Engineer"],
        ];
        for args in commands {
            execute(parse(args).unwrap(), &state).await.unwrap();
        }

        let listed = execute(parse(&["scout", "terms", "list"]).unwrap(), &state)
            .await
            .unwrap();
        assert_eq!(
            listed,
            json!({ "titles": ["Safety Engineer"], "locations": ["Detroit"] })
        );

        let plan = run::plan_searches(&state).await;
        assert_eq!(plan.queries, vec!["Safety Engineer"]);
        assert_eq!(plan.locations, vec!["Detroit"]);
    }
}
