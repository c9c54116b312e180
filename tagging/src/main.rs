//! Matchtag demo binary
//!
//! Runs a coach and a viewer against an in-memory document store: the coach
//! sets up a squad and a match, tags a few plays, reviews AI suggestions, and
//! the viewer's dashboard follows along.
//!
//! Suggestions come from Claude when `ANTHROPIC_API_KEY` is set, and from a
//! canned reply otherwise.

use anyhow::Context;
use matchtag::analytics::Filters;
use matchtag::analytics::time::format_clock;
use matchtag::mocks::ScriptedSuggestionService;
use matchtag::suggestions::{AnthropicSuggestionService, RawSuggestion, SuggestionService};
use matchtag::{
    Action, CoachEnvironment, CoachSession, Config, MatchId, NewMatch, NewPlayer, NewTag,
    ViewerSession,
};
use matchtag_anthropic::AnthropicClient;
use matchtag_core::environment::{SystemClock, UuidIdGenerator};
use matchtag_testing::InMemoryDocumentStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn suggestion_service(config: &Config) -> Arc<dyn SuggestionService> {
    match AnthropicClient::from_env() {
        Ok(client) => {
            tracing::info!(model = %config.suggestions.model, "Using Claude for suggestions");
            Arc::new(AnthropicSuggestionService::new(client, &config.suggestions))
        },
        Err(error) => {
            tracing::info!(%error, "No API key, using canned suggestions");
            let service = ScriptedSuggestionService::new();
            service.push_reply(vec![
                RawSuggestion {
                    timestamp: json!("2:14"),
                    action: "Recuperación de balón".into(),
                    description: "Midfielder intercepts a loose pass".into(),
                    confidence: Some(0.86),
                    rationale: Some("Follows a ball loss four seconds earlier".into()),
                    player_id: None,
                },
                RawSuggestion {
                    timestamp: json!(160),
                    action: "Saque de banda".into(),
                    description: "Throw-in on the right".into(),
                    confidence: Some(0.9),
                    rationale: None,
                    player_id: None,
                },
            ]);
            Arc::new(service)
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("reading configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Matchtag: coach and viewer on one document ===\n");

    let documents = Arc::new(InMemoryDocumentStore::new());
    let env = CoachEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(UuidIdGenerator),
        documents.clone(),
        suggestion_service(&config),
        config.clone(),
    );
    let coach = CoachSession::connect(env).await?;
    let viewer =
        ViewerSession::connect(documents.clone(), &config.coach_id, config.pairing).await?;

    for (name, number) in [("Ana Torres", 9), ("Lucía Pérez", 5), ("Sofía Ruiz", 1)] {
        coach
            .add_player(NewPlayer {
                name: name.to_string(),
                jersey_number: Some(number),
                position: None,
            })
            .await?
            .wait()
            .await;
    }
    coach
        .create_match(NewMatch {
            tournament: "Liga Metropolitana".into(),
            category: "Sub-17".into(),
            round: 3,
            opponent: "Deportivo Norte".into(),
            date: "2025-04-12".into(),
            team_name: "Club Atlético".into(),
        })
        .await?
        .wait()
        .await;

    let snapshot = coach.snapshot().await;
    let match_id: MatchId = snapshot
        .matches
        .first()
        .map(|m| m.id.clone())
        .context("match was not created")?;
    let striker = snapshot
        .players
        .first()
        .map(|p| p.id.clone())
        .context("no players were imported")?;
    let midfielder = snapshot
        .players
        .get(1)
        .map(|p| p.id.clone())
        .context("second player was not imported")?;

    let plays = [
        (&midfielder, Action::BallLoss, 130.0),
        (&midfielder, Action::ShortPassOffensiveAchieved, 180.0),
        (&striker, Action::ShotOnTarget, 190.0),
        (&striker, Action::GoalScored, 191.0),
        (&midfielder, Action::DuelDefensiveFailed, 240.0),
    ];
    for (player, action, timestamp) in plays {
        coach
            .add_tag(NewTag {
                match_id: match_id.clone(),
                player_id: player.clone(),
                action,
                timestamp,
            })
            .await?
            .wait()
            .await;
        println!("Tagged {action} at {}", format_clock(timestamp));
    }

    println!("\n>>> Requesting suggestions");
    match coach.request_suggestions(match_id.clone(), Vec::new()).await {
        Ok(proposals) => {
            for proposal in &proposals {
                println!(
                    "  {} at {} ({:?})",
                    proposal.action,
                    format_clock(proposal.timestamp),
                    proposal.confidence
                );
            }
            if let Some(first) = proposals.first() {
                coach
                    .accept_suggestion(first.id.clone(), Some(midfielder.clone()), None)
                    .await?
                    .wait()
                    .await;
            }
        },
        Err(error) => println!("  Suggestions unavailable: {error}"),
    }

    let mut changes = viewer.changes();
    let _ = tokio::time::timeout(Duration::from_secs(1), changes.changed()).await;

    let dashboard = viewer.dashboard(&Filters::default()).await;
    println!("\n=== Viewer dashboard ===");
    println!(
        "Tags: {}  Successful: {}  Effectiveness: {:.1}%",
        dashboard.kpis.total, dashboard.kpis.successful, dashboard.kpis.effectiveness
    );
    println!(
        "Shots: {}  Goals: {}",
        dashboard.goals.shots, dashboard.goals.goals
    );
    for round in &dashboard.by_round {
        println!("Round {}: {:.2}%", round.round, round.effectiveness);
    }

    let pairing = viewer.pairing(&Filters::default()).await;
    for point in &pairing.recoveries {
        println!(
            "Recovery {:.0}s after loss (round {})",
            point.duration_secs, point.round
        );
    }

    let stats = coach.feedback_stats().await;
    println!("\nSuggestion feedback: {} reviewed, {} accepted", stats.total, stats.accepted);

    coach.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
