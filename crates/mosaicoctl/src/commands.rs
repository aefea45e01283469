//! Command handlers for mosaicoctl.

use anyhow::{Context, Result};
use mosaico_common::progression::{
    color_distribution, track_progress_views, LessonOutcome, MosaicView,
};
use mosaico_common::recommend::fallback_recommendations;
use mosaico_common::{
    Catalogs, EngineError, InMemorySyncAdapter, ProgressionDocument, ProgressionEngine,
    ProgressionState, ProgressionStore, SyncAdapter,
};
use owo_colors::OwoColorize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const KEY_WIDTH: usize = 14;

fn print_kv(key: &str, value: impl std::fmt::Display) {
    println!("{:width$} {}", key.dimmed(), value, width = KEY_WIDTH);
}

fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn load_catalogs(path: Option<&Path>) -> Result<Catalogs> {
    let catalogs = match path {
        Some(path) => Catalogs::load_from(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalogs::load().context("Failed to load catalog")?,
    };
    Ok(catalogs)
}

fn read_document(path: &Path) -> Result<ProgressionDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid document {}", path.display()))
}

fn write_document(path: &Path, doc: &ProgressionDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write {}", path.display()))
}

/// Handle level command
pub fn level(catalogs: &Catalogs, xp: u64) -> Result<()> {
    let progress = catalogs.levels.progress_within_level(xp);
    print_kv("level", progress.level.bold());
    print_kv("title", &progress.title);
    print_kv(
        "progress",
        format!(
            "{} {:.0}%  {}/{} XP",
            progress_bar(progress.percent, 30),
            progress.percent,
            progress.xp_earned_in_level,
            progress.xp_needed_for_level
        ),
    );
    match catalogs.levels.xp_to_next_level(xp) {
        Some(remaining) => print_kv("next level", format!("{} XP", remaining)),
        None => print_kv("next level", "max level reached".green()),
    }
    Ok(())
}

fn print_outcome(catalogs: &Catalogs, outcome: &LessonOutcome) {
    println!(
        "{} {} +{} XP (total {})",
        "[OK]".green(),
        outcome.track_id,
        outcome.xp_gained,
        outcome.state.xp
    );
    if outcome.leveled_up() {
        let title = catalogs.levels.title_for(outcome.level_after).unwrap_or("");
        println!(
            "{} level {} -> {} {}",
            "[LEVEL]".bright_cyan(),
            outcome.level_before,
            outcome.level_after,
            title
        );
    }
    if let Some(badge) = &outcome.new_badge {
        println!(
            "{} mosaic {} complete ({} pieces)",
            "[BADGE]".yellow(),
            badge.mosaic_index,
            badge.color_history.len()
        );
    }
    if outcome.mastery_reached {
        println!("{} every mosaic is complete", "[MASTERY]".bright_magenta());
    }
}

/// Handle complete command
///
/// Completions go through a progression store backed by an in-memory
/// adapter seeded from the file; whatever the adapter holds afterwards is
/// written back, including completions made before a failure.
pub async fn complete(
    catalogs: Catalogs,
    path: &Path,
    track_id: &str,
    times: u32,
    account: &str,
) -> Result<()> {
    let doc = if path.exists() {
        read_document(path)?
    } else {
        info!(path = %path.display(), account, "Creating progression document");
        ProgressionDocument::new(account, ProgressionState::new())
    };
    let account_id = doc.account_id.clone();

    let adapter = Arc::new(InMemorySyncAdapter::new());
    adapter.push_authoritative(&account_id, doc.state).await;
    let engine = ProgressionEngine::new(Arc::new(catalogs));
    let store = ProgressionStore::open(&account_id, engine, adapter.clone())
        .await
        .context("Progression document failed reconciliation")?;

    let mut result = Ok(());
    for _ in 0..times {
        match store.complete_lesson(track_id).await {
            Ok(outcome) => print_outcome(store.engine().catalogs(), &outcome),
            Err(err) => {
                println!("{} {} ({})", "[REJECTED]".bright_red(), err, err.code());
                result = Err(err).context("Lesson completion rejected");
                break;
            }
        }
    }

    let saved = adapter.fetch(&account_id).await?;
    write_document(path, &saved)?;
    result
}

/// Handle reconcile command
pub fn reconcile(catalogs: Catalogs, path: &Path) -> Result<()> {
    let doc = read_document(path)?;
    let engine = ProgressionEngine::new(Arc::new(catalogs));

    match engine.reconcile(&doc.state) {
        Ok(reconciled) if reconciled == doc.state => {
            println!("{} document is consistent", "[OK]".green());
            Ok(())
        }
        Ok(reconciled) => {
            if reconciled.level != doc.state.level {
                println!(
                    "{} level {} -> {}",
                    "[REPAIRED]".yellow(),
                    doc.state.level,
                    reconciled.level
                );
            }
            write_document(path, &ProgressionDocument::new(&doc.account_id, reconciled))?;
            println!("{} document rewritten", "[OK]".green());
            Ok(())
        }
        Err(err @ EngineError::InvariantViolation(_)) => {
            println!("{} {}", "[VIOLATION]".bright_red(), err);
            Err(err).context("Progression document is corrupt")
        }
        Err(err) => Err(err.into()),
    }
}

/// Handle show command
pub fn show(catalogs: &Catalogs, path: &Path) -> Result<()> {
    let doc = read_document(path)?;
    let state = &doc.state;

    println!("{}", format!("account {}", doc.account_id).bold());
    let progress = catalogs.levels.progress_within_level(state.xp);
    print_kv("level", format!("{} {}", progress.level, progress.title));
    print_kv("xp", format!("{} {:.0}%", state.xp, progress.percent));
    println!();

    let view = MosaicView::from_state(state, &catalogs.mosaics);
    if view.mastery {
        print_kv("mosaic", "all mosaics complete".green());
    } else {
        let total = view.total_segments.unwrap_or(0);
        print_kv(
            "mosaic",
            format!(
                "#{} {}/{} {}",
                view.mosaic_index,
                view.pieces,
                total,
                progress_bar(view.percent, 30)
            ),
        );
    }
    print_kv("stars", "*".repeat(usize::from(view.stars)).yellow());
    print_kv("badges", state.mosaic_badges.len());

    let colors = color_distribution(state);
    if !colors.is_empty() {
        println!();
        println!("{}", "colors".bold());
        for entry in &colors {
            print_kv(entry.color.as_str(), entry.count);
        }
    }

    println!();
    println!("{}", "tracks".bold());
    for track in track_progress_views(state, &catalogs.tracks) {
        let marker = if track.is_complete {
            "[DONE]".green().to_string()
        } else {
            format!("{:>3}%", track.percent)
        };
        println!(
            "  {:24} {:>2}/{:<2} {}",
            track.track_id, track.completed_lessons, track.total_lessons, marker
        );
    }
    Ok(())
}

/// Handle catalog command
pub fn catalog(catalogs: &Catalogs) -> Result<()> {
    println!("{}", "levels".bold());
    for entry in catalogs.levels.entries() {
        println!("  {:>3} {:>8} XP  {}", entry.level, entry.xp_threshold, entry.title);
    }

    println!();
    println!("{}", "mosaics".bold());
    for entry in catalogs.mosaics.entries() {
        println!("  #{:<2} {} segments", entry.mosaic_index, entry.segment_count);
    }

    println!();
    println!("{}", "tracks".bold());
    for track in catalogs.tracks.tracks() {
        println!(
            "  {:24} {:>2} lessons {:>4} XP  {}  {}",
            track.track_id, track.total_lessons, track.reward_xp, track.color, track.title
        );
    }
    Ok(())
}

/// Handle recommend command
pub fn recommend(catalogs: &Catalogs, interests: &[String]) -> Result<()> {
    for track_id in fallback_recommendations(&catalogs.tracks, interests) {
        match catalogs.tracks.get(&track_id) {
            Some(track) => println!("{:24} {}", track_id, track.title.dimmed()),
            None => println!("{}", track_id),
        }
    }
    Ok(())
}
