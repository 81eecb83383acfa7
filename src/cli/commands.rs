use std::sync::Arc;

use crate::app::{AppContext, ReelError, Result};
use crate::crawl::CrawlOutcome;
use crate::daemon::{self, Daemon};
use crate::domain::{CrawlState, Language};
use crate::store::Store;

fn languages(ctx: &AppContext, lang: Option<Language>) -> Vec<Language> {
    match lang {
        Some(lang) => vec![lang],
        None => ctx.config.crawl.languages.clone(),
    }
}

fn print_outcomes(outcomes: &[CrawlOutcome]) {
    for outcome in outcomes {
        let last = outcome
            .last_page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<10} {:>4} pages  {:>5} records  last page {:>4}  ({:?})",
            outcome.lang, outcome.pages_fetched, outcome.records_upserted, last, outcome.stop
        );
    }
}

pub async fn serve(ctx: AppContext) -> Result<()> {
    Daemon::new(Arc::new(ctx)).run().await
}

pub async fn crawl(
    ctx: &AppContext,
    lang: Option<Language>,
    from: Option<u32>,
    to: Option<u32>,
    no_progress: bool,
) -> Result<()> {
    let languages = languages(ctx, lang);
    let engine = ctx.crawl_engine();

    if from.is_none() && to.is_none() && !no_progress {
        println!("Catching up {} languages...", languages.len());
        let outcomes = engine.catch_up(&languages).await;
        print_outcomes(&outcomes);
        return Ok(());
    }

    let end = to.unwrap_or(ctx.config.crawl.max_pages);
    let mut outcomes = Vec::new();

    for lang in languages {
        let start = match from {
            Some(page) => page,
            None if no_progress => 1,
            None => ctx.store.get_progress(lang)?.resume_page(),
        };

        if start > end {
            println!("  {:<10} nothing to do (page {} > {})", lang, start, end);
            continue;
        }

        println!("Crawling {} pages {}..={}", lang, start, end);
        outcomes.push(engine.crawl_language(lang, start, end, !no_progress).await?);
    }

    print_outcomes(&outcomes);
    Ok(())
}

pub async fn refresh(ctx: &AppContext, lang: Option<Language>) -> Result<()> {
    let languages = languages(ctx, lang);
    println!("Refreshing {} languages...", languages.len());

    let outcomes = ctx.crawl_engine().refresh(&languages).await;
    print_outcomes(&outcomes);
    Ok(())
}

pub async fn enrich(ctx: &AppContext, once: bool) -> Result<()> {
    let engine = ctx.enrichment_engine()?.ok_or_else(|| {
        ReelError::Config("No TMDB API key configured (set TMDB_API_KEY or enrichment.api_key)".into())
    })?;

    if !once {
        let (trigger, shutdown) = daemon::shutdown_channel();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            trigger.send_replace(true);
        });
        daemon::run_enrichment_loop(engine, ctx.config.enrichment.clone(), shutdown).await;
        return Ok(());
    }

    let pass = engine.run_full_pass(ctx.config.enrichment.batch_size).await?;
    for batch in &pass.batches {
        println!(
            "  {:<8} {:>4} selected  {:>4} found  {:>4} not found  {:>4} errors",
            batch.tier, batch.selected, batch.found, batch.not_found, batch.errors
        );
    }
    if !pass.had_work() {
        println!("Nothing to enrich");
    }
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    println!("Crawl progress:");
    for lang in &ctx.config.crawl.languages {
        let progress = ctx.store.get_progress(*lang)?;
        let movies = ctx.store.count_movies(Some(*lang))?;
        let state = match progress.state() {
            CrawlState::NotStarted => "not started",
            CrawlState::InProgress => "in progress",
            CrawlState::Completed => "completed",
        };
        let updated = progress
            .updated_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {:<10} {:<12} last page {:>4}  {:>6} movies  updated {}",
            lang.display_name(),
            state,
            progress.last_page_scraped,
            movies,
            updated
        );
    }

    println!("Enrichment:");
    for (status, count) in ctx.store.enrichment_counts()? {
        println!("  {:<18} {:>6}", status, count);
    }

    Ok(())
}

pub fn search(ctx: &AppContext, lang: Language, term: &str) -> Result<()> {
    let results = ctx.catalog().search(lang, term);

    if results.is_empty() {
        println!("No matches");
        return Ok(());
    }

    for movie in results {
        let year = movie
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "    ".to_string());
        println!("{:<12} {} {}", movie.public_id(), year, movie.title);
    }

    Ok(())
}
