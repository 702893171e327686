//! sidsynth command-line renderer
//!
//! Renders register scripts (or built-in demo scenarios) to WAV files and
//! prints script summaries.

mod args;
mod demos;

use anyhow::{Context, Result};
use args::{Cli, Command};
use clap::Parser;
use sidsynth::export::{render_to_wav, ExportConfig};
use sidsynth::{RegisterScript, RegisterTarget, ScriptPlayer};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Render {
            script,
            output,
            ticks,
            normalize,
            fade,
            stereo,
        } => {
            let script = load_script(&script)?;
            let config = ExportConfig {
                channels: if stereo { 2 } else { 1 },
                ..ExportConfig::default()
            }
            .normalize(normalize)
            .fade_out(fade);
            render(script, ticks, &output, &config)
        }
        Command::Demo {
            name,
            output,
            script,
        } => {
            let demo = name.script();
            if let Some(path) = script {
                let json = demo.to_json()?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write script {}", path.display()))?;
                info!(path = %path.display(), "saved demo script");
            }
            render(demo, None, &output, &ExportConfig::default().normalize(true))
        }
        Command::Info { script, json } => {
            let script = load_script(&script)?;
            print_info(&script, json)
        }
    }
}

fn load_script(path: &Path) -> Result<RegisterScript> {
    RegisterScript::from_json_file(path)
        .with_context(|| format!("failed to load register script {}", path.display()))
}

fn render(script: RegisterScript, ticks: Option<u64>, output: &Path, config: &ExportConfig) -> Result<()> {
    let ticks = ticks.unwrap_or(script.duration_ticks);
    info!(config = %script.engine_config().summary(), "engine");

    let mut player = ScriptPlayer::new(script).context("failed to build engine")?;
    render_to_wav(&mut player, ticks as usize, output, config)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} ticks to {}", ticks, output.display());
    Ok(())
}

fn print_info(script: &RegisterScript, json: bool) -> Result<()> {
    let config = script.engine_config();
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let seconds = script.duration_ticks as f64 / config.tick_rate as f64;
    println!("Engine:   {}", config.summary());
    println!(
        "Duration: {} ticks ({:.2}s){}",
        script.duration_ticks,
        seconds,
        if script.config.is_none() { ", default configuration" } else { "" }
    );
    println!("Events:   {}", script.events.len());

    let mut per_voice = vec![0usize; config.voices];
    let mut filter = 0usize;
    let mut ignored = 0usize;
    for event in &script.events {
        match event.target {
            RegisterTarget::Voice(voice) if voice < config.voices => per_voice[voice] += 1,
            RegisterTarget::Voice(_) => ignored += 1,
            RegisterTarget::Filter => filter += 1,
        }
    }
    for (voice, count) in per_voice.iter().enumerate() {
        println!("  voice {voice}: {count} writes");
    }
    println!("  filter:  {filter} writes");
    if ignored > 0 {
        println!("  ignored: {ignored} writes to nonexistent voices");
    }
    if let Some(last) = script.events.last() {
        println!("Last event at tick {}", last.tick);
    }
    Ok(())
}
