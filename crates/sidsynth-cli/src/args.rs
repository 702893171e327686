//! Command-line arguments for `sid-render`

use crate::demos::Demo;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Render sidsynth register scripts to WAV
#[derive(Debug, Parser)]
#[command(name = "sid-render", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a register script to a WAV file
    Render {
        /// Register script (JSON)
        script: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Ticks to render (default: the script's duration)
        #[arg(long)]
        ticks: Option<u64>,

        /// Scale the output so its peak sits just below full scale
        #[arg(long)]
        normalize: bool,

        /// Linear fade-out length in seconds
        #[arg(long, value_name = "SECS", default_value_t = 0.0)]
        fade: f32,

        /// Write a stereo file (the mono signal on both channels)
        #[arg(long)]
        stereo: bool,
    },

    /// Render one of the built-in demo scenarios
    Demo {
        /// Scenario to render
        #[arg(value_enum)]
        name: Demo,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Also save the scenario as a register script
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,
    },

    /// Print a script's configuration and event summary
    Info {
        /// Register script (JSON)
        script: PathBuf,

        /// Print the effective engine configuration as JSON
        #[arg(long)]
        json: bool,
    },
}
