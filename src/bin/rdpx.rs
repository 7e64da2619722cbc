// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RDPX command list player
//!
//! Replays a text file of RDP commands against a fresh context and dumps
//! the color image. Each line of the list holds the hex words of one
//! command; `#` starts a comment.
//!
//! ```text
//! # 320x240 scissor, fill mode, red 16-bit fill
//! 2d000000 005003c0
//! 2f300000 00000000
//! 3f10013f 00100000
//! 37000000 f801f801
//! 364fc3bc 00000000
//! ```

use clap::{Parser, ValueEnum};
use rdpx::core::config::RdpConfig;
use rdpx::core::rdp::commands::{command_length, opcode};
use rdpx::core::rdp::Rdp;
use rdpx::RdpError;
use serde::Serialize;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "rdpx")]
#[command(about = "Replay an RDP command list and dump the color image", long_about = None)]
#[command(version)]
struct Cli {
    /// Command list file
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dump width in pixels (defaults to the color image width)
    #[arg(short, long)]
    width: Option<u32>,

    /// Dump height in pixels
    #[arg(long, default_value = "240")]
    height: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value = "raw")]
    format: DumpFormat,

    /// Output file
    #[arg(short, long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    /// Color image bytes as stored in RDRAM
    Raw,
    /// Summary with one value per pixel
    Json,
}

/// JSON dump of the color image
#[derive(Debug, Serialize)]
struct DumpSummary {
    commands: usize,
    crashed: bool,
    address: u32,
    format: u32,
    size: u32,
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

/// Parse a command list into one flat word stream
fn parse_command_list(text: &str) -> Result<Vec<u32>, String> {
    let mut words = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("");
        for token in line.split_whitespace() {
            let digits = token.trim_start_matches("0x").trim_start_matches("0X");
            let word = u32::from_str_radix(digits, 16)
                .map_err(|e| format!("line {}: bad word {:?}: {}", number + 1, token, e))?;
            words.push(word);
        }
    }
    Ok(words)
}

/// Bytes per pixel of an RDP pixel size code (4-bit rounds up)
fn bytes_per_pixel(size: u32) -> u32 {
    match size {
        0 | 1 => 1,
        2 => 2,
        _ => 4,
    }
}

fn dump_raw(rdp: &Rdp, width: u32, height: u32) -> Vec<u8> {
    let image = rdp.color_image();
    let len = width * height * bytes_per_pixel(image.size);
    (0..len)
        .map(|i| rdp.rdram().read_u8(image.address.wrapping_add(i)))
        .collect()
}

fn dump_pixels(rdp: &Rdp, width: u32, height: u32) -> Vec<u32> {
    let image = rdp.color_image();
    (0..width * height)
        .map(|i| match image.size {
            0 | 1 => rdp.rdram().read_u8(image.address.wrapping_add(i)) as u32,
            2 => rdp.rdram().read_u16((image.address >> 1).wrapping_add(i)) as u32,
            _ => rdp.rdram().read_u32((image.address >> 2).wrapping_add(i)),
        })
        .collect()
}

/// Run every command of the list, stopping early at a truncated tail
///
/// # Returns
///
/// The number of commands executed, including any that crashed the pipeline
fn replay(rdp: &mut Rdp, mut words: &[u32]) -> Result<usize, RdpError> {
    let mut count = 0;
    while let Some(&w0) = words.first() {
        let len = command_length(w0).ok_or(RdpError::InvalidOpcode(opcode(w0)))?;
        match rdp.execute(words) {
            Ok(()) | Err(RdpError::PipelineCrashed(_)) => {}
            Err(RdpError::InvalidCommandLength { opcode, .. }) => {
                log::warn!("Command list ends inside command 0x{:02x}", opcode);
                break;
            }
            Err(e) => return Err(e),
        }
        words = &words[len..];
        count += 1;
    }
    Ok(count)
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RdpConfig::load(path)?,
        None => RdpConfig::default(),
    };
    config.apply_env()?;

    let text = std::fs::read_to_string(&cli.input)?;
    let words = parse_command_list(&text)?;
    log::info!("Loaded {} words from {}", words.len(), cli.input.display());

    let mut rdp = Rdp::new(&config);
    let commands = replay(&mut rdp, &words)?;
    if rdp.pipeline_crashed() {
        log::warn!("Pipeline crashed during replay");
    }

    let image = *rdp.color_image();
    let width = cli.width.unwrap_or(image.width.max(1) as u32);
    let height = cli.height;
    log::info!(
        "Dumping {}x{} pixels from 0x{:06x} ({} commands)",
        width,
        height,
        image.address,
        commands
    );

    match cli.format {
        DumpFormat::Raw => std::fs::write(&cli.out, dump_raw(&rdp, width, height))?,
        DumpFormat::Json => {
            let summary = DumpSummary {
                commands,
                crashed: rdp.pipeline_crashed(),
                address: image.address,
                format: image.format,
                size: image.size,
                width,
                height,
                pixels: dump_pixels(&rdp, width, height),
            };
            std::fs::write(&cli.out, serde_json::to_string_pretty(&summary)?)?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
