// SPDX-License-Identifier: GPL-3.0
// main.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

// This file is the command line front end of the image builder. It turns the
// arguments into a build configuration, runs the build and prints progress dots.

use clap::Parser;
use gdbuilder_core::{
    builder::GdBuilder,
    config::{BuildConfig, HighDensityConfig, OutputRequest, SingleDensityConfig, VolumeIdentifiers},
    error::BuildError,
};
use log::{error, info};

#[derive(Parser)]
#[command(
    version,
    about = "Builds a GD-ROM style disc image from a data directory and bootstrap",
    long_about = None
)]
struct BuildGdiArgs {
    #[arg(
        long = "data",
        help = "Location of the files for the high density area",
        id = "data directory"
    )]
    data: PathBuf,

    #[arg(
        long = "ip",
        help = "The high density area bootstrap (IP.BIN)",
        id = "IP.BIN file"
    )]
    ip: PathBuf,

    #[arg(
        long = "cdda",
        num_args = 1..,
        help = "Raw audio tracks for the high density area, in disc order",
        id = "audio tracks"
    )]
    cdda: Vec<PathBuf>,

    #[arg(
        long = "output",
        num_args = 1..,
        required = true,
        help = "An output directory, one data track file, or two data track files when splitting",
        id = "output"
    )]
    output: Vec<PathBuf>,

    #[arg(
        long = "gdi",
        help = "Path of the image descriptor, existing single density lines are kept (default: disc.gdi in the output directory)",
        id = "descriptor file"
    )]
    gdi: Option<PathBuf>,

    #[arg(
        long = "raw",
        help = "Write 2352 byte raw sectors instead of 2048 byte ones"
    )]
    raw: bool,

    #[arg(
        long = "truncate",
        help = "Do not pad the first data track to fill the area"
    )]
    truncate: bool,

    #[arg(
        short = 'V',
        long = "volume-name",
        help = "The volume name (default: DREAMCAST)",
        id = "volume name"
    )]
    volume_name: Option<String>,

    #[arg(
        long = "sda-data",
        requires = "single density bootstrap",
        help = "Location of the files for the single density area",
        id = "single density data directory"
    )]
    sda_data: Option<PathBuf>,

    #[arg(
        long = "sda-ip",
        requires = "single density data directory",
        help = "The single density area bootstrap (IP0000.BIN)",
        id = "single density bootstrap"
    )]
    sda_ip: Option<PathBuf>,

    #[arg(
        long = "sda-cdda",
        help = "The single density area audio track (default: track02.raw)",
        id = "single density audio track"
    )]
    sda_cdda: Option<PathBuf>,
}

/// Turns the parsed arguments into a build configuration.
fn build_config(args: BuildGdiArgs) -> Result<BuildConfig, BuildError> {

    let output = OutputRequest::from_paths(&args.output)?;
    let high_density = HighDensityConfig::new(&args.data, &args.ip, args.cdda);
    let mut config = BuildConfig::new(output, high_density, args.truncate)?;

    config.raw_mode = args.raw;
    if let Some(gdi) = args.gdi {
        config.descriptor_path = gdi;
    }

    config.volume = VolumeIdentifiers::gd_workshop();
    if let Some(volume_name) = args.volume_name {
        config.volume.volume = volume_name;
    }

    if let (Some(data), Some(ip)) = (args.sda_data, args.sda_ip) {
        let mut single_density = SingleDensityConfig::new(&data, &ip);
        if let Some(audio_track) = args.sda_cdda {
            single_density.audio_track = Some(audio_track);
        }
        config.single_density = Some(single_density);
    }

    Ok(config)
}

fn main() -> ExitCode {

    colog::init();
    let args = BuildGdiArgs::parse();

    let config = match build_config(args) {
        Ok(config) => config,
        Err(build_error) => {
            error!("{}", build_error);
            return ExitCode::FAILURE;
        },
    };

    // One dot per ten percent. Progress restarts for each area.
    let mut previous = 0;
    let mut dots = 0;
    let mut progress = |percent: u32| {
        if percent < previous {
            dots = 0;
        }
        previous = percent;
        while dots < percent / 10 {
            dots += 1;
            print!(".");
            let _ = io::stdout().flush();
        }
    };

    print!("Writing");
    let _ = io::stdout().flush();

    match GdBuilder::new(config).execute(&mut progress) {
        Ok(report) => {
            println!(" Done!");
            info!(
                "Built {} tracks, descriptor at {}",
                report.single_density.len() + report.high_density.len(),
                report.descriptor_path.display()
            );
            ExitCode::SUCCESS
        },
        Err(build_error) => {
            println!();
            error!("{}", build_error);
            ExitCode::FAILURE
        },
    }
}
