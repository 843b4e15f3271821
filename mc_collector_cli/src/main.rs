use clap::{value_parser, Arg, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use simplelog::{CombinedLogger, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use libmc_collector::config::Config;
use libmc_collector::dataset::Dataset;
use libmc_collector::let_calc::{dose_averaged_let, LetParams};
use libmc_collector::process::process;
use libmc_collector::record::Category;

const LOG_FILE: &str = "mc_collector.log";

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

fn init_logging(pb_manager: &MultiProgress) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];
    // The log file is a convenience; the terminal still gets everything without it
    let file_error = match File::create(LOG_FILE) {
        Ok(file) => {
            loggers.push(WriteLogger::new(
                LevelFilter::Info,
                simplelog::Config::default(),
                file,
            ));
            None
        }
        Err(e) => Some(e),
    };

    match LogWrapper::new(pb_manager.clone(), CombinedLogger::new(loggers)).try_init() {
        Ok(()) => log::set_max_level(LevelFilter::Info),
        Err(e) => eprintln!("Could not create logging/progress: {e}"),
    }
    if let Some(e) = file_error {
        log::warn!("Could not create log file {LOG_FILE}: {e}");
    }
}

fn run_let(matches: &ArgMatches) {
    let (Some(bin_path), Some(track_path), Some(pe)) = (
        matches.get_one::<PathBuf>("bin"),
        matches.get_one::<PathBuf>("track"),
        matches.get_one::<f64>("pe"),
    ) else {
        log::error!("let requires --bin, --track and --pe");
        return;
    };
    let mut params = LetParams::new(*pe);
    if let Some(tol) = matches.get_one::<f64>("pe-tol") {
        params.tolerance = *tol;
    }
    if let Some(volume) = matches.get_one::<f64>("volume") {
        params.volume = *volume;
    }

    let datasets = Dataset::read_parquet(bin_path, Category::Dose).and_then(|dose| {
        Dataset::read_parquet(track_path, Category::TrackLength).map(|track| (dose, track))
    });
    let (dose, track) = match datasets {
        Ok(d) => d,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    match dose_averaged_let(&dose, &track, &params) {
        Ok(results) => log::info!("Computed LET for {} secondaries.", results.len()),
        Err(e) => log::error!("LET calculation failed with error: {e}"),
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("mc_collector_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("let")
                .about("Compute the dose-averaged LET from usrbin and usrtrk datasets")
                .arg(
                    Arg::new("bin")
                        .long("bin")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the usrbin parquet"),
                )
                .arg(
                    Arg::new("track")
                        .long("track")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the usrtrk parquet"),
                )
                .arg(
                    Arg::new("pe")
                        .long("pe")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Primary energy to select (MeV)"),
                )
                .arg(
                    Arg::new("pe-tol")
                        .long("pe-tol")
                        .default_value("0.0")
                        .value_parser(value_parser!(f64))
                        .help("Absolute tolerance on the primary energy (0 = exact)"),
                )
                .arg(
                    Arg::new("volume")
                        .long("volume")
                        .default_value("2.5e-5")
                        .value_parser(value_parser!(f64))
                        .help("Detector volume (cm^3)"),
                ),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .value_parser(value_parser!(PathBuf))
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let pb_manager = MultiProgress::new();
    init_logging(&pb_manager);

    if let Some(("let", sub_matches)) = matches.subcommand() {
        run_let(sub_matches);
        return;
    }

    // Parse the cli
    let Some(config_path) = matches.get_one::<PathBuf>("path") else {
        log::error!("A configuration path is required (-p/--path)");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Data Path: {}", config.data_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!("Run Name: {}", config.run_name);
    log::info!(
        "Collect FLUKA: {} Collect SHIELD-HIT12A: {}",
        config.collect_fluka,
        config.collect_shieldhit
    );
    log::info!(
        "Edge Species: FLUKA {:?} SHIELD-HIT12A {:?}",
        config.fluka_edge_species,
        config.shieldhit_edge_species
    );

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos}/{len}") {
        pb.set_style(style);
    }
    let (tx, rx) = channel();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    loop {
        std::thread::sleep(std::time::Duration::from_millis(200));
        for status in rx.try_iter() {
            pb.set_message(status.stage.to_string());
            pb.set_length(status.total as u64);
            pb.set_position(status.done as u64);
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(summary) => log::info!(
                        "Successfully collected {} rows ({} issues)!",
                        summary.total_rows(),
                        summary.ledger.len()
                    ),
                    Err(e) => log::error!("Collection failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join processing task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
