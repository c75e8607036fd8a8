use clap::{Arg, ArgAction, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use libxtc_navigator::config::Config;
use libxtc_navigator::error::ConfigError;
use libxtc_navigator::process::process;
use libxtc_navigator::worker_status::WorkerStatus;

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("xtc_navigator_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .help("Data source string, overrides the one in the config"),
        )
        .arg(
            Arg::new("indexed")
                .short('i')
                .long("indexed")
                .action(ArgAction::SetTrue)
                .help("Load runs fully indexed"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        log::error!("A configuration path is required (-p/--path)");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("{e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let mut config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Some(source) = matches.get_one::<String>("source") {
        config.data_source = source.clone();
    }
    if matches.get_flag("indexed") {
        config.force_indexed = true;
    }
    log::info!("Config successfully loaded.");
    log::info!("Data Source: {}", config.data_source);
    log::info!("Archive Path: {}", config.archive_path.to_string_lossy());
    log::info!("Force Indexed: {}", config.force_indexed);
    match config.max_events {
        Some(max) => log::info!("Max Events: {max}"),
        None => log::info!("Max Events: all"),
    }
    if !config.does_archive_exist() {
        log::error!(
            "Run archive {} does not exist!",
            config.archive_path.to_string_lossy()
        );
        return;
    }

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos:>3}% {prefix}") {
        pb.set_style(style);
    }
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(|| process(config, tx));

    loop {
        // No UI here, so check in on the walker about once a second
        std::thread::sleep(std::time::Duration::from_secs(1));
        if let Some(status) = rx.try_iter().last() {
            pb.set_message(status.color.task());
            pb.set_prefix(format!("{} events", status.events));
            pb.set_position((status.progress * 100.0) as u64);
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(summaries) => {
                        for summary in summaries.iter() {
                            let run = summary
                                .run_number
                                .map_or(String::from("live"), |n| n.to_string());
                            log::info!(
                                "Run {run}: {} events, {} rejected by L3T, event codes {:?}",
                                summary.events,
                                summary.l3t_rejected,
                                summary.event_codes
                            );
                            for (alias, count) in summary.detectors.iter() {
                                log::info!("  {alias}: {count} events");
                            }
                        }
                        log::info!("Successfully walked data!")
                    }
                    Err(e) => log::error!("Walking failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join walking task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
