
use log::{LevelFilter, error, info};
use std::time::Instant;

use vcfdelta::cli::compare::{CompareSettings, check_compare_settings};
use vcfdelta::cli::core::{Commands, get_cli};
use vcfdelta::parsing::vcf_reader::MalformedRecordError;
use vcfdelta::reconciler::reconcile_files;
use vcfdelta::writers::report::ReportGenerator;

/// Malformed input gets its own exit code, everything else while reading is an I/O failure
fn read_error_code(e: &anyhow::Error) -> exitcode::ExitCode {
    if e.chain().any(|cause| cause.downcast_ref::<MalformedRecordError>().is_some()) {
        exitcode::DATAERR
    } else {
        exitcode::IOERR
    }
}

fn run_compare(settings: CompareSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_compare_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // all configs are validated before anything is read
    let reconcile_config = match settings.reconcile_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building reconcile config: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let report_config = match settings.report_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building report config: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let generator = match ReportGenerator::new(report_config).with_settings(&settings) {
        Ok(g) => g,
        Err(e) => {
            error!("Error while serializing settings: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    let reconciliation = match reconcile_files(&settings.first_vcf_filename, &settings.second_vcf_filename, &reconcile_config) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while reconciling variants: {e:#}");
            std::process::exit(read_error_code(&e));
        }
    };

    info!("Rendering report...");
    let report = match generator.render(reconciliation.result(), reconciliation.entries(), reconciliation.annotations()) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while writing report: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    for line in report.console_lines().iter() {
        info!("{line}");
    }
    for filename in report.written_files().iter() {
        info!("Saved {filename:?}");
    }

    info!("Compare completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Compare(settings) => {
            run_compare(*settings);
        }
    }

    info!("Process finished successfully.");
}
