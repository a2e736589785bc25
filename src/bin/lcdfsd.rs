//! Entry point: parse arguments, initialize logging, hand off to the
//! daemon body, and map its result to a process exit code (§4.7, §7).

use lcdfs::cli::Cli;
use lcdfs::error::DaemonError;

fn main() {
    let cli = match Cli::parse_validated() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("lcdfsd: {err}");
            std::process::exit(1);
        }
    };

    let _logging_guard = match lcdfs::logging::init(cli.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("lcdfsd: failed to initialize logging: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = lcdfs::daemon::run(cli) {
        eprintln!("lcdfsd: fatal error: {err}");
        std::process::exit(exit_code_for(&err));
    }
}

fn exit_code_for(err: &DaemonError) -> i32 {
    match err {
        DaemonError::Config(_) => 1,
        DaemonError::Mount(_) => 2,
        DaemonError::Device(_) => 3,
    }
}
