use std::process::ExitCode;

use k9s_rca::cli;
use k9s_rca::core::terminal;
use k9s_rca::interfaces::screen;

#[tokio::main]
async fn main() -> ExitCode {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
        // Unwinding builds restore through the screen's drop guard; an abort
        // never runs it, so give the shell its terminal back here.
        if cfg!(panic = "abort") {
            screen::restore_terminal();
        }
        terminal::print_error("internal error, details were written to ~/.k9s_komodor_logs.txt");
    }));

    match cli::run_main().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            terminal::print_error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
