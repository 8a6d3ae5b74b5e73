use anyhow::Result;
use clap::Parser;
use togglway::{
    config::read_settings,
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path, logging::enable_logging,
        runtime::single_thread_runtime,
    },
};

fn main() -> Result<()> {
    let args = DaemonArgs::parse();

    let state_dir = create_application_default_path()?;
    enable_logging(&state_dir, args.log, args.log_console)?;

    let settings = read_settings(args.config.as_deref())?;

    single_thread_runtime()?.block_on(start_daemon(settings))?;
    Ok(())
}
