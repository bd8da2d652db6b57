use std::path::Path;

use autotest_watch::{RunReport, WatchConfig, WatchLoop};

pub struct WatchParams<'a> {
    pub repo_root: &'a Path,
    pub extension: &'a str,
    pub command: Vec<String>,
    pub notify: bool,
    pub json: bool,
}

/// Run the tests now and again on every matching change until Ctrl-C.
pub fn execute(params: WatchParams<'_>) -> anyhow::Result<()> {
    let config = WatchConfig::for_root(params.repo_root)
        .with_extension(params.extension)
        .with_command(params.command)
        .with_notifications(params.notify);
    tracing::debug!(?config, "starting autotest");

    let watch = WatchLoop::new(config);
    ctrlc_interrupt(&watch)?;

    let json = params.json;
    watch.run(|report| {
        if json {
            print_json(report);
        }
    })?;
    Ok(())
}

fn ctrlc_interrupt(watch: &WatchLoop) -> anyhow::Result<()> {
    let handle = watch.interrupt_handle();
    ctrlc::set_handler(move || handle.interrupt())?;
    Ok(())
}

fn print_json(report: &RunReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!("failed to encode run report: {e}"),
    }
}
