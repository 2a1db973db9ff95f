use std::time::Instant;

use fields_spec::{
    FieldInput, FormSpec, LiveForm, RefreshReport, build_render_payload, render_json_ui,
    render_text,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{CliResult, RenderMode};

/// Prints the form after every refresh pass.
pub struct WatchPresenter {
    mode: RenderMode,
}

impl WatchPresenter {
    pub fn new(mode: RenderMode) -> Self {
        Self { mode }
    }

    pub fn show_pass(&self, spec: &FormSpec, live: &LiveForm, report: &RefreshReport) {
        let payload = build_render_payload(spec, live.state(), report);
        match self.mode {
            RenderMode::Text => {
                println!("--- pass {} ---", live.passes());
                println!("{}", render_text(&payload));
            }
            RenderMode::Json => println!("{}", render_json_ui(&payload)),
        }
    }

    pub fn show_input_error(&self, line: &str, error: &dyn std::fmt::Display) {
        eprintln!("Ignored input {}: {}", line, error);
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Feeds one JSON `FieldInput` per line into a live form until `reader` ends,
/// refreshing once per quiet period. Returns the number of passes run.
pub async fn run<R>(spec: &FormSpec, reader: R, presenter: &WatchPresenter) -> CliResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let (mut live, initial) = LiveForm::load(spec)?;
    presenter.show_pass(spec, &live, &initial);

    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    if let Some(report) = live.flush() {
                        presenter.show_pass(spec, &live, &report);
                    }
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let applied = serde_json::from_str::<FieldInput>(line)
                    .map_err(|err| err.to_string())
                    .and_then(|input| {
                        live.apply(&input, Instant::now()).map_err(|err| err.to_string())
                    });
                if let Err(err) = applied {
                    presenter.show_input_error(line, &err);
                }
            }
            _ = wait_for(live.deadline()) => {
                if let Some(report) = live.tick(Instant::now()) {
                    presenter.show_pass(spec, &live, &report);
                }
            }
        }
    }

    log::debug!("watch finished after {} passes", live.passes());
    Ok(live.passes())
}
