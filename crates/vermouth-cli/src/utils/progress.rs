use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;
use vermouth::engine::progress::{Progress, ProgressCallback};

const SPINNER_TICK_MS: u64 = 80;

/// Renders workflow progress on stderr: a spinner per phase and a bar
/// counting residues while fragments are matched.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    phase: Arc<Mutex<String>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that tracks state without drawing, for `--quiet` runs.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0).with_style(spinner_style());
        pb.set_draw_target(target);
        pb.finish_and_clear();
        Self {
            pb: Arc::new(Mutex::new(pb)),
            phase: Arc::new(Mutex::new(String::new())),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        let phase = self.phase.clone();

        Box::new(move |progress: Progress| {
            let (Ok(pb), Ok(mut phase)) = (pb.lock(), phase.lock()) else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    *phase = name.to_string();
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(spinner_style());
                    pb.set_message(name);
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::PhaseFinish => {
                    pb.disable_steady_tick();
                    pb.finish_with_message(format!("✓ {}", phase.as_str()));
                }
                Progress::TaskStart { total_steps } => {
                    pb.disable_steady_tick();
                    pb.set_style(bar_style());
                    pb.set_length(total_steps);
                    pb.set_position(0);
                }
                Progress::TaskIncrement => pb.inc(1),
                Progress::TaskFinish => {
                    if let Some(length) = pb.length() {
                        pb.set_position(length);
                    }
                }
                Progress::Message(msg) => {
                    if pb.is_finished() {
                        pb.set_message(msg);
                    } else {
                        pb.println(format!("  {msg}"));
                    }
                }
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<16} [{bar:40.cyan/blue}] {pos}/{len} residues")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
