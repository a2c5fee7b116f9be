// ============================================================================
// reelfit-cli/src/progress.rs
// ============================================================================
//
// PROGRESS DISPLAY: one indicatif bar per clip, driven by pipeline events
//
// Bars are created lazily the first time an id shows up (clips announce
// themselves as Pending, the concat step only sends Progress). When stdout is
// not a terminal the bars are hidden and only log lines remain.

use crate::terminal::styling;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use reelfit_core::PipelineEvent;
use reelfit_core::pipeline::{ClipState, PipelineStage};
use std::collections::HashMap;
use std::time::Duration;

const BAR_LENGTH: u64 = 1000;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {prefix:<16} {percent:>3}% [{bar:30}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(styling::PROGRESS_CHARS)
}

/// Live view of a running pipeline.
pub struct ProgressView {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressView {
    pub fn new() -> Self {
        let multi = if console::Term::stdout().is_term() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        Self { multi, bars: HashMap::new() }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            bars: HashMap::new(),
        }
    }

    fn bar(&mut self, id: &str) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(id.to_string()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(BAR_LENGTH));
            bar.set_style(bar_style());
            bar.set_prefix(id.to_string());
            bar.set_message("pending");
            bar
        })
    }

    /// Applies one pipeline event to the bars.
    pub fn handle(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Clip { id, state } => {
                let bar = self.bar(id);
                match state {
                    ClipState::Pending => bar.set_message("pending"),
                    ClipState::Running => {
                        bar.set_message("compressing");
                        bar.enable_steady_tick(Duration::from_millis(200));
                    }
                    ClipState::Done => bar.finish_with_message(styling::SUCCESS_SYMBOL),
                    ClipState::Failed => bar.abandon_with_message(styling::ERROR_SYMBOL),
                    ClipState::Cancelled => bar.abandon_with_message("cancelled"),
                }
            }
            PipelineEvent::Progress(update) => {
                let bar = self.bar(&update.id);
                if let Some(percent) = update.percent {
                    bar.set_position((percent.clamp(0.0, 100.0) * 10.0).round() as u64);
                }
                bar.set_message(format!("{:.1}x", update.speed));
            }
            PipelineEvent::Stage { stage } => match stage {
                PipelineStage::Done | PipelineStage::Failed | PipelineStage::Cancelled => self.finish(),
                _ => {}
            },
            PipelineEvent::ClipDropped { .. } | PipelineEvent::Allocated { .. } => {}
        }
    }

    /// Stops every bar that is still drawing.
    pub fn finish(&mut self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }

    #[cfg(test)]
    fn position(&self, id: &str) -> Option<u64> {
        self.bars.get(id).map(ProgressBar::position)
    }
}

impl Default for ProgressView {
    fn default() -> Self {
        Self::new()
    }
}
