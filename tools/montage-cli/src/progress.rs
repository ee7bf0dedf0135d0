//! Terminal progress bars for the pipeline callbacks.

use indicatif::{ProgressBar, ProgressStyle};
use montage_render_engine::{Progress, ProgressCallback, Stage};

/// A bar fed by pipeline [`Progress`] reports.
///
/// The bar restarts whenever the stage changes, since each stage counts a
/// different unit (files, events, per-mille of render time).
pub fn progress_bar() -> (ProgressBar, ProgressCallback) {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{prefix:>10} [{bar:40}] {pos}/{len} {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);

    let handle = bar.clone();
    let callback: ProgressCallback = Box::new(move |p: Progress| {
        let prefix = stage_label(p.stage);
        if handle.prefix() != prefix {
            handle.set_prefix(prefix);
            handle.reset();
        }
        handle.set_length(p.total);
        handle.set_position(p.completed);
    });
    (bar, callback)
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Extracting => "extracting",
        Stage::Preparing => "preparing",
        Stage::Rendering => "rendering",
        Stage::Complete => "done",
    }
}
