use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Returns a progress bar drawn on stderr.
pub fn bar(prefix: String, length: u64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(length), ProgressDrawTarget::stderr_with_hz(4));
    pb.set_prefix(prefix);
    if let Ok(style) = ProgressStyle::with_template("{prefix}...\n[{wide_bar:.cyan/blue}] {pos}/{len} {eta}") {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
