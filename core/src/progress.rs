use indicatif::{ProgressBar, ProgressStyle};

pub fn default_style() -> ProgressStyle {
    match ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {prefix:>9} {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        Ok(style) => style.progress_chars("##-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}

/// A bar with [`default_style`], sized per pass by the sorter.
pub fn new_bar() -> ProgressBar {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(default_style());
    progress_bar
}
