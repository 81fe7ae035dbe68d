use std::{
    fmt::{self, Display},
    sync::atomic::{AtomicBool, Ordering},
};

use nu_ansi_term::Color;

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);

/// Turns off ANSI styling for the rest of the process.
pub fn disable_color() {
    COLOR_ENABLED.store(false, Ordering::Relaxed);
}

/// Wraps a value so it prints in `Color` unless color is disabled.
pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if COLOR_ENABLED.load(Ordering::Relaxed) {
            write!(f, "{}", self.0.paint(self.1.to_string()))
        } else {
            self.1.fmt(f)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_color_prints_plain_text() {
        disable_color();
        assert_eq!(Colored(Color::Red, "plain").to_string(), "plain");
    }
}
