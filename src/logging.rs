use std::env;
use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

fn level_from(raw: Option<&str>, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    raw.and_then(|value| value.trim().parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

pub fn init_logging(verbose: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let level = level_from(env::var("READING_LOG").ok().as_deref(), verbose);
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_defaults_to_info_and_honours_overrides() {
        assert_eq!(level_from(None, false), Level::INFO);
        assert_eq!(level_from(Some("warn"), false), Level::WARN);
        assert_eq!(level_from(Some("nonsense"), false), Level::INFO);
        assert_eq!(level_from(Some("error"), true), Level::DEBUG);
    }
}
