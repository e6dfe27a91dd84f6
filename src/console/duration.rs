use std::time::Duration;

/// Formats an elapsed time the way the console header shows it.
///
/// Under a minute only seconds are shown (`12.450s`), then minutes
/// (`20m 34.450s`), then hours (`2h 20m 34.450s`). From one day on the
/// remainder switches to clock notation (`3d 2:20:34.450`).
pub fn humanize(elapsed: Duration) -> String {
    let total_millis = elapsed.as_millis();
    let millis = total_millis % 1000;
    let total_secs = total_millis / 1000;

    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3_600) % 24;
    let days = total_secs / 86_400;

    if days > 0 {
        format!("{days}d {hours}:{mins:02}:{secs:02}.{millis:03}")
    } else if hours > 0 {
        format!("{hours}h {mins}m {secs}.{millis:03}s")
    } else if mins > 0 {
        format!("{mins}m {secs}.{millis:03}s")
    } else {
        format!("{secs}.{millis:03}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn seconds_only() {
        assert_eq!(humanize(ms(12_450)), "12.450s");
        assert_eq!(humanize(ms(0)), "0.000s");
        assert_eq!(humanize(ms(7)), "0.007s");
    }

    #[test]
    fn minutes() {
        assert_eq!(humanize(ms((20 * 60 + 34) * 1000 + 450)), "20m 34.450s");
    }

    #[test]
    fn hours() {
        assert_eq!(
            humanize(ms(((2 * 60 + 20) * 60 + 34) * 1000 + 450)),
            "2h 20m 34.450s"
        );
        assert_eq!(humanize(ms(8_675_309)), "2h 24m 35.309s");
    }

    #[test]
    fn days_use_clock_notation() {
        let millis = (((3 * 24 + 2) * 60 + 20) * 60 + 34) * 1000 + 450;
        assert_eq!(humanize(ms(millis)), "3d 2:20:34.450");

        let padded = ((24 * 60 + 5) * 60 + 7) * 1000;
        assert_eq!(humanize(ms(padded)), "1d 0:05:07.000");
    }
}
