/// Human-readable uptime for the health endpoint.
///
/// Under a minute only seconds are shown, under an hour minutes and seconds,
/// under a day hours and minutes; past that every unit is spelled out.
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    match total_seconds {
        0..=59 => unit(seconds, "second"),
        60..=3_599 => format!("{}, {}", unit(minutes, "minute"), unit(seconds, "second")),
        3_600..=86_399 => format!("{}, {}", unit(hours, "hour"), unit(minutes, "minute")),
        _ => format!(
            "{}, {}, {}, {}",
            unit(days, "day"),
            unit(hours, "hour"),
            unit(minutes, "minute"),
            unit(seconds, "second")
        ),
    }
}

fn unit(count: u64, name: &str) -> String {
    if count == 1 {
        format!("{count} {name}")
    } else {
        format!("{count} {name}s")
    }
}
