//! Text formatting for progress readouts.

/// `mined / total` as a rounded percentage.
///
/// Rounds half up, but never reads `100%` until everything is mined. An
/// empty field reads `0%`.
#[must_use]
pub fn format_percent(mined: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    let scaled = u128::from(mined) * 200 + u128::from(total);
    let mut percent = scaled / (u128::from(total) * 2);
    if percent == 100 && mined != total {
        percent = 99;
    }
    format!("{percent}%")
}

/// Milliseconds as `m:ss`.
#[must_use]
pub fn format_clock(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
