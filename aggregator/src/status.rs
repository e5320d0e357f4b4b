//! Status poll sub-protocol: player names arrive one event at a time and are flushed as a single
//! roster line when the poll terminator arrives.

use relay_core::defuse_mentions;

/// Prefix of the roster line.
pub const ROSTER_PREFIX: &str = "Players: ";

/// Renders the collected roster, e.g. `Players: a, b`. An empty roster renders as `Players: `.
/// Mentions in nicknames are defused.
pub fn render_roster(names: &[String]) -> String {
    let names: Vec<String> = names.iter().map(|n| defuse_mentions(n)).collect();
    format!("{}{}", ROSTER_PREFIX, names.join(", "))
}
