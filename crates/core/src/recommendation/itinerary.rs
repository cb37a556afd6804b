//! Markdown itinerary export

use std::fmt::Write as _;

use eventkit_domain::{InterestSet, RecommendationResult};

/// Render the selected sessions as a Markdown itinerary.
pub fn render_itinerary(interests: &InterestSet, result: &RecommendationResult) -> String {
    let mut out = String::from("# Event Itinerary\n\n");
    let joined: Vec<&str> = interests.iter().collect();
    let _ = writeln!(out, "- Interests: {}", list_or_none(&joined));
    let _ = writeln!(out, "- Source: {}", result.source);
    let _ = writeln!(out, "- Sessions: {}", result.sessions.len());
    let _ = writeln!(out, "- Conflicts: {}", result.conflicts);

    if result.sessions.is_empty() {
        out.push_str("\n_No sessions matched._\n");
        return out;
    }

    for (idx, session) in result.sessions.iter().enumerate() {
        let _ = write!(out, "\n## {}. {}\n\n", idx + 1, session.title);
        let _ = writeln!(out, "- Time: {} - {}", session.start, session.end);
        let location =
            session.location.as_deref().filter(|l| !l.trim().is_empty()).unwrap_or("TBD");
        let _ = writeln!(out, "- Location: {location}");
        let tags: Vec<&str> = session.tags.iter().map(String::as_str).collect();
        let _ = writeln!(out, "- Tags: {}", list_or_none(&tags));
        if let Some(scored) = result.scoring.get(idx) {
            let _ = writeln!(out, "- Score: {:.2}", scored.score);
        }
    }
    out
}

fn list_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "none".into()
    } else {
        items.join(", ")
    }
}
