//! Title classification
//!
//! Netflix writes every row as a single title string. Episodes look like
//! `Show: Season 1: Episode`, but `Show: Title` is shared by first seasons and
//! by plenty of movies, so that form is scored and may stay ambiguous.
//!
//! ORDER MATTERS: the season patterns are tried from most to least specific.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// `Show: Season 1: Episode`
static NUMBERED_SEASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+): .+ (\d{1,2}): (.*)").expect("valid regex"));

/// `Show: Staffel 2 – Teil B: Episode`
static NUMBERED_SEASON_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+): .+ (\d{1,2}) – .+: (.*)").expect("valid regex"));

/// `Show: Miniseries: Episode`
static SINGLE_WORD_SEASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+): \w+: (.+)").expect("valid regex"));

/// `Show: Season Name: Episode`
static NAMED_SEASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+): (.+): (.+)").expect("valid regex"));

/// `Show: Title`
static SHOW_AND_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.+): (.+)").expect("valid regex"));

static EPISODE_HINTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Episode \d+",
        r"(?i)Part \d+",
        r"(?i)Chapter \d+",
        r"(?i)Act \d+",
        r"(?i)Season Finale",
        r"(?i)Pilot",
        r"(?i)Finale",
        r"(?i)Premiere",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static MOVIE_HINTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Legend of",
        r"(?i)Rise of",
        r"(?i)Return of",
        r"(?i)Age of",
        r"(?i)The .+ Movie",
        r"(?i)Director.*Cut",
        r"(?i)Extended Edition",
        r"(?i)Special Edition",
        r"(?i)Uncut",
        r"(?i)Remastered",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonRef {
    Number(u32),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleKind {
    Episode { show: String, season: SeasonRef, episode: String },
    /// `Show: Title`; needs [`likely_episode`] and possibly later context.
    ShowAndTitle { show: String, title: String },
    Movie,
}

/// Split a raw title into show/season/episode parts where the shape allows it.
pub fn classify_title(title: &str) -> TitleKind {
    for pattern in [&*NUMBERED_SEASON, &*NUMBERED_SEASON_PART] {
        if let Some(caps) = pattern.captures(title) {
            if let Ok(number) = caps[2].parse::<u32>() {
                return TitleKind::Episode {
                    show: caps[1].to_string(),
                    season: SeasonRef::Number(number),
                    episode: caps[3].to_string(),
                };
            }
        }
    }

    if let Some(caps) = SINGLE_WORD_SEASON.captures(title) {
        return TitleKind::Episode {
            show: caps[1].to_string(),
            season: SeasonRef::Number(1),
            episode: caps[2].to_string(),
        };
    }

    if let Some(caps) = NAMED_SEASON.captures(title) {
        return TitleKind::Episode {
            show: caps[1].to_string(),
            season: SeasonRef::Named(caps[2].to_string()),
            episode: caps[3].to_string(),
        };
    }

    if let Some(caps) = SHOW_AND_TITLE.captures(title) {
        return TitleKind::ShowAndTitle { show: caps[1].to_string(), title: caps[2].to_string() };
    }

    TitleKind::Movie
}

/// Score a `Show: Title` pair: `Some(true)` episode, `Some(false)` movie, `None` undecided.
pub fn likely_episode(known_shows: &HashSet<String>, show: &str, title: &str) -> Option<bool> {
    if known_shows.contains(show) {
        tracing::debug!("Episode classification: known show detected: {show}");
        return Some(true);
    }

    if EPISODE_HINTS.iter().any(|p| p.is_match(title)) {
        tracing::debug!("Episode classification: episode pattern found in '{title}'");
        return Some(true);
    }

    let full_title = format!("{show}: {title}");
    if MOVIE_HINTS.iter().any(|p| p.is_match(&full_title)) {
        tracing::debug!("Episode classification: movie pattern found in '{full_title}'");
        return Some(false);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(show: &str, season: SeasonRef, ep: &str) -> TitleKind {
        TitleKind::Episode { show: show.into(), season, episode: ep.into() }
    }

    #[test]
    fn numbered_season() {
        assert_eq!(
            classify_title("Stranger Things: Season 3: Chapter Eight"),
            episode("Stranger Things", SeasonRef::Number(3), "Chapter Eight")
        );
    }

    #[test]
    fn numbered_season_with_part() {
        assert_eq!(
            classify_title("Die außergewöhnlichsten Häuser der Welt: Staffel 2 – Teil B: Spanien"),
            episode("Die außergewöhnlichsten Häuser der Welt", SeasonRef::Number(2), "Spanien")
        );
    }

    #[test]
    fn single_word_season_is_season_one() {
        assert_eq!(
            classify_title("Unbelievable: Miniseries: Episode 1"),
            episode("Unbelievable", SeasonRef::Number(1), "Episode 1")
        );
    }

    #[test]
    fn named_season() {
        assert_eq!(
            classify_title("American Horror Story: Murder House: Home Invasion"),
            episode("American Horror Story", SeasonRef::Named("Murder House".into()), "Home Invasion")
        );
        assert_eq!(
            classify_title("Maid: Limited Series: Dollar Store"),
            episode("Maid", SeasonRef::Named("Limited Series".into()), "Dollar Store")
        );
    }

    #[test]
    fn show_and_title_and_plain_movie() {
        assert_eq!(
            classify_title("Wednesday: Woe Is the Loneliest Number"),
            TitleKind::ShowAndTitle { show: "Wednesday".into(), title: "Woe Is the Loneliest Number".into() }
        );
        assert_eq!(classify_title("The Irishman"), TitleKind::Movie);
    }

    #[test]
    fn scoring_show_and_title() {
        let mut known = HashSet::new();
        assert_eq!(likely_episode(&known, "Dark", "Pilot"), Some(true));
        assert_eq!(likely_episode(&known, "King Arthur", "Legend of the Sword"), Some(false));
        assert_eq!(likely_episode(&known, "Wednesday", "Woe Is the Loneliest Number"), None);
        known.insert("Wednesday".to_string());
        assert_eq!(likely_episode(&known, "Wednesday", "Woe Is the Loneliest Number"), Some(true));
    }
}
