//! Match Netflix episode titles against a TMDB season listing

use super::TmdbSeason;
use crate::netflix::Season;

/// Assign TMDB ids to the episodes of `season`.
///
/// Titles are compared case-insensitively first; an episode that already
/// carries a number falls back to the listing entry with that number.
/// Returns the names of episodes that matched nothing.
pub fn match_season_episodes(season: &mut Season, listing: &TmdbSeason) -> Vec<String> {
    let mut unmatched = Vec::new();

    for episode in &mut season.episodes {
        let wanted = episode.name.to_lowercase();
        let found = listing
            .episodes
            .iter()
            .find(|candidate| candidate.name.to_lowercase() == wanted)
            .or_else(|| {
                episode
                    .number
                    .and_then(|n| listing.episodes.iter().find(|c| c.episode_number == Some(n)))
            });

        match found {
            Some(tmdb) => {
                episode.tmdb_id = Some(tmdb.id);
                if tmdb.episode_number.is_some() {
                    episode.number = tmdb.episode_number;
                }
            }
            None => unmatched.push(episode.name.clone()),
        }
    }

    unmatched
}
