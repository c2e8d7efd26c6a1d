// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::Ordering;

use crate::error::NormalizationFailure;
use crate::feed::Episode;

/// Keep the successful episodes, newest first
///
/// Episodes without a known date go after all dated ones. The sort is
/// stable, so ties keep their input order.
pub fn aggregate(
    results: impl IntoIterator<Item = Result<Episode, NormalizationFailure>>,
) -> Vec<Episode> {
    let mut episodes: Vec<Episode> = results.into_iter().filter_map(Result::ok).collect();
    episodes.sort_by(newest_first);
    episodes
}

fn newest_first(a: &Episode, b: &Episode) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Enclosure;
    use chrono::DateTime;

    fn episode(label: &str, date: Option<&str>) -> Episode {
        Episode {
            source_label: label.to_string(),
            title: label.to_string(),
            link: String::new(),
            description: String::new(),
            published_at: date.map(|d| DateTime::parse_from_rfc3339(d).unwrap()),
            enclosure: Enclosure {
                url: format!("http://x/{label}.mp3"),
                mime_type: "audio/mpeg".to_string(),
                length: None,
            },
            duration_ms: None,
        }
    }

    fn labels(episodes: &[Episode]) -> Vec<&str> {
        episodes.iter().map(|e| e.source_label.as_str()).collect()
    }

    #[test]
    fn newest_first_with_unknown_last() {
        let results = vec![
            Ok(episode("jan", Some("2024-01-01T00:00:00Z"))),
            Ok(episode("mar", Some("2024-03-01T00:00:00Z"))),
            Ok(episode("unknown", None)),
        ];

        assert_eq!(labels(&aggregate(results)), vec!["mar", "jan", "unknown"]);
    }

    #[test]
    fn unknown_dates_never_lead() {
        let results = vec![
            Ok(episode("unknown", None)),
            Ok(episode("old", Some("1970-01-01T00:00:00Z"))),
        ];

        assert_eq!(labels(&aggregate(results)), vec!["old", "unknown"]);
    }

    #[test]
    fn failures_are_dropped() {
        let results = vec![
            Err(NormalizationFailure::NoAudioFound {
                label: "DE".to_string(),
            }),
            Ok(episode("UK", Some("2024-01-15T00:00:00Z"))),
            Err(NormalizationFailure::UnrecognizedFormat {
                label: "SE".to_string(),
            }),
        ];

        assert_eq!(labels(&aggregate(results)), vec!["UK"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let results = vec![
            Ok(episode("first", Some("2024-02-01T10:00:00Z"))),
            Ok(episode("undated-a", None)),
            Ok(episode("second", Some("2024-02-01T10:00:00Z"))),
            Ok(episode("undated-b", None)),
        ];

        assert_eq!(
            labels(&aggregate(results)),
            vec!["first", "second", "undated-a", "undated-b"]
        );
    }

    #[test]
    fn same_instant_in_different_offsets_is_a_tie() {
        let results = vec![
            Ok(episode("utc", Some("2024-02-01T10:00:00Z"))),
            Ok(episode("cet", Some("2024-02-01T11:00:00+01:00"))),
        ];

        assert_eq!(labels(&aggregate(results)), vec!["utc", "cet"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
