use crate::sync::recordings::LocalRecording;
use crate::sync::twitch::ArchiveEntry;

/// Maximum allowed distance between a VOD's recorded start and a local file's
/// capture start for them to be considered the same broadcast. Exclusive:
/// a difference of exactly this many seconds does not match.
pub const MATCH_TOLERANCE_SECS: i64 = 3600;

/// Return the first candidate in listing order whose capture start falls
/// strictly inside the tolerance window around the entry's creation time.
///
/// First-match-wins is deliberate: candidates are not ranked by closeness.
pub fn find_match<'a>(
    entry: &ArchiveEntry,
    candidates: &'a [LocalRecording],
) -> Option<&'a LocalRecording> {
    candidates.iter().find(|rec| {
        (entry.created_at - rec.captured_at).num_seconds().abs() < MATCH_TOLERANCE_SECS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::path::PathBuf;

    fn entry_at(rfc3339: &str) -> ArchiveEntry {
        ArchiveEntry {
            id: "v1".to_string(),
            title: "stream".to_string(),
            created_at: DateTime::parse_from_rfc3339(rfc3339)
                .expect("valid timestamp")
                .with_timezone(&Utc),
            category: "Unknown".to_string(),
        }
    }

    fn recording_at(name: &str, captured_at: DateTime<Utc>) -> LocalRecording {
        LocalRecording {
            path: PathBuf::from(name),
            captured_at,
        }
    }

    #[test]
    fn exact_timestamp_matches() {
        let entry = entry_at("2024-01-01T10:00:00Z");
        let candidates = vec![recording_at("a.mp4", entry.created_at)];
        let got = find_match(&entry, &candidates).expect("match");
        assert_eq!(got.path, PathBuf::from("a.mp4"));
    }

    #[test]
    fn tolerance_boundary_is_exclusive() {
        let entry = entry_at("2024-01-01T10:00:00Z");
        let just_inside = recording_at(
            "inside.mp4",
            entry.created_at + Duration::seconds(MATCH_TOLERANCE_SECS - 1),
        );
        let on_boundary = recording_at(
            "boundary.mp4",
            entry.created_at + Duration::seconds(MATCH_TOLERANCE_SECS),
        );

        let boundary_only = [on_boundary];
        assert!(find_match(&entry, &boundary_only).is_none());
        let inside_only = [just_inside];
        let got = find_match(&entry, &inside_only).expect("match");
        assert_eq!(got.path, PathBuf::from("inside.mp4"));
    }

    #[test]
    fn twelve_minutes_outside_tolerance_does_not_match() {
        let entry = entry_at("2024-01-01T10:00:00Z");
        let candidates = vec![recording_at(
            "late.mp4",
            entry.created_at + Duration::seconds(MATCH_TOLERANCE_SECS + 12 * 60),
        )];
        assert!(find_match(&entry, &candidates).is_none());
    }

    #[test]
    fn first_qualifying_candidate_wins_over_closer_one() {
        let entry = entry_at("2024-01-01T10:00:00Z");
        let farther_first = recording_at("first.mp4", entry.created_at + Duration::minutes(40));
        let closer_second = recording_at("second.mp4", entry.created_at + Duration::minutes(5));

        let candidates = [farther_first, closer_second];
        let got = find_match(&entry, &candidates).expect("match");
        assert_eq!(got.path, PathBuf::from("first.mp4"));
    }

    #[test]
    fn no_candidates_yields_no_match() {
        let entry = entry_at("2024-01-01T10:00:00Z");
        assert!(find_match(&entry, &[]).is_none());
    }
}
