//! Per-entry accumulator and the finalized record it produces

use crate::crawler::{Field, Fields};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One track of a release, in page order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub number: String,
    pub name: String,
    pub track_duration: String,
}

/// A completed catalog entry as written to the record file
///
/// Multi-valued fields are sets: duplicates collapse and their order
/// carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub genre: Option<String>,
    pub artist_name: Option<String>,
    pub artist_members: BTreeSet<String>,
    pub artist_websites: BTreeSet<String>,
    pub album_release_year: Option<String>,
    pub album_title: Option<String>,
    pub album_record_label: BTreeSet<String>,
    pub album_styles: BTreeSet<String>,
    pub album_tracks: Vec<Track>,
}

/// Fields gathered from an entry-detail page, waiting for the
/// cross-reference page before becoming a [`Record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    /// Sequence id assigned when the detail fetch started
    pub id: u64,

    /// Queue reference this draft was built from
    pub reference: String,

    pub genre: Option<String>,
    pub artist_name: Option<String>,

    /// Relative link to the artist's profile (the cross-reference page)
    pub artist_link: Option<String>,

    pub release_year: Option<String>,
    pub title: Option<String>,
    pub record_labels: Vec<String>,
    pub track_numbers: Vec<String>,
    pub track_names: Vec<String>,
    pub track_durations: Vec<String>,
    pub styles: Vec<String>,
}

impl EntryDraft {
    /// Builds a draft from the fields extracted off an entry-detail page
    ///
    /// Absent fields stay `None` or empty; nothing here fails.
    pub fn from_detail(id: u64, reference: impl Into<String>, fields: &Fields) -> Self {
        Self {
            id,
            reference: reference.into(),
            genre: fields.first(Field::Genre).map(str::to_string),
            artist_name: fields.first(Field::ArtistName).map(str::to_string),
            artist_link: fields.first(Field::ArtistLink).map(str::to_string),
            release_year: fields.first(Field::ReleaseYear).map(str::to_string),
            title: fields.first(Field::Title).and_then(clean_title),
            record_labels: fields.all(Field::RecordLabel).to_vec(),
            track_numbers: fields.all(Field::TrackNumber).to_vec(),
            track_names: fields.all(Field::TrackName).to_vec(),
            track_durations: fields.all(Field::TrackDuration).to_vec(),
            styles: fields.all(Field::Style).to_vec(),
        }
    }

    /// Link to the cross-reference page, if the detail page had one
    pub fn crossref_link(&self) -> Option<&str> {
        self.artist_link.as_deref()
    }

    /// Pairs track numbers, names and durations by position
    ///
    /// When the three lists disagree in length the result stops at the
    /// shortest one.
    pub fn tracks(&self) -> Vec<Track> {
        self.track_numbers
            .iter()
            .zip(&self.track_names)
            .zip(&self.track_durations)
            .map(|((number, name), duration)| Track {
                number: number.clone(),
                name: name.clone(),
                track_duration: duration.clone(),
            })
            .collect()
    }

    /// Merges the cross-reference fields and produces the final record
    ///
    /// `crossref` is `None` when the cross-reference page was never fetched;
    /// members and websites are then empty.
    pub fn finalize(self, crossref: Option<&Fields>) -> Record {
        let album_tracks = self.tracks();

        let (artist_members, artist_websites) = match crossref {
            Some(fields) => (
                fields.all(Field::Member).iter().cloned().collect(),
                fields.all(Field::Website).iter().cloned().collect(),
            ),
            None => (BTreeSet::new(), BTreeSet::new()),
        };

        Record {
            id: self.id,
            genre: self.genre,
            artist_name: self.artist_name,
            artist_members,
            artist_websites,
            album_release_year: self.release_year,
            album_title: self.title,
            album_record_label: self.record_labels.into_iter().collect(),
            album_styles: self.styles.into_iter().collect(),
            album_tracks,
        }
    }
}

/// Strips surrounding whitespace and dash characters from a title
///
/// The title text on a detail page follows the artist link as
/// `"– Title"`. Returns `None` when nothing is left.
pub fn clean_title(raw: &str) -> Option<String> {
    let cleaned = raw.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—'));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
