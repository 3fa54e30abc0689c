/// Crawl state machine stages
///
/// One catalog entry moves through `FetchingDetail`, `FetchingCrossref` and
/// `Emitting` before the machine either pops the next entry or returns to
/// `Searching` for the next results page.
use std::fmt;

/// Represents the current stage of the crawl chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Fetching the search-results page the cursor points at
    Searching,

    /// Enqueuing the links of a results page and popping the first pending one
    DrainingList,

    /// Fetching the entry-detail page of a popped link
    FetchingDetail,

    /// Fetching the cross-reference (artist) page for the current draft
    FetchingCrossref,

    /// Appending the finished record and choosing the next stage
    Emitting,

    /// Search results ran dry; nothing further to do
    Exhausted,
}

impl CrawlState {
    /// Returns true if the machine cannot leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns true if entering this state issues a fetch
    pub fn fetches(&self) -> bool {
        matches!(
            self,
            Self::Searching | Self::FetchingDetail | Self::FetchingCrossref
        )
    }

    /// Checks whether `next` may directly follow this state
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        use CrawlState::*;

        matches!(
            (self, next),
            (Searching, DrainingList)
                | (DrainingList, FetchingDetail)
                | (DrainingList, Searching)
                | (DrainingList, Exhausted)
                | (FetchingDetail, FetchingCrossref)
                | (FetchingDetail, Emitting)
                | (FetchingCrossref, Emitting)
                | (Emitting, FetchingDetail)
                | (Emitting, Searching)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::DrainingList => "draining_list",
            Self::FetchingDetail => "fetching_detail",
            Self::FetchingCrossref => "fetching_crossref",
            Self::Emitting => "emitting",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
