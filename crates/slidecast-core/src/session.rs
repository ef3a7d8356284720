//! Durable session metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Lifecycle status of a session: `scheduled -> live -> ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, waiting for the presenter to start it.
    #[default]
    Scheduled,
    /// In progress; viewers may join.
    Live,
    /// Finished; hidden from the directory.
    Ended,
}

impl SessionStatus {
    /// Statuses listed by the directory query.
    pub const JOINABLE: [Self; 2] = [Self::Scheduled, Self::Live];

    /// Storage and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Ended => "ended",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Re-entering the current status is allowed so repeated start/end
    /// requests from a retrying client are harmless.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Scheduled | Self::Live | Self::Ended)
                | (Self::Live, Self::Live | Self::Ended)
                | (Self::Ended, Self::Ended)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "live" => Ok(Self::Live),
            "ended" => Ok(Self::Ended),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// A durable session record.
///
/// Field names on the wire match the directory listing consumed by the
/// viewer console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Primary key.
    pub session_id: SessionId,
    /// Display name.
    pub session_name: String,
    /// Scheduled date as entered by the presenter.
    pub session_date: String,
    /// Scheduled time as entered by the presenter.
    pub session_time: String,
    /// Names of the uploaded source documents.
    #[serde(rename = "pptFileNames")]
    pub file_names: Vec<String>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// 1-based index of the slide on screen.
    pub current_slide: u32,
    /// Number of rasterized slides.
    pub slide_count: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A fresh record with default metadata.
    pub fn new(session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            session_name: String::new(),
            session_date: String::new(),
            session_time: String::new(),
            file_names: Vec::new(),
            status: SessionStatus::Scheduled,
            current_slide: 1,
            slide_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether viewers may currently join.
    pub fn is_live(&self) -> bool {
        self.status == SessionStatus::Live
    }

    /// Whether `slide` is a valid position for this deck.
    ///
    /// A deck that was never rasterized (`slide_count == 0`) only admits
    /// slide 1.
    pub fn slide_in_range(&self, slide: u32) -> bool {
        slide >= 1 && slide <= self.slide_count.max(1)
    }

    /// Apply every field present in `patch` and bump `updated_at`.
    pub fn apply(&mut self, patch: &SessionPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.session_name {
            self.session_name.clone_from(name);
        }
        if let Some(date) = &patch.session_date {
            self.session_date.clone_from(date);
        }
        if let Some(time) = &patch.session_time {
            self.session_time.clone_from(time);
        }
        if let Some(files) = &patch.file_names {
            self.file_names.clone_from(files);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(slide) = patch.current_slide {
            self.current_slide = slide;
        }
        if let Some(count) = patch.slide_count {
            self.slide_count = count;
        }
        self.updated_at = now;
    }
}

/// Partial update of a [`SessionRecord`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    /// New display name.
    pub session_name: Option<String>,
    /// New date.
    pub session_date: Option<String>,
    /// New time.
    pub session_time: Option<String>,
    /// New file list.
    pub file_names: Option<Vec<String>>,
    /// New status.
    pub status: Option<SessionStatus>,
    /// New current slide.
    pub current_slide: Option<u32>,
    /// New slide count.
    pub slide_count: Option<u32>,
}

impl SessionPatch {
    /// Patch that only changes the status.
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that only moves the current slide.
    pub fn current_slide(slide: u32) -> Self {
        Self {
            current_slide: Some(slide),
            ..Self::default()
        }
    }
}

/// Metadata supplied by the presenter when creating a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    /// Chosen session id.
    pub session_id: SessionId,
    /// Display name.
    pub session_name: String,
    /// Scheduled date.
    pub session_date: String,
    /// Scheduled time.
    pub session_time: String,
    /// Uploaded document names.
    #[serde(rename = "pptFileNames", default)]
    pub file_names: Vec<String>,
    /// Slide count returned by the rasterizer.
    #[serde(default)]
    pub slide_count: u32,
}

impl NewSession {
    /// Full overwrite patch: every metadata field, status reset to
    /// scheduled, position reset to the first slide.
    pub fn to_patch(&self) -> SessionPatch {
        SessionPatch {
            session_name: Some(self.session_name.clone()),
            session_date: Some(self.session_date.clone()),
            session_time: Some(self.session_time.clone()),
            file_names: Some(self.file_names.clone()),
            status: Some(SessionStatus::Scheduled),
            current_slide: Some(1),
            slide_count: Some(self.slide_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord::new(SessionId::from("ABCD123"), Utc::now())
    }

    #[test]
    fn new_record_defaults() {
        let r = record();
        assert_eq!(r.status, SessionStatus::Scheduled);
        assert_eq!(r.current_slide, 1);
        assert_eq!(r.slide_count, 0);
        assert!(!r.is_live());
    }

    #[test]
    fn transitions() {
        use SessionStatus::{Ended, Live, Scheduled};
        assert!(Scheduled.can_transition_to(Live));
        assert!(Live.can_transition_to(Live));
        assert!(Live.can_transition_to(Ended));
        assert!(Scheduled.can_transition_to(Ended));
        assert!(!Ended.can_transition_to(Live));
        assert!(!Live.can_transition_to(Scheduled));
    }

    #[test]
    fn slide_range_uses_slide_count() {
        let mut r = record();
        r.slide_count = 10;
        assert!(!r.slide_in_range(0));
        assert!(r.slide_in_range(1));
        assert!(r.slide_in_range(10));
        assert!(!r.slide_in_range(11));
    }

    #[test]
    fn empty_deck_admits_only_first_slide() {
        let r = record();
        assert!(r.slide_in_range(1));
        assert!(!r.slide_in_range(2));
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut r = record();
        r.session_name = "Algebra".into();
        let later = r.created_at + chrono::Duration::seconds(5);
        r.apply(&SessionPatch::current_slide(4), later);
        assert_eq!(r.current_slide, 4);
        assert_eq!(r.session_name, "Algebra");
        assert_eq!(r.updated_at, later);
    }

    #[test]
    fn new_session_patch_resets_status_and_position() {
        let new = NewSession {
            session_id: "S1".into(),
            session_name: "Physics".into(),
            session_date: "2026-10-16".into(),
            session_time: "09:00".into(),
            file_names: vec!["deck.pdf".into()],
            slide_count: 12,
        };
        let patch = new.to_patch();
        assert_eq!(patch.status, Some(SessionStatus::Scheduled));
        assert_eq!(patch.current_slide, Some(1));
        assert_eq!(patch.slide_count, Some(12));
    }

    #[test]
    fn record_wire_names() {
        let mut r = record();
        r.file_names = vec!["deck.pdf".into()];
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["sessionId"], "ABCD123");
        assert_eq!(json["pptFileNames"][0], "deck.pdf");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["currentSlide"], 1);
        assert_eq!(json["slideCount"], 0);
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [SessionStatus::Scheduled, SessionStatus::Live, SessionStatus::Ended] {
            assert_eq!(s.as_str().parse::<SessionStatus>().unwrap(), s);
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }
}
