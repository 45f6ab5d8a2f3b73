use crate::PollState;
use now_listening_core::NowPlayingResponse;
use serde::Serialize;
use std::fmt;

pub const NOW_LISTENING_LABEL: &str = "Now listening";
pub const LAST_LISTENED_LABEL: &str = "Last listened to";
pub const ALBUM_SEPARATOR: &str = " · ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    /// Nothing has landed yet; no network-derived content.
    Skeleton,
    Status { status: StatusView },
    Card { card: TrackCard },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusView {
    NotConfigured,
    NoTracksYet,
    Message(String),
    Nothing,
}

impl StatusView {
    pub fn text(&self) -> &str {
        match self {
            StatusView::NotConfigured => {
                "Connect your Last.fm account to show what you're listening to. \
                 Set LAST_FM_API_KEY and LAST_FM_USER, then scrobble to Last.fm."
            }
            StatusView::NoTracksYet => {
                "No recent tracks yet. Play something and scrobble to Last.fm to see it here."
            }
            StatusView::Message(msg) => msg.as_str(),
            StatusView::Nothing => "Nothing to show right now.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Artwork {
    Live(String),
    Image(String),
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackCard {
    pub label: &'static str,
    pub title: String,
    pub subtitle: String,
    pub artwork: Artwork,
    pub href: String,
}

pub fn render(state: &PollState) -> View {
    match state {
        PollState::Loading => View::Skeleton,
        PollState::Loaded(resp) => render_response(resp),
    }
}

fn render_response(resp: &NowPlayingResponse) -> View {
    let Some(track) = resp.usable_track() else {
        return View::Status {
            status: status_for(resp),
        };
    };

    let subtitle = if track.album.is_empty() {
        track.artist.clone()
    } else {
        format!("{}{}{}", track.artist, ALBUM_SEPARATOR, track.album)
    };

    let artwork = match (non_empty(&track.live_artwork_url), non_empty(&track.image)) {
        (Some(live), _) => Artwork::Live(live.to_string()),
        (None, Some(image)) => Artwork::Image(image.to_string()),
        (None, None) => Artwork::Placeholder,
    };

    View::Card {
        card: TrackCard {
            label: if resp.now_playing {
                NOW_LISTENING_LABEL
            } else {
                LAST_LISTENED_LABEL
            },
            title: track.name.clone(),
            subtitle,
            artwork,
            href: non_empty(&track.url).unwrap_or("#").to_string(),
        },
    }
}

fn status_for(resp: &NowPlayingResponse) -> StatusView {
    if resp.is_not_configured() {
        StatusView::NotConfigured
    } else if resp.ok && resp.track.is_none() {
        StatusView::NoTracksYet
    } else if let Some(msg) = resp.message.as_ref() {
        StatusView::Message(msg.clone())
    } else {
        StatusView::Nothing
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Skeleton => write!(f, "…"),
            View::Status { status } => write!(f, "{}", status.text()),
            View::Card { card } => {
                writeln!(f, "{}", card.label)?;
                writeln!(f, "{}", card.title)?;
                write!(f, "{}", card.subtitle)?;
                if card.href != "#" {
                    write!(f, "\n{}", card.href)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{render, Artwork, StatusView, View, LAST_LISTENED_LABEL, NOW_LISTENING_LABEL};
    use crate::PollState;
    use now_listening_core::{NowPlayingResponse, TrackPayload};

    fn track() -> TrackPayload {
        TrackPayload {
            name: "Reckoner".to_string(),
            artist: "Radiohead".to_string(),
            album: String::new(),
            url: Some("https://www.last.fm/music/Radiohead/_/Reckoner".to_string()),
            image: Some("https://img/x.jpg".to_string()),
            live_artwork_url: None,
        }
    }

    fn status(resp: NowPlayingResponse) -> StatusView {
        match render(&PollState::Loaded(resp)) {
            View::Status { status } => status,
            other => panic!("expected status view, got {other:?}"),
        }
    }

    #[test]
    fn loading_renders_skeleton() {
        assert_eq!(render(&PollState::Loading), View::Skeleton);
    }

    #[test]
    fn not_configured_renders_connect_guidance() {
        let s = status(NowPlayingResponse::not_configured());
        assert_eq!(s, StatusView::NotConfigured);
        assert!(s.text().starts_with("Connect your Last.fm account"));
        assert!(s.text().contains("LAST_FM_API_KEY"));
    }

    #[test]
    fn empty_history_renders_no_tracks_yet() {
        assert_eq!(status(NowPlayingResponse::no_track()), StatusView::NoTracksYet);
    }

    #[test]
    fn other_failures_show_their_message() {
        assert_eq!(
            status(NowPlayingResponse::fetch_failed()),
            StatusView::Message("Failed to fetch".to_string())
        );
    }

    #[test]
    fn failure_without_message_uses_fallback() {
        let resp = NowPlayingResponse {
            ok: false,
            now_playing: false,
            track: None,
            message: None,
        };
        let s = status(resp);
        assert_eq!(s, StatusView::Nothing);
        assert_eq!(s.text(), "Nothing to show right now.");
    }

    #[test]
    fn track_on_failed_payload_is_not_shown() {
        let resp = NowPlayingResponse {
            ok: false,
            now_playing: true,
            track: Some(track()),
            message: Some("boom".to_string()),
        };
        assert_eq!(status(resp), StatusView::Message("boom".to_string()));
    }

    #[test]
    fn playing_track_without_album_omits_separator() {
        let view = render(&PollState::Loaded(NowPlayingResponse::track(true, track())));
        let View::Card { card } = view else {
            panic!("expected card");
        };

        assert_eq!(card.label, NOW_LISTENING_LABEL);
        assert_eq!(card.title, "Reckoner");
        assert_eq!(card.subtitle, "Radiohead");
        assert!(!card.subtitle.contains('·'));
        assert_eq!(card.artwork, Artwork::Image("https://img/x.jpg".to_string()));
        assert_eq!(card.href, "https://www.last.fm/music/Radiohead/_/Reckoner");
    }

    #[test]
    fn recent_track_with_album_and_no_links() {
        let mut t = track();
        t.album = "In Rainbows".to_string();
        t.url = None;
        t.image = None;
        let View::Card { card } = render(&PollState::Loaded(NowPlayingResponse::track(false, t)))
        else {
            panic!("expected card");
        };

        assert_eq!(card.label, LAST_LISTENED_LABEL);
        assert_eq!(card.subtitle, "Radiohead · In Rainbows");
        assert_eq!(card.artwork, Artwork::Placeholder);
        assert_eq!(card.href, "#");
    }

    #[test]
    fn live_artwork_wins_over_image() {
        let mut t = track();
        t.live_artwork_url = Some("https://img/live.mp4".to_string());
        let View::Card { card } = render(&PollState::Loaded(NowPlayingResponse::track(true, t)))
        else {
            panic!("expected card");
        };
        assert_eq!(card.artwork, Artwork::Live("https://img/live.mp4".to_string()));
    }

    #[test]
    fn card_display_lists_label_title_and_subtitle() {
        let text = render(&PollState::Loaded(NowPlayingResponse::track(true, track()))).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Now listening");
        assert_eq!(lines[1], "Reckoner");
        assert_eq!(lines[2], "Radiohead");
    }
}
