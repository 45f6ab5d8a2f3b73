use crate::raw::{RawImage, RawNamed, RawTrack};
use now_listening_core::{TrackPayload, UNKNOWN_ARTIST};

const LARGEST_IMAGE_SIZE: &str = "extralarge";

/// A track after normalization, paired with the upstream "now playing" flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTrack {
    pub now_playing: bool,
    pub track: TrackPayload,
}

/// Turns an upstream record into the wire contract. Records without a name
/// do not count as a track.
pub fn normalize(raw: RawTrack) -> Option<NormalizedTrack> {
    let name = raw.name.filter(|n| !n.is_empty())?;
    let now_playing = raw
        .attr
        .as_ref()
        .and_then(|a| a.nowplaying.as_deref())
        .map(|v| v == "true")
        .unwrap_or(false);

    let artist = resolve_named(raw.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album = resolve_named(raw.album).unwrap_or_default();
    let image = raw.image.as_deref().and_then(best_image);

    Some(NormalizedTrack {
        now_playing,
        track: TrackPayload {
            name,
            artist,
            album,
            url: raw.url,
            image,
            live_artwork_url: None,
        },
    })
}

// An empty `#text` is still a value; only absence falls through.
fn resolve_named(named: Option<RawNamed>) -> Option<String> {
    let named = named?;
    named.text.or(named.name)
}

fn best_image(images: &[RawImage]) -> Option<String> {
    images
        .iter()
        .find(|i| i.size.as_deref() == Some(LARGEST_IMAGE_SIZE))
        .and_then(image_url)
        .or_else(|| images.last().and_then(image_url))
        .map(str::to_string)
}

fn image_url(image: &RawImage) -> Option<&str> {
    image.url.as_deref().filter(|u| !u.is_empty())
}
