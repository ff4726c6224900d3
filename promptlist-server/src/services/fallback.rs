//! Demo playlist served when the completion endpoint is unusable

use promptlist_common::Track;

use crate::models::DraftPlaylist;

pub const FALLBACK_TITLE: &str = "Demo Playlist";
pub const FALLBACK_DESCRIPTION: &str =
    "The playlist generator is unavailable right now, so here is a sample playlist instead.";

/// Fixed set of well-known real tracks
pub fn demo_playlist() -> DraftPlaylist {
    let tracks = vec![
        Track::new("Here Comes the Sun", "The Beatles", "Abbey Road", 1969, 185)
            .with_explanation("A bright, optimistic classic that suits almost any mood."),
        Track::new("Get Lucky", "Daft Punk", "Random Access Memories", 2013, 369)
            .with_explanation("An effortless disco groove."),
        Track::new("Karma Police", "Radiohead", "OK Computer", 1997, 264)
            .with_explanation("A moody alternative rock staple."),
        Track::new("cardigan", "Taylor Swift", "folklore", 2020, 239)
            .with_explanation("Quiet, reflective songwriting."),
        Track::new("Alright", "Kendrick Lamar", "To Pimp a Butterfly", 2015, 219)
            .with_explanation("Jazz-inflected hip hop with an uplifting hook."),
        Track::new("Happier Than Ever", "Billie Eilish", "Happier Than Ever", 2021, 298)
            .with_explanation("Builds from a whisper to a full-band finale."),
        Track::new("Formation", "Beyoncé", "Lemonade", 2016, 206)
            .with_explanation("A confident, bass-heavy anthem."),
    ];

    DraftPlaylist {
        title: FALLBACK_TITLE.to_string(),
        description: FALLBACK_DESCRIPTION.to_string(),
        tracks,
    }
}
