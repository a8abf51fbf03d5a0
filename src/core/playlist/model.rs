use serde::Deserialize;

/// A playlist manifest: display metadata plus the ordered song list.
/// The manifest bytes themselves are persisted verbatim; this model only
/// drives resolution and is never re-serialized.
#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    #[serde(rename = "playlistTitle")]
    pub title: String,
    #[serde(rename = "playlistAuthor", default)]
    pub author: Option<String>,
    /// Cover image reference, usually a data URI.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub songs: Vec<PlaylistSong>,
}

/// One entry of a playlist, identified by its catalog key.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSong {
    #[serde(rename = "key")]
    pub id: String,
    #[serde(rename = "songName", default)]
    pub song_name: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}
