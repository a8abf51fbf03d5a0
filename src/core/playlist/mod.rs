mod installer;
mod model;

pub use installer::PlaylistInstaller;
pub use model::{Playlist, PlaylistSong};
