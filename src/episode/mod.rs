pub mod audio;
mod key;

pub use key::{PLAYED_MARKER, episode_key};
