/// Frame sources for ascii-mation: still images and ffmpeg-decoded video.
pub mod image;
pub mod video;

pub use image::{ImageSource, load_image};
pub use video::{Playback, VideoCommand, VideoInfo, VideoSource, probe_video};
