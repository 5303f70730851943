//! Run reports and digests.
//!
//! A report condenses one scripted run into a few stable numbers and SHA-1
//! digests, serialized as JSON. Digests compare runs across processes and
//! machines without shipping framebuffers around.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use quadlink_session::{PresentedFrame, Session};

/// SHA-1 hex digest of a byte slice.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// SHA-1 hex digest of a composed frame, pixels little-endian.
#[must_use]
pub fn digest_frame(frame: &PresentedFrame) -> String {
    let mut bytes = Vec::with_capacity(frame.pixels().len() * 2);
    for &pixel in frame.pixels() {
        bytes.extend_from_slice(&pixel.to_le_bytes());
    }
    digest_bytes(&bytes)
}

/// Summary of one scripted session run.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub instances: usize,
    pub frames: u64,
    pub link_wired: bool,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Digest of the final composed frame.
    pub frame_digest: String,
    /// Digest of the aggregate savestate after the run.
    pub state_digest: String,
    /// Strongest rumble strength delivered, 0 without motor activity.
    pub rumble_peak: u16,
}

impl RunReport {
    /// Snapshot a finished session. Panics if nothing is loaded; callers run
    /// the session first.
    #[must_use]
    pub fn from_session(session: &Session, rumble_peak: u16) -> Self {
        let av = session.av_info().expect("session loaded");
        let frame = session.frame().expect("session loaded");
        let mut state = vec![0u8; session.state_size()];
        session.save_state(&mut state).expect("session loaded");
        Self {
            instances: session.instances().map_or(0, quadlink_session::InstanceSet::len),
            frames: session.frame_count(),
            link_wired: session.link_wired(),
            width: av.width,
            height: av.height,
            fps: av.fps,
            frame_digest: digest_frame(frame),
            state_digest: digest_bytes(&state),
            rumble_peak,
        }
    }
}
