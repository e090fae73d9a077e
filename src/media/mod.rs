//! Adapters around the external collaborators a post touches: image
//! decoding, link previews and sentiment scoring.

pub mod images;
pub mod preview;
pub mod sentiment;
