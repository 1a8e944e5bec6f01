//! Session logic for sorting images into label folders by hand.
//!
//! A [`Session`] walks a [`RecordStore`] with a [`Navigator`]; each vote
//! copies the current image into `<destination>/<label>/` and rewrites the
//! JSON snapshot that a later run can resume from.

mod error;
mod navigator;
mod resolver;
mod session;
mod store;

pub use error::LabelError;
pub use navigator::{Boundary, Navigator};
pub use resolver::{IMAGE_EXTENSIONS, ImageSource, Resolved, find_images, is_image, resolve};
pub use session::{Progress, SNAPSHOT_FILE, Session, Vote};
pub use store::{Record, RecordStore};
