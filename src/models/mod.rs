mod comment;
mod contact;
mod image;
mod post;
mod tag;

pub use comment::*;
pub use contact::*;
pub use image::*;
pub use post::*;
pub use tag::*;
