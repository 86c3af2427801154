pub mod constants;
pub mod crop;
pub mod image;
pub mod location;
pub mod rect;
