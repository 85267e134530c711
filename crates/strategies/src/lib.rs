//! Ready-made snapshot strategies for refsnap
//!
//! | Strategy  | Value                | Reference | Diff                         |
//! |-----------|----------------------|-----------|------------------------------|
//! | [`Lines`] | `String`             | `.txt`    | line hunks                   |
//! | [`dump`]  | any `Debug`          | `.txt`    | line hunks of `{:#?}`        |
//! | [`Json`]  | any `Serialize`      | `.json`   | line hunks of pretty JSON    |
//! | [`Data`]  | `Vec<u8>`            | `.bin`    | sizes, digests, first offset |
//! | [`Image`] | `image::RgbaImage`   | `.png`    | pixel count + diff image     |
//! | [`Wait`]  | inner strategy's     | inner     | inner                        |

pub mod data;
pub mod dump;
pub mod image;
pub mod json;
pub mod lines;
pub mod wait;

pub use data::Data;
pub use dump::{dump, Dump};
pub use self::image::{Image, PixelComparison};
pub use json::Json;
pub use lines::{line_diff, Lines};
pub use wait::Wait;
