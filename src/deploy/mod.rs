//! Deploy-step inputs: combined parameter files and stack tags

pub mod params;
pub mod tags;

pub use params::{combine, merge_parameters, write_combined, ParamsError};
pub use tags::{combine_tags, Tag, TagsError};
