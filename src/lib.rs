#[macro_use]
pub mod macros;

pub mod activity;
pub mod archive;
pub mod drive;
pub mod fs_toml_util;
