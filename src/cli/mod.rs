mod inspect;
mod render;
mod root;

pub use root::Cli;
