pub mod backend;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod mosaic;
pub mod pointer;
pub mod render;
pub mod script;
pub mod session;
pub mod surface;
pub mod tool;
pub mod writer;

#[cfg(test)]
mod test_support;
