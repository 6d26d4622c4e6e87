pub(crate) mod worker;

pub use worker::{RenderKey, RenderTask};
