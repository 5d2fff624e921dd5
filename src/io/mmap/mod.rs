pub mod arena;
pub use arena::{Arena, MAX_BUFFERS};

pub mod stream;
pub use stream::Stream;
