pub mod mmap;
pub mod ring;
pub mod traits;
