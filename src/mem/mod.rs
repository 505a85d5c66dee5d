//! Guest linear memory and the address translator that mediates access to
//! it (component C2 of the spec).

pub mod shared_mem;
pub mod translator;

pub use shared_mem::SharedMemory;
pub use translator::MemTranslator;
