pub(crate) mod memory;

pub use memory::MemoryStore;
pub use test::TestStore;
