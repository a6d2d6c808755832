//! Concrete store adapters
//!
//! Three media behind the one contract:
//! - `MemoryStore`: process-local, single-record primitives native
//! - `FileStore`: one JSON file, multi-record primitives native
//! - `RemoteStore`: REST endpoint, multi-record primitives native
//!
//! Whichever side a store leaves out, the engine synthesizes.

mod file;
mod memory;
mod remote;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;
