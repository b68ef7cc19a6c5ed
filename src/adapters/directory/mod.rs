//! Backend-independent `UserDirectory` implementations.

mod in_memory_directory;

pub use in_memory_directory::InMemoryUserDirectory;
