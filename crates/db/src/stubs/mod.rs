mod pending;

pub use pending::MemPendingStore;
