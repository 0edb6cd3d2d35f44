pub mod catalog;
pub mod fanout;
pub mod instance_ops;
pub mod memory_store;
pub mod resolver;
pub mod storage;

pub use catalog::DefinitionCatalog;
pub use fanout::{DefinitionExecutor, FanOut, FanOutMode, SearchResult};
pub use instance_ops::InstanceOperation;
pub use memory_store::MemoryStore;
pub use resolver::{DefinitionFilter, DefinitionResolver};
pub use storage::{collection_for, InstanceStorage};
