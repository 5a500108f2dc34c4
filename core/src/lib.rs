pub mod files;
pub mod index;
pub mod persist;
pub mod query;
pub mod result;
pub mod tokenizer;
pub mod work_queue;

pub use files::FileIndexer;
pub use index::{InvertedIndex, Positions, PostingList, WordIndex};
pub use query::{query_key, QueryCache, QueryHandler};
pub use result::QueryResult;
pub use work_queue::{Spawner, WorkQueue};
