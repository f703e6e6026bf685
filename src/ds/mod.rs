pub mod grouped_map;
pub mod key_pool;
pub mod size_index;
pub mod slot_arena;

pub use grouped_map::{GroupIter, GroupedLruMap};
pub use key_pool::{DEFAULT_KEY_POOL_CAPACITY, KeyPool, KeyState, Poolable};
pub use size_index::SizeIndex;
pub use slot_arena::{SlotArena, SlotId};
