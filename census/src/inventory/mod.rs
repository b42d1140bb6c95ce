//! インベントリ
//!
//! 識別キーごとのレコードのマージ・共有マップ・永続化

pub mod merge;
pub mod persist;
pub mod store;

use std::collections::BTreeMap;

use crate::common::identity::IdentityKey;
use crate::common::types::InventoryRecord;

pub use merge::merge_record;
pub use store::InventoryStore;

/// 識別キー順に並んだインベントリ
pub type Inventory = BTreeMap<IdentityKey, InventoryRecord>;
