//! Patient-entry lifecycle: extraction of flow answers, reconciliation into
//! stored entries, status transitions and the board view.

pub mod board;
pub mod extract;
pub mod fields;
pub mod menus;
pub mod reconcile;
pub mod transition;
pub mod urgency;

pub use board::{build_board, list_active, BoardPolicy, BoardQuery, EntryDetail, EntryView, StatusFilter};
pub use extract::{extract, ExtractError, ExtractMode, FlowMessage};
pub use fields::FieldMap;
pub use reconcile::{amend_entry, create_entry, find_active, find_entry, EntryRecord};
pub use transition::{transition_entry, StatusOption, Transitioned};
pub use urgency::Urgency;
