pub mod amount;
pub mod claim;
pub mod line_item;
pub mod result;

pub use amount::Amount;
pub use claim::{Claim, RawClaimInput, RawTable};
pub use line_item::LineItem;
pub use result::{BatchOutcome, BatchSummary, ClaimResult, Disposition};
