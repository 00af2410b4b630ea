// Models module - Ledger entity representations

pub mod claim;
pub mod contribution;
pub mod identity;
pub mod member;
pub mod money;
pub mod payout;

pub use claim::{Claim, ClaimPriority, ClaimStatus, NewClaim, ReviewDecision};
pub use contribution::{Contribution, ContributionStatus};
pub use identity::{AuthenticatedIdentity, Identity, Role};
pub use member::{Member, MemberStatus, MemberSummary};
pub use payout::Payout;
