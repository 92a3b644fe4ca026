mod investment;
mod quota;
mod referral;
mod reward;
mod withdrawal;

pub use self::{investment::*, quota::*, referral::*, reward::*, withdrawal::*};
