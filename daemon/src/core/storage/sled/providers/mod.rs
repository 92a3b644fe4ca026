mod investment;
mod quota;
mod referral;
mod reward;
mod withdrawal;
