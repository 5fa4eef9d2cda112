pub mod courier;
pub mod fare;
pub mod payout;
