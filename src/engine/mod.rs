pub mod fare;
pub mod ledger;
pub mod payout;
pub mod penalty;
pub mod priority;
pub mod settings;
pub mod time;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn exact_ties_round_to_even_cents() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(1.625), 1.62);
        assert_eq!(round2(10.7625), 10.76);
        assert_eq!(round2(14.529375), 14.53);
        assert_eq!(round2(-0.125), -0.12);
    }
}
