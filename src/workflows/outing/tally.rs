use super::domain::VoteOption;
use super::store::tally_order;

/// The option with the highest vote count; ties go to the lowest option id
/// (earliest created). Deterministic: identical input always yields the
/// same winner.
pub fn winner(options: &[VoteOption]) -> Option<&VoteOption> {
    options.iter().min_by(|a, b| tally_order(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::outing::domain::{ActivityId, VoteOptionId};
    use chrono::NaiveDate;

    fn option(id: u64, day: u32, votes: u32) -> VoteOption {
        VoteOption {
            id: VoteOptionId(id),
            activity_id: ActivityId(1),
            date: NaiveDate::from_ymd_opt(2025, 11, day).expect("valid date"),
            label: format!("2025-11-{day:02}"),
            weather: "多云，12-18℃".to_string(),
            vote_count: votes,
        }
    }

    #[test]
    fn highest_count_wins() {
        let options = vec![option(1, 1, 3), option(2, 2, 7), option(3, 8, 5)];
        assert_eq!(winner(&options).map(|o| o.id), Some(VoteOptionId(2)));
    }

    #[test]
    fn ties_resolve_to_the_lowest_id_repeatably() {
        let options = vec![option(4, 1, 5), option(2, 2, 5), option(9, 8, 5)];
        for _ in 0..10 {
            assert_eq!(winner(&options).map(|o| o.id), Some(VoteOptionId(2)));
        }
    }

    #[test]
    fn empty_input_has_no_winner() {
        assert!(winner(&[]).is_none());
    }
}
