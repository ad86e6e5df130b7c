//! Daily digest composition.
//!
//! Turns the loaded plan list into one outgoing message and the updated plan
//! list to persist. No I/O happens here; the scheduler sends and saves.

use chrono::NaiveDate;

use crate::plans::due::is_due;
use crate::plans::model::Plan;

/// Fixed text framing the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestTemplate {
    /// First line when at least one plan is due.
    pub header: String,
    /// Whole body when nothing is due.
    pub empty: String,
}

impl Default for DigestTemplate {
    fn default() -> Self {
        Self {
            header: "Plans for today:".to_string(),
            empty: "No plans for today".to_string(),
        }
    }
}

/// Result of a digest pass that should be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Chat of the last plan seen.
    pub channel_id: i64,
    pub message: String,
    /// Every input plan in load order, due ones stamped with `today`.
    pub plans: Vec<Plan>,
    /// How many plans fired.
    pub due_count: usize,
}

/// Build today's digest.
///
/// Returns `None` when there is nobody to address: the plan list is empty or
/// the last plan carries channel id `0`. The caller must then neither send
/// nor persist.
///
/// Only one chat receives the digest: the channel of the last plan in load
/// order. Plan sets spanning several chats are not supported; a mix is logged.
pub fn build_digest(plans: Vec<Plan>, today: NaiveDate, template: &DigestTemplate) -> Option<Digest> {
    let mut lines = Vec::new();
    let mut channel_id: Option<i64> = None;
    let mut updated = Vec::with_capacity(plans.len());

    for mut plan in plans {
        if let Some(previous) = channel_id
            && previous != plan.channel_id
        {
            tracing::warn!(
                previous,
                channel_id = plan.channel_id,
                "Plans span multiple channels; digest goes to the last one"
            );
        }
        channel_id = Some(plan.channel_id);

        if is_due(&plan, today) {
            lines.push(format!("{}. {}", lines.len() + 1, plan.summary));
            plan.last_sent = Some(today);
        }
        updated.push(plan);
    }

    let channel_id = channel_id.filter(|id| *id != 0)?;
    let due_count = lines.len();

    let message = if lines.is_empty() {
        template.empty.clone()
    } else {
        let mut message = template.header.clone();
        for line in &lines {
            message.push('\n');
            message.push_str(line);
        }
        message
    };

    Some(Digest {
        channel_id,
        message,
        plans: updated,
        due_count,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;
    use crate::plans::model::Period;

    fn today() -> NaiveDate {
        // Wednesday
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn empty_list_is_not_sent() {
        assert_eq!(build_digest(vec![], today(), &DigestTemplate::default()), None);
    }

    #[test]
    fn zero_channel_is_not_sent() {
        let plans = vec![Plan::new(0, 1, Period::EveryNDays, "1", "a")];
        assert_eq!(build_digest(plans, today(), &DigestTemplate::default()), None);
    }

    #[test]
    fn numbers_due_plans_in_load_order() {
        let plans = vec![
            Plan::new(5, 1, Period::EveryNDays, "1", "A"),
            Plan::new(5, 2, Period::WeeklyOnDays, "1", "B"),
            Plan::new(5, 3, Period::WeeklyOnDays, "3", "C"),
        ];

        let digest = build_digest(plans, today(), &DigestTemplate::default()).unwrap();

        assert_eq!(digest.channel_id, 5);
        assert_eq!(digest.due_count, 2);
        assert_eq!(digest.message, "Plans for today:\n1. A\n2. C");
        assert_eq!(digest.plans.len(), 3);
        assert_eq!(digest.plans[0].last_sent, Some(today()));
        assert_eq!(digest.plans[1].last_sent, None);
        assert_eq!(digest.plans[2].last_sent, Some(today()));
    }

    #[test]
    fn nothing_due_uses_placeholder() {
        let plans = vec![
            Plan::new(5, 1, Period::EveryNDays, "7", "A").with_last_sent(today() - Days::new(1)),
        ];
        let template = DigestTemplate {
            header: "Today:".into(),
            empty: "Nothing today".into(),
        };

        let digest = build_digest(plans.clone(), today(), &template).unwrap();

        assert_eq!(digest.message, "Nothing today");
        assert_eq!(digest.due_count, 0);
        assert_eq!(digest.plans, plans);
    }

    #[test]
    fn last_seen_channel_wins() {
        let plans = vec![
            Plan::new(1, 1, Period::EveryNDays, "1", "A"),
            Plan::new(2, 2, Period::Once, "01/01/2000", "B"),
        ];
        let digest = build_digest(plans, today(), &DigestTemplate::default()).unwrap();
        assert_eq!(digest.channel_id, 2);
        assert_eq!(digest.message, "Plans for today:\n1. A");
    }

    #[test]
    fn second_pass_same_day_fires_nothing() {
        let plans = vec![Plan::new(5, 1, Period::EveryNDays, "1", "A")];
        let first = build_digest(plans, today(), &DigestTemplate::default()).unwrap();
        let second = build_digest(first.plans, today(), &DigestTemplate::default()).unwrap();
        assert_eq!(second.due_count, 0);
        assert_eq!(second.message, "No plans for today");
    }
}
