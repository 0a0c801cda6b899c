use serde::Serialize;

use super::domain::{Course, CourseParticipation, Organisation, Person, Referral};
use crate::format::{optional_date, yes_no};
use crate::paths::{refer, PathError, PathTemplate, ReferralParams};

pub const CONFIRMATION_LABEL: &str =
    "I confirm that the information I have provided is complete, accurate and up to date.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub key: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCard {
    pub title: String,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswers {
    pub cards: Vec<SummaryCard>,
    pub confirmation_label: &'static str,
}

fn row(key: &'static str, value: impl Into<String>, change_href: Option<String>) -> SummaryRow {
    SummaryRow {
        key,
        value: value.into(),
        change_href,
    }
}

fn text_or_placeholder(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_string(),
        None => "Not provided".to_string(),
    }
}

fn participation_summary(participation: &CourseParticipation) -> String {
    let year = participation
        .outcome
        .as_ref()
        .and_then(|outcome| outcome.year_completed.or(outcome.year_started));
    match year {
        Some(year) => format!("{} ({year})", participation.course_name),
        None => participation.course_name.clone(),
    }
}

/// Summary rows shown before a referral is submitted. Change links appear only on drafts.
pub fn check_answers(
    referral: &Referral,
    person: &Person,
    course: &Course,
    organisation: &Organisation,
    participations: &[CourseParticipation],
) -> Result<CheckAnswers, PathError> {
    let params = ReferralParams::from(referral.id);
    let change = |template: PathTemplate<ReferralParams>| {
        if referral.is_draft() {
            template.build(&params).map(Some)
        } else {
            Ok(None)
        }
    };

    let person_card = SummaryCard {
        title: "Personal details".to_string(),
        rows: vec![
            row("Name", person.name(), None),
            row("Prison number", person.prison_number.clone(), None),
            row("Date of birth", optional_date(person.date_of_birth), None),
            row(
                "Earliest release date",
                optional_date(person.earliest_release_date),
                None,
            ),
        ],
    };

    let programme_card = SummaryCard {
        title: "Programme".to_string(),
        rows: vec![
            row("Programme name", course.display_name(), None),
            row("Programme strand", course.audience.clone(), None),
            row("Programme location", organisation.name.clone(), None),
        ],
    };

    let history = if participations.is_empty() {
        "No programme history".to_string()
    } else {
        participations
            .iter()
            .map(participation_summary)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut referral_rows = vec![
        row(
            "Accredited Programme history",
            history,
            change(refer::PROGRAMME_HISTORY)?,
        ),
        row(
            "OASys information confirmed",
            yes_no(referral.oasys_confirmed),
            change(refer::CONFIRM_OASYS)?,
        ),
        row(
            "Reason for referral",
            text_or_placeholder(referral.reason.as_deref()),
            change(refer::REASON)?,
        ),
        row(
            "Additional information",
            text_or_placeholder(referral.additional_information.as_deref()),
            change(refer::ADDITIONAL_INFORMATION)?,
        ),
    ];

    if referral.is_override {
        referral_rows.push(row(
            "Reason for override",
            text_or_placeholder(referral.referrer_override_reason.as_deref()),
            change(refer::OVERRIDE_REASON)?,
        ));
    }

    Ok(CheckAnswers {
        cards: vec![
            person_card,
            programme_card,
            SummaryCard {
                title: "Referral information".to_string(),
                rows: referral_rows,
            },
        ],
        confirmation_label: CONFIRMATION_LABEL,
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::common::{
        draft_referral, person, previous_participation, thinking_skills, organisation,
    };
    use super::*;
    use crate::workflows::referrals::status::ReferralStatus;

    fn keys(answers: &CheckAnswers) -> Vec<&'static str> {
        answers.cards[2].rows.iter().map(|row| row.key).collect()
    }

    #[test]
    fn draft_rows_link_back_to_each_step() {
        let mut referral = draft_referral();
        referral.reason = Some("Needs to address thinking".to_string());
        let answers = check_answers(
            &referral,
            &person(),
            &thinking_skills(),
            &organisation(),
            &[previous_participation()],
        )
        .expect("builds");

        let reason = &answers.cards[2].rows[2];
        assert_eq!(reason.value, "Needs to address thinking");
        assert_eq!(
            reason.change_href.as_deref(),
            Some(format!("/refer/referrals/{}/reason", referral.id).as_str())
        );
        assert_eq!(answers.cards[2].rows[0].value, "Kaizen (2019)");
        assert_eq!(answers.cards[2].rows[3].value, "Not provided");
        assert!(!keys(&answers).contains(&"Reason for override"));
    }

    #[test]
    fn submitted_referrals_have_no_change_links() {
        let mut referral = draft_referral();
        referral.status = ReferralStatus::ReferralSubmitted;
        referral.is_override = true;
        let answers = check_answers(&referral, &person(), &thinking_skills(), &organisation(), &[])
            .expect("builds");

        assert!(keys(&answers).contains(&"Reason for override"));
        assert!(answers
            .cards
            .iter()
            .flat_map(|card| card.rows.iter())
            .all(|row| row.change_href.is_none()));
        assert_eq!(answers.cards[2].rows[0].value, "No programme history");
    }
}
