use super::common::*;
use crate::workflows::referrals::domain::ReferralStatusUpdate;
use crate::workflows::referrals::service::ReferralServiceError;
use crate::workflows::referrals::status::ReferralStatus;
use crate::workflows::referrals::task_list::TaskTag;
use crate::workflows::referrals::withdrawal::{StatusUpdateDraft, WizardStep};

#[test]
fn draft_is_completed_task_by_task_then_submitted() {
    let (service, fake) = build_service();
    let referral = service
        .start_referral(thinking_skills_offering().id, PRISON_NUMBER, REFERRER)
        .expect("draft created");
    let id = referral.id;

    let (_, list) = service.task_list(id).expect("task list");
    assert_eq!(list.item("check_answers").map(|item| item.tag), Some(TaskTag::CannotStartYet));

    service.mark_programme_history_reviewed(id).expect("reviewed");
    service.confirm_oasys(id, true).expect("confirmed");
    service
        .save_reason(id, Some("Needs to develop thinking skills"))
        .expect("reason");
    service
        .save_additional_information(id, Some("Motivated to take part"))
        .expect("information");

    let (_, list) = service.task_list(id).expect("task list");
    assert!(list.ready_to_submit);
    assert_eq!(list.item("check_answers").map(|item| item.tag), Some(TaskTag::NotStarted));

    let (_, answers) = service.check_answers(id).expect("answers");
    assert_eq!(answers.cards.len(), 3);

    let submitted = service
        .submit(id, true, &referrer(), REFERRER)
        .expect("submitted");
    assert_eq!(submitted.status, ReferralStatus::ReferralSubmitted);
    assert!(submitted.submitted_on.is_some());
    assert!(!fake.stored(id).is_draft());
}

#[test]
fn withdrawal_wizard_makes_exactly_one_status_update() {
    let (service, fake) = build_service();
    let mut referral = complete_draft();
    referral.status = ReferralStatus::ReferralSubmitted;
    fake.insert(referral.clone());

    let categories = service
        .status_categories(ReferralStatus::Withdrawn)
        .expect("categories");
    let reasons = service.status_reasons(ReferralStatus::Withdrawn).expect("reasons");

    let mut draft = StatusUpdateDraft::new(referral.id, ReferralStatus::Withdrawn);
    assert_eq!(draft.first_step(), WizardStep::Category);
    draft
        .choose_category(Some("W_ADMIN"), &categories, &reasons)
        .expect("category");
    draft
        .choose_reason(Some("W_ADMIN_DUPLICATE"), &reasons)
        .expect("reason");
    assert!(fake.status_updates().is_empty());

    let update = draft.complete("no longer needed").expect("complete");
    service
        .update_status(referral.id, &update, &referrer(), REFERRER)
        .expect("withdrawn");

    assert_eq!(
        fake.status_updates(),
        vec![(
            referral.id,
            ReferralStatusUpdate {
                status: ReferralStatus::Withdrawn,
                category_code: Some("W_ADMIN".to_string()),
                reason_code: Some("W_ADMIN_DUPLICATE".to_string()),
                reason_information: Some("no longer needed".to_string()),
            }
        )]
    );
    assert_eq!(fake.stored(referral.id).status, ReferralStatus::Withdrawn);
}

#[test]
fn abandoned_wizard_never_updates_status() {
    let (service, fake) = build_service();
    let mut referral = complete_draft();
    referral.status = ReferralStatus::AwaitingAssessment;
    fake.insert(referral.clone());

    let categories = service
        .status_categories(ReferralStatus::Withdrawn)
        .expect("categories");
    let reasons = service.status_reasons(ReferralStatus::Withdrawn).expect("reasons");
    let mut draft = StatusUpdateDraft::new(referral.id, ReferralStatus::Withdrawn);
    draft
        .choose_category(Some("W_PERSONAL"), &categories, &reasons)
        .expect("category");
    drop(draft);

    assert!(fake.status_updates().is_empty());
    assert_eq!(fake.stored(referral.id).status, ReferralStatus::AwaitingAssessment);
}

#[test]
fn referrer_cannot_withdraw_after_assessment_starts() {
    let (service, fake) = build_service();
    let mut referral = complete_draft();
    referral.status = ReferralStatus::AssessmentStarted;
    fake.insert(referral.clone());

    let update = ReferralStatusUpdate {
        status: ReferralStatus::Withdrawn,
        category_code: Some("W_ADMIN".to_string()),
        reason_code: None,
        reason_information: Some("duplicate".to_string()),
    };
    assert!(service
        .update_status(referral.id, &update, &referrer(), REFERRER)
        .is_err());
    service
        .update_status(referral.id, &update, &programme_team(), "TEAM_USER")
        .expect("programme team may withdraw");
    assert_eq!(fake.status_updates().len(), 1);
}

#[test]
fn status_changed_by_someone_else_is_not_overwritten() {
    let (service, fake) = build_service();
    let mut referral = complete_draft();
    referral.status = ReferralStatus::AssessmentStarted;
    fake.insert(referral.clone());
    fake.state
        .lock()
        .expect("fake mutex poisoned")
        .stale_statuses
        .insert(referral.id, ReferralStatus::AwaitingAssessment);

    let update = ReferralStatusUpdate {
        status: ReferralStatus::OnHoldAwaitingAssessment,
        category_code: None,
        reason_code: None,
        reason_information: Some("awaiting transfer".to_string()),
    };
    let err = service
        .update_status(referral.id, &update, &programme_team(), "TEAM_USER")
        .expect_err("stale status");

    assert!(matches!(err, ReferralServiceError::StatusChanged(id) if id == referral.id));
    assert!(fake.status_updates().is_empty());
    assert_eq!(fake.stored(referral.id).status, ReferralStatus::AssessmentStarted);
}
