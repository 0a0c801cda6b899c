use super::common::*;
use crate::infra::seed;
use axum::http::{header, StatusCode};

#[tokio::test]
async fn draft_is_completed_and_submitted_through_the_pages() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let task_list = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, PRISON_NUMBER).await;

    let view = referrer.page(&task_list).await;
    assert_eq!(view["personName"], "Del Hatton");
    assert_eq!(view["taskList"]["readyToSubmit"], false);
    assert_eq!(view["isOverride"], false);

    let response = referrer.get(&format!("{task_list}/check-answers")).await;
    assert_eq!(redirected(&response), task_list);

    complete_tasks(&mut referrer, &task_list).await;
    let view = referrer.page(&task_list).await;
    assert_eq!(view["taskList"]["readyToSubmit"], true);

    let answers = referrer.page(&format!("{task_list}/check-answers")).await;
    assert!(answers["cards"].as_array().is_some_and(|cards| !cards.is_empty()));

    let response = referrer.post(&format!("{task_list}/submit"), &[]).await;
    assert_eq!(redirected(&response), format!("{task_list}/check-answers"));
    let answers = referrer.page(&format!("{task_list}/check-answers")).await;
    assert!(answers["flash"]["errors"]["confirmation"].is_string());

    let response = referrer
        .post(&format!("{task_list}/submit"), &[("confirmation", "true")])
        .await;
    assert_eq!(redirected(&response), format!("{task_list}/complete"));

    let complete = referrer.page(&format!("{task_list}/complete")).await;
    assert_eq!(complete["statusHistoryHref"], format!("{task_list}/status-history"));

    let response = referrer.get(&task_list).await;
    assert_eq!(redirected(&response), format!("{task_list}/status-history"));

    for page in ["reason", "confirm-oasys", "programme-history", "check-answers"] {
        let response = referrer.get(&format!("{task_list}/{page}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{page}");
    }

    let history = referrer.page(&format!("{task_list}/status-history")).await;
    assert_eq!(history["status"], "REFERRAL_SUBMITTED");
    assert_eq!(history["timeline"].as_array().map(Vec::len), Some(2));
    let actions: Vec<&str> = history["actions"]
        .as_array()
        .expect("actions")
        .iter()
        .filter_map(|action| action["label"].as_str())
        .collect();
    assert_eq!(actions, vec!["Withdraw referral"]);
}

#[tokio::test]
async fn blank_reason_is_flashed_back_to_the_form() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let task_list = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, PRISON_NUMBER).await;

    let response = referrer
        .post(&format!("{task_list}/reason"), &[("reason", "   ")])
        .await;
    assert_eq!(redirected(&response), format!("{task_list}/reason"));

    let view = referrer.page(&format!("{task_list}/reason")).await;
    assert_eq!(view["flash"]["errors"]["reason"], "Enter a reason for the referral");

    let view = referrer.page(&format!("{task_list}/reason")).await;
    assert!(view["flash"]["errors"].as_object().is_some_and(|errors| errors.is_empty()));
}

#[tokio::test]
async fn person_search_reports_unknown_prison_numbers_on_the_field() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let search = format!(
        "/refer/offerings/{}/person-search",
        seed::THINKING_SKILLS_WHATTON
    );

    let response = referrer.post(&search, &[("prisonNumber", "Z9999ZZ")]).await;
    assert_eq!(redirected(&response), search);
    let view = referrer.page(&search).await;
    assert_eq!(
        view["flash"]["errors"]["prisonNumber"],
        "No person with prison number Z9999ZZ found"
    );
    assert_eq!(view["prisonNumber"], "Z9999ZZ");

    let response = referrer.post(&search, &[("prisonNumber", "a1234aa")]).await;
    assert_eq!(
        redirected(&response),
        format!(
            "/refer/offerings/{}/people/A1234AA",
            seed::THINKING_SKILLS_WHATTON
        )
    );
}

#[tokio::test]
async fn building_choices_person_page_offers_an_override() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let person = format!("/refer/offerings/{}/people/A1234AA", seed::BC_MODERATE_WHATTON);

    let view = referrer.page(&person).await;
    assert_eq!(view["pni"]["variant"], "not_recommended");
    assert_eq!(view["overrideHref"], format!("{person}?override=true"));

    let view = referrer.page(&format!("{person}?override=true")).await;
    assert_eq!(view["pni"]["variant"], "override_available");
    assert!(view.get("overrideHref").is_none());

    let view = referrer
        .page(&format!(
            "/refer/offerings/{}/people/A1234AA",
            seed::THINKING_SKILLS_WHATTON
        ))
        .await;
    assert!(view.get("pni").is_none());
}

#[tokio::test]
async fn override_drafts_need_a_reason_before_submission() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let task_list = start_draft(&mut referrer, seed::BC_MODERATE_WHATTON, PRISON_NUMBER).await;

    let view = referrer.page(&task_list).await;
    assert_eq!(view["isOverride"], true);
    let keys: Vec<String> = view["taskList"]["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .flat_map(|section| section["items"].as_array().cloned().unwrap_or_default())
        .filter_map(|item| item["key"].as_str().map(str::to_string))
        .collect();
    assert!(keys.iter().any(|key| key == "override_reason"));

    complete_tasks(&mut referrer, &task_list).await;
    let view = referrer.page(&task_list).await;
    assert_eq!(view["taskList"]["readyToSubmit"], false);

    let page = referrer
        .page(&format!("{task_list}/reason-for-override"))
        .await;
    assert_eq!(page["pni"]["justificationRequired"], true);

    referrer
        .post(
            &format!("{task_list}/reason-for-override"),
            &[("referrerOverrideReason", "Completed moderate programmes already")],
        )
        .await;
    let view = referrer.page(&task_list).await;
    assert_eq!(view["taskList"]["readyToSubmit"], true);
}

#[tokio::test]
async fn override_page_is_missing_for_recommended_drafts() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let task_list = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, PRISON_NUMBER).await;

    let response = referrer.get(&format!("{task_list}/reason-for-override")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreferable_offerings_and_bad_ids_are_not_found() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let horizon = seed::HORIZON_MOORLAND.to_string();

    let response = referrer
        .post(
            "/refer/referrals",
            &[("offeringId", horizon.as_str()), ("prisonNumber", PRISON_NUMBER)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = referrer.get("/refer/referrals/not-a-referral").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await["error"], "Page not found");

    let response = referrer.get("/refer/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn programme_history_can_be_added_edited_and_removed() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let task_list = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, PRISON_NUMBER).await;
    let history = format!("{task_list}/programme-history");
    let add = format!("{task_list}/add-programme-history");

    let view = referrer.page(&history).await;
    assert_eq!(view["participations"].as_array().map(Vec::len), Some(1));

    let response = referrer
        .post(&add, &[("courseName", "Healthy Identity"), ("yearStarted", "1800")])
        .await;
    assert_eq!(redirected(&response), add);
    let form = referrer.page(&add).await;
    assert!(form["flash"]["errors"]["yearStarted"].is_string());
    assert_eq!(form["flash"]["values"]["courseName"], "Healthy Identity");

    let response = referrer
        .post(
            &add,
            &[
                ("courseName", "Healthy Identity"),
                ("setting", "community"),
                ("outcome", "complete"),
                ("yearCompleted", "2020"),
            ],
        )
        .await;
    assert_eq!(redirected(&response), history);

    let view = referrer.page(&history).await;
    assert_eq!(view["flash"]["success"], "You have added a programme: Healthy Identity");
    let rows = view["participations"].as_array().expect("rows").clone();
    assert_eq!(rows.len(), 2);
    let added = rows
        .iter()
        .find(|row| row["courseName"] == "Healthy Identity")
        .expect("added row");
    assert_eq!(added["setting"], "Community");
    assert_eq!(added["outcome"], "Complete, 2020");

    let change = added["changeHref"].as_str().expect("change link").to_string();
    let form = referrer.page(&change).await;
    assert_eq!(form["flash"]["values"]["outcome"], "complete");

    let response = referrer
        .post(&change, &[("courseName", "Healthy Identity (revised)")])
        .await;
    assert_eq!(redirected(&response), history);

    let delete = added["deleteHref"].as_str().expect("delete link").to_string();
    let page = referrer.page(&delete).await;
    assert_eq!(page["participation"]["courseName"], "Healthy Identity (revised)");
    let response = referrer.post(&delete, &[]).await;
    assert_eq!(redirected(&response), history);

    let view = referrer.page(&history).await;
    assert_eq!(view["participations"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn case_list_is_scoped_filtered_and_remembered() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let draft = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, "B2345BB").await;
    let submitted = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, PRISON_NUMBER).await;
    submit_draft(&mut referrer, &submitted).await;

    let mut other = Client::new(&router, "OTHER_REFERRER", "ROLE_ACP_REFERRER");
    let list = other.page("/refer/case-list").await;
    assert_eq!(list["pagination"]["totalItems"], 0);

    let list = referrer.page("/refer/case-list?statusGroup=draft").await;
    let rows = list["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["href"], draft);

    let current = list["currentPath"].as_str().expect("current path").to_string();
    let history = referrer
        .page(&format!("{submitted}/status-history"))
        .await;
    assert_eq!(history["backHref"], current);
}

#[tokio::test]
async fn drafts_can_be_deleted() {
    let router = app();
    let mut referrer = Client::referrer(&router);
    let task_list = start_draft(&mut referrer, seed::THINKING_SKILLS_WHATTON, PRISON_NUMBER).await;

    let page = referrer.page(&format!("{task_list}/delete")).await;
    assert_eq!(page["personName"], "Del Hatton");

    let response = referrer.post(&format!("{task_list}/delete"), &[]).await;
    assert_eq!(redirected(&response), "/refer/case-list");

    let response = referrer.get(&task_list).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn referrer_withdraws_through_the_wizard() {
    let router = app();
    let id = submitted_referral(&router, PRISON_NUMBER).await;
    let base = format!("/refer/referrals/{id}");
    let mut referrer = Client::referrer(&router);

    let response = referrer.get(&format!("{base}/withdraw")).await;
    assert_eq!(redirected(&response), format!("{base}/withdraw/category"));

    let response = referrer.get(&format!("{base}/withdraw/reason")).await;
    assert_eq!(redirected(&response), format!("{base}/withdraw/category"));

    let view = referrer.page(&format!("{base}/withdraw/category")).await;
    assert_eq!(view["heading"], "Withdraw referral");
    assert_eq!(view["radios"].as_array().map(Vec::len), Some(3));

    let response = referrer
        .post(&format!("{base}/withdraw/category"), &[("categoryCode", "W_ADMIN")])
        .await;
    assert_eq!(redirected(&response), format!("{base}/withdraw/reason"));

    let response = referrer
        .post(
            &format!("{base}/withdraw/reason"),
            &[("reasonCode", "W_ADMIN_DUPLICATE")],
        )
        .await;
    assert_eq!(
        redirected(&response),
        format!("{base}/withdraw/reason-information")
    );

    let response = referrer
        .post(&format!("{base}/withdraw/reason-information"), &[])
        .await;
    assert_eq!(
        redirected(&response),
        format!("{base}/withdraw/reason-information")
    );
    let view = referrer
        .page(&format!("{base}/withdraw/reason-information"))
        .await;
    assert_eq!(view["flash"]["errors"]["reasonInformation"], "Enter more information");
    assert_eq!(view["reason"], "Duplicate referral");

    let response = referrer
        .post(
            &format!("{base}/withdraw/reason-information"),
            &[("reasonInformation", "Referred twice")],
        )
        .await;
    assert_eq!(redirected(&response), format!("{base}/status-history"));

    let history = referrer.page(&format!("{base}/status-history")).await;
    assert_eq!(history["status"], "WITHDRAWN");
    assert_eq!(history["flash"]["success"], "Referral status updated to Withdrawn");
    assert_eq!(history["timeline"][0]["reason"], "Duplicate referral");
    assert_eq!(history["timeline"][0]["notes"], "Referred twice");
    assert!(history["actions"].as_array().is_some_and(|actions| actions.is_empty()));

    let response = referrer
        .get(&format!("{base}/withdraw/reason-information"))
        .await;
    assert_eq!(redirected(&response), format!("{base}/status-history"));
}

#[tokio::test]
async fn category_without_reasons_skips_to_free_text() {
    let router = app();
    let id = submitted_referral(&router, PRISON_NUMBER).await;
    let base = format!("/refer/referrals/{id}");
    let mut referrer = Client::referrer(&router);

    referrer.get(&format!("{base}/withdraw")).await;
    let response = referrer
        .post(&format!("{base}/withdraw/category"), &[("categoryCode", "W_PERSONAL")])
        .await;
    assert_eq!(
        redirected(&response),
        format!("{base}/withdraw/reason-information")
    );

    let view = referrer
        .page(&format!("{base}/withdraw/reason-information"))
        .await;
    assert_eq!(view["backHref"], format!("{base}/withdraw/category"));
    assert_eq!(view["category"], "Personal or family reasons");
}

#[tokio::test]
async fn programme_team_cannot_use_the_refer_journey() {
    let router = app();
    let mut team = Client::programme_team(&router);

    let response = team.get("/refer/case-list").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/authError")
    );
}
