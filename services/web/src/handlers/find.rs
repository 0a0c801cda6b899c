use accredited_programmes::paths::{find, refer, NoParams, PersonParams};
use accredited_programmes::session::{Flash, PniFindAndReferData};
use accredited_programmes::workflows::referrals::{Course, ProgrammePathway};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{rejected, see_other, PageResult};
use crate::auth::Identity;
use crate::infra::WebState;
use crate::session::Session;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseCard {
    pub(crate) name: String,
    pub(crate) audience: String,
    pub(crate) intensity: &'static str,
    pub(crate) ldc: bool,
}

impl From<&Course> for CourseCard {
    fn from(course: &Course) -> Self {
        Self {
            name: course.display_name(),
            audience: course.audience.clone(),
            intensity: course.intensity.label(),
            ldc: course.ldc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FindIndexView {
    pub(crate) courses: Vec<CourseCard>,
    pub(crate) person_search_href: &'static str,
}

pub(crate) async fn index(State(state): State<WebState>) -> PageResult {
    let courses = state
        .service
        .upstreams()
        .courses
        .building_choices_courses()?;

    Ok(Json(FindIndexView {
        courses: courses.iter().map(CourseCard::from).collect(),
        person_search_href: find::PERSON_SEARCH.pattern(),
    })
    .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonSearchView {
    pub(crate) flash: Flash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_search: Option<PniFindAndReferData>,
}

pub(crate) async fn person_search(Extension(session): Extension<Session>) -> PageResult {
    let flash = session.take_flash();
    let last_search = session.read(|data| data.pni_find_and_refer_data.clone());
    Ok(Json(PersonSearchView { flash, last_search }).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonSearchForm {
    #[serde(default)]
    pub(crate) prison_number: Option<String>,
}

pub(crate) async fn submit_person_search(
    State(state): State<WebState>,
    Extension(identity): Extension<Identity>,
    Extension(session): Extension<Session>,
    Form(form): Form<PersonSearchForm>,
) -> PageResult {
    let raw = form.prison_number.unwrap_or_default();
    let person = match state.service.find_person(&raw) {
        Ok(person) => person,
        Err(err) => {
            let back = find::PERSON_SEARCH.build(&NoParams)?;
            return rejected(&identity, &session, err, &back, &[("prisonNumber", raw.as_str())]);
        }
    };

    let pathway = state.service.pathway(&person.prison_number)?;
    info!(prison_number = %person.prison_number, ?pathway, "find journey person resolved");
    session.with(|data| {
        data.pni_find_and_refer_data = Some(PniFindAndReferData {
            person_name: person.name(),
            prison_number: person.prison_number,
            programme_pathway: pathway,
        });
    });

    Ok(see_other(&find::RECOMMENDED_PROGRAMMES.build(&NoParams)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OfferingLink {
    pub(crate) organisation: String,
    pub(crate) contact_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) refer_href: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecommendedProgramme {
    pub(crate) course: CourseCard,
    pub(crate) offerings: Vec<OfferingLink>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecommendedProgrammesView {
    pub(crate) person_name: String,
    pub(crate) prison_number: String,
    pub(crate) pathway: ProgrammePathway,
    pub(crate) pathway_label: &'static str,
    pub(crate) programmes: Vec<RecommendedProgramme>,
}

pub(crate) async fn recommended_programmes(
    State(state): State<WebState>,
    Extension(session): Extension<Session>,
) -> PageResult {
    let Some(search) = session.read(|data| data.pni_find_and_refer_data.clone()) else {
        return Ok(see_other(&find::PERSON_SEARCH.build(&NoParams)?));
    };

    let upstreams = state.service.upstreams();
    let mut programmes = Vec::new();
    for course in state
        .service
        .recommended_programmes(search.programme_pathway)?
    {
        let mut offerings = Vec::new();
        for offering in upstreams.courses.offerings_for_course(course.id)? {
            let organisation = upstreams.organisations.organisation(&offering.organisation_id)?;
            let refer_href = if offering.referable {
                Some(refer::PERSON.build(&PersonParams {
                    offering_id: offering.id,
                    prison_number: search.prison_number.clone(),
                })?)
            } else {
                None
            };
            offerings.push(OfferingLink {
                organisation: organisation.name,
                contact_email: offering.contact_email,
                refer_href,
            });
        }
        programmes.push(RecommendedProgramme {
            course: CourseCard::from(&course),
            offerings,
        });
    }

    Ok(Json(RecommendedProgrammesView {
        person_name: search.person_name,
        prison_number: search.prison_number,
        pathway: search.programme_pathway,
        pathway_label: search.programme_pathway.label(),
        programmes,
    })
    .into_response())
}
