use serde::Serialize;

use super::domain::Referral;
use crate::paths::{refer, PathError, PathTemplate, ReferralParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTag {
    NotStarted,
    Completed,
    CannotStartYet,
}

impl TaskTag {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Completed => "Completed",
            Self::CannotStartYet => "Cannot start yet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prerequisite {
    None,
    EveryOtherTask,
}

struct TaskTemplate {
    key: &'static str,
    label: &'static str,
    path: PathTemplate<ReferralParams>,
    applies: fn(&Referral) -> bool,
    complete: fn(&Referral) -> bool,
    prerequisite: Prerequisite,
}

struct SectionTemplate {
    heading: &'static str,
    tasks: &'static [TaskTemplate],
}

fn always(_: &Referral) -> bool {
    true
}

fn never(_: &Referral) -> bool {
    false
}

fn programme_history_reviewed(referral: &Referral) -> bool {
    referral.has_reviewed_programme_history
}

fn oasys_confirmed(referral: &Referral) -> bool {
    referral.oasys_confirmed
}

fn is_override(referral: &Referral) -> bool {
    referral.is_override
}

const SECTIONS: &[SectionTemplate] = &[
    SectionTemplate {
        heading: "Personal details",
        tasks: &[TaskTemplate {
            key: "personal_details",
            label: "Personal details",
            path: refer::PERSONAL_DETAILS,
            applies: always,
            complete: always,
            prerequisite: Prerequisite::None,
        }],
    },
    SectionTemplate {
        heading: "Programme history",
        tasks: &[TaskTemplate {
            key: "programme_history",
            label: "Review Accredited Programme history",
            path: refer::PROGRAMME_HISTORY,
            applies: always,
            complete: programme_history_reviewed,
            prerequisite: Prerequisite::None,
        }],
    },
    SectionTemplate {
        heading: "Referral information",
        tasks: &[
            TaskTemplate {
                key: "confirm_oasys",
                label: "Confirm the OASys information",
                path: refer::CONFIRM_OASYS,
                applies: always,
                complete: oasys_confirmed,
                prerequisite: Prerequisite::None,
            },
            TaskTemplate {
                key: "reason",
                label: "Add reason for referral",
                path: refer::REASON,
                applies: always,
                complete: Referral::has_reason,
                prerequisite: Prerequisite::None,
            },
            TaskTemplate {
                key: "additional_information",
                label: "Add additional information",
                path: refer::ADDITIONAL_INFORMATION,
                applies: always,
                complete: Referral::has_additional_information,
                prerequisite: Prerequisite::None,
            },
            TaskTemplate {
                key: "override_reason",
                label: "Give reason for override",
                path: refer::OVERRIDE_REASON,
                applies: is_override,
                complete: Referral::has_override_reason,
                prerequisite: Prerequisite::None,
            },
        ],
    },
    SectionTemplate {
        heading: "Check answers and submit",
        tasks: &[TaskTemplate {
            key: "check_answers",
            label: "Check answers and submit",
            path: refer::CHECK_ANSWERS,
            applies: always,
            complete: never,
            prerequisite: Prerequisite::EveryOtherTask,
        }],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tag: TaskTag,
    pub tag_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskListSection {
    pub heading: &'static str,
    pub items: Vec<TaskListItem>,
}

/// Checklist shown to the referrer while a referral is a draft. Rebuilt on every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub sections: Vec<TaskListSection>,
    pub ready_to_submit: bool,
    pub completed_count: usize,
    pub total_count: usize,
}

impl TaskList {
    pub fn build(referral: &Referral) -> Result<Self, PathError> {
        let params = ReferralParams::from(referral.id);

        let applicable = || {
            SECTIONS
                .iter()
                .flat_map(|section| section.tasks.iter())
                .filter(|task| (task.applies)(referral))
        };

        let ready_to_submit = applicable()
            .filter(|task| task.prerequisite == Prerequisite::None)
            .all(|task| (task.complete)(referral));

        let mut sections = Vec::with_capacity(SECTIONS.len());
        let mut completed_count = 0;
        let mut total_count = 0;

        for section in SECTIONS {
            let mut items = Vec::new();
            for task in section.tasks.iter().filter(|task| (task.applies)(referral)) {
                let available = match task.prerequisite {
                    Prerequisite::None => true,
                    Prerequisite::EveryOtherTask => ready_to_submit,
                };

                let tag = if !available {
                    TaskTag::CannotStartYet
                } else if (task.complete)(referral) {
                    TaskTag::Completed
                } else {
                    TaskTag::NotStarted
                };

                let url = if available {
                    Some(task.path.build(&params)?)
                } else {
                    None
                };

                total_count += 1;
                if tag == TaskTag::Completed {
                    completed_count += 1;
                }

                items.push(TaskListItem {
                    key: task.key,
                    label: task.label,
                    url,
                    tag,
                    tag_label: tag.label(),
                });
            }
            sections.push(TaskListSection {
                heading: section.heading,
                items,
            });
        }

        Ok(Self {
            sections,
            ready_to_submit,
            completed_count,
            total_count,
        })
    }

    pub fn item(&self, key: &str) -> Option<&TaskListItem> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .find(|item| item.key == key)
    }
}
